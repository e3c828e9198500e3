use thiserror::Error;

/// Failures that abort a run. Nothing partial is reported for these.
#[derive(Error, Debug)]
pub enum AnalysisError {
    /// Malformed or unusable slot configuration; raised before any video I/O.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// Missing file, unsupported container or unreadable stream.
    #[error("cannot open video {path}: {reason}")]
    VideoAccess { path: String, reason: String },

    /// The stream failed mid-run.
    #[error("video stream failed: {0:#}")]
    Source(anyhow::Error),
}

impl AnalysisError {
    pub fn configuration(msg: impl Into<String>) -> Self {
        Self::Configuration(msg.into())
    }

    pub fn video_access(path: &str, err: &anyhow::Error) -> Self {
        Self::VideoAccess {
            path: path.to_string(),
            reason: format!("{:#}", err),
        }
    }

    pub fn unreadable(path: &str, reason: impl Into<String>) -> Self {
        Self::VideoAccess {
            path: path.to_string(),
            reason: reason.into(),
        }
    }

    pub fn is_configuration(&self) -> bool {
        matches!(self, Self::Configuration(_))
    }
}
