//! Frame sources.
//!
//! This module provides the sources a run can read frames from:
//! - Local video files (feature: ingest-file-ffmpeg)
//! - Synthetic `stub://` videos (testing, demos)
//! - In-memory frame lists (library callers, tests)
//!
//! Every source reads strictly in order and can be rewound to frame 0, which
//! the full analysis mode needs between its two passes. A source owns its
//! decoder handle; dropping the source releases it.

pub mod file;
#[cfg(feature = "ingest-file-ffmpeg")]
pub(crate) mod file_ffmpeg;
pub mod memory;

use anyhow::Result;
use serde::Serialize;

use crate::frame::Frame;

pub use file::{validate_video_path, FileConfig, FileSource, VIDEO_EXTENSIONS};
pub use memory::MemorySource;

/// Stream properties known when the source is opened.
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct VideoInfo {
    pub width: u32,
    pub height: u32,
    pub fps: f64,
    /// Frame count reported by the container (may be an estimate).
    pub total_frames: u64,
}

impl VideoInfo {
    /// Stream length in seconds, 0 when the frame rate is unknown.
    pub fn duration_secs(&self) -> f64 {
        if self.fps > 0.0 {
            self.total_frames as f64 / self.fps
        } else {
            0.0
        }
    }
}

/// Sequential, rewindable frame reader.
pub trait FrameSource {
    fn info(&self) -> VideoInfo;

    /// Next frame in stream order, `None` at end of stream.
    fn next_frame(&mut self) -> Result<Option<Frame>>;

    /// Reposition at frame 0.
    fn rewind(&mut self) -> Result<()>;

    /// Frames handed out since the source was opened, across rewinds.
    fn frames_read(&self) -> u64;
}
