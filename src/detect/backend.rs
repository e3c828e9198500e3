use std::path::Path;

use anyhow::Result;

use crate::detect::result::RawDetection;

/// External object-detection capability.
///
/// Backends receive one decoded RGB24 frame per call and report every box they
/// find, with COCO class ids. Class filtering, confidence thresholding and
/// suppression happen in `VehicleDetector`, not here.
pub trait DetectorBackend: Send {
    /// Backend identifier.
    fn name(&self) -> &'static str;

    /// Model file this backend was loaded from, if any.
    fn model_path(&self) -> Option<&Path> {
        None
    }

    /// Run detection on a frame.
    ///
    /// The pixel slice is read-only and must not be retained past the call.
    fn detect(&mut self, pixels: &[u8], width: u32, height: u32) -> Result<Vec<RawDetection>>;

    /// Optional warm-up hook.
    fn warm_up(&mut self) -> Result<()> {
        Ok(())
    }
}
