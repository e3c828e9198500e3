//! Run observation hooks.
//!
//! The processor reports progress through a `RunObserver` it is handed at
//! construction. `LogObserver` writes to the `log` facade; the CLI swaps in
//! a progress-bar observer.

use serde::Serialize;

use crate::ingest::VideoInfo;

/// Which sweep over the video a notification belongs to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PassKind {
    Occupancy,
    Timeline,
}

impl PassKind {
    pub fn label(self) -> &'static str {
        match self {
            Self::Occupancy => "occupancy",
            Self::Timeline => "timeline",
        }
    }
}

pub trait RunObserver {
    fn pass_started(&mut self, _pass: PassKind, _info: &VideoInfo, _interval: u64) {}

    /// Called once per sampled frame, after every slot was classified.
    fn frame_sampled(&mut self, _pass: PassKind, _frame_index: u64, _occupied_slots: usize) {}

    fn pass_finished(&mut self, _pass: PassKind, _frames_read: u64, _processed_frames: u64) {}
}

/// Observer that ignores everything.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoopObserver;

impl RunObserver for NoopObserver {}

/// Observer that writes pass boundaries at info and sampled frames at debug.
#[derive(Clone, Copy, Debug, Default)]
pub struct LogObserver;

impl RunObserver for LogObserver {
    fn pass_started(&mut self, pass: PassKind, info: &VideoInfo, interval: u64) {
        log::info!(
            "{} pass: {} frames at {:.2} fps ({}x{}), sampling every {}",
            pass.label(),
            info.total_frames,
            info.fps,
            info.width,
            info.height,
            interval
        );
    }

    fn frame_sampled(&mut self, pass: PassKind, frame_index: u64, occupied_slots: usize) {
        log::debug!(
            "{} pass: frame {} has {} occupied slots",
            pass.label(),
            frame_index,
            occupied_slots
        );
    }

    fn pass_finished(&mut self, pass: PassKind, frames_read: u64, processed_frames: u64) {
        log::info!(
            "{} pass done: read {} frames, sampled {}",
            pass.label(),
            frames_read,
            processed_frames
        );
    }
}
