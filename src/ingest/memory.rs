use anyhow::Result;

use super::{FrameSource, VideoInfo};
use crate::frame::Frame;

/// Frame source over frames already in memory.
pub struct MemorySource {
    frames: Vec<Frame>,
    fps: f64,
    cursor: usize,
    frames_read: u64,
}

impl MemorySource {
    /// Frames are re-indexed in the order given.
    pub fn new(frames: Vec<Frame>, fps: f64) -> Self {
        let frames = frames
            .into_iter()
            .enumerate()
            .map(|(i, mut frame)| {
                frame.index = i as u64;
                frame
            })
            .collect();
        Self {
            frames,
            fps,
            cursor: 0,
            frames_read: 0,
        }
    }

    /// `count` identical single-colour frames.
    pub fn uniform(count: usize, width: u32, height: u32, rgb: [u8; 3], fps: f64) -> Self {
        let frames = (0..count)
            .map(|i| Frame::filled(width, height, rgb, i as u64))
            .collect();
        Self::new(frames, fps)
    }
}

impl FrameSource for MemorySource {
    fn info(&self) -> VideoInfo {
        let (width, height) = self
            .frames
            .first()
            .map(|f| (f.width(), f.height()))
            .unwrap_or((0, 0));
        VideoInfo {
            width,
            height,
            fps: self.fps,
            total_frames: self.frames.len() as u64,
        }
    }

    fn next_frame(&mut self) -> Result<Option<Frame>> {
        let frame = self.frames.get(self.cursor).cloned();
        if frame.is_some() {
            self.cursor += 1;
            self.frames_read += 1;
        }
        Ok(frame)
    }

    fn rewind(&mut self) -> Result<()> {
        self.cursor = 0;
        Ok(())
    }

    fn frames_read(&self) -> u64 {
        self.frames_read
    }
}
