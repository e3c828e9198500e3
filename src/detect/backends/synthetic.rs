use anyhow::Result;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::detect::backend::DetectorBackend;
use crate::detect::result::{RawDetection, VehicleClass};
use crate::geometry::Rect;

const MAX_DETECTIONS: usize = 4;
const MIN_FRAME_WIDTH: u32 = 100;
const MIN_FRAME_HEIGHT: u32 = 60;

/// Randomized stand-in for a real detector.
///
/// Produces 0-4 car boxes per call, 80-149 px wide and 40-79 px tall, each kept
/// inside the frame. Its output carries no information about the pixels.
pub struct SyntheticBackend {
    rng: StdRng,
}

impl SyntheticBackend {
    pub fn new() -> Self {
        Self {
            rng: StdRng::from_entropy(),
        }
    }

    /// Reproducible generator for tests and demos.
    pub fn with_seed(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
        }
    }

    pub fn generate(&mut self, width: u32, height: u32) -> Vec<RawDetection> {
        if width <= MIN_FRAME_WIDTH || height <= MIN_FRAME_HEIGHT {
            return Vec::new();
        }

        let count = self.rng.gen_range(0..=MAX_DETECTIONS);
        (0..count)
            .map(|_| {
                let x = self.rng.gen_range(0..width - MIN_FRAME_WIDTH) as f64;
                let y = self.rng.gen_range(0..height - MIN_FRAME_HEIGHT) as f64;
                let w = self.rng.gen_range(80..150) as f64;
                let h = self.rng.gen_range(40..80) as f64;
                let rect = Rect::new(
                    x.min(width as f64 - w),
                    y.min(height as f64 - h),
                    w,
                    h,
                )
                .clamp_to(width, height);
                RawDetection {
                    rect,
                    confidence: self.rng.gen_range(0.6..0.95),
                    class_id: VehicleClass::Car.coco_id(),
                }
            })
            .collect()
    }
}

impl Default for SyntheticBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl DetectorBackend for SyntheticBackend {
    fn name(&self) -> &'static str {
        "synthetic"
    }

    fn detect(&mut self, _pixels: &[u8], width: u32, height: u32) -> Result<Vec<RawDetection>> {
        Ok(self.generate(width, height))
    }
}
