//! Decoded video frames.
//!
//! - `Frame`: one decoded RGB frame plus its position in the stream.
//! - `Frame::gray_crop`: grayscale view of a slot region for the pixel heuristics.
//!
//! Frames are ephemeral. A run reads one, hands it to the detector and the
//! classifier, and drops it before the next read.

use anyhow::{anyhow, Result};
use image::{GrayImage, Luma, Rgb, RgbImage};

use crate::geometry::Rect;

/// Decoded RGB frame (8 bits per channel, row-major, no padding).
#[derive(Clone, Debug)]
pub struct Frame {
    image: RgbImage,
    /// Zero-based index of this frame in its source.
    pub index: u64,
}

impl Frame {
    /// Wrap tightly packed RGB24 pixels.
    pub fn from_rgb(pixels: Vec<u8>, width: u32, height: u32, index: u64) -> Result<Self> {
        let expected = (width as usize)
            .checked_mul(height as usize)
            .and_then(|v| v.checked_mul(3))
            .ok_or_else(|| anyhow!("frame dimensions overflow"))?;
        if pixels.len() != expected {
            return Err(anyhow!(
                "expected {} RGB bytes for {}x{}, received {}",
                expected,
                width,
                height,
                pixels.len()
            ));
        }
        let image = RgbImage::from_raw(width, height, pixels)
            .ok_or_else(|| anyhow!("pixel buffer does not match {}x{}", width, height))?;
        Ok(Self { image, index })
    }

    pub fn from_image(image: RgbImage, index: u64) -> Self {
        Self { image, index }
    }

    /// Single-colour frame, used by synthetic sources and tests.
    pub fn filled(width: u32, height: u32, rgb: [u8; 3], index: u64) -> Self {
        Self {
            image: RgbImage::from_pixel(width, height, Rgb(rgb)),
            index,
        }
    }

    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }

    /// Raw RGB24 bytes, for detector backends.
    pub fn pixels(&self) -> &[u8] {
        self.image.as_raw()
    }

    pub fn image(&self) -> &RgbImage {
        &self.image
    }

    pub fn image_mut(&mut self) -> &mut RgbImage {
        &mut self.image
    }

    /// Grayscale crop of `region`, clipped to the frame.
    ///
    /// Luma uses BT.601 weights. `None` when the clipped region has no pixels.
    pub fn gray_crop(&self, region: Rect) -> Option<GrayImage> {
        let (x, y, w, h) = region.pixel_window(self.width(), self.height())?;
        Some(GrayImage::from_fn(w, h, |col, row| {
            Luma([bt601_luma(self.image.get_pixel(x + col, y + row))])
        }))
    }
}

fn bt601_luma(Rgb([r, g, b]): &Rgb<u8>) -> u8 {
    let luma = 0.299 * f64::from(*r) + 0.587 * f64::from(*g) + 0.114 * f64::from(*b);
    luma.round().clamp(0.0, 255.0) as u8
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_mismatched_buffer() {
        assert!(Frame::from_rgb(vec![0u8; 10], 4, 4, 0).is_err());
        let frame = Frame::from_rgb(vec![0u8; 4 * 4 * 3], 4, 4, 7).unwrap();
        assert_eq!(frame.index, 7);
        assert_eq!(frame.pixels().len(), 48);
    }

    #[test]
    fn gray_crop_clips_and_converts() {
        let frame = Frame::filled(64, 48, [128, 128, 128], 0);
        let crop = frame.gray_crop(Rect::new(60.0, 40.0, 20.0, 20.0)).unwrap();
        assert_eq!(crop.dimensions(), (4, 8));
        assert!(crop.pixels().all(|p| (127..=129).contains(&p.0[0])));
    }

    #[test]
    fn gray_crop_uses_bt601_weights() {
        let red = Frame::filled(8, 8, [255, 0, 0], 0);
        let crop = red.gray_crop(Rect::new(0.0, 0.0, 8.0, 8.0)).unwrap();
        assert!(crop.pixels().all(|p| p.0[0] == 76));

        let blue = Frame::filled(8, 8, [0, 0, 255], 0);
        let crop = blue.gray_crop(Rect::new(2.0, 2.0, 4.0, 4.0)).unwrap();
        assert_eq!(crop.dimensions(), (4, 4));
        assert!(crop.pixels().all(|p| p.0[0] == 29));
    }

    #[test]
    fn gray_crop_outside_frame_is_none() {
        let frame = Frame::filled(64, 48, [0, 0, 0], 0);
        assert!(frame.gray_crop(Rect::new(100.0, 0.0, 10.0, 10.0)).is_none());
        assert!(frame.gray_crop(Rect::new(0.0, 0.0, 0.0, 10.0)).is_none());
    }
}
