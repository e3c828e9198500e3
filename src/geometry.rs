//! Axis-aligned rectangles and intersection-over-union.

use serde::{Deserialize, Serialize};

/// Axis-aligned rectangle in frame pixel coordinates (top-left origin).
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Rect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl Rect {
    pub const fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Build from corner coordinates `(x1, y1, x2, y2)`.
    pub fn from_corners(x1: f64, y1: f64, x2: f64, y2: f64) -> Self {
        Self::new(x1, y1, x2 - x1, y2 - y1)
    }

    pub fn right(&self) -> f64 {
        self.x + self.width
    }

    pub fn bottom(&self) -> f64 {
        self.y + self.height
    }

    /// Zero for degenerate rectangles, never negative.
    pub fn area(&self) -> f64 {
        if self.is_degenerate() {
            0.0
        } else {
            self.width * self.height
        }
    }

    pub fn is_degenerate(&self) -> bool {
        !(self.width > 0.0 && self.height > 0.0)
    }

    /// True when the rectangle lies entirely inside a `width` x `height` frame.
    pub fn fits_within(&self, width: u32, height: u32) -> bool {
        self.x >= 0.0
            && self.y >= 0.0
            && self.right() <= width as f64
            && self.bottom() <= height as f64
    }

    /// Integer pixel window `(x, y, w, h)` clipped to the frame.
    ///
    /// Returns `None` when nothing of the rectangle remains inside the frame.
    pub fn pixel_window(&self, width: u32, height: u32) -> Option<(u32, u32, u32, u32)> {
        if self.is_degenerate() {
            return None;
        }
        let x0 = self.x.max(0.0).floor();
        let y0 = self.y.max(0.0).floor();
        let x1 = self.right().min(width as f64).floor();
        let y1 = self.bottom().min(height as f64).floor();
        if x1 <= x0 || y1 <= y0 {
            return None;
        }
        Some((x0 as u32, y0 as u32, (x1 - x0) as u32, (y1 - y0) as u32))
    }

    /// Shrink or shift the rectangle so it stays inside the frame.
    pub fn clamp_to(&self, width: u32, height: u32) -> Self {
        let w = self.width.min(width as f64).max(0.0);
        let h = self.height.min(height as f64).max(0.0);
        let x = self.x.clamp(0.0, width as f64 - w);
        let y = self.y.clamp(0.0, height as f64 - h);
        Self::new(x, y, w, h)
    }
}

/// Intersection-over-union of two rectangles, in `[0, 1]`.
///
/// Degenerate rectangles (width or height <= 0), disjoint rectangles and
/// areas too large to represent yield 0.
pub fn overlap(a: Rect, b: Rect) -> f64 {
    if a.is_degenerate() || b.is_degenerate() {
        return 0.0;
    }

    let left = a.x.max(b.x);
    let top = a.y.max(b.y);
    let right = a.right().min(b.right());
    let bottom = a.bottom().min(b.bottom());

    if right <= left || bottom <= top {
        return 0.0;
    }

    let intersection = (right - left) * (bottom - top);
    let union = a.area() + b.area() - intersection;
    if union <= 0.0 {
        return 0.0;
    }
    let ratio = intersection / union;
    if !ratio.is_finite() {
        return 0.0;
    }
    ratio.clamp(0.0, 1.0)
}
