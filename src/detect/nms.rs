use std::cmp::Ordering;

use crate::detect::result::Detection;
use crate::geometry::overlap;

/// Greedy non-max suppression.
///
/// Candidates are visited in descending confidence order. Each kept detection
/// discards every remaining candidate whose overlap with it exceeds
/// `iou_threshold`.
pub fn non_max_suppression(mut detections: Vec<Detection>, iou_threshold: f64) -> Vec<Detection> {
    detections.sort_by(|a, b| {
        b.confidence
            .partial_cmp(&a.confidence)
            .unwrap_or(Ordering::Equal)
    });

    let mut keep: Vec<Detection> = Vec::with_capacity(detections.len());
    for candidate in detections {
        let suppressed = keep
            .iter()
            .any(|kept| overlap(kept.rect, candidate.rect) > iou_threshold);
        if !suppressed {
            keep.push(candidate);
        }
    }
    keep
}
