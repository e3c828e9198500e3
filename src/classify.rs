//! Per-frame slot occupancy classification.
//!
//! Detection overlap is the primary signal. When no detection overlaps the
//! slot enough, the slot's pixels are scored instead: vehicles add edges and
//! texture and are usually darker than empty asphalt.

use std::cmp::Ordering;

use image::GrayImage;
use imageproc::edges::canny;
use serde::Serialize;

use crate::detect::{Detection, VehicleClass};
use crate::frame::Frame;
use crate::geometry::{overlap, Rect};
use crate::slots::{SlotDefinition, SlotId};

pub const DEFAULT_OCCUPANCY_OVERLAP: f64 = 0.5;
pub const DEFAULT_HEURISTIC_THRESHOLD: f64 = 0.6;

/// Tunables for `SlotClassifier`.
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct ClassifierConfig {
    /// A detection must overlap the slot by more than this to claim it.
    pub overlap_threshold: f64,
    /// Pixel score above which a slot without detections counts as occupied.
    pub heuristic_threshold: f64,
    pub edge_weight: f64,
    pub variance_weight: f64,
    pub darkness_weight: f64,
    /// Variance at which the texture feature saturates.
    pub variance_scale: f64,
    pub canny_low: f32,
    pub canny_high: f32,
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            overlap_threshold: DEFAULT_OCCUPANCY_OVERLAP,
            heuristic_threshold: DEFAULT_HEURISTIC_THRESHOLD,
            edge_weight: 0.4,
            variance_weight: 0.3,
            darkness_weight: 0.3,
            variance_scale: 1000.0,
            canny_low: 50.0,
            canny_high: 150.0,
        }
    }
}

/// Which signal decided a verdict.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum VerdictSource {
    Detection,
    ImageHeuristic,
}

/// Occupancy of one slot in one sampled frame.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct SlotFrameVerdict {
    pub slot_id: SlotId,
    pub slot_number: SlotId,
    pub frame_index: u64,
    pub is_occupied: bool,
    pub confidence: f64,
    pub vehicle_type: Option<VehicleClass>,
    pub detection_box: Option<Rect>,
    pub source: VerdictSource,
}

#[derive(Clone, Debug, Default)]
pub struct SlotClassifier {
    config: ClassifierConfig,
}

impl SlotClassifier {
    pub fn new(config: ClassifierConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ClassifierConfig {
        &self.config
    }

    pub fn classify(
        &self,
        frame: &Frame,
        slot: &SlotDefinition,
        detections: &[Detection],
    ) -> SlotFrameVerdict {
        let mut verdict = SlotFrameVerdict {
            slot_id: slot.id.clone(),
            slot_number: slot.slot_number.clone(),
            frame_index: frame.index,
            is_occupied: false,
            confidence: 0.0,
            vehicle_type: None,
            detection_box: None,
            source: VerdictSource::ImageHeuristic,
        };

        if let Some(det) = best_detection(slot.rect, detections, self.config.overlap_threshold) {
            verdict.is_occupied = true;
            verdict.confidence = det.confidence;
            verdict.vehicle_type = Some(det.class);
            verdict.detection_box = Some(det.rect);
            verdict.source = VerdictSource::Detection;
            return verdict;
        }

        let score = frame
            .gray_crop(slot.rect)
            .map(|crop| self.occupancy_score(&crop))
            .unwrap_or(0.0);
        verdict.is_occupied = score > self.config.heuristic_threshold;
        verdict.confidence = score;
        verdict
    }

    /// Composite pixel score in `[0, 1]` from edge density, texture and darkness.
    pub fn occupancy_score(&self, gray: &GrayImage) -> f64 {
        let total = gray.width() as usize * gray.height() as usize;
        if total == 0 {
            return 0.0;
        }
        let cfg = &self.config;

        let edges = canny(gray, cfg.canny_low, cfg.canny_high);
        let edge_density = edges.pixels().filter(|p| p.0[0] > 0).count() as f64 / total as f64;

        let n = total as f64;
        let mean = gray.pixels().map(|p| p.0[0] as f64).sum::<f64>() / n;
        let variance = gray
            .pixels()
            .map(|p| {
                let d = p.0[0] as f64 - mean;
                d * d
            })
            .sum::<f64>()
            / n;

        let score = edge_density * cfg.edge_weight
            + (variance / cfg.variance_scale).min(1.0) * cfg.variance_weight
            + (1.0 - mean / 255.0) * cfg.darkness_weight;
        score.clamp(0.0, 1.0)
    }
}

/// Highest-overlap detection above `threshold`; ties go to higher confidence.
pub(crate) fn best_detection(
    region: Rect,
    detections: &[Detection],
    threshold: f64,
) -> Option<&Detection> {
    detections
        .iter()
        .map(|det| (overlap(region, det.rect), det))
        .filter(|(iou, _)| *iou > threshold)
        .fold(None, |best: Option<(f64, &Detection)>, cand| match best {
            Some(b) if !beats(cand, b) => Some(b),
            _ => Some(cand),
        })
        .map(|(_, det)| det)
}

fn beats(cand: (f64, &Detection), best: (f64, &Detection)) -> bool {
    match cand.0.partial_cmp(&best.0) {
        Some(Ordering::Greater) => true,
        Some(Ordering::Equal) => cand.1.confidence > best.1.confidence,
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Luma;

    fn slot() -> SlotDefinition {
        SlotDefinition::new(1, 1, Rect::new(50.0, 50.0, 100.0, 200.0))
    }

    #[test]
    fn exact_match_detection_claims_slot() {
        let frame = Frame::filled(640, 480, [128, 128, 128], 3);
        let det = Detection::new(slot().rect, 0.9, VehicleClass::Bus);
        let verdict = SlotClassifier::default().classify(&frame, &slot(), &[det]);
        assert!(verdict.is_occupied);
        assert_eq!(verdict.confidence, 0.9);
        assert_eq!(verdict.vehicle_type, Some(VehicleClass::Bus));
        assert_eq!(verdict.detection_box, Some(slot().rect));
        assert_eq!(verdict.source, VerdictSource::Detection);
        assert_eq!(verdict.frame_index, 3);
    }

    #[test]
    fn uniform_gray_without_detections_is_free() {
        let frame = Frame::filled(640, 480, [128, 128, 128], 0);
        let verdict = SlotClassifier::default().classify(&frame, &slot(), &[]);
        assert!(!verdict.is_occupied);
        assert_eq!(verdict.source, VerdictSource::ImageHeuristic);
        // only the darkness term contributes: 0.3 * (1 - 128/255)
        assert!((verdict.confidence - 0.3 * (1.0 - 128.0 / 255.0)).abs() < 1e-9);
        assert!(verdict.vehicle_type.is_none());
    }

    #[test]
    fn weak_overlap_falls_back_to_pixels() {
        let frame = Frame::filled(640, 480, [128, 128, 128], 0);
        // overlap is 1/3
        let det = Detection::new(Rect::new(100.0, 50.0, 100.0, 200.0), 0.99, VehicleClass::Car);
        let verdict = SlotClassifier::default().classify(&frame, &slot(), &[det]);
        assert!(!verdict.is_occupied);
        assert_eq!(verdict.source, VerdictSource::ImageHeuristic);
    }

    #[test]
    fn overlap_of_exactly_half_does_not_claim_slot() {
        let frame = Frame::filled(640, 480, [128, 128, 128], 0);
        // top half of the slot: 10000 / 20000
        let half = Detection::new(Rect::new(50.0, 50.0, 100.0, 100.0), 0.99, VehicleClass::Car);
        assert_eq!(overlap(slot().rect, half.rect), 0.5);
        let verdict = SlotClassifier::default().classify(&frame, &slot(), &[half]);
        assert!(!verdict.is_occupied);
        assert_eq!(verdict.source, VerdictSource::ImageHeuristic);

        let more = Detection::new(Rect::new(50.0, 50.0, 100.0, 101.0), 0.99, VehicleClass::Car);
        let verdict = SlotClassifier::default().classify(&frame, &slot(), &[more]);
        assert!(verdict.is_occupied);
    }

    #[test]
    fn highest_overlap_wins_then_confidence() {
        let region = Rect::new(0.0, 0.0, 100.0, 100.0);
        let close = Detection::new(Rect::new(0.0, 0.0, 100.0, 90.0), 0.6, VehicleClass::Car);
        let loose = Detection::new(Rect::new(0.0, 0.0, 100.0, 70.0), 0.95, VehicleClass::Truck);
        let candidates = [loose.clone(), close.clone()];
        let best = best_detection(region, &candidates, 0.5).unwrap();
        assert_eq!(best.class, VehicleClass::Car);

        let twin = Detection::new(close.rect, 0.8, VehicleClass::Motorcycle);
        let candidates = [close, twin];
        let best = best_detection(region, &candidates, 0.5).unwrap();
        assert_eq!(best.class, VehicleClass::Motorcycle);
    }

    #[test]
    fn pixel_score_above_threshold_marks_occupied() {
        // Black has no edges or texture: the score is the darkness weight alone.
        let frame = Frame::filled(200, 200, [0, 0, 0], 0);
        let slot = SlotDefinition::new(1, 1, Rect::new(0.0, 0.0, 200.0, 200.0));

        let strict = SlotClassifier::default().classify(&frame, &slot, &[]);
        assert!(!strict.is_occupied);
        assert!((strict.confidence - 0.3).abs() < 1e-9);

        let lenient = SlotClassifier::new(ClassifierConfig {
            heuristic_threshold: 0.25,
            ..ClassifierConfig::default()
        });
        let verdict = lenient.classify(&frame, &slot, &[]);
        assert!(verdict.is_occupied);
        assert!((verdict.confidence - 0.3).abs() < 1e-9);
    }

    #[test]
    fn pixel_score_equal_to_threshold_is_free() {
        let frame = Frame::filled(200, 200, [0, 0, 0], 0);
        let slot = SlotDefinition::new(1, 1, Rect::new(0.0, 0.0, 200.0, 200.0));
        let classifier = SlotClassifier::new(ClassifierConfig {
            darkness_weight: 0.6,
            ..ClassifierConfig::default()
        });
        let verdict = classifier.classify(&frame, &slot, &[]);
        assert_eq!(verdict.confidence, 0.6);
        assert!(!verdict.is_occupied);
    }

    #[test]
    fn texture_raises_the_score() {
        let classifier = SlotClassifier::default();
        let flat = GrayImage::from_pixel(64, 64, Luma([60]));
        let striped = GrayImage::from_fn(64, 64, |x, _| {
            if (x / 8) % 2 == 0 {
                Luma([0])
            } else {
                Luma([120])
            }
        });
        // same mean brightness, more variance
        assert!(classifier.occupancy_score(&striped) > classifier.occupancy_score(&flat));
    }

    #[test]
    fn degenerate_crop_scores_zero() {
        let frame = Frame::filled(64, 48, [0, 0, 0], 0);
        let slot = SlotDefinition::new(1, 1, Rect::new(100.0, 100.0, 10.0, 10.0));
        let verdict = SlotClassifier::default().classify(&frame, &slot, &[]);
        assert!(!verdict.is_occupied);
        assert_eq!(verdict.confidence, 0.0);

        let empty = GrayImage::from_pixel(0, 0, Luma([0]));
        assert_eq!(SlotClassifier::default().occupancy_score(&empty), 0.0);
    }
}
