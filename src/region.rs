//! Single-frame association of detections with slot regions.
//!
//! Unlike the classifier this has no pixel fallback: a slot is occupied only
//! when some detection overlaps it by more than the association threshold.

use serde::Serialize;

use crate::detect::{Detection, VehicleDetector};
use crate::frame::Frame;
use crate::geometry::overlap;
use crate::slots::{SlotDefinition, SlotId};

pub const DEFAULT_ASSOCIATION_OVERLAP: f64 = 0.3;

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct RegionMatch {
    pub slot_id: SlotId,
    pub slot_number: SlotId,
    pub is_occupied: bool,
    /// Best-overlapping detection, if any passed the threshold.
    pub detection: Option<Detection>,
    pub overlap: f64,
}

/// Match each slot with its highest-overlap detection above `threshold`.
///
/// Ties keep the earlier detection.
pub fn associate_regions(
    slots: &[SlotDefinition],
    detections: &[Detection],
    threshold: f64,
) -> Vec<RegionMatch> {
    slots
        .iter()
        .map(|slot| {
            let best = detections
                .iter()
                .map(|det| (overlap(slot.rect, det.rect), det))
                .filter(|(iou, _)| *iou > threshold)
                .fold(None::<(f64, &Detection)>, |best, cand| match best {
                    Some(b) if cand.0 <= b.0 => Some(b),
                    _ => Some(cand),
                });
            RegionMatch {
                slot_id: slot.id.clone(),
                slot_number: slot.slot_number.clone(),
                is_occupied: best.is_some(),
                detection: best.map(|(_, det)| det.clone()),
                overlap: best.map(|(iou, _)| iou).unwrap_or(0.0),
            }
        })
        .collect()
}

/// Lot-level occupancy for a single frame.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct LotSnapshot {
    pub total_slots: usize,
    pub occupied_slots: usize,
    pub available_slots: usize,
    /// Percentage, 0 for an empty lot.
    pub occupancy_rate: f64,
    pub slots: Vec<RegionMatch>,
}

impl LotSnapshot {
    pub fn from_matches(slots: Vec<RegionMatch>) -> Self {
        let total_slots = slots.len();
        let occupied_slots = slots.iter().filter(|m| m.is_occupied).count();
        let occupancy_rate = if total_slots > 0 {
            occupied_slots as f64 / total_slots as f64 * 100.0
        } else {
            0.0
        };
        Self {
            total_slots,
            occupied_slots,
            available_slots: total_slots - occupied_slots,
            occupancy_rate,
            slots,
        }
    }

    /// Detect vehicles in `frame` and associate them with `slots`.
    pub fn capture(
        detector: &mut VehicleDetector,
        frame: &Frame,
        slots: &[SlotDefinition],
    ) -> Self {
        let detections = detector.detect(frame);
        let snapshot = Self::from_matches(associate_regions(
            slots,
            &detections,
            DEFAULT_ASSOCIATION_OVERLAP,
        ));
        log::debug!(
            "frame {}: {}/{} slots occupied",
            frame.index,
            snapshot.occupied_slots,
            snapshot.total_slots
        );
        snapshot
    }
}
