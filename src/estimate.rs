//! Timeline-based occupancy verdict, stability and dwell prediction.
//!
//! The dwell prediction is a two-tier heuristic (stable occupied slots are
//! assumed to stay longer), not a learned model.

use serde::Serialize;

pub const DEFAULT_STABLE_THRESHOLD: f64 = 0.8;
pub const DEFAULT_BASE_DURATION_SECS: u64 = 1800;
pub const DEFAULT_STABLE_DURATION_SECS: u64 = 3600;
pub const DEFAULT_EMPTY_CONFIDENCE: f64 = 0.5;

/// One sampled observation of a slot.
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct TimelineEntry {
    pub frame_index: u64,
    pub is_occupied: bool,
    pub confidence: f64,
}

/// Ordered observations of one slot over a run.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct SlotTimeline {
    entries: Vec<TimelineEntry>,
}

impl SlotTimeline {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, entry: TimelineEntry) {
        self.entries.push(entry);
    }

    pub fn entries(&self) -> &[TimelineEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Number of adjacent entries whose occupancy differs.
    pub fn changes(&self) -> usize {
        self.entries
            .windows(2)
            .filter(|pair| pair[0].is_occupied != pair[1].is_occupied)
            .count()
    }
}

impl FromIterator<TimelineEntry> for SlotTimeline {
    fn from_iter<I: IntoIterator<Item = TimelineEntry>>(iter: I) -> Self {
        Self {
            entries: iter.into_iter().collect(),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct DurationConfig {
    /// Stability above which an occupied slot gets the long dwell estimate.
    pub stable_threshold: f64,
    pub base_duration_secs: u64,
    pub stable_duration_secs: u64,
    /// Confidence reported for a slot that was never observed.
    pub empty_confidence: f64,
}

impl Default for DurationConfig {
    fn default() -> Self {
        Self {
            stable_threshold: DEFAULT_STABLE_THRESHOLD,
            base_duration_secs: DEFAULT_BASE_DURATION_SECS,
            stable_duration_secs: DEFAULT_STABLE_DURATION_SECS,
            empty_confidence: DEFAULT_EMPTY_CONFIDENCE,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct DurationEstimate {
    pub final_status: bool,
    pub confidence: f64,
    pub predicted_duration: u64,
    pub changes: usize,
    pub stability: f64,
}

#[derive(Clone, Debug, Default)]
pub struct DurationEstimator {
    config: DurationConfig,
}

impl DurationEstimator {
    pub fn new(config: DurationConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &DurationConfig {
        &self.config
    }

    pub fn estimate(&self, timeline: &SlotTimeline) -> DurationEstimate {
        if timeline.is_empty() {
            return DurationEstimate {
                final_status: false,
                confidence: self.config.empty_confidence,
                predicted_duration: self.config.base_duration_secs,
                changes: 0,
                stability: 0.0,
            };
        }

        let len = timeline.len() as f64;
        let changes = timeline.changes();
        let stability = (1.0 - changes as f64 / len).max(0.0);

        let occupied = timeline.entries().iter().filter(|e| e.is_occupied).count();
        let final_status = occupied as f64 > len / 2.0;

        let predicted_duration = match (final_status, stability > self.config.stable_threshold) {
            (false, _) => 0,
            (true, true) => self.config.stable_duration_secs,
            (true, false) => self.config.base_duration_secs,
        };

        let mean_confidence = timeline.entries().iter().map(|e| e.confidence).sum::<f64>() / len;

        DurationEstimate {
            final_status,
            confidence: mean_confidence * stability,
            predicted_duration,
            changes,
            stability,
        }
    }
}
