//! Frame sampling and per-slot aggregation.
//!
//! Both passes read the source strictly in order and sample frame `i` when
//! `i % interval == 0`. The occupancy pass keeps each slot's most confident
//! verdict; the timeline pass keeps every sampled observation. A pass over a
//! stream that yields no frame at all fails as a video access error.

use crate::classify::{SlotClassifier, SlotFrameVerdict};
use crate::detect::VehicleDetector;
use crate::error::AnalysisError;
use crate::estimate::{SlotTimeline, TimelineEntry};
use crate::frame::Frame;
use crate::ingest::FrameSource;
use crate::observe::{PassKind, RunObserver};
use crate::slots::SlotDefinition;

pub const DEFAULT_OCCUPANCY_INTERVAL: u64 = 30;
pub const DEFAULT_DURATION_INTERVAL: u64 = 15;

/// Result of one occupancy pass, in slot order.
#[derive(Clone, Debug)]
pub struct OccupancyPass {
    pub verdicts: Vec<SlotFrameVerdict>,
    pub processed_frames: u64,
}

/// Result of one timeline pass, in slot order.
#[derive(Clone, Debug)]
pub struct TimelinePass {
    pub timelines: Vec<SlotTimeline>,
    pub processed_frames: u64,
}

/// Detector, classifier and observer borrowed for the length of one pass.
pub struct Aggregator<'a> {
    /// Name of the video, used in error reports.
    pub video: &'a str,
    pub detector: &'a mut VehicleDetector,
    pub classifier: &'a SlotClassifier,
    pub observer: &'a mut dyn RunObserver,
}

impl<'a> Aggregator<'a> {
    /// Fold sampled verdicts into the first strictly-most-confident one per slot.
    pub fn occupancy_pass(
        &mut self,
        source: &mut dyn FrameSource,
        slots: &[SlotDefinition],
        interval: u64,
    ) -> Result<OccupancyPass, AnalysisError> {
        let mut best: Vec<Option<SlotFrameVerdict>> = vec![None; slots.len()];
        let processed_frames =
            self.sweep(source, slots, interval, PassKind::Occupancy, |verdicts| {
                for (slot_best, verdict) in best.iter_mut().zip(verdicts) {
                    match slot_best {
                        Some(current) if verdict.confidence <= current.confidence => {}
                        _ => *slot_best = Some(verdict),
                    }
                }
            })?;

        // every sampled frame folds one verdict per slot
        let verdicts = best
            .into_iter()
            .collect::<Option<Vec<_>>>()
            .ok_or_else(|| self.no_frames())?;
        Ok(OccupancyPass {
            verdicts,
            processed_frames,
        })
    }

    /// Record every sampled verdict per slot, in frame order.
    pub fn timeline_pass(
        &mut self,
        source: &mut dyn FrameSource,
        slots: &[SlotDefinition],
        interval: u64,
    ) -> Result<TimelinePass, AnalysisError> {
        let mut timelines = vec![SlotTimeline::new(); slots.len()];
        let processed_frames =
            self.sweep(source, slots, interval, PassKind::Timeline, |verdicts| {
                for (timeline, verdict) in timelines.iter_mut().zip(verdicts) {
                    timeline.push(TimelineEntry {
                        frame_index: verdict.frame_index,
                        is_occupied: verdict.is_occupied,
                        confidence: verdict.confidence,
                    });
                }
            })?;
        Ok(TimelinePass {
            timelines,
            processed_frames,
        })
    }

    fn sweep<F>(
        &mut self,
        source: &mut dyn FrameSource,
        slots: &[SlotDefinition],
        interval: u64,
        pass: PassKind,
        mut fold: F,
    ) -> Result<u64, AnalysisError>
    where
        F: FnMut(Vec<SlotFrameVerdict>),
    {
        if interval == 0 {
            return Err(AnalysisError::configuration(
                "frame interval must be at least 1",
            ));
        }
        let info = source.info();
        let read_before = source.frames_read();
        self.observer.pass_started(pass, &info, interval);

        let mut processed = 0u64;
        let mut position = 0u64;
        while let Some(frame) = source.next_frame().map_err(AnalysisError::Source)? {
            if position % interval == 0 {
                let verdicts = self.classify_frame(&frame, slots);
                let occupied = verdicts.iter().filter(|v| v.is_occupied).count();
                self.observer.frame_sampled(pass, frame.index, occupied);
                fold(verdicts);
                processed += 1;
            }
            position += 1;
        }
        if processed == 0 {
            return Err(self.no_frames());
        }

        self.observer
            .pass_finished(pass, source.frames_read() - read_before, processed);
        Ok(processed)
    }

    fn no_frames(&self) -> AnalysisError {
        AnalysisError::unreadable(self.video, "stream yielded no frames")
    }

    fn classify_frame(&mut self, frame: &Frame, slots: &[SlotDefinition]) -> Vec<SlotFrameVerdict> {
        let detections = self.detector.detect(frame);
        slots
            .iter()
            .map(|slot| self.classifier.classify(frame, slot, &detections))
            .collect()
    }
}
