//! Analysis orchestration: mode selection, passes, merge and report assembly.

use std::fmt;
use std::time::Instant;

use chrono::Local;
use serde::Serialize;

use crate::aggregate::{
    Aggregator, OccupancyPass, TimelinePass, DEFAULT_DURATION_INTERVAL,
    DEFAULT_OCCUPANCY_INTERVAL,
};
use crate::classify::{ClassifierConfig, SlotClassifier};
use crate::config::ProcessorConfig;
use crate::detect::VehicleDetector;
use crate::error::AnalysisError;
use crate::estimate::{DurationEstimate, DurationEstimator, DEFAULT_BASE_DURATION_SECS};
use crate::ingest::{FileConfig, FileSource, FrameSource};
use crate::observe::{LogObserver, RunObserver};
use crate::report::{
    occupancy_rate, video_filename, ConfidenceScores, DetectorSummary, ProcessingStats,
    RunReport, SlotReport,
};
use crate::slots::{validate_slots, SlotDefinition};

const DURATION_VEHICLE_CONFIDENCE: f64 = 0.85;
const DURATION_SLOT_CONFIDENCE: f64 = 0.80;
const FULL_VEHICLE_CONFIDENCE: f64 = 0.88;
const FULL_SLOT_CONFIDENCE: f64 = 0.82;
const MERGE_DEFAULT_STABILITY: f64 = 0.5;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum AnalysisMode {
    /// Most confident state per slot.
    Occupancy,
    /// Timeline-based state, stability and dwell prediction.
    Duration,
    /// Both passes, merged.
    #[default]
    Full,
}

impl AnalysisMode {
    pub fn label(self) -> &'static str {
        match self {
            Self::Occupancy => "occupancy",
            Self::Duration => "duration",
            Self::Full => "full",
        }
    }
}

impl fmt::Display for AnalysisMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    Json,
    Csv,
}

/// Sampling intervals, in frames.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Intervals {
    pub occupancy: u64,
    pub duration: u64,
}

impl Default for Intervals {
    fn default() -> Self {
        Self {
            occupancy: DEFAULT_OCCUPANCY_INTERVAL,
            duration: DEFAULT_DURATION_INTERVAL,
        }
    }
}

/// Slot reports and confidences produced by one mode.
struct ModeOutcome {
    slots: Vec<SlotReport>,
    scores: ConfidenceScores,
    processed_frames: u64,
    passes: u32,
}

/// Drives a run: opens the video, samples it and builds the report.
pub struct VideoProcessor {
    detector: VehicleDetector,
    classifier: SlotClassifier,
    estimator: DurationEstimator,
    intervals: Intervals,
    observer: Box<dyn RunObserver>,
}

impl VideoProcessor {
    pub fn new(detector: VehicleDetector) -> Self {
        Self {
            detector,
            classifier: SlotClassifier::default(),
            estimator: DurationEstimator::default(),
            intervals: Intervals::default(),
            observer: Box::new(LogObserver),
        }
    }

    /// Build every stage from a loaded configuration. `seed` fixes the
    /// synthetic detector for reproducible runs.
    pub fn from_config(config: &ProcessorConfig, seed: Option<u64>) -> Self {
        let detector = VehicleDetector::load(config.model_path.as_deref(), config.detector, seed);
        Self::new(detector)
            .with_classifier(SlotClassifier::new(config.classifier))
            .with_estimator(DurationEstimator::new(config.duration))
            .with_intervals(config.intervals)
    }

    pub fn with_classifier(mut self, classifier: SlotClassifier) -> Self {
        self.classifier = classifier;
        self
    }

    pub fn with_estimator(mut self, estimator: DurationEstimator) -> Self {
        self.estimator = estimator;
        self
    }

    pub fn with_intervals(mut self, intervals: Intervals) -> Self {
        self.intervals = intervals;
        self
    }

    pub fn with_observer(mut self, observer: Box<dyn RunObserver>) -> Self {
        self.observer = observer;
        self
    }

    pub fn detector(&self) -> &VehicleDetector {
        &self.detector
    }

    pub fn classifier_config(&self) -> &ClassifierConfig {
        self.classifier.config()
    }

    pub fn intervals(&self) -> Intervals {
        self.intervals
    }

    /// Analyse a video file (or `stub://` video).
    ///
    /// Slots are checked before the file is touched; the stream is released
    /// when this returns, on every path.
    pub fn process_video(
        &mut self,
        video_path: &str,
        slots: &[SlotDefinition],
        mode: AnalysisMode,
    ) -> Result<RunReport, AnalysisError> {
        log::info!("starting video processing: {}", video_path);
        log::info!("analysis type: {}, {} slots", mode, slots.len());
        self.check_inputs(slots)?;

        let mut source = FileSource::open(FileConfig::new(video_path))
            .map_err(|e| AnalysisError::video_access(video_path, &e))?;
        self.process_source(&mut source, &video_filename(video_path), slots, mode)
    }

    /// Analyse an already-open source positioned at frame 0.
    pub fn process_source(
        &mut self,
        source: &mut dyn FrameSource,
        video_filename: &str,
        slots: &[SlotDefinition],
        mode: AnalysisMode,
    ) -> Result<RunReport, AnalysisError> {
        self.check_inputs(slots)?;
        let info = source.info();
        if info.width == 0 || info.height == 0 {
            return Err(AnalysisError::unreadable(
                video_filename,
                "stream reports no frame size",
            ));
        }
        validate_slots(slots, info.width, info.height)?;
        log::info!(
            "video properties: {} frames, {:.2} fps, {:.1}s",
            info.total_frames,
            info.fps,
            info.duration_secs()
        );

        let start = Instant::now();
        let read_before = source.frames_read();
        let intervals = self.intervals;
        let mut aggregator = Aggregator {
            video: video_filename,
            detector: &mut self.detector,
            classifier: &self.classifier,
            observer: self.observer.as_mut(),
        };

        let outcome = match mode {
            AnalysisMode::Occupancy => {
                let occ = aggregator.occupancy_pass(source, slots, intervals.occupancy)?;
                occupancy_outcome(occ)
            }
            AnalysisMode::Duration => {
                let timeline = aggregator.timeline_pass(source, slots, intervals.duration)?;
                duration_outcome(&self.estimator, slots, timeline)
            }
            AnalysisMode::Full => {
                let occ = aggregator.occupancy_pass(source, slots, intervals.occupancy)?;
                source.rewind().map_err(AnalysisError::Source)?;
                let timeline = aggregator.timeline_pass(source, slots, intervals.duration)?;
                full_outcome(
                    occupancy_outcome(occ),
                    duration_outcome(&self.estimator, slots, timeline),
                )
            }
        };

        let vehicle_count = outcome.slots.iter().filter(|s| s.is_occupied).count();
        let report = RunReport {
            video_filename: video_filename.to_string(),
            processing_time: start.elapsed().as_secs_f64(),
            total_frames: info.total_frames,
            processed_frames: outcome.processed_frames,
            fps: info.fps,
            duration: info.duration_secs(),
            analysis_type: mode,
            timestamp: Local::now(),
            vehicle_count,
            occupancy_rate: occupancy_rate(vehicle_count, outcome.slots.len()),
            slot_detections: outcome.slots,
            confidence_scores: outcome.scores,
            processing_stats: ProcessingStats {
                total_frames: info.total_frames,
                processed_frames: outcome.processed_frames,
                frames_read: source.frames_read() - read_before,
                passes: outcome.passes,
            },
            detector: DetectorSummary {
                backend: self.detector.backend_name().to_string(),
                mode: self.detector.mode(),
                model_available: self.detector.is_model_available(),
                fallback_calls: self.detector.fallback_calls(),
            },
        };

        log::info!("processing completed in {:.2}s", report.processing_time);
        log::info!("vehicle count: {}", report.vehicle_count);
        log::info!("occupancy rate: {:.1}%", report.occupancy_rate);
        if report.detector.fallback_calls > 0 {
            log::warn!(
                "{} detector calls fell back to synthetic detections",
                report.detector.fallback_calls
            );
        }
        Ok(report)
    }

    fn check_inputs(&self, slots: &[SlotDefinition]) -> Result<(), AnalysisError> {
        if slots.is_empty() {
            return Err(AnalysisError::configuration(
                "slot configuration is required",
            ));
        }
        if self.intervals.occupancy == 0 || self.intervals.duration == 0 {
            return Err(AnalysisError::configuration(
                "frame interval must be at least 1",
            ));
        }
        Ok(())
    }
}

fn occupancy_outcome(pass: OccupancyPass) -> ModeOutcome {
    let slots: Vec<SlotReport> = pass
        .verdicts
        .into_iter()
        .map(|v| SlotReport {
            slot_id: v.slot_id,
            slot_number: v.slot_number,
            is_occupied: v.is_occupied,
            confidence: v.confidence,
            predicted_duration_seconds: None,
            occupancy_change_count: None,
            stability_score: None,
            vehicle_type: v.vehicle_type,
            detection_box: v.detection_box,
        })
        .collect();
    let avg = mean(slots.iter().map(|s| s.confidence));
    ModeOutcome {
        slots,
        scores: ConfidenceScores {
            overall: avg,
            vehicle_detection: avg,
            slot_classification: avg,
        },
        processed_frames: pass.processed_frames,
        passes: 1,
    }
}

fn duration_outcome(
    estimator: &DurationEstimator,
    slots: &[SlotDefinition],
    pass: TimelinePass,
) -> ModeOutcome {
    let reports: Vec<SlotReport> = slots
        .iter()
        .zip(&pass.timelines)
        .map(|(slot, timeline)| {
            let DurationEstimate {
                final_status,
                confidence,
                predicted_duration,
                changes,
                stability,
            } = estimator.estimate(timeline);
            SlotReport {
                slot_id: slot.id.clone(),
                slot_number: slot.slot_number.clone(),
                is_occupied: final_status,
                confidence,
                predicted_duration_seconds: Some(predicted_duration),
                occupancy_change_count: Some(changes),
                stability_score: Some(stability),
                vehicle_type: None,
                detection_box: None,
            }
        })
        .collect();
    ModeOutcome {
        scores: ConfidenceScores {
            overall: mean(reports.iter().map(|s| s.confidence)),
            vehicle_detection: DURATION_VEHICLE_CONFIDENCE,
            slot_classification: DURATION_SLOT_CONFIDENCE,
        },
        slots: reports,
        processed_frames: pass.processed_frames,
        passes: 1,
    }
}

/// Occupancy state and vehicle from the first pass, dwell from the second.
fn full_outcome(occupancy: ModeOutcome, duration: ModeOutcome) -> ModeOutcome {
    let slots = occupancy
        .slots
        .into_iter()
        .zip(&duration.slots)
        .map(|(occ, dur)| SlotReport {
            confidence: occ.confidence.max(dur.confidence),
            predicted_duration_seconds: dur
                .predicted_duration_seconds
                .or(Some(DEFAULT_BASE_DURATION_SECS)),
            occupancy_change_count: dur.occupancy_change_count,
            stability_score: dur.stability_score.or(Some(MERGE_DEFAULT_STABILITY)),
            ..occ
        })
        .collect();
    ModeOutcome {
        slots,
        scores: ConfidenceScores {
            overall: (occupancy.scores.overall + duration.scores.overall) / 2.0,
            vehicle_detection: FULL_VEHICLE_CONFIDENCE,
            slot_classification: FULL_SLOT_CONFIDENCE,
        },
        processed_frames: occupancy.processed_frames + duration.processed_frames,
        passes: 2,
    }
}

fn mean(values: impl Iterator<Item = f64>) -> f64 {
    let (sum, n) = values.fold((0.0, 0usize), |(sum, n), v| (sum + v, n + 1));
    if n == 0 {
        0.0
    } else {
        sum / n as f64
    }
}
