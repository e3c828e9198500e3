use anyhow::{anyhow, Result};

use slot_occupancy::detect::RawDetection;
use slot_occupancy::observe::NoopObserver;
use slot_occupancy::{
    AnalysisError, AnalysisMode, DetectorBackend, DetectorConfig, FrameSource, LotContext,
    MemorySource, OutputFormat, Rect, SlotDefinition, SlotId, VehicleClass, VehicleDetector,
    VideoProcessor,
};

/// The stub video paints a dark block in the left bay during frames 50-99,
/// 150-199 and 250-299.
const STUB: &str = "stub://lot_a?frames=300&fps=30&width=640&height=480";

const LEFT_BAY: Rect = Rect {
    x: 20.0,
    y: 60.0,
    width: 120.0,
    height: 360.0,
};

/// Reports a car over the left bay whenever its centre pixel is dark.
struct DarkBayBackend;

impl DetectorBackend for DarkBayBackend {
    fn name(&self) -> &'static str {
        "dark-bay"
    }

    fn detect(&mut self, pixels: &[u8], width: u32, _height: u32) -> Result<Vec<RawDetection>> {
        let (cx, cy) = (80usize, 240usize);
        let offset = (cy * width as usize + cx) * 3;
        let red = pixels
            .get(offset)
            .copied()
            .ok_or_else(|| anyhow!("frame too small"))?;
        if red > 60 {
            return Ok(Vec::new());
        }
        Ok(vec![RawDetection {
            rect: LEFT_BAY,
            confidence: 0.9,
            class_id: VehicleClass::Car.coco_id(),
        }])
    }
}

struct FailingBackend;

impl DetectorBackend for FailingBackend {
    fn name(&self) -> &'static str {
        "failing"
    }

    fn detect(&mut self, _pixels: &[u8], _w: u32, _h: u32) -> Result<Vec<RawDetection>> {
        Err(anyhow!("inference runtime unavailable"))
    }
}

fn lot_slots() -> Vec<SlotDefinition> {
    vec![
        SlotDefinition::new(1, 1, LEFT_BAY),
        SlotDefinition::new("B-2", 2, Rect::new(180.0, 60.0, 120.0, 360.0)),
    ]
}

fn dark_bay_processor() -> VideoProcessor {
    let detector =
        VehicleDetector::with_backend(Box::new(DarkBayBackend), DetectorConfig::default());
    VideoProcessor::new(detector).with_observer(Box::new(NoopObserver))
}

fn synthetic_processor(seed: u64) -> VideoProcessor {
    let detector = VehicleDetector::synthetic_seeded(DetectorConfig::default(), Some(seed));
    VideoProcessor::new(detector).with_observer(Box::new(NoopObserver))
}

#[test]
fn occupancy_mode_samples_every_thirtieth_frame() {
    let report = synthetic_processor(1)
        .process_video(STUB, &lot_slots(), AnalysisMode::Occupancy)
        .expect("occupancy run");
    assert_eq!(report.total_frames, 300);
    assert_eq!(report.processed_frames, 10);
    assert_eq!(report.processing_stats.frames_read, 300);
    assert_eq!(report.fps, 30.0);
    assert_eq!(report.duration, 10.0);
    assert_eq!(report.video_filename, "lot_a?frames=300&fps=30&width=640&height=480");
    assert_eq!(report.slot_detections.len(), 2);
    assert_eq!(report.detector.backend, "synthetic");
    assert!(!report.detector.model_available);
}

#[test]
fn empty_slot_list_fails_before_any_frame_is_read() {
    let mut source = MemorySource::uniform(30, 64, 64, [128, 128, 128], 30.0);
    let err = synthetic_processor(1)
        .process_source(&mut source, "mem", &[], AnalysisMode::Full)
        .unwrap_err();
    assert!(err.is_configuration());
    assert_eq!(source.frames_read(), 0);

    // checked before the path is even looked at
    let err = synthetic_processor(1)
        .process_video("/does/not/exist.mp4", &[], AnalysisMode::Full)
        .unwrap_err();
    assert!(err.is_configuration());
}

#[test]
fn unusable_videos_are_access_errors() {
    let missing = synthetic_processor(1)
        .process_video("/does/not/exist.mp4", &lot_slots(), AnalysisMode::Occupancy)
        .unwrap_err();
    assert!(matches!(missing, AnalysisError::VideoAccess { .. }));

    let text = tempfile::Builder::new()
        .suffix(".txt")
        .tempfile()
        .expect("temp file");
    let path = text.path().to_string_lossy().into_owned();
    let err = synthetic_processor(1)
        .process_video(&path, &lot_slots(), AnalysisMode::Occupancy)
        .unwrap_err();
    assert!(err.to_string().contains("unsupported video extension"));

    let empty = synthetic_processor(1)
        .process_video("stub://empty?frames=0", &lot_slots(), AnalysisMode::Occupancy)
        .unwrap_err();
    assert!(matches!(empty, AnalysisError::VideoAccess { .. }));
}

#[test]
fn slot_outside_the_frame_is_a_configuration_error() {
    let slots = vec![SlotDefinition::new(1, 1, Rect::new(600.0, 0.0, 100.0, 100.0))];
    let err = synthetic_processor(1)
        .process_video(STUB, &slots, AnalysisMode::Occupancy)
        .unwrap_err();
    assert!(err.is_configuration());
}

#[test]
fn duration_mode_tracks_flips_in_the_left_bay() {
    let report = dark_bay_processor()
        .process_video(STUB, &lot_slots(), AnalysisMode::Duration)
        .expect("duration run");
    assert_eq!(report.processed_frames, 20);

    // sampled every 15 frames: occupied in 10 of 20 samples, 5 flips
    let left = &report.slot_detections[0];
    assert!(!left.is_occupied);
    assert_eq!(left.occupancy_change_count, Some(5));
    assert_eq!(left.stability_score, Some(0.75));
    assert_eq!(left.predicted_duration_seconds, Some(0));

    let right = &report.slot_detections[1];
    assert_eq!(right.slot_id, SlotId::Text("B-2".into()));
    assert_eq!(right.occupancy_change_count, Some(0));
    assert_eq!(right.stability_score, Some(1.0));

    assert_eq!(report.confidence_scores.vehicle_detection, 0.85);
    assert_eq!(report.confidence_scores.slot_classification, 0.80);
}

#[test]
fn full_mode_merges_both_passes() {
    let report = dark_bay_processor()
        .process_video(STUB, &lot_slots(), AnalysisMode::Full)
        .expect("full run");
    assert_eq!(report.processing_stats.passes, 2);
    assert_eq!(report.processed_frames, 10 + 20);
    assert_eq!(report.processing_stats.frames_read, 600);

    let left = &report.slot_detections[0];
    assert!(left.is_occupied);
    assert_eq!(left.confidence, 0.9);
    assert_eq!(left.vehicle_type, Some(VehicleClass::Car));
    assert_eq!(left.detection_box, Some(LEFT_BAY));
    assert_eq!(left.predicted_duration_seconds, Some(0));
    assert_eq!(left.stability_score, Some(0.75));

    assert!(!report.slot_detections[1].is_occupied);
    assert_eq!(report.vehicle_count, 1);
    assert_eq!(report.occupancy_rate, 50.0);
    assert_eq!(report.confidence_scores.vehicle_detection, 0.88);
    assert_eq!(report.confidence_scores.slot_classification, 0.82);

    let lot = LotContext::from_report("North", &report);
    assert_eq!(lot.total_slots, 2);
    assert_eq!(lot.available_slots, 1);
    assert_eq!(lot.occupancy_rate, 50.0);
}

#[test]
fn failing_model_degrades_per_call() {
    let detector = VehicleDetector::with_backend_seeded(
        Box::new(FailingBackend),
        DetectorConfig::default(),
        Some(4),
    );
    let report = VideoProcessor::new(detector)
        .with_observer(Box::new(NoopObserver))
        .process_video(STUB, &lot_slots(), AnalysisMode::Occupancy)
        .expect("run survives detector failures");
    assert_eq!(report.detector.backend, "failing");
    assert!(report.detector.model_available);
    assert_eq!(report.detector.fallback_calls, 10);
}

#[test]
fn seeded_runs_are_reproducible() {
    let a = synthetic_processor(42)
        .process_video(STUB, &lot_slots(), AnalysisMode::Full)
        .expect("first run");
    let b = synthetic_processor(42)
        .process_video(STUB, &lot_slots(), AnalysisMode::Full)
        .expect("second run");
    assert_eq!(a.slot_detections, b.slot_detections);
    assert_eq!(a.confidence_scores, b.confidence_scores);
}

#[test]
fn csv_output_has_one_row_per_slot() {
    let report = dark_bay_processor()
        .process_video(STUB, &lot_slots(), AnalysisMode::Full)
        .expect("full run");
    let csv = report.render(OutputFormat::Csv).expect("csv");
    let rows: Vec<&str> = csv.lines().collect();
    assert_eq!(rows.len(), 3);
    assert!(rows[1].starts_with("1,1,true,0.9,0,5,0.75,car,20,60,120,360"));
    assert!(rows[2].starts_with("B-2,2,false,"));

    let json: serde_json::Value =
        serde_json::from_str(&report.render(OutputFormat::Json).expect("json")).expect("parse");
    assert_eq!(json["analysis_type"], "full");
    assert_eq!(json["slot_detections"][1]["slot_id"], "B-2");
}
