//! Run reports and their output formats.

use std::fmt::Write as _;
use std::path::Path;

use chrono::{DateTime, Local};
use serde::Serialize;

use crate::analysis::{AnalysisMode, OutputFormat};
use crate::detect::{DetectorMode, VehicleClass};
use crate::geometry::Rect;
use crate::slots::SlotId;

/// Final state of one slot.
///
/// Duration fields are present only when a timeline pass ran; vehicle
/// fields only when an occupancy pass ran.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct SlotReport {
    pub slot_id: SlotId,
    pub slot_number: SlotId,
    pub is_occupied: bool,
    pub confidence: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub predicted_duration_seconds: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub occupancy_change_count: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stability_score: Option<f64>,
    pub vehicle_type: Option<VehicleClass>,
    pub detection_box: Option<Rect>,
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct ConfidenceScores {
    pub overall: f64,
    pub vehicle_detection: f64,
    pub slot_classification: f64,
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct ProcessingStats {
    pub total_frames: u64,
    /// Sampled frames, summed over passes.
    pub processed_frames: u64,
    /// Decoded frames, summed over passes.
    pub frames_read: u64,
    pub passes: u32,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct DetectorSummary {
    pub backend: String,
    pub mode: DetectorMode,
    pub model_available: bool,
    pub fallback_calls: u64,
}

#[derive(Clone, Debug, Serialize)]
pub struct RunReport {
    pub video_filename: String,
    /// Wall-clock seconds.
    pub processing_time: f64,
    pub total_frames: u64,
    pub processed_frames: u64,
    pub fps: f64,
    /// Video length in seconds.
    pub duration: f64,
    pub analysis_type: AnalysisMode,
    pub timestamp: DateTime<Local>,
    pub slot_detections: Vec<SlotReport>,
    pub vehicle_count: usize,
    /// Percentage of occupied slots, one decimal.
    pub occupancy_rate: f64,
    pub confidence_scores: ConfidenceScores,
    pub processing_stats: ProcessingStats,
    pub detector: DetectorSummary,
}

impl RunReport {
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }

    pub fn to_json_pretty(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }

    /// One header row plus one row per slot.
    pub fn to_csv(&self) -> String {
        let mut out = String::from(CSV_HEADER);
        out.push('\n');
        for slot in &self.slot_detections {
            let (x, y, w, h) = match slot.detection_box {
                Some(r) => (
                    r.x.to_string(),
                    r.y.to_string(),
                    r.width.to_string(),
                    r.height.to_string(),
                ),
                None => Default::default(),
            };
            let fields = [
                csv_field(&slot.slot_id.to_string()),
                csv_field(&slot.slot_number.to_string()),
                slot.is_occupied.to_string(),
                slot.confidence.to_string(),
                opt(slot.predicted_duration_seconds),
                opt(slot.occupancy_change_count),
                opt(slot.stability_score),
                slot.vehicle_type.map(|v| v.label().to_string()).unwrap_or_default(),
                x,
                y,
                w,
                h,
            ];
            let _ = writeln!(out, "{}", fields.join(","));
        }
        out
    }

    pub fn render(&self, format: OutputFormat) -> serde_json::Result<String> {
        match format {
            OutputFormat::Json => self.to_json(),
            OutputFormat::Csv => Ok(self.to_csv()),
        }
    }

    pub fn occupied_slots(&self) -> usize {
        self.slot_detections.iter().filter(|s| s.is_occupied).count()
    }
}

const CSV_HEADER: &str = "slot_id,slot_number,is_occupied,confidence,predicted_duration_seconds,\
occupancy_change_count,stability_score,vehicle_type,box_x,box_y,box_width,box_height";

fn opt<T: ToString>(value: Option<T>) -> String {
    value.map(|v| v.to_string()).unwrap_or_default()
}

fn csv_field(value: &str) -> String {
    if value.contains([',', '"', '\n', '\r']) {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        value.to_string()
    }
}

/// `occupied / total * 100`, rounded to one decimal; 0 for no slots.
pub fn occupancy_rate(occupied: usize, total: usize) -> f64 {
    if total == 0 {
        return 0.0;
    }
    (occupied as f64 / total as f64 * 1000.0).round() / 10.0
}

/// File name component of a video path, or the path itself for URLs.
pub fn video_filename(path: &str) -> String {
    Path::new(path)
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.to_string())
}

/// Body printed in place of a report when a run fails.
#[derive(Clone, Debug, Serialize)]
pub struct ErrorEnvelope {
    pub error: String,
    pub video_filename: String,
    pub timestamp: DateTime<Local>,
    pub success: bool,
}

impl ErrorEnvelope {
    pub fn new(error: impl std::fmt::Display, video_path: Option<&str>) -> Self {
        Self {
            error: error.to_string(),
            video_filename: video_path
                .filter(|p| !p.is_empty())
                .map(video_filename)
                .unwrap_or_else(|| "unknown".to_string()),
            timestamp: Local::now(),
            success: false,
        }
    }
}

/// Read-only lot summary handed to conversational front ends.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct LotContext {
    pub name: String,
    pub total_slots: usize,
    pub available_slots: usize,
    pub occupancy_rate: f64,
}

impl LotContext {
    pub fn from_report(name: impl Into<String>, report: &RunReport) -> Self {
        let total_slots = report.slot_detections.len();
        Self {
            name: name.into(),
            total_slots,
            available_slots: total_slots - report.occupied_slots(),
            occupancy_rate: report.occupancy_rate,
        }
    }
}
