//! Parking-slot occupancy and dwell analysis.
//!
//! This crate estimates which parking slots in a fixed camera view are
//! occupied, how stable that state is, and how long a parked vehicle is
//! likely to stay. Vehicle detections are associated with slot rectangles by
//! overlap; slots no detection claims are scored from their pixels instead.
//!
//! # Pipeline
//!
//! frames → detector → classifier → aggregator → estimator → report
//!
//! # Module Structure
//!
//! - `geometry`: rectangles and overlap (IoU)
//! - `frame`: decoded RGB frames and grayscale slot crops
//! - `ingest`: frame sources (local files, `stub://` videos, memory)
//! - `detect`: detector backends and the vehicle detection adapter
//! - `slots`: slot configuration parsing and validation
//! - `classify`: per-frame slot occupancy
//! - `aggregate`: frame sampling and per-slot folding
//! - `estimate`: timeline stability and dwell prediction
//! - `region`: single-frame detection/slot association
//! - `analysis`: analysis modes and the `VideoProcessor`
//! - `report`: run reports, CSV/JSON output, error envelope
//! - `observe`: run progress hooks
//! - `config`: file and environment configuration
//!
//! # Example
//!
//! ```no_run
//! use slot_occupancy::{parse_slot_config, AnalysisMode, ProcessorConfig, VideoProcessor};
//!
//! # fn main() -> anyhow::Result<()> {
//! let slots = parse_slot_config(
//!     r#"[{"id": 1, "slot_number": 1, "coordinates": {"x": 50, "y": 50, "width": 100, "height": 200}}]"#,
//! )?;
//! let mut processor = VideoProcessor::from_config(&ProcessorConfig::load()?, None);
//! let report = processor.process_video("stub://lot_a?frames=300", &slots, AnalysisMode::Full)?;
//! println!("{}", report.to_json()?);
//! # Ok(())
//! # }
//! ```

pub mod aggregate;
pub mod analysis;
pub mod classify;
pub mod config;
pub mod detect;
pub mod error;
pub mod estimate;
pub mod frame;
pub mod geometry;
pub mod ingest;
pub mod observe;
pub mod region;
pub mod report;
pub mod slots;

pub use analysis::{AnalysisMode, Intervals, OutputFormat, VideoProcessor};
pub use classify::{ClassifierConfig, SlotClassifier, SlotFrameVerdict, VerdictSource};
pub use config::ProcessorConfig;
pub use detect::{
    Detection, DetectorBackend, DetectorConfig, DetectorMode, VehicleClass, VehicleDetector,
};
pub use error::AnalysisError;
pub use estimate::{DurationConfig, DurationEstimate, DurationEstimator, SlotTimeline};
pub use frame::Frame;
pub use geometry::{overlap, Rect};
pub use ingest::{FileConfig, FileSource, FrameSource, MemorySource, VideoInfo};
pub use observe::{LogObserver, RunObserver};
pub use region::{associate_regions, LotSnapshot};
pub use report::{ErrorEnvelope, LotContext, RunReport, SlotReport};
pub use slots::{parse_slot_config, validate_slots, SlotDefinition, SlotId};
