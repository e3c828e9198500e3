use std::path::{Path, PathBuf};

use serde::Serialize;

use crate::detect::backend::DetectorBackend;
use crate::detect::backends::SyntheticBackend;
use crate::detect::nms::non_max_suppression;
use crate::detect::result::{Detection, RawDetection, VehicleClass};
use crate::frame::Frame;

pub const DEFAULT_CONFIDENCE_THRESHOLD: f64 = 0.5;
pub const DEFAULT_NMS_THRESHOLD: f64 = 0.4;

const MIN_THRESHOLD: f64 = 0.1;
const MAX_THRESHOLD: f64 = 1.0;

/// Thresholds applied to every backend's output.
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct DetectorConfig {
    pub confidence_threshold: f64,
    pub nms_threshold: f64,
}

impl Default for DetectorConfig {
    fn default() -> Self {
        Self {
            confidence_threshold: DEFAULT_CONFIDENCE_THRESHOLD,
            nms_threshold: DEFAULT_NMS_THRESHOLD,
        }
    }
}

/// Which capability the adapter was built with.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DetectorMode {
    /// A real model backend produces the detections.
    Model,
    /// Randomized placeholder detections only.
    Synthetic,
}

enum Capability {
    Model(Box<dyn DetectorBackend>),
    Synthetic,
}

/// Summary of the adapter for reports and diagnostics.
#[derive(Clone, Debug, Serialize)]
pub struct ModelInfo {
    pub backend: String,
    pub mode: DetectorMode,
    pub model_path: Option<PathBuf>,
    pub model_available: bool,
    pub confidence_threshold: f64,
    pub nms_threshold: f64,
    pub vehicle_classes: Vec<(u32, VehicleClass)>,
    pub fallback_calls: u64,
}

/// Detection capability adapter.
///
/// Normalizes backend output to vehicle detections: non-vehicle classes are
/// dropped, boxes under the confidence threshold are dropped, and overlapping
/// boxes are suppressed. The mode is fixed at construction. A model backend
/// that fails on a call degrades to synthetic output for that call only.
pub struct VehicleDetector {
    capability: Capability,
    synthetic: SyntheticBackend,
    config: DetectorConfig,
    fallback_calls: u64,
}

impl VehicleDetector {
    pub fn synthetic(config: DetectorConfig) -> Self {
        Self::synthetic_seeded(config, None)
    }

    pub fn synthetic_seeded(config: DetectorConfig, seed: Option<u64>) -> Self {
        Self {
            capability: Capability::Synthetic,
            synthetic: synthetic_backend(seed),
            config,
            fallback_calls: 0,
        }
    }

    pub fn with_backend(backend: Box<dyn DetectorBackend>, config: DetectorConfig) -> Self {
        Self::with_backend_seeded(backend, config, None)
    }

    pub fn with_backend_seeded(
        backend: Box<dyn DetectorBackend>,
        config: DetectorConfig,
        seed: Option<u64>,
    ) -> Self {
        Self {
            capability: Capability::Model(backend),
            synthetic: synthetic_backend(seed),
            config,
            fallback_calls: 0,
        }
    }

    /// Build from an optional model file.
    ///
    /// Without a loadable model the adapter runs in synthetic mode and says so
    /// in the log; it never fails construction.
    pub fn load(model_path: Option<&Path>, config: DetectorConfig, seed: Option<u64>) -> Self {
        let Some(path) = model_path else {
            log::warn!("no detection model configured, using synthetic detections");
            return Self::synthetic_seeded(config, seed);
        };
        if !path.exists() {
            log::warn!(
                "detection model {} not found, using synthetic detections",
                path.display()
            );
            return Self::synthetic_seeded(config, seed);
        }

        #[cfg(feature = "backend-tract")]
        {
            match crate::detect::backends::TractBackend::new(path) {
                Ok(mut backend) => {
                    if let Err(e) = backend.warm_up() {
                        log::warn!("detector warm-up failed: {:#}", e);
                    }
                    log::info!("loaded detection model {}", path.display());
                    Self::with_backend_seeded(Box::new(backend), config, seed)
                }
                Err(e) => {
                    log::error!("failed to load detection model: {:#}", e);
                    Self::synthetic_seeded(config, seed)
                }
            }
        }
        #[cfg(not(feature = "backend-tract"))]
        {
            log::warn!(
                "model {} ignored: model inference requires the backend-tract feature",
                path.display()
            );
            Self::synthetic_seeded(config, seed)
        }
    }

    pub fn mode(&self) -> DetectorMode {
        match self.capability {
            Capability::Model(_) => DetectorMode::Model,
            Capability::Synthetic => DetectorMode::Synthetic,
        }
    }

    /// True when detections come from a real model rather than the stub.
    pub fn is_model_available(&self) -> bool {
        self.mode() == DetectorMode::Model
    }

    pub fn backend_name(&self) -> &'static str {
        match &self.capability {
            Capability::Model(backend) => backend.name(),
            Capability::Synthetic => self.synthetic.name(),
        }
    }

    /// Calls where the model failed and synthetic output was substituted.
    pub fn fallback_calls(&self) -> u64 {
        self.fallback_calls
    }

    pub fn config(&self) -> DetectorConfig {
        self.config
    }

    pub fn set_confidence_threshold(&mut self, threshold: f64) {
        self.config.confidence_threshold = threshold.clamp(MIN_THRESHOLD, MAX_THRESHOLD);
        log::info!(
            "confidence threshold set to {}",
            self.config.confidence_threshold
        );
    }

    pub fn set_nms_threshold(&mut self, threshold: f64) {
        self.config.nms_threshold = threshold.clamp(MIN_THRESHOLD, MAX_THRESHOLD);
        log::info!("NMS threshold set to {}", self.config.nms_threshold);
    }

    pub fn model_info(&self) -> ModelInfo {
        let model_path = match &self.capability {
            Capability::Model(backend) => backend.model_path().map(Path::to_path_buf),
            Capability::Synthetic => None,
        };
        ModelInfo {
            backend: self.backend_name().to_string(),
            mode: self.mode(),
            model_path,
            model_available: self.is_model_available(),
            confidence_threshold: self.config.confidence_threshold,
            nms_threshold: self.config.nms_threshold,
            vehicle_classes: VehicleClass::ALL
                .iter()
                .map(|class| (class.coco_id(), *class))
                .collect(),
            fallback_calls: self.fallback_calls,
        }
    }

    /// Detect vehicles in one frame.
    ///
    /// Model output is filtered and suppressed; synthetic output, including a
    /// per-call fallback, is passed through as generated.
    pub fn detect(&mut self, frame: &Frame) -> Vec<Detection> {
        let (width, height) = (frame.width(), frame.height());
        let model_output = match &mut self.capability {
            Capability::Model(backend) => match backend.detect(frame.pixels(), width, height) {
                Ok(raw) => Some(raw),
                Err(e) => {
                    self.fallback_calls += 1;
                    log::warn!(
                        "detection failed on frame {}, using synthetic detections: {:#}",
                        frame.index,
                        e
                    );
                    None
                }
            },
            Capability::Synthetic => None,
        };
        let detections = match model_output {
            Some(raw) => self.normalize(raw),
            None => as_detections(self.synthetic.generate(width, height)),
        };
        log::debug!(
            "frame {}: {} vehicle detections",
            frame.index,
            detections.len()
        );
        detections
    }

    /// Class filter, confidence threshold and suppression.
    pub fn normalize(&self, raw: Vec<RawDetection>) -> Vec<Detection> {
        let candidates = raw
            .into_iter()
            .filter(|det| det.confidence >= self.config.confidence_threshold)
            .filter_map(|det| {
                VehicleClass::from_coco_id(det.class_id)
                    .map(|class| Detection::new(det.rect, det.confidence, class))
            })
            .collect();
        non_max_suppression(candidates, self.config.nms_threshold)
    }
}

fn as_detections(raw: Vec<RawDetection>) -> Vec<Detection> {
    raw.into_iter()
        .filter_map(|det| {
            VehicleClass::from_coco_id(det.class_id)
                .map(|class| Detection::new(det.rect, det.confidence, class))
        })
        .collect()
}

fn synthetic_backend(seed: Option<u64>) -> SyntheticBackend {
    match seed {
        Some(seed) => SyntheticBackend::with_seed(seed),
        None => SyntheticBackend::new(),
    }
}
