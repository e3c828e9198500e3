use anyhow::{anyhow, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::aggregate::{DEFAULT_DURATION_INTERVAL, DEFAULT_OCCUPANCY_INTERVAL};
use crate::analysis::Intervals;
use crate::classify::{ClassifierConfig, DEFAULT_HEURISTIC_THRESHOLD, DEFAULT_OCCUPANCY_OVERLAP};
use crate::detect::{DetectorConfig, DEFAULT_CONFIDENCE_THRESHOLD, DEFAULT_NMS_THRESHOLD};
use crate::estimate::{
    DurationConfig, DEFAULT_BASE_DURATION_SECS, DEFAULT_STABLE_DURATION_SECS,
    DEFAULT_STABLE_THRESHOLD,
};

pub const CONFIG_ENV: &str = "SLOT_OCCUPANCY_CONFIG";

#[derive(Debug, Deserialize, Default)]
struct ProcessorConfigFile {
    sampling: Option<SamplingConfigFile>,
    detector: Option<DetectorConfigFile>,
    classifier: Option<ClassifierConfigFile>,
    duration: Option<DurationConfigFile>,
}

#[derive(Debug, Deserialize, Default)]
struct SamplingConfigFile {
    occupancy_interval: Option<u64>,
    duration_interval: Option<u64>,
}

#[derive(Debug, Deserialize, Default)]
struct DetectorConfigFile {
    confidence_threshold: Option<f64>,
    nms_threshold: Option<f64>,
    model_path: Option<PathBuf>,
}

#[derive(Debug, Deserialize, Default)]
struct ClassifierConfigFile {
    overlap_threshold: Option<f64>,
    heuristic_threshold: Option<f64>,
}

#[derive(Debug, Deserialize, Default)]
struct DurationConfigFile {
    stable_threshold: Option<f64>,
    base_duration_secs: Option<u64>,
    stable_duration_secs: Option<u64>,
}

/// Runtime settings for a `VideoProcessor`.
///
/// Loaded from the JSON file named by `SLOT_OCCUPANCY_CONFIG` (optional),
/// then overridden from the environment.
#[derive(Debug, Clone, PartialEq)]
pub struct ProcessorConfig {
    pub intervals: Intervals,
    pub detector: DetectorConfig,
    pub model_path: Option<PathBuf>,
    pub classifier: ClassifierConfig,
    pub duration: DurationConfig,
}

impl Default for ProcessorConfig {
    fn default() -> Self {
        Self {
            intervals: Intervals::default(),
            detector: DetectorConfig::default(),
            model_path: None,
            classifier: ClassifierConfig::default(),
            duration: DurationConfig::default(),
        }
    }
}

impl ProcessorConfig {
    pub fn load() -> Result<Self> {
        let config_path = std::env::var(CONFIG_ENV).ok();
        let file_cfg = match config_path.as_deref() {
            Some(path) if !path.trim().is_empty() => Some(read_config_file(Path::new(path))?),
            _ => None,
        };
        let mut cfg = Self::from_file(file_cfg.unwrap_or_default());
        cfg.apply_env()?;
        cfg.validate()?;
        Ok(cfg)
    }

    fn from_file(file: ProcessorConfigFile) -> Self {
        let sampling = file.sampling.unwrap_or_default();
        let detector = file.detector.unwrap_or_default();
        let classifier = file.classifier.unwrap_or_default();
        let duration = file.duration.unwrap_or_default();
        Self {
            intervals: Intervals {
                occupancy: sampling
                    .occupancy_interval
                    .unwrap_or(DEFAULT_OCCUPANCY_INTERVAL),
                duration: sampling
                    .duration_interval
                    .unwrap_or(DEFAULT_DURATION_INTERVAL),
            },
            detector: DetectorConfig {
                confidence_threshold: detector
                    .confidence_threshold
                    .unwrap_or(DEFAULT_CONFIDENCE_THRESHOLD),
                nms_threshold: detector.nms_threshold.unwrap_or(DEFAULT_NMS_THRESHOLD),
            },
            model_path: detector.model_path,
            classifier: ClassifierConfig {
                overlap_threshold: classifier
                    .overlap_threshold
                    .unwrap_or(DEFAULT_OCCUPANCY_OVERLAP),
                heuristic_threshold: classifier
                    .heuristic_threshold
                    .unwrap_or(DEFAULT_HEURISTIC_THRESHOLD),
                ..ClassifierConfig::default()
            },
            duration: DurationConfig {
                stable_threshold: duration.stable_threshold.unwrap_or(DEFAULT_STABLE_THRESHOLD),
                base_duration_secs: duration
                    .base_duration_secs
                    .unwrap_or(DEFAULT_BASE_DURATION_SECS),
                stable_duration_secs: duration
                    .stable_duration_secs
                    .unwrap_or(DEFAULT_STABLE_DURATION_SECS),
                ..DurationConfig::default()
            },
        }
    }

    fn apply_env(&mut self) -> Result<()> {
        if let Some(interval) = env_parse::<u64>("SLOT_OCCUPANCY_OCCUPANCY_INTERVAL")? {
            self.intervals.occupancy = interval;
        }
        if let Some(interval) = env_parse::<u64>("SLOT_OCCUPANCY_DURATION_INTERVAL")? {
            self.intervals.duration = interval;
        }
        if let Some(threshold) = env_parse::<f64>("SLOT_OCCUPANCY_CONFIDENCE")? {
            self.detector.confidence_threshold = threshold;
        }
        if let Some(threshold) = env_parse::<f64>("SLOT_OCCUPANCY_NMS")? {
            self.detector.nms_threshold = threshold;
        }
        if let Ok(path) = std::env::var("SLOT_OCCUPANCY_MODEL_PATH") {
            if !path.trim().is_empty() {
                self.model_path = Some(PathBuf::from(path));
            }
        }
        Ok(())
    }

    fn validate(&self) -> Result<()> {
        if self.intervals.occupancy == 0 || self.intervals.duration == 0 {
            return Err(anyhow!("frame intervals must be at least 1"));
        }
        for (name, value) in [
            ("confidence threshold", self.detector.confidence_threshold),
            ("NMS threshold", self.detector.nms_threshold),
        ] {
            if !(0.1..=1.0).contains(&value) {
                return Err(anyhow!("{} must be within [0.1, 1.0], got {}", name, value));
            }
        }
        for (name, value) in [
            ("overlap threshold", self.classifier.overlap_threshold),
            ("heuristic threshold", self.classifier.heuristic_threshold),
            ("stable threshold", self.duration.stable_threshold),
        ] {
            if !(0.0..=1.0).contains(&value) {
                return Err(anyhow!("{} must be within [0, 1], got {}", name, value));
            }
        }
        Ok(())
    }
}

fn env_parse<T: std::str::FromStr>(name: &str) -> Result<Option<T>> {
    match std::env::var(name) {
        Ok(raw) if !raw.trim().is_empty() => raw
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| anyhow!("{} has an invalid value: {}", name, raw)),
        _ => Ok(None),
    }
}

fn read_config_file(path: &Path) -> Result<ProcessorConfigFile> {
    let raw = std::fs::read_to_string(path)
        .map_err(|e| anyhow!("failed to read config file {}: {}", path.display(), e))?;
    let cfg = serde_json::from_str(&raw)
        .map_err(|e| anyhow!("invalid config file {}: {}", path.display(), e))?;
    Ok(cfg)
}
