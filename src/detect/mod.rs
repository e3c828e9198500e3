mod adapter;
mod backend;
mod backends;
mod nms;
mod result;

pub use adapter::{
    DetectorConfig, DetectorMode, ModelInfo, VehicleDetector, DEFAULT_CONFIDENCE_THRESHOLD,
    DEFAULT_NMS_THRESHOLD,
};
pub use backend::DetectorBackend;
pub use backends::SyntheticBackend;
#[cfg(feature = "backend-tract")]
pub use backends::TractBackend;
pub use nms::non_max_suppression;
pub use result::{Detection, RawDetection, VehicleClass};
