use serde::{Deserialize, Serialize};

use crate::geometry::Rect;

/// Raw backend output, before class filtering and suppression.
#[derive(Clone, Debug, PartialEq)]
pub struct RawDetection {
    /// Bounding box in frame pixels.
    pub rect: Rect,
    pub confidence: f64,
    /// COCO class id as reported by the model.
    pub class_id: u32,
}

/// Normalized vehicle detection.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Detection {
    pub rect: Rect,
    pub confidence: f64,
    pub class: VehicleClass,
}

impl Detection {
    pub fn new(rect: Rect, confidence: f64, class: VehicleClass) -> Self {
        Self {
            rect,
            confidence,
            class,
        }
    }
}

/// Vehicle classes recognised by the adapter. Everything else is dropped.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VehicleClass {
    Car,
    Motorcycle,
    Bus,
    Truck,
}

impl VehicleClass {
    pub const ALL: [VehicleClass; 4] = [
        VehicleClass::Car,
        VehicleClass::Motorcycle,
        VehicleClass::Bus,
        VehicleClass::Truck,
    ];

    /// Map a COCO class id to a vehicle class.
    pub fn from_coco_id(class_id: u32) -> Option<Self> {
        match class_id {
            2 => Some(Self::Car),
            3 => Some(Self::Motorcycle),
            5 => Some(Self::Bus),
            7 => Some(Self::Truck),
            _ => None,
        }
    }

    pub fn coco_id(self) -> u32 {
        match self {
            Self::Car => 2,
            Self::Motorcycle => 3,
            Self::Bus => 5,
            Self::Truck => 7,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Car => "car",
            Self::Motorcycle => "motorcycle",
            Self::Bus => "bus",
            Self::Truck => "truck",
        }
    }
}

impl std::fmt::Display for VehicleClass {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn coco_ids_round_trip_for_vehicles_only() {
        for class in VehicleClass::ALL {
            assert_eq!(VehicleClass::from_coco_id(class.coco_id()), Some(class));
        }
        // person, bicycle, airplane, train
        for id in [0, 1, 4, 6] {
            assert_eq!(VehicleClass::from_coco_id(id), None);
        }
    }
}
