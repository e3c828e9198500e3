//! Parking-slot configuration.
//!
//! Slots arrive as a JSON array:
//!
//! ```json
//! [{"id": 1, "slot_number": 1, "coordinates": {"x": 50, "y": 50, "width": 100, "height": 200}}]
//! ```
//!
//! Parsing checks structure and types. Geometry against the frame is checked
//! separately once the video dimensions are known.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::AnalysisError;
use crate::geometry::Rect;

const REQUIRED_FIELDS: [&str; 3] = ["id", "slot_number", "coordinates"];
const REQUIRED_COORDS: [&str; 4] = ["x", "y", "width", "height"];

/// Slot identifier as supplied by the caller. Serialized back unchanged.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SlotId {
    Number(i64),
    Text(String),
}

impl fmt::Display for SlotId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Number(n) => write!(f, "{}", n),
            Self::Text(s) => f.write_str(s),
        }
    }
}

impl From<i64> for SlotId {
    fn from(value: i64) -> Self {
        Self::Number(value)
    }
}

impl From<i32> for SlotId {
    fn from(value: i32) -> Self {
        Self::Number(value.into())
    }
}

impl From<u32> for SlotId {
    fn from(value: u32) -> Self {
        Self::Number(value.into())
    }
}

impl From<String> for SlotId {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl From<&str> for SlotId {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

/// One parking space.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SlotDefinition {
    pub id: SlotId,
    pub slot_number: SlotId,
    #[serde(rename = "coordinates")]
    pub rect: Rect,
}

impl SlotDefinition {
    pub fn new(id: impl Into<SlotId>, slot_number: impl Into<SlotId>, rect: Rect) -> Self {
        Self {
            id: id.into(),
            slot_number: slot_number.into(),
            rect,
        }
    }
}

/// Parse and structurally validate a slot configuration JSON string.
pub fn parse_slot_config(raw: &str) -> Result<Vec<SlotDefinition>, AnalysisError> {
    let value: Value = serde_json::from_str(raw).map_err(|e| {
        AnalysisError::configuration(format!("invalid JSON in slot configuration: {}", e))
    })?;
    let entries = value
        .as_array()
        .ok_or_else(|| AnalysisError::configuration("slot configuration must be a list"))?;

    entries
        .iter()
        .enumerate()
        .map(|(i, entry)| parse_slot(i, entry))
        .collect()
}

fn parse_slot(index: usize, entry: &Value) -> Result<SlotDefinition, AnalysisError> {
    let obj = entry.as_object().ok_or_else(|| {
        AnalysisError::configuration(format!("slot #{} must be an object", index))
    })?;
    for field in REQUIRED_FIELDS {
        if !obj.contains_key(field) {
            return Err(AnalysisError::configuration(format!(
                "slot #{}: missing required field: {}",
                index, field
            )));
        }
    }

    let coords = obj["coordinates"].as_object().ok_or_else(|| {
        AnalysisError::configuration(format!("slot #{}: coordinates must be an object", index))
    })?;
    let mut values = [0.0f64; 4];
    for (slot, name) in values.iter_mut().zip(REQUIRED_COORDS) {
        let v = coords.get(name).ok_or_else(|| {
            AnalysisError::configuration(format!("slot #{}: missing coordinate: {}", index, name))
        })?;
        *slot = v.as_f64().ok_or_else(|| {
            AnalysisError::configuration(format!(
                "slot #{}: invalid coordinate type: {}",
                index, name
            ))
        })?;
    }

    Ok(SlotDefinition {
        id: parse_id(index, "id", &obj["id"])?,
        slot_number: parse_id(index, "slot_number", &obj["slot_number"])?,
        rect: Rect::new(values[0], values[1], values[2], values[3]),
    })
}

fn parse_id(index: usize, field: &str, value: &Value) -> Result<SlotId, AnalysisError> {
    match value {
        Value::Number(n) => n.as_i64().map(SlotId::Number).ok_or_else(|| {
            AnalysisError::configuration(format!("slot #{}: {} must be an integer", index, field))
        }),
        Value::String(s) => Ok(SlotId::Text(s.clone())),
        _ => Err(AnalysisError::configuration(format!(
            "slot #{}: {} must be a number or string",
            index, field
        ))),
    }
}

/// Check every slot against the frame: positive size and fully inside it.
pub fn validate_slots(
    slots: &[SlotDefinition],
    frame_width: u32,
    frame_height: u32,
) -> Result<(), AnalysisError> {
    if slots.is_empty() {
        return Err(AnalysisError::configuration(
            "slot configuration is required",
        ));
    }
    for slot in slots {
        if slot.rect.is_degenerate() {
            return Err(AnalysisError::configuration(format!(
                "slot {}: width and height must be positive",
                slot.id
            )));
        }
        if !slot.rect.fits_within(frame_width, frame_height) {
            return Err(AnalysisError::configuration(format!(
                "slot {}: region {:?} exceeds frame {}x{}",
                slot.id, slot.rect, frame_width, frame_height
            )));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_numeric_and_string_ids() {
        let slots = parse_slot_config(
            r#"[
                {"id": 1, "slot_number": 1, "coordinates": {"x": 50, "y": 50, "width": 100, "height": 200}},
                {"id": "B-2", "slot_number": 2, "coordinates": {"x": 200.5, "y": 50, "width": 100, "height": 200}}
            ]"#,
        )
        .unwrap();
        assert_eq!(slots.len(), 2);
        assert_eq!(slots[0].id, SlotId::Number(1));
        assert_eq!(slots[1].id, SlotId::Text("B-2".into()));
        assert_eq!(slots[1].rect.x, 200.5);
    }

    #[test]
    fn rejects_malformed_configs() {
        let cases = [
            ("not json", "invalid JSON"),
            (r#"{"id": 1}"#, "must be a list"),
            (r#"[{"slot_number": 1, "coordinates": {}}]"#, "missing required field: id"),
            (
                r#"[{"id": 1, "slot_number": 1, "coordinates": {"x": 1, "y": 1, "width": 5}}]"#,
                "missing coordinate: height",
            ),
            (
                r#"[{"id": 1, "slot_number": 1, "coordinates": {"x": "1", "y": 1, "width": 5, "height": 5}}]"#,
                "invalid coordinate type: x",
            ),
            (
                r#"[{"id": [1], "slot_number": 1, "coordinates": {"x": 1, "y": 1, "width": 5, "height": 5}}]"#,
                "id must be",
            ),
        ];
        for (raw, expected) in cases {
            let err = parse_slot_config(raw).unwrap_err();
            assert!(err.is_configuration());
            assert!(err.to_string().contains(expected), "{} -> {}", raw, err);
        }
    }

    #[test]
    fn empty_list_parses_but_fails_validation() {
        let slots = parse_slot_config("[]").unwrap();
        assert!(validate_slots(&slots, 640, 480).unwrap_err().is_configuration());
    }

    #[test]
    fn validates_geometry_against_frame() {
        let inside = SlotDefinition::new(1, 1, Rect::new(0.0, 0.0, 640.0, 480.0));
        assert!(validate_slots(&[inside], 640, 480).is_ok());

        let outside = SlotDefinition::new(2, 2, Rect::new(600.0, 0.0, 100.0, 50.0));
        assert!(validate_slots(&[outside], 640, 480).is_err());

        let flat = SlotDefinition::new(3, 3, Rect::new(10.0, 10.0, 0.0, 50.0));
        assert!(validate_slots(&[flat], 640, 480).is_err());
    }
}
