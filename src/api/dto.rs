//! Data Transfer Objects for the page message contract

use serde::{Deserialize, Serialize};
use serde_json::Value;

// =============================================================================
// Wire spellings
// =============================================================================

pub const SET_GAIN: &str = "SOUND_BOOSTER_SET";
pub const ENABLE: &str = "enableBoost";
pub const DISABLE: &str = "disableBoost";
pub const UPDATE_VOLUME: &str = "updateVolume";

// =============================================================================
// Raw message
// =============================================================================

/// A message as it arrives from the panel.
///
/// Two historical shapes exist: `{type, gain}` and `{action, volume, bass,
/// treble}`. Numeric fields stay raw JSON because older panels send slider
/// values as strings.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawMessage {
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub action: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gain: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub volume: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bass: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub treble: Option<Value>,
}

impl RawMessage {
    /// Decode any JSON value; non-objects and mistyped fields give `None`
    pub fn from_value(value: &Value) -> Option<Self> {
        serde_json::from_value(value.clone()).ok()
    }

    /// Command name: `type` wins over `action` when both are set
    pub fn command_name(&self) -> Option<&str> {
        self.kind
            .as_deref()
            .filter(|s| !s.is_empty())
            .or_else(|| self.action.as_deref().filter(|s| !s.is_empty()))
    }

    pub fn gain(&self) -> Option<f32> {
        self.gain.as_ref().and_then(lenient_number)
    }

    pub fn volume(&self) -> Option<f32> {
        self.volume.as_ref().and_then(lenient_number)
    }

    pub fn bass(&self) -> Option<f32> {
        self.bass.as_ref().and_then(lenient_number)
    }

    pub fn treble(&self) -> Option<f32> {
        self.treble.as_ref().and_then(lenient_number)
    }
}

/// A finite number, given either as a JSON number or a numeric string
pub fn lenient_number(value: &Value) -> Option<f32> {
    let number = match value {
        Value::Number(n) => n.as_f64()?,
        Value::String(s) => s.trim().parse::<f64>().ok()?,
        _ => return None,
    };
    let number = number as f32;
    number.is_finite().then_some(number)
}
