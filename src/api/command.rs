//! Commands the panel sends to the page

use super::dto::{RawMessage, DISABLE, ENABLE, SET_GAIN, UPDATE_VOLUME};
use crate::chain::Levels;
use serde_json::Value;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Command {
    /// Enable at this gain, keeping bass and treble
    SetGain { gain: f32 },
    Enable(Levels),
    Disable,
    /// New levels; only audible while enabled
    UpdateVolume(Levels),
}

impl Command {
    /// Decode a message. Unknown commands and malformed payloads give `None`.
    pub fn from_message(value: &Value) -> Option<Self> {
        RawMessage::from_value(value).and_then(|raw| Self::from_raw(&raw))
    }

    pub fn from_raw(raw: &RawMessage) -> Option<Self> {
        match raw.command_name()? {
            SET_GAIN => raw.gain().map(|gain| Command::SetGain { gain }),
            ENABLE => Some(Command::Enable(levels_of(raw))),
            DISABLE => Some(Command::Disable),
            UPDATE_VOLUME => Some(Command::UpdateVolume(levels_of(raw))),
            _ => None,
        }
    }

    /// Wire name of the command
    pub fn name(&self) -> &'static str {
        match self {
            Command::SetGain { .. } => SET_GAIN,
            Command::Enable(_) => ENABLE,
            Command::Disable => DISABLE,
            Command::UpdateVolume(_) => UPDATE_VOLUME,
        }
    }

    /// Canonical outgoing form: `type` for `SetGain`, `action` for the rest
    pub fn to_raw(&self) -> RawMessage {
        match self {
            Command::SetGain { gain } => RawMessage {
                kind: Some(SET_GAIN.to_string()),
                gain: Some(Value::from(*gain as f64)),
                ..RawMessage::default()
            },
            Command::Disable => RawMessage {
                action: Some(DISABLE.to_string()),
                ..RawMessage::default()
            },
            Command::Enable(levels) | Command::UpdateVolume(levels) => RawMessage {
                action: Some(self.name().to_string()),
                volume: Some(Value::from(levels.volume as f64)),
                bass: Some(Value::from(levels.bass_db as f64)),
                treble: Some(Value::from(levels.treble_db as f64)),
                ..RawMessage::default()
            },
        }
    }

    pub fn to_message(&self) -> Value {
        serde_json::to_value(self.to_raw()).unwrap_or(Value::Null)
    }
}

/// Levels carried by `enableBoost` / `updateVolume`; missing values fall
/// back to unity gain and flat filters
fn levels_of(raw: &RawMessage) -> Levels {
    let defaults = Levels::default();
    Levels::new(
        raw.volume().unwrap_or(defaults.volume),
        raw.bass().unwrap_or(defaults.bass_db),
        raw.treble().unwrap_or(defaults.treble_db),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_both_spellings_are_accepted() {
        let by_type = Command::from_message(&json!({ "type": "enableBoost", "volume": 2.0 }));
        let by_action = Command::from_message(&json!({ "action": "enableBoost", "volume": 2.0 }));
        assert_eq!(by_type, by_action);
        assert_eq!(by_type, Some(Command::Enable(Levels::new(2.0, 0.0, 0.0))));
    }

    #[test]
    fn test_set_gain_requires_gain() {
        assert_eq!(
            Command::from_message(&json!({ "type": "SOUND_BOOSTER_SET", "gain": 3 })),
            Some(Command::SetGain { gain: 3.0 })
        );
        assert_eq!(Command::from_message(&json!({ "type": "SOUND_BOOSTER_SET" })), None);
        assert_eq!(
            Command::from_message(&json!({ "type": "SOUND_BOOSTER_SET", "gain": "abc" })),
            None
        );
    }

    #[test]
    fn test_string_levels_from_panel() {
        let cmd = Command::from_message(&json!({
            "action": "updateVolume",
            "volume": 1.5,
            "bass": "6",
            "treble": "-4"
        }));
        assert_eq!(cmd, Some(Command::UpdateVolume(Levels::new(1.5, 6.0, -4.0))));
    }

    #[test]
    fn test_missing_levels_use_defaults() {
        assert_eq!(
            Command::from_message(&json!({ "action": "enableBoost" })),
            Some(Command::Enable(Levels::default()))
        );
    }

    #[test]
    fn test_explicit_zero_volume_is_kept() {
        assert_eq!(
            Command::from_message(&json!({ "action": "enableBoost", "volume": 0 })),
            Some(Command::Enable(Levels::new(0.0, 0.0, 0.0)))
        );
    }

    #[test]
    fn test_unknown_and_malformed() {
        assert_eq!(Command::from_message(&json!({ "command": "foo" })), None);
        assert_eq!(Command::from_message(&json!({ "action": "foo" })), None);
        assert_eq!(Command::from_message(&json!(null)), None);
        assert_eq!(Command::from_message(&json!([1, 2])), None);
    }

    #[test]
    fn test_outgoing_shape() {
        assert_eq!(
            Command::SetGain { gain: 2.5 }.to_message(),
            json!({ "type": "SOUND_BOOSTER_SET", "gain": 2.5 })
        );
        assert_eq!(Command::Disable.to_message(), json!({ "action": "disableBoost" }));
        assert_eq!(
            Command::UpdateVolume(Levels::new(2.0, 3.0, -2.0)).to_message(),
            json!({ "action": "updateVolume", "volume": 2.0, "bass": 3.0, "treble": -2.0 })
        );
    }
}
