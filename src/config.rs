//! Booster Configuration
//! Tunables for the processing chain and the settings layout

use serde::{Deserialize, Serialize};

/// Corner frequency of the bass (low-shelf) filter
const DEFAULT_BASS_FREQUENCY_HZ: f32 = 200.0;
/// Corner frequency of the treble (high-shelf) filter
const DEFAULT_TREBLE_FREQUENCY_HZ: f32 = 2000.0;
/// Largest gain multiplier the booster will apply (1000%)
const DEFAULT_MAX_GAIN: f32 = 10.0;

/// Complete booster configuration
///
/// Every field has a default so partial JSON documents are accepted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BoosterConfig {
    /// Config version (for future migrations)
    pub version: u32,
    /// Low-shelf corner frequency in Hz
    pub bass_frequency_hz: f32,
    /// High-shelf corner frequency in Hz
    pub treble_frequency_hz: f32,
    /// Upper bound for the gain multiplier
    pub max_gain: f32,
    /// Gain used for sites without a stored value
    pub default_gain: f32,
    /// Settings key used when the active tab has no URL
    pub global_site_key: String,
}

impl Default for BoosterConfig {
    fn default() -> Self {
        Self {
            version: 1,
            bass_frequency_hz: DEFAULT_BASS_FREQUENCY_HZ,
            treble_frequency_hz: DEFAULT_TREBLE_FREQUENCY_HZ,
            max_gain: DEFAULT_MAX_GAIN,
            default_gain: 1.0,
            global_site_key: "__global__".to_string(),
        }
    }
}

impl BoosterConfig {
    /// Parse a configuration document, falling back to defaults on error
    pub fn from_json(content: &str) -> Self {
        match serde_json::from_str::<BoosterConfig>(content) {
            Ok(config) => {
                log::debug!("[Config] Loaded configuration (version {})", config.version);
                config.sanitized()
            }
            Err(e) => {
                log::error!("[Config] Failed to parse config: {}", e);
                Self::default()
            }
        }
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Clamp a gain multiplier into `[0, max_gain]`. NaN maps to 0.
    pub fn clamp_gain(&self, gain: f32) -> f32 {
        if gain.is_nan() {
            return 0.0;
        }
        gain.clamp(0.0, self.max_gain)
    }

    /// Replace values no chain can use with their defaults
    fn sanitized(mut self) -> Self {
        let defaults = Self::default();
        if !(self.max_gain.is_finite() && self.max_gain > 0.0) {
            log::warn!("[Config] Invalid max_gain {}, using default", self.max_gain);
            self.max_gain = defaults.max_gain;
        }
        if !(self.bass_frequency_hz.is_finite() && self.bass_frequency_hz > 0.0) {
            self.bass_frequency_hz = defaults.bass_frequency_hz;
        }
        if !(self.treble_frequency_hz.is_finite() && self.treble_frequency_hz > 0.0) {
            self.treble_frequency_hz = defaults.treble_frequency_hz;
        }
        self.default_gain = self.clamp_gain(self.default_gain);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_document_keeps_defaults() {
        let config = BoosterConfig::from_json(r#"{ "bass_frequency_hz": 150.0 }"#);
        assert_eq!(config.bass_frequency_hz, 150.0);
        assert_eq!(config.treble_frequency_hz, 2000.0);
        assert_eq!(config.max_gain, 10.0);
        assert_eq!(config.global_site_key, "__global__");
    }

    #[test]
    fn test_invalid_document_falls_back() {
        assert_eq!(BoosterConfig::from_json("not json"), BoosterConfig::default());
    }

    #[test]
    fn test_nonsense_values_are_sanitized() {
        let config = BoosterConfig::from_json(r#"{ "max_gain": -3.0, "default_gain": 40.0 }"#);
        assert_eq!(config.max_gain, 10.0);
        assert_eq!(config.default_gain, 10.0);
    }

    #[test]
    fn test_clamp_gain() {
        let config = BoosterConfig::default();
        assert_eq!(config.clamp_gain(-1.0), 0.0);
        assert_eq!(config.clamp_gain(2.5), 2.5);
        assert_eq!(config.clamp_gain(42.0), 10.0);
        assert_eq!(config.clamp_gain(f32::NAN), 0.0);
    }

    #[test]
    fn test_json_round_trip() {
        let config = BoosterConfig::default();
        let json = config.to_json().unwrap();
        assert_eq!(BoosterConfig::from_json(&json), config);
    }
}
