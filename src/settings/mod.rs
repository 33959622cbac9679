//! Settings Module - persisted booster settings

mod site;
mod store;

pub use site::SiteKey;
pub use store::{
    decode_snapshot, settings_keys, MemoryArea, SettingsStore, StorageArea, StoreError, BASS_KEY,
    ENABLED_KEY, TREBLE_KEY,
};

use crate::chain::Levels;
use serde::{Deserialize, Serialize};

/// Settings as seen from one site
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SettingsSnapshot {
    /// Gain multiplier for this site
    pub gain: f32,
    pub enabled: bool,
    pub bass_db: f32,
    pub treble_db: f32,
}

impl SettingsSnapshot {
    pub fn levels(&self) -> Levels {
        Levels::new(self.gain, self.bass_db, self.treble_db)
    }
}

impl Default for SettingsSnapshot {
    fn default() -> Self {
        Self {
            gain: 1.0,
            enabled: false,
            bass_db: 0.0,
            treble_db: 0.0,
        }
    }
}
