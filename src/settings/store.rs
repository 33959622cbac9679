//! Settings persistence on top of a key-value storage area

use super::site::SiteKey;
use super::SettingsSnapshot;
use crate::api::dto::lenient_number;
use crate::config::BoosterConfig;
use parking_lot::RwLock;
use serde_json::{Map, Value};
use std::sync::Arc;
use thiserror::Error;

/// Global on/off switch
pub const ENABLED_KEY: &str = "isEnabled";
/// Global bass level in dB
pub const BASS_KEY: &str = "bassLevel";
/// Global treble level in dB
pub const TREBLE_KEY: &str = "trebleLevel";

#[derive(Debug, Clone, PartialEq, Error)]
pub enum StoreError {
    #[error("storage unavailable: {0}")]
    Unavailable(String),
    #[error("storage rejected the write: {0}")]
    Rejected(String),
}

/// Extension-local key-value storage
pub trait StorageArea {
    /// Values for `keys`; absent keys are simply missing from the map
    fn get(&self, keys: &[&str]) -> Result<Map<String, Value>, StoreError>;

    fn set(&self, items: Map<String, Value>) -> Result<(), StoreError>;
}

/// In-process storage area; clones share the same contents
#[derive(Debug, Clone, Default)]
pub struct MemoryArea {
    items: Arc<RwLock<Map<String, Value>>>,
    read_only: Arc<RwLock<bool>>,
}

impl MemoryArea {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every write fail (quota exhausted, storage disabled)
    pub fn set_read_only(&self, read_only: bool) {
        *self.read_only.write() = read_only;
    }

    /// Raw value stored under `key`
    pub fn raw(&self, key: &str) -> Option<Value> {
        self.items.read().get(key).cloned()
    }

    pub fn insert_raw(&self, key: &str, value: Value) {
        self.items.write().insert(key.to_string(), value);
    }
}

impl StorageArea for MemoryArea {
    fn get(&self, keys: &[&str]) -> Result<Map<String, Value>, StoreError> {
        let items = self.items.read();
        Ok(keys
            .iter()
            .filter_map(|k| items.get(*k).map(|v| (k.to_string(), v.clone())))
            .collect())
    }

    fn set(&self, items: Map<String, Value>) -> Result<(), StoreError> {
        if *self.read_only.read() {
            return Err(StoreError::Rejected("storage is read-only".into()));
        }
        self.items.write().extend(items);
        Ok(())
    }
}

/// Keys holding the settings of `site`
pub fn settings_keys(site: &SiteKey) -> [&str; 4] {
    [site.as_str(), ENABLED_KEY, BASS_KEY, TREBLE_KEY]
}

/// Decode the result of a `get` over [`settings_keys`]
pub fn decode_snapshot(
    site: &SiteKey,
    stored: &Map<String, Value>,
    config: &BoosterConfig,
) -> SettingsSnapshot {
    let defaults = SettingsSnapshot::default();
    // Only a real number counts as a stored gain
    let gain = stored
        .get(site.as_str())
        .and_then(Value::as_f64)
        .map(|g| config.clamp_gain(g as f32))
        .unwrap_or(config.default_gain);
    SettingsSnapshot {
        gain,
        enabled: stored
            .get(ENABLED_KEY)
            .and_then(Value::as_bool)
            .unwrap_or(defaults.enabled),
        bass_db: stored
            .get(BASS_KEY)
            .and_then(lenient_number)
            .unwrap_or(defaults.bass_db),
        treble_db: stored
            .get(TREBLE_KEY)
            .and_then(lenient_number)
            .unwrap_or(defaults.treble_db),
    }
}

/// Typed view of the booster's settings.
///
/// Gain is stored per site. `isEnabled`, `bassLevel` and `trebleLevel` are
/// single global keys, so every site shares them.
pub struct SettingsStore<A: StorageArea> {
    area: A,
    config: BoosterConfig,
}

impl<A: StorageArea> SettingsStore<A> {
    pub fn new(area: A) -> Self {
        Self::with_config(area, BoosterConfig::default())
    }

    pub fn with_config(area: A, config: BoosterConfig) -> Self {
        Self { area, config }
    }

    pub fn config(&self) -> &BoosterConfig {
        &self.config
    }

    pub fn area(&self) -> &A {
        &self.area
    }

    /// Settings for `site`; anything missing or unreadable takes its default
    pub fn read(&self, site: &SiteKey) -> SettingsSnapshot {
        let stored = match self.area.get(&settings_keys(site)) {
            Ok(stored) => stored,
            Err(e) => {
                log::error!("[Settings] Failed to read settings: {}", e);
                Map::new()
            }
        };
        decode_snapshot(site, &stored, &self.config)
    }

    pub fn write(&self, site: &SiteKey, snapshot: &SettingsSnapshot) -> Result<(), StoreError> {
        let mut items = Map::new();
        items.insert(site.as_str().to_string(), Value::from(snapshot.gain as f64));
        items.insert(ENABLED_KEY.to_string(), Value::Bool(snapshot.enabled));
        items.insert(BASS_KEY.to_string(), Value::from(snapshot.bass_db as f64));
        items.insert(TREBLE_KEY.to_string(), Value::from(snapshot.treble_db as f64));
        self.area.set(items)
    }
}
