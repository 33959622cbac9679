//! Control Surface - the panel's logic without its markup
//!
//! Reads and writes the settings store and tells the active tab's page
//! script what to do. Nothing flows back from the page: when a message
//! cannot be delivered the panel still shows the requested state.

mod messaging;

pub use messaging::{drain_inbox, ChannelMessenger, MessageError, Tab, TabMessenger};

use crate::api::Command;
use crate::chain::Levels;
use crate::settings::{SettingsSnapshot, SettingsStore, SiteKey, StorageArea};

/// Slider range is 0..=1000, i.e. 0% to 1000%
pub const SLIDER_MAX: u32 = 1000;
const MAX_GAIN: f64 = 10.0;

/// Slider position to gain multiplier
pub fn to_gain(slider: f64) -> f64 {
    if slider.is_nan() {
        return 0.0;
    }
    (slider / 100.0).clamp(0.0, MAX_GAIN)
}

/// Gain multiplier to slider position
pub fn to_slider(gain: f64) -> u32 {
    if gain.is_nan() {
        return 0;
    }
    (gain.clamp(0.0, MAX_GAIN) * 100.0).round() as u32
}

/// What the panel displays
#[derive(Debug, Clone, PartialEq)]
pub struct PanelState {
    pub slider: u32,
    pub gain_label: String,
    pub enabled: bool,
    pub status: &'static str,
    pub bass_db: f32,
    pub bass_label: String,
    pub treble_db: f32,
    pub treble_label: String,
}

pub struct ControlSurface<A: StorageArea, M: TabMessenger> {
    store: SettingsStore<A>,
    messenger: M,
    slider: u32,
    enabled: bool,
    bass_db: f32,
    treble_db: f32,
}

impl<A: StorageArea, M: TabMessenger> ControlSurface<A, M> {
    pub fn new(store: SettingsStore<A>, messenger: M) -> Self {
        Self {
            store,
            messenger,
            slider: to_slider(1.0),
            enabled: false,
            bass_db: 0.0,
            treble_db: 0.0,
        }
    }

    /// Load the active site's settings, then push them to the page:
    /// always the stored gain, and the full state when enabled
    pub fn open(&mut self) -> PanelState {
        let tab = self.messenger.active_tab();
        let site = self.site_of(tab.as_ref());
        let snapshot = self.store.read(&site);

        self.slider = to_slider(snapshot.gain as f64);
        self.enabled = snapshot.enabled;
        self.bass_db = snapshot.bass_db;
        self.treble_db = snapshot.treble_db;

        if let Some(tab) = &tab {
            self.send(tab.id, Command::SetGain { gain: snapshot.gain });
        }
        if self.enabled {
            self.push_state(tab.as_ref());
        }
        self.panel_state()
    }

    pub fn toggle(&mut self, enabled: bool) -> PanelState {
        self.enabled = enabled;
        let tab = self.messenger.active_tab();
        self.persist(tab.as_ref());
        self.push_state(tab.as_ref());
        self.panel_state()
    }

    pub fn set_slider(&mut self, slider: u32) -> PanelState {
        self.slider = slider.min(SLIDER_MAX);
        self.level_changed()
    }

    pub fn set_bass(&mut self, bass_db: f32) -> PanelState {
        self.bass_db = bass_db;
        self.level_changed()
    }

    pub fn set_treble(&mut self, treble_db: f32) -> PanelState {
        self.treble_db = treble_db;
        self.level_changed()
    }

    fn level_changed(&mut self) -> PanelState {
        let tab = self.messenger.active_tab();
        self.persist(tab.as_ref());
        self.push_state(tab.as_ref());
        if self.enabled {
            if let Some(tab) = &tab {
                self.send(tab.id, Command::UpdateVolume(self.levels()));
            }
        }
        self.panel_state()
    }

    fn site_of(&self, tab: Option<&Tab>) -> SiteKey {
        SiteKey::for_tab(tab.and_then(|t| t.url.as_deref()), self.store.config())
    }

    fn levels(&self) -> Levels {
        Levels::new(
            to_gain(self.slider as f64) as f32,
            self.bass_db,
            self.treble_db,
        )
    }

    fn persist(&self, tab: Option<&Tab>) {
        let site = self.site_of(tab);
        let levels = self.levels();
        let snapshot = SettingsSnapshot {
            gain: levels.volume,
            enabled: self.enabled,
            bass_db: levels.bass_db,
            treble_db: levels.treble_db,
        };
        if let Err(e) = self.store.write(&site, &snapshot) {
            log::error!("[Panel] Failed to save settings for {}: {}", site, e);
        }
    }

    /// Tell the page to enable with the current levels, or to disable
    fn push_state(&self, tab: Option<&Tab>) {
        let Some(tab) = tab else {
            return;
        };
        let command = if self.enabled {
            Command::Enable(self.levels())
        } else {
            Command::Disable
        };
        self.send(tab.id, command);
    }

    /// Best-effort delivery; the page script may not be loaded yet
    fn send(&self, tab_id: u32, command: Command) {
        if let Err(e) = self.messenger.send(tab_id, command.to_message()) {
            log::debug!("[Panel] {} not delivered: {}", command.name(), e);
        }
    }

    pub fn panel_state(&self) -> PanelState {
        PanelState {
            slider: self.slider,
            gain_label: format!("{}%", self.slider),
            enabled: self.enabled,
            status: if self.enabled { "ON" } else { "OFF" },
            bass_db: self.bass_db,
            bass_label: format!("{}dB", self.bass_db),
            treble_db: self.treble_db,
            treble_label: format!("{}dB", self.treble_db),
        }
    }

    pub fn store(&self) -> &SettingsStore<A> {
        &self.store
    }

    pub fn messenger(&self) -> &M {
        &self.messenger
    }
}
