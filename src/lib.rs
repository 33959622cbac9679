//! Sound Booster - volume boost and bass/treble shaping for page media
//!
//! The page side is a [`GraphManager`]: it routes every `<audio>`/`<video>`
//! element through one shared chain (low shelf -> high shelf -> master gain)
//! so levels above 100% are possible. The panel side is a [`ControlSurface`]
//! that persists per-site settings and sends commands to the page.
//!
//! Browser bindings live in `web` and are only built for `wasm32`.

pub mod api;
pub mod audio;
pub mod binding;
pub mod chain;
pub mod config;
pub mod control;
pub mod dom;
pub mod manager;
pub mod settings;

#[cfg(target_arch = "wasm32")]
pub mod web;

pub use api::Command;
pub use chain::{Levels, ProcessingChain};
pub use config::BoosterConfig;
pub use control::{to_gain, to_slider, ControlSurface, PanelState};
pub use manager::{GraphManager, ManagerState};
pub use settings::{SettingsSnapshot, SettingsStore, SiteKey};
