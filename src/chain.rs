//! Processing Chain - bass filter -> treble filter -> master gain -> output
//!
//! Every bound media element feeds the bass filter. The chain is built once
//! per page and only ever completed, never rebuilt: recreating a node would
//! drop connections that are already carrying audio.

use crate::audio::{AudioContext, ContextState, EngineError, NodeHandle, ShelfKind};
use crate::config::BoosterConfig;
use serde::{Deserialize, Serialize};

/// Gain of the master node while the booster is off
pub const NEUTRAL_GAIN: f32 = 1.0;

/// Levels the chain applies
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Levels {
    /// Linear multiplier, 1.0 = unchanged
    pub volume: f32,
    /// Low-shelf gain in dB
    pub bass_db: f32,
    /// High-shelf gain in dB
    pub treble_db: f32,
}

impl Levels {
    pub fn new(volume: f32, bass_db: f32, treble_db: f32) -> Self {
        Self {
            volume,
            bass_db,
            treble_db,
        }
    }
}

impl Default for Levels {
    fn default() -> Self {
        Self::new(NEUTRAL_GAIN, 0.0, 0.0)
    }
}

/// The shared chain and the context that owns its nodes
pub struct ProcessingChain<C: AudioContext> {
    context: C,
    bass_filter: Option<NodeHandle>,
    treble_filter: Option<NodeHandle>,
    master_gain: Option<NodeHandle>,
}

impl<C: AudioContext> ProcessingChain<C> {
    /// Wrap a freshly created context; no nodes exist yet
    pub fn new(context: C) -> Self {
        Self {
            context,
            bass_filter: None,
            treble_filter: None,
            master_gain: None,
        }
    }

    /// Create whatever nodes are missing and wire the fixed order.
    ///
    /// Existing nodes are kept. Connections are repeated, which the context
    /// treats as a no-op. A suspended context is asked to resume.
    pub fn ensure_built(&mut self, config: &BoosterConfig) -> Result<(), EngineError> {
        let bass = match self.bass_filter {
            Some(node) => node,
            None => {
                let node = self
                    .context
                    .create_shelf_filter(ShelfKind::LowShelf, config.bass_frequency_hz)?;
                self.bass_filter = Some(node);
                node
            }
        };
        let treble = match self.treble_filter {
            Some(node) => node,
            None => {
                let node = self
                    .context
                    .create_shelf_filter(ShelfKind::HighShelf, config.treble_frequency_hz)?;
                self.treble_filter = Some(node);
                node
            }
        };
        let master = match self.master_gain {
            Some(node) => node,
            None => {
                let node = self.context.create_gain()?;
                self.master_gain = Some(node);
                node
            }
        };

        let destination = self.context.destination();
        self.context.connect(bass, treble)?;
        self.context.connect(treble, master)?;
        self.context.connect(master, destination)?;

        if self.context.state() == ContextState::Suspended {
            log::debug!("[Chain] Context suspended, requesting resume");
            self.context.resume();
        }
        Ok(())
    }

    /// Whether all three nodes exist
    pub fn is_built(&self) -> bool {
        self.bass_filter.is_some() && self.treble_filter.is_some() && self.master_gain.is_some()
    }

    /// Node media sources connect into; only available once fully built
    pub fn entry(&self) -> Option<NodeHandle> {
        if self.is_built() {
            self.bass_filter
        } else {
            None
        }
    }

    /// Push all three levels into the nodes
    pub fn apply(&mut self, levels: &Levels) -> Result<(), EngineError> {
        self.set_master_gain(levels.volume)?;
        if let Some(node) = self.bass_filter {
            self.context.set_gain(node, levels.bass_db)?;
        }
        if let Some(node) = self.treble_filter {
            self.context.set_gain(node, levels.treble_db)?;
        }
        Ok(())
    }

    /// Master back to unity; the filters keep their settings
    pub fn neutralize(&mut self) -> Result<(), EngineError> {
        self.set_master_gain(NEUTRAL_GAIN)
    }

    fn set_master_gain(&mut self, value: f32) -> Result<(), EngineError> {
        match self.master_gain {
            Some(node) => self.context.set_gain(node, value),
            None => Ok(()),
        }
    }

    pub fn master_gain(&self) -> Option<f32> {
        self.master_gain.and_then(|n| self.context.gain(n))
    }

    pub fn bass_gain(&self) -> Option<f32> {
        self.bass_filter.and_then(|n| self.context.gain(n))
    }

    pub fn treble_gain(&self) -> Option<f32> {
        self.treble_filter.and_then(|n| self.context.gain(n))
    }

    pub fn context(&self) -> &C {
        &self.context
    }

    pub fn context_mut(&mut self) -> &mut C {
        &mut self.context
    }

    /// Disconnect and drop the three nodes, then close the context.
    ///
    /// Every step runs even if an earlier one failed; the first error is
    /// returned.
    pub fn teardown(&mut self) -> Result<(), EngineError> {
        let mut first_error = None;
        for node in [
            self.master_gain.take(),
            self.bass_filter.take(),
            self.treble_filter.take(),
        ]
        .into_iter()
        .flatten()
        {
            if let Err(e) = self.context.disconnect(node) {
                first_error.get_or_insert(e);
            }
            self.context.release(node);
        }
        if let Err(e) = self.context.close() {
            first_error.get_or_insert(e);
        }
        match first_error {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }
}
