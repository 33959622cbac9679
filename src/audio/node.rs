//! Node handles and node kinds

use crate::dom::ElementId;

/// Opaque identifier of a node inside one audio context
///
/// A handle says nothing about what kind of node it points at. Callers that
/// need the kind ask the context that issued it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeHandle(u32);

impl NodeHandle {
    pub(crate) fn new(id: u32) -> Self {
        Self(id)
    }

    /// Get the raw ID value
    pub fn raw(&self) -> u32 {
        self.0
    }
}

impl From<u32> for NodeHandle {
    fn from(id: u32) -> Self {
        Self(id)
    }
}

impl From<NodeHandle> for u32 {
    fn from(handle: NodeHandle) -> Self {
        handle.0
    }
}

/// Which side of the spectrum a shelf filter shapes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShelfKind {
    /// Boosts or cuts everything below the corner frequency (bass)
    LowShelf,
    /// Boosts or cuts everything above the corner frequency (treble)
    HighShelf,
}

/// Execution state of an audio context
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContextState {
    Suspended,
    Running,
    Closed,
}

/// What a node in the in-memory graph is
#[derive(Debug, Clone, PartialEq)]
pub enum NodeKind {
    /// Single-use source wrapping one media element
    MediaSource { element: ElementId },
    /// Shelf filter; `gain` is in dB
    ShelfFilter {
        kind: ShelfKind,
        frequency_hz: f32,
        gain: f32,
    },
    /// Linear gain stage
    Gain { gain: f32 },
    /// Output sink of the context
    Destination,
}

impl NodeKind {
    /// Current gain parameter, if the node has one
    pub fn gain(&self) -> Option<f32> {
        match self {
            NodeKind::ShelfFilter { gain, .. } | NodeKind::Gain { gain } => Some(*gain),
            _ => None,
        }
    }

    fn gain_mut(&mut self) -> Option<&mut f32> {
        match self {
            NodeKind::ShelfFilter { gain, .. } | NodeKind::Gain { gain } => Some(gain),
            _ => None,
        }
    }

    /// Set the gain parameter; returns false for nodes without one
    pub fn set_gain(&mut self, value: f32) -> bool {
        match self.gain_mut() {
            Some(gain) => {
                *gain = value;
                true
            }
            None => false,
        }
    }
}
