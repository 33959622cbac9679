//! Engine capability - the Web-Audio-shaped surface the chain is built on

use super::node::{ContextState, NodeHandle, ShelfKind};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum EngineError {
    #[error("audio engine unavailable in this environment")]
    Unsupported,
    #[error("audio context is closed")]
    Closed,
    #[error("unknown node {0:?}")]
    UnknownNode(NodeHandle),
    #[error("media element already feeds another source node")]
    MediaAlreadyCaptured,
    #[error("engine rejected the operation: {0}")]
    Rejected(String),
}

/// Factory for audio contexts.
///
/// Constructing a context is the only step that can fail for environmental
/// reasons (no audio support at all).
pub trait AudioEngine {
    /// Media element type the contexts can wrap
    type Media;
    type Context: AudioContext<Media = Self::Media>;

    fn create_context(&self) -> Result<Self::Context, EngineError>;
}

/// One live audio context and the nodes it owns
pub trait AudioContext {
    type Media;

    fn state(&self) -> ContextState;

    /// Ask a suspended context to run again. Fire-and-forget: the context may
    /// still report `Suspended` when this returns.
    fn resume(&mut self);

    fn close(&mut self) -> Result<(), EngineError>;

    /// Output sink of the context
    fn destination(&self) -> NodeHandle;

    fn create_gain(&mut self) -> Result<NodeHandle, EngineError>;

    fn create_shelf_filter(
        &mut self,
        kind: ShelfKind,
        frequency_hz: f32,
    ) -> Result<NodeHandle, EngineError>;

    /// Wrap a media element in a source node.
    ///
    /// An element can feed at most one live source node.
    fn create_media_source(&mut self, media: &Self::Media) -> Result<NodeHandle, EngineError>;

    /// Connect `from` into `to`. Repeating an existing connection is a no-op.
    fn connect(&mut self, from: NodeHandle, to: NodeHandle) -> Result<(), EngineError>;

    /// Drop every outgoing connection of `node`
    fn disconnect(&mut self, node: NodeHandle) -> Result<(), EngineError>;

    /// Forget a node. Its handle must not be used afterwards.
    fn release(&mut self, node: NodeHandle);

    /// Set the gain parameter (linear for gain nodes, dB for shelf filters)
    fn set_gain(&mut self, node: NodeHandle, value: f32) -> Result<(), EngineError>;

    fn gain(&self, node: NodeHandle) -> Option<f32>;
}
