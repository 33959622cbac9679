//! Audio Module - engine capability and the in-memory context
//!
//! The booster never touches samples. It builds and rewires a small node
//! graph inside whatever audio context the host provides.

mod context;
mod edge;
mod graph;
mod node;

pub use context::{AudioContext, AudioEngine, EngineError};
pub use edge::{Edge, EdgeId};
pub use graph::{AudioGraph, VirtualEngine};
pub use node::{ContextState, NodeHandle, NodeKind, ShelfKind};
