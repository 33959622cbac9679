//! Edge - one connection between two nodes

use super::node::NodeHandle;

/// Unique edge identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct EdgeId(u32);

impl EdgeId {
    pub(crate) fn new(id: u32) -> Self {
        Self(id)
    }

    pub fn raw(&self) -> u32 {
        self.0
    }
}

impl From<EdgeId> for u32 {
    fn from(edge: EdgeId) -> Self {
        edge.0
    }
}

/// Connection from a node's output into another node's input.
///
/// Levels live on the nodes, not here: an edge is only wiring.
#[derive(Debug, Clone, PartialEq)]
pub struct Edge {
    pub id: EdgeId,
    pub source: NodeHandle,
    pub target: NodeHandle,
}

impl Edge {
    pub fn new(id: EdgeId, source: NodeHandle, target: NodeHandle) -> Self {
        Self { id, source, target }
    }

    /// Whether this edge touches `node` on either end
    pub fn touches(&self, node: NodeHandle) -> bool {
        self.source == node || self.target == node
    }
}
