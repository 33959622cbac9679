//! Audio Graph - in-memory audio context
//!
//! Mirrors what a browser audio context does with the handful of node types
//! the booster needs, without producing sound. Native builds and tests run
//! the chain against it.

use super::context::{AudioContext, AudioEngine, EngineError};
use super::edge::{Edge, EdgeId};
use super::node::{ContextState, NodeHandle, NodeKind, ShelfKind};
use crate::dom::ElementId;
use std::cell::Cell;
use std::collections::{HashMap, HashSet};

/// In-memory audio context
///
/// Keeps nodes and deduplicated edges, plus the element capture table: an
/// element that feeds a live source node cannot be wrapped again until that
/// node is released.
#[derive(Debug)]
pub struct AudioGraph {
    nodes: HashMap<NodeHandle, NodeKind>,
    edges: Vec<Edge>,
    /// element -> live source node
    captured: HashMap<ElementId, NodeHandle>,
    /// elements the context refuses to wrap
    denied: HashSet<ElementId>,
    destination: NodeHandle,
    state: ContextState,
    next_handle: u32,
    next_edge_id: u32,
    fail_node_creation: bool,
    resume_requests: usize,
}

impl AudioGraph {
    /// Create a context in the given state with only a destination node
    pub fn new(state: ContextState) -> Self {
        let mut graph = Self {
            nodes: HashMap::new(),
            edges: Vec::new(),
            captured: HashMap::new(),
            denied: HashSet::new(),
            destination: NodeHandle::new(0),
            state,
            next_handle: 1,
            next_edge_id: 1,
            fail_node_creation: false,
            resume_requests: 0,
        };
        graph.destination = graph.add_node(NodeKind::Destination);
        graph
    }

    /// Refuse to wrap `element` (simulates an element captured by another
    /// context on the page)
    pub fn deny_media(&mut self, element: ElementId) {
        self.denied.insert(element);
    }

    /// Make every gain/filter creation fail
    pub fn set_fail_node_creation(&mut self, fail: bool) {
        self.fail_node_creation = fail;
    }

    fn add_node(&mut self, kind: NodeKind) -> NodeHandle {
        let handle = NodeHandle::new(self.next_handle);
        self.next_handle += 1;
        self.nodes.insert(handle, kind);
        handle
    }

    /// Remove a node together with every edge touching it
    fn remove_node(&mut self, handle: NodeHandle) -> bool {
        if self.nodes.remove(&handle).is_some() {
            self.edges.retain(|e| !e.touches(handle));
            self.captured.retain(|_, source| *source != handle);
            true
        } else {
            false
        }
    }

    /// Add an edge; `None` if either node is missing or the edge exists
    fn add_edge(&mut self, source: NodeHandle, target: NodeHandle) -> Option<EdgeId> {
        if !self.nodes.contains_key(&source) || !self.nodes.contains_key(&target) {
            return None;
        }
        if self
            .edges
            .iter()
            .any(|e| e.source == source && e.target == target)
        {
            return None;
        }

        let id = EdgeId::new(self.next_edge_id);
        self.next_edge_id += 1;
        self.edges.push(Edge::new(id, source, target));
        Some(id)
    }

    fn ensure_open(&self) -> Result<(), EngineError> {
        if self.state == ContextState::Closed {
            return Err(EngineError::Closed);
        }
        Ok(())
    }

    fn ensure_node(&self, handle: NodeHandle) -> Result<(), EngineError> {
        if self.nodes.contains_key(&handle) {
            Ok(())
        } else {
            Err(EngineError::UnknownNode(handle))
        }
    }

    fn create_processing_node(&mut self, kind: NodeKind) -> Result<NodeHandle, EngineError> {
        self.ensure_open()?;
        if self.fail_node_creation {
            return Err(EngineError::Rejected("node creation refused".into()));
        }
        Ok(self.add_node(kind))
    }

    pub fn node_kind(&self, handle: NodeHandle) -> Option<&NodeKind> {
        self.nodes.get(&handle)
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn edges(&self) -> &[Edge] {
        &self.edges
    }

    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    pub fn edges_from(&self, source: NodeHandle) -> impl Iterator<Item = &Edge> {
        self.edges.iter().filter(move |e| e.source == source)
    }

    /// Follow outgoing edges from `start` until a node without one.
    ///
    /// Every node on the booster chain has a single output, so this is the
    /// signal path. Stops at the first repeated node.
    pub fn downstream_path(&self, start: NodeHandle) -> Vec<NodeHandle> {
        let mut path = vec![start];
        let mut visited = HashSet::from([start]);
        let mut current = start;

        while let Some(next) = self.edges_from(current).map(|e| e.target).next() {
            if !visited.insert(next) {
                break;
            }
            path.push(next);
            current = next;
        }
        path
    }

    /// Live source nodes wrapping `element`
    pub fn sources_for(&self, element: ElementId) -> Vec<NodeHandle> {
        let mut sources: Vec<_> = self
            .nodes
            .iter()
            .filter(|(_, kind)| matches!(kind, NodeKind::MediaSource { element: e } if *e == element))
            .map(|(&h, _)| h)
            .collect();
        sources.sort_by_key(|h| h.raw());
        sources
    }

    pub fn resume_requests(&self) -> usize {
        self.resume_requests
    }
}

impl AudioContext for AudioGraph {
    type Media = ElementId;

    fn state(&self) -> ContextState {
        self.state
    }

    fn resume(&mut self) {
        self.resume_requests += 1;
        if self.state == ContextState::Suspended {
            self.state = ContextState::Running;
        }
    }

    fn close(&mut self) -> Result<(), EngineError> {
        self.ensure_open()?;
        self.state = ContextState::Closed;
        Ok(())
    }

    fn destination(&self) -> NodeHandle {
        self.destination
    }

    fn create_gain(&mut self) -> Result<NodeHandle, EngineError> {
        self.create_processing_node(NodeKind::Gain { gain: 1.0 })
    }

    fn create_shelf_filter(
        &mut self,
        kind: ShelfKind,
        frequency_hz: f32,
    ) -> Result<NodeHandle, EngineError> {
        self.create_processing_node(NodeKind::ShelfFilter {
            kind,
            frequency_hz,
            gain: 0.0,
        })
    }

    fn create_media_source(&mut self, media: &ElementId) -> Result<NodeHandle, EngineError> {
        self.ensure_open()?;
        if self.denied.contains(media) {
            return Err(EngineError::Rejected(format!(
                "element {} is owned by another context",
                media.raw()
            )));
        }
        if self.captured.contains_key(media) {
            return Err(EngineError::MediaAlreadyCaptured);
        }
        let handle = self.add_node(NodeKind::MediaSource { element: *media });
        self.captured.insert(*media, handle);
        Ok(handle)
    }

    fn connect(&mut self, from: NodeHandle, to: NodeHandle) -> Result<(), EngineError> {
        self.ensure_open()?;
        self.ensure_node(from)?;
        self.ensure_node(to)?;
        // A duplicate edge is refused by add_edge, which is the no-op we want
        self.add_edge(from, to);
        Ok(())
    }

    fn disconnect(&mut self, node: NodeHandle) -> Result<(), EngineError> {
        self.ensure_node(node)?;
        self.edges.retain(|e| e.source != node);
        Ok(())
    }

    fn release(&mut self, node: NodeHandle) {
        self.remove_node(node);
    }

    fn set_gain(&mut self, node: NodeHandle, value: f32) -> Result<(), EngineError> {
        let kind = self
            .nodes
            .get_mut(&node)
            .ok_or(EngineError::UnknownNode(node))?;
        if kind.set_gain(value) {
            Ok(())
        } else {
            Err(EngineError::Rejected(format!(
                "node {} has no gain parameter",
                node.raw()
            )))
        }
    }

    fn gain(&self, node: NodeHandle) -> Option<f32> {
        self.nodes.get(&node).and_then(NodeKind::gain)
    }
}

/// Produces [`AudioGraph`] contexts
///
/// Failure knobs are applied to every context it creates.
#[derive(Debug, Default)]
pub struct VirtualEngine {
    unsupported: bool,
    start_suspended: bool,
    fail_node_creation: bool,
    denied: Vec<ElementId>,
    contexts_created: Cell<usize>,
}

impl VirtualEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Engine whose context construction always fails
    pub fn unsupported() -> Self {
        Self {
            unsupported: true,
            ..Self::default()
        }
    }

    /// Contexts start suspended, as under a browser autoplay policy
    pub fn start_suspended(mut self) -> Self {
        self.start_suspended = true;
        self
    }

    pub fn fail_node_creation(mut self) -> Self {
        self.fail_node_creation = true;
        self
    }

    pub fn deny_media(mut self, element: ElementId) -> Self {
        self.denied.push(element);
        self
    }

    pub fn contexts_created(&self) -> usize {
        self.contexts_created.get()
    }
}

impl AudioEngine for VirtualEngine {
    type Media = ElementId;
    type Context = AudioGraph;

    fn create_context(&self) -> Result<AudioGraph, EngineError> {
        if self.unsupported {
            return Err(EngineError::Unsupported);
        }
        let state = if self.start_suspended {
            ContextState::Suspended
        } else {
            ContextState::Running
        };
        let mut graph = AudioGraph::new(state);
        graph.set_fail_node_creation(self.fail_node_creation);
        for element in &self.denied {
            graph.deny_media(*element);
        }
        self.contexts_created.set(self.contexts_created.get() + 1);
        Ok(graph)
    }
}
