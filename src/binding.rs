//! Media element bindings

use crate::audio::{AudioContext, NodeHandle};
use crate::dom::ElementId;
use std::collections::HashMap;

/// Live connection from one media element into the shared chain
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MediaElementBinding {
    pub element: ElementId,
    /// Single-use source node wrapping the element
    pub source: NodeHandle,
    /// Frame whose document holds the element; `None` for the top document
    pub frame: Option<ElementId>,
}

impl MediaElementBinding {
    pub fn new(element: ElementId, source: NodeHandle) -> Self {
        Self {
            element,
            source,
            frame: None,
        }
    }

    pub fn in_frame(mut self, frame: ElementId) -> Self {
        self.frame = Some(frame);
        self
    }

    /// Disconnect and drop the source node. Failures are logged, never
    /// returned: a stale binding must not block the caller.
    pub fn release<C: AudioContext>(self, context: &mut C) {
        if let Err(e) = context.disconnect(self.source) {
            log::warn!(
                "[Binding] Could not disconnect element {}: {}",
                self.element.raw(),
                e
            );
        }
        context.release(self.source);
    }
}

/// Bindings by element; at most one per element
#[derive(Debug, Default)]
pub struct BindingTable {
    bindings: HashMap<ElementId, MediaElementBinding>,
}

impl BindingTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a binding, handing back the one it replaced
    pub fn insert(&mut self, binding: MediaElementBinding) -> Option<MediaElementBinding> {
        self.bindings.insert(binding.element, binding)
    }

    pub fn remove(&mut self, element: ElementId) -> Option<MediaElementBinding> {
        self.bindings.remove(&element)
    }

    pub fn get(&self, element: ElementId) -> Option<&MediaElementBinding> {
        self.bindings.get(&element)
    }

    pub fn contains(&self, element: ElementId) -> bool {
        self.bindings.contains_key(&element)
    }

    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }

    /// Elements bound from inside `frame`'s document
    pub fn bound_in_frame(&self, frame: ElementId) -> Vec<ElementId> {
        let mut elements: Vec<_> = self
            .bindings
            .values()
            .filter(|b| b.frame == Some(frame))
            .map(|b| b.element)
            .collect();
        elements.sort();
        elements
    }

    /// Take every binding out, sorted by element
    pub fn drain(&mut self) -> Vec<MediaElementBinding> {
        let mut all: Vec<_> = self.bindings.drain().map(|(_, b)| b).collect();
        all.sort_by_key(|b| b.element);
        all
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::{AudioGraph, ContextState};

    #[test]
    fn test_one_binding_per_element() {
        let mut table = BindingTable::new();
        let element = ElementId::from(3);

        assert!(table.insert(MediaElementBinding::new(element, NodeHandle::from(10))).is_none());
        let replaced = table.insert(MediaElementBinding::new(element, NodeHandle::from(11)));

        assert_eq!(replaced.map(|b| b.source), Some(NodeHandle::from(10)));
        assert_eq!(table.len(), 1);
        assert_eq!(table.get(element).map(|b| b.source), Some(NodeHandle::from(11)));
    }

    #[test]
    fn test_release_frees_element() {
        let mut graph = AudioGraph::new(ContextState::Running);
        let element = ElementId::from(5);
        let source = graph.create_media_source(&element).unwrap();
        graph.connect(source, graph.destination()).unwrap();

        MediaElementBinding::new(element, source).release(&mut graph);

        assert_eq!(graph.edge_count(), 0);
        assert!(graph.sources_for(element).is_empty());
    }

    #[test]
    fn test_release_of_unknown_node_does_not_panic() {
        let mut graph = AudioGraph::new(ContextState::Running);
        MediaElementBinding::new(ElementId::from(1), NodeHandle::from(99)).release(&mut graph);
        assert_eq!(graph.node_count(), 1);
    }

    #[test]
    fn test_bound_in_frame() {
        let mut table = BindingTable::new();
        let frame = ElementId::from(9);
        table.insert(MediaElementBinding::new(ElementId::from(4), NodeHandle::from(40)).in_frame(frame));
        table.insert(MediaElementBinding::new(ElementId::from(2), NodeHandle::from(41)).in_frame(frame));
        table.insert(MediaElementBinding::new(ElementId::from(3), NodeHandle::from(42)));

        assert_eq!(
            table.bound_in_frame(frame),
            vec![ElementId::from(2), ElementId::from(4)]
        );
        assert!(table.bound_in_frame(ElementId::from(3)).is_empty());
    }

    #[test]
    fn test_drain_empties_table() {
        let mut table = BindingTable::new();
        table.insert(MediaElementBinding::new(ElementId::from(2), NodeHandle::from(20)));
        table.insert(MediaElementBinding::new(ElementId::from(1), NodeHandle::from(21)));

        let drained = table.drain();
        assert_eq!(drained[0].element, ElementId::from(1));
        assert_eq!(drained.len(), 2);
        assert!(table.is_empty());
    }
}
