//! Synthetic document
//!
//! A small element tree with frames and a mutation queue. It stands in for
//! the browser DOM wherever the manager runs outside a page.

use super::{DomError, ElementId, MediaHost, MutationRecord};
use std::collections::HashMap;

#[derive(Debug, Clone)]
struct VirtualNode {
    /// `None` for text nodes
    tag: Option<String>,
    parent: Option<ElementId>,
    children: Vec<ElementId>,
    /// Root of the frame's document (iframes only)
    content: Option<ElementId>,
    cross_origin: bool,
}

impl VirtualNode {
    fn element(tag: &str) -> Self {
        Self {
            tag: Some(tag.to_ascii_lowercase()),
            parent: None,
            children: Vec::new(),
            content: None,
            cross_origin: false,
        }
    }

    fn text() -> Self {
        Self {
            tag: None,
            ..Self::element("")
        }
    }

    fn is_media(&self) -> bool {
        matches!(self.tag.as_deref(), Some("audio") | Some("video"))
    }

    fn is_frame(&self) -> bool {
        self.tag.as_deref() == Some("iframe")
    }
}

/// In-memory DOM
///
/// Mutations below `body` are queued while at least one watcher is
/// installed. Frame documents are separate trees and never produce records.
#[derive(Debug)]
pub struct VirtualDocument {
    nodes: HashMap<ElementId, VirtualNode>,
    body: ElementId,
    next_id: u32,
    watchers: usize,
    pending: Vec<MutationRecord<ElementId>>,
    fail_observe: bool,
}

impl VirtualDocument {
    pub fn new() -> Self {
        let body = ElementId::from(1);
        let mut nodes = HashMap::new();
        nodes.insert(body, VirtualNode::element("body"));
        Self {
            nodes,
            body,
            next_id: 2,
            watchers: 0,
            pending: Vec::new(),
            fail_observe: false,
        }
    }

    pub fn body(&self) -> ElementId {
        self.body
    }

    fn insert(&mut self, node: VirtualNode) -> ElementId {
        let id = ElementId::from(self.next_id);
        self.next_id += 1;
        self.nodes.insert(id, node);
        id
    }

    /// Create a detached element
    pub fn create_element(&mut self, tag: &str) -> ElementId {
        self.insert(VirtualNode::element(tag))
    }

    /// Create a detached text node
    pub fn create_text(&mut self) -> ElementId {
        self.insert(VirtualNode::text())
    }

    /// Create an element and append it to `parent`
    pub fn append(&mut self, parent: ElementId, tag: &str) -> Result<ElementId, DomError> {
        let child = self.create_element(tag);
        self.append_child(parent, child)?;
        Ok(child)
    }

    /// Move `child` (and its subtree) under `parent`
    pub fn append_child(&mut self, parent: ElementId, child: ElementId) -> Result<(), DomError> {
        let parent_is_element = self
            .nodes
            .get(&parent)
            .map(|n| n.tag.is_some())
            .ok_or_else(|| DomError::Query(format!("no node {}", parent.raw())))?;
        if !parent_is_element || !self.nodes.contains_key(&child) {
            return Err(DomError::Query(format!(
                "cannot append {} to {}",
                child.raw(),
                parent.raw()
            )));
        }
        if child == parent || self.ancestors(parent).contains(&child) {
            return Err(DomError::Query("append would create a cycle".into()));
        }

        if self.parent_of(child).is_some() {
            self.remove(child)?;
        }

        if let Some(node) = self.nodes.get_mut(&child) {
            node.parent = Some(parent);
        }
        if let Some(node) = self.nodes.get_mut(&parent) {
            node.children.push(child);
        }
        if self.is_attached(child) {
            self.record(MutationRecord::added(vec![child]));
        }
        Ok(())
    }

    /// Detach `node` (and its subtree) from its parent
    pub fn remove(&mut self, node: ElementId) -> Result<(), DomError> {
        let parent = self.parent_of(node).ok_or(DomError::Detached)?;
        let was_attached = self.is_attached(node);

        if let Some(p) = self.nodes.get_mut(&parent) {
            p.children.retain(|c| *c != node);
        }
        if let Some(n) = self.nodes.get_mut(&node) {
            n.parent = None;
        }
        if was_attached {
            self.record(MutationRecord::removed(vec![node]));
        }
        Ok(())
    }

    /// Append an `<iframe>` to the body; returns the frame element and the
    /// body of its document
    pub fn add_frame(&mut self, cross_origin: bool) -> Result<(ElementId, ElementId), DomError> {
        let frame = self.append(self.body, "iframe")?;
        let content = self.create_element("body");
        if let Some(node) = self.nodes.get_mut(&frame) {
            node.content = Some(content);
            node.cross_origin = cross_origin;
        }
        Ok((frame, content))
    }

    pub fn parent_of(&self, node: ElementId) -> Option<ElementId> {
        self.nodes.get(&node).and_then(|n| n.parent)
    }

    fn ancestors(&self, node: ElementId) -> Vec<ElementId> {
        let mut out = Vec::new();
        let mut current = self.parent_of(node);
        while let Some(p) = current {
            out.push(p);
            current = self.parent_of(p);
        }
        out
    }

    /// Whether `node` hangs below the top document body
    pub fn is_attached(&self, node: ElementId) -> bool {
        node == self.body || self.ancestors(node).contains(&self.body)
    }

    fn record(&mut self, record: MutationRecord<ElementId>) {
        if self.watchers > 0 {
            self.pending.push(record);
        }
    }

    /// Drain queued mutations, one batch per installed watcher
    pub fn take_deliveries(&mut self) -> Vec<Vec<MutationRecord<ElementId>>> {
        if self.pending.is_empty() {
            return Vec::new();
        }
        let records = std::mem::take(&mut self.pending);
        vec![records; self.watchers]
    }

    pub fn watcher_count(&self) -> usize {
        self.watchers
    }

    /// Make `observe_mutations` fail
    pub fn set_fail_observe(&mut self, fail: bool) {
        self.fail_observe = fail;
    }

    /// Media elements strictly below `root`, in document order.
    /// Frame documents are not entered.
    fn collect_media(&self, root: ElementId) -> Vec<ElementId> {
        let mut out = Vec::new();
        let mut stack: Vec<ElementId> = self
            .nodes
            .get(&root)
            .map(|n| n.children.iter().rev().copied().collect())
            .unwrap_or_default();

        while let Some(id) = stack.pop() {
            let Some(node) = self.nodes.get(&id) else { continue };
            if node.is_media() {
                out.push(id);
            }
            stack.extend(node.children.iter().rev().copied());
        }
        out
    }

    /// Frames at or below `root`
    fn collect_frames(&self, root: ElementId) -> Vec<ElementId> {
        let mut out = Vec::new();
        let mut stack = vec![root];
        while let Some(id) = stack.pop() {
            let Some(node) = self.nodes.get(&id) else { continue };
            if node.is_frame() {
                out.push(id);
            }
            stack.extend(node.children.iter().rev().copied());
        }
        out
    }
}

impl Default for VirtualDocument {
    fn default() -> Self {
        Self::new()
    }
}

impl MediaHost for VirtualDocument {
    type Media = ElementId;
    type Frame = ElementId;
    type Node = ElementId;

    fn element_id(&self, media: &ElementId) -> ElementId {
        *media
    }

    fn frame_id(&self, frame: &ElementId) -> ElementId {
        *frame
    }

    fn media_elements(&self) -> Vec<ElementId> {
        self.collect_media(self.body)
    }

    fn frames(&self) -> Vec<ElementId> {
        self.collect_frames(self.body)
    }

    fn frame_media_elements(&self, frame: &ElementId) -> Result<Vec<ElementId>, DomError> {
        let node = self
            .nodes
            .get(frame)
            .filter(|n| n.is_frame())
            .ok_or_else(|| DomError::Query(format!("{} is not a frame", frame.raw())))?;
        if node.cross_origin {
            return Err(DomError::CrossOrigin);
        }
        Ok(node
            .content
            .map(|root| self.collect_media(root))
            .unwrap_or_default())
    }

    fn as_media(&self, node: &ElementId) -> Option<ElementId> {
        self.nodes
            .get(node)
            .filter(|n| n.is_media())
            .map(|_| *node)
    }

    fn media_descendants(&self, node: &ElementId) -> Vec<ElementId> {
        self.collect_media(*node)
    }

    fn frames_in(&self, node: &ElementId) -> Vec<ElementId> {
        self.collect_frames(*node)
    }

    fn observe_mutations(&mut self) -> Result<(), DomError> {
        if self.fail_observe {
            return Err(DomError::Query("mutation observer unavailable".into()));
        }
        self.watchers += 1;
        Ok(())
    }
}
