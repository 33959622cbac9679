//! DOM Module - how the manager sees the page
//!
//! The manager discovers media through a [`MediaHost`] and learns about DOM
//! changes through [`MutationRecord`] batches, so it can run against the real
//! document or the synthetic [`VirtualDocument`].

mod virtual_dom;

pub use virtual_dom::VirtualDocument;

use thiserror::Error;

/// Identity stamped on a media element.
///
/// The element keeps this as its only back-reference to the manager; the
/// binding itself lives in the manager.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ElementId(u32);

impl ElementId {
    pub fn raw(&self) -> u32 {
        self.0
    }
}

impl From<u32> for ElementId {
    fn from(id: u32) -> Self {
        Self(id)
    }
}

impl From<ElementId> for u32 {
    fn from(id: ElementId) -> Self {
        id.0
    }
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum DomError {
    #[error("frame content is cross-origin")]
    CrossOrigin,
    #[error("node is not attached to a document")]
    Detached,
    #[error("dom query failed: {0}")]
    Query(String),
}

/// One child-list change observed in the page
#[derive(Debug, Clone, PartialEq)]
pub struct MutationRecord<N> {
    pub added: Vec<N>,
    pub removed: Vec<N>,
}

impl<N> MutationRecord<N> {
    pub fn added(nodes: Vec<N>) -> Self {
        Self {
            added: nodes,
            removed: Vec::new(),
        }
    }

    pub fn removed(nodes: Vec<N>) -> Self {
        Self {
            added: Vec::new(),
            removed: nodes,
        }
    }
}

impl<N> Default for MutationRecord<N> {
    fn default() -> Self {
        Self {
            added: Vec::new(),
            removed: Vec::new(),
        }
    }
}

/// Read access to the page's media elements
pub trait MediaHost {
    /// An `<audio>` or `<video>` element
    type Media;
    /// An `<iframe>` element
    type Frame;
    /// Any node that can show up in a mutation record
    type Node;

    fn element_id(&self, media: &Self::Media) -> ElementId;

    fn frame_id(&self, frame: &Self::Frame) -> ElementId;

    /// Every media element of the top document
    fn media_elements(&self) -> Vec<Self::Media>;

    /// Every frame of the top document
    fn frames(&self) -> Vec<Self::Frame>;

    /// Media elements inside a frame's document.
    /// Fails with [`DomError::CrossOrigin`] when the document is off limits.
    fn frame_media_elements(&self, frame: &Self::Frame) -> Result<Vec<Self::Media>, DomError>;

    /// The node itself, if it is a media element
    fn as_media(&self, node: &Self::Node) -> Option<Self::Media>;

    /// Media elements below `node`; empty for non-element nodes
    fn media_descendants(&self, node: &Self::Node) -> Vec<Self::Media>;

    /// Frames at or below `node`. Their documents are not entered.
    fn frames_in(&self, node: &Self::Node) -> Vec<Self::Frame>;

    /// Start delivering child-list mutations of the document body (subtree)
    /// to the manager. Every call installs one more watcher.
    fn observe_mutations(&mut self) -> Result<(), DomError>;
}
