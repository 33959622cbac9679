//! The live page as a [`MediaHost`]

use super::WebManager;
use crate::dom::{DomError, ElementId, MediaHost, MutationRecord};
use std::cell::{Cell, RefCell};
use std::rc::Weak;
use wasm_bindgen::prelude::*;
use wasm_bindgen::JsCast;
use web_sys::{
    Document, Element, HtmlIFrameElement, HtmlMediaElement, MutationObserver,
    MutationObserverInit, Node, NodeList,
};

const MEDIA_SELECTOR: &str = "audio, video";
const ID_PROPERTY: &str = "__soundBoosterId";

thread_local! {
    static NEXT_ID: Cell<u32> = const { Cell::new(1) };
}

/// Id stamped on `element`, assigning one on first sight
pub(crate) fn element_id(element: &JsValue) -> ElementId {
    let key = JsValue::from_str(ID_PROPERTY);
    if let Some(id) = js_sys::Reflect::get(element, &key)
        .ok()
        .and_then(|v| v.as_f64())
    {
        return ElementId::from(id as u32);
    }
    let id = NEXT_ID.with(|next| {
        let id = next.get();
        next.set(id + 1);
        id
    });
    if js_sys::Reflect::set(element, &key, &JsValue::from(id)).is_err() {
        log::warn!("[Document] Could not stamp element {}", id);
    }
    ElementId::from(id)
}

fn query_failed(e: JsValue) -> DomError {
    DomError::Query(format!("{:?}", e))
}

/// Frame documents live in another realm, so `instanceof` checks fail there.
/// Match on the tag instead.
fn media_from_node(node: Node) -> Option<HtmlMediaElement> {
    if node.node_type() != Node::ELEMENT_NODE {
        return None;
    }
    match node.node_name().to_ascii_uppercase().as_str() {
        "AUDIO" | "VIDEO" => Some(node.unchecked_into()),
        _ => None,
    }
}

fn collect<T>(list: &NodeList, convert: impl Fn(Node) -> Option<T>) -> Vec<T> {
    (0..list.length())
        .filter_map(|i| list.get(i))
        .filter_map(convert)
        .collect()
}

fn nodes(list: &NodeList) -> Vec<Node> {
    collect(list, Some)
}

type MutationCallback = Closure<dyn FnMut(js_sys::Array, MutationObserver)>;

pub struct WebDocument {
    document: Document,
    manager: Weak<RefCell<WebManager>>,
    observers: Vec<(MutationObserver, MutationCallback)>,
}

impl WebDocument {
    pub fn new(document: Document, manager: Weak<RefCell<WebManager>>) -> Self {
        Self {
            document,
            manager,
            observers: Vec::new(),
        }
    }

    fn media_in(&self, root: &Document) -> Vec<HtmlMediaElement> {
        match root.query_selector_all(MEDIA_SELECTOR) {
            Ok(list) => collect(&list, media_from_node),
            Err(e) => {
                log::warn!("[Document] Media query failed: {:?}", e);
                Vec::new()
            }
        }
    }
}

impl Drop for WebDocument {
    fn drop(&mut self) {
        for (observer, _callback) in self.observers.drain(..) {
            observer.disconnect();
        }
    }
}

impl MediaHost for WebDocument {
    type Media = HtmlMediaElement;
    type Frame = HtmlIFrameElement;
    type Node = Node;

    fn element_id(&self, media: &HtmlMediaElement) -> ElementId {
        element_id(media.as_ref())
    }

    fn frame_id(&self, frame: &HtmlIFrameElement) -> ElementId {
        element_id(frame.as_ref())
    }

    fn media_elements(&self) -> Vec<HtmlMediaElement> {
        self.media_in(&self.document)
    }

    fn frames(&self) -> Vec<HtmlIFrameElement> {
        match self.document.query_selector_all("iframe") {
            Ok(list) => collect(&list, |node| node.dyn_into().ok()),
            Err(e) => {
                log::warn!("[Document] Frame query failed: {:?}", e);
                Vec::new()
            }
        }
    }

    fn frame_media_elements(
        &self,
        frame: &HtmlIFrameElement,
    ) -> Result<Vec<HtmlMediaElement>, DomError> {
        let document = frame.content_document().ok_or(DomError::CrossOrigin)?;
        Ok(self.media_in(&document))
    }

    fn as_media(&self, node: &Node) -> Option<HtmlMediaElement> {
        media_from_node(node.clone())
    }

    fn media_descendants(&self, node: &Node) -> Vec<HtmlMediaElement> {
        if node.node_type() != Node::ELEMENT_NODE {
            return Vec::new();
        }
        let element: &Element = node.unchecked_ref();
        match element.query_selector_all(MEDIA_SELECTOR) {
            Ok(list) => collect(&list, media_from_node),
            Err(_) => Vec::new(),
        }
    }

    fn frames_in(&self, node: &Node) -> Vec<HtmlIFrameElement> {
        if node.node_type() != Node::ELEMENT_NODE {
            return Vec::new();
        }
        let mut frames = Vec::new();
        if node.node_name().eq_ignore_ascii_case("IFRAME") {
            frames.push(node.clone().unchecked_into());
        }
        let element: &Element = node.unchecked_ref();
        if let Ok(list) = element.query_selector_all("iframe") {
            frames.extend(collect(&list, |n| Some(n.unchecked_into())));
        }
        frames
    }

    fn observe_mutations(&mut self) -> Result<(), DomError> {
        let manager = self.manager.clone();
        let callback = MutationCallback::new(move |records: js_sys::Array, _: MutationObserver| {
            let batch: Vec<MutationRecord<Node>> = records
                .iter()
                .map(|record| {
                    let record: web_sys::MutationRecord = record.unchecked_into();
                    MutationRecord {
                        added: nodes(&record.added_nodes()),
                        removed: nodes(&record.removed_nodes()),
                    }
                })
                .collect();
            let Some(manager) = manager.upgrade() else {
                return;
            };
            // Mutations raised while the manager is mid-command are dropped
            match manager.try_borrow_mut() {
                Ok(mut manager) => manager.handle_mutations(batch),
                Err(_) => {
                    log::warn!("[Document] Manager busy, dropped {} records", records.length())
                }
            };
        });

        let observer =
            MutationObserver::new(callback.as_ref().unchecked_ref()).map_err(query_failed)?;
        let init = MutationObserverInit::new();
        init.set_child_list(true);
        init.set_subtree(true);
        let target: Node = match self.document.body() {
            Some(body) => body.into(),
            None => self.document.clone().into(),
        };
        observer
            .observe_with_options(&target, &init)
            .map_err(query_failed)?;

        self.observers.push((observer, callback));
        Ok(())
    }
}
