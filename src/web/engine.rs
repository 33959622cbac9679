//! Web Audio engine backed by the page's `AudioContext`

use super::document::element_id;
use crate::audio::{AudioContext, AudioEngine, ContextState, EngineError, NodeHandle, ShelfKind};
use crate::dom::ElementId;
use std::collections::HashMap;
use wasm_bindgen::JsValue;
use web_sys::{AudioContextState, AudioNode, AudioParam, BiquadFilterType, HtmlMediaElement};

fn rejected(e: JsValue) -> EngineError {
    EngineError::Rejected(format!("{:?}", e))
}

#[derive(Debug, Default, Clone, Copy)]
pub struct WebAudioEngine;

impl AudioEngine for WebAudioEngine {
    type Media = HtmlMediaElement;
    type Context = WebContext;

    fn create_context(&self) -> Result<WebContext, EngineError> {
        let context = web_sys::AudioContext::new().map_err(|e| {
            log::warn!("[WebAudio] AudioContext unavailable: {:?}", e);
            EngineError::Unsupported
        })?;
        Ok(WebContext::new(context))
    }
}

struct WebNode {
    node: AudioNode,
    /// Gain parameter, if the node has one
    param: Option<AudioParam>,
    /// Element a source node wraps
    element: Option<ElementId>,
}

/// A live `AudioContext` plus handles for the nodes created on it.
///
/// The browser lets an element feed exactly one source node for the lifetime
/// of the context, so released source nodes are kept and handed out again
/// when the same element is bound a second time.
pub struct WebContext {
    context: web_sys::AudioContext,
    nodes: HashMap<NodeHandle, WebNode>,
    sources: HashMap<ElementId, AudioNode>,
    live_sources: HashMap<ElementId, NodeHandle>,
    destination: NodeHandle,
    next_handle: u32,
}

impl WebContext {
    fn new(context: web_sys::AudioContext) -> Self {
        let destination = NodeHandle::new(0);
        let mut nodes = HashMap::new();
        nodes.insert(
            destination,
            WebNode {
                node: context.destination().into(),
                param: None,
                element: None,
            },
        );
        Self {
            context,
            nodes,
            sources: HashMap::new(),
            live_sources: HashMap::new(),
            destination,
            next_handle: 1,
        }
    }

    fn insert(
        &mut self,
        node: AudioNode,
        param: Option<AudioParam>,
        element: Option<ElementId>,
    ) -> NodeHandle {
        let handle = NodeHandle::new(self.next_handle);
        self.next_handle += 1;
        self.nodes.insert(handle, WebNode { node, param, element });
        handle
    }

    fn node(&self, handle: NodeHandle) -> Result<&WebNode, EngineError> {
        self.nodes.get(&handle).ok_or(EngineError::UnknownNode(handle))
    }

    fn ensure_open(&self) -> Result<(), EngineError> {
        match self.state() {
            ContextState::Closed => Err(EngineError::Closed),
            _ => Ok(()),
        }
    }
}

impl AudioContext for WebContext {
    type Media = HtmlMediaElement;

    fn state(&self) -> ContextState {
        match self.context.state() {
            AudioContextState::Running => ContextState::Running,
            AudioContextState::Closed => ContextState::Closed,
            _ => ContextState::Suspended,
        }
    }

    fn resume(&mut self) {
        match self.context.resume() {
            Ok(promise) => wasm_bindgen_futures::spawn_local(async move {
                if let Err(e) = wasm_bindgen_futures::JsFuture::from(promise).await {
                    // Autoplay policy: stays suspended until a user gesture
                    log::debug!("[WebAudio] Resume rejected: {:?}", e);
                }
            }),
            Err(e) => log::warn!("[WebAudio] Resume failed: {:?}", e),
        }
    }

    fn close(&mut self) -> Result<(), EngineError> {
        self.context.close().map(|_| ()).map_err(rejected)?;
        self.sources.clear();
        self.live_sources.clear();
        Ok(())
    }

    fn destination(&self) -> NodeHandle {
        self.destination
    }

    fn create_gain(&mut self) -> Result<NodeHandle, EngineError> {
        self.ensure_open()?;
        let gain = self.context.create_gain().map_err(rejected)?;
        let param = gain.gain();
        Ok(self.insert(gain.into(), Some(param), None))
    }

    fn create_shelf_filter(
        &mut self,
        kind: ShelfKind,
        frequency_hz: f32,
    ) -> Result<NodeHandle, EngineError> {
        self.ensure_open()?;
        let filter = self.context.create_biquad_filter().map_err(rejected)?;
        filter.set_type(match kind {
            ShelfKind::LowShelf => BiquadFilterType::Lowshelf,
            ShelfKind::HighShelf => BiquadFilterType::Highshelf,
        });
        filter.frequency().set_value(frequency_hz);
        let param = filter.gain();
        param.set_value(0.0);
        Ok(self.insert(filter.into(), Some(param), None))
    }

    fn create_media_source(&mut self, media: &HtmlMediaElement) -> Result<NodeHandle, EngineError> {
        self.ensure_open()?;
        let element = element_id(media.as_ref());
        if self.live_sources.contains_key(&element) {
            return Err(EngineError::MediaAlreadyCaptured);
        }
        let node = match self.sources.get(&element) {
            Some(node) => node.clone(),
            None => {
                let node: AudioNode = self
                    .context
                    .create_media_element_source(media)
                    .map_err(|e| {
                        // InvalidStateError: another context already owns it
                        log::debug!("[WebAudio] Element {} refused: {:?}", element.raw(), e);
                        EngineError::MediaAlreadyCaptured
                    })?
                    .into();
                self.sources.insert(element, node.clone());
                node
            }
        };
        let handle = self.insert(node, None, Some(element));
        self.live_sources.insert(element, handle);
        Ok(handle)
    }

    fn connect(&mut self, from: NodeHandle, to: NodeHandle) -> Result<(), EngineError> {
        let source = &self.node(from)?.node;
        let target = &self.node(to)?.node;
        source
            .connect_with_audio_node(target)
            .map(|_| ())
            .map_err(rejected)
    }

    fn disconnect(&mut self, node: NodeHandle) -> Result<(), EngineError> {
        self.node(node)?.node.disconnect().map_err(rejected)
    }

    fn release(&mut self, node: NodeHandle) {
        if node == self.destination {
            return;
        }
        if let Some(released) = self.nodes.remove(&node) {
            if let Some(element) = released.element {
                self.live_sources.remove(&element);
            }
        }
    }

    fn set_gain(&mut self, node: NodeHandle, value: f32) -> Result<(), EngineError> {
        let param = self
            .node(node)?
            .param
            .as_ref()
            .ok_or_else(|| EngineError::Rejected("node has no gain parameter".into()))?;
        param.set_value(value);
        Ok(())
    }

    fn gain(&self, node: NodeHandle) -> Option<f32> {
        self.nodes.get(&node)?.param.as_ref().map(AudioParam::value)
    }
}
