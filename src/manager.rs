//! Graph Manager - keeps the page's media routed through the booster chain
//!
//! Two inbound ports drive it: the command port ([`GraphManager::handle_message`])
//! and the DOM-change port ([`GraphManager::handle_mutations`]). Both run to
//! completion on the page's event loop, so the manager needs no locking.
//!
//! Lifecycle:
//! - `Uninitialized`: no chain. The first enable builds it.
//! - `Enabled`: chain wired, media bound, watchers installed.
//! - `Disabled`: chain kept at unity gain, nothing bound.
//! - `teardown` returns to `Uninitialized` from either built state.

use crate::api::Command;
use crate::audio::{AudioContext, AudioEngine, EngineError};
use crate::binding::{BindingTable, MediaElementBinding};
use crate::chain::{Levels, ProcessingChain};
use crate::config::BoosterConfig;
use crate::dom::{ElementId, MediaHost, MutationRecord};
use crate::settings::SettingsSnapshot;
use serde_json::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ManagerState {
    Uninitialized,
    Enabled,
    Disabled,
}

pub struct GraphManager<E, H>
where
    E: AudioEngine,
    H: MediaHost<Media = E::Media>,
{
    engine: E,
    host: H,
    config: BoosterConfig,
    enabled: bool,
    levels: Levels,
    chain: Option<ProcessingChain<E::Context>>,
    bindings: BindingTable,
    watchers: usize,
}

impl<E, H> GraphManager<E, H>
where
    E: AudioEngine,
    H: MediaHost<Media = E::Media>,
{
    pub fn new(engine: E, host: H) -> Self {
        Self::with_config(engine, host, BoosterConfig::default())
    }

    pub fn with_config(engine: E, host: H, config: BoosterConfig) -> Self {
        Self {
            engine,
            host,
            config,
            enabled: false,
            levels: Levels::default(),
            chain: None,
            bindings: BindingTable::new(),
            watchers: 0,
        }
    }

    // =========================================================================
    // Command port
    // =========================================================================

    /// Decode and run one message. Unknown or malformed messages are ignored.
    pub fn handle_message(&mut self, message: &Value) {
        match Command::from_message(message) {
            Some(command) => self.dispatch(command),
            None => log::debug!("[GraphManager] Ignoring message {}", message),
        }
    }

    pub fn dispatch(&mut self, command: Command) {
        log::debug!("[GraphManager] {:?}", command);
        match command {
            Command::SetGain { gain } => self.handle_set_gain(gain),
            Command::Enable(levels) => self.handle_enable(levels),
            Command::Disable => self.handle_disable(),
            Command::UpdateVolume(levels) => self.handle_update(levels),
        }
    }

    /// Enable at `gain`; bass and treble stay as they are
    pub fn handle_set_gain(&mut self, gain: f32) {
        let levels = Levels {
            volume: gain,
            ..self.levels
        };
        self.enable_with(levels);
    }

    /// Enable with all three levels, bind existing media and watch for more
    pub fn handle_enable(&mut self, levels: Levels) {
        self.enable_with(levels);
    }

    /// Master back to unity and every element unbound; the chain stays built
    pub fn handle_disable(&mut self) {
        self.enabled = false;
        if let Some(chain) = self.chain.as_mut() {
            if let Err(e) = chain.neutralize() {
                log::error!("[GraphManager] Failed to reset master gain: {}", e);
            }
        }
        self.unbind_all();
    }

    /// Store new levels; they reach the chain only while enabled
    pub fn handle_update(&mut self, levels: Levels) {
        self.levels = self.sanitize(levels);
        if !self.enabled {
            return;
        }
        if let Some(chain) = self.chain.as_mut() {
            if let Err(e) = chain.apply(&self.levels) {
                log::error!("[GraphManager] Failed to apply levels: {}", e);
            }
        }
    }

    /// Page-load initialisation from stored settings
    pub fn restore(&mut self, snapshot: &SettingsSnapshot) {
        if snapshot.enabled {
            log::info!("[GraphManager] Restoring enabled state (gain {})", snapshot.gain);
            self.handle_enable(snapshot.levels());
        }
    }

    /// Dismantle everything: bindings, nodes, context.
    ///
    /// Not reachable through messages; the host calls it when the page goes
    /// away or needs a full reset.
    pub fn teardown(&mut self) {
        self.enabled = false;
        let Some(mut chain) = self.chain.take() else {
            return;
        };
        for binding in self.bindings.drain() {
            binding.release(chain.context_mut());
        }
        if let Err(e) = chain.teardown() {
            log::error!("[GraphManager] Error during teardown: {}", e);
        }
        log::info!("[GraphManager] Torn down");
    }

    // =========================================================================
    // DOM-change port
    // =========================================================================

    /// React to a batch of child-list mutations
    pub fn handle_mutations(&mut self, records: Vec<MutationRecord<H::Node>>) {
        for record in records {
            for node in &record.removed {
                for media in self.media_in(node) {
                    let id = self.host.element_id(&media);
                    self.unbind(id);
                }
                // A detached frame's document may already be gone, so its
                // media is found through the bindings instead
                for frame in self.host.frames_in(node) {
                    let frame_id = self.host.frame_id(&frame);
                    for element in self.bindings.bound_in_frame(frame_id) {
                        self.unbind(element);
                    }
                }
            }
            if !self.enabled {
                continue;
            }
            for node in &record.added {
                for media in self.media_in(node) {
                    self.bind(&media, None);
                }
            }
        }
    }

    /// The node itself if it is media, otherwise the media below it
    fn media_in(&self, node: &H::Node) -> Vec<H::Media> {
        match self.host.as_media(node) {
            Some(media) => vec![media],
            None => self.host.media_descendants(node),
        }
    }

    // =========================================================================
    // Internals
    // =========================================================================

    fn sanitize(&self, levels: Levels) -> Levels {
        Levels {
            volume: self.config.clamp_gain(levels.volume),
            ..levels
        }
    }

    fn enable_with(&mut self, levels: Levels) {
        let previous = (self.enabled, self.levels);
        self.enabled = true;
        self.levels = self.sanitize(levels);

        if let Err(e) = self.build_chain() {
            log::error!("[GraphManager] Error setting up audio processing: {}", e);
            (self.enabled, self.levels) = previous;
            self.resync_chain();
            return;
        }

        self.discover();
        self.install_watcher();
    }

    /// Create the context if needed, complete the chain, apply levels.
    /// A context created here is closed again if the rest fails.
    fn build_chain(&mut self) -> Result<(), EngineError> {
        let fresh = self.chain.is_none();
        if fresh {
            let context = self.engine.create_context()?;
            log::info!("[GraphManager] Audio context created");
            self.chain = Some(ProcessingChain::new(context));
        }
        let Some(chain) = self.chain.as_mut() else {
            return Err(EngineError::Closed);
        };

        let result = chain
            .ensure_built(&self.config)
            .and_then(|_| chain.apply(&self.levels));

        if result.is_err() && fresh {
            if let Some(mut chain) = self.chain.take() {
                if let Err(e) = chain.teardown() {
                    log::debug!("[GraphManager] Error discarding partial setup: {}", e);
                }
            }
        }
        result
    }

    /// Bring an existing chain back in line with the manager's state
    fn resync_chain(&mut self) {
        let Some(chain) = self.chain.as_mut() else {
            return;
        };
        let result = if self.enabled {
            chain.apply(&self.levels)
        } else {
            chain.neutralize()
        };
        if let Err(e) = result {
            log::warn!("[GraphManager] Could not restore previous levels: {}", e);
        }
    }

    /// Bind every media element of the document and of same-origin frames.
    /// Elements that are already bound are left alone.
    fn discover(&mut self) {
        let mut found: Vec<(H::Media, Option<ElementId>)> = self
            .host
            .media_elements()
            .into_iter()
            .map(|media| (media, None))
            .collect();
        for frame in self.host.frames() {
            let frame_id = self.host.frame_id(&frame);
            match self.host.frame_media_elements(&frame) {
                Ok(media) => found.extend(media.into_iter().map(|m| (m, Some(frame_id)))),
                Err(e) => log::debug!("[GraphManager] Could not access iframe content: {}", e),
            }
        }

        for (media, frame) in &found {
            let id = self.host.element_id(media);
            if !self.bindings.contains(id) {
                self.bind(media, *frame);
            }
        }
    }

    fn install_watcher(&mut self) {
        match self.host.observe_mutations() {
            Ok(()) => self.watchers += 1,
            Err(e) => log::warn!("[GraphManager] Could not watch for new media: {}", e),
        }
    }

    /// Route one element into the chain, replacing any previous binding.
    /// `frame` is the iframe whose document holds the element.
    fn bind(&mut self, media: &H::Media, frame: Option<ElementId>) {
        if !self.enabled {
            return;
        }
        let Some(chain) = self.chain.as_mut() else {
            return;
        };
        let Some(entry) = chain.entry() else {
            return;
        };
        let id = self.host.element_id(media);

        if let Some(stale) = self.bindings.remove(id) {
            stale.release(chain.context_mut());
        }

        let context = chain.context_mut();
        let source = match context.create_media_source(media) {
            Ok(source) => source,
            Err(e) => {
                log::warn!(
                    "[GraphManager] Could not connect media element {}: {}",
                    id.raw(),
                    e
                );
                return;
            }
        };
        if let Err(e) = context.connect(source, entry) {
            log::warn!(
                "[GraphManager] Could not connect media element {}: {}",
                id.raw(),
                e
            );
            context.release(source);
            return;
        }

        let binding = MediaElementBinding::new(id, source);
        self.bindings.insert(match frame {
            Some(frame) => binding.in_frame(frame),
            None => binding,
        });
    }

    fn unbind(&mut self, element: ElementId) {
        let Some(binding) = self.bindings.remove(element) else {
            return;
        };
        if let Some(chain) = self.chain.as_mut() {
            binding.release(chain.context_mut());
        }
    }

    fn unbind_all(&mut self) {
        let bindings = self.bindings.drain();
        if let Some(chain) = self.chain.as_mut() {
            for binding in bindings {
                binding.release(chain.context_mut());
            }
        }
    }

    // =========================================================================
    // Queries
    // =========================================================================

    pub fn state(&self) -> ManagerState {
        match (&self.chain, self.enabled) {
            (None, _) => ManagerState::Uninitialized,
            (Some(_), true) => ManagerState::Enabled,
            (Some(_), false) => ManagerState::Disabled,
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn levels(&self) -> Levels {
        self.levels
    }

    pub fn chain(&self) -> Option<&ProcessingChain<E::Context>> {
        self.chain.as_ref()
    }

    /// The live context, once the chain exists
    pub fn context(&self) -> Option<&E::Context> {
        self.chain.as_ref().map(|c| c.context())
    }

    pub fn is_bound(&self, element: ElementId) -> bool {
        self.bindings.contains(element)
    }

    pub fn binding(&self, element: ElementId) -> Option<&MediaElementBinding> {
        self.bindings.get(element)
    }

    pub fn binding_count(&self) -> usize {
        self.bindings.len()
    }

    /// Watchers this manager installed (duplicates included)
    pub fn watcher_count(&self) -> usize {
        self.watchers
    }

    pub fn engine(&self) -> &E {
        &self.engine
    }

    pub fn host(&self) -> &H {
        &self.host
    }

    pub fn host_mut(&mut self) -> &mut H {
        &mut self.host
    }

    pub fn config(&self) -> &BoosterConfig {
        &self.config
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::{AudioGraph, VirtualEngine};
    use crate::dom::VirtualDocument;
    use serde_json::json;

    type TestManager = GraphManager<VirtualEngine, VirtualDocument>;

    fn manager() -> TestManager {
        GraphManager::new(VirtualEngine::new(), VirtualDocument::new())
    }

    fn graph(m: &TestManager) -> &AudioGraph {
        m.context().unwrap()
    }

    /// Sources wrapping `element` that feed the chain entry
    fn live_connections(m: &TestManager, element: ElementId) -> usize {
        let entry = m.chain().and_then(|c| c.entry()).unwrap();
        graph(m)
            .sources_for(element)
            .into_iter()
            .filter(|s| graph(m).edges_from(*s).any(|e| e.target == entry))
            .count()
    }

    fn pump(m: &mut TestManager) {
        for batch in m.host_mut().take_deliveries() {
            m.handle_mutations(batch);
        }
    }

    #[test]
    fn test_starts_uninitialized() {
        let m = manager();
        assert_eq!(m.state(), ManagerState::Uninitialized);
        assert!(m.context().is_none());
        assert_eq!(m.engine().contexts_created(), 0);
    }

    #[test]
    fn test_enable_builds_and_binds() {
        let mut m = manager();
        let body = m.host().body();
        let audio = m.host_mut().append(body, "audio").unwrap();
        let video = m.host_mut().append(body, "video").unwrap();

        m.handle_enable(Levels::new(2.5, 3.0, -2.0));

        assert_eq!(m.state(), ManagerState::Enabled);
        let chain = m.chain().unwrap();
        assert_eq!(chain.master_gain(), Some(2.5));
        assert_eq!(chain.bass_gain(), Some(3.0));
        assert_eq!(chain.treble_gain(), Some(-2.0));
        assert_eq!(live_connections(&m, audio), 1);
        assert_eq!(live_connections(&m, video), 1);
        assert_eq!(m.watcher_count(), 1);
    }

    #[test]
    fn test_set_gain_keeps_filters() {
        let mut m = manager();
        m.handle_enable(Levels::new(1.0, 4.0, 5.0));
        m.handle_set_gain(3.0);

        let chain = m.chain().unwrap();
        assert_eq!(chain.master_gain(), Some(3.0));
        assert_eq!(chain.bass_gain(), Some(4.0));
        assert_eq!(chain.treble_gain(), Some(5.0));
        assert_eq!(m.engine().contexts_created(), 1);
    }

    #[test]
    fn test_set_gain_from_uninitialized() {
        let mut m = manager();
        m.handle_set_gain(1.5);
        assert_eq!(m.state(), ManagerState::Enabled);
        assert_eq!(m.chain().unwrap().master_gain(), Some(1.5));
        assert_eq!(m.chain().unwrap().bass_gain(), Some(0.0));
    }

    #[test]
    fn test_set_gain_after_disable_rebinds() {
        let mut m = manager();
        let body = m.host().body();
        let audio = m.host_mut().append(body, "audio").unwrap();
        m.handle_enable(Levels::new(2.0, 4.0, -3.0));
        m.handle_disable();
        assert_eq!(m.binding_count(), 0);

        m.handle_set_gain(3.0);

        assert_eq!(m.state(), ManagerState::Enabled);
        let chain = m.chain().unwrap();
        assert_eq!(chain.master_gain(), Some(3.0));
        assert_eq!(chain.bass_gain(), Some(4.0));
        assert_eq!(chain.treble_gain(), Some(-3.0));
        assert_eq!(live_connections(&m, audio), 1);
        assert_eq!(m.engine().contexts_created(), 1);
    }

    #[test]
    fn test_gain_is_clamped() {
        let mut m = manager();
        m.handle_set_gain(25.0);
        assert_eq!(m.chain().unwrap().master_gain(), Some(10.0));
        m.handle_update(Levels::new(-1.0, 0.0, 0.0));
        assert_eq!(m.chain().unwrap().master_gain(), Some(0.0));
    }

    #[test]
    fn test_disable_resets_gain_and_unbinds() {
        let mut m = manager();
        let body = m.host().body();
        let audio = m.host_mut().append(body, "audio").unwrap();
        m.handle_enable(Levels::new(7.0, 2.0, 2.0));

        m.handle_disable();

        assert_eq!(m.state(), ManagerState::Disabled);
        assert_eq!(m.chain().unwrap().master_gain(), Some(1.0));
        assert_eq!(m.binding_count(), 0);
        assert!(graph(&m).sources_for(audio).is_empty());
        // chain nodes survive
        assert!(m.chain().unwrap().is_built());
        assert_eq!(m.chain().unwrap().bass_gain(), Some(2.0));
    }

    #[test]
    fn test_disable_before_enable_is_harmless() {
        let mut m = manager();
        m.handle_disable();
        assert_eq!(m.state(), ManagerState::Uninitialized);
    }

    #[test]
    fn test_update_while_disabled_is_deferred() {
        let mut m = manager();
        m.handle_enable(Levels::new(2.0, 0.0, 0.0));
        m.handle_disable();

        m.handle_update(Levels::new(4.0, 1.0, 1.0));
        assert_eq!(m.chain().unwrap().master_gain(), Some(1.0));
        assert_eq!(m.levels(), Levels::new(4.0, 1.0, 1.0));

        m.handle_enable(m.levels());
        assert_eq!(m.chain().unwrap().master_gain(), Some(4.0));
    }

    #[test]
    fn test_update_does_not_rebind() {
        let mut m = manager();
        let body = m.host().body();
        let audio = m.host_mut().append(body, "audio").unwrap();
        m.handle_enable(Levels::default());
        let before = m.binding(audio).copied();

        m.handle_update(Levels::new(3.0, -6.0, 6.0));

        assert_eq!(m.binding(audio).copied(), before);
        assert_eq!(m.chain().unwrap().treble_gain(), Some(6.0));
    }

    #[test]
    fn test_reenable_matches_single_enable() {
        let levels = Levels::new(2.5, 1.0, 1.0);
        let mut once = manager();
        let body = once.host().body();
        once.host_mut().append(body, "audio").unwrap();
        once.handle_enable(levels);

        let mut cycled = manager();
        let body = cycled.host().body();
        let audio = cycled.host_mut().append(body, "audio").unwrap();
        cycled.handle_enable(levels);
        cycled.handle_disable();
        cycled.handle_enable(levels);

        assert_eq!(
            cycled.chain().unwrap().master_gain(),
            once.chain().unwrap().master_gain()
        );
        assert_eq!(live_connections(&cycled, audio), 1);
        assert_eq!(cycled.binding_count(), 1);
        assert_eq!(cycled.engine().contexts_created(), 1);
    }

    #[test]
    fn test_repeated_enable_keeps_existing_bindings() {
        let mut m = manager();
        let body = m.host().body();
        let audio = m.host_mut().append(body, "audio").unwrap();
        m.handle_enable(Levels::default());
        let first = m.binding(audio).copied();

        m.handle_enable(Levels::new(2.0, 0.0, 0.0));

        assert_eq!(m.binding(audio).copied(), first);
        assert_eq!(m.watcher_count(), 2);
    }

    #[test]
    fn test_mutation_binds_new_media() {
        let mut m = manager();
        m.handle_enable(Levels::default());

        let body = m.host().body();
        let video = m.host_mut().append(body, "video").unwrap();
        pump(&mut m);

        assert!(m.is_bound(video));
        assert_eq!(live_connections(&m, video), 1);
    }

    #[test]
    fn test_mutation_scans_descendants() {
        let mut m = manager();
        m.handle_enable(Levels::default());

        let player = m.host_mut().create_element("div");
        let inner = m.host_mut().append(player, "section").unwrap();
        let audio = m.host_mut().append(inner, "audio").unwrap();
        let text = m.host_mut().create_text();
        let body = m.host().body();
        m.host_mut().append_child(body, player).unwrap();
        m.host_mut().append_child(body, text).unwrap();
        pump(&mut m);

        assert!(m.is_bound(audio));
        assert_eq!(m.binding_count(), 1);
    }

    #[test]
    fn test_duplicate_delivery_leaves_one_connection() {
        let mut m = manager();
        m.handle_enable(Levels::default());
        m.handle_enable(Levels::default());
        assert_eq!(m.host().watcher_count(), 2);

        let body = m.host().body();
        let audio = m.host_mut().append(body, "audio").unwrap();
        pump(&mut m);

        assert_eq!(live_connections(&m, audio), 1);
        assert_eq!(graph(&m).sources_for(audio).len(), 1);
    }

    #[test]
    fn test_mutations_ignored_while_disabled() {
        let mut m = manager();
        m.handle_enable(Levels::default());
        m.handle_disable();

        let body = m.host().body();
        let audio = m.host_mut().append(body, "audio").unwrap();
        pump(&mut m);

        assert!(!m.is_bound(audio));
    }

    #[test]
    fn test_removed_media_is_unbound() {
        let mut m = manager();
        let body = m.host().body();
        let wrapper = m.host_mut().append(body, "div").unwrap();
        let audio = m.host_mut().append(wrapper, "audio").unwrap();
        let video = m.host_mut().append(body, "video").unwrap();
        m.handle_enable(Levels::default());

        m.host_mut().remove(wrapper).unwrap();
        pump(&mut m);

        assert!(!m.is_bound(audio));
        assert!(graph(&m).sources_for(audio).is_empty());
        assert!(m.is_bound(video));
    }

    #[test]
    fn test_removed_frame_unbinds_its_media() {
        let mut m = manager();
        let body = m.host().body();
        let wrapper = m.host_mut().append(body, "div").unwrap();
        let (frame, frame_body) = m.host_mut().add_frame(false).unwrap();
        m.host_mut().append_child(wrapper, frame).unwrap();
        let inner = m.host_mut().append(frame_body, "video").unwrap();
        let (_, kept_body) = m.host_mut().add_frame(false).unwrap();
        let kept = m.host_mut().append(kept_body, "audio").unwrap();
        m.handle_enable(Levels::default());
        assert!(m.is_bound(inner));

        m.host_mut().remove(wrapper).unwrap();
        pump(&mut m);

        assert!(!m.is_bound(inner));
        assert!(graph(&m).sources_for(inner).is_empty());
        assert!(m.is_bound(kept));
        assert_eq!(m.binding_count(), 1);
    }

    #[test]
    fn test_moved_media_stays_bound() {
        let mut m = manager();
        let body = m.host().body();
        let a = m.host_mut().append(body, "div").unwrap();
        let b = m.host_mut().append(body, "div").unwrap();
        let video = m.host_mut().append(a, "video").unwrap();
        m.handle_enable(Levels::default());

        m.host_mut().append_child(b, video).unwrap();
        pump(&mut m);

        assert_eq!(live_connections(&m, video), 1);
    }

    #[test]
    fn test_frames_same_and_cross_origin() {
        let mut m = manager();
        let (_, same_body) = m.host_mut().add_frame(false).unwrap();
        let (_, cross_body) = m.host_mut().add_frame(true).unwrap();
        let inner = m.host_mut().append(same_body, "video").unwrap();
        let hidden = m.host_mut().append(cross_body, "audio").unwrap();

        m.handle_enable(Levels::default());

        assert_eq!(m.state(), ManagerState::Enabled);
        assert!(m.is_bound(inner));
        assert!(!m.is_bound(hidden));
    }

    #[test]
    fn test_one_failed_bind_does_not_stop_others() {
        let mut doc = VirtualDocument::new();
        let body = doc.body();
        let first = doc.append(body, "audio").unwrap();
        let blocked = doc.append(body, "video").unwrap();
        let last = doc.append(body, "audio").unwrap();
        let engine = VirtualEngine::new().deny_media(blocked);
        let mut m = GraphManager::new(engine, doc);

        m.handle_enable(Levels::default());

        assert!(m.is_bound(first));
        assert!(!m.is_bound(blocked));
        assert!(m.is_bound(last));
    }

    #[test]
    fn test_unsupported_engine_is_a_no_op() {
        let mut doc = VirtualDocument::new();
        let body = doc.body();
        doc.append(body, "audio").unwrap();
        let mut m = GraphManager::new(VirtualEngine::unsupported(), doc);

        m.handle_enable(Levels::new(3.0, 0.0, 0.0));

        assert_eq!(m.state(), ManagerState::Uninitialized);
        assert!(!m.is_enabled());
        assert_eq!(m.levels(), Levels::default());
        assert_eq!(m.binding_count(), 0);
        assert_eq!(m.watcher_count(), 0);
    }

    #[test]
    fn test_failed_node_creation_rolls_back() {
        let mut m = GraphManager::new(
            VirtualEngine::new().fail_node_creation(),
            VirtualDocument::new(),
        );
        m.handle_set_gain(2.0);

        assert_eq!(m.state(), ManagerState::Uninitialized);
        assert!(!m.is_enabled());
        assert_eq!(m.engine().contexts_created(), 1);
    }

    #[test]
    fn test_suspended_context_is_resumed() {
        let mut m = GraphManager::new(VirtualEngine::new().start_suspended(), VirtualDocument::new());
        m.handle_enable(Levels::default());
        assert_eq!(graph(&m).resume_requests(), 1);
    }

    #[test]
    fn test_watcher_failure_is_not_fatal() {
        let mut doc = VirtualDocument::new();
        doc.set_fail_observe(true);
        let body = doc.body();
        let audio = doc.append(body, "audio").unwrap();
        let mut m = GraphManager::new(VirtualEngine::new(), doc);

        m.handle_enable(Levels::default());

        assert_eq!(m.state(), ManagerState::Enabled);
        assert!(m.is_bound(audio));
        assert_eq!(m.watcher_count(), 0);
    }

    #[test]
    fn test_teardown_returns_to_uninitialized() {
        let mut m = manager();
        let body = m.host().body();
        let audio = m.host_mut().append(body, "audio").unwrap();
        m.handle_enable(Levels::new(2.0, 0.0, 0.0));

        m.teardown();

        assert_eq!(m.state(), ManagerState::Uninitialized);
        assert!(!m.is_bound(audio));
        assert!(m.context().is_none());

        m.handle_enable(Levels::new(2.0, 0.0, 0.0));
        assert_eq!(m.engine().contexts_created(), 2);
        assert!(m.is_bound(audio));
    }

    #[test]
    fn test_unknown_message_changes_nothing() {
        let mut m = manager();
        m.handle_enable(Levels::new(2.0, 1.0, 1.0));

        m.handle_message(&json!({ "command": "foo" }));
        m.handle_message(&json!({ "action": "foo", "volume": 9 }));
        m.handle_message(&json!(42));

        assert_eq!(m.state(), ManagerState::Enabled);
        assert_eq!(m.levels(), Levels::new(2.0, 1.0, 1.0));
        assert_eq!(m.chain().unwrap().master_gain(), Some(2.0));
    }

    #[test]
    fn test_message_port_drives_handlers() {
        let mut m = manager();
        m.handle_message(&json!({ "action": "enableBoost", "volume": 2.5, "bass": 3, "treble": -2 }));
        assert_eq!(m.chain().unwrap().master_gain(), Some(2.5));

        m.handle_message(&json!({ "type": "disableBoost" }));
        assert_eq!(m.state(), ManagerState::Disabled);
        assert_eq!(m.chain().unwrap().master_gain(), Some(1.0));
    }

    #[test]
    fn test_restore_only_when_enabled() {
        let mut m = manager();
        m.restore(&SettingsSnapshot::default());
        assert_eq!(m.state(), ManagerState::Uninitialized);

        let snapshot = SettingsSnapshot {
            gain: 3.0,
            enabled: true,
            bass_db: 2.0,
            treble_db: 0.0,
        };
        m.restore(&snapshot);
        assert_eq!(m.chain().unwrap().master_gain(), Some(3.0));
        assert_eq!(m.chain().unwrap().bass_gain(), Some(2.0));
    }
}
