//! Content-script entry: wires the graph manager to the live page

mod document;
mod engine;
mod runtime;

pub use document::WebDocument;
pub use engine::{WebAudioEngine, WebContext};

use crate::config::BoosterConfig;
use crate::manager::GraphManager;
use crate::settings::{decode_snapshot, settings_keys, SiteKey};
use std::cell::RefCell;
use std::rc::{Rc, Weak};
use wasm_bindgen::prelude::*;
use wasm_bindgen::JsCast;

pub type WebManager = GraphManager<WebAudioEngine, WebDocument>;

thread_local! {
    static MANAGER: RefCell<Option<Rc<RefCell<WebManager>>>> = const { RefCell::new(None) };
}

#[cfg(feature = "console_error_panic_hook")]
pub fn set_panic_hook() {
    console_error_panic_hook::set_once();
}

fn with_manager(manager: &Weak<RefCell<WebManager>>, f: impl FnOnce(&mut WebManager)) {
    let Some(manager) = manager.upgrade() else {
        return;
    };
    match manager.try_borrow_mut() {
        Ok(mut manager) => f(&mut manager),
        Err(_) => log::warn!("[Content] Manager busy, event dropped"),
    };
}

#[wasm_bindgen(start)]
pub fn start() -> Result<(), JsValue> {
    #[cfg(feature = "console_error_panic_hook")]
    set_panic_hook();

    console_log::init_with_level(log::Level::Debug).ok();
    log::info!("[Content] Sound Booster content script loaded");

    let window = web_sys::window().ok_or("no window")?;
    let document = window.document().ok_or("no document")?;
    let config = BoosterConfig::default();

    let manager = Rc::new_cyclic(|weak: &Weak<RefCell<WebManager>>| {
        RefCell::new(GraphManager::with_config(
            WebAudioEngine,
            WebDocument::new(document, weak.clone()),
            config.clone(),
        ))
    });
    let handle = Rc::downgrade(&manager);
    MANAGER.with(|slot| *slot.borrow_mut() = Some(manager));

    // Command port
    let port = handle.clone();
    if let Err(e) = runtime::on_message(move |message| {
        with_manager(&port, |manager| manager.handle_message(&message));
    }) {
        log::error!("[Content] Could not listen for messages: {:?}", e);
    }

    // Stored settings
    let site = SiteKey::from_url(&window.location().href()?);
    let restore = handle.clone();
    wasm_bindgen_futures::spawn_local(async move {
        match runtime::storage_get(&settings_keys(&site)).await {
            Ok(stored) => {
                let snapshot = decode_snapshot(&site, &stored, &config);
                with_manager(&restore, |manager| manager.restore(&snapshot));
            }
            Err(e) => log::error!("[Content] Failed to load settings: {}", e),
        }
    });

    // Full teardown when the page is discarded; kept pages keep their graph
    let on_pagehide = Closure::<dyn FnMut(web_sys::PageTransitionEvent)>::new(
        move |event: web_sys::PageTransitionEvent| {
            if !event.persisted() {
                with_manager(&handle, WebManager::teardown);
            }
        },
    );
    window.add_event_listener_with_callback("pagehide", on_pagehide.as_ref().unchecked_ref())?;
    on_pagehide.forget();

    Ok(())
}
