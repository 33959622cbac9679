//! Tab messaging capability

use crossbeam_channel::{Receiver, Sender, TryRecvError};
use parking_lot::RwLock;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum MessageError {
    #[error("no receiver in tab {0}")]
    NoReceiver(u32),
    #[error("messaging failed: {0}")]
    Transport(String),
}

/// The browser tab the panel was opened on
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Tab {
    pub id: u32,
    pub url: Option<String>,
}

/// Reach the page script of a tab
pub trait TabMessenger {
    fn active_tab(&self) -> Option<Tab>;

    /// Deliver `message` to the page script of `tab_id`
    fn send(&self, tab_id: u32, message: Value) -> Result<(), MessageError>;
}

/// In-process messenger: each registered tab owns a channel inbox
#[derive(Debug, Clone, Default)]
pub struct ChannelMessenger {
    active: Arc<RwLock<Option<Tab>>>,
    inboxes: Arc<RwLock<HashMap<u32, Sender<Value>>>>,
}

impl ChannelMessenger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_active_tab(&self, tab: Option<Tab>) {
        *self.active.write() = tab;
    }

    /// Register a page script for `tab_id`; the receiver is its inbox
    pub fn connect(&self, tab_id: u32) -> Receiver<Value> {
        let (tx, rx) = crossbeam_channel::unbounded();
        self.inboxes.write().insert(tab_id, tx);
        rx
    }
}

impl TabMessenger for ChannelMessenger {
    fn active_tab(&self) -> Option<Tab> {
        self.active.read().clone()
    }

    fn send(&self, tab_id: u32, message: Value) -> Result<(), MessageError> {
        let inboxes = self.inboxes.read();
        let tx = inboxes.get(&tab_id).ok_or(MessageError::NoReceiver(tab_id))?;
        tx.send(message)
            .map_err(|_| MessageError::Transport(format!("inbox of tab {} is closed", tab_id)))
    }
}

/// Drain everything currently queued in an inbox
pub fn drain_inbox(inbox: &Receiver<Value>) -> Vec<Value> {
    let mut out = Vec::new();
    loop {
        match inbox.try_recv() {
            Ok(message) => out.push(message),
            Err(TryRecvError::Empty) | Err(TryRecvError::Disconnected) => break,
        }
    }
    out
}
