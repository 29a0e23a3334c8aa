//! Event hub - per-player publish/subscribe registry
//!
//! Handlers are keyed by event name and invoked synchronously, in
//! registration order, on the publishing thread. The handler list is
//! snapshotted before dispatch, so a handler may subscribe, unsubscribe or
//! publish again without deadlocking; changes apply to the next publish.
//!
//! Handlers are compared by identity. A handler subscribed twice runs twice
//! and needs two `unsubscribe` calls to go away.
//!
//! A panicking handler is not caught: it unwinds through `publish` and the
//! remaining handlers for that call do not run.

use crate::types::{AdItem, TextCue};
use parking_lot::RwLock;
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::trace;

// Playback surface lifecycle
pub const PLAY: &str = "play";
pub const PAUSE: &str = "pause";
pub const TIME_UPDATE: &str = "timeupdate";
pub const ENDED: &str = "ended";
pub const LOADED_METADATA: &str = "loadedmetadata";
pub const VOLUME_CHANGE: &str = "volumechange";
pub const PROGRESS: &str = "progress";
pub const STALLED: &str = "stalled";
pub const PLAYING: &str = "playing";
pub const CAN_PLAY: &str = "canplay";
pub const ERROR: &str = "error";
pub const RATE_CHANGE: &str = "ratechange";
pub const FULLSCREEN_CHANGE: &str = "fullscreenchange";
pub const ENTER_PICTURE_IN_PICTURE: &str = "enterpictureinpicture";
pub const LEAVE_PICTURE_IN_PICTURE: &str = "leavepictureinpicture";

// Ad insertion
pub const AD_START: &str = "adstart";
pub const AD_END: &str = "adend";
pub const AD_SKIPPABLE: &str = "adskippable";

// Plugins
pub const LOOP: &str = "loop";
pub const PIP: &str = "pip";
pub const CAPTION_CUE_CHANGE: &str = "captioncuechange";

/// Payload carried by a published event
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum EventPayload {
    None,
    /// A position in seconds
    Time(f64),
    /// Media duration, `None` while unknown
    Duration(Option<f64>),
    Volume { volume: f64, muted: bool },
    Rate(f64),
    Flag(bool),
    Ad(AdItem),
    Cues(Vec<TextCue>),
    Error(String),
}

impl EventPayload {
    pub fn as_time(&self) -> Option<f64> {
        match self {
            EventPayload::Time(t) => Some(*t),
            _ => None,
        }
    }

    pub fn as_ad(&self) -> Option<&AdItem> {
        match self {
            EventPayload::Ad(ad) => Some(ad),
            _ => None,
        }
    }

    pub fn as_flag(&self) -> Option<bool> {
        match self {
            EventPayload::Flag(flag) => Some(*flag),
            _ => None,
        }
    }
}

/// Event handler. Identity is the allocation, compare with [`same_handler`].
pub type Handler = Arc<dyn Fn(&EventPayload) + Send + Sync>;

/// Wrap a closure as a [`Handler`]
pub fn handler<F>(f: F) -> Handler
where
    F: Fn(&EventPayload) + Send + Sync + 'static,
{
    Arc::new(f)
}

/// Whether two handles refer to the same handler
pub fn same_handler(a: &Handler, b: &Handler) -> bool {
    std::ptr::eq(
        Arc::as_ptr(a) as *const (),
        Arc::as_ptr(b) as *const (),
    )
}

/// Publish/subscribe registry scoped to one player
#[derive(Default)]
pub struct EventHub {
    handlers: RwLock<HashMap<String, Vec<Handler>>>,
}

impl EventHub {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `handler` for `name`. Registering the same handler twice
    /// makes it run twice per publish.
    pub fn subscribe(&self, name: &str, handler: Handler) {
        self.handlers
            .write()
            .entry(name.to_string())
            .or_default()
            .push(handler);
    }

    /// Remove the earliest registration of `handler` under `name`, so each
    /// `subscribe` is undone by one `unsubscribe`.
    /// Returns false when nothing was registered.
    pub fn unsubscribe(&self, name: &str, handler: &Handler) -> bool {
        let mut handlers = self.handlers.write();
        let Some(list) = handlers.get_mut(name) else {
            return false;
        };
        let Some(index) = list.iter().position(|h| same_handler(h, handler)) else {
            return false;
        };

        list.remove(index);
        if list.is_empty() {
            handlers.remove(name);
        }
        true
    }

    /// Invoke every handler currently registered for `name`, in order.
    /// Returns the number of handlers invoked.
    pub fn publish(&self, name: &str, payload: &EventPayload) -> usize {
        let snapshot: Vec<Handler> = match self.handlers.read().get(name) {
            Some(list) => list.clone(),
            None => return 0,
        };

        trace!(event = name, handlers = snapshot.len(), "Publishing event");

        for handler in &snapshot {
            handler(payload);
        }
        snapshot.len()
    }

    /// Number of handlers registered for `name`
    pub fn subscriber_count(&self, name: &str) -> usize {
        self.handlers.read().get(name).map_or(0, Vec::len)
    }

    /// Event names with at least one handler
    pub fn event_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.handlers.read().keys().cloned().collect();
        names.sort();
        names
    }

    /// Drop every registration
    pub fn clear(&self) {
        self.handlers.write().clear();
    }
}

impl std::fmt::Debug for EventHub {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventHub")
            .field("events", &self.event_names())
            .finish()
    }
}
