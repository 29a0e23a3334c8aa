//! Plugin contract and registry
//!
//! A plugin is constructed on its own (carrying any static configuration),
//! then attached to a player with [`Player::register`](crate::Player::register),
//! which calls [`Plugin::setup`] exactly once for that registration.
//!
//! Lookups are keyed by [`Plugin::name`] and the last registration under a
//! name wins. A shadowed plugin stays attached (its event handlers keep
//! running) and is still torn down when the player is destroyed.

use crate::player::Player;
use parking_lot::RwLock;
use std::any::Any;
use std::collections::HashMap;
use std::sync::Arc;

/// Upcast to `Any` for typed lookups. Implemented for every plugin type.
pub trait AsAny: Any + Send + Sync {
    fn as_any_arc(self: Arc<Self>) -> Arc<dyn Any + Send + Sync>;
}

impl<T: Any + Send + Sync> AsAny for T {
    fn as_any_arc(self: Arc<Self>) -> Arc<dyn Any + Send + Sync> {
        self
    }
}

/// Optional capability attached to a player
pub trait Plugin: AsAny {
    /// Unique capability name used for lookups
    fn name(&self) -> &str;

    /// Wire the plugin to `player`. Called once per registration.
    fn setup(&self, player: &Player);

    /// Release handlers and any state tied to the player
    fn teardown(&self) {}
}

/// Downcast a registered plugin to its concrete type
pub fn downcast<T: Plugin>(plugin: Arc<dyn Plugin>) -> Option<Arc<T>> {
    plugin.as_any_arc().downcast::<T>().ok()
}

/// Name-keyed plugin storage
#[derive(Default)]
pub struct PluginRegistry {
    active: RwLock<HashMap<String, Arc<dyn Plugin>>>,
    shadowed: RwLock<Vec<Arc<dyn Plugin>>>,
}

impl PluginRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store `plugin` under its name. Returns the plugin it shadows, if any.
    pub fn insert(&self, plugin: Arc<dyn Plugin>) -> Option<Arc<dyn Plugin>> {
        let previous = self
            .active
            .write()
            .insert(plugin.name().to_string(), plugin);

        if let Some(ref previous) = previous {
            self.shadowed.write().push(Arc::clone(previous));
        }
        previous
    }

    /// Currently visible plugin for `name`
    pub fn get(&self, name: &str) -> Option<Arc<dyn Plugin>> {
        self.active.read().get(name).cloned()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.active.read().contains_key(name)
    }

    /// Remove the visible plugin for `name`
    pub fn remove(&self, name: &str) -> Option<Arc<dyn Plugin>> {
        self.active.write().remove(name)
    }

    /// Snapshot of the visible plugins at call time
    pub fn list(&self) -> HashMap<String, Arc<dyn Plugin>> {
        self.active.read().clone()
    }

    pub fn len(&self) -> usize {
        self.active.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.active.read().is_empty()
    }

    /// Empty the registry, returning every plugin ever stored, shadowed ones
    /// first, in no particular order otherwise
    pub fn drain(&self) -> Vec<Arc<dyn Plugin>> {
        let mut plugins: Vec<Arc<dyn Plugin>> = self.shadowed.write().drain(..).collect();
        plugins.extend(self.active.write().drain().map(|(_, plugin)| plugin));
        plugins
    }
}

impl std::fmt::Debug for PluginRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut names: Vec<String> = self.active.read().keys().cloned().collect();
        names.sort();
        f.debug_struct("PluginRegistry")
            .field("plugins", &names)
            .field("shadowed", &self.shadowed.read().len())
            .finish()
    }
}
