//! Player facade
//!
//! The [`Player`] owns the playback surface, relays its lifecycle signals
//! through a per-player [`EventHub`], exposes the playback commands, and hosts
//! the plugin registry. It is a cheap cloneable handle; plugins keep a
//! [`WeakPlayer`] so they never keep a destroyed player alive.

use crate::config::PlayerOptions;
use crate::error::{Error, Result};
use crate::events::{self, EventHub, EventPayload, Handler};
use crate::plugin::{downcast, Plugin, PluginRegistry};
use crate::surface::{PlaybackSurface, SurfaceSignal};
use crate::types::{PlaybackState, PlayerId, ReadyState};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};
use tracing::{debug, info, instrument, trace, warn};

struct PlayerInner {
    id: PlayerId,
    options: PlayerOptions,
    surface: Arc<dyn PlaybackSurface>,
    hub: EventHub,
    plugins: PluginRegistry,
    destroyed: AtomicBool,
}

/// Handle to a media player instance
#[derive(Clone)]
pub struct Player {
    inner: Arc<PlayerInner>,
}

/// Non-owning handle to a [`Player`]
#[derive(Clone, Default)]
pub struct WeakPlayer {
    inner: Weak<PlayerInner>,
}

impl WeakPlayer {
    /// The player, if it has not been dropped
    pub fn upgrade(&self) -> Option<Player> {
        self.inner.upgrade().map(|inner| Player { inner })
    }
}

impl std::fmt::Debug for WeakPlayer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WeakPlayer")
            .field("alive", &(self.inner.strong_count() > 0))
            .finish()
    }
}

/// Builder for [`Player`]
#[derive(Default)]
pub struct PlayerBuilder {
    options: PlayerOptions,
    surface: Option<Arc<dyn PlaybackSurface>>,
    plugins: Vec<Arc<dyn Plugin>>,
}

impl PlayerBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn options(mut self, options: PlayerOptions) -> Self {
        self.options = options;
        self
    }

    /// Playback surface the player drives. Required.
    pub fn surface(mut self, surface: Arc<dyn PlaybackSurface>) -> Self {
        self.surface = Some(surface);
        self
    }

    /// Register `plugin` before the initial source is loaded
    pub fn plugin(mut self, plugin: Arc<dyn Plugin>) -> Self {
        self.plugins.push(plugin);
        self
    }

    /// Construct the player.
    ///
    /// Plugins are registered before the initial source and autoplay are
    /// applied, so they observe the very first `play`.
    pub fn build(self) -> Result<Player> {
        let surface = self.surface.ok_or(Error::MissingSurface)?;
        let player = Player::attach(surface, self.options);

        for plugin in self.plugins {
            player.register_dyn(plugin);
        }
        player.apply_options();

        Ok(player)
    }
}

impl Player {
    /// Create a player on `surface` with no plugins
    pub fn new(surface: Arc<dyn PlaybackSurface>, options: PlayerOptions) -> Self {
        let player = Self::attach(surface, options);
        player.apply_options();
        player
    }

    pub fn builder() -> PlayerBuilder {
        PlayerBuilder::new()
    }

    fn attach(surface: Arc<dyn PlaybackSurface>, options: PlayerOptions) -> Self {
        let inner = Arc::new(PlayerInner {
            id: PlayerId::new(),
            options,
            surface,
            hub: EventHub::new(),
            plugins: PluginRegistry::new(),
            destroyed: AtomicBool::new(false),
        });

        let relay = Arc::downgrade(&inner);
        inner.surface.attach(Box::new(move |signal: SurfaceSignal| {
            if let Some(inner) = relay.upgrade() {
                trace!(event = signal.name(), "Relaying surface signal");
                inner.hub.publish(signal.name(), &signal.payload());
            }
        }));

        info!(player_id = %inner.id, "Player created");
        Self { inner }
    }

    fn apply_options(&self) {
        let options = self.inner.options.clone();
        self.set_volume(options.volume);
        self.set_muted(options.muted);

        if let Some(source) = options.source.as_deref() {
            self.set_source(source);
        }

        if options.autoplay {
            // Autoplay policies only admit muted playback
            self.set_muted(true);
            if let Err(e) = self.play() {
                warn!(error = %e, "Autoplay rejected");
            }
        }
    }

    pub fn id(&self) -> PlayerId {
        self.inner.id
    }

    pub fn options(&self) -> &PlayerOptions {
        &self.inner.options
    }

    pub fn downgrade(&self) -> WeakPlayer {
        WeakPlayer {
            inner: Arc::downgrade(&self.inner),
        }
    }

    /// The underlying playback surface
    pub fn surface(&self) -> &Arc<dyn PlaybackSurface> {
        &self.inner.surface
    }

    // =========================================================================
    // Playback commands
    // =========================================================================

    /// Replace the media reference and reset playback to the start.
    /// An empty reference is ignored.
    #[instrument(skip(self), fields(player_id = %self.inner.id))]
    pub fn set_source(&self, source: &str) {
        if source.is_empty() {
            debug!("Ignoring empty source");
            return;
        }
        self.inner.surface.load(source);
    }

    pub fn source(&self) -> String {
        self.inner.surface.source()
    }

    pub fn current_time(&self) -> f64 {
        self.inner.surface.current_time()
    }

    /// Duration in seconds, `None` while unknown
    pub fn duration(&self) -> Option<f64> {
        self.inner.surface.duration()
    }

    pub fn set_current_time(&self, seconds: f64) {
        self.inner.surface.set_current_time(seconds);
    }

    #[instrument(skip(self), fields(player_id = %self.inner.id))]
    pub fn play(&self) -> Result<()> {
        self.inner.surface.play().map_err(|e| {
            warn!(error = %e, source = %self.source(), "Play rejected by surface");
            Error::from(e)
        })
    }

    #[instrument(skip(self), fields(player_id = %self.inner.id))]
    pub fn pause(&self) {
        self.inner.surface.pause();
    }

    pub fn toggle_play_pause(&self) -> Result<()> {
        if self.is_paused() {
            self.play()
        } else {
            self.pause();
            Ok(())
        }
    }

    pub fn is_paused(&self) -> bool {
        self.inner.surface.paused()
    }

    pub fn is_playing(&self) -> bool {
        let surface = &self.inner.surface;
        !surface.paused() && !surface.ended() && surface.ready_state() >= ReadyState::HaveFutureData
    }

    /// Seek to `percent` of the duration. No-op while the duration is unknown.
    #[instrument(skip(self), fields(player_id = %self.inner.id))]
    pub fn set_seek_position(&self, percent: f64) {
        let Some(duration) = self.duration().filter(|d| d.is_finite()) else {
            debug!("Duration unknown, ignoring seek");
            return;
        };
        if percent.is_nan() {
            return;
        }
        let percent = percent.clamp(0.0, 100.0);
        self.set_current_time(duration * percent / 100.0);
    }

    /// Position as a percentage of the duration, 0 while unknown
    pub fn seek_position(&self) -> f64 {
        match self.duration() {
            Some(duration) if duration.is_finite() && duration > 0.0 => {
                self.current_time() / duration * 100.0
            }
            _ => 0.0,
        }
    }

    /// Set the volume, clamped to 0..=1
    pub fn set_volume(&self, volume: f64) {
        let volume = if volume.is_nan() { 1.0 } else { volume.clamp(0.0, 1.0) };
        self.inner.surface.set_volume(volume);
    }

    pub fn volume(&self) -> f64 {
        self.inner.surface.volume()
    }

    pub fn set_muted(&self, muted: bool) {
        self.inner.surface.set_muted(muted);
    }

    pub fn is_muted(&self) -> bool {
        self.inner.surface.muted()
    }

    pub fn set_playback_rate(&self, rate: f64) {
        self.inner.surface.set_playback_rate(rate);
    }

    pub fn playback_rate(&self) -> f64 {
        self.inner.surface.playback_rate()
    }

    pub fn set_loop(&self, looping: bool) {
        self.inner.surface.set_looping(looping);
    }

    pub fn is_looping(&self) -> bool {
        self.inner.surface.looping()
    }

    pub fn buffered(&self) -> Vec<(f64, f64)> {
        self.inner.surface.buffered()
    }

    pub fn state(&self) -> PlaybackState {
        self.inner.surface.state()
    }

    // =========================================================================
    // Fullscreen
    // =========================================================================

    /// Request fullscreen. Settles later through `fullscreenchange`.
    pub fn enter_fullscreen(&self) -> Result<()> {
        self.inner.surface.request_fullscreen().map_err(|e| {
            warn!(error = %e, "Fullscreen request failed");
            Error::from(e)
        })
    }

    pub fn exit_fullscreen(&self) -> Result<()> {
        self.inner.surface.exit_fullscreen().map_err(Error::from)
    }

    pub fn toggle_fullscreen(&self) -> Result<()> {
        if self.is_fullscreen() {
            self.exit_fullscreen()
        } else {
            self.enter_fullscreen()
        }
    }

    pub fn is_fullscreen(&self) -> bool {
        self.inner.surface.is_fullscreen()
    }

    // =========================================================================
    // Events
    // =========================================================================

    /// Subscribe a closure to `event`. Keep the returned handle to unsubscribe.
    pub fn on<F>(&self, event: &str, f: F) -> Handler
    where
        F: Fn(&EventPayload) + Send + Sync + 'static,
    {
        let handler = events::handler(f);
        self.subscribe(event, Arc::clone(&handler));
        handler
    }

    pub fn subscribe(&self, event: &str, handler: Handler) {
        self.inner.hub.subscribe(event, handler);
    }

    /// Remove `handler` from `event`. Returns false when it was not registered.
    pub fn off(&self, event: &str, handler: &Handler) -> bool {
        self.inner.hub.unsubscribe(event, handler)
    }

    /// Publish `event` to this player's subscribers
    pub fn emit(&self, event: &str, payload: EventPayload) -> usize {
        self.inner.hub.publish(event, &payload)
    }

    pub fn hub(&self) -> &EventHub {
        &self.inner.hub
    }

    // =========================================================================
    // Plugins
    // =========================================================================

    /// Set up `plugin` against this player and store it under its name.
    /// A previous plugin with the same name is shadowed, not removed.
    pub fn register<P: Plugin>(&self, plugin: Arc<P>) -> Arc<P> {
        self.register_dyn(Arc::clone(&plugin) as Arc<dyn Plugin>);
        plugin
    }

    pub fn register_dyn(&self, plugin: Arc<dyn Plugin>) {
        plugin.setup(self);
        let name = plugin.name().to_string();

        if self.inner.plugins.insert(plugin).is_some() {
            warn!(plugin = %name, "Plugin registration shadows an earlier one");
        }
        info!(plugin = %name, player_id = %self.inner.id, "Plugin registered");
    }

    /// Plugin registered under `name`
    pub fn get(&self, name: &str) -> Option<Arc<dyn Plugin>> {
        self.inner.plugins.get(name)
    }

    /// Plugin registered under `name`, as its concrete type
    pub fn plugin<T: Plugin>(&self, name: &str) -> Option<Arc<T>> {
        self.get(name).and_then(downcast::<T>)
    }

    /// Like [`Player::plugin`], reporting why the lookup failed
    pub fn require<T: Plugin>(&self, name: &str) -> Result<Arc<T>> {
        let plugin = self.get(name).ok_or_else(|| Error::PluginNotFound {
            name: name.to_string(),
        })?;
        downcast::<T>(plugin).ok_or_else(|| Error::PluginType {
            name: name.to_string(),
            expected: std::any::type_name::<T>(),
        })
    }

    pub fn has_plugin(&self, name: &str) -> bool {
        self.inner.plugins.contains(name)
    }

    /// Snapshot of the visible plugins
    pub fn plugins(&self) -> HashMap<String, Arc<dyn Plugin>> {
        self.inner.plugins.list()
    }

    /// Remove and tear down the visible plugin for `name`
    pub fn unregister(&self, name: &str) -> Option<Arc<dyn Plugin>> {
        let plugin = self.inner.plugins.remove(name)?;
        plugin.teardown();
        info!(plugin = name, "Plugin unregistered");
        Some(plugin)
    }

    // =========================================================================
    // Lifecycle
    // =========================================================================

    /// Detach from the surface, tear down every plugin and drop all
    /// subscriptions. Later calls are ignored.
    #[instrument(skip(self), fields(player_id = %self.inner.id))]
    pub fn destroy(&self) {
        if self.inner.destroyed.swap(true, Ordering::SeqCst) {
            warn!("Player already destroyed");
            return;
        }

        let surface = &self.inner.surface;
        surface.detach();
        surface.pause();
        surface.unload();

        for plugin in self.inner.plugins.drain() {
            debug!(plugin = plugin.name(), "Tearing down plugin");
            plugin.teardown();
        }
        self.inner.hub.clear();

        info!("Player destroyed");
    }

    pub fn is_destroyed(&self) -> bool {
        self.inner.destroyed.load(Ordering::SeqCst)
    }
}

impl std::fmt::Debug for Player {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Player")
            .field("id", &self.inner.id)
            .field("source", &self.source())
            .field("plugins", &self.inner.plugins)
            .field("destroyed", &self.is_destroyed())
            .finish()
    }
}
