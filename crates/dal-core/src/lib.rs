//! DAL Core - Media Player Core with Ad Insertion
//!
//! This crate provides the playback core behind the DAL player UI:
//! - Per-player event hub with synchronous, ordered dispatch
//! - Player facade over a host-provided playback surface
//! - Plugin registry with typed lookups
//! - Ad insertion (pre-, mid- and post-roll) with skip support
//! - Captions, picture-in-picture, playback speed, loop and download plugins
//! - WebVTT/SRT caption parsing
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                         DAL Core                                │
//! ├─────────────────────────────────────────────────────────────────┤
//! │                                                                 │
//! │  ┌──────────────┐  ┌──────────────┐  ┌──────────────┐           │
//! │  │     Ads      │  │   Captions   │  │  Speed/Loop  │  plugins  │
//! │  │    Engine    │  │              │  │  PiP/Download│           │
//! │  └──────┬───────┘  └──────┬───────┘  └──────┬───────┘           │
//! │         │                 │                 │                   │
//! │         └─────────────────┼─────────────────┘                   │
//! │                           │                                     │
//! │                    ┌──────┴──────┐       ┌─────────────┐        │
//! │                    │   Player    │───────│    Event    │        │
//! │                    │   Facade    │       │     Hub     │        │
//! │                    └──────┬──────┘       └─────────────┘        │
//! │                           │                                     │
//! │                    ┌──────┴──────┐                              │
//! │                    │  Playback   │  host-provided               │
//! │                    │   Surface   │  (HeadlessSurface in tests)  │
//! │                    └─────────────┘                              │
//! └─────────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Example
//!
//! ```rust
//! use std::sync::Arc;
//! use dal_core::{AdItem, AdsPlugin, HeadlessSurface, Player, PlayerOptions, events};
//!
//! let surface = Arc::new(
//!     HeadlessSurface::default()
//!         .with_media("movie.mp4", 120.0)
//!         .with_media("pre.mp4", 10.0),
//! );
//! let player = Player::new(surface.clone(), PlayerOptions::with_source("movie.mp4"));
//! let ads = player.register(Arc::new(AdsPlugin::new(vec![AdItem::pre("pre.mp4")])));
//!
//! player.on(events::AD_START, |payload| {
//!     println!("ad started: {:?}", payload.as_ad());
//! });
//!
//! player.play().unwrap();
//! assert!(ads.is_ad_playing());
//!
//! surface.advance(10.0);
//! assert_eq!(player.source(), "movie.mp4");
//! ```

pub mod captions;
pub mod config;
pub mod error;
pub mod events;
pub mod player;
pub mod plugin;
pub mod plugins;
pub mod surface;
pub mod types;

pub use config::{PlayerConfig, PlayerOptions, SpeedConfig};
pub use error::{Error, Result, SurfaceError};
pub use events::{EventHub, EventPayload, Handler};
pub use player::{Player, PlayerBuilder, WeakPlayer};
pub use plugin::{Plugin, PluginRegistry};
pub use plugins::{
    AdsPlugin, CaptionsPlugin, DownloadPlugin, DownloadRequest, LoopPlugin,
    PictureInPicturePlugin, PlaybackSpeedPlugin,
};
pub use surface::{HeadlessConfig, HeadlessSurface, PlaybackSurface, SurfaceSignal};
pub use types::*;
pub use captions::{SrtParser, WebVttParser};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Initialize the player library with default configuration
pub fn init() {
    tracing::info!(version = VERSION, "DAL Core initialized");
}
