//! Player configuration
//!
//! A [`PlayerConfig`] is the JSON document a host hands to the player: the
//! player options plus the plugins to attach. Field names follow the host
//! conventions (`src`, `position`, `skipAfter`, `loop`).

use crate::error::{Error, Result};
use crate::player::{Player, PlayerBuilder};
use crate::plugin::Plugin;
use crate::plugins::{
    AdsPlugin, CaptionsPlugin, DownloadPlugin, LoopPlugin, PictureInPicturePlugin,
    PlaybackSpeedPlugin,
};
use crate::surface::PlaybackSurface;
use crate::types::{AdItem, CaptionTrack, InsertionPoint};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, warn};

/// Options applied when a player is constructed
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlayerOptions {
    /// Initial media reference
    pub source: Option<String>,
    /// Start playing immediately. Mutes first, as autoplay policies require.
    pub autoplay: bool,
    /// Whether the host should render its native controls
    pub controls: bool,
    pub muted: bool,
    /// Initial volume in 0..=1
    pub volume: f64,
}

impl Default for PlayerOptions {
    fn default() -> Self {
        Self {
            source: None,
            autoplay: false,
            controls: false,
            muted: false,
            volume: 1.0,
        }
    }
}

impl PlayerOptions {
    pub fn with_source(source: impl Into<String>) -> Self {
        Self {
            source: Some(source.into()),
            ..Default::default()
        }
    }
}

/// Playback speed plugin settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SpeedConfig {
    pub options: Vec<f64>,
    pub default: f64,
}

impl Default for SpeedConfig {
    fn default() -> Self {
        Self {
            options: PlaybackSpeedPlugin::DEFAULT_OPTIONS.to_vec(),
            default: 1.0,
        }
    }
}

/// Complete player configuration document
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlayerConfig {
    pub player: PlayerOptions,
    /// Ad schedule for the ad-insertion plugin
    pub ads: Vec<AdItem>,
    pub captions: Vec<CaptionTrack>,
    pub playback_speed: Option<SpeedConfig>,
    /// Attach the loop plugin with this initial state
    #[serde(rename = "loop")]
    pub looping: Option<bool>,
    pub picture_in_picture: bool,
    pub download: bool,
    /// Known media durations in seconds, keyed by source reference
    pub media: BTreeMap<String, f64>,
}

impl PlayerConfig {
    /// Parse and validate a JSON document
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: PlayerConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Read, parse and validate a JSON file
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        debug!(path = %path.display(), "Loading player configuration");
        let json = std::fs::read_to_string(path)?;
        Self::from_json_str(&json)
    }

    /// Check the document for values the player cannot honour
    pub fn validate(&self) -> Result<()> {
        if !(0.0..=1.0).contains(&self.player.volume) {
            return Err(Error::config(format!(
                "volume {} outside 0..=1",
                self.player.volume
            )));
        }

        let mut ids = HashSet::new();
        for (index, ad) in self.ads.iter().enumerate() {
            if ad.source.trim().is_empty() {
                return Err(Error::config(format!("ad #{} has an empty src", index)));
            }
            if let Some(id) = &ad.id {
                if !ids.insert(id.as_str()) {
                    return Err(Error::config(format!("duplicate ad id {}", id)));
                }
            }
            for (field, value) in [("time", ad.trigger_time), ("skipAfter", ad.skip_after)] {
                if let Some(value) = value {
                    if !value.is_finite() || value < 0.0 {
                        return Err(Error::config(format!(
                            "ad #{} has invalid {}: {}",
                            index, field, value
                        )));
                    }
                }
            }

            match (ad.insertion_point, ad.trigger_time) {
                (InsertionPoint::Mid, None) => {
                    warn!(index, src = %ad.source, "Mid-roll without time will never play");
                }
                (InsertionPoint::Pre | InsertionPoint::Post, Some(time)) => {
                    debug!(index, time, "Ignoring time on non mid-roll ad");
                }
                _ => {}
            }
        }

        if let Some(speed) = &self.playback_speed {
            if speed.options.is_empty() {
                return Err(Error::config("playback_speed.options is empty"));
            }
            if let Some(bad) = speed.options.iter().find(|r| !r.is_finite() || **r <= 0.0) {
                return Err(Error::config(format!("invalid playback speed {}", bad)));
            }
        }

        if let Some((source, duration)) = self
            .media
            .iter()
            .find(|(_, d)| !d.is_finite() || **d <= 0.0)
        {
            return Err(Error::config(format!(
                "media {} has invalid duration {}",
                source, duration
            )));
        }

        Ok(())
    }

    /// Instantiate the plugins this document asks for
    pub fn plugins(&self) -> Vec<Arc<dyn Plugin>> {
        let mut plugins: Vec<Arc<dyn Plugin>> = Vec::new();

        if !self.ads.is_empty() {
            plugins.push(Arc::new(AdsPlugin::new(self.ads.clone())));
        }
        if !self.captions.is_empty() {
            plugins.push(Arc::new(CaptionsPlugin::new(self.captions.clone())));
        }
        if let Some(speed) = &self.playback_speed {
            plugins.push(Arc::new(PlaybackSpeedPlugin::new(
                speed.options.clone(),
                speed.default,
            )));
        }
        if let Some(looping) = self.looping {
            plugins.push(Arc::new(LoopPlugin::with_initial(looping)));
        }
        if self.picture_in_picture {
            plugins.push(Arc::new(PictureInPicturePlugin::new()));
        }
        if self.download {
            plugins.push(Arc::new(DownloadPlugin::new()));
        }

        plugins
    }

    /// Build a player on `surface` with every configured plugin attached
    pub fn build_player(&self, surface: Arc<dyn PlaybackSurface>) -> Result<Player> {
        self.plugins()
            .into_iter()
            .fold(
                PlayerBuilder::new().options(self.player.clone()).surface(surface),
                PlayerBuilder::plugin,
            )
            .build()
    }
}
