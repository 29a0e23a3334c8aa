//! Playback speed selection

use crate::player::{Player, WeakPlayer};
use crate::plugin::Plugin;
use parking_lot::{Mutex, RwLock};
use tracing::debug;

/// Playback speed options, registered as `"playback_speed"`.
///
/// The default speed is applied when the plugin is set up. A default that is
/// not one of the options falls back to the first option.
#[derive(Debug)]
pub struct PlaybackSpeedPlugin {
    options: Vec<f64>,
    default_speed: f64,
    last_speed: Mutex<f64>,
    player: RwLock<WeakPlayer>,
}

impl PlaybackSpeedPlugin {
    pub const NAME: &'static str = "playback_speed";

    pub const DEFAULT_OPTIONS: [f64; 8] = [0.25, 0.5, 0.75, 1.0, 1.25, 1.5, 1.75, 2.0];

    pub fn new(options: Vec<f64>, default_speed: f64) -> Self {
        let options = if options.is_empty() {
            Self::DEFAULT_OPTIONS.to_vec()
        } else {
            options
        };
        let default_speed = if options.contains(&default_speed) {
            default_speed
        } else {
            options[0]
        };

        Self {
            options,
            default_speed,
            last_speed: Mutex::new(1.0),
            player: RwLock::new(WeakPlayer::default()),
        }
    }

    pub fn options(&self) -> &[f64] {
        &self.options
    }

    pub fn default_speed(&self) -> f64 {
        self.default_speed
    }

    /// Speed in effect before the last [`set_speed`](Self::set_speed)
    pub fn last_speed(&self) -> f64 {
        *self.last_speed.lock()
    }

    pub fn speed(&self) -> f64 {
        self.player
            .read()
            .upgrade()
            .map_or(self.default_speed, |player| player.playback_rate())
    }

    pub fn set_speed(&self, rate: f64) {
        let Some(player) = self.player.read().upgrade() else {
            return;
        };
        *self.last_speed.lock() = player.playback_rate();
        player.set_playback_rate(rate);
        debug!(rate, "Playback speed changed");
    }
}

impl Default for PlaybackSpeedPlugin {
    fn default() -> Self {
        Self::new(Self::DEFAULT_OPTIONS.to_vec(), 1.0)
    }
}

impl Plugin for PlaybackSpeedPlugin {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn setup(&self, player: &Player) {
        *self.player.write() = player.downgrade();
        self.set_speed(self.default_speed);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PlayerOptions;
    use crate::surface::HeadlessSurface;
    use std::sync::Arc;

    #[test]
    fn test_default_falls_back_to_first_option() {
        let plugin = PlaybackSpeedPlugin::new(vec![0.5, 1.5], 1.0);
        assert_eq!(plugin.default_speed(), 0.5);
        assert_eq!(PlaybackSpeedPlugin::new(Vec::new(), 1.0).options().len(), 8);
    }

    #[test]
    fn test_setup_applies_default_and_tracks_last() {
        let player = Player::new(
            Arc::new(HeadlessSurface::default()),
            PlayerOptions::default(),
        );
        let plugin = player.register(Arc::new(PlaybackSpeedPlugin::new(vec![1.0, 2.0], 2.0)));
        assert_eq!(player.playback_rate(), 2.0);
        assert_eq!(plugin.last_speed(), 1.0);

        plugin.set_speed(1.0);
        assert_eq!(plugin.speed(), 1.0);
        assert_eq!(plugin.last_speed(), 2.0);
    }
}
