//! Picture-in-picture control

use crate::events::{self, EventPayload};
use crate::player::{Player, WeakPlayer};
use crate::plugin::Plugin;
use parking_lot::RwLock;
use tracing::{debug, warn};

/// Picture-in-picture toggling, registered as `"picture_in_picture"`.
///
/// Requests are no-ops when the surface lacks support or is already in the
/// requested mode. A successful request publishes `pip` with the new mode.
#[derive(Debug, Default)]
pub struct PictureInPicturePlugin {
    player: RwLock<WeakPlayer>,
}

impl PictureInPicturePlugin {
    pub const NAME: &'static str = "picture_in_picture";

    pub fn new() -> Self {
        Self::default()
    }

    fn player(&self) -> Option<Player> {
        self.player.read().upgrade()
    }

    pub fn is_supported(&self) -> bool {
        self.player()
            .is_some_and(|player| player.surface().picture_in_picture_supported())
    }

    pub fn is_pip(&self) -> bool {
        self.player()
            .is_some_and(|player| player.surface().is_picture_in_picture())
    }

    pub fn enter(&self) {
        let Some(player) = self.player() else {
            return;
        };
        if !self.is_supported() || self.is_pip() {
            debug!("Picture-in-picture unavailable or already active");
            return;
        }

        match player.surface().request_picture_in_picture() {
            Ok(()) => {
                player.emit(events::PIP, EventPayload::Flag(true));
            }
            Err(e) => warn!(error = %e, "Failed to enter picture-in-picture"),
        }
    }

    pub fn exit(&self) {
        let Some(player) = self.player() else {
            return;
        };
        if !self.is_supported() || !self.is_pip() {
            return;
        }

        match player.surface().exit_picture_in_picture() {
            Ok(()) => {
                player.emit(events::PIP, EventPayload::Flag(false));
            }
            Err(e) => warn!(error = %e, "Failed to exit picture-in-picture"),
        }
    }

    pub fn toggle(&self) {
        if self.is_pip() {
            self.exit();
        } else {
            self.enter();
        }
    }
}

impl Plugin for PictureInPicturePlugin {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn setup(&self, player: &Player) {
        *self.player.write() = player.downgrade();
    }
}
