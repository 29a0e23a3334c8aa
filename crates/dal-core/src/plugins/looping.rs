//! Loop toggle

use crate::events::{self, EventPayload};
use crate::player::{Player, WeakPlayer};
use crate::plugin::Plugin;
use parking_lot::RwLock;

/// Loop control, registered as `"loop"`. Every change publishes `loop`.
#[derive(Debug, Default)]
pub struct LoopPlugin {
    initial: Option<bool>,
    player: RwLock<WeakPlayer>,
}

impl LoopPlugin {
    pub const NAME: &'static str = "loop";

    pub fn new() -> Self {
        Self::default()
    }

    /// Apply `looping` when the plugin is set up
    pub fn with_initial(looping: bool) -> Self {
        Self {
            initial: Some(looping),
            ..Self::default()
        }
    }

    pub fn set_loop(&self, looping: bool) {
        if let Some(player) = self.player.read().upgrade() {
            player.set_loop(looping);
            player.emit(events::LOOP, EventPayload::Flag(looping));
        }
    }

    pub fn is_looping(&self) -> bool {
        self.player
            .read()
            .upgrade()
            .is_some_and(|player| player.is_looping())
    }

    pub fn toggle(&self) {
        self.set_loop(!self.is_looping());
    }
}

impl Plugin for LoopPlugin {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn setup(&self, player: &Player) {
        *self.player.write() = player.downgrade();
        if let Some(looping) = self.initial {
            self.set_loop(looping);
        }
    }
}
