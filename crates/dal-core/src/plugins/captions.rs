//! Caption track selection and cue tracking

use crate::captions;
use crate::error::{Error, Result};
use crate::events::{self, EventPayload, Handler};
use crate::player::{Player, WeakPlayer};
use crate::plugin::Plugin;
use crate::types::{CaptionTrack, TextCue};
use parking_lot::{Mutex, RwLock};
use std::collections::HashSet;
use std::sync::{Arc, Weak};
use tracing::{debug, info};

#[derive(Debug)]
struct LoadedTrack {
    track: CaptionTrack,
    cues: Vec<TextCue>,
}

#[derive(Debug, Default)]
struct CaptionState {
    tracks: Vec<LoadedTrack>,
    selected: Option<usize>,
    /// Ids of the cues last reported active
    active: Vec<String>,
}

#[derive(Default)]
struct Shared {
    state: Mutex<CaptionState>,
    player: RwLock<WeakPlayer>,
    subscription: Mutex<Option<Handler>>,
}

impl Shared {
    fn on_time_update(&self, payload: &EventPayload) {
        let Some(player) = self.player.read().upgrade() else {
            return;
        };
        let time = payload.as_time().unwrap_or_else(|| player.current_time());

        let changed = {
            let mut state = self.state.lock();
            let Some(index) = state.selected else {
                return;
            };
            let active: Vec<TextCue> = captions::cues_at_time(&state.tracks[index].cues, time)
                .into_iter()
                .cloned()
                .collect();
            let ids: Vec<String> = active.iter().map(|cue| cue.id.clone()).collect();
            if ids == state.active {
                None
            } else {
                state.active = ids;
                Some(active)
            }
        };

        if let Some(active) = changed {
            player.emit(events::CAPTION_CUE_CHANGE, EventPayload::Cues(active));
        }
    }
}

/// Caption tracks for the player, registered as `"captions"`
///
/// Tracks without a label are named `Captions N` after their position;
/// later tracks reusing a label are dropped. While a track is selected,
/// every change of the active cue set is published as `captioncuechange`.
pub struct CaptionsPlugin {
    configured: Vec<CaptionTrack>,
    shared: Arc<Shared>,
}

impl CaptionsPlugin {
    pub const NAME: &'static str = "captions";

    pub fn new(tracks: Vec<CaptionTrack>) -> Self {
        Self {
            configured: tracks,
            shared: Arc::new(Shared::default()),
        }
    }

    /// Labels of the attached tracks, in order
    pub fn labels(&self) -> Vec<String> {
        self.shared
            .state
            .lock()
            .tracks
            .iter()
            .filter_map(|loaded| loaded.track.label.clone())
            .collect()
    }

    pub fn tracks(&self) -> Vec<CaptionTrack> {
        self.shared
            .state
            .lock()
            .tracks
            .iter()
            .map(|loaded| loaded.track.clone())
            .collect()
    }

    pub fn has_captions(&self) -> bool {
        !self.shared.state.lock().tracks.is_empty()
    }

    /// Show the track labelled `label`, hiding the others
    pub fn select(&self, label: &str) -> bool {
        self.set_selected(Some(label))
    }

    /// Select a track by label, or disable captions with `None`.
    /// An unknown label disables every track and returns false.
    pub fn set_selected(&self, label: Option<&str>) -> bool {
        let mut state = self.shared.state.lock();
        let index = label.and_then(|label| {
            state
                .tracks
                .iter()
                .position(|loaded| loaded.track.label.as_deref() == Some(label))
        });

        state.selected = index;
        state.active.clear();
        debug!(?label, found = index.is_some(), "Caption track selected");
        index.is_some()
    }

    /// Label of the selected track
    pub fn selected(&self) -> Option<String> {
        let state = self.shared.state.lock();
        state
            .selected
            .and_then(|index| state.tracks[index].track.label.clone())
    }

    /// Parse `text` (WebVTT or SRT) as the cues of the track labelled `label`.
    /// Returns the number of cues loaded.
    pub fn load_cues(&self, label: &str, text: &str) -> Result<usize> {
        let cues = captions::parse(text)?;
        let mut state = self.shared.state.lock();
        let loaded = state
            .tracks
            .iter_mut()
            .find(|loaded| loaded.track.label.as_deref() == Some(label))
            .ok_or_else(|| Error::config(format!("no caption track labelled {}", label)))?;

        let count = cues.len();
        loaded.cues = cues;
        state.active.clear();
        debug!(label, cues = count, "Caption cues loaded");
        Ok(count)
    }

    /// Cues of the selected track active at the player's position
    pub fn active_cues(&self) -> Vec<TextCue> {
        let Some(player) = self.shared.player.read().upgrade() else {
            return Vec::new();
        };
        let time = player.current_time();
        let state = self.shared.state.lock();
        state
            .selected
            .map(|index| {
                captions::cues_at_time(&state.tracks[index].cues, time)
                    .into_iter()
                    .cloned()
                    .collect()
            })
            .unwrap_or_default()
    }
}

impl Plugin for CaptionsPlugin {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn setup(&self, player: &Player) {
        *self.shared.player.write() = player.downgrade();

        let mut seen = HashSet::new();
        let tracks: Vec<LoadedTrack> = self
            .configured
            .iter()
            .enumerate()
            .filter_map(|(index, track)| {
                let label = track
                    .label
                    .clone()
                    .unwrap_or_else(|| format!("Captions {}", index + 1));
                if !seen.insert(label.clone()) {
                    debug!(%label, "Dropping caption track with duplicate label");
                    return None;
                }
                Some(LoadedTrack {
                    track: track.clone().with_label(label),
                    cues: Vec::new(),
                })
            })
            .collect();

        info!(tracks = tracks.len(), "Caption tracks attached");
        self.shared.state.lock().tracks = tracks;

        let shared: Weak<Shared> = Arc::downgrade(&self.shared);
        let handler = player.on(events::TIME_UPDATE, move |payload| {
            if let Some(shared) = shared.upgrade() {
                shared.on_time_update(payload);
            }
        });
        *self.shared.subscription.lock() = Some(handler);
    }

    fn teardown(&self) {
        let handler = self.shared.subscription.lock().take();
        if let (Some(handler), Some(player)) = (handler, self.shared.player.read().upgrade()) {
            player.off(events::TIME_UPDATE, &handler);
        }
        *self.shared.state.lock() = CaptionState::default();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PlayerOptions;
    use crate::surface::HeadlessSurface;

    const VTT: &str = "WEBVTT\n\n1\n00:00:01.000 --> 00:00:02.000\nHello\n\n2\n00:00:03.000 --> 00:00:04.000\nWorld\n";

    fn attached() -> (Arc<HeadlessSurface>, Player, Arc<CaptionsPlugin>) {
        let surface = Arc::new(HeadlessSurface::default().with_media("movie.mp4", 10.0));
        let player = Player::new(surface.clone(), PlayerOptions::with_source("movie.mp4"));
        let plugin = player.register(Arc::new(CaptionsPlugin::new(vec![
            CaptionTrack::new("en.vtt").with_label("English"),
            CaptionTrack::new("fr.vtt").with_lang("fr"),
            CaptionTrack::new("en2.vtt").with_label("English"),
        ])));
        (surface, player, plugin)
    }

    #[test]
    fn test_labels_default_and_dedupe() {
        let (_, _, plugin) = attached();
        assert_eq!(plugin.labels(), vec!["English", "Captions 2"]);
        assert!(plugin.has_captions());
    }

    #[test]
    fn test_select_unknown_disables() {
        let (_, _, plugin) = attached();
        assert!(plugin.select("English"));
        assert_eq!(plugin.selected().as_deref(), Some("English"));

        assert!(!plugin.select("German"));
        assert_eq!(plugin.selected(), None);
    }

    #[test]
    fn test_cue_changes_are_published() {
        let (surface, player, plugin) = attached();
        plugin.load_cues("English", VTT).unwrap();
        plugin.select("English");

        let changes = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&changes);
        player.on(events::CAPTION_CUE_CHANGE, move |payload| {
            if let EventPayload::Cues(cues) = payload {
                sink.lock().push(cues.iter().map(|c| c.text.clone()).collect::<Vec<_>>());
            }
        });

        player.play().unwrap();
        surface.advance(3.5);

        let changes = changes.lock();
        assert_eq!(
            *changes,
            vec![vec!["Hello".to_string()], vec![], vec!["World".to_string()]]
        );
        assert_eq!(plugin.active_cues().len(), 1);
    }

    #[test]
    fn test_load_cues_unknown_track() {
        let (_, _, plugin) = attached();
        assert!(plugin.load_cues("Klingon", VTT).is_err());
    }

    #[test]
    fn test_teardown_clears_tracks() {
        let (_, player, plugin) = attached();
        plugin.teardown();
        assert!(!plugin.has_captions());
        assert_eq!(player.hub().subscriber_count(events::TIME_UPDATE), 0);
    }
}
