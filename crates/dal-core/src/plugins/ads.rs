//! Ad-insertion engine
//!
//! Plays pre-, mid- and post-roll ads by swapping the player's source. The
//! engine is either idle or inside an ad break; a break owns the queue of
//! ads still to play, the content source and the position to resume at.
//!
//! Triggers:
//! - `play` while idle starts the unplayed pre-rolls
//! - `timeupdate` while idle that crosses an unplayed mid-roll's trigger
//!   time, from strictly below to at-or-above, starts every unplayed mid-roll
//!   and resumes at the crossing position
//! - `ended` while idle starts the unplayed post-rolls
//!
//! While a break runs, `ended` (or an eligible [`AdsPlugin::skip_ad`]) moves
//! to the next ad, and resumes the content once the queue drains. Each ad
//! plays at most once until [`AdsPlugin::reset`].
//!
//! Surface failures during a break (e.g. a rejected `play()`) are logged and
//! the engine proceeds as though the swap happened.

use crate::events::{self, EventPayload, Handler};
use crate::player::{Player, WeakPlayer};
use crate::plugin::Plugin;
use crate::types::{AdItem, InsertionPoint};
use parking_lot::{Mutex, RwLock};
use std::collections::VecDeque;
use std::sync::{Arc, Weak};
use tracing::{debug, info, warn};

#[derive(Debug)]
struct AdSlot {
    item: AdItem,
    played: bool,
    skip_notified: bool,
}

#[derive(Debug)]
struct AdBreak {
    insertion_point: InsertionPoint,
    /// Indices into the slot list, front is on the surface
    queue: VecDeque<usize>,
    /// Content position captured when the break started
    resume_at: f64,
    content_source: String,
}

#[derive(Debug, Default)]
enum EngineState {
    #[default]
    Idle,
    AdPlaying(AdBreak),
}

#[derive(Debug, Default)]
struct EngineInner {
    slots: Vec<AdSlot>,
    state: EngineState,
    /// Last content position seen while idle, `None` until the first one
    last_position: Option<f64>,
    inert: bool,
}

/// Surface work decided under the engine lock and carried out after it
#[derive(Debug)]
enum Directive {
    Start(AdItem),
    Advance { finished: AdItem, next: AdItem },
    Resume {
        finished: AdItem,
        source: String,
        resume_at: f64,
    },
    Skippable(AdItem),
}

impl EngineInner {
    fn front(&self) -> Option<&AdItem> {
        match &self.state {
            EngineState::AdPlaying(ad_break) => ad_break
                .queue
                .front()
                .map(|&index| &self.slots[index].item),
            EngineState::Idle => None,
        }
    }

    /// Enter a break for `due`, marking those ads played
    fn begin_break(
        &mut self,
        insertion_point: InsertionPoint,
        due: Vec<usize>,
        resume_at: f64,
        content_source: String,
    ) -> Option<Directive> {
        let first = *due.first()?;
        for &index in &due {
            self.slots[index].played = true;
        }

        info!(
            %insertion_point,
            ads = due.len(),
            resume_at,
            "Starting ad break"
        );

        let item = self.slots[first].item.clone();
        self.state = EngineState::AdPlaying(AdBreak {
            insertion_point,
            queue: due.into(),
            resume_at,
            content_source,
        });
        Some(Directive::Start(item))
    }

    /// Unplayed ads at `insertion_point`, in configuration order
    fn unplayed(&self, insertion_point: InsertionPoint) -> Vec<usize> {
        self.slots
            .iter()
            .enumerate()
            .filter(|(_, slot)| !slot.played && slot.item.insertion_point == insertion_point)
            .map(|(index, _)| index)
            .collect()
    }

    /// Whether an unplayed mid-roll trigger lies in `(last, position]`
    fn crosses_mid_roll(&self, last: Option<f64>, position: f64) -> bool {
        self.slots
            .iter()
            .filter(|slot| !slot.played && slot.item.insertion_point == InsertionPoint::Mid)
            .filter_map(|slot| slot.item.trigger_time)
            .any(|trigger| last.map_or(true, |last| last < trigger) && trigger <= position)
    }

    /// Finish the ad on the surface and decide what plays next
    fn finish_current(&mut self) -> Option<Directive> {
        let EngineState::AdPlaying(ad_break) = &mut self.state else {
            return None;
        };

        let finished = self.slots[ad_break.queue.pop_front()?].item.clone();
        if let Some(&next) = ad_break.queue.front() {
            return Some(Directive::Advance {
                finished,
                next: self.slots[next].item.clone(),
            });
        }

        let EngineState::AdPlaying(ad_break) = std::mem::take(&mut self.state) else {
            return None;
        };
        info!(
            insertion_point = %ad_break.insertion_point,
            resume_at = ad_break.resume_at,
            "Ad break finished"
        );
        Some(Directive::Resume {
            finished,
            source: ad_break.content_source,
            resume_at: ad_break.resume_at,
        })
    }
}

struct AdEngine {
    inner: Mutex<EngineInner>,
    player: RwLock<WeakPlayer>,
    subscriptions: Mutex<Vec<(&'static str, Handler)>>,
}

impl AdEngine {
    fn player(&self) -> Option<Player> {
        self.player.read().upgrade()
    }

    fn on_play(&self) {
        let Some(player) = self.player() else {
            return;
        };
        let resume_at = player.current_time();
        let source = player.source();

        let directive = {
            let mut inner = self.inner.lock();
            if inner.inert || matches!(inner.state, EngineState::AdPlaying(_)) {
                return;
            }
            let due = inner.unplayed(InsertionPoint::Pre);
            inner.begin_break(InsertionPoint::Pre, due, resume_at, source)
        };
        self.execute(&player, directive);
    }

    fn on_time_update(&self, payload: &EventPayload) {
        let Some(player) = self.player() else {
            return;
        };
        let position = payload.as_time().unwrap_or_else(|| player.current_time());

        let directive = {
            let mut inner = self.inner.lock();
            if inner.inert {
                return;
            }

            let playing = match &inner.state {
                EngineState::AdPlaying(ad_break) => Some(ad_break.queue.front().copied()),
                EngineState::Idle => None,
            };

            match playing {
                None => {
                    let last = inner.last_position.replace(position);
                    if inner.crosses_mid_roll(last, position) {
                        let due = inner.unplayed(InsertionPoint::Mid);
                        inner.begin_break(InsertionPoint::Mid, due, position, player.source())
                    } else {
                        None
                    }
                }
                Some(front) => front.and_then(|index| {
                    let slot = &mut inner.slots[index];
                    if slot.skip_notified || !slot.item.is_skippable_at(position) {
                        return None;
                    }
                    slot.skip_notified = true;
                    Some(Directive::Skippable(slot.item.clone()))
                }),
            }
        };
        self.execute(&player, directive);
    }

    fn on_ended(&self) {
        let Some(player) = self.player() else {
            return;
        };
        let resume_at = player.current_time();
        let source = player.source();

        let directive = {
            let mut inner = self.inner.lock();
            if inner.inert {
                return;
            }
            if matches!(inner.state, EngineState::AdPlaying(_)) {
                inner.finish_current()
            } else {
                let due = inner.unplayed(InsertionPoint::Post);
                inner.begin_break(InsertionPoint::Post, due, resume_at, source)
            }
        };
        self.execute(&player, directive);
    }

    fn skip(&self) -> bool {
        let Some(player) = self.player() else {
            return false;
        };
        let elapsed = player.current_time();

        let directive = {
            let mut inner = self.inner.lock();
            if inner.inert {
                return false;
            }
            if !inner.front().is_some_and(|ad| ad.is_skippable_at(elapsed)) {
                debug!(elapsed, "Ad not skippable");
                return false;
            }
            debug!(elapsed, "Skipping ad");
            inner.finish_current()
        };
        self.execute(&player, directive);
        true
    }

    fn execute(&self, player: &Player, directive: Option<Directive>) {
        let Some(directive) = directive else {
            return;
        };

        match directive {
            Directive::Start(ad) => self.start(player, ad),
            Directive::Advance { finished, next } => {
                player.emit(events::AD_END, EventPayload::Ad(finished));
                self.start(player, next);
            }
            Directive::Resume {
                finished,
                source,
                resume_at,
            } => {
                player.emit(events::AD_END, EventPayload::Ad(finished));
                player.set_source(&source);
                player.set_current_time(resume_at);
                if let Err(e) = player.play() {
                    warn!(error = %e, "Content did not resume after ad break");
                }
            }
            Directive::Skippable(ad) => {
                debug!(ad = ad.id(), "Ad became skippable");
                player.emit(events::AD_SKIPPABLE, EventPayload::Ad(ad));
            }
        }
    }

    fn start(&self, player: &Player, ad: AdItem) {
        debug!(ad = ad.id(), src = %ad.source, "Playing ad");
        player.set_source(&ad.source);
        if let Err(e) = player.play() {
            warn!(error = %e, ad = ad.id(), "Ad playback rejected, continuing break");
        }
        player.emit(events::AD_START, EventPayload::Ad(ad));
    }
}

/// Ad-insertion plugin, registered as `"ads"`
pub struct AdsPlugin {
    engine: Arc<AdEngine>,
}

impl AdsPlugin {
    pub const NAME: &'static str = "ads";

    /// Create the engine for `ads`. Ads without an id get a generated one.
    pub fn new(ads: Vec<AdItem>) -> Self {
        let slots = ads
            .into_iter()
            .map(|mut item| {
                if item.id.is_none() {
                    item.id = Some(AdItem::generate_id());
                }
                AdSlot {
                    item,
                    played: false,
                    skip_notified: false,
                }
            })
            .collect();

        Self {
            engine: Arc::new(AdEngine {
                inner: Mutex::new(EngineInner {
                    slots,
                    ..Default::default()
                }),
                player: RwLock::new(WeakPlayer::default()),
                subscriptions: Mutex::new(Vec::new()),
            }),
        }
    }

    /// Skip the ad on the surface. Only honoured once the ad has played for
    /// its `skip_after` offset; returns whether the skip happened.
    pub fn skip_ad(&self) -> bool {
        self.engine.skip()
    }

    /// Forget which ads played and return to idle, leaving the surface alone
    pub fn reset(&self) {
        let mut inner = self.engine.inner.lock();
        for slot in &mut inner.slots {
            slot.played = false;
            slot.skip_notified = false;
        }
        inner.state = EngineState::Idle;
        inner.last_position = None;
        debug!("Ad engine reset");
    }

    pub fn is_ad_playing(&self) -> bool {
        matches!(self.engine.inner.lock().state, EngineState::AdPlaying(_))
    }

    /// Ad currently on the surface
    pub fn current_ad(&self) -> Option<AdItem> {
        self.engine.inner.lock().front().cloned()
    }

    /// Ads still queued in the running break, including the current one
    pub fn queued(&self) -> Vec<AdItem> {
        let inner = self.engine.inner.lock();
        match &inner.state {
            EngineState::AdPlaying(ad_break) => ad_break
                .queue
                .iter()
                .map(|&index| inner.slots[index].item.clone())
                .collect(),
            EngineState::Idle => Vec::new(),
        }
    }

    /// Content position the running break resumes at
    pub fn resume_checkpoint(&self) -> Option<f64> {
        match &self.engine.inner.lock().state {
            EngineState::AdPlaying(ad_break) => Some(ad_break.resume_at),
            EngineState::Idle => None,
        }
    }

    /// Configured ads, in order
    pub fn ads(&self) -> Vec<AdItem> {
        self.engine
            .inner
            .lock()
            .slots
            .iter()
            .map(|slot| slot.item.clone())
            .collect()
    }

    pub fn has_played(&self, id: &str) -> bool {
        self.engine
            .inner
            .lock()
            .slots
            .iter()
            .any(|slot| slot.played && slot.item.id() == id)
    }
}

impl Plugin for AdsPlugin {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn setup(&self, player: &Player) {
        *self.engine.player.write() = player.downgrade();

        let engine: Weak<AdEngine> = Arc::downgrade(&self.engine);
        let on_play = {
            let engine = engine.clone();
            player.on(events::PLAY, move |_| {
                if let Some(engine) = engine.upgrade() {
                    engine.on_play();
                }
            })
        };
        let on_time_update = {
            let engine = engine.clone();
            player.on(events::TIME_UPDATE, move |payload| {
                if let Some(engine) = engine.upgrade() {
                    engine.on_time_update(payload);
                }
            })
        };
        let on_ended = player.on(events::ENDED, move |_| {
            if let Some(engine) = engine.upgrade() {
                engine.on_ended();
            }
        });

        self.engine.subscriptions.lock().extend([
            (events::PLAY, on_play),
            (events::TIME_UPDATE, on_time_update),
            (events::ENDED, on_ended),
        ]);

        debug!(ads = self.engine.inner.lock().slots.len(), "Ad engine attached");
    }

    fn teardown(&self) {
        let subscriptions: Vec<_> = self.engine.subscriptions.lock().drain(..).collect();
        if let Some(player) = self.engine.player() {
            for (event, handler) in &subscriptions {
                player.off(event, handler);
            }
        }

        let mut inner = self.engine.inner.lock();
        inner.inert = true;
        inner.slots.clear();
        inner.state = EngineState::Idle;
        debug!("Ad engine detached");
    }
}

impl std::fmt::Debug for AdsPlugin {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let inner = self.engine.inner.lock();
        f.debug_struct("AdsPlugin")
            .field("ads", &inner.slots.len())
            .field("state", &inner.state)
            .finish()
    }
}
