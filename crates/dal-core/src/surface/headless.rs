//! Headless playback surface
//!
//! Deterministic in-memory surface with no decoding. Time only moves when the
//! host calls [`HeadlessSurface::advance`] or [`HeadlessSurface::advance_to`],
//! which step the position one tick at a time and raise `timeupdate` after
//! every step, the way a browser media element reports progress.
//!
//! Unlike a browser, `play()` after the end does not rewind to the start.

use super::{PlaybackSurface, SignalListener, SurfaceSignal};
use crate::error::SurfaceError;
use crate::types::ReadyState;
use parking_lot::{Mutex, RwLock};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::debug;

/// Headless surface configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HeadlessConfig {
    /// Position step between `timeupdate` signals (seconds)
    pub tick: f64,
    /// Duration reported for sources with no registered duration
    pub default_duration: Option<f64>,
    /// Reject unmuted `play()` until [`HeadlessSurface::user_gesture`]
    pub block_unmuted_autoplay: bool,
    pub fullscreen_supported: bool,
    pub picture_in_picture_supported: bool,
}

impl Default for HeadlessConfig {
    fn default() -> Self {
        Self {
            tick: 0.25,
            default_duration: None,
            block_unmuted_autoplay: false,
            fullscreen_supported: true,
            picture_in_picture_supported: true,
        }
    }
}

#[derive(Debug)]
struct MediaState {
    source: String,
    /// Bumped on every load so stepping stops when the source is swapped
    generation: u64,
    position: f64,
    duration: Option<f64>,
    paused: bool,
    ended: bool,
    volume: f64,
    muted: bool,
    rate: f64,
    looping: bool,
    ready: ReadyState,
    fullscreen: bool,
    picture_in_picture: bool,
    interacted: bool,
}

impl Default for MediaState {
    fn default() -> Self {
        Self {
            source: String::new(),
            generation: 0,
            position: 0.0,
            duration: None,
            paused: true,
            ended: false,
            volume: 1.0,
            muted: false,
            rate: 1.0,
            looping: false,
            ready: ReadyState::HaveNothing,
            fullscreen: false,
            picture_in_picture: false,
            interacted: false,
        }
    }
}

type Listener = Arc<dyn Fn(SurfaceSignal) + Send + Sync>;

/// Deterministic in-memory [`PlaybackSurface`]
pub struct HeadlessSurface {
    config: HeadlessConfig,
    media: RwLock<HashMap<String, f64>>,
    state: Mutex<MediaState>,
    listener: RwLock<Option<Listener>>,
}

impl HeadlessSurface {
    pub fn new(config: HeadlessConfig) -> Self {
        Self {
            config,
            media: RwLock::new(HashMap::new()),
            state: Mutex::new(MediaState::default()),
            listener: RwLock::new(None),
        }
    }

    /// Register the duration reported when `source` is loaded
    pub fn with_media(self, source: impl Into<String>, duration: f64) -> Self {
        self.add_media(source, duration);
        self
    }

    pub fn add_media(&self, source: impl Into<String>, duration: f64) {
        self.media.write().insert(source.into(), duration);
    }

    pub fn config(&self) -> &HeadlessConfig {
        &self.config
    }

    /// Record a user interaction, lifting the autoplay restriction
    pub fn user_gesture(&self) {
        self.state.lock().interacted = true;
    }

    /// Raise an arbitrary signal, e.g. to simulate a stall or decode error
    pub fn raise(&self, signal: SurfaceSignal) {
        self.emit(vec![signal]);
    }

    /// Advance playback by `seconds` of media time
    pub fn advance(&self, seconds: f64) -> f64 {
        let target = self.current_time() + seconds;
        self.advance_to(target)
    }

    /// Advance playback up to `target`, one tick per `timeupdate`.
    ///
    /// Stops early when playback pauses, ends, or a different source is
    /// loaded by a listener. Returns the final position.
    pub fn advance_to(&self, target: f64) -> f64 {
        let tick = if self.config.tick > 0.0 { self.config.tick } else { 0.25 };
        let (generation, mut remaining) = {
            let state = self.state.lock();
            (state.generation, target - state.position)
        };

        while remaining > f64::EPSILON {
            let (signals, done) = {
                let mut state = self.state.lock();
                if state.paused || state.ended || state.generation != generation {
                    break;
                }

                let mut step = tick.min(remaining);
                let mut next = state.position + step;
                if let Some(duration) = state.duration {
                    if next > duration {
                        next = duration;
                        step = (duration - state.position).max(0.0);
                    }
                }
                remaining -= step;
                state.position = next;

                let mut signals = vec![SurfaceSignal::TimeUpdate(next)];
                let at_end = state.duration.is_some_and(|d| next >= d);
                if at_end && state.looping {
                    state.position = 0.0;
                    signals.push(SurfaceSignal::TimeUpdate(0.0));
                } else if at_end {
                    state.paused = true;
                    state.ended = true;
                    signals.push(SurfaceSignal::Pause);
                    signals.push(SurfaceSignal::Ended);
                }

                (signals, at_end && !state.looping)
            };

            self.emit(signals);
            if done {
                break;
            }
        }

        self.current_time()
    }

    /// Deliver `signals` in order. The rest of a batch is dropped once a
    /// listener loads another source, as it describes media that is gone.
    fn emit(&self, signals: Vec<SurfaceSignal>) {
        let Some(listener) = self.listener.read().clone() else {
            return;
        };
        let generation = self.state.lock().generation;

        for signal in signals {
            if self.state.lock().generation != generation {
                debug!(?signal, "Dropping signal for replaced source");
                break;
            }
            listener(signal);
        }
    }
}

impl Default for HeadlessSurface {
    fn default() -> Self {
        Self::new(HeadlessConfig::default())
    }
}

impl PlaybackSurface for HeadlessSurface {
    fn load(&self, source: &str) {
        let duration = if source.is_empty() {
            None
        } else {
            self.media
                .read()
                .get(source)
                .copied()
                .or(self.config.default_duration)
        };

        {
            let mut state = self.state.lock();
            state.source = source.to_string();
            state.generation += 1;
            state.position = 0.0;
            state.duration = duration;
            state.paused = true;
            state.ended = false;
            state.ready = if duration.is_some() {
                ReadyState::HaveEnoughData
            } else {
                ReadyState::HaveNothing
            };
        }

        debug!(source, ?duration, "Headless surface loaded source");

        if duration.is_some() {
            self.emit(vec![
                SurfaceSignal::LoadedMetadata(duration),
                SurfaceSignal::CanPlay,
            ]);
        }
    }

    fn source(&self) -> String {
        self.state.lock().source.clone()
    }

    fn play(&self) -> Result<(), SurfaceError> {
        let started = {
            let mut state = self.state.lock();
            if state.source.is_empty() {
                return Err(SurfaceError::NoSource);
            }
            if self.config.block_unmuted_autoplay && !state.muted && !state.interacted {
                return Err(SurfaceError::AutoplayBlocked);
            }
            let was_paused = state.paused;
            state.paused = false;
            state.ended = false;
            was_paused
        };

        if started {
            self.emit(vec![SurfaceSignal::Play, SurfaceSignal::Playing]);
        }
        Ok(())
    }

    fn pause(&self) {
        let paused = {
            let mut state = self.state.lock();
            !std::mem::replace(&mut state.paused, true)
        };
        if paused {
            self.emit(vec![SurfaceSignal::Pause]);
        }
    }

    fn current_time(&self) -> f64 {
        self.state.lock().position
    }

    fn set_current_time(&self, seconds: f64) {
        let position = {
            let mut state = self.state.lock();
            let mut position = seconds.max(0.0);
            if let Some(duration) = state.duration {
                position = position.min(duration);
            }
            state.position = position;
            state.ended = false;
            position
        };
        self.emit(vec![SurfaceSignal::TimeUpdate(position)]);
    }

    fn duration(&self) -> Option<f64> {
        self.state.lock().duration
    }

    fn buffered(&self) -> Vec<(f64, f64)> {
        match self.state.lock().duration {
            Some(duration) if duration > 0.0 => vec![(0.0, duration)],
            _ => Vec::new(),
        }
    }

    fn volume(&self) -> f64 {
        self.state.lock().volume
    }

    fn set_volume(&self, volume: f64) {
        let signal = {
            let mut state = self.state.lock();
            state.volume = volume;
            SurfaceSignal::VolumeChange { volume, muted: state.muted }
        };
        self.emit(vec![signal]);
    }

    fn muted(&self) -> bool {
        self.state.lock().muted
    }

    fn set_muted(&self, muted: bool) {
        let signal = {
            let mut state = self.state.lock();
            state.muted = muted;
            SurfaceSignal::VolumeChange { volume: state.volume, muted }
        };
        self.emit(vec![signal]);
    }

    fn playback_rate(&self) -> f64 {
        self.state.lock().rate
    }

    fn set_playback_rate(&self, rate: f64) {
        self.state.lock().rate = rate;
        self.emit(vec![SurfaceSignal::RateChange(rate)]);
    }

    fn looping(&self) -> bool {
        self.state.lock().looping
    }

    fn set_looping(&self, looping: bool) {
        self.state.lock().looping = looping;
    }

    fn paused(&self) -> bool {
        self.state.lock().paused
    }

    fn ended(&self) -> bool {
        self.state.lock().ended
    }

    fn ready_state(&self) -> ReadyState {
        self.state.lock().ready
    }

    fn request_fullscreen(&self) -> Result<(), SurfaceError> {
        if !self.config.fullscreen_supported {
            return Err(SurfaceError::Unsupported("fullscreen"));
        }
        let changed = !std::mem::replace(&mut self.state.lock().fullscreen, true);
        if changed {
            self.emit(vec![SurfaceSignal::FullscreenChange(true)]);
        }
        Ok(())
    }

    fn exit_fullscreen(&self) -> Result<(), SurfaceError> {
        let changed = std::mem::replace(&mut self.state.lock().fullscreen, false);
        if changed {
            self.emit(vec![SurfaceSignal::FullscreenChange(false)]);
        }
        Ok(())
    }

    fn is_fullscreen(&self) -> bool {
        self.state.lock().fullscreen
    }

    fn picture_in_picture_supported(&self) -> bool {
        self.config.picture_in_picture_supported
    }

    fn request_picture_in_picture(&self) -> Result<(), SurfaceError> {
        if !self.config.picture_in_picture_supported {
            return Err(SurfaceError::Unsupported("picture-in-picture"));
        }
        let changed = !std::mem::replace(&mut self.state.lock().picture_in_picture, true);
        if changed {
            self.emit(vec![SurfaceSignal::EnterPictureInPicture]);
        }
        Ok(())
    }

    fn exit_picture_in_picture(&self) -> Result<(), SurfaceError> {
        let changed = std::mem::replace(&mut self.state.lock().picture_in_picture, false);
        if changed {
            self.emit(vec![SurfaceSignal::LeavePictureInPicture]);
        }
        Ok(())
    }

    fn is_picture_in_picture(&self) -> bool {
        self.state.lock().picture_in_picture
    }

    fn attach(&self, listener: SignalListener) {
        *self.listener.write() = Some(Arc::from(listener));
    }

    fn detach(&self) {
        *self.listener.write() = None;
    }

    fn unload(&self) {
        let mut state = self.state.lock();
        state.source.clear();
        state.generation += 1;
        state.position = 0.0;
        state.duration = None;
        state.paused = true;
        state.ended = false;
        state.ready = ReadyState::HaveNothing;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn recording_surface() -> (Arc<HeadlessSurface>, Arc<Mutex<Vec<SurfaceSignal>>>) {
        let surface = Arc::new(HeadlessSurface::default().with_media("movie.mp4", 2.0));
        let log = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&log);
        surface.attach(Box::new(move |signal| sink.lock().push(signal)));
        (surface, log)
    }

    #[test]
    fn test_load_reports_metadata() {
        let (surface, log) = recording_surface();
        surface.load("movie.mp4");

        assert_eq!(surface.duration(), Some(2.0));
        assert_eq!(surface.ready_state(), ReadyState::HaveEnoughData);
        assert_eq!(log.lock()[0], SurfaceSignal::LoadedMetadata(Some(2.0)));
    }

    #[test]
    fn test_play_requires_source() {
        let surface = HeadlessSurface::default();
        assert_eq!(surface.play(), Err(SurfaceError::NoSource));
    }

    #[test]
    fn test_advance_emits_ticks_and_ends() {
        let (surface, log) = recording_surface();
        surface.load("movie.mp4");
        surface.play().unwrap();
        log.lock().clear();

        let position = surface.advance(10.0);
        assert_eq!(position, 2.0);
        assert!(surface.ended());
        assert!(surface.paused());

        let log = log.lock();
        let ticks = log
            .iter()
            .filter(|s| matches!(s, SurfaceSignal::TimeUpdate(_)))
            .count();
        assert_eq!(ticks, 8);
        assert_eq!(log.last(), Some(&SurfaceSignal::Ended));
    }

    #[test]
    fn test_advance_does_nothing_while_paused() {
        let (surface, _) = recording_surface();
        surface.load("movie.mp4");
        assert_eq!(surface.advance(1.0), 0.0);
    }

    #[test]
    fn test_looping_wraps_without_ending() {
        let (surface, _) = recording_surface();
        surface.load("movie.mp4");
        surface.set_looping(true);
        surface.play().unwrap();

        surface.advance(2.5);
        assert!(!surface.ended());
        assert!(surface.current_time() < 2.0);
    }

    #[test]
    fn test_autoplay_policy() {
        let surface = HeadlessSurface::new(HeadlessConfig {
            block_unmuted_autoplay: true,
            ..Default::default()
        })
        .with_media("movie.mp4", 2.0);
        surface.load("movie.mp4");

        assert_eq!(surface.play(), Err(SurfaceError::AutoplayBlocked));
        surface.set_muted(true);
        assert!(surface.play().is_ok());
    }

    #[test]
    fn test_seek_clamps_to_duration() {
        let (surface, log) = recording_surface();
        surface.load("movie.mp4");
        surface.set_current_time(5.0);
        assert_eq!(surface.current_time(), 2.0);
        assert_eq!(log.lock().last(), Some(&SurfaceSignal::TimeUpdate(2.0)));
    }

    #[test]
    fn test_detach_silences_signals() {
        let (surface, log) = recording_surface();
        surface.detach();
        surface.load("movie.mp4");
        assert!(log.lock().is_empty());
    }
}
