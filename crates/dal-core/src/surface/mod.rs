//! Playback surface contract
//!
//! The surface decodes and renders media and owns the playback state. The
//! player only drives it through [`PlaybackSurface`] and learns about state
//! changes from the [`SurfaceSignal`]s it raises.

mod headless;

pub use headless::{HeadlessConfig, HeadlessSurface};

use crate::error::SurfaceError;
use crate::events::{self, EventPayload};
use crate::types::{PlaybackState, ReadyState};

/// Lifecycle signal raised by a playback surface
#[derive(Debug, Clone, PartialEq)]
pub enum SurfaceSignal {
    /// Playback was requested and is no longer paused
    Play,
    Pause,
    /// Position advanced
    TimeUpdate(f64),
    Ended,
    /// Duration and dimensions became available
    LoadedMetadata(Option<f64>),
    VolumeChange { volume: f64, muted: bool },
    /// More media was buffered
    Progress,
    Stalled,
    /// Playback resumed after a stall
    Playing,
    /// Enough data to resume playback
    CanPlay,
    Error(String),
    RateChange(f64),
    FullscreenChange(bool),
    EnterPictureInPicture,
    LeavePictureInPicture,
}

impl SurfaceSignal {
    /// Event name the player republishes this signal under
    pub fn name(&self) -> &'static str {
        match self {
            SurfaceSignal::Play => events::PLAY,
            SurfaceSignal::Pause => events::PAUSE,
            SurfaceSignal::TimeUpdate(_) => events::TIME_UPDATE,
            SurfaceSignal::Ended => events::ENDED,
            SurfaceSignal::LoadedMetadata(_) => events::LOADED_METADATA,
            SurfaceSignal::VolumeChange { .. } => events::VOLUME_CHANGE,
            SurfaceSignal::Progress => events::PROGRESS,
            SurfaceSignal::Stalled => events::STALLED,
            SurfaceSignal::Playing => events::PLAYING,
            SurfaceSignal::CanPlay => events::CAN_PLAY,
            SurfaceSignal::Error(_) => events::ERROR,
            SurfaceSignal::RateChange(_) => events::RATE_CHANGE,
            SurfaceSignal::FullscreenChange(_) => events::FULLSCREEN_CHANGE,
            SurfaceSignal::EnterPictureInPicture => events::ENTER_PICTURE_IN_PICTURE,
            SurfaceSignal::LeavePictureInPicture => events::LEAVE_PICTURE_IN_PICTURE,
        }
    }

    /// Payload the player republishes this signal with
    pub fn payload(&self) -> EventPayload {
        match self {
            SurfaceSignal::TimeUpdate(t) => EventPayload::Time(*t),
            SurfaceSignal::LoadedMetadata(d) => EventPayload::Duration(*d),
            SurfaceSignal::VolumeChange { volume, muted } => EventPayload::Volume {
                volume: *volume,
                muted: *muted,
            },
            SurfaceSignal::Error(msg) => EventPayload::Error(msg.clone()),
            SurfaceSignal::RateChange(rate) => EventPayload::Rate(*rate),
            SurfaceSignal::FullscreenChange(on) => EventPayload::Flag(*on),
            _ => EventPayload::None,
        }
    }
}

/// Callback a surface delivers its signals to
pub type SignalListener = Box<dyn Fn(SurfaceSignal) + Send + Sync>;

/// Native media playback capability owned by the host
///
/// Signals may be delivered synchronously from inside any of these calls, so
/// implementations must not hold internal locks while invoking the listener.
pub trait PlaybackSurface: Send + Sync {
    /// Replace the media reference and reset playback to the start
    fn load(&self, source: &str);

    /// Currently loaded media reference, empty when none
    fn source(&self) -> String;

    /// Start or resume playback
    fn play(&self) -> Result<(), SurfaceError>;

    fn pause(&self);

    fn current_time(&self) -> f64;

    fn set_current_time(&self, seconds: f64);

    /// Duration in seconds, `None` while unknown
    fn duration(&self) -> Option<f64>;

    /// Buffered `[start, end)` ranges
    fn buffered(&self) -> Vec<(f64, f64)>;

    fn volume(&self) -> f64;

    fn set_volume(&self, volume: f64);

    fn muted(&self) -> bool;

    fn set_muted(&self, muted: bool);

    fn playback_rate(&self) -> f64;

    fn set_playback_rate(&self, rate: f64);

    fn looping(&self) -> bool;

    fn set_looping(&self, looping: bool);

    fn paused(&self) -> bool;

    fn ended(&self) -> bool;

    fn ready_state(&self) -> ReadyState;

    /// Ask for exclusive fullscreen presentation. Settles later through
    /// [`SurfaceSignal::FullscreenChange`].
    fn request_fullscreen(&self) -> Result<(), SurfaceError> {
        Err(SurfaceError::Unsupported("fullscreen"))
    }

    fn exit_fullscreen(&self) -> Result<(), SurfaceError> {
        Err(SurfaceError::Unsupported("fullscreen"))
    }

    fn is_fullscreen(&self) -> bool {
        false
    }

    fn picture_in_picture_supported(&self) -> bool {
        false
    }

    /// Ask for picture-in-picture. Settles later through
    /// [`SurfaceSignal::EnterPictureInPicture`].
    fn request_picture_in_picture(&self) -> Result<(), SurfaceError> {
        Err(SurfaceError::Unsupported("picture-in-picture"))
    }

    fn exit_picture_in_picture(&self) -> Result<(), SurfaceError> {
        Err(SurfaceError::Unsupported("picture-in-picture"))
    }

    fn is_picture_in_picture(&self) -> bool {
        false
    }

    /// Install the listener that receives every lifecycle signal
    fn attach(&self, listener: SignalListener);

    /// Remove the listener; no further signals are delivered
    fn detach(&self);

    /// Stop playback and release the loaded media
    fn unload(&self);

    /// Snapshot of the surface state
    fn state(&self) -> PlaybackState {
        PlaybackState {
            current_time: self.current_time(),
            duration: self.duration(),
            volume: self.volume(),
            muted: self.muted(),
            paused: self.paused(),
            ended: self.ended(),
            buffered: self.buffered(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_signal_names() {
        assert_eq!(SurfaceSignal::Play.name(), "play");
        assert_eq!(SurfaceSignal::TimeUpdate(1.0).name(), "timeupdate");
        assert_eq!(SurfaceSignal::Ended.name(), "ended");
        assert_eq!(SurfaceSignal::Playing.name(), "playing");
    }

    #[test]
    fn test_signal_payloads() {
        assert_eq!(SurfaceSignal::TimeUpdate(3.5).payload(), EventPayload::Time(3.5));
        assert_eq!(
            SurfaceSignal::VolumeChange { volume: 0.5, muted: true }.payload(),
            EventPayload::Volume { volume: 0.5, muted: true }
        );
        assert_eq!(SurfaceSignal::Stalled.payload(), EventPayload::None);
    }
}
