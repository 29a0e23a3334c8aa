//! Core types for DAL Player

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Unique identifier for a player instance
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PlayerId(pub Uuid);

impl PlayerId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for PlayerId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for PlayerId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Readiness of the playback surface, ordered from least to most data
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReadyState {
    /// No information about the media
    HaveNothing,
    /// Duration and dimensions are known
    HaveMetadata,
    /// Data for the current position only
    HaveCurrentData,
    /// Enough data to advance past the current position
    HaveFutureData,
    /// Enough data to play through without stalling
    HaveEnoughData,
}

impl Default for ReadyState {
    fn default() -> Self {
        ReadyState::HaveNothing
    }
}

/// Snapshot of the playback surface state
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlaybackState {
    /// Current position in seconds
    pub current_time: f64,
    /// Duration in seconds, `None` while unknown
    pub duration: Option<f64>,
    /// Volume in 0..=1
    pub volume: f64,
    pub muted: bool,
    pub paused: bool,
    pub ended: bool,
    /// Buffered `[start, end)` ranges, ordered and non-overlapping
    pub buffered: Vec<(f64, f64)>,
}

impl Default for PlaybackState {
    fn default() -> Self {
        Self {
            current_time: 0.0,
            duration: None,
            volume: 1.0,
            muted: false,
            paused: true,
            ended: false,
            buffered: Vec::new(),
        }
    }
}

impl PlaybackState {
    /// Total buffered seconds across all ranges
    pub fn buffered_seconds(&self) -> f64 {
        self.buffered.iter().map(|(start, end)| end - start).sum()
    }
}

// =============================================================================
// Ad Types
// =============================================================================

/// Where an ad break is inserted relative to the content
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InsertionPoint {
    /// Before the content starts
    Pre,
    /// During the content, at a trigger time
    Mid,
    /// After the content ends
    Post,
}

impl std::fmt::Display for InsertionPoint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            InsertionPoint::Pre => write!(f, "pre-roll"),
            InsertionPoint::Mid => write!(f, "mid-roll"),
            InsertionPoint::Post => write!(f, "post-roll"),
        }
    }
}

/// A single advertisement to insert into playback
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AdItem {
    /// Media reference loaded into the surface while the ad plays
    #[serde(rename = "src")]
    pub source: String,
    /// Insertion point
    #[serde(rename = "position")]
    pub insertion_point: InsertionPoint,
    /// Trigger time in the content timeline (mid-rolls only)
    #[serde(rename = "time", default, skip_serializing_if = "Option::is_none")]
    pub trigger_time: Option<f64>,
    /// Offset into the ad after which it may be skipped
    #[serde(rename = "skipAfter", default, skip_serializing_if = "Option::is_none")]
    pub skip_after: Option<f64>,
    /// Identity, generated when the ad is handed to the engine without one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
}

impl AdItem {
    fn new(source: impl Into<String>, insertion_point: InsertionPoint) -> Self {
        Self {
            source: source.into(),
            insertion_point,
            trigger_time: None,
            skip_after: None,
            id: None,
        }
    }

    /// Create a pre-roll ad
    pub fn pre(source: impl Into<String>) -> Self {
        Self::new(source, InsertionPoint::Pre)
    }

    /// Create a mid-roll ad triggered at `time` seconds of content
    pub fn mid(source: impl Into<String>, time: f64) -> Self {
        Self {
            trigger_time: Some(time),
            ..Self::new(source, InsertionPoint::Mid)
        }
    }

    /// Create a post-roll ad
    pub fn post(source: impl Into<String>) -> Self {
        Self::new(source, InsertionPoint::Post)
    }

    /// Allow skipping after `seconds` of ad playback
    pub fn with_skip_after(mut self, seconds: f64) -> Self {
        self.skip_after = Some(seconds);
        self
    }

    /// Set an explicit identity
    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    /// Identity, or an empty string if none has been assigned yet
    pub fn id(&self) -> &str {
        self.id.as_deref().unwrap_or("")
    }

    /// Whether `elapsed` seconds into the ad make it skippable
    pub fn is_skippable_at(&self, elapsed: f64) -> bool {
        self.skip_after.is_some_and(|after| elapsed >= after)
    }

    /// Generate an identity of the form `ad_xxxxxxx`
    pub fn generate_id() -> String {
        let uuid = Uuid::new_v4().simple().to_string();
        format!("ad_{}", &uuid[..7])
    }
}

// =============================================================================
// Caption Types
// =============================================================================

/// Caption track declaration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CaptionTrack {
    /// URL of the track file
    pub src: String,
    /// Human-readable label (e.g., "English")
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    /// BCP-47 language code
    #[serde(default = "default_language")]
    pub lang: String,
}

fn default_language() -> String {
    "en".to_string()
}

impl CaptionTrack {
    pub fn new(src: impl Into<String>) -> Self {
        Self {
            src: src.into(),
            label: None,
            lang: default_language(),
        }
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    pub fn with_lang(mut self, lang: impl Into<String>) -> Self {
        self.lang = lang.into();
        self
    }
}

/// Individual cue within a text track
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextCue {
    /// Cue identifier
    pub id: String,
    /// Start time in seconds
    pub start_time: f64,
    /// End time in seconds
    pub end_time: f64,
    /// Cue text content (may contain markup)
    pub text: String,
    /// Cue settings (position, alignment, etc.)
    pub settings: Option<CueSettings>,
}

impl TextCue {
    /// Create a new text cue
    pub fn new(
        id: impl Into<String>,
        start_time: f64,
        end_time: f64,
        text: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            start_time,
            end_time,
            text: text.into(),
            settings: None,
        }
    }

    /// Duration of this cue in seconds
    pub fn duration(&self) -> f64 {
        self.end_time - self.start_time
    }

    /// Check if cue should be displayed at given time
    pub fn is_active_at(&self, time: f64) -> bool {
        time >= self.start_time && time < self.end_time
    }
}

/// Cue positioning and styling settings
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CueSettings {
    /// Vertical positioning ("rl" = right-to-left, "lr" = left-to-right)
    pub vertical: Option<String>,
    /// Line position
    pub line: Option<f64>,
    /// Text position (0-100%)
    pub position: Option<f64>,
    /// Cue size (0-100%)
    pub size: Option<f64>,
    /// Text alignment
    pub align: Option<CueAlignment>,
}

/// Text alignment for cues
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CueAlignment {
    Start,
    Center,
    End,
    Left,
    Right,
}
