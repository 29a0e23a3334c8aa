//! Error types for DAL Core

use thiserror::Error;

/// Result type alias for player operations
pub type Result<T> = std::result::Result<T, Error>;

/// Player error types
#[derive(Error, Debug)]
pub enum Error {
    // Configuration errors
    #[error("No playback surface provided")]
    MissingSurface,

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // Playback errors
    #[error("Playback rejected: {0}")]
    Playback(#[from] SurfaceError),

    // Plugin errors
    #[error("Plugin not registered: {name}")]
    PluginNotFound { name: String },

    #[error("Plugin {name} is not a {expected}")]
    PluginType { name: String, expected: &'static str },

    // Caption errors
    #[error("Failed to parse captions: {0}")]
    CaptionParse(String),

    // Serialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Create a configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Error::InvalidConfig(msg.into())
    }

    /// Returns true if this error is recoverable
    pub fn is_recoverable(&self) -> bool {
        match self {
            Error::Playback(e) => e.is_transient(),
            Error::PluginNotFound { .. } => true,
            _ => false,
        }
    }

    /// Returns the error code for hosts and analytics
    pub fn error_code(&self) -> &'static str {
        match self {
            Error::MissingSurface => "MISSING_SURFACE",
            Error::InvalidConfig(_) => "INVALID_CONFIG",
            Error::Playback(e) => e.error_code(),
            Error::PluginNotFound { .. } => "PLUGIN_NOT_FOUND",
            Error::PluginType { .. } => "PLUGIN_TYPE",
            Error::CaptionParse(_) => "CAPTION_PARSE",
            Error::Json(_) => "JSON",
            Error::Io(_) => "IO",
        }
    }
}

/// Errors reported by a [`PlaybackSurface`](crate::surface::PlaybackSurface)
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SurfaceError {
    #[error("Autoplay blocked by policy")]
    AutoplayBlocked,

    #[error("No source loaded")]
    NoSource,

    #[error("Capability not supported: {0}")]
    Unsupported(&'static str),

    #[error("Media error: {0}")]
    Media(String),
}

impl SurfaceError {
    /// Autoplay rejections and missing sources can be retried by the host
    pub fn is_transient(&self) -> bool {
        matches!(self, SurfaceError::AutoplayBlocked | SurfaceError::NoSource)
    }

    pub fn error_code(&self) -> &'static str {
        match self {
            SurfaceError::AutoplayBlocked => "AUTOPLAY_BLOCKED",
            SurfaceError::NoSource => "NO_SOURCE",
            SurfaceError::Unsupported(_) => "UNSUPPORTED",
            SurfaceError::Media(_) => "MEDIA",
        }
    }
}
