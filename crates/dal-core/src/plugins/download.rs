//! Download link support

use crate::player::{Player, WeakPlayer};
use crate::plugin::Plugin;
use parking_lot::RwLock;
use serde::Serialize;

/// What the host needs to save the current media
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DownloadRequest {
    pub url: String,
    /// Suggested file name
    pub filename: String,
}

impl DownloadRequest {
    const FALLBACK_FILENAME: &'static str = "video.mp4";

    pub fn for_source(url: impl Into<String>) -> Self {
        let url = url.into();
        let filename = url
            .rsplit('/')
            .next()
            .filter(|segment| !segment.is_empty())
            .unwrap_or(Self::FALLBACK_FILENAME)
            .to_string();
        Self { url, filename }
    }
}

/// Download support, registered as `"download"`. The host performs the
/// transfer; the plugin only describes it.
#[derive(Debug, Default)]
pub struct DownloadPlugin {
    player: RwLock<WeakPlayer>,
}

impl DownloadPlugin {
    pub const NAME: &'static str = "download";

    pub fn new() -> Self {
        Self::default()
    }

    /// Download request for the current source, `None` when nothing is loaded
    pub fn request(&self) -> Option<DownloadRequest> {
        let source = self.player.read().upgrade()?.source();
        (!source.is_empty()).then(|| DownloadRequest::for_source(source))
    }
}

impl Plugin for DownloadPlugin {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn setup(&self, player: &Player) {
        *self.player.write() = player.downgrade();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_filename_from_last_segment() {
        let request = DownloadRequest::for_source("https://cdn.example.com/media/clip.webm");
        assert_eq!(request.filename, "clip.webm");
        assert_eq!(DownloadRequest::for_source("https://cdn.example.com/").filename, "video.mp4");
    }

    #[test]
    fn test_request_requires_source() {
        use crate::config::PlayerOptions;
        use crate::surface::HeadlessSurface;
        use std::sync::Arc;

        let player = Player::new(Arc::new(HeadlessSurface::default()), PlayerOptions::default());
        let plugin = player.register(Arc::new(DownloadPlugin::new()));
        assert!(plugin.request().is_none());

        player.set_source("movies/trailer.mp4");
        assert_eq!(plugin.request().unwrap().filename, "trailer.mp4");
    }
}
