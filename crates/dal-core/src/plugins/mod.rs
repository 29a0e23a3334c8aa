//! Built-in plugins
//!
//! Each plugin is constructed on its own and attached with
//! [`Player::register`](crate::Player::register). Lookups use the `NAME`
//! constant of each type.

mod ads;
mod captions;
mod download;
mod looping;
mod pip;
mod speed;

pub use ads::AdsPlugin;
pub use captions::CaptionsPlugin;
pub use download::{DownloadPlugin, DownloadRequest};
pub use looping::LoopPlugin;
pub use pip::PictureInPicturePlugin;
pub use speed::PlaybackSpeedPlugin;
