//! Image nodes backed by [`ImageBackend`](crate::media::ImageBackend) and
//! the background-removal runtime

mod effect;
mod logo;
mod remove_bg;
mod resize;
mod text;

pub use effect::EffectImageHandler;
pub use logo::LogoOverlayHandler;
pub use remove_bg::RemoveBgHandler;
pub use resize::ResizeImageHandler;
pub use text::TextOverlayHandler;
