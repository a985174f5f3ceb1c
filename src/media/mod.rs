//! Media backends
//!
//! Handlers never decode, encode or run inference themselves; they hand
//! validated parameters to one of these backends:
//!
//! - [`ImageBackend`] - raster operations (`image`, `imageproc`, `ab_glyph`)
//! - [`VideoBackend`] - probing and encoding via the `ffmpeg`/`ffprobe` binaries
//! - [`ModelBackend`] - background removal and inpainting model runtimes
//!
//! Each trait has one production implementation here. Tests substitute
//! recording doubles to check that rejected calls never reach a backend.

pub mod color;
pub mod ffmpeg;
pub mod fonts;
pub mod layout;
pub mod models;
mod process;
pub mod raster;

use thiserror::Error;

pub use ffmpeg::{EncodeSettings, FfmpegEngine, FfmpegJob, MediaInfo, VideoBackend};
pub use fonts::FontLibrary;
pub use models::{CliModelRuntime, ModelBackend};
pub use raster::{Effect, ImageBackend, LogoOverlay, RasterEngine, TextCard, TextOverlay};

#[derive(Debug, Error)]
pub enum MediaError {
    #[error("image error: {0}")]
    Image(#[from] image::ImageError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("font error: {0}")]
    Font(String),

    #[error("{tool} failed: {message}")]
    Tool { tool: String, message: String },

    #[error("invalid media: {0}")]
    Invalid(String),

    #[error("{what} of {width}x{height} exceeds the limit of {max} pixels")]
    TooLarge {
        what: &'static str,
        width: u64,
        height: u64,
        max: u64,
    },
}

/// Fail with [`MediaError::TooLarge`] unless `width * height` fits in `max`
pub fn check_pixels(what: &'static str, width: u64, height: u64, max: u64) -> Result<(), MediaError> {
    if width.saturating_mul(height) > max {
        return Err(MediaError::TooLarge {
            what,
            width,
            height,
            max,
        });
    }
    Ok(())
}
