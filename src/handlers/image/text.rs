use async_trait::async_trait;
use std::sync::Arc;
use tracing::info;

use crate::handlers::output::{OutputDir, extension_of, settle};
use crate::handlers::params::Params;
use crate::handlers::run_blocking;
use crate::handlers::traits::{NodeError, NodeHandler};
use crate::handlers::types::{NodeKind, Outputs, output_path_outputs};
use crate::handlers::validate::{MediaKind, require_file};
use crate::media::color::parse_color;
use crate::media::layout::Anchor;
use crate::media::{ImageBackend, TextOverlay};

pub struct TextOverlayHandler {
    backend: Arc<dyn ImageBackend>,
    output: OutputDir,
}

impl TextOverlayHandler {
    pub fn new(backend: Arc<dyn ImageBackend>, output: OutputDir) -> Self {
        Self { backend, output }
    }
}

fn color_param(key: &str, value: &str) -> Result<image::Rgba<u8>, NodeError> {
    parse_color(value).map_err(|msg| NodeError::InvalidParameter(format!("{key}: {msg}")))
}

#[async_trait]
impl NodeHandler for TextOverlayHandler {
    fn kind(&self) -> NodeKind {
        NodeKind::TextOverlayImage
    }

    async fn run(&self, params: Params<'_>) -> Result<Outputs, NodeError> {
        let image_path = params.required_string("image_path", "Image path")?;
        let input = require_file(&image_path, MediaKind::Image, "Input image")?;

        let font_size = params.f64_or("font_size", 40.0)?;
        if font_size <= 0.0 {
            return Err(NodeError::InvalidParameter(format!(
                "font_size must be positive, got {font_size}"
            )));
        }
        let anchor: Anchor = params
            .string_or("position", "center")?
            .parse()
            .map_err(NodeError::InvalidParameter)?;
        let background = params
            .string("bg_color")?
            .filter(|c| !c.trim().is_empty())
            .map(|c| color_param("bg_color", &c))
            .transpose()?;

        let spec = TextOverlay {
            text: params.string_or("text", "Sample Text")?,
            font_name: params.string("font_name")?,
            font_size: font_size as f32,
            color: color_param("color", &params.string_or("color", "white")?)?,
            background,
            anchor,
            offset: params.offset("offset")?,
            opacity: params.f64_or("opacity", 1.0)?.clamp(0.0, 1.0) as f32,
        };
        let output = self.output.allocate("overlay_", &extension_of(&input));

        info!(path = %input.display(), text = %spec.text, ?anchor, "Overlaying text");

        let dst = output.clone();
        let result = run_blocking(&self.backend, move |backend| {
            backend.overlay_text(&input, &dst, &spec)
        })
        .await;
        settle(result, &output, "overlay text").await?;

        Ok(output_path_outputs(&output))
    }
}
