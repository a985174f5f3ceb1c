use async_trait::async_trait;
use std::sync::Arc;
use tracing::info;

use crate::handlers::output::{OutputDir, extension_of, settle};
use crate::handlers::params::Params;
use crate::handlers::run_blocking;
use crate::handlers::traits::{NodeError, NodeHandler};
use crate::handlers::types::{NodeKind, Outputs, output_path_outputs};
use crate::handlers::validate::{MediaKind, require_file};
use crate::media::layout::Anchor;
use crate::media::{ImageBackend, LogoOverlay};

/// Composites a (scaled, faded) logo onto an image at an anchor point
pub struct LogoOverlayHandler {
    backend: Arc<dyn ImageBackend>,
    output: OutputDir,
}

impl LogoOverlayHandler {
    pub fn new(backend: Arc<dyn ImageBackend>, output: OutputDir) -> Self {
        Self { backend, output }
    }
}

#[async_trait]
impl NodeHandler for LogoOverlayHandler {
    fn kind(&self) -> NodeKind {
        NodeKind::LogoOverlayImage
    }

    async fn run(&self, params: Params<'_>) -> Result<Outputs, NodeError> {
        let image_path = params.required_string("image_path", "Image path")?;
        let logo_path = params.required_string("logo_path", "Logo path")?;

        let base = require_file(&image_path, MediaKind::Image, "Base image")?;
        let logo = require_file(&logo_path, MediaKind::Image, "Logo image")?;

        let anchor: Anchor = params
            .string_or("position", "bottom_right")?
            .parse()
            .map_err(NodeError::InvalidParameter)?;
        let offset = params.offset("offset")?;
        let scale = params.f64_or("logo_scale", 1.0)?;
        if scale <= 0.0 {
            return Err(NodeError::InvalidParameter(format!(
                "logo_scale must be positive, got {scale}"
            )));
        }
        let opacity = params.f64_or("opacity", 1.0)?.clamp(0.0, 1.0);

        let spec = LogoOverlay {
            anchor,
            offset,
            scale: scale as f32,
            opacity: opacity as f32,
        };
        let output = self.output.allocate("logo_", &extension_of(&base));

        info!(path = %base.display(), logo = %logo.display(), ?anchor, "Overlaying logo");

        let dst = output.clone();
        let result = run_blocking(&self.backend, move |backend| {
            backend.overlay_logo(&base, &logo, &dst, &spec)
        })
        .await;
        settle(result, &output, "overlay logo").await?;

        Ok(output_path_outputs(&output))
    }
}
