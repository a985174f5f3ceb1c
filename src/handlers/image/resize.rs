use async_trait::async_trait;
use std::sync::Arc;
use tracing::info;

use crate::handlers::output::{OutputDir, extension_of, settle};
use crate::handlers::params::Params;
use crate::handlers::run_blocking;
use crate::handlers::traits::{NodeError, NodeHandler};
use crate::handlers::types::{NodeKind, Outputs, output_path_outputs};
use crate::handlers::validate::{MediaKind, require_file};
use crate::media::{ImageBackend, check_pixels};

pub struct ResizeImageHandler {
    backend: Arc<dyn ImageBackend>,
    output: OutputDir,
    max_pixels: u64,
}

impl ResizeImageHandler {
    pub fn new(backend: Arc<dyn ImageBackend>, output: OutputDir, max_pixels: u64) -> Self {
        Self {
            backend,
            output,
            max_pixels,
        }
    }
}

#[async_trait]
impl NodeHandler for ResizeImageHandler {
    fn kind(&self) -> NodeKind {
        NodeKind::ResizeImage
    }

    async fn run(&self, params: Params<'_>) -> Result<Outputs, NodeError> {
        let image_path = params.required_string("image_path", "Image path")?;
        let width = params
            .u32("width")?
            .ok_or_else(|| NodeError::MissingInput("Width is required (width)".to_string()))?;
        let height = params
            .u32("height")?
            .ok_or_else(|| NodeError::MissingInput("Height is required (height)".to_string()))?;
        if width == 0 || height == 0 {
            return Err(NodeError::InvalidParameter(format!(
                "width and height must be positive, got {width}x{height}"
            )));
        }
        check_pixels("resize target", width.into(), height.into(), self.max_pixels)?;

        let input = require_file(&image_path, MediaKind::Image, "Input image")?;
        let output = self.output.allocate("resized_", &extension_of(&input));

        info!(path = %input.display(), width, height, "Resizing image");

        let dst = output.clone();
        let result = run_blocking(&self.backend, move |backend| {
            backend.resize(&input, &dst, width, height)
        })
        .await;
        settle(result, &output, "resize image").await?;

        Ok(output_path_outputs(&output))
    }
}
