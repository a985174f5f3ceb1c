use async_trait::async_trait;
use std::sync::Arc;
use tempfile::TempDir;
use tracing::info;

use crate::handlers::output::{OutputDir, extension_of, settle};
use crate::handlers::params::Params;
use crate::handlers::run_blocking;
use crate::handlers::traits::{NodeError, NodeHandler};
use crate::handlers::types::{NodeKind, Outputs, output_path_outputs};
use crate::handlers::validate::{MediaKind, require_file};
use crate::media::{ImageBackend, ModelBackend};

/// Inpaints the masked region of an image
pub struct RemoveObjectHandler {
    images: Arc<dyn ImageBackend>,
    models: Arc<dyn ModelBackend>,
    output: OutputDir,
}

impl RemoveObjectHandler {
    pub fn new(
        images: Arc<dyn ImageBackend>,
        models: Arc<dyn ModelBackend>,
        output: OutputDir,
    ) -> Self {
        Self {
            images,
            models,
            output,
        }
    }
}

#[async_trait]
impl NodeHandler for RemoveObjectHandler {
    fn kind(&self) -> NodeKind {
        NodeKind::RemoveObject
    }

    async fn run(&self, params: Params<'_>) -> Result<Outputs, NodeError> {
        let image_path = params.required_string("image_path", "Image path")?;
        let mask_path = params.required_string("mask_path", "Mask path")?;
        let image = require_file(&image_path, MediaKind::Image, "Input image")?;
        let mask = require_file(&mask_path, MediaKind::Image, "Mask image")?;

        let ext = match extension_of(&image) {
            ext if ext.is_empty() => ".png".to_string(),
            ext => ext,
        };
        let output = self.output.allocate("inpaint_", &ext);

        // Normalized mask lives only for the duration of the call
        let scratch = TempDir::new()
            .map_err(|e| NodeError::Internal(format!("cannot create scratch dir: {e}")))?;
        let prepared = scratch.path().join("mask.png");

        info!(path = %image.display(), mask = %mask.display(), "Removing object");

        let (src, dst) = (image.clone(), prepared.clone());
        run_blocking(&self.images, move |backend| backend.prepare_mask(&mask, &src, &dst)).await?;

        let result = self
            .models
            .inpaint(&image, &prepared, &output)
            .await
            .map_err(NodeError::from);
        settle(result, &output, "remove object").await?;

        Ok(output_path_outputs(&output))
    }
}
