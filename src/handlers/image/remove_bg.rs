use async_trait::async_trait;
use std::sync::Arc;
use tracing::info;

use crate::handlers::output::{OutputDir, settle};
use crate::handlers::params::Params;
use crate::handlers::traits::{NodeError, NodeHandler};
use crate::handlers::types::{NodeKind, Outputs, output_path_outputs};
use crate::handlers::validate::{MediaKind, require_file};
use crate::media::ModelBackend;

/// Background removal; the result is always a PNG with alpha
pub struct RemoveBgHandler {
    models: Arc<dyn ModelBackend>,
    output: OutputDir,
}

impl RemoveBgHandler {
    pub fn new(models: Arc<dyn ModelBackend>, output: OutputDir) -> Self {
        Self { models, output }
    }
}

#[async_trait]
impl NodeHandler for RemoveBgHandler {
    fn kind(&self) -> NodeKind {
        NodeKind::RemoveBgImage
    }

    async fn run(&self, params: Params<'_>) -> Result<Outputs, NodeError> {
        let image_path = params.required_string("image_path", "Image path")?;
        let input = require_file(&image_path, MediaKind::Image, "Input image")?;
        let output = self.output.allocate("nobg_", ".png");

        info!(path = %input.display(), "Removing image background");

        let result = self
            .models
            .remove_background(&input, &output)
            .await
            .map_err(NodeError::from);
        settle(result, &output, "remove background").await?;

        Ok(output_path_outputs(&output))
    }
}
