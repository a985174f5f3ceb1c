use async_trait::async_trait;
use std::sync::Arc;
use tracing::info;

use crate::handlers::output::{OutputDir, extension_of, settle};
use crate::handlers::params::Params;
use crate::handlers::traits::{NodeError, NodeHandler};
use crate::handlers::types::{NodeKind, Outputs, output_path_outputs};
use crate::handlers::validate::{MediaKind, require_file};
use crate::handlers::run_blocking;
use crate::media::{Effect, ImageBackend};

/// Applies one of the [`Effect`]s to an image
pub struct EffectImageHandler {
    backend: Arc<dyn ImageBackend>,
    output: OutputDir,
}

impl EffectImageHandler {
    pub fn new(backend: Arc<dyn ImageBackend>, output: OutputDir) -> Self {
        Self { backend, output }
    }
}

#[async_trait]
impl NodeHandler for EffectImageHandler {
    fn kind(&self) -> NodeKind {
        NodeKind::EffectImage
    }

    async fn run(&self, params: Params<'_>) -> Result<Outputs, NodeError> {
        let image_path = params.required_string("image_path", "Image path")?;
        let effect: Effect = params
            .string_or("effect", "grayscale")?
            .parse()
            .map_err(NodeError::InvalidParameter)?;
        let intensity = params.f64_or("intensity", 1.0)? as f32;

        let input = require_file(&image_path, MediaKind::Image, "Input image")?;
        let output = self
            .output
            .allocate(&format!("effect_{effect}_"), &extension_of(&input));

        info!(path = %input.display(), %effect, intensity, "Applying image effect");

        let dst = output.clone();
        let result = run_blocking(&self.backend, move |backend| {
            backend.apply_effect(&input, &dst, effect, intensity)
        })
        .await;
        settle(result, &output, "apply effect").await?;

        info!(output = %output.display(), "Effect applied");
        Ok(output_path_outputs(&output))
    }
}
