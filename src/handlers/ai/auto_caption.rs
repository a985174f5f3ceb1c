use async_trait::async_trait;
use serde_json::Value;
use std::sync::Arc;
use tracing::info;

use super::resolve_api_key;
use crate::handlers::params::Params;
use crate::handlers::traits::{NodeError, NodeHandler};
use crate::handlers::types::{NodeKind, Outputs};
use crate::handlers::validate::{MediaKind, require_file};
use crate::providers::CaptionService;

/// Describes an image with a multimodal model; produces no file
pub struct AutoCaptionHandler {
    service: Arc<dyn CaptionService>,
    api_key: Option<String>,
}

impl AutoCaptionHandler {
    pub fn new(service: Arc<dyn CaptionService>, api_key: Option<String>) -> Self {
        Self { service, api_key }
    }
}

#[async_trait]
impl NodeHandler for AutoCaptionHandler {
    fn kind(&self) -> NodeKind {
        NodeKind::AutoCaptionImage
    }

    async fn run(&self, params: Params<'_>) -> Result<Outputs, NodeError> {
        let image_path = params.required_string("image_path", "Image path")?;
        let input = require_file(&image_path, MediaKind::Image, "Input image")?;
        let api_key = resolve_api_key(&params, self.api_key.as_deref(), "GEMINI_API_KEY")?;

        info!(path = %input.display(), "Captioning image");
        let caption = self.service.caption(&input, &api_key).await?;
        info!(chars = caption.len(), "Caption generated");

        let mut outputs = Outputs::new();
        outputs.insert("caption".to_string(), Value::String(caption));
        Ok(outputs)
    }
}
