use async_trait::async_trait;
use serde_json::Value;
use std::sync::Arc;
use tracing::{info, warn};

use super::resolve_api_key;
use crate::handlers::output::{OutputDir, settle};
use crate::handlers::params::Params;
use crate::handlers::traits::{NodeError, NodeHandler};
use crate::handlers::types::{NodeKind, Outputs, output_path_outputs};
use crate::providers::ImageGenerator;

/// Text-to-image generation; the downloaded image is stored as PNG
pub struct GenerateImageHandler {
    generator: Arc<dyn ImageGenerator>,
    output: OutputDir,
    api_key: Option<String>,
    default_size: String,
}

impl GenerateImageHandler {
    pub fn new(
        generator: Arc<dyn ImageGenerator>,
        output: OutputDir,
        api_key: Option<String>,
        default_size: impl Into<String>,
    ) -> Self {
        Self {
            generator,
            output,
            api_key,
            default_size: default_size.into(),
        }
    }
}

/// `WIDTHxHEIGHT` with both sides positive
pub fn is_image_size(size: &str) -> bool {
    match size.split_once('x') {
        Some((w, h)) => {
            matches!(w.parse::<u32>(), Ok(w) if w > 0) && matches!(h.parse::<u32>(), Ok(h) if h > 0)
        }
        None => false,
    }
}

#[async_trait]
impl NodeHandler for GenerateImageHandler {
    fn kind(&self) -> NodeKind {
        NodeKind::GenerateImage
    }

    async fn run(&self, params: Params<'_>) -> Result<Outputs, NodeError> {
        let prompt = params.required_string("prompt", "Prompt")?;
        let size = params.string_or("size", &self.default_size)?;
        if !is_image_size(&size) {
            return Err(NodeError::InvalidParameter(format!(
                "size must look like 1024x1024, got '{size}'"
            )));
        }
        let api_key = resolve_api_key(&params, self.api_key.as_deref(), "OPENAI_API_KEY")?;

        info!(%size, prompt_chars = prompt.len(), "Generating image");
        let image = self.generator.generate(&prompt, &size, &api_key).await?;

        let output = self.output.allocate("gen_", ".png");
        let written = tokio::fs::write(&output, &image.data).await.map_err(|e| {
            warn!(output = %output.display(), error = %e, "Failed to store generated image");
            NodeError::WriteFailure(format!("Failed to save generated image: {e}"))
        });
        settle(written, &output, "save generated image").await?;

        let mut outputs = output_path_outputs(&output);
        outputs.insert("image_url".to_string(), Value::String(image.url));
        Ok(outputs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handlers::testing::RecordingGenerator;
    use crate::handlers::traits::ErrorKind;
    use serde_json::json;
    use tempfile::TempDir;

    #[test]
    fn test_image_size() {
        assert!(is_image_size("1024x1024"));
        assert!(is_image_size("256x512"));
        assert!(!is_image_size("1024"));
        assert!(!is_image_size("0x10"));
        assert!(!is_image_size("axb"));
    }

    #[tokio::test]
    async fn test_generated_image_written() {
        let temp = TempDir::new().unwrap();
        let generator = Arc::new(RecordingGenerator::default());
        let handler = GenerateImageHandler::new(
            generator.clone(),
            OutputDir::new(temp.path()),
            None,
            "1024x1024",
        );

        let inputs = json!({"prompt": "a lighthouse", "api_key": "sk-1"}).as_object().cloned().unwrap();
        let outputs = handler.run(Params::new(&inputs, &Default::default())).await.unwrap();

        let path = outputs["output_path"].as_str().unwrap();
        assert!(path.contains("gen_") && path.ends_with(".png"));
        assert_eq!(std::fs::read(path).unwrap(), b"PNG");
        assert_eq!(outputs["image_url"], "https://images.test/1.png");
        assert_eq!(generator.sizes(), vec!["1024x1024".to_string()]);
    }

    #[tokio::test]
    async fn test_prompt_and_size_checked_first() {
        let temp = TempDir::new().unwrap();
        let generator = Arc::new(RecordingGenerator::default());
        let handler = GenerateImageHandler::new(
            generator.clone(),
            OutputDir::new(temp.path()),
            Some("sk".to_string()),
            "1024x1024",
        );

        let err = handler
            .run(Params::new(&Default::default(), &Default::default()))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::MissingInput);

        let inputs = json!({"prompt": "x", "size": "huge"}).as_object().cloned().unwrap();
        let err = handler.run(Params::new(&inputs, &Default::default())).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidParameter);

        assert!(generator.sizes().is_empty());
    }
}
