use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;
use thiserror::Error;
use tracing::{info, warn};

use super::ai::{AutoCaptionHandler, GenerateImageHandler, RemoveObjectHandler};
use super::image::{
    EffectImageHandler, LogoOverlayHandler, RemoveBgHandler, ResizeImageHandler,
    TextOverlayHandler,
};
use super::output::OutputDir;
use super::params::Params;
use super::traits::{NodeError, NodeHandler};
use super::types::{Envelope, NodeKind, ValueMap};
use super::video::{AddBgmHandler, MergeHandler, TrimHandler, WatermarkHandler};
use crate::config::Config;
use crate::media::{
    CliModelRuntime, EncodeSettings, FfmpegEngine, FontLibrary, ImageBackend, ModelBackend,
    RasterEngine, VideoBackend,
};
use crate::observability::Metrics;
use crate::providers::{
    CaptionService, GeminiClient, HttpClient, ImageGenerator, OpenAiClient, ProviderError,
};

#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("Unknown node: {0}")]
    UnknownNode(String),

    #[error("Failed to prepare output directory {path}: {source}")]
    OutputDir {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to build HTTP client: {0}")]
    Http(#[from] ProviderError),
}

/// Delegates shared by all handlers
#[derive(Clone)]
pub struct Backends {
    pub images: Arc<dyn ImageBackend>,
    pub video: Arc<dyn VideoBackend>,
    pub models: Arc<dyn ModelBackend>,
    pub captions: Arc<dyn CaptionService>,
    pub generator: Arc<dyn ImageGenerator>,
}

/// Per-node settings that come from configuration rather than call params
#[derive(Debug, Clone)]
pub struct NodeSettings {
    pub encode: EncodeSettings,
    pub watermark_encode: EncodeSettings,
    pub gemini_api_key: Option<String>,
    pub openai_api_key: Option<String>,
    pub image_size: String,
    pub max_pixels: u64,
}

impl Default for NodeSettings {
    fn default() -> Self {
        Self {
            encode: EncodeSettings::default(),
            watermark_encode: EncodeSettings {
                threads: 4,
                video_bitrate: Some("2000k".to_string()),
                audio_bitrate: Some("192k".to_string()),
                ..EncodeSettings::default()
            },
            gemini_api_key: None,
            openai_api_key: None,
            image_size: "1024x1024".to_string(),
            max_pixels: 100_000_000,
        }
    }
}

/// Registry mapping node names to handler instances
#[derive(Clone)]
pub struct NodeRegistry {
    handlers: BTreeMap<NodeKind, Arc<dyn NodeHandler>>,
    metrics: Arc<Metrics>,
}

impl NodeRegistry {
    pub fn new() -> Self {
        Self {
            handlers: BTreeMap::new(),
            metrics: Arc::new(Metrics::new()),
        }
    }

    pub fn register(&mut self, handler: Arc<dyn NodeHandler>) {
        self.handlers.insert(handler.kind(), handler);
    }

    /// All twelve nodes wired to the given delegates
    pub fn with_backends(output: OutputDir, backends: Backends, settings: NodeSettings) -> Self {
        let Backends {
            images,
            video,
            models,
            captions,
            generator,
        } = backends;
        let mut registry = Self::new();

        registry.register(Arc::new(EffectImageHandler::new(images.clone(), output.clone())));
        registry.register(Arc::new(ResizeImageHandler::new(
            images.clone(),
            output.clone(),
            settings.max_pixels,
        )));
        registry.register(Arc::new(LogoOverlayHandler::new(images.clone(), output.clone())));
        registry.register(Arc::new(TextOverlayHandler::new(images.clone(), output.clone())));
        registry.register(Arc::new(RemoveBgHandler::new(models.clone(), output.clone())));
        registry.register(Arc::new(RemoveObjectHandler::new(
            images.clone(),
            models,
            output.clone(),
        )));
        registry.register(Arc::new(AutoCaptionHandler::new(
            captions,
            settings.gemini_api_key,
        )));
        registry.register(Arc::new(GenerateImageHandler::new(
            generator,
            output.clone(),
            settings.openai_api_key,
            settings.image_size,
        )));
        registry.register(Arc::new(AddBgmHandler::new(
            video.clone(),
            output.clone(),
            settings.encode.clone(),
        )));
        registry.register(Arc::new(MergeHandler::new(
            video.clone(),
            output.clone(),
            settings.encode.clone(),
        )));
        registry.register(Arc::new(TrimHandler::new(
            video.clone(),
            output.clone(),
            settings.encode,
        )));
        registry.register(Arc::new(WatermarkHandler::new(
            images,
            video,
            output,
            settings.watermark_encode,
        )));

        registry
    }

    /// Production registry: creates the output directory and wires the real
    /// delegates from configuration.
    pub fn from_config(config: &Config) -> Result<Self, RegistryError> {
        let output = OutputDir::new(&config.output.dir);
        output.ensure().map_err(|source| RegistryError::OutputDir {
            path: config.output.dir.clone(),
            source,
        })?;

        let http = HttpClient::new(&config.http.client_config())?;
        let fonts = FontLibrary::new(&config.fonts.dir, &config.fonts.default_font);

        let backends = Backends {
            images: Arc::new(RasterEngine::new(fonts, config.output.max_pixels)),
            video: Arc::new(FfmpegEngine::new(&config.video.ffmpeg, &config.video.ffprobe)),
            models: Arc::new(CliModelRuntime::new(
                &config.models.rembg,
                &config.models.iopaint,
                &config.models.inpaint_model,
                &config.models.device,
            )),
            captions: Arc::new(GeminiClient::new(
                http.clone(),
                &config.providers.gemini.endpoint,
                &config.providers.gemini.model,
            )),
            generator: Arc::new(OpenAiClient::new(
                http,
                &config.providers.openai.endpoint,
                &config.providers.openai.model,
            )),
        };

        let settings = NodeSettings {
            encode: config.video.encode_settings(),
            watermark_encode: config.video.watermark_encode_settings(),
            gemini_api_key: config.providers.gemini.api_key.clone(),
            openai_api_key: config.providers.openai.api_key.clone(),
            image_size: config.providers.openai.size.clone(),
            max_pixels: config.output.max_pixels,
        };

        info!(output_dir = %config.output.dir.display(), "Node registry ready");
        Ok(Self::with_backends(output, backends, settings))
    }

    pub fn get(&self, name: &str) -> Result<Arc<dyn NodeHandler>, RegistryError> {
        name.parse::<NodeKind>()
            .ok()
            .and_then(|kind| self.handlers.get(&kind))
            .cloned()
            .ok_or_else(|| RegistryError::UnknownNode(name.to_string()))
    }

    pub fn has_node(&self, name: &str) -> bool {
        self.get(name).is_ok()
    }

    pub fn kinds(&self) -> impl Iterator<Item = NodeKind> + '_ {
        self.handlers.keys().copied()
    }

    pub fn metrics(&self) -> Arc<Metrics> {
        Arc::clone(&self.metrics)
    }

    /// Run node `name`. Never fails: unknown nodes, handler errors and
    /// panics all come back as an error envelope.
    pub async fn process(&self, name: &str, inputs: ValueMap, config: ValueMap) -> Envelope {
        let handler = match self.get(name) {
            Ok(handler) => handler,
            Err(e) => {
                warn!(node = name, "Unknown node requested");
                self.metrics.node_rejected();
                return Envelope::error(e.to_string());
            }
        };

        let kind = handler.kind();
        self.metrics.node_called();
        let started = Instant::now();

        let result = match tokio::spawn(async move {
            handler.run(Params::new(&inputs, &config)).await
        })
        .await
        {
            Ok(result) => result,
            Err(join_error) => Err(NodeError::from(join_error)),
        };

        let elapsed_ms = started.elapsed().as_millis() as u64;
        match &result {
            Ok(_) => {
                self.metrics.node_succeeded();
                info!(node = %kind, elapsed_ms, "Node completed");
            }
            Err(e) => {
                self.metrics.node_failed();
                warn!(node = %kind, error_kind = ?e.kind(), error = %e, elapsed_ms, "Node failed");
            }
        }

        Envelope::from_result(result)
    }
}

impl Default for NodeRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handlers::testing::{
        RecordingCaptions, RecordingGenerator, RecordingImage, RecordingModels, RecordingVideo,
        touch,
    };
    use crate::handlers::types::Outputs;
    use async_trait::async_trait;
    use serde_json::json;
    use tempfile::TempDir;

    fn registry(dir: &std::path::Path) -> NodeRegistry {
        let backends = Backends {
            images: Arc::new(RecordingImage::default()),
            video: Arc::new(RecordingVideo::with_duration(4.0)),
            models: Arc::new(RecordingModels::default()),
            captions: Arc::new(RecordingCaptions::default()),
            generator: Arc::new(RecordingGenerator::default()),
        };
        NodeRegistry::with_backends(OutputDir::new(dir), backends, NodeSettings::default())
    }

    struct PanickingHandler;

    #[async_trait]
    impl NodeHandler for PanickingHandler {
        fn kind(&self) -> NodeKind {
            NodeKind::Trim
        }

        async fn run(&self, _: Params<'_>) -> Result<Outputs, NodeError> {
            panic!("boom");
        }
    }

    #[test]
    fn test_all_nodes_registered() {
        let temp = TempDir::new().unwrap();
        let registry = registry(temp.path());

        assert_eq!(registry.kinds().count(), NodeKind::ALL.len());
        for kind in NodeKind::ALL {
            assert!(registry.has_node(kind.as_str()), "{kind} missing");
        }
    }

    #[tokio::test]
    async fn test_unknown_node_envelope() {
        let temp = TempDir::new().unwrap();
        let registry = registry(temp.path());

        let envelope = registry
            .process("sharpen_image", ValueMap::new(), ValueMap::new())
            .await;
        assert_eq!(envelope.error_message(), Some("Unknown node: sharpen_image"));
        assert_eq!(registry.metrics().snapshot().rejected, 1);
    }

    #[tokio::test]
    async fn test_process_success_and_failure_counted() {
        let temp = TempDir::new().unwrap();
        let registry = registry(temp.path());
        let image = touch(temp.path(), "in.png");

        let inputs = json!({"image_path": image}).as_object().cloned().unwrap();
        let ok = registry.process("effect_image", inputs, ValueMap::new()).await;
        assert!(ok.is_success());
        assert!(ok.output_path().unwrap().contains("effect_grayscale_"));

        let inputs = json!({"image_path": "/nonexistent/in.png"}).as_object().cloned().unwrap();
        let err = registry.process("effect_image", inputs, ValueMap::new()).await;
        assert_eq!(
            err.error_message(),
            Some("Input image not found: /nonexistent/in.png")
        );

        let snapshot = registry.metrics().snapshot();
        assert_eq!((snapshot.calls, snapshot.succeeded, snapshot.failed), (2, 1, 1));
    }

    #[tokio::test]
    async fn test_panic_becomes_error_envelope() {
        let mut registry = NodeRegistry::new();
        registry.register(Arc::new(PanickingHandler));

        let envelope = registry.process("trim", ValueMap::new(), ValueMap::new()).await;
        assert_eq!(envelope.error_message(), Some("node task panicked"));

        // Registry stays usable
        let again = registry.process("trim", ValueMap::new(), ValueMap::new()).await;
        assert!(!again.is_success());
    }
}
