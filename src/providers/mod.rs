//! Hosted model APIs: image captioning and text-to-image generation

pub mod gemini;
pub mod http;
pub mod openai;

use async_trait::async_trait;
use bytes::Bytes;
use std::path::Path;
use thiserror::Error;

pub use gemini::GeminiClient;
pub use http::{HttpClient, HttpConfig};
pub use openai::OpenAiClient;

#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("HTTP request failed: {0}")]
    RequestFailed(String),

    #[error("Connection timeout")]
    Timeout,

    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    #[error("API error (HTTP {status}): {body}")]
    Api { status: u16, body: String },

    #[error("Unexpected API response: {0}")]
    InvalidResponse(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Describes an image in natural language
#[async_trait]
pub trait CaptionService: Send + Sync {
    async fn caption(&self, image: &Path, api_key: &str) -> Result<String, ProviderError>;
}

/// A generated image and where the provider published it
#[derive(Debug, Clone)]
pub struct GeneratedImage {
    pub url: String,
    pub data: Bytes,
}

/// Produces an image from a text prompt
#[async_trait]
pub trait ImageGenerator: Send + Sync {
    async fn generate(
        &self,
        prompt: &str,
        size: &str,
        api_key: &str,
    ) -> Result<GeneratedImage, ProviderError>;
}
