//! Text-to-image generation through the OpenAI images API

use async_trait::async_trait;
use serde_json::{Value, json};
use tracing::info;

use super::http::HttpClient;
use super::{GeneratedImage, ImageGenerator, ProviderError};

#[derive(Debug, Clone)]
pub struct OpenAiClient {
    http: HttpClient,
    endpoint: String,
    model: String,
}

impl OpenAiClient {
    pub fn new(http: HttpClient, endpoint: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            http,
            endpoint: endpoint.into(),
            model: model.into(),
        }
    }

    fn url(&self) -> String {
        format!(
            "{}/v1/images/generations",
            self.endpoint.trim_end_matches('/')
        )
    }

    fn request_body(&self, prompt: &str, size: &str) -> Value {
        json!({
            "model": self.model,
            "prompt": prompt,
            "n": 1,
            "size": size,
        })
    }
}

fn extract_url(response: &Value) -> Result<String, ProviderError> {
    response
        .pointer("/data/0/url")
        .and_then(Value::as_str)
        .filter(|url| !url.is_empty())
        .map(str::to_string)
        .ok_or_else(|| ProviderError::InvalidResponse("response carries no image URL".to_string()))
}

#[async_trait]
impl ImageGenerator for OpenAiClient {
    async fn generate(
        &self,
        prompt: &str,
        size: &str,
        api_key: &str,
    ) -> Result<GeneratedImage, ProviderError> {
        info!(model = %self.model, size, "Requesting image generation");

        let response = self
            .http
            .post_json(
                &self.url(),
                &[("authorization", format!("Bearer {api_key}"))],
                &self.request_body(prompt, size),
            )
            .await?;

        let url = extract_url(&response)?;
        let data = self.http.download(&url).await?;
        Ok(GeneratedImage { url, data })
    }
}
