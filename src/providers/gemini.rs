//! Image captioning through the Gemini `generateContent` endpoint

use async_trait::async_trait;
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use mime::Mime;
use serde_json::{Value, json};
use std::path::Path;
use tracing::info;

use super::http::HttpClient;
use super::{CaptionService, ProviderError};

pub const CAPTION_PROMPT: &str = "Describe this image in one detailed, descriptive caption.";

#[derive(Debug, Clone)]
pub struct GeminiClient {
    http: HttpClient,
    endpoint: String,
    model: String,
}

impl GeminiClient {
    pub fn new(http: HttpClient, endpoint: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            http,
            endpoint: endpoint.into(),
            model: model.into(),
        }
    }

    fn url(&self) -> String {
        format!(
            "{}/v1beta/models/{}:generateContent",
            self.endpoint.trim_end_matches('/'),
            self.model
        )
    }
}

/// MIME type sent along with the inline image data
pub fn image_mime(path: &Path) -> Mime {
    let ext = path
        .extension()
        .map(|e| e.to_string_lossy().to_ascii_lowercase())
        .unwrap_or_default();

    match ext.as_str() {
        "png" => mime::IMAGE_PNG,
        "gif" => mime::IMAGE_GIF,
        "bmp" => mime::IMAGE_BMP,
        "tif" | "tiff" => "image/tiff".parse().unwrap_or(mime::IMAGE_STAR),
        _ => mime::IMAGE_JPEG,
    }
}

fn request_body(mime: &Mime, data: &[u8]) -> Value {
    json!({
        "contents": [{
            "parts": [
                {"text": CAPTION_PROMPT},
                {"inline_data": {"mime_type": mime.essence_str(), "data": STANDARD.encode(data)}}
            ]
        }]
    })
}

/// First text part of the first candidate
fn extract_caption(response: &Value) -> Result<String, ProviderError> {
    let text = response
        .pointer("/candidates/0/content/parts/0/text")
        .and_then(Value::as_str)
        .ok_or_else(|| {
            ProviderError::InvalidResponse("response carries no candidate text".to_string())
        })?
        .trim();

    if text.is_empty() {
        return Err(ProviderError::InvalidResponse(
            "model returned an empty caption".to_string(),
        ));
    }
    Ok(text.to_string())
}

#[async_trait]
impl CaptionService for GeminiClient {
    async fn caption(&self, image: &Path, api_key: &str) -> Result<String, ProviderError> {
        let data = tokio::fs::read(image).await?;
        let mime = image_mime(image);
        info!(model = %self.model, bytes = data.len(), "Requesting caption");

        let response = self
            .http
            .post_json(
                &self.url(),
                &[("x-goog-api-key", api_key.to_string())],
                &request_body(&mime, &data),
            )
            .await?;

        extract_caption(&response)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::providers::HttpConfig;
    use axum::extract::Path as UrlPath;
    use axum::http::{HeaderMap, StatusCode};
    use axum::{Json, Router, routing::post};
    use tempfile::TempDir;

    async fn serve(router: Router) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });
        format!("http://{addr}")
    }

    #[test]
    fn test_image_mime() {
        assert_eq!(image_mime(Path::new("a.PNG")), mime::IMAGE_PNG);
        assert_eq!(image_mime(Path::new("a.jpeg")), mime::IMAGE_JPEG);
        assert_eq!(image_mime(Path::new("a.tiff")).essence_str(), "image/tiff");
    }

    #[test]
    fn test_request_body_shape() {
        let body = request_body(&mime::IMAGE_PNG, b"abc");
        assert_eq!(body["contents"][0]["parts"][0]["text"], CAPTION_PROMPT);
        assert_eq!(
            body["contents"][0]["parts"][1]["inline_data"]["mime_type"],
            "image/png"
        );
        assert_eq!(body["contents"][0]["parts"][1]["inline_data"]["data"], "YWJj");
    }

    #[test]
    fn test_extract_caption() {
        let ok = json!({"candidates": [{"content": {"parts": [{"text": " A cat. "}]}}]});
        assert_eq!(extract_caption(&ok).unwrap(), "A cat.");

        let empty = json!({"candidates": [{"content": {"parts": [{"text": "  "}]}}]});
        assert!(extract_caption(&empty).is_err());
        assert!(extract_caption(&json!({})).is_err());
    }

    #[tokio::test]
    async fn test_caption_against_local_server() {
        let router = Router::new().route(
            "/v1beta/models/{call}",
            post(
                |UrlPath(call): UrlPath<String>, headers: HeaderMap, Json(body): Json<Value>| async move {
                    let key = headers
                        .get("x-goog-api-key")
                        .and_then(|v| v.to_str().ok())
                        .unwrap_or_default()
                        .to_string();
                    if key != "test-key" || call != "test-model:generateContent" {
                        return (StatusCode::FORBIDDEN, Json(json!({"error": "denied"})));
                    }
                    let mime = body["contents"][0]["parts"][1]["inline_data"]["mime_type"].clone();
                    (
                        StatusCode::OK,
                        Json(json!({"candidates": [{"content": {"parts": [{"text": format!("caption for {}", mime.as_str().unwrap_or("?"))}]}}]})),
                    )
                },
            ),
        );
        let base = serve(router).await;

        let temp = TempDir::new().unwrap();
        let image = temp.path().join("photo.png");
        std::fs::write(&image, b"fake image").unwrap();

        let http = HttpClient::new(&HttpConfig::default()).unwrap();
        let client = GeminiClient::new(http, base, "test-model");

        let caption = client.caption(&image, "test-key").await.unwrap();
        assert_eq!(caption, "caption for image/png");

        let err = client.caption(&image, "wrong-key").await.unwrap_err();
        assert!(matches!(err, ProviderError::Api { status: 403, .. }));
    }
}
