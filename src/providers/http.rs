//! Shared HTTP client for the hosted model APIs

use bytes::Bytes;
use reqwest::Client;
use serde_json::Value;
use std::time::Duration;
use tracing::debug;

use super::ProviderError;

/// HTTP client configuration
#[derive(Debug, Clone)]
pub struct HttpConfig {
    pub connect_timeout: Duration,
    pub request_timeout: Duration,
    pub user_agent: String,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            connect_timeout: Duration::from_secs(10),
            request_timeout: Duration::from_secs(120),
            user_agent: concat!("medianode/", env!("CARGO_PKG_VERSION")).to_string(),
        }
    }
}

/// Thin wrapper over `reqwest` that turns transport and status failures into
/// [`ProviderError`]. Requests are not retried.
#[derive(Debug, Clone)]
pub struct HttpClient {
    client: Client,
}

impl HttpClient {
    pub fn new(config: &HttpConfig) -> Result<Self, ProviderError> {
        let client = Client::builder()
            .connect_timeout(config.connect_timeout)
            .timeout(config.request_timeout)
            .user_agent(&config.user_agent)
            .redirect(reqwest::redirect::Policy::limited(10))
            .build()
            .map_err(|e| ProviderError::RequestFailed(e.to_string()))?;

        Ok(Self { client })
    }

    /// POST a JSON body and parse the JSON response
    pub async fn post_json(
        &self,
        url: &str,
        headers: &[(&str, String)],
        body: &Value,
    ) -> Result<Value, ProviderError> {
        debug!(url, "POST");

        let mut request = self.client.post(url).json(body);
        for (name, value) in headers {
            request = request.header(*name, value);
        }

        let response = request.send().await.map_err(send_error)?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ProviderError::Api {
                status: status.as_u16(),
                body,
            });
        }

        response
            .json::<Value>()
            .await
            .map_err(|e| ProviderError::InvalidResponse(format!("body is not JSON: {e}")))
    }

    /// GET a resource body
    pub async fn download(&self, url: &str) -> Result<Bytes, ProviderError> {
        debug!(url, "Starting download");

        let response = self.client.get(url).send().await.map_err(send_error)?;
        let status = response.status();
        if !status.is_success() {
            return Err(ProviderError::RequestFailed(format!(
                "HTTP {}: {}",
                status.as_u16(),
                status.canonical_reason().unwrap_or("Unknown")
            )));
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| ProviderError::RequestFailed(format!("Failed to read body: {e}")))?;

        debug!(url, size = bytes.len(), "Download completed");
        Ok(bytes)
    }
}

fn send_error(e: reqwest::Error) -> ProviderError {
    if e.is_timeout() {
        ProviderError::Timeout
    } else if e.is_builder() {
        ProviderError::InvalidUrl(e.to_string())
    } else {
        ProviderError::RequestFailed(e.to_string())
    }
}
