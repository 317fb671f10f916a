//! Backend traits and the OpenAI-compatible HTTP implementation.

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use thiserror::Error;

use super::config::{AiConfig, ConfigError};
use super::types::{CompletionRequest, ImageRequest};

#[derive(Error, Debug)]
pub enum BackendError {
    #[error("API request failed: {0}")]
    RequestFailed(String),

    #[error("API returned error: {status} - {message}")]
    ApiError { status: u16, message: String },

    #[error("Rate limited, retry after {retry_after_secs:?} seconds")]
    RateLimited { retry_after_secs: Option<u64> },

    #[error("Failed to parse response: {0}")]
    ParseError(String),

    #[error("Backend not configured: {0}")]
    NotConfigured(#[from] ConfigError),
}

impl BackendError {
    /// Whether the call may succeed if simply tried again.
    ///
    /// Network failures, timeouts, rate limits and server-side errors are transient;
    /// client errors and unparseable payloads are not.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::RequestFailed(_) | Self::RateLimited { .. } => true,
            Self::ApiError { status, .. } => *status >= 500,
            Self::ParseError(_) | Self::NotConfigured(_) => false,
        }
    }
}

/// Text-generation backend.
///
/// Returns the backend-native payload untouched so it can be persisted as-is.
#[async_trait]
pub trait CompletionBackend: Send + Sync {
    async fn complete(&self, request: &CompletionRequest) -> Result<JsonValue, BackendError>;

    /// Backend name for logs and records (e.g. "openai", "fake").
    fn backend_name(&self) -> &'static str;
}

/// Image-generation backend. Returns the URLs of the generated assets.
#[async_trait]
pub trait ImageBackend: Send + Sync {
    async fn generate(&self, request: &ImageRequest) -> Result<Vec<String>, BackendError>;

    fn backend_name(&self) -> &'static str;
}

/// Client for an OpenAI-compatible API.
#[derive(Debug)]
pub struct OpenAiClient {
    api_key: String,
    base_url: String,
    client: reqwest::Client,
}

#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    message: String,
}

/// Error response from the API.
#[derive(Debug, Deserialize)]
struct ApiErrorResponse {
    error: ApiErrorBody,
}

#[derive(Debug, Deserialize)]
struct ImageResponse {
    data: Vec<ImageData>,
}

#[derive(Debug, Deserialize)]
struct ImageData {
    url: Option<String>,
}

impl OpenAiClient {
    /// Create a client from configuration. Requires an API key.
    pub fn new(config: &AiConfig) -> Result<Self, BackendError> {
        let api_key = config.api_key()?.to_string();

        let client = reqwest::Client::builder()
            .timeout(config.timeout())
            .build()
            .map_err(|e| BackendError::RequestFailed(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            api_key,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            client,
        })
    }

    async fn post_json<B, R>(&self, path: &str, body: &B) -> Result<R, BackendError>
    where
        B: Serialize + Sync,
        R: DeserializeOwned,
    {
        let url = format!("{}/{}", self.base_url, path);

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(body)
            .send()
            .await
            .map_err(|e| BackendError::RequestFailed(e.to_string()))?;

        let status = response.status().as_u16();

        if status == 429 {
            let retry_after = response
                .headers()
                .get("retry-after")
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.parse().ok());
            return Err(BackendError::RateLimited {
                retry_after_secs: retry_after,
            });
        }

        let text = response
            .text()
            .await
            .map_err(|e| BackendError::RequestFailed(e.to_string()))?;

        if !(200..300).contains(&status) {
            if let Ok(error_response) = serde_json::from_str::<ApiErrorResponse>(&text) {
                return Err(BackendError::ApiError {
                    status,
                    message: error_response.error.message,
                });
            }
            return Err(BackendError::ApiError {
                status,
                message: text,
            });
        }

        serde_json::from_str(&text).map_err(|e| BackendError::ParseError(e.to_string()))
    }
}

#[async_trait]
impl CompletionBackend for OpenAiClient {
    async fn complete(&self, request: &CompletionRequest) -> Result<JsonValue, BackendError> {
        tracing::debug!(
            model = %request.model,
            messages = request.messages.len(),
            "calling chat completions API"
        );
        self.post_json("chat/completions", request).await
    }

    fn backend_name(&self) -> &'static str {
        "openai"
    }
}

#[async_trait]
impl ImageBackend for OpenAiClient {
    async fn generate(&self, request: &ImageRequest) -> Result<Vec<String>, BackendError> {
        tracing::debug!(model = %request.model, size = %request.size, "calling image generation API");
        let response: ImageResponse = self.post_json("images/generations", request).await?;
        Ok(response.data.into_iter().filter_map(|d| d.url).collect())
    }

    fn backend_name(&self) -> &'static str {
        "openai"
    }
}
