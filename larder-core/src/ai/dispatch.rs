//! Request dispatch: audit, call the backend with bounded retries, audit again.

use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;
use tracing::{info_span, Instrument};

use super::audit::{AuditLog, RequestRecord, ResponseRecord};
use super::client::{BackendError, CompletionBackend, OpenAiClient};
use super::config::AiConfig;
use super::fake::FakeBackend;
use super::retry::RetryPolicy;
use super::types::{ChatMessage, CompletionRequest, GenerationParams};

#[derive(Error, Debug)]
pub enum DispatchError {
    #[error("Refusing to dispatch an empty message sequence")]
    EmptyMessages,

    #[error("Failed to persist {what} to {path}: {source}")]
    Persist {
        what: &'static str,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    Backend(#[from] BackendError),

    #[error("Giving up after {attempts} attempts: {last}")]
    RetriesExhausted {
        attempts: u32,
        #[source]
        last: BackendError,
    },
}

/// Receives notice of each retry. Purely informational.
pub trait DispatchProgress: Send + Sync {
    fn on_retry(&self, attempt: u32, max_attempts: u32, delay: Duration, error: &BackendError);
}

/// Reports retries through the log.
#[derive(Debug, Default)]
pub struct LogProgress;

impl DispatchProgress for LogProgress {
    fn on_retry(&self, attempt: u32, max_attempts: u32, delay: Duration, error: &BackendError) {
        tracing::warn!(
            attempt,
            max_attempts,
            delay_ms = delay.as_millis() as u64,
            error = %error,
            "backend call failed, retrying"
        );
    }
}

/// Sends message sequences to a text backend and records both sides of the exchange.
pub struct RequestDispatcher {
    backend: Box<dyn CompletionBackend>,
    model: String,
    params: GenerationParams,
    retry: RetryPolicy,
    requests: AuditLog,
    responses: AuditLog,
    progress: Box<dyn DispatchProgress>,
}

impl RequestDispatcher {
    pub fn new(
        backend: Box<dyn CompletionBackend>,
        config: &AiConfig,
        requests: AuditLog,
        responses: AuditLog,
    ) -> Self {
        Self {
            backend,
            model: config.model.clone(),
            params: config.params.clone(),
            retry: config.retry_policy(),
            requests,
            responses,
            progress: Box::new(LogProgress),
        }
    }

    /// Build a dispatcher for the configured backend: canned responses in fake mode,
    /// the HTTP API otherwise.
    pub fn from_config(
        config: &AiConfig,
        requests: AuditLog,
        responses: AuditLog,
    ) -> Result<Self, BackendError> {
        let backend: Box<dyn CompletionBackend> = if config.fake {
            Box::new(FakeBackend::default())
        } else {
            Box::new(OpenAiClient::new(config)?)
        };
        Ok(Self::new(backend, config, requests, responses))
    }

    pub fn with_progress(mut self, progress: Box<dyn DispatchProgress>) -> Self {
        self.progress = progress;
        self
    }

    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn backend_name(&self) -> &'static str {
        self.backend.backend_name()
    }

    /// Dispatch a message sequence.
    ///
    /// The request is persisted before the first attempt and the response before it
    /// is returned. Transient failures are retried per the retry policy.
    pub async fn dispatch(&self, messages: &[ChatMessage]) -> Result<ResponseRecord, DispatchError> {
        if messages.is_empty() {
            return Err(DispatchError::EmptyMessages);
        }

        let span = info_span!(
            "dispatch",
            backend = self.backend.backend_name(),
            model = %self.model
        );
        self.dispatch_inner(messages).instrument(span).await
    }

    async fn dispatch_inner(&self, messages: &[ChatMessage]) -> Result<ResponseRecord, DispatchError> {
        let request = CompletionRequest {
            model: self.model.clone(),
            messages: messages.to_vec(),
            params: self.params.clone(),
        };

        let request_record = RequestRecord {
            backend: self.backend.backend_name().to_string(),
            request,
        };
        self.requests
            .append(&request_record)
            .map_err(|source| DispatchError::Persist {
                what: "request",
                path: self.requests.path().to_path_buf(),
                source,
            })?;

        let request = &request_record.request;
        let mut attempt = 1;
        let payload = loop {
            tracing::debug!(attempt, "sending request");
            match self.backend.complete(request).await {
                Ok(payload) => break payload,
                Err(error) if !error.is_transient() => {
                    tracing::error!(attempt, error = %error, "backend call failed permanently");
                    return Err(DispatchError::Backend(error));
                }
                Err(error) if !self.retry.allows_retry(attempt) => {
                    tracing::error!(attempt, error = %error, "retries exhausted");
                    return Err(DispatchError::RetriesExhausted {
                        attempts: attempt,
                        last: error,
                    });
                }
                Err(error) => {
                    let delay = match &error {
                        BackendError::RateLimited {
                            retry_after_secs: Some(secs),
                        } => Duration::from_secs(*secs).min(self.retry.max_delay),
                        _ => self.retry.delay_after(attempt),
                    };
                    self.progress
                        .on_retry(attempt, self.retry.max_attempts, delay, &error);
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
            }
        };

        let record = ResponseRecord {
            backend: self.backend.backend_name().to_string(),
            model: self.model.clone(),
            attempts: attempt,
            payload,
        };
        self.responses
            .append(&record)
            .map_err(|source| DispatchError::Persist {
                what: "response",
                path: self.responses.path().to_path_buf(),
                source,
            })?;

        let usage = record.usage().unwrap_or_default();
        tracing::info!(
            attempts = attempt,
            prompt_tokens = usage.prompt_tokens,
            completion_tokens = usage.completion_tokens,
            "response received"
        );
        Ok(record)
    }
}
