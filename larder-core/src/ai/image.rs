//! Image generation: ask the backend for an image, download it, record where it went.

use std::fs;
use std::path::PathBuf;

use chrono::Utc;
use thiserror::Error;

use super::audit::{AuditLog, ImageRecord};
use super::client::{BackendError, ImageBackend, OpenAiClient};
use super::config::AiConfig;
use super::fake::{FakeBackend, FAKE_IMAGE_URL};
use super::types::ImageRequest;
use crate::http::{HttpClient, MockClient, ReqwestClient};
use crate::image::{fetch_and_validate_image, placeholder_png};

#[derive(Error, Debug)]
pub enum ImageError {
    #[error(transparent)]
    Backend(#[from] BackendError),

    #[error("Image backend returned no images")]
    NoImage,

    #[error("Failed to set up image download client: {0}")]
    Client(String),

    #[error("Failed to record image to {path}: {source}")]
    Persist {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Outcome of an image request.
#[derive(Debug, Clone, PartialEq)]
pub struct GeneratedImage {
    pub filename: String,
    pub url: String,
    /// Saved file, or `None` when the download failed.
    pub path: Option<PathBuf>,
}

impl GeneratedImage {
    pub fn downloaded(&self) -> bool {
        self.path.is_some()
    }
}

pub struct ImageDispatcher {
    backend: Box<dyn ImageBackend>,
    http: Box<dyn HttpClient>,
    model: String,
    size: String,
    image_dir: PathBuf,
    log: AuditLog,
}

impl ImageDispatcher {
    pub fn new(
        backend: Box<dyn ImageBackend>,
        http: Box<dyn HttpClient>,
        config: &AiConfig,
        image_dir: impl Into<PathBuf>,
        log: AuditLog,
    ) -> Self {
        Self {
            backend,
            http,
            model: config.image_model.clone(),
            size: config.image_size.clone(),
            image_dir: image_dir.into(),
            log,
        }
    }

    /// Fake mode serves a placeholder PNG for the canned URL so no network is touched.
    pub fn from_config(
        config: &AiConfig,
        image_dir: impl Into<PathBuf>,
        log: AuditLog,
    ) -> Result<Self, ImageError> {
        let (backend, http): (Box<dyn ImageBackend>, Box<dyn HttpClient>) = if config.fake {
            let placeholder = placeholder_png().map_err(ImageError::Client)?;
            (
                Box::new(FakeBackend::default()),
                Box::new(MockClient::new().with_bytes(FAKE_IMAGE_URL, placeholder)),
            )
        } else {
            let http = ReqwestClient::new(config.timeout())
                .map_err(|e| ImageError::Client(e.to_string()))?;
            (Box::new(OpenAiClient::new(config)?), Box::new(http))
        };
        Ok(Self::new(backend, http, config, image_dir, log))
    }

    /// Generate one image for `prompt` and download it.
    ///
    /// Backend failures are errors. A failed download is not: it is logged and
    /// reported through `GeneratedImage::path` being `None`.
    pub async fn dispatch(&self, prompt: &str) -> Result<GeneratedImage, ImageError> {
        let request = ImageRequest {
            model: self.model.clone(),
            prompt: prompt.to_string(),
            n: 1,
            size: self.size.clone(),
        };

        let urls = self.backend.generate(&request).await?;
        let url = urls.into_iter().next().ok_or(ImageError::NoImage)?;
        tracing::info!(backend = self.backend.backend_name(), url = %url, "image generated");

        let stem = format!("recipe_{}", Utc::now().format("%Y%m%d_%H%M%S_%3f"));
        let (filename, path) = match self.download(&url, &stem).await {
            Ok((filename, path)) => (filename, Some(path)),
            Err(e) => {
                tracing::warn!(url = %url, error = %e, "failed to download image");
                (format!("{}.png", stem), None)
            }
        };

        let record = ImageRecord {
            prompt: prompt.to_string(),
            url: url.clone(),
            filename: filename.clone(),
            path: path.clone(),
        };
        self.log
            .append(&record)
            .map_err(|source| ImageError::Persist {
                path: self.log.path().to_path_buf(),
                source,
            })?;

        Ok(GeneratedImage {
            filename,
            url,
            path,
        })
    }

    async fn download(&self, url: &str, stem: &str) -> Result<(String, PathBuf), String> {
        let fetched = fetch_and_validate_image(self.http.as_ref(), url).await?;

        fs::create_dir_all(&self.image_dir)
            .map_err(|e| format!("Failed to create {}: {}", self.image_dir.display(), e))?;

        let filename = format!("{}.{}", stem, fetched.extension);
        let path = self.image_dir.join(&filename);
        fs::write(&path, &fetched.data)
            .map_err(|e| format!("Failed to write {}: {}", path.display(), e))?;

        tracing::debug!(
            path = %path.display(),
            content_type = %fetched.content_type,
            bytes = fetched.data.len(),
            "image saved"
        );
        Ok((filename, path))
    }
}
