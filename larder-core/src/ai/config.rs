//! AI configuration from environment variables.

use std::env;
use std::fmt::Display;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use serde::Deserialize;
use thiserror::Error;

use super::retry::RetryPolicy;
use super::types::GenerationParams;

/// Default OpenAI-compatible base URL.
pub const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";

/// Default text model.
pub const DEFAULT_MODEL: &str = "gpt-4o-mini";

/// Default image model and size.
pub const DEFAULT_IMAGE_MODEL: &str = "dall-e-3";
pub const DEFAULT_IMAGE_SIZE: &str = "1024x1024";

/// Default secrets file, relative to the working directory.
pub const DEFAULT_SECRETS_FILE: &str = "secrets.json";

pub const DEFAULT_MAX_ATTEMPTS: u32 = 4;
pub const DEFAULT_RETRY_DELAY_MS: u64 = 500;
pub const DEFAULT_TIMEOUT_SECS: u64 = 120;

/// Text models the pipeline accepts.
pub const SUPPORTED_MODELS: &[&str] = &[
    "gpt-4o-mini",
    "gpt-4o",
    "gpt-4.1",
    "gpt-4.1-mini",
    "gpt-4.1-nano",
    "gpt-4-turbo",
    "gpt-4",
    "gpt-3.5-turbo",
];

/// Image models that return hosted URLs.
pub const SUPPORTED_IMAGE_MODELS: &[&str] = &["dall-e-2", "dall-e-3"];

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("No API key: set OPENAI_API_KEY, add RecipeManager.OPENAI_KEY to the secrets file, or enable fake mode")]
    MissingApiKey,

    #[error("Unsupported model '{model}'. Supported: {supported}")]
    InvalidModel { model: String, supported: String },

    #[error("Unsupported image model '{model}'. Supported: {supported}")]
    InvalidImageModel { model: String, supported: String },

    #[error("Invalid value '{value}' for {name}: {reason}")]
    InvalidValue {
        name: String,
        value: String,
        reason: String,
    },

    #[error("Failed to read secrets file {path}: {reason}")]
    Secrets { path: PathBuf, reason: String },
}

/// AI backend configuration.
#[derive(Debug, Clone)]
pub struct AiConfig {
    /// API key; only required outside fake mode.
    pub api_key: Option<String>,
    /// Text model name (e.g. "gpt-4o-mini").
    pub model: String,
    /// Base URL for the API.
    pub base_url: String,
    pub image_model: String,
    /// Image size, e.g. "1024x1024".
    pub image_size: String,
    /// Generation parameters forwarded with every text request.
    pub params: GenerationParams,
    /// Return canned responses instead of calling the backend.
    pub fake: bool,
    /// Total attempts per request, including the first.
    pub max_attempts: u32,
    /// Delay before the first retry; doubles on each further retry.
    pub retry_delay_ms: u64,
    /// Per-request timeout in seconds.
    pub timeout_secs: u64,
}

impl Default for AiConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            model: DEFAULT_MODEL.to_string(),
            base_url: DEFAULT_BASE_URL.to_string(),
            image_model: DEFAULT_IMAGE_MODEL.to_string(),
            image_size: DEFAULT_IMAGE_SIZE.to_string(),
            params: GenerationParams::default(),
            fake: false,
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            retry_delay_ms: DEFAULT_RETRY_DELAY_MS,
            timeout_secs: DEFAULT_TIMEOUT_SECS,
        }
    }
}

/// Layout of the secrets file: `{"RecipeManager": {"OPENAI_KEY": "..."}}`.
#[derive(Deserialize)]
struct SecretsFile {
    #[serde(rename = "RecipeManager")]
    recipe_manager: Option<RecipeManagerSecrets>,
}

#[derive(Deserialize)]
struct RecipeManagerSecrets {
    #[serde(rename = "OPENAI_KEY")]
    openai_key: Option<String>,
}

impl AiConfig {
    /// Load configuration from environment variables.
    ///
    /// - `OPENAI_API_KEY`: API key (falls back to the secrets file)
    /// - `LARDER_SECRETS_FILE`: secrets file (default: "secrets.json")
    /// - `LARDER_MODEL`, `LARDER_BASE_URL`, `LARDER_IMAGE_MODEL`, `LARDER_IMAGE_SIZE`
    /// - `LARDER_TEMPERATURE`, `LARDER_MAX_COMPLETION_TOKENS`, `LARDER_TOP_P`,
    ///   `LARDER_FREQUENCY_PENALTY`, `LARDER_PRESENCE_PENALTY`, `LARDER_N`, `LARDER_STREAM`,
    ///   `LARDER_BEST_OF`, `LARDER_LOGPROBS`, `LARDER_ECHO`
    /// - `LARDER_FAKE_AI`: "true" to use canned responses
    /// - `LARDER_MAX_ATTEMPTS`, `LARDER_RETRY_DELAY_MS`, `LARDER_TIMEOUT_SECS`
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Load configuration through an arbitrary variable lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        let default_params = defaults.params.clone();

        let api_key = match lookup("OPENAI_API_KEY").filter(|k| !k.is_empty()) {
            Some(key) => Some(key),
            None => {
                let secrets = lookup("LARDER_SECRETS_FILE")
                    .unwrap_or_else(|| DEFAULT_SECRETS_FILE.to_string());
                read_secrets_key(Path::new(&secrets))?
            }
        };

        let params = GenerationParams {
            temperature: parse_var(&lookup, "LARDER_TEMPERATURE", default_params.temperature)?,
            max_tokens: parse_var(
                &lookup,
                "LARDER_MAX_COMPLETION_TOKENS",
                default_params.max_tokens,
            )?,
            top_p: parse_var(&lookup, "LARDER_TOP_P", default_params.top_p)?,
            frequency_penalty: parse_var(
                &lookup,
                "LARDER_FREQUENCY_PENALTY",
                default_params.frequency_penalty,
            )?,
            presence_penalty: parse_var(
                &lookup,
                "LARDER_PRESENCE_PENALTY",
                default_params.presence_penalty,
            )?,
            n: parse_var(&lookup, "LARDER_N", default_params.n)?,
            stream: parse_flag(&lookup, "LARDER_STREAM", default_params.stream)?,
            best_of: parse_optional(&lookup, "LARDER_BEST_OF")?,
            logprobs: parse_optional_flag(&lookup, "LARDER_LOGPROBS")?,
            echo: parse_optional_flag(&lookup, "LARDER_ECHO")?,
        };

        Ok(Self {
            api_key,
            model: lookup("LARDER_MODEL").unwrap_or(defaults.model),
            base_url: lookup("LARDER_BASE_URL").unwrap_or(defaults.base_url),
            image_model: lookup("LARDER_IMAGE_MODEL").unwrap_or(defaults.image_model),
            image_size: lookup("LARDER_IMAGE_SIZE").unwrap_or(defaults.image_size),
            params,
            fake: parse_flag(&lookup, "LARDER_FAKE_AI", false)?,
            max_attempts: parse_var(&lookup, "LARDER_MAX_ATTEMPTS", defaults.max_attempts)?,
            retry_delay_ms: parse_var(&lookup, "LARDER_RETRY_DELAY_MS", defaults.retry_delay_ms)?,
            timeout_secs: parse_var(&lookup, "LARDER_TIMEOUT_SECS", defaults.timeout_secs)?,
        })
    }

    /// Check the configuration before any component is built.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.validate_model()?;

        if self.max_attempts == 0 {
            return Err(ConfigError::InvalidValue {
                name: "max_attempts".to_string(),
                value: "0".to_string(),
                reason: "at least one attempt is required".to_string(),
            });
        }

        if !self.fake && self.api_key.is_none() {
            return Err(ConfigError::MissingApiKey);
        }

        Ok(())
    }

    /// Check the text and image models against the allow-lists. Needs no API key.
    pub fn validate_model(&self) -> Result<(), ConfigError> {
        if !SUPPORTED_MODELS.contains(&self.model.as_str()) {
            return Err(ConfigError::InvalidModel {
                model: self.model.clone(),
                supported: SUPPORTED_MODELS.join(", "),
            });
        }

        if !SUPPORTED_IMAGE_MODELS.contains(&self.image_model.as_str()) {
            return Err(ConfigError::InvalidImageModel {
                model: self.image_model.clone(),
                supported: SUPPORTED_IMAGE_MODELS.join(", "),
            });
        }

        Ok(())
    }

    /// The API key, or an error if none is configured.
    pub fn api_key(&self) -> Result<&str, ConfigError> {
        self.api_key.as_deref().ok_or(ConfigError::MissingApiKey)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::new(
            self.max_attempts,
            Duration::from_millis(self.retry_delay_ms),
        )
    }
}

/// Read `RecipeManager.OPENAI_KEY` from a secrets file. A missing file yields `None`.
fn read_secrets_key(path: &Path) -> Result<Option<String>, ConfigError> {
    let content = match fs::read_to_string(path) {
        Ok(content) => content,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(e) => {
            return Err(ConfigError::Secrets {
                path: path.to_path_buf(),
                reason: e.to_string(),
            })
        }
    };

    let secrets: SecretsFile =
        serde_json::from_str(&content).map_err(|e| ConfigError::Secrets {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

    Ok(secrets
        .recipe_manager
        .and_then(|s| s.openai_key)
        .filter(|k| !k.is_empty()))
}

/// Parse a variable, using `default` when it is unset.
pub(crate) fn parse_var<F, T>(lookup: &F, name: &str, default: T) -> Result<T, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
    T::Err: Display,
{
    match parse_optional(lookup, name)? {
        Some(value) => Ok(value),
        None => Ok(default),
    }
}

pub(crate) fn parse_optional<F, T>(lookup: &F, name: &str) -> Result<Option<T>, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
    T::Err: Display,
{
    match lookup(name) {
        None => Ok(None),
        Some(raw) => raw
            .trim()
            .parse()
            .map(Some)
            .map_err(|e: T::Err| ConfigError::InvalidValue {
                name: name.to_string(),
                value: raw.clone(),
                reason: e.to_string(),
            }),
    }
}

/// Parse a boolean flag ("true"/"1"/"yes" or "false"/"0"/"no").
pub(crate) fn parse_flag<F>(lookup: &F, name: &str, default: bool) -> Result<bool, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    Ok(parse_optional_flag(lookup, name)?.unwrap_or(default))
}

fn parse_optional_flag<F>(lookup: &F, name: &str) -> Result<Option<bool>, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    match lookup(name) {
        None => Ok(None),
        Some(raw) => match raw.trim().to_ascii_lowercase().as_str() {
            "true" | "1" | "yes" => Ok(Some(true)),
            "false" | "0" | "no" => Ok(Some(false)),
            _ => Err(ConfigError::InvalidValue {
                name: name.to_string(),
                value: raw,
                reason: "expected true or false".to_string(),
            }),
        },
    }
}
