//! Application configuration, built once at startup and handed to each component.

use std::env;
use std::path::{Path, PathBuf};

use crate::ai::prompts::{TokenBudget, DEFAULT_FRAGMENT_ORDER, DEFAULT_PLACEHOLDER, DEFAULT_TOKENIZER};
use crate::ai::{parse_flag, parse_var, AiConfig, AuditLog, ConfigError};

pub const DEFAULT_PROMPT_DIR: &str = "prompts";
pub const DEFAULT_OUTPUT_DIR: &str = "data";
pub const DEFAULT_MAX_TOTAL_TOKENS: usize = 8000;

pub const ITEMS_FILE: &str = "items.json";
pub const REQUESTS_LOG: &str = "requests.jsonl";
pub const RESPONSES_LOG: &str = "responses.jsonl";
pub const IMAGES_LOG: &str = "images.jsonl";
pub const IMAGE_DIR: &str = "images";

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub ai: AiConfig,
    /// Directory holding the `<name>.txt` prompt fragments.
    pub prompt_dir: PathBuf,
    /// Directory for the request/response/image logs and downloaded images.
    pub output_dir: PathBuf,
    /// Ingredient file override; defaults to `<output_dir>/items.json`.
    pub items_file: Option<PathBuf>,
    pub fragments: Vec<String>,
    pub placeholder: String,
    pub tokenizer: String,
    /// Model context size; the prompt gets this minus the completion allowance.
    pub max_total_tokens: usize,
    /// Print recipes as Markdown rather than JSON.
    pub markdown: bool,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            ai: AiConfig::default(),
            prompt_dir: PathBuf::from(DEFAULT_PROMPT_DIR),
            output_dir: PathBuf::from(DEFAULT_OUTPUT_DIR),
            items_file: None,
            fragments: DEFAULT_FRAGMENT_ORDER
                .iter()
                .map(|name| name.to_string())
                .collect(),
            placeholder: DEFAULT_PLACEHOLDER.to_string(),
            tokenizer: DEFAULT_TOKENIZER.to_string(),
            max_total_tokens: DEFAULT_MAX_TOTAL_TOKENS,
            markdown: true,
        }
    }
}

impl AppConfig {
    /// Load configuration from environment variables.
    ///
    /// On top of everything [`AiConfig::from_env`] reads:
    /// - `LARDER_PROMPT_DIR` (default: "prompts")
    /// - `LARDER_OUTPUT_DIR` (default: "data")
    /// - `LARDER_ITEMS_FILE` (default: "<output dir>/items.json")
    /// - `LARDER_PROMPT_FRAGMENTS`: comma-separated fragment order
    /// - `LARDER_PLACEHOLDER` (default: "[ingredients_prompt]")
    /// - `LARDER_TOKENIZER` (default: "cl100k_base")
    /// - `LARDER_MAX_TOKENS` (default: 8000)
    /// - `LARDER_MARKDOWN` (default: true)
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();

        let fragments = match lookup("LARDER_PROMPT_FRAGMENTS") {
            Some(raw) => raw
                .split(',')
                .map(str::trim)
                .filter(|name| !name.is_empty())
                .map(str::to_string)
                .collect(),
            None => defaults.fragments,
        };

        Ok(Self {
            ai: AiConfig::from_lookup(&lookup)?,
            prompt_dir: lookup("LARDER_PROMPT_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.prompt_dir),
            output_dir: lookup("LARDER_OUTPUT_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.output_dir),
            items_file: lookup("LARDER_ITEMS_FILE").map(PathBuf::from),
            fragments,
            placeholder: lookup("LARDER_PLACEHOLDER").unwrap_or(defaults.placeholder),
            tokenizer: lookup("LARDER_TOKENIZER").unwrap_or(defaults.tokenizer),
            max_total_tokens: parse_var(&lookup, "LARDER_MAX_TOKENS", defaults.max_total_tokens)?,
            markdown: parse_flag(&lookup, "LARDER_MARKDOWN", defaults.markdown)?,
        })
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.ai.validate()?;

        if self.fragments.is_empty() {
            return Err(ConfigError::InvalidValue {
                name: "LARDER_PROMPT_FRAGMENTS".to_string(),
                value: String::new(),
                reason: "at least one fragment is required".to_string(),
            });
        }

        if self.placeholder.is_empty() {
            return Err(ConfigError::InvalidValue {
                name: "LARDER_PLACEHOLDER".to_string(),
                value: String::new(),
                reason: "placeholder must not be empty".to_string(),
            });
        }

        let completion = self.ai.params.max_tokens as usize;
        if completion >= self.max_total_tokens {
            return Err(ConfigError::InvalidValue {
                name: "LARDER_MAX_TOKENS".to_string(),
                value: self.max_total_tokens.to_string(),
                reason: format!(
                    "must exceed the completion allowance of {} tokens",
                    completion
                ),
            });
        }

        Ok(())
    }

    pub fn token_budget(&self) -> TokenBudget {
        TokenBudget::new(self.max_total_tokens, self.ai.params.max_tokens as usize)
    }

    pub fn items_path(&self) -> PathBuf {
        self.items_file
            .clone()
            .unwrap_or_else(|| self.output_dir.join(ITEMS_FILE))
    }

    pub fn image_dir(&self) -> PathBuf {
        self.output_dir.join(IMAGE_DIR)
    }

    pub fn requests_log(&self) -> AuditLog {
        AuditLog::new(self.output_dir.join(REQUESTS_LOG))
    }

    pub fn responses_log(&self) -> AuditLog {
        AuditLog::new(self.output_dir.join(RESPONSES_LOG))
    }

    pub fn images_log(&self) -> AuditLog {
        AuditLog::new(self.output_dir.join(IMAGES_LOG))
    }

    /// Point all outputs at `dir`, keeping an explicit items file override.
    pub fn with_output_dir(mut self, dir: impl AsRef<Path>) -> Self {
        self.output_dir = dir.as_ref().to_path_buf();
        self
    }
}
