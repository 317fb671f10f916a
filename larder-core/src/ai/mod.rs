//! AI request pipeline: prompt composition, backend dispatch and recipe extraction.
//!
//! This module provides:
//! - `PromptComposer` for turning an ingredient list into role-tagged messages
//! - `RequestDispatcher` for sending messages with bounded retries and an audit trail
//! - `CompletionBackend` / `ImageBackend` traits with an OpenAI-compatible client and a
//!   deterministic fake
//! - `ImageDispatcher` for generating and downloading a recipe image
//!
//! # Configuration
//!
//! - `OPENAI_API_KEY` (required unless fake): API key, else read from `LARDER_SECRETS_FILE`
//! - `LARDER_MODEL` (optional): chat model, must be on the allow-list
//! - `LARDER_BASE_URL` (optional): API base URL
//! - `LARDER_FAKE_AI` (optional): Set to "true" to use canned responses
//!
//! # Example
//!
//! ```ignore
//! use larder_core::ai::{AiConfig, AuditLog, RequestDispatcher, extract_recipes};
//!
//! let config = AiConfig::from_env()?;
//! let dispatcher = RequestDispatcher::from_config(
//!     &config,
//!     AuditLog::new("data/requests.jsonl"),
//!     AuditLog::new("data/responses.jsonl"),
//! )?;
//!
//! let response = dispatcher.dispatch(&messages).await?;
//! for recipe in extract_recipes(&response) {
//!     println!("{}", recipe.to_markdown());
//! }
//! ```

mod audit;
mod client;
mod config;
mod dispatch;
mod fake;
mod image;
pub mod prompts;
mod recipe;
mod retry;
mod types;

pub use audit::{AuditLog, ImageRecord, LogEntry, RequestRecord, ResponseRecord};
pub use client::{BackendError, CompletionBackend, ImageBackend, OpenAiClient};
pub(crate) use config::{parse_flag, parse_var};
pub use config::{
    AiConfig, ConfigError, DEFAULT_IMAGE_MODEL, DEFAULT_MODEL, SUPPORTED_IMAGE_MODELS,
    SUPPORTED_MODELS,
};
pub use dispatch::{DispatchError, DispatchProgress, LogProgress, RequestDispatcher};
pub use fake::{FakeBackend, FAKE_IMAGE_URL, FAKE_RECIPE_CONTENT};
pub use image::{GeneratedImage, ImageDispatcher, ImageError};
pub use recipe::{choice_contents, extract_recipes, parse_recipe, RecipeIngredient, RecipeResult};
pub use retry::RetryPolicy;
pub use types::{ChatMessage, CompletionRequest, GenerationParams, ImageRequest, Role, Usage};
