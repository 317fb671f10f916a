//! Prompt templates and composition.
//!
//! Prompts are assembled from plain-text fragment files. Each fragment may contain
//! role tag lines (`[system]`, `[user]`, `[assistant]`) that split the final text
//! into conversation turns, and the recipe prompt carries exactly one placeholder
//! where the ingredient block is substituted.

mod compose;
mod image;
mod roles;
mod template;
mod tokens;

pub use compose::{ingredients_block, substitute_placeholder, PromptComposer};
pub use image::{recipe_summary, ImagePromptComposer};
pub use roles::parse_messages;
pub use template::{TemplateError, TemplateLoader};
pub use tokens::{BpeTokenizer, TokenBudget, TokenCounter};

use thiserror::Error;

/// Recipe prompt fragments, in load order.
pub const DEFAULT_FRAGMENT_ORDER: &[&str] = &[
    "prompt_role",
    "prompt_environment",
    "prompt_input_output_format",
    "prompt_query",
];

/// Fragment holding the image prompt preamble.
pub const IMAGE_FRAGMENT: &str = "prompt_image";

/// Token replaced by the ingredient block.
pub const DEFAULT_PLACEHOLDER: &str = "[ingredients_prompt]";

/// Tokenizer used for the prompt budget unless configured otherwise.
pub const DEFAULT_TOKENIZER: &str = "cl100k_base";

#[derive(Error, Debug)]
pub enum ComposeError {
    #[error(transparent)]
    Template(#[from] TemplateError),

    #[error("Ingredient JSON is malformed: {0}")]
    MalformedIngredientJson(String),

    #[error("Template must contain exactly one '{placeholder}' placeholder, found {found}")]
    PlaceholderCount { placeholder: String, found: usize },

    #[error("Prompt too long: {tokens} tokens exceeds the {limit}-token prompt budget")]
    PromptTooLong { tokens: usize, limit: usize },

    #[error("Unknown tokenizer '{0}'")]
    UnknownTokenizer(String),

    #[error("Failed to load tokenizer '{name}': {reason}")]
    Tokenizer { name: String, reason: String },
}
