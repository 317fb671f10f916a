//! Token counting and the prompt budget.

use std::fmt;

use tiktoken_rs::CoreBPE;

use super::ComposeError;

/// Anything that can count tokens in a piece of text.
pub trait TokenCounter: Send + Sync {
    fn count_tokens(&self, text: &str) -> usize;
}

/// A tiktoken byte-pair encoder selected by encoding name.
pub struct BpeTokenizer {
    name: String,
    bpe: CoreBPE,
}

impl BpeTokenizer {
    /// Load a tokenizer by its encoding name (`cl100k_base`, `o200k_base`, ...).
    pub fn by_name(name: &str) -> Result<Self, ComposeError> {
        let loaded = match name {
            "cl100k_base" => tiktoken_rs::cl100k_base(),
            "o200k_base" => tiktoken_rs::o200k_base(),
            "p50k_base" => tiktoken_rs::p50k_base(),
            "p50k_edit" => tiktoken_rs::p50k_edit(),
            "r50k_base" => tiktoken_rs::r50k_base(),
            other => return Err(ComposeError::UnknownTokenizer(other.to_string())),
        };

        let bpe = loaded.map_err(|e| ComposeError::Tokenizer {
            name: name.to_string(),
            reason: e.to_string(),
        })?;

        Ok(Self {
            name: name.to_string(),
            bpe,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

impl fmt::Debug for BpeTokenizer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BpeTokenizer")
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}

impl TokenCounter for BpeTokenizer {
    fn count_tokens(&self, text: &str) -> usize {
        self.bpe.encode_with_special_tokens(text).len()
    }
}

/// Upper bound on prompt size: the model's context minus the room reserved for the completion.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TokenBudget {
    pub max_total_tokens: usize,
    pub max_completion_tokens: usize,
}

impl TokenBudget {
    pub fn new(max_total_tokens: usize, max_completion_tokens: usize) -> Self {
        Self {
            max_total_tokens,
            max_completion_tokens,
        }
    }

    /// Tokens available to the prompt.
    pub fn prompt_limit(&self) -> usize {
        self.max_total_tokens
            .saturating_sub(self.max_completion_tokens)
    }

    /// Fail with `PromptTooLong` if `tokens` does not fit.
    pub fn check(&self, tokens: usize) -> Result<(), ComposeError> {
        let limit = self.prompt_limit();
        if tokens > limit {
            return Err(ComposeError::PromptTooLong { tokens, limit });
        }
        Ok(())
    }
}

impl Default for TokenBudget {
    fn default() -> Self {
        Self::new(8000, 2000)
    }
}
