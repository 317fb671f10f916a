//! Recipe prompt composition.

use std::sync::Arc;

use serde_json::{json, Value as JsonValue};

use super::roles::parse_messages;
use super::template::TemplateLoader;
use super::tokens::{TokenBudget, TokenCounter};
use super::{ComposeError, DEFAULT_FRAGMENT_ORDER, DEFAULT_PLACEHOLDER};
use crate::ai::types::ChatMessage;
use crate::pantry::Ingredient;

/// Build the JSON object describing a submission.
///
/// Names and instructions are escaped by the serializer, so quotes and
/// backslashes in user input are carried through intact.
pub fn ingredients_block(
    ingredients: &[Ingredient],
    instructions: &str,
    is_strict: bool,
) -> Result<String, ComposeError> {
    let block = json!({
        "instruction": instructions,
        "is_strict_ingredients": is_strict,
        "ingredients": ingredients,
    });

    let encoded = serde_json::to_string(&block)
        .map_err(|e| ComposeError::MalformedIngredientJson(e.to_string()))?;

    // Re-read what will be sent so a bad encoding never reaches the template.
    serde_json::from_str::<JsonValue>(&encoded)
        .map_err(|e| ComposeError::MalformedIngredientJson(e.to_string()))?;

    Ok(encoded)
}

/// Replace the single `placeholder` in `template` with `value`.
pub fn substitute_placeholder(
    template: &str,
    placeholder: &str,
    value: &str,
) -> Result<String, ComposeError> {
    let found = if placeholder.is_empty() {
        0
    } else {
        template.matches(placeholder).count()
    };
    if found != 1 {
        return Err(ComposeError::PlaceholderCount {
            placeholder: placeholder.to_string(),
            found,
        });
    }
    Ok(template.replacen(placeholder, value, 1))
}

/// Turns an ingredient list and free-text instructions into a bounded message sequence.
pub struct PromptComposer {
    loader: TemplateLoader,
    fragments: Vec<String>,
    placeholder: String,
    budget: TokenBudget,
    counter: Arc<dyn TokenCounter>,
}

impl PromptComposer {
    pub fn new(loader: TemplateLoader, counter: Arc<dyn TokenCounter>) -> Self {
        Self {
            loader,
            fragments: DEFAULT_FRAGMENT_ORDER
                .iter()
                .map(|name| name.to_string())
                .collect(),
            placeholder: DEFAULT_PLACEHOLDER.to_string(),
            budget: TokenBudget::default(),
            counter,
        }
    }

    pub fn with_fragments<I, S>(mut self, fragments: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.fragments = fragments.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_placeholder(mut self, placeholder: impl Into<String>) -> Self {
        self.placeholder = placeholder.into();
        self
    }

    pub fn with_budget(mut self, budget: TokenBudget) -> Self {
        self.budget = budget;
        self
    }

    /// Compose the prompt text, checked against the token budget.
    pub fn compose_text(
        &self,
        ingredients: &[Ingredient],
        instructions: &str,
        is_strict: bool,
    ) -> Result<String, ComposeError> {
        let template = self.loader.load(&self.fragments)?;
        let block = ingredients_block(ingredients, instructions, is_strict)?;
        let text = substitute_placeholder(&template, &self.placeholder, &format!("[{}]", block))?;

        let tokens = self.counter.count_tokens(&text);
        if let Err(e) = self.budget.check(tokens) {
            tracing::warn!(
                tokens,
                limit = self.budget.prompt_limit(),
                ingredients = ingredients.len(),
                "prompt exceeds token budget"
            );
            return Err(e);
        }

        tracing::debug!(
            tokens,
            ingredients = ingredients.len(),
            is_strict,
            "composed recipe prompt"
        );
        Ok(text)
    }

    /// Compose the prompt and split it into role-tagged messages.
    ///
    /// An empty result means the template had no role tags; callers must not dispatch it.
    pub fn compose(
        &self,
        ingredients: &[Ingredient],
        instructions: &str,
        is_strict: bool,
    ) -> Result<Vec<ChatMessage>, ComposeError> {
        let text = self.compose_text(ingredients, instructions, is_strict)?;
        Ok(parse_messages(&text))
    }
}
