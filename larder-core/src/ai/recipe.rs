//! Recipe extraction from backend responses.

use std::fmt::Write as _;

use serde::de::{self, Deserializer};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value as JsonValue};

use super::audit::ResponseRecord;

/// A recipe returned by the model.
///
/// Only `recipe_name` is required; unknown fields are kept in `extra`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecipeResult {
    pub recipe_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default)]
    pub ingredients: Vec<RecipeIngredient>,
    #[serde(default, deserialize_with = "lenient_steps")]
    pub steps: Vec<String>,
    #[serde(flatten)]
    pub extra: Map<String, JsonValue>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecipeIngredient {
    pub name: String,
    #[serde(default, deserialize_with = "string_or_number")]
    pub quantity: String,
    #[serde(default, deserialize_with = "string_or_number")]
    pub unit_of_measure: String,
}

/// Accept `"2"`, `2` and `null` for textual fields.
fn string_or_number<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    match JsonValue::deserialize(deserializer)? {
        JsonValue::String(s) => Ok(s),
        JsonValue::Number(n) => Ok(n.to_string()),
        JsonValue::Null => Ok(String::new()),
        other => Err(de::Error::custom(format!(
            "expected a string or number, got {}",
            other
        ))),
    }
}

/// Steps are usually strings, but models sometimes return `{"step": 1, "instruction": "..."}`.
fn lenient_steps<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let values = Vec::<JsonValue>::deserialize(deserializer)?;
    Ok(values.into_iter().map(step_text).collect())
}

fn step_text(value: JsonValue) -> String {
    match value {
        JsonValue::String(s) => s,
        JsonValue::Object(map) => ["instruction", "description", "text", "step"]
            .iter()
            .find_map(|key| map.get(*key).and_then(JsonValue::as_str))
            .map(str::to_string)
            .unwrap_or_else(|| JsonValue::Object(map).to_string()),
        other => other.to_string(),
    }
}

/// Content strings of every choice in a payload, with the choice index.
///
/// Chat responses carry `message.content`; legacy completions carry `text`.
pub fn choice_contents(payload: &JsonValue) -> Vec<(usize, Option<&str>)> {
    payload
        .get("choices")
        .and_then(JsonValue::as_array)
        .map(|choices| {
            choices
                .iter()
                .enumerate()
                .map(|(index, choice)| {
                    let content = choice
                        .pointer("/message/content")
                        .or_else(|| choice.get("text"))
                        .and_then(JsonValue::as_str);
                    (index, content)
                })
                .collect()
        })
        .unwrap_or_default()
}

/// Strip a surrounding Markdown code fence, if present.
fn strip_code_fence(content: &str) -> &str {
    let trimmed = content.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    // Drop an optional language tag on the opening fence line. A fence on a
    // single line has no newline, so the tag ends where the object starts.
    let body = match rest.split_once('\n') {
        Some((_, body)) => body,
        None => rest.find('{').map_or(rest, |start| &rest[start..]),
    };
    body.trim_end().strip_suffix("```").unwrap_or(body).trim()
}

/// Parse one choice's content into a recipe.
pub fn parse_recipe(content: &str) -> Result<RecipeResult, serde_json::Error> {
    serde_json::from_str(strip_code_fence(content))
}

/// Extract every recipe from a response.
///
/// Choices that are missing content or do not parse are logged and skipped;
/// they never prevent sibling choices from being extracted.
pub fn extract_recipes(response: &ResponseRecord) -> Vec<RecipeResult> {
    let contents = choice_contents(&response.payload);
    if contents.is_empty() {
        tracing::warn!(model = %response.model, "response contains no choices");
    }

    contents
        .into_iter()
        .filter_map(|(index, content)| {
            let Some(content) = content else {
                tracing::warn!(choice = index, "choice has no content, skipping");
                return None;
            };
            match parse_recipe(content) {
                Ok(recipe) => Some(recipe),
                Err(e) => {
                    tracing::warn!(
                        choice = index,
                        error = %e,
                        content = %content.chars().take(200).collect::<String>(),
                        "choice is not a valid recipe, skipping"
                    );
                    None
                }
            }
        })
        .collect()
}

impl RecipeResult {
    /// Render the recipe as Markdown.
    pub fn to_markdown(&self) -> String {
        let mut out = format!("# {}\n", self.recipe_name);

        if let Some(description) = &self.description {
            let _ = write!(out, "\n{}\n", description);
        }

        if !self.ingredients.is_empty() {
            out.push_str("\n## Ingredients\n\n");
            for ingredient in &self.ingredients {
                let _ = writeln!(out, "- {}", ingredient.summary());
            }
        }

        if !self.steps.is_empty() {
            out.push_str("\n## Steps\n\n");
            for (number, step) in self.steps.iter().enumerate() {
                let _ = writeln!(out, "{}. {}", number + 1, step);
            }
        }

        out
    }
}

impl RecipeIngredient {
    /// `name quantity unit`, skipping empty parts.
    pub fn summary(&self) -> String {
        [
            self.name.as_str(),
            self.quantity.as_str(),
            self.unit_of_measure.as_str(),
        ]
        .iter()
        .map(|part| part.trim())
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
    }
}
