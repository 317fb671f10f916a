//! Fake AI backend for offline runs and tests.
//!
//! Returns the same canned payloads on every call, so runs in fake mode are
//! reproducible without network access or API costs.

use async_trait::async_trait;
use serde_json::{json, Value as JsonValue};

use super::client::{BackendError, CompletionBackend, ImageBackend};
use super::types::{CompletionRequest, ImageRequest};

/// URL returned for every fake image generation.
pub const FAKE_IMAGE_URL: &str = "https://images.larder.invalid/fake/recipe.png";

/// Recipe content returned by the default fake backend.
pub const FAKE_RECIPE_CONTENT: &str = r#"{"recipe_name": "Pantry Omelette", "description": "A quick omelette made from whatever is in the pantry.", "servings": 2, "ingredients": [{"name": "egg", "quantity": "4", "unit_of_measure": "pcs"}, {"name": "butter", "quantity": "1", "unit_of_measure": "tbsp"}, {"name": "salt", "quantity": "1", "unit_of_measure": "pinch"}], "steps": ["Whisk the eggs with the salt.", "Melt the butter in a pan over medium heat.", "Pour in the eggs and cook until just set, then fold and serve."]}"#;

/// A fake backend with fixed responses.
#[derive(Debug, Clone)]
pub struct FakeBackend {
    /// Message content of each returned choice.
    contents: Vec<String>,
    image_url: String,
}

impl Default for FakeBackend {
    fn default() -> Self {
        Self {
            contents: vec![FAKE_RECIPE_CONTENT.to_string()],
            image_url: FAKE_IMAGE_URL.to_string(),
        }
    }
}

impl FakeBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a fake backend whose response carries one choice per given content.
    pub fn with_choices<I, S>(contents: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            contents: contents.into_iter().map(Into::into).collect(),
            ..Self::default()
        }
    }

    /// Set the URL returned by image generation.
    pub fn with_image_url(mut self, url: &str) -> Self {
        self.image_url = url.to_string();
        self
    }

    /// Build the canned chat-completion payload for a model.
    pub fn completion_payload(&self, model: &str) -> JsonValue {
        let choices: Vec<JsonValue> = self
            .contents
            .iter()
            .enumerate()
            .map(|(index, content)| {
                json!({
                    "index": index,
                    "message": {"role": "assistant", "content": content},
                    "finish_reason": "stop"
                })
            })
            .collect();

        json!({
            "id": "chatcmpl-fake",
            "object": "chat.completion",
            "created": 0,
            "model": model,
            "choices": choices,
            "usage": {"prompt_tokens": 0, "completion_tokens": 0, "total_tokens": 0}
        })
    }
}

#[async_trait]
impl CompletionBackend for FakeBackend {
    async fn complete(&self, request: &CompletionRequest) -> Result<JsonValue, BackendError> {
        Ok(self.completion_payload(&request.model))
    }

    fn backend_name(&self) -> &'static str {
        "fake"
    }
}

#[async_trait]
impl ImageBackend for FakeBackend {
    async fn generate(&self, request: &ImageRequest) -> Result<Vec<String>, BackendError> {
        Ok(vec![self.image_url.clone(); request.n.max(1) as usize])
    }

    fn backend_name(&self) -> &'static str {
        "fake"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ai::{ChatMessage, GenerationParams};

    fn request() -> CompletionRequest {
        CompletionRequest {
            model: "gpt-4o-mini".to_string(),
            messages: vec![ChatMessage::user("anything")],
            params: GenerationParams::default(),
        }
    }

    #[tokio::test]
    async fn test_fake_completion_is_deterministic() {
        let backend = FakeBackend::new();
        let first = backend.complete(&request()).await.unwrap();
        let second = backend.complete(&request()).await.unwrap();

        assert_eq!(
            serde_json::to_vec(&first).unwrap(),
            serde_json::to_vec(&second).unwrap()
        );
        assert_eq!(first["model"], "gpt-4o-mini");
        assert_eq!(first["choices"][0]["message"]["content"], FAKE_RECIPE_CONTENT);
    }

    #[tokio::test]
    async fn test_fake_with_choices() {
        let backend = FakeBackend::with_choices(["one", "two"]);
        let payload = backend.complete(&request()).await.unwrap();

        assert_eq!(payload["choices"].as_array().unwrap().len(), 2);
        assert_eq!(payload["choices"][1]["index"], 1);
        assert_eq!(payload["choices"][1]["message"]["content"], "two");
    }

    #[tokio::test]
    async fn test_fake_image_url() {
        let backend = FakeBackend::new().with_image_url("https://example.test/a.png");
        let request = ImageRequest {
            model: "dall-e-3".to_string(),
            prompt: "a cake".to_string(),
            n: 1,
            size: "1024x1024".to_string(),
        };

        let urls = backend.generate(&request).await.unwrap();
        assert_eq!(urls, vec!["https://example.test/a.png".to_string()]);
    }

    #[test]
    fn test_canned_recipe_is_valid_json() {
        let recipe: JsonValue = serde_json::from_str(FAKE_RECIPE_CONTENT).unwrap();
        assert_eq!(recipe["recipe_name"], "Pantry Omelette");
    }
}
