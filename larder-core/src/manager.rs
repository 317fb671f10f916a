//! End-to-end submission: pantry → prompt → dispatch → recipes → image.

use std::sync::Arc;

use thiserror::Error;

use crate::ai::prompts::{
    BpeTokenizer, ComposeError, ImagePromptComposer, PromptComposer, TemplateLoader,
    TokenCounter,
};
use crate::ai::{
    extract_recipes, BackendError, ConfigError, DispatchError, DispatchProgress, GeneratedImage,
    ImageDispatcher, ImageError, RecipeResult, RequestDispatcher, ResponseRecord,
};
use crate::config::AppConfig;
use crate::pantry::{IngredientError, IngredientStore};

#[derive(Error, Debug)]
pub enum ManagerError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Ingredient(#[from] IngredientError),

    #[error(transparent)]
    Compose(#[from] ComposeError),

    #[error("The prompt template produced no role-tagged messages")]
    EmptyPrompt,

    #[error(transparent)]
    Backend(#[from] BackendError),

    #[error(transparent)]
    Dispatch(#[from] DispatchError),

    #[error(transparent)]
    Image(#[from] ImageError),
}

/// What the user asked for on top of the stored ingredient list.
#[derive(Debug, Clone)]
pub struct Submission {
    pub instructions: String,
    pub is_strict: bool,
    pub generate_image: bool,
}

impl Default for Submission {
    fn default() -> Self {
        Self {
            instructions: String::new(),
            is_strict: true,
            generate_image: true,
        }
    }
}

#[derive(Debug)]
pub struct SubmissionOutcome {
    pub response: ResponseRecord,
    pub recipes: Vec<RecipeResult>,
    pub image: Option<GeneratedImage>,
    /// Why no image was produced, when one was requested but failed.
    pub image_error: Option<String>,
}

/// Wires the pantry, prompt composers and dispatchers together.
pub struct RecipeManager {
    store: IngredientStore,
    composer: PromptComposer,
    image_composer: ImagePromptComposer,
    dispatcher: RequestDispatcher,
    images: ImageDispatcher,
}

impl RecipeManager {
    pub fn new(
        store: IngredientStore,
        composer: PromptComposer,
        image_composer: ImagePromptComposer,
        dispatcher: RequestDispatcher,
        images: ImageDispatcher,
    ) -> Self {
        Self {
            store,
            composer,
            image_composer,
            dispatcher,
            images,
        }
    }

    /// Build every component from the application config.
    pub fn from_config(config: &AppConfig) -> Result<Self, ManagerError> {
        config.validate()?;

        let counter: Arc<dyn TokenCounter> = Arc::new(BpeTokenizer::by_name(&config.tokenizer)?);
        let loader = TemplateLoader::new(&config.prompt_dir);

        let composer = PromptComposer::new(loader.clone(), counter)
            .with_fragments(config.fragments.iter().cloned())
            .with_placeholder(config.placeholder.clone())
            .with_budget(config.token_budget());

        let dispatcher = RequestDispatcher::from_config(
            &config.ai,
            config.requests_log(),
            config.responses_log(),
        )?;
        let images = ImageDispatcher::from_config(&config.ai, config.image_dir(), config.images_log())?;

        tracing::debug!(
            backend = dispatcher.backend_name(),
            prompt_dir = %config.prompt_dir.display(),
            output_dir = %config.output_dir.display(),
            "recipe manager ready"
        );

        Ok(Self::new(
            IngredientStore::new(config.items_path()),
            composer,
            ImagePromptComposer::new(loader),
            dispatcher,
            images,
        ))
    }

    pub fn with_progress(mut self, progress: Box<dyn DispatchProgress>) -> Self {
        self.dispatcher = self.dispatcher.with_progress(progress);
        self
    }

    pub fn store(&self) -> &IngredientStore {
        &self.store
    }

    /// Request recipes for the stored ingredients.
    ///
    /// Image problems never fail the submission once recipes are in hand; they are
    /// reported through `SubmissionOutcome::image_error`.
    pub async fn submit(&self, submission: &Submission) -> Result<SubmissionOutcome, ManagerError> {
        let ingredients = self.store.list()?;
        tracing::info!(
            ingredients = ingredients.len(),
            is_strict = submission.is_strict,
            "submitting ingredient list"
        );

        let messages =
            self.composer
                .compose(&ingredients, &submission.instructions, submission.is_strict)?;
        if messages.is_empty() {
            return Err(ManagerError::EmptyPrompt);
        }

        let response = self.dispatcher.dispatch(&messages).await?;
        let recipes = extract_recipes(&response);
        tracing::info!(recipes = recipes.len(), "recipes extracted");

        let mut outcome = SubmissionOutcome {
            response,
            recipes,
            image: None,
            image_error: None,
        };

        if submission.generate_image {
            match outcome.recipes.first() {
                Some(recipe) => match self.generate_image(recipe).await {
                    Ok(image) => outcome.image = Some(image),
                    Err(e) => {
                        tracing::warn!(recipe = %recipe.recipe_name, error = %e, "image generation failed");
                        outcome.image_error = Some(e.to_string());
                    }
                },
                None => {
                    outcome.image_error = Some("no recipe to illustrate".to_string());
                }
            }
        }

        Ok(outcome)
    }

    async fn generate_image(&self, recipe: &RecipeResult) -> Result<GeneratedImage, ManagerError> {
        let prompt = self.image_composer.compose(recipe)?;
        Ok(self.images.dispatch(&prompt).await?)
    }
}
