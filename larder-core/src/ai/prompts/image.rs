//! Image prompt composition from a generated recipe.

use super::template::TemplateLoader;
use super::{ComposeError, IMAGE_FRAGMENT};
use crate::ai::recipe::RecipeResult;

/// Recipe name followed by one line per ingredient.
pub fn recipe_summary(recipe: &RecipeResult) -> String {
    let mut summary = format!("Recipe: {}", recipe.recipe_name.trim());
    if !recipe.ingredients.is_empty() {
        summary.push_str("\nIngredients:");
        for ingredient in &recipe.ingredients {
            summary.push_str("\n- ");
            summary.push_str(&ingredient.summary());
        }
    }
    summary
}

pub struct ImagePromptComposer {
    loader: TemplateLoader,
    fragment: String,
}

impl ImagePromptComposer {
    pub fn new(loader: TemplateLoader) -> Self {
        Self {
            loader,
            fragment: IMAGE_FRAGMENT.to_string(),
        }
    }

    /// Load the image preamble and append the recipe summary.
    pub fn compose(&self, recipe: &RecipeResult) -> Result<String, ComposeError> {
        let preamble = self.loader.load_fragment(&self.fragment)?;
        let summary = recipe_summary(recipe);

        let prompt = match preamble.trim_end() {
            "" => summary,
            preamble => format!("{}\n\n{}", preamble, summary),
        };

        tracing::debug!(
            recipe = %recipe.recipe_name,
            ingredients = recipe.ingredients.len(),
            "composed image prompt"
        );
        Ok(prompt)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ai::prompts::TemplateError;
    use crate::ai::recipe::parse_recipe;
    use std::fs;
    use tempfile::TempDir;

    fn sample_recipe() -> RecipeResult {
        parse_recipe(
            r#"{
                "recipe_name": "Shakshuka",
                "ingredients": [
                    {"name": "egg", "quantity": "4", "unit_of_measure": "pcs"},
                    {"name": "tomato", "quantity": 3, "unit_of_measure": "pcs"},
                    {"name": "paprika", "quantity": "1", "unit_of_measure": "tsp"}
                ]
            }"#,
        )
        .unwrap()
    }

    #[test]
    fn test_summary_keeps_every_ingredient() {
        let summary = recipe_summary(&sample_recipe());
        assert_eq!(
            summary,
            "Recipe: Shakshuka\nIngredients:\n- egg 4 pcs\n- tomato 3 pcs\n- paprika 1 tsp"
        );
    }

    #[test]
    fn test_summary_without_ingredients() {
        let recipe = parse_recipe(r#"{"recipe_name": "Water"}"#).unwrap();
        assert_eq!(recipe_summary(&recipe), "Recipe: Water");
    }

    #[test]
    fn test_compose_prepends_fragment() {
        let temp_dir = TempDir::new().unwrap();
        fs::write(
            temp_dir.path().join("prompt_image.txt"),
            "A bright overhead food photo of:\n",
        )
        .unwrap();

        let composer = ImagePromptComposer::new(TemplateLoader::new(temp_dir.path()));
        let prompt = composer.compose(&sample_recipe()).unwrap();

        assert!(prompt.starts_with("A bright overhead food photo of:\n\nRecipe: Shakshuka"));
        assert!(prompt.ends_with("- paprika 1 tsp"));
    }

    #[test]
    fn test_missing_image_fragment() {
        let temp_dir = TempDir::new().unwrap();
        let composer = ImagePromptComposer::new(TemplateLoader::new(temp_dir.path()));

        let err = composer.compose(&sample_recipe()).unwrap_err();
        assert!(matches!(
            err,
            ComposeError::Template(TemplateError::TemplateMissing { .. })
        ));
    }
}
