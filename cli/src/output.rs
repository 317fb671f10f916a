//! Terminal rendering of ingredients, recipes and retry progress.

use std::io::{self, Write};
use std::time::Duration;

use larder_core::ai::{BackendError, DispatchProgress};
use larder_core::{Ingredient, SubmissionOutcome};

/// Prints a line to stderr for each retry so the user knows why it is slow.
pub struct ConsoleProgress;

impl DispatchProgress for ConsoleProgress {
    fn on_retry(&self, attempt: u32, max_attempts: u32, delay: Duration, error: &BackendError) {
        eprintln!(
            "  Attempt {}/{} failed ({}), retrying in {:.1}s...",
            attempt,
            max_attempts,
            error,
            delay.as_secs_f64()
        );
    }
}

pub fn print_ingredients<W: Write>(out: &mut W, ingredients: &[Ingredient]) -> io::Result<()> {
    if ingredients.is_empty() {
        writeln!(out, "No ingredients stored.")?;
        return Ok(());
    }
    writeln!(out, "Ingredients ({}):", ingredients.len())?;
    for ingredient in ingredients {
        writeln!(
            out,
            "  - {} {} {}",
            ingredient.name, ingredient.quantity, ingredient.unit_of_measure
        )?;
    }
    Ok(())
}

pub fn print_outcome<W: Write>(
    out: &mut W,
    outcome: &SubmissionOutcome,
    markdown: bool,
) -> io::Result<()> {
    if outcome.recipes.is_empty() {
        writeln!(out, "The AI response did not contain a usable recipe.")?;
    }

    for recipe in &outcome.recipes {
        if markdown {
            writeln!(out, "{}", recipe.to_markdown())?;
        } else {
            let json = serde_json::to_string_pretty(recipe).map_err(io::Error::other)?;
            writeln!(out, "{}", json)?;
        }
    }

    match (&outcome.image, &outcome.image_error) {
        (Some(image), _) => match &image.path {
            Some(path) => writeln!(out, "Image saved to {}", path.display())?,
            None => writeln!(out, "Image generated at {} but could not be downloaded", image.url)?,
        },
        (None, Some(error)) => writeln!(out, "No image: {}", error)?,
        (None, None) => {}
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_print_ingredients() {
        let mut out = Vec::new();
        print_ingredients(
            &mut out,
            &[
                Ingredient::new("apples", "2", "pounds"),
                Ingredient::new("flour", "500", "g"),
            ],
        )
        .unwrap();

        let text = String::from_utf8(out).unwrap();
        assert!(text.starts_with("Ingredients (2):"));
        assert!(text.contains("  - apples 2 pounds\n"));
    }

    #[test]
    fn test_print_empty_list() {
        let mut out = Vec::new();
        print_ingredients(&mut out, &[]).unwrap();
        assert_eq!(String::from_utf8(out).unwrap(), "No ingredients stored.\n");
    }
}
