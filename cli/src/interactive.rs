//! Menu-driven session over any line-based input.

use std::io::{BufRead, Write};

use anyhow::Result;
use larder_core::{Ingredient, RecipeManager, Submission};

use crate::output;

const MENU: &str =
    "Continue? (1 or blank: add an item, 2: submit recipe, 3: remove an item, 4: remove all items, q: quit)";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Action {
    Add,
    Submit,
    Remove,
    RemoveAll,
    Quit,
}

impl Action {
    fn from_input(input: &str) -> Option<Self> {
        match input.trim() {
            "" | "1" => Some(Action::Add),
            "2" => Some(Action::Submit),
            "3" => Some(Action::Remove),
            "4" => Some(Action::RemoveAll),
            "q" | "Q" | "quit" | "exit" => Some(Action::Quit),
            _ => None,
        }
    }
}

pub struct Session<'a, R, W> {
    manager: &'a RecipeManager,
    input: R,
    output: W,
    markdown: bool,
}

impl<'a, R: BufRead, W: Write> Session<'a, R, W> {
    pub fn new(manager: &'a RecipeManager, input: R, output: W, markdown: bool) -> Self {
        Self {
            manager,
            input,
            output,
            markdown,
        }
    }

    /// Print `question` and read one line. `None` at end of input.
    fn ask(&mut self, question: &str) -> Result<Option<String>> {
        write!(self.output, "{} ", question)?;
        self.output.flush()?;

        let mut line = String::new();
        if self.input.read_line(&mut line)? == 0 {
            return Ok(None);
        }
        Ok(Some(line.trim_end_matches(['\r', '\n']).to_string()))
    }

    pub async fn run(&mut self) -> Result<()> {
        let Some(answer) =
            self.ask("Delete the stored ingredient list first? (1: delete, blank: keep)")?
        else {
            return Ok(());
        };
        if answer.trim() == "1" {
            self.manager.store().clear()?;
            writeln!(self.output, "Ingredient list cleared.")?;
        }

        loop {
            let Some(choice) = self.ask(MENU)? else {
                return Ok(());
            };

            let Some(action) = Action::from_input(&choice) else {
                writeln!(
                    self.output,
                    "Error: invalid choice '{}'. Enter blank, 1, 2, 3, 4 or q.",
                    choice.trim()
                )?;
                continue;
            };

            let result = match action {
                Action::Quit => return Ok(()),
                Action::Add => self.add_item(),
                Action::Remove => self.remove_item(),
                Action::RemoveAll => self.remove_all(),
                Action::Submit => self.submit().await,
            };

            match result {
                Ok(true) => {}
                Ok(false) => return Ok(()),
                Err(e) => {
                    tracing::warn!(action = ?action, error = %e, "menu action failed");
                    writeln!(self.output, "Error: {:#}", e)?;
                }
            }
        }
    }

    // Each action returns Ok(false) when input ran out mid-action.

    fn add_item(&mut self) -> Result<bool> {
        let Some(raw) =
            self.ask("Enter the name, quantity and unit of the item (e.g. apples-2-pounds):")?
        else {
            return Ok(false);
        };
        let ingredient: Ingredient = raw.parse()?;
        self.manager.store().add(ingredient.clone())?;
        writeln!(self.output, "Added {}.", ingredient)?;
        Ok(true)
    }

    fn remove_item(&mut self) -> Result<bool> {
        let Some(name) = self.ask("Enter the name of the item to remove:")? else {
            return Ok(false);
        };
        let removed = self.manager.store().remove(name.trim())?;
        if removed == 0 {
            writeln!(self.output, "No item named '{}'.", name.trim())?;
        } else {
            writeln!(self.output, "Removed {}.", name.trim())?;
        }
        Ok(true)
    }

    fn remove_all(&mut self) -> Result<bool> {
        self.manager.store().clear()?;
        writeln!(self.output, "Ingredient list cleared.")?;
        Ok(true)
    }

    async fn submit(&mut self) -> Result<bool> {
        let Some(instructions) = self.ask(
            "Instructions for the recipe (dish type, cuisine, allergies, servings, time limit...). Leave blank for none:",
        )?
        else {
            return Ok(false);
        };

        let is_strict = loop {
            let Some(answer) = self.ask("Use only the listed ingredients? (yes/no)")? else {
                return Ok(false);
            };
            match answer.trim().to_ascii_lowercase().as_str() {
                "yes" | "y" => break true,
                "no" | "n" => break false,
                other => writeln!(self.output, "Please enter 'yes' or 'no', not '{}'.", other)?,
            }
        };

        writeln!(self.output, "Asking for a recipe...")?;
        let submission = Submission {
            instructions: instructions.trim().to_string(),
            is_strict,
            generate_image: true,
        };
        let outcome = self.manager.submit(&submission).await?;
        output::print_outcome(&mut self.output, &outcome, self.markdown)?;
        Ok(true)
    }
}
