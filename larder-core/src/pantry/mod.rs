//! The user's pantry: ingredient values and their file-backed store.
//!
//! Ingredients enter the system as `name-quantity-unit` strings typed by the user
//! (e.g. `apples-2-pounds`). They are parsed into [`Ingredient`] before they ever
//! reach the [`IngredientStore`], which keeps at most one entry per name.

mod ingredient;
mod store;

pub use ingredient::{verify_format, Ingredient};
pub use store::IngredientStore;

use std::path::PathBuf;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum IngredientError {
    #[error("Invalid ingredient format '{input}': {reason}")]
    InvalidFormat { input: String, reason: &'static str },

    #[error("Ingredient '{0}' is already in the list")]
    AlreadyExists(String),

    #[error("Failed to access ingredient file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Ingredient file {path} is not a valid ingredient list: {source}")]
    Corrupt {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}
