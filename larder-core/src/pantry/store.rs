//! File-backed ingredient list.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use super::{Ingredient, IngredientError};

/// Ingredient list persisted as a single JSON array.
///
/// Every mutation rewrites the whole file (temp file + rename), so a reader never
/// sees a half-written list. Names are unique within the list.
#[derive(Debug, Clone)]
pub struct IngredientStore {
    path: PathBuf,
}

/// On-disk element. Older files stored each ingredient as a JSON-encoded string.
#[derive(Deserialize)]
#[serde(untagged)]
enum StoredIngredient {
    Record(Ingredient),
    Encoded(String),
}

impl IngredientStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read the persisted list. A missing or empty file is an empty list.
    pub fn list(&self) -> Result<Vec<Ingredient>, IngredientError> {
        let content = match fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(self.io_error(e)),
        };

        if content.trim().is_empty() {
            return Ok(Vec::new());
        }

        let stored: Vec<StoredIngredient> =
            serde_json::from_str(&content).map_err(|e| self.corrupt(e))?;

        stored
            .into_iter()
            .map(|item| match item {
                StoredIngredient::Record(ingredient) => Ok(ingredient),
                StoredIngredient::Encoded(json) => {
                    serde_json::from_str(&json).map_err(|e| self.corrupt(e))
                }
            })
            .collect()
    }

    /// Append an ingredient, failing if its name is already present.
    pub fn add(&self, ingredient: Ingredient) -> Result<(), IngredientError> {
        let mut list = self.list()?;

        if list.iter().any(|i| i.name == ingredient.name) {
            return Err(IngredientError::AlreadyExists(ingredient.name));
        }

        tracing::debug!(name = %ingredient.name, path = %self.path.display(), "adding ingredient");
        list.push(ingredient);
        self.write(&list)
    }

    /// Remove every ingredient with this name. Returns how many were removed.
    pub fn remove(&self, name: &str) -> Result<usize, IngredientError> {
        let mut list = self.list()?;
        let before = list.len();
        list.retain(|i| i.name != name);
        let removed = before - list.len();

        tracing::debug!(name, removed, "removing ingredient");
        self.write(&list)?;
        Ok(removed)
    }

    /// Persist an empty list.
    pub fn clear(&self) -> Result<(), IngredientError> {
        tracing::debug!(path = %self.path.display(), "clearing ingredient list");
        self.write(&[])
    }

    fn write(&self, list: &[Ingredient]) -> Result<(), IngredientError> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).map_err(|e| self.io_error(e))?;
            }
        }

        let json = serde_json::to_string_pretty(list).map_err(|e| self.corrupt(e))?;

        let tmp_path = self.path.with_extension("json.tmp");
        fs::write(&tmp_path, json).map_err(|e| self.io_error(e))?;
        fs::rename(&tmp_path, &self.path).map_err(|e| self.io_error(e))
    }

    fn io_error(&self, source: io::Error) -> IngredientError {
        IngredientError::Io {
            path: self.path.clone(),
            source,
        }
    }

    fn corrupt(&self, source: serde_json::Error) -> IngredientError {
        IngredientError::Corrupt {
            path: self.path.clone(),
            source,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn store_in(dir: &TempDir) -> IngredientStore {
        IngredientStore::new(dir.path().join("items.json"))
    }

    #[test]
    fn test_list_without_file_is_empty() {
        let temp_dir = TempDir::new().unwrap();
        let store = store_in(&temp_dir);
        assert!(store.list().unwrap().is_empty());
    }

    #[test]
    fn test_add_then_list() {
        let temp_dir = TempDir::new().unwrap();
        let store = store_in(&temp_dir);

        let egg = Ingredient::parse("egg-2-pcs").unwrap();
        store.add(egg.clone()).unwrap();

        let list = store.list().unwrap();
        assert_eq!(list, vec![egg]);
    }

    #[test]
    fn test_add_duplicate_name_fails() {
        let temp_dir = TempDir::new().unwrap();
        let store = store_in(&temp_dir);

        store.add(Ingredient::new("egg", "2", "pcs")).unwrap();
        let err = store.add(Ingredient::new("egg", "6", "pcs")).unwrap_err();

        assert!(matches!(err, IngredientError::AlreadyExists(ref name) if name == "egg"));
        let list = store.list().unwrap();
        assert_eq!(list.len(), 1);
        assert_eq!(list[0].quantity, "2");
    }

    #[test]
    fn test_names_are_case_sensitive() {
        let temp_dir = TempDir::new().unwrap();
        let store = store_in(&temp_dir);

        store.add(Ingredient::new("Egg", "2", "pcs")).unwrap();
        store.add(Ingredient::new("egg", "1", "pcs")).unwrap();

        let names: Vec<String> = store.list().unwrap().into_iter().map(|i| i.name).collect();
        assert_eq!(names, vec!["Egg", "egg"]);
    }

    #[test]
    fn test_insertion_order_preserved() {
        let temp_dir = TempDir::new().unwrap();
        let store = store_in(&temp_dir);

        for raw in ["flour-2-cups", "sugar-1-cup", "butter-100-g"] {
            store.add(Ingredient::parse(raw).unwrap()).unwrap();
        }

        let names: Vec<String> = store.list().unwrap().into_iter().map(|i| i.name).collect();
        assert_eq!(names, vec!["flour", "sugar", "butter"]);
    }

    #[test]
    fn test_remove_missing_name_is_not_an_error() {
        let temp_dir = TempDir::new().unwrap();
        let store = store_in(&temp_dir);

        store.add(Ingredient::new("egg", "2", "pcs")).unwrap();
        assert_eq!(store.remove("milk").unwrap(), 0);
        assert_eq!(store.remove("egg").unwrap(), 1);
        assert!(store.list().unwrap().is_empty());
    }

    #[test]
    fn test_clear_persists_empty_array() {
        let temp_dir = TempDir::new().unwrap();
        let store = store_in(&temp_dir);

        store.add(Ingredient::new("egg", "2", "pcs")).unwrap();
        store.clear().unwrap();

        assert!(store.list().unwrap().is_empty());
        let content = fs::read_to_string(store.path()).unwrap();
        assert_eq!(content.trim(), "[]");
    }

    #[test]
    fn test_reads_legacy_string_encoded_items() {
        let temp_dir = TempDir::new().unwrap();
        let store = store_in(&temp_dir);

        let legacy = serde_json::json!([
            "{\"name\": \"apples\", \"quantity\": \"2\", \"unit_of_measure\": \"pounds\"}"
        ]);
        fs::write(store.path(), legacy.to_string()).unwrap();

        let list = store.list().unwrap();
        assert_eq!(list, vec![Ingredient::new("apples", "2", "pounds")]);

        // The next write migrates the file to plain records.
        store.add(Ingredient::new("pears", "3", "pcs")).unwrap();
        let content: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(store.path()).unwrap()).unwrap();
        assert_eq!(content[0]["name"], "apples");
    }

    #[test]
    fn test_corrupt_file_is_reported() {
        let temp_dir = TempDir::new().unwrap();
        let store = store_in(&temp_dir);
        fs::write(store.path(), "{not json").unwrap();

        assert!(matches!(
            store.list().unwrap_err(),
            IngredientError::Corrupt { .. }
        ));
    }

    #[test]
    fn test_creates_parent_directories() {
        let temp_dir = TempDir::new().unwrap();
        let store = IngredientStore::new(temp_dir.path().join("nested/dir/items.json"));

        store.add(Ingredient::new("egg", "2", "pcs")).unwrap();
        assert!(store.path().exists());
    }
}
