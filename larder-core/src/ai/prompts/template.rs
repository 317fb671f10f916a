//! Loading template fragments from disk.

use std::fs;
use std::io;
use std::path::PathBuf;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum TemplateError {
    #[error("Template fragment '{name}' not found at {path}")]
    TemplateMissing { name: String, path: PathBuf },

    #[error("Failed to read template fragment {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// Reads `<name>.txt` fragments from a base directory.
#[derive(Debug, Clone)]
pub struct TemplateLoader {
    base_dir: PathBuf,
}

impl TemplateLoader {
    pub fn new(base_dir: impl Into<PathBuf>) -> Self {
        Self {
            base_dir: base_dir.into(),
        }
    }

    pub fn fragment_path(&self, name: &str) -> PathBuf {
        self.base_dir.join(format!("{}.txt", name))
    }

    /// Read a single fragment verbatim.
    pub fn load_fragment(&self, name: &str) -> Result<String, TemplateError> {
        let path = self.fragment_path(name);
        fs::read_to_string(&path).map_err(|source| {
            if source.kind() == io::ErrorKind::NotFound {
                TemplateError::TemplateMissing {
                    name: name.to_string(),
                    path,
                }
            } else {
                TemplateError::Read { path, source }
            }
        })
    }

    /// Read fragments in the given order and join them with a blank line.
    ///
    /// The first missing fragment aborts the load: role tags in later fragments
    /// would otherwise attach to the wrong turn.
    pub fn load<S: AsRef<str>>(&self, fragment_names: &[S]) -> Result<String, TemplateError> {
        let fragments = fragment_names
            .iter()
            .map(|name| self.load_fragment(name.as_ref()))
            .collect::<Result<Vec<_>, _>>()?;

        tracing::debug!(
            base_dir = %self.base_dir.display(),
            fragments = fragments.len(),
            "loaded template"
        );
        Ok(fragments.join("\n\n"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn write_fragment(dir: &TempDir, name: &str, content: &str) {
        fs::write(dir.path().join(format!("{}.txt", name)), content).unwrap();
    }

    #[test]
    fn test_load_in_given_order() {
        let temp_dir = TempDir::new().unwrap();
        write_fragment(&temp_dir, "a", "[system] first");
        write_fragment(&temp_dir, "b", "[user] second");

        let loader = TemplateLoader::new(temp_dir.path());
        assert_eq!(loader.load(&["a", "b"]).unwrap(), "[system] first\n\n[user] second");
        assert_eq!(loader.load(&["b", "a"]).unwrap(), "[user] second\n\n[system] first");
    }

    #[test]
    fn test_missing_fragment_is_fatal() {
        let temp_dir = TempDir::new().unwrap();
        write_fragment(&temp_dir, "a", "[system] first");

        let loader = TemplateLoader::new(temp_dir.path());
        let err = loader.load(&["a", "missing", "b"]).unwrap_err();

        match err {
            TemplateError::TemplateMissing { name, path } => {
                assert_eq!(name, "missing");
                assert!(path.ends_with("missing.txt"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_fragments_are_verbatim() {
        let temp_dir = TempDir::new().unwrap();
        write_fragment(&temp_dir, "a", "  indented\ntrailing  \n");

        let loader = TemplateLoader::new(temp_dir.path());
        assert_eq!(loader.load_fragment("a").unwrap(), "  indented\ntrailing  \n");
    }

    #[test]
    fn test_empty_order_is_empty_template() {
        let temp_dir = TempDir::new().unwrap();
        let loader = TemplateLoader::new(temp_dir.path());
        assert_eq!(loader.load::<&str>(&[]).unwrap(), "");
    }
}
