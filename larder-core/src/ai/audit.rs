//! Append-only JSON-lines logs for requests, responses and generated images.

use std::fs::{self, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

use super::types::{CompletionRequest, Usage};

/// One line of an audit log: the record plus the time it was written.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogEntry<T> {
    pub recorded_at: DateTime<Utc>,
    #[serde(flatten)]
    pub record: T,
}

/// Outgoing request, written before the backend is called.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RequestRecord {
    pub backend: String,
    pub request: CompletionRequest,
}

/// Successful backend response, written before it is handed to the caller.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResponseRecord {
    pub backend: String,
    pub model: String,
    /// Attempts it took to get this response.
    pub attempts: u32,
    /// Raw backend payload.
    pub payload: JsonValue,
}

impl ResponseRecord {
    /// Token usage reported by the backend, if any.
    pub fn usage(&self) -> Option<Usage> {
        self.payload
            .get("usage")
            .and_then(|usage| serde_json::from_value(usage.clone()).ok())
    }
}

/// Reference to a downloaded image asset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImageRecord {
    pub prompt: String,
    pub url: String,
    pub filename: String,
    /// Where the asset was saved; absent when the download failed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<PathBuf>,
}

/// A JSON-lines file that is only ever appended to.
#[derive(Debug, Clone)]
pub struct AuditLog {
    path: PathBuf,
}

impl AuditLog {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append one record, stamped with the current time, as a single line.
    pub fn append<T: Serialize>(&self, record: &T) -> io::Result<()> {
        let entry = LogEntry {
            recorded_at: Utc::now(),
            record,
        };

        let mut line = serde_json::to_string(&entry)
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
        line.push('\n');

        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        file.write_all(line.as_bytes())?;
        file.flush()
    }

    /// Read every entry back. A missing log has no entries.
    pub fn entries<T: DeserializeOwned>(&self) -> io::Result<Vec<LogEntry<T>>> {
        let content = match fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e),
        };

        content
            .lines()
            .filter(|line| !line.trim().is_empty())
            .map(|line| {
                serde_json::from_str(line).map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::TempDir;

    #[test]
    fn test_append_writes_one_line_per_record() {
        let temp_dir = TempDir::new().unwrap();
        let log = AuditLog::new(temp_dir.path().join("logs/responses.jsonl"));

        for attempts in 1..=3 {
            log.append(&ResponseRecord {
                backend: "fake".to_string(),
                model: "gpt-4o-mini".to_string(),
                attempts,
                payload: json!({"choices": []}),
            })
            .unwrap();
        }

        let content = fs::read_to_string(log.path()).unwrap();
        assert_eq!(content.lines().count(), 3);

        let entries: Vec<LogEntry<ResponseRecord>> = log.entries().unwrap();
        let attempts: Vec<u32> = entries.iter().map(|e| e.record.attempts).collect();
        assert_eq!(attempts, vec![1, 2, 3]);
    }

    #[test]
    fn test_entries_are_flattened_with_timestamp() {
        let temp_dir = TempDir::new().unwrap();
        let log = AuditLog::new(temp_dir.path().join("images.jsonl"));
        log.append(&json!({"url": "https://example.test/a.png"}))
            .unwrap();

        let line = fs::read_to_string(log.path()).unwrap();
        let value: JsonValue = serde_json::from_str(line.trim()).unwrap();
        assert!(value.get("recorded_at").is_some());
        assert_eq!(value["url"], "https://example.test/a.png");
    }

    #[test]
    fn test_missing_log_is_empty() {
        let temp_dir = TempDir::new().unwrap();
        let log = AuditLog::new(temp_dir.path().join("requests.jsonl"));

        let entries: Vec<LogEntry<JsonValue>> = log.entries().unwrap();
        assert!(entries.is_empty());
    }

    #[test]
    fn test_response_usage() {
        let mut record = ResponseRecord {
            backend: "openai".to_string(),
            model: "gpt-4o-mini".to_string(),
            attempts: 1,
            payload: json!({"usage": {"prompt_tokens": 120, "completion_tokens": 80, "total_tokens": 200}}),
        };
        let usage = record.usage().unwrap();
        assert_eq!(usage.prompt_tokens, 120);
        assert_eq!(usage.total_tokens, 200);

        record.payload = json!({"choices": []});
        assert!(record.usage().is_none());
    }
}
