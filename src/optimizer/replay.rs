//! Warehouse answering from recorded rows instead of a live connection.
//!
//! Responses are matched by substring against the substituted SQL, first
//! match wins. Queries matching nothing return no rows. Useful for running
//! the engine offline and for tests.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use parking_lot::Mutex;
use serde::Deserialize;
use serde_json::Value;
use thiserror::Error;

use super::runner::{Warehouse, WarehouseError, WarehouseResult};

#[derive(Debug, Error)]
pub enum ReplayError {
    #[error("Failed to read replay file {1}: {0}")]
    Io(#[source] std::io::Error, PathBuf),

    #[error("Invalid replay file: {0}")]
    Parse(#[from] serde_json::Error),
}

/// One recorded answer.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ReplayEntry {
    /// Substring the SQL must contain.
    #[serde(rename = "match")]
    pub needle: String,
    #[serde(default)]
    pub rows: Vec<Value>,
    /// When set, the query fails with this message instead of returning rows.
    #[serde(default)]
    pub error: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ReplayWarehouse {
    #[serde(default)]
    responses: Vec<ReplayEntry>,
    #[serde(skip)]
    seen: Mutex<Vec<String>>,
}

impl ReplayWarehouse {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load recorded responses from a JSON file of the form
    /// `{"responses": [{"match": "...", "rows": [...]}]}`.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ReplayError> {
        let path = path.as_ref();
        let content =
            std::fs::read_to_string(path).map_err(|e| ReplayError::Io(e, path.to_path_buf()))?;
        Self::from_json(&content)
    }

    pub fn from_json(content: &str) -> Result<Self, ReplayError> {
        Ok(serde_json::from_str(content)?)
    }

    pub fn respond(mut self, needle: &str, rows: Vec<Value>) -> Self {
        self.responses.push(ReplayEntry {
            needle: needle.to_string(),
            rows,
            error: None,
        });
        self
    }

    pub fn fail(mut self, needle: &str, message: &str) -> Self {
        self.responses.push(ReplayEntry {
            needle: needle.to_string(),
            rows: Vec::new(),
            error: Some(message.to_string()),
        });
        self
    }

    /// Every SQL text received so far, in arrival order.
    pub fn queries(&self) -> Vec<String> {
        self.seen.lock().clone()
    }
}

#[async_trait]
impl Warehouse for ReplayWarehouse {
    async fn query(&self, sql: &str, _location: &str) -> WarehouseResult<Vec<Value>> {
        self.seen.lock().push(sql.to_string());

        let Some(entry) = self.responses.iter().find(|e| sql.contains(e.needle.as_str())) else {
            tracing::debug!("No recorded response matched, returning no rows");
            return Ok(Vec::new());
        };
        match &entry.error {
            Some(message) => Err(WarehouseError(message.clone())),
            None => Ok(entry.rows.clone()),
        }
    }
}
