use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::warn;

pub const SEARCH_HISTORY_CAPACITY: usize = 20;

#[derive(Debug, Error)]
pub enum HistoryError {
    #[error("failed to write search history: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to encode search history: {0}")]
    Encode(#[from] serde_json::Error),
}

/// Recent queries, oldest first. Re-adding a query moves it to the end.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchHistory {
    path: PathBuf,
    entries: Vec<String>,
}

impl SearchHistory {
    /// Loads the stored history. A missing or unreadable file starts empty.
    pub fn load(path: &Path) -> Self {
        let entries = match std::fs::read_to_string(path) {
            Ok(raw) => serde_json::from_str::<Vec<String>>(&raw).unwrap_or_else(|error| {
                warn!(path = %path.display(), %error, "discarding corrupt search history");
                Vec::new()
            }),
            Err(_) => Vec::new(),
        };
        let mut history = Self {
            path: path.to_path_buf(),
            entries: Vec::new(),
        };
        for entry in entries {
            history.push(&entry);
        }
        history
    }

    /// Records `query` and persists. Blank queries are ignored and return `Ok(false)`.
    pub fn record(&mut self, query: &str) -> Result<bool, HistoryError> {
        if !self.push(query) {
            return Ok(false);
        }
        self.save()?;
        Ok(true)
    }

    pub fn entries(&self) -> &[String] {
        &self.entries
    }

    pub fn recent_first(&self) -> Vec<String> {
        self.entries.iter().rev().cloned().collect()
    }

    pub fn clear(&mut self) -> Result<(), HistoryError> {
        self.entries.clear();
        match std::fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(error) if error.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(error) => Err(error.into()),
        }
    }

    fn push(&mut self, query: &str) -> bool {
        let query = query.trim();
        if query.is_empty() {
            return false;
        }
        self.entries.retain(|existing| existing != query);
        self.entries.push(query.to_string());
        if self.entries.len() > SEARCH_HISTORY_CAPACITY {
            let overflow = self.entries.len() - SEARCH_HISTORY_CAPACITY;
            self.entries.drain(..overflow);
        }
        true
    }

    fn save(&self) -> Result<(), HistoryError> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let encoded = serde_json::to_string(&self.entries)?;
        std::fs::write(&self.path, encoded)?;
        Ok(())
    }
}
