//! Per-customer candidate lists.
//!
//! Each customer's list lives in its own JSON file (`<lists_dir>/<customer>.json`,
//! a plain array of strings). Uploading a list replaces the file wholesale.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use crate::error::{AppError, StoreError};
use crate::memory::types::CandidateList;

/// Storage contract for candidate lists. Synchronous, like [`super::store::MappingStore`].
pub trait CandidateStore: Send + Sync {
    fn get(&self, customer_id: &str) -> Result<Option<CandidateList>, StoreError>;

    /// Replace the customer's list. Never merges with the previous one.
    fn replace(&self, customer_id: &str, list: &CandidateList) -> Result<(), StoreError>;
}

/// Directory of `<customer>.json` files.
pub struct JsonDirCandidateStore {
    dir: PathBuf,
}

impl JsonDirCandidateStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Callers must pass an id that passed [`super::validate_customer_id`].
    pub fn path_for(&self, customer_id: &str) -> PathBuf {
        self.dir.join(format!("{customer_id}.json"))
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

impl CandidateStore for JsonDirCandidateStore {
    fn get(&self, customer_id: &str) -> Result<Option<CandidateList>, StoreError> {
        let path = self.path_for(customer_id);
        let contents = match std::fs::read_to_string(&path) {
            Ok(c) => c,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(StoreError::io(&path, e)),
        };
        let items: Vec<String> =
            serde_json::from_str(&contents).map_err(|e| StoreError::Corrupt {
                path: path.display().to_string(),
                reason: e.to_string(),
            })?;
        Ok(Some(CandidateList::new(items)))
    }

    fn replace(&self, customer_id: &str, list: &CandidateList) -> Result<(), StoreError> {
        std::fs::create_dir_all(&self.dir).map_err(|e| StoreError::io(&self.dir, e))?;
        let path = self.path_for(customer_id);
        let tmp_path = path.with_extension("json.tmp");
        let json = serde_json::to_string_pretty(list)?;
        std::fs::write(&tmp_path, json).map_err(|e| StoreError::io(&tmp_path, e))?;
        std::fs::rename(&tmp_path, &path).map_err(|e| StoreError::io(&path, e))?;
        tracing::info!(customer_id, items = list.len(), path = %path.display(), "candidate list replaced");
        Ok(())
    }
}

#[derive(Default)]
pub struct InMemoryCandidateStore {
    lists: Mutex<HashMap<String, CandidateList>>,
}

impl InMemoryCandidateStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl CandidateStore for InMemoryCandidateStore {
    fn get(&self, customer_id: &str) -> Result<Option<CandidateList>, StoreError> {
        let lists = self.lists.lock().unwrap_or_else(|e| e.into_inner());
        Ok(lists.get(customer_id).cloned())
    }

    fn replace(&self, customer_id: &str, list: &CandidateList) -> Result<(), StoreError> {
        let mut lists = self.lists.lock().unwrap_or_else(|e| e.into_inner());
        lists.insert(customer_id.to_string(), list.clone());
        Ok(())
    }
}

/// Parse an uploaded list body: a JSON array of strings.
pub fn parse_list(bytes: &[u8]) -> Result<Vec<String>, AppError> {
    let value: serde_json::Value =
        serde_json::from_slice(bytes).map_err(|_| AppError::input("Invalid JSON format."))?;
    let serde_json::Value::Array(values) = value else {
        return Err(AppError::input("JSON root must be a list."));
    };
    values
        .into_iter()
        .map(|v| match v {
            serde_json::Value::String(s) => Ok(s),
            _ => Err(AppError::input("Every list item must be a string.")),
        })
        .collect()
}
