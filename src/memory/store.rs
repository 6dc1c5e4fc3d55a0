//! Confirmed-mapping store.
//!
//! [`MappingStore`] is the load/save contract the rest of the crate depends on.
//! [`JsonFileStore`] keeps every customer's mappings in one JSON document that is
//! read in full on each lookup and rewritten in full (temp file + rename) on each
//! save. [`InMemoryStore`] implements the same contract for tests and library callers.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use crate::error::StoreError;
use crate::memory::normalize;
use crate::memory::types::{ConfirmedMapping, MappingEntry, SaveOutcome};

/// One customer's mappings, keyed by normalized invoice item text.
pub type CustomerMappings = BTreeMap<String, MappingEntry>;

/// The whole memory document: customer id -> normalized text -> entry.
pub type MemoryFile = BTreeMap<String, CustomerMappings>;

/// Load/save contract for confirmed mappings.
///
/// All methods are synchronous; async callers should use
/// `tokio::task::spawn_blocking`.
pub trait MappingStore: Send + Sync {
    /// All mappings of one customer. Unknown customers yield an empty map.
    fn load(&self, customer_id: &str) -> Result<CustomerMappings, StoreError>;

    /// Look up one normalized key. `Ok(None)` means unknown; a mapping whose
    /// target is `None` is an explicit no-match.
    fn lookup(
        &self,
        customer_id: &str,
        normalized: &str,
    ) -> Result<Option<ConfirmedMapping>, StoreError> {
        Ok(self
            .load(customer_id)?
            .remove(normalized)
            .map(|entry| entry.into_mapping(customer_id, normalized)))
    }

    /// Store a mapping, replacing any previous decision for the same key.
    fn save(&self, mapping: &ConfirmedMapping) -> Result<SaveOutcome, StoreError>;

    /// Remove one mapping. Returns `true` if it existed.
    fn remove(&self, customer_id: &str, normalized: &str) -> Result<bool, StoreError>;

    /// Customer ids that have at least one mapping.
    fn customers(&self) -> Result<Vec<String>, StoreError>;
}

/// Insert `mapping` into `file`, reporting whether anything changed.
fn apply_save(file: &mut MemoryFile, mapping: &ConfirmedMapping) -> SaveOutcome {
    let customer = file.entry(mapping.customer_id.clone()).or_default();
    match customer.get(&mapping.normalized) {
        Some(existing) if existing.target == mapping.target => SaveOutcome::Unchanged,
        Some(_) => {
            customer.insert(mapping.normalized.clone(), MappingEntry::from(mapping));
            SaveOutcome::Updated
        }
        None => {
            customer.insert(mapping.normalized.clone(), MappingEntry::from(mapping));
            SaveOutcome::Created
        }
    }
}

fn apply_remove(file: &mut MemoryFile, customer_id: &str, normalized: &str) -> bool {
    let Some(customer) = file.get_mut(customer_id) else {
        return false;
    };
    let removed = customer.remove(normalized).is_some();
    if customer.is_empty() {
        file.remove(customer_id);
    }
    removed
}

/// Parse a memory document.
///
/// Besides the customer-keyed format this accepts the older single-tenant
/// layout, a flat `{"invoice text": "target" | null}` object, and files it
/// under `legacy_customer`.
pub fn parse_memory_file(
    value: serde_json::Value,
    legacy_customer: &str,
    path: &Path,
) -> Result<MemoryFile, StoreError> {
    let corrupt = |reason: String| StoreError::Corrupt {
        path: path.display().to_string(),
        reason,
    };

    let serde_json::Value::Object(map) = value else {
        return Err(corrupt("top-level value is not an object".into()));
    };

    let is_legacy = !map.is_empty()
        && map
            .values()
            .all(|v| v.is_string() || v.is_null());

    if is_legacy {
        let mut customer = CustomerMappings::new();
        for (text, target) in map {
            let key = normalize(&text);
            if key.is_empty() {
                continue;
            }
            customer.insert(
                key,
                MappingEntry {
                    invoice_item: text,
                    target: target.as_str().map(str::to_string),
                    confirmed_at: String::new(),
                },
            );
        }
        let mut file = MemoryFile::new();
        if !customer.is_empty() {
            file.insert(legacy_customer.to_string(), customer);
        }
        return Ok(file);
    }

    serde_json::from_value(serde_json::Value::Object(map)).map_err(|e| corrupt(e.to_string()))
}

/// File-backed store: a single JSON document shared by all customers.
pub struct JsonFileStore {
    path: PathBuf,
    legacy_customer: String,
    // Serializes read-modify-write cycles within this process. Other processes
    // writing the same file still race (last write wins).
    write_lock: Mutex<()>,
}

impl JsonFileStore {
    pub fn new(path: impl Into<PathBuf>, legacy_customer: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            legacy_customer: legacy_customer.into(),
            write_lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read and parse the whole file. A missing or blank file is an empty store.
    pub fn read_file(&self) -> Result<MemoryFile, StoreError> {
        let contents = match std::fs::read_to_string(&self.path) {
            Ok(c) => c,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(MemoryFile::new()),
            Err(e) => return Err(StoreError::io(&self.path, e)),
        };
        if contents.trim().is_empty() {
            return Ok(MemoryFile::new());
        }
        let value: serde_json::Value =
            serde_json::from_str(&contents).map_err(|e| StoreError::Corrupt {
                path: self.path.display().to_string(),
                reason: e.to_string(),
            })?;
        parse_memory_file(value, &self.legacy_customer, &self.path)
    }

    /// Atomically replace the file contents (write temp file, then rename).
    fn write_file(&self, file: &MemoryFile) -> Result<(), StoreError> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).map_err(|e| StoreError::io(parent, e))?;
            }
        }
        let json = serde_json::to_string_pretty(file)?;
        let tmp_path = self.path.with_extension("json.tmp");
        std::fs::write(&tmp_path, json).map_err(|e| StoreError::io(&tmp_path, e))?;
        std::fs::rename(&tmp_path, &self.path).map_err(|e| StoreError::io(&self.path, e))?;
        Ok(())
    }

    /// Read the file for a write. A corrupt file is moved aside and replaced
    /// by an empty document instead of failing the write.
    fn read_for_write(&self) -> Result<MemoryFile, StoreError> {
        match self.read_file() {
            Err(StoreError::Corrupt { reason, .. }) => {
                let stamp = chrono::Utc::now().format("%Y%m%dT%H%M%S");
                let mut backup = self.path.clone().into_os_string();
                backup.push(format!(".corrupt-{stamp}"));
                let backup = PathBuf::from(backup);
                std::fs::rename(&self.path, &backup).map_err(|e| StoreError::io(&self.path, e))?;
                tracing::warn!(
                    path = %self.path.display(),
                    backup = %backup.display(),
                    reason = %reason,
                    "mapping file was corrupt; moved aside and starting empty"
                );
                Ok(MemoryFile::new())
            }
            other => other,
        }
    }
}

impl MappingStore for JsonFileStore {
    fn load(&self, customer_id: &str) -> Result<CustomerMappings, StoreError> {
        Ok(self.read_file()?.remove(customer_id).unwrap_or_default())
    }

    fn save(&self, mapping: &ConfirmedMapping) -> Result<SaveOutcome, StoreError> {
        let _guard = self.write_lock.lock().unwrap_or_else(|e| e.into_inner());
        let mut file = self.read_for_write()?;
        let outcome = apply_save(&mut file, mapping);
        if outcome != SaveOutcome::Unchanged {
            self.write_file(&file)?;
        }
        tracing::info!(
            customer_id = %mapping.customer_id,
            invoice_item = %mapping.invoice_item,
            list_item = ?mapping.target,
            outcome = ?outcome,
            "saved mapping"
        );
        Ok(outcome)
    }

    fn remove(&self, customer_id: &str, normalized: &str) -> Result<bool, StoreError> {
        let _guard = self.write_lock.lock().unwrap_or_else(|e| e.into_inner());
        let mut file = self.read_for_write()?;
        let removed = apply_remove(&mut file, customer_id, normalized);
        if removed {
            self.write_file(&file)?;
            tracing::info!(customer_id, normalized, "removed mapping");
        }
        Ok(removed)
    }

    fn customers(&self) -> Result<Vec<String>, StoreError> {
        Ok(self.read_file()?.into_keys().collect())
    }
}

/// Process-local store with the same semantics as [`JsonFileStore`].
#[derive(Default)]
pub struct InMemoryStore {
    inner: Mutex<MemoryFile>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn with_file<T>(&self, f: impl FnOnce(&mut MemoryFile) -> T) -> T {
        let mut guard = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        f(&mut guard)
    }

    /// Snapshot of everything stored, for assertions.
    pub fn snapshot(&self) -> MemoryFile {
        self.with_file(|file| file.clone())
    }
}

impl MappingStore for InMemoryStore {
    fn load(&self, customer_id: &str) -> Result<CustomerMappings, StoreError> {
        Ok(self.with_file(|file| file.get(customer_id).cloned().unwrap_or_default()))
    }

    fn save(&self, mapping: &ConfirmedMapping) -> Result<SaveOutcome, StoreError> {
        Ok(self.with_file(|file| apply_save(file, mapping)))
    }

    fn remove(&self, customer_id: &str, normalized: &str) -> Result<bool, StoreError> {
        Ok(self.with_file(|file| apply_remove(file, customer_id, normalized)))
    }

    fn customers(&self) -> Result<Vec<String>, StoreError> {
        Ok(self.with_file(|file| file.keys().cloned().collect()))
    }
}
