//! Confirmed-mapping and candidate-list types.
//!
//! A [`ConfirmedMapping`] is the unit of memory: one user decision about one
//! invoice item text for one customer. A target of `None` is an explicit
//! "no match", which is different from the item being unknown.

use indexmap::IndexSet;
use serde::{Deserialize, Serialize};

/// A persisted, user-approved mapping.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfirmedMapping {
    pub customer_id: String,
    /// The invoice item text as it was confirmed.
    pub invoice_item: String,
    /// Lookup key derived with [`super::normalize`].
    pub normalized: String,
    /// Candidate the item maps to, or `None` for an explicit no-match.
    pub target: Option<String>,
    /// RFC 3339 timestamp of the confirmation.
    pub confirmed_at: String,
}

impl ConfirmedMapping {
    pub fn new(customer_id: &str, invoice_item: &str, target: Option<String>) -> Self {
        Self {
            customer_id: customer_id.to_string(),
            invoice_item: invoice_item.trim().to_string(),
            normalized: super::normalize(invoice_item),
            target,
            confirmed_at: chrono::Utc::now().to_rfc3339(),
        }
    }

    pub fn is_no_match(&self) -> bool {
        self.target.is_none()
    }
}

/// One mapping as it is stored on disk, under `customer -> normalized text`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MappingEntry {
    pub invoice_item: String,
    pub target: Option<String>,
    #[serde(default)]
    pub confirmed_at: String,
}

impl MappingEntry {
    pub fn into_mapping(self, customer_id: &str, normalized: &str) -> ConfirmedMapping {
        ConfirmedMapping {
            customer_id: customer_id.to_string(),
            invoice_item: self.invoice_item,
            normalized: normalized.to_string(),
            target: self.target,
            confirmed_at: self.confirmed_at,
        }
    }
}

impl From<&ConfirmedMapping> for MappingEntry {
    fn from(m: &ConfirmedMapping) -> Self {
        Self {
            invoice_item: m.invoice_item.clone(),
            target: m.target.clone(),
            confirmed_at: m.confirmed_at.clone(),
        }
    }
}

/// Result of a save: whether the backing store actually changed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SaveOutcome {
    Created,
    Updated,
    /// Same target was already stored; nothing was written.
    Unchanged,
}

/// A customer's ordered, de-duplicated set of mapping targets.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CandidateList(IndexSet<String>);

impl CandidateList {
    /// Build a list, trimming names and dropping blanks and repeats (first wins).
    pub fn new<I, S>(items: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self(
            items
                .into_iter()
                .map(|s| s.as_ref().trim().to_string())
                .filter(|s| !s.is_empty())
                .collect(),
        )
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.0.contains(name)
    }

    pub fn iter(&self) -> impl Iterator<Item = &String> {
        self.0.iter()
    }

    pub fn get(&self, index: usize) -> Option<&String> {
        self.0.get_index(index)
    }

    /// Resolve a name to its canonical spelling, ignoring case and spacing.
    pub fn canonical(&self, name: &str) -> Option<&str> {
        if let Some(exact) = self.0.get(name) {
            return Some(exact.as_str());
        }
        let wanted = super::normalize(name);
        self.0
            .iter()
            .find(|c| super::normalize(c) == wanted)
            .map(String::as_str)
    }
}
