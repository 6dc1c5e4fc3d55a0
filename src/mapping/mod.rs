//! Mapping workflow: memory-first suggestions, confirmations, and the
//! [`InvoiceMapper`] service that both entry points drive.

pub mod confirm;
pub mod service;
pub mod suggester;

pub use service::{InvoiceMapper, MapperParts};

use serde::{Deserialize, Serialize};

use crate::invoice::InvoiceItem;

/// Where a suggestion came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SuggestionSource {
    /// Resolved from a confirmed mapping; no model involved.
    Memory,
    /// Proposed by the language model, awaiting confirmation.
    Llm,
}

/// The result row for one invoice item.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Suggestion {
    pub invoice_item: String,
    pub quantity: Option<f64>,
    pub unit: Option<String>,
    pub unit_price: Option<f64>,
    pub line_total: Option<f64>,
    /// Candidate name, or `None` for "no match".
    pub suggested_item: Option<String>,
    #[serde(default)]
    pub notes: String,
    pub source: SuggestionSource,
    /// Set when no usable suggestion could be produced for this item.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl Suggestion {
    pub fn for_item(item: InvoiceItem, source: SuggestionSource) -> Self {
        Self {
            invoice_item: item.name,
            quantity: item.quantity,
            unit: item.unit,
            unit_price: item.unit_price,
            line_total: item.line_total,
            suggested_item: None,
            notes: String::new(),
            source,
            error: None,
        }
    }
}

/// Outcome of processing one invoice.
///
/// Every parsed item is in exactly one of the two lists, in input order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProcessOutcome {
    pub customer_id: String,
    pub auto_confirmed_items: Vec<Suggestion>,
    pub new_suggestions: Vec<Suggestion>,
}

impl ProcessOutcome {
    pub fn total_items(&self) -> usize {
        self.auto_confirmed_items.len() + self.new_suggestions.len()
    }
}
