//! Invoice line items and the OCR text parser that produces them.

pub mod parser;

use serde::{Deserialize, Serialize};

/// One purchased line extracted from a supplier document.
///
/// Produced by [`parser::parse`] and discarded once the request that parsed it
/// completes; only the text of an item ever reaches the memory store, via a
/// confirmation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct InvoiceItem {
    /// Item text as printed, including any pack size ("Roma Tomatoes 10kg").
    pub name: String,
    pub quantity: Option<f64>,
    pub unit: Option<String>,
    pub unit_price: Option<f64>,
    pub line_total: Option<f64>,
}

impl InvoiceItem {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }
}
