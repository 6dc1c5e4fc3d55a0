//! Confirmation handler: turns a user's accept/reject decision into a
//! [`ConfirmedMapping`] and writes it through to the mapping store.

use std::sync::Arc;

use crate::error::{AppError, AppResult};
use crate::memory::normalize;
use crate::memory::store::MappingStore;
use crate::memory::types::{CandidateList, ConfirmedMapping, SaveOutcome};

pub struct ConfirmationHandler {
    store: Arc<dyn MappingStore>,
}

impl ConfirmationHandler {
    pub fn new(store: Arc<dyn MappingStore>) -> Self {
        Self { store }
    }

    /// Record `invoice_item -> target` for a customer. `None` (or a blank
    /// target) records an explicit no-match.
    ///
    /// Confirming the same pair again leaves the store untouched and returns
    /// the stored mapping. A target that is not on `candidates` is accepted
    /// but logged.
    pub fn confirm(
        &self,
        customer_id: &str,
        invoice_item: &str,
        target: Option<&str>,
        candidates: Option<&CandidateList>,
    ) -> AppResult<ConfirmedMapping> {
        if invoice_item.trim().is_empty() {
            return Err(AppError::input("Missing 'invoice_item'."));
        }
        if normalize(invoice_item).is_empty() {
            return Err(AppError::input(
                "'invoice_item' must contain more than punctuation.",
            ));
        }

        let target = target
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .map(str::to_string);

        if let (Some(t), Some(list)) = (&target, candidates) {
            if !list.contains(t) {
                tracing::warn!(
                    customer_id,
                    list_item = %t,
                    "confirmed target is not on the customer's candidate list"
                );
            }
        }

        let mapping = ConfirmedMapping::new(customer_id, invoice_item, target);
        let outcome = self.store.save(&mapping)?;

        if outcome == SaveOutcome::Unchanged {
            if let Some(stored) = self.store.lookup(customer_id, &mapping.normalized)? {
                return Ok(stored);
            }
        }
        Ok(mapping)
    }
}
