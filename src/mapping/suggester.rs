//! Memory-first mapping suggestions.
//!
//! Items whose normalized text has a confirmed mapping are auto-confirmed
//! (including explicit no-matches). Everything else goes to the language model
//! together with the customer's candidate list.

use std::collections::HashMap;
use std::sync::Arc;

use crate::config::SuggestMode;
use crate::error::LlmError;
use crate::invoice::InvoiceItem;
use crate::llm::{LlmAdapter, LlmSuggestion, MemoryExample, PromptItem};
use crate::mapping::{ProcessOutcome, Suggestion, SuggestionSource};
use crate::memory::normalize;
use crate::memory::store::{CustomerMappings, MappingStore};
use crate::memory::types::CandidateList;

const FROM_MEMORY_NOTE: &str = "Confirmed mapping from memory.";
const MISSING_SUGGESTION: &str = "The language model returned no suggestion for this item.";

#[derive(Clone)]
pub struct MappingSuggester {
    store: Arc<dyn MappingStore>,
    llm: LlmAdapter,
    mode: SuggestMode,
    memory_examples: usize,
}

impl MappingSuggester {
    pub fn new(
        store: Arc<dyn MappingStore>,
        llm: LlmAdapter,
        mode: SuggestMode,
        memory_examples: usize,
    ) -> Self {
        Self {
            store,
            llm,
            mode,
            memory_examples,
        }
    }

    /// Load a customer's mappings, treating any store failure as an empty store.
    async fn load_memory(&self, customer_id: &str) -> CustomerMappings {
        let store = Arc::clone(&self.store);
        let customer = customer_id.to_string();
        match tokio::task::spawn_blocking(move || store.load(&customer)).await {
            Ok(Ok(memory)) => memory,
            Ok(Err(e)) => {
                tracing::warn!(customer_id, error = %e, "mapping store unreadable, continuing without memory");
                CustomerMappings::new()
            }
            Err(e) => {
                tracing::warn!(customer_id, error = %e, "mapping store task failed, continuing without memory");
                CustomerMappings::new()
            }
        }
    }

    /// Produce one suggestion per item.
    ///
    /// In batch mode a failed model call fails the whole invoice; in per-item
    /// mode the failure is recorded on the affected item only.
    pub async fn suggest(
        &self,
        customer_id: &str,
        items: Vec<InvoiceItem>,
        candidates: &CandidateList,
    ) -> Result<ProcessOutcome, LlmError> {
        let memory = self.load_memory(customer_id).await;

        let mut auto_confirmed = Vec::new();
        let mut pending = Vec::new();
        for (index, item) in items.into_iter().enumerate() {
            let key = normalize(&item.name);
            match memory.get(&key).filter(|_| !key.is_empty()) {
                Some(entry) => {
                    let mut s = Suggestion::for_item(item, SuggestionSource::Memory);
                    s.suggested_item = entry.target.clone();
                    s.notes = FROM_MEMORY_NOTE.to_string();
                    auto_confirmed.push(s);
                }
                None => pending.push((index, item)),
            }
        }

        tracing::info!(
            customer_id,
            auto_confirmed = auto_confirmed.len(),
            pending = pending.len(),
            "memory lookup complete"
        );

        let new_suggestions = if pending.is_empty() {
            Vec::new()
        } else if candidates.is_empty() {
            pending
                .into_iter()
                .map(|(_, item)| {
                    let mut s = Suggestion::for_item(item, SuggestionSource::Llm);
                    s.notes = "No candidate list is available for this customer.".into();
                    s
                })
                .collect()
        } else {
            let examples = memory_examples(&memory, self.memory_examples);
            match self.mode {
                SuggestMode::Batch => self.suggest_batch(pending, candidates, &examples).await?,
                SuggestMode::PerItem => self.suggest_per_item(pending, candidates, &examples).await,
            }
        };

        Ok(ProcessOutcome {
            customer_id: customer_id.to_string(),
            auto_confirmed_items: auto_confirmed,
            new_suggestions,
        })
    }

    async fn suggest_batch(
        &self,
        pending: Vec<(usize, InvoiceItem)>,
        candidates: &CandidateList,
        examples: &[MemoryExample],
    ) -> Result<Vec<Suggestion>, LlmError> {
        let prompt_items: Vec<PromptItem> = pending.iter().map(to_prompt_item).collect();
        let mut by_index: HashMap<usize, LlmSuggestion> = self
            .llm
            .suggest(&prompt_items, candidates, examples)
            .await?
            .into_iter()
            .map(|s| (s.index, s))
            .collect();

        Ok(pending
            .into_iter()
            .map(|(index, item)| resolve(item, by_index.remove(&index), candidates))
            .collect())
    }

    async fn suggest_per_item(
        &self,
        pending: Vec<(usize, InvoiceItem)>,
        candidates: &CandidateList,
        examples: &[MemoryExample],
    ) -> Vec<Suggestion> {
        let mut out = Vec::with_capacity(pending.len());
        for entry in pending {
            let prompt_item = to_prompt_item(&entry);
            let (_, item) = entry;
            match self.llm.suggest(&[prompt_item], candidates, examples).await {
                Ok(mut suggestions) => out.push(resolve(item, suggestions.pop(), candidates)),
                Err(e) => {
                    tracing::warn!(item = %item.name, error = %e, "suggestion failed for item");
                    let mut s = Suggestion::for_item(item, SuggestionSource::Llm);
                    s.error = Some(e.to_string());
                    out.push(s);
                }
            }
        }
        out
    }
}

fn to_prompt_item((index, item): &(usize, InvoiceItem)) -> PromptItem {
    PromptItem {
        index: *index,
        text: item.name.clone(),
        quantity: item.quantity,
        unit: item.unit.clone(),
    }
}

/// Most recent confirmed decisions, newest first.
fn memory_examples(memory: &CustomerMappings, limit: usize) -> Vec<MemoryExample> {
    let mut entries: Vec<_> = memory.values().collect();
    entries.sort_by(|a, b| b.confirmed_at.cmp(&a.confirmed_at));
    entries
        .into_iter()
        .take(limit)
        .map(|e| MemoryExample {
            invoice_item: e.invoice_item.clone(),
            target: e.target.clone(),
        })
        .collect()
}

/// Turn the model's answer for one item into a suggestion row.
///
/// The model's choice is taken as-is apart from snapping it to the candidate
/// list's spelling; a name that is not on the list becomes "no match".
fn resolve(
    item: InvoiceItem,
    suggestion: Option<LlmSuggestion>,
    candidates: &CandidateList,
) -> Suggestion {
    let mut s = Suggestion::for_item(item, SuggestionSource::Llm);
    let Some(llm) = suggestion else {
        s.error = Some(MISSING_SUGGESTION.to_string());
        return s;
    };

    s.notes = llm.notes;
    if let Some(target) = llm.target {
        match candidates.canonical(&target) {
            Some(name) => s.suggested_item = Some(name.to_string()),
            None => {
                tracing::debug!(suggested = %target, "model suggested a name outside the candidate list");
                s.notes = format!("Suggested {target:?} is not on the candidate list. {}", s.notes)
                    .trim_end()
                    .to_string();
            }
        }
    }
    s
}
