//! The invoice-mapping service shared by the HTTP server and the CLI.

use std::sync::Arc;

use anyhow::Result;

use crate::config::MapperConfig;
use crate::error::{AppError, AppResult};
use crate::invoice::parser;
use crate::llm::{self, ChatBackend, LlmAdapter};
use crate::mapping::confirm::ConfirmationHandler;
use crate::mapping::suggester::MappingSuggester;
use crate::mapping::ProcessOutcome;
use crate::memory::candidates::{CandidateStore, JsonDirCandidateStore};
use crate::memory::store::{JsonFileStore, MappingStore};
use crate::memory::types::{CandidateList, ConfirmedMapping};
use crate::memory::{normalize, validate_customer_id};
use crate::ocr::{self, Document, OcrEngine};

/// The injected collaborators of an [`InvoiceMapper`].
#[derive(Clone)]
pub struct MapperParts {
    pub mappings: Arc<dyn MappingStore>,
    pub candidates: Arc<dyn CandidateStore>,
    pub ocr: Arc<dyn OcrEngine>,
    pub chat: Arc<dyn ChatBackend>,
}

impl MapperParts {
    /// File-backed stores under the configured data dir, Google Vision, and
    /// an OpenAI-compatible chat model.
    pub fn from_config(config: &MapperConfig) -> Result<Self> {
        let mappings = JsonFileStore::new(
            config.resolved_mappings_path(),
            config.storage.default_customer.clone(),
        );
        let candidates = JsonDirCandidateStore::new(config.resolved_lists_dir());
        let ocr: Arc<dyn OcrEngine> = Arc::from(ocr::create_engine(&config.ocr)?);
        let chat: Arc<dyn ChatBackend> = Arc::from(llm::create_backend(&config.llm)?);
        Ok(Self {
            mappings: Arc::new(mappings),
            candidates: Arc::new(candidates),
            ocr,
            chat,
        })
    }
}

#[derive(Clone)]
pub struct InvoiceMapper {
    mappings: Arc<dyn MappingStore>,
    candidates: Arc<dyn CandidateStore>,
    ocr: Arc<dyn OcrEngine>,
    suggester: MappingSuggester,
    confirmer: Arc<ConfirmationHandler>,
    default_customer: String,
    default_list: CandidateList,
}

/// Run blocking store work off the async runtime.
async fn blocking<T, F>(f: F) -> AppResult<T>
where
    F: FnOnce() -> AppResult<T> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(f).await?
}

impl InvoiceMapper {
    pub fn new(parts: MapperParts, config: &MapperConfig) -> Self {
        let llm = LlmAdapter::new(parts.chat);
        let suggester = MappingSuggester::new(
            Arc::clone(&parts.mappings),
            llm,
            config.llm.mode,
            config.llm.memory_examples,
        );
        Self {
            confirmer: Arc::new(ConfirmationHandler::new(Arc::clone(&parts.mappings))),
            mappings: parts.mappings,
            candidates: parts.candidates,
            ocr: parts.ocr,
            suggester,
            default_customer: config.storage.default_customer.clone(),
            default_list: CandidateList::new(&config.candidates.default_list),
        }
    }

    pub fn from_config(config: &MapperConfig) -> Result<Self> {
        Ok(Self::new(MapperParts::from_config(config)?, config))
    }

    pub fn default_customer(&self) -> &str {
        &self.default_customer
    }

    /// Validated customer id, falling back to the default customer when the
    /// caller gave none.
    pub fn resolve_customer(&self, requested: Option<&str>) -> AppResult<String> {
        match requested.map(str::trim).filter(|s| !s.is_empty()) {
            Some(id) => Ok(validate_customer_id(id)?.to_string()),
            None => Ok(self.default_customer.clone()),
        }
    }

    /// The customer's uploaded list, else the configured default list.
    /// An unreadable list file counts as no list.
    pub async fn candidate_list(&self, customer_id: &str) -> AppResult<Option<CandidateList>> {
        let store = Arc::clone(&self.candidates);
        let customer = customer_id.to_string();
        let uploaded = tokio::task::spawn_blocking(move || store.get(&customer)).await?;
        let uploaded = uploaded.unwrap_or_else(|e| {
            tracing::warn!(customer_id, error = %e, "candidate list unreadable");
            None
        });
        Ok(uploaded
            .filter(|l| !l.is_empty())
            .or_else(|| (!self.default_list.is_empty()).then(|| self.default_list.clone())))
    }

    /// OCR, parse, and suggest, using the customer's candidate list.
    pub async fn process_invoice(
        &self,
        customer_id: &str,
        document: &Document,
    ) -> AppResult<ProcessOutcome> {
        let list = self.candidate_list(customer_id).await?.ok_or_else(|| {
            AppError::NotFound(format!(
                "No list found for customer '{customer_id}'. Please call /upload-list first."
            ))
        })?;
        self.process_with_list(customer_id, document, &list).await
    }

    /// OCR, parse, and suggest against an explicit candidate list.
    pub async fn process_with_list(
        &self,
        customer_id: &str,
        document: &Document,
        candidates: &CandidateList,
    ) -> AppResult<ProcessOutcome> {
        let text = self.ocr.extract_text(document).await?;
        self.process_text(customer_id, &text, candidates).await
    }

    /// Parse already-extracted invoice text and suggest mappings.
    pub async fn process_text(
        &self,
        customer_id: &str,
        text: &str,
        candidates: &CandidateList,
    ) -> AppResult<ProcessOutcome> {
        let items = parser::parse(text);
        tracing::info!(customer_id, items = items.len(), "parsed invoice items");
        let outcome = self.suggester.suggest(customer_id, items, candidates).await?;
        tracing::info!(
            customer_id,
            auto_confirmed = outcome.auto_confirmed_items.len(),
            new_suggestions = outcome.new_suggestions.len(),
            "invoice processed"
        );
        Ok(outcome)
    }

    /// Record a user's decision for one invoice item.
    pub async fn confirm(
        &self,
        customer_id: &str,
        invoice_item: &str,
        target: Option<&str>,
    ) -> AppResult<ConfirmedMapping> {
        let candidates = self.candidate_list(customer_id).await?;
        let confirmer = Arc::clone(&self.confirmer);
        let customer = customer_id.to_string();
        let item = invoice_item.to_string();
        let target = target.map(str::to_string);
        blocking(move || {
            confirmer.confirm(&customer, &item, target.as_deref(), candidates.as_ref())
        })
        .await
    }

    /// Replace the customer's candidate list. Returns the stored list.
    pub async fn upload_list(&self, customer_id: &str, items: Vec<String>) -> AppResult<CandidateList> {
        let list = CandidateList::new(items);
        if list.is_empty() {
            return Err(AppError::input(
                "The list must contain at least one non-empty item name.",
            ));
        }
        let store = Arc::clone(&self.candidates);
        let customer = customer_id.to_string();
        let stored = list.clone();
        blocking(move || Ok(store.replace(&customer, &stored)?)).await?;
        Ok(list)
    }

    /// All confirmed mappings of a customer, ordered by normalized text.
    pub async fn mappings(&self, customer_id: &str) -> AppResult<Vec<ConfirmedMapping>> {
        let store = Arc::clone(&self.mappings);
        let customer = customer_id.to_string();
        blocking(move || {
            Ok(store
                .load(&customer)?
                .into_iter()
                .map(|(key, entry)| entry.into_mapping(&customer, &key))
                .collect())
        })
        .await
    }

    /// Delete the mapping for one invoice item text. Returns `true` if it existed.
    pub async fn forget(&self, customer_id: &str, invoice_item: &str) -> AppResult<bool> {
        let key = normalize(invoice_item);
        if key.is_empty() {
            return Err(AppError::input("Missing 'invoice_item'."));
        }
        let store = Arc::clone(&self.mappings);
        let customer = customer_id.to_string();
        blocking(move || Ok(store.remove(&customer, &key)?)).await
    }
}
