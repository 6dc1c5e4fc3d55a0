//! Language-model adapter.
//!
//! [`ChatBackend`] is a single completion call against an external provider;
//! [`LlmAdapter`] turns invoice items and a candidate list into a prompt,
//! requests structured JSON output, and parses it into [`LlmSuggestion`]s.

pub mod openai;
pub mod prompt;

use std::sync::Arc;

use async_trait::async_trait;
use serde::Serialize;

use crate::error::LlmError;
use crate::memory::types::CandidateList;

/// A system + user message pair for one completion.
#[derive(Debug, Clone)]
pub struct ChatRequest {
    pub system: String,
    pub user: String,
}

/// One completion call to an external chat model.
#[async_trait]
pub trait ChatBackend: Send + Sync {
    /// Return the raw text content of the model's answer.
    async fn complete(&self, request: &ChatRequest) -> Result<String, LlmError>;

    /// Model identifier, for logging.
    fn model(&self) -> &str;
}

/// Create the chat backend from config. Any OpenAI-compatible endpoint works.
pub fn create_backend(config: &crate::config::LlmConfig) -> anyhow::Result<Box<dyn ChatBackend>> {
    Ok(Box::new(openai::OpenAiChat::new(config)?))
}

/// An item as presented to the model.
#[derive(Debug, Clone, Serialize)]
pub struct PromptItem {
    pub index: usize,
    pub text: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub quantity: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub unit: Option<String>,
}

/// A confirmed decision shown to the model as guidance.
#[derive(Debug, Clone, Serialize)]
pub struct MemoryExample {
    pub invoice_item: String,
    pub target: Option<String>,
}

/// The model's proposal for one item.
#[derive(Debug, Clone, PartialEq)]
pub struct LlmSuggestion {
    pub index: usize,
    pub target: Option<String>,
    pub notes: String,
}

#[derive(Clone)]
pub struct LlmAdapter {
    backend: Arc<dyn ChatBackend>,
}

impl LlmAdapter {
    pub fn new(backend: Arc<dyn ChatBackend>) -> Self {
        Self { backend }
    }

    pub fn model(&self) -> &str {
        self.backend.model()
    }

    /// Ask the model for one suggestion per item.
    ///
    /// The returned list follows the model's answer: entries for unknown
    /// indexes are dropped, and for a repeated index the first entry wins.
    /// Items the model skipped are simply absent.
    pub async fn suggest(
        &self,
        items: &[PromptItem],
        candidates: &CandidateList,
        examples: &[MemoryExample],
    ) -> Result<Vec<LlmSuggestion>, LlmError> {
        let request = ChatRequest {
            system: prompt::system_prompt(candidates, examples),
            user: prompt::user_message(items),
        };

        tracing::info!(
            model = self.backend.model(),
            items = items.len(),
            candidates = candidates.len(),
            examples = examples.len(),
            "requesting mapping suggestions"
        );

        let raw = self.backend.complete(&request).await?;
        let parsed = prompt::parse_response(&raw).inspect_err(|e| {
            tracing::error!(error = %e, "LLM returned unparsable output");
            tracing::debug!(raw = %raw, "raw LLM response");
        })?;

        let mut seen = std::collections::HashSet::new();
        let suggestions = parsed
            .mappings
            .into_iter()
            .filter(|m| items.iter().any(|i| i.index == m.index) && seen.insert(m.index))
            .map(|m| LlmSuggestion {
                index: m.index,
                target: m.suggested_item.filter(|t| !t.trim().is_empty()),
                notes: m.notes,
            })
            .collect();
        Ok(suggestions)
    }
}
