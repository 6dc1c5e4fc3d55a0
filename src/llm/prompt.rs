//! Prompt construction and response parsing for mapping suggestions.

use schemars::JsonSchema;
use serde::Deserialize;

use super::{MemoryExample, PromptItem};
use crate::error::LlmError;
use crate::memory::types::CandidateList;

/// The JSON document the model must answer with.
#[derive(Debug, Deserialize, JsonSchema)]
pub struct LlmMappingResponse {
    /// One entry per input item.
    #[serde(alias = "mapped_items")]
    pub mappings: Vec<LlmMapping>,
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct LlmMapping {
    /// The `index` of the input item this entry answers.
    pub index: usize,
    /// The invoice item text, copied from the input.
    #[serde(default)]
    pub invoice_item: Option<String>,
    /// Exact name from the target list, or null when nothing fits.
    #[serde(default, alias = "suggested_menu_dish")]
    pub suggested_item: Option<String>,
    /// One sentence explaining the choice or why there is no match.
    #[serde(default)]
    pub notes: String,
}

fn response_schema() -> String {
    let schema = schemars::schema_for!(LlmMappingResponse);
    serde_json::to_string_pretty(&schema).unwrap_or_default()
}

pub fn system_prompt(candidates: &CandidateList, examples: &[MemoryExample]) -> String {
    let targets = serde_json::to_string(candidates).unwrap_or_else(|_| "[]".into());

    let memory = if examples.is_empty() {
        String::new()
    } else {
        let json = serde_json::to_string_pretty(examples).unwrap_or_default();
        format!(
            "Decisions this customer already confirmed (target null means \"no match\"). \
             Follow them for the same or nearly the same item:\n{json}\n\n"
        )
    };

    format!(
        "You match purchased items from a supplier invoice to a customer's target list \
         (menu dishes or products).\n\n\
         {memory}\
         Target list:\n{targets}\n\n\
         Rules, most important first:\n\
         1. Reuse a confirmed decision when the invoice item is the same product.\n\
         2. If the item name contains the exact name of a target, choose that target.\n\
         3. Otherwise choose the target the item is a clear ingredient or component of.\n\
         4. If nothing applies, use null.\n\
         Only answer with names copied exactly from the target list.\n\n\
         Reply with a single JSON object and nothing else, following this JSON schema:\n\
         {schema}\n\
         Give exactly one entry per input item and reuse the input item's index.",
        schema = response_schema(),
    )
}

pub fn user_message(items: &[PromptItem]) -> String {
    let json = serde_json::to_string_pretty(items).unwrap_or_else(|_| "[]".into());
    format!("Invoice items:\n{json}")
}

/// Parse the model's answer, tolerating a surrounding Markdown code fence.
pub fn parse_response(text: &str) -> Result<LlmMappingResponse, LlmError> {
    let body = strip_code_fence(text);
    serde_json::from_str(body).map_err(|e| LlmError::Malformed(e.to_string()))
}

fn strip_code_fence(text: &str) -> &str {
    let trimmed = text.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    // Drop the info string ("json") on the opening line, or inline when the
    // whole reply sits on one line.
    let rest = match rest.split_once('\n') {
        Some((_, body)) => body,
        None => rest.trim_start_matches(|c: char| c.is_ascii_alphanumeric()),
    };
    rest.trim_end().strip_suffix("```").unwrap_or(rest).trim()
}
