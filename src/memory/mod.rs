//! Persistent memory: confirmed mappings and customer candidate lists.

pub mod candidates;
pub mod store;
pub mod types;

use once_cell::sync::Lazy;
use regex::Regex;

use crate::error::AppError;

static CUSTOMER_ID_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z0-9_.-]{1,64}$").expect("valid customer id regex"));

/// Normalize invoice item text into a memory lookup key.
///
/// Lowercases, collapses whitespace, and strips punctuation from both ends
/// (except `%`). Quantity tokens are kept, so "Coke 330ml" and "Coke 1.5l"
/// stay distinct keys.
pub fn normalize(text: &str) -> String {
    let collapsed = text
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase();
    collapsed
        .trim_matches(|c: char| (c.is_ascii_punctuation() && c != '%') || c.is_whitespace())
        .to_string()
}

/// Validate a customer identifier so it is safe as a JSON key and a file name.
pub fn validate_customer_id(customer_id: &str) -> Result<&str, AppError> {
    let id = customer_id.trim();
    if id == "." || id == ".." || !CUSTOMER_ID_RE.is_match(id) {
        return Err(AppError::input(format!(
            "Invalid 'customer_id' {customer_id:?}: use 1-64 letters, digits, '_', '-' or '.'."
        )));
    }
    Ok(id)
}
