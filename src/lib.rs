//! Invoice line-item mapper with memory.
//!
//! Reads supplier invoices (PDF or image) through an OCR provider, splits the
//! text into line items, and maps each item onto a customer's candidate list
//! (menu dishes, catalogue entries, ...). Mappings a user has confirmed are
//! remembered per customer and applied automatically on later invoices; only
//! unknown items are sent to the language model for a suggestion.
//!
//! # Flow
//!
//! 1. [`ocr`] extracts raw text from the uploaded document.
//! 2. [`invoice::parser`] turns that text into [`invoice::InvoiceItem`]s.
//! 3. [`mapping::suggester`] resolves each item from memory or asks the
//!    model through [`llm`], producing auto-confirmed items and new
//!    suggestions.
//! 4. [`mapping::confirm`] records the user's decision in [`memory`].
//!
//! The same [`mapping::InvoiceMapper`] drives both the HTTP API ([`server`],
//! [`routes`]) and the interactive terminal workflow ([`cli`]).
//!
//! # Modules
//!
//! - [`config`]: TOML configuration with environment overrides
//! - [`error`]: error types and their HTTP rendering
//! - [`memory`]: confirmed-mapping store and per-customer candidate lists

pub mod cli;
pub mod config;
pub mod error;
pub mod invoice;
pub mod llm;
pub mod mapping;
pub mod memory;
pub mod ocr;
pub mod routes;
pub mod server;
