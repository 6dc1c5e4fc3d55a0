//! HTTP handlers. Each module holds one endpoint and its request/response types.

pub mod confirm_mapping;
pub mod mappings;
pub mod process_invoice;
pub mod upload_list;

pub use confirm_mapping::confirm_mapping;
pub use mappings::{forget_mapping, list_mappings, show_list};
pub use process_invoice::process_invoice;
pub use upload_list::upload_list;

use axum::extract::multipart::MultipartError;
use axum::http::StatusCode;
use axum::Json;
use serde::Serialize;

use crate::error::AppError;

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub message: &'static str,
}

/// `GET /`
pub async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        message: "Invoice Mapper API is running.",
    })
}

/// Map a multipart read failure, keeping body-limit violations distinct.
pub(crate) fn multipart_error(e: MultipartError) -> AppError {
    if e.status() == StatusCode::PAYLOAD_TOO_LARGE {
        AppError::TooLarge("The upload exceeds the maximum allowed size.".into())
    } else {
        AppError::input(format!("Invalid multipart body: {}", e.body_text()))
    }
}
