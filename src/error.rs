//! Error taxonomy shared by the core and both entry points.
//!
//! Each external boundary has its own error type ([`OcrError`], [`LlmError`],
//! [`StoreError`]); [`AppError`] folds them into the categories callers act on
//! and renders them as `{"error": "..."}` HTTP responses.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum OcrError {
    #[error("OCR API key is not configured (set GOOGLE_VISION_API_KEY)")]
    MissingApiKey,

    #[error("OCR request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("OCR provider returned HTTP {status}: {body}")]
    Status { status: u16, body: String },

    #[error("OCR provider error: {0}")]
    Provider(String),

    #[error("OCR found no text in the document")]
    EmptyText,
}

#[derive(Error, Debug)]
pub enum LlmError {
    #[error("LLM API key is not configured (set OPENAI_API_KEY)")]
    MissingApiKey,

    #[error("LLM request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("LLM provider returned HTTP {status}: {body}")]
    Status { status: u16, body: String },

    #[error("LLM returned a malformed response: {0}")]
    Malformed(String),
}

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("store I/O error at {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("store file {path} is corrupt: {reason}")]
    Corrupt { path: String, reason: String },

    #[error("failed to serialize store contents: {0}")]
    Serialize(#[from] serde_json::Error),
}

impl StoreError {
    pub(crate) fn io(path: &std::path::Path, source: std::io::Error) -> Self {
        Self::Io {
            path: path.display().to_string(),
            source,
        }
    }
}

#[derive(Error, Debug)]
pub enum AppError {
    /// Bad or missing caller input; the caller must fix the request.
    #[error("{0}")]
    Input(String),

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    TooLarge(String),

    #[error(transparent)]
    Ocr(#[from] OcrError),

    #[error(transparent)]
    Llm(#[from] LlmError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("internal error: {0}")]
    Internal(String),
}

impl AppError {
    pub fn input(message: impl Into<String>) -> Self {
        Self::Input(message.into())
    }

    pub fn status(&self) -> StatusCode {
        match self {
            Self::Input(_) => StatusCode::BAD_REQUEST,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::TooLarge(_) => StatusCode::PAYLOAD_TOO_LARGE,
            Self::Ocr(_) | Self::Llm(_) => StatusCode::BAD_GATEWAY,
            Self::Store(_) | Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<tokio::task::JoinError> for AppError {
    fn from(e: tokio::task::JoinError) -> Self {
        Self::Internal(format!("background task failed: {e}"))
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(status = status.as_u16(), error = %self, "request failed");
        } else {
            tracing::debug!(status = status.as_u16(), error = %self, "request rejected");
        }
        (status, Json(serde_json::json!({ "error": self.to_string() }))).into_response()
    }
}

pub type AppResult<T> = std::result::Result<T, AppError>;
