use axum::extract::multipart::MultipartRejection;
use axum::extract::{Multipart, State};
use axum::Json;
use serde::Serialize;
use tracing::Instrument;

use super::multipart_error;
use crate::error::{AppError, AppResult};
use crate::mapping::{InvoiceMapper, ProcessOutcome};
use crate::ocr::Document;

pub const MISSING_INVOICE: &str = "No 'invoice' file part in the request.";

#[derive(Debug, Serialize)]
pub struct ProcessInvoiceResponse {
    pub status: &'static str,
    #[serde(flatten)]
    pub outcome: ProcessOutcome,
}

/// `POST /process-invoice`: multipart with an `invoice` file and an optional
/// `customer_id`.
pub async fn process_invoice(
    State(mapper): State<InvoiceMapper>,
    multipart: Result<Multipart, MultipartRejection>,
) -> AppResult<Json<ProcessInvoiceResponse>> {
    // A body that is not multipart at all has no invoice part either.
    let mut multipart = multipart.map_err(|_| AppError::input(MISSING_INVOICE))?;

    let mut invoice: Option<(Option<String>, Vec<u8>)> = None;
    let mut customer: Option<String> = None;

    while let Some(field) = multipart.next_field().await.map_err(multipart_error)? {
        let name = field.name().map(str::to_string);
        match name.as_deref() {
            Some("invoice") => {
                let filename = field.file_name().map(str::to_string);
                let bytes = field.bytes().await.map_err(multipart_error)?;
                invoice = Some((filename, bytes.to_vec()));
            }
            Some("customer_id") => {
                customer = Some(field.text().await.map_err(multipart_error)?);
            }
            _ => {}
        }
    }

    let (filename, bytes) = invoice.ok_or_else(|| AppError::input(MISSING_INVOICE))?;
    if bytes.is_empty() {
        return Err(AppError::input("The uploaded invoice file is empty."));
    }
    let document = Document::detect(bytes, filename).ok_or_else(|| {
        AppError::input("Invalid invoice file type. Upload a PDF, PNG or JPEG file.")
    })?;
    let customer_id = mapper.resolve_customer(customer.as_deref())?;

    let request_id = uuid::Uuid::now_v7();
    let span = tracing::info_span!("process_invoice", %request_id, customer_id = %customer_id);
    let outcome = async {
        tracing::info!(file = document.display_name(), "processing invoice");
        mapper.process_invoice(&customer_id, &document).await
    }
    .instrument(span)
    .await?;

    Ok(Json(ProcessInvoiceResponse {
        status: "success",
        outcome,
    }))
}
