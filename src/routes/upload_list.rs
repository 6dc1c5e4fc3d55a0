use axum::extract::multipart::MultipartRejection;
use axum::extract::{Multipart, State};
use axum::Json;
use serde::Serialize;

use super::multipart_error;
use crate::error::{AppError, AppResult};
use crate::mapping::InvoiceMapper;
use crate::memory::candidates::parse_list;

#[derive(Debug, Serialize)]
pub struct UploadListResponse {
    pub status: &'static str,
    pub message: String,
    pub customer_id: String,
    pub item_count: usize,
}

/// `POST /upload-list`: multipart with `customer_id` and a `file` holding a
/// JSON array of strings. Replaces the customer's list wholesale.
pub async fn upload_list(
    State(mapper): State<InvoiceMapper>,
    multipart: Result<Multipart, MultipartRejection>,
) -> AppResult<Json<UploadListResponse>> {
    let mut multipart = multipart.map_err(|_| AppError::input("No file part."))?;

    let mut file: Option<(Option<String>, Vec<u8>)> = None;
    let mut customer: Option<String> = None;

    while let Some(field) = multipart.next_field().await.map_err(multipart_error)? {
        let name = field.name().map(str::to_string);
        match name.as_deref() {
            Some("file") => {
                let filename = field.file_name().map(str::to_string);
                let bytes = field.bytes().await.map_err(multipart_error)?;
                file = Some((filename, bytes.to_vec()));
            }
            Some("customer_id") => {
                customer = Some(field.text().await.map_err(multipart_error)?);
            }
            _ => {}
        }
    }

    let (filename, bytes) = file.ok_or_else(|| AppError::input("No file part."))?;
    let is_json_name = filename
        .as_deref()
        .and_then(|n| n.rsplit_once('.'))
        .is_some_and(|(_, ext)| ext.eq_ignore_ascii_case("json"));
    if filename.is_some() && !is_json_name {
        return Err(AppError::input("Invalid file. Upload a JSON file."));
    }

    let items = parse_list(&bytes)?;
    let customer_id = mapper.resolve_customer(customer.as_deref())?;
    let list = mapper.upload_list(&customer_id, items).await?;

    tracing::info!(customer_id = %customer_id, items = list.len(), "list uploaded");
    Ok(Json(UploadListResponse {
        status: "success",
        message: format!("List for '{customer_id}' saved successfully."),
        customer_id,
        item_count: list.len(),
    }))
}
