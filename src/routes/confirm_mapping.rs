use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::Json;
use serde::{Deserialize, Serialize};

use crate::error::{AppError, AppResult};
use crate::mapping::InvoiceMapper;

#[derive(Debug, Deserialize)]
pub struct ConfirmMappingRequest {
    pub invoice_item: Option<String>,
    /// Confirmed target; `null` records an explicit no-match.
    #[serde(default, alias = "menu_item")]
    pub list_item: Option<String>,
    #[serde(default)]
    pub customer_id: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct SavedMapping {
    pub invoice_item: String,
    pub list_item: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ConfirmMappingResponse {
    pub status: &'static str,
    pub message: &'static str,
    pub customer_id: String,
    pub saved_mapping: SavedMapping,
}

/// `POST /confirm-mapping`
pub async fn confirm_mapping(
    State(mapper): State<InvoiceMapper>,
    payload: Result<Json<ConfirmMappingRequest>, JsonRejection>,
) -> AppResult<Json<ConfirmMappingResponse>> {
    let Json(req) =
        payload.map_err(|e| AppError::input(format!("Invalid JSON body: {}", e.body_text())))?;

    let invoice_item = req
        .invoice_item
        .filter(|s| !s.trim().is_empty())
        .ok_or_else(|| AppError::input("Missing 'invoice_item'."))?;
    let customer_id = mapper.resolve_customer(req.customer_id.as_deref())?;

    let mapping = mapper
        .confirm(&customer_id, &invoice_item, req.list_item.as_deref())
        .await?;

    Ok(Json(ConfirmMappingResponse {
        status: "success",
        message: "Mapping saved.",
        customer_id,
        saved_mapping: SavedMapping {
            invoice_item: mapping.invoice_item,
            list_item: mapping.target,
        },
    }))
}
