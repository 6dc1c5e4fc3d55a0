use axum::extract::rejection::JsonRejection;
use axum::extract::{Query, State};
use axum::Json;
use serde::{Deserialize, Serialize};

use crate::error::{AppError, AppResult};
use crate::mapping::InvoiceMapper;
use crate::memory::types::{CandidateList, ConfirmedMapping};

#[derive(Debug, Deserialize)]
pub struct CustomerQuery {
    pub customer_id: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct MappingsResponse {
    pub customer_id: String,
    pub mappings: Vec<ConfirmedMapping>,
}

#[derive(Debug, Serialize)]
pub struct ListResponse {
    pub customer_id: String,
    pub items: CandidateList,
}

#[derive(Debug, Deserialize)]
pub struct ForgetMappingRequest {
    pub invoice_item: Option<String>,
    #[serde(default)]
    pub customer_id: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ForgetMappingResponse {
    pub status: &'static str,
    pub customer_id: String,
    pub removed: bool,
}

/// `GET /mappings?customer_id=`
pub async fn list_mappings(
    State(mapper): State<InvoiceMapper>,
    Query(query): Query<CustomerQuery>,
) -> AppResult<Json<MappingsResponse>> {
    let customer_id = mapper.resolve_customer(query.customer_id.as_deref())?;
    let mappings = mapper.mappings(&customer_id).await?;
    Ok(Json(MappingsResponse {
        customer_id,
        mappings,
    }))
}

/// `DELETE /mappings` with `{"invoice_item": ..., "customer_id": ...}`
pub async fn forget_mapping(
    State(mapper): State<InvoiceMapper>,
    payload: Result<Json<ForgetMappingRequest>, JsonRejection>,
) -> AppResult<Json<ForgetMappingResponse>> {
    let Json(req) =
        payload.map_err(|e| AppError::input(format!("Invalid JSON body: {}", e.body_text())))?;
    let invoice_item = req
        .invoice_item
        .ok_or_else(|| AppError::input("Missing 'invoice_item'."))?;
    let customer_id = mapper.resolve_customer(req.customer_id.as_deref())?;
    let removed = mapper.forget(&customer_id, &invoice_item).await?;
    Ok(Json(ForgetMappingResponse {
        status: "success",
        customer_id,
        removed,
    }))
}

/// `GET /list?customer_id=`: the list used for this customer's suggestions.
pub async fn show_list(
    State(mapper): State<InvoiceMapper>,
    Query(query): Query<CustomerQuery>,
) -> AppResult<Json<ListResponse>> {
    let customer_id = mapper.resolve_customer(query.customer_id.as_deref())?;
    let items = mapper.candidate_list(&customer_id).await?.ok_or_else(|| {
        AppError::NotFound(format!("No list found for customer '{customer_id}'."))
    })?;
    Ok(Json(ListResponse { customer_id, items }))
}
