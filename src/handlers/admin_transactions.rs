use axum::{
    extract::{Path, Query, State},
    response::Json,
    Extension,
};
use mongodb::bson::oid::ObjectId;
use serde_json::{json, Value};
use tracing::info;

use crate::dtos::admin_dtos::{PageResponse, TransactionQuery, TransactionResponse};
use crate::errors::Result;
use crate::middleware::auth::CurrentAdmin;
use crate::models::transaction::TransactionFilter;
use crate::state::AppState;
use crate::store::Page;

fn non_empty(value: Option<String>) -> Option<String> {
    value.map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

// GET /api/admin/transactions
pub async fn list_transactions(
    State(state): State<AppState>,
    Query(query): Query<TransactionQuery>,
) -> Result<Json<PageResponse<TransactionResponse>>> {
    let page = Page::new(query.page, query.per_page);
    let filter = TransactionFilter {
        package_id: non_empty(query.package_id),
        phone: non_empty(query.phone),
        reference: non_empty(query.reference),
    };

    let transactions = state.store.list_transactions(&filter, page).await?;
    Ok(Json(PageResponse::from_paged(transactions)))
}

// DELETE /api/admin/transactions/:id
pub async fn delete_transaction(
    State(state): State<AppState>,
    Extension(admin): Extension<CurrentAdmin>,
    Path(id): Path<String>,
) -> Result<Json<Value>> {
    let id = ObjectId::parse_str(&id)?;
    state.store.delete_transaction(&id).await?;
    info!("{} deleted transaction {}", admin.email, id);
    Ok(Json(json!({ "success": true, "message": "Transaction deleted" })))
}

// DELETE /api/admin/transactions
pub async fn delete_all_transactions(
    State(state): State<AppState>,
    Extension(admin): Extension<CurrentAdmin>,
) -> Result<Json<Value>> {
    let deleted = state.store.delete_all_transactions().await?;
    info!("{} cleared the ledger ({} transactions)", admin.email, deleted);
    Ok(Json(json!({ "success": true, "deleted": deleted })))
}
