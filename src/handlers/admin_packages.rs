use axum::{
    extract::{Path, State},
    response::Json,
    Extension,
};
use serde_json::{json, Value};
use tracing::info;
use validator::Validate;

use crate::dtos::admin_dtos::{PackageStock, StatsResponse, UpsertPackageRequest};
use crate::dtos::storefront_dtos::PackageResponse;
use crate::errors::{AppError, Result};
use crate::middleware::auth::CurrentAdmin;
use crate::models::package::{fallback_packages, Package};
use crate::models::transaction::TransactionFilter;
use crate::state::AppState;
use crate::store::{Page, MAX_PER_PAGE};

/// Writes the built-in catalog to the store so an edit to one package keeps the others listed.
async fn materialize_fallback(state: &AppState) -> Result<()> {
    if state.store.list_packages().await?.is_empty() {
        for package in fallback_packages() {
            state.store.upsert_package(package).await?;
        }
    }
    Ok(())
}

// GET /api/admin/packages
pub async fn list_packages(State(state): State<AppState>) -> Result<Json<Vec<PackageResponse>>> {
    let mut response = Vec::new();
    for package in state.catalog.list_packages().await? {
        let available = state.engine.remaining_stock(&package.id).await? > 0;
        response.push(PackageResponse::new(package, available));
    }
    Ok(Json(response))
}

// PUT /api/admin/packages/:id
pub async fn upsert_package(
    State(state): State<AppState>,
    Extension(admin): Extension<CurrentAdmin>,
    Path(id): Path<String>,
    Json(payload): Json<UpsertPackageRequest>,
) -> Result<Json<PackageResponse>> {
    payload.validate()?;
    let id = id.trim();
    if id.is_empty() {
        return Err(AppError::ValidationError("package id is required".to_string()));
    }
    if !payload.price.is_finite() || payload.price <= 0.0 {
        return Err(AppError::ValidationError(
            "price must be a positive amount".to_string(),
        ));
    }

    materialize_fallback(&state).await?;

    let package = state
        .store
        .upsert_package(Package::new(
            id,
            payload.name.trim(),
            payload.price,
            payload.description.trim(),
        ))
        .await?;

    info!("{} saved package {} at {}", admin.email, package.id, package.price_label());
    let available = state.engine.remaining_stock(&package.id).await? > 0;
    Ok(Json(PackageResponse::new(package, available)))
}

// DELETE /api/admin/packages/:id
pub async fn delete_package(
    State(state): State<AppState>,
    Extension(admin): Extension<CurrentAdmin>,
    Path(id): Path<String>,
) -> Result<Json<Value>> {
    materialize_fallback(&state).await?;
    state.store.delete_package(&id).await?;
    info!("{} deleted package {}", admin.email, id);
    Ok(Json(json!({ "success": true, "message": "Package deleted" })))
}

// GET /api/admin/stats
pub async fn stats(State(state): State<AppState>) -> Result<Json<StatsResponse>> {
    let mut packages = Vec::new();
    for package in state.catalog.list_packages().await? {
        let total = state.store.count_credentials(&package.id, None).await?;
        let unused = state.store.count_credentials(&package.id, Some(false)).await?;
        packages.push(PackageStock {
            package_id: package.id,
            name: package.name,
            total,
            unused,
            used: total.saturating_sub(unused),
        });
    }

    let filter = TransactionFilter::default();
    let mut page = Page::new(Some(1), Some(MAX_PER_PAGE));
    let mut revenue = 0.0;
    let transactions = loop {
        let batch = state.store.list_transactions(&filter, page).await?;
        revenue += batch.items.iter().map(|t| t.amount).sum::<f64>();
        if batch.items.is_empty() || page.page * page.per_page >= batch.total {
            break batch.total;
        }
        page.page += 1;
    };

    Ok(Json(StatsResponse {
        packages,
        transactions,
        revenue,
    }))
}
