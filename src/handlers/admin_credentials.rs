use std::collections::HashSet;

use axum::{
    extract::{Multipart, Path, Query, State},
    http::StatusCode,
    response::Json,
    Extension,
};
use mongodb::bson::oid::ObjectId;
use serde_json::{json, Value};
use tracing::{info, warn};
use validator::Validate;

use crate::dtos::admin_dtos::{
    CreateCredentialRequest, CredentialQuery, CredentialResponse, ImportRequest, ImportResponse,
    PageResponse,
};
use crate::errors::{AppError, Result};
use crate::middleware::auth::CurrentAdmin;
use crate::models::credential::{CredentialFilter, NewCredential};
use crate::services::import::{parse_credential_lines, LineError};
use crate::state::AppState;

fn non_empty(value: Option<String>) -> Option<String> {
    value.map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

async fn known_package_ids(state: &AppState) -> Result<HashSet<String>> {
    Ok(state
        .catalog
        .list_packages()
        .await?
        .into_iter()
        .map(|p| p.id)
        .collect())
}

// GET /api/admin/credentials
pub async fn list_credentials(
    State(state): State<AppState>,
    Query(query): Query<CredentialQuery>,
) -> Result<Json<PageResponse<CredentialResponse>>> {
    let page = query.page();
    let filter = CredentialFilter {
        package_id: non_empty(query.package_id),
        used: query.used,
        search: non_empty(query.search),
    };

    let credentials = state.store.list_credentials(&filter, page).await?;
    Ok(Json(PageResponse::from_paged(credentials)))
}

// POST /api/admin/credentials
pub async fn create_credential(
    State(state): State<AppState>,
    Extension(admin): Extension<CurrentAdmin>,
    Json(payload): Json<CreateCredentialRequest>,
) -> Result<(StatusCode, Json<CredentialResponse>)> {
    payload.validate()?;

    let package_id = non_empty(payload.package_id)
        .unwrap_or_else(|| state.config.default_package_id.clone());
    if !known_package_ids(&state).await?.contains(&package_id) {
        return Err(AppError::ValidationError(format!(
            "unknown package {}",
            package_id
        )));
    }

    let credential = state
        .store
        .insert_credential(NewCredential {
            package_id,
            username: payload.username.trim().to_string(),
            password: payload.password.trim().to_string(),
            description: non_empty(payload.description),
        })
        .await?;

    info!(
        "{} added credential {} to {}",
        admin.email, credential.username, credential.package_id
    );
    Ok((StatusCode::CREATED, Json(CredentialResponse::from(credential))))
}

async fn import_text(
    state: &AppState,
    admin: &CurrentAdmin,
    text: &str,
    default_package_id: Option<String>,
) -> Result<ImportResponse> {
    let default_package_id =
        non_empty(default_package_id).unwrap_or_else(|| state.config.default_package_id.clone());
    let plan = parse_credential_lines(text, &default_package_id);
    let known = known_package_ids(state).await?;

    let mut errors = plan.errors;
    let mut inserted = 0;
    for record in plan.records {
        if !known.contains(&record.credential.package_id) {
            errors.push(LineError {
                line: record.line,
                reason: format!("unknown package {}", record.credential.package_id),
            });
            continue;
        }
        match state.store.insert_credential(record.credential).await {
            Ok(_) => inserted += 1,
            Err(e) => {
                warn!("Import line {} failed: {}", record.line, e);
                errors.push(LineError {
                    line: record.line,
                    reason: e.to_string(),
                });
            }
        }
    }
    errors.sort_by_key(|e| e.line);

    info!(
        "{} imported {} credentials ({} rejected lines)",
        admin.email,
        inserted,
        errors.len()
    );
    Ok(ImportResponse {
        success: true,
        inserted,
        errors,
    })
}

// POST /api/admin/credentials/import
pub async fn import_credentials(
    State(state): State<AppState>,
    Extension(admin): Extension<CurrentAdmin>,
    Json(payload): Json<ImportRequest>,
) -> Result<Json<ImportResponse>> {
    payload.validate()?;
    let response = import_text(&state, &admin, &payload.text, payload.default_package_id).await?;
    Ok(Json(response))
}

// POST /api/admin/credentials/upload
pub async fn upload_credentials(
    State(state): State<AppState>,
    Extension(admin): Extension<CurrentAdmin>,
    mut multipart: Multipart,
) -> Result<Json<ImportResponse>> {
    let mut text = None;
    let mut default_package_id = None;

    while let Some(field) = multipart.next_field().await? {
        let name = field.name().map(str::to_string);
        match name.as_deref() {
            Some("file") => text = Some(field.text().await?),
            Some("default_package_id") => default_package_id = Some(field.text().await?),
            _ => {}
        }
    }

    let text = text.ok_or_else(|| AppError::Multipart("missing file field".to_string()))?;
    let response = import_text(&state, &admin, &text, default_package_id).await?;
    Ok(Json(response))
}

// POST /api/admin/credentials/:id/reset
pub async fn reset_credential(
    State(state): State<AppState>,
    Extension(admin): Extension<CurrentAdmin>,
    Path(id): Path<String>,
) -> Result<Json<CredentialResponse>> {
    let id = ObjectId::parse_str(&id)?;
    let credential = state.store.reset_credential(&id).await?;
    info!("{} reset credential {}", admin.email, credential.username);
    Ok(Json(CredentialResponse::from(credential)))
}

// DELETE /api/admin/credentials/:id
pub async fn delete_credential(
    State(state): State<AppState>,
    Extension(admin): Extension<CurrentAdmin>,
    Path(id): Path<String>,
) -> Result<Json<Value>> {
    let id = ObjectId::parse_str(&id)?;
    state.store.delete_credential(&id).await?;
    info!("{} deleted credential {}", admin.email, id);
    Ok(Json(json!({ "success": true, "message": "Credential deleted" })))
}
