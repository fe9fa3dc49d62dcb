use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::Json,
    Extension,
};
use mongodb::bson::oid::ObjectId;
use serde_json::{json, Value};
use tracing::info;
use validator::Validate;

use crate::dtos::auth_dtos::{AdminResponse, CreateAdminRequest};
use crate::errors::{AppError, Result};
use crate::middleware::auth::CurrentAdmin;
use crate::models::admin::{AdminAccount, AdminRole};
use crate::services::auth_service::hash_password;
use crate::state::AppState;

async fn editable_account(state: &AppState, id: &str) -> Result<AdminAccount> {
    let id = ObjectId::parse_str(id)?;
    let account = state.store.get_admin(&id).await?;
    if state.config.is_super_admin(&account.email) {
        return Err(AppError::Conflict(
            "the super admin account cannot be changed".to_string(),
        ));
    }
    Ok(account)
}

// GET /api/admin/users
pub async fn list_users(State(state): State<AppState>) -> Result<Json<Vec<AdminResponse>>> {
    let admins = state.store.list_admins().await?;
    Ok(Json(admins.into_iter().map(AdminResponse::from).collect()))
}

// POST /api/admin/users
pub async fn create_user(
    State(state): State<AppState>,
    Extension(admin): Extension<CurrentAdmin>,
    Json(payload): Json<CreateAdminRequest>,
) -> Result<(StatusCode, Json<AdminResponse>)> {
    payload.validate()?;

    let password_hash = hash_password(&payload.password)?;
    let account = AdminAccount::new(
        &payload.email,
        password_hash,
        payload.role.unwrap_or(AdminRole::Admin),
    );
    let account = state.store.create_admin(account).await?;

    info!(
        "{} created {} account {}",
        admin.email,
        account.role.as_str(),
        account.email
    );
    Ok((StatusCode::CREATED, Json(AdminResponse::from(account))))
}

// POST /api/admin/users/:id/role
pub async fn toggle_role(
    State(state): State<AppState>,
    Extension(admin): Extension<CurrentAdmin>,
    Path(id): Path<String>,
) -> Result<Json<AdminResponse>> {
    let account = editable_account(&state, &id).await?;
    let role = account.role.toggled();
    let account = state.store.set_admin_role(&account.id, role).await?;

    info!("{} set {} to {}", admin.email, account.email, role.as_str());
    Ok(Json(AdminResponse::from(account)))
}

// DELETE /api/admin/users/:id
pub async fn delete_user(
    State(state): State<AppState>,
    Extension(admin): Extension<CurrentAdmin>,
    Path(id): Path<String>,
) -> Result<Json<Value>> {
    let account = editable_account(&state, &id).await?;
    state.store.delete_admin(&account.id).await?;

    info!("{} removed {}", admin.email, account.email);
    Ok(Json(json!({ "success": true, "message": "User removed" })))
}
