use axum::{extract::State, http::HeaderMap, response::Json};
use serde_json::{json, Value};
use tracing::{info, warn};
use validator::Validate;

use crate::dtos::auth_dtos::{AdminResponse, LoginRequest, LoginResponse, MeResponse};
use crate::errors::{AppError, Result};
use crate::middleware::auth::resolve_admin;
use crate::models::admin::AdminRole;
use crate::services::auth_service::{issue_token, verify_password};
use crate::state::AppState;

// POST /api/auth/login
pub async fn login(
    State(state): State<AppState>,
    Json(payload): Json<LoginRequest>,
) -> Result<Json<LoginResponse>> {
    payload.validate()?;

    let account = state
        .store
        .find_admin_by_email(&payload.email)
        .await?
        .ok_or(AppError::AuthError)?;

    if !verify_password(&payload.password, &account.password_hash) {
        warn!("Failed admin login for {}", account.email);
        return Err(AppError::AuthError);
    }

    if account.role != AdminRole::Admin && !state.config.is_super_admin(&account.email) {
        warn!("Non-admin {} tried to sign in", account.email);
        return Err(AppError::Unauthorized);
    }

    let token = issue_token(&account, &state.config.jwt_secret)?;
    info!("Admin {} signed in", account.email);

    Ok(Json(LoginResponse {
        success: true,
        token,
        admin: AdminResponse::from(account),
    }))
}

// POST /api/auth/logout
pub async fn logout() -> Json<Value> {
    // Sessions are stateless; the console drops its token.
    Json(json!({ "success": true, "message": "Signed out" }))
}

// GET /api/auth/me
pub async fn me(State(state): State<AppState>, headers: HeaderMap) -> Result<Json<MeResponse>> {
    let admin = resolve_admin(&state, &headers).await?;
    Ok(Json(MeResponse {
        email: admin.email,
        super_admin: admin.is_super_admin,
    }))
}
