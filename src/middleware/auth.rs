use axum::{
    extract::{Request, State},
    http::{header::AUTHORIZATION, HeaderMap},
    middleware::Next,
    response::Response,
};
use mongodb::bson::oid::ObjectId;
use tracing::warn;

use crate::errors::{AppError, Result};
use crate::models::admin::AdminRole;
use crate::services::auth_service::decode_token;
use crate::state::AppState;

/// The signed-in admin, inserted by `require_admin`.
#[derive(Debug, Clone)]
pub struct CurrentAdmin {
    pub id: Option<ObjectId>,
    pub email: String,
    pub is_super_admin: bool,
}

pub fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(AUTHORIZATION)
        .and_then(|header| header.to_str().ok())
        .and_then(|header| header.strip_prefix("Bearer "))
}

/// Resolves a session token to an admin, re-checking the role on every request so a demoted
/// or deleted account loses access immediately.
pub async fn resolve_admin(state: &AppState, headers: &HeaderMap) -> Result<CurrentAdmin> {
    let token = bearer_token(headers).ok_or(AppError::AuthError)?;
    let claims = decode_token(token, &state.config.jwt_secret)?;

    let is_super_admin = state.config.is_super_admin(&claims.email);
    let account = state.store.find_admin_by_email(&claims.email).await?;

    match account {
        Some(account) if account.role == AdminRole::Admin || is_super_admin => Ok(CurrentAdmin {
            id: Some(account.id),
            email: account.email,
            is_super_admin,
        }),
        None if is_super_admin => Ok(CurrentAdmin {
            id: None,
            email: claims.email,
            is_super_admin,
        }),
        Some(_) => {
            warn!("Admin access denied for {}", claims.email);
            Err(AppError::Unauthorized)
        }
        None => Err(AppError::AuthError),
    }
}

pub async fn require_admin(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response> {
    let admin = resolve_admin(&state, request.headers()).await?;
    request.extensions_mut().insert(admin);
    Ok(next.run(request).await)
}
