use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::models::admin::{AdminAccount, AdminRole};

#[derive(Debug, Deserialize, Validate)]
pub struct LoginRequest {
    #[validate(email(message = "A valid email is required"))]
    pub email: String,

    #[validate(length(min = 1, message = "Password is required"))]
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct AdminResponse {
    pub id: String,
    pub email: String,
    pub role: AdminRole,
    pub created_at: String,
}

impl From<AdminAccount> for AdminResponse {
    fn from(account: AdminAccount) -> Self {
        AdminResponse {
            id: account.id.to_hex(),
            email: account.email,
            role: account.role,
            created_at: account.created_at.to_rfc3339(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub success: bool,
    pub token: String,
    pub admin: AdminResponse,
}

#[derive(Debug, Serialize)]
pub struct MeResponse {
    pub email: String,
    pub super_admin: bool,
}

#[derive(Debug, Deserialize, Validate)]
pub struct CreateAdminRequest {
    #[validate(email(message = "A valid email is required"))]
    pub email: String,

    #[validate(length(min = 6, message = "Password must be at least 6 characters"))]
    pub password: String,

    #[serde(default)]
    pub role: Option<AdminRole>,
}
