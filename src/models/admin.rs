use chrono::{DateTime, Utc};
use mongodb::bson::{oid::ObjectId, serde_helpers};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AdminRole {
    Admin,
    #[default]
    User,
}

impl AdminRole {
    pub fn toggled(self) -> Self {
        match self {
            AdminRole::Admin => AdminRole::User,
            AdminRole::User => AdminRole::Admin,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            AdminRole::Admin => "admin",
            AdminRole::User => "user",
        }
    }
}

/// An entry of the `adminUsers` collection.
///
/// Emails are stored lowercased so lookups are case-insensitive. Older entries may lack a
/// password hash; they cannot sign in until one is set.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdminAccount {
    #[serde(rename = "_id")]
    pub id: ObjectId,
    pub email: String,
    #[serde(default)]
    pub password_hash: String,
    #[serde(default)]
    pub role: AdminRole,
    #[serde(with = "serde_helpers::chrono_datetime_as_bson_datetime")]
    pub created_at: DateTime<Utc>,
}

impl AdminAccount {
    pub fn new(email: &str, password_hash: String, role: AdminRole) -> Self {
        Self {
            id: ObjectId::new(),
            email: normalize_email(email),
            password_hash,
            role,
            created_at: Utc::now(),
        }
    }
}

pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// Session token payload for the admin console.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct AdminClaims {
    pub sub: String,
    pub email: String,
    pub exp: usize,
}
