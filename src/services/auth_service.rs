use bcrypt::{hash, verify, DEFAULT_COST};
use chrono::Utc;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use tracing::{info, warn};

use crate::config::AppConfig;
use crate::errors::{AppError, Result};
use crate::models::admin::{AdminAccount, AdminClaims, AdminRole};
use crate::store::{AdminStore, StoreError};

const SESSION_SECONDS: i64 = 86400;

pub fn hash_password(password: &str) -> Result<String> {
    hash(password, DEFAULT_COST).map_err(|e| AppError::service(format!("bcrypt: {}", e)))
}

pub fn verify_password(password: &str, password_hash: &str) -> bool {
    if password_hash.is_empty() {
        return false;
    }
    verify(password, password_hash).unwrap_or(false)
}

pub fn issue_token(account: &AdminAccount, secret: &str) -> Result<String> {
    let claims = AdminClaims {
        sub: account.id.to_hex(),
        email: account.email.clone(),
        exp: (Utc::now().timestamp() + SESSION_SECONDS) as usize,
    };
    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .map_err(|e| AppError::service(format!("Token generation failed: {}", e)))
}

pub fn decode_token(token: &str, secret: &str) -> Result<AdminClaims> {
    decode::<AdminClaims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::new(Algorithm::HS256),
    )
    .map(|data| data.claims)
    .map_err(|_| AppError::AuthError)
}

/// Creates the configured super admin on first start.
pub async fn seed_super_admin<S: AdminStore + ?Sized>(store: &S, config: &AppConfig) -> Result<()> {
    let (Some(email), Some(password)) = (&config.super_admin_email, &config.super_admin_password)
    else {
        if config.super_admin_email.is_some() {
            warn!("SUPER_ADMIN_EMAIL set without SUPER_ADMIN_PASSWORD; not seeding");
        }
        return Ok(());
    };

    if store.find_admin_by_email(email).await?.is_some() {
        return Ok(());
    }

    let account = AdminAccount::new(email, hash_password(password)?, AdminRole::Admin);
    match store.create_admin(account).await {
        Ok(account) => {
            info!("👤 Seeded super admin {}", account.email);
            Ok(())
        }
        // Another instance won the race.
        Err(StoreError::Conflict(_)) => Ok(()),
        Err(e) => Err(e.into()),
    }
}
