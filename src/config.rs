// config.rs
use std::env;
use std::str::FromStr;
use std::time::Duration;

use crate::errors::{AppError, Result};
use crate::services::assignment::EngineConfig;
use crate::services::sms_service::MNOTIFY_QUICK_URL;

pub const DEV_JWT_SECRET: &str = "wifibank-dev-secret-change-in-production";

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,
    pub database_url: Option<String>,
    pub database_name: String,
    pub jwt_secret: String,
    pub super_admin_email: Option<String>,
    pub super_admin_password: Option<String>,
    pub mnotify_key: Option<String>,
    pub mnotify_sender: String,
    pub mnotify_url: String,
    pub admin_alert_phone: Option<String>,
    pub paystack_public_key: String,
    pub checkout_surcharge_percent: f64,
    pub default_package_id: String,
    pub brand_name: String,
    pub engine: EngineConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        AppConfig {
            host: "0.0.0.0".to_string(),
            port: 5000,
            database_url: None,
            database_name: "wifibank".to_string(),
            jwt_secret: DEV_JWT_SECRET.to_string(),
            super_admin_email: None,
            super_admin_password: None,
            mnotify_key: None,
            mnotify_sender: "WiFi Bank".to_string(),
            mnotify_url: MNOTIFY_QUICK_URL.to_string(),
            admin_alert_phone: None,
            paystack_public_key: String::new(),
            checkout_surcharge_percent: 2.0,
            default_package_id: "bronze-1w".to_string(),
            brand_name: "Starlink WiFi Bank".to_string(),
            engine: EngineConfig::default(),
        }
    }
}

fn optional(key: &str) -> Option<String> {
    env::var(key)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn parsed<T: FromStr>(key: &str, default: T) -> Result<T>
where
    T::Err: std::fmt::Display,
{
    match optional(key) {
        Some(raw) => raw
            .parse()
            .map_err(|e| AppError::configuration(format!("{} must be valid: {}", key, e))),
        None => Ok(default),
    }
}

impl AppConfig {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();
        let defaults = AppConfig::default();

        let jwt_secret = optional("JWT_SECRET").unwrap_or_else(|| {
            tracing::warn!("JWT_SECRET not set; using the development secret");
            defaults.jwt_secret.clone()
        });

        let surcharge: f64 = parsed("CHECKOUT_SURCHARGE_PERCENT", defaults.checkout_surcharge_percent)?;
        if !surcharge.is_finite() || surcharge < 0.0 {
            return Err(AppError::configuration(
                "CHECKOUT_SURCHARGE_PERCENT must be a non-negative number",
            ));
        }

        let engine = EngineConfig {
            claim_max_attempts: parsed("CLAIM_MAX_ATTEMPTS", defaults.engine.claim_max_attempts)?
                .max(1),
            ledger_write_attempts: parsed(
                "LEDGER_WRITE_ATTEMPTS",
                defaults.engine.ledger_write_attempts,
            )?
            .max(1),
            ledger_retry_backoff: Duration::from_millis(parsed(
                "LEDGER_RETRY_BACKOFF_MS",
                defaults.engine.ledger_retry_backoff.as_millis() as u64,
            )?),
            idempotent_references: parsed(
                "IDEMPOTENT_REFERENCES",
                defaults.engine.idempotent_references,
            )?,
        };

        Ok(AppConfig {
            host: optional("HOST").unwrap_or(defaults.host),
            port: parsed("PORT", defaults.port)?,
            database_url: optional("DATABASE_URL"),
            database_name: optional("DATABASE_NAME").unwrap_or(defaults.database_name),
            jwt_secret,
            super_admin_email: optional("SUPER_ADMIN_EMAIL"),
            super_admin_password: optional("SUPER_ADMIN_PASSWORD"),
            mnotify_key: optional("MNOTIFY_KEY"),
            mnotify_sender: optional("MNOTIFY_SENDER").unwrap_or(defaults.mnotify_sender),
            mnotify_url: optional("MNOTIFY_URL").unwrap_or(defaults.mnotify_url),
            admin_alert_phone: optional("ADMIN_ALERT_PHONE"),
            paystack_public_key: optional("PAYSTACK_PUBLIC_KEY").unwrap_or_default(),
            checkout_surcharge_percent: surcharge,
            default_package_id: optional("DEFAULT_PACKAGE_ID")
                .unwrap_or(defaults.default_package_id),
            brand_name: optional("BRAND_NAME").unwrap_or(defaults.brand_name),
            engine,
        })
    }

    pub fn is_super_admin(&self, email: &str) -> bool {
        self.super_admin_email
            .as_deref()
            .is_some_and(|admin| admin.trim().eq_ignore_ascii_case(email.trim()))
    }

    pub fn get_config_info(&self) -> serde_json::Value {
        serde_json::json!({
            "store": if self.database_url.is_some() { "mongodb" } else { "memory" },
            "database_name": self.database_name,
            "sms_configured": self.mnotify_key.is_some(),
            "admin_alerts": self.admin_alert_phone.is_some(),
            "surcharge_percent": self.checkout_surcharge_percent,
            "claim_max_attempts": self.engine.claim_max_attempts,
            "ledger_write_attempts": self.engine.ledger_write_attempts,
            "idempotent_references": self.engine.idempotent_references,
            "port": self.port,
            "host": self.host,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn super_admin_match_ignores_case() {
        let config = AppConfig {
            super_admin_email: Some("Owner@Example.com".into()),
            ..AppConfig::default()
        };
        assert!(config.is_super_admin("owner@example.com "));
        assert!(!config.is_super_admin("someone@example.com"));
        assert!(!AppConfig::default().is_super_admin("owner@example.com"));
    }
}
