use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::errors::{AppError, Result};

pub const MNOTIFY_QUICK_URL: &str = "https://api.mnotify.com/api/sms/quick";

/// Anything that can deliver a text message to a phone number.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn send_sms(&self, recipient: &str, message: &str) -> Result<SmsReceipt>;
}

#[derive(Debug, Serialize)]
struct QuickSmsRequest<'a> {
    recipient: Vec<&'a str>,
    sender: &'a str,
    message: &'a str,
    is_schedule: bool,
    schedule_date: &'a str,
}

/// Gateway reply, passed through to relay callers.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SmsReceipt {
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub summary: Option<serde_json::Value>,
}

/// mNotify quick-SMS client.
#[derive(Clone)]
pub struct SMSService {
    api_key: String,
    sender: String,
    url: String,
    client: Client,
}

impl SMSService {
    pub fn new(api_key: String, sender: String, url: String) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(15))
            .build()
            .map_err(|e| AppError::configuration(format!("SMS HTTP client: {}", e)))?;
        Ok(Self {
            api_key,
            sender,
            url,
            client,
        })
    }
}

#[async_trait]
impl Notifier for SMSService {
    async fn send_sms(&self, recipient: &str, message: &str) -> Result<SmsReceipt> {
        let body = QuickSmsRequest {
            recipient: vec![recipient],
            sender: &self.sender,
            message,
            is_schedule: false,
            schedule_date: "",
        };

        let response = self
            .client
            .post(&self.url)
            .query(&[("key", self.api_key.as_str())])
            .json(&body)
            .send()
            .await
            .map_err(|e| AppError::ExternalApi(format!("SMS API error: {}", e)))?;

        if !response.status().is_success() {
            return Err(AppError::ExternalApi(format!(
                "SMS sending failed with status: {}",
                response.status()
            )));
        }

        let receipt: SmsReceipt = response.json().await?;
        if receipt.status != "success" {
            return Err(AppError::ExternalApi(format!(
                "SMS gateway rejected message: {}",
                receipt.message.as_deref().unwrap_or(&receipt.status)
            )));
        }
        Ok(receipt)
    }
}
