//! Best-effort buyer and admin notifications.
//!
//! Every send runs on its own task. Failures are logged and dropped: a sale is already durable
//! by the time anything here runs.
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

use crate::models::ticket::Ticket;
use crate::services::sms_service::Notifier;

#[derive(Clone)]
pub struct NotificationDispatcher {
    notifier: Option<Arc<dyn Notifier>>,
    admin_alert_phone: Option<String>,
}

impl NotificationDispatcher {
    pub fn new(notifier: Option<Arc<dyn Notifier>>, admin_alert_phone: Option<String>) -> Self {
        Self {
            notifier,
            admin_alert_phone,
        }
    }

    pub fn disabled() -> Self {
        Self::new(None, None)
    }

    pub fn is_enabled(&self) -> bool {
        self.notifier.is_some()
    }

    pub fn notifier(&self) -> Option<Arc<dyn Notifier>> {
        self.notifier.clone()
    }

    /// Sends the buyer their login. The handle is only useful to tests.
    pub fn dispatch_purchase(&self, ticket: &Ticket) -> Option<JoinHandle<()>> {
        let Some(notifier) = self.notifier.clone() else {
            warn!("SMS not configured; ticket {} not sent", ticket.reference);
            return None;
        };
        let recipient = ticket.phone.clone();
        let reference = ticket.reference.clone();
        let message = ticket.sms_message();

        Some(tokio::spawn(async move {
            match notifier.send_sms(&recipient, &message).await {
                Ok(_) => info!("Credential SMS sent for {}", reference),
                Err(e) => error!("Credential SMS for {} failed: {}", reference, e),
            }
        }))
    }

    /// Tells the admin contact that a paid sale found no stock.
    pub fn alert_out_of_stock(
        &self,
        package_id: &str,
        reference: &str,
        buyer_phone: &str,
    ) -> Option<JoinHandle<()>> {
        let (Some(notifier), Some(admin_phone)) =
            (self.notifier.clone(), self.admin_alert_phone.clone())
        else {
            warn!(
                "Out of stock for {} (reference {}) and no admin alert channel configured",
                package_id, reference
            );
            return None;
        };
        let message = format!(
            "Restock needed: {} sold out. Paid reference {} from {} could not be served.",
            package_id, reference, buyer_phone
        );
        let reference = reference.to_string();

        Some(tokio::spawn(async move {
            if let Err(e) = notifier.send_sms(&admin_phone, &message).await {
                error!("Out-of-stock alert for {} failed: {}", reference, e);
            }
        }))
    }
}
