use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::models::package::Package;
use crate::models::ticket::Ticket;
use crate::services::checkout::CheckoutQuote;

#[derive(Debug, Serialize)]
pub struct PackageResponse {
    pub id: String,
    pub name: String,
    pub price: f64,
    pub price_label: String,
    pub description: String,
    pub available: bool,
}

impl PackageResponse {
    pub fn new(package: Package, available: bool) -> Self {
        PackageResponse {
            price_label: package.price_label(),
            id: package.id,
            name: package.name,
            price: package.price,
            description: package.description,
            available,
        }
    }
}

#[derive(Debug, Deserialize, Validate)]
pub struct CheckoutRequest {
    #[validate(length(min = 1, message = "Select a package"))]
    pub package_id: String,

    #[validate(length(min = 1, message = "Enter your name"))]
    pub name: String,

    #[validate(length(min = 1, message = "Enter your phone number"))]
    pub phone: String,

    #[serde(default)]
    pub email: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct CustomField {
    pub display_name: &'static str,
    pub variable_name: &'static str,
    pub value: String,
}

#[derive(Debug, Serialize)]
pub struct CheckoutResponse {
    pub success: bool,
    pub public_key: String,
    pub email: String,
    pub quote: CheckoutQuote,
    pub metadata: Vec<CustomField>,
}

/// Sent by the payment page once the gateway reports a successful charge.
#[derive(Debug, Deserialize, Validate)]
pub struct PaymentCallback {
    #[validate(length(min = 1, message = "Payment reference is required"))]
    pub reference: String,

    #[validate(length(min = 1, message = "Select a package"))]
    pub package_id: String,

    #[validate(length(min = 1, message = "Enter your name"))]
    pub name: String,

    #[validate(length(min = 1, message = "Enter your phone number"))]
    pub phone: String,
}

#[derive(Debug, Serialize)]
pub struct PurchaseResponse {
    pub success: bool,
    pub message: String,
    pub package_id: String,
    pub username: String,
    pub password: String,
    pub reference: String,
    pub transaction_id: Option<String>,
    pub ledger_recorded: bool,
    pub replayed: bool,
    pub sold_out: bool,
    pub ticket: Ticket,
    pub ticket_file: String,
    pub ticket_text: String,
}

#[derive(Debug, Deserialize)]
pub struct SendSmsRequest {
    #[serde(default)]
    pub recipient: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
}
