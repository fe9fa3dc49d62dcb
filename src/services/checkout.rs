use serde::Serialize;

use crate::models::package::Package;

pub const CURRENCY: &str = "GHS";
pub const DEFAULT_RECEIPT_EMAIL: &str = "no-reply@starlinkwifi.com";

/// What the storefront asks the payment gateway to charge.
///
/// `amount` is the catalog price recorded in the ledger; `charge_amount` adds the configured
/// surcharge and is only ever sent to the gateway.
#[derive(Debug, Clone, Serialize)]
pub struct CheckoutQuote {
    pub package_id: String,
    pub package_name: String,
    pub amount: f64,
    pub surcharge_percent: f64,
    pub charge_amount: f64,
    /// Gateway units (pesewas).
    pub amount_minor: i64,
    pub currency: &'static str,
}

pub fn quote(package: &Package, surcharge_percent: f64) -> CheckoutQuote {
    let charge_amount = package.price * (1.0 + surcharge_percent / 100.0);
    CheckoutQuote {
        package_id: package.id.clone(),
        package_name: package.name.clone(),
        amount: package.price,
        surcharge_percent,
        charge_amount,
        amount_minor: (charge_amount * 100.0).round() as i64,
        currency: CURRENCY,
    }
}
