use axum::{
    routing::{get, post},
    Router,
};

use crate::handlers::sms_relay::send_sms;
use crate::handlers::storefront::{checkout, list_packages, payment_callback};
use crate::state::AppState;

pub fn routes() -> Router<AppState> {
    Router::new()
        // GET /api/packages - Catalog with availability flags
        .route("/packages", get(list_packages))
        // POST /api/checkout - Quote a package for the payment page
        .route("/checkout", post(checkout))
        // POST /api/payments/callback - Confirmed payment, hands out a credential
        .route("/payments/callback", post(payment_callback))
        .route("/send-sms", post(send_sms))
}
