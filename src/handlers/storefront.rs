use axum::{extract::State, response::Json};
use chrono::Utc;
use tracing::{info, warn};
use validator::Validate;

use crate::dtos::storefront_dtos::{
    CheckoutRequest, CheckoutResponse, CustomField, PackageResponse, PaymentCallback,
    PurchaseResponse,
};
use crate::errors::{AppError, Result};
use crate::models::package::Package;
use crate::models::ticket::Ticket;
use crate::services::assignment::{AssignmentError, AssignmentRequest};
use crate::services::checkout::{quote, DEFAULT_RECEIPT_EMAIL};
use crate::state::AppState;

async fn find_package(state: &AppState, package_id: &str) -> Result<Package> {
    state
        .catalog
        .find_package(package_id.trim())
        .await?
        .ok_or_else(|| AppError::NotFound(format!("package {}", package_id)))
}

// GET /api/packages
pub async fn list_packages(State(state): State<AppState>) -> Result<Json<Vec<PackageResponse>>> {
    let packages = state.catalog.list_packages().await?;

    let mut response = Vec::with_capacity(packages.len());
    for package in packages {
        let available = state.engine.remaining_stock(&package.id).await? > 0;
        response.push(PackageResponse::new(package, available));
    }
    Ok(Json(response))
}

// POST /api/checkout
pub async fn checkout(
    State(state): State<AppState>,
    Json(payload): Json<CheckoutRequest>,
) -> Result<Json<CheckoutResponse>> {
    payload.validate()?;
    let package = find_package(&state, &payload.package_id).await?;

    if state.engine.remaining_stock(&package.id).await? == 0 {
        return Err(AppError::SoldOut(format!(
            "No credentials available for {}",
            package.name
        )));
    }

    let quote = quote(&package, state.config.checkout_surcharge_percent);
    info!(
        "Checkout quote for {}: {} {:.2}",
        package.id, quote.currency, quote.charge_amount
    );

    let email = payload
        .email
        .map(|e| e.trim().to_string())
        .filter(|e| !e.is_empty())
        .unwrap_or_else(|| DEFAULT_RECEIPT_EMAIL.to_string());

    Ok(Json(CheckoutResponse {
        success: true,
        public_key: state.config.paystack_public_key.clone(),
        email,
        metadata: vec![
            CustomField {
                display_name: "Customer Name",
                variable_name: "name",
                value: payload.name.trim().to_string(),
            },
            CustomField {
                display_name: "Phone",
                variable_name: "phone",
                value: payload.phone.trim().to_string(),
            },
            CustomField {
                display_name: "Package",
                variable_name: "packageId",
                value: package.id.clone(),
            },
        ],
        quote,
    }))
}

// POST /api/payments/callback
pub async fn payment_callback(
    State(state): State<AppState>,
    Json(payload): Json<PaymentCallback>,
) -> Result<Json<PurchaseResponse>> {
    payload.validate()?;
    let package = find_package(&state, &payload.package_id).await?;
    info!(
        "Payment confirmed for {} (reference {})",
        package.id, payload.reference
    );

    let request = AssignmentRequest {
        package_id: package.id.clone(),
        buyer_name: payload.name.clone(),
        buyer_phone: payload.phone.clone(),
        payment_reference: payload.reference.clone(),
        amount: package.price,
    };

    let (assignment, ledger_recorded) = match state.engine.assign(request).await {
        Ok(assignment) => {
            let recorded = assignment.transaction_id.is_some();
            (assignment, recorded)
        }
        Err(AssignmentError::LedgerWriteFailed { assignment, .. }) => (*assignment, false),
        Err(AssignmentError::OutOfStock { package_id }) => {
            warn!(
                "Paid reference {} found {} sold out",
                payload.reference, package_id
            );
            state
                .notifications
                .alert_out_of_stock(&package_id, &payload.reference, &payload.phone);
            return Err(AppError::SoldOut(format!(
                "Payment received but {} is sold out. Please contact the admin with reference {}",
                package.name, payload.reference
            )));
        }
        Err(e) => return Err(e.into()),
    };

    let ticket = Ticket {
        brand: state.config.brand_name.clone(),
        name: assignment.buyer_name.clone(),
        phone: assignment.buyer_phone.clone(),
        package_name: package.name.clone(),
        username: assignment.username.clone(),
        password: assignment.password.clone(),
        reference: assignment.reference.clone(),
        issued_at: Utc::now(),
    };

    if !assignment.replayed {
        state.notifications.dispatch_purchase(&ticket);
    }

    let sold_out = match state.engine.remaining_stock(&package.id).await {
        Ok(remaining) => remaining == 0,
        Err(e) => {
            warn!("Could not refresh stock for {}: {}", package.id, e);
            false
        }
    };

    let message = if ledger_recorded {
        "Payment succeeded! Your WiFi access is ready.".to_string()
    } else {
        "Payment succeeded! Your WiFi access is ready. Keep this ticket; the admin will confirm your receipt.".to_string()
    };

    Ok(Json(PurchaseResponse {
        success: true,
        message,
        package_id: assignment.package_id,
        username: assignment.username,
        password: assignment.password,
        reference: assignment.reference,
        transaction_id: assignment.transaction_id.map(|id| id.to_hex()),
        ledger_recorded,
        replayed: assignment.replayed,
        sold_out,
        ticket_file: ticket.file_name(),
        ticket_text: ticket.render_text(),
        ticket,
    }))
}
