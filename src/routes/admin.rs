use axum::{
    middleware,
    routing::{delete, get, post, put},
    Router,
};

use crate::handlers::{admin_credentials, admin_packages, admin_transactions, admin_users};
use crate::middleware::auth::require_admin;
use crate::state::AppState;

/// Everything under `/api/admin` requires an admin session.
pub fn routes(state: AppState) -> Router<AppState> {
    Router::new()
        .route(
            "/credentials",
            get(admin_credentials::list_credentials).post(admin_credentials::create_credential),
        )
        .route("/credentials/import", post(admin_credentials::import_credentials))
        .route("/credentials/upload", post(admin_credentials::upload_credentials))
        .route("/credentials/:id/reset", post(admin_credentials::reset_credential))
        .route("/credentials/:id", delete(admin_credentials::delete_credential))
        .route(
            "/transactions",
            get(admin_transactions::list_transactions)
                .delete(admin_transactions::delete_all_transactions),
        )
        .route("/transactions/:id", delete(admin_transactions::delete_transaction))
        .route("/packages", get(admin_packages::list_packages))
        .route(
            "/packages/:id",
            put(admin_packages::upsert_package).delete(admin_packages::delete_package),
        )
        .route("/stats", get(admin_packages::stats))
        .route(
            "/users",
            get(admin_users::list_users).post(admin_users::create_user),
        )
        .route("/users/:id/role", post(admin_users::toggle_role))
        .route("/users/:id", delete(admin_users::delete_user))
        .route_layer(middleware::from_fn_with_state(state, require_admin))
}
