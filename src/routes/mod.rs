use axum::{http::Method, routing::get, Router};
use tower_http::{
    compression::CompressionLayer,
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use crate::handlers::health::{health_check, root};
use crate::state::AppState;

pub mod admin;
pub mod auth;
pub mod storefront;

pub fn build_router(app_state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers(Any)
        .allow_credentials(false);

    Router::new()
        .route("/", get(root))
        .route("/health", get(health_check))
        .route("/api/health", get(health_check))
        .nest("/api", storefront::routes())
        .nest("/api/auth", auth::routes())
        .nest("/api/admin", admin::routes(app_state.clone()))
        .layer(cors)
        .layer(CompressionLayer::new())
        .layer(TraceLayer::new_for_http())
        .with_state(app_state)
}
