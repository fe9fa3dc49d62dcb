use axum::{
    routing::{get, post},
    Router,
};

use crate::state::AppState;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/login", post(crate::handlers::auth::login))
        .route("/logout", post(crate::handlers::auth::logout))
        .route("/me", get(crate::handlers::auth::me))
}
