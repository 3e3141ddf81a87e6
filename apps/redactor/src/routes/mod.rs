pub mod health;

use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};

use crate::redaction::handlers;
use crate::state::AppState;

pub fn build_router(state: AppState) -> Router {
    let body_limit = state.max_upload_bytes;
    Router::new()
        .route("/health", get(health::health_handler))
        .route(
            "/api/v1/redact",
            post(handlers::handle_redact).layer(DefaultBodyLimit::max(body_limit)),
        )
        .with_state(state)
}
