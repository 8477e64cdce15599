use axum::{Router, routing::get};

use super::AppState;
use super::handlers;

pub(crate) fn build_health_router(state: AppState) -> Router {
    Router::new()
        .route("/", get(handlers::health_check))
        .route("/healthz", get(handlers::healthz))
        .with_state(state)
}
