use axum::{Json, extract::State};
use serde_json::{Value, json};

use super::AppState;

pub const SERVICE_NAME: &str = "seedstr-agent";

/// Liveness check that also boots the background agent if it is not running yet.
pub(crate) async fn health_check(State(state): State<AppState>) -> Json<Value> {
    state.start_worker().await;

    let agent = state.status.lock().await.clone();
    Json(json!({
        "ok": true,
        "service": SERVICE_NAME,
        "app_started_utc": state.app_started_utc,
        "agent": agent,
    }))
}

pub(crate) async fn healthz(State(state): State<AppState>) -> Json<Value> {
    let agent = state.status.lock().await.clone();
    Json(json!({ "ok": true, "agent": agent }))
}
