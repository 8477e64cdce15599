mod handlers;
mod router;

use anyhow::{Context, Result};
use chrono::Utc;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use tracing::info;

use crate::core::status::{SharedStatus, ensure_worker_started};

pub use handlers::SERVICE_NAME;
pub(crate) use router::build_health_router;

pub type WorkerFuture = Pin<Box<dyn Future<Output = Result<()>> + Send>>;

/// Builds the long-running agent task; invoked at most once per server.
pub type Launcher = Arc<dyn Fn() -> WorkerFuture + Send + Sync>;

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) status: SharedStatus,
    pub(crate) app_started_utc: String,
    pub(crate) launcher: Launcher,
}

impl AppState {
    pub(crate) async fn start_worker(&self) -> bool {
        let launcher = Arc::clone(&self.launcher);
        ensure_worker_started(&self.status, move || launcher()).await
    }
}

pub struct HealthServer {
    state: AppState,
    host: String,
    port: u16,
}

impl HealthServer {
    pub fn new(status: SharedStatus, launcher: Launcher, host: &str, port: u16) -> Self {
        Self {
            state: AppState {
                status,
                app_started_utc: Utc::now().to_rfc3339(),
                launcher,
            },
            host: host.to_string(),
            port,
        }
    }

    /// Boot the agent now instead of waiting for the first `GET /`.
    pub async fn start_worker(&self) -> bool {
        self.state.start_worker().await
    }

    pub async fn serve(self) -> Result<()> {
        let addr = format!("{}:{}", self.host, self.port);
        let listener = tokio::net::TcpListener::bind(&addr)
            .await
            .with_context(|| format!("Failed to bind health server on {}", addr))?;
        info!("Health server running at http://{addr}");
        axum::serve(listener, build_health_router(self.state)).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::status::new_shared_status;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use serde_json::Value;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tower::ServiceExt;

    fn state_with(launches: Arc<AtomicUsize>, fail: bool) -> AppState {
        let launcher: Launcher = Arc::new(move || {
            launches.fetch_add(1, Ordering::SeqCst);
            Box::pin(async move {
                if fail {
                    anyhow::bail!("No LLM models configured");
                }
                tokio::time::sleep(std::time::Duration::from_secs(3600)).await;
                Ok(())
            }) as WorkerFuture
        });
        AppState {
            status: new_shared_status(),
            app_started_utc: "2026-01-01T00:00:00+00:00".to_string(),
            launcher,
        }
    }

    async fn get_json(state: AppState, uri: &str) -> Value {
        let response = build_health_router(state)
            .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn healthz_does_not_start_agent() {
        let launches = Arc::new(AtomicUsize::new(0));
        let state = state_with(launches.clone(), false);
        let body = get_json(state, "/healthz").await;

        assert_eq!(body["ok"], true);
        assert_eq!(body["agent"]["started"], false);
        assert_eq!(launches.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn root_starts_agent_once() {
        let launches = Arc::new(AtomicUsize::new(0));
        let state = state_with(launches.clone(), false);

        let first = get_json(state.clone(), "/").await;
        let second = get_json(state.clone(), "/").await;

        assert_eq!(first["service"], SERVICE_NAME);
        assert_eq!(first["app_started_utc"], "2026-01-01T00:00:00+00:00");
        assert_eq!(first["agent"]["started"], true);
        assert_eq!(second["agent"]["running"], true);
        assert!(second["agent"]["last_started_utc"].is_string());
        assert_eq!(launches.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn eager_start_is_not_repeated_by_root() {
        let launches = Arc::new(AtomicUsize::new(0));
        let state = state_with(launches.clone(), false);
        let server = HealthServer {
            state: state.clone(),
            host: "127.0.0.1".to_string(),
            port: 0,
        };

        assert!(server.start_worker().await);
        assert!(!server.start_worker().await);
        let body = get_json(state, "/").await;

        assert_eq!(body["agent"]["started"], true);
        assert_eq!(launches.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn crashed_agent_reports_error() {
        let launches = Arc::new(AtomicUsize::new(0));
        let state = state_with(launches, true);
        get_json(state.clone(), "/").await;

        let mut body = Value::Null;
        for _ in 0..100 {
            body = get_json(state.clone(), "/healthz").await;
            if body["agent"]["running"] == false {
                break;
            }
            tokio::time::sleep(std::time::Duration::from_millis(10)).await;
        }
        assert_eq!(body["agent"]["running"], false);
        assert_eq!(body["agent"]["last_error"], "No LLM models configured");
    }
}
