use anyhow::Result;
use chrono::Utc;
use serde::Serialize;
use std::future::Future;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::error;

/// Progress of the background polling worker, as reported by the health endpoint.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct AgentStatus {
    pub started: bool,
    pub running: bool,
    pub last_error: Option<String>,
    pub last_started_utc: Option<String>,
}

pub type SharedStatus = Arc<Mutex<AgentStatus>>;

pub fn new_shared_status() -> SharedStatus {
    Arc::new(Mutex::new(AgentStatus::default()))
}

/// Spawn the worker produced by `launch` unless one was already started.
///
/// Returns `true` only for the call that actually spawned it. The check and
/// the transition happen under the status lock, so concurrent callers cannot
/// both win.
pub async fn ensure_worker_started<F, Fut>(status: &SharedStatus, launch: F) -> bool
where
    F: FnOnce() -> Fut,
    Fut: Future<Output = Result<()>> + Send + 'static,
{
    {
        let mut current = status.lock().await;
        if current.started {
            return false;
        }
        current.started = true;
        current.running = true;
        current.last_started_utc = Some(Utc::now().to_rfc3339());
    }

    let worker = launch();
    let status = Arc::clone(status);
    tokio::spawn(async move {
        let outcome = worker.await;
        let mut current = status.lock().await;
        if let Err(e) = outcome {
            error!("Background agent crashed: {:#}", e);
            current.last_error = Some(e.to_string());
        }
        current.running = false;
    });
    true
}
