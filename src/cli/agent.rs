use anyhow::Result;
use std::sync::Arc;
use tracing::info;

use crate::core::config::Settings;
use crate::core::pipeline::{AgentRunner, JobOutcome};
use crate::core::status::new_shared_status;
use crate::core::terminal::{ROCKET, print_info, print_link, print_success};
use crate::interfaces::web::{HealthServer, Launcher, WorkerFuture};

pub(super) async fn run(settings: &Settings) -> Result<()> {
    let mut runner = AgentRunner::from_settings(settings)?;
    println!("{}Polling {} for jobs", ROCKET, settings.seedstr_base_url);

    tokio::select! {
        result = runner.run_forever() => result,
        _ = tokio::signal::ctrl_c() => {
            info!("Shutting down agent...");
            Ok(())
        }
    }
}

pub(super) async fn once(settings: &Settings) -> Result<()> {
    let mut runner = AgentRunner::from_settings(settings)?;
    let outcomes = runner.run_once().await;

    let submitted = outcomes
        .iter()
        .filter(|o| matches!(o, JobOutcome::Submitted { .. }))
        .count();
    let failed = outcomes
        .iter()
        .filter(|o| matches!(o, JobOutcome::Failed))
        .count();
    if failed > 0 {
        print_info(&format!(
            "Cycle finished: {} job(s) seen, {} submitted, {} failed",
            outcomes.len(),
            submitted,
            failed
        ));
    } else {
        print_success(&format!(
            "Cycle finished: {} job(s) seen, {} submitted",
            outcomes.len(),
            submitted
        ));
    }
    Ok(())
}

/// Health server with the polling loop running in the background from launch.
pub(super) async fn serve(settings: Settings, port: Option<u16>) -> Result<()> {
    let port = port.unwrap_or(settings.port);
    let launcher: Launcher = Arc::new(move || {
        let settings = settings.clone();
        Box::pin(async move {
            let mut runner = AgentRunner::from_settings(&settings)?;
            runner.run_forever().await
        }) as WorkerFuture
    });

    let server = HealthServer::new(new_shared_status(), launcher, "0.0.0.0", port);
    server.start_worker().await;
    print_link("Health", &format!("http://0.0.0.0:{}/healthz", port));
    server.serve().await
}
