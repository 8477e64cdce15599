use anyhow::{Context, Result};
use reqwest::Client;
use serde_json::Value;
use std::time::Duration;
use tracing::{error, info, warn};

use crate::core::config::Settings;
use crate::core::llm::{AnswerGenerator, LlmFailoverClient};
use crate::core::marketplace::types::{Job, JobType};
use crate::core::marketplace::{Marketplace, MarketplaceClient};
use crate::core::packager::{SubmissionArchive, archive_file_name, path_safe_id};
use crate::core::seen::SeenJobStore;

pub const SYSTEM_PROMPT: &str = "You are an autonomous Seedstr marketplace agent. \
Give accurate and concise responses. \
If you are unsure, say what assumptions you made.";

/// Terminal state of one job within a polling cycle.
#[derive(Debug, Clone, PartialEq)]
pub enum JobOutcome {
    MissingId,
    AlreadySeen,
    UnderBudget { budget: f64 },
    AcceptFailed,
    EmptyPrompt,
    Submitted { model: String },
    /// Generation or submission failed; the job stays unseen and is retried.
    Failed,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RunnerOptions {
    pub min_budget_usd: f64,
    pub max_jobs_per_cycle: u32,
    pub poll_interval: Duration,
}

impl RunnerOptions {
    pub fn from_settings(settings: &Settings) -> Self {
        Self {
            min_budget_usd: settings.min_budget_usd,
            max_jobs_per_cycle: settings.max_jobs_per_cycle,
            poll_interval: Duration::from_secs(settings.poll_interval_seconds),
        }
    }
}

pub fn marketplace_http_client(settings: &Settings) -> Result<Client> {
    Client::builder()
        .timeout(Duration::from_secs(settings.request_timeout_seconds))
        .build()
        .context("Failed to build marketplace HTTP client")
}

/// Model calls are bounded by `llm_timeout_seconds`, never by the marketplace timeout.
pub fn llm_http_client(settings: &Settings) -> Result<Client> {
    Client::builder()
        .timeout(Duration::from_secs(settings.llm_timeout_seconds))
        .build()
        .context("Failed to build model HTTP client")
}

/// Drives polling cycles: list, filter, accept, generate, package, submit, remember.
pub struct AgentRunner {
    marketplace: Box<dyn Marketplace>,
    generator: Box<dyn AnswerGenerator>,
    seen: SeenJobStore,
    options: RunnerOptions,
}

impl AgentRunner {
    pub fn new(
        marketplace: Box<dyn Marketplace>,
        generator: Box<dyn AnswerGenerator>,
        seen: SeenJobStore,
        options: RunnerOptions,
    ) -> Self {
        Self {
            marketplace,
            generator,
            seen,
            options,
        }
    }

    /// Wire the real clients from settings. Fails only when no model provider is usable.
    pub fn from_settings(settings: &Settings) -> Result<Self> {
        let marketplace = MarketplaceClient::new(
            &settings.seedstr_base_url,
            &settings.seedstr_api_key,
            marketplace_http_client(settings)?,
        );
        let llm = LlmFailoverClient::new(
            &settings.gemini,
            &settings.openai,
            llm_http_client(settings)?,
        )?;
        let seen = SeenJobStore::load(&settings.state_path);
        info!(
            "Loaded {} seen job(s) from {}",
            seen.len(),
            settings.state_path.display()
        );

        Ok(Self::new(
            Box::new(marketplace),
            Box::new(llm),
            seen,
            RunnerOptions::from_settings(settings),
        ))
    }

    pub fn seen(&self) -> &SeenJobStore {
        &self.seen
    }

    pub async fn run_forever(&mut self) -> Result<()> {
        info!(
            "Agent started. Polling every {}s",
            self.options.poll_interval.as_secs()
        );
        loop {
            self.run_once().await;
            tokio::time::sleep(self.options.poll_interval).await;
        }
    }

    /// One polling cycle over the first page of listed jobs. Never fails;
    /// a listing error ends the cycle early.
    pub async fn run_once(&mut self) -> Vec<JobOutcome> {
        let payload = match self
            .marketplace
            .list_jobs(self.options.max_jobs_per_cycle, 0)
            .await
        {
            Ok(payload) => payload,
            Err(e) => {
                error!("Failed to list jobs: {}", e);
                return Vec::new();
            }
        };

        let jobs = payload
            .get("jobs")
            .and_then(Value::as_array)
            .cloned()
            .unwrap_or_default();
        if jobs.is_empty() {
            info!("No jobs available");
            return Vec::new();
        }

        let mut outcomes = Vec::with_capacity(jobs.len());
        for raw in &jobs {
            outcomes.push(self.process_job(raw).await);
        }
        outcomes
    }

    pub async fn process_job(&mut self, raw: &Value) -> JobOutcome {
        let job = Job::from_value(raw);
        if job.id.is_empty() {
            return JobOutcome::MissingId;
        }
        if self.seen.contains(&job.id) {
            return JobOutcome::AlreadySeen;
        }

        let budget = job.effective_budget();
        if budget < self.options.min_budget_usd {
            info!(
                "Skip job {}: budget {:.2} < min {:.2}",
                job.id, budget, self.options.min_budget_usd
            );
            self.mark_seen(&job.id);
            return JobOutcome::UnderBudget { budget };
        }

        if job.job_type == JobType::Swarm {
            match self.marketplace.accept_job(&job.id).await {
                Ok(_) => info!(job_id = %job.id, "Accepted SWARM job"),
                Err(e) => {
                    warn!(job_id = %job.id, error = %e, "Could not accept SWARM job");
                    self.mark_seen(&job.id);
                    return JobOutcome::AcceptFailed;
                }
            }
        }

        let prompt = job.prompt.trim();
        if prompt.is_empty() {
            warn!(job_id = %job.id, "Job has empty prompt");
            self.mark_seen(&job.id);
            return JobOutcome::EmptyPrompt;
        }

        match self.answer_and_submit(&job.id, prompt).await {
            Ok(model) => {
                info!(job_id = %job.id, model = %model, "Submitted ZIP response");
                self.mark_seen(&job.id);
                JobOutcome::Submitted { model }
            }
            Err(e) => {
                error!(job_id = %job.id, "Failed processing job: {:#}", e);
                JobOutcome::Failed
            }
        }
    }

    async fn answer_and_submit(&self, job_id: &str, prompt: &str) -> Result<String> {
        let generated = self.generator.generate(prompt, SYSTEM_PROMPT).await?;

        let temp_dir = tempfile::Builder::new()
            .prefix(&format!("seedstr-{}-", path_safe_id(job_id)))
            .tempdir()?;
        let archive_path = temp_dir.path().join(archive_file_name(job_id));
        SubmissionArchive::new(job_id, prompt, &generated.text, &generated.model_label)
            .write_to(&archive_path)?;

        let upload_result = self.marketplace.upload_file(&archive_path).await?;
        self.marketplace
            .respond_file(job_id, &upload_result, &generated.text)
            .await?;
        Ok(generated.model_label)
    }

    fn mark_seen(&mut self, job_id: &str) {
        if let Err(e) = self.seen.mark_seen(job_id) {
            error!(job_id, "Failed to persist seen jobs: {:#}", e);
        }
    }
}
