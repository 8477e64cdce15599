pub mod providers;

use anyhow::Result;
use async_trait::async_trait;
use reqwest::Client;
use std::fmt;
use tracing::{info, warn};

use crate::core::config::ProviderSettings;
use crate::core::errors::{ConfigurationError, GenerationExhaustedError};
use providers::{GoogleProvider, OpenAiProvider};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProviderKind {
    Gemini,
    OpenAi,
}

impl ProviderKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProviderKind::Gemini => "gemini",
            ProviderKind::OpenAi => "openai",
        }
    }
}

impl fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelTarget {
    pub provider: ProviderKind,
    pub model: String,
}

impl ModelTarget {
    pub fn label(&self) -> String {
        format!("{}:{}", self.provider, self.model)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerationResult {
    pub text: String,
    /// `"<provider>:<model>"` of the target that answered.
    pub model_label: String,
}

#[derive(Debug, Clone)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: &str) -> Self {
        Self {
            role: "system".to_string(),
            content: content.to_string(),
        }
    }

    pub fn user(content: &str) -> Self {
        Self {
            role: "user".to_string(),
            content: content.to_string(),
        }
    }
}

/// Call strategy for one provider family.
pub enum Provider {
    Gemini(GoogleProvider),
    OpenAi(OpenAiProvider),
}

impl Provider {
    pub fn kind(&self) -> ProviderKind {
        match self {
            Provider::Gemini(_) => ProviderKind::Gemini,
            Provider::OpenAi(_) => ProviderKind::OpenAi,
        }
    }

    pub async fn generate(&self, model_id: &str, prompt: &str, system_prompt: &str) -> Result<String> {
        match self {
            Provider::Gemini(p) => p.generate(model_id, prompt, system_prompt).await,
            Provider::OpenAi(p) => p.generate(model_id, prompt, system_prompt).await,
        }
    }
}

/// Anything that can turn a prompt into an answer. The job pipeline only sees this.
#[async_trait]
pub trait AnswerGenerator: Send + Sync {
    async fn generate(
        &self,
        prompt: &str,
        system_prompt: &str,
    ) -> std::result::Result<GenerationResult, GenerationExhaustedError>;
}

/// Tries every configured (provider, model) pair in a fixed priority order.
pub struct LlmFailoverClient {
    providers: Vec<Provider>,
    targets: Vec<ModelTarget>,
}

impl LlmFailoverClient {
    /// Gemini targets come first, then OpenAI, each in configured order.
    pub fn new(
        gemini: &ProviderSettings,
        openai: &ProviderSettings,
        client: Client,
    ) -> std::result::Result<Self, ConfigurationError> {
        let mut providers = Vec::new();
        let mut targets = Vec::new();

        if gemini.is_enabled() {
            providers.push(Provider::Gemini(GoogleProvider::new(
                gemini.api_key.clone(),
                gemini.base_url.clone(),
                client.clone(),
            )));
            targets.extend(gemini.models.iter().map(|model| ModelTarget {
                provider: ProviderKind::Gemini,
                model: model.clone(),
            }));
        }

        if openai.is_enabled() {
            providers.push(Provider::OpenAi(OpenAiProvider::new(
                openai.api_key.clone(),
                openai.base_url.clone(),
                client,
            )));
            targets.extend(openai.models.iter().map(|model| ModelTarget {
                provider: ProviderKind::OpenAi,
                model: model.clone(),
            }));
        }

        if targets.is_empty() {
            return Err(ConfigurationError);
        }

        for provider in &providers {
            info!("Registered LLM Provider: {}", provider.kind());
        }

        Ok(Self { providers, targets })
    }

    pub fn targets(&self) -> &[ModelTarget] {
        &self.targets
    }

    fn get_provider(&self, kind: ProviderKind) -> Option<&Provider> {
        self.providers.iter().find(|p| p.kind() == kind)
    }

    async fn try_target(&self, target: &ModelTarget, prompt: &str, system_prompt: &str) -> Result<String> {
        let provider = self
            .get_provider(target.provider)
            .ok_or_else(|| anyhow::anyhow!("{} client is not configured", target.provider))?;
        provider.generate(&target.model, prompt, system_prompt).await
    }
}

#[async_trait]
impl AnswerGenerator for LlmFailoverClient {
    async fn generate(
        &self,
        prompt: &str,
        system_prompt: &str,
    ) -> std::result::Result<GenerationResult, GenerationExhaustedError> {
        let mut failures = Vec::new();

        for target in &self.targets {
            let label = target.label();
            info!("Trying {} model: {}", target.provider, target.model);
            match self.try_target(target, prompt, system_prompt).await {
                Ok(text) if !text.trim().is_empty() => {
                    return Ok(GenerationResult {
                        text: text.trim().to_string(),
                        model_label: label,
                    });
                }
                Ok(_) => {
                    let msg = format!("{} returned empty output", label);
                    warn!("{}", msg);
                    failures.push(msg);
                }
                Err(e) => {
                    let msg = format!("{} failed: {}", label, e);
                    warn!("{}", msg);
                    failures.push(msg);
                }
            }
        }

        Err(GenerationExhaustedError { failures })
    }
}
