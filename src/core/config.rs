use anyhow::{Context, Result};
use std::path::PathBuf;
use std::str::FromStr;

pub const DEFAULT_BASE_URL: &str = "https://www.seedstr.io/api/v2";
pub const DEFAULT_GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";
pub const DEFAULT_OPENAI_BASE_URL: &str = "https://api.openai.com/v1";

const DEFAULT_GEMINI_MODELS: &str = "gemini-2.5-flash-preview-05-20,gemini-2.0-flash,gemini-2.5-pro,gemini-2.5-pro-preview-06-05,gemini-3-pro-preview";
const DEFAULT_OPENAI_MODELS: &str = "gpt-4o-mini,gpt-4.1-mini,gpt-4.1";

/// Credentials, model order and endpoint for one provider family.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProviderSettings {
    pub api_key: String,
    pub models: Vec<String>,
    pub base_url: String,
}

impl ProviderSettings {
    pub fn is_enabled(&self) -> bool {
        !self.api_key.is_empty() && !self.models.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    pub seedstr_base_url: String,
    pub seedstr_api_key: String,
    pub solana_wallet_address: String,
    pub seedstr_owner_url: Option<String>,
    pub gemini: ProviderSettings,
    pub openai: ProviderSettings,
    pub poll_interval_seconds: u64,
    pub min_budget_usd: f64,
    pub max_jobs_per_cycle: u32,
    /// Marketplace calls only; model calls use `llm_timeout_seconds`.
    pub request_timeout_seconds: u64,
    pub llm_timeout_seconds: u64,
    pub log_level: String,
    pub state_path: PathBuf,
    pub port: u16,
}

impl Settings {
    pub fn has_llm_provider(&self) -> bool {
        self.gemini.is_enabled() || self.openai.is_enabled()
    }

    /// Build settings from an arbitrary key lookup. `load_settings` passes the
    /// process environment; tests pass a map.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let text = |key: &str, default: &str| lookup(key).unwrap_or_else(|| default.to_string());
        let trimmed = |key: &str| text(key, "").trim().to_string();

        let owner_url = trimmed("SEEDSTR_OWNER_URL");
        let state_path = match lookup("STATE_PATH") {
            Some(path) if !path.trim().is_empty() => PathBuf::from(path.trim()),
            _ => default_state_path(),
        };

        Ok(Self {
            seedstr_base_url: strip_trailing_slash(&text("SEEDSTR_BASE_URL", DEFAULT_BASE_URL)),
            seedstr_api_key: trimmed("SEEDSTR_API_KEY"),
            solana_wallet_address: trimmed("SOLANA_WALLET_ADDRESS"),
            seedstr_owner_url: (!owner_url.is_empty()).then_some(owner_url),
            gemini: ProviderSettings {
                api_key: trimmed("GEMINI_API_KEY"),
                models: split_models(&text("GEMINI_MODELS", DEFAULT_GEMINI_MODELS)),
                base_url: strip_trailing_slash(&text("GEMINI_BASE_URL", DEFAULT_GEMINI_BASE_URL)),
            },
            openai: ProviderSettings {
                api_key: trimmed("OPENAI_API_KEY"),
                models: split_models(&text("OPENAI_MODELS", DEFAULT_OPENAI_MODELS)),
                base_url: strip_trailing_slash(&text("OPENAI_BASE_URL", DEFAULT_OPENAI_BASE_URL)),
            },
            poll_interval_seconds: parse_number(&lookup, "POLL_INTERVAL_SECONDS", 30)?,
            min_budget_usd: parse_number(&lookup, "MIN_BUDGET_USD", 0.0)?,
            max_jobs_per_cycle: parse_number(&lookup, "MAX_JOBS_PER_CYCLE", 20)?,
            request_timeout_seconds: parse_number(&lookup, "REQUEST_TIMEOUT_SECONDS", 30)?,
            llm_timeout_seconds: parse_number(&lookup, "LLM_TIMEOUT_SECONDS", 600)?,
            log_level: text("LOG_LEVEL", "INFO").trim().to_uppercase(),
            state_path,
            port: parse_number(&lookup, "PORT", 5000)?,
        })
    }
}

/// Read `.env` (if present) and then the process environment.
pub fn load_settings() -> Result<Settings> {
    dotenvy::dotenv().ok();
    Settings::from_lookup(|key| std::env::var(key).ok())
}

pub fn split_models(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|item| !item.is_empty())
        .map(str::to_string)
        .collect()
}

/// `~/.seedstr/agent_state.json`, or a relative fallback when no home directory exists.
pub fn default_state_path() -> PathBuf {
    dirs::home_dir()
        .map(|home| home.join(".seedstr"))
        .unwrap_or_else(|| PathBuf::from("."))
        .join("agent_state.json")
}

fn strip_trailing_slash(url: &str) -> String {
    url.trim().trim_end_matches('/').to_string()
}

fn parse_number<T, F>(lookup: &F, key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
    F: Fn(&str) -> Option<String>,
{
    match lookup(key) {
        Some(raw) if !raw.trim().is_empty() => raw
            .trim()
            .parse()
            .with_context(|| format!("{} has an invalid value: {:?}", key, raw)),
        _ => Ok(default),
    }
}

#[cfg(test)]
pub(crate) fn test_settings(state_path: PathBuf) -> Settings {
    Settings {
        seedstr_base_url: "https://api.example.com".to_string(),
        seedstr_api_key: "k".to_string(),
        solana_wallet_address: "w".to_string(),
        seedstr_owner_url: None,
        gemini: ProviderSettings::default(),
        openai: ProviderSettings {
            api_key: "o".to_string(),
            models: vec!["o1".to_string()],
            base_url: DEFAULT_OPENAI_BASE_URL.to_string(),
        },
        poll_interval_seconds: 30,
        min_budget_usd: 0.0,
        max_jobs_per_cycle: 20,
        request_timeout_seconds: 30,
        llm_timeout_seconds: 600,
        log_level: "INFO".to_string(),
        state_path,
        port: 5000,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn split_models_trims_and_filters() {
        assert_eq!(split_models(" a, ,b ,, c "), vec!["a", "b", "c"]);
    }

    #[test]
    fn has_llm_provider_with_gemini_only() {
        let mut settings = test_settings(PathBuf::from("state.json"));
        settings.openai = ProviderSettings::default();
        settings.gemini = ProviderSettings {
            api_key: "g".to_string(),
            models: vec!["g1".to_string()],
            base_url: DEFAULT_GEMINI_BASE_URL.to_string(),
        };
        assert!(settings.has_llm_provider());
    }

    #[test]
    fn has_llm_provider_needs_key_and_models() {
        let mut settings = test_settings(PathBuf::from("state.json"));
        settings.openai.models.clear();
        settings.gemini.api_key = "g".to_string();
        assert!(!settings.has_llm_provider());
    }

    #[test]
    fn from_lookup_reads_every_field() {
        let lookup = lookup_from(&[
            ("SEEDSTR_BASE_URL", "https://api.example.com/"),
            ("SEEDSTR_API_KEY", "  key  "),
            ("SOLANA_WALLET_ADDRESS", " wallet "),
            ("SEEDSTR_OWNER_URL", " https://owner.example "),
            ("GEMINI_API_KEY", "g-key"),
            ("OPENAI_API_KEY", ""),
            ("GEMINI_MODELS", "g1,g2"),
            ("OPENAI_MODELS", ""),
            ("POLL_INTERVAL_SECONDS", "15"),
            ("MIN_BUDGET_USD", "2.5"),
            ("MAX_JOBS_PER_CYCLE", "8"),
            ("REQUEST_TIMEOUT_SECONDS", "45"),
            ("LLM_TIMEOUT_SECONDS", "120"),
            ("LOG_LEVEL", "debug"),
            ("STATE_PATH", "custom_state.json"),
        ]);
        let settings = Settings::from_lookup(lookup).unwrap();

        assert_eq!(settings.seedstr_base_url, "https://api.example.com");
        assert_eq!(settings.seedstr_api_key, "key");
        assert_eq!(settings.solana_wallet_address, "wallet");
        assert_eq!(
            settings.seedstr_owner_url.as_deref(),
            Some("https://owner.example")
        );
        assert_eq!(settings.gemini.models, vec!["g1", "g2"]);
        assert!(settings.openai.models.is_empty());
        assert_eq!(settings.poll_interval_seconds, 15);
        assert_eq!(settings.min_budget_usd, 2.5);
        assert_eq!(settings.max_jobs_per_cycle, 8);
        assert_eq!(settings.request_timeout_seconds, 45);
        assert_eq!(settings.llm_timeout_seconds, 120);
        assert_eq!(settings.log_level, "DEBUG");
        assert_eq!(settings.state_path, PathBuf::from("custom_state.json"));
    }

    #[test]
    fn from_lookup_applies_defaults() {
        let settings = Settings::from_lookup(|_| None).unwrap();
        assert_eq!(settings.seedstr_base_url, DEFAULT_BASE_URL);
        assert_eq!(settings.seedstr_owner_url, None);
        assert_eq!(settings.openai.models, vec!["gpt-4o-mini", "gpt-4.1-mini", "gpt-4.1"]);
        assert_eq!(settings.gemini.models.len(), 5);
        assert_eq!(settings.poll_interval_seconds, 30);
        assert_eq!(settings.max_jobs_per_cycle, 20);
        assert_eq!(settings.llm_timeout_seconds, 600);
        assert_eq!(settings.port, 5000);
        assert!(settings.state_path.ends_with("agent_state.json"));
        assert!(!settings.has_llm_provider());
    }

    #[test]
    fn from_lookup_rejects_malformed_numbers() {
        let err = Settings::from_lookup(lookup_from(&[("POLL_INTERVAL_SECONDS", "soon")]))
            .unwrap_err();
        assert!(err.to_string().contains("POLL_INTERVAL_SECONDS"));
    }
}
