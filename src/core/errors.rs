use thiserror::Error;

/// No language-model provider has both an API key and at least one model.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("No LLM models configured. Set GEMINI_API_KEY/OPENAI_API_KEY with model lists.")]
pub struct ConfigurationError;

/// Any failed marketplace call: transport, unparseable body, or a non-success status.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("{message}")]
pub struct ApiError {
    pub message: String,
}

impl ApiError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

impl From<reqwest::Error> for ApiError {
    fn from(err: reqwest::Error) -> Self {
        Self::new(format!("Request failed: {}", err))
    }
}

/// Every model target failed or returned empty output.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("All configured models failed. {}", .failures.join(" | "))]
pub struct GenerationExhaustedError {
    /// Per-target failure reasons in attempt order.
    pub failures: Vec<String>,
}

/// Every response shape, including the plain-text fallback, was rejected.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("Failed to submit file response for job {job_id}: {last_error}")]
pub struct SubmissionExhaustedError {
    pub job_id: String,
    #[source]
    pub last_error: ApiError,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generation_exhausted_joins_failures_in_order() {
        let err = GenerationExhaustedError {
            failures: vec![
                "gemini:g1 failed: down".to_string(),
                "openai:o1 returned empty output".to_string(),
            ],
        };
        assert_eq!(
            err.to_string(),
            "All configured models failed. gemini:g1 failed: down | openai:o1 returned empty output"
        );
    }

    #[test]
    fn submission_exhausted_names_job_and_cause() {
        let err = SubmissionExhaustedError {
            job_id: "job-9".to_string(),
            last_error: ApiError::new("nope"),
        };
        assert_eq!(
            err.to_string(),
            "Failed to submit file response for job job-9: nope"
        );
    }
}
