pub mod negotiate;
pub mod types;

use async_trait::async_trait;
use base64::Engine;
use reqwest::{Client, Method};
use serde_json::{Map, Value, json};
use std::path::Path;
use tracing::{debug, info};

use crate::core::errors::{ApiError, SubmissionExhaustedError};
use negotiate::build_attempts;

/// The marketplace operations the job pipeline depends on.
#[async_trait]
pub trait Marketplace: Send + Sync {
    async fn list_jobs(&self, limit: u32, offset: u32) -> Result<Value, ApiError>;
    async fn accept_job(&self, job_id: &str) -> Result<Value, ApiError>;
    async fn upload_file(&self, path: &Path) -> Result<Value, ApiError>;
    async fn respond_file(
        &self,
        job_id: &str,
        upload_result: &Value,
        fallback_text: &str,
    ) -> Result<Value, SubmissionExhaustedError>;
}

/// Typed client for the Seedstr REST API.
pub struct MarketplaceClient {
    base_url: String,
    api_key: String,
    client: Client,
}

impl MarketplaceClient {
    pub fn new(base_url: &str, api_key: &str, client: Client) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.trim().to_string(),
            client,
        }
    }

    pub fn set_api_key(&mut self, api_key: &str) {
        self.api_key = api_key.trim().to_string();
    }

    async fn request(&self, method: Method, endpoint: &str, payload: Option<&Value>) -> Result<Value, ApiError> {
        let mut req = self
            .client
            .request(method, format!("{}{}", self.base_url, endpoint))
            .header(reqwest::header::CONTENT_TYPE, "application/json");
        if !self.api_key.is_empty() {
            req = req.bearer_auth(&self.api_key);
        }
        if let Some(body) = payload {
            req = req.json(body);
        }

        let res = req.send().await?;
        let status = res.status();
        let text = res.text().await?;
        let data: Value = serde_json::from_str(&text)
            .map_err(|_| ApiError::new(format!("Invalid JSON from API ({})", status.as_u16())))?;

        if !status.is_success() {
            let message = error_field(&data, "message")
                .or_else(|| error_field(&data, "error"))
                .unwrap_or_else(|| format!("HTTP {}", status.as_u16()));
            return Err(ApiError::new(message));
        }
        Ok(data)
    }

    pub async fn register(&self, wallet_address: &str, owner_url: Option<&str>) -> Result<Value, ApiError> {
        let mut body = json!({ "walletAddress": wallet_address });
        if let Some(url) = owner_url.filter(|u| !u.is_empty()) {
            body["ownerUrl"] = json!(url);
        }
        self.request(Method::POST, "/register", Some(&body)).await
    }

    pub async fn verify(&self) -> Result<Value, ApiError> {
        self.request(Method::POST, "/verify", None).await
    }

    pub async fn get_me(&self) -> Result<Value, ApiError> {
        self.request(Method::GET, "/me", None).await
    }

    pub async fn update_profile(
        &self,
        name: Option<&str>,
        bio: Option<&str>,
        profile_picture: Option<&str>,
    ) -> Result<Value, ApiError> {
        let mut payload = Map::new();
        if let Some(name) = name {
            payload.insert("name".to_string(), json!(name));
        }
        if let Some(bio) = bio {
            payload.insert("bio".to_string(), json!(bio));
        }
        if let Some(picture) = profile_picture {
            payload.insert("profilePicture".to_string(), json!(picture));
        }
        if payload.is_empty() {
            return Err(ApiError::new("No profile fields provided"));
        }
        self.request(Method::PATCH, "/me", Some(&Value::Object(payload)))
            .await
    }

    pub async fn update_skills(&self, skills: &[String]) -> Result<Value, ApiError> {
        let cleaned: Vec<&str> = skills
            .iter()
            .map(|s| s.trim())
            .filter(|s| !s.is_empty())
            .collect();
        self.request(Method::PATCH, "/me", Some(&json!({ "skills": cleaned })))
            .await
    }

    pub async fn list_skills(&self) -> Result<Value, ApiError> {
        self.request(Method::GET, "/skills", None).await
    }

    pub async fn list_jobs(&self, limit: u32, offset: u32) -> Result<Value, ApiError> {
        self.request(
            Method::GET,
            &format!("/jobs?limit={}&offset={}", limit, offset),
            None,
        )
        .await
    }

    pub async fn accept_job(&self, job_id: &str) -> Result<Value, ApiError> {
        self.request(Method::POST, &format!("/jobs/{}/accept", job_id), None)
            .await
    }

    pub async fn decline_job(&self, job_id: &str, reason: &str) -> Result<Value, ApiError> {
        self.request(
            Method::POST,
            &format!("/jobs/{}/decline", job_id),
            Some(&json!({ "reason": reason })),
        )
        .await
    }

    pub async fn respond_text(&self, job_id: &str, content: &str) -> Result<Value, ApiError> {
        self.request(
            Method::POST,
            &format!("/jobs/{}/respond", job_id),
            Some(&json!({ "content": content, "responseType": "TEXT" })),
        )
        .await
    }

    /// Submit an uploaded file as the job response, trying each known body
    /// shape in order and finally falling back to `fallback_text` as TEXT.
    pub async fn respond_file(
        &self,
        job_id: &str,
        upload_result: &Value,
        fallback_text: &str,
    ) -> Result<Value, SubmissionExhaustedError> {
        let endpoint = format!("/jobs/{}/respond", job_id);
        let mut last_error = None;

        for attempt in build_attempts(upload_result, fallback_text) {
            match self
                .request(Method::POST, &endpoint, Some(&attempt.payload()))
                .await
            {
                Ok(data) => {
                    info!(job_id, shape = attempt.shape(), "Response accepted");
                    return Ok(data);
                }
                Err(e) => {
                    debug!(job_id, shape = attempt.shape(), error = %e, "Response shape rejected");
                    last_error = Some(e);
                }
            }
        }

        Err(SubmissionExhaustedError {
            job_id: job_id.to_string(),
            last_error: last_error.unwrap_or_else(|| ApiError::new("no response attempts")),
        })
    }

    pub async fn upload_file(&self, path: &Path) -> Result<Value, ApiError> {
        if !path.exists() {
            return Err(ApiError::new(format!("File not found: {}", path.display())));
        }
        let raw = tokio::fs::read(path)
            .await
            .map_err(|e| ApiError::new(format!("Could not read {}: {}", path.display(), e)))?;
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default();
        let file_type = mime_guess::from_path(path).first_or_octet_stream();

        let payload = json!({
            "files": [{
                "name": name,
                "content": base64::engine::general_purpose::STANDARD.encode(&raw),
                "type": file_type.essence_str(),
            }]
        });
        self.request(Method::POST, "/upload", Some(&payload)).await
    }
}

#[async_trait]
impl Marketplace for MarketplaceClient {
    async fn list_jobs(&self, limit: u32, offset: u32) -> Result<Value, ApiError> {
        MarketplaceClient::list_jobs(self, limit, offset).await
    }

    async fn accept_job(&self, job_id: &str) -> Result<Value, ApiError> {
        MarketplaceClient::accept_job(self, job_id).await
    }

    async fn upload_file(&self, path: &Path) -> Result<Value, ApiError> {
        MarketplaceClient::upload_file(self, path).await
    }

    async fn respond_file(
        &self,
        job_id: &str,
        upload_result: &Value,
        fallback_text: &str,
    ) -> Result<Value, SubmissionExhaustedError> {
        MarketplaceClient::respond_file(self, job_id, upload_result, fallback_text).await
    }
}

fn error_field(data: &Value, key: &str) -> Option<String> {
    match data.get(key)? {
        Value::Null => None,
        Value::String(s) if s.is_empty() => None,
        Value::String(s) => Some(s.clone()),
        Value::Bool(false) => None,
        other => Some(other.to_string()),
    }
}
