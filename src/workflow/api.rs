use crate::{
    error::{Result, StyleError},
    models::{Hairstyle, JobHandle, JobStatus, Preferences, StyleHint, SuggestionList},
    proxy::Proxy,
    upstream::build_http_client,
};
use async_trait::async_trait;
use reqwest::{Client, Url};
use serde::de::DeserializeOwned;
use serde_json::json;
use std::time::Duration;

/// What the workflow needs from the proxy layer.
#[async_trait]
pub trait StyleApi: Send + Sync {
    async fn request_recommendations(
        &self,
        image_ref: &str,
        preferences: Option<&Preferences>,
    ) -> Result<Vec<Hairstyle>>;

    async fn request_generation(
        &self,
        image_ref: &str,
        hairstyle_id: &str,
        hint: Option<&StyleHint>,
    ) -> Result<JobHandle>;

    async fn poll_job_status(&self, job_id: &str) -> Result<JobStatus>;
}

#[async_trait]
impl StyleApi for Proxy {
    async fn request_recommendations(
        &self,
        image_ref: &str,
        preferences: Option<&Preferences>,
    ) -> Result<Vec<Hairstyle>> {
        Proxy::request_recommendations(self, image_ref, preferences).await
    }

    async fn request_generation(
        &self,
        image_ref: &str,
        hairstyle_id: &str,
        hint: Option<&StyleHint>,
    ) -> Result<JobHandle> {
        Proxy::request_generation(self, image_ref, hairstyle_id, hint).await
    }

    async fn poll_job_status(&self, job_id: &str) -> Result<JobStatus> {
        Proxy::poll_job_status(self, job_id).await
    }
}

/// HTTP client for the proxy's own routes.
#[derive(Clone)]
pub struct ApiClient {
    http: Client,
    base_url: String,
}

impl ApiClient {
    pub fn new(base_url: impl Into<String>) -> Result<Self> {
        Ok(Self::with_client(
            build_http_client(Duration::from_secs(60))?,
            base_url,
        ))
    }

    pub fn with_client(http: Client, base_url: impl Into<String>) -> Self {
        Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    async fn read<T: DeserializeOwned>(response: reqwest::Response, action: &str) -> Result<T> {
        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            let message = serde_json::from_str::<serde_json::Value>(&body)
                .ok()
                .and_then(|value| value["error"].as_str().map(String::from))
                .unwrap_or_else(|| format!("Failed to {}", action));
            return Err(StyleError::upstream(status.as_u16(), message));
        }

        serde_json::from_str(&body)
            .map_err(|e| StyleError::ParseFailure(format!("Failed to {}: {}", action, e)))
    }
}

#[async_trait]
impl StyleApi for ApiClient {
    async fn request_recommendations(
        &self,
        image_ref: &str,
        preferences: Option<&Preferences>,
    ) -> Result<Vec<Hairstyle>> {
        let response = self
            .http
            .post(format!("{}/api/recommendations", self.base_url))
            .json(&json!({
                "image_url": image_ref,
                "preferences": preferences,
            }))
            .send()
            .await?;

        let list: SuggestionList = Self::read(response, "get recommendations").await?;
        Ok(list.recommendations)
    }

    async fn request_generation(
        &self,
        image_ref: &str,
        hairstyle_id: &str,
        hint: Option<&StyleHint>,
    ) -> Result<JobHandle> {
        let response = self
            .http
            .post(format!("{}/api/generate", self.base_url))
            .json(&json!({
                "original_image_url": image_ref,
                "hairstyle_id": hairstyle_id,
                "style": hint,
            }))
            .send()
            .await?;

        Self::read(response, "generate image").await
    }

    async fn poll_job_status(&self, job_id: &str) -> Result<JobStatus> {
        let mut url = Url::parse(&format!("{}/api/tasks", self.base_url))
            .map_err(|e| StyleError::ConfigError(format!("Invalid API URL: {}", e)))?;
        url.path_segments_mut()
            .map_err(|_| StyleError::ConfigError("API URL cannot be a base".into()))?
            .push(job_id);

        let response = self.http.get(url).send().await?;
        Self::read(response, "check status").await
    }
}
