use crate::{
    error::{Result, StyleError},
    models::{
        assign_missing_ids, ImageRef, JobHandle, JobStatus, Preferences, StyleHint,
        SuggestionList,
    },
    upstream::{read_json, GenerationService, RecommendationService},
};
use async_trait::async_trait;
use reqwest::{Client, Url};
use serde_json::json;

/// Forwards to a separate backend service that speaks the same routes.
#[derive(Clone)]
pub struct BackendClient {
    http: Client,
    base_url: String,
}

impl BackendClient {
    pub fn new(http: Client, base_url: &str) -> Self {
        Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn task_url(&self, job_id: &str) -> Result<Url> {
        let mut url = Url::parse(&format!("{}/api/tasks", self.base_url))
            .map_err(|e| StyleError::ConfigError(format!("Invalid upstream URL: {}", e)))?;
        url.path_segments_mut()
            .map_err(|_| StyleError::ConfigError("Upstream URL cannot be a base".into()))?
            .push(job_id);
        Ok(url)
    }
}

#[async_trait]
impl RecommendationService for BackendClient {
    fn name(&self) -> &str {
        "backend"
    }

    async fn recommend(
        &self,
        image: &ImageRef,
        preferences: Option<&Preferences>,
    ) -> Result<SuggestionList> {
        let payload = json!({
            "image_url": image.as_str(),
            "preferences": preferences,
        });

        log::debug!("Forwarding recommendation request to {}", self.base_url);
        let response = self
            .http
            .post(format!("{}/api/recommendations", self.base_url))
            .json(&payload)
            .send()
            .await?;

        let mut list: SuggestionList = read_json("Backend recommendations", response).await?;
        list.recommendations = assign_missing_ids(list.recommendations);
        Ok(list)
    }
}

#[async_trait]
impl GenerationService for BackendClient {
    fn name(&self) -> &str {
        "backend"
    }

    async fn start(
        &self,
        image: &ImageRef,
        hairstyle_id: &str,
        hint: Option<&StyleHint>,
    ) -> Result<JobHandle> {
        let payload = json!({
            "original_image_url": image.as_str(),
            "hairstyle_id": hairstyle_id,
            "style": hint,
        });

        log::debug!(
            "Forwarding generation request for hairstyle {} to {}",
            hairstyle_id,
            self.base_url
        );
        let response = self
            .http
            .post(format!("{}/api/generate", self.base_url))
            .json(&payload)
            .send()
            .await?;

        read_json("Backend generate", response).await
    }

    async fn status(&self, job_id: &str) -> Result<JobStatus> {
        let response = self.http.get(self.task_url(job_id)?).send().await?;
        let mut status: JobStatus = read_json("Backend task status", response).await?;
        if status.task_id.is_none() {
            status.task_id = Some(job_id.to_string());
        }
        Ok(status)
    }
}
