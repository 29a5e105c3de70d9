//! Request proxy: validate, normalize, forward, relay.

use crate::{
    config::Config,
    error::{Result, StyleError},
    models::{
        assign_missing_ids, Hairstyle, ImageRef, JobHandle, JobStatus, Preferences, StyleHint,
    },
    upstream::{GenerationService, RecommendationService, Upstreams},
};
use std::sync::Arc;

/// Stateless front for the configured upstreams. Cheap to clone.
#[derive(Clone)]
pub struct Proxy {
    upstreams: Upstreams,
}

impl Proxy {
    pub fn new(upstreams: Upstreams) -> Self {
        Self { upstreams }
    }

    pub fn from_config(config: &Config) -> Result<Self> {
        Ok(Self::new(Upstreams::from_config(config)?))
    }

    pub fn with_services(
        recommender: Arc<dyn RecommendationService>,
        generator: Arc<dyn GenerationService>,
    ) -> Self {
        Self::new(Upstreams::new(recommender, generator))
    }

    pub fn upstreams(&self) -> &Upstreams {
        &self.upstreams
    }

    pub async fn request_recommendations(
        &self,
        image_ref: &str,
        preferences: Option<&Preferences>,
    ) -> Result<Vec<Hairstyle>> {
        let image = require_image(image_ref, "image_url")?;

        let list = self
            .upstreams
            .recommender()
            .recommend(&image, preferences)
            .await?;

        log::info!(
            "{} recommendations from {}",
            list.recommendations.len(),
            self.upstreams.recommender().name()
        );
        Ok(assign_missing_ids(list.recommendations))
    }

    pub async fn request_generation(
        &self,
        image_ref: &str,
        hairstyle_id: &str,
        hint: Option<&StyleHint>,
    ) -> Result<JobHandle> {
        let image = require_image(image_ref, "original_image_url")?;
        let hairstyle_id = require_field(hairstyle_id, "hairstyle_id")?;

        let handle = self
            .upstreams
            .generator()
            .start(&image, hairstyle_id, hint)
            .await?;

        match (handle.job_id(), handle.immediate_result()) {
            (_, Some(_)) => log::info!("Generation for {} finished synchronously", hairstyle_id),
            (Some(id), None) => log::info!("Generation for {} queued as {}", hairstyle_id, id),
            (None, None) => log::warn!(
                "Generation upstream returned neither a job nor a result for {}",
                hairstyle_id
            ),
        }
        Ok(handle)
    }

    /// One status read. Retry policy belongs to the caller.
    pub async fn poll_job_status(&self, job_id: &str) -> Result<JobStatus> {
        let job_id = require_field(job_id, "task_id")?;
        let status = self.upstreams.generator().status(job_id).await?;
        log::debug!("Job {} is {}", job_id, status.status);
        Ok(status)
    }
}

fn require_field<'a>(value: &'a str, field: &str) -> Result<&'a str> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(StyleError::invalid(format!("{} is required", field)));
    }
    Ok(trimmed)
}

fn require_image(value: &str, field: &str) -> Result<ImageRef> {
    require_field(value, field).map(ImageRef::new)
}
