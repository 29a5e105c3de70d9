pub mod backend_client;
pub mod catalog;
pub mod gemini_client;
pub mod replicate_client;

use crate::{
    config::{Config, UpstreamMode},
    error::{Result, StyleError},
    models::{ImageRef, JobHandle, JobStatus, Preferences, StyleHint, SuggestionList},
};
use async_trait::async_trait;
use reqwest::Client;
use serde::de::DeserializeOwned;
use std::sync::Arc;
use std::time::Duration;

pub use backend_client::BackendClient;
pub use catalog::Catalog;
pub use gemini_client::GeminiClient;
pub use replicate_client::ReplicateClient;

/// Turns a photo and a preference set into ranked suggestions.
#[async_trait]
pub trait RecommendationService: Send + Sync {
    fn name(&self) -> &str;

    async fn recommend(
        &self,
        image: &ImageRef,
        preferences: Option<&Preferences>,
    ) -> Result<SuggestionList>;
}

/// Starts image-synthesis jobs and reports on them.
#[async_trait]
pub trait GenerationService: Send + Sync {
    fn name(&self) -> &str;

    /// `hint` carries the chosen style's name and preview when the caller
    /// knows them; ids alone are only meaningful to the recommender that
    /// issued them.
    async fn start(
        &self,
        image: &ImageRef,
        hairstyle_id: &str,
        hint: Option<&StyleHint>,
    ) -> Result<JobHandle>;

    async fn status(&self, job_id: &str) -> Result<JobStatus>;
}

/// The pair of upstreams the proxy forwards to.
#[derive(Clone)]
pub struct Upstreams {
    recommender: Arc<dyn RecommendationService>,
    generator: Arc<dyn GenerationService>,
}

impl Upstreams {
    pub fn new(
        recommender: Arc<dyn RecommendationService>,
        generator: Arc<dyn GenerationService>,
    ) -> Self {
        Self {
            recommender,
            generator,
        }
    }

    pub fn mock() -> Self {
        let catalog = Arc::new(Catalog::new());
        Self::new(catalog.clone(), catalog)
    }

    pub fn from_config(config: &Config) -> Result<Self> {
        let http = build_http_client(config.request_timeout)?;

        let upstreams = match config.mode {
            UpstreamMode::Mock => Self::mock(),
            UpstreamMode::Backend => {
                let backend = Arc::new(BackendClient::new(http, &config.upstream_url));
                Self::new(backend.clone(), backend)
            }
            UpstreamMode::Direct => {
                let recommender: Arc<dyn RecommendationService> =
                    match GeminiClient::new(http.clone(), config.gemini.clone()) {
                        Ok(client) => Arc::new(client),
                        Err(e) => {
                            log::warn!("⚠️  {}; recommendations come from the catalog", e);
                            Arc::new(Catalog::new())
                        }
                    };
                let generator: Arc<dyn GenerationService> =
                    match ReplicateClient::new(http, config.replicate.clone(), Catalog::new()) {
                        Ok(client) => Arc::new(client),
                        Err(e) => {
                            log::warn!("⚠️  {}; generation echoes the original photo", e);
                            Arc::new(Catalog::new())
                        }
                    };
                Self::new(recommender, generator)
            }
        };

        log::info!(
            "Upstreams ready: recommendations via {}, generation via {}",
            upstreams.recommender.name(),
            upstreams.generator.name()
        );
        Ok(upstreams)
    }

    pub fn recommender(&self) -> &Arc<dyn RecommendationService> {
        &self.recommender
    }

    pub fn generator(&self) -> &Arc<dyn GenerationService> {
        &self.generator
    }
}

pub fn build_http_client(timeout: Duration) -> Result<Client> {
    Client::builder()
        .timeout(timeout)
        .build()
        .map_err(|e| StyleError::ConfigError(format!("HTTP client: {}", e)))
}

/// Read a response body, turning non-2xx into `UpstreamFailure` and bad JSON
/// into `ParseFailure`.
pub(crate) async fn read_json<T: DeserializeOwned>(
    service: &str,
    response: reqwest::Response,
) -> Result<T> {
    let status = response.status();
    let body = response.text().await?;

    if !status.is_success() {
        log::warn!("{} answered {}: {}", service, status.as_u16(), truncate(&body, 512));
        return Err(StyleError::upstream(status.as_u16(), error_message(&body)));
    }

    serde_json::from_str(&body).map_err(|e| {
        StyleError::ParseFailure(format!("{} returned invalid JSON: {}", service, e))
    })
}

// Prefer the upstream's own `error`/`detail` text over the raw body.
fn error_message(body: &str) -> String {
    if let Ok(value) = serde_json::from_str::<serde_json::Value>(body) {
        for key in ["error", "detail", "message"] {
            if let Some(text) = value.get(key).and_then(|v| v.as_str()) {
                return text.to_string();
            }
        }
    }
    truncate(body, 512)
}

pub(crate) fn truncate(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        return text.to_string();
    }
    let mut out: String = text.chars().take(max_chars).collect();
    out.push('…');
    out
}
