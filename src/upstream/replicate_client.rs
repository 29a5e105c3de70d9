use crate::{
    config::ReplicateConfig,
    error::{Result, StyleError},
    models::{ImageRef, JobHandle, JobState, JobStatus, StyleHint},
    upstream::{read_json, Catalog, GenerationService},
};
use async_trait::async_trait;
use reqwest::{Client, Url};
use serde::Deserialize;
use serde_json::{json, Value};

const NEGATIVE_PROMPT: &str = "blurry, low quality, distorted, deformed, bad anatomy, extra limbs";

/// Hairstyle transfer through the third-party predictions API.
#[derive(Clone)]
pub struct ReplicateClient {
    http: Client,
    api_token: String,
    api_base: String,
    model_version: String,
    catalog: Catalog,
}

#[derive(Debug, Deserialize)]
struct Prediction {
    id: String,
    #[serde(default)]
    status: String,
    #[serde(default)]
    output: Value,
    #[serde(default)]
    error: Option<Value>,
}

impl Prediction {
    fn state(&self) -> JobState {
        map_status(&self.status)
    }

    fn first_output(&self) -> Option<String> {
        let mut urls = Vec::new();
        collect_output_urls(&self.output, &mut urls);
        urls.into_iter().next()
    }

    fn error_text(&self) -> String {
        match &self.error {
            Some(Value::String(text)) => text.clone(),
            Some(other) if !other.is_null() => other.to_string(),
            _ => "Image generation failed".to_string(),
        }
    }
}

/// Map prediction statuses onto the job status set.
pub fn map_status(status: &str) -> JobState {
    match status.trim().to_ascii_lowercase().as_str() {
        "starting" => JobState::Pending,
        "processing" => JobState::Processing,
        "succeeded" => JobState::Completed,
        "failed" | "canceled" => JobState::Failed,
        other => JobState::parse(other),
    }
}

fn collect_output_urls(value: &Value, out: &mut Vec<String>) {
    match value {
        Value::String(url) => {
            let trimmed = url.trim();
            if trimmed.starts_with("http") && !out.iter().any(|existing| existing == trimmed) {
                out.push(trimmed.to_string());
            }
        }
        Value::Array(rows) => {
            for row in rows {
                collect_output_urls(row, out);
            }
        }
        Value::Object(obj) => {
            for key in ["url", "urls", "output"] {
                if let Some(inner) = obj.get(key) {
                    collect_output_urls(inner, out);
                }
            }
        }
        _ => {}
    }
}

impl ReplicateClient {
    pub fn new(http: Client, config: ReplicateConfig, catalog: Catalog) -> Result<Self> {
        let api_token = config
            .api_token
            .filter(|token| !token.trim().is_empty())
            .ok_or_else(|| StyleError::ConfigError("REPLICATE_API_TOKEN is not set".into()))?;

        Ok(Self {
            http,
            api_token,
            api_base: config.api_base.trim_end_matches('/').to_string(),
            model_version: config.model_version,
            catalog,
        })
    }

    fn prediction_url(&self, job_id: &str) -> Result<Url> {
        let mut url = Url::parse(&format!("{}/predictions", self.api_base))
            .map_err(|e| StyleError::ConfigError(format!("Invalid Replicate URL: {}", e)))?;
        url.path_segments_mut()
            .map_err(|_| StyleError::ConfigError("Replicate URL cannot be a base".into()))?
            .push(job_id);
        Ok(url)
    }

    /// The caller's hint names the style; without one, only catalog ids can
    /// be resolved and anything else is used as the style name verbatim.
    fn build_input(&self, image: &ImageRef, hairstyle_id: &str, hint: Option<&StyleHint>) -> Value {
        let (name, reference) = match hint.filter(|hint| !hint.is_empty()) {
            Some(hint) => (hint.name.as_str(), hint.reference_image.as_deref()),
            None => match self.catalog.find(hairstyle_id) {
                Some(style) => (style.name.as_str(), Some(style.image.as_str())),
                None => (hairstyle_id, None),
            },
        };
        let reference_images: Vec<&str> = reference
            .filter(|url| !url.is_empty())
            .into_iter()
            .collect();

        json!({
            "image": image.as_str(),
            "reference_images": reference_images,
            "prompt": format!(
                "A person with {} hairstyle, high quality, professional photography, realistic",
                name
            ),
            "negative_prompt": NEGATIVE_PROMPT,
            "width": 1024,
            "height": 1024,
            "num_inference_steps": 30,
            "guidance_scale": 7.5,
            "prompt_strength": 0.8,
            "num_samples": 1
        })
    }
}

#[async_trait]
impl GenerationService for ReplicateClient {
    fn name(&self) -> &str {
        "replicate"
    }

    async fn start(
        &self,
        image: &ImageRef,
        hairstyle_id: &str,
        hint: Option<&StyleHint>,
    ) -> Result<JobHandle> {
        let payload = json!({
            "version": self.model_version,
            "input": self.build_input(image, hairstyle_id, hint),
        });

        log::info!("Creating prediction for hairstyle {}", hairstyle_id);
        let response = self
            .http
            .post(format!("{}/predictions", self.api_base))
            .bearer_auth(&self.api_token)
            .json(&payload)
            .send()
            .await?;

        let prediction: Prediction = read_json("Replicate", response).await?;
        let state = prediction.state();
        log::debug!("Prediction {} created with status {}", prediction.id, state);

        match state {
            JobState::Failed => Err(StyleError::UpstreamFailure {
                status: Some(500),
                body: prediction.error_text(),
            }),
            JobState::Completed => match prediction.first_output() {
                Some(url) => Ok(JobHandle::finished(Some(prediction.id), url)),
                None => Ok(JobHandle::pending(prediction.id)),
            },
            other => Ok(JobHandle {
                task_id: Some(prediction.id),
                status: Some(other),
                result_image_url: None,
                message: None,
            }),
        }
    }

    async fn status(&self, job_id: &str) -> Result<JobStatus> {
        let response = self
            .http
            .get(self.prediction_url(job_id)?)
            .bearer_auth(&self.api_token)
            .send()
            .await?;

        let prediction: Prediction = read_json("Replicate poll", response).await?;
        let mut status = JobStatus::new(prediction.id.clone(), prediction.state());
        if status.status.is_completed() {
            status.result_image_url = prediction.first_output();
        }
        if matches!(status.status, JobState::Failed) {
            status.error = Some(prediction.error_text());
        }
        Ok(status)
    }
}
