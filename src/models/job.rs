use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

/// Upstream-defined job status.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobState {
    Pending,
    Processing,
    Completed,
    Failed,
    Other(String),
}

impl JobState {
    pub fn parse(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "pending" | "queued" => JobState::Pending,
            "processing" | "running" => JobState::Processing,
            "completed" => JobState::Completed,
            "failed" => JobState::Failed,
            _ => JobState::Other(value.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            JobState::Pending => "pending",
            JobState::Processing => "processing",
            JobState::Completed => "completed",
            JobState::Failed => "failed",
            JobState::Other(value) => value,
        }
    }

    pub fn is_completed(&self) -> bool {
        matches!(self, JobState::Completed)
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, JobState::Completed | JobState::Failed)
    }
}

impl Default for JobState {
    fn default() -> Self {
        JobState::Pending
    }
}

impl fmt::Display for JobState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for JobState {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for JobState {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let value = String::deserialize(deserializer)?;
        Ok(JobState::parse(&value))
    }
}

/// What the generation call hands back: a job to poll, a finished image, or both.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct JobHandle {
    #[serde(default, alias = "predictionId", skip_serializing_if = "Option::is_none")]
    pub task_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<JobState>,
    #[serde(default, alias = "imageUrl", skip_serializing_if = "Option::is_none")]
    pub result_image_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl JobHandle {
    pub fn pending(task_id: impl Into<String>) -> Self {
        Self {
            task_id: Some(task_id.into()),
            status: Some(JobState::Pending),
            ..Default::default()
        }
    }

    pub fn finished(task_id: Option<String>, result_image_url: impl Into<String>) -> Self {
        Self {
            task_id,
            status: Some(JobState::Completed),
            result_image_url: Some(result_image_url.into()),
            message: None,
        }
    }

    /// A result image that is already available without polling.
    pub fn immediate_result(&self) -> Option<&str> {
        self.result_image_url
            .as_deref()
            .filter(|url| !url.is_empty())
    }

    pub fn job_id(&self) -> Option<&str> {
        self.task_id.as_deref().filter(|id| !id.is_empty())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct JobStatus {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub task_id: Option<String>,
    #[serde(default)]
    pub status: JobState,
    #[serde(default, alias = "imageUrl", skip_serializing_if = "Option::is_none")]
    pub result_image_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub progress: Option<u8>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl JobStatus {
    pub fn new(task_id: impl Into<String>, status: JobState) -> Self {
        Self {
            task_id: Some(task_id.into()),
            status,
            ..Default::default()
        }
    }

    pub fn with_result(mut self, url: impl Into<String>) -> Self {
        self.result_image_url = Some(url.into());
        self
    }

    pub fn result_image(&self) -> Option<&str> {
        self.result_image_url
            .as_deref()
            .filter(|url| !url.is_empty())
    }
}
