use crate::models::{Hairstyle, Preferences};
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Step {
    Landing,
    Uploading,
    SettingPreferences,
    FetchingRecommendations,
    AwaitingSelection,
    Generating,
    Result,
}

impl Step {
    pub fn as_str(&self) -> &'static str {
        match self {
            Step::Landing => "landing",
            Step::Uploading => "uploading",
            Step::SettingPreferences => "setting_preferences",
            Step::FetchingRecommendations => "fetching_recommendations",
            Step::AwaitingSelection => "awaiting_selection",
            Step::Generating => "generating",
            Step::Result => "result",
        }
    }
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How the generating step ended.
///
/// Only `Immediate` and `Completed` carry a real generated image; every other
/// variant means the result image is a fallback.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum GenerationOutcome {
    Immediate,
    Completed { attempts: u32 },
    /// The job reported completion but carried no image.
    CompletedWithoutImage { attempts: u32 },
    TimedOut { attempts: u32 },
    Failed { reason: String },
    Cancelled { attempts: u32 },
    StartFailed { reason: String },
}

impl GenerationOutcome {
    pub fn is_generated(&self) -> bool {
        matches!(
            self,
            GenerationOutcome::Immediate | GenerationOutcome::Completed { .. }
        )
    }
}

/// Everything one user's pass through the flow holds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Session {
    pub step: Step,
    pub uploaded_image: Option<String>,
    pub preferences: Preferences,
    pub recommendations: Vec<Hairstyle>,
    pub selected_hairstyle: Option<Hairstyle>,
    pub job_id: Option<String>,
    pub result_image: Option<String>,
    pub outcome: Option<GenerationOutcome>,
}

impl Default for Session {
    fn default() -> Self {
        Self {
            step: Step::Landing,
            uploaded_image: None,
            preferences: Preferences::default(),
            recommendations: Vec::new(),
            selected_hairstyle: None,
            job_id: None,
            result_image: None,
            outcome: None,
        }
    }
}

impl Session {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }

    /// Best image to show when generation produced nothing: the selected
    /// suggestion's preview, else the uploaded photo.
    pub fn fallback_image(&self) -> Option<String> {
        self.selected_hairstyle
            .as_ref()
            .map(|style| style.image.clone())
            .filter(|image| !image.is_empty())
            .or_else(|| self.uploaded_image.clone())
    }
}
