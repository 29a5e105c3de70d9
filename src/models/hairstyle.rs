use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A hairstyle suggestion as shown on a selectable card.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "RawHairstyle")]
pub struct Hairstyle {
    pub id: String,
    pub name: String,
    pub description: String,
    pub reason: String,
    /// Preview image reference.
    pub image: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
    #[serde(rename = "faceShapeMatch", skip_serializing_if = "Option::is_none")]
    pub face_shape_match: Option<String>,
}

// Upstreams disagree on field names: `image` vs `image_url`, numeric ids,
// camelCase extras.
#[derive(Deserialize)]
struct RawHairstyle {
    #[serde(default)]
    id: Option<Value>,
    #[serde(default)]
    name: String,
    #[serde(default)]
    description: String,
    #[serde(default)]
    reason: String,
    #[serde(default)]
    image: Option<String>,
    #[serde(default)]
    image_url: Option<String>,
    #[serde(default)]
    color: Option<String>,
    #[serde(default, alias = "face_shape_match")]
    #[serde(rename = "faceShapeMatch")]
    face_shape_match: Option<String>,
}

impl From<RawHairstyle> for Hairstyle {
    fn from(raw: RawHairstyle) -> Self {
        let id = match raw.id {
            Some(Value::String(s)) => s,
            Some(Value::Number(n)) => n.to_string(),
            _ => String::new(),
        };
        let image = raw
            .image
            .filter(|image| !image.is_empty())
            .or(raw.image_url)
            .unwrap_or_default();

        Hairstyle {
            id,
            name: raw.name,
            description: raw.description,
            reason: raw.reason,
            image,
            color: raw.color,
            face_shape_match: raw.face_shape_match,
        }
    }
}

impl Hairstyle {
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        description: impl Into<String>,
        reason: impl Into<String>,
        image: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            description: description.into(),
            reason: reason.into(),
            image: image.into(),
            color: None,
            face_shape_match: None,
        }
    }
}

/// Name and preview of the style being generated, passed along with its id
/// so generators need not resolve ids they did not issue.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StyleHint {
    #[serde(default, alias = "hairstyleName")]
    pub name: String,
    #[serde(default, alias = "referenceHairstyle", skip_serializing_if = "Option::is_none")]
    pub reference_image: Option<String>,
}

impl StyleHint {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            reference_image: None,
        }
    }

    pub fn with_reference(mut self, image: impl Into<String>) -> Self {
        self.reference_image = Some(image.into());
        self
    }

    pub fn is_empty(&self) -> bool {
        self.name.trim().is_empty()
    }
}

impl From<&Hairstyle> for StyleHint {
    fn from(style: &Hairstyle) -> Self {
        Self {
            name: style.name.clone(),
            reference_image: Some(style.image.clone()).filter(|image| !image.is_empty()),
        }
    }
}

/// Give every suggestion without an id its 1-based rank.
pub fn assign_missing_ids(mut list: Vec<Hairstyle>) -> Vec<Hairstyle> {
    for (index, hairstyle) in list.iter_mut().enumerate() {
        if hairstyle.id.trim().is_empty() {
            hairstyle.id = (index + 1).to_string();
        }
    }
    list
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SuggestionList {
    #[serde(default)]
    pub recommendations: Vec<Hairstyle>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}
