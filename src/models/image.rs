use base64::{engine::general_purpose::STANDARD, Engine as _};
use serde::{Deserialize, Serialize};
use std::fmt;

pub const DEFAULT_MIME_TYPE: &str = "image/jpeg";

/// A photo reference in its canonical form: a remote URL or a data URI.
///
/// Raw base64 never leaves this type; everything that reaches an upstream
/// goes through [`ImageRef::normalize`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(into = "String", from = "String")]
pub struct ImageRef(String);

impl ImageRef {
    pub fn new(raw: impl AsRef<str>) -> Self {
        Self(Self::normalize(raw.as_ref()))
    }

    /// Encode raw image bytes as a data URI.
    pub fn from_bytes(bytes: &[u8], mime_type: Option<&str>) -> Self {
        let mime = mime_type.unwrap_or(DEFAULT_MIME_TYPE);
        Self(format!("data:{};base64,{}", mime, STANDARD.encode(bytes)))
    }

    /// Map bare base64 to a data URI and leave URLs and data URIs untouched.
    /// Surrounding whitespace is trimmed before classification.
    pub fn normalize(value: &str) -> String {
        let value = value.trim();
        if value.starts_with("data:") || is_remote_url(value) {
            return value.to_string();
        }
        format!("data:{};base64,{}", DEFAULT_MIME_TYPE, value)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_remote(&self) -> bool {
        is_remote_url(&self.0)
    }

    pub fn is_data_uri(&self) -> bool {
        self.0.starts_with("data:")
    }

    /// MIME type of a data URI, or the default for remote URLs.
    pub fn mime_type(&self) -> &str {
        self.split_data_uri()
            .map(|(mime, _)| mime)
            .filter(|mime| !mime.is_empty())
            .unwrap_or(DEFAULT_MIME_TYPE)
    }

    /// The base64 payload of a data URI.
    pub fn base64_payload(&self) -> Option<&str> {
        self.split_data_uri().map(|(_, data)| data)
    }

    fn split_data_uri(&self) -> Option<(&str, &str)> {
        let rest = self.0.strip_prefix("data:")?;
        let (header, data) = rest.split_once(',')?;
        let mime = header.split(';').next().unwrap_or_default();
        Some((mime, data))
    }
}

fn is_remote_url(value: &str) -> bool {
    let lower = value
        .get(..8)
        .map(|prefix| prefix.to_ascii_lowercase())
        .unwrap_or_else(|| value.to_ascii_lowercase());
    lower.starts_with("http://") || lower.starts_with("https://")
}

impl fmt::Display for ImageRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<String> for ImageRef {
    fn from(value: String) -> Self {
        Self::new(value)
    }
}

impl From<&str> for ImageRef {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<ImageRef> for String {
    fn from(value: ImageRef) -> Self {
        value.0
    }
}
