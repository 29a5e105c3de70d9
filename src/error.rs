use thiserror::Error;

#[derive(Debug, Error)]
pub enum StyleError {
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Upstream failure ({}): {body}", status_label(.status))]
    UpstreamFailure { status: Option<u16>, body: String },

    #[error("Parse failure: {0}")]
    ParseFailure(String),

    #[error("Request error: {0}")]
    RequestError(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Serialization error: {0}")]
    SerializationError(String),
}

impl StyleError {
    pub fn invalid(msg: impl Into<String>) -> Self {
        StyleError::InvalidInput(msg.into())
    }

    pub fn upstream(status: u16, body: impl Into<String>) -> Self {
        StyleError::UpstreamFailure {
            status: Some(status),
            body: body.into(),
        }
    }

    /// HTTP status a route handler should answer with.
    pub fn http_status(&self) -> u16 {
        match self {
            StyleError::InvalidInput(_) => 400,
            StyleError::UpstreamFailure { status, .. } => match status {
                Some(code) if (400..=599).contains(code) => *code,
                _ => 500,
            },
            StyleError::ParseFailure(_) | StyleError::RequestError(_) => 502,
            StyleError::ConfigError(_) | StyleError::SerializationError(_) => 500,
        }
    }
}

impl From<reqwest::Error> for StyleError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_decode() {
            StyleError::ParseFailure(e.to_string())
        } else {
            StyleError::RequestError(e.to_string())
        }
    }
}

impl From<serde_json::Error> for StyleError {
    fn from(e: serde_json::Error) -> Self {
        StyleError::SerializationError(e.to_string())
    }
}

fn status_label(status: &Option<u16>) -> String {
    match status {
        Some(code) => code.to_string(),
        None => "no status".to_string(),
    }
}

pub type Result<T> = std::result::Result<T, StyleError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_codes() {
        assert_eq!(StyleError::invalid("image_url is required").http_status(), 400);
        assert_eq!(StyleError::upstream(404, "missing").http_status(), 404);
        assert_eq!(StyleError::upstream(200, "odd").http_status(), 500);
        assert_eq!(
            StyleError::UpstreamFailure {
                status: None,
                body: "reset".into()
            }
            .http_status(),
            500
        );
        assert_eq!(StyleError::ParseFailure("bad".into()).http_status(), 502);
    }

    #[test]
    fn test_display() {
        let err = StyleError::upstream(503, "busy");
        assert_eq!(err.to_string(), "Upstream failure (503): busy");
        assert_eq!(
            StyleError::invalid("hairstyle_id is required").to_string(),
            "Invalid input: hairstyle_id is required"
        );
    }
}
