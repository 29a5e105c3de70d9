use crate::workflow::poll::PollPolicy;
use std::env;
use std::time::Duration;

pub const DEFAULT_UPSTREAM_URL: &str = "http://localhost:8080";
pub const DEFAULT_GEMINI_BASE: &str = "https://generativelanguage.googleapis.com/v1beta";
pub const DEFAULT_GEMINI_MODEL: &str = "gemini-2.0-flash";
pub const DEFAULT_REPLICATE_BASE: &str = "https://api.replicate.com/v1";
pub const DEFAULT_REPLICATE_VERSION: &str =
    "c98b2e7a196828d00955767813b81fc05c5c9b294c670c6d147d545fed4ceecf";

/// Which upstream the proxy forwards to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpstreamMode {
    /// A separate backend service speaking the same routes.
    Backend,
    /// The vision API for recommendations and the predictions API for generation.
    Direct,
    /// Built-in catalog, no network.
    Mock,
}

impl UpstreamMode {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "backend" => Some(UpstreamMode::Backend),
            "direct" => Some(UpstreamMode::Direct),
            "mock" => Some(UpstreamMode::Mock),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            UpstreamMode::Backend => "backend",
            UpstreamMode::Direct => "direct",
            UpstreamMode::Mock => "mock",
        }
    }
}

#[derive(Debug, Clone)]
pub struct GeminiConfig {
    pub api_key: Option<String>,
    pub api_base: String,
    pub model: String,
}

#[derive(Debug, Clone)]
pub struct ReplicateConfig {
    pub api_token: Option<String>,
    pub api_base: String,
    pub model_version: String,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: Option<u16>,
    pub mode: UpstreamMode,
    pub upstream_url: String,
    pub gemini: GeminiConfig,
    pub replicate: ReplicateConfig,
    pub poll: PollPolicy,
    pub request_timeout: Duration,
}

impl Default for GeminiConfig {
    fn default() -> Self {
        GeminiConfig {
            api_key: None,
            api_base: DEFAULT_GEMINI_BASE.to_string(),
            model: DEFAULT_GEMINI_MODEL.to_string(),
        }
    }
}

impl GeminiConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_env() -> Self {
        let api_key = non_empty_env("GEMINI_API_KEY").or_else(|| non_empty_env("GOOGLE_API_KEY"));
        let api_base = non_empty_env("GEMINI_API_BASE")
            .map(|base| base.trim_end_matches('/').to_string())
            .unwrap_or_else(|| DEFAULT_GEMINI_BASE.to_string());
        let model = non_empty_env("GEMINI_MODEL").unwrap_or_else(|| DEFAULT_GEMINI_MODEL.to_string());

        GeminiConfig {
            api_key,
            api_base,
            model,
        }
    }

    pub fn with_credentials(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(api_key.into());
        self
    }

    pub fn with_base(mut self, api_base: impl Into<String>) -> Self {
        self.api_base = api_base.into().trim_end_matches('/').to_string();
        self
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }
}

impl Default for ReplicateConfig {
    fn default() -> Self {
        ReplicateConfig {
            api_token: None,
            api_base: DEFAULT_REPLICATE_BASE.to_string(),
            model_version: DEFAULT_REPLICATE_VERSION.to_string(),
        }
    }
}

impl ReplicateConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_env() -> Self {
        let api_token =
            non_empty_env("REPLICATE_API_TOKEN").or_else(|| non_empty_env("REPLICATE_API_KEY"));
        let api_base = non_empty_env("REPLICATE_API_BASE")
            .map(|base| base.trim_end_matches('/').to_string())
            .unwrap_or_else(|| DEFAULT_REPLICATE_BASE.to_string());
        let model_version = non_empty_env("REPLICATE_MODEL_VERSION")
            .unwrap_or_else(|| DEFAULT_REPLICATE_VERSION.to_string());

        ReplicateConfig {
            api_token,
            api_base,
            model_version,
        }
    }

    pub fn with_credentials(mut self, api_token: impl Into<String>) -> Self {
        self.api_token = Some(api_token.into());
        self
    }

    pub fn with_base(mut self, api_base: impl Into<String>) -> Self {
        self.api_base = api_base.into().trim_end_matches('/').to_string();
        self
    }
}

impl Default for Config {
    fn default() -> Self {
        Config {
            host: "127.0.0.1".to_string(),
            port: None,
            mode: UpstreamMode::Backend,
            upstream_url: DEFAULT_UPSTREAM_URL.to_string(),
            gemini: GeminiConfig::default(),
            replicate: ReplicateConfig::default(),
            poll: PollPolicy::default(),
            request_timeout: Duration::from_secs(60),
        }
    }
}

impl Config {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_env() -> Self {
        let defaults = Config::default();

        let host = non_empty_env("HOST").unwrap_or(defaults.host);
        let port = env::var("PORT").ok().and_then(|port| port.parse().ok());
        let mode = match non_empty_env("UPSTREAM_MODE") {
            Some(value) => UpstreamMode::parse(&value).unwrap_or_else(|| {
                log::warn!("Unknown UPSTREAM_MODE '{}', using backend", value);
                UpstreamMode::Backend
            }),
            None => UpstreamMode::Backend,
        };
        let upstream_url = non_empty_env("UPSTREAM_API_URL")
            .or_else(|| non_empty_env("NEXT_PUBLIC_API_URL"))
            .map(|url| url.trim_end_matches('/').to_string())
            .unwrap_or(defaults.upstream_url);

        let mut poll = PollPolicy::default();
        if let Some(attempts) = parse_env::<u32>("POLL_MAX_ATTEMPTS") {
            poll.max_attempts = attempts;
        }
        if let Some(ms) = parse_env::<u64>("POLL_INTERVAL_MS") {
            poll.interval = Duration::from_millis(ms);
        }
        if let Some(ms) = parse_env::<u64>("POLL_DEADLINE_MS") {
            poll.deadline = Some(Duration::from_millis(ms));
        }

        let request_timeout = parse_env::<u64>("REQUEST_TIMEOUT_SECS")
            .map(Duration::from_secs)
            .unwrap_or(defaults.request_timeout);

        Config {
            host,
            port,
            mode,
            upstream_url,
            gemini: GeminiConfig::from_env(),
            replicate: ReplicateConfig::from_env(),
            poll,
            request_timeout,
        }
    }

    pub fn port_or_default(&self) -> u16 {
        self.port.unwrap_or(3000)
    }

    pub fn with_port(mut self, port: u16) -> Self {
        self.port = Some(port);
        self
    }

    pub fn with_upstream(mut self, url: impl Into<String>) -> Self {
        self.upstream_url = url.into().trim_end_matches('/').to_string();
        self.mode = UpstreamMode::Backend;
        self
    }

    pub fn with_mode(mut self, mode: UpstreamMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn with_gemini(mut self, config: GeminiConfig) -> Self {
        self.gemini = config;
        self
    }

    pub fn with_replicate(mut self, config: ReplicateConfig) -> Self {
        self.replicate = config;
        self
    }

    pub fn with_poll(mut self, poll: PollPolicy) -> Self {
        self.poll = poll;
        self
    }
}

fn non_empty_env(key: &str) -> Option<String> {
    env::var(key)
        .ok()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

fn parse_env<T: std::str::FromStr>(key: &str) -> Option<T> {
    non_empty_env(key).and_then(|value| value.parse().ok())
}
