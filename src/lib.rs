pub mod config;
pub mod error;
pub mod logger;
pub mod models;
pub mod proxy;
#[cfg(feature = "server")]
pub mod server;
pub mod upstream;
pub mod workflow;

pub use config::{Config, GeminiConfig, ReplicateConfig, UpstreamMode};
pub use error::{Result, StyleError};
pub use models::*;
pub use proxy::Proxy;
pub use upstream::{GenerationService, RecommendationService, Upstreams};
pub use workflow::{
    ApiClient, CancelToken, GenerationOutcome, PollOutcome, PollPolicy, Session, Step, StyleApi,
    WorkflowController,
};
