//! Client-side flow: landing, upload, preferences, recommendations, result.

pub mod api;
pub mod controller;
pub mod poll;
pub mod state;

pub use api::{ApiClient, StyleApi};
pub use controller::WorkflowController;
pub use poll::{poll_until_complete, CancelToken, PollOutcome, PollPolicy};
pub use state::{GenerationOutcome, Session, Step};
