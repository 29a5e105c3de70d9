//! Timed retry for generation jobs.
//!
//! A bounded number of status reads separated by a fixed delay, with an
//! optional wall-clock deadline and a cancel token. The outcome says which of
//! those ended the wait, so a timeout is never confused with a result.

use crate::{error::Result, models::JobState, models::JobStatus};
use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Notify;
use tokio::time::Instant;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PollPolicy {
    pub max_attempts: u32,
    /// Delay before every attempt, including the first.
    pub interval: Duration,
    pub deadline: Option<Duration>,
}

impl Default for PollPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 30,
            interval: Duration::from_secs(1),
            deadline: None,
        }
    }
}

impl PollPolicy {
    pub fn new(max_attempts: u32, interval: Duration) -> Self {
        Self {
            max_attempts,
            interval,
            deadline: None,
        }
    }

    pub fn with_deadline(mut self, deadline: Duration) -> Self {
        self.deadline = Some(deadline);
        self
    }

    /// Upper bound on how long a poll loop can wait. Saturates at
    /// `Duration::MAX`.
    pub fn budget(&self) -> Duration {
        let by_attempts = self
            .interval
            .checked_mul(self.max_attempts)
            .unwrap_or(Duration::MAX);
        match self.deadline {
            Some(deadline) => deadline.min(by_attempts),
            None => by_attempts,
        }
    }
}

/// Cloneable cancel signal; every clone observes the same flag.
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    inner: Arc<CancelInner>,
}

#[derive(Debug, Default)]
struct CancelInner {
    cancelled: AtomicBool,
    notify: Notify,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.inner.cancelled.store(true, Ordering::SeqCst);
        self.inner.notify.notify_waiters();
    }

    /// Clear the flag so the same token can end a later wait.
    pub fn reset(&self) {
        self.inner.cancelled.store(false, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.inner.cancelled.load(Ordering::SeqCst)
    }

    /// Resolves once `cancel` has been called.
    pub async fn cancelled(&self) {
        loop {
            let notified = self.inner.notify.notified();
            if self.is_cancelled() {
                return;
            }
            notified.await;
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum PollOutcome {
    Completed { status: JobStatus, attempts: u32 },
    Failed { status: JobStatus, attempts: u32 },
    TimedOut { attempts: u32, last: Option<JobStatus> },
    Cancelled { attempts: u32 },
}

impl PollOutcome {
    pub fn attempts(&self) -> u32 {
        match self {
            PollOutcome::Completed { attempts, .. }
            | PollOutcome::Failed { attempts, .. }
            | PollOutcome::TimedOut { attempts, .. }
            | PollOutcome::Cancelled { attempts } => *attempts,
        }
    }
}

async fn sleep_until_deadline(deadline: Option<Instant>) {
    match deadline {
        Some(at) => tokio::time::sleep_until(at).await,
        None => futures::future::pending::<()>().await,
    }
}

/// Poll until the job completes or fails, the attempts run out, the deadline
/// passes, or `cancel` fires. Failed reads count as attempts and are skipped.
pub async fn poll_until_complete<F, Fut>(
    policy: &PollPolicy,
    cancel: &CancelToken,
    mut poll: F,
) -> PollOutcome
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<JobStatus>>,
{
    // A deadline too far out to represent is no deadline.
    let deadline = policy
        .deadline
        .and_then(|d| Instant::now().checked_add(d));
    let mut last: Option<JobStatus> = None;

    for attempt in 1..=policy.max_attempts {
        let completed = attempt - 1;

        tokio::select! {
            biased;
            _ = cancel.cancelled() => return PollOutcome::Cancelled { attempts: completed },
            _ = sleep_until_deadline(deadline) => {
                log::warn!("Polling deadline passed after {} attempts", completed);
                return PollOutcome::TimedOut { attempts: completed, last };
            }
            _ = tokio::time::sleep(policy.interval) => {}
        }

        let result = tokio::select! {
            biased;
            _ = cancel.cancelled() => return PollOutcome::Cancelled { attempts: completed },
            _ = sleep_until_deadline(deadline) => {
                log::warn!("Polling deadline passed during attempt {}", attempt);
                return PollOutcome::TimedOut { attempts: attempt, last };
            }
            result = poll() => result,
        };

        match result {
            Ok(status) => {
                log::debug!(
                    "Poll attempt {}/{}: status = {}",
                    attempt,
                    policy.max_attempts,
                    status.status
                );
                match status.status {
                    JobState::Completed => {
                        return PollOutcome::Completed {
                            status,
                            attempts: attempt,
                        }
                    }
                    JobState::Failed => {
                        return PollOutcome::Failed {
                            status,
                            attempts: attempt,
                        }
                    }
                    _ => last = Some(status),
                }
            }
            Err(e) => log::warn!(
                "Poll attempt {}/{} failed, waiting for the next one: {}",
                attempt,
                policy.max_attempts,
                e
            ),
        }
    }

    log::warn!(
        "Job still not completed after {} attempts",
        policy.max_attempts
    );
    PollOutcome::TimedOut {
        attempts: policy.max_attempts,
        last,
    }
}
