use std::{fmt::Display, future::Future, time::Duration};

use crate::github_actions;

pub(crate) const DEFAULT_MAX_ATTEMPTS: u32 = 3;
pub(crate) const DEFAULT_DELAY: Duration = Duration::from_millis(500);

/// Fixed-delay retry budget.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct RetryPolicy {
    /// Attempts including the first one, never less than 1.
    pub(crate) max_attempts: u32,
    pub(crate) delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            delay: DEFAULT_DELAY,
        }
    }
}

impl RetryPolicy {
    pub(crate) fn new(max_attempts: u32, delay: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            delay,
        }
    }
}

/// Runs `action` until it succeeds or the policy's attempts are used up, waiting
/// `policy.delay` between attempts. The last error is returned as-is.
pub(crate) async fn with_retry<F, Fut, T, E>(policy: RetryPolicy, mut action: F) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: Display,
{
    let max_attempts = policy.max_attempts.max(1);
    let mut attempt = 0;

    loop {
        match action().await {
            Ok(value) => return Ok(value),
            Err(error) => {
                attempt += 1;
                let message = format!("Retry attempt {attempt} failed: {error}");
                tracing::warn!(attempt, max_attempts, "{message}");
                github_actions::warning(&message);

                if attempt >= max_attempts {
                    let message = format!("All {max_attempts} retry attempts failed.");
                    tracing::error!("{message}");
                    github_actions::error(&message);
                    return Err(error);
                }

                tokio::time::sleep(policy.delay).await;
            }
        }
    }
}
