//! Retry of platform calls with exponential backoff

use std::future::Future;
use std::time::Duration;

use backoff::ExponentialBackoff;
use backoff::ExponentialBackoffBuilder;

use crate::config::SyncConfiguration;
use crate::platform::{PlatformError, PlatformResult};

const MAX_INTERVAL: Duration = Duration::from_secs(30);

/// How transient platform errors are retried
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub enabled: bool,
    pub max_retries: u32,
    pub initial_interval: Duration,
}

impl RetryPolicy {
    pub fn from_config(config: &SyncConfiguration) -> Self {
        Self {
            enabled: config.retry_enabled(),
            max_retries: config.max_retries(),
            initial_interval: Duration::from_millis(config.retry_backoff_ms()),
        }
    }

    /// A policy that makes exactly one attempt.
    pub fn none() -> Self {
        Self {
            enabled: false,
            max_retries: 0,
            initial_interval: Duration::from_millis(1),
        }
    }

    fn backoff(&self) -> ExponentialBackoff {
        ExponentialBackoffBuilder::new()
            .with_initial_interval(self.initial_interval)
            .with_max_interval(MAX_INTERVAL.max(self.initial_interval))
            .with_max_elapsed_time(None)
            .build()
    }
}

/// Run `op`, retrying transient failures up to `policy.max_retries` times.
///
/// Permanent errors and the error of the final attempt are returned as-is.
pub(crate) async fn with_retry<T, F, Fut>(policy: &RetryPolicy, what: &str, mut op: F) -> PlatformResult<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = PlatformResult<T>>,
{
    if !policy.enabled || policy.max_retries == 0 {
        return op().await;
    }

    let max_retries = policy.max_retries;
    let mut attempt = 0u32;

    backoff::future::retry_notify(
        policy.backoff(),
        || {
            attempt += 1;
            let this_attempt = attempt;
            let fut = op();
            async move {
                fut.await.map_err(|e| classify(e, this_attempt, max_retries))
            }
        },
        |e: PlatformError, wait: Duration| {
            tracing::warn!(operation = what, error = %e, ?wait, "Retrying platform call");
        },
    )
    .await
}

fn classify(e: PlatformError, attempt: u32, max_retries: u32) -> backoff::Error<PlatformError> {
    if e.is_transient() && attempt <= max_retries {
        backoff::Error::transient(e)
    } else {
        backoff::Error::permanent(e)
    }
}
