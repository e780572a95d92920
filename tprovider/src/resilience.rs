//! When a failed Messages API call is worth repeating, and how long to wait first.
//!
//! Rate limits (429), overload (529) and gateway failures are transient. A
//! `retry-after` hint from the server replaces the local backoff, unless it asks
//! for a longer pause than the policy tolerates; then the error surfaces at once.
//!
//! ```rust
//! use std::time::Duration;
//! use tprovider::{ProviderError, RetryPolicy};
//!
//! let policy = RetryPolicy::default();
//! let throttled = ProviderError::rate_limited("slow down").with_retry_after(Duration::from_secs(3));
//! assert_eq!(policy.next_delay(1, &throttled), Some(Duration::from_secs(3)));
//!
//! let rejected = ProviderError::invalid_request("bad tool schema");
//! assert_eq!(policy.next_delay(1, &rejected), None);
//! ```

use std::future::Future;
use std::time::Duration;

use crate::{ProviderError, ProviderErrorKind, ProviderId, ProviderOperationHooks};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total calls, the first one included.
    pub max_attempts: u32,
    pub initial_backoff: Duration,
    pub max_backoff: Duration,
    /// Longest server-requested pause honoured before giving up instead.
    pub max_retry_after: Duration,
    /// Whether a call that hit the HTTP client timeout is sent again.
    pub retry_timeouts: bool,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_backoff: Duration::from_millis(200),
            max_backoff: Duration::from_secs(5),
            max_retry_after: Duration::from_secs(30),
            retry_timeouts: false,
        }
    }
}

impl RetryPolicy {
    pub fn new(max_attempts: u32) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            ..Self::default()
        }
    }

    pub fn with_retry_timeouts(mut self, retry_timeouts: bool) -> Self {
        self.retry_timeouts = retry_timeouts;
        self
    }

    pub fn retries(&self, kind: ProviderErrorKind) -> bool {
        match kind {
            ProviderErrorKind::RateLimited
            | ProviderErrorKind::Unavailable
            | ProviderErrorKind::Transport => true,
            ProviderErrorKind::Timeout => self.retry_timeouts,
            ProviderErrorKind::Authentication
            | ProviderErrorKind::InvalidRequest
            | ProviderErrorKind::InvalidResponse
            | ProviderErrorKind::Other => false,
        }
    }

    /// Doubles from `initial_backoff` per attempt, capped at `max_backoff`.
    pub fn backoff(&self, attempt: u32) -> Duration {
        let doublings = attempt.saturating_sub(1).min(16);
        self.initial_backoff
            .saturating_mul(1 << doublings)
            .min(self.max_backoff)
    }

    /// The pause before the next attempt, or `None` when `error` should surface now.
    pub fn next_delay(&self, attempt: u32, error: &ProviderError) -> Option<Duration> {
        if attempt >= self.max_attempts || !self.retries(error.kind) {
            return None;
        }

        match error.retry_after {
            Some(hint) if hint > self.max_retry_after => None,
            Some(hint) => Some(hint),
            None => Some(self.backoff(attempt)),
        }
    }
}

/// Reads a `retry-after` header value given in seconds. HTTP dates are not honoured.
pub fn parse_retry_after(value: &str) -> Option<Duration> {
    let seconds = value.trim().parse::<f64>().ok()?;
    (seconds.is_finite() && seconds >= 0.0).then(|| Duration::from_secs_f64(seconds))
}

pub async fn retry_provider_call<T, Call, CallFuture, Sleep, SleepFuture>(
    provider: ProviderId,
    operation: &str,
    policy: &RetryPolicy,
    hooks: &dyn ProviderOperationHooks,
    mut call: Call,
    mut sleep: Sleep,
) -> Result<T, ProviderError>
where
    Call: FnMut(u32) -> CallFuture,
    CallFuture: Future<Output = Result<T, ProviderError>>,
    Sleep: FnMut(Duration) -> SleepFuture,
    SleepFuture: Future<Output = ()>,
{
    let mut attempt = 1;
    loop {
        hooks.on_attempt_start(provider, operation, attempt);

        let error = match call(attempt).await {
            Ok(value) => {
                hooks.on_success(provider, operation, attempt);
                return Ok(value);
            }
            Err(error) => error,
        };

        let Some(delay) = policy.next_delay(attempt, &error) else {
            hooks.on_failure(provider, operation, attempt, &error);
            return Err(error);
        };
        hooks.on_retry_scheduled(provider, operation, attempt, delay, &error);
        sleep(delay).await;
        attempt += 1;
    }
}
