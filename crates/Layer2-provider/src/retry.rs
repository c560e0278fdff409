//! Retry logic with exponential backoff and a single fallback
//!
//! `RetryingInvoker` runs one logical model call: the primary operation is
//! attempted up to `max_retries + 1` times while it fails with transient
//! errors, then an optional fallback operation runs exactly once.
//! Attempts are strictly sequential. A cancellation token aborts the current
//! attempt or backoff sleep.

use crate::error::BackendError;
use counsel_foundation::RetrySettings;
use rand::Rng;
use std::future::Future;
use std::time::Duration;
use tokio::time::sleep;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Configuration for retry behavior
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Retries after the first attempt
    pub max_retries: u32,

    /// Delay before the first retry; doubles on every further retry
    pub base_delay: Duration,

    /// Upper bound of the random jitter added to every delay
    pub max_jitter: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 4,
            base_delay: Duration::from_millis(1800),
            max_jitter: Duration::from_millis(400),
        }
    }
}

impl RetryPolicy {
    pub fn from_settings(settings: &RetrySettings) -> Self {
        Self {
            max_retries: settings.effective_max_retries(),
            base_delay: Duration::from_millis(settings.effective_base_delay_ms()),
            max_jitter: Duration::from_millis(settings.effective_max_jitter_ms()),
        }
    }

    /// Create a policy with no retries
    pub fn no_retry() -> Self {
        Self {
            max_retries: 0,
            ..Default::default()
        }
    }

    /// Total primary attempts, including the first
    pub fn max_attempts(&self) -> u32 {
        self.max_retries + 1
    }

    /// `base_delay * 2^attempt` without jitter (attempt is 0-indexed)
    pub fn backoff(&self, attempt: u32) -> Duration {
        let factor = 2u32.saturating_pow(attempt);
        self.base_delay.saturating_mul(factor)
    }

    /// Backoff plus uniform jitter in `0..=max_jitter`
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        let jitter_ms = self.max_jitter.as_millis() as u64;
        let jitter = if jitter_ms == 0 {
            Duration::ZERO
        } else {
            Duration::from_millis(rand::thread_rng().gen_range(0..=jitter_ms))
        };
        self.backoff(attempt) + jitter
    }
}

/// Error classification for retry decisions
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryClassification {
    /// Should retry (transient error)
    Retry,

    /// Should not retry (permanent error)
    NoRetry,
}

/// Trait for errors that can be classified for retry
pub trait RetryableError {
    fn classify(&self) -> RetryClassification;
}

/// Executes model calls with retry, backoff and fallback.
///
/// Holds no per-call state, so one invoker can serve concurrent call sites.
#[derive(Debug, Clone, Default)]
pub struct RetryingInvoker {
    policy: RetryPolicy,
    cancel: Option<CancellationToken>,
}

impl RetryingInvoker {
    pub fn new(policy: RetryPolicy) -> Self {
        Self {
            policy,
            cancel: None,
        }
    }

    /// Abort attempts and backoff sleeps once `token` is cancelled
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = Some(token);
        self
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    /// Run `primary` with retries; the last error surfaces when they run out
    pub async fn invoke<T, F, Fut>(&self, operation_name: &str, primary: F) -> Result<T, BackendError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, BackendError>>,
    {
        self.retry_primary(operation_name, primary).await
    }

    /// Run `primary` with retries, then `fallback` once if it still fails.
    ///
    /// The fallback also runs after a permanent (non-retryable) primary
    /// failure, but never after cancellation. Its own error propagates.
    pub async fn invoke_with_fallback<T, F, Fut, G, GFut>(
        &self,
        operation_name: &str,
        primary: F,
        fallback: G,
    ) -> Result<T, BackendError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, BackendError>>,
        G: FnOnce() -> GFut,
        GFut: Future<Output = Result<T, BackendError>>,
    {
        match self.retry_primary(operation_name, primary).await {
            Ok(value) => Ok(value),
            Err(e) if e.is_cancelled() => Err(e),
            Err(e) => {
                warn!("{}: primary failed ({}), running fallback", operation_name, e);
                let result = self.guarded(operation_name, fallback()).await;
                match &result {
                    Ok(_) => info!("{}: fallback succeeded", operation_name),
                    Err(fallback_err) => {
                        warn!("{}: fallback failed: {}", operation_name, fallback_err)
                    }
                }
                result
            }
        }
    }

    async fn retry_primary<T, F, Fut>(
        &self,
        operation_name: &str,
        mut operation: F,
    ) -> Result<T, BackendError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, BackendError>>,
    {
        let mut attempt = 0;

        loop {
            match self.guarded(operation_name, operation()).await {
                Ok(result) => {
                    if attempt > 0 {
                        debug!("{}: succeeded on attempt {}", operation_name, attempt + 1);
                    }
                    return Ok(result);
                }
                Err(e) => match e.classify() {
                    RetryClassification::NoRetry => {
                        debug!(
                            "{}: non-retryable error on attempt {}: {}",
                            operation_name,
                            attempt + 1,
                            e
                        );
                        return Err(e);
                    }
                    RetryClassification::Retry => {
                        if attempt >= self.policy.max_retries {
                            warn!(
                                "{}: max retries ({}) exceeded: {}",
                                operation_name, self.policy.max_retries, e
                            );
                            return Err(e);
                        }

                        let delay = self.policy.delay_for_attempt(attempt);
                        warn!(
                            "{}: attempt {} failed, retrying in {:?}: {}",
                            operation_name,
                            attempt + 1,
                            delay,
                            e
                        );

                        self.pause(operation_name, delay).await?;
                        attempt += 1;
                    }
                },
            }
        }
    }

    /// Await `future` unless the token fires first
    async fn guarded<T, Fut>(&self, operation_name: &str, future: Fut) -> Result<T, BackendError>
    where
        Fut: Future<Output = Result<T, BackendError>>,
    {
        match &self.cancel {
            Some(token) => {
                tokio::select! {
                    biased;
                    _ = token.cancelled() => Err(cancelled(operation_name)),
                    result = future => result,
                }
            }
            None => future.await,
        }
    }

    async fn pause(&self, operation_name: &str, delay: Duration) -> Result<(), BackendError> {
        match &self.cancel {
            Some(token) => {
                tokio::select! {
                    biased;
                    _ = token.cancelled() => Err(cancelled(operation_name)),
                    _ = sleep(delay) => Ok(()),
                }
            }
            None => {
                sleep(delay).await;
                Ok(())
            }
        }
    }
}

fn cancelled(operation_name: &str) -> BackendError {
    debug!("{}: cancelled", operation_name);
    BackendError::cancelled(format!("{} was cancelled", operation_name))
}
