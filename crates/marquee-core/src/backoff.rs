//! Exponential backoff and the bounded retry loop shared by every
//! provider adapter.
//!
//! Delay schedule for `n` failed attempts: `min(ceiling, 0.5 * (2^n - 1))`
//! seconds, i.e. 0s, 0.5s, 1.5s, 3.5s, 7.5s, ... saturating at the ceiling
//! (1024s by default). The retry loop waits `delay(n)` before retry `n`
//! (1-indexed) and gives up after [`DEFAULT_MAX_RETRIES`] retries.

use std::future::Future;
use std::time::Duration;

use thiserror::Error;
use tokio_util::sync::CancellationToken;

use crate::error::AppError;

/// Default ceiling for a single backoff delay.
pub const DEFAULT_MAX_DELAY: Duration = Duration::from_secs(1024);

/// Default number of retries after the initial attempt.
pub const DEFAULT_MAX_RETRIES: u32 = 3;

/// Exponential backoff calculator.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Backoff {
    pub max_delay: Duration,
}

impl Default for Backoff {
    fn default() -> Self {
        Self {
            max_delay: DEFAULT_MAX_DELAY,
        }
    }
}

impl Backoff {
    pub fn new(max_delay: Duration) -> Self {
        Self { max_delay }
    }

    /// Delay after `failed_attempts` failures.
    ///
    /// Returns `AppError::InvalidArgument` for a negative count.
    pub fn delay_for_attempt(&self, failed_attempts: i32) -> Result<Duration, AppError> {
        let n = u32::try_from(failed_attempts).map_err(|_| {
            AppError::InvalidArgument("failed_attempts should be non-negative".into())
        })?;
        Ok(self.delay(n))
    }

    /// Whole-second form of [`delay_for_attempt`](Self::delay_for_attempt),
    /// rounding half to even.
    pub fn delay_secs(&self, failed_attempts: i32) -> Result<u64, AppError> {
        let delay = self.delay_for_attempt(failed_attempts)?;
        Ok(delay.as_secs_f64().round_ties_even() as u64)
    }

    /// Sleep for the delay matching `failed_attempts`, aborting as soon as
    /// `cancel` fires.
    pub async fn wait(
        &self,
        failed_attempts: i32,
        cancel: &CancellationToken,
    ) -> Result<(), AppError> {
        let delay = self.delay_for_attempt(failed_attempts)?;
        sleep_or_cancel(delay, cancel).await
    }

    fn delay(&self, failed_attempts: u32) -> Duration {
        let exponent = i32::try_from(failed_attempts).unwrap_or(i32::MAX);
        let secs = 0.5 * (2f64.powi(exponent) - 1.0);
        // Huge exponents overflow `Duration`; anything that large is past the ceiling.
        Duration::try_from_secs_f64(secs).map_or(self.max_delay, |d| d.min(self.max_delay))
    }
}

async fn sleep_or_cancel(delay: Duration, cancel: &CancellationToken) -> Result<(), AppError> {
    tokio::select! {
        biased;
        () = cancel.cancelled() => Err(AppError::Cancelled),
        () = tokio::time::sleep(delay) => Ok(()),
    }
}

/// How a provider fault should be handled by the retry loop.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FaultClass {
    /// Worth retrying (server-side fault).
    Transient,
    /// Refused by the provider; surfaced with this message, never retried.
    Rejected(String),
    /// Not worth retrying and carries nothing useful for the caller.
    Fatal,
}

/// Why a retried operation ultimately failed.
#[derive(Debug, Error)]
pub enum RetryError {
    #[error("operation cancelled")]
    Cancelled,

    #[error("gave up after {attempts} attempts: {last}")]
    Exhausted { attempts: u32, last: AppError },

    #[error("{message}")]
    Rejected { message: String, source: AppError },

    #[error("{0}")]
    Fatal(AppError),
}

/// Bounded retry with exponential backoff.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub backoff: Backoff,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: DEFAULT_MAX_RETRIES,
            backoff: Backoff::default(),
        }
    }
}

impl RetryPolicy {
    pub fn new(max_retries: u32, backoff: Backoff) -> Self {
        Self {
            max_retries,
            backoff,
        }
    }

    /// Run `operation` until it succeeds, hits a non-transient fault, runs
    /// out of retries, or `cancel` fires.
    ///
    /// Cancellation is checked around every attempt and every backoff wait;
    /// an in-flight attempt is dropped when the token fires.
    pub async fn run<T, F, Fut, C>(
        &self,
        provider: &str,
        cancel: &CancellationToken,
        classify: C,
        mut operation: F,
    ) -> Result<T, RetryError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, AppError>>,
        C: Fn(&AppError) -> FaultClass,
    {
        let mut retries = 0u32;

        loop {
            if cancel.is_cancelled() {
                return Err(RetryError::Cancelled);
            }

            let result = tokio::select! {
                biased;
                () = cancel.cancelled() => return Err(RetryError::Cancelled),
                result = operation() => result,
            };

            let error = match result {
                Ok(value) => return Ok(value),
                Err(e) => e,
            };

            match classify(&error) {
                FaultClass::Transient if retries < self.max_retries => {
                    retries += 1;
                    let delay = self.backoff.delay(retries);
                    tracing::warn!(
                        %provider,
                        retry = retries,
                        delay_ms = %delay.as_millis(),
                        error = %error,
                        "Transient provider fault, retrying"
                    );
                    if sleep_or_cancel(delay, cancel).await.is_err() {
                        return Err(RetryError::Cancelled);
                    }
                }
                FaultClass::Transient => {
                    return Err(RetryError::Exhausted {
                        attempts: retries + 1,
                        last: error,
                    });
                }
                FaultClass::Rejected(message) => {
                    return Err(RetryError::Rejected {
                        message,
                        source: error,
                    });
                }
                FaultClass::Fatal => return Err(RetryError::Fatal(error)),
            }
        }
    }
}
