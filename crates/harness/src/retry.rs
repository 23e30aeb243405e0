//! Bounded retry with uniform three-way failure classification
//!
//! Every operation executed against the backend goes through one policy:
//! temporary errors are retried with a fixed backoff up to a bound,
//! permanent-but-expected errors are logged and absorbed, and anything else
//! fails immediately. The classification rides on [`DriverError::class`],
//! so a given backend code is treated identically at every call site and
//! test flakiness is bounded by the backend's real transient-error rate.
//!
//! The backoff sleep happens on the calling thread only and never holds any
//! framework lock.

use std::time::Duration;

use tracing::{debug, warn};

use gauntlet_core::{DriverResult, Error, ErrorClass, Result};

/// Default retry bound, matching the convention used by long-running
/// cluster workloads.
pub const DEFAULT_MAX_RETRIES: u32 = 100;

/// Default fixed backoff between attempts.
pub const DEFAULT_BACKOFF: Duration = Duration::from_millis(50);

/// Bounded fixed-backoff retry policy.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    max_retries: u32,
    backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        RetryPolicy {
            max_retries: DEFAULT_MAX_RETRIES,
            backoff: DEFAULT_BACKOFF,
        }
    }
}

impl RetryPolicy {
    /// Policy with an explicit retry bound and backoff.
    pub fn new(max_retries: u32, backoff: Duration) -> Self {
        RetryPolicy {
            max_retries,
            backoff,
        }
    }

    /// Configured retry bound (retries after the first attempt).
    pub fn max_retries(&self) -> u32 {
        self.max_retries
    }

    /// Run `op` under the policy.
    ///
    /// - success → `Ok(Some(value))`
    /// - `Temporary` → back off and retry; once `max_retries` retries are
    ///   spent (`max_retries + 1` attempts in total) the last error surfaces
    ///   as [`Error::RetriesExhausted`]
    /// - `Expected` → logged and absorbed, `Ok(None)`
    /// - `Fatal` → surfaces immediately as [`Error::Driver`]
    ///
    /// # Errors
    ///
    /// Returns an error only for exhausted retries or a fatal failure.
    pub fn run<T>(&self, mut op: impl FnMut() -> DriverResult<T>) -> Result<Option<T>> {
        let mut attempts: u32 = 0;
        loop {
            attempts += 1;
            let err = match op() {
                Ok(value) => return Ok(Some(value)),
                Err(err) => err,
            };
            match err.class {
                ErrorClass::Temporary => {
                    if attempts > self.max_retries {
                        warn!(
                            target: "gauntlet::retry",
                            code = err.code,
                            attempts,
                            "temporary error persisted past the retry bound"
                        );
                        return Err(Error::RetriesExhausted {
                            attempts,
                            source: err,
                        });
                    }
                    debug!(
                        target: "gauntlet::retry",
                        code = err.code,
                        attempt = attempts,
                        "temporary error, backing off"
                    );
                    std::thread::sleep(self.backoff);
                }
                ErrorClass::Expected => {
                    debug!(
                        target: "gauntlet::retry",
                        code = err.code,
                        error = %err,
                        "expected error, continuing"
                    );
                    return Ok(None);
                }
                ErrorClass::Fatal => {
                    return Err(Error::Driver(err));
                }
            }
        }
    }
}

/// Classify one outcome without retrying: absorb `Expected` errors, pass
/// everything else through. For call sites that loop themselves but must
/// still apply the uniform classification.
pub fn absorb_expected<T>(result: DriverResult<T>) -> DriverResult<Option<T>> {
    match result {
        Ok(value) => Ok(Some(value)),
        Err(e) if e.class == ErrorClass::Expected => {
            debug!(
                target: "gauntlet::retry",
                code = e.code,
                error = %e,
                "expected error, continuing"
            );
            Ok(None)
        }
        Err(e) => Err(e),
    }
}
