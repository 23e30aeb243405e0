//! Error types for the test-orchestration framework
//!
//! Two layers of errors exist:
//!
//! - [`DriverError`]: a failure reported by the backend driver, carrying the
//!   backend's numeric code and an [`ErrorClass`] that fixes how retrying
//!   code must treat it. The classification lives on the error itself so it
//!   is identical at every call site.
//! - [`Error`]: framework-level failures (configuration, driver seam,
//!   exhausted retries).
//!
//! We use `thiserror` for automatic `Display` and `Error` trait
//! implementations.

use thiserror::Error;

/// Result type alias for framework operations
pub type Result<T> = std::result::Result<T, Error>;

/// Result type alias for driver-facing operations
pub type DriverResult<T> = std::result::Result<T, DriverError>;

/// How a backend failure must be treated by operation code.
///
/// The class of a given backend code is a property of the error, not of the
/// call site: every helper that executes operations applies the same
/// three-way split, so test flakiness is bounded by the backend's real
/// transient-error rate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    /// Resource contention, timeout, backpressure. Retry with backoff, up to
    /// a bound; exceeding the bound is a hard failure.
    Temporary,
    /// Permanent but expected under the current operation (row already
    /// exists during an idempotent load, row missing during a tolerant
    /// delete). Log and continue; neither retried nor fatal.
    Expected,
    /// Permanent and unexpected. Fail the operation immediately.
    Fatal,
}

/// A failure reported by the backend driver.
#[derive(Debug, Clone, Error)]
#[error("driver error {code} ({class:?}): {message}")]
pub struct DriverError {
    /// Backend-specific numeric error code
    pub code: u32,
    /// Human-readable description from the backend
    pub message: String,
    /// Fixed retry classification for this code
    pub class: ErrorClass,
}

impl DriverError {
    /// Construct a driver error with an explicit classification.
    pub fn new(code: u32, message: impl Into<String>, class: ErrorClass) -> Self {
        DriverError {
            code,
            message: message.into(),
            class,
        }
    }

    /// Shorthand for a temporary (retryable) error.
    pub fn temporary(code: u32, message: impl Into<String>) -> Self {
        Self::new(code, message, ErrorClass::Temporary)
    }

    /// Shorthand for a permanent-but-expected error.
    pub fn expected(code: u32, message: impl Into<String>) -> Self {
        Self::new(code, message, ErrorClass::Expected)
    }

    /// Shorthand for a permanent, unexpected error.
    pub fn fatal(code: u32, message: impl Into<String>) -> Self {
        Self::new(code, message, ErrorClass::Fatal)
    }

    /// True if retrying this operation may succeed.
    pub fn is_temporary(&self) -> bool {
        self.class == ErrorClass::Temporary
    }
}

/// Framework-level error type
#[derive(Debug, Error)]
pub enum Error {
    /// Malformed run configuration (unknown test name, unknown table,
    /// malformed CLI arguments). Nothing runs when this is raised.
    #[error("configuration error: {0}")]
    Config(String),

    /// The backend driver reported a failure that was not absorbed by the
    /// retry policy.
    #[error(transparent)]
    Driver(#[from] DriverError),

    /// A temporary error persisted past the retry bound.
    #[error("retries exhausted after {attempts} attempts: {source}")]
    RetriesExhausted {
        /// Total attempts made, including the first
        attempts: u32,
        /// The last temporary error observed
        source: DriverError,
    },

    /// I/O error (log sinks, report output)
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
