//! Concurrent test-orchestration engine for Gauntlet
//!
//! This crate implements the execution framework:
//! - SharedContext: property store + stop flag shared by concurrent steps
//! - Step / StepRole: named, resource-scoped, single-result units of work
//! - TestCase: the Init → Steps → Verify → Finalize state machine
//! - TestSuite: table × case batch driver with CLI configuration
//! - RetryPolicy: uniform three-way classification of backend failures
//! - ScriptedDriver: in-memory driver for testing the framework itself
//!
//! An embedding test program registers cases on a suite and hands argv to
//! [`TestSuite::execute`]:
//!
//! ```
//! use gauntlet_core::Verdict;
//! use gauntlet_harness::{ScriptedDriver, TestCase, TestSuite};
//!
//! let mut suite = TestSuite::new("basic");
//! suite.add_table("T1");
//! suite.add_case(
//!     TestCase::new("InsertLoad", "load rows, verify the count")
//!         .property("BATCH", 16u32)
//!         .step("load", |ctx, _run| {
//!             let _batch = ctx.get_u32("BATCH", 1);
//!             Verdict::Ok
//!         }),
//! );
//!
//! let driver = ScriptedDriver::new();
//! let exit = suite.execute(&driver, ["basic", "--no-timer"]);
//! assert_eq!(exit, 0);
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod case;
pub mod config;
pub mod context;
pub mod logging;
pub mod report;
pub mod retry;
pub mod step;
pub mod suite;
pub mod testing;

// Re-export commonly used types
pub use case::TestCase;
pub use config::RunConfig;
pub use context::SharedContext;
pub use report::{CaseResult, SuiteReport};
pub use retry::{absorb_expected, RetryPolicy, DEFAULT_BACKOFF, DEFAULT_MAX_RETRIES};
pub use step::{Step, StepBody, StepRole, StepRun};
pub use suite::TestSuite;
pub use testing::{MemConnection, ScriptedDriver};

// The driver seam and verdicts live in gauntlet-core; re-export them so
// embedding programs depend on one crate.
pub use gauntlet_core::{
    Connection, Driver, DriverError, DriverResult, Error, ErrorClass, PropertyValue, Result,
    Verdict,
};
