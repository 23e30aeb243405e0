//! Gauntlet is a concurrent test-orchestration framework for clustered
//! storage backends.
//!
//! Gauntlet runs batteries of test scenarios against a storage backend:
//! each test case executes initializers sequentially, launches its parallel
//! steps as OS threads against one shared context, joins them, verifies,
//! and always finalizes, so a failing scenario still cleans up for the
//! next one. A uniform retry classification keeps transient backend errors
//! from failing tests spuriously.
//!
//! # Quick Start
//!
//! ```
//! use gauntlet::{ScriptedDriver, TestCase, TestSuite, Verdict};
//!
//! let mut suite = TestSuite::new("smoke");
//! suite.add_table("T1");
//! suite.add_case(
//!     TestCase::new("PingPong", "two steps hand a phase counter back and forth")
//!         .step("ping", |ctx, _run| {
//!             ctx.set("PHASE", 1u32);
//!             if ctx.wait_for_u32("PHASE", 2) { Verdict::Ok } else { Verdict::Failed }
//!         })
//!         .step("pong", |ctx, _run| {
//!             if !ctx.wait_for_u32("PHASE", 1) {
//!                 return Verdict::Failed;
//!             }
//!             ctx.set("PHASE", 2u32);
//!             Verdict::Ok
//!         }),
//! );
//!
//! let driver = ScriptedDriver::new();
//! let exit = suite.execute(&driver, ["smoke"]);
//! assert_eq!(exit, 0);
//! ```
//!
//! # Architecture
//!
//! The orchestration engine lives in `gauntlet-harness`; foundational types
//! (verdicts, property values, the driver seam, the error taxonomy) live in
//! `gauntlet-core`. Everything an embedding test program needs is
//! re-exported here.

// Re-export the public API from gauntlet-harness
pub use gauntlet_harness::*;
