//! Steps: named, resource-scoped, single-result units of work
//!
//! A step wraps a test-body function so the framework can treat
//! initializers, parallel steps, verifiers, and finalizers uniformly. Each
//! execution acquires its own backend connection (setup), runs the body,
//! and releases the connection unconditionally (teardown). Exactly one
//! [`Verdict`] comes out of every execution.

use std::sync::Arc;
use std::time::Instant;

use tracing::{debug, error, info};

use gauntlet_core::{Connection, Driver, Verdict};

use crate::context::SharedContext;

/// Which phase of a test case a step belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepRole {
    /// Runs sequentially before the parallel phase; first failure aborts
    /// the scenario.
    Initializer,
    /// Runs concurrently with its siblings, one OS thread each.
    ParallelStep,
    /// Runs sequentially after all parallel steps have been joined.
    Verifier,
    /// Cleanup; runs unconditionally, even after earlier failures.
    Finalizer,
}

impl std::fmt::Display for StepRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            StepRole::Initializer => "initializer",
            StepRole::ParallelStep => "step",
            StepRole::Verifier => "verifier",
            StepRole::Finalizer => "finalizer",
        };
        write!(f, "{}", s)
    }
}

/// Body signature for all step roles.
///
/// Bodies return their verdict; they must not panic (a panicking body is
/// recorded as `Failed` for that step). Temporary backend errors belong
/// inside the body behind a [`RetryPolicy`], not in the returned verdict.
///
/// [`RetryPolicy`]: crate::retry::RetryPolicy
pub type StepBody = Arc<dyn Fn(&SharedContext, &mut StepRun<'_>) -> Verdict + Send + Sync>;

/// What a running body sees: its own identity plus the connection acquired
/// for this execution.
pub struct StepRun<'a> {
    name: &'a str,
    index: usize,
    conn: Box<dyn Connection>,
}

impl<'a> StepRun<'a> {
    /// Display name of the executing step.
    pub fn name(&self) -> &str {
        self.name
    }

    /// Registration index within the step's role list. Parallel steps use
    /// this to partition work (e.g. disjoint key ranges) across siblings.
    pub fn index(&self) -> usize {
        self.index
    }

    /// The connection owned by this step for the duration of the run.
    pub fn connection(&mut self) -> &mut dyn Connection {
        self.conn.as_mut()
    }
}

/// A named unit of work with a role, an index, and a body.
pub struct Step {
    name: String,
    role: StepRole,
    index: usize,
    body: StepBody,
}

impl Step {
    pub(crate) fn new(
        name: impl Into<String>,
        role: StepRole,
        index: usize,
        body: StepBody,
    ) -> Self {
        Step {
            name: name.into(),
            role,
            index,
            body,
        }
    }

    /// Display name given at registration.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Role of this step within its case.
    pub fn role(&self) -> StepRole {
        self.role
    }

    /// Registration index within the role list.
    pub fn index(&self) -> usize {
        self.index
    }

    /// Run one execution: acquire a connection, invoke the body, release
    /// the connection, and return the body's verdict unchanged.
    ///
    /// Connection failure (backend not ready within the driver's bound)
    /// counts as `Failed` and skips the body.
    pub fn execute(&self, driver: &dyn Driver, ctx: &SharedContext) -> Verdict {
        let started = Instant::now();
        debug!(
            target: "gauntlet::step",
            step = %self.name,
            role = %self.role,
            "starting"
        );

        let conn = match driver.connect() {
            Ok(conn) => conn,
            Err(e) => {
                error!(
                    target: "gauntlet::step",
                    step = %self.name,
                    error = %e,
                    "connection setup failed"
                );
                return Verdict::Failed;
            }
        };

        let body = Arc::clone(&self.body);
        let mut run = StepRun {
            name: &self.name,
            index: self.index,
            conn,
        };
        let verdict = body(ctx, &mut run);
        drop(run); // teardown: connection released whatever the verdict

        info!(
            target: "gauntlet::step",
            step = %self.name,
            role = %self.role,
            verdict = %verdict,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "finished"
        );
        verdict
    }
}
