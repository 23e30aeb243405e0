//! Test case orchestration: Init → Steps → Verify → Finalize
//!
//! A case runs its initializers sequentially (first failure aborts the
//! scenario), launches every parallel step as its own OS thread against one
//! shared context, joins them all, runs verifiers sequentially, and then
//! runs finalizers unconditionally: cleanup happens even on failure so the
//! next scenario starts from a clean state.
//!
//! Step-completion bookkeeping lives in a dedicated monitor with its own
//! mutex and condvar, distinct from the shared context's lock, so
//! orchestration state never couples with user-visible test state.

use std::collections::HashMap;
use std::sync::Arc;
use std::thread;
use std::time::Instant;

use parking_lot::{Condvar, Mutex};
use tracing::{error, info, warn};

use gauntlet_core::{Driver, PropertyValue, Verdict};

use crate::context::SharedContext;
use crate::report::CaseResult;
use crate::step::{Step, StepRole, StepRun};

/// Table applicability of a case.
enum TableFilter {
    /// Runs against any table.
    All,
    /// Runs only against the named tables.
    Only(Vec<String>),
    /// Runs against any table except the named ones.
    Except(Vec<String>),
}

/// One named scenario: ordered step lists per role, a property bag, and the
/// results accumulated across executions.
pub struct TestCase {
    name: String,
    description: String,
    initializers: Vec<Step>,
    steps: Vec<Step>,
    verifiers: Vec<Step>,
    finalizers: Vec<Step>,
    properties: HashMap<String, PropertyValue>,
    table_filter: TableFilter,
    run_once: bool,
    executed_once: bool,
    results: Vec<CaseResult>,
}

impl TestCase {
    /// New empty case with a name and a free-text description.
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        TestCase {
            name: name.into(),
            description: description.into(),
            initializers: Vec::new(),
            steps: Vec::new(),
            verifiers: Vec::new(),
            finalizers: Vec::new(),
            properties: HashMap::new(),
            table_filter: TableFilter::All,
            run_once: false,
            executed_once: false,
            results: Vec::new(),
        }
    }

    /// Case name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Free-text description given at registration.
    pub fn description(&self) -> &str {
        &self.description
    }

    /// Register an initializer, run sequentially before the parallel phase.
    pub fn initializer(
        mut self,
        name: impl Into<String>,
        body: impl Fn(&SharedContext, &mut StepRun<'_>) -> Verdict + Send + Sync + 'static,
    ) -> Self {
        let index = self.initializers.len();
        self.initializers
            .push(Step::new(name, StepRole::Initializer, index, Arc::new(body)));
        self
    }

    /// Register a parallel step, run concurrently with its siblings.
    pub fn step(
        mut self,
        name: impl Into<String>,
        body: impl Fn(&SharedContext, &mut StepRun<'_>) -> Verdict + Send + Sync + 'static,
    ) -> Self {
        let index = self.steps.len();
        self.steps
            .push(Step::new(name, StepRole::ParallelStep, index, Arc::new(body)));
        self
    }

    /// Register a verifier, run sequentially after all parallel steps.
    pub fn verifier(
        mut self,
        name: impl Into<String>,
        body: impl Fn(&SharedContext, &mut StepRun<'_>) -> Verdict + Send + Sync + 'static,
    ) -> Self {
        let index = self.verifiers.len();
        self.verifiers
            .push(Step::new(name, StepRole::Verifier, index, Arc::new(body)));
        self
    }

    /// Register a finalizer; finalizers always run, in registration order.
    pub fn finalizer(
        mut self,
        name: impl Into<String>,
        body: impl Fn(&SharedContext, &mut StepRun<'_>) -> Verdict + Send + Sync + 'static,
    ) -> Self {
        let index = self.finalizers.len();
        self.finalizers
            .push(Step::new(name, StepRole::Finalizer, index, Arc::new(body)));
        self
    }

    /// Attach a scenario parameter, copied into the shared context at the
    /// start of every execution.
    pub fn property(mut self, name: impl Into<String>, value: impl Into<PropertyValue>) -> Self {
        self.properties.insert(name.into(), value.into());
        self
    }

    /// Restrict the case to the named tables.
    pub fn only_tables(mut self, tables: &[&str]) -> Self {
        self.table_filter = TableFilter::Only(tables.iter().map(|t| t.to_string()).collect());
        self
    }

    /// Exclude the named tables.
    pub fn except_tables(mut self, tables: &[&str]) -> Self {
        self.table_filter = TableFilter::Except(tables.iter().map(|t| t.to_string()).collect());
        self
    }

    /// Run this case at most once, even when the suite iterates tables.
    pub fn run_once(mut self) -> Self {
        self.run_once = true;
        self
    }

    /// Whether this case applies to `table` under its filter and run-once
    /// state.
    pub fn applies_to(&self, table: &str) -> bool {
        if self.run_once && self.executed_once {
            return false;
        }
        match &self.table_filter {
            TableFilter::All => true,
            TableFilter::Only(list) => list.iter().any(|t| t == table),
            TableFilter::Except(list) => !list.iter().any(|t| t == table),
        }
    }

    /// Results accumulated across this case's executions.
    pub fn results(&self) -> &[CaseResult] {
        &self.results
    }

    /// Registered steps of every role, in phase order. Used by the suite's
    /// diagnostic tree printout.
    pub fn all_steps(&self) -> impl Iterator<Item = &Step> {
        self.initializers
            .iter()
            .chain(self.steps.iter())
            .chain(self.verifiers.iter())
            .chain(self.finalizers.iter())
    }

    /// Execute the scenario once against the context's table.
    ///
    /// Phase order is absolute: initializers complete before any parallel
    /// step starts, every step thread is joined before verifiers run, and
    /// finalizers run last, unconditionally.
    pub fn execute(&mut self, driver: &dyn Driver, ctx: &SharedContext) -> CaseResult {
        for (name, value) in &self.properties {
            ctx.set(name, value.clone());
        }

        let timer = Instant::now();
        info!(
            target: "gauntlet::case",
            case = %self.name,
            table = %ctx.table(),
            "case starting"
        );

        let mut verdict = run_sequential(&self.initializers, driver, ctx);
        if verdict.is_ok() {
            verdict = run_parallel(&self.name, &self.steps, driver, ctx);
        }
        if verdict.is_ok() {
            verdict = run_sequential(&self.verifiers, driver, ctx);
        }

        // Cleanup is unconditional; its failure never masks the scenario's
        // own failure, but it does fail an otherwise-green case.
        let final_verdict = run_finalizers(&self.finalizers, driver, ctx);
        verdict = verdict.merge(final_verdict);

        let elapsed = timer.elapsed();
        info!(
            target: "gauntlet::case",
            case = %self.name,
            table = %ctx.table(),
            verdict = %verdict,
            elapsed_ms = elapsed.as_millis() as u64,
            "case finished"
        );

        let result = CaseResult {
            case: self.name.clone(),
            table: ctx.table().to_string(),
            verdict,
            elapsed,
        };
        self.results.push(result.clone());
        self.executed_once = true;
        result
    }
}

/// Run a phase sequentially in registration order, stopping at the first
/// non-OK result.
fn run_sequential(steps: &[Step], driver: &dyn Driver, ctx: &SharedContext) -> Verdict {
    for step in steps {
        let verdict = step.execute(driver, ctx);
        if !verdict.is_ok() {
            return verdict;
        }
    }
    Verdict::Ok
}

/// Run finalizers best-effort: every one executes regardless of earlier
/// results; the worst verdict is folded and returned.
fn run_finalizers(steps: &[Step], driver: &dyn Driver, ctx: &SharedContext) -> Verdict {
    let mut verdict = Verdict::Ok;
    for step in steps {
        let v = step.execute(driver, ctx);
        if !v.is_ok() {
            warn!(
                target: "gauntlet::case",
                step = %step.name(),
                verdict = %v,
                "finalizer did not complete cleanly"
            );
        }
        verdict = verdict.merge(v);
    }
    verdict
}

/// Launch one thread per parallel step, wait for all completions, join
/// every thread, then scan for the first non-OK result.
fn run_parallel(
    case_name: &str,
    steps: &[Step],
    driver: &dyn Driver,
    ctx: &SharedContext,
) -> Verdict {
    if steps.is_empty() {
        return Verdict::Ok;
    }

    let monitor = StepMonitor::new(steps.len());
    thread::scope(|scope| {
        let mut handles = Vec::with_capacity(steps.len());
        for step in steps {
            let monitor = &monitor;
            let handle = thread::Builder::new()
                .name(format!("{}-step-{}", case_name, step.index()))
                .spawn_scoped(scope, move || {
                    // The guard reports completion even if the body panics,
                    // so the orchestrator's wait below can never hang.
                    let mut guard = CompletionGuard {
                        monitor,
                        index: step.index(),
                        verdict: Verdict::Failed,
                    };
                    guard.verdict = step.execute(driver, ctx);
                })
                .expect("failed to spawn step thread");
            handles.push((step, handle));
        }

        monitor.wait_all_completed();

        // Cooperative stop is advisory; every thread is joined before any
        // result is inspected.
        for (step, handle) in handles {
            if handle.join().is_err() {
                error!(
                    target: "gauntlet::case",
                    case = %case_name,
                    step = %step.name(),
                    "step thread panicked"
                );
            }
        }
    });

    monitor.first_non_ok().unwrap_or(Verdict::Ok)
}

/// Step-completion bookkeeping: a results slot per step and a completed
/// counter, guarded by their own lock.
struct StepMonitor {
    inner: Mutex<MonitorInner>,
    all_done: Condvar,
}

struct MonitorInner {
    results: Vec<Option<Verdict>>,
    completed: usize,
}

impl StepMonitor {
    fn new(total: usize) -> Self {
        StepMonitor {
            inner: Mutex::new(MonitorInner {
                results: vec![None; total],
                completed: 0,
            }),
            all_done: Condvar::new(),
        }
    }

    fn record(&self, index: usize, verdict: Verdict) {
        let mut inner = self.inner.lock();
        debug_assert!(inner.results[index].is_none(), "step reported twice");
        inner.results[index] = Some(verdict);
        inner.completed += 1;
        if inner.completed == inner.results.len() {
            self.all_done.notify_all();
        }
    }

    fn wait_all_completed(&self) {
        let mut inner = self.inner.lock();
        while inner.completed < inner.results.len() {
            self.all_done.wait(&mut inner);
        }
    }

    fn first_non_ok(&self) -> Option<Verdict> {
        let inner = self.inner.lock();
        inner
            .results
            .iter()
            .filter_map(|slot| *slot)
            .find(|v| !v.is_ok())
    }
}

/// Reports a step's verdict to the monitor on drop; a panicking body leaves
/// the pre-set `Failed`.
struct CompletionGuard<'a> {
    monitor: &'a StepMonitor,
    index: usize,
    verdict: Verdict,
}

impl Drop for CompletionGuard<'_> {
    fn drop(&mut self) {
        self.monitor.record(self.index, self.verdict);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::ScriptedDriver;

    #[test]
    fn test_applies_to_filters() {
        let all = TestCase::new("c", "");
        assert!(all.applies_to("T1"));

        let only = TestCase::new("c", "").only_tables(&["T1", "T2"]);
        assert!(only.applies_to("T1"));
        assert!(!only.applies_to("T3"));

        let except = TestCase::new("c", "").except_tables(&["T3"]);
        assert!(except.applies_to("T1"));
        assert!(!except.applies_to("T3"));
    }

    #[test]
    fn test_run_once_applies_only_until_executed() {
        let driver = ScriptedDriver::with_tables(&["T1"]);
        let mut case = TestCase::new("once", "").run_once().step("noop", |_, _| Verdict::Ok);
        assert!(case.applies_to("T1"));
        let ctx = SharedContext::new("T1", 10, 1);
        case.execute(&driver, &ctx);
        assert!(!case.applies_to("T1"));
    }

    #[test]
    fn test_properties_are_copied_into_context() {
        let driver = ScriptedDriver::with_tables(&["T1"]);
        let mut case = TestCase::new("props", "")
            .property("BATCH", 64u32)
            .step("reads_property", |ctx, _| {
                if ctx.get_u32("BATCH", 0) == 64 {
                    Verdict::Ok
                } else {
                    Verdict::Failed
                }
            });
        let ctx = SharedContext::new("T1", 10, 1);
        assert_eq!(case.execute(&driver, &ctx).verdict, Verdict::Ok);
    }

    #[test]
    fn test_empty_case_passes() {
        let driver = ScriptedDriver::with_tables(&["T1"]);
        let mut case = TestCase::new("empty", "");
        let ctx = SharedContext::new("T1", 10, 1);
        assert_eq!(case.execute(&driver, &ctx).verdict, Verdict::Ok);
    }

    #[test]
    fn test_panicking_step_is_recorded_failed_and_does_not_hang() {
        let driver = ScriptedDriver::with_tables(&["T1"]);
        let mut case = TestCase::new("panic", "")
            .step("panics", |_, _| panic!("intentional test panic"))
            .step("survives", |_, _| Verdict::Ok);
        let ctx = SharedContext::new("T1", 10, 1);
        assert_eq!(case.execute(&driver, &ctx).verdict, Verdict::Failed);
    }
}
