//! Blackbox scenario tests for Gauntlet
//!
//! These tests only use the public API of the facade crate - no internal
//! crate access. Each scenario assembles a suite the way an embedding test
//! program would, runs it against the scripted in-memory driver, and checks
//! verdicts, aggregate counters, and exit codes.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use gauntlet::{
    Connection, DriverError, MemConnection, RetryPolicy, ScriptedDriver, TestCase, TestSuite,
    Verdict,
};

// ============================================================================
// Scenario A: one failing parallel step fails the case, verifier is
// skipped, finalizer still runs
// ============================================================================

#[test]
fn scenario_a_failing_step_skips_verifier_but_not_finalizer() {
    let driver = ScriptedDriver::new();
    let verifier_ran = Arc::new(AtomicUsize::new(0));
    let finalizer_ran = Arc::new(AtomicUsize::new(0));

    let mut suite = TestSuite::new("scenario_a");
    suite.add_table("T1");

    let v = Arc::clone(&verifier_ran);
    let f = Arc::clone(&finalizer_ran);
    suite.add_case(
        TestCase::new("mixed_outcome", "two passing steps, one failing")
            .initializer("setup", |_, _| Verdict::Ok)
            .step("ok_0", |_, _| Verdict::Ok)
            .step("fails", |ctx, _| {
                ctx.stop();
                Verdict::Failed
            })
            .step("ok_1", |ctx, _| {
                // Cooperative: exits early once the sibling signals stop.
                while !ctx.is_stopped() {
                    ctx.wait_timeout(Duration::from_millis(5));
                }
                Verdict::Ok
            })
            .verifier("verify", move |_, _| {
                v.fetch_add(1, Ordering::SeqCst);
                Verdict::Ok
            })
            .finalizer("cleanup", move |_, _| {
                f.fetch_add(1, Ordering::SeqCst);
                Verdict::Ok
            }),
    );

    let exit = suite.execute(&driver, ["scenario_a"]);
    assert_eq!(exit, Verdict::Failed.exit_code());

    assert_eq!(verifier_ran.load(Ordering::SeqCst), 0);
    assert_eq!(finalizer_ran.load(Ordering::SeqCst), 1);

    let report = suite.report().unwrap();
    assert_eq!(report.executed(), 1);
    assert_eq!(report.passed(), 0);
    assert_eq!(report.failed(), 1);
}

// ============================================================================
// Scenario B: producer/consumer phase handshake completes deterministically
// ============================================================================

#[test]
fn scenario_b_phase_handshake_never_deadlocks() {
    let driver = ScriptedDriver::new();
    let mut suite = TestSuite::new("scenario_b");
    suite.add_table("T1");

    suite.add_case(
        TestCase::new("handshake", "two steps advance a shared phase counter")
            .step("leader", |ctx, _| {
                ctx.set("PHASE", 1u32);
                if ctx.wait_for_u32("PHASE", 2) {
                    Verdict::Ok
                } else {
                    Verdict::Failed
                }
            })
            .step("follower", |ctx, _| {
                if !ctx.wait_for_u32("PHASE", 1) {
                    return Verdict::Failed;
                }
                ctx.set("PHASE", 2u32);
                Verdict::Ok
            }),
    );

    // Repeat to shake out scheduling orders.
    for run in 0..20 {
        let exit = suite.execute(&driver, ["scenario_b"]);
        assert_eq!(exit, Verdict::Ok.exit_code(), "deadlock or failure on run {}", run);
    }
}

// ============================================================================
// Scenario C: five temporary errors then success, within the retry bound
// ============================================================================

#[test]
fn scenario_c_temporary_errors_within_bound_still_pass() {
    let driver = ScriptedDriver::with_tables(&["T1"]);
    driver.script_op_errors(DriverError::temporary(410, "redo log overloaded"), 5);
    let attempts = Arc::new(AtomicUsize::new(0));

    let mut suite = TestSuite::new("scenario_c");
    suite.add_table("T1");
    suite.set_manage_schema(false);

    let a = Arc::clone(&attempts);
    suite.add_case(TestCase::new("flaky_begin", "begin retried past transient errors").step(
        "begin_txn",
        move |_, run| {
            let policy = RetryPolicy::new(100, Duration::from_millis(1));
            let a = Arc::clone(&a);
            let conn = run.connection();
            let result = policy.run(|| {
                a.fetch_add(1, Ordering::SeqCst);
                conn.begin()
            });
            match result {
                Ok(Some(())) => Verdict::Ok,
                _ => Verdict::Failed,
            }
        },
    ));

    let exit = suite.execute(&driver, ["scenario_c", "--noddl"]);
    assert_eq!(exit, Verdict::Ok.exit_code());
    // 5 temporary failures, each followed by a backoff, then the success.
    assert_eq!(attempts.load(Ordering::SeqCst), 6);
}

// ============================================================================
// Scenario D: an unbroken stream of temporary errors exhausts the bound
// ============================================================================

#[test]
fn scenario_d_retry_bound_exceeded_fails_the_step() {
    let driver = ScriptedDriver::with_tables(&["T1"]);
    let attempts = Arc::new(AtomicUsize::new(0));

    let mut suite = TestSuite::new("scenario_d");
    suite.add_table("T1");
    suite.set_manage_schema(false);

    let a = Arc::clone(&attempts);
    suite.add_case(TestCase::new("hopeless", "backend never recovers").step(
        "always_temporary",
        move |_, _| {
            let policy = RetryPolicy::new(3, Duration::from_millis(1));
            let a = Arc::clone(&a);
            let result: gauntlet::Result<Option<()>> = policy.run(|| {
                a.fetch_add(1, Ordering::SeqCst);
                Err(DriverError::temporary(266, "lock timeout"))
            });
            match result {
                Err(_) => Verdict::Failed,
                Ok(_) => Verdict::Ok,
            }
        },
    ));

    let exit = suite.execute(&driver, ["scenario_d", "--noddl"]);
    assert_eq!(exit, Verdict::Failed.exit_code());
    // max_retries = 3: the first attempt plus exactly three retries.
    assert_eq!(attempts.load(Ordering::SeqCst), 4);
}

// ============================================================================
// End-to-end: a small load/verify/clear workload over the driver seam
// ============================================================================

#[test]
fn workload_load_verify_clear_roundtrip() {
    let driver = ScriptedDriver::new();
    let mut suite = TestSuite::new("workload");
    suite.add_table("T1");

    suite.add_case(
        TestCase::new("LoadAndCount", "parallel loaders fill disjoint key ranges")
            .property("ROWS_PER_STEP", 50u32)
            .step("loader_0", loader_body)
            .step("loader_1", loader_body)
            .verifier("count", |ctx, run| {
                let expected = 2 * ctx.get_u32("ROWS_PER_STEP", 0);
                let mem = connection(run);
                for key in 0..expected {
                    match mem.read_row(ctx.table(), key) {
                        Ok(Some(_)) => {}
                        _ => return Verdict::Failed,
                    }
                }
                Verdict::Ok
            })
            .finalizer("clear", |ctx, run| {
                let rows = 2 * ctx.get_u32("ROWS_PER_STEP", 0);
                let table = ctx.table().to_string();
                let mem = connection(run);
                if mem.begin().is_err() {
                    return Verdict::Failed;
                }
                for key in 0..rows {
                    // Tolerant delete: missing rows are an expected error.
                    if gauntlet::absorb_expected(mem.delete_row(&table, key)).is_err() {
                        return Verdict::Failed;
                    }
                }
                if mem.commit().is_err() {
                    return Verdict::Failed;
                }
                Verdict::Ok
            }),
    );

    let exit = suite.execute(&driver, ["workload"]);
    assert_eq!(exit, Verdict::Ok.exit_code());
    let report = suite.report().unwrap();
    assert_eq!(report.executed(), 1);
    assert_eq!(report.passed(), 1);
}

fn connection<'a>(run: &'a mut gauntlet::StepRun<'_>) -> &'a mut MemConnection {
    run.connection()
        .as_any()
        .downcast_mut::<MemConnection>()
        .expect("scripted driver connection")
}

fn loader_body(ctx: &gauntlet::SharedContext, run: &mut gauntlet::StepRun<'_>) -> Verdict {
    let rows = ctx.get_u32("ROWS_PER_STEP", 0);
    let table = ctx.table().to_string();
    let offset = run.index() as u32 * rows;
    let mem = connection(run);
    if mem.begin().is_err() {
        return Verdict::Failed;
    }
    for i in 0..rows {
        // Idempotent load: a duplicate row is an expected error.
        if gauntlet::absorb_expected(mem.insert_row(&table, offset + i, i)).is_err() {
            return Verdict::Failed;
        }
    }
    if mem.commit().is_err() {
        return Verdict::Failed;
    }
    Verdict::Ok
}

// ============================================================================
// Exit codes and diagnostic modes through the public API
// ============================================================================

#[test]
fn malformed_argv_maps_to_wrongargs_exit() {
    let driver = ScriptedDriver::new();
    let mut suite = TestSuite::new("cli");
    suite.add_table("T1");
    suite.add_case(TestCase::new("noop", "").step("noop", |_, _| Verdict::Ok));

    assert_eq!(suite.execute(&driver, ["cli", "--records", "NaN"]), 2);
    assert_eq!(suite.execute(&driver, ["cli", "-n", "missing_case"]), 2);
}

#[test]
fn print_modes_short_circuit_execution() {
    let driver = ScriptedDriver::new();
    let executed = Arc::new(AtomicUsize::new(0));

    let mut suite = TestSuite::new("diag");
    suite.add_table("T1");
    let e = Arc::clone(&executed);
    suite.add_case(TestCase::new("counted", "counts executions").step("count", move |_, _| {
        e.fetch_add(1, Ordering::SeqCst);
        Verdict::Ok
    }));

    assert_eq!(suite.execute(&driver, ["diag", "--print-cases"]), 0);
    assert_eq!(suite.execute(&driver, ["diag", "--print-tree"]), 0);
    assert_eq!(executed.load(Ordering::SeqCst), 0);
}
