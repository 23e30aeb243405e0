//! Test suite: table × case iteration, schema management, aggregation
//!
//! A suite owns an ordered set of test cases plus the table list registered
//! by the embedding test program. `execute` parses CLI-style configuration,
//! runs the selected cases (per table by default, or once against the fixed
//! table set), wraps each execution in schema create/drop unless schema is
//! managed externally, aggregates the results, prints the summary, and
//! returns the process exit status.

use std::time::{Duration, Instant};

use tracing::{error, info};

use gauntlet_core::{Driver, ErrorClass, Verdict};

use crate::case::TestCase;
use crate::config::RunConfig;
use crate::context::SharedContext;
use crate::logging;
use crate::report::{CaseResult, SuiteReport};

/// Which list a selected case lives in.
#[derive(Debug, Clone, Copy)]
enum CaseRef {
    /// Index into the run-all case list.
    Main(usize),
    /// Index into the explicit-only case list.
    Explicit(usize),
}

/// An ordered battery of test cases with a shared table list.
pub struct TestSuite {
    name: String,
    cases: Vec<TestCase>,
    explicit_cases: Vec<TestCase>,
    tables: Vec<String>,
    manage_schema: bool,
    last_report: Option<SuiteReport>,
}

impl TestSuite {
    /// New empty suite.
    pub fn new(name: impl Into<String>) -> Self {
        TestSuite {
            name: name.into(),
            cases: Vec::new(),
            explicit_cases: Vec::new(),
            tables: Vec::new(),
            manage_schema: true,
            last_report: None,
        }
    }

    /// Suite name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Register a case included in "run all".
    pub fn add_case(&mut self, case: TestCase) {
        self.cases.push(case);
    }

    /// Register a case that only runs when named with `--testname`.
    pub fn add_explicit_case(&mut self, case: TestCase) {
        self.explicit_cases.push(case);
    }

    /// Register a table known to the embedding test program.
    pub fn add_table(&mut self, name: impl Into<String>) {
        self.tables.push(name.into());
    }

    /// Turn off suite-side schema management entirely (equivalent to
    /// passing `--noddl` on every run).
    pub fn set_manage_schema(&mut self, manage: bool) {
        self.manage_schema = manage;
    }

    /// The report of the most recent [`TestSuite::execute`] call.
    pub fn report(&self) -> Option<&SuiteReport> {
        self.last_report.as_ref()
    }

    /// Parse configuration, run the selected cases, print the summary, and
    /// return the process exit status.
    pub fn execute<I, S>(&mut self, driver: &dyn Driver, argv: I) -> i32
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let config = match RunConfig::parse(&self.name, argv) {
            Ok(config) => config,
            Err(message) => {
                eprintln!("{}", message);
                return Verdict::WrongArgs.exit_code();
            }
        };
        logging::init(config.verbose);

        if config.print_cases || config.print_tree {
            self.print_registered(config.print_tree);
            return Verdict::Ok.exit_code();
        }

        let selected = match self.select_cases(config.test_name.as_deref()) {
            Ok(selected) => selected,
            Err(message) => {
                eprintln!("{}", message);
                return Verdict::WrongArgs.exit_code();
            }
        };

        let tables = match self.select_tables(&config) {
            Ok(tables) => tables,
            Err(message) => {
                eprintln!("{}", message);
                return Verdict::WrongArgs.exit_code();
            }
        };

        let noddl = config.noddl || !self.manage_schema;
        if noddl {
            // Schema is external: every table must already be there.
            for table in &tables {
                if !driver.table_exists(table) {
                    eprintln!("table does not exist: {}", table);
                    return Verdict::WrongArgs.exit_code();
                }
            }
        }

        let suite_timer = Instant::now();
        info!(
            target: "gauntlet::suite",
            suite = %self.name,
            cases = selected.len(),
            tables = tables.len(),
            run_once = config.run_once,
            "suite starting"
        );

        let mut report = SuiteReport::new();
        if config.run_once {
            self.run_once_mode(driver, &config, &selected, &tables, noddl, &mut report);
        } else {
            self.run_per_table(driver, &config, &selected, &tables, noddl, &mut report);
        }

        let verdict = report.aggregate_verdict();
        info!(
            target: "gauntlet::suite",
            suite = %self.name,
            verdict = %verdict,
            executed = report.executed(),
            failed = report.failed(),
            "suite finished"
        );
        report.print_summary(&self.name, suite_timer.elapsed(), config.timer);
        self.last_report = Some(report);
        verdict.exit_code()
    }

    /// Default mode: every selected case against every table.
    fn run_per_table(
        &mut self,
        driver: &dyn Driver,
        config: &RunConfig,
        selected: &[CaseRef],
        tables: &[String],
        noddl: bool,
        report: &mut SuiteReport,
    ) {
        for table in tables {
            for case_ref in selected {
                let case = self.case_mut(*case_ref);
                if !case.applies_to(table) {
                    continue;
                }
                let case_name = case.name().to_string();

                if !noddl && !prepare_table(driver, table) {
                    report.record(schema_failure(&case_name, table));
                    continue;
                }

                let ctx = SharedContext::new(table.clone(), config.records, config.loops);
                let case = self.case_mut(*case_ref);
                report.record(case.execute(driver, &ctx));

                if !noddl {
                    cleanup_table(driver, table);
                }
            }
        }
    }

    /// Run-once mode: create all tables up front, run each selected case
    /// exactly once with the full table set, drop the tables afterwards.
    fn run_once_mode(
        &mut self,
        driver: &dyn Driver,
        config: &RunConfig,
        selected: &[CaseRef],
        tables: &[String],
        noddl: bool,
        report: &mut SuiteReport,
    ) {
        if !noddl {
            for table in tables {
                if !prepare_table(driver, table) {
                    error!(
                        target: "gauntlet::suite",
                        table = %table,
                        "could not prepare table, aborting run"
                    );
                    report.record(schema_failure("(suite)", table));
                    return;
                }
            }
        }

        let primary = &tables[0];
        for case_ref in selected {
            let case = self.case_mut(*case_ref);
            if !case.applies_to(primary) {
                continue;
            }
            let ctx = SharedContext::with_tables(tables.to_vec(), config.records, config.loops);
            report.record(case.execute(driver, &ctx));
        }

        if !noddl {
            for table in tables {
                cleanup_table(driver, table);
            }
        }
    }

    fn case_mut(&mut self, case_ref: CaseRef) -> &mut TestCase {
        match case_ref {
            CaseRef::Main(i) => &mut self.cases[i],
            CaseRef::Explicit(i) => &mut self.explicit_cases[i],
        }
    }

    /// Resolve the case selection. "Run all" covers the main list only;
    /// naming a test searches the explicit list too.
    fn select_cases(&self, test_name: Option<&str>) -> Result<Vec<CaseRef>, String> {
        match test_name {
            None => Ok((0..self.cases.len()).map(CaseRef::Main).collect()),
            Some(name) => {
                let mut selected = Vec::new();
                for (i, case) in self.cases.iter().enumerate() {
                    if case.name().eq_ignore_ascii_case(name) {
                        selected.push(CaseRef::Main(i));
                    }
                }
                for (i, case) in self.explicit_cases.iter().enumerate() {
                    if case.name().eq_ignore_ascii_case(name) {
                        selected.push(CaseRef::Explicit(i));
                    }
                }
                if selected.is_empty() {
                    return Err(format!("unknown test case: {}", name));
                }
                Ok(selected)
            }
        }
    }

    /// Resolve the table list: CLI tables validated against the registered
    /// set when one exists, otherwise the registered set itself.
    fn select_tables(&self, config: &RunConfig) -> Result<Vec<String>, String> {
        if config.tables.is_empty() {
            if self.tables.is_empty() {
                return Err("no tables registered and none given".to_string());
            }
            return Ok(self.tables.clone());
        }
        if !self.tables.is_empty() {
            for table in &config.tables {
                if !self.tables.contains(table) {
                    return Err(format!("unknown table: {}", table));
                }
            }
        }
        Ok(config.tables.clone())
    }

    /// `--print-cases` / `--print-tree` diagnostic output.
    fn print_registered(&self, tree: bool) {
        let total = self.cases.len() + self.explicit_cases.len();
        println!("Suite \"{}\": {} case(s)", self.name, total);
        for case in self.cases.iter().chain(self.explicit_cases.iter()) {
            if case.description().is_empty() {
                println!("  {}", case.name());
            } else {
                println!("  {} - {}", case.name(), case.description());
            }
            if tree {
                for step in case.all_steps() {
                    println!("      {:12} {}", step.role().to_string(), step.name());
                }
            }
        }
    }
}

/// Drop-if-present then create. Returns false when the table could not be
/// prepared.
fn prepare_table(driver: &dyn Driver, table: &str) -> bool {
    if let Err(e) = driver.drop_table(table) {
        if e.class != ErrorClass::Expected {
            error!(target: "gauntlet::suite", table = %table, error = %e, "drop failed");
            return false;
        }
    }
    if let Err(e) = driver.create_table(table) {
        error!(target: "gauntlet::suite", table = %table, error = %e, "create failed");
        return false;
    }
    true
}

/// Best-effort drop after a case execution.
fn cleanup_table(driver: &dyn Driver, table: &str) {
    if let Err(e) = driver.drop_table(table) {
        if e.class != ErrorClass::Expected {
            error!(target: "gauntlet::suite", table = %table, error = %e, "cleanup drop failed");
        }
    }
}

fn schema_failure(case: &str, table: &str) -> CaseResult {
    CaseResult {
        case: case.to_string(),
        table: table.to_string(),
        verdict: Verdict::Failed,
        elapsed: Duration::ZERO,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::ScriptedDriver;

    fn ok_case(name: &str) -> TestCase {
        TestCase::new(name, "always passes").step("noop", |_, _| Verdict::Ok)
    }

    #[test]
    fn test_malformed_argv_exits_wrongargs() {
        let driver = ScriptedDriver::new();
        let mut suite = TestSuite::new("basic");
        suite.add_table("T1");
        suite.add_case(ok_case("a"));
        let code = suite.execute(&driver, ["basic", "--bogus"]);
        assert_eq!(code, Verdict::WrongArgs.exit_code());
        assert!(suite.report().is_none());
    }

    #[test]
    fn test_unknown_test_name_exits_wrongargs() {
        let driver = ScriptedDriver::new();
        let mut suite = TestSuite::new("basic");
        suite.add_table("T1");
        suite.add_case(ok_case("a"));
        let code = suite.execute(&driver, ["basic", "-n", "nope"]);
        assert_eq!(code, Verdict::WrongArgs.exit_code());
    }

    #[test]
    fn test_unknown_table_exits_wrongargs() {
        let driver = ScriptedDriver::new();
        let mut suite = TestSuite::new("basic");
        suite.add_table("T1");
        suite.add_case(ok_case("a"));
        let code = suite.execute(&driver, ["basic", "T9"]);
        assert_eq!(code, Verdict::WrongArgs.exit_code());
    }

    #[test]
    fn test_run_all_iterates_tables_and_manages_schema() {
        let driver = ScriptedDriver::new();
        let mut suite = TestSuite::new("basic");
        suite.add_table("T1");
        suite.add_table("T2");
        suite.add_case(ok_case("a"));
        suite.add_case(ok_case("b"));

        let code = suite.execute(&driver, ["basic"]);
        assert_eq!(code, Verdict::Ok.exit_code());
        let report = suite.report().unwrap();
        assert_eq!(report.executed(), 4);
        assert_eq!(report.passed(), 4);
        // Tables were dropped again after each execution.
        assert!(!driver.table_exists("T1"));
        assert!(!driver.table_exists("T2"));
    }

    #[test]
    fn test_explicit_case_excluded_from_run_all() {
        let driver = ScriptedDriver::new();
        let mut suite = TestSuite::new("basic");
        suite.add_table("T1");
        suite.add_case(ok_case("regular"));
        suite.add_explicit_case(ok_case("heavy"));

        suite.execute(&driver, ["basic"]);
        assert_eq!(suite.report().unwrap().executed(), 1);

        let code = suite.execute(&driver, ["basic", "-n", "heavy"]);
        assert_eq!(code, Verdict::Ok.exit_code());
        assert_eq!(suite.report().unwrap().executed(), 1);
    }

    #[test]
    fn test_noddl_requires_existing_tables() {
        let driver = ScriptedDriver::new();
        let mut suite = TestSuite::new("basic");
        suite.add_table("T1");
        suite.add_case(ok_case("a"));
        let code = suite.execute(&driver, ["basic", "--noddl"]);
        assert_eq!(code, Verdict::WrongArgs.exit_code());

        driver.create_table("T1").unwrap();
        let code = suite.execute(&driver, ["basic", "--noddl"]);
        assert_eq!(code, Verdict::Ok.exit_code());
        // External schema: the table is left alone.
        assert!(driver.table_exists("T1"));
    }

    #[test]
    fn test_run_once_mode_executes_each_case_once() {
        let driver = ScriptedDriver::new();
        let mut suite = TestSuite::new("basic");
        suite.add_table("T1");
        suite.add_table("T2");
        suite.add_case(ok_case("a"));

        let code = suite.execute(&driver, ["basic", "--run-once"]);
        assert_eq!(code, Verdict::Ok.exit_code());
        assert_eq!(suite.report().unwrap().executed(), 1);
    }

    #[test]
    fn test_failing_case_fails_suite_but_rest_still_runs() {
        let driver = ScriptedDriver::new();
        let mut suite = TestSuite::new("basic");
        suite.add_table("T1");
        suite.add_case(TestCase::new("bad", "").step("fails", |_, _| Verdict::Failed));
        suite.add_case(ok_case("good"));

        let code = suite.execute(&driver, ["basic"]);
        assert_eq!(code, Verdict::Failed.exit_code());
        let report = suite.report().unwrap();
        assert_eq!(report.executed(), 2);
        assert_eq!(report.failed(), 1);
        assert_eq!(report.passed(), 1);
    }

    #[test]
    fn test_all_skipped_suite_exits_skipped() {
        let driver = ScriptedDriver::new();
        let mut suite = TestSuite::new("basic");
        suite.add_table("T1");
        suite.add_case(TestCase::new("na", "").step("skips", |_, _| Verdict::Skipped));

        let code = suite.execute(&driver, ["basic"]);
        assert_eq!(code, Verdict::Skipped.exit_code());
    }
}
