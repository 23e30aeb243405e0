//! Suite reporting: per-case results, aggregate counters, text summary
//!
//! The summary is the program's product and goes to stdout; diagnostics go
//! through `tracing`. Nothing fancier than plain text.

use std::time::Duration;

use gauntlet_core::Verdict;

/// Outcome of one (case, table) execution.
#[derive(Debug, Clone)]
pub struct CaseResult {
    /// Case name
    pub case: String,
    /// Table the case ran against
    pub table: String,
    /// Final verdict of the execution
    pub verdict: Verdict,
    /// Wall-clock time of the execution
    pub elapsed: Duration,
}

/// Accumulating counters and results for one suite run.
///
/// Counters only increase during a run; the report is rebuilt for every
/// suite execution.
#[derive(Debug, Default)]
pub struct SuiteReport {
    results: Vec<CaseResult>,
}

impl SuiteReport {
    /// Empty report.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one (case, table) outcome.
    pub fn record(&mut self, result: CaseResult) {
        self.results.push(result);
    }

    /// All recorded results, in execution order.
    pub fn results(&self) -> &[CaseResult] {
        &self.results
    }

    /// Number of executions recorded.
    pub fn executed(&self) -> usize {
        self.results.len()
    }

    /// Number of executions that passed.
    pub fn passed(&self) -> usize {
        self.count(Verdict::Ok)
    }

    /// Number of executions that failed.
    pub fn failed(&self) -> usize {
        self.count(Verdict::Failed)
    }

    /// Number of executions that were skipped.
    pub fn skipped(&self) -> usize {
        self.count(Verdict::Skipped)
    }

    fn count(&self, verdict: Verdict) -> usize {
        self.results.iter().filter(|r| r.verdict == verdict).count()
    }

    /// Suite-level verdict: failed if anything failed, else skipped when
    /// nothing passed outright but something was skipped, else ok.
    pub fn aggregate_verdict(&self) -> Verdict {
        if self.failed() > 0 {
            Verdict::Failed
        } else if self.skipped() > 0 && self.passed() == 0 {
            Verdict::Skipped
        } else {
            Verdict::Ok
        }
    }

    /// Print the tabular summary and counters to stdout.
    pub fn print_summary(&self, suite_name: &str, suite_elapsed: Duration, show_timer: bool) {
        println!();
        println!(
            "Completed suite \"{}\" at {} ({:.2}s)",
            suite_name,
            chrono::Local::now().format("%Y-%m-%d %H:%M:%S"),
            suite_elapsed.as_secs_f64()
        );
        if self.results.is_empty() {
            println!("  no test cases were executed");
            return;
        }

        let case_width = self
            .results
            .iter()
            .map(|r| r.case.len())
            .max()
            .unwrap_or(4)
            .max(4);
        let table_width = self
            .results
            .iter()
            .map(|r| r.table.len())
            .max()
            .unwrap_or(5)
            .max(5);

        if show_timer {
            println!(
                "  {:case_width$}  {:table_width$}  {:9}  {:>8}",
                "case", "table", "result", "time"
            );
        } else {
            println!("  {:case_width$}  {:table_width$}  {:9}", "case", "table", "result");
        }
        for r in &self.results {
            if show_timer {
                println!(
                    "  {:case_width$}  {:table_width$}  {:9}  {:>7.2}s",
                    r.case,
                    r.table,
                    r.verdict.to_string(),
                    r.elapsed.as_secs_f64()
                );
            } else {
                println!(
                    "  {:case_width$}  {:table_width$}  {:9}",
                    r.case,
                    r.table,
                    r.verdict.to_string()
                );
            }
        }

        let executed = self.executed();
        let pct = |n: usize| 100.0 * n as f64 / executed as f64;
        println!(
            "  {} executed, {} passed ({:.0}%), {} failed ({:.0}%), {} skipped ({:.0}%)",
            executed,
            self.passed(),
            pct(self.passed()),
            self.failed(),
            pct(self.failed()),
            self.skipped(),
            pct(self.skipped()),
        );
    }
}
