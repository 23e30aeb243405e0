//! Result codes shared by steps, cases, suites, and the process exit status
//!
//! Every unit of work in the framework reports exactly one `Verdict`. The
//! same five codes double as the process exit status of an embedding test
//! program, so the numeric mapping is part of the public contract.

use serde::{Deserialize, Serialize};

/// Outcome of a step, phase, case, or suite run.
///
/// The numeric exit mapping is frozen:
/// `Ok=0`, `Failed=1`, `WrongArgs=2`, `Temporary=3`, `Skipped=4`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Verdict {
    /// The unit of work completed successfully.
    Ok,
    /// The unit of work failed; the failure is recorded against its owner.
    Failed,
    /// Configuration was malformed; nothing was executed.
    WrongArgs,
    /// Reserved: a transient condition surfaced to the top level.
    Temporary,
    /// The unit of work declined to run under the current configuration.
    Skipped,
}

impl Verdict {
    /// Process exit status for this verdict.
    pub fn exit_code(self) -> i32 {
        match self {
            Verdict::Ok => 0,
            Verdict::Failed => 1,
            Verdict::WrongArgs => 2,
            Verdict::Temporary => 3,
            Verdict::Skipped => 4,
        }
    }

    /// True only for `Ok`.
    pub fn is_ok(self) -> bool {
        matches!(self, Verdict::Ok)
    }

    /// True for `Failed` and `WrongArgs`.
    pub fn is_failure(self) -> bool {
        matches!(self, Verdict::Failed | Verdict::WrongArgs)
    }

    /// Fold two verdicts into the one that dominates.
    ///
    /// Failure dominates everything, then `Skipped`, then `Ok`. Used when
    /// aggregating step results into a phase verdict and case results into a
    /// suite verdict.
    pub fn merge(self, other: Verdict) -> Verdict {
        if self.is_failure() {
            return self;
        }
        if other.is_failure() {
            return other;
        }
        match (self, other) {
            (Verdict::Skipped, _) | (_, Verdict::Skipped) => Verdict::Skipped,
            (Verdict::Temporary, _) | (_, Verdict::Temporary) => Verdict::Temporary,
            _ => Verdict::Ok,
        }
    }
}

impl std::fmt::Display for Verdict {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Verdict::Ok => "OK",
            Verdict::Failed => "FAILED",
            Verdict::WrongArgs => "WRONGARGS",
            Verdict::Temporary => "TEMPORARY",
            Verdict::Skipped => "SKIPPED",
        };
        write!(f, "{}", s)
    }
}
