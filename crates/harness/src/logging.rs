//! One-shot tracing subscriber setup for suite runs
//!
//! `GAUNTLET_LOG` overrides everything; otherwise the suite's verbose flag
//! picks the default level. Repeated suite executions in one process (and
//! test harnesses that install their own subscriber) make installation
//! best-effort, hence `try_init`.

use once_cell::sync::OnceCell;
use tracing_subscriber::EnvFilter;

static INSTALLED: OnceCell<()> = OnceCell::new();

/// Install the global subscriber once. Later calls (and calls in processes
/// that already have a subscriber) are no-ops.
pub fn init(verbose: bool) {
    INSTALLED.get_or_init(|| {
        let default = if verbose { "debug" } else { "info" };
        let filter = EnvFilter::try_from_env("GAUNTLET_LOG")
            .unwrap_or_else(|_| EnvFilter::new(default));
        let _ = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(true)
            .try_init();
    });
}
