//! Run configuration parsed from CLI-style arguments
//!
//! Builds the `clap::Command` tree used by [`TestSuite::execute`]. Parsing
//! uses `try_get_matches_from` so malformed argv maps to the `WrongArgs`
//! exit code instead of aborting the process.
//!
//! [`TestSuite::execute`]: crate::suite::TestSuite::execute

use clap::{Arg, ArgAction, Command};

/// Parsed run configuration for one suite execution.
#[derive(Debug, Clone)]
pub struct RunConfig {
    /// Record count made available to step bodies via the context.
    pub records: u64,
    /// Loop count made available to step bodies via the context.
    pub loops: u64,
    /// Run only the named test case.
    pub test_name: Option<String>,
    /// Tables given on the command line; empty means "all registered".
    pub tables: Vec<String>,
    /// Show per-case elapsed time in the summary.
    pub timer: bool,
    /// Lower the log level to DEBUG.
    pub verbose: bool,
    /// Schema is managed externally: verify tables exist, never create/drop.
    pub noddl: bool,
    /// Run each case once against the fixed table set instead of once per
    /// table.
    pub run_once: bool,
    /// List registered cases and exit.
    pub print_cases: bool,
    /// List registered cases with every step and exit.
    pub print_tree: bool,
}

/// Build the CLI command tree for a suite.
fn build_cli(suite_name: &str) -> Command {
    Command::new(suite_name.to_string())
        .about("Run a test battery against a storage backend")
        .arg(
            Arg::new("records")
                .short('r')
                .long("records")
                .value_parser(clap::value_parser!(u64))
                .help("Number of records for operations (default: 1000)"),
        )
        .arg(
            Arg::new("loops")
                .short('l')
                .long("loops")
                .value_parser(clap::value_parser!(u64))
                .help("Number of loop iterations for operations (default: 5)"),
        )
        .arg(
            Arg::new("testname")
                .short('n')
                .long("testname")
                .help("Run only the named test case"),
        )
        .arg(
            Arg::new("no-timer")
                .long("no-timer")
                .help("Omit per-case elapsed time from the summary")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("verbose")
                .short('v')
                .long("verbose")
                .help("Verbose logging")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("noddl")
                .long("noddl")
                .help("Schema is managed externally; verify tables instead of creating them")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("run-once")
                .long("run-once")
                .help("Run each case once against the fixed table set")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("print-cases")
                .long("print-cases")
                .help("List registered test cases and exit")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("print-tree")
                .long("print-tree")
                .help("List registered test cases with their steps and exit")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("tables")
                .help("Tables to run against (default: all registered)")
                .num_args(0..),
        )
}

impl RunConfig {
    /// Parse argv (including the program name in position zero).
    ///
    /// # Errors
    ///
    /// Returns clap's rendered message for malformed argv; the caller maps
    /// it to `WrongArgs`.
    pub fn parse<I, S>(suite_name: &str, argv: I) -> Result<RunConfig, String>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let matches = build_cli(suite_name)
            .try_get_matches_from(argv.into_iter().map(Into::into))
            .map_err(|e| e.to_string())?;

        Ok(RunConfig {
            records: matches.get_one::<u64>("records").copied().unwrap_or(1000),
            loops: matches.get_one::<u64>("loops").copied().unwrap_or(5),
            test_name: matches.get_one::<String>("testname").cloned(),
            tables: matches
                .get_many::<String>("tables")
                .map(|vals| vals.cloned().collect())
                .unwrap_or_default(),
            timer: !matches.get_flag("no-timer"),
            verbose: matches.get_flag("verbose"),
            noddl: matches.get_flag("noddl"),
            run_once: matches.get_flag("run-once"),
            print_cases: matches.get_flag("print-cases"),
            print_tree: matches.get_flag("print-tree"),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Result<RunConfig, String> {
        let mut argv = vec!["suite"];
        argv.extend_from_slice(args);
        RunConfig::parse("suite", argv)
    }

    #[test]
    fn test_defaults() {
        let config = parse(&[]).unwrap();
        assert_eq!(config.records, 1000);
        assert_eq!(config.loops, 5);
        assert_eq!(config.test_name, None);
        assert!(config.tables.is_empty());
        assert!(config.timer);
        assert!(!config.verbose);
        assert!(!config.noddl);
        assert!(!config.run_once);
    }

    #[test]
    fn test_full_flag_set() {
        let config = parse(&[
            "-r", "500", "-l", "2", "-n", "InsertRollback", "--no-timer", "-v", "--noddl",
            "--run-once", "T1", "T2",
        ])
        .unwrap();
        assert_eq!(config.records, 500);
        assert_eq!(config.loops, 2);
        assert_eq!(config.test_name.as_deref(), Some("InsertRollback"));
        assert_eq!(config.tables, vec!["T1", "T2"]);
        assert!(!config.timer);
        assert!(config.verbose);
        assert!(config.noddl);
        assert!(config.run_once);
    }

    #[test]
    fn test_malformed_argv_is_an_error() {
        assert!(parse(&["--records", "not-a-number"]).is_err());
        assert!(parse(&["--no-such-flag"]).is_err());
    }

    #[test]
    fn test_print_modes() {
        assert!(parse(&["--print-cases"]).unwrap().print_cases);
        assert!(parse(&["--print-tree"]).unwrap().print_tree);
    }
}
