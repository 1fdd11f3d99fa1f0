//! Command-line session for custom test harness binaries.
//!
//! A harness builds a [`TestSuite`], parses [`SessionArgs`] and hands both
//! to [`run_session`], which returns the process exit code.

use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use clap::{Args, Parser, Subcommand};
use tracing::debug;

use crate::case::TestSuite;
use crate::exit_codes;
use crate::io::config::{DEFAULT_CONFIG_FILE, RepriseConfig, load_config};
use crate::io::report::write_report;
use crate::report::ConsoleReporter;
use crate::run::{RunSettings, run_suite};

#[derive(Debug, Parser)]
#[command(name = "reprise", version, about = "Run re-entrant section tests")]
pub struct SessionArgs {
    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Run test cases (all of them when no names are given).
    Run(RunArgs),
    /// Print the registered test case names.
    List,
}

#[derive(Debug, Default, Args)]
pub struct RunArgs {
    /// Exact test case names to run.
    pub names: Vec<String>,

    /// Config file; defaults to `reprise.toml` when present.
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Seed for random generators.
    #[arg(long)]
    pub seed: Option<u64>,

    /// Pass budget per test case.
    #[arg(long)]
    pub max_passes: Option<u32>,

    /// Stop after this many failed test cases (0 = never).
    #[arg(long)]
    pub abort_after: Option<u32>,

    /// Write a JSON run summary to this path.
    #[arg(long)]
    pub report_json: Option<PathBuf>,

    /// Print every section as it closes.
    #[arg(short, long)]
    pub verbose: bool,
}

impl RunArgs {
    /// Config file values with command-line overrides applied.
    pub fn resolve_config(&self) -> Result<RepriseConfig> {
        let mut cfg = match &self.config {
            Some(path) => {
                if !path.exists() {
                    bail!("config file {} does not exist", path.display());
                }
                load_config(path)?
            }
            None => load_config(Path::new(DEFAULT_CONFIG_FILE))?,
        };
        if let Some(seed) = self.seed {
            cfg.seed = seed;
        }
        if let Some(max_passes) = self.max_passes {
            cfg.max_passes = max_passes;
        }
        if let Some(abort_after) = self.abort_after {
            cfg.abort_after = abort_after;
        }
        if let Some(path) = &self.report_json {
            cfg.report_json = Some(path.clone());
        }
        cfg.validate().context("validate command-line overrides")?;
        Ok(cfg)
    }
}

/// Execute the parsed command against `suite`, writing human output to
/// `out`. Returns the exit code to use.
pub fn run_session(suite: &TestSuite, args: SessionArgs, out: &mut dyn Write) -> Result<i32> {
    match args.command.unwrap_or_else(|| Command::Run(RunArgs::default())) {
        Command::List => {
            for case in suite.cases() {
                writeln!(out, "{}\t{}", case.name, case.location).context("write case list")?;
            }
            Ok(exit_codes::OK)
        }
        Command::Run(run_args) => {
            let cfg = run_args.resolve_config()?;
            debug!(?cfg, "resolved config");
            let settings = RunSettings::from(&cfg);
            let mut reporter = ConsoleReporter::new(&mut *out).verbose(run_args.verbose);
            let outcome = run_suite(suite, &run_args.names, &settings, &mut reporter)?;
            if let Some(path) = &cfg.report_json {
                write_report(path, &outcome)
                    .with_context(|| format!("write report {}", path.display()))?;
            }
            if outcome.all_passed() {
                Ok(exit_codes::OK)
            } else {
                Ok(exit_codes::FAILED)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::TestContext;
    use crate::{TestResult, test_case};

    fn passing(_cx: &TestContext) -> TestResult {
        Ok(())
    }

    fn suite() -> TestSuite {
        let mut suite = TestSuite::new();
        suite.add(test_case!("passing", passing)).expect("add");
        suite
    }

    #[test]
    fn parses_run_flags() {
        let args = SessionArgs::try_parse_from([
            "reprise",
            "run",
            "a",
            "b",
            "--seed",
            "3",
            "--max-passes",
            "9",
        ])
        .expect("parse");
        let Some(Command::Run(run)) = args.command else {
            panic!("expected run command");
        };
        assert_eq!(run.names, vec!["a".to_string(), "b".to_string()]);
        assert_eq!(run.seed, Some(3));
        assert_eq!(run.max_passes, Some(9));
    }

    #[test]
    fn flags_override_config_file() {
        let temp = tempfile::tempdir().expect("tempdir");
        let path = temp.path().join("custom.toml");
        std::fs::write(&path, "seed = 1\nabort_after = 4\n").expect("write");
        let args = RunArgs {
            config: Some(path),
            seed: Some(2),
            ..RunArgs::default()
        };
        let cfg = args.resolve_config().expect("resolve");
        assert_eq!(cfg.seed, 2);
        assert_eq!(cfg.abort_after, 4);
    }

    #[test]
    fn missing_explicit_config_is_an_error() {
        let temp = tempfile::tempdir().expect("tempdir");
        let args = RunArgs {
            config: Some(temp.path().join("absent.toml")),
            ..RunArgs::default()
        };
        assert!(args.resolve_config().is_err());
    }

    #[test]
    fn list_prints_case_names() {
        let mut out = Vec::new();
        let args = SessionArgs {
            command: Some(Command::List),
        };
        let code = run_session(&suite(), args, &mut out).expect("list");
        assert_eq!(code, exit_codes::OK);
        assert!(String::from_utf8(out).expect("utf8").starts_with("passing\t"));
    }
}
