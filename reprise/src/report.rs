//! Reporting seam: what the run driver tells reporters, and a console
//! reporter.

use std::io::Write;
use std::time::Duration;

use anyhow::{Context, Result};
use serde::Serialize;

use crate::core::types::{Counts, NodeState, SourceLocation};
use crate::run::{CaseOutcome, CaseStop, PassReport, SuiteOutcome};

/// A section that closed during a pass.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SectionReport {
    pub path: String,
    pub pass: u32,
    pub state: NodeState,
    pub ended_early: bool,
    /// Checks recorded directly in this section during this visit.
    pub assertions: Counts,
    pub elapsed: Duration,
}

/// A `check!` whose condition was false.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CheckFailure {
    pub path: String,
    pub expression: String,
    pub location: SourceLocation,
    pub pass: u32,
}

/// Receives run events. Every method defaults to doing nothing.
pub trait Reporter {
    fn case_started(&mut self, _name: &str) -> Result<()> {
        Ok(())
    }

    fn section_ended(&mut self, _section: &SectionReport) -> Result<()> {
        Ok(())
    }

    fn pass_ended(&mut self, _pass: &PassReport) -> Result<()> {
        Ok(())
    }

    fn case_ended(&mut self, _outcome: &CaseOutcome) -> Result<()> {
        Ok(())
    }

    fn suite_ended(&mut self, _outcome: &SuiteOutcome) -> Result<()> {
        Ok(())
    }
}

/// Reporter that ignores every event.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullReporter;

impl Reporter for NullReporter {}

/// Line-oriented summary written to any `Write`.
pub struct ConsoleReporter<W: Write> {
    out: W,
    verbose: bool,
}

impl<W: Write> ConsoleReporter<W> {
    pub fn new(out: W) -> Self {
        Self {
            out,
            verbose: false,
        }
    }

    /// Also print every section as it closes.
    pub fn verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}

impl<W: Write> Reporter for ConsoleReporter<W> {
    fn section_ended(&mut self, section: &SectionReport) -> Result<()> {
        if !self.verbose {
            return Ok(());
        }
        writeln!(
            self.out,
            "    pass {} {} [{}] {:.3}ms",
            section.pass,
            section.path,
            state_label(section.state),
            section.elapsed.as_secs_f64() * 1000.0
        )
        .context("write section line")
    }

    fn case_ended(&mut self, outcome: &CaseOutcome) -> Result<()> {
        let verdict = if outcome.passed() { "ok" } else { "FAILED" };
        writeln!(
            self.out,
            "{} ... {} ({} passes, {} checks)",
            outcome.name,
            verdict,
            outcome.passes,
            outcome.assertions.total()
        )
        .context("write case line")?;
        for failure in &outcome.failures {
            writeln!(
                self.out,
                "  {} (pass {}): {}",
                failure.path, failure.pass, failure.message
            )
            .context("write failure line")?;
        }
        if let CaseStop::MaxPassesExceeded { max_passes } = outcome.stop {
            writeln!(self.out, "  stopped after {} passes", max_passes)
                .context("write stop line")?;
        }
        Ok(())
    }

    fn suite_ended(&mut self, outcome: &SuiteOutcome) -> Result<()> {
        let cases = outcome.case_counts();
        let checks = outcome.assertions();
        writeln!(
            self.out,
            "\n{} cases: {} passed, {} failed; {} checks: {} passed, {} failed",
            cases.total(),
            cases.passed,
            cases.failed,
            checks.total(),
            checks.passed,
            checks.failed
        )
        .context("write suite summary")?;
        if outcome.aborted {
            writeln!(self.out, "run aborted early").context("write abort line")?;
        }
        self.out.flush().context("flush console reporter")
    }
}

fn state_label(state: NodeState) -> &'static str {
    match state {
        NodeState::NotStarted => "not started",
        NodeState::Open | NodeState::ExecutingChildren => "open",
        NodeState::Completed => "done",
        NodeState::CompletedWithFailure => "failed",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::run::Failure;

    fn outcome(failures: Vec<Failure>) -> CaseOutcome {
        CaseOutcome {
            name: "widget".to_string(),
            passes: 3,
            stop: CaseStop::Complete,
            failures,
            assertions: Counts {
                passed: 4,
                failed: 0,
            },
            sections: Vec::new(),
        }
    }

    #[test]
    fn console_prints_case_verdict_and_failures() {
        let mut reporter = ConsoleReporter::new(Vec::new());
        reporter.case_ended(&outcome(Vec::new())).expect("report");
        reporter
            .case_ended(&outcome(vec![Failure {
                path: "widget/resize".to_string(),
                message: "boom".to_string(),
                pass: 2,
            }]))
            .expect("report");
        let text = String::from_utf8(reporter.into_inner()).expect("utf8");
        assert!(text.contains("widget ... ok (3 passes, 4 checks)"));
        assert!(text.contains("widget ... FAILED"));
        assert!(text.contains("  widget/resize (pass 2): boom"));
    }
}
