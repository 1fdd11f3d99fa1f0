//! Pass loop for test cases and suites.

use std::any::Any;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::time::Duration;

use anyhow::{Context, Result};
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::case::{TestCase, TestSuite};
use crate::context::TestContext;
use crate::core::invariants::validate_invariants;
use crate::core::path::node_path;
use crate::core::types::{Counts, NodeKind, NodeState, PassEnd, TrackerKey};
use crate::error::TrackerError;
use crate::io::config::RepriseConfig;
use crate::report::Reporter;

/// Limits and seed applied to every case of a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunSettings {
    pub max_passes: u32,
    pub seed: u64,
    /// Stop the suite after this many failed cases; 0 never stops.
    pub abort_after: u32,
}

impl Default for RunSettings {
    fn default() -> Self {
        RunSettings::from(&RepriseConfig::default())
    }
}

impl From<&RepriseConfig> for RunSettings {
    fn from(config: &RepriseConfig) -> Self {
        Self {
            max_passes: config.max_passes,
            seed: config.seed,
            abort_after: config.abort_after,
        }
    }
}

/// One early exit, attributed to the innermost node that ended early or to
/// the check that failed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Failure {
    pub path: String,
    pub message: String,
    pub pass: u32,
}

/// Reason why `run_case` stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum CaseStop {
    /// The tracker tree is complete.
    Complete,
    /// The case used its whole pass budget without completing.
    MaxPassesExceeded { max_passes: u32 },
}

/// Final statistics for one tracker node.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NodeSummary {
    pub path: String,
    pub kind: NodeKind,
    pub state: NodeState,
    pub runs: u32,
    pub failures: u32,
    pub elapsed: Duration,
    pub assertions: Counts,
}

/// Summary of one test case.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CaseOutcome {
    pub name: String,
    pub passes: u32,
    pub stop: CaseStop,
    pub failures: Vec<Failure>,
    pub assertions: Counts,
    pub sections: Vec<NodeSummary>,
}

impl CaseOutcome {
    pub fn passed(&self) -> bool {
        self.failures.is_empty() && self.stop == CaseStop::Complete
    }
}

/// What one pass did.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PassReport {
    pub case: String,
    pub pass: u32,
    pub ended_early: bool,
    pub failure: Option<Failure>,
    pub tree_complete: bool,
}

/// Summary of a suite run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SuiteOutcome {
    pub cases: Vec<CaseOutcome>,
    /// The run stopped before every selected case ran.
    pub aborted: bool,
}

impl SuiteOutcome {
    /// Cases tallied as passed or failed.
    pub fn case_counts(&self) -> Counts {
        let failed = self.cases.iter().filter(|case| !case.passed()).count() as u64;
        Counts {
            passed: self.cases.len() as u64 - failed,
            failed,
        }
    }

    pub fn assertions(&self) -> Counts {
        let mut total = Counts::default();
        for case in &self.cases {
            total += case.assertions;
        }
        total
    }

    pub fn all_passed(&self) -> bool {
        !self.aborted && self.cases.iter().all(CaseOutcome::passed)
    }
}

/// A test case in the middle of its passes.
pub struct CaseRun<'s> {
    case: &'s TestCase,
    cx: TestContext,
    failures: Vec<Failure>,
}

impl<'s> CaseRun<'s> {
    /// Start tracking `case` with a fresh tree.
    pub fn begin(case: &'s TestCase, settings: &RunSettings) -> Self {
        debug!(case = case.name, "case started");
        Self {
            case,
            cx: TestContext::new(TrackerKey::new(case.name, case.location), settings.seed),
            failures: Vec::new(),
        }
    }

    /// Invoke the test body once, converting panics and `Err` returns into
    /// failures.
    pub fn run_one_pass(&mut self, reporter: &mut dyn Reporter) -> Result<PassReport> {
        self.cx
            .start_pass()
            .with_context(|| format!("start pass for '{}'", self.case.name))?;

        let func = self.case.func;
        let cx = &self.cx;
        let (end, message) = match catch_unwind(AssertUnwindSafe(|| func(cx))) {
            Ok(Ok(())) => (PassEnd::Normal, None),
            Ok(Err(err)) => {
                if err.downcast_ref::<TrackerError>().is_some_and(TrackerError::is_usage) {
                    warn!(case = self.case.name, error = %err, "tracker misuse");
                }
                (PassEnd::Early, Some(format!("{:#}", err)))
            }
            Err(payload) => (PassEnd::Early, Some(panic_message(payload.as_ref()))),
        };

        let summary = self
            .cx
            .end_pass(end)
            .with_context(|| format!("end pass for '{}'", self.case.name))?;

        for section in self.cx.take_sections() {
            reporter.section_ended(&section)?;
        }
        for check in self.cx.take_checks() {
            self.failures.push(Failure {
                path: check.path,
                message: format!("check failed: {} at {}", check.expression, check.location),
                pass: check.pass,
            });
        }

        let early_exit = self.cx.take_early_exit();
        if summary.repeated_failure {
            debug!(
                case = self.case.name,
                pass = summary.pass,
                "early exit replayed an earlier failure"
            );
        }
        let failure = summary
            .failed_path
            .filter(|_| !summary.repeated_failure)
            .map(|path| Failure {
                path,
                message: message
                    .or(early_exit)
                    .unwrap_or_else(|| "ended early".to_string()),
                pass: summary.pass,
            });
        if let Some(failure) = &failure {
            info!(case = self.case.name, path = %failure.path, pass = failure.pass, "failure recorded");
            self.failures.push(failure.clone());
        }

        let report = PassReport {
            case: self.case.name.to_string(),
            pass: summary.pass,
            ended_early: !end.is_normal(),
            failure,
            tree_complete: summary.tree_complete,
        };
        reporter.pass_ended(&report)?;
        Ok(report)
    }

    pub fn is_tree_complete(&self) -> bool {
        self.cx.tracker().is_tree_complete()
    }

    pub fn passes(&self) -> u32 {
        self.cx.tracker().pass()
    }

    pub fn context(&self) -> &TestContext {
        &self.cx
    }

    /// Collect the case's statistics.
    pub fn finish(self, stop: CaseStop) -> CaseOutcome {
        let tracker = self.cx.tracker();
        let errors = validate_invariants(&tracker);
        if !errors.is_empty() {
            warn!(case = self.case.name, violations = ?errors, "tracker invariants violated");
        }

        let mut assertions = tracker.root().stats().assertions;
        let sections = tracker
            .walk()
            .into_iter()
            .map(|id| {
                let node = tracker.node(id);
                let stats = node.stats();
                assertions += stats.assertions;
                NodeSummary {
                    path: node_path(&tracker, id),
                    kind: node.kind(),
                    state: node.state(),
                    runs: stats.runs,
                    failures: stats.failures,
                    elapsed: stats.elapsed,
                    assertions: stats.assertions,
                }
            })
            .collect();

        CaseOutcome {
            name: self.case.name.to_string(),
            passes: tracker.pass(),
            stop,
            failures: self.failures,
            assertions,
            sections,
        }
    }
}

/// Run passes of `case` until its tree is complete or the pass budget is
/// spent.
pub fn run_case(
    case: &TestCase,
    settings: &RunSettings,
    reporter: &mut dyn Reporter,
) -> Result<CaseOutcome> {
    reporter.case_started(case.name)?;
    let mut run = CaseRun::begin(case, settings);
    let stop = loop {
        if run.is_tree_complete() {
            break CaseStop::Complete;
        }
        if run.passes() >= settings.max_passes {
            warn!(case = case.name, max_passes = settings.max_passes, "pass budget exhausted");
            break CaseStop::MaxPassesExceeded {
                max_passes: settings.max_passes,
            };
        }
        run.run_one_pass(reporter)?;
    };
    let outcome = run.finish(stop);
    debug!(case = case.name, passes = outcome.passes, passed = outcome.passed(), "case finished");
    reporter.case_ended(&outcome)?;
    Ok(outcome)
}

/// Run the cases of `suite` named in `names` (all when empty), in order.
///
/// This stops early once `abort_after` cases have failed, and immediately on
/// any reporter error.
pub fn run_suite(
    suite: &TestSuite,
    names: &[String],
    settings: &RunSettings,
    reporter: &mut dyn Reporter,
) -> Result<SuiteOutcome> {
    let selected = suite.select(names)?;
    let mut outcome = SuiteOutcome::default();
    let mut failed = 0u32;
    for (index, case) in selected.iter().enumerate() {
        let case_outcome = run_case(case, settings, reporter)?;
        if !case_outcome.passed() {
            failed += 1;
        }
        outcome.cases.push(case_outcome);
        if settings.abort_after > 0 && failed >= settings.abort_after {
            outcome.aborted = index + 1 < selected.len();
            if outcome.aborted {
                info!(failed, "aborting run");
            }
            break;
        }
    }
    reporter.suite_ended(&outcome)?;
    Ok(outcome)
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        return (*message).to_string();
    }
    if let Some(message) = payload.downcast_ref::<String>() {
        return message.clone();
    }
    "panic with non-string payload".to_string()
}
