//! The handle every test function receives.
//!
//! [`TestContext`] owns the tracker for one test case and is threaded
//! explicitly into the test body, so sections and generators resolve
//! against it instead of any process-wide state.

use std::cell::{Ref, RefCell, RefMut};
use std::fmt::Debug;
use std::time::Duration;

use thiserror::Error;
use tracing::{debug, info, warn};

use crate::core::generator::GeneratorCursor;
use crate::core::path::node_path;
use crate::core::tracker::{Closed, NodeId, PassSummary, TrackerContext, Visit};
use crate::core::types::{PassEnd, SourceLocation, TrackerKey};
use crate::error::{TrackerError, UsageError};
use crate::report::{CheckFailure, SectionReport};
use crate::section::Section;

/// A `require!` whose condition was false.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{location}: requirement failed: {expression}")]
pub struct RequirementFailed {
    pub expression: String,
    pub location: SourceLocation,
}

/// Per-case execution context passed to test functions as `&TestContext`.
pub struct TestContext {
    tracker: RefCell<TrackerContext>,
    seed: u64,
    sections: RefCell<Vec<SectionReport>>,
    checks: RefCell<Vec<CheckFailure>>,
    early_exit: RefCell<Option<String>>,
}

impl TestContext {
    pub fn new(case: TrackerKey, seed: u64) -> Self {
        Self {
            tracker: RefCell::new(TrackerContext::new(case)),
            seed,
            sections: RefCell::new(Vec::new()),
            checks: RefCell::new(Vec::new()),
            early_exit: RefCell::new(None),
        }
    }

    /// Seed configured for this run; pass it to [`crate::generators::random`]
    /// for reproducible sequences.
    pub fn seed(&self) -> u64 {
        self.seed
    }

    /// Current pass number, starting at 1.
    pub fn pass(&self) -> u32 {
        self.tracker.borrow().pass()
    }

    /// Ask whether the section `name` runs on this pass.
    pub fn section(&self, name: &str, location: SourceLocation) -> Result<Section<'_>, TrackerError> {
        let key = TrackerKey::new(name, location);
        let visit = self.tracker_mut()?.enter_section(key)?;
        Ok(match visit {
            Visit::Enter(id) => Section::entered(self, id),
            Visit::Skip => Section::skipped(self),
        })
    }

    /// Current element of the generator at this call site.
    ///
    /// `make` runs only the first time the site is reached; later passes
    /// read the cursor the tracker keeps for it.
    pub fn generate<T, I, F>(
        &self,
        name: &str,
        location: SourceLocation,
        make: F,
    ) -> Result<T, TrackerError>
    where
        T: Clone + Debug + 'static,
        I: IntoIterator<Item = T>,
        I::IntoIter: 'static,
        F: FnOnce() -> Result<I, TrackerError>,
    {
        let key = TrackerKey::new(name, location);
        let known = self.tracker_mut()?.visit_generator(&key)?;
        let id = match known {
            Some(id) => id,
            None => {
                let cursor = GeneratorCursor::new(make()?)?;
                self.tracker_mut()?
                    .insert_generator(key, Box::new(cursor))?
            }
        };
        let tracker = self.tracker_ref()?;
        Ok(tracker.cursor::<T>(id)?.current().clone())
    }

    /// Record a non-fatal check against the innermost section.
    pub fn check(&self, passed: bool, expression: &str, location: SourceLocation) -> bool {
        if !self.count_check(passed, expression, location) || passed {
            return passed;
        }
        if let Ok(tracker) = self.tracker_ref() {
            let path = node_path(&tracker, tracker.current());
            info!(path = %path, expression, %location, "check failed");
            self.checks.borrow_mut().push(CheckFailure {
                path,
                expression: expression.to_string(),
                location,
                pass: tracker.pass(),
            });
        }
        passed
    }

    /// Like [`TestContext::check`], but fails the surrounding body.
    ///
    /// A false requirement is reported once, as the early exit it causes.
    pub fn require(
        &self,
        passed: bool,
        expression: &str,
        location: SourceLocation,
    ) -> Result<(), RequirementFailed> {
        self.count_check(passed, expression, location);
        if passed {
            return Ok(());
        }
        Err(RequirementFailed {
            expression: expression.to_string(),
            location,
        })
    }

    /// Tally a check; `false` when it was not counted.
    fn count_check(&self, passed: bool, expression: &str, location: SourceLocation) -> bool {
        match self.tracker_mut() {
            Ok(mut tracker) => tracker.record_assertion(passed, location),
            Err(err) => {
                warn!(expression, %location, error = %err, "check not recorded");
                false
            }
        }
    }

    pub(crate) fn leave_section(
        &self,
        id: NodeId,
        end: PassEnd,
        elapsed: Duration,
    ) -> Result<Closed, TrackerError> {
        let mut tracker = self.tracker_mut()?;
        let path = node_path(&tracker, id);
        tracker.add_elapsed(id, elapsed);
        let closed = tracker.leave(id, end)?;
        self.sections.borrow_mut().push(SectionReport {
            path,
            pass: tracker.pass(),
            state: closed.state,
            ended_early: !end.is_normal(),
            assertions: tracker.assertions_since_entry(id),
            elapsed,
        });
        Ok(closed)
    }

    pub(crate) fn note_early_exit(&self, message: String) {
        let mut slot = self.early_exit.borrow_mut();
        if slot.is_none() {
            debug!(message = %message, "section ended early");
            *slot = Some(message);
        }
    }

    pub(crate) fn start_pass(&self) -> Result<(), TrackerError> {
        self.early_exit.borrow_mut().take();
        self.tracker_mut()?.start_pass()
    }

    pub(crate) fn end_pass(&self, end: PassEnd) -> Result<PassSummary, TrackerError> {
        self.tracker_mut()?.end_pass(end)
    }

    pub(crate) fn take_early_exit(&self) -> Option<String> {
        self.early_exit.borrow_mut().take()
    }

    pub(crate) fn take_sections(&self) -> Vec<SectionReport> {
        std::mem::take(&mut *self.sections.borrow_mut())
    }

    pub(crate) fn take_checks(&self) -> Vec<CheckFailure> {
        std::mem::take(&mut *self.checks.borrow_mut())
    }

    /// Read access to the tracker, for drivers and reporters.
    pub fn tracker(&self) -> Ref<'_, TrackerContext> {
        self.tracker.borrow()
    }

    fn tracker_mut(&self) -> Result<RefMut<'_, TrackerContext>, TrackerError> {
        self.tracker
            .try_borrow_mut()
            .map_err(|_| UsageError::TrackerBusy.into())
    }

    fn tracker_ref(&self) -> Result<Ref<'_, TrackerContext>, TrackerError> {
        self.tracker
            .try_borrow()
            .map_err(|_| UsageError::TrackerBusy.into())
    }
}
