//! Test-only helpers for driving test cases and observing reporter events.

use anyhow::Result;

use crate::case::{TestCase, TestFn};
use crate::core::types::SourceLocation;
use crate::report::{Reporter, SectionReport};
use crate::run::{CaseOutcome, PassReport, RunSettings, SuiteOutcome, run_case};

/// Reporter event, in the order the driver emitted it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    CaseStarted(String),
    SectionEnded(SectionReport),
    PassEnded(PassReport),
    CaseEnded(Box<CaseOutcome>),
    SuiteEnded(Box<SuiteOutcome>),
}

/// Reporter that keeps every event.
#[derive(Debug, Default)]
pub struct RecordingReporter {
    pub events: Vec<Event>,
}

impl RecordingReporter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Paths of sections that closed, in order.
    pub fn section_paths(&self) -> Vec<String> {
        self.events
            .iter()
            .filter_map(|event| match event {
                Event::SectionEnded(section) => Some(section.path.clone()),
                _ => None,
            })
            .collect()
    }

    pub fn passes(&self) -> Vec<&PassReport> {
        self.events
            .iter()
            .filter_map(|event| match event {
                Event::PassEnded(pass) => Some(pass),
                _ => None,
            })
            .collect()
    }
}

impl Reporter for RecordingReporter {
    fn case_started(&mut self, name: &str) -> Result<()> {
        self.events.push(Event::CaseStarted(name.to_string()));
        Ok(())
    }

    fn section_ended(&mut self, section: &SectionReport) -> Result<()> {
        self.events.push(Event::SectionEnded(section.clone()));
        Ok(())
    }

    fn pass_ended(&mut self, pass: &PassReport) -> Result<()> {
        self.events.push(Event::PassEnded(pass.clone()));
        Ok(())
    }

    fn case_ended(&mut self, outcome: &CaseOutcome) -> Result<()> {
        self.events.push(Event::CaseEnded(Box::new(outcome.clone())));
        Ok(())
    }

    fn suite_ended(&mut self, outcome: &SuiteOutcome) -> Result<()> {
        self.events.push(Event::SuiteEnded(Box::new(outcome.clone())));
        Ok(())
    }
}

/// Build a case with a fixed test location.
pub fn case(name: &'static str, func: TestFn) -> TestCase {
    TestCase::new(name, SourceLocation::new("test_support.rs", 1, 1), func)
}

/// Run `func` to completion with default settings, recording events.
pub fn run_recorded(name: &'static str, func: TestFn) -> (CaseOutcome, RecordingReporter) {
    let mut reporter = RecordingReporter::new();
    let outcome = run_case(&case(name, func), &RunSettings::default(), &mut reporter)
        .expect("run case");
    (outcome, reporter)
}
