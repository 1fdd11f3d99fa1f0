//! Shared deterministic types for the tracker engine.
//!
//! These types define stable contracts between the tracker, the section guard
//! and the run driver. They hold no references into a live tree and are safe
//! to hand to reporters.

use std::fmt;
use std::ops::{AddAssign, Sub};
use std::time::Duration;

use serde::Serialize;

/// Call-site position of a section, generator or check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct SourceLocation {
    pub file: &'static str,
    pub line: u32,
    pub column: u32,
}

impl SourceLocation {
    pub const fn new(file: &'static str, line: u32, column: u32) -> Self {
        Self { file, line, column }
    }
}

impl fmt::Display for SourceLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.file, self.line)
    }
}

/// Identity of a tracker node among its siblings.
///
/// Two visits with the same key under the same parent resolve to the same
/// node on every pass, so names must be stable across passes.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct TrackerKey {
    pub name: String,
    pub location: SourceLocation,
}

impl TrackerKey {
    pub fn new(name: impl Into<String>, location: SourceLocation) -> Self {
        Self {
            name: name.into(),
            location,
        }
    }
}

impl fmt::Display for TrackerKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "'{}' ({})", self.name, self.location)
    }
}

/// Which kind of call site a node tracks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeKind {
    Section,
    Generator,
}

impl fmt::Display for NodeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NodeKind::Section => f.write_str("section"),
            NodeKind::Generator => f.write_str("generator"),
        }
    }
}

/// Per-node exploration state.
///
/// `Completed` and `CompletedWithFailure` are terminal: a node in either state
/// is never executed for real again.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeState {
    NotStarted,
    Open,
    ExecutingChildren,
    Completed,
    CompletedWithFailure,
}

impl NodeState {
    pub fn is_complete(self) -> bool {
        matches!(self, NodeState::Completed | NodeState::CompletedWithFailure)
    }

    pub fn is_open(self) -> bool {
        matches!(self, NodeState::Open | NodeState::ExecutingChildren)
    }
}

/// Assertion tallies.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Counts {
    pub passed: u64,
    pub failed: u64,
}

impl Counts {
    pub fn total(&self) -> u64 {
        self.passed + self.failed
    }
}

impl AddAssign for Counts {
    fn add_assign(&mut self, other: Counts) {
        self.passed += other.passed;
        self.failed += other.failed;
    }
}

impl Sub for Counts {
    type Output = Counts;

    fn sub(self, other: Counts) -> Counts {
        Counts {
            passed: self.passed.saturating_sub(other.passed),
            failed: self.failed.saturating_sub(other.failed),
        }
    }
}

/// Reporting data accumulated on a node across every pass that ran it.
///
/// The opening policy never reads these fields.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SectionStats {
    /// Number of times the node's body was run (live or replayed).
    pub runs: u32,
    /// Number of early exits attributed to this node.
    pub failures: u32,
    /// Wall-clock time spent inside the node's body, summed over runs.
    pub elapsed: Duration,
    /// Checks recorded while this node was the innermost section.
    pub assertions: Counts,
}

/// How a test body ended a pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PassEnd {
    /// The body returned `Ok(())`.
    Normal,
    /// The body panicked or returned `Err`.
    Early,
}

impl PassEnd {
    pub fn is_normal(self) -> bool {
        self == PassEnd::Normal
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counts_subtract_saturates() {
        let before = Counts {
            passed: 3,
            failed: 1,
        };
        let after = Counts {
            passed: 5,
            failed: 1,
        };
        assert_eq!(
            after - before,
            Counts {
                passed: 2,
                failed: 0,
            }
        );
        assert_eq!(before - after, Counts::default());
    }

    #[test]
    fn terminal_states_are_complete_and_not_open() {
        for state in [NodeState::Completed, NodeState::CompletedWithFailure] {
            assert!(state.is_complete());
            assert!(!state.is_open());
        }
        assert!(NodeState::ExecutingChildren.is_open());
        assert!(!NodeState::NotStarted.is_open());
        assert!(!NodeState::NotStarted.is_complete());
    }
}
