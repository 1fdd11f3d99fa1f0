//! Error types for the tracker engine.
//!
//! Orchestration code (driver, config, session) reports through `anyhow`;
//! these typed errors are what the engine itself can fail with.

use thiserror::Error;

use crate::core::types::NodeKind;

/// Errors surfaced by trackers and generator cursors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TrackerError {
    /// The engine was driven in a way that can never be valid.
    #[error(transparent)]
    Usage(#[from] UsageError),

    /// `skip_to` ran off the end of a generator's sequence.
    #[error("generator exhausted at element {reached} before reaching element {requested}")]
    GeneratorExhausted { requested: usize, reached: usize },
}

impl TrackerError {
    pub fn is_usage(&self) -> bool {
        matches!(self, TrackerError::Usage(_))
    }
}

/// Programming errors in test code or in a driver.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum UsageError {
    #[error("generator cannot move backwards from element {current} to element {requested}")]
    SkipBackwards { current: usize, requested: usize },

    #[error("generator produced no elements")]
    EmptyGenerator,

    #[error("range step must be non-zero")]
    ZeroStep,

    #[error("chunk size must be non-zero")]
    ZeroChunkSize,

    #[error("random range is empty: low is greater than high")]
    EmptyRange,

    #[error("{key} was recorded as a {recorded} but is now used as a {requested}")]
    KindMismatch {
        key: String,
        recorded: NodeKind,
        requested: NodeKind,
    },

    #[error("generator {key} does not yield values of type {requested}")]
    GeneratorTypeMismatch { key: String, requested: &'static str },

    #[error("section {key} left while an inner section is still open")]
    UnbalancedLeave { key: String },

    #[error("no pass is in progress")]
    NoPassInProgress,

    #[error("a pass is already in progress")]
    PassInProgress,

    #[error("tracker is already borrowed by an enclosing call")]
    TrackerBusy,
}
