//! Re-entrant section and generator tracking for unit tests.
//!
//! A test function written with nested [`section!`] blocks and [`generate!`]
//! values is run from the top once per leaf of its execution tree. A
//! persistent tracker tree decides on every pass which branch runs live and
//! which are skipped or replayed. The crate is split the usual way:
//!
//! - **[`core`]**: the tracker tree, its opening policy and generator
//!   cursors. Pure and deterministic.
//! - **[`io`]**: config files and JSON run reports.
//!
//! [`context`], [`section`] and the macros form the surface test bodies use;
//! [`run`], [`report`] and [`session`] drive suites of cases.
//!
//! ```ignore
//! use reprise::{TestContext, TestResult, check, generate, section};
//!
//! fn vectors(cx: &TestContext) -> TestResult {
//!     let mut v = vec![0u8; 5];
//!     section!(cx, "grows", {
//!         let extra: usize = generate!(cx, reprise::generators::values([1, 10]))?;
//!         v.resize(5 + extra, 0);
//!         check!(cx, v.len() > 5);
//!     })?;
//!     section!(cx, "shrinks", {
//!         v.truncate(2);
//!         check!(cx, v.len() == 2);
//!     })?;
//!     Ok(())
//! }
//! ```

pub mod case;
pub mod context;
pub mod core;
pub mod error;
pub mod exit_codes;
pub mod generators;
pub mod io;
pub mod logging;
mod macros;
pub mod report;
pub mod run;
pub mod section;
pub mod session;
#[cfg(any(test, feature = "test-support"))]
pub mod test_support;

pub use case::{TestCase, TestFn, TestSuite};
pub use context::{RequirementFailed, TestContext};
pub use crate::core::types::SourceLocation;
pub use error::{TrackerError, UsageError};
pub use section::Section;

/// Error type test bodies return.
pub type TestError = anyhow::Error;

/// Return type of test bodies.
pub type TestResult = Result<(), TestError>;
