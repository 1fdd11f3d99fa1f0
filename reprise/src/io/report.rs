//! JSON run summary.

use std::path::Path;

use anyhow::{Context, Result};

use crate::run::SuiteOutcome;

/// Atomically write `outcome` as pretty-printed JSON.
pub fn write_report(path: &Path, outcome: &SuiteOutcome) -> Result<()> {
    let mut payload = serde_json::to_string_pretty(outcome).context("serialize run report")?;
    payload.push('\n');
    super::write_atomic(path, &payload)
}
