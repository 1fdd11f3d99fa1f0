//! Stable exit codes for test harness binaries.

/// Every selected test case passed, or the command succeeded.
pub const OK: i32 = 0;
/// Invalid arguments, config, or another error outside the tests themselves.
pub const INVALID: i32 = 1;
/// At least one test case failed or was stopped by its pass budget.
pub const FAILED: i32 = 2;
