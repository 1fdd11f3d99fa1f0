//! Diagnostic tracing for the engine and its drivers.
//!
//! Tracker decisions (nodes opened, frontier claims, generator rounds) log at
//! `debug`/`trace`; driver decisions at `info`; misuse at `warn`. Test
//! results themselves go through [`crate::report::Reporter`], never through
//! tracing.

use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Initialize the tracing subscriber.
///
/// Reads `RUST_LOG`. Defaults to `warn` if unset.
/// Output: stderr, compact format.
///
/// # Example
/// ```bash
/// RUST_LOG=reprise=debug cargo run --bin reprise-selftest -- run
/// ```
pub fn init() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));

    // A harness may have installed its own subscriber already.
    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr).compact())
        .try_init();
}
