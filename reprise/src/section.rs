//! RAII guard for one section visit.

use std::time::Instant;

use tracing::warn;

use crate::context::TestContext;
use crate::core::tracker::NodeId;
use crate::core::types::PassEnd;

/// Guard returned by [`TestContext::section`].
///
/// An entered guard reports to the tracker exactly once: through
/// [`Section::finish`], or on drop, where a panic in progress counts as an
/// early exit. A skipped guard is inert.
pub struct Section<'cx> {
    cx: &'cx TestContext,
    node: Option<NodeId>,
    started: Instant,
}

impl<'cx> Section<'cx> {
    pub(crate) fn entered(cx: &'cx TestContext, node: NodeId) -> Self {
        Self {
            cx,
            node: Some(node),
            started: Instant::now(),
        }
    }

    pub(crate) fn skipped(cx: &'cx TestContext) -> Self {
        Self {
            cx,
            node: None,
            started: Instant::now(),
        }
    }

    /// Whether the section's body should run on this pass.
    pub fn is_entered(&self) -> bool {
        self.node.is_some()
    }

    /// Close the section with the body's result and hand the result back.
    ///
    /// An `Err` marks the section as ended early.
    pub fn finish(mut self, result: anyhow::Result<()>) -> anyhow::Result<()> {
        let Some(node) = self.node.take() else {
            return result;
        };
        let end = match &result {
            Ok(()) => PassEnd::Normal,
            Err(err) => {
                self.cx.note_early_exit(format!("{:#}", err));
                PassEnd::Early
            }
        };
        let left = self.cx.leave_section(node, end, self.started.elapsed());
        result?;
        left?;
        Ok(())
    }

    /// Run `body` if the section is entered, then close it.
    pub fn run<F>(self, body: F) -> anyhow::Result<()>
    where
        F: FnOnce() -> anyhow::Result<()>,
    {
        if !self.is_entered() {
            return Ok(());
        }
        let result = body();
        self.finish(result)
    }
}

impl Drop for Section<'_> {
    fn drop(&mut self) {
        let Some(node) = self.node.take() else {
            return;
        };
        let end = if std::thread::panicking() {
            PassEnd::Early
        } else {
            PassEnd::Normal
        };
        if let Err(err) = self.cx.leave_section(node, end, self.started.elapsed()) {
            warn!(error = %err, "failed to close section");
        }
    }
}
