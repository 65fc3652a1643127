//! Frame and pass lifecycle hooks.
//!
//! Observers are notified while a graph executes. A device layer can issue
//! barriers from [`GraphObserver::on_pass_begin`], since the pass view there
//! lists every usage the pass declared.

use crate::executor::ExecutionSummary;
use crate::graph::PassView;

/// Information about the frame being executed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameInfo<'g> {
    /// Debug label from the graph configuration.
    pub label: Option<&'g str>,
    /// Arena generation of the frame.
    pub generation: u32,
    /// Passes declared in the frame.
    pub pass_count: usize,
    /// Outputs declared in the frame.
    pub output_count: usize,
    /// Passes that will execute.
    pub node_count: usize,
}

/// Receives lifecycle notifications from an executing render graph.
///
/// All methods default to doing nothing.
pub trait GraphObserver {
    /// Called after dependencies are resolved, before the first pass runs.
    fn on_frame_begin(&mut self, _frame: &FrameInfo<'_>) {}

    /// Called after the last pass ran.
    fn on_frame_end(&mut self, _summary: &ExecutionSummary) {}

    /// Called before a pass callback runs.
    fn on_pass_begin(&mut self, _pass: &PassView<'_>) {}

    /// Called after a pass callback returned.
    fn on_pass_end(&mut self, _pass: &PassView<'_>) {}
}

/// Observer that logs every executed pass at debug level.
#[derive(Debug, Default)]
pub struct PassLogger {
    frame: u32,
}

impl PassLogger {
    /// Create a new pass logger.
    pub fn new() -> Self {
        Self::default()
    }
}

impl GraphObserver for PassLogger {
    fn on_frame_begin(&mut self, frame: &FrameInfo<'_>) {
        self.frame = frame.generation;
        log::debug!(
            "[frame {}] {}: {} of {} passes scheduled",
            frame.generation,
            frame.label.unwrap_or("render graph"),
            frame.node_count,
            frame.pass_count
        );
    }

    fn on_pass_begin(&mut self, pass: &PassView<'_>) {
        log::debug!(
            "[frame {}] begin {:?} pass '{}' ({} usages)",
            self.frame,
            pass.kind(),
            pass.name(),
            pass.usages().count()
        );
    }

    fn on_pass_end(&mut self, pass: &PassView<'_>) {
        log::debug!("[frame {}] end pass '{}'", self.frame, pass.name());
    }
}
