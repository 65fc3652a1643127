//! Render graph error types.

use thiserror::Error;

/// Errors reported by the render graph.
///
/// Usage mistakes inside a frame (an access with neither bit set, a second
/// writer without an intervening reader) are not errors; they are logged and
/// the frame continues. The variants here cover what cannot be absorbed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GraphError {
    /// Dependency construction reached a pass that was still being built.
    ///
    /// `cycle` lists the pass names along the loop, starting and ending with
    /// the same pass.
    #[error("render graph contains cyclic dependency: {}", .cycle.join(" -> "))]
    CyclicDependency {
        /// Pass names along the cycle.
        cycle: Vec<String>,
    },

    /// A callback was set on a pass that already had one.
    #[error("pass '{pass}' already has an execution callback")]
    CallbackAlreadySet {
        /// Name of the pass.
        pass: String,
    },

    /// A pass was declared as depending on itself.
    #[error("pass '{pass}' cannot depend on itself")]
    SelfDependency {
        /// Name of the pass.
        pass: String,
    },

    /// A handle from an earlier frame (or another arena) was used.
    #[error("stale {kind} handle (index {index}, generation {generation})")]
    StaleHandle {
        /// Handle type, `"pass"` or `"resource"`.
        kind: &'static str,
        /// Index stored in the handle.
        index: usize,
        /// Generation stored in the handle.
        generation: u32,
    },

    /// A graph was constructed on an arena that still holds a previous frame.
    #[error("graph arena was not reset (generation {generation} still holds {passes} passes)")]
    ArenaNotReset {
        /// Generation of the arena.
        generation: u32,
        /// Number of passes left from the previous frame.
        passes: usize,
    },
}
