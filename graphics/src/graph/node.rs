//! Scheduling nodes built while resolving a frame's dependencies.

use ember_core::arena::{Idx, List};

use super::pass::PassHandle;

pub(crate) type NodeId = Idx<Node>;

/// Binds one pass to its resolved dependency and dependent edges.
///
/// At most one node exists per pass per frame. The synthetic root that
/// depends on every output has no pass.
#[derive(Debug)]
pub(crate) struct Node {
    pub(crate) pass: Option<PassHandle>,
    pub(crate) dependencies: List<NodeId>,
    pub(crate) dependents: List<NodeId>,
    pub(crate) executed: bool,
    /// Longest producer chain below this node; producers without inputs are 0.
    pub(crate) depth: u32,
}

impl Node {
    pub(crate) fn root() -> Self {
        Self::new(None)
    }

    pub(crate) fn for_pass(pass: PassHandle) -> Self {
        Self::new(Some(pass))
    }

    fn new(pass: Option<PassHandle>) -> Self {
        Self {
            pass,
            dependencies: List::new(),
            dependents: List::new(),
            executed: false,
            depth: 0,
        }
    }
}
