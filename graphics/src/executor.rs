//! Render graph execution.
//!
//! Runs a built graph depth first from its root. A node runs after all of
//! its dependencies and at most once, so shared producers execute a single
//! time no matter how many consumers reach them. Independent dependencies
//! run in pass declaration order.
//!
//! The walk keeps its own stack, so chain length is bounded by memory rather
//! than by the thread's call stack.

use ember_core::profile_scope;

use crate::graph::node::NodeId;
use crate::graph::{GraphArena, PassHandle, PassView};
use crate::observer::GraphObserver;

/// Outcome of executing one frame's render graph.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExecutionSummary {
    executed: Vec<PassHandle>,
    pass_count: usize,
    node_count: usize,
    critical_path_len: u32,
    ignored_usages: u32,
    write_hazards: u32,
}

impl ExecutionSummary {
    /// Passes that ran, in execution order.
    pub fn executed(&self) -> &[PassHandle] {
        &self.executed
    }

    /// Number of passes that ran.
    pub fn executed_count(&self) -> usize {
        self.executed.len()
    }

    /// Number of passes declared in the frame.
    pub fn pass_count(&self) -> usize {
        self.pass_count
    }

    /// Number of declared passes that no output needed.
    pub fn culled_count(&self) -> usize {
        self.pass_count.saturating_sub(self.executed.len())
    }

    /// Number of pass nodes built for the frame.
    pub fn node_count(&self) -> usize {
        self.node_count
    }

    /// Length of the longest producer chain, in passes.
    pub fn critical_path_len(&self) -> u32 {
        self.critical_path_len
    }

    /// Usages declared without read or write access.
    pub fn ignored_usages(&self) -> u32 {
        self.ignored_usages
    }

    /// Writes that replaced an unread write of the same resource.
    pub fn write_hazards(&self) -> u32 {
        self.write_hazards
    }

    /// Check if `pass` ran.
    pub fn was_executed(&self, pass: PassHandle) -> bool {
        self.executed.contains(&pass)
    }

    /// Position of `pass` in the execution order.
    pub fn position(&self, pass: PassHandle) -> Option<usize> {
        self.executed.iter().position(|&p| p == pass)
    }
}

/// Pending step of the depth-first walk.
#[derive(Debug, Clone, Copy)]
enum Visit {
    /// Schedule the node's dependencies.
    Enter(NodeId),
    /// Dependencies are done; run the node.
    Exit(NodeId),
}

pub(crate) struct Executor<'e, 'a> {
    arena: &'e mut GraphArena,
    observers: &'e mut [&'a mut dyn GraphObserver],
    executed: Vec<PassHandle>,
    stack: Vec<Visit>,
    // Reused to order each node's dependencies.
    scratch: Vec<(usize, NodeId)>,
    root: Option<NodeId>,
}

impl<'e, 'a> Executor<'e, 'a> {
    pub(crate) fn new(
        arena: &'e mut GraphArena,
        observers: &'e mut [&'a mut dyn GraphObserver],
    ) -> Self {
        let executed = Vec::with_capacity(arena.nodes.len());
        Self {
            arena,
            observers,
            executed,
            stack: Vec::new(),
            scratch: Vec::new(),
            root: None,
        }
    }

    /// Run `root` and everything it depends on.
    pub(crate) fn run(&mut self, root: NodeId) {
        self.root = Some(root);
        self.stack.push(Visit::Enter(root));

        while let Some(step) = self.stack.pop() {
            match step {
                Visit::Enter(node) => self.enter(node),
                Visit::Exit(node) => self.exit(node),
            }
        }
    }

    /// Push `node`'s exit, then its pending dependencies so the one declared
    /// first is popped first.
    fn enter(&mut self, node: NodeId) {
        let Some(entry) = self.arena.nodes.get(node) else {
            return;
        };
        if entry.executed {
            return;
        }
        self.stack.push(Visit::Exit(node));

        let nodes = &self.arena.nodes;
        self.scratch.clear();
        self.scratch.extend(
            self.arena
                .node_links
                .iter(&entry.dependencies)
                .filter_map(|&dependency| {
                    let pending = nodes.get(dependency).filter(|dep| !dep.executed)?;
                    let order = pending.pass.map_or(usize::MAX, PassHandle::index);
                    Some((order, dependency))
                }),
        );
        self.scratch.sort_unstable_by_key(|&(order, _)| order);
        let pending = self.scratch.iter().rev();
        self.stack
            .extend(pending.map(|&(_, dependency)| Visit::Enter(dependency)));
    }

    fn exit(&mut self, node: NodeId) {
        let Some(entry) = self.arena.nodes.get_mut(node) else {
            return;
        };
        if entry.executed {
            return;
        }
        entry.executed = true;
        if let Some(pass) = entry.pass {
            self.invoke(pass);
        }
    }

    fn invoke(&mut self, pass: PassHandle) {
        let callback = self
            .arena
            .passes
            .get_mut(pass.0)
            .and_then(|entry| entry.take_callback());

        let arena = &*self.arena;
        let Some(entry) = arena.passes.get(pass.0) else {
            return;
        };
        let view = PassView {
            handle: pass,
            pass: entry,
            usages: &arena.usages,
            links: &arena.pass_links,
        };

        for observer in self.observers.iter_mut() {
            observer.on_pass_begin(&view);
        }
        log::trace!("Executing pass '{}' ({:?})", view.name(), view.kind());
        if let Some(callback) = callback {
            profile_scope!("render_pass");
            callback();
        }
        for observer in self.observers.iter_mut() {
            observer.on_pass_end(&view);
        }

        self.executed.push(pass);
    }

    pub(crate) fn finish(self, ignored_usages: u32, write_hazards: u32) -> ExecutionSummary {
        let critical_path_len = self
            .root
            .and_then(|root| self.arena.nodes.get(root))
            .map_or(0, |root| root.depth);
        ExecutionSummary {
            executed: self.executed,
            pass_count: self.arena.passes.len(),
            node_count: self.arena.nodes.len().saturating_sub(1),
            critical_path_len,
            ignored_usages,
            write_hazards,
        }
    }
}
