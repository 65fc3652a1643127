//! Common utilities for render graph integration tests.
//!
//! Passes record their names into a shared [`ExecutionLog`] so tests can
//! assert on the exact order callbacks ran in.

#![allow(dead_code)]

use std::cell::RefCell;
use std::rc::Rc;
use std::sync::Arc;

use ember_graphics::{Access, PassHandle, PassKind, RenderGraph, ResourceKey};

/// Shared record of executed pass callbacks.
#[derive(Debug, Clone, Default)]
pub struct ExecutionLog(Rc<RefCell<Vec<&'static str>>>);

impl ExecutionLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Callback that appends `name` when invoked.
    pub fn recorder(&self, name: &'static str) -> impl FnOnce() + 'static {
        let log = Rc::clone(&self.0);
        move || log.borrow_mut().push(name)
    }

    /// Names in execution order.
    pub fn order(&self) -> Vec<&'static str> {
        self.0.borrow().clone()
    }

    /// How many times `name` ran.
    pub fn count(&self, name: &str) -> usize {
        self.0.borrow().iter().filter(|n| **n == name).count()
    }

    /// Position of the first run of `name`.
    pub fn position(&self, name: &str) -> Option<usize> {
        self.0.borrow().iter().position(|n| *n == name)
    }
}

// ============================================================================
// Stand-in GPU objects
// ============================================================================

/// Stand-in for a device texture; only its address matters to the graph.
#[derive(Debug)]
pub struct FakeTexture {
    pub label: &'static str,
}

/// Stand-in for a device buffer.
#[derive(Debug)]
pub struct FakeBuffer {
    pub size: u64,
}

pub fn texture(label: &'static str) -> Arc<FakeTexture> {
    Arc::new(FakeTexture { label })
}

pub fn buffer(size: u64) -> Arc<FakeBuffer> {
    Arc::new(FakeBuffer { size })
}

// ============================================================================
// Graph helpers
// ============================================================================

/// Install a test logger once per process.
pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// Add a pass with `usages` whose callback records `name` into `log`.
pub fn add_recorded_pass(
    graph: &mut RenderGraph<'_>,
    log: &ExecutionLog,
    kind: PassKind,
    name: &'static str,
    usages: &[(ResourceKey, Access)],
) -> PassHandle {
    let mut pass = graph.add_pass(kind, name);
    for &(key, access) in usages {
        pass.add_resource(key, access);
    }
    pass.set_callback(log.recorder(name))
        .expect("fresh pass has no callback");
    pass.handle()
}
