//! Pass declarations.

use std::borrow::Cow;
use std::fmt;

use ember_core::arena::{Idx, List, ListArena};

use super::access::Access;
use super::node::NodeId;
use super::resource::{ResourceHandle, ResourceKey};

/// Work recorded by a pass when the graph executes it.
pub type PassCallback = Box<dyn FnOnce()>;

/// Category of GPU work a pass performs.
///
/// Classification only; the scheduler treats every kind the same way.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PassKind {
    /// Graphics pass (vertex/fragment shaders, rasterization).
    Graphics,
    /// Compute pass (compute shaders).
    Compute,
    /// Transfer pass (copy operations).
    Transfer,
}

/// Handle to a pass in the render graph.
///
/// `PassHandle` is `Copy` and cheap to pass around. It is only valid within
/// the frame that created it; handles order by registration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PassHandle(pub(crate) Idx<Pass>);

impl PassHandle {
    /// Registration order of the pass within its frame.
    pub fn index(self) -> usize {
        self.0.index()
    }
}

static_assertions::assert_impl_all!(PassHandle: Copy, Send, Sync);

/// One resource usage declared by a pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Usage {
    /// Tracked resource.
    pub resource: ResourceHandle,
    /// Identity of the underlying GPU object.
    pub key: ResourceKey,
    /// Declared access.
    pub access: Access,
}

/// Progress of dependency construction for one pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum BuildState {
    Unvisited,
    /// On the construction stack; reaching it again means a cycle.
    Visiting,
    Built(NodeId),
}

/// A declared unit of GPU work and its resource contract.
pub struct Pass {
    name: Cow<'static, str>,
    kind: PassKind,
    usages: List<Usage>,
    dependencies: List<PassHandle>,
    callback: Option<PassCallback>,
    state: BuildState,
}

impl Pass {
    pub(crate) fn new(kind: PassKind, name: Cow<'static, str>) -> Self {
        Self {
            name,
            kind,
            usages: List::new(),
            dependencies: List::new(),
            callback: None,
            state: BuildState::Unvisited,
        }
    }

    /// Diagnostic name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Category of work.
    pub fn kind(&self) -> PassKind {
        self.kind
    }

    /// Check if an execution callback has been set.
    pub fn has_callback(&self) -> bool {
        self.callback.is_some()
    }

    pub(crate) fn usages(&self) -> &List<Usage> {
        &self.usages
    }

    pub(crate) fn dependencies(&self) -> &List<PassHandle> {
        &self.dependencies
    }

    pub(crate) fn record_usage(&mut self, usages: &mut ListArena<Usage>, usage: Usage) {
        usages.push(&mut self.usages, usage);
    }

    pub(crate) fn add_dependency(&mut self, links: &mut ListArena<PassHandle>, dependency: PassHandle) {
        links.push(&mut self.dependencies, dependency);
    }

    /// Store the callback unless one is already present.
    ///
    /// On conflict the new callback is handed back and the first one stays.
    pub(crate) fn set_callback(&mut self, callback: PassCallback) -> Result<(), PassCallback> {
        if self.callback.is_some() {
            return Err(callback);
        }
        self.callback = Some(callback);
        Ok(())
    }

    pub(crate) fn take_callback(&mut self) -> Option<PassCallback> {
        self.callback.take()
    }

    pub(crate) fn state(&self) -> BuildState {
        self.state
    }

    pub(crate) fn set_state(&mut self, state: BuildState) {
        self.state = state;
    }
}

impl fmt::Debug for Pass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Pass")
            .field("name", &self.name)
            .field("kind", &self.kind)
            .field("usages", &self.usages.len())
            .field("dependencies", &self.dependencies.len())
            .field("has_callback", &self.callback.is_some())
            .finish()
    }
}

/// Read-only view of a [`Pass`] with its declared usages.
///
/// Handed to [`GraphObserver`](crate::observer::GraphObserver)s around pass
/// execution so a device layer can derive barriers from the declarations.
#[derive(Clone, Copy)]
pub struct PassView<'g> {
    pub(crate) handle: PassHandle,
    pub(crate) pass: &'g Pass,
    pub(crate) usages: &'g ListArena<Usage>,
    pub(crate) links: &'g ListArena<PassHandle>,
}

impl<'g> PassView<'g> {
    /// Handle of the pass.
    pub fn handle(&self) -> PassHandle {
        self.handle
    }

    /// Diagnostic name.
    pub fn name(&self) -> &'g str {
        &self.pass.name
    }

    /// Category of work.
    pub fn kind(&self) -> PassKind {
        self.pass.kind
    }

    /// Check if an execution callback is still attached.
    pub fn has_callback(&self) -> bool {
        self.pass.has_callback()
    }

    /// Declared resource usages, in declaration order.
    pub fn usages(&self) -> impl Iterator<Item = Usage> + 'g {
        self.usages.iter(&self.pass.usages).copied()
    }

    /// Explicit pass dependencies, in declaration order.
    pub fn dependencies(&self) -> impl Iterator<Item = PassHandle> + 'g {
        self.links.iter(&self.pass.dependencies).copied()
    }
}

impl fmt::Debug for PassView<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PassView")
            .field("handle", &self.handle)
            .field("name", &self.pass.name)
            .field("kind", &self.pass.kind)
            .finish()
    }
}
