//! Render graph infrastructure.
//!
//! A [`RenderGraph`] is rebuilt every frame. Passes declare which resources
//! they read and write; the frame's outputs are then named and
//! [`RenderGraph::execute`] runs exactly the passes those outputs need,
//! every producer before its consumers.
//!
//! # Architecture
//!
//! | Layer | Type | Purpose |
//! |-------|------|---------|
//! | Storage | [`GraphArena`] | Frame memory, reset once per frame |
//! | **Graph** | [`RenderGraph`] | Pass and resource declarations (this module) |
//! | Build | [`compiler`](crate::compiler) | Demand-driven dependency resolution |
//! | Run | [`executor`](crate::executor) | Post-order pass execution |
//!
//! # Example
//!
//! ```
//! use ember_graphics::{Access, GraphArena, GraphConfig, PassKind, ResourceKey};
//!
//! let mut arena = GraphArena::new();
//! let mut graph = arena.begin_frame(GraphConfig::default());
//!
//! let gbuffer = ResourceKey::scope(1);
//! let color = ResourceKey::scope(2);
//!
//! graph
//!     .add_pass(PassKind::Graphics, "geometry")
//!     .add_resource(gbuffer, Access::RENDER_TARGET)
//!     .set_callback(|| {})
//!     .unwrap();
//! graph
//!     .add_pass(PassKind::Graphics, "lighting")
//!     .add_resource(gbuffer, Access::SHADER_READ)
//!     .add_resource(color, Access::RENDER_TARGET)
//!     .set_callback(|| {})
//!     .unwrap();
//! graph.add_output(color);
//!
//! let summary = graph.execute().unwrap();
//! assert_eq!(summary.executed_count(), 2);
//! ```

mod access;
mod arena;
mod config;
pub(crate) mod node;
mod pass;
mod resource;

use std::borrow::Cow;

pub use access::{Access, AccessClass};
pub use arena::GraphArena;
pub use config::GraphConfig;
pub use pass::{Pass, PassCallback, PassHandle, PassKind, PassView, Usage};
pub use resource::{Resource, ResourceHandle, ResourceKey, ResourceKind, ResourceView};

pub(crate) use pass::BuildState;

use crate::error::GraphError;
use crate::executor::{ExecutionSummary, Executor};
use crate::observer::{FrameInfo, GraphObserver};
use ember_core::{frame_mark, profile_scope};

/// One frame's render graph.
///
/// The graph borrows a [`GraphArena`] for all of its storage and is consumed
/// by [`execute`](Self::execute). Handles it returns are valid until the
/// arena is reset.
pub struct RenderGraph<'a> {
    arena: &'a mut GraphArena,
    config: GraphConfig,
    observers: Vec<&'a mut dyn GraphObserver>,
    ignored_usages: u32,
    write_hazards: u32,
}

impl<'a> RenderGraph<'a> {
    /// Start a graph on an arena that has been reset since its last frame.
    ///
    /// Fails with [`GraphError::ArenaNotReset`] if the arena still holds a
    /// previous frame.
    pub fn new(arena: &'a mut GraphArena, config: GraphConfig) -> Result<Self, GraphError> {
        if !arena.is_reset() {
            return Err(GraphError::ArenaNotReset {
                generation: arena.generation(),
                passes: arena.pass_count(),
            });
        }
        Ok(Self::from_reset(arena, config))
    }

    pub(crate) fn from_reset(arena: &'a mut GraphArena, config: GraphConfig) -> Self {
        arena.claim();
        Self {
            arena,
            config,
            observers: Vec::new(),
            ignored_usages: 0,
            write_hazards: 0,
        }
    }

    /// Settings this graph was created with.
    pub fn config(&self) -> &GraphConfig {
        &self.config
    }

    /// Generation of the arena this graph lives in.
    pub fn generation(&self) -> u32 {
        self.arena.generation()
    }

    /// Register an observer notified around the frame and every executed pass.
    ///
    /// Observers are called in registration order.
    pub fn add_observer(&mut self, observer: &'a mut dyn GraphObserver) {
        self.observers.push(observer);
    }

    // ------------------------------------------------------------------
    // Declaration
    // ------------------------------------------------------------------

    /// Add a pass and return a builder for declaring its usages.
    pub fn add_pass(
        &mut self,
        kind: PassKind,
        name: impl Into<Cow<'static, str>>,
    ) -> PassBuilder<'_, 'a> {
        let handle = PassHandle(self.arena.passes.alloc(Pass::new(kind, name.into())));
        PassBuilder {
            graph: self,
            handle,
        }
    }

    /// Declare that `pass` accesses the resource identified by `key`.
    ///
    /// The first declaration of a key creates its resource. A usage whose
    /// access has neither read nor write bits is recorded on the pass but
    /// creates no dependency.
    pub fn add_resource(
        &mut self,
        pass: PassHandle,
        key: ResourceKey,
        access: Access,
    ) -> Result<(), GraphError> {
        if !self.arena.passes.contains(pass.0) {
            return Err(stale_pass(pass));
        }
        let resource = self.find_resource(key);
        let arena = &mut *self.arena;

        if let Some(entry) = arena.passes.get_mut(pass.0) {
            entry.record_usage(
                &mut arena.usages,
                Usage {
                    resource,
                    key,
                    access,
                },
            );
        }
        let Some(tracked) = arena.resources.get_mut(resource.0) else {
            return Err(stale_resource(resource));
        };

        let Some(class) = access.class() else {
            self.ignored_usages += 1;
            if self.config.warn_on_empty_access {
                log::warn!(
                    "Pass '{}' declared {:?} without read or write access; usage ignored",
                    arena.pass_name(pass),
                    key
                );
            }
            return Ok(());
        };

        if class.reads() {
            tracked.note_read();
        }
        let hazard = if class.writes() {
            tracked.note_write(pass)
        } else {
            None
        };
        match class {
            AccessClass::Read => tracked.add_reader(&mut arena.pass_links, pass),
            AccessClass::Write => tracked.add_writer(&mut arena.pass_links, pass),
            AccessClass::ReadWrite => tracked.add_read_writer(&mut arena.pass_links, pass),
        }

        if let Some(previous) = hazard {
            self.write_hazards += 1;
            if self.config.warn_on_write_hazards {
                log::warn!(
                    "Pass '{}' overwrites {:?} written by '{}' before anything read it",
                    arena.pass_name(pass),
                    key,
                    arena.pass_name(previous)
                );
            }
        }
        Ok(())
    }

    /// Make `dependent` run after `dependency` regardless of resources.
    ///
    /// Declaring the same edge twice has no further effect.
    pub fn add_dependency(
        &mut self,
        dependent: PassHandle,
        dependency: PassHandle,
    ) -> Result<(), GraphError> {
        if !self.arena.passes.contains(dependency.0) {
            return Err(stale_pass(dependency));
        }
        let arena = &mut *self.arena;
        let Some(entry) = arena.passes.get_mut(dependent.0) else {
            return Err(stale_pass(dependent));
        };
        if dependent == dependency {
            return Err(GraphError::SelfDependency {
                pass: entry.name().to_owned(),
            });
        }
        if !arena.pass_links.contains(entry.dependencies(), &dependency) {
            entry.add_dependency(&mut arena.pass_links, dependency);
        }
        Ok(())
    }

    /// Attach the work `pass` performs when executed.
    ///
    /// A pass takes exactly one callback. A second call fails with
    /// [`GraphError::CallbackAlreadySet`] and keeps the first one.
    pub fn set_callback<F>(&mut self, pass: PassHandle, callback: F) -> Result<(), GraphError>
    where
        F: FnOnce() + 'static,
    {
        let entry = self
            .arena
            .passes
            .get_mut(pass.0)
            .ok_or_else(|| stale_pass(pass))?;
        entry
            .set_callback(Box::new(callback))
            .map_err(|_| GraphError::CallbackAlreadySet {
                pass: entry.name().to_owned(),
            })
    }

    /// Get the resource for `key`, creating it if this frame has not seen it.
    pub fn find_resource(&mut self, key: ResourceKey) -> ResourceHandle {
        let arena = &mut *self.arena;
        *arena
            .resource_map
            .entry(key)
            .or_insert_with(|| ResourceHandle(arena.resources.alloc(Resource::new(key))))
    }

    /// Look up the resource for `key` without creating it.
    pub fn lookup_resource(&self, key: ResourceKey) -> Option<ResourceHandle> {
        self.arena.resource_map.get(&key).copied()
    }

    /// Name `key` as a result the frame must produce.
    ///
    /// Declaring the same output twice has no further effect.
    pub fn add_output(&mut self, key: ResourceKey) -> ResourceHandle {
        let handle = self.find_resource(key);
        if let Some(resource) = self.arena.resources.get_mut(handle.0) {
            if resource.mark_output() {
                self.arena.outputs.push(handle);
            }
        }
        handle
    }

    // ------------------------------------------------------------------
    // Inspection
    // ------------------------------------------------------------------

    /// Get a view of a pass.
    pub fn pass(&self, handle: PassHandle) -> Option<PassView<'_>> {
        let arena = &*self.arena;
        arena.passes.get(handle.0).map(|pass| PassView {
            handle,
            pass,
            usages: &arena.usages,
            links: &arena.pass_links,
        })
    }

    /// Get a view of a resource.
    pub fn resource(&self, handle: ResourceHandle) -> Option<ResourceView<'_>> {
        let arena = &*self.arena;
        arena.resources.get(handle.0).map(|resource| ResourceView {
            resource,
            links: &arena.pass_links,
        })
    }

    /// Iterate over all passes in registration order.
    pub fn passes(&self) -> impl Iterator<Item = PassView<'_>> {
        let arena = &*self.arena;
        arena.passes.iter().map(move |(idx, pass)| PassView {
            handle: PassHandle(idx),
            pass,
            usages: &arena.usages,
            links: &arena.pass_links,
        })
    }

    /// Resources declared as outputs, in declaration order.
    pub fn outputs(&self) -> &[ResourceHandle] {
        &self.arena.outputs
    }

    /// Get the number of passes in the graph.
    pub fn pass_count(&self) -> usize {
        self.arena.passes.len()
    }

    /// Get the number of distinct resources in the graph.
    pub fn resource_count(&self) -> usize {
        self.arena.resources.len()
    }

    /// Get the number of declared outputs.
    pub fn output_count(&self) -> usize {
        self.arena.outputs.len()
    }

    // ------------------------------------------------------------------
    // Execution
    // ------------------------------------------------------------------

    /// Resolve dependencies and run every pass the outputs need.
    ///
    /// Each contributing pass runs exactly once, after all of its producers.
    /// Passes that feed no output are culled. If dependency resolution finds
    /// a cycle, nothing runs.
    pub fn execute(self) -> Result<ExecutionSummary, GraphError> {
        profile_scope!("render_graph_execute");

        let RenderGraph {
            arena,
            config,
            mut observers,
            ignored_usages,
            write_hazards,
        } = self;
        let label = config.label.as_deref().unwrap_or("frame");

        let root = match crate::compiler::build(arena) {
            Ok(root) => root,
            Err(err) => {
                log::error!("Render graph '{}' failed to build: {}", label, err);
                return Err(err);
            }
        };

        let info = FrameInfo {
            label: config.label.as_deref(),
            generation: arena.generation(),
            pass_count: arena.passes.len(),
            output_count: arena.outputs.len(),
            node_count: arena.nodes.len().saturating_sub(1),
        };
        for observer in observers.iter_mut() {
            observer.on_frame_begin(&info);
        }

        let mut executor = Executor::new(arena, &mut observers);
        executor.run(root);
        let summary = executor.finish(ignored_usages, write_hazards);

        for observer in observers.iter_mut() {
            observer.on_frame_end(&summary);
        }

        log::debug!(
            "Render graph '{}': executed {} of {} passes ({} culled, critical path {})",
            label,
            summary.executed_count(),
            summary.pass_count(),
            summary.culled_count(),
            summary.critical_path_len()
        );
        frame_mark!();
        Ok(summary)
    }
}

impl std::fmt::Debug for RenderGraph<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RenderGraph")
            .field("config", &self.config)
            .field("passes", &self.pass_count())
            .field("resources", &self.resource_count())
            .field("outputs", &self.output_count())
            .field("observers", &self.observers.len())
            .finish()
    }
}

/// Builder returned by [`RenderGraph::add_pass`].
///
/// Usage and dependency declarations chain. Invalid declarations are logged
/// and skipped; use the [`RenderGraph`] methods directly to handle them.
pub struct PassBuilder<'g, 'a> {
    graph: &'g mut RenderGraph<'a>,
    handle: PassHandle,
}

impl PassBuilder<'_, '_> {
    /// Handle of the pass being built.
    pub fn handle(&self) -> PassHandle {
        self.handle
    }

    /// Declare a resource usage.
    pub fn add_resource(&mut self, key: ResourceKey, access: Access) -> &mut Self {
        if let Err(err) = self.graph.add_resource(self.handle, key, access) {
            log::warn!("{}", err);
        }
        self
    }

    /// Declare a read-only usage.
    pub fn read(&mut self, key: ResourceKey) -> &mut Self {
        self.add_resource(key, Access::READ)
    }

    /// Declare a write-only usage.
    pub fn write(&mut self, key: ResourceKey) -> &mut Self {
        self.add_resource(key, Access::WRITE)
    }

    /// Declare a read-modify-write usage.
    pub fn read_write(&mut self, key: ResourceKey) -> &mut Self {
        self.add_resource(key, Access::READ_WRITE)
    }

    /// Run this pass after `dependency`.
    pub fn add_dependency(&mut self, dependency: PassHandle) -> &mut Self {
        if let Err(err) = self.graph.add_dependency(self.handle, dependency) {
            log::warn!("{}", err);
        }
        self
    }

    /// Attach the pass callback. See [`RenderGraph::set_callback`].
    pub fn set_callback<F>(&mut self, callback: F) -> Result<&mut Self, GraphError>
    where
        F: FnOnce() + 'static,
    {
        self.graph.set_callback(self.handle, callback)?;
        Ok(self)
    }
}

fn stale_pass(pass: PassHandle) -> GraphError {
    GraphError::StaleHandle {
        kind: "pass",
        index: pass.0.index(),
        generation: pass.0.generation(),
    }
}

fn stale_resource(resource: ResourceHandle) -> GraphError {
    GraphError::StaleHandle {
        kind: "resource",
        index: resource.0.index(),
        generation: resource.0.generation(),
    }
}
