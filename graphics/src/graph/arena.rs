//! Frame storage shared by every render graph built on it.

use std::collections::HashMap;

use ember_core::arena::{Arena, FrameReset, ListArena};

use super::config::GraphConfig;
use super::node::{Node, NodeId};
use super::pass::{Pass, PassHandle, Usage};
use super::resource::{Resource, ResourceHandle, ResourceKey};
use super::RenderGraph;

const DEFAULT_PASS_CAPACITY: usize = 64;
const DEFAULT_RESOURCE_CAPACITY: usize = 64;

/// Backing storage for one frame's passes, resources and nodes.
///
/// The arena is owned by the renderer and outlives every graph built on it.
/// Graph objects are appended while the frame is recorded and released in
/// bulk by [`GraphArena::reset`], which keeps the allocations for the next
/// frame. Handles from a previous frame never resolve after a reset.
///
/// # Example
///
/// ```
/// use ember_graphics::{Access, GraphArena, GraphConfig, PassKind, ResourceKey};
///
/// let mut arena = GraphArena::new();
/// for _ in 0..2 {
///     let mut graph = arena.begin_frame(GraphConfig::default());
///     let color = ResourceKey::scope(1);
///     graph.add_pass(PassKind::Graphics, "main").add_resource(color, Access::WRITE);
///     graph.add_output(color);
///     graph.execute().unwrap();
/// }
/// ```
pub struct GraphArena {
    pub(crate) passes: Arena<Pass>,
    pub(crate) resources: Arena<Resource>,
    pub(crate) nodes: Arena<Node>,
    pub(crate) pass_links: ListArena<PassHandle>,
    pub(crate) node_links: ListArena<NodeId>,
    pub(crate) usages: ListArena<Usage>,
    pub(crate) resource_map: HashMap<ResourceKey, ResourceHandle>,
    pub(crate) outputs: Vec<ResourceHandle>,
    /// Passes currently on the construction stack, innermost last.
    pub(crate) visiting: Vec<PassHandle>,
    in_use: bool,
}

impl GraphArena {
    /// Create an arena sized for a typical frame.
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_PASS_CAPACITY, DEFAULT_RESOURCE_CAPACITY)
    }

    /// Create an arena with room for `passes` passes and `resources` resources.
    pub fn with_capacity(passes: usize, resources: usize) -> Self {
        Self {
            passes: Arena::with_capacity(passes),
            resources: Arena::with_capacity(resources),
            nodes: Arena::with_capacity(passes + 1),
            pass_links: ListArena::with_capacity(resources * 2),
            node_links: ListArena::with_capacity(passes * 4),
            usages: ListArena::with_capacity(passes * 2),
            resource_map: HashMap::with_capacity(resources),
            outputs: Vec::with_capacity(4),
            visiting: Vec::with_capacity(16),
            in_use: false,
        }
    }

    /// Generation of the current frame. Advances on every reset.
    pub fn generation(&self) -> u32 {
        self.passes.generation()
    }

    /// Check whether a new graph can be built without resetting first.
    pub fn is_reset(&self) -> bool {
        !self.in_use
    }

    /// Number of passes recorded in the current frame.
    pub fn pass_count(&self) -> usize {
        self.passes.len()
    }

    /// Number of distinct resources tracked in the current frame.
    pub fn resource_count(&self) -> usize {
        self.resources.len()
    }

    /// Reset the arena and start recording a new frame.
    pub fn begin_frame(&mut self, config: GraphConfig) -> RenderGraph<'_> {
        self.reset();
        RenderGraph::from_reset(self, config)
    }

    pub(crate) fn claim(&mut self) {
        self.in_use = true;
    }

    pub(crate) fn pass_name(&self, pass: PassHandle) -> &str {
        self.passes.get(pass.0).map_or("<stale>", Pass::name)
    }
}

impl Default for GraphArena {
    fn default() -> Self {
        Self::new()
    }
}

impl FrameReset for GraphArena {
    fn reset(&mut self) {
        // Passes own their callbacks; unexecuted ones are dropped here.
        self.passes.reset();
        self.resources.reset();
        self.nodes.reset();
        self.pass_links.reset();
        self.node_links.reset();
        self.usages.reset();
        self.resource_map.clear();
        self.outputs.clear();
        self.visiting.clear();
        self.in_use = false;
    }
}

impl GraphArena {
    /// Release everything recorded for the current frame.
    ///
    /// Call once per frame, before the next frame's graph is built.
    pub fn reset(&mut self) {
        FrameReset::reset(self);
    }
}

impl std::fmt::Debug for GraphArena {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GraphArena")
            .field("generation", &self.generation())
            .field("passes", &self.passes.len())
            .field("resources", &self.resources.len())
            .field("nodes", &self.nodes.len())
            .field("in_use", &self.in_use)
            .finish()
    }
}
