//! # Ember Graphics
//!
//! Per-frame render graph for the Ember renderer.
//!
//! ## Overview
//!
//! This crate provides:
//! - [`RenderGraph`] - Declarative description of passes and the resources they touch
//! - [`GraphArena`] - Frame storage, reset once per frame
//! - [`compiler`] - Demand-driven dependency resolution with cycle detection
//! - [`executor`] - Post-order execution and the [`ExecutionSummary`]
//! - [`GraphObserver`] - Frame and pass lifecycle hooks
//!
//! ## Example
//!
//! ```
//! use ember_graphics::{Access, GraphArena, GraphConfig, PassKind, ResourceKey};
//!
//! let mut arena = GraphArena::new();
//! let mut graph = arena.begin_frame(GraphConfig::default().with_label("frame"));
//!
//! let shadow = ResourceKey::scope(1);
//! let color = ResourceKey::scope(2);
//!
//! graph.add_pass(PassKind::Graphics, "shadow").add_resource(shadow, Access::DEPTH_WRITE);
//! graph
//!     .add_pass(PassKind::Graphics, "forward")
//!     .add_resource(shadow, Access::DEPTH_READ)
//!     .add_resource(color, Access::RENDER_TARGET);
//! graph.add_pass(PassKind::Compute, "unused").add_resource(ResourceKey::scope(3), Access::WRITE);
//! graph.add_output(color);
//!
//! let summary = graph.execute().unwrap();
//! assert_eq!(summary.executed_count(), 2);
//! assert_eq!(summary.culled_count(), 1);
//! ```

pub mod compiler;
pub mod error;
pub mod executor;
pub mod graph;
pub mod observer;

// Re-export main types for convenience
pub use error::GraphError;
pub use executor::ExecutionSummary;
pub use graph::{
    Access, AccessClass, GraphArena, GraphConfig, PassBuilder, PassHandle, PassKind, PassView,
    RenderGraph, ResourceHandle, ResourceKey, ResourceKind, ResourceView, Usage,
};
pub use observer::{FrameInfo, GraphObserver, PassLogger};

/// Graphics library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Initialize the graphics subsystem.
///
/// Logs the library version. Installing a logger is left to the application.
pub fn init() {
    log::info!("Ember Graphics v{} initialized", VERSION);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version() {
        assert!(!VERSION.is_empty());
    }

    #[test]
    fn test_render_graph_creation() {
        let mut arena = GraphArena::new();
        let graph = arena.begin_frame(GraphConfig::default());
        assert_eq!(graph.pass_count(), 0);
        assert_eq!(graph.output_count(), 0);
    }

    #[test]
    fn test_init() {
        init();
    }
}
