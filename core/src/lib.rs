//! # Ember Core
//!
//! Frame-scoped utilities shared by the Ember render graph: a bump arena
//! that is reset once per frame, and optional profiling hooks.

pub mod arena;
pub mod profiling;

/// Core library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
