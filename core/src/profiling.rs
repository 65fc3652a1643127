//! Optional Tracy instrumentation.
//!
//! With the `profiling` feature enabled the macros below open Tracy spans and
//! mark frames. Without it they expand to nothing, so call sites can stay in
//! hot paths such as graph construction and pass execution.
//!
//! ```ignore
//! use ember_core::profiling::{frame_mark, profile_scope};
//!
//! fn build_frame() {
//!     profile_scope!("build_frame");
//!     // ...
//!     frame_mark!();
//! }
//! ```

#[cfg(feature = "profiling")]
pub use tracy_client::{self, Client, Span, frame_mark as tracy_frame_mark, span};

/// Open a span that lasts until the end of the enclosing scope.
#[macro_export]
#[cfg(feature = "profiling")]
macro_rules! profile_scope {
    ($name:expr) => {
        let _profile_span = $crate::profiling::span!($name);
    };
}

/// Open a span (no-op when profiling disabled).
#[macro_export]
#[cfg(not(feature = "profiling"))]
macro_rules! profile_scope {
    ($name:expr) => {};
}

/// Open a span named after the enclosing function.
#[macro_export]
#[cfg(feature = "profiling")]
macro_rules! profile_function {
    () => {
        let _profile_span = $crate::profiling::span!();
    };
}

/// Function span (no-op when profiling disabled).
#[macro_export]
#[cfg(not(feature = "profiling"))]
macro_rules! profile_function {
    () => {};
}

/// Mark the end of a frame.
#[macro_export]
#[cfg(feature = "profiling")]
macro_rules! frame_mark {
    () => {
        $crate::profiling::tracy_frame_mark()
    };
}

/// Frame mark (no-op when profiling disabled).
#[macro_export]
#[cfg(not(feature = "profiling"))]
macro_rules! frame_mark {
    () => {};
}

pub use frame_mark;
pub use profile_function;
pub use profile_scope;
