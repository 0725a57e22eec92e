//! Renderer abstraction layer
//!
//! Provides the traits the exporter and engine drive the rendering engine
//! through, plus an in-memory dummy renderer.

pub mod traits;
pub mod types;

#[cfg(any(test, feature = "dummy"))]
pub mod dummy;

pub use traits::*;
pub use types::*;
