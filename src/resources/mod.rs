//! Resource management
//!
//! Handles image datablocks and their materialization for the renderer.

mod image;

pub use self::image::*;
