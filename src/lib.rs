//! LuxCore Bridge - scene export and render-session coordination for a host 3D application
//!
//! The bridge sits between a host scene graph and the LuxCore renderer:
//! - **Export**: cameras, lamps and the world become flat renderer property sets
//! - **Sessions**: one live render session per engine, rebuilt or edited in place as the scene changes
//! - **Resources**: generated and packed images are materialized to temporary files
//!
//! # Features
//! - Final, preview and interactive viewport render modes
//! - Per-entity error containment with collected diagnostics
//! - Snapshot based change detection for the viewport
//! - In-memory dummy renderer (`dummy` feature) for tests and headless runs

pub mod backend;
pub mod display;
pub mod engine;
pub mod error;
pub mod export;
pub mod math;
pub mod names;
pub mod properties;
pub mod resources;
pub mod scene;

pub use display::{FilmBuffer, FrameBuffer};
pub use engine::{halt_condition_met, EngineState, RenderEngine, RenderHost, Severity};
pub use error::{EngineError, EngineResult, ExportError, ExportResult};
pub use export::{Change, Exporter, RenderMode};
pub use properties::{Property, PropertySet, PropertyValue};
pub use resources::ImageCache;

use std::time::Duration;

/// Configuration of the render engine.
#[derive(Debug, Clone)]
pub struct BridgeConfig {
    /// Sleep between cancellation checks of a final render.
    pub poll_interval: Duration,
    /// How often a final render pulls stats, checks halt conditions and redraws.
    pub refresh_interval: Duration,
    /// Render engine type for final renders.
    pub final_engine: String,
    /// Render engine type for the interactive viewport.
    pub viewport_engine: String,
    /// Render engine type for material previews.
    pub preview_engine: String,
    /// Samples per pixel after which the viewport stops refining.
    pub viewport_halt_samples: Option<u64>,
    /// Samples per pixel of a material preview.
    pub preview_halt_samples: Option<u64>,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_millis(20),
            refresh_interval: Duration::from_secs(3),
            final_engine: "PATHCPU".to_string(),
            viewport_engine: "RTPATHCPU".to_string(),
            preview_engine: "PATHCPU".to_string(),
            viewport_halt_samples: None,
            preview_halt_samples: Some(32),
        }
    }
}

impl BridgeConfig {
    pub fn with_poll_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = poll_interval;
        self
    }

    pub fn with_refresh_interval(mut self, refresh_interval: Duration) -> Self {
        self.refresh_interval = refresh_interval;
        self
    }

    pub fn with_final_engine(mut self, engine: impl Into<String>) -> Self {
        self.final_engine = engine.into();
        self
    }

    pub fn with_viewport_engine(mut self, engine: impl Into<String>) -> Self {
        self.viewport_engine = engine.into();
        self
    }

    pub fn with_preview_engine(mut self, engine: impl Into<String>) -> Self {
        self.preview_engine = engine.into();
        self
    }

    pub fn with_viewport_halt_samples(mut self, samples: Option<u64>) -> Self {
        self.viewport_halt_samples = samples;
        self
    }

    pub fn with_preview_halt_samples(mut self, samples: Option<u64>) -> Self {
        self.preview_halt_samples = samples;
        self
    }
}
