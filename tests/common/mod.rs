//! Shared fixtures for the integration tests.
//!
//! Builds small host scenes and a [`RecordingHost`] that records everything
//! the render engine reports back to the host.

#![allow(dead_code)]

use std::cell::Cell;
use std::rc::Rc;
use std::sync::Arc;
use std::time::Duration;

use glam::{DMat4, DVec3};
use luxcore_bridge::backend::dummy::DummyRenderer;
use luxcore_bridge::backend::RenderSession;
use luxcore_bridge::resources::ImageCache;
use luxcore_bridge::scene::{
    AreaLamp, CameraData, Lamp, LampKind, Object, ObjectData, PointLamp, Scene, SunLamp,
    SunType, ViewContext, World, WorldBackground,
};
use luxcore_bridge::{BridgeConfig, EngineResult, FrameBuffer, RenderEngine, RenderHost, Severity};

/// Install a test logger; repeated calls are harmless.
pub fn init_logging() {
    let _ = env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("debug"))
        .is_test(true)
        .try_init();
}

// ============================================================================
// Scenes
// ============================================================================

pub fn lamp(name: &str, kind: LampKind) -> Object {
    Object::new(name, ObjectData::Lamp(Lamp::new(kind)))
}

/// Camera looking down -Y from (0, 10, 0), a point lamp, a distant sun,
/// an area lamp and a constant world. Small resolution keeps films cheap.
pub fn test_scene() -> Scene {
    let mut scene = Scene::new("TestScene");
    scene.render.resolution_x = 64;
    scene.render.resolution_y = 36;

    let camera_matrix = DMat4::look_at_rh(DVec3::new(0.0, 10.0, 0.0), DVec3::ZERO, DVec3::Z)
        .inverse();
    scene
        .add_object(
            Object::new("Camera", ObjectData::Camera(CameraData::perspective(50.0)))
                .with_matrix(camera_matrix),
        )
        .add_object(
            lamp("Point", LampKind::Point(PointLamp::default()))
                .with_matrix(DMat4::from_translation(DVec3::new(1.0, 2.0, 3.0))),
        )
        .add_object(lamp(
            "Sun",
            LampKind::Sun(SunLamp {
                sun_type: SunType::Distant,
                theta: 0.5,
                ..Default::default()
            }),
        ))
        .add_object(lamp("Panel", LampKind::Area(AreaLamp::default())));
    scene.camera = Some("Camera".to_string());
    scene.world = Some(World::new("World", WorldBackground::Constant));
    scene
}

/// Config without sleeping in the final render loop
pub fn fast_config() -> BridgeConfig {
    BridgeConfig::default()
        .with_poll_interval(Duration::ZERO)
        .with_refresh_interval(Duration::ZERO)
}

pub fn viewport() -> ViewContext {
    ViewContext::new(64, 48)
}

pub fn engine(renderer: &Arc<DummyRenderer>) -> RenderEngine {
    RenderEngine::new(renderer.clone(), Arc::new(ImageCache::open()), fast_config())
}

// ============================================================================
// Host
// ============================================================================

/// Frame buffer counting the calls it receives
pub struct CountingBuffer {
    updates: Rc<Cell<usize>>,
    draws: Rc<Cell<usize>>,
}

impl FrameBuffer for CountingBuffer {
    fn update(&mut self, session: &dyn RenderSession) -> EngineResult<()> {
        let _ = session.film();
        self.updates.set(self.updates.get() + 1);
        Ok(())
    }

    fn draw(&mut self, session: &dyn RenderSession) -> EngineResult<()> {
        let _ = session.film();
        self.draws.set(self.draws.get() + 1);
        Ok(())
    }
}

/// Host recording everything the engine reports
#[derive(Default)]
pub struct RecordingHost {
    pub stats: Vec<(String, String)>,
    pub reports: Vec<(Severity, String)>,
    pub errors: Vec<String>,
    pub error_log: Option<String>,
    pub redraws: usize,
    pub frame_buffers: usize,
    pub updates: Rc<Cell<usize>>,
    pub draws: Rc<Cell<usize>>,
    /// Ask for cancellation once `test_break` was polled this many times
    pub break_after: Option<usize>,
    pub break_polls: usize,
}

impl RecordingHost {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancelling_after(polls: usize) -> Self {
        Self {
            break_after: Some(polls),
            ..Self::default()
        }
    }

    pub fn last_stats(&self) -> Option<&(String, String)> {
        self.stats.last()
    }
}

impl RenderHost for RecordingHost {
    fn update_stats(&mut self, stats: &str, info: &str) {
        self.stats.push((stats.to_string(), info.to_string()));
    }

    fn report(&mut self, severity: Severity, message: &str) {
        self.reports.push((severity, message.to_string()));
    }

    fn error_set(&mut self, message: &str) {
        self.errors.push(message.to_string());
    }

    fn set_error_log(&mut self, message: &str) {
        self.error_log = Some(message.to_string());
    }

    fn test_break(&mut self) -> bool {
        self.break_polls += 1;
        self.break_after.is_some_and(|n| self.break_polls > n)
    }

    fn tag_redraw(&mut self) {
        self.redraws += 1;
    }

    fn create_frame_buffer(
        &mut self,
        _scene: &Scene,
        _context: Option<&ViewContext>,
    ) -> Box<dyn FrameBuffer> {
        self.frame_buffers += 1;
        Box::new(CountingBuffer {
            updates: self.updates.clone(),
            draws: self.draws.clone(),
        })
    }
}
