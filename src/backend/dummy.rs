//! Dummy renderer for testing and development.
//!
//! This renderer doesn't render anything but implements the full session
//! protocol in memory and records every call, so exporter and engine
//! behavior can be observed without the real rendering engine.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;

use super::{
    BackendError, BackendResult, FilmData, MeshDefinition, RenderSession, RenderStats, Renderer,
    RendererScene, SessionId,
};
use crate::properties::PropertySet;

/// A renderer call observed by the dummy renderer.
#[derive(Debug, Clone, PartialEq)]
pub enum DummyEvent {
    IsMeshDefined { name: String, defined: bool },
    DefineMesh(String),
    Parse { count: usize },
    DeleteObject(String),
    DeleteLight(String),
    CreateSession(SessionId),
    Start(SessionId),
    Stop(SessionId),
    UpdateStats(SessionId),
    WaitNewFrame(SessionId),
    BeginSceneEdit(SessionId),
    EndSceneEdit(SessionId),
}

/// Shared, inspectable call log.
#[derive(Debug, Clone, Default)]
pub struct DummyLog(Arc<Mutex<Vec<DummyEvent>>>);

impl DummyLog {
    fn push(&self, event: DummyEvent) {
        log::trace!("DummyRenderer: {:?}", event);
        self.0.lock().push(event);
    }

    pub fn events(&self) -> Vec<DummyEvent> {
        self.0.lock().clone()
    }

    pub fn count(&self, pred: impl Fn(&DummyEvent) -> bool) -> usize {
        self.0.lock().iter().filter(|e| pred(e)).count()
    }

    pub fn clear(&self) {
        self.0.lock().clear();
    }
}

/// Dummy renderer scene.
#[derive(Debug)]
pub struct DummyScene {
    meshes: HashMap<String, MeshDefinition>,
    props: PropertySet,
    log: DummyLog,
}

impl DummyScene {
    pub fn new(log: DummyLog) -> Self {
        Self {
            meshes: HashMap::new(),
            props: PropertySet::new(),
            log,
        }
    }

    pub fn mesh(&self, name: &str) -> Option<&MeshDefinition> {
        self.meshes.get(name)
    }
}

impl RendererScene for DummyScene {
    fn is_mesh_defined(&self, name: &str) -> bool {
        let defined = self.meshes.contains_key(name);
        self.log.push(DummyEvent::IsMeshDefined {
            name: name.to_string(),
            defined,
        });
        defined
    }

    fn define_mesh(&mut self, mesh: MeshDefinition) -> BackendResult<()> {
        if mesh.faces.iter().flatten().any(|&i| i as usize >= mesh.vertices.len()) {
            return Err(BackendError::MeshDefinitionFailed(mesh.name));
        }
        self.log.push(DummyEvent::DefineMesh(mesh.name.clone()));
        self.meshes.insert(mesh.name.clone(), mesh);
        Ok(())
    }

    fn parse(&mut self, props: &PropertySet) -> BackendResult<()> {
        self.log.push(DummyEvent::Parse { count: props.len() });
        self.props.set_all(props);
        Ok(())
    }

    fn delete_object(&mut self, name: &str) {
        self.log.push(DummyEvent::DeleteObject(name.to_string()));
        self.props.delete_all(&format!("scene.objects.{name}."));
    }

    fn delete_light(&mut self, name: &str) {
        self.log.push(DummyEvent::DeleteLight(name.to_string()));
        self.props.delete_all(&format!("scene.lights.{name}."));
    }

    fn properties(&self) -> &PropertySet {
        &self.props
    }
}

/// Dummy render session.
///
/// Every stats update advances the pass count by a fixed amount and the
/// elapsed time by one second, which keeps halt conditions deterministic.
pub struct DummySession {
    id: SessionId,
    scene: Box<dyn RendererScene>,
    config: PropertySet,
    started: bool,
    editing: bool,
    stats: RenderStats,
    pass_per_update: u64,
    log: DummyLog,
}

impl DummySession {
    pub fn config(&self) -> &PropertySet {
        &self.config
    }
}

impl RenderSession for DummySession {
    fn id(&self) -> SessionId {
        self.id
    }

    fn start(&mut self) -> BackendResult<()> {
        self.log.push(DummyEvent::Start(self.id));
        self.started = true;
        Ok(())
    }

    fn stop(&mut self) -> BackendResult<()> {
        if !self.started {
            return Err(BackendError::SessionNotStarted);
        }
        self.log.push(DummyEvent::Stop(self.id));
        self.started = false;
        Ok(())
    }

    fn is_started(&self) -> bool {
        self.started
    }

    fn update_stats(&mut self) -> BackendResult<()> {
        if !self.started {
            return Err(BackendError::SessionNotStarted);
        }
        self.log.push(DummyEvent::UpdateStats(self.id));
        if !self.editing {
            self.stats.pass += self.pass_per_update;
            self.stats.elapsed_secs += 1.0;
            self.stats.convergence = 1.0 - 1.0 / (1.0 + self.stats.pass as f64);
            self.stats.samples_per_sec = self.stats.pass as f64 / self.stats.elapsed_secs;
        }
        Ok(())
    }

    fn stats(&self) -> RenderStats {
        self.stats
    }

    fn wait_new_frame(&mut self) -> BackendResult<()> {
        if !self.started {
            return Err(BackendError::SessionNotStarted);
        }
        self.log.push(DummyEvent::WaitNewFrame(self.id));
        Ok(())
    }

    fn begin_scene_edit(&mut self) -> BackendResult<()> {
        self.log.push(DummyEvent::BeginSceneEdit(self.id));
        self.editing = true;
        Ok(())
    }

    fn end_scene_edit(&mut self) -> BackendResult<()> {
        if !self.editing {
            return Err(BackendError::Internal("scene edit was not started".into()));
        }
        self.log.push(DummyEvent::EndSceneEdit(self.id));
        self.editing = false;
        // Edits restart accumulation
        self.stats = RenderStats::default();
        Ok(())
    }

    fn scene_mut(&mut self) -> &mut dyn RendererScene {
        self.scene.as_mut()
    }

    fn film(&self) -> FilmData {
        let dimension = |key: &str| {
            self.config
                .get(key)
                .and_then(|v| v.as_f64())
                .map(|v| v as u32)
                .unwrap_or(0)
        };
        let width = dimension("film.width");
        let height = dimension("film.height");
        FilmData {
            width,
            height,
            pixels: vec![0.0; (width * height * 4) as usize],
        }
    }
}

/// Dummy renderer.
#[derive(Debug)]
pub struct DummyRenderer {
    log: DummyLog,
    next_session: AtomicU64,
    fail_sessions: AtomicBool,
    pass_per_update: u64,
}

impl DummyRenderer {
    pub fn new() -> Self {
        Self {
            log: DummyLog::default(),
            next_session: AtomicU64::new(1),
            fail_sessions: AtomicBool::new(false),
            pass_per_update: 16,
        }
    }

    /// Samples added to the pass count per stats update.
    pub fn with_pass_per_update(mut self, pass_per_update: u64) -> Self {
        self.pass_per_update = pass_per_update;
        self
    }

    /// Make every following session creation fail.
    pub fn fail_sessions(&self, fail: bool) {
        self.fail_sessions.store(fail, Ordering::Release);
    }

    pub fn log(&self) -> DummyLog {
        self.log.clone()
    }

    /// Get the renderer name.
    pub fn name(&self) -> &'static str {
        "Dummy Renderer"
    }
}

impl Default for DummyRenderer {
    fn default() -> Self {
        Self::new()
    }
}

impl Renderer for DummyRenderer {
    fn create_scene(&self) -> Box<dyn RendererScene> {
        Box::new(DummyScene::new(self.log.clone()))
    }

    fn create_session(
        &self,
        scene: Box<dyn RendererScene>,
        config: &PropertySet,
    ) -> BackendResult<Box<dyn RenderSession>> {
        if self.fail_sessions.load(Ordering::Acquire) {
            return Err(BackendError::SessionCreationFailed(
                "dummy renderer configured to fail".into(),
            ));
        }

        let id = SessionId(self.next_session.fetch_add(1, Ordering::Relaxed));
        self.log.push(DummyEvent::CreateSession(id));
        Ok(Box::new(DummySession {
            id,
            scene,
            config: config.clone(),
            started: false,
            editing: false,
            stats: RenderStats::default(),
            pass_per_update: self.pass_per_update,
            log: self.log.clone(),
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sessions_get_distinct_ids() {
        let renderer = DummyRenderer::new();
        let a = renderer
            .create_session(renderer.create_scene(), &PropertySet::new())
            .unwrap();
        let b = renderer
            .create_session(renderer.create_scene(), &PropertySet::new())
            .unwrap();
        assert_ne!(a.id(), b.id());
    }

    #[test]
    fn stats_advance_only_while_started() {
        let renderer = DummyRenderer::new().with_pass_per_update(4);
        let mut session = renderer
            .create_session(renderer.create_scene(), &PropertySet::new())
            .unwrap();
        assert!(session.update_stats().is_err());

        session.start().unwrap();
        session.update_stats().unwrap();
        session.update_stats().unwrap();
        assert_eq!(session.stats().pass, 8);
        assert_eq!(session.stats().elapsed_secs, 2.0);
    }

    #[test]
    fn mesh_registry_records_queries() {
        let log = DummyLog::default();
        let mut scene = DummyScene::new(log.clone());
        assert!(!scene.is_mesh_defined("Mesh-A"));
        scene
            .define_mesh(MeshDefinition::unit_quad("Mesh-A", None))
            .unwrap();
        assert!(scene.is_mesh_defined("Mesh-A"));
        assert_eq!(
            log.count(|e| matches!(e, DummyEvent::DefineMesh(_))),
            1
        );
    }

    #[test]
    fn rejects_out_of_range_faces() {
        let mut scene = DummyScene::new(DummyLog::default());
        let mut mesh = MeshDefinition::unit_quad("Broken", None);
        mesh.faces.push([0, 1, 7]);
        assert!(scene.define_mesh(mesh).is_err());
    }

    #[test]
    fn creation_can_be_forced_to_fail() {
        let renderer = DummyRenderer::new();
        renderer.fail_sessions(true);
        assert!(renderer
            .create_session(renderer.create_scene(), &PropertySet::new())
            .is_err());
    }
}
