//! Scene export and session construction
//!
//! The [`Exporter`] turns a host [`Scene`] into renderer properties, creates
//! sessions from them and keeps them in sync with later edits. Per-entity
//! conversion failures never abort an export; they are logged and collected
//! as [`ExportDiagnostic`]s.

pub mod camera;
pub mod changes;
pub mod config;
pub mod light;

pub use changes::{Change, ObjectDelta, SceneSnapshot};

use crate::backend::{RenderSession, Renderer, RendererScene, SessionId};
use crate::error::{ExportError, ExportResult};
use crate::math::is_obj_visible;
use crate::names::{make_key, obj_from_key, ExportedEntity, ExportedObject};
use crate::properties::PropertySet;
use crate::resources::ImageCache;
use crate::scene::{Object, ObjectData, Scene, ViewContext};
use crate::BridgeConfig;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;

/// What a session is rendering for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RenderMode {
    /// F12 render into the image window.
    Final,
    /// Interactive 3D viewport.
    Viewport,
    /// Material preview thumbnails.
    Preview,
}

/// Converts host mesh objects into renderer objects.
///
/// Geometry and materials are exported outside this crate; an implementation
/// defines the meshes it needs on the renderer scene and returns the object
/// properties.
pub trait ObjectConverter {
    fn convert(
        &mut self,
        obj: &Object,
        scene: &Scene,
        context: Option<&ViewContext>,
        luxcore_scene: &mut dyn RendererScene,
    ) -> ExportResult<(PropertySet, ExportedObject)>;
}

/// A host entity that could not be exported.
#[derive(Debug, Clone, PartialEq)]
pub struct ExportDiagnostic {
    /// Name of the host entity.
    pub entity: String,
    pub message: String,
}

/// Builds render sessions from host scenes.
pub struct Exporter {
    renderer: Arc<dyn Renderer>,
    images: Arc<ImageCache>,
    config: BridgeConfig,
    preview: bool,
    object_converter: Option<Box<dyn ObjectConverter>>,
    /// Exported entities by datablock key.
    exported: HashMap<String, ExportedEntity>,
    snapshot: Option<SceneSnapshot>,
    diagnostics: Vec<ExportDiagnostic>,
    live_session: Option<SessionId>,
}

impl Exporter {
    pub fn new(renderer: Arc<dyn Renderer>, images: Arc<ImageCache>, config: BridgeConfig) -> Self {
        Self {
            renderer,
            images,
            config,
            preview: false,
            object_converter: None,
            exported: HashMap::new(),
            snapshot: None,
            diagnostics: Vec::new(),
            live_session: None,
        }
    }

    pub fn with_object_converter(mut self, converter: Box<dyn ObjectConverter>) -> Self {
        self.object_converter = Some(converter);
        self
    }

    /// Export renders without a view context as material previews.
    pub fn set_preview(&mut self, preview: bool) {
        self.preview = preview;
    }

    pub fn render_mode(&self, context: Option<&ViewContext>) -> RenderMode {
        match context {
            Some(_) => RenderMode::Viewport,
            None if self.preview => RenderMode::Preview,
            None => RenderMode::Final,
        }
    }

    pub fn config(&self) -> &BridgeConfig {
        &self.config
    }

    pub fn images(&self) -> &Arc<ImageCache> {
        &self.images
    }

    /// Failures collected since the last full export.
    pub fn diagnostics(&self) -> &[ExportDiagnostic] {
        &self.diagnostics
    }

    /// Renderer primitives exported for a datablock key.
    pub fn exported(&self, key: &str) -> Option<&ExportedEntity> {
        self.exported.get(key)
    }

    pub fn live_session(&self) -> Option<SessionId> {
        self.live_session
    }

    /// Export the whole scene and create a new session from it.
    ///
    /// # Panics
    ///
    /// Panics if a session created by this exporter is still live.
    pub fn create_session(
        &mut self,
        scene: &Scene,
        context: Option<&ViewContext>,
    ) -> ExportResult<Box<dyn RenderSession>> {
        assert!(
            self.live_session.is_none(),
            "a render session created by this exporter is still live"
        );

        let start = Instant::now();
        let mode = self.render_mode(context);
        log::info!("Exporting scene \"{}\" for {:?} render", scene.name, mode);

        self.exported.clear();
        self.diagnostics.clear();

        let mut luxcore_scene = self.renderer.create_scene();
        let mut scene_props = PropertySet::new();

        match camera::try_convert(scene, context) {
            Ok(props) => {
                scene_props.set_all(&props);
            }
            Err(error) => self.record_failure(&scene.name, &error),
        }

        for obj in &scene.objects {
            if !is_obj_visible(obj, scene, context, false) {
                log::trace!("Skipping invisible object \"{}\"", obj.name);
                continue;
            }
            if let Some(props) = self.export_object(obj, scene, context, luxcore_scene.as_mut()) {
                scene_props.set_all(&props);
            }
        }

        if let Some(world) = &scene.world {
            match light::try_convert_world(world, scene, &self.images) {
                Ok(props) => {
                    scene_props.set_all(&props);
                }
                Err(error) => self.record_failure(&world.name, &error),
            }
        }

        luxcore_scene.parse(&scene_props)?;
        let config_props = config::convert(scene, context, mode, &self.config);
        let session = self.renderer.create_session(luxcore_scene, &config_props)?;

        self.live_session = Some(session.id());
        self.snapshot = Some(SceneSnapshot::capture(scene, context, mode, &self.config));

        log::info!(
            "Export took {:.1}s ({} entities, {} failed)",
            start.elapsed().as_secs_f64(),
            self.exported.len(),
            self.diagnostics.len()
        );
        Ok(session)
    }

    /// Classify what changed since the last export or update.
    pub fn get_changes(&self, scene: &Scene, context: Option<&ViewContext>) -> Change {
        let Some(last) = &self.snapshot else {
            return Change::CONFIG;
        };
        let current =
            SceneSnapshot::capture(scene, context, self.render_mode(context), &self.config);
        last.diff(&current)
    }

    /// Apply `changes` to `session`.
    ///
    /// Camera and object changes are edited into the running session, which is
    /// returned again. Config changes stop `session` and return a new one. On
    /// error the session is released.
    pub fn update(
        &mut self,
        scene: &Scene,
        context: Option<&ViewContext>,
        mut session: Box<dyn RenderSession>,
        changes: Change,
    ) -> ExportResult<Box<dyn RenderSession>> {
        if changes.is_empty() {
            return Ok(session);
        }

        if changes.contains(Change::CONFIG) {
            log::info!("Render configuration changed, rebuilding session");
            let was_started = session.is_started();
            self.release_session(session);

            let mut session = self.create_session(scene, context)?;
            if was_started {
                if let Err(error) = session.start() {
                    self.release_session(session);
                    return Err(error.into());
                }
            }
            return Ok(session);
        }

        let current =
            SceneSnapshot::capture(scene, context, self.render_mode(context), &self.config);

        if let Err(error) = self.apply_edits(scene, context, session.as_mut(), &current, changes) {
            self.release_session(session);
            return Err(error);
        }

        if let Some(last) = &mut self.snapshot {
            last.merge(current, changes);
        }
        Ok(session)
    }

    /// Stop `session` if it is running and forget it.
    pub fn release_session(&mut self, mut session: Box<dyn RenderSession>) {
        let id = session.id();
        if session.is_started() {
            if let Err(error) = session.stop() {
                log::warn!("Failed to stop render session {:?}: {error}", id);
            }
        }
        if self.live_session == Some(id) {
            self.live_session = None;
        } else {
            log::warn!("Released render session {:?} was not created by this exporter", id);
        }
        log::debug!("Released render session {:?}", id);
    }

    fn apply_edits(
        &mut self,
        scene: &Scene,
        context: Option<&ViewContext>,
        session: &mut dyn RenderSession,
        current: &SceneSnapshot,
        changes: Change,
    ) -> ExportResult<()> {
        session.begin_scene_edit()?;

        if changes.contains(Change::CAMERA) {
            log::debug!("Updating camera");
            session.scene_mut().parse(current.camera())?;
        }

        if changes.contains(Change::OBJECT) {
            let delta = match &self.snapshot {
                Some(last) => last.object_delta(current),
                None => ObjectDelta::default(),
            };
            self.update_objects(scene, context, session.scene_mut(), &delta)?;
        }

        session.end_scene_edit()?;
        Ok(())
    }

    fn update_objects(
        &mut self,
        scene: &Scene,
        context: Option<&ViewContext>,
        luxcore_scene: &mut dyn RendererScene,
        delta: &ObjectDelta,
    ) -> ExportResult<()> {
        log::debug!(
            "Updating {} objects, removing {}",
            delta.updated.len(),
            delta.removed.len()
        );

        for key in delta.removed.iter().chain(&delta.updated) {
            if let Some(entity) = self.exported.remove(key) {
                delete_entity(luxcore_scene, &entity);
            }
        }

        let mut props = PropertySet::new();
        for key in &delta.updated {
            let Some(obj) = obj_from_key(key, &scene.objects) else {
                continue;
            };
            if let Some(obj_props) = self.export_object(obj, scene, context, luxcore_scene) {
                props.set_all(&obj_props);
            }
        }

        if delta.world {
            luxcore_scene.delete_light(light::WORLD_BACKGROUND_LIGHT_NAME);
            if let Some(world) = &scene.world {
                match light::try_convert_world(world, scene, &self.images) {
                    Ok(world_props) => {
                        props.set_all(&world_props);
                    }
                    Err(error) => self.record_failure(&world.name, &error),
                }
            }
        }

        if !props.is_empty() {
            luxcore_scene.parse(&props)?;
        }
        Ok(())
    }

    /// Convert one object and track what it exported; `None` when nothing was exported.
    fn export_object(
        &mut self,
        obj: &Object,
        scene: &Scene,
        context: Option<&ViewContext>,
        luxcore_scene: &mut dyn RendererScene,
    ) -> Option<PropertySet> {
        let result = match &obj.data {
            ObjectData::Lamp(_) => {
                light::try_convert_lamp(obj, scene, context, luxcore_scene, &self.images)
            }
            ObjectData::Mesh(_) => match &mut self.object_converter {
                Some(converter) => converter
                    .convert(obj, scene, context, luxcore_scene)
                    .map(|(props, exported)| (props, ExportedEntity::Object(exported))),
                None => {
                    log::debug!("No object converter, skipping mesh \"{}\"", obj.name);
                    return None;
                }
            },
            ObjectData::Camera(_) | ObjectData::Empty => return None,
        };

        match result {
            Ok((props, exported)) => {
                self.exported.insert(make_key(obj), exported);
                Some(props)
            }
            Err(error) => {
                self.record_failure(&obj.name, &error);
                None
            }
        }
    }

    fn record_failure(&mut self, entity: &str, error: &ExportError) {
        log::warn!("Could not export \"{entity}\": {error}");
        self.diagnostics.push(ExportDiagnostic {
            entity: entity.to_string(),
            message: error.to_string(),
        });
    }
}

fn delete_entity(luxcore_scene: &mut dyn RendererScene, entity: &ExportedEntity) {
    for name in entity.luxcore_names() {
        match entity {
            ExportedEntity::Object(_) => luxcore_scene.delete_object(name),
            ExportedEntity::Light(_) => luxcore_scene.delete_light(name),
        }
    }
}
