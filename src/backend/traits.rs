//! Renderer abstraction traits
//!
//! The rendering engine is an external collaborator. These traits are the
//! whole surface this crate uses: property parsing, mesh definition, session
//! creation and the start/stop/stats/wait-for-frame session calls.

use crate::backend::types::*;
use crate::properties::PropertySet;
use thiserror::Error;

/// Renderer error type.
#[derive(Error, Debug)]
pub enum BackendError {
    #[error("Failed to create render session: {0}")]
    SessionCreationFailed(String),
    #[error("Failed to parse properties: {0}")]
    ParseFailed(String),
    #[error("Failed to define mesh \"{0}\"")]
    MeshDefinitionFailed(String),
    #[error("Render session is not started")]
    SessionNotStarted,
    #[error("Renderer internal error: {0}")]
    Internal(String),
}

pub type BackendResult<T> = Result<T, BackendError>;

/// Identity of a render session, unique per renderer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SessionId(pub u64);

/// Renderer-side scene being built from property sets.
pub trait RendererScene {
    /// Whether a mesh with this name was already defined.
    fn is_mesh_defined(&self, name: &str) -> bool;

    /// Define a named mesh; the optional transform is baked into the vertices.
    fn define_mesh(&mut self, mesh: MeshDefinition) -> BackendResult<()>;

    /// Parse scene properties (`scene.*`).
    fn parse(&mut self, props: &PropertySet) -> BackendResult<()>;

    fn delete_object(&mut self, name: &str);

    fn delete_light(&mut self, name: &str);

    /// All properties parsed so far.
    fn properties(&self) -> &PropertySet;
}

/// One in-progress render job inside the renderer.
pub trait RenderSession {
    fn id(&self) -> SessionId;

    fn start(&mut self) -> BackendResult<()>;

    fn stop(&mut self) -> BackendResult<()>;

    fn is_started(&self) -> bool;

    /// Refresh the statistics returned by [`RenderSession::stats`].
    fn update_stats(&mut self) -> BackendResult<()>;

    fn stats(&self) -> RenderStats;

    /// Block until the renderer has produced a new frame (bounded by its frame cadence).
    fn wait_new_frame(&mut self) -> BackendResult<()>;

    /// Pause rendering so the scene can be edited.
    fn begin_scene_edit(&mut self) -> BackendResult<()>;

    /// Resume rendering with the edited scene.
    fn end_scene_edit(&mut self) -> BackendResult<()>;

    fn scene_mut(&mut self) -> &mut dyn RendererScene;

    /// Copy the current film into an RGBA float buffer.
    fn film(&self) -> FilmData;
}

/// Factory for scenes and sessions.
pub trait Renderer {
    fn create_scene(&self) -> Box<dyn RendererScene>;

    /// Build a session from a fully parsed scene and the render configuration.
    fn create_session(
        &self,
        scene: Box<dyn RendererScene>,
        config: &PropertySet,
    ) -> BackendResult<Box<dyn RenderSession>>;
}
