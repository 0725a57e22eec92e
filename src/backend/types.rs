//! Common types exchanged with the renderer

use glam::DVec3;

/// Triangle mesh handed to [`RendererScene::define_mesh`](super::RendererScene::define_mesh).
#[derive(Debug, Clone, PartialEq)]
pub struct MeshDefinition {
    pub name: String,
    pub vertices: Vec<DVec3>,
    pub faces: Vec<[u32; 3]>,
    /// Column-major transform baked into the vertices; `None` keeps the mesh
    /// in object space so it can be instanced and moved.
    pub transform: Option<Vec<f64>>,
}

impl MeshDefinition {
    /// Unit quad in the XY plane spanning `[-1, 1]` on both axes, as two triangles.
    pub fn unit_quad(name: impl Into<String>, transform: Option<Vec<f64>>) -> Self {
        Self {
            name: name.into(),
            vertices: vec![
                DVec3::new(1.0, 1.0, 0.0),
                DVec3::new(1.0, -1.0, 0.0),
                DVec3::new(-1.0, -1.0, 0.0),
                DVec3::new(-1.0, 1.0, 0.0),
            ],
            faces: vec![[0, 1, 2], [2, 3, 0]],
            transform,
        }
    }
}

/// Statistics pulled from a running session.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct RenderStats {
    /// Completed samples per pixel.
    pub pass: u64,
    /// Seconds since the session started.
    pub elapsed_secs: f64,
    /// 0..1, 1 meaning fully converged.
    pub convergence: f64,
    pub samples_per_sec: f64,
}

/// RGBA float pixels of the film.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct FilmData {
    pub width: u32,
    pub height: u32,
    pub pixels: Vec<f32>,
}
