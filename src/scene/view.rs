//! Interactive 3D-view state passed along with viewport renders

use super::RenderBorder;
use glam::DMat4;

/// How the 3D view looks at the scene.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ViewPerspective {
    #[default]
    Perspective,
    Orthographic,
    /// Looking through the scene camera.
    Camera,
}

/// Pixel size of the viewport region.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Region {
    pub width: u32,
    pub height: u32,
}

/// Orbit/pan state of the view.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RegionData {
    pub view_perspective: ViewPerspective,
    /// World-to-view matrix.
    pub view_matrix: DMat4,
    pub view_distance: f64,
    /// Zoom while looking through the scene camera, host units.
    pub view_camera_zoom: f64,
    pub view_camera_offset: [f64; 2],
}

impl Default for RegionData {
    fn default() -> Self {
        Self {
            view_perspective: ViewPerspective::Perspective,
            view_matrix: DMat4::IDENTITY,
            view_distance: 10.0,
            view_camera_zoom: 0.0,
            view_camera_offset: [0.0, 0.0],
        }
    }
}

/// Settings of the 3D view editor itself.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SpaceData {
    /// Viewport lens in millimeters.
    pub lens: f64,
    pub use_render_border: bool,
    pub render_border: RenderBorder,
}

impl Default for SpaceData {
    fn default() -> Self {
        Self {
            lens: 35.0,
            use_render_border: false,
            render_border: RenderBorder::default(),
        }
    }
}

/// Everything a viewport render knows about the view it draws into.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ViewContext {
    pub region: Region,
    pub region_data: RegionData,
    pub space_data: SpaceData,
}

impl ViewContext {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            region: Region { width, height },
            region_data: RegionData::default(),
            space_data: SpaceData::default(),
        }
    }

    pub fn with_perspective(mut self, view_perspective: ViewPerspective) -> Self {
        self.region_data.view_perspective = view_perspective;
        self
    }

    pub fn with_view_matrix(mut self, view_matrix: DMat4) -> Self {
        self.region_data.view_matrix = view_matrix;
        self
    }

    /// True when the view has its own virtual camera (not the scene camera).
    pub fn is_free_view(&self) -> bool {
        matches!(
            self.region_data.view_perspective,
            ViewPerspective::Perspective | ViewPerspective::Orthographic
        )
    }
}
