//! Read-only model of the host application's scene graph
//!
//! The host fills these structures and hands them to the exporter. Nothing in
//! this crate mutates them.

mod camera;
mod light;
mod view;

pub use camera::*;
pub use light::*;
pub use view::*;

use glam::DMat4;
use std::path::PathBuf;

/// Number of scene layers in the host.
pub const LAYER_COUNT: usize = 20;

/// Layer visibility mask.
pub type Layers = [bool; LAYER_COUNT];

/// Layer mask with only the first layer enabled.
pub fn first_layer() -> Layers {
    let mut layers = [false; LAYER_COUNT];
    layers[0] = true;
    layers
}

/// A linked library file that datablocks can come from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Library {
    pub name: String,
    /// Absolute path of the library file.
    pub filepath: PathBuf,
}

/// Datablock payload of an object.
#[derive(Debug, Clone, PartialEq)]
pub enum ObjectData {
    Lamp(Lamp),
    Camera(CameraData),
    Mesh(MeshData),
    Empty,
}

impl ObjectData {
    /// Host type tag of the object (`LAMP`, `CAMERA`, ...).
    pub fn type_tag(&self) -> &'static str {
        match self {
            ObjectData::Lamp(_) => "LAMP",
            ObjectData::Camera(_) => "CAMERA",
            ObjectData::Mesh(_) => "MESH",
            ObjectData::Empty => "EMPTY",
        }
    }

    /// Type tag of the data itself, for datablocks that carry one.
    pub fn data_type_tag(&self) -> Option<&'static str> {
        match self {
            ObjectData::Lamp(lamp) => Some(lamp.kind.type_tag()),
            ObjectData::Camera(camera) => Some(camera.kind.type_tag()),
            ObjectData::Mesh(_) | ObjectData::Empty => None,
        }
    }
}

/// Mesh payload; geometry itself is converted by an external object converter.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct MeshData {
    pub name: String,
    pub material_slots: usize,
}

/// A scene object.
#[derive(Debug, Clone, PartialEq)]
pub struct Object {
    pub name: String,
    pub library: Option<Library>,
    pub matrix_world: DMat4,
    pub layers: Layers,
    /// Hidden in the viewport.
    pub hide: bool,
    /// Hidden in final renders.
    pub hide_render: bool,
    pub data: ObjectData,
}

impl Object {
    pub fn new(name: impl Into<String>, data: ObjectData) -> Self {
        Self {
            name: name.into(),
            library: None,
            matrix_world: DMat4::IDENTITY,
            layers: first_layer(),
            hide: false,
            hide_render: false,
            data,
        }
    }

    pub fn with_matrix(mut self, matrix_world: DMat4) -> Self {
        self.matrix_world = matrix_world;
        self
    }

    pub fn with_library(mut self, library: Library) -> Self {
        self.library = Some(library);
        self
    }

    pub fn with_layers(mut self, layers: Layers) -> Self {
        self.layers = layers;
        self
    }

    pub fn lamp(&self) -> Option<&Lamp> {
        match &self.data {
            ObjectData::Lamp(lamp) => Some(lamp),
            _ => None,
        }
    }

    pub fn camera(&self) -> Option<&CameraData> {
        match &self.data {
            ObjectData::Camera(camera) => Some(camera),
            _ => None,
        }
    }
}

/// Unit system used for display in the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum UnitSystem {
    #[default]
    None,
    Metric,
    Imperial,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct UnitSettings {
    pub system: UnitSystem,
    pub scale_length: f64,
}

impl Default for UnitSettings {
    fn default() -> Self {
        Self {
            system: UnitSystem::None,
            scale_length: 1.0,
        }
    }
}

/// Normalized render border (0..1 on both axes).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RenderBorder {
    pub min_x: f64,
    pub max_x: f64,
    pub min_y: f64,
    pub max_y: f64,
}

impl Default for RenderBorder {
    fn default() -> Self {
        Self {
            min_x: 0.0,
            max_x: 1.0,
            min_y: 0.0,
            max_y: 1.0,
        }
    }
}

impl RenderBorder {
    pub fn to_array(self) -> [f64; 4] {
        [self.min_x, self.max_x, self.min_y, self.max_y]
    }
}

/// When a final render should stop on its own.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct HaltSettings {
    pub enabled: bool,
    /// Samples per pixel.
    pub samples: Option<u64>,
    /// Wall-clock seconds.
    pub time_secs: Option<f64>,
    /// Remaining noise (1 - convergence) at which to stop.
    pub noise_threshold: Option<f64>,
}

/// Final render settings of the scene.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderSettings {
    pub resolution_x: u32,
    pub resolution_y: u32,
    pub resolution_percentage: u32,
    pub use_border: bool,
    pub border: RenderBorder,
    /// Layers of the active render layer.
    pub layers: Layers,
    pub halt: HaltSettings,
}

impl Default for RenderSettings {
    fn default() -> Self {
        Self {
            resolution_x: 1920,
            resolution_y: 1080,
            resolution_percentage: 100,
            use_border: false,
            border: RenderBorder::default(),
            layers: [true; LAYER_COUNT],
            halt: HaltSettings::default(),
        }
    }
}

/// The host scene.
#[derive(Debug, Clone)]
pub struct Scene {
    pub name: String,
    pub objects: Vec<Object>,
    /// Name of the object used as the final render camera.
    pub camera: Option<String>,
    pub world: Option<World>,
    pub render: RenderSettings,
    pub unit_settings: UnitSettings,
    pub layers: Layers,
    /// Directory of the saved scene file, base for `//` relative paths.
    pub blend_dir: Option<PathBuf>,
}

impl Scene {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            objects: Vec::new(),
            camera: None,
            world: None,
            render: RenderSettings::default(),
            unit_settings: UnitSettings::default(),
            layers: first_layer(),
            blend_dir: None,
        }
    }

    pub fn add_object(&mut self, object: Object) -> &mut Self {
        self.objects.push(object);
        self
    }

    pub fn object(&self, name: &str) -> Option<&Object> {
        self.objects.iter().find(|o| o.name == name)
    }

    /// The active scene camera object, if it exists and is a camera.
    pub fn camera_object(&self) -> Option<&Object> {
        let name = self.camera.as_deref()?;
        self.object(name).filter(|o| o.camera().is_some())
    }

    pub fn lamps(&self) -> impl Iterator<Item = &Object> {
        self.objects
            .iter()
            .filter(|o| matches!(o.data, ObjectData::Lamp(_)))
    }
}

impl Default for Scene {
    fn default() -> Self {
        Self::new("Scene")
    }
}
