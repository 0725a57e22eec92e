//! Camera datablocks

/// Camera projection type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CameraKind {
    #[default]
    Perspective,
    Orthographic,
    Panoramic,
}

impl CameraKind {
    pub fn type_tag(&self) -> &'static str {
        match self {
            CameraKind::Perspective => "PERSP",
            CameraKind::Orthographic => "ORTHO",
            CameraKind::Panoramic => "PANO",
        }
    }
}

/// Which sensor dimension the field of view refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SensorFit {
    #[default]
    Auto,
    Horizontal,
    Vertical,
}

/// Camera data of a camera object.
#[derive(Debug, Clone, PartialEq)]
pub struct CameraData {
    pub kind: CameraKind,
    /// Field of view in radians.
    pub angle: f64,
    pub ortho_scale: f64,
    pub shift_x: f64,
    pub shift_y: f64,
    pub sensor_fit: SensorFit,
}

impl Default for CameraData {
    fn default() -> Self {
        Self {
            kind: CameraKind::Perspective,
            angle: 49.134_f64.to_radians(),
            ortho_scale: 7.314,
            shift_x: 0.0,
            shift_y: 0.0,
            sensor_fit: SensorFit::Auto,
        }
    }
}

impl CameraData {
    pub fn perspective(angle_degrees: f64) -> Self {
        Self {
            angle: angle_degrees.to_radians(),
            ..Default::default()
        }
    }

    pub fn orthographic(ortho_scale: f64) -> Self {
        Self {
            kind: CameraKind::Orthographic,
            ortho_scale,
            ..Default::default()
        }
    }

    pub fn with_shift(mut self, shift_x: f64, shift_y: f64) -> Self {
        self.shift_x = shift_x;
        self.shift_y = shift_y;
        self
    }

    pub fn with_sensor_fit(mut self, sensor_fit: SensorFit) -> Self {
        self.sensor_fit = sensor_fit;
        self
    }
}
