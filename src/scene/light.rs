//! Lamp and world datablocks
//!
//! Each lamp kind carries only the settings the renderer reads for it.

use crate::resources::Image;

/// Settings shared by every light and the world background.
#[derive(Debug, Clone, PartialEq)]
pub struct LightCommon {
    pub rgb_gain: [f64; 3],
    pub gain: f64,
    pub samples: i32,
    pub importance: f64,
}

impl Default for LightCommon {
    fn default() -> Self {
        Self {
            rgb_gain: [1.0, 1.0, 1.0],
            gain: 1.0,
            samples: -1,
            importance: 1.0,
        }
    }
}

/// Photometric output of lights that emit from a position.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Emission {
    /// Watts.
    pub power: f64,
    /// Lumens per watt.
    pub efficacy: f64,
}

impl Default for Emission {
    fn default() -> Self {
        Self {
            power: 0.0,
            efficacy: 0.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct PointLamp {
    pub emission: Emission,
    pub image: Option<Image>,
    pub gamma: f64,
    pub iesfile: Option<String>,
    pub flipz: bool,
}

/// Physical model used for a sun lamp.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SunType {
    /// Physical sky sun with turbidity.
    #[default]
    Sun,
    /// Directional light, sharp below a small angular size.
    Distant,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SunLamp {
    pub sun_type: SunType,
    pub turbidity: f64,
    pub relsize: f64,
    /// Angular half-size in degrees.
    pub theta: f64,
}

impl Default for SunLamp {
    fn default() -> Self {
        Self {
            sun_type: SunType::Sun,
            turbidity: 2.2,
            relsize: 1.0,
            theta: 10.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SpotLamp {
    pub emission: Emission,
    /// Full cone angle in radians.
    pub spot_size: f64,
    /// 0..1 soft edge fraction.
    pub spot_blend: f64,
    /// Projected image; turns the spot into a projector.
    pub image: Option<Image>,
    pub gamma: f64,
}

impl Default for SpotLamp {
    fn default() -> Self {
        Self {
            emission: Emission::default(),
            spot_size: 45f64.to_radians(),
            spot_blend: 0.15,
            image: None,
            gamma: 1.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct HemiLamp {
    pub image: Option<Image>,
    pub gamma: f64,
    pub sample_upper_hemisphere_only: bool,
}

impl Default for HemiLamp {
    fn default() -> Self {
        Self {
            image: None,
            gamma: 1.0,
            sample_upper_hemisphere_only: false,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AreaShape {
    #[default]
    Square,
    Rectangle,
}

#[derive(Debug, Clone, PartialEq)]
pub struct AreaLamp {
    pub emission: Emission,
    pub shape: AreaShape,
    pub size: f64,
    /// Only used by rectangle lamps.
    pub size_y: f64,
    /// Emit as a zero-area laser instead of a mesh.
    pub is_laser: bool,
}

impl Default for AreaLamp {
    fn default() -> Self {
        Self {
            emission: Emission::default(),
            shape: AreaShape::Square,
            size: 1.0,
            size_y: 1.0,
            is_laser: false,
        }
    }
}

/// Closed set of lamp kinds the host offers.
#[derive(Debug, Clone, PartialEq)]
pub enum LampKind {
    Point(PointLamp),
    Sun(SunLamp),
    Spot(SpotLamp),
    Hemi(HemiLamp),
    Area(AreaLamp),
}

impl LampKind {
    pub fn type_tag(&self) -> &'static str {
        match self {
            LampKind::Point(_) => "POINT",
            LampKind::Sun(_) => "SUN",
            LampKind::Spot(_) => "SPOT",
            LampKind::Hemi(_) => "HEMI",
            LampKind::Area(_) => "AREA",
        }
    }
}

/// Lamp data of a lamp object.
#[derive(Debug, Clone, PartialEq)]
pub struct Lamp {
    pub common: LightCommon,
    pub kind: LampKind,
}

impl Lamp {
    pub fn new(kind: LampKind) -> Self {
        Self {
            common: LightCommon::default(),
            kind,
        }
    }

    pub fn with_common(mut self, common: LightCommon) -> Self {
        self.common = common;
        self
    }
}

/// Background light of the world.
#[derive(Debug, Clone, PartialEq)]
pub enum WorldBackground {
    /// Physical sky model.
    Sky2 {
        ground_enable: bool,
        ground_color: [f64; 3],
        groundalbedo: [f64; 3],
        /// Sun object driving the sky direction (and turbidity if it is a sun lamp).
        sun: Option<String>,
        turbidity: f64,
    },
    /// Image based light.
    Infinite {
        image: Option<Image>,
        gamma: f64,
        sample_upper_hemisphere_only: bool,
        /// Rotation about the up axis in radians.
        rotation: f64,
    },
    Constant,
}

#[derive(Debug, Clone, PartialEq)]
pub struct World {
    pub name: String,
    pub common: LightCommon,
    pub background: WorldBackground,
}

impl World {
    pub fn new(name: impl Into<String>, background: WorldBackground) -> Self {
        Self {
            name: name.into(),
            common: LightCommon::default(),
            background,
        }
    }
}
