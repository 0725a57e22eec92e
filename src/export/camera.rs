//! Camera conversion
//!
//! Builds the `scene.camera.*` properties either from the scene camera (final
//! renders and camera-view viewports) or from the virtual camera of a free
//! 3D view.

use crate::error::{ExportError, ExportResult};
use crate::math::{calc_aspect, calc_filmsize_raw, calc_lookat, calc_screenwindow};
use crate::properties::{create_props, PropertySet, PropertyValue};
use crate::scene::{CameraData, CameraKind, Object, Scene, SensorFit, ViewContext, ViewPerspective};
use glam::DVec3;

const PREFIX: &str = "scene.camera.";

/// Renderer camera model.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CameraType {
    Perspective,
    Orthographic,
    Environment,
}

impl CameraType {
    pub fn as_str(&self) -> &'static str {
        match self {
            CameraType::Perspective => "perspective",
            CameraType::Orthographic => "orthographic",
            CameraType::Environment => "environment",
        }
    }
}

impl From<CameraKind> for CameraType {
    fn from(kind: CameraKind) -> Self {
        match kind {
            CameraKind::Perspective => CameraType::Perspective,
            CameraKind::Orthographic => CameraType::Orthographic,
            CameraKind::Panoramic => CameraType::Environment,
        }
    }
}

/// Everything the camera properties are built from.
struct CameraSetup {
    camera_type: CameraType,
    lookat_orig: DVec3,
    lookat_target: DVec3,
    up: DVec3,
    /// Degrees; only used by perspective cameras.
    fieldofview: f64,
    screenwindow: [f64; 4],
}

/// Convert the active camera; failures are logged and yield empty properties.
pub fn convert(scene: &Scene, context: Option<&ViewContext>) -> PropertySet {
    match try_convert(scene, context) {
        Ok(props) => props,
        Err(error) => {
            log::error!("Camera export failed: {error}");
            PropertySet::new()
        }
    }
}

pub fn try_convert(scene: &Scene, context: Option<&ViewContext>) -> ExportResult<PropertySet> {
    let setup = match context {
        Some(ctx) if ctx.is_free_view() => view_camera(scene, ctx),
        Some(ctx) => {
            let (obj, camera) = scene_camera(scene)?;
            camera_view(scene, ctx, obj, camera)
        }
        None => {
            let (obj, camera) = scene_camera(scene)?;
            final_camera(scene, obj, camera)
        }
    };

    let mut definitions: Vec<(&str, PropertyValue)> = vec![
        ("type", setup.camera_type.as_str().into()),
        ("lookat.orig", setup.lookat_orig.into()),
        ("lookat.target", setup.lookat_target.into()),
        ("up", setup.up.into()),
        ("screenwindow", setup.screenwindow.into()),
    ];
    if setup.camera_type == CameraType::Perspective {
        definitions.push(("fieldofview", setup.fieldofview.into()));
    }

    Ok(create_props(PREFIX, definitions))
}

fn scene_camera(scene: &Scene) -> ExportResult<(&Object, &CameraData)> {
    scene
        .camera_object()
        .and_then(|obj| obj.camera().map(|camera| (obj, camera)))
        .ok_or_else(|| ExportError::MissingCamera(scene.name.clone()))
}

/// Free perspective or orthographic 3D view.
fn view_camera(scene: &Scene, ctx: &ViewContext) -> CameraSetup {
    let cam_matrix = ctx.region_data.view_matrix.inverse();
    let (mut lookat_orig, lookat_target, up) = calc_lookat(cam_matrix);

    let (camera_type, zoom, fieldofview) = match ctx.region_data.view_perspective {
        ViewPerspective::Orthographic => {
            // Pull the eye far back so objects behind the view center are not clipped
            lookat_orig += (lookat_orig - lookat_target) * 50.0;
            (CameraType::Orthographic, ctx.region_data.view_distance, 0.0)
        }
        _ => {
            let fov = (2.0 * (16.0 / ctx.space_data.lens).atan()).to_degrees();
            (CameraType::Perspective, 2.0, fov)
        }
    };

    CameraSetup {
        camera_type,
        lookat_orig,
        lookat_target,
        up,
        fieldofview,
        screenwindow: calc_screenwindow(zoom, 0.0, 0.0, 0.0, 0.0, scene, Some(ctx)),
    }
}

/// Viewport looking through the scene camera.
fn camera_view(scene: &Scene, ctx: &ViewContext, obj: &Object, camera: &CameraData) -> CameraSetup {
    let (lookat_orig, lookat_target, up) = calc_lookat(obj.matrix_world);

    // Converts the host's camera-view zoom units into a screen window scale
    let mut zoom =
        2.0 / (std::f64::consts::SQRT_2 + ctx.region_data.view_camera_zoom / 50.0).powi(2) * 2.0;

    let camera_type = CameraType::from(camera.kind);
    if camera_type == CameraType::Orthographic {
        zoom *= camera.ortho_scale / 2.0;
    }

    let (xaspect, yaspect) = calc_aspect(ctx.region.width, ctx.region.height);
    let offset = ctx.region_data.view_camera_offset;
    let offset_x = 2.0 * (camera.shift_x + offset[0] * xaspect * 2.0);
    let offset_y = 2.0 * (camera.shift_y + offset[1] * yaspect * 2.0);

    CameraSetup {
        camera_type,
        lookat_orig,
        lookat_target,
        up,
        fieldofview: camera.angle.to_degrees(),
        screenwindow: calc_screenwindow(zoom, 0.0, 0.0, offset_x, offset_y, scene, Some(ctx)),
    }
}

fn final_camera(scene: &Scene, obj: &Object, camera: &CameraData) -> CameraSetup {
    let (lookat_orig, lookat_target, up) = calc_lookat(obj.matrix_world);
    let camera_type = CameraType::from(camera.kind);

    let (width, height) = calc_filmsize_raw(scene, None);
    let aspect_fix = if camera.sensor_fit == SensorFit::Vertical && width > height {
        vertical_fit_fix(width as f64 / height as f64)
    } else {
        1.0
    };

    CameraSetup {
        camera_type,
        lookat_orig,
        lookat_target,
        up,
        fieldofview: (camera.angle * aspect_fix).to_degrees(),
        screenwindow: calc_screenwindow(
            1.0,
            camera.shift_x,
            camera.shift_y,
            0.0,
            0.0,
            scene,
            None,
        ),
    }
}

/// Aspect ratio truncated to one decimal, rounded down.
fn vertical_fit_fix(aspect: f64) -> f64 {
    ((aspect - 0.05) * 10.0).round() / 10.0
}
