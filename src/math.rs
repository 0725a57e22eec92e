//! Geometry helpers shared by the converters
//!
//! Host matrices are column-major `DMat4`s. Film sizes, borders and screen
//! windows follow the host's conventions so that renders line up exactly
//! with what the user framed in the viewport.

use crate::scene::{Object, Scene, UnitSystem, ViewContext};
use glam::{DMat4, DVec3};

/// Scalar converting scene units to meters.
pub fn get_worldscale(scene: &Scene) -> f64 {
    match scene.unit_settings.system {
        // Display units only; behind the scenes everything is meters
        UnitSystem::Metric | UnitSystem::Imperial => scene.unit_settings.scale_length,
        UnitSystem::None => 1.0,
    }
}

/// World scale as a uniform 4x4 scale matrix.
pub fn get_worldscale_matrix(scene: &Scene) -> DMat4 {
    DMat4::from_scale(DVec3::splat(get_worldscale(scene)))
}

/// Flatten a 4x4 matrix into 16 floats, column by column.
pub fn matrix_to_list(matrix: DMat4, scene: &Scene, apply_worldscale: bool, invert: bool) -> Vec<f64> {
    let mut matrix = matrix;

    if apply_worldscale {
        let ws = get_worldscale(scene);
        matrix *= get_worldscale_matrix(scene);
        matrix.w_axis.x *= ws;
        matrix.w_axis.y *= ws;
        matrix.w_axis.z *= ws;
    }

    if invert {
        matrix = matrix.inverse();
    }

    matrix.to_cols_array().to_vec()
}

/// Film size before the render border is applied.
pub fn calc_filmsize_raw(scene: &Scene, context: Option<&ViewContext>) -> (u32, u32) {
    match context {
        Some(ctx) => (ctx.region.width, ctx.region.height),
        None => {
            let scale = scene.render.resolution_percentage as f64 / 100.0;
            let width = (scene.render.resolution_x as f64 * scale) as u32;
            let height = (scene.render.resolution_y as f64 * scale) as u32;
            (width, height)
        }
    }
}

/// Film size handed to the renderer.
///
/// The whole region is rendered even when a border is set; the host crops the
/// result.
pub fn calc_filmsize(scene: &Scene, context: Option<&ViewContext>) -> (u32, u32) {
    let (width, height) = calc_filmsize_raw(scene, context);
    (width.max(1), height.max(1))
}

/// Active render border as `[min_x, max_x, min_y, max_y]`.
pub fn calc_blender_border(scene: &Scene, context: Option<&ViewContext>) -> [f64; 4] {
    let (use_border, border) = match context {
        Some(ctx) if ctx.is_free_view() => (
            ctx.space_data.use_render_border,
            ctx.space_data.render_border,
        ),
        _ => (scene.render.use_border, scene.render.border),
    };

    if use_border {
        border.to_array()
    } else {
        [0.0, 1.0, 0.0, 1.0]
    }
}

/// Screen window from frame aspect, zoom, shift and pixel offset.
///
/// The longer frame axis spans `[-zoom, zoom]`. Border rendering does not
/// narrow the window; see [`calc_filmsize`].
pub fn calc_screenwindow(
    zoom: f64,
    shift_x: f64,
    shift_y: f64,
    offset_x: f64,
    offset_y: f64,
    scene: &Scene,
    context: Option<&ViewContext>,
) -> [f64; 4] {
    let (width_raw, height_raw) = calc_filmsize(scene, context);
    let aspect = width_raw as f64 / height_raw as f64;
    let invaspect = 1.0 / aspect;

    let window = if aspect > 1.0 {
        [
            (2.0 * shift_x - 1.0) * zoom,
            (2.0 * shift_x + 1.0) * zoom,
            (2.0 * shift_y - invaspect) * zoom,
            (2.0 * shift_y + invaspect) * zoom,
        ]
    } else {
        [
            (2.0 * shift_x - aspect) * zoom,
            (2.0 * shift_x + aspect) * zoom,
            (2.0 * shift_y - 1.0) * zoom,
            (2.0 * shift_y + 1.0) * zoom,
        ]
    };

    [
        window[0] + offset_x,
        window[1] + offset_x,
        window[2] + offset_y,
        window[3] + offset_y,
    ]
}

/// Per-axis aspect factors; the longer axis is 1.
pub fn calc_aspect(width: u32, height: u32) -> (f64, f64) {
    if width > height {
        (1.0, height as f64 / width as f64)
    } else {
        (width as f64 / height as f64, 1.0)
    }
}

/// Whether `obj` takes part in the render.
///
/// An object is visible when it shares at least one layer with both the scene
/// and the active render layer and is not hidden. Dupli instances ignore layers.
pub fn is_obj_visible(obj: &Object, scene: &Scene, context: Option<&ViewContext>, is_dupli: bool) -> bool {
    let hidden = if context.is_some() {
        obj.hide
    } else {
        obj.hide_render
    };

    let on_visible_layer = obj
        .layers
        .iter()
        .zip(scene.layers.iter())
        .zip(scene.render.layers.iter())
        .any(|((&ol, &sl), &rl)| ol && sl && rl);

    (on_visible_layer || is_dupli) && !hidden
}

/// Direction the renderer's sun points away from, taken from the object's
/// inverted world matrix (third row).
pub fn calc_sun_dir(matrix_world: DMat4) -> [f64; 3] {
    let inv = matrix_world.inverse();
    [inv.x_axis.z, inv.y_axis.z, inv.z_axis.z]
}

/// Camera look-at triple (origin, target, up) from a camera-to-world matrix.
pub fn calc_lookat(cam_matrix: DMat4) -> (DVec3, DVec3, DVec3) {
    let orig = cam_matrix.w_axis.truncate();
    let target = cam_matrix.transform_point3(DVec3::new(0.0, 0.0, -1.0));
    let up = cam_matrix.transform_vector3(DVec3::new(0.0, 1.0, 0.0));
    (orig, target, up)
}
