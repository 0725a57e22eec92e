//! Light conversion
//!
//! Every lamp kind maps to its own `scene.lights.<name>.*` schema. Area lamps
//! are the exception: the renderer has no area light primitive, so they
//! become an emissive quad mesh with its own material and object.

use crate::backend::{MeshDefinition, RendererScene};
use crate::error::{ExportError, ExportResult};
use crate::math::{calc_sun_dir, get_worldscale, matrix_to_list};
use crate::names::{get_unique_luxcore_name, ExportedEntity, ExportedLight, ExportedObject};
use crate::properties::{create_props, PropertySet, PropertyValue};
use crate::resources::{Image, ImageCache};
use crate::scene::{
    AreaLamp, AreaShape, Emission, LampKind, LightCommon, Object, Scene, SunType, ViewContext,
    World, WorldBackground,
};
use glam::{DMat4, DVec3};

/// Reserved renderer name of the world background light.
pub const WORLD_BACKGROUND_LIGHT_NAME: &str = "__WORLD_BACKGROUND_LIGHT__";

/// Suns with a smaller angular half-size (degrees) are exported as sharp distant lights.
const SHARP_DISTANT_THETA: f64 = 0.05;

type Definitions = Vec<(&'static str, PropertyValue)>;

/// Convert one lamp object; failures are logged and yield `(empty, None)`.
pub fn convert_lamp(
    obj: &Object,
    scene: &Scene,
    context: Option<&ViewContext>,
    luxcore_scene: &mut dyn RendererScene,
    images: &ImageCache,
) -> (PropertySet, Option<ExportedEntity>) {
    match try_convert_lamp(obj, scene, context, luxcore_scene, images) {
        Ok((props, exported)) => (props, Some(exported)),
        Err(error) => {
            log::error!("Light export failed for \"{}\": {error}", obj.name);
            (PropertySet::new(), None)
        }
    }
}

pub fn try_convert_lamp(
    obj: &Object,
    scene: &Scene,
    context: Option<&ViewContext>,
    luxcore_scene: &mut dyn RendererScene,
    images: &ImageCache,
) -> ExportResult<(PropertySet, ExportedEntity)> {
    let lamp = obj
        .lamp()
        .ok_or_else(|| ExportError::NotALamp(obj.name.clone()))?;
    log::debug!("Converting lamp \"{}\"", obj.name);

    let luxcore_name = get_unique_luxcore_name(obj);
    let matrix = obj.matrix_world;

    let common = convert_common_props(&lamp.common);
    let mut definitions = common.definitions();

    match &lamp.kind {
        LampKind::Point(point) => {
            if point.image.is_some() || point.iesfile.is_some() {
                definitions.push(("type", "mappoint".into()));
                if let Some(image) = &point.image {
                    definitions.push(("mapfile", image_path(image, scene, images)?));
                    definitions.push(("gamma", point.gamma.into()));
                }
                if let Some(iesfile) = &point.iesfile {
                    definitions.push(("iesfile", iesfile.as_str().into()));
                    definitions.push(("flipz", point.flipz.into()));
                }
            } else {
                definitions.push(("type", "point".into()));
            }

            push_emission(&mut definitions, point.emission);
            // Position comes from the transformation
            definitions.push(("position", [0.0, 0.0, 0.0].into()));
            definitions.push(("transformation", matrix_to_list(matrix, scene, true, false).into()));
        }
        LampKind::Sun(sun) => {
            let sun_dir = calc_sun_dir(matrix);
            let distant_dir = [-sun_dir[0], -sun_dir[1], -sun_dir[2]];

            match sun.sun_type {
                SunType::Sun => {
                    definitions.push(("type", "sun".into()));
                    definitions.push(("dir", sun_dir.into()));
                    definitions.push(("turbidity", sun.turbidity.into()));
                    definitions.push(("relsize", sun.relsize.into()));
                }
                SunType::Distant if sun.theta < SHARP_DISTANT_THETA => {
                    definitions.push(("type", "sharpdistant".into()));
                    definitions.push(("direction", distant_dir.into()));
                }
                SunType::Distant => {
                    definitions.push(("type", "distant".into()));
                    definitions.push(("direction", distant_dir.into()));
                    definitions.push(("theta", sun.theta.into()));
                }
            }
        }
        LampKind::Spot(spot) => {
            let coneangle = spot.spot_size.to_degrees() / 2.0;
            let conedeltaangle = (spot.spot_size / 2.0 * spot.spot_blend).to_degrees();

            match &spot.image {
                Some(image) => {
                    definitions.push(("type", "projection".into()));
                    definitions.push(("fov", (coneangle * 2.0).into()));
                    definitions.push(("mapfile", image_path(image, scene, images)?));
                    definitions.push(("gamma", spot.gamma.into()));
                }
                None => {
                    definitions.push(("type", "spot".into()));
                    definitions.push(("coneangle", coneangle.into()));
                    definitions.push(("conedeltaangle", conedeltaangle.into()));
                }
            }

            push_emission(&mut definitions, spot.emission);
            push_directed_transform(&mut definitions, matrix, scene);
        }
        LampKind::Hemi(hemi) => match &hemi.image {
            Some(image) => convert_infinite(
                &mut definitions,
                image,
                hemi.gamma,
                hemi.sample_upper_hemisphere_only,
                matrix,
                scene,
                images,
            )?,
            None => definitions.push(("type", "constantinfinite".into())),
        },
        LampKind::Area(area) if area.is_laser => {
            definitions.push(("type", "laser".into()));
            definitions.push(("radius", (area.size / 2.0 * get_worldscale(scene)).into()));
            push_emission(&mut definitions, area.emission);
            push_directed_transform(&mut definitions, matrix, scene);
        }
        LampKind::Area(area) => {
            return convert_area_lamp(obj, area, scene, context, luxcore_scene, &common);
        }
    }

    let prefix = format!("scene.lights.{luxcore_name}.");
    let props = create_props(&prefix, definitions);
    Ok((props, ExportedEntity::Light(ExportedLight::new(luxcore_name))))
}

/// Convert the world background light; failures are logged and yield empty properties.
pub fn convert_world(world: &World, scene: &Scene, images: &ImageCache) -> PropertySet {
    match try_convert_world(world, scene, images) {
        Ok(props) => props,
        Err(error) => {
            log::error!("World export failed for \"{}\": {error}", world.name);
            PropertySet::new()
        }
    }
}

pub fn try_convert_world(world: &World, scene: &Scene, images: &ImageCache) -> ExportResult<PropertySet> {
    let mut definitions = convert_common_props(&world.common).definitions();

    match &world.background {
        WorldBackground::Sky2 {
            ground_enable,
            ground_color,
            groundalbedo,
            sun,
            turbidity,
        } => {
            definitions.push(("type", "sky2".into()));
            definitions.push(("ground.enable", (*ground_enable).into()));
            definitions.push(("ground.color", (*ground_color).into()));
            definitions.push(("groundalbedo", (*groundalbedo).into()));

            let sun_obj = sun.as_deref().and_then(|name| scene.object(name));
            if let Some(sun_obj) = sun_obj {
                definitions.push(("dir", calc_sun_dir(sun_obj.matrix_world).into()));
            }

            // A linked sun lamp drives turbidity so the two never drift apart
            let sun_turbidity = sun_obj.and_then(|o| o.lamp()).and_then(|lamp| match &lamp.kind {
                LampKind::Sun(sun) => Some(sun.turbidity),
                _ => None,
            });
            definitions.push(("turbidity", sun_turbidity.unwrap_or(*turbidity).into()));
        }
        WorldBackground::Infinite {
            image: Some(image),
            gamma,
            sample_upper_hemisphere_only,
            rotation,
        } => {
            convert_infinite(
                &mut definitions,
                image,
                *gamma,
                *sample_upper_hemisphere_only,
                DMat4::from_rotation_z(*rotation),
                scene,
                images,
            )?;
        }
        WorldBackground::Infinite { image: None, .. } | WorldBackground::Constant => {
            definitions.push(("type", "constantinfinite".into()));
        }
    }

    let prefix = format!("scene.lights.{WORLD_BACKGROUND_LIGHT_NAME}.");
    Ok(create_props(&prefix, definitions))
}

/// Gain, sample count and importance shared by all lights.
struct CommonProps {
    gain: [f64; 3],
    samples: i32,
    importance: f64,
}

impl CommonProps {
    fn definitions(&self) -> Definitions {
        vec![
            ("gain", self.gain.into()),
            ("samples", self.samples.into()),
            ("importance", self.importance.into()),
        ]
    }
}

fn convert_common_props(common: &LightCommon) -> CommonProps {
    CommonProps {
        gain: common.rgb_gain.map(|c| c * common.gain),
        samples: common.samples,
        importance: common.importance,
    }
}

fn push_emission(definitions: &mut Definitions, emission: Emission) {
    definitions.push(("efficency", emission.efficacy.into()));
    definitions.push(("power", emission.power.into()));
}

/// Position/target pointing down local -Z, with the roll fix that aligns the
/// renderer's spot orientation with the host's.
fn push_directed_transform(definitions: &mut Definitions, matrix: DMat4, scene: &Scene) {
    definitions.push(("position", [0.0, 0.0, 0.0].into()));
    definitions.push(("target", [0.0, 0.0, -1.0].into()));
    let spot_fix = DMat4::from_rotation_z((-90.0f64).to_radians());
    definitions.push((
        "transformation",
        matrix_to_list(matrix * spot_fix, scene, true, false).into(),
    ));
}

fn image_path(image: &Image, scene: &Scene, images: &ImageCache) -> ExportResult<PropertyValue> {
    let path = images.export(image, scene)?;
    Ok(path.to_string_lossy().into_owned().into())
}

fn convert_infinite(
    definitions: &mut Definitions,
    image: &Image,
    gamma: f64,
    sample_upper_hemisphere_only: bool,
    transformation: DMat4,
    scene: &Scene,
    images: &ImageCache,
) -> ExportResult<()> {
    definitions.push(("type", "infinite".into()));
    definitions.push(("file", image_path(image, scene, images)?));
    definitions.push(("gamma", gamma.into()));
    definitions.push(("sampleupperhemisphereonly", sample_upper_hemisphere_only.into()));

    // Mirror the map so it matches the host's environment orientation
    let infinite_fix = DMat4::from_scale(DVec3::new(-1.0, 1.0, 1.0));
    definitions.push((
        "transformation",
        matrix_to_list(infinite_fix * transformation.inverse(), scene, false, false).into(),
    ));
    Ok(())
}

/// Area lamp as a two-triangle quad with a black, emissive matte material.
fn convert_area_lamp(
    obj: &Object,
    area: &AreaLamp,
    scene: &Scene,
    context: Option<&ViewContext>,
    luxcore_scene: &mut dyn RendererScene,
    common: &CommonProps,
) -> ExportResult<(PropertySet, ExportedEntity)> {
    let luxcore_name = get_unique_luxcore_name(obj);
    let mut props = PropertySet::new();

    let mat_name = format!("{luxcore_name}_AREA_LIGHT_MAT");
    let mat_definitions: Definitions = vec![
        ("type", "matte".into()),
        // Black base so the emitter does not bounce light
        ("kd", [0.0, 0.0, 0.0].into()),
        // Color comes from the gain
        ("emission", [1.0, 1.0, 1.0].into()),
        ("emission.gain", common.gain.into()),
        ("emission.power", area.emission.power.into()),
        ("emission.efficency", area.emission.efficacy.into()),
        ("emission.samples", common.samples.into()),
        ("importance", common.importance.into()),
    ];
    props.set_all(&create_props(
        &format!("scene.materials.{mat_name}."),
        mat_definitions,
    ));

    let half_y = match area.shape {
        AreaShape::Rectangle => area.size_y / 2.0,
        AreaShape::Square => area.size / 2.0,
    };
    let scale = DMat4::from_scale(DVec3::new(area.size / 2.0, half_y, 1.0));
    let transform = matrix_to_list(obj.matrix_world * scale, scene, true, false);

    // Final renders bake the transform into the vertices; the viewport keeps
    // it on the object so the lamp can be moved interactively
    let shape_transform = match context {
        Some(_) => None,
        None => Some(transform.clone()),
    };

    let shape_name = format!("Mesh-{luxcore_name}");
    if !luxcore_scene.is_mesh_defined(&shape_name) {
        luxcore_scene.define_mesh(MeshDefinition::unit_quad(&shape_name, shape_transform))?;
    }

    let mut obj_definitions: Definitions = vec![
        ("material", mat_name.into()),
        ("shape", shape_name.into()),
    ];
    if context.is_some() {
        obj_definitions.push(("transformation", transform.into()));
    }
    props.set_all(&create_props(
        &format!("scene.objects.{luxcore_name}."),
        obj_definitions,
    ));

    Ok((
        props,
        ExportedEntity::Object(ExportedObject::new(vec![luxcore_name])),
    ))
}
