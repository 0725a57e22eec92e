//! Renderer configuration (engine, film, halt) per render mode

use super::RenderMode;
use crate::math::calc_filmsize;
use crate::properties::PropertySet;
use crate::scene::{Scene, ViewContext};
use crate::BridgeConfig;

/// Build the session configuration for `mode`.
pub fn convert(
    scene: &Scene,
    context: Option<&ViewContext>,
    mode: RenderMode,
    config: &BridgeConfig,
) -> PropertySet {
    let mut props = PropertySet::new();

    let engine = match mode {
        RenderMode::Final => &config.final_engine,
        RenderMode::Viewport => &config.viewport_engine,
        RenderMode::Preview => &config.preview_engine,
    };
    props.insert("renderengine.type", engine.as_str());

    let (width, height) = calc_filmsize(scene, context);
    props.insert("film.width", width);
    props.insert("film.height", height);
    props.insert("film.outputs.0.type", "RGB_IMAGEPIPELINE");
    props.insert("film.outputs.0.filename", "RGB_IMAGEPIPELINE.png");

    match mode {
        RenderMode::Final => {
            let halt = &scene.render.halt;
            if halt.enabled {
                if let Some(samples) = halt.samples {
                    props.insert("batch.haltspp", samples);
                }
                if let Some(time) = halt.time_secs {
                    props.insert("batch.halttime", time);
                }
                if let Some(threshold) = halt.noise_threshold {
                    props.insert("batch.haltthreshold", threshold);
                }
            }
        }
        RenderMode::Viewport => {
            if let Some(samples) = config.viewport_halt_samples {
                props.insert("batch.haltspp", samples);
            }
        }
        RenderMode::Preview => {
            if let Some(samples) = config.preview_halt_samples {
                props.insert("batch.haltspp", samples);
            }
        }
    }

    log::trace!("Render config for {:?}:\n{}", mode, props);
    props
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scene::HaltSettings;

    #[test]
    fn final_config_uses_scene_resolution_and_halt() {
        let mut scene = Scene::default();
        scene.render.resolution_percentage = 50;
        scene.render.halt = HaltSettings {
            enabled: true,
            samples: Some(256),
            time_secs: None,
            noise_threshold: Some(0.02),
        };

        let props = convert(&scene, None, RenderMode::Final, &BridgeConfig::default());
        assert_eq!(
            props.get("renderengine.type").and_then(|v| v.as_str()),
            Some("PATHCPU")
        );
        assert_eq!(props.get("film.width").and_then(|v| v.as_f64()), Some(960.0));
        assert_eq!(props.get("film.height").and_then(|v| v.as_f64()), Some(540.0));
        assert_eq!(props.get("batch.haltspp").and_then(|v| v.as_f64()), Some(256.0));
        assert!(!props.contains("batch.halttime"));
        assert_eq!(
            props.get("batch.haltthreshold").and_then(|v| v.as_f64()),
            Some(0.02)
        );
    }

    #[test]
    fn disabled_halt_is_not_exported() {
        let mut scene = Scene::default();
        scene.render.halt.samples = Some(64);
        let props = convert(&scene, None, RenderMode::Final, &BridgeConfig::default());
        assert!(!props.contains("batch.haltspp"));
    }

    #[test]
    fn viewport_config_follows_region() {
        let ctx = ViewContext::new(800, 600);
        let config = BridgeConfig::default().with_viewport_halt_samples(Some(32));
        let props = convert(&Scene::default(), Some(&ctx), RenderMode::Viewport, &config);
        assert_eq!(
            props.get("renderengine.type").and_then(|v| v.as_str()),
            Some("RTPATHCPU")
        );
        assert_eq!(props.get("film.width").and_then(|v| v.as_f64()), Some(800.0));
        assert_eq!(props.get("film.height").and_then(|v| v.as_f64()), Some(600.0));
        assert_eq!(props.get("batch.haltspp").and_then(|v| v.as_f64()), Some(32.0));
    }
}
