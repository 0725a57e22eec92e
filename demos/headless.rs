//! Headless render demo
//!
//! Exports a small scene to the in-memory dummy renderer, runs a final render
//! until its halt condition and writes the film as a PNG.
//!
//! ```bash
//! cargo run --example headless -- --samples 128 --output film.png
//! ```

use std::cell::RefCell;
use std::path::PathBuf;
use std::rc::Rc;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use glam::{DMat4, DVec3};
use luxcore_bridge::backend::dummy::DummyRenderer;
use luxcore_bridge::backend::RenderSession;
use luxcore_bridge::scene::{
    AreaLamp, AreaShape, CameraData, HaltSettings, Lamp, LampKind, Object, ObjectData, PointLamp,
    Scene, SunLamp, SunType, ViewContext, World, WorldBackground,
};
use luxcore_bridge::{
    BridgeConfig, EngineResult, FilmBuffer, FrameBuffer, ImageCache, RenderEngine, RenderHost,
    Severity,
};

/// Headless LuxCore bridge render.
#[derive(Parser, Debug)]
#[command(name = "headless", about = "Render a demo scene with the dummy renderer")]
struct Args {
    /// Film width in pixels
    #[arg(long, default_value_t = 320)]
    width: u32,

    /// Film height in pixels
    #[arg(long, default_value_t = 180)]
    height: u32,

    /// Samples per pixel after which the render halts
    #[arg(long, default_value_t = 64)]
    samples: u64,

    /// Where to write the final film
    #[arg(long)]
    output: Option<PathBuf>,
}

/// Shares the drawn film with the host after the render
struct SharedFilm(Rc<RefCell<FilmBuffer>>);

impl FrameBuffer for SharedFilm {
    fn update(&mut self, session: &dyn RenderSession) -> EngineResult<()> {
        self.0.borrow_mut().update(session)
    }

    fn draw(&mut self, session: &dyn RenderSession) -> EngineResult<()> {
        self.0.borrow_mut().draw(session)
    }
}

/// Host printing everything to the log and keeping the last film
#[derive(Default)]
struct ConsoleHost {
    film: Rc<RefCell<FilmBuffer>>,
}

impl RenderHost for ConsoleHost {
    fn update_stats(&mut self, stats: &str, info: &str) {
        log::info!("{stats} {info}");
    }

    fn report(&mut self, severity: Severity, message: &str) {
        match severity {
            Severity::Info => log::info!("{message}"),
            Severity::Warning => log::warn!("{message}"),
            Severity::Error => log::error!("{message}"),
        }
    }

    fn error_set(&mut self, message: &str) {
        log::error!("Render error: {message}");
    }

    fn set_error_log(&mut self, message: &str) {
        if !message.is_empty() {
            log::error!("Error log: {message}");
        }
    }

    fn test_break(&mut self) -> bool {
        false
    }

    fn tag_redraw(&mut self) {}

    fn create_frame_buffer(
        &mut self,
        _scene: &Scene,
        _context: Option<&ViewContext>,
    ) -> Box<dyn FrameBuffer> {
        Box::new(SharedFilm(self.film.clone()))
    }
}

fn demo_scene(args: &Args) -> Scene {
    let mut scene = Scene::new("Demo");
    scene.render.resolution_x = args.width;
    scene.render.resolution_y = args.height;
    scene.render.halt = HaltSettings {
        enabled: true,
        samples: Some(args.samples),
        ..Default::default()
    };

    let camera = DMat4::look_at_rh(DVec3::new(7.0, -6.0, 5.0), DVec3::ZERO, DVec3::Z).inverse();
    scene
        .add_object(
            Object::new("Camera", ObjectData::Camera(CameraData::perspective(40.0)))
                .with_matrix(camera),
        )
        .add_object(
            Object::new(
                "Key",
                ObjectData::Lamp(Lamp::new(LampKind::Area(AreaLamp {
                    shape: AreaShape::Rectangle,
                    size: 2.0,
                    size_y: 1.0,
                    ..Default::default()
                }))),
            )
            .with_matrix(DMat4::from_translation(DVec3::new(0.0, 0.0, 4.0))),
        )
        .add_object(
            Object::new(
                "Fill",
                ObjectData::Lamp(Lamp::new(LampKind::Point(PointLamp::default()))),
            )
            .with_matrix(DMat4::from_translation(DVec3::new(-3.0, 2.0, 2.0))),
        )
        .add_object(Object::new(
            "Sun",
            ObjectData::Lamp(Lamp::new(LampKind::Sun(SunLamp {
                sun_type: SunType::Sun,
                ..Default::default()
            }))),
        ));
    scene.camera = Some("Camera".to_string());
    scene.world = Some(World::new(
        "World",
        WorldBackground::Sky2 {
            ground_enable: true,
            ground_color: [0.5, 0.5, 0.5],
            groundalbedo: [0.5, 0.5, 0.5],
            sun: Some("Sun".to_string()),
            turbidity: 2.2,
        },
    ));
    scene
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();

    let renderer = Arc::new(DummyRenderer::new());
    log::info!("Using {}", renderer.name());

    let images = Arc::new(ImageCache::open());
    let config = BridgeConfig::default()
        .with_poll_interval(Duration::from_millis(5))
        .with_refresh_interval(Duration::from_millis(50));

    let scene = demo_scene(&args);
    let mut host = ConsoleHost::default();

    {
        let mut engine = RenderEngine::new(renderer.clone(), images.clone(), config);
        engine.update(&scene, &mut host);
        if let Err(error) = engine.render(&scene, &mut host) {
            log::error!("Render failed: {error}");
        }
        for diagnostic in engine.exporter().diagnostics() {
            log::warn!("{}: {}", diagnostic.entity, diagnostic.message);
        }
    }

    if let Some(path) = &args.output {
        let film = host.film.borrow();
        if film.draw_count() == 0 {
            log::error!("No film was drawn");
        } else {
            match film.save_png(path) {
                Ok(()) => log::info!("Wrote {}", path.display()),
                Err(error) => log::error!("Could not save film: {error}"),
            }
        }
    }

    images.cleanup();
}
