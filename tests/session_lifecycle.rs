//! Render session lifecycle tests.
//!
//! Drive [`RenderEngine`] and [`Exporter`] through final and viewport renders
//! against the dummy renderer and check which sessions are created, edited,
//! replaced and stopped.

mod common;

use std::f64::consts::FRAC_PI_2;
use std::sync::Arc;

use glam::{DMat4, DVec3};
use rstest::rstest;

use common::{engine, fast_config, init_logging, test_scene, viewport, RecordingHost};
use luxcore_bridge::backend::dummy::{DummyEvent, DummyRenderer};
use luxcore_bridge::resources::ImageCache;
use luxcore_bridge::scene::{HaltSettings, UnitSettings, UnitSystem, World, WorldBackground};
use luxcore_bridge::{Change, EngineError, EngineState, Exporter, Severity};

// ============================================================================
// Final render
// ============================================================================

#[test]
fn final_render_runs_until_halt() {
    init_logging();
    let renderer = Arc::new(DummyRenderer::new().with_pass_per_update(16));
    let log = renderer.log();
    let mut engine = engine(&renderer);
    let mut host = RecordingHost::new();
    let mut scene = test_scene();
    scene.render.halt = HaltSettings {
        enabled: true,
        samples: Some(64),
        ..Default::default()
    };

    engine.update(&scene, &mut host);
    assert_eq!(engine.state(), EngineState::SessionCreated);
    let id = engine.session_id().unwrap();

    engine.render(&scene, &mut host).unwrap();

    assert_eq!(engine.state(), EngineState::Idle);
    assert!(engine.session_id().is_none());
    assert_eq!(log.count(|e| *e == DummyEvent::UpdateStats(id)), 4);
    assert_eq!(log.count(|e| *e == DummyEvent::Stop(id)), 1);
    // Initial draw, one per refresh, final draw
    assert_eq!(host.draws.get(), 6);
    assert_eq!(host.error_log.as_deref(), Some(""));
    assert!(host.errors.is_empty());
}

#[test]
fn cancelled_render_stops_session() {
    let renderer = Arc::new(DummyRenderer::new());
    let log = renderer.log();
    let mut engine = engine(&renderer);
    let mut host = RecordingHost::cancelling_after(2);
    let scene = test_scene();

    engine.update(&scene, &mut host);
    engine.render(&scene, &mut host).unwrap();

    assert_eq!(log.count(|e| matches!(e, DummyEvent::UpdateStats(_))), 2);
    assert_eq!(log.count(|e| matches!(e, DummyEvent::Stop(_))), 1);
    assert!(engine.exporter().live_session().is_none());
}

#[test]
fn export_error_is_surfaced_by_render() {
    let renderer = Arc::new(DummyRenderer::new());
    renderer.fail_sessions(true);
    let mut engine = engine(&renderer);
    let mut host = RecordingHost::new();
    let scene = test_scene();

    engine.update(&scene, &mut host);
    assert_eq!(engine.state(), EngineState::Error);
    assert!(engine.deferred_error().is_some());
    assert!(host.errors.is_empty());

    let result = engine.render(&scene, &mut host);
    assert!(matches!(result, Err(EngineError::Export(_))));
    assert!(engine.deferred_error().is_none());
    assert_eq!(engine.state(), EngineState::Idle);
    assert_eq!(host.errors.len(), 1);
    assert_eq!(host.reports.len(), 1);
    assert_eq!(host.reports[0].0, Severity::Error);
    assert_eq!(host.error_log.as_deref(), Some(host.errors[0].as_str()));
}

#[test]
fn render_without_export_reports_missing_session() {
    let renderer = Arc::new(DummyRenderer::new());
    let mut engine = engine(&renderer);
    let mut host = RecordingHost::new();

    let result = engine.render(&test_scene(), &mut host);
    assert!(matches!(result, Err(EngineError::NoSession)));
    assert_eq!(host.errors, vec!["no render session".to_string()]);
}

#[test]
fn preview_render_halts_on_preview_samples() {
    let renderer = Arc::new(DummyRenderer::new().with_pass_per_update(8));
    let log = renderer.log();
    let mut engine = engine(&renderer);
    engine.set_preview(true);
    let mut host = RecordingHost::new();
    let scene = test_scene();

    engine.update(&scene, &mut host);
    engine.render(&scene, &mut host).unwrap();

    // Default preview halt is 32 samples
    assert_eq!(log.count(|e| matches!(e, DummyEvent::UpdateStats(_))), 4);
}

// ============================================================================
// Exporter update
// ============================================================================

#[rstest]
#[case::camera_only(Change::CAMERA, true)]
#[case::object_only(Change::OBJECT, true)]
#[case::config(Change::CONFIG, false)]
#[case::config_and_camera(Change::CONFIG | Change::CAMERA, false)]
fn update_keeps_or_replaces_session(#[case] changes: Change, #[case] same_session: bool) {
    let renderer = Arc::new(DummyRenderer::new());
    let log = renderer.log();
    let mut exporter = Exporter::new(renderer.clone(), Arc::new(ImageCache::open()), fast_config());
    let scene = test_scene();
    let ctx = viewport();

    let mut session = exporter.create_session(&scene, Some(&ctx)).unwrap();
    session.start().unwrap();
    let old_id = session.id();

    let session = exporter.update(&scene, Some(&ctx), session, changes).unwrap();

    assert_eq!(session.id() == old_id, same_session);
    assert!(session.is_started());
    assert_eq!(exporter.live_session(), Some(session.id()));
    if !same_session {
        assert_eq!(log.count(|e| *e == DummyEvent::Stop(old_id)), 1);
    }
}

#[test]
fn moved_lamp_is_edited_in_place() {
    let renderer = Arc::new(DummyRenderer::new());
    let log = renderer.log();
    let mut exporter = Exporter::new(renderer.clone(), Arc::new(ImageCache::open()), fast_config());
    let mut scene = test_scene();
    let ctx = viewport();

    let mut session = exporter.create_session(&scene, Some(&ctx)).unwrap();
    session.start().unwrap();

    scene.objects[1].matrix_world = DMat4::from_translation(DVec3::new(5.0, 0.0, 0.0));
    let changes = exporter.get_changes(&scene, Some(&ctx));
    assert_eq!(changes, Change::OBJECT);

    let mut session = exporter.update(&scene, Some(&ctx), session, changes).unwrap();
    let transform = session
        .scene_mut()
        .properties()
        .get("scene.lights.PointLAMPPOINT.transformation")
        .and_then(|v| v.as_floats())
        .map(|v| v.to_vec())
        .unwrap();
    assert_eq!(transform[12], 5.0);
    assert_eq!(log.count(|e| matches!(e, DummyEvent::BeginSceneEdit(_))), 1);
    assert_eq!(log.count(|e| *e == DummyEvent::DeleteLight("PointLAMPPOINT".into())), 1);
    assert_eq!(exporter.get_changes(&scene, Some(&ctx)), Change::empty());
}

#[test]
fn hidden_lamp_is_deleted_from_session() {
    let renderer = Arc::new(DummyRenderer::new());
    let log = renderer.log();
    let mut exporter = Exporter::new(renderer.clone(), Arc::new(ImageCache::open()), fast_config());
    let mut scene = test_scene();
    let ctx = viewport();

    let mut session = exporter.create_session(&scene, Some(&ctx)).unwrap();
    session.start().unwrap();

    scene.objects[3].hide = true;
    let changes = exporter.get_changes(&scene, Some(&ctx));
    let mut session = exporter.update(&scene, Some(&ctx), session, changes).unwrap();

    assert_eq!(log.count(|e| *e == DummyEvent::DeleteObject("PanelLAMPAREA".into())), 1);
    assert!(exporter.exported("PanelLAMPAREA").is_none());
    assert!(session
        .scene_mut()
        .properties()
        .get_all_with_prefix("scene.objects.PanelLAMPAREA.")
        .is_empty());
}

#[test]
fn sky_follows_its_moved_sun_lamp() {
    let renderer = Arc::new(DummyRenderer::new());
    let mut exporter = Exporter::new(renderer.clone(), Arc::new(ImageCache::open()), fast_config());
    let mut scene = test_scene();
    scene.world = Some(World::new(
        "World",
        WorldBackground::Sky2 {
            ground_enable: false,
            ground_color: [0.5, 0.5, 0.5],
            groundalbedo: [0.5, 0.5, 0.5],
            sun: Some("Sun".to_string()),
            turbidity: 2.2,
        },
    ));
    let ctx = viewport();
    let sky_dir = "scene.lights.__WORLD_BACKGROUND_LIGHT__.dir";

    let mut session = exporter.create_session(&scene, Some(&ctx)).unwrap();
    session.start().unwrap();

    scene.objects[2].matrix_world = DMat4::from_rotation_x(FRAC_PI_2);
    let changes = exporter.get_changes(&scene, Some(&ctx));
    assert_eq!(changes, Change::OBJECT);

    let mut session = exporter.update(&scene, Some(&ctx), session, changes).unwrap();
    let dir = session
        .scene_mut()
        .properties()
        .get(sky_dir)
        .and_then(|v| v.as_floats())
        .map(|v| v.to_vec())
        .unwrap();
    let expected = DMat4::from_rotation_x(FRAC_PI_2).transform_vector3(DVec3::Z);
    assert!((DVec3::from_slice(&dir) - expected).length() < 1e-9);
    assert_eq!(exporter.get_changes(&scene, Some(&ctx)), Change::empty());
}

#[test]
fn unit_scale_change_rebuilds_session() {
    let renderer = Arc::new(DummyRenderer::new());
    let mut exporter = Exporter::new(renderer.clone(), Arc::new(ImageCache::open()), fast_config());
    let mut scene = test_scene();
    let ctx = viewport();

    let session = exporter.create_session(&scene, Some(&ctx)).unwrap();
    let old_id = session.id();

    scene.unit_settings = UnitSettings {
        system: UnitSystem::Metric,
        scale_length: 0.01,
    };
    let changes = exporter.get_changes(&scene, Some(&ctx));
    assert!(changes.contains(Change::CONFIG));

    let mut session = exporter.update(&scene, Some(&ctx), session, changes).unwrap();
    assert_ne!(session.id(), old_id);
    let transform = session
        .scene_mut()
        .properties()
        .get("scene.lights.PointLAMPPOINT.transformation")
        .and_then(|v| v.as_floats())
        .map(|v| v.to_vec())
        .unwrap();
    assert!((transform[0] - 0.01).abs() < 1e-12);
}

// ============================================================================
// Viewport
// ============================================================================

#[test]
fn viewport_session_lifecycle() {
    init_logging();
    let renderer = Arc::new(DummyRenderer::new());
    let log = renderer.log();
    let mut engine = engine(&renderer);
    let mut host = RecordingHost::new();
    let scene = test_scene();
    let ctx = viewport();

    engine.view_update(&scene, &ctx, &mut host);
    assert_eq!(engine.state(), EngineState::Rendering);
    let first = engine.session_id().unwrap();
    assert_eq!(log.count(|e| *e == DummyEvent::Start(first)), 1);

    // Nothing changed: same session, one new frame pulled
    engine.view_draw(&scene, &ctx, &mut host);
    assert_eq!(engine.session_id(), Some(first));
    assert_eq!(log.count(|e| *e == DummyEvent::WaitNewFrame(first)), 1);
    assert_eq!(host.updates.get(), 1);

    // Orbit: camera edited in place
    let orbited = ctx.with_view_matrix(DMat4::from_rotation_z(0.3));
    engine.view_draw(&scene, &orbited, &mut host);
    assert_eq!(engine.session_id(), Some(first));
    assert_eq!(log.count(|e| *e == DummyEvent::EndSceneEdit(first)), 1);

    // Resize: new session, new frame buffer
    let buffers = host.frame_buffers;
    let resized = luxcore_bridge::scene::ViewContext {
        region: luxcore_bridge::scene::Region {
            width: 128,
            height: 48,
        },
        ..orbited
    };
    engine.view_draw(&scene, &resized, &mut host);
    let second = engine.session_id().unwrap();
    assert_ne!(second, first);
    assert_eq!(log.count(|e| *e == DummyEvent::Stop(first)), 1);
    assert_eq!(log.count(|e| *e == DummyEvent::Start(second)), 1);
    assert_eq!(host.frame_buffers, buffers + 1);
}

#[test]
fn viewport_creation_failure_leaves_engine_idle() {
    let renderer = Arc::new(DummyRenderer::new());
    renderer.fail_sessions(true);
    let mut engine = engine(&renderer);
    let mut host = RecordingHost::new();

    engine.view_update(&test_scene(), &viewport(), &mut host);

    assert!(engine.session_id().is_none());
    assert_eq!(engine.state(), EngineState::Idle);
    assert_eq!(host.last_stats().map(|s| s.0.as_str()), Some("Error: "));

    // Drawing without a session is a no-op
    engine.view_draw(&test_scene(), &viewport(), &mut host);
    assert_eq!(host.redraws, 0);
}

#[test]
fn dropping_engine_stops_live_session() {
    let renderer = Arc::new(DummyRenderer::new());
    let log = renderer.log();
    let mut host = RecordingHost::new();

    {
        let mut engine = engine(&renderer);
        engine.view_update(&test_scene(), &viewport(), &mut host);
        assert!(engine.session_id().is_some());
    }

    assert_eq!(log.count(|e| matches!(e, DummyEvent::Stop(_))), 1);
}
