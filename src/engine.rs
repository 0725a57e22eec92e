//! Render session lifecycle controller
//!
//! [`RenderEngine`] is the host-facing side of the bridge. Final and preview
//! renders go through [`RenderEngine::update`] (export) followed by
//! [`RenderEngine::render`] (blocking poll loop). Viewport renders are driven
//! by the host's redraw events through [`RenderEngine::view_update`] and
//! [`RenderEngine::view_draw`].

use crate::backend::{RenderSession, RenderStats, Renderer, SessionId};
use crate::display::FrameBuffer;
use crate::error::{EngineError, EngineResult};
use crate::export::{Change, Exporter, RenderMode};
use crate::resources::ImageCache;
use crate::scene::{HaltSettings, Scene, ViewContext};
use crate::BridgeConfig;
use std::sync::Arc;
use std::thread;
use std::time::Instant;

/// Severity of a message reported to the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Info,
    Warning,
    Error,
}

/// Status, error and display sinks of the host application.
pub trait RenderHost {
    /// Status line shown while rendering.
    fn update_stats(&mut self, stats: &str, info: &str);

    fn report(&mut self, severity: Severity, message: &str);

    /// Error shown in the render result.
    fn error_set(&mut self, message: &str);

    /// Error log attached to the scene; an empty message clears it.
    fn set_error_log(&mut self, message: &str);

    /// Whether the user asked to cancel the render.
    fn test_break(&mut self) -> bool;

    /// Request another viewport redraw.
    fn tag_redraw(&mut self);

    /// Display buffer for a final render (`None`) or a viewport region.
    fn create_frame_buffer(
        &mut self,
        scene: &Scene,
        context: Option<&ViewContext>,
    ) -> Box<dyn FrameBuffer>;
}

/// Lifecycle state of the controller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EngineState {
    #[default]
    Idle,
    Exporting,
    SessionCreated,
    Started,
    Rendering,
    Stopped,
    Error,
}

/// Whether a final render may stop on its own.
pub fn halt_condition_met(halt: &HaltSettings, stats: &RenderStats) -> bool {
    if !halt.enabled {
        return false;
    }

    let samples_reached = halt.samples.is_some_and(|samples| stats.pass >= samples);
    let time_reached = halt.time_secs.is_some_and(|time| stats.elapsed_secs >= time);
    let noise_reached = halt
        .noise_threshold
        .is_some_and(|threshold| 1.0 - stats.convergence <= threshold);

    samples_reached || time_reached || noise_reached
}

fn format_stats(stats: &RenderStats) -> String {
    format!(
        "Pass {} | {:.1}s | {:.0} samples/s",
        stats.pass, stats.elapsed_secs, stats.samples_per_sec
    )
}

/// Drives one render session at a time on behalf of the host.
pub struct RenderEngine {
    exporter: Exporter,
    session: Option<Box<dyn RenderSession>>,
    framebuffer: Option<Box<dyn FrameBuffer>>,
    state: EngineState,
    /// Export error waiting to be surfaced by the next `render`.
    error: Option<EngineError>,
}

impl RenderEngine {
    pub fn new(renderer: Arc<dyn Renderer>, images: Arc<ImageCache>, config: BridgeConfig) -> Self {
        Self::with_exporter(Exporter::new(renderer, images, config))
    }

    pub fn with_exporter(exporter: Exporter) -> Self {
        Self {
            exporter,
            session: None,
            framebuffer: None,
            state: EngineState::Idle,
            error: None,
        }
    }

    /// Render material previews instead of final frames.
    pub fn set_preview(&mut self, preview: bool) {
        self.exporter.set_preview(preview);
    }

    pub fn state(&self) -> EngineState {
        self.state
    }

    pub fn session_id(&self) -> Option<SessionId> {
        self.session.as_ref().map(|session| session.id())
    }

    pub fn exporter(&self) -> &Exporter {
        &self.exporter
    }

    pub fn deferred_error(&self) -> Option<&EngineError> {
        self.error.as_ref()
    }

    /// Export `scene` for a final render.
    ///
    /// Failures are kept and surfaced by the next [`RenderEngine::render`].
    pub fn update(&mut self, scene: &Scene, host: &mut dyn RenderHost) {
        assert!(
            self.session.is_none(),
            "update called while a render session is live"
        );

        self.state = EngineState::Exporting;
        host.update_stats("Export", "exporting...");

        match self.exporter.create_session(scene, None) {
            Ok(session) => {
                log::info!("Created render session {:?}", session.id());
                self.session = Some(session);
                self.state = EngineState::SessionCreated;
            }
            Err(error) => {
                log::error!("Export failed: {error}");
                self.error = Some(error.into());
                self.state = EngineState::Error;
            }
        }
    }

    /// Run the exported session until it halts or the host cancels.
    ///
    /// Errors are reported to the host before being returned.
    pub fn render(&mut self, scene: &Scene, host: &mut dyn RenderHost) -> EngineResult<()> {
        host.set_error_log("");

        if let Some(error) = self.error.take() {
            self.fail_render(host, &error);
            return Err(error);
        }

        let Some(mut session) = self.session.take() else {
            let error = EngineError::NoSession;
            self.fail_render(host, &error);
            return Err(error);
        };

        let result = self.drive_final(scene, host, session.as_mut());
        self.exporter.release_session(session);

        match result {
            Ok(()) => {
                self.state = EngineState::Idle;
                Ok(())
            }
            Err(error) => {
                self.fail_render(host, &error);
                Err(error)
            }
        }
    }

    fn drive_final(
        &mut self,
        scene: &Scene,
        host: &mut dyn RenderHost,
        session: &mut dyn RenderSession,
    ) -> EngineResult<()> {
        let config = self.exporter.config().clone();
        let halt = match self.exporter.render_mode(None) {
            RenderMode::Preview => HaltSettings {
                enabled: config.preview_halt_samples.is_some(),
                samples: config.preview_halt_samples,
                ..HaltSettings::default()
            },
            _ => scene.render.halt,
        };

        host.update_stats("Render", "rendering...");
        let mut framebuffer = host.create_frame_buffer(scene, None);
        session.start()?;
        self.state = EngineState::Started;
        framebuffer.draw(session)?;

        self.state = EngineState::Rendering;
        let mut last_refresh = Instant::now();
        let mut done = false;

        while !host.test_break() && !done {
            thread::sleep(config.poll_interval);

            if last_refresh.elapsed() >= config.refresh_interval {
                session.update_stats()?;
                let stats = session.stats();
                done = halt_condition_met(&halt, &stats);
                host.update_stats("Render", &format_stats(&stats));

                framebuffer.draw(session)?;
                last_refresh = Instant::now();
            }
        }

        log::info!(
            "Render {} after {} samples",
            if done { "halted" } else { "cancelled" },
            session.stats().pass
        );

        session.stop()?;
        self.state = EngineState::Stopped;
        framebuffer.draw(session)?;
        self.framebuffer = Some(framebuffer);
        Ok(())
    }

    fn fail_render(&mut self, host: &mut dyn RenderHost, error: &EngineError) {
        self.state = EngineState::Error;
        if let Some(session) = self.session.take() {
            self.exporter.release_session(session);
        }

        let message = error.to_string();
        log::error!("Render failed: {message}");
        host.report(Severity::Error, &message);
        host.error_set(&message);
        host.set_error_log(&message);
        self.state = EngineState::Idle;
    }

    /// Handle a viewport update event.
    ///
    /// Creates and starts a session on first use, afterwards applies whatever
    /// changed since the last update.
    pub fn view_update(&mut self, scene: &Scene, context: &ViewContext, host: &mut dyn RenderHost) {
        self.view_update_with(scene, context, host, None);
    }

    fn view_update_with(
        &mut self,
        scene: &Scene,
        context: &ViewContext,
        host: &mut dyn RenderHost,
        changes: Option<Change>,
    ) {
        let Some(session) = self.session.take() else {
            self.start_viewport_session(scene, context, host);
            return;
        };

        let changes = changes.unwrap_or_else(|| self.exporter.get_changes(scene, Some(context)));
        // A config change hands back a different session
        match self.exporter.update(scene, Some(context), session, changes) {
            Ok(session) => self.session = Some(session),
            Err(error) => self.fail_viewport(host, &error.into()),
        }
    }

    fn start_viewport_session(
        &mut self,
        scene: &Scene,
        context: &ViewContext,
        host: &mut dyn RenderHost,
    ) {
        log::info!("Starting viewport render session");
        host.update_stats("Creating Render Session...", "");
        self.state = EngineState::Exporting;

        let mut session = match self.exporter.create_session(scene, Some(context)) {
            Ok(session) => session,
            Err(error) => return self.fail_viewport(host, &error.into()),
        };
        self.state = EngineState::SessionCreated;

        if let Err(error) = session.start() {
            self.exporter.release_session(session);
            return self.fail_viewport(host, &error.into());
        }

        self.session = Some(session);
        self.state = EngineState::Rendering;
        host.update_stats("Viewport Render", "");
    }

    /// Handle a viewport redraw: apply camera changes, wait for a frame and draw it.
    pub fn view_draw(&mut self, scene: &Scene, context: &ViewContext, host: &mut dyn RenderHost) {
        if self.session.is_none() {
            return;
        }

        if let Err(error) = self.draw_viewport(scene, context, host) {
            self.fail_viewport(host, &error);
        }
    }

    fn draw_viewport(
        &mut self,
        scene: &Scene,
        context: &ViewContext,
        host: &mut dyn RenderHost,
    ) -> EngineResult<()> {
        let changes = self.exporter.get_changes(scene, Some(context));

        if changes.intersects(Change::REQUIRES_VIEW_UPDATE) {
            if changes.contains(Change::CONFIG) {
                // Resized film needs a resized display buffer
                self.framebuffer = Some(host.create_frame_buffer(scene, Some(context)));
            }
            host.tag_redraw();
            self.view_update_with(scene, context, host, Some(changes));
            return Ok(());
        }

        if changes.contains(Change::CAMERA) {
            let session = self.session.take().ok_or(EngineError::NoSession)?;
            self.session = Some(
                self.exporter
                    .update(scene, Some(context), session, Change::CAMERA)?,
            );
        }

        let framebuffer = self
            .framebuffer
            .get_or_insert_with(|| host.create_frame_buffer(scene, Some(context)));

        if let Some(session) = self.session.as_mut() {
            session.update_stats()?;
            session.wait_new_frame()?;
            framebuffer.update(&**session)?;
            framebuffer.draw(&**session)?;
        }

        host.tag_redraw();
        Ok(())
    }

    fn fail_viewport(&mut self, host: &mut dyn RenderHost, error: &EngineError) {
        self.state = EngineState::Error;
        if let Some(session) = self.session.take() {
            self.exporter.release_session(session);
        }

        log::error!("Viewport render failed: {error}");
        host.update_stats("Error: ", &error.to_string());
        self.state = EngineState::Idle;
    }
}

impl Drop for RenderEngine {
    fn drop(&mut self) {
        if let Some(session) = self.session.take() {
            log::info!("Stopping render session {:?} on drop", session.id());
            self.exporter.release_session(session);
        }
    }
}
