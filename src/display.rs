//! Display buffers receiving the film of a running session

use crate::backend::{FilmData, RenderSession};
use crate::error::{EngineError, EngineResult};
use std::path::Path;

/// Receives pixels from a session for display in the host.
pub trait FrameBuffer {
    /// Pull the latest film of `session`.
    fn update(&mut self, session: &dyn RenderSession) -> EngineResult<()>;

    /// Pull and present the film of `session`.
    fn draw(&mut self, session: &dyn RenderSession) -> EngineResult<()>;
}

/// Frame buffer keeping the last film in memory.
#[derive(Debug, Default)]
pub struct FilmBuffer {
    film: FilmData,
    draws: usize,
}

impl FilmBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn film(&self) -> &FilmData {
        &self.film
    }

    /// Number of draw calls so far.
    pub fn draw_count(&self) -> usize {
        self.draws
    }

    /// Write the last film as an 8-bit PNG.
    pub fn save_png(&self, path: impl AsRef<Path>) -> EngineResult<()> {
        let FilmData {
            width,
            height,
            pixels,
        } = self.film.clone();
        let buffer = image::Rgba32FImage::from_raw(width, height, pixels).ok_or_else(|| {
            EngineError::Display(format!("film of {width}x{height} has the wrong pixel count"))
        })?;
        image::DynamicImage::ImageRgba32F(buffer)
            .to_rgba8()
            .save_with_format(path, image::ImageFormat::Png)
            .map_err(|e| EngineError::Display(e.to_string()))
    }
}

impl FrameBuffer for FilmBuffer {
    fn update(&mut self, session: &dyn RenderSession) -> EngineResult<()> {
        self.film = session.film();
        Ok(())
    }

    fn draw(&mut self, session: &dyn RenderSession) -> EngineResult<()> {
        self.update(session)?;
        self.draws += 1;
        log::trace!("Drew {}x{} film", self.film.width, self.film.height);
        Ok(())
    }
}
