//! Error types for scene export and session control

use crate::backend::BackendError;
use std::path::PathBuf;
use thiserror::Error;

/// Failure while converting one host entity into renderer properties.
#[derive(Error, Debug)]
pub enum ExportError {
    #[error("object \"{0}\" is not a lamp")]
    NotALamp(String),
    #[error("scene \"{0}\" has no active camera")]
    MissingCamera(String),
    #[error("sequence images are not supported yet (image \"{0}\")")]
    SequenceNotSupported(String),
    #[error("unsupported image source \"{source_kind}\" in image \"{image}\"")]
    UnsupportedImageSource { source_kind: String, image: String },
    #[error("failed to write temporary image {path:?}: {source}")]
    ImageWrite {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to encode image: {0}")]
    Image(#[from] image::ImageError),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Backend(#[from] BackendError),
}

pub type ExportResult<T> = Result<T, ExportError>;

/// Failure surfaced by the render engine to the host.
#[derive(Error, Debug)]
pub enum EngineError {
    #[error("export failed: {0}")]
    Export(#[from] ExportError),
    #[error("renderer error: {0}")]
    Backend(#[from] BackendError),
    #[error("no render session")]
    NoSession,
    #[error("display buffer error: {0}")]
    Display(String),
}

pub type EngineResult<T> = Result<T, EngineError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = ExportError::NotALamp("Cube".to_string());
        assert_eq!(err.to_string(), "object \"Cube\" is not a lamp");

        let err = EngineError::from(ExportError::SequenceNotSupported("anim".to_string()));
        assert_eq!(
            err.to_string(),
            "export failed: sequence images are not supported yet (image \"anim\")"
        );
    }
}
