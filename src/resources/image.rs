//! Image datablocks and the temporary-file cache that hands them to the renderer
//!
//! The renderer only reads images from disk. Generated and packed images are
//! written to temporary files once per datablock identity and reused until
//! [`ImageCache::cleanup`] deletes them. A changed image is not written again
//! within the lifetime of the cache.

use crate::error::{ExportError, ExportResult};
use crate::names::make_key;
use crate::scene::{Library, Scene};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use tempfile::NamedTempFile;

/// Where the pixels of an image come from.
#[derive(Debug, Clone, PartialEq)]
pub enum ImageSource {
    /// Procedurally generated solid image.
    Generated {
        width: u32,
        height: u32,
        color: [f32; 4],
    },
    /// Image file on disk, optionally packed into the scene file.
    File {
        filepath: String,
        /// Encoded file contents when the image is packed.
        packed: Option<Vec<u8>>,
    },
    Sequence {
        filepath: String,
    },
    Movie {
        filepath: String,
    },
}

impl ImageSource {
    pub fn type_tag(&self) -> &'static str {
        match self {
            ImageSource::Generated { .. } => "GENERATED",
            ImageSource::File { .. } => "FILE",
            ImageSource::Sequence { .. } => "SEQUENCE",
            ImageSource::Movie { .. } => "MOVIE",
        }
    }
}

/// An image datablock.
#[derive(Debug, Clone, PartialEq)]
pub struct Image {
    pub name: String,
    pub library: Option<Library>,
    pub source: ImageSource,
}

impl Image {
    pub fn generated(name: impl Into<String>, width: u32, height: u32, color: [f32; 4]) -> Self {
        Self {
            name: name.into(),
            library: None,
            source: ImageSource::Generated {
                width,
                height,
                color,
            },
        }
    }

    pub fn file(name: impl Into<String>, filepath: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            library: None,
            source: ImageSource::File {
                filepath: filepath.into(),
                packed: None,
            },
        }
    }

    pub fn packed(name: impl Into<String>, filepath: impl Into<String>, data: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            library: None,
            source: ImageSource::File {
                filepath: filepath.into(),
                packed: Some(data),
            },
        }
    }
}

/// Resolve a host path, expanding the `//` prefix relative to `base_dir`.
pub fn abspath(filepath: &str, base_dir: Option<&Path>) -> PathBuf {
    match filepath.strip_prefix("//") {
        Some(relative) => match base_dir {
            Some(base) => base.join(relative),
            None => PathBuf::from(relative),
        },
        None => PathBuf::from(filepath),
    }
}

/// Cache of images materialized to temporary files.
///
/// One cache is opened per process (or per test) and shared by every exporter
/// through an `Arc`. The lock is held across the check-then-write sequence so
/// concurrent exporters never write the same image twice.
#[derive(Debug)]
pub struct ImageCache {
    temp_images: Mutex<HashMap<String, PathBuf>>,
    temp_dir: Option<PathBuf>,
    writes: AtomicUsize,
}

impl ImageCache {
    /// Open a cache writing into the platform temp directory.
    pub fn open() -> Self {
        Self {
            temp_images: Mutex::new(HashMap::new()),
            temp_dir: None,
            writes: AtomicUsize::new(0),
        }
    }

    /// Open a cache writing into `dir`.
    pub fn in_dir(dir: impl Into<PathBuf>) -> Self {
        Self {
            temp_dir: Some(dir.into()),
            ..Self::open()
        }
    }

    /// Return a filesystem path the renderer can load `image` from.
    pub fn export(&self, image: &Image, scene: &Scene) -> ExportResult<PathBuf> {
        match &image.source {
            ImageSource::Generated { .. } | ImageSource::File { packed: Some(_), .. } => {
                self.save_to_temp_file(image)
            }
            ImageSource::File {
                filepath,
                packed: None,
            } => {
                let base = match &image.library {
                    Some(library) => library.filepath.parent().map(Path::to_path_buf),
                    None => scene.blend_dir.clone(),
                };
                Ok(abspath(filepath, base.as_deref()))
            }
            ImageSource::Sequence { .. } => {
                Err(ExportError::SequenceNotSupported(image.name.clone()))
            }
            ImageSource::Movie { .. } => Err(ExportError::UnsupportedImageSource {
                source_kind: image.source.type_tag().to_string(),
                image: image.name.clone(),
            }),
        }
    }

    fn save_to_temp_file(&self, image: &Image) -> ExportResult<PathBuf> {
        let key = make_key(image);
        let mut temp_images = self.temp_images.lock();

        if let Some(path) = temp_images.get(&key) {
            log::trace!("Image \"{}\" already exported to {:?}", image.name, path);
            return Ok(path.clone());
        }

        let path = match &image.source {
            ImageSource::Generated {
                width,
                height,
                color,
            } => {
                let pixel = image::Rgba(color.map(|c| (c.clamp(0.0, 1.0) * 255.0).round() as u8));
                let buffer =
                    image::RgbaImage::from_pixel((*width).max(1), (*height).max(1), pixel);
                self.write_temp_file(".png", |file| {
                    buffer.write_to(file, image::ImageOutputFormat::Png)?;
                    Ok(())
                })?
            }
            ImageSource::File {
                filepath,
                packed: Some(data),
            } => {
                let suffix = Path::new(filepath)
                    .extension()
                    .and_then(|e| e.to_str())
                    .map(|e| format!(".{e}"))
                    .unwrap_or_default();
                self.write_temp_file(&suffix, |file| {
                    file.write_all(data).map_err(|source| ExportError::ImageWrite {
                        path: file.path().to_path_buf(),
                        source,
                    })
                })?
            }
            _ => return Err(ExportError::UnsupportedImageSource {
                source_kind: image.source.type_tag().to_string(),
                image: image.name.clone(),
            }),
        };

        self.writes.fetch_add(1, Ordering::Relaxed);
        log::debug!("Exported image \"{}\" to {:?}", image.name, path);
        temp_images.insert(key, path.clone());
        Ok(path)
    }

    /// Fill a new temporary file with `write` and keep it on disk.
    ///
    /// The file is deleted again when `write` fails.
    fn write_temp_file(
        &self,
        suffix: &str,
        write: impl FnOnce(&mut NamedTempFile) -> ExportResult<()>,
    ) -> ExportResult<PathBuf> {
        let mut builder = tempfile::Builder::new();
        builder.prefix("luxcore_image_").suffix(suffix);
        let mut temp = match &self.temp_dir {
            Some(dir) => builder.tempfile_in(dir)?,
            None => builder.tempfile()?,
        };
        write(&mut temp)?;
        temp.keep()
            .map(|(_, path)| path)
            .map_err(|e| e.error.into())
    }

    /// Delete every materialized file and forget them. Safe to call twice.
    pub fn cleanup(&self) {
        let mut temp_images = self.temp_images.lock();
        for (_, path) in temp_images.drain() {
            log::info!("Deleting temporary image: {:?}", path);
            if let Err(e) = std::fs::remove_file(&path) {
                log::warn!("Could not delete temporary image {:?}: {}", path, e);
            }
        }
    }

    /// Number of materialized images currently tracked.
    pub fn len(&self) -> usize {
        self.temp_images.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// How many files this cache has written in total.
    pub fn write_count(&self) -> usize {
        self.writes.load(Ordering::Relaxed)
    }
}

impl Default for ImageCache {
    fn default() -> Self {
        Self::open()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generated_image_is_written_once() {
        let dir = tempfile::tempdir().unwrap();
        let cache = ImageCache::in_dir(dir.path());
        let scene = Scene::default();
        let image = Image::generated("Checker", 4, 4, [1.0, 0.5, 0.0, 1.0]);

        let first = cache.export(&image, &scene).unwrap();
        let second = cache.export(&image, &scene).unwrap();

        assert_eq!(first, second);
        assert_eq!(cache.write_count(), 1);
        assert!(first.exists());
        assert_eq!(first.extension().and_then(|e| e.to_str()), Some("png"));
    }

    #[test]
    fn packed_image_keeps_bytes_and_extension() {
        let dir = tempfile::tempdir().unwrap();
        let cache = ImageCache::in_dir(dir.path());
        let image = Image::packed("Packed", "//textures/wood.jpg", vec![1, 2, 3, 4]);

        let path = cache.export(&image, &Scene::default()).unwrap();
        assert_eq!(path.extension().and_then(|e| e.to_str()), Some("jpg"));
        assert_eq!(std::fs::read(&path).unwrap(), vec![1, 2, 3, 4]);
    }

    #[test]
    fn file_image_resolves_relative_to_blend_dir() {
        let cache = ImageCache::open();
        let mut scene = Scene::default();
        scene.blend_dir = Some(PathBuf::from("/projects/shot"));

        let image = Image::file("Wood", "//textures/wood.png");
        let path = cache.export(&image, &scene).unwrap();

        assert_eq!(path, PathBuf::from("/projects/shot/textures/wood.png"));
        assert!(cache.is_empty());
        assert_eq!(cache.write_count(), 0);
    }

    #[test]
    fn linked_file_image_resolves_relative_to_library() {
        let cache = ImageCache::open();
        let mut image = Image::file("Wood", "//wood.png");
        image.library = Some(Library {
            name: "lib.blend".to_string(),
            filepath: PathBuf::from("/assets/lib.blend"),
        });

        let path = cache.export(&image, &Scene::default()).unwrap();
        assert_eq!(path, PathBuf::from("/assets/wood.png"));
    }

    #[test]
    fn absolute_file_path_is_untouched() {
        assert_eq!(
            abspath("/tmp/sky.hdr", Some(Path::new("/projects"))),
            PathBuf::from("/tmp/sky.hdr")
        );
    }

    #[test]
    fn sequence_fails_fast() {
        let cache = ImageCache::open();
        let image = Image {
            name: "Frames".to_string(),
            library: None,
            source: ImageSource::Sequence {
                filepath: "//frames/####.png".to_string(),
            },
        };
        let err = cache.export(&image, &Scene::default()).unwrap_err();
        assert!(matches!(err, ExportError::SequenceNotSupported(_)));
    }

    #[test]
    fn movie_is_unsupported() {
        let cache = ImageCache::open();
        let image = Image {
            name: "Clip".to_string(),
            library: None,
            source: ImageSource::Movie {
                filepath: "clip.mp4".to_string(),
            },
        };
        assert!(matches!(
            cache.export(&image, &Scene::default()),
            Err(ExportError::UnsupportedImageSource { .. })
        ));
    }

    #[test]
    fn cleanup_deletes_files_and_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let cache = ImageCache::in_dir(dir.path());
        let path = cache
            .export(
                &Image::generated("Blank", 2, 2, [0.0, 0.0, 0.0, 1.0]),
                &Scene::default(),
            )
            .unwrap();
        assert!(path.exists());

        cache.cleanup();
        assert!(!path.exists());
        assert!(cache.is_empty());

        cache.cleanup();
        assert!(cache.is_empty());
    }

    #[test]
    fn failed_write_leaves_no_file_behind() {
        let dir = tempfile::tempdir().unwrap();
        let cache = ImageCache::in_dir(dir.path());

        let result = cache.write_temp_file(".png", |file| {
            Err(ExportError::ImageWrite {
                path: file.path().to_path_buf(),
                source: std::io::Error::new(std::io::ErrorKind::Other, "disk full"),
            })
        });

        assert!(matches!(result, Err(ExportError::ImageWrite { .. })));
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
        assert!(cache.is_empty());
    }
}
