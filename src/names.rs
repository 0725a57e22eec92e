//! Renderer-side names for host datablocks
//!
//! The renderer identifies every primitive by a string. Names are derived
//! deterministically from a datablock's name, type and library so that the
//! same datablock maps to the same primitive on every export pass.

use crate::resources::Image;
use crate::scene::{Library, Object, World};

/// Anything in the host that can be keyed for export.
pub trait Datablock {
    fn name(&self) -> &str;

    /// Host type tag, e.g. `LAMP`.
    fn type_tag(&self) -> Option<&str> {
        None
    }

    /// Type tag of the datablock's data, e.g. `AREA` for an area lamp.
    fn data_type_tag(&self) -> Option<&str> {
        None
    }

    fn library(&self) -> Option<&Library> {
        None
    }
}

impl Datablock for Object {
    fn name(&self) -> &str {
        &self.name
    }

    fn type_tag(&self) -> Option<&str> {
        Some(self.data.type_tag())
    }

    fn data_type_tag(&self) -> Option<&str> {
        self.data.data_type_tag()
    }

    fn library(&self) -> Option<&Library> {
        self.library.as_ref()
    }
}

impl Datablock for Image {
    fn name(&self) -> &str {
        &self.name
    }

    fn type_tag(&self) -> Option<&str> {
        Some(self.source.type_tag())
    }

    fn library(&self) -> Option<&Library> {
        self.library.as_ref()
    }
}

impl Datablock for World {
    fn name(&self) -> &str {
        &self.name
    }
}

/// Identity key of a datablock: name, type, data type and library name.
pub fn make_key(datablock: &impl Datablock) -> String {
    let mut key = datablock.name().to_string();
    if let Some(type_tag) = datablock.type_tag() {
        key.push_str(type_tag);
    }
    if let Some(data_type) = datablock.data_type_tag() {
        key.push_str(data_type);
    }
    if let Some(library) = datablock.library() {
        key.push_str(&library.name);
    }
    key
}

/// Replace every run of characters outside `[_0-9a-zA-Z]` with `__`.
pub fn to_luxcore_name(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut in_run = false;
    for c in s.chars() {
        if c == '_' || c.is_ascii_alphanumeric() {
            out.push(c);
            in_run = false;
        } else if !in_run {
            out.push_str("__");
            in_run = true;
        }
    }
    out
}

pub fn get_unique_luxcore_name(datablock: &impl Datablock) -> String {
    to_luxcore_name(&make_key(datablock))
}

/// Find the object whose key equals `key`.
pub fn obj_from_key<'a>(key: &str, objects: &'a [Object]) -> Option<&'a Object> {
    objects.iter().find(|o| make_key(*o) == key)
}

/// An object exported as one renderer object per material slot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportedObject {
    pub luxcore_names: Vec<String>,
}

impl ExportedObject {
    pub fn new(luxcore_names: Vec<String>) -> Self {
        Self { luxcore_names }
    }
}

/// A lamp exported as a single renderer light.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportedLight {
    pub luxcore_names: Vec<String>,
}

impl ExportedLight {
    pub fn new(luxcore_name: impl Into<String>) -> Self {
        Self {
            luxcore_names: vec![luxcore_name.into()],
        }
    }
}

/// Renderer primitives produced for one host entity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExportedEntity {
    Object(ExportedObject),
    Light(ExportedLight),
}

impl ExportedEntity {
    pub fn luxcore_names(&self) -> &[String] {
        match self {
            ExportedEntity::Object(o) => &o.luxcore_names,
            ExportedEntity::Light(l) => &l.luxcore_names,
        }
    }

    /// Property prefixes owned by this entity in the renderer scene.
    pub fn prefixes(&self) -> Vec<String> {
        match self {
            ExportedEntity::Object(o) => o
                .luxcore_names
                .iter()
                .map(|n| format!("scene.objects.{n}."))
                .collect(),
            ExportedEntity::Light(l) => l
                .luxcore_names
                .iter()
                .map(|n| format!("scene.lights.{n}."))
                .collect(),
        }
    }
}
