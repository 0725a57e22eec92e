//! Dotted-key property sets consumed by the renderer
//!
//! A [`PropertySet`] is the only currency between the converters and the
//! renderer: converters build them incrementally, the exporter merges them and
//! the renderer parses them once when a scene or session is created.

use indexmap::IndexMap;
use std::fmt;

/// A single typed property value.
#[derive(Debug, Clone, PartialEq)]
pub enum PropertyValue {
    Bool(bool),
    Int(i64),
    Float(f64),
    String(String),
    Floats(Vec<f64>),
}

impl PropertyValue {
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            PropertyValue::Float(v) => Some(*v),
            PropertyValue::Int(v) => Some(*v as f64),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            PropertyValue::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_floats(&self) -> Option<&[f64]> {
        match self {
            PropertyValue::Floats(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            PropertyValue::Bool(b) => Some(*b),
            _ => None,
        }
    }
}

impl fmt::Display for PropertyValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PropertyValue::Bool(b) => write!(f, "{}", if *b { 1 } else { 0 }),
            PropertyValue::Int(v) => write!(f, "{v}"),
            PropertyValue::Float(v) => write!(f, "{v}"),
            PropertyValue::String(s) => write!(f, "\"{s}\""),
            PropertyValue::Floats(values) => {
                for (i, v) in values.iter().enumerate() {
                    if i > 0 {
                        write!(f, " ")?;
                    }
                    write!(f, "{v}")?;
                }
                Ok(())
            }
        }
    }
}

impl From<bool> for PropertyValue {
    fn from(v: bool) -> Self {
        PropertyValue::Bool(v)
    }
}

impl From<i32> for PropertyValue {
    fn from(v: i32) -> Self {
        PropertyValue::Int(v as i64)
    }
}

impl From<u32> for PropertyValue {
    fn from(v: u32) -> Self {
        PropertyValue::Int(v as i64)
    }
}

impl From<i64> for PropertyValue {
    fn from(v: i64) -> Self {
        PropertyValue::Int(v)
    }
}

impl From<u64> for PropertyValue {
    fn from(v: u64) -> Self {
        PropertyValue::Int(v as i64)
    }
}

impl From<f32> for PropertyValue {
    fn from(v: f32) -> Self {
        PropertyValue::Float(v as f64)
    }
}

impl From<f64> for PropertyValue {
    fn from(v: f64) -> Self {
        PropertyValue::Float(v)
    }
}

impl From<&str> for PropertyValue {
    fn from(v: &str) -> Self {
        PropertyValue::String(v.to_string())
    }
}

impl From<String> for PropertyValue {
    fn from(v: String) -> Self {
        PropertyValue::String(v)
    }
}

impl From<Vec<f64>> for PropertyValue {
    fn from(v: Vec<f64>) -> Self {
        PropertyValue::Floats(v)
    }
}

impl<const N: usize> From<[f64; N]> for PropertyValue {
    fn from(v: [f64; N]) -> Self {
        PropertyValue::Floats(v.to_vec())
    }
}

impl From<glam::DVec3> for PropertyValue {
    fn from(v: glam::DVec3) -> Self {
        PropertyValue::Floats(v.to_array().to_vec())
    }
}

/// A named property.
#[derive(Debug, Clone, PartialEq)]
pub struct Property {
    pub name: String,
    pub value: PropertyValue,
}

impl Property {
    pub fn new(name: impl Into<String>, value: impl Into<PropertyValue>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }
}

/// Ordered property list keyed by dotted names.
///
/// Insertion order is preserved. Setting a key that is already present
/// replaces its value in place. Equality ignores order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PropertySet {
    properties: IndexMap<String, PropertyValue>,
}

impl PropertySet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a single property, overwriting an existing key.
    pub fn set(&mut self, property: Property) -> &mut Self {
        self.properties.insert(property.name, property.value);
        self
    }

    /// Shorthand for `set(Property::new(name, value))`.
    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<PropertyValue>) -> &mut Self {
        self.properties.insert(name.into(), value.into());
        self
    }

    /// Merge every property of `other` into this set.
    pub fn set_all(&mut self, other: &PropertySet) -> &mut Self {
        self.properties.reserve(other.len());
        for (name, value) in &other.properties {
            self.properties.insert(name.clone(), value.clone());
        }
        self
    }

    pub fn get(&self, name: &str) -> Option<&PropertyValue> {
        self.properties.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.properties.contains_key(name)
    }

    /// Remove every property whose name starts with `prefix`.
    pub fn delete_all(&mut self, prefix: &str) {
        self.properties.retain(|name, _| !name.starts_with(prefix));
    }

    /// Properties whose names start with `prefix`.
    pub fn get_all_with_prefix(&self, prefix: &str) -> PropertySet {
        PropertySet {
            properties: self
                .properties
                .iter()
                .filter(|(name, _)| name.starts_with(prefix))
                .map(|(name, value)| (name.clone(), value.clone()))
                .collect(),
        }
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.properties.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &PropertyValue)> {
        self.properties.iter().map(|(name, value)| (name.as_str(), value))
    }

    pub fn len(&self) -> usize {
        self.properties.len()
    }

    pub fn is_empty(&self) -> bool {
        self.properties.is_empty()
    }
}

impl fmt::Display for PropertySet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (name, value) in &self.properties {
            writeln!(f, "{name} = {value}")?;
        }
        Ok(())
    }
}

impl<'a> IntoIterator for &'a PropertySet {
    type Item = (&'a String, &'a PropertyValue);
    type IntoIter = indexmap::map::Iter<'a, String, PropertyValue>;

    fn into_iter(self) -> Self::IntoIter {
        self.properties.iter()
    }
}

/// Build a property set from `(key, value)` definitions, prepending `prefix`
/// to every key.
///
/// `prefix` carries its trailing dot, e.g. `"scene.camera."`.
pub fn create_props<K, I>(prefix: &str, definitions: I) -> PropertySet
where
    K: AsRef<str>,
    I: IntoIterator<Item = (K, PropertyValue)>,
{
    let mut props = PropertySet::new();
    for (key, value) in definitions {
        props.insert(format!("{prefix}{}", key.as_ref()), value);
    }
    props
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn set_overwrites_existing_key() {
        let mut props = PropertySet::new();
        props.insert("scene.camera.type", "perspective");
        props.insert("scene.camera.fieldofview", 45.0);
        props.insert("scene.camera.type", "orthographic");

        assert_eq!(props.len(), 2);
        assert_eq!(
            props.get("scene.camera.type").and_then(|v| v.as_str()),
            Some("orthographic")
        );
        // Overwrite keeps the original position
        assert_eq!(props.names().next(), Some("scene.camera.type"));
    }

    #[test]
    fn create_props_prefixes_keys() {
        let props = create_props(
            "scene.lights.sun.",
            vec![
                ("type", PropertyValue::from("sun")),
                ("turbidity", PropertyValue::from(2.2)),
            ],
        );
        assert!(props.contains("scene.lights.sun.type"));
        assert_eq!(
            props.get("scene.lights.sun.turbidity").and_then(|v| v.as_f64()),
            Some(2.2)
        );
    }

    #[test]
    fn prefix_queries() {
        let mut props = PropertySet::new();
        props.insert("scene.lights.a.type", "point");
        props.insert("scene.lights.a.gain", [1.0, 1.0, 1.0]);
        props.insert("scene.lights.b.type", "spot");

        assert_eq!(props.get_all_with_prefix("scene.lights.a.").len(), 2);
        props.delete_all("scene.lights.a.");
        assert_eq!(props.len(), 1);
    }

    #[test]
    fn display_is_renderer_text_format() {
        let mut props = PropertySet::new();
        props.insert("film.width", 640u32);
        props.insert("scene.camera.up", [0.0, 0.0, 1.0]);
        props.insert("batch.enable", true);
        assert_eq!(
            props.to_string(),
            "film.width = 640\nscene.camera.up = 0 0 1\nbatch.enable = 1\n"
        );
    }

    #[test]
    fn large_merge_keeps_order_and_overwrites() {
        let mut base = PropertySet::new();
        for i in 0..50_000 {
            base.insert(format!("scene.objects.o{i}.shape"), "Mesh");
        }
        let mut update = PropertySet::new();
        update.insert("scene.objects.o7.shape", "Quad");
        update.insert("scene.objects.extra.shape", "Quad");

        base.set_all(&update);
        assert_eq!(base.len(), 50_001);
        assert_eq!(base.names().nth(7), Some("scene.objects.o7.shape"));
        assert_eq!(
            base.get("scene.objects.o7.shape").and_then(|v| v.as_str()),
            Some("Quad")
        );
        assert_eq!(base.names().last(), Some("scene.objects.extra.shape"));
    }

    #[test]
    fn delete_all_keeps_remaining_order() {
        let mut props = PropertySet::new();
        props.insert("scene.lights.a.type", "point");
        props.insert("scene.lights.b.type", "spot");
        props.insert("scene.lights.a.gain", [1.0, 1.0, 1.0]);
        props.insert("scene.lights.c.type", "sun");

        props.delete_all("scene.lights.a.");
        let names: Vec<_> = props.names().collect();
        assert_eq!(names, vec!["scene.lights.b.type", "scene.lights.c.type"]);
    }
}
