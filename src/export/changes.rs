//! Change detection between two viewport redraw ticks
//!
//! The exporter keeps a snapshot of what it last sent to the renderer and
//! diffs it against the current scene state to decide how much of the
//! session has to be rebuilt.

use super::{camera, config, RenderMode};
use crate::math::{get_worldscale, is_obj_visible};
use crate::names::make_key;
use crate::properties::PropertySet;
use crate::scene::{Object, ObjectData, Scene, ViewContext, World, WorldBackground};
use crate::BridgeConfig;
use bitflags::bitflags;
use std::collections::HashMap;

bitflags! {
    /// Categories of change since the last export.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct Change: u32 {
        /// Camera or view moved; the session can be updated in place.
        const CAMERA = 1 << 0;
        /// Film size or engine settings changed; needs a new session.
        const CONFIG = 1 << 1;
        /// Lights, objects or the world changed.
        const OBJECT = 1 << 2;
        /// Changes that must be routed through a full view update.
        const REQUIRES_VIEW_UPDATE = Self::CONFIG.bits() | Self::OBJECT.bits();
    }
}

/// Exported state of one object.
#[derive(Debug, Clone, PartialEq)]
struct ObjectState {
    matrix: [f64; 16],
    data: ObjectData,
}

impl ObjectState {
    fn of(obj: &Object) -> Self {
        Self {
            matrix: obj.matrix_world.to_cols_array(),
            data: obj.data.clone(),
        }
    }
}

/// Objects that differ between two snapshots, by datablock key.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ObjectDelta {
    /// New or modified objects.
    pub updated: Vec<String>,
    /// Objects that were exported before and are gone or hidden now.
    pub removed: Vec<String>,
    pub world: bool,
}

impl ObjectDelta {
    pub fn is_empty(&self) -> bool {
        self.updated.is_empty() && self.removed.is_empty() && !self.world
    }
}

/// What was exported at one point in time.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SceneSnapshot {
    camera: PropertySet,
    config: PropertySet,
    objects: HashMap<String, ObjectState>,
    world: Option<World>,
    /// Object a sky world takes its sun direction from, visible or not.
    world_sun: Option<ObjectState>,
    worldscale: f64,
}

impl SceneSnapshot {
    pub fn capture(
        scene: &Scene,
        context: Option<&ViewContext>,
        mode: RenderMode,
        bridge_config: &BridgeConfig,
    ) -> Self {
        let objects = scene
            .objects
            .iter()
            .filter(|obj| matches!(obj.data, ObjectData::Lamp(_) | ObjectData::Mesh(_)))
            .filter(|obj| is_obj_visible(obj, scene, context, false))
            .map(|obj| (make_key(obj), ObjectState::of(obj)))
            .collect();

        let world_sun = scene
            .world
            .as_ref()
            .and_then(|world| match &world.background {
                WorldBackground::Sky2 { sun, .. } => sun.as_deref(),
                _ => None,
            })
            .and_then(|name| scene.object(name))
            .map(ObjectState::of);

        Self {
            // The export itself reports camera failures
            camera: camera::try_convert(scene, context).unwrap_or_default(),
            config: config::convert(scene, context, mode, bridge_config),
            objects,
            world: scene.world.clone(),
            world_sun,
            worldscale: get_worldscale(scene),
        }
    }

    /// Classify the difference from `self` (last export) to `current`.
    ///
    /// A unit scale change moves every exported transform, so it counts as a
    /// config change and rebuilds the session.
    pub fn diff(&self, current: &SceneSnapshot) -> Change {
        let mut changes = Change::empty();

        if self.camera != current.camera {
            changes |= Change::CAMERA;
        }
        if self.config != current.config || self.worldscale != current.worldscale {
            changes |= Change::CONFIG;
        }
        if !self.object_delta(current).is_empty() {
            changes |= Change::OBJECT;
        }

        changes
    }

    pub fn object_delta(&self, current: &SceneSnapshot) -> ObjectDelta {
        let mut updated: Vec<String> = current
            .objects
            .iter()
            .filter(|(key, state)| self.objects.get(*key) != Some(*state))
            .map(|(key, _)| key.clone())
            .collect();
        let mut removed: Vec<String> = self
            .objects
            .keys()
            .filter(|key| !current.objects.contains_key(*key))
            .cloned()
            .collect();
        updated.sort();
        removed.sort();

        ObjectDelta {
            updated,
            removed,
            world: self.world != current.world || self.world_sun != current.world_sun,
        }
    }

    /// Take over the parts of `current` that `changes` says were applied.
    pub fn merge(&mut self, current: SceneSnapshot, changes: Change) {
        if changes.contains(Change::CONFIG) {
            *self = current;
            return;
        }
        if changes.contains(Change::CAMERA) {
            self.camera = current.camera;
        }
        if changes.contains(Change::OBJECT) {
            self.objects = current.objects;
            self.world = current.world;
            self.world_sun = current.world_sun;
        }
    }

    pub fn camera(&self) -> &PropertySet {
        &self.camera
    }

    pub fn config(&self) -> &PropertySet {
        &self.config
    }
}
