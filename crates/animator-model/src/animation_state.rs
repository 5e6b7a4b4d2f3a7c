//! Frame data of one part for one state.

use animator_common::{EntityId, EntityKind, IdRegistry, Registration};
use serde_json::{Map, Value};

use crate::properties::{FramePropertyMap, PropertyMap, FRAME_PROPERTIES};

/// Properties and per-frame properties a part uses while in a given state.
///
/// Owned by a [`PartState`](crate::PartState); `reference` is the id of the
/// [`State`](crate::State) it describes.
#[derive(Debug)]
pub struct AnimationState {
    state: EntityId,
    properties: PropertyMap,
    frame_properties: FramePropertyMap,
    // Declared last so the id is released after everything else is gone.
    registration: Registration,
}

impl AnimationState {
    pub(crate) fn new(registry: &IdRegistry, state: EntityId) -> Self {
        Self {
            state,
            properties: PropertyMap::new(&FRAME_PROPERTIES),
            frame_properties: FramePropertyMap::new(&FRAME_PROPERTIES),
            registration: registry.register(EntityKind::AnimationState),
        }
    }

    /// Unique id of this animation state.
    #[must_use]
    pub fn id(&self) -> EntityId {
        self.registration.id()
    }

    /// Id of the referenced state.
    #[must_use]
    pub fn reference(&self) -> EntityId {
        self.state
    }

    /// Single-valued properties (`image`, `offset`, `zLevel`).
    #[must_use]
    pub fn properties(&self) -> &PropertyMap {
        &self.properties
    }

    /// Sets a property. Returns false for keys outside the allowed set.
    pub fn set_property(&mut self, name: &str, value: impl Into<Value>) -> bool {
        self.properties.set(name, &value.into())
    }

    /// Removes a property.
    pub fn remove_property(&mut self, name: &str) -> bool {
        self.properties.remove(name)
    }

    /// Per-frame properties.
    #[must_use]
    pub fn frame_properties(&self) -> &FramePropertyMap {
        &self.frame_properties
    }

    /// Appends a frame value. Returns false for keys outside the allowed set.
    pub fn add_frame_property(&mut self, name: &str, value: impl Into<Value>) -> bool {
        self.frame_properties.push(name, &value.into())
    }

    /// Removes the frame value at `index` of a key.
    pub fn remove_frame_property(&mut self, name: &str, index: usize) -> bool {
        self.frame_properties.remove(name, index)
    }

    pub(crate) fn apply(&mut self, data: &Value) {
        if let Some(properties) = data.get("properties") {
            self.properties.apply(properties);
        }
        if let Some(frames) = data.get("frameProperties") {
            self.frame_properties.apply(frames);
        }
    }

    pub(crate) fn output(&self) -> Value {
        let mut out = Map::new();
        if !self.properties.is_empty() {
            out.insert("properties".into(), self.properties.to_json());
        }
        if !self.frame_properties.is_empty() {
            out.insert("frameProperties".into(), self.frame_properties.to_json());
        }
        Value::Object(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_allowed_properties_only() {
        let registry = IdRegistry::new();
        let mut anim = AnimationState::new(&registry, EntityId::from_raw(7));
        assert!(anim.set_property("image", "arm.png:<frame>"));
        assert!(anim.set_property("zLevel", "3"));
        assert!(!anim.set_property("cycle", 2));
        assert_eq!(anim.reference(), EntityId::from_raw(7));
        assert_eq!(
            anim.output(),
            json!({"properties": {"image": "arm.png:<frame>", "zLevel": 3}})
        );
    }

    #[test]
    fn test_apply_and_output_frames() {
        let registry = IdRegistry::new();
        let mut anim = AnimationState::new(&registry, EntityId::from_raw(0));
        anim.apply(&json!({
            "frameProperties": {"offset": [[0, 1], [0.5, 1]]}
        }));
        assert_eq!(
            anim.output(),
            json!({"frameProperties": {"offset": [[0, 1], [0.5, 1]]}})
        );
        assert!(anim.remove_frame_property("offset", 1));
        assert_eq!(anim.frame_properties().get("offset").map(<[_]>::len), Some(1));
    }

    #[test]
    fn test_empty_output() {
        let registry = IdRegistry::new();
        let anim = AnimationState::new(&registry, EntityId::from_raw(0));
        assert_eq!(anim.output(), json!({}));
    }
}
