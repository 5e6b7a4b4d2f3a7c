//! Animated parts.

use animator_common::{coerce, EntityId, EntityKind, IdRegistry, Registration};
use serde_json::{Map, Value};

use crate::document::NameResolver;
use crate::part_state::PartState;

/// An animated sprite layer.
///
/// `anchor_part` and `groups` are weak references resolved through the
/// registry; the part owns its [`PartState`]s.
#[derive(Debug)]
pub struct Part {
    name: String,
    anchor_part: Option<EntityId>,
    centered: bool,
    image: Option<String>,
    offset: Option<[f64; 2]>,
    z_level: Option<i64>,
    groups: Vec<EntityId>,
    part_states: Vec<PartState>,
    // Declared last so owned part states release their ids first.
    registration: Registration,
}

impl Part {
    pub(crate) fn new(registry: &IdRegistry, name: String) -> Self {
        Self {
            name,
            anchor_part: None,
            centered: false,
            image: None,
            offset: None,
            z_level: None,
            groups: Vec::new(),
            part_states: Vec::new(),
            registration: registry.register(EntityKind::Part),
        }
    }

    /// Unique id of this part.
    #[must_use]
    pub fn id(&self) -> EntityId {
        self.registration.id()
    }

    /// Part name, unique within the document.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    pub(crate) fn set_name(&mut self, name: String) {
        self.name = name;
    }

    /// Id of the part this one is positioned relative to.
    #[must_use]
    pub fn anchor_part(&self) -> Option<EntityId> {
        self.anchor_part
    }

    pub(crate) fn set_anchor_part(&mut self, anchor: Option<EntityId>) {
        self.anchor_part = anchor;
    }

    /// Whether the image is centered on the part origin.
    #[must_use]
    pub fn centered(&self) -> bool {
        self.centered
    }

    /// Sets `centered` from any value's truthiness.
    pub fn set_centered(&mut self, value: impl Into<Value>) {
        self.centered = coerce::truthy(&value.into());
    }

    /// Image path, if set.
    #[must_use]
    pub fn image(&self) -> Option<&str> {
        self.image.as_deref()
    }

    /// Sets the image. `null` clears it; anything else is stringified.
    pub fn set_image(&mut self, value: impl Into<Value>) {
        let value = value.into();
        self.image = (!value.is_null()).then(|| coerce::text(&value));
    }

    /// Offset, if set.
    #[must_use]
    pub fn offset(&self) -> Option<[f64; 2]> {
        self.offset
    }

    /// Sets the offset. `null` clears it; a malformed vector becomes `[0, 0]`.
    pub fn set_offset(&mut self, value: impl Into<Value>) {
        let value = value.into();
        self.offset = (!value.is_null()).then(|| coerce::vec2_or_zero(&value));
    }

    /// Z level, if set.
    #[must_use]
    pub fn z_level(&self) -> Option<i64> {
        self.z_level
    }

    /// Sets the z level. `null` clears it; unparseable input becomes 1.
    pub fn set_z_level(&mut self, value: impl Into<Value>) {
        let value = value.into();
        self.z_level = (!value.is_null()).then(|| coerce::int(&value).unwrap_or(1));
    }

    /// Ids of the transformation groups this part subscribes to.
    #[must_use]
    pub fn groups(&self) -> &[EntityId] {
        &self.groups
    }

    pub(crate) fn add_group(&mut self, group: EntityId) -> bool {
        if self.groups.contains(&group) {
            return false;
        }
        self.groups.push(group);
        true
    }

    /// Unsubscribes from a group. Returns false if the part was not subscribed.
    pub fn remove_group(&mut self, group: EntityId) -> bool {
        let before = self.groups.len();
        self.groups.retain(|g| *g != group);
        self.groups.len() != before
    }

    /// Part states in insertion order.
    #[must_use]
    pub fn part_states(&self) -> &[PartState] {
        &self.part_states
    }

    /// Part state at `index`.
    #[must_use]
    pub fn part_state(&self, index: usize) -> Option<&PartState> {
        self.part_states.get(index)
    }

    /// Mutable part state at `index`.
    pub fn part_state_mut(&mut self, index: usize) -> Option<&mut PartState> {
        self.part_states.get_mut(index)
    }

    /// Part state bound to the given state type, if any.
    #[must_use]
    pub fn part_state_for(&self, state_type: EntityId) -> Option<&PartState> {
        self.part_states.iter().find(|p| p.reference() == state_type)
    }

    pub(crate) fn add_part_state(&mut self, state_type: EntityId) -> &mut PartState {
        let part_state = PartState::new(self.registration.registry(), state_type);
        self.part_states.push(part_state);
        let last = self.part_states.len() - 1;
        &mut self.part_states[last]
    }

    /// Removes and destroys the part state at `index`, with its animation states.
    pub fn remove_part_state(&mut self, index: usize) -> bool {
        if index >= self.part_states.len() {
            return false;
        }
        self.part_states.remove(index);
        true
    }

    /// Destroys every part state bound to `state_type`.
    pub(crate) fn purge_state_type(&mut self, state_type: EntityId) -> usize {
        let before = self.part_states.len();
        self.part_states.retain(|p| p.reference() != state_type);
        before - self.part_states.len()
    }

    /// Destroys every animation state referencing `state`.
    pub(crate) fn purge_state(&mut self, state: EntityId) -> usize {
        self.part_states
            .iter_mut()
            .map(|p| p.purge_state(state))
            .sum()
    }

    /// Applies the plain (non-reference) fields of a `properties` object.
    pub(crate) fn apply_properties(&mut self, properties: &Map<String, Value>) {
        if let Some(centered) = properties.get("centered") {
            self.set_centered(centered.clone());
        }
        if let Some(image) = properties.get("image") {
            self.set_image(image.clone());
        }
        if let Some(offset) = properties.get("offset") {
            self.set_offset(offset.clone());
        }
        if let Some(z_level) = properties.get("zLevel") {
            self.set_z_level(z_level.clone());
        }
    }

    pub(crate) fn output(&self, names: &impl NameResolver) -> Value {
        let mut properties = Map::new();
        if let Some(anchor) = self.anchor_part.and_then(|id| names.name_of(id)) {
            properties.insert("anchorPart".into(), Value::from(anchor));
        }
        properties.insert("centered".into(), Value::Bool(self.centered));
        if let Some(image) = &self.image {
            properties.insert("image".into(), Value::from(image.as_str()));
        }
        if let Some(offset) = self.offset {
            properties.insert("offset".into(), coerce::vec2_value(offset));
        }
        if let Some(z_level) = self.z_level {
            properties.insert("zLevel".into(), Value::from(z_level));
        }
        let groups: Vec<Value> = self
            .groups
            .iter()
            .filter_map(|id| names.name_of(*id))
            .map(Value::from)
            .collect();
        if !groups.is_empty() {
            properties.insert("transformationGroups".into(), Value::Array(groups));
        }

        let mut out = Map::new();
        out.insert("properties".into(), Value::Object(properties));
        if !self.part_states.is_empty() {
            let mut states = Map::new();
            for part_state in &self.part_states {
                if let Some(name) = names.name_of(part_state.reference()) {
                    states.insert(name.to_owned(), part_state.output(names));
                }
            }
            out.insert("partStates".into(), Value::Object(states));
        }
        Value::Object(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_permissive_setters() {
        let registry = IdRegistry::new();
        let mut part = Part::new(&registry, "body".into());

        part.set_z_level("4");
        assert_eq!(part.z_level(), Some(4));
        part.set_z_level("top");
        assert_eq!(part.z_level(), Some(1));
        part.set_z_level(Value::Null);
        assert_eq!(part.z_level(), None);

        part.set_offset(json!([1, 2, 3]));
        assert_eq!(part.offset(), Some([0.0, 0.0]));
        part.set_offset(json!(["0.5", -1]));
        assert_eq!(part.offset(), Some([0.5, -1.0]));

        part.set_image(42);
        assert_eq!(part.image(), Some("42"));
        part.set_centered("yes");
        assert!(part.centered());
    }

    #[test]
    fn test_groups_are_deduplicated() {
        let registry = IdRegistry::new();
        let mut part = Part::new(&registry, "body".into());
        let group = EntityId::from_raw(9);
        assert!(part.add_group(group));
        assert!(!part.add_group(group));
        assert!(part.remove_group(group));
        assert!(!part.remove_group(group));
    }

    #[test]
    fn test_drop_releases_children() {
        let registry = IdRegistry::new();
        let mut part = Part::new(&registry, "body".into());
        let state_type = EntityId::from_raw(50);
        part.add_part_state(state_type)
            .add_animation_state(EntityId::from_raw(51));
        assert_eq!(registry.live_count(), 3);
        assert_eq!(part.purge_state_type(state_type), 1);
        assert_eq!(registry.live_count(), 1);
        drop(part);
        assert_eq!(registry.live_count(), 0);
    }
}
