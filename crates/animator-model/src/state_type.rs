//! State types.

use animator_common::{coerce, EntityId, EntityKind, IdRegistry, Registration};
use serde_json::{Map, Value};

use crate::properties::{PropertyMap, SOUND_PROPERTIES};
use crate::state::{State, NONE_STATE};

/// A named slot of mutually exclusive states.
///
/// The first state is always the `none` sentinel, which can be neither
/// removed nor renamed. `default` and every state's `transition` refer to
/// states by name; removing or renaming a state keeps them consistent.
#[derive(Debug)]
pub struct StateType {
    name: String,
    default: String,
    states: Vec<State>,
    properties: PropertyMap,
    registration: Registration,
}

impl StateType {
    pub(crate) fn new(registry: &IdRegistry, name: String) -> Self {
        Self {
            name,
            default: NONE_STATE.to_owned(),
            states: vec![State::new(registry, NONE_STATE.to_owned())],
            properties: PropertyMap::new(&SOUND_PROPERTIES),
            registration: registry.register(EntityKind::StateType),
        }
    }

    /// Unique id of this state type.
    #[must_use]
    pub fn id(&self) -> EntityId {
        self.registration.id()
    }

    /// State type name, unique within the document.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    pub(crate) fn set_name(&mut self, name: String) {
        self.name = name;
    }

    /// Name of the state parts start in.
    #[must_use]
    pub fn default_state(&self) -> &str {
        &self.default
    }

    /// Sets the default state name. `null` resets it to `none`.
    pub fn set_default_state(&mut self, value: impl Into<Value>) {
        let value = value.into();
        self.default = if value.is_null() {
            NONE_STATE.to_owned()
        } else {
            coerce::text(&value)
        };
    }

    /// States, starting with the `none` sentinel.
    #[must_use]
    pub fn states(&self) -> &[State] {
        &self.states
    }

    /// State at `index`.
    #[must_use]
    pub fn state(&self, index: usize) -> Option<&State> {
        self.states.get(index)
    }

    /// Mutable state at `index`.
    pub fn state_mut(&mut self, index: usize) -> Option<&mut State> {
        self.states.get_mut(index)
    }

    /// Index of the state with the given name.
    #[must_use]
    pub fn state_index(&self, name: &str) -> Option<usize> {
        self.states.iter().position(|s| s.name() == name)
    }

    /// State with the given id.
    #[must_use]
    pub fn find_state(&self, id: EntityId) -> Option<&State> {
        self.states.iter().find(|s| s.id() == id)
    }

    /// Adds a state. Returns `None` if the name is already taken.
    pub fn add_state(&mut self, name: impl Into<String>) -> Option<EntityId> {
        let name = name.into();
        if self.state_index(&name).is_some() {
            return None;
        }
        let state = State::new(self.registration.registry(), name);
        let id = state.id();
        self.states.push(state);
        Some(id)
    }

    /// Detaches and destroys a state, resetting the default and any
    /// transitions that named it. Returns the removed id.
    ///
    /// Animation states referencing the state live in parts, so removal goes
    /// through [`Document::remove_state`](crate::Document::remove_state).
    pub(crate) fn remove_state(&mut self, index: usize) -> Option<EntityId> {
        if index == 0 || index >= self.states.len() {
            return None;
        }
        let removed = self.states.remove(index);
        if removed.name() == self.default {
            self.default = NONE_STATE.to_owned();
        }
        for state in &mut self.states {
            if state.transition() == removed.name() {
                state.reset_transition();
            }
        }
        Some(removed.id())
    }

    /// Renames a state. Fails for the sentinel and for names already taken.
    /// The default and sibling transitions follow the new name.
    pub fn rename_state(&mut self, index: usize, name: impl Into<String>) -> bool {
        let name = name.into();
        if index == 0 || index >= self.states.len() || self.state_index(&name).is_some_and(|i| i != index) {
            return false;
        }
        let old = self.states[index].name().to_owned();
        if self.default == old {
            self.default.clone_from(&name);
        }
        for state in &mut self.states {
            if state.transition() == old {
                state.set_transition(name.as_str());
            }
        }
        self.states[index].set_name(name);
        true
    }

    /// Sound properties.
    #[must_use]
    pub fn properties(&self) -> &PropertyMap {
        &self.properties
    }

    /// Sets a sound property. Returns false for keys outside the allowed set.
    pub fn set_property(&mut self, name: &str, value: impl Into<Value>) -> bool {
        self.properties.set(name, &value.into())
    }

    /// Removes a sound property.
    pub fn remove_property(&mut self, name: &str) -> bool {
        self.properties.remove(name)
    }

    /// Applies a state type definition. Data for `none` goes to the sentinel.
    pub(crate) fn apply(&mut self, data: &Value) {
        let Some(data) = data.as_object() else {
            return;
        };
        if let Some(states) = data.get("states").and_then(Value::as_object) {
            for (name, definition) in states {
                if name == NONE_STATE {
                    self.states[0].apply(definition);
                } else if self.add_state(name.as_str()).is_some() {
                    if let Some(state) = self.states.last_mut() {
                        state.apply(definition);
                    }
                }
            }
        }
        if let Some(default) = data.get("default") {
            self.set_default_state(default.clone());
        }
        if let Some(properties) = data.get("properties") {
            self.properties.apply(properties);
        }
    }

    pub(crate) fn output(&self) -> Value {
        let mut out = Map::new();
        out.insert("default".into(), Value::from(self.default.as_str()));
        out.insert(
            "states".into(),
            Value::Object(
                self.states
                    .iter()
                    .map(|s| (s.name().to_owned(), s.output()))
                    .collect(),
            ),
        );
        if !self.properties.is_empty() {
            out.insert("properties".into(), self.properties.to_json());
        }
        Value::Object(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::StateMode;
    use serde_json::json;

    fn pose(registry: &IdRegistry) -> StateType {
        let mut st = StateType::new(registry, "Pose".into());
        st.add_state("walk");
        st.add_state("jump");
        st
    }

    #[test]
    fn test_sentinel_state_exists() {
        let registry = IdRegistry::new();
        let st = StateType::new(&registry, "Pose".into());
        assert_eq!(st.states().len(), 1);
        assert!(st.states()[0].is_sentinel());
        assert_eq!(st.default_state(), "none");
        assert_eq!(registry.live_count(), 2);
    }

    #[test]
    fn test_state_names_unique() {
        let registry = IdRegistry::new();
        let mut st = pose(&registry);
        assert!(st.add_state("walk").is_none());
        assert!(st.add_state("none").is_none());
        assert_eq!(st.states().len(), 3);
    }

    #[test]
    fn test_remove_state_resets_references() {
        let registry = IdRegistry::new();
        let mut st = pose(&registry);
        st.set_default_state("walk");
        let jump = st.state_index("jump").expect("jump exists");
        if let Some(state) = st.state_mut(jump) {
            state.set_mode("transition");
            state.set_transition("walk");
        }

        let walk = st.state_index("walk").expect("walk exists");
        assert!(st.remove_state(walk).is_some());
        assert_eq!(st.default_state(), "none");
        let jump = st.state_index("jump").expect("jump exists");
        assert_eq!(st.states()[jump].transition(), "none");
        assert_eq!(st.states()[jump].mode(), StateMode::Transition);
    }

    #[test]
    fn test_sentinel_cannot_be_removed_or_renamed() {
        let registry = IdRegistry::new();
        let mut st = pose(&registry);
        assert!(st.remove_state(0).is_none());
        assert!(!st.rename_state(0, "idle"));
        assert!(st.remove_state(10).is_none());
    }

    #[test]
    fn test_rename_state_follows_references() {
        let registry = IdRegistry::new();
        let mut st = pose(&registry);
        st.set_default_state("walk");
        if let Some(jump) = st.state_mut(2) {
            jump.set_transition("walk");
        }

        assert!(!st.rename_state(1, "jump"));
        assert!(!st.rename_state(1, "none"));
        assert!(st.rename_state(1, "walk"));
        assert_eq!(st.default_state(), "walk");
        assert!(st.rename_state(1, "stroll"));
        assert_eq!(st.states()[1].name(), "stroll");
        assert_eq!(st.default_state(), "stroll");
        assert_eq!(st.states()[2].transition(), "stroll");
    }

    #[test]
    fn test_apply_routes_none_to_sentinel() {
        let registry = IdRegistry::new();
        let mut st = StateType::new(&registry, "Pose".into());
        st.apply(&json!({
            "default": "idle",
            "states": {
                "none": {"frames": 2},
                "idle": {"frames": 4, "mode": "end"}
            },
            "properties": {"persistentSound": "/hum.ogg", "bogus": 1}
        }));
        assert_eq!(st.states().len(), 2);
        assert_eq!(st.states()[0].frames(), 2);
        assert_eq!(st.states()[1].mode(), StateMode::End);
        assert_eq!(
            st.output(),
            json!({
                "default": "idle",
                "states": {
                    "none": {"frames": 2, "cycle": 1, "mode": "loop"},
                    "idle": {"frames": 4, "cycle": 1, "mode": "end"}
                },
                "properties": {"persistentSound": "/hum.ogg"}
            })
        );
    }
}
