//! States of a state type.

use std::fmt;
use std::str::FromStr;

use animator_common::{coerce, EntityId, EntityKind, IdRegistry, Registration};
use serde_json::{Map, Value};

use crate::properties::{FramePropertyMap, PropertyMap, SOUND_PROPERTIES};

/// Name of the sentinel state every state type starts with.
pub const NONE_STATE: &str = "none";

/// What happens when a state's animation reaches its last frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum StateMode {
    /// Start over
    #[default]
    Loop = 0,
    /// Switch to the state named in `transition`
    Transition = 1,
    /// Stay on the last frame
    End = 2,
}

impl StateMode {
    /// All modes in index order.
    pub const ALL: [Self; 3] = [Self::Loop, Self::Transition, Self::End];

    /// Name used in the file format.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Loop => "loop",
            Self::Transition => "transition",
            Self::End => "end",
        }
    }

    /// Mode with the given index.
    #[must_use]
    pub fn from_index(index: i64) -> Option<Self> {
        usize::try_from(index)
            .ok()
            .and_then(|i| Self::ALL.get(i))
            .copied()
    }

    /// Interprets a file-format name or a numeric index.
    #[must_use]
    pub fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::String(s) => s
                .parse()
                .ok()
                .or_else(|| coerce::int(value).and_then(Self::from_index)),
            _ => coerce::int(value).and_then(Self::from_index),
        }
    }
}

impl fmt::Display for StateMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for StateMode {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|mode| mode.as_str() == s)
            .ok_or(())
    }
}

/// One animation clip of a state type.
#[derive(Debug)]
pub struct State {
    name: String,
    frames: u32,
    cycle: f64,
    mode: StateMode,
    transition: String,
    properties: PropertyMap,
    frame_properties: FramePropertyMap,
    registration: Registration,
}

impl State {
    pub(crate) fn new(registry: &IdRegistry, name: String) -> Self {
        Self {
            name,
            frames: 1,
            cycle: 1.0,
            mode: StateMode::Loop,
            transition: NONE_STATE.to_owned(),
            properties: PropertyMap::new(&SOUND_PROPERTIES),
            frame_properties: FramePropertyMap::new(&SOUND_PROPERTIES),
            registration: registry.register(EntityKind::State),
        }
    }

    /// Unique id of this state.
    #[must_use]
    pub fn id(&self) -> EntityId {
        self.registration.id()
    }

    /// State name, unique within its state type.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    pub(crate) fn set_name(&mut self, name: String) {
        self.name = name;
    }

    /// Returns true for the irremovable `none` state.
    #[must_use]
    pub fn is_sentinel(&self) -> bool {
        self.name == NONE_STATE
    }

    /// Number of animation frames (at least 1).
    #[must_use]
    pub fn frames(&self) -> u32 {
        self.frames
    }

    /// Sets the frame count. Anything below 1 or unparseable becomes 1.
    pub fn set_frames(&mut self, value: impl Into<Value>) {
        self.frames = coerce::int(&value.into())
            .and_then(|n| u32::try_from(n).ok())
            .filter(|n| *n >= 1)
            .unwrap_or(1);
    }

    /// Duration of one animation cycle in seconds.
    #[must_use]
    pub fn cycle(&self) -> f64 {
        self.cycle
    }

    /// Sets the cycle. Non-positive or unparseable input becomes 1.
    pub fn set_cycle(&mut self, value: impl Into<Value>) {
        self.cycle = coerce::float(&value.into())
            .filter(|c| *c > 0.0)
            .unwrap_or(1.0);
    }

    /// End-of-animation behaviour.
    #[must_use]
    pub fn mode(&self) -> StateMode {
        self.mode
    }

    /// Sets the mode from a name or index. Unknown modes are ignored.
    pub fn set_mode(&mut self, value: impl Into<Value>) {
        if let Some(mode) = StateMode::from_value(&value.into()) {
            self.mode = mode;
        }
    }

    /// Name of the state to switch to in [`StateMode::Transition`].
    #[must_use]
    pub fn transition(&self) -> &str {
        &self.transition
    }

    /// Sets the transition target. `null` resets it to `none`.
    pub fn set_transition(&mut self, value: impl Into<Value>) {
        let value = value.into();
        self.transition = if value.is_null() {
            NONE_STATE.to_owned()
        } else {
            coerce::text(&value)
        };
    }

    pub(crate) fn reset_transition(&mut self) {
        self.transition = NONE_STATE.to_owned();
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

    /// Per-frame sound properties.
    #[must_use]
    pub fn frame_properties(&self) -> &FramePropertyMap {
        &self.frame_properties
    }

    /// Appends a per-frame sound property value.
    pub fn add_frame_property(&mut self, name: &str, value: impl Into<Value>) -> bool {
        self.frame_properties.push(name, &value.into())
    }

    /// Removes one per-frame sound property value.
    pub fn remove_frame_property(&mut self, name: &str, index: usize) -> bool {
        self.frame_properties.remove(name, index)
    }

    pub(crate) fn apply(&mut self, data: &Value) {
        let Some(data) = data.as_object() else {
            return;
        };
        if let Some(frames) = data.get("frames") {
            self.set_frames(frames.clone());
        }
        if let Some(cycle) = data.get("cycle") {
            self.set_cycle(cycle.clone());
        }
        if let Some(mode) = data.get("mode") {
            self.set_mode(mode.clone());
        }
        if let Some(transition) = data.get("transition") {
            self.set_transition(transition.clone());
        }
        if let Some(properties) = data.get("properties") {
            self.properties.apply(properties);
        }
        if let Some(frames) = data.get("frameProperties") {
            self.frame_properties.apply(frames);
        }
    }

    pub(crate) fn output(&self) -> Value {
        let mut out = Map::new();
        out.insert("frames".into(), Value::from(self.frames));
        out.insert("cycle".into(), coerce::number(self.cycle));
        out.insert("mode".into(), Value::from(self.mode.as_str()));
        if self.mode == StateMode::Transition {
            out.insert("transition".into(), Value::from(self.transition.as_str()));
        }
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
    fn test_mode_parsing() {
        assert_eq!(StateMode::from_value(&json!("end")), Some(StateMode::End));
        assert_eq!(StateMode::from_value(&json!(1)), Some(StateMode::Transition));
        assert_eq!(StateMode::from_value(&json!("2")), Some(StateMode::End));
        assert_eq!(StateMode::from_value(&json!("bounce")), None);
        assert_eq!(StateMode::from_value(&json!(7)), None);
    }

    #[test]
    fn test_frames_and_cycle_fallbacks() {
        let registry = IdRegistry::new();
        let mut state = State::new(&registry, "idle".into());
        state.set_frames(0);
        assert_eq!(state.frames(), 1);
        state.set_frames("8");
        assert_eq!(state.frames(), 8);
        state.set_cycle(-2.0);
        assert!((state.cycle() - 1.0).abs() < f64::EPSILON);
        state.set_cycle("0.5");
        assert!((state.cycle() - 0.5).abs() < f64::EPSILON);
    }

    #[test]
    fn test_unknown_mode_keeps_previous() {
        let registry = IdRegistry::new();
        let mut state = State::new(&registry, "idle".into());
        state.set_mode("end");
        state.set_mode("sideways");
        assert_eq!(state.mode(), StateMode::End);
    }

    #[test]
    fn test_output_includes_transition_only_in_transition_mode() {
        let registry = IdRegistry::new();
        let mut state = State::new(&registry, "open".into());
        state.apply(&json!({"frames": 5, "cycle": 0.5, "transition": "idle"}));
        assert_eq!(
            state.output(),
            json!({"frames": 5, "cycle": 0.5, "mode": "loop"})
        );

        state.set_mode("transition");
        assert_eq!(
            state.output(),
            json!({"frames": 5, "cycle": 0.5, "mode": "transition", "transition": "idle"})
        );
    }

    #[test]
    fn test_sound_properties_gate() {
        let registry = IdRegistry::new();
        let mut state = State::new(&registry, "fire".into());
        assert!(state.set_property("immediateSound", "/sfx/fire.ogg"));
        assert!(!state.set_property("image", "x.png"));
        assert!(state.add_frame_property("persistentSoundRangeMultiplier", 2));
        assert_eq!(state.properties().len(), 1);
    }
}
