//! Binding of a part to a state type.

use animator_common::{EntityId, EntityKind, IdRegistry, Registration};
use serde_json::{Map, Value};
use tracing::debug;

use crate::animation_state::AnimationState;
use crate::document::NameResolver;

/// Cross reference between a [`Part`](crate::Part) and a
/// [`StateType`](crate::StateType), holding the part's frame data for the
/// states of that type.
#[derive(Debug)]
pub struct PartState {
    state_type: EntityId,
    animation_states: Vec<AnimationState>,
    registration: Registration,
}

impl PartState {
    pub(crate) fn new(registry: &IdRegistry, state_type: EntityId) -> Self {
        Self {
            state_type,
            animation_states: Vec::new(),
            registration: registry.register(EntityKind::PartState),
        }
    }

    /// Unique id of this part state.
    #[must_use]
    pub fn id(&self) -> EntityId {
        self.registration.id()
    }

    /// Id of the referenced state type.
    #[must_use]
    pub fn reference(&self) -> EntityId {
        self.state_type
    }

    /// Animation states in insertion order.
    #[must_use]
    pub fn animation_states(&self) -> &[AnimationState] {
        &self.animation_states
    }

    /// Animation state at `index`.
    #[must_use]
    pub fn animation_state(&self, index: usize) -> Option<&AnimationState> {
        self.animation_states.get(index)
    }

    /// Mutable animation state at `index`.
    pub fn animation_state_mut(&mut self, index: usize) -> Option<&mut AnimationState> {
        self.animation_states.get_mut(index)
    }

    /// Animation state describing the given state, if any.
    #[must_use]
    pub fn animation_state_for(&self, state: EntityId) -> Option<&AnimationState> {
        self.animation_states.iter().find(|a| a.reference() == state)
    }

    pub(crate) fn add_animation_state(&mut self, state: EntityId) -> EntityId {
        let anim = AnimationState::new(self.registration.registry(), state);
        let id = anim.id();
        self.animation_states.push(anim);
        id
    }

    /// Removes and destroys the animation state at `index`.
    pub fn remove_animation_state(&mut self, index: usize) -> bool {
        if index >= self.animation_states.len() {
            return false;
        }
        self.animation_states.remove(index);
        true
    }

    /// Destroys every animation state referencing `state`.
    pub(crate) fn purge_state(&mut self, state: EntityId) -> usize {
        let before = self.animation_states.len();
        self.animation_states.retain(|a| a.reference() != state);
        before - self.animation_states.len()
    }

    pub(crate) fn output(&self, names: &impl NameResolver) -> Value {
        let mut out = Map::new();
        for anim in &self.animation_states {
            let Some(name) = names.name_of(anim.reference()) else {
                debug!("Skipping animation state {} with dangling state reference", anim.id());
                continue;
            };
            out.insert(name.to_owned(), anim.output());
        }
        Value::Object(out)
    }
}
