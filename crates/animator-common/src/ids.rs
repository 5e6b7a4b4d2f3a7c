//! ID types and the identity registry.
//!
//! Every entity in a document owns a [`Registration`] handed out by an
//! [`IdRegistry`]. Dropping the registration releases the id again, so the
//! registry always mirrors the set of live entities. Cross references between
//! entities are stored as plain [`EntityId`] values and resolved through the
//! registry when they are read.

use std::fmt;
use std::sync::Arc;

use ahash::AHashMap;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Unique identifier for an entity in a document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct EntityId(u64);

impl EntityId {
    /// Creates an entity ID from a raw value.
    #[must_use]
    pub const fn from_raw(value: u64) -> Self {
        Self(value)
    }

    /// Returns the raw ID value.
    #[must_use]
    pub const fn raw(self) -> u64 {
        self.0
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// The kind of entity an id was registered for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EntityKind {
    /// Animated part
    Part,
    /// Binding of a part to a state type
    PartState,
    /// Frame data of a part for one state
    AnimationState,
    /// State type (slot of mutually exclusive states)
    StateType,
    /// Single state inside a state type
    State,
    /// Particle emitter
    Emitter,
    /// Particle owned by an emitter
    Particle,
    /// Transformation group
    Group,
    /// Sound pool
    SoundPool,
}

impl EntityKind {
    /// Human readable name used in diagnostics.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Part => "part",
            Self::PartState => "part state",
            Self::AnimationState => "animation state",
            Self::StateType => "state type",
            Self::State => "state",
            Self::Emitter => "particle emitter",
            Self::Particle => "particle",
            Self::Group => "transformation group",
            Self::SoundPool => "sound pool",
        }
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Default)]
struct RegistryTable {
    next: u64,
    entries: AHashMap<EntityId, EntityKind>,
}

/// Table of live entity ids.
///
/// Cloning the registry yields another handle onto the same table. Ids grow
/// monotonically while any entity is alive; once the last one is released the
/// counter starts over at zero.
#[derive(Debug, Clone, Default)]
pub struct IdRegistry {
    table: Arc<Mutex<RegistryTable>>,
}

impl IdRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a new entity and returns the guard owning its id.
    #[must_use]
    pub fn register(&self, kind: EntityKind) -> Registration {
        let mut table = self.table.lock();
        let id = EntityId(table.next);
        table.next += 1;
        table.entries.insert(id, kind);
        Registration {
            id,
            registry: self.clone(),
        }
    }

    /// Releases an id. Returns false if it was not registered.
    pub fn release(&self, id: EntityId) -> bool {
        let mut table = self.table.lock();
        if table.entries.remove(&id).is_none() {
            return false;
        }
        if table.entries.is_empty() {
            table.next = 0;
            debug!("No more ids registered, resetting index");
        }
        true
    }

    /// Looks up what kind of entity an id belongs to.
    #[must_use]
    pub fn resolve(&self, id: EntityId) -> Option<EntityKind> {
        self.table.lock().entries.get(&id).copied()
    }

    /// Returns true if the id belongs to a live entity of the given kind.
    #[must_use]
    pub fn is(&self, id: EntityId, kind: EntityKind) -> bool {
        self.resolve(id) == Some(kind)
    }

    /// Number of live ids.
    #[must_use]
    pub fn live_count(&self) -> usize {
        self.table.lock().entries.len()
    }

    /// The id the next registration will receive.
    #[must_use]
    pub fn next_id(&self) -> EntityId {
        EntityId(self.table.lock().next)
    }

    /// Short summary for diagnostics.
    #[must_use]
    pub fn statistic(&self) -> String {
        let table = self.table.lock();
        format!(
            "Currently registered: {} ids. Highest index: {}",
            table.entries.len(),
            table.next
        )
    }
}

/// Ownership of one registered id. Releases the id when dropped.
#[derive(Debug)]
pub struct Registration {
    id: EntityId,
    registry: IdRegistry,
}

impl Registration {
    /// The registered id.
    #[must_use]
    pub const fn id(&self) -> EntityId {
        self.id
    }

    /// The registry this id belongs to.
    #[must_use]
    pub const fn registry(&self) -> &IdRegistry {
        &self.registry
    }
}

impl Drop for Registration {
    fn drop(&mut self) {
        self.registry.release(self.id);
    }
}
