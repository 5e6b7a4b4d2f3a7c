//! The document aggregate.
//!
//! A [`Document`] owns every top-level collection and keeps cross references
//! between them consistent. Parts and emitters refer to other entities by
//! [`EntityId`]; removing a referenced entity clears or cascades those
//! references before the entity is destroyed.

use animator_common::{coerce, EntityId, EntityKind, IdRegistry};
use serde_json::{Map, Value};
use tracing::debug;

use crate::emitter::Emitter;
use crate::events::{DocumentEvent, EventListeners, ListenerError, ListenerId};
use crate::group::Group;
use crate::part::Part;
use crate::printer::{self, CompressionLevel};
use crate::sound_pool::SoundPool;
use crate::state_type::StateType;

/// Resolves entity ids to their current names for output.
pub trait NameResolver {
    /// Name of the entity with the given id, if it is live and named.
    fn name_of(&self, id: EntityId) -> Option<&str>;
}

/// An animation document.
///
/// Every mutating operation fires [`DocumentEvent::Update`]. Validation
/// failures (name collisions, dangling references, out of range indices) are
/// reported as `false`/`None` and leave the document unchanged.
#[derive(Debug)]
pub struct Document {
    pub(crate) tags: Vec<(String, String)>,
    pub(crate) sound_pools: Vec<SoundPool>,
    pub(crate) groups: Vec<Group>,
    pub(crate) state_types: Vec<StateType>,
    pub(crate) parts: Vec<Part>,
    pub(crate) emitters: Vec<Emitter>,
    pub(crate) compression: CompressionLevel,
    pub(crate) listeners: EventListeners,
    registry: IdRegistry,
}

impl Default for Document {
    fn default() -> Self {
        Self::new()
    }
}

/// Returns true if an item other than the one at `skip` is called `name`.
fn name_taken<T>(items: &[T], skip: Option<usize>, name: &str, name_of: impl Fn(&T) -> &str) -> bool {
    items
        .iter()
        .enumerate()
        .any(|(i, item)| Some(i) != skip && name_of(item) == name)
}

impl Document {
    /// Creates an empty document with its own registry.
    #[must_use]
    pub fn new() -> Self {
        Self::with_registry(IdRegistry::new())
    }

    /// Creates an empty document registering ids in `registry`.
    #[must_use]
    pub fn with_registry(registry: IdRegistry) -> Self {
        Self {
            tags: Vec::new(),
            sound_pools: Vec::new(),
            groups: Vec::new(),
            state_types: Vec::new(),
            parts: Vec::new(),
            emitters: Vec::new(),
            compression: CompressionLevel::default(),
            listeners: EventListeners::default(),
            registry,
        }
    }

    /// The registry tracking this document's ids.
    #[must_use]
    pub fn registry(&self) -> &IdRegistry {
        &self.registry
    }

    pub(crate) fn touch(&mut self) {
        self.listeners.fire(DocumentEvent::Update);
    }

    // ------------------------------------------------------------------
    // Events
    // ------------------------------------------------------------------

    /// Registers a listener. With a `limit` the listener is removed after
    /// that many successful deliveries.
    pub fn add_event_listener<F>(&mut self, event: DocumentEvent, limit: Option<u32>, callback: F) -> ListenerId
    where
        F: FnMut(DocumentEvent) -> Result<(), ListenerError> + Send + 'static,
    {
        self.listeners.add(event, limit, Box::new(callback))
    }

    /// Removes a listener. Returns false if it was not registered for `event`.
    pub fn remove_event_listener(&mut self, event: DocumentEvent, id: ListenerId) -> bool {
        self.listeners.remove(event, id)
    }

    // ------------------------------------------------------------------
    // Tags
    // ------------------------------------------------------------------

    /// Global tag defaults in insertion order.
    pub fn tags(&self) -> impl Iterator<Item = (&str, &str)> {
        self.tags.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Value of a tag.
    #[must_use]
    pub fn tag(&self, name: &str) -> Option<&str> {
        self.tags
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }

    /// Sets a tag, or deletes it when `value` is `null`.
    ///
    /// Returns false only when deleting a tag that does not exist.
    pub fn set_tag(&mut self, name: &str, value: impl Into<Value>) -> bool {
        let value = value.into();
        if value.is_null() {
            let Some(index) = self.tags.iter().position(|(k, _)| k == name) else {
                return false;
            };
            self.tags.remove(index);
        } else {
            let value = coerce::text(&value);
            match self.tags.iter_mut().find(|(k, _)| k == name) {
                Some((_, slot)) => *slot = value,
                None => self.tags.push((name.to_owned(), value)),
            }
        }
        self.touch();
        true
    }

    // ------------------------------------------------------------------
    // Sound pools
    // ------------------------------------------------------------------

    /// Sound pools in insertion order.
    #[must_use]
    pub fn sound_pools(&self) -> &[SoundPool] {
        &self.sound_pools
    }

    /// Sound pool at `index`.
    #[must_use]
    pub fn sound_pool(&self, index: usize) -> Option<&SoundPool> {
        self.sound_pools.get(index)
    }

    /// Index of the sound pool with the given name.
    #[must_use]
    pub fn sound_pool_index(&self, name: &str) -> Option<usize> {
        self.sound_pools.iter().position(|p| p.name() == name)
    }

    /// Sound pool with the given id.
    #[must_use]
    pub fn find_sound_pool(&self, id: EntityId) -> Option<&SoundPool> {
        self.sound_pools.iter().find(|p| p.id() == id)
    }

    /// Adds an empty sound pool. Returns `None` if the name is taken.
    pub fn add_sound_pool(&mut self, name: impl Into<Value>) -> Option<EntityId> {
        let name = coerce::text(&name.into());
        if name_taken(&self.sound_pools, None, &name, SoundPool::name) {
            return None;
        }
        let pool = SoundPool::new(&self.registry, name);
        let id = pool.id();
        self.sound_pools.push(pool);
        self.touch();
        Some(id)
    }

    /// Edits the sound pool at `index`.
    pub fn edit_sound_pool<R>(&mut self, index: usize, f: impl FnOnce(&mut SoundPool) -> R) -> Option<R> {
        let result = f(self.sound_pools.get_mut(index)?);
        self.touch();
        Some(result)
    }

    /// Renames a sound pool. Fails if the name is taken.
    pub fn rename_sound_pool(&mut self, index: usize, name: impl Into<Value>) -> bool {
        let name = coerce::text(&name.into());
        if index >= self.sound_pools.len() || name_taken(&self.sound_pools, Some(index), &name, SoundPool::name) {
            return false;
        }
        self.sound_pools[index].set_name(name);
        self.touch();
        true
    }

    /// Removes and destroys the sound pool at `index`.
    pub fn remove_sound_pool(&mut self, index: usize) -> bool {
        if index >= self.sound_pools.len() {
            return false;
        }
        self.sound_pools.remove(index);
        self.touch();
        true
    }

    // ------------------------------------------------------------------
    // Transformation groups
    // ------------------------------------------------------------------

    /// Transformation groups in insertion order.
    #[must_use]
    pub fn transformation_groups(&self) -> &[Group] {
        &self.groups
    }

    /// Transformation group at `index`.
    #[must_use]
    pub fn transformation_group(&self, index: usize) -> Option<&Group> {
        self.groups.get(index)
    }

    /// Index of the transformation group with the given name.
    #[must_use]
    pub fn transformation_group_index(&self, name: &str) -> Option<usize> {
        self.groups.iter().position(|g| g.name() == name)
    }

    /// Transformation group with the given id.
    #[must_use]
    pub fn find_transformation_group(&self, id: EntityId) -> Option<&Group> {
        self.groups.iter().find(|g| g.id() == id)
    }

    /// Adds a transformation group. Returns `None` if the name is taken.
    pub fn add_transformation_group(&mut self, name: impl Into<Value>) -> Option<EntityId> {
        let name = coerce::text(&name.into());
        if name_taken(&self.groups, None, &name, Group::name) {
            return None;
        }
        let group = Group::new(&self.registry, name);
        let id = group.id();
        self.groups.push(group);
        self.touch();
        Some(id)
    }

    /// Edits the transformation group at `index`.
    pub fn edit_transformation_group<R>(&mut self, index: usize, f: impl FnOnce(&mut Group) -> R) -> Option<R> {
        let result = f(self.groups.get_mut(index)?);
        self.touch();
        Some(result)
    }

    /// Renames a transformation group. Fails if the name is taken.
    pub fn rename_transformation_group(&mut self, index: usize, name: impl Into<Value>) -> bool {
        let name = coerce::text(&name.into());
        if index >= self.groups.len() || name_taken(&self.groups, Some(index), &name, Group::name) {
            return false;
        }
        self.groups[index].set_name(name);
        self.touch();
        true
    }

    /// Removes a transformation group and unsubscribes every part from it.
    pub fn remove_transformation_group(&mut self, index: usize) -> bool {
        if index >= self.groups.len() {
            return false;
        }
        let group = self.groups.remove(index);
        let cleared = self
            .parts
            .iter_mut()
            .map(|part| part.remove_group(group.id()))
            .filter(|removed| *removed)
            .count();
        debug!("Removed group {} from {} parts", group.name(), cleared);
        drop(group);
        self.touch();
        true
    }

    // ------------------------------------------------------------------
    // State types and states
    // ------------------------------------------------------------------

    /// State types in insertion order.
    #[must_use]
    pub fn state_types(&self) -> &[StateType] {
        &self.state_types
    }

    /// State type at `index`.
    #[must_use]
    pub fn state_type(&self, index: usize) -> Option<&StateType> {
        self.state_types.get(index)
    }

    /// Index of the state type with the given name.
    #[must_use]
    pub fn state_type_index(&self, name: &str) -> Option<usize> {
        self.state_types.iter().position(|t| t.name() == name)
    }

    /// State type with the given id.
    #[must_use]
    pub fn find_state_type(&self, id: EntityId) -> Option<&StateType> {
        self.state_types.iter().find(|t| t.id() == id)
    }

    /// Adds a state type with its `none` sentinel state. Returns `None` if
    /// the name is taken.
    pub fn add_state_type(&mut self, name: impl Into<Value>) -> Option<EntityId> {
        let name = coerce::text(&name.into());
        if name_taken(&self.state_types, None, &name, StateType::name) {
            return None;
        }
        let state_type = StateType::new(&self.registry, name);
        let id = state_type.id();
        self.state_types.push(state_type);
        self.touch();
        Some(id)
    }

    /// Edits the state type at `index`.
    ///
    /// States are removed through [`Document::remove_state`] so that
    /// animation states referencing them go too.
    pub fn edit_state_type<R>(&mut self, index: usize, f: impl FnOnce(&mut StateType) -> R) -> Option<R> {
        let result = f(self.state_types.get_mut(index)?);
        self.touch();
        Some(result)
    }

    /// Renames a state type. Fails if the name is taken.
    pub fn rename_state_type(&mut self, index: usize, name: impl Into<Value>) -> bool {
        let name = coerce::text(&name.into());
        if index >= self.state_types.len() || name_taken(&self.state_types, Some(index), &name, StateType::name) {
            return false;
        }
        self.state_types[index].set_name(name);
        self.touch();
        true
    }

    /// Removes a state type together with every part state bound to it.
    pub fn remove_state_type(&mut self, index: usize) -> bool {
        if index >= self.state_types.len() {
            return false;
        }
        let state_type = self.state_types.remove(index);
        let purged: usize = self
            .parts
            .iter_mut()
            .map(|part| part.purge_state_type(state_type.id()))
            .sum();
        debug!("Removed state type {} and {} part states", state_type.name(), purged);
        drop(state_type);
        self.touch();
        true
    }

    /// Adds a state to the state type at `type_index`. Returns `None` for an
    /// unknown type or a name already taken in that type.
    pub fn add_state(&mut self, type_index: usize, name: impl Into<Value>) -> Option<EntityId> {
        let name = coerce::text(&name.into());
        let id = self.state_types.get_mut(type_index)?.add_state(name)?;
        self.touch();
        Some(id)
    }

    /// Renames a state. The sentinel cannot be renamed.
    pub fn rename_state(&mut self, type_index: usize, state_index: usize, name: impl Into<Value>) -> bool {
        let name = coerce::text(&name.into());
        let renamed = self
            .state_types
            .get_mut(type_index)
            .is_some_and(|t| t.rename_state(state_index, name));
        if renamed {
            self.touch();
        }
        renamed
    }

    /// Removes a state and every animation state referencing it. The
    /// sentinel cannot be removed.
    pub fn remove_state(&mut self, type_index: usize, state_index: usize) -> bool {
        let Some(state) = self
            .state_types
            .get_mut(type_index)
            .and_then(|t| t.remove_state(state_index))
        else {
            return false;
        };
        let purged: usize = self.parts.iter_mut().map(|part| part.purge_state(state)).sum();
        debug!("Removed state {} and {} animation states", state, purged);
        self.touch();
        true
    }

    // ------------------------------------------------------------------
    // Parts
    // ------------------------------------------------------------------

    /// Parts in insertion order.
    #[must_use]
    pub fn parts(&self) -> &[Part] {
        &self.parts
    }

    /// Part at `index`.
    #[must_use]
    pub fn part(&self, index: usize) -> Option<&Part> {
        self.parts.get(index)
    }

    /// Index of the part with the given name.
    #[must_use]
    pub fn part_index(&self, name: &str) -> Option<usize> {
        self.parts.iter().position(|p| p.name() == name)
    }

    /// Part with the given id.
    #[must_use]
    pub fn find_part(&self, id: EntityId) -> Option<&Part> {
        self.parts.iter().find(|p| p.id() == id)
    }

    /// Adds a part. Returns `None` if the name is taken.
    pub fn add_part(&mut self, name: impl Into<Value>) -> Option<EntityId> {
        let name = coerce::text(&name.into());
        if name_taken(&self.parts, None, &name, Part::name) {
            return None;
        }
        let part = Part::new(&self.registry, name);
        let id = part.id();
        self.parts.push(part);
        self.touch();
        Some(id)
    }

    /// Edits the part at `index`.
    pub fn edit_part<R>(&mut self, index: usize, f: impl FnOnce(&mut Part) -> R) -> Option<R> {
        let result = f(self.parts.get_mut(index)?);
        self.touch();
        Some(result)
    }

    /// Renames a part. Fails if the name is taken.
    pub fn rename_part(&mut self, index: usize, name: impl Into<Value>) -> bool {
        let name = coerce::text(&name.into());
        if index >= self.parts.len() || name_taken(&self.parts, Some(index), &name, Part::name) {
            return false;
        }
        self.parts[index].set_name(name);
        self.touch();
        true
    }

    /// Removes a part and clears every anchor pointing at it.
    pub fn remove_part(&mut self, index: usize) -> bool {
        if index >= self.parts.len() {
            return false;
        }
        let part = self.parts.remove(index);
        let target = Some(part.id());
        let mut cleared = 0;
        for other in self.parts.iter_mut().filter(|p| p.anchor_part() == target) {
            other.set_anchor_part(None);
            cleared += 1;
        }
        for emitter in self.emitters.iter_mut().filter(|e| e.anchor_part() == target) {
            emitter.set_anchor_part(None);
            cleared += 1;
        }
        debug!("Removed part {} and cleared {} anchors", part.name(), cleared);
        drop(part);
        self.touch();
        true
    }

    /// Anchors a part to another part, or detaches it with `None`.
    ///
    /// Fails if the target is not a live part or is the part itself.
    pub fn set_part_anchor(&mut self, index: usize, anchor: Option<EntityId>) -> bool {
        if !self.is_valid_anchor(anchor) {
            return false;
        }
        let Some(part) = self.parts.get_mut(index) else {
            return false;
        };
        if anchor == Some(part.id()) {
            return false;
        }
        part.set_anchor_part(anchor);
        self.touch();
        true
    }

    /// Subscribes a part to a transformation group. Fails for unknown groups
    /// and existing subscriptions.
    pub fn add_part_group(&mut self, index: usize, group: EntityId) -> bool {
        if !self.registry.is(group, EntityKind::Group) {
            return false;
        }
        let added = self.parts.get_mut(index).is_some_and(|p| p.add_group(group));
        if added {
            self.touch();
        }
        added
    }

    /// Binds a part to a state type. A part holds at most one part state per
    /// state type.
    pub fn add_part_state(&mut self, index: usize, state_type: EntityId) -> Option<EntityId> {
        if !self.registry.is(state_type, EntityKind::StateType) {
            return None;
        }
        let part = self.parts.get_mut(index)?;
        if part.part_state_for(state_type).is_some() {
            return None;
        }
        let id = part.add_part_state(state_type).id();
        self.touch();
        Some(id)
    }

    /// Adds an animation state to a part state. The state must belong to the
    /// part state's state type, and each state is described at most once.
    pub fn add_animation_state(&mut self, index: usize, part_state: usize, state: EntityId) -> Option<EntityId> {
        let state_type = self.parts.get(index)?.part_state(part_state)?.reference();
        self.find_state_type(state_type)?.find_state(state)?;
        let part_state = self.parts.get_mut(index)?.part_state_mut(part_state)?;
        if part_state.animation_state_for(state).is_some() {
            return None;
        }
        let id = part_state.add_animation_state(state);
        self.touch();
        Some(id)
    }

    // ------------------------------------------------------------------
    // Particle emitters
    // ------------------------------------------------------------------

    /// Particle emitters in insertion order.
    #[must_use]
    pub fn particle_emitters(&self) -> &[Emitter] {
        &self.emitters
    }

    /// Particle emitter at `index`.
    #[must_use]
    pub fn particle_emitter(&self, index: usize) -> Option<&Emitter> {
        self.emitters.get(index)
    }

    /// Index of the particle emitter with the given name.
    #[must_use]
    pub fn particle_emitter_index(&self, name: &str) -> Option<usize> {
        self.emitters.iter().position(|e| e.name() == name)
    }

    /// Particle emitter with the given id.
    #[must_use]
    pub fn find_particle_emitter(&self, id: EntityId) -> Option<&Emitter> {
        self.emitters.iter().find(|e| e.id() == id)
    }

    /// Adds a particle emitter. Returns `None` if the name is taken.
    pub fn add_particle_emitter(&mut self, name: impl Into<Value>) -> Option<EntityId> {
        let name = coerce::text(&name.into());
        if name_taken(&self.emitters, None, &name, Emitter::name) {
            return None;
        }
        let emitter = Emitter::new(&self.registry, name);
        let id = emitter.id();
        self.emitters.push(emitter);
        self.touch();
        Some(id)
    }

    /// Edits the particle emitter at `index`.
    pub fn edit_particle_emitter<R>(&mut self, index: usize, f: impl FnOnce(&mut Emitter) -> R) -> Option<R> {
        let result = f(self.emitters.get_mut(index)?);
        self.touch();
        Some(result)
    }

    /// Renames a particle emitter. Fails if the name is taken.
    pub fn rename_particle_emitter(&mut self, index: usize, name: impl Into<Value>) -> bool {
        let name = coerce::text(&name.into());
        if index >= self.emitters.len() || name_taken(&self.emitters, Some(index), &name, Emitter::name) {
            return false;
        }
        self.emitters[index].set_name(name);
        self.touch();
        true
    }

    /// Removes and destroys the particle emitter at `index`.
    pub fn remove_particle_emitter(&mut self, index: usize) -> bool {
        if index >= self.emitters.len() {
            return false;
        }
        self.emitters.remove(index);
        self.touch();
        true
    }

    /// Anchors an emitter to a part, or detaches it with `None`.
    pub fn set_emitter_anchor(&mut self, index: usize, anchor: Option<EntityId>) -> bool {
        if !self.is_valid_anchor(anchor) {
            return false;
        }
        let Some(emitter) = self.emitters.get_mut(index) else {
            return false;
        };
        emitter.set_anchor_part(anchor);
        self.touch();
        true
    }

    fn is_valid_anchor(&self, anchor: Option<EntityId>) -> bool {
        anchor.map_or(true, |id| self.registry.is(id, EntityKind::Part))
    }

    // ------------------------------------------------------------------
    // Whole document
    // ------------------------------------------------------------------

    /// Returns true if the document holds a tag or any entity.
    #[must_use]
    pub fn has_elements(&self) -> bool {
        !(self.tags.is_empty()
            && self.sound_pools.is_empty()
            && self.groups.is_empty()
            && self.state_types.is_empty()
            && self.parts.is_empty()
            && self.emitters.is_empty())
    }

    pub(crate) fn reset(&mut self) {
        // parts reference state types and groups, drop them first
        self.emitters.clear();
        self.parts.clear();
        self.state_types.clear();
        self.groups.clear();
        self.sound_pools.clear();
        self.tags.clear();
    }

    /// Destroys all content, releasing every id, and fires
    /// [`DocumentEvent::Load`].
    pub fn clear(&mut self) {
        self.reset();
        debug!("Document cleared. {}", self.registry.statistic());
        self.listeners.fire(DocumentEvent::Load);
    }

    /// Compression level used by [`Document::print`] without an override.
    #[must_use]
    pub fn compression_level(&self) -> CompressionLevel {
        self.compression
    }

    /// Sets the default compression level from a level name or index.
    /// Anything else is ignored and false is returned.
    pub fn set_compression_level(&mut self, value: impl Into<Value>) -> bool {
        match CompressionLevel::from_value(&value.into()) {
            Some(level) => {
                self.compression = level;
                true
            },
            None => false,
        }
    }

    /// Builds the file representation, or `None` for an empty document.
    #[must_use]
    pub fn output(&self) -> Option<Value> {
        if !self.has_elements() {
            return None;
        }
        let mut out = Map::new();
        if !self.tags.is_empty() {
            let tags = self
                .tags
                .iter()
                .map(|(k, v)| (k.clone(), Value::from(v.as_str())))
                .collect();
            out.insert("globalTagDefaults".into(), Value::Object(tags));
        }
        if !self.sound_pools.is_empty() {
            let pools = self
                .sound_pools
                .iter()
                .map(|p| (p.name().to_owned(), p.output()))
                .collect();
            out.insert("sounds".into(), Value::Object(pools));
        }
        if !self.groups.is_empty() {
            let groups = self
                .groups
                .iter()
                .map(|g| (g.name().to_owned(), g.output()))
                .collect();
            out.insert("transformationGroups".into(), Value::Object(groups));
        }

        let mut animated = Map::new();
        if !self.state_types.is_empty() {
            let types = self
                .state_types
                .iter()
                .map(|t| (t.name().to_owned(), t.output()))
                .collect();
            animated.insert("stateTypes".into(), Value::Object(types));
        }
        if !self.parts.is_empty() {
            let parts = self
                .parts
                .iter()
                .map(|p| (p.name().to_owned(), p.output(self)))
                .collect();
            animated.insert("parts".into(), Value::Object(parts));
        }
        if !animated.is_empty() {
            out.insert("animatedParts".into(), Value::Object(animated));
        }

        if !self.emitters.is_empty() {
            let emitters = self
                .emitters
                .iter()
                .map(|e| (e.name().to_owned(), e.output(self)))
                .collect();
            out.insert("particleEmitters".into(), Value::Object(emitters));
        }
        Some(Value::Object(out))
    }

    /// Encodes the document as text, or `None` for an empty document.
    ///
    /// `level` overrides the document's compression level. `colorize` wraps
    /// each line in HTML markup for syntax highlighting.
    #[must_use]
    pub fn print(&self, level: Option<CompressionLevel>, colorize: bool) -> Option<String> {
        let out = self.output()?;
        let text = printer::encode(&out, level.unwrap_or(self.compression));
        Some(if colorize { printer::colorize(&text) } else { text })
    }
}

impl NameResolver for Document {
    fn name_of(&self, id: EntityId) -> Option<&str> {
        match self.registry.resolve(id)? {
            EntityKind::Part => self.find_part(id).map(Part::name),
            EntityKind::StateType => self.find_state_type(id).map(StateType::name),
            EntityKind::State => self
                .state_types
                .iter()
                .find_map(|t| t.find_state(id))
                .map(|s| s.name()),
            EntityKind::Emitter => self.find_particle_emitter(id).map(Emitter::name),
            EntityKind::Group => self.find_transformation_group(id).map(Group::name),
            EntityKind::SoundPool => self.find_sound_pool(id).map(SoundPool::name),
            EntityKind::PartState | EntityKind::AnimationState | EntityKind::Particle => None,
        }
    }
}
