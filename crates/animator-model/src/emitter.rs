//! Particle emitters.

use animator_common::{coerce, EntityId, EntityKind, IdRegistry, Registration};
use serde_json::{Map, Value};

use crate::document::NameResolver;
use crate::particle::{EmitterParticle, Particle, ParticleAnimated};

/// A named particle source, optionally anchored to a part.
#[derive(Debug)]
pub struct Emitter {
    name: String,
    anchor_part: Option<EntityId>,
    burst_count: i64,
    emission_rate: f64,
    particles: Vec<EmitterParticle>,
    registration: Registration,
}

impl Emitter {
    pub(crate) fn new(registry: &IdRegistry, name: String) -> Self {
        Self {
            name,
            anchor_part: None,
            burst_count: 0,
            emission_rate: 0.0,
            particles: Vec::new(),
            registration: registry.register(EntityKind::Emitter),
        }
    }

    /// Unique id of this emitter.
    #[must_use]
    pub fn id(&self) -> EntityId {
        self.registration.id()
    }

    /// Emitter name, unique within the document.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    pub(crate) fn set_name(&mut self, name: String) {
        self.name = name;
    }

    /// Id of the part the emitter follows.
    #[must_use]
    pub fn anchor_part(&self) -> Option<EntityId> {
        self.anchor_part
    }

    pub(crate) fn set_anchor_part(&mut self, anchor: Option<EntityId>) {
        self.anchor_part = anchor;
    }

    /// Particles spawned at once.
    #[must_use]
    pub fn burst_count(&self) -> i64 {
        self.burst_count
    }

    /// Sets the burst count; unparseable input becomes 0.
    pub fn set_burst_count(&mut self, value: impl Into<Value>) {
        self.burst_count = coerce::int(&value.into()).unwrap_or(0);
    }

    /// Particles spawned per second.
    #[must_use]
    pub fn emission_rate(&self) -> f64 {
        self.emission_rate
    }

    /// Sets the emission rate; unparseable input becomes 0.
    pub fn set_emission_rate(&mut self, value: impl Into<Value>) {
        self.emission_rate = coerce::float(&value.into()).unwrap_or(0.0);
    }

    /// Particles in emission order.
    #[must_use]
    pub fn particles(&self) -> &[EmitterParticle] {
        &self.particles
    }

    /// Particle at `index`.
    #[must_use]
    pub fn particle(&self, index: usize) -> Option<&EmitterParticle> {
        self.particles.get(index)
    }

    /// Mutable particle at `index`.
    pub fn particle_mut(&mut self, index: usize) -> Option<&mut EmitterParticle> {
        self.particles.get_mut(index)
    }

    /// Adds a particle from a list entry in file format (`{"particle": ...}`).
    /// Returns `None` for entries that are neither a name nor a descriptor.
    pub fn add_particle(&mut self, entry: &Value) -> Option<EntityId> {
        let particle = EmitterParticle::from_entry(self.registration.registry(), entry)?;
        let id = particle.id();
        self.particles.push(particle);
        Some(id)
    }

    /// Adds a reference to a particle resource.
    pub fn add_simple_particle(&mut self, name: impl Into<Value>) -> EntityId {
        let particle = Particle::new(self.registration.registry(), coerce::text(&name.into()));
        let id = particle.id();
        self.particles.push(EmitterParticle::Simple(particle));
        id
    }

    /// Adds an inline particle descriptor. Non-object input yields a default
    /// descriptor.
    pub fn add_animated_particle(&mut self, data: &Value) -> EntityId {
        let mut particle = ParticleAnimated::new(self.registration.registry());
        if let Some(data) = data.as_object() {
            particle.apply(data);
        }
        let id = particle.id();
        self.particles.push(EmitterParticle::Animated(particle));
        id
    }

    /// Removes and destroys the particle at `index`.
    pub fn remove_particle(&mut self, index: usize) -> bool {
        if index >= self.particles.len() {
            return false;
        }
        self.particles.remove(index);
        true
    }

    /// Applies everything except `anchorPart`, which the loader resolves.
    /// Returns the number of particle entries that were skipped.
    pub(crate) fn apply(&mut self, data: &Map<String, Value>) -> usize {
        if let Some(burst) = data.get("burstCount") {
            self.set_burst_count(burst.clone());
        }
        if let Some(rate) = data.get("emissionRate") {
            self.set_emission_rate(rate.clone());
        }
        let Some(entries) = data.get("particles").and_then(Value::as_array) else {
            return 0;
        };
        entries
            .iter()
            .filter(|entry| self.add_particle(entry).is_none())
            .count()
    }

    pub(crate) fn output(&self, names: &impl NameResolver) -> Value {
        let mut out = Map::new();
        if let Some(anchor) = self.anchor_part.and_then(|id| names.name_of(id)) {
            out.insert("anchorPart".into(), Value::from(anchor));
        }
        if self.emission_rate > 0.0 {
            out.insert("emissionRate".into(), coerce::number(self.emission_rate));
        }
        if self.burst_count > 0 {
            out.insert("burstCount".into(), Value::from(self.burst_count));
        }
        out.insert(
            "particles".into(),
            Value::Array(self.particles.iter().map(EmitterParticle::output).collect()),
        );
        Value::Object(out)
    }
}
