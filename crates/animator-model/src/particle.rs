//! Particles owned by emitters.
//!
//! An emitter entry is either a reference to an external `.particle` file
//! ([`Particle`]) or an inline descriptor ([`ParticleAnimated`]).

use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use animator_common::{coerce, EntityId, EntityKind, IdRegistry, Registration};
use serde_json::{Map, Value};

use crate::properties::{PropertyMap, PARTICLE_VARIANCE};

/// Particle type that carries an `animation` field.
pub const ANIMATED_TYPE: &str = "animated";

/// Reference to an external particle resource.
#[derive(Debug)]
pub struct Particle {
    name: String,
    registration: Registration,
}

impl Particle {
    pub(crate) fn new(registry: &IdRegistry, name: String) -> Self {
        Self {
            name,
            registration: registry.register(EntityKind::Particle),
        }
    }

    /// Unique id of this particle.
    #[must_use]
    pub fn id(&self) -> EntityId {
        self.registration.id()
    }

    /// Name of the referenced particle resource.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Renames the reference. Particle names need not be unique.
    pub fn set_name(&mut self, value: impl Into<Value>) {
        self.name = coerce::text(&value.into());
    }
}

/// Optional fields of an animated particle that are only written out once
/// they have been set explicitly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ParticleField {
    /// `size`
    Size,
    /// `angularVelocity`
    AngularVelocity,
    /// `color`
    Color,
    /// `fade`
    Fade,
    /// `destructionTime`
    DestructionTime,
    /// `destructionAction`
    DestructionAction,
    /// `position`
    Position,
    /// `initialVelocity`
    InitialVelocity,
    /// `finalVelocity`
    FinalVelocity,
    /// `approach`
    Approach,
    /// `layer`
    Layer,
    /// `timeToLive`
    TimeToLive,
}

impl ParticleField {
    /// All fields in output order.
    pub const ALL: [Self; 12] = [
        Self::Size,
        Self::AngularVelocity,
        Self::Color,
        Self::Fade,
        Self::DestructionTime,
        Self::DestructionAction,
        Self::Position,
        Self::InitialVelocity,
        Self::FinalVelocity,
        Self::Approach,
        Self::Layer,
        Self::TimeToLive,
    ];

    /// Key used in the file format.
    #[must_use]
    pub const fn key(self) -> &'static str {
        match self {
            Self::Size => "size",
            Self::AngularVelocity => "angularVelocity",
            Self::Color => "color",
            Self::Fade => "fade",
            Self::DestructionTime => "destructionTime",
            Self::DestructionAction => "destructionAction",
            Self::Position => "position",
            Self::InitialVelocity => "initialVelocity",
            Self::FinalVelocity => "finalVelocity",
            Self::Approach => "approach",
            Self::Layer => "layer",
            Self::TimeToLive => "timeToLive",
        }
    }
}

impl fmt::Display for ParticleField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

impl FromStr for ParticleField {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL.into_iter().find(|f| f.key() == s).ok_or(())
    }
}

/// Inline particle descriptor.
///
/// Setters mark their field as saved so it is written out even when the value
/// equals the default; [`ParticleAnimated::set_saved`] toggles that by hand.
#[derive(Debug)]
pub struct ParticleAnimated {
    particle_type: String,
    animation: String,
    size: f64,
    angular_velocity: f64,
    color: [i64; 4],
    fade: f64,
    destruction_time: f64,
    destruction_action: String,
    position: [f64; 2],
    initial_velocity: [f64; 2],
    final_velocity: [f64; 2],
    approach: [f64; 2],
    layer: String,
    time_to_live: f64,
    flippable: bool,
    variance: PropertyMap,
    saved: BTreeSet<ParticleField>,
    registration: Registration,
}

impl ParticleAnimated {
    pub(crate) fn new(registry: &IdRegistry) -> Self {
        Self {
            particle_type: "ember".to_owned(),
            animation: String::new(),
            size: 1.0,
            angular_velocity: 0.0,
            color: [0; 4],
            fade: 1.0,
            destruction_time: 0.0,
            destruction_action: "shrink".to_owned(),
            position: [0.0; 2],
            initial_velocity: [0.0; 2],
            final_velocity: [0.0; 2],
            approach: [0.0; 2],
            layer: "front".to_owned(),
            time_to_live: 0.0,
            flippable: false,
            variance: PropertyMap::new(&PARTICLE_VARIANCE),
            saved: BTreeSet::new(),
            registration: registry.register(EntityKind::Particle),
        }
    }

    /// Unique id of this particle.
    #[must_use]
    pub fn id(&self) -> EntityId {
        self.registration.id()
    }

    /// Particle type (`ember`, `animated`, `streak`, ...).
    #[must_use]
    pub fn particle_type(&self) -> &str {
        &self.particle_type
    }

    /// Sets the type. Leaving `animated` clears the animation.
    pub fn set_particle_type(&mut self, value: impl Into<Value>) {
        self.particle_type = coerce::text(&value.into());
        if self.particle_type != ANIMATED_TYPE {
            self.animation.clear();
        }
    }

    /// Animation resource, only meaningful for the `animated` type.
    #[must_use]
    pub fn animation(&self) -> &str {
        &self.animation
    }

    /// Sets the animation. Ignored unless the type is `animated`.
    pub fn set_animation(&mut self, value: impl Into<Value>) {
        if self.particle_type == ANIMATED_TYPE {
            self.animation = coerce::text(&value.into());
        }
    }

    /// Size multiplier.
    #[must_use]
    pub fn size(&self) -> f64 {
        self.size
    }

    /// Sets the size (default 1).
    pub fn set_size(&mut self, value: impl Into<Value>) {
        self.size = coerce::float(&value.into()).unwrap_or(1.0);
        self.saved.insert(ParticleField::Size);
    }

    /// Angular velocity.
    #[must_use]
    pub fn angular_velocity(&self) -> f64 {
        self.angular_velocity
    }

    /// Sets the angular velocity (default 0).
    pub fn set_angular_velocity(&mut self, value: impl Into<Value>) {
        self.angular_velocity = coerce::float(&value.into()).unwrap_or(0.0);
        self.saved.insert(ParticleField::AngularVelocity);
    }

    /// RGBA color.
    #[must_use]
    pub fn color(&self) -> [i64; 4] {
        self.color
    }

    /// Sets the color; non-arrays become transparent black.
    pub fn set_color(&mut self, value: impl Into<Value>) {
        self.color = coerce::color(&value.into()).unwrap_or([0; 4]);
        self.saved.insert(ParticleField::Color);
    }

    /// Fade factor in `0..=1`.
    #[must_use]
    pub fn fade(&self) -> f64 {
        self.fade
    }

    /// Sets the fade, clamped to `0..=1` (default 1).
    pub fn set_fade(&mut self, value: impl Into<Value>) {
        self.fade = coerce::float(&value.into())
            .unwrap_or(1.0)
            .clamp(0.0, 1.0);
        self.saved.insert(ParticleField::Fade);
    }

    /// Time the destruction action takes.
    #[must_use]
    pub fn destruction_time(&self) -> f64 {
        self.destruction_time
    }

    /// Sets the destruction time (default 0).
    pub fn set_destruction_time(&mut self, value: impl Into<Value>) {
        self.destruction_time = coerce::float(&value.into()).unwrap_or(0.0);
        self.saved.insert(ParticleField::DestructionTime);
    }

    /// What happens when the particle dies (`shrink`, `fade`, ...).
    #[must_use]
    pub fn destruction_action(&self) -> &str {
        &self.destruction_action
    }

    /// Sets the destruction action.
    pub fn set_destruction_action(&mut self, value: impl Into<Value>) {
        self.destruction_action = coerce::text(&value.into());
        self.saved.insert(ParticleField::DestructionAction);
    }

    /// Spawn position relative to the emitter.
    #[must_use]
    pub fn position(&self) -> [f64; 2] {
        self.position
    }

    /// Sets the position; malformed vectors become `[0, 0]`.
    pub fn set_position(&mut self, value: impl Into<Value>) {
        self.position = coerce::vec2_or_zero(&value.into());
        self.saved.insert(ParticleField::Position);
    }

    /// Velocity at spawn.
    #[must_use]
    pub fn initial_velocity(&self) -> [f64; 2] {
        self.initial_velocity
    }

    /// Sets the initial velocity; malformed vectors become `[0, 0]`.
    pub fn set_initial_velocity(&mut self, value: impl Into<Value>) {
        self.initial_velocity = coerce::vec2_or_zero(&value.into());
        self.saved.insert(ParticleField::InitialVelocity);
    }

    /// Velocity approached over the particle's life.
    #[must_use]
    pub fn final_velocity(&self) -> [f64; 2] {
        self.final_velocity
    }

    /// Sets the final velocity; malformed vectors become `[0, 0]`.
    pub fn set_final_velocity(&mut self, value: impl Into<Value>) {
        self.final_velocity = coerce::vec2_or_zero(&value.into());
        self.saved.insert(ParticleField::FinalVelocity);
    }

    /// Rate at which the final velocity is approached.
    #[must_use]
    pub fn approach(&self) -> [f64; 2] {
        self.approach
    }

    /// Sets the approach rate; malformed vectors become `[0, 0]`.
    pub fn set_approach(&mut self, value: impl Into<Value>) {
        self.approach = coerce::vec2_or_zero(&value.into());
        self.saved.insert(ParticleField::Approach);
    }

    /// Render layer (`front`, `middle`, `back`).
    #[must_use]
    pub fn layer(&self) -> &str {
        &self.layer
    }

    /// Sets the layer.
    pub fn set_layer(&mut self, value: impl Into<Value>) {
        self.layer = coerce::text(&value.into());
        self.saved.insert(ParticleField::Layer);
    }

    /// Lifetime in seconds.
    #[must_use]
    pub fn time_to_live(&self) -> f64 {
        self.time_to_live
    }

    /// Sets the lifetime (default 0).
    pub fn set_time_to_live(&mut self, value: impl Into<Value>) {
        self.time_to_live = coerce::float(&value.into()).unwrap_or(0.0);
        self.saved.insert(ParticleField::TimeToLive);
    }

    /// Whether the particle mirrors with its emitter.
    #[must_use]
    pub fn flippable(&self) -> bool {
        self.flippable
    }

    /// Sets `flippable` from any value's truthiness.
    pub fn set_flippable(&mut self, value: impl Into<Value>) {
        self.flippable = coerce::truthy(&value.into());
    }

    /// Randomization ranges.
    #[must_use]
    pub fn variance(&self) -> &PropertyMap {
        &self.variance
    }

    /// Sets a variance. Returns false for keys outside `initialVelocity`,
    /// `timeToLive` and `size`, or a non-range `initialVelocity`.
    pub fn set_variance(&mut self, name: &str, value: impl Into<Value>) -> bool {
        self.variance.set(name, &value.into())
    }

    /// Removes a variance.
    pub fn remove_variance(&mut self, name: &str) -> bool {
        self.variance.remove(name)
    }

    /// Returns true if a field is written out.
    #[must_use]
    pub fn is_saved(&self, field: ParticleField) -> bool {
        self.saved.contains(&field)
    }

    /// Marks a field as written out or omitted.
    pub fn set_saved(&mut self, field: ParticleField, saved: bool) {
        if saved {
            self.saved.insert(field);
        } else {
            self.saved.remove(&field);
        }
    }

    pub(crate) fn apply(&mut self, data: &Map<String, Value>) {
        let present = |key: &str| data.get(key).filter(|v| !v.is_null()).cloned();

        if let Some(v) = present("type") {
            self.set_particle_type(v);
        }
        if let Some(v) = present("animation") {
            self.set_animation(v);
        }
        if let Some(v) = present("size") {
            self.set_size(v);
        }
        if let Some(v) = present("angularVelocity") {
            self.set_angular_velocity(v);
        }
        if let Some(v) = present("color").filter(Value::is_array) {
            self.set_color(v);
        }
        if let Some(v) = present("fade") {
            self.set_fade(v);
        }
        if let Some(v) = present("destructionTime") {
            self.set_destruction_time(v);
        }
        if let Some(v) = present("destructionAction") {
            self.set_destruction_action(v);
        }
        if let Some(v) = present("position") {
            self.set_position(v);
        }
        if let Some(v) = present("initialVelocity") {
            self.set_initial_velocity(v);
        }
        if let Some(v) = present("finalVelocity") {
            self.set_final_velocity(v);
        }
        if let Some(v) = present("approach") {
            self.set_approach(v);
        }
        if let Some(v) = present("layer") {
            self.set_layer(v);
        }
        if let Some(v) = present("timeToLive") {
            self.set_time_to_live(v);
        }
        if let Some(v) = present("flippable") {
            self.set_flippable(v);
        }
        if let Some(variance) = data.get("variance") {
            self.variance.apply(variance);
        }
    }

    fn field_value(&self, field: ParticleField) -> Value {
        match field {
            ParticleField::Size => coerce::number(self.size),
            ParticleField::AngularVelocity => coerce::number(self.angular_velocity),
            ParticleField::Color => Value::Array(self.color.iter().map(|c| Value::from(*c)).collect()),
            ParticleField::Fade => coerce::number(self.fade),
            ParticleField::DestructionTime => coerce::number(self.destruction_time),
            ParticleField::DestructionAction => Value::from(self.destruction_action.as_str()),
            ParticleField::Position => coerce::vec2_value(self.position),
            ParticleField::InitialVelocity => coerce::vec2_value(self.initial_velocity),
            ParticleField::FinalVelocity => coerce::vec2_value(self.final_velocity),
            ParticleField::Approach => coerce::vec2_value(self.approach),
            ParticleField::Layer => Value::from(self.layer.as_str()),
            ParticleField::TimeToLive => coerce::number(self.time_to_live),
        }
    }

    fn output(&self) -> Value {
        let mut particle = Map::new();
        particle.insert("type".into(), Value::from(self.particle_type.as_str()));
        if self.particle_type == ANIMATED_TYPE {
            particle.insert("animation".into(), Value::from(self.animation.as_str()));
        }
        for field in ParticleField::ALL {
            if self.is_saved(field) {
                particle.insert(field.key().into(), self.field_value(field));
            }
        }
        if self.flippable {
            particle.insert("flippable".into(), Value::Bool(true));
        }
        if !self.variance.is_empty() {
            particle.insert("variance".into(), self.variance.to_json());
        }
        Value::Object(particle)
    }
}

/// One entry of an emitter's particle list.
#[derive(Debug)]
pub enum EmitterParticle {
    /// Reference to a particle resource by name
    Simple(Particle),
    /// Inline particle descriptor
    Animated(ParticleAnimated),
}

impl EmitterParticle {
    /// Builds a particle from an emitter list entry (`{"particle": ...}`).
    /// A string becomes a [`Particle`], an object a [`ParticleAnimated`];
    /// anything else is rejected.
    pub(crate) fn from_entry(registry: &IdRegistry, entry: &Value) -> Option<Self> {
        match entry.get("particle")? {
            Value::String(name) => Some(Self::Simple(Particle::new(registry, name.clone()))),
            Value::Object(data) => {
                let mut particle = ParticleAnimated::new(registry);
                particle.apply(data);
                Some(Self::Animated(particle))
            },
            _ => None,
        }
    }

    /// Unique id of the particle.
    #[must_use]
    pub fn id(&self) -> EntityId {
        match self {
            Self::Simple(p) => p.id(),
            Self::Animated(p) => p.id(),
        }
    }

    /// Returns the animated descriptor, if this is one.
    #[must_use]
    pub fn as_animated(&self) -> Option<&ParticleAnimated> {
        match self {
            Self::Animated(p) => Some(p),
            Self::Simple(_) => None,
        }
    }

    /// Mutable animated descriptor, if this is one.
    pub fn as_animated_mut(&mut self) -> Option<&mut ParticleAnimated> {
        match self {
            Self::Animated(p) => Some(p),
            Self::Simple(_) => None,
        }
    }

    /// Returns the simple reference, if this is one.
    #[must_use]
    pub fn as_simple(&self) -> Option<&Particle> {
        match self {
            Self::Simple(p) => Some(p),
            Self::Animated(_) => None,
        }
    }

    /// Mutable simple reference, if this is one.
    pub fn as_simple_mut(&mut self) -> Option<&mut Particle> {
        match self {
            Self::Simple(p) => Some(p),
            Self::Animated(_) => None,
        }
    }

    pub(crate) fn output(&self) -> Value {
        let inner = match self {
            Self::Simple(p) => Value::from(p.name()),
            Self::Animated(p) => p.output(),
        };
        let mut entry = Map::new();
        entry.insert("particle".into(), inner);
        Value::Object(entry)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_entry_dispatch() {
        let registry = IdRegistry::new();
        let simple = EmitterParticle::from_entry(&registry, &json!({"particle": "spark"}))
            .expect("string entry");
        assert_eq!(simple.as_simple().map(Particle::name), Some("spark"));

        let animated = EmitterParticle::from_entry(&registry, &json!({"particle": {"type": "streak"}}))
            .expect("object entry");
        assert_eq!(
            animated.as_animated().map(ParticleAnimated::particle_type),
            Some("streak")
        );

        assert!(EmitterParticle::from_entry(&registry, &json!({"particle": 3})).is_none());
        assert!(EmitterParticle::from_entry(&registry, &json!(["spark"])).is_none());
    }

    #[test]
    fn test_only_saved_fields_are_written() {
        let registry = IdRegistry::new();
        let mut particle = ParticleAnimated::new(&registry);
        particle.set_fade(1.0);
        particle.set_time_to_live("2.5");
        assert_eq!(
            EmitterParticle::Animated(particle).output(),
            json!({"particle": {"type": "ember", "fade": 1, "timeToLive": 2.5}})
        );
    }

    #[test]
    fn test_unsaving_a_field_hides_it() {
        let registry = IdRegistry::new();
        let mut particle = ParticleAnimated::new(&registry);
        particle.set_layer("back");
        particle.set_saved(ParticleField::Layer, false);
        assert_eq!(particle.layer(), "back");
        assert_eq!(particle.output(), json!({"type": "ember"}));
    }

    #[test]
    fn test_animation_requires_animated_type() {
        let registry = IdRegistry::new();
        let mut particle = ParticleAnimated::new(&registry);
        particle.set_animation("/fx/puff.animation");
        assert_eq!(particle.animation(), "");

        particle.set_particle_type("animated");
        particle.set_animation("/fx/puff.animation");
        assert_eq!(
            particle.output(),
            json!({"type": "animated", "animation": "/fx/puff.animation"})
        );

        particle.set_particle_type("ember");
        assert_eq!(particle.animation(), "");
    }

    #[test]
    fn test_fade_is_clamped() {
        let registry = IdRegistry::new();
        let mut particle = ParticleAnimated::new(&registry);
        particle.set_fade(3);
        assert!((particle.fade() - 1.0).abs() < f64::EPSILON);
        particle.set_fade(-0.5);
        assert!(particle.fade().abs() < f64::EPSILON);
    }

    #[test]
    fn test_variance_gate() {
        let registry = IdRegistry::new();
        let mut particle = ParticleAnimated::new(&registry);
        assert!(!particle.set_variance("color", json!([1, 1])));
        assert!(!particle.set_variance("initialVelocity", 2));
        assert!(particle.set_variance("initialVelocity", json!([2, 3])));
        assert!(particle.variance().get("color").is_none());
        assert!(particle.remove_variance("initialVelocity"));
    }

    #[test]
    fn test_apply_full_descriptor() {
        let registry = IdRegistry::new();
        let data = json!({
            "type": "animated",
            "animation": "/fx/smoke.animation",
            "size": 0.5,
            "color": [255, 255, 255, 128],
            "position": [0, 1.5],
            "layer": "middle",
            "flippable": true,
            "variance": {"initialVelocity": [1, 1], "size": 0.25, "unknown": 2}
        });
        let mut particle = ParticleAnimated::new(&registry);
        particle.apply(data.as_object().expect("object"));
        assert_eq!(
            particle.output(),
            json!({
                "type": "animated",
                "animation": "/fx/smoke.animation",
                "size": 0.5,
                "color": [255, 255, 255, 128],
                "position": [0, 1.5],
                "layer": "middle",
                "flippable": true,
                "variance": {"initialVelocity": [1, 1], "size": 0.25}
            })
        );
    }
}
