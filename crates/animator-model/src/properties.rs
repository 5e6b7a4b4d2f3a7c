//! Allow-listed property maps.
//!
//! Several entities carry free-looking `properties` objects that in fact only
//! accept a fixed set of keys. Each key declares its [`PropertyKind`], which
//! decides how incoming values are coerced.

use std::collections::BTreeMap;

use animator_common::coerce;
use serde_json::{Map, Value};

/// How values for an allowed key are coerced.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PropertyKind {
    /// Stringified value
    Text,
    /// Float, with the value used when parsing fails
    Number {
        /// Value substituted for unparseable input
        fallback: f64,
    },
    /// Integer, with the value used when parsing fails
    Integer {
        /// Value substituted for unparseable input
        fallback: i64,
    },
    /// 2-vector; malformed input becomes the zero vector
    Vec2,
    /// 2-element range; malformed input is rejected
    Range,
}

impl PropertyKind {
    /// Coerces a value. Only [`PropertyKind::Range`] can reject input.
    #[must_use]
    pub fn coerce(self, value: &Value) -> Option<PropertyValue> {
        match self {
            Self::Text => Some(PropertyValue::Text(coerce::text(value))),
            Self::Number { fallback } => Some(PropertyValue::Number(
                coerce::float(value).unwrap_or(fallback),
            )),
            Self::Integer { fallback } => Some(PropertyValue::Integer(
                coerce::int(value).unwrap_or(fallback),
            )),
            Self::Vec2 => Some(PropertyValue::Vec2(coerce::vec2_or_zero(value))),
            Self::Range => coerce::vec2(value).map(PropertyValue::Vec2),
        }
    }
}

/// A coerced property value.
#[derive(Debug, Clone, PartialEq)]
pub enum PropertyValue {
    /// String value
    Text(String),
    /// Float value
    Number(f64),
    /// Integer value
    Integer(i64),
    /// 2-vector or range
    Vec2([f64; 2]),
}

impl PropertyValue {
    /// External representation.
    #[must_use]
    pub fn to_json(&self) -> Value {
        match self {
            Self::Text(s) => Value::String(s.clone()),
            Self::Number(n) => coerce::number(*n),
            Self::Integer(i) => Value::from(*i),
            Self::Vec2(v) => coerce::vec2_value(*v),
        }
    }
}

/// Set of keys an entity accepts, with their kinds.
#[derive(Debug)]
pub struct PropertySchema {
    entries: &'static [(&'static str, PropertyKind)],
}

impl PropertySchema {
    /// Kind of an allowed key, or `None` if the key is not allowed.
    #[must_use]
    pub fn kind_of(&self, name: &str) -> Option<PropertyKind> {
        self.entries
            .iter()
            .find(|(key, _)| *key == name)
            .map(|(_, kind)| *kind)
    }

    /// All allowed keys in declaration order.
    pub fn keys(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.entries.iter().map(|(key, _)| *key)
    }
}

/// Sound properties shared by state types and states.
pub static SOUND_PROPERTIES: PropertySchema = PropertySchema {
    entries: &[
        ("immediateSound", PropertyKind::Text),
        (
            "immediateSoundRangeMultiplier",
            PropertyKind::Number { fallback: 1.0 },
        ),
        ("persistentSound", PropertyKind::Text),
        (
            "persistentSoundRangeMultiplier",
            PropertyKind::Number { fallback: 1.0 },
        ),
    ],
};

/// Per-part frame properties of animation states.
pub static FRAME_PROPERTIES: PropertySchema = PropertySchema {
    entries: &[
        ("image", PropertyKind::Text),
        ("offset", PropertyKind::Vec2),
        ("zLevel", PropertyKind::Integer { fallback: 1 }),
    ],
};

/// Randomization ranges of animated particles.
pub static PARTICLE_VARIANCE: PropertySchema = PropertySchema {
    entries: &[
        ("initialVelocity", PropertyKind::Range),
        ("timeToLive", PropertyKind::Number { fallback: 0.0 }),
        ("size", PropertyKind::Number { fallback: 1.0 }),
    ],
};

/// Single-valued properties gated by a schema.
#[derive(Debug, Clone)]
pub struct PropertyMap {
    schema: &'static PropertySchema,
    values: BTreeMap<String, PropertyValue>,
}

impl PropertyMap {
    /// Creates an empty map for the given schema.
    #[must_use]
    pub fn new(schema: &'static PropertySchema) -> Self {
        Self {
            schema,
            values: BTreeMap::new(),
        }
    }

    /// Sets a property. Returns false, leaving the map untouched, if the key
    /// is not allowed or the value is rejected.
    pub fn set(&mut self, name: &str, value: &Value) -> bool {
        let Some(coerced) = self.schema.kind_of(name).and_then(|kind| kind.coerce(value)) else {
            return false;
        };
        self.values.insert(name.to_owned(), coerced);
        true
    }

    /// Returns a property value.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&PropertyValue> {
        self.values.get(name)
    }

    /// Removes a property. Returns false if it was not set.
    pub fn remove(&mut self, name: &str) -> bool {
        self.values.remove(name).is_some()
    }

    /// Returns true if no property is set.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Number of set properties.
    #[must_use]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Iterates over set properties.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &PropertyValue)> {
        self.values.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// The schema gating this map.
    #[must_use]
    pub fn schema(&self) -> &'static PropertySchema {
        self.schema
    }

    /// Sets every entry of a JSON object, skipping disallowed keys.
    pub fn apply(&mut self, data: &Value) {
        if let Some(object) = data.as_object() {
            for (name, value) in object {
                self.set(name, value);
            }
        }
    }

    /// External representation.
    #[must_use]
    pub fn to_json(&self) -> Value {
        Value::Object(
            self.values
                .iter()
                .map(|(k, v)| (k.clone(), v.to_json()))
                .collect::<Map<_, _>>(),
        )
    }
}

/// Multi-valued (one entry per frame) properties gated by a schema.
#[derive(Debug, Clone)]
pub struct FramePropertyMap {
    schema: &'static PropertySchema,
    values: BTreeMap<String, Vec<PropertyValue>>,
}

impl FramePropertyMap {
    /// Creates an empty map for the given schema.
    #[must_use]
    pub fn new(schema: &'static PropertySchema) -> Self {
        Self {
            schema,
            values: BTreeMap::new(),
        }
    }

    /// Appends a frame value. Returns false if the key is not allowed or the
    /// value is rejected.
    pub fn push(&mut self, name: &str, value: &Value) -> bool {
        let Some(coerced) = self.schema.kind_of(name).and_then(|kind| kind.coerce(value)) else {
            return false;
        };
        self.values.entry(name.to_owned()).or_default().push(coerced);
        true
    }

    /// Removes one frame value. The key disappears with its last value.
    pub fn remove(&mut self, name: &str, index: usize) -> bool {
        let Some(frames) = self.values.get_mut(name) else {
            return false;
        };
        if index >= frames.len() {
            return false;
        }
        frames.remove(index);
        if frames.is_empty() {
            self.values.remove(name);
        }
        true
    }

    /// Frame values of a key.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&[PropertyValue]> {
        self.values.get(name).map(Vec::as_slice)
    }

    /// Returns true if no key has values.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Iterates over keys and their frame values.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &[PropertyValue])> {
        self.values.iter().map(|(k, v)| (k.as_str(), v.as_slice()))
    }

    /// Appends every frame of a JSON object of arrays. Non-array entries are
    /// skipped.
    pub fn apply(&mut self, data: &Value) {
        let Some(object) = data.as_object() else {
            return;
        };
        for (name, frames) in object {
            let Some(frames) = frames.as_array() else {
                continue;
            };
            for frame in frames {
                self.push(name, frame);
            }
        }
    }

    /// External representation.
    #[must_use]
    pub fn to_json(&self) -> Value {
        Value::Object(
            self.values
                .iter()
                .map(|(k, frames)| {
                    (
                        k.clone(),
                        Value::Array(frames.iter().map(PropertyValue::to_json).collect()),
                    )
                })
                .collect::<Map<_, _>>(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_disallowed_key_is_rejected() {
        let mut props = PropertyMap::new(&SOUND_PROPERTIES);
        assert!(!props.set("volume", &json!(3)));
        assert!(props.is_empty());
    }

    #[test]
    fn test_kind_drives_coercion() {
        let mut props = PropertyMap::new(&SOUND_PROPERTIES);
        assert!(props.set("immediateSound", &json!(12)));
        assert!(props.set("immediateSoundRangeMultiplier", &json!("oops")));
        assert_eq!(
            props.get("immediateSound"),
            Some(&PropertyValue::Text("12".into()))
        );
        assert_eq!(
            props.get("immediateSoundRangeMultiplier"),
            Some(&PropertyValue::Number(1.0))
        );
    }

    #[test]
    fn test_range_rejects_scalars() {
        let mut variance = PropertyMap::new(&PARTICLE_VARIANCE);
        assert!(!variance.set("initialVelocity", &json!(4)));
        assert!(variance.set("initialVelocity", &json!([1, 2])));
        assert!(variance.set("size", &json!("bad")));
        assert_eq!(variance.get("size"), Some(&PropertyValue::Number(1.0)));
        assert_eq!(
            variance.to_json(),
            json!({"initialVelocity": [1, 2], "size": 1})
        );
    }

    #[test]
    fn test_frame_values_append_and_remove() {
        let mut frames = FramePropertyMap::new(&FRAME_PROPERTIES);
        assert!(frames.push("zLevel", &json!(2)));
        assert!(frames.push("zLevel", &json!("x")));
        assert!(!frames.push("cycle", &json!(1)));
        assert_eq!(
            frames.get("zLevel"),
            Some(&[PropertyValue::Integer(2), PropertyValue::Integer(1)][..])
        );

        assert!(frames.remove("zLevel", 0));
        assert!(!frames.remove("zLevel", 5));
        assert!(frames.remove("zLevel", 0));
        assert!(frames.get("zLevel").is_none());
        assert!(frames.is_empty());
    }

    #[test]
    fn test_frame_apply_skips_non_arrays() {
        let mut frames = FramePropertyMap::new(&FRAME_PROPERTIES);
        frames.apply(&json!({"offset": [[1, 2], "junk"], "zLevel": 3}));
        assert_eq!(frames.to_json(), json!({"offset": [[1, 2], [0, 0]]}));
    }
}
