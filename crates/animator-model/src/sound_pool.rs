//! Sound pools.

use animator_common::{coerce, EntityId, EntityKind, IdRegistry, Registration};
use serde_json::Value;

/// A named, ordered list of sound references. Duplicates are allowed.
#[derive(Debug)]
pub struct SoundPool {
    name: String,
    sounds: Vec<String>,
    registration: Registration,
}

impl SoundPool {
    pub(crate) fn new(registry: &IdRegistry, name: String) -> Self {
        Self {
            name,
            sounds: Vec::new(),
            registration: registry.register(EntityKind::SoundPool),
        }
    }

    /// Unique id of this pool.
    #[must_use]
    pub fn id(&self) -> EntityId {
        self.registration.id()
    }

    /// Pool name, unique within the document.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    pub(crate) fn set_name(&mut self, name: String) {
        self.name = name;
    }

    /// Sound references in order.
    #[must_use]
    pub fn sounds(&self) -> &[String] {
        &self.sounds
    }

    /// Appends a sound and returns its index.
    pub fn push(&mut self, sound: impl Into<Value>) -> usize {
        self.sounds.push(coerce::text(&sound.into()));
        self.sounds.len() - 1
    }

    /// Replaces the sound at `index`.
    pub fn set(&mut self, index: usize, sound: impl Into<Value>) -> bool {
        let Some(slot) = self.sounds.get_mut(index) else {
            return false;
        };
        *slot = coerce::text(&sound.into());
        true
    }

    /// Removes the sound at `index`.
    pub fn remove(&mut self, index: usize) -> bool {
        if index >= self.sounds.len() {
            return false;
        }
        self.sounds.remove(index);
        true
    }

    /// Appends every entry of a JSON array. Returns false if `data` is not an
    /// array.
    pub(crate) fn apply(&mut self, data: &Value) -> bool {
        let Some(items) = data.as_array() else {
            return false;
        };
        for item in items {
            self.push(item.clone());
        }
        true
    }

    pub(crate) fn output(&self) -> Value {
        Value::Array(self.sounds.iter().map(|s| Value::from(s.as_str())).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_order_and_duplicates() {
        let registry = IdRegistry::new();
        let mut pool = SoundPool::new(&registry, "steps".into());
        assert_eq!(pool.push("/a.ogg"), 0);
        assert_eq!(pool.push("/b.ogg"), 1);
        assert_eq!(pool.push("/a.ogg"), 2);
        assert!(pool.remove(1));
        assert!(!pool.remove(5));
        assert_eq!(pool.output(), json!(["/a.ogg", "/a.ogg"]));
    }

    #[test]
    fn test_apply_rejects_non_arrays() {
        let registry = IdRegistry::new();
        let mut pool = SoundPool::new(&registry, "steps".into());
        assert!(!pool.apply(&json!("/a.ogg")));
        assert!(pool.apply(&json!(["/a.ogg", 3])));
        assert!(pool.set(1, "/c.ogg"));
        assert_eq!(pool.sounds(), ["/a.ogg", "/c.ogg"]);
    }
}
