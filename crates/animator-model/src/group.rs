//! Transformation groups.

use animator_common::{coerce, EntityId, EntityKind, IdRegistry, Registration};
use serde_json::{Map, Value};

const INTERPOLATED: &str = "interpolated";

/// A named transformation channel parts can subscribe to.
///
/// Parameters are free-form, except `interpolated`, which is always a
/// boolean and defaults to `true`.
#[derive(Debug)]
pub struct Group {
    name: String,
    parameters: Map<String, Value>,
    registration: Registration,
}

impl Group {
    pub(crate) fn new(registry: &IdRegistry, name: String) -> Self {
        let mut parameters = Map::new();
        parameters.insert(INTERPOLATED.into(), Value::Bool(true));
        Self {
            name,
            parameters,
            registration: registry.register(EntityKind::Group),
        }
    }

    /// Unique id of this group.
    #[must_use]
    pub fn id(&self) -> EntityId {
        self.registration.id()
    }

    /// Group name, unique within the document.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    pub(crate) fn set_name(&mut self, name: String) {
        self.name = name;
    }

    /// All parameters.
    #[must_use]
    pub fn parameters(&self) -> &Map<String, Value> {
        &self.parameters
    }

    /// A single parameter.
    #[must_use]
    pub fn parameter(&self, name: &str) -> Option<&Value> {
        self.parameters.get(name)
    }

    /// Whether transformations of this group are interpolated.
    #[must_use]
    pub fn interpolated(&self) -> bool {
        self.parameters
            .get(INTERPOLATED)
            .map_or(true, coerce::truthy)
    }

    /// Sets a parameter; `interpolated` is coerced to a boolean.
    pub fn set_parameter(&mut self, name: &str, value: impl Into<Value>) {
        let value = value.into();
        let value = if name == INTERPOLATED {
            Value::Bool(coerce::truthy(&value))
        } else {
            value
        };
        self.parameters.insert(name.to_owned(), value);
    }

    /// Removes a parameter. Returns false if it was not set.
    pub fn remove_parameter(&mut self, name: &str) -> bool {
        self.parameters.remove(name).is_some()
    }

    pub(crate) fn apply(&mut self, data: &Value) {
        if let Some(object) = data.as_object() {
            for (name, value) in object {
                self.set_parameter(name, value.clone());
            }
        }
    }

    pub(crate) fn output(&self) -> Value {
        Value::Object(self.parameters.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_interpolated_by_default() {
        let registry = IdRegistry::new();
        let group = Group::new(&registry, "rotation".into());
        assert!(group.interpolated());
        assert_eq!(group.output(), json!({"interpolated": true}));
    }

    #[test]
    fn test_apply_keeps_freeform_parameters() {
        let registry = IdRegistry::new();
        let mut group = Group::new(&registry, "rotation".into());
        group.apply(&json!({"interpolated": 0, "pivot": [1, 2]}));
        assert!(!group.interpolated());
        assert_eq!(group.parameter("pivot"), Some(&json!([1, 2])));
        assert_eq!(
            group.output(),
            json!({"interpolated": false, "pivot": [1, 2]})
        );
    }

    #[test]
    fn test_remove_parameter() {
        let registry = IdRegistry::new();
        let mut group = Group::new(&registry, "flip".into());
        group.set_parameter("speed", 2);
        assert!(group.remove_parameter("speed"));
        assert!(!group.remove_parameter("speed"));
        assert!(group.remove_parameter("interpolated"));
        assert!(group.interpolated());
    }
}
