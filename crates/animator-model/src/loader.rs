//! Loading documents from their file representation.
//!
//! Files refer to other entities by name; the loader rebuilds the document in
//! dependency order (tags, sound pools, groups, state types, parts, emitters)
//! and translates every name to the id of the entity just created. Dangling
//! names are dropped and reported, never fatal.

use animator_common::{coerce, AnimatorError, AnimatorResult, EntityKind};
use serde_json::{Map, Value};
use thiserror::Error;
use tracing::{info, warn};

use crate::document::Document;
use crate::events::DocumentEvent;

/// A recoverable problem found while loading. The offending data is dropped.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LoadWarning {
    /// Two entities of the same kind share a name
    #[error("duplicate {kind} name, already existent: {name}")]
    DuplicateName {
        /// Collection the name collided in
        kind: EntityKind,
        /// Colliding name
        name: String,
    },

    /// An entry does not have the expected shape
    #[error("malformed entry ignored: {path}")]
    MalformedEntry {
        /// Location of the entry
        path: String,
    },

    /// A part references a transformation group that does not exist
    #[error("part references non-existent transformation group, removed: {part} => {group}")]
    UnknownGroup {
        /// Referencing part
        part: String,
        /// Missing group
        group: String,
    },

    /// A part has part states for a state type that does not exist
    #[error("part has part states for non-existent state type, removed: {part} => {state_type}")]
    UnknownStateType {
        /// Referencing part
        part: String,
        /// Missing state type
        state_type: String,
    },

    /// A part has frame data for a state that does not exist
    #[error("part has part states for non-existent state, removed: {part} => {state_type} => {state}")]
    UnknownState {
        /// Referencing part
        part: String,
        /// State type searched
        state_type: String,
        /// Missing state
        state: String,
    },

    /// A part is anchored to a part that does not exist
    #[error("part references non-existent anchor part, removed: {part} => {anchor}")]
    UnknownPartAnchor {
        /// Anchored part
        part: String,
        /// Missing anchor
        anchor: String,
    },

    /// An emitter is anchored to a part that does not exist
    #[error("particle emitter anchored to non-existent part, removed: {emitter} => {anchor}")]
    UnknownEmitterAnchor {
        /// Anchored emitter
        emitter: String,
        /// Missing anchor
        anchor: String,
    },

    /// A part names itself as its anchor
    #[error("part anchored to itself, removed: {part}")]
    SelfAnchor {
        /// Offending part
        part: String,
    },

    /// Emitter particle entries that are neither a name nor a descriptor
    #[error("particle emitter has {count} malformed particle entries, removed: {emitter}")]
    MalformedParticle {
        /// Owning emitter
        emitter: String,
        /// Number of entries dropped
        count: usize,
    },
}

/// Outcome of a load: every recoverable problem encountered.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LoadReport {
    warnings: Vec<LoadWarning>,
}

impl LoadReport {
    /// Number of recoverable errors.
    #[must_use]
    pub fn error_count(&self) -> usize {
        self.warnings.len()
    }

    /// Returns true if the file loaded without problems.
    #[must_use]
    pub fn is_clean(&self) -> bool {
        self.warnings.is_empty()
    }

    /// The problems in the order they were found.
    #[must_use]
    pub fn warnings(&self) -> &[LoadWarning] {
        &self.warnings
    }

    fn push(&mut self, warning: LoadWarning) {
        warn!("Animation file: {}", warning);
        self.warnings.push(warning);
    }
}

const fn json_type(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

fn entries<'a>(parent: &'a Map<String, Value>, key: &str, report: &mut LoadReport) -> Option<&'a Map<String, Value>> {
    match parent.get(key)? {
        Value::Object(object) => Some(object),
        Value::Null => None,
        _ => {
            report.push(LoadWarning::MalformedEntry { path: key.to_owned() });
            None
        }
    }
}

impl Document {
    /// Replaces the document with the contents of `data` and returns the
    /// number of recoverable errors.
    pub fn load(&mut self, data: &Value) -> usize {
        self.load_with_report(data).error_count()
    }

    /// Parses and loads a file. Only unparseable text and a non-object root
    /// are errors, in which case the document is left untouched.
    pub fn load_str(&mut self, text: &str) -> AnimatorResult<usize> {
        let data: Value = serde_json::from_str(text)?;
        if !data.is_object() {
            return Err(AnimatorError::InvalidRoot {
                found: json_type(&data),
            });
        }
        Ok(self.load(&data))
    }

    /// Replaces the document with the contents of `data`.
    ///
    /// Update notifications are suppressed while the document is rebuilt; a
    /// single [`DocumentEvent::Load`] fires once it is complete.
    pub fn load_with_report(&mut self, data: &Value) -> LoadReport {
        self.listeners.suppress();
        self.reset();

        let mut report = LoadReport::default();
        match data.as_object() {
            Some(root) => self.load_root(root, &mut report),
            None => report.push(LoadWarning::MalformedEntry {
                path: format!("document root ({})", json_type(data)),
            }),
        }

        self.listeners.resume();
        info!(
            "Loaded animation with {} errors. {}",
            report.error_count(),
            self.registry().statistic()
        );
        self.listeners.fire(DocumentEvent::Load);
        report
    }

    fn load_root(&mut self, root: &Map<String, Value>, report: &mut LoadReport) {
        if let Some(tags) = entries(root, "globalTagDefaults", report) {
            self.load_tags(tags, report);
        }
        if let Some(pools) = entries(root, "sounds", report) {
            self.load_sound_pools(pools, report);
        }
        if let Some(groups) = entries(root, "transformationGroups", report) {
            self.load_groups(groups, report);
        }
        if let Some(animated) = entries(root, "animatedParts", report) {
            if let Some(types) = entries(animated, "stateTypes", report) {
                self.load_state_types(types, report);
            }
            if let Some(parts) = entries(animated, "parts", report) {
                self.load_parts(parts, report);
            }
        }
        if let Some(emitters) = entries(root, "particleEmitters", report) {
            self.load_emitters(emitters, report);
        }
    }

    fn load_tags(&mut self, tags: &Map<String, Value>, report: &mut LoadReport) {
        for (name, value) in tags {
            if value.is_null() {
                report.push(LoadWarning::MalformedEntry {
                    path: format!("globalTagDefaults => {name}"),
                });
                continue;
            }
            self.set_tag(name, value.clone());
        }
    }

    fn load_sound_pools(&mut self, pools: &Map<String, Value>, report: &mut LoadReport) {
        for (name, sounds) in pools {
            if self.add_sound_pool(name.as_str()).is_none() {
                report.push(LoadWarning::DuplicateName {
                    kind: EntityKind::SoundPool,
                    name: name.clone(),
                });
                continue;
            }
            let applied = self
                .sound_pools
                .last_mut()
                .is_some_and(|pool| pool.apply(sounds));
            if !applied {
                report.push(LoadWarning::MalformedEntry {
                    path: format!("sounds => {name}"),
                });
            }
        }
    }

    fn load_groups(&mut self, groups: &Map<String, Value>, report: &mut LoadReport) {
        for (name, parameters) in groups {
            if self.add_transformation_group(name.as_str()).is_none() {
                report.push(LoadWarning::DuplicateName {
                    kind: EntityKind::Group,
                    name: name.clone(),
                });
                continue;
            }
            if !parameters.is_object() {
                report.push(LoadWarning::MalformedEntry {
                    path: format!("transformationGroups => {name}"),
                });
            } else if let Some(group) = self.groups.last_mut() {
                group.apply(parameters);
            }
        }
    }

    fn load_state_types(&mut self, types: &Map<String, Value>, report: &mut LoadReport) {
        for (name, definition) in types {
            if self.add_state_type(name.as_str()).is_none() {
                report.push(LoadWarning::DuplicateName {
                    kind: EntityKind::StateType,
                    name: name.clone(),
                });
                continue;
            }
            if !definition.is_object() {
                report.push(LoadWarning::MalformedEntry {
                    path: format!("animatedParts => stateTypes => {name}"),
                });
            } else if let Some(state_type) = self.state_types.last_mut() {
                state_type.apply(definition);
            }
        }
    }

    fn load_parts(&mut self, parts: &Map<String, Value>, report: &mut LoadReport) {
        // Anchors can point at parts defined later in the file, so they are
        // resolved once every part exists.
        let mut pending_anchors: Vec<(usize, String)> = Vec::new();

        for (name, entry) in parts {
            if self.add_part(name.as_str()).is_none() {
                report.push(LoadWarning::DuplicateName {
                    kind: EntityKind::Part,
                    name: name.clone(),
                });
                continue;
            }
            let index = self.parts.len() - 1;
            let Some(entry) = entry.as_object() else {
                report.push(LoadWarning::MalformedEntry {
                    path: format!("animatedParts => parts => {name}"),
                });
                continue;
            };

            let properties = match entry.get("properties") {
                Some(Value::Object(properties)) => Some(properties),
                None | Some(Value::Null) => None,
                Some(_) => {
                    report.push(LoadWarning::MalformedEntry {
                        path: format!("animatedParts => parts => {name} => properties"),
                    });
                    None
                },
            };
            if let Some(properties) = properties {
                if let Some(anchor) = properties.get("anchorPart").filter(|v| coerce::truthy(v)) {
                    pending_anchors.push((index, coerce::text(anchor)));
                }
                self.parts[index].apply_properties(properties);
                if let Some(groups) = properties.get("transformationGroups").and_then(Value::as_array) {
                    self.load_part_groups(index, groups, report);
                }
            }
            if let Some(part_states) = entry.get("partStates") {
                self.load_part_states(index, part_states, report);
            }
        }

        for (index, anchor) in pending_anchors {
            let part = self.parts[index].name().to_owned();
            match self.part_index(&anchor) {
                Some(target) if target == index => report.push(LoadWarning::SelfAnchor { part }),
                Some(target) => {
                    let id = self.parts[target].id();
                    self.parts[index].set_anchor_part(Some(id));
                },
                None => report.push(LoadWarning::UnknownPartAnchor { part, anchor }),
            }
        }
    }

    fn load_part_groups(&mut self, index: usize, groups: &[Value], report: &mut LoadReport) {
        for group in groups.iter().map(coerce::text) {
            match self.transformation_group_index(&group) {
                Some(g) => {
                    let id = self.groups[g].id();
                    self.parts[index].add_group(id);
                },
                None => report.push(LoadWarning::UnknownGroup {
                    part: self.parts[index].name().to_owned(),
                    group,
                }),
            }
        }
    }

    fn load_part_states(&mut self, index: usize, part_states: &Value, report: &mut LoadReport) {
        let part_name = self.parts[index].name().to_owned();
        let Some(part_states) = part_states.as_object() else {
            report.push(LoadWarning::MalformedEntry {
                path: format!("animatedParts => parts => {part_name} => partStates"),
            });
            return;
        };

        for (type_name, states) in part_states {
            let Some(state_type) = self.state_types.iter().find(|t| t.name() == type_name) else {
                report.push(LoadWarning::UnknownStateType {
                    part: part_name.clone(),
                    state_type: type_name.clone(),
                });
                continue;
            };
            let part_state = self.parts[index].add_part_state(state_type.id());

            let Some(states) = states.as_object() else {
                report.push(LoadWarning::MalformedEntry {
                    path: format!("animatedParts => parts => {part_name} => partStates => {type_name}"),
                });
                continue;
            };
            for (state_name, frames) in states {
                let Some(state) = state_type.state_index(state_name).map(|i| state_type.states()[i].id()) else {
                    report.push(LoadWarning::UnknownState {
                        part: part_name.clone(),
                        state_type: type_name.clone(),
                        state: state_name.clone(),
                    });
                    continue;
                };
                part_state.add_animation_state(state);
                let last = part_state.animation_states().len() - 1;
                if let Some(anim) = part_state.animation_state_mut(last) {
                    anim.apply(frames);
                }
            }
        }
    }

    fn load_emitters(&mut self, emitters: &Map<String, Value>, report: &mut LoadReport) {
        for (name, entry) in emitters {
            if self.add_particle_emitter(name.as_str()).is_none() {
                report.push(LoadWarning::DuplicateName {
                    kind: EntityKind::Emitter,
                    name: name.clone(),
                });
                continue;
            }
            let Some(entry) = entry.as_object() else {
                report.push(LoadWarning::MalformedEntry {
                    path: format!("particleEmitters => {name}"),
                });
                continue;
            };

            let anchor = entry
                .get("anchorPart")
                .filter(|v| coerce::truthy(v))
                .map(coerce::text)
                .and_then(|anchor| match self.part_index(&anchor) {
                    Some(target) => Some(self.parts[target].id()),
                    None => {
                        report.push(LoadWarning::UnknownEmitterAnchor {
                            emitter: name.clone(),
                            anchor,
                        });
                        None
                    }
                });

            let Some(emitter) = self.emitters.last_mut() else {
                continue;
            };
            emitter.set_anchor_part(anchor);
            let skipped = emitter.apply(entry);
            if skipped > 0 {
                report.push(LoadWarning::MalformedParticle {
                    emitter: name.clone(),
                    count: skipped,
                });
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_tags_and_z_level_survive() {
        let mut doc = Document::new();
        let errors = doc.load(&json!({
            "globalTagDefaults": {"foo": "1"},
            "animatedParts": {"parts": {"A": {"properties": {"zLevel": 5}}}}
        }));
        assert_eq!(errors, 0);
        assert_eq!(
            doc.output(),
            Some(json!({
                "globalTagDefaults": {"foo": "1"},
                "animatedParts": {"parts": {"A": {"properties": {"centered": false, "zLevel": 5}}}}
            }))
        );
    }

    #[test]
    fn test_ghost_anchor_is_dropped() {
        let mut doc = Document::new();
        let report = doc.load_with_report(&json!({
            "animatedParts": {"parts": {"A": {"properties": {"anchorPart": "Ghost"}}}}
        }));
        assert_eq!(
            report.warnings(),
            [LoadWarning::UnknownPartAnchor {
                part: "A".into(),
                anchor: "Ghost".into()
            }]
        );
        assert_eq!(doc.part(0).and_then(|p| p.anchor_part()), None);
    }

    #[test]
    fn test_forward_anchor_and_self_anchor() {
        let mut doc = Document::new();
        let report = doc.load_with_report(&json!({
            "animatedParts": {"parts": {
                "arm": {"properties": {"anchorPart": "body"}},
                "body": {"properties": {"anchorPart": "body"}}
            }}
        }));
        assert_eq!(report.warnings(), [LoadWarning::SelfAnchor { part: "body".into() }]);
        let body = doc.part(1).map(|p| p.id());
        assert_eq!(doc.part(0).and_then(|p| p.anchor_part()), body);
    }

    #[test]
    fn test_dangling_names_are_counted() {
        let mut doc = Document::new();
        let errors = doc.load(&json!({
            "transformationGroups": {"flip": {}},
            "animatedParts": {
                "stateTypes": {"Pose": {"states": {"walk": {}}}},
                "parts": {
                    "leg": {
                        "properties": {"transformationGroups": ["flip", "spin"]},
                        "partStates": {
                            "Pose": {"walk": {}, "run": {}},
                            "Mood": {}
                        }
                    }
                }
            },
            "particleEmitters": {
                "dust": {"anchorPart": "foot", "particles": [{"particle": "dust"}, {"nothing": 1}]}
            }
        }));
        // spin, run, Mood, foot, one bad particle
        assert_eq!(errors, 5);

        let leg = doc.part(0).expect("leg loaded");
        assert_eq!(leg.groups().len(), 1);
        assert_eq!(leg.part_states().len(), 1);
        assert_eq!(leg.part_states()[0].animation_states().len(), 1);
        let dust = doc.particle_emitter(0).expect("emitter loaded");
        assert_eq!(dust.anchor_part(), None);
        assert_eq!(dust.particles().len(), 1);
    }

    #[test]
    fn test_malformed_part_properties_are_reported() {
        let mut doc = Document::new();
        let report = doc.load_with_report(&json!({
            "animatedParts": {"parts": {
                "arm": {"properties": "centered"},
                "leg": {"properties": null}
            }}
        }));
        assert_eq!(
            report.warnings(),
            [LoadWarning::MalformedEntry {
                path: "animatedParts => parts => arm => properties".into()
            }]
        );
        assert_eq!(doc.parts().len(), 2);
        assert!(doc.part(0).is_some_and(|arm| !arm.centered()));
    }

    #[test]
    fn test_load_replaces_content_and_fires_once() {
        use std::sync::atomic::{AtomicUsize, Ordering};
        use std::sync::Arc;

        let loads = Arc::new(AtomicUsize::new(0));
        let updates = Arc::new(AtomicUsize::new(0));
        let mut doc = Document::new();
        doc.add_part("old");

        let counter = Arc::clone(&loads);
        doc.add_event_listener(DocumentEvent::Load, None, move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok(())
        });
        let counter = Arc::clone(&updates);
        doc.add_event_listener(DocumentEvent::Update, None, move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok(())
        });

        doc.load(&json!({"sounds": {"steps": ["/a.ogg"]}, "animatedParts": {"parts": {"new": {}}}}));
        assert_eq!(loads.load(Ordering::SeqCst), 1);
        assert_eq!(updates.load(Ordering::SeqCst), 0);
        assert_eq!(doc.part_index("old"), None);
        assert_eq!(doc.part_index("new"), Some(0));
    }

    #[test]
    fn test_load_str_rejects_invalid_text() {
        let mut doc = Document::new();
        doc.add_part("kept");
        assert!(matches!(doc.load_str("{oops"), Err(AnimatorError::Parse(_))));
        assert!(matches!(
            doc.load_str("[1, 2]"),
            Err(AnimatorError::InvalidRoot { found: "array" })
        ));
        assert_eq!(doc.part_index("kept"), Some(0));
        assert_eq!(doc.load_str(r#"{"sounds": {"s": "x"}}"#).ok(), Some(1));
    }

    #[test]
    fn test_sentinel_state_data_is_kept() {
        let mut doc = Document::new();
        doc.load(&json!({
            "animatedParts": {"stateTypes": {"Pose": {"states": {"none": {"frames": 3}}}}}
        }));
        let pose = doc.state_type(0).expect("type loaded");
        assert_eq!(pose.states().len(), 1);
        assert_eq!(pose.states()[0].frames(), 3);
    }
}
