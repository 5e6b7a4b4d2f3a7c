//! Text encoding of documents.
//!
//! Three levels are supported: tab-indented pretty printing, the same with
//! scalar-only arrays and single scalar objects kept on one line, and fully
//! minified output. [`colorize`] turns pretty output into HTML lines for a
//! syntax-highlighting viewer.

use std::fmt;
use std::str::FromStr;

use animator_common::{coerce, AnimatorError};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// How much whitespace the encoder keeps.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CompressionLevel {
    /// Pretty printed, one value per line
    #[default]
    None = 0,
    /// Pretty printed, short scalar containers inline
    Medium = 1,
    /// Minified
    Full = 2,
}

impl CompressionLevel {
    /// All levels in index order.
    pub const ALL: [Self; 3] = [Self::None, Self::Medium, Self::Full];

    /// Level name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::None => "none",
            Self::Medium => "medium",
            Self::Full => "full",
        }
    }

    /// Interprets a level name or index (0, 1, 2).
    #[must_use]
    pub fn from_value(value: &Value) -> Option<Self> {
        if let Value::String(s) = value {
            if let Ok(level) = s.parse() {
                return Some(level);
            }
        }
        let index = usize::try_from(coerce::int(value)?).ok()?;
        Self::ALL.get(index).copied()
    }
}

impl fmt::Display for CompressionLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CompressionLevel {
    type Err = AnimatorError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|level| level.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| AnimatorError::UnknownCompression(s.to_owned()))
    }
}

/// Encodes a tree at the given level.
#[must_use]
pub fn encode(value: &Value, level: CompressionLevel) -> String {
    match level {
        CompressionLevel::Full => value.to_string(),
        CompressionLevel::None | CompressionLevel::Medium => {
            let mut out = String::new();
            write_pretty(&mut out, value, 0, level == CompressionLevel::Medium);
            out
        }
    }
}

fn is_scalar(value: &Value) -> bool {
    matches!(value, Value::Bool(_) | Value::Number(_) | Value::String(_))
}

fn newline(out: &mut String, depth: usize) {
    out.push('\n');
    out.extend(std::iter::repeat('\t').take(depth));
}

fn write_key(out: &mut String, key: &str) {
    out.push_str(&Value::from(key).to_string());
    out.push_str(": ");
}

fn write_pretty(out: &mut String, value: &Value, depth: usize, inline: bool) {
    match value {
        Value::Array(items) if items.is_empty() => out.push_str("[]"),
        Value::Object(map) if map.is_empty() => out.push_str("{}"),
        Value::Array(items) if inline && items.iter().all(is_scalar) => {
            out.push('[');
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                out.push_str(&item.to_string());
            }
            out.push(']');
        },
        Value::Object(map) if inline && map.len() == 1 && map.values().all(is_scalar) => {
            out.push('{');
            for (key, item) in map {
                write_key(out, key);
                out.push_str(&item.to_string());
            }
            out.push('}');
        },
        Value::Array(items) => {
            out.push('[');
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                newline(out, depth + 1);
                write_pretty(out, item, depth + 1, inline);
            }
            newline(out, depth);
            out.push(']');
        },
        Value::Object(map) => {
            out.push('{');
            for (i, (key, item)) in map.iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                newline(out, depth + 1);
                write_key(out, key);
                write_pretty(out, item, depth + 1, inline);
            }
            newline(out, depth);
            out.push('}');
        },
        scalar => out.push_str(&scalar.to_string()),
    }
}

/// Wraps every line of pretty-printed text in HTML for highlighting.
///
/// HTML-sensitive characters are escaped first. Lines of the shape
/// `indent "key": value end` get `json_key`, `json_number` and
/// `json_expression` spans; any other line is left as is.
#[must_use]
pub fn colorize(text: &str) -> String {
    let escaped = text
        .replace('&', "&amp;")
        .replace("\\\"", "&quot;")
        .replace('<', "&lt;")
        .replace('>', "&gt;");
    escaped
        .split('\n')
        .map(|line| colorize_line(line).unwrap_or_else(|| line.to_owned()))
        .collect::<Vec<_>>()
        .join("\n")
}

fn is_word(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_'
}

/// Splits a line into indent, key, value and closing run.
fn split_line(line: &str) -> Option<(&str, Option<&str>, &str, &str)> {
    let body = line.trim_start_matches(|c: char| c.is_whitespace());
    let indent = &line[..line.len() - body.len()];

    let (key, rest) = match split_key(body) {
        Some((key, rest)) => (Some(key), rest),
        None => (None, body),
    };

    let value_len = if rest.starts_with('"') {
        rest[1..].find('"').map_or(0, |end| end + 2)
    } else {
        rest.find(|c: char| !(is_word(c) || matches!(c, '.' | '+' | '-')))
            .unwrap_or(rest.len())
    };
    let (value, end) = rest.split_at(value_len);

    let brackets = end.trim_start_matches(|c: char| matches!(c, '[' | '{' | '}' | ']'));
    if !(brackets.is_empty() || brackets == ",") {
        return None;
    }
    Some((indent, key, value, end))
}

/// Matches `"key": ` (the space is optional) at the start of `body`.
fn split_key(body: &str) -> Option<(&str, &str)> {
    let inner = body.strip_prefix('"')?;
    let close = inner.find(|c: char| !(is_word(c) || c == '-'))?;
    if close == 0 || !inner[close..].starts_with("\":") {
        return None;
    }
    let mut key_len = close + 3;
    if body[key_len..].starts_with(' ') {
        key_len += 1;
    }
    Some(body.split_at(key_len))
}

fn colorize_line(line: &str) -> Option<String> {
    let (indent, key, value, end) = split_line(line)?;
    let mut out = String::from("<label class=\"line\">");
    out.push_str(indent);
    if let Some(key) = key {
        out.push_str("<span class=json_key>");
        out.push_str(&key.replace([':', ' '], ""));
        out.push_str("</span>: ");
    }
    if !value.is_empty() {
        let class = if ["true", "false", "null"]
            .iter()
            .any(|lit| value.eq_ignore_ascii_case(lit))
        {
            Some("json_expression")
        } else if value
            .chars()
            .all(|c| c.is_ascii_digit() || matches!(c, '+' | '-' | '.' | ',' | 'e'))
        {
            Some("json_number")
        } else {
            None
        };
        match class {
            Some(class) => {
                out.push_str("<span class=");
                out.push_str(class);
                out.push('>');
            },
            None => out.push_str("<span>"),
        }
        out.push_str(value);
        out.push_str("</span>");
    }
    out.push_str(end);
    out.push_str("</label>");
    Some(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use serde_json::json;

    fn sample() -> Value {
        json!({
            "globalTagDefaults": {"frame": "1"},
            "animatedParts": {
                "parts": {
                    "body": {
                        "properties": {"centered": true, "offset": [0, 1.5], "zLevel": 2}
                    }
                }
            },
            "particleEmitters": {"dust": {"particles": []}}
        })
    }

    #[test]
    fn test_none_is_tab_indented() {
        let text = encode(&json!({"a": [1, 2], "b": {}}), CompressionLevel::None);
        assert_eq!(text, "{\n\t\"a\": [\n\t\t1,\n\t\t2\n\t],\n\t\"b\": {}\n}");
    }

    #[test]
    fn test_medium_inlines_scalar_containers() {
        let text = encode(
            &json!({"offset": [0, 1.5], "tag": {"frame": "1"}, "mixed": [[1], {"a": 1, "b": 2}]}),
            CompressionLevel::Medium,
        );
        assert_eq!(
            text,
            "{\n\t\"offset\": [0,1.5],\n\t\"tag\": {\"frame\": \"1\"},\n\t\"mixed\": [\n\t\t[1],\n\t\t{\n\t\t\t\"a\": 1,\n\t\t\t\"b\": 2\n\t\t}\n\t]\n}"
        );
    }

    #[test]
    fn test_full_is_minified() {
        assert_eq!(
            encode(&json!({"a": [1, {"b": null}]}), CompressionLevel::Full),
            r#"{"a":[1,{"b":null}]}"#
        );
    }

    #[test]
    fn test_level_parsing() {
        assert_eq!("MEDIUM".parse::<CompressionLevel>().ok(), Some(CompressionLevel::Medium));
        assert!("tight".parse::<CompressionLevel>().is_err());
        assert_eq!(CompressionLevel::from_value(&json!(2)), Some(CompressionLevel::Full));
        assert_eq!(CompressionLevel::from_value(&json!("1")), Some(CompressionLevel::Medium));
        assert_eq!(CompressionLevel::from_value(&json!(-1)), None);
        assert_eq!(CompressionLevel::from_value(&json!(true)), None);
    }

    #[test]
    fn test_colorize_lines() {
        let html = colorize("{\n\t\"frames\": 5,\n\t\"mode\": \"a<b\",\n\t\"centered\": true\n}");
        let lines: Vec<&str> = html.lines().collect();
        assert_eq!(lines[0], "<label class=\"line\">{</label>");
        assert_eq!(
            lines[1],
            "<label class=\"line\">\t<span class=json_key>\"frames\"</span>: <span class=json_number>5</span>,</label>"
        );
        assert_eq!(
            lines[2],
            "<label class=\"line\">\t<span class=json_key>\"mode\"</span>: <span>\"a&lt;b\"</span>,</label>"
        );
        assert_eq!(
            lines[3],
            "<label class=\"line\">\t<span class=json_key>\"centered\"</span>: <span class=json_expression>true</span></label>"
        );
        assert_eq!(lines[4], "<label class=\"line\">}</label>");
    }

    #[test]
    fn test_colorize_leaves_unmatched_lines() {
        let html = colorize("\t\"offset\": [0,1],");
        assert_eq!(html, "\t\"offset\": [0,1],");
    }

    #[test]
    fn test_sample_levels_parse_back() {
        let tree = sample();
        for level in CompressionLevel::ALL {
            let text = encode(&tree, level);
            let parsed: Value = serde_json::from_str(&text).expect("valid json");
            assert_eq!(parsed, tree, "level {level}");
        }
    }

    fn arb_json() -> impl Strategy<Value = Value> {
        let leaf = prop_oneof![
            Just(Value::Null),
            any::<bool>().prop_map(Value::Bool),
            any::<i32>().prop_map(Value::from),
            (-1000i32..1000).prop_map(|n| Value::from(f64::from(n) / 4.0)),
            "[a-zA-Z0-9 _\"\\\\-]{0,8}".prop_map(Value::String),
        ];
        leaf.prop_recursive(4, 48, 6, |inner| {
            prop_oneof![
                prop::collection::vec(inner.clone(), 0..6).prop_map(Value::Array),
                prop::collection::vec(("[a-z]{1,6}", inner), 0..6)
                    .prop_map(|entries| Value::Object(entries.into_iter().collect())),
            ]
        })
    }

    proptest! {
        #[test]
        fn encoding_parses_back(tree in arb_json()) {
            for level in CompressionLevel::ALL {
                let text = encode(&tree, level);
                let parsed: Value = serde_json::from_str(&text).expect("valid json");
                prop_assert_eq!(&parsed, &tree);
            }
        }

        #[test]
        fn medium_never_adds_lines(tree in arb_json()) {
            let none = encode(&tree, CompressionLevel::None).lines().count();
            let medium = encode(&tree, CompressionLevel::Medium).lines().count();
            prop_assert!(medium <= none);
            prop_assert_eq!(encode(&tree, CompressionLevel::Full).lines().count(), 1);
        }

        #[test]
        fn encoding_is_idempotent(tree in arb_json()) {
            for level in CompressionLevel::ALL {
                let text = encode(&tree, level);
                let reparsed: Value = serde_json::from_str(&text).expect("valid json");
                prop_assert_eq!(encode(&reparsed, level), text);
            }
        }
    }
}
