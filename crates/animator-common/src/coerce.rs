//! Permissive value coercion.
//!
//! Setters across the document model accept arbitrary JSON values and never
//! fail. These helpers do the conversion; a `None` result means the value
//! could not be interpreted and the caller substitutes its default.

use serde_json::Value;

/// Interprets a value as an integer.
///
/// Numbers truncate toward zero, strings parse their leading integer prefix
/// (`"12px"` is 12). Everything else fails.
#[must_use]
pub fn int(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n
            .as_i64()
            .or_else(|| n.as_f64().filter(|f| f.is_finite()).map(|f| f.trunc() as i64)),
        Value::String(s) => parse_int_prefix(s),
        _ => None,
    }
}

/// Interprets a value as a finite float.
#[must_use]
pub fn float(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64().filter(|f| f.is_finite()),
        Value::String(s) => parse_float_prefix(s),
        _ => None,
    }
}

/// Stringifies a value.
#[must_use]
pub fn text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => "null".to_owned(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n.to_string(),
        Value::Array(items) => items
            .iter()
            .map(|item| match item {
                Value::Null => String::new(),
                other => text(other),
            })
            .collect::<Vec<_>>()
            .join(","),
        Value::Object(_) => value.to_string(),
    }
}

/// JavaScript-style truthiness.
#[must_use]
pub fn truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0 && !f.is_nan()),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}

/// Interprets a value as a 2-vector. Requires an array of exactly two
/// elements; unparseable components become 0.
#[must_use]
pub fn vec2(value: &Value) -> Option<[f64; 2]> {
    match value.as_array() {
        Some(items) if items.len() == 2 => Some([
            float(&items[0]).unwrap_or(0.0),
            float(&items[1]).unwrap_or(0.0),
        ]),
        _ => None,
    }
}

/// Interprets a value as a 2-vector, substituting the zero vector on any
/// shape mismatch.
#[must_use]
pub fn vec2_or_zero(value: &Value) -> [f64; 2] {
    vec2(value).unwrap_or([0.0, 0.0])
}

/// Interprets a value as an RGBA color. Any array is accepted; missing or
/// unparseable components become 0.
#[must_use]
pub fn color(value: &Value) -> Option<[i64; 4]> {
    let items = value.as_array()?;
    let component = |i: usize| items.get(i).and_then(int).unwrap_or(0);
    Some([component(0), component(1), component(2), component(3)])
}

/// Builds a JSON number, writing integral floats as integers so `1.0`
/// serializes as `1`.
#[must_use]
pub fn number(value: f64) -> Value {
    const MAX_EXACT: f64 = 9_007_199_254_740_992.0;
    if value.fract() == 0.0 && value.abs() < MAX_EXACT {
        Value::from(value as i64)
    } else {
        serde_json::Number::from_f64(value).map_or(Value::Null, Value::Number)
    }
}

/// Builds a JSON array from a 2-vector.
#[must_use]
pub fn vec2_value(value: [f64; 2]) -> Value {
    Value::Array(value.iter().copied().map(number).collect())
}

fn parse_int_prefix(s: &str) -> Option<i64> {
    let s = s.trim_start();
    let bytes = s.as_bytes();
    let mut end = usize::from(matches!(bytes.first(), Some(b'+' | b'-')));
    let digits_start = end;
    while bytes.get(end).is_some_and(u8::is_ascii_digit) {
        end += 1;
    }
    if end == digits_start {
        return None;
    }
    s[..end].parse().ok()
}

fn parse_float_prefix(s: &str) -> Option<f64> {
    let s = s.trim_start();
    let bytes = s.as_bytes();
    let mut end = usize::from(matches!(bytes.first(), Some(b'+' | b'-')));
    let mut digits = 0;
    while bytes.get(end).is_some_and(u8::is_ascii_digit) {
        end += 1;
        digits += 1;
    }
    if bytes.get(end) == Some(&b'.') {
        end += 1;
        while bytes.get(end).is_some_and(u8::is_ascii_digit) {
            end += 1;
            digits += 1;
        }
    }
    if digits == 0 {
        return None;
    }
    // Exponent only counts if it is complete.
    if matches!(bytes.get(end), Some(b'e' | b'E')) {
        let mut exp_end = end + 1;
        if matches!(bytes.get(exp_end), Some(b'+' | b'-')) {
            exp_end += 1;
        }
        let exp_digits = exp_end;
        while bytes.get(exp_end).is_some_and(u8::is_ascii_digit) {
            exp_end += 1;
        }
        if exp_end > exp_digits {
            end = exp_end;
        }
    }
    s[..end].parse::<f64>().ok().filter(|f| f.is_finite())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_int_coercion() {
        assert_eq!(int(&json!(5)), Some(5));
        assert_eq!(int(&json!(5.9)), Some(5));
        assert_eq!(int(&json!(-2.5)), Some(-2));
        assert_eq!(int(&json!("12px")), Some(12));
        assert_eq!(int(&json!("  -3")), Some(-3));
        assert_eq!(int(&json!("abc")), None);
        assert_eq!(int(&json!(true)), None);
        assert_eq!(int(&Value::Null), None);
        assert_eq!(int(&json!([1])), None);
    }

    #[test]
    fn test_float_coercion() {
        assert_eq!(float(&json!(0.25)), Some(0.25));
        assert_eq!(float(&json!("1.5x")), Some(1.5));
        assert_eq!(float(&json!(".5")), Some(0.5));
        assert_eq!(float(&json!("2e3")), Some(2000.0));
        assert_eq!(float(&json!("2e")), Some(2.0));
        assert_eq!(float(&json!("-")), None);
        assert_eq!(float(&json!("x1")), None);
        assert_eq!(float(&json!(false)), None);
    }

    #[test]
    fn test_text_coercion() {
        assert_eq!(text(&json!("a")), "a");
        assert_eq!(text(&json!(3)), "3");
        assert_eq!(text(&json!(true)), "true");
        assert_eq!(text(&json!([1, "b", null])), "1,b,");
        assert_eq!(text(&json!({"k": 1})), r#"{"k":1}"#);
    }

    #[test]
    fn test_truthiness() {
        assert!(truthy(&json!(1)));
        assert!(truthy(&json!("x")));
        assert!(truthy(&json!([])));
        assert!(!truthy(&json!(0)));
        assert!(!truthy(&json!("")));
        assert!(!truthy(&Value::Null));
    }

    #[test]
    fn test_vec2_shapes() {
        assert_eq!(vec2(&json!([1, "2.5"])), Some([1.0, 2.5]));
        assert_eq!(vec2(&json!([1, "x"])), Some([1.0, 0.0]));
        assert_eq!(vec2(&json!([1])), None);
        assert_eq!(vec2(&json!("1,2")), None);
        assert_eq!(vec2_or_zero(&json!([1, 2, 3])), [0.0, 0.0]);
    }

    #[test]
    fn test_color_components() {
        assert_eq!(color(&json!([255, "128", 0])), Some([255, 128, 0, 0]));
        assert_eq!(color(&json!(7)), None);
    }

    #[test]
    fn test_number_output() {
        assert_eq!(number(1.0).to_string(), "1");
        assert_eq!(number(0.5).to_string(), "0.5");
        assert_eq!(number(-3.0).to_string(), "-3");
        assert_eq!(vec2_value([1.0, 0.25]).to_string(), "[1,0.25]");
    }
}
