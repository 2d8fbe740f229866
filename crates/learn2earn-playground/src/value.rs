//! Dynamically-typed values held in the variable table.

use std::fmt;

use indexmap::IndexMap;

/// A runtime value produced by the interpreter.
///
/// Names are untyped: the same variable may hold a string on one line and a
/// list on the next.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// Text.
    Str(String),
    /// Any number. Integers are stored as whole floats.
    Num(f64),
    /// `True` / `False`.
    Bool(bool),
    /// Ordered list of values.
    List(Vec<Value>),
    /// String-keyed mapping that keeps insertion order.
    Map(IndexMap<String, Value>),
}

impl Value {
    /// Short type name used in error messages.
    #[must_use]
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::Str(_) => "str",
            Self::Num(n) => {
                if is_integral(*n) {
                    "int"
                } else {
                    "float"
                }
            }
            Self::Bool(_) => "bool",
            Self::List(_) => "list",
            Self::Map(_) => "dict",
        }
    }

    /// Python truthiness.
    ///
    /// # Examples
    ///
    /// ```
    /// use learn2earn_playground::Value;
    ///
    /// assert!(Value::Num(3.0).truthy());
    /// assert!(!Value::Str(String::new()).truthy());
    /// assert!(!Value::List(Vec::new()).truthy());
    /// ```
    #[must_use]
    pub fn truthy(&self) -> bool {
        match self {
            Self::Str(s) => !s.is_empty(),
            Self::Num(n) => *n != 0.0 && !n.is_nan(),
            Self::Bool(b) => *b,
            Self::List(items) => !items.is_empty(),
            Self::Map(map) => !map.is_empty(),
        }
    }

    /// Numeric view of the value. Booleans count as `0` / `1`.
    #[must_use]
    pub const fn as_number(&self) -> Option<f64> {
        match self {
            Self::Num(n) => Some(*n),
            Self::Bool(true) => Some(1.0),
            Self::Bool(false) => Some(0.0),
            _ => None,
        }
    }

    /// Representation used when the value is nested inside a list or map.
    ///
    /// Strings are quoted; everything else renders as it would when printed.
    #[must_use]
    pub fn repr(&self) -> String {
        match self {
            Self::Str(s) => quote(s),
            other => other.to_string(),
        }
    }

    /// Converts a parsed JSON literal into a value.
    ///
    /// `null` has no counterpart and is rejected.
    pub fn from_json(json: serde_json::Value) -> Result<Self, String> {
        match json {
            serde_json::Value::Null => Err("null is not a supported value".to_string()),
            serde_json::Value::Bool(b) => Ok(Self::Bool(b)),
            serde_json::Value::Number(n) => n
                .as_f64()
                .map(Self::Num)
                .ok_or_else(|| format!("number {n} is out of range")),
            serde_json::Value::String(s) => Ok(Self::Str(s)),
            serde_json::Value::Array(items) => items
                .into_iter()
                .map(Self::from_json)
                .collect::<Result<Vec<_>, _>>()
                .map(Self::List),
            serde_json::Value::Object(entries) => entries
                .into_iter()
                .map(|(key, value)| Self::from_json(value).map(|value| (key, value)))
                .collect::<Result<IndexMap<_, _>, _>>()
                .map(Self::Map),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Str(s) => f.write_str(s),
            Self::Num(n) => f.write_str(&format_number(*n)),
            Self::Bool(b) => write!(f, "{b}"),
            Self::List(items) => {
                f.write_str("[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    f.write_str(&item.repr())?;
                }
                f.write_str("]")
            }
            Self::Map(map) => {
                f.write_str("{")?;
                for (i, (key, value)) in map.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{}: {}", quote(key), value.repr())?;
                }
                f.write_str("}")
            }
        }
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Self::Str(s.to_string())
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Self::Num(n)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Self::Bool(b)
    }
}

/// Largest magnitude printed as a plain integer.
const MAX_EXACT_INTEGER: f64 = 9_007_199_254_740_992.0;

/// Returns `true` if `n` has no fractional part and fits the exact integer range.
pub(crate) fn is_integral(n: f64) -> bool {
    n.is_finite() && n.fract() == 0.0 && n.abs() <= MAX_EXACT_INTEGER
}

/// Formats a number the way lesson output expects: `96`, not `96.0`.
#[must_use]
pub fn format_number(n: f64) -> String {
    if n.is_nan() {
        return "NaN".to_string();
    }
    if n.is_infinite() {
        return if n > 0.0 { "Infinity" } else { "-Infinity" }.to_string();
    }
    if is_integral(n) {
        // Bounded by MAX_EXACT_INTEGER above.
        #[allow(clippy::cast_possible_truncation)]
        let whole = n as i64;
        return whole.to_string();
    }
    n.to_string()
}

fn quote(s: &str) -> String {
    if s.contains('\'') && !s.contains('"') {
        format!("\"{s}\"")
    } else {
        format!("'{}'", s.replace('\'', "\\'"))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_format_number_drops_trailing_zero() {
        assert_eq!(format_number(96.0), "96");
        assert_eq!(format_number(-3.0), "-3");
        assert_eq!(format_number(-0.0), "0");
        assert_eq!(format_number(2.5), "2.5");
        assert_eq!(format_number(f64::INFINITY), "Infinity");
    }

    #[test]
    fn test_bool_prints_native_token() {
        assert_eq!(Value::Bool(true).to_string(), "true");
        assert_eq!(Value::Bool(false).to_string(), "false");
    }

    #[test]
    fn test_list_and_map_display() {
        let list = Value::List(vec!["red".into(), 2.0.into(), true.into()]);
        insta::assert_snapshot!(list.to_string(), @"['red', 2, true]");

        let mut map = IndexMap::new();
        map.insert("name".to_string(), Value::from("Bob"));
        map.insert("age".to_string(), Value::from(30.0));
        insta::assert_snapshot!(Value::Map(map).to_string(), @"{'name': 'Bob', 'age': 30}");
    }

    #[test]
    fn test_repr_quotes_strings_with_apostrophes() {
        assert_eq!(Value::from("it's").repr(), "\"it's\"");
        assert_eq!(Value::from("plain").repr(), "'plain'");
    }

    #[test]
    fn test_from_json_keeps_object_order() {
        let json: serde_json::Value = serde_json::from_str(r#"{"z": 1, "a": [true, "x"]}"#).unwrap();
        let value = Value::from_json(json).unwrap();
        assert_eq!(value.to_string(), "{'z': 1, 'a': [true, 'x']}");
    }

    #[test]
    fn test_from_json_rejects_null() {
        let json: serde_json::Value = serde_json::from_str("[1, null]").unwrap();
        assert!(Value::from_json(json).is_err());
    }

    #[test]
    fn test_truthiness_and_type_names() {
        assert!(Value::from("x").truthy());
        assert!(!Value::Num(0.0).truthy());
        assert!(!Value::Map(IndexMap::new()).truthy());
        assert_eq!(Value::Num(1.0).type_name(), "int");
        assert_eq!(Value::Num(1.5).type_name(), "float");
        assert_eq!(Value::Bool(true).as_number(), Some(1.0));
    }
}
