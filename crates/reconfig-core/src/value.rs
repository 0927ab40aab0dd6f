//! Parameter values
//!
//! A [`ConfigValue`] is what a single dotted path maps to: a scalar or an
//! ordered list. Untyped formats (ini, properties, dotenv, redis, xml) only
//! ever produce strings; typed formats keep their native scalar types.

use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use std::fmt::{self, Display, Formatter};

/// Value stored at a leaf path
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ConfigValue {
    /// Explicit null (json/yaml/hcl)
    Null,
    /// Boolean
    Bool(bool),
    /// Signed integer
    Integer(i64),
    /// Floating point number
    Float(f64),
    /// Text
    String(String),
    /// Ordered list
    List(Vec<ConfigValue>),
}

impl ConfigValue {
    /// Convert a JSON scalar or array
    ///
    /// Returns `None` for objects; those are flattened by the caller.
    #[must_use]
    pub fn from_json(value: &JsonValue) -> Option<Self> {
        match value {
            JsonValue::Null => Some(Self::Null),
            JsonValue::Bool(b) => Some(Self::Bool(*b)),
            JsonValue::Number(n) => Some(match n.as_i64() {
                Some(i) => Self::Integer(i),
                None => Self::Float(n.as_f64().unwrap_or_default()),
            }),
            JsonValue::String(s) => Some(Self::String(s.clone())),
            JsonValue::Array(items) => items
                .iter()
                .map(Self::from_json)
                .collect::<Option<Vec<_>>>()
                .map(Self::List),
            JsonValue::Object(_) => None,
        }
    }

    /// Convert into JSON
    ///
    /// Non-finite floats have no JSON form and become `null`.
    #[must_use]
    pub fn to_json(&self) -> JsonValue {
        match self {
            Self::Null => JsonValue::Null,
            Self::Bool(b) => JsonValue::Bool(*b),
            Self::Integer(i) => JsonValue::from(*i),
            Self::Float(f) => serde_json::Number::from_f64(*f)
                .map_or(JsonValue::Null, JsonValue::Number),
            Self::String(s) => JsonValue::String(s.clone()),
            Self::List(items) => JsonValue::Array(items.iter().map(Self::to_json).collect()),
        }
    }

    /// Guess a typed value from operator-supplied text
    ///
    /// `true`/`false` become booleans, integral text becomes an integer and
    /// decimal text a float. Everything else stays a string.
    #[must_use]
    pub fn infer(text: &str) -> Self {
        match text {
            "true" => return Self::Bool(true),
            "false" => return Self::Bool(false),
            _ => {}
        }
        if let Ok(i) = text.parse::<i64>() {
            return Self::Integer(i);
        }
        let looks_decimal = text.contains(['.', 'e', 'E'])
            && text.chars().any(|c| c.is_ascii_digit())
            && text.chars().all(|c| c.is_ascii_digit() || "+-.eE".contains(c));
        if looks_decimal {
            if let Ok(f) = text.parse::<f64>() {
                if f.is_finite() {
                    return Self::Float(f);
                }
            }
        }
        Self::String(text.to_string())
    }

    /// Borrow the text of a string value
    #[inline]
    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) => Some(s),
            _ => None,
        }
    }

    /// Check if the value is not a list
    #[inline]
    #[must_use]
    pub fn is_scalar(&self) -> bool {
        !matches!(self, Self::List(_))
    }

    /// Plain text rendering used by line-oriented formats
    ///
    /// Strings are written verbatim; lists are comma-joined.
    #[must_use]
    pub fn to_text(&self) -> String {
        match self {
            Self::Null => String::new(),
            Self::String(s) => s.clone(),
            Self::List(items) => items
                .iter()
                .map(Self::to_text)
                .collect::<Vec<_>>()
                .join(","),
            other => other.to_string(),
        }
    }
}

impl Display for ConfigValue {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => write!(f, "null"),
            Self::Bool(b) => write!(f, "{b}"),
            Self::Integer(i) => write!(f, "{i}"),
            Self::Float(x) => write!(f, "{x}"),
            Self::String(s) => write!(f, "{s}"),
            Self::List(_) => write!(f, "{}", self.to_json()),
        }
    }
}

impl From<&str> for ConfigValue {
    fn from(value: &str) -> Self {
        Self::String(value.to_string())
    }
}

impl From<String> for ConfigValue {
    fn from(value: String) -> Self {
        Self::String(value)
    }
}

impl From<i64> for ConfigValue {
    fn from(value: i64) -> Self {
        Self::Integer(value)
    }
}

impl From<bool> for ConfigValue {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<f64> for ConfigValue {
    fn from(value: f64) -> Self {
        Self::Float(value)
    }
}

impl<T: Into<ConfigValue>> From<Vec<T>> for ConfigValue {
    fn from(items: Vec<T>) -> Self {
        Self::List(items.into_iter().map(Into::into).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn infer_types() {
        assert_eq!(ConfigValue::infer("true"), ConfigValue::Bool(true));
        assert_eq!(ConfigValue::infer("200"), ConfigValue::Integer(200));
        assert_eq!(ConfigValue::infer("-3"), ConfigValue::Integer(-3));
        assert_eq!(ConfigValue::infer("0.75"), ConfigValue::Float(0.75));
        assert_eq!(ConfigValue::infer("128M"), ConfigValue::from("128M"));
        assert_eq!(ConfigValue::infer("1.2.3"), ConfigValue::from("1.2.3"));
        assert_eq!(ConfigValue::infer("e"), ConfigValue::from("e"));
        assert_eq!(ConfigValue::infer("ON"), ConfigValue::from("ON"));
    }

    #[test]
    fn json_conversion() {
        let value = ConfigValue::from_json(&json!([1, "a", true, null])).unwrap();
        assert_eq!(
            value,
            ConfigValue::List(vec![
                ConfigValue::Integer(1),
                ConfigValue::from("a"),
                ConfigValue::Bool(true),
                ConfigValue::Null,
            ])
        );
        assert_eq!(value.to_json(), json!([1, "a", true, null]));
        assert!(ConfigValue::from_json(&json!({"a": 1})).is_none());
    }

    #[test]
    fn serde_untagged_shape() {
        let encoded = serde_json::to_string(&ConfigValue::from(vec!["a", "b"])).unwrap();
        assert_eq!(encoded, r#"["a","b"]"#);
        let decoded: ConfigValue = serde_json::from_str("42").unwrap();
        assert_eq!(decoded, ConfigValue::Integer(42));
        let decoded: ConfigValue = serde_json::from_str("null").unwrap();
        assert_eq!(decoded, ConfigValue::Null);
    }

    #[test]
    fn text_rendering() {
        assert_eq!(ConfigValue::from("x y").to_text(), "x y");
        assert_eq!(ConfigValue::from(vec![1_i64, 2]).to_text(), "1,2");
        assert_eq!(ConfigValue::from(vec!["a"]).to_string(), r#"["a"]"#);
        assert_eq!(ConfigValue::Null.to_text(), "");
    }
}
