//! Schema model
//!
//! A JSON-Schema-shaped document is compiled once into a [`SchemaNode`]
//! tree. Validation then matches on node kinds instead of poking at
//! loosely-typed maps.

use std::collections::{BTreeMap, BTreeSet};

use regex::Regex;
use serde_json::{Map, Value as JsonValue};

/// Errors building a schema tree
#[derive(Debug, Clone, thiserror::Error)]
pub enum SchemaError {
    /// `type` names something other than a JSON Schema type
    #[error("unsupported schema type '{kind}' at '{path}'")]
    UnsupportedType { path: String, kind: String },

    /// A keyword holds a value of the wrong shape
    #[error("invalid '{keyword}' at '{path}': {message}")]
    InvalidKeyword {
        path: String,
        keyword: String,
        message: String,
    },

    /// `pattern` is not a valid regular expression
    #[error("invalid pattern at '{path}': {message}")]
    InvalidPattern { path: String, message: String },

    /// Configured top-level key is not a property of the schema root
    #[error("schema has no top-level property '{0}'")]
    MissingTopLevelKey(String),
}

/// Compiled schema tree
#[derive(Debug, Clone)]
pub enum SchemaNode {
    /// Mapping with named properties
    Object(ObjectSchema),
    /// Ordered list
    Array(ArraySchema),
    /// Text
    String(StringSchema),
    /// Whole number
    Integer(NumericSchema),
    /// Any number
    Number(NumericSchema),
    /// Boolean flag
    Boolean,
    /// Explicit null
    Null,
    /// Matches when any alternative matches
    AnyOf(Vec<SchemaNode>),
    /// Matches everything
    Any,
}

/// What to do with properties the schema does not name
#[derive(Debug, Clone, Default)]
pub enum AdditionalProperties {
    /// Accept without checks
    #[default]
    Allowed,
    /// Report as unknown parameters
    Denied,
    /// Check against a schema
    Schema(Box<SchemaNode>),
}

/// `type: object`
#[derive(Debug, Clone, Default)]
pub struct ObjectSchema {
    /// Named properties
    pub properties: BTreeMap<String, SchemaNode>,
    /// Properties that must be present
    pub required: BTreeSet<String>,
    /// Handling of unnamed properties
    pub additional: AdditionalProperties,
}

/// `type: array`
#[derive(Debug, Clone, Default)]
pub struct ArraySchema {
    /// Schema for every item
    pub items: Option<Box<SchemaNode>>,
    /// Minimum item count
    pub min_items: Option<usize>,
    /// Maximum item count
    pub max_items: Option<usize>,
}

/// `type: string`
#[derive(Debug, Clone, Default)]
pub struct StringSchema {
    /// Allowed values
    pub allowed: Option<Vec<String>>,
    /// Unanchored regular expression the text must match
    pub pattern: Option<Regex>,
    /// Minimum length in characters
    pub min_length: Option<usize>,
    /// Maximum length in characters
    pub max_length: Option<usize>,
}

/// `type: integer` / `type: number`
#[derive(Debug, Clone, Default)]
pub struct NumericSchema {
    /// Accepted interval
    pub range: Range,
    /// Allowed values
    pub allowed: Option<Vec<f64>>,
}

/// One end of a [`Range`]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bound {
    /// Limit
    pub value: f64,
    /// Whether the limit itself is excluded
    pub exclusive: bool,
}

/// Numeric interval
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Range {
    /// Lower bound
    pub min: Option<Bound>,
    /// Upper bound
    pub max: Option<Bound>,
}

impl Range {
    /// Check if `value` lies inside the interval
    #[must_use]
    pub fn contains(&self, value: f64) -> bool {
        let above_min = self.min.map_or(true, |b| {
            if b.exclusive {
                value > b.value
            } else {
                value >= b.value
            }
        });
        let below_max = self.max.map_or(true, |b| {
            if b.exclusive {
                value < b.value
            } else {
                value <= b.value
            }
        });
        above_min && below_max
    }

    /// Check if neither bound is set
    #[must_use]
    pub fn is_unbounded(&self) -> bool {
        self.min.is_none() && self.max.is_none()
    }
}

impl std::fmt::Display for Range {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let open = match self.min {
            Some(b) if b.exclusive => format!("({}", b.value),
            Some(b) => format!("[{}", b.value),
            None => "(-inf".to_string(),
        };
        let close = match self.max {
            Some(b) if b.exclusive => format!("{})", b.value),
            Some(b) => format!("{}]", b.value),
            None => "+inf)".to_string(),
        };
        write!(f, "{open}, {close}")
    }
}

impl SchemaNode {
    /// Compile a JSON-Schema-shaped document
    ///
    /// Supported keywords: `type` (string or list), `properties`,
    /// `required`, `additionalProperties`, `items`, `minItems`, `maxItems`,
    /// `enum`, `pattern`, `minLength`, `maxLength`, `minimum`, `maximum`,
    /// `exclusiveMinimum`, `exclusiveMaximum` (draft-4 boolean and draft-6
    /// numeric forms), `anyOf`, `oneOf`, `nullable` and
    /// `x-kubernetes-int-or-string`.
    ///
    /// # Errors
    /// Returns error on unknown types, malformed keywords or bad patterns
    pub fn from_json(schema: &JsonValue) -> Result<Self, SchemaError> {
        build(schema, "$")
    }

    /// Compile the sub-schema of property `key` of the document root
    ///
    /// # Errors
    /// Returns [`SchemaError::MissingTopLevelKey`] if the root has no such property
    pub fn from_json_at(schema: &JsonValue, key: &str) -> Result<Self, SchemaError> {
        let sub = schema
            .get("properties")
            .and_then(|props| props.get(key))
            .ok_or_else(|| SchemaError::MissingTopLevelKey(key.to_string()))?;
        build(sub, &format!("$.{key}"))
    }

    /// Short type name used in messages
    #[must_use]
    pub fn kind(&self) -> String {
        match self {
            Self::Object(_) => "object".to_string(),
            Self::Array(_) => "array".to_string(),
            Self::String(_) => "string".to_string(),
            Self::Integer(_) => "integer".to_string(),
            Self::Number(_) => "number".to_string(),
            Self::Boolean => "boolean".to_string(),
            Self::Null => "null".to_string(),
            Self::AnyOf(options) => options
                .iter()
                .map(Self::kind)
                .collect::<Vec<_>>()
                .join(" | "),
            Self::Any => "any".to_string(),
        }
    }
}

fn build(schema: &JsonValue, path: &str) -> Result<SchemaNode, SchemaError> {
    let map = match schema {
        JsonValue::Bool(true) => return Ok(SchemaNode::Any),
        JsonValue::Bool(false) => return Ok(SchemaNode::AnyOf(Vec::new())),
        JsonValue::Object(map) => map,
        other => {
            return Err(invalid(path, "schema", format!("expected an object, found {other}")));
        }
    };

    let node = build_typed(map, path)?;
    match map.get("nullable") {
        None | Some(JsonValue::Bool(false)) => Ok(node),
        Some(JsonValue::Bool(true)) => Ok(with_null(node)),
        Some(other) => Err(invalid(path, "nullable", format!("expected a boolean, found {other}"))),
    }
}

/// OpenAPI `nullable: true` admits null next to the declared type
fn with_null(node: SchemaNode) -> SchemaNode {
    match node {
        SchemaNode::Any | SchemaNode::Null => node,
        SchemaNode::AnyOf(mut options) => {
            if !options.iter().any(|o| matches!(o, SchemaNode::Null)) {
                options.push(SchemaNode::Null);
            }
            SchemaNode::AnyOf(options)
        }
        other => SchemaNode::AnyOf(vec![other, SchemaNode::Null]),
    }
}

fn build_typed(map: &Map<String, JsonValue>, path: &str) -> Result<SchemaNode, SchemaError> {
    for keyword in ["anyOf", "oneOf"] {
        if let Some(options) = map.get(keyword) {
            let options = options
                .as_array()
                .ok_or_else(|| invalid(path, keyword, "expected a list of schemas"))?;
            return options
                .iter()
                .enumerate()
                .map(|(i, option)| build(option, &format!("{path}.{keyword}[{i}]")))
                .collect::<Result<Vec<_>, _>>()
                .map(SchemaNode::AnyOf);
        }
    }

    if map.get("x-kubernetes-int-or-string").and_then(JsonValue::as_bool) == Some(true) {
        return Ok(SchemaNode::AnyOf(vec![
            SchemaNode::Integer(numeric(map, path)?),
            SchemaNode::String(string(map, path)?),
        ]));
    }

    match map.get("type") {
        Some(JsonValue::String(kind)) => build_kind(kind, map, path),
        Some(JsonValue::Array(kinds)) => kinds
            .iter()
            .map(|kind| {
                let kind = kind
                    .as_str()
                    .ok_or_else(|| invalid(path, "type", "expected type names"))?;
                build_kind(kind, map, path)
            })
            .collect::<Result<Vec<_>, _>>()
            .map(SchemaNode::AnyOf),
        Some(other) => Err(invalid(path, "type", format!("expected a string, found {other}"))),
        None => build_kind(infer_kind(map), map, path),
    }
}

/// Guess the type of an untyped schema from its keywords
fn infer_kind(map: &Map<String, JsonValue>) -> &'static str {
    if map.contains_key("properties") || map.contains_key("additionalProperties") {
        return "object";
    }
    if map.contains_key("items") {
        return "array";
    }
    if let Some(JsonValue::Array(values)) = map.get("enum") {
        if values.iter().all(JsonValue::is_string) {
            return "string";
        }
        if values.iter().all(|v| v.is_i64() || v.is_u64()) {
            return "integer";
        }
        if values.iter().all(JsonValue::is_number) {
            return "number";
        }
    }
    if map.contains_key("pattern") || map.contains_key("minLength") || map.contains_key("maxLength") {
        return "string";
    }
    if map.contains_key("minimum") || map.contains_key("maximum") {
        return "number";
    }
    "any"
}

fn build_kind(kind: &str, map: &Map<String, JsonValue>, path: &str) -> Result<SchemaNode, SchemaError> {
    Ok(match kind {
        "object" => SchemaNode::Object(object(map, path)?),
        "array" => SchemaNode::Array(array(map, path)?),
        "string" => SchemaNode::String(string(map, path)?),
        "integer" => SchemaNode::Integer(numeric(map, path)?),
        "number" => SchemaNode::Number(numeric(map, path)?),
        "boolean" => SchemaNode::Boolean,
        "null" => SchemaNode::Null,
        "any" => SchemaNode::Any,
        other => {
            return Err(SchemaError::UnsupportedType {
                path: path.to_string(),
                kind: other.to_string(),
            })
        }
    })
}

fn object(map: &Map<String, JsonValue>, path: &str) -> Result<ObjectSchema, SchemaError> {
    let mut schema = ObjectSchema::default();

    if let Some(props) = map.get("properties") {
        let props = props
            .as_object()
            .ok_or_else(|| invalid(path, "properties", "expected a mapping"))?;
        for (name, sub) in props {
            schema.properties.insert(name.clone(), build(sub, &format!("{path}.{name}"))?);
        }
    }

    if let Some(required) = map.get("required") {
        let required = required
            .as_array()
            .ok_or_else(|| invalid(path, "required", "expected a list of names"))?;
        for name in required {
            let name = name
                .as_str()
                .ok_or_else(|| invalid(path, "required", "expected a list of names"))?;
            schema.required.insert(name.to_string());
        }
    }

    schema.additional = match map.get("additionalProperties") {
        None | Some(JsonValue::Bool(true)) => AdditionalProperties::Allowed,
        Some(JsonValue::Bool(false)) => AdditionalProperties::Denied,
        Some(sub) => AdditionalProperties::Schema(Box::new(build(sub, &format!("{path}.*"))?)),
    };

    Ok(schema)
}

fn array(map: &Map<String, JsonValue>, path: &str) -> Result<ArraySchema, SchemaError> {
    Ok(ArraySchema {
        items: map
            .get("items")
            .map(|items| build(items, &format!("{path}[]")).map(Box::new))
            .transpose()?,
        min_items: count(map, path, "minItems")?,
        max_items: count(map, path, "maxItems")?,
    })
}

fn string(map: &Map<String, JsonValue>, path: &str) -> Result<StringSchema, SchemaError> {
    let allowed = match map.get("enum") {
        None => None,
        Some(JsonValue::Array(values)) => Some(
            values
                .iter()
                .map(|v| match v {
                    JsonValue::String(s) => s.clone(),
                    other => other.to_string(),
                })
                .collect(),
        ),
        Some(_) => return Err(invalid(path, "enum", "expected a list")),
    };

    let pattern = match map.get("pattern") {
        None => None,
        Some(JsonValue::String(p)) => Some(Regex::new(p).map_err(|e| SchemaError::InvalidPattern {
            path: path.to_string(),
            message: e.to_string(),
        })?),
        Some(_) => return Err(invalid(path, "pattern", "expected a string")),
    };

    Ok(StringSchema {
        allowed,
        pattern,
        min_length: count(map, path, "minLength")?,
        max_length: count(map, path, "maxLength")?,
    })
}

fn numeric(map: &Map<String, JsonValue>, path: &str) -> Result<NumericSchema, SchemaError> {
    let allowed = match map.get("enum") {
        None => None,
        Some(JsonValue::Array(values)) => Some(
            values
                .iter()
                .map(|v| {
                    v.as_f64()
                        .ok_or_else(|| invalid(path, "enum", format!("'{v}' is not a number")))
                })
                .collect::<Result<Vec<_>, _>>()?,
        ),
        Some(_) => return Err(invalid(path, "enum", "expected a list")),
    };

    let min = bound(map, path, "minimum", "exclusiveMinimum")?;
    let max = bound(map, path, "maximum", "exclusiveMaximum")?;
    Ok(NumericSchema {
        range: Range { min, max },
        allowed,
    })
}

/// Read an inclusive keyword plus its exclusive twin
///
/// Draft-4 `exclusiveMinimum: true` flags the inclusive limit; draft-6
/// `exclusiveMinimum: 5` is a limit of its own. The stricter limit wins when
/// both are given.
fn bound(
    map: &Map<String, JsonValue>,
    path: &str,
    inclusive: &str,
    exclusive: &str,
) -> Result<Option<Bound>, SchemaError> {
    let limit = match map.get(inclusive) {
        None => None,
        Some(v) => Some(
            v.as_f64()
                .ok_or_else(|| invalid(path, inclusive, format!("'{v}' is not a number")))?,
        ),
    };

    match map.get(exclusive) {
        None | Some(JsonValue::Bool(false)) => Ok(limit.map(|value| Bound {
            value,
            exclusive: false,
        })),
        Some(JsonValue::Bool(true)) => Ok(limit.map(|value| Bound {
            value,
            exclusive: true,
        })),
        Some(JsonValue::Number(n)) => {
            let value = n.as_f64().unwrap_or_default();
            let exclusive_bound = Bound {
                value,
                exclusive: true,
            };
            let lower = inclusive == "minimum";
            Ok(Some(match limit {
                Some(l) if (lower && l > value) || (!lower && l < value) => Bound {
                    value: l,
                    exclusive: false,
                },
                _ => exclusive_bound,
            }))
        }
        Some(other) => Err(invalid(path, exclusive, format!("'{other}' is neither a number nor a boolean"))),
    }
}

fn count(map: &Map<String, JsonValue>, path: &str, keyword: &str) -> Result<Option<usize>, SchemaError> {
    match map.get(keyword) {
        None => Ok(None),
        Some(v) => v
            .as_u64()
            .and_then(|n| usize::try_from(n).ok())
            .map(Some)
            .ok_or_else(|| invalid(path, keyword, format!("'{v}' is not a non-negative integer"))),
    }
}

fn invalid(path: &str, keyword: &str, message: impl Into<String>) -> SchemaError {
    SchemaError::InvalidKeyword {
        path: path.to_string(),
        keyword: keyword.to_string(),
        message: message.into(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn builds_object_tree() {
        let node = SchemaNode::from_json(&json!({
            "type": "object",
            "required": ["port"],
            "additionalProperties": false,
            "properties": {
                "port": {"type": "integer", "minimum": 1, "maximum": 65535},
                "mode": {"type": "string", "enum": ["OFF", "ON"]},
                "hosts": {"type": "array", "items": {"type": "string"}, "maxItems": 3}
            }
        }))
        .unwrap();

        let SchemaNode::Object(obj) = node else {
            panic!("expected object");
        };
        assert!(obj.required.contains("port"));
        assert!(matches!(obj.additional, AdditionalProperties::Denied));
        assert!(matches!(obj.properties["port"], SchemaNode::Integer(_)));
        assert!(matches!(&obj.properties["hosts"], SchemaNode::Array(a) if a.max_items == Some(3)));
    }

    #[test]
    fn exclusive_bounds_both_drafts() {
        let SchemaNode::Number(draft4) =
            SchemaNode::from_json(&json!({"type": "number", "minimum": 0, "exclusiveMinimum": true})).unwrap()
        else {
            panic!("expected number");
        };
        assert!(!draft4.range.contains(0.0));
        assert!(draft4.range.contains(0.1));

        let SchemaNode::Number(draft6) =
            SchemaNode::from_json(&json!({"type": "number", "exclusiveMaximum": 10})).unwrap()
        else {
            panic!("expected number");
        };
        assert!(draft6.range.contains(9.9));
        assert!(!draft6.range.contains(10.0));
    }

    #[test]
    fn type_lists_and_int_or_string() {
        let node = SchemaNode::from_json(&json!({"type": ["integer", "string"]})).unwrap();
        assert_eq!(node.kind(), "integer | string");

        let node = SchemaNode::from_json(&json!({"x-kubernetes-int-or-string": true})).unwrap();
        assert_eq!(node.kind(), "integer | string");
    }

    #[test]
    fn untyped_schemas_are_inferred() {
        assert_eq!(SchemaNode::from_json(&json!({"enum": ["a", "b"]})).unwrap().kind(), "string");
        assert_eq!(SchemaNode::from_json(&json!({"enum": [1, 2]})).unwrap().kind(), "integer");
        assert_eq!(SchemaNode::from_json(&json!({"properties": {}})).unwrap().kind(), "object");
        assert_eq!(SchemaNode::from_json(&json!({})).unwrap().kind(), "any");
    }

    #[test]
    fn top_level_key_selects_sub_schema() {
        let doc = json!({"properties": {"MysqlParameter": {"type": "object"}}});
        assert_eq!(SchemaNode::from_json_at(&doc, "MysqlParameter").unwrap().kind(), "object");
        assert!(matches!(
            SchemaNode::from_json_at(&doc, "Other"),
            Err(SchemaError::MissingTopLevelKey(_))
        ));
    }

    #[test]
    fn null_type_and_nullable() {
        let listed = SchemaNode::from_json(&json!({"type": ["string", "null"]})).unwrap();
        assert_eq!(listed.kind(), "string | null");

        let openapi = SchemaNode::from_json(&json!({"type": "integer", "nullable": true})).unwrap();
        assert_eq!(openapi.kind(), "integer | null");

        let both = SchemaNode::from_json(&json!({"type": ["string", "null"], "nullable": true})).unwrap();
        assert_eq!(both.kind(), "string | null");

        let plain = SchemaNode::from_json(&json!({"type": "integer", "nullable": false})).unwrap();
        assert_eq!(plain.kind(), "integer");

        assert!(matches!(
            SchemaNode::from_json(&json!({"type": "integer", "nullable": "yes"})),
            Err(SchemaError::InvalidKeyword { .. })
        ));
    }

    #[test]
    fn malformed_schemas_are_rejected() {
        assert!(matches!(
            SchemaNode::from_json(&json!({"type": "decimal"})),
            Err(SchemaError::UnsupportedType { .. })
        ));
        assert!(matches!(
            SchemaNode::from_json(&json!({"type": "string", "pattern": "("})),
            Err(SchemaError::InvalidPattern { .. })
        ));
        assert!(matches!(
            SchemaNode::from_json(&json!({"type": "string", "maxLength": -1})),
            Err(SchemaError::InvalidKeyword { .. })
        ));
    }
}
