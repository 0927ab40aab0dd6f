//! Schema validation of candidate configurations
//!
//! Every leaf path of a parsed file is projected to its parameter name and
//! resolved against the compiled [`SchemaNode`] tree. Findings are returned
//! as [`Violation`]s; only unparsable files or unusable schemas are errors.

use std::collections::BTreeSet;
use std::fmt::{self, Display};

use indexmap::IndexSet;
use reconfig_core::{join_key, CodecRegistry, ConfigObject, ConfigValue, FormatterConfig, RawConfig};
use serde::Serialize;

use crate::constraint::ConfigConstraint;
use crate::error::Result;
use crate::schema::{AdditionalProperties, ObjectSchema, SchemaNode};

/// One schema violation
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Violation {
    /// File the parameter lives in
    pub file: String,
    /// Parameter name
    pub path: String,
    /// What is wrong
    #[serde(flatten)]
    pub kind: ViolationKind,
}

/// Kinds of schema violations
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum ViolationKind {
    /// Value cannot be read as the declared type
    TypeMismatch { expected: String, found: String },
    /// Number outside the declared range
    OutOfRange { value: String, range: String },
    /// Value not among the allowed ones
    NotInEnum { value: String, allowed: Vec<String> },
    /// Text does not match the declared pattern
    PatternMismatch { value: String, pattern: String },
    /// Text or list length outside the declared bounds
    Length {
        actual: usize,
        min: Option<usize>,
        max: Option<usize>,
    },
    /// Required parameter is absent
    MissingRequired,
    /// Parameter is not declared and extra parameters are not allowed
    UnknownParameter,
}

impl Display for ViolationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::TypeMismatch { expected, found } => write!(f, "expected {expected}, found {found}"),
            Self::OutOfRange { value, range } => write!(f, "{value} is outside {range}"),
            Self::NotInEnum { value, allowed } => {
                write!(f, "'{value}' is not one of [{}]", allowed.join(", "))
            }
            Self::PatternMismatch { value, pattern } => {
                write!(f, "'{value}' does not match /{pattern}/")
            }
            Self::Length { actual, min, max } => {
                write!(f, "length {actual} is outside ")?;
                match (min, max) {
                    (Some(min), Some(max)) => write!(f, "{min}..={max}"),
                    (Some(min), None) => write!(f, "{min}.."),
                    (None, Some(max)) => write!(f, "..={max}"),
                    (None, None) => write!(f, ".."),
                }
            }
            Self::MissingRequired => f.write_str("required parameter is missing"),
            Self::UnknownParameter => f.write_str("unknown parameter"),
        }
    }
}

impl Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}: {}", self.file, self.path, self.kind)
    }
}

/// Validate a candidate bundle against a constraint's schema
///
/// Files in `keys` are checked when given, otherwise every file. A
/// constraint without schema only checks that the files parse.
///
/// # Errors
/// - Parse error of the first unparsable in-scope file
/// - Schema error if the constraint's schema cannot be compiled
pub fn validate(
    codecs: &CodecRegistry,
    constraint: &ConfigConstraint,
    candidate: &RawConfig,
    keys: Option<&IndexSet<String>>,
) -> Result<Vec<Violation>> {
    let schema = constraint.schema()?;
    let formatter = &constraint.formatter_config;

    let mut violations = Vec::new();
    for (file, content) in candidate {
        if keys.is_some_and(|keys| !keys.contains(file.as_str())) {
            continue;
        }
        let object = codecs.parse(file, formatter, content)?;
        if let Some(schema) = &schema {
            let found = validate_object(schema, formatter, file, &object);
            tracing::debug!(file = %file, violations = found.len(), "file validated");
            violations.extend(found);
        }
    }

    if !violations.is_empty() {
        tracing::info!(violations = violations.len(), "candidate configuration has violations");
    }
    Ok(violations)
}

/// Validate one parsed file
///
/// With an INI section configured only that section's parameters are
/// checked; other sections are not described by the schema.
#[must_use]
pub fn validate_object(
    schema: &SchemaNode,
    formatter: &FormatterConfig,
    file: &str,
    object: &ConfigObject,
) -> Vec<Violation> {
    let mut violations = Vec::new();
    let mut names = BTreeSet::new();

    let section = formatter.section_name();
    for (path, value) in object.iter() {
        if section.is_some_and(|section| !in_section(path, section)) {
            continue;
        }
        let name = formatter.param_name(path);
        names.insert(name);
        let segments: Vec<&str> = name.split('.').collect();
        for kind in check(schema, &segments, value) {
            violations.push(Violation {
                file: file.to_string(),
                path: name.to_string(),
                kind,
            });
        }
    }

    if let SchemaNode::Object(root) = schema {
        check_required(root, "", &names, file, &mut violations);
    }

    violations.sort_by(|a, b| a.path.cmp(&b.path));
    violations
}

fn in_section(path: &str, section: &str) -> bool {
    path.strip_prefix(section).is_some_and(|rest| rest.starts_with('.'))
}

fn check(node: &SchemaNode, segments: &[&str], value: &ConfigValue) -> Vec<ViolationKind> {
    match node {
        SchemaNode::Any => Vec::new(),
        SchemaNode::Null => {
            if segments.is_empty() && matches!(value, ConfigValue::Null) {
                Vec::new()
            } else {
                vec![mismatch("null", describe(value, segments))]
            }
        }
        SchemaNode::AnyOf(options) => check_any_of(node, options, segments, value),
        SchemaNode::Object(object) => check_object(object, segments, value),
        SchemaNode::Array(array) => match segments.split_first() {
            Some((index, rest)) if index.parse::<usize>().is_ok() => match &array.items {
                Some(items) => check(items, rest, value),
                None => Vec::new(),
            },
            Some(_) => vec![mismatch("array", "object")],
            None => {
                let items = list_items(value);
                let mut found = Vec::new();
                let too_few = array.min_items.is_some_and(|min| items.len() < min);
                let too_many = array.max_items.is_some_and(|max| items.len() > max);
                if too_few || too_many {
                    found.push(ViolationKind::Length {
                        actual: items.len(),
                        min: array.min_items,
                        max: array.max_items,
                    });
                }
                if let Some(schema) = &array.items {
                    for item in &items {
                        found.extend(check(schema, &[], item));
                    }
                }
                found
            }
        },
        scalar => {
            if segments.is_empty() {
                check_scalar(scalar, value)
            } else {
                vec![mismatch(&scalar.kind(), "object")]
            }
        }
    }
}

fn check_any_of(
    node: &SchemaNode,
    options: &[SchemaNode],
    segments: &[&str],
    value: &ConfigValue,
) -> Vec<ViolationKind> {
    let mut fallback = None;
    for option in options {
        let found = check(option, segments, value);
        if found.is_empty() {
            return found;
        }
        let type_ok = !found.iter().any(|k| matches!(k, ViolationKind::TypeMismatch { .. }));
        if type_ok && fallback.is_none() {
            fallback = Some(found);
        }
    }
    fallback.unwrap_or_else(|| vec![mismatch(&node.kind(), describe(value, segments))])
}

fn check_object(object: &ObjectSchema, segments: &[&str], value: &ConfigValue) -> Vec<ViolationKind> {
    let Some((first, rest)) = segments.split_first() else {
        return vec![mismatch("object", describe(value, segments))];
    };

    // dotted parameter names (`log.level`) may be declared as one property
    let whole = segments.join(".");
    if let Some(child) = object.properties.get(&whole) {
        return check(child, &[], value);
    }
    if let Some(child) = object.properties.get(*first) {
        return check(child, rest, value);
    }

    match &object.additional {
        AdditionalProperties::Allowed => Vec::new(),
        AdditionalProperties::Denied => vec![ViolationKind::UnknownParameter],
        AdditionalProperties::Schema(schema) => check(schema, rest, value),
    }
}

#[allow(clippy::cast_precision_loss)]
fn check_scalar(node: &SchemaNode, value: &ConfigValue) -> Vec<ViolationKind> {
    if matches!(value, ConfigValue::Null | ConfigValue::List(_)) {
        return vec![mismatch(&node.kind(), describe(value, &[]))];
    }

    let mut found = Vec::new();
    match node {
        SchemaNode::String(schema) => {
            let text = value.to_text();
            if let Some(allowed) = &schema.allowed {
                if !allowed.contains(&text) {
                    found.push(ViolationKind::NotInEnum {
                        value: text.clone(),
                        allowed: allowed.clone(),
                    });
                }
            }
            if let Some(pattern) = &schema.pattern {
                if !pattern.is_match(&text) {
                    found.push(ViolationKind::PatternMismatch {
                        value: text.clone(),
                        pattern: pattern.as_str().to_string(),
                    });
                }
            }
            let length = text.chars().count();
            let too_short = schema.min_length.is_some_and(|min| length < min);
            let too_long = schema.max_length.is_some_and(|max| length > max);
            if too_short || too_long {
                found.push(ViolationKind::Length {
                    actual: length,
                    min: schema.min_length,
                    max: schema.max_length,
                });
            }
        }
        SchemaNode::Integer(schema) | SchemaNode::Number(schema) => {
            let integer = matches!(node, SchemaNode::Integer(_));
            let number = if integer { as_integer(value).map(|i| i as f64) } else { as_number(value) };
            let Some(number) = number else {
                return vec![mismatch(&node.kind(), describe(value, &[]))];
            };
            if !schema.range.contains(number) {
                found.push(ViolationKind::OutOfRange {
                    value: value.to_text(),
                    range: schema.range.to_string(),
                });
            }
            if let Some(allowed) = &schema.allowed {
                if !allowed.iter().any(|a| (a - number).abs() < f64::EPSILON) {
                    found.push(ViolationKind::NotInEnum {
                        value: value.to_text(),
                        allowed: allowed.iter().map(ToString::to_string).collect(),
                    });
                }
            }
        }
        SchemaNode::Boolean => {
            if !is_boolean(value) {
                found.push(mismatch("boolean", describe(value, &[])));
            }
        }
        SchemaNode::Object(_)
        | SchemaNode::Array(_)
        | SchemaNode::AnyOf(_)
        | SchemaNode::Any
        | SchemaNode::Null => {}
    }
    found
}

fn check_required(
    object: &ObjectSchema,
    prefix: &str,
    names: &BTreeSet<&str>,
    file: &str,
    out: &mut Vec<Violation>,
) {
    let present = |path: &str| {
        let nested = format!("{path}.");
        names.contains(path) || names.iter().any(|n| n.starts_with(&nested))
    };

    for required in &object.required {
        let path = join_key(prefix, required);
        if !present(&path) {
            out.push(Violation {
                file: file.to_string(),
                path,
                kind: ViolationKind::MissingRequired,
            });
        }
    }
    for (name, child) in &object.properties {
        let path = join_key(prefix, name);
        if let SchemaNode::Object(child) = child {
            if present(&path) {
                check_required(child, &path, names, file, out);
            }
        }
    }
}

/// Items of a list value; line formats carry lists as comma separated text
fn list_items(value: &ConfigValue) -> Vec<ConfigValue> {
    match value {
        ConfigValue::List(items) => items.clone(),
        ConfigValue::Null => Vec::new(),
        ConfigValue::String(s) if s.trim().is_empty() => Vec::new(),
        ConfigValue::String(s) => s.split(',').map(|part| ConfigValue::from(part.trim())).collect(),
        scalar => vec![scalar.clone()],
    }
}

#[allow(clippy::cast_possible_truncation)]
fn as_integer(value: &ConfigValue) -> Option<i64> {
    match value {
        ConfigValue::Integer(i) => Some(*i),
        ConfigValue::Float(f) if f.fract() == 0.0 && f.is_finite() => Some(*f as i64),
        ConfigValue::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

#[allow(clippy::cast_precision_loss)]
fn as_number(value: &ConfigValue) -> Option<f64> {
    match value {
        ConfigValue::Integer(i) => Some(*i as f64),
        ConfigValue::Float(f) => Some(*f),
        ConfigValue::String(s) => s.trim().parse::<f64>().ok().filter(|f| f.is_finite()),
        _ => None,
    }
}

fn is_boolean(value: &ConfigValue) -> bool {
    match value {
        ConfigValue::Bool(_) => true,
        ConfigValue::Integer(i) => *i == 0 || *i == 1,
        ConfigValue::String(s) => matches!(
            s.trim().to_ascii_lowercase().as_str(),
            "true" | "false" | "on" | "off" | "yes" | "no" | "1" | "0"
        ),
        _ => false,
    }
}

fn describe(value: &ConfigValue, segments: &[&str]) -> &'static str {
    if !segments.is_empty() {
        return "object";
    }
    match value {
        ConfigValue::Null => "null",
        ConfigValue::Bool(_) => "boolean",
        ConfigValue::Integer(_) => "integer",
        ConfigValue::Float(_) => "number",
        ConfigValue::String(_) => "string",
        ConfigValue::List(_) => "list",
    }
}

fn mismatch(expected: &str, found: &str) -> ViolationKind {
    ViolationKind::TypeMismatch {
        expected: expected.to_string(),
        found: found.to_string(),
    }
}
