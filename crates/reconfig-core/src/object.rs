//! Structured config object
//!
//! A [`ConfigObject`] is the parsed form of one configuration file: a flat,
//! sorted map from dotted path to [`ConfigValue`]. Codecs for nested formats
//! flatten at the boundary so diffing never needs format knowledge.

use std::collections::btree_map;
use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::{Map as JsonMap, Value as JsonValue};

use crate::error::CodecError;
use crate::hash::{CanonicalKey, HashError};
use crate::path::join_key;
use crate::value::ConfigValue;

/// Flattened configuration content
///
/// Iteration order is the sorted order of paths, independent of the order
/// in which parameters appeared in the source text.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ConfigObject {
    entries: BTreeMap<String, ConfigValue>,
}

/// Re-iterable view over the paths of a [`ConfigObject`]
#[derive(Debug, Clone)]
pub struct Keys<'a> {
    inner: btree_map::Keys<'a, String, ConfigValue>,
}

impl<'a> Iterator for Keys<'a> {
    type Item = &'a str;

    #[inline]
    fn next(&mut self) -> Option<Self::Item> {
        self.inner.next().map(String::as_str)
    }

    #[inline]
    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

impl ExactSizeIterator for Keys<'_> {}

impl ConfigObject {
    /// Create empty object
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Value at a dotted path
    #[inline]
    #[must_use]
    pub fn get(&self, path: &str) -> Option<&ConfigValue> {
        self.entries.get(path)
    }

    /// Set the value at a dotted path, returning the previous value
    #[inline]
    pub fn set(&mut self, path: impl Into<String>, value: impl Into<ConfigValue>) -> Option<ConfigValue> {
        self.entries.insert(path.into(), value.into())
    }

    /// Remove a path, returning its value
    #[inline]
    pub fn remove(&mut self, path: &str) -> Option<ConfigValue> {
        self.entries.remove(path)
    }

    /// Check whether a path is present
    #[inline]
    #[must_use]
    pub fn contains(&self, path: &str) -> bool {
        self.entries.contains_key(path)
    }

    /// All dotted paths in sorted order
    ///
    /// The returned iterator is `Clone`, so it can be restarted.
    #[inline]
    #[must_use]
    pub fn keys(&self) -> Keys<'_> {
        Keys {
            inner: self.entries.keys(),
        }
    }

    /// Path/value pairs in sorted order
    #[inline]
    pub fn iter(&self) -> impl Iterator<Item = (&str, &ConfigValue)> + Clone {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Number of leaf paths
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Check if no paths are present
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Paths under `prefix`, with the prefix stripped
    #[must_use]
    pub fn sub_object(&self, prefix: &str) -> Self {
        let lead = format!("{prefix}.");
        self.entries
            .iter()
            .filter(|(k, _)| k.starts_with(&lead))
            .map(|(k, v)| (k[lead.len()..].to_string(), v.clone()))
            .collect()
    }

    /// Digest of the canonical JSON form
    ///
    /// # Errors
    /// Returns error if the object cannot be encoded
    pub fn canonical_key(&self) -> Result<CanonicalKey, HashError> {
        CanonicalKey::of_serializable(&self.entries)
    }

    /// Flatten a nested JSON document
    ///
    /// Nested maps become dotted paths. Arrays of scalars stay lists; arrays
    /// holding maps or arrays are flattened with index segments (`a.0.b`).
    /// `null` at the root is an empty document.
    ///
    /// # Errors
    /// Returns error if the root is neither an object nor `null`
    pub fn from_nested_json(root: &JsonValue) -> Result<Self, CodecError> {
        let mut object = Self::new();
        match root {
            JsonValue::Null => {}
            JsonValue::Object(map) => {
                for (key, value) in map {
                    flatten_into(key, value, &mut object.entries);
                }
            }
            other => {
                return Err(CodecError::new(format!(
                    "document root must be a mapping, found {}",
                    json_kind(other)
                )))
            }
        }
        Ok(object)
    }

    /// Rebuild the nested JSON document
    ///
    /// Maps whose keys are exactly `0..n` are rebuilt as arrays.
    ///
    /// # Errors
    /// Returns error if one path is both a leaf and a prefix of another path
    pub fn to_nested_json(&self) -> Result<JsonValue, CodecError> {
        let mut root = Node::Branch(BTreeMap::new());
        for (path, value) in &self.entries {
            root.insert(path, path.split('.').collect::<Vec<_>>().as_slice(), value)?;
        }
        Ok(root.into_json())
    }
}

impl FromIterator<(String, ConfigValue)> for ConfigObject {
    fn from_iter<I: IntoIterator<Item = (String, ConfigValue)>>(iter: I) -> Self {
        Self {
            entries: iter.into_iter().collect(),
        }
    }
}

impl IntoIterator for ConfigObject {
    type Item = (String, ConfigValue);
    type IntoIter = btree_map::IntoIter<String, ConfigValue>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.into_iter()
    }
}

fn json_kind(value: &JsonValue) -> &'static str {
    match value {
        JsonValue::Null => "null",
        JsonValue::Bool(_) => "boolean",
        JsonValue::Number(_) => "number",
        JsonValue::String(_) => "string",
        JsonValue::Array(_) => "array",
        JsonValue::Object(_) => "mapping",
    }
}

fn flatten_into(path: &str, value: &JsonValue, out: &mut BTreeMap<String, ConfigValue>) {
    match value {
        JsonValue::Object(map) => {
            for (key, child) in map {
                flatten_into(&join_key(path, key), child, out);
            }
        }
        JsonValue::Array(items) if items.iter().any(|i| i.is_object() || i.is_array()) => {
            for (index, item) in items.iter().enumerate() {
                flatten_into(&join_key(path, &index.to_string()), item, out);
            }
        }
        scalar_or_list => {
            if let Some(v) = ConfigValue::from_json(scalar_or_list) {
                out.insert(path.to_string(), v);
            }
        }
    }
}

enum Node {
    Leaf(ConfigValue),
    Branch(BTreeMap<String, Node>),
}

impl Node {
    fn insert(&mut self, full: &str, segments: &[&str], value: &ConfigValue) -> Result<(), CodecError> {
        let Node::Branch(children) = self else {
            return Err(conflict(full));
        };
        match segments {
            [] => Err(conflict(full)),
            [last] => {
                if children.contains_key(*last) {
                    return Err(conflict(full));
                }
                children.insert((*last).to_string(), Node::Leaf(value.clone()));
                Ok(())
            }
            [head, rest @ ..] => children
                .entry((*head).to_string())
                .or_insert_with(|| Node::Branch(BTreeMap::new()))
                .insert(full, rest, value),
        }
    }

    fn into_json(self) -> JsonValue {
        match self {
            Node::Leaf(value) => value.to_json(),
            Node::Branch(children) => {
                if let Some(items) = as_index_sequence(&children) {
                    let mut indexed: Vec<(usize, Node)> = children
                        .into_iter()
                        .zip(items)
                        .map(|((_, node), index)| (index, node))
                        .collect();
                    indexed.sort_by_key(|(index, _)| *index);
                    JsonValue::Array(indexed.into_iter().map(|(_, node)| node.into_json()).collect())
                } else {
                    let map: JsonMap<String, JsonValue> = children
                        .into_iter()
                        .map(|(key, node)| (key, node.into_json()))
                        .collect();
                    JsonValue::Object(map)
                }
            }
        }
    }
}

/// Indices of a branch whose keys are exactly `0..n`, in key order
fn as_index_sequence(children: &BTreeMap<String, Node>) -> Option<Vec<usize>> {
    if children.is_empty() {
        return None;
    }
    let indices: Vec<usize> = children
        .keys()
        .map(|key| {
            // reject "01" and "+1" so the rebuilt array re-flattens to the same keys
            let index = key.parse::<usize>().ok()?;
            (index.to_string() == *key).then_some(index)
        })
        .collect::<Option<_>>()?;
    let mut sorted = indices.clone();
    sorted.sort_unstable();
    sorted
        .iter()
        .enumerate()
        .all(|(expected, actual)| expected == *actual)
        .then_some(indices)
}

fn conflict(path: &str) -> CodecError {
    CodecError::new(format!(
        "path '{path}' is used both as a value and as a parent of other values"
    ))
}
