//! Applying operator edits to a configuration bundle

use std::collections::BTreeMap;

use indexmap::IndexSet;
use reconfig_core::{CodecRegistry, RawConfig};
use serde::{Deserialize, Serialize};

use crate::constraint::ConfigConstraint;
use crate::error::{ReconfigureError, Result};
use crate::validate::validate;

/// Requested edits of one file
///
/// `None` removes the parameter.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParamPair {
    /// File name inside the bundle
    pub key: String,
    /// Parameter name to new value text
    pub updated_params: BTreeMap<String, Option<String>>,
}

impl ParamPair {
    /// Edits for `file`
    #[must_use]
    pub fn new(file: impl Into<String>) -> Self {
        Self {
            key: file.into(),
            updated_params: BTreeMap::new(),
        }
    }

    /// Set a parameter
    #[must_use]
    pub fn set(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.updated_params.insert(name.into(), Some(value.into()));
        self
    }

    /// Remove a parameter
    #[must_use]
    pub fn unset(mut self, name: impl Into<String>) -> Self {
        self.updated_params.insert(name.into(), None);
        self
    }
}

/// Apply edits on top of `base`
///
/// Immutable parameters are dropped with a warning. Only files that
/// receive an edit are re-serialized; every other file is returned
/// verbatim. Values are typed by the format's codec (`"200"` stays text
/// in INI but becomes an integer in YAML).
///
/// # Errors
/// - [`ReconfigureError::UnknownFile`] if a pair names a file not in `base`
/// - Parse or serialize error of an edited file
pub fn merge_updated_params(
    codecs: &CodecRegistry,
    base: &RawConfig,
    pairs: &[ParamPair],
    constraint: &ConfigConstraint,
) -> Result<RawConfig> {
    merge(codecs, base, pairs, constraint).map(|(merged, _)| merged)
}

/// Apply edits and validate the edited files
///
/// # Errors
/// - Any error of [`merge_updated_params`]
/// - [`ReconfigureError::ValidationFailed`] carrying every violation found
pub fn merge_and_validate(
    codecs: &CodecRegistry,
    base: &RawConfig,
    pairs: &[ParamPair],
    constraint: &ConfigConstraint,
) -> Result<RawConfig> {
    let (merged, touched) = merge(codecs, base, pairs, constraint)?;
    let violations = validate(codecs, constraint, &merged, Some(&touched))?;
    if !violations.is_empty() {
        return Err(ReconfigureError::ValidationFailed(violations));
    }
    Ok(merged)
}

fn merge(
    codecs: &CodecRegistry,
    base: &RawConfig,
    pairs: &[ParamPair],
    constraint: &ConfigConstraint,
) -> Result<(RawConfig, IndexSet<String>)> {
    let formatter = &constraint.formatter_config;
    let codec = codecs.get(&formatter.format)?;

    let mut merged = base.clone();
    let mut touched = IndexSet::new();

    for pair in pairs {
        let content = merged
            .get(&pair.key)
            .ok_or_else(|| ReconfigureError::UnknownFile(pair.key.clone()))?;

        let mut edits = Vec::new();
        for (name, value) in &pair.updated_params {
            let path = formatter.qualify(name);
            if constraint.is_immutable(name) || constraint.is_immutable(constraint.param_name(&path)) {
                tracing::warn!(file = %pair.key, param = %name, "ignoring edit of immutable parameter");
                continue;
            }
            edits.push((path, value));
        }
        if edits.is_empty() {
            continue;
        }

        let mut object = codecs.parse(&pair.key, formatter, content)?;
        for (path, value) in edits {
            match value {
                Some(text) => {
                    object.set(path, codec.value_from_text(text));
                }
                None => {
                    object.remove(&path);
                }
            }
        }

        let text = codecs.serialize(&pair.key, formatter, &object)?;
        tracing::debug!(file = %pair.key, params = pair.updated_params.len(), "edits applied");
        merged.insert(pair.key.clone(), text);
        touched.insert(pair.key.clone());
    }

    tracing::info!(files = touched.len(), "parameter edits merged");
    Ok((merged, touched))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use reconfig_core::{ConfigValue, FormatterConfig};
    use serde_json::json;

    fn mysql() -> ConfigConstraint {
        let mut cc = ConfigConstraint::new(FormatterConfig::new("ini").with_ini_section("mysqld"));
        cc.immutable_parameters.insert("port".into());
        cc.schema = Some(json!({
            "properties": {"max_connections": {"type": "integer", "minimum": 1, "maximum": 100000}}
        }));
        cc
    }

    fn base() -> RawConfig {
        RawConfig::from([
            ("my.cnf".to_string(), "[mysqld]\nport=3306\nmax_connections=100\n".to_string()),
            ("extra.cnf".to_string(), "# untouched, comments kept\n[client]\nuser=root\n".to_string()),
        ])
    }

    fn parse(codecs: &CodecRegistry, text: &str) -> reconfig_core::ConfigObject {
        codecs.parse("my.cnf", &mysql().formatter_config, text).unwrap()
    }

    #[test]
    fn bare_names_land_in_the_section() {
        let codecs = CodecRegistry::with_defaults();
        let pairs = [ParamPair::new("my.cnf").set("max_connections", "200").set("innodb_buffer_pool_size", "1G")];
        let merged = merge_updated_params(&codecs, &base(), &pairs, &mysql()).unwrap();

        let object = parse(&codecs, &merged["my.cnf"]);
        assert_eq!(object.get("mysqld.max_connections"), Some(&ConfigValue::from("200")));
        assert_eq!(object.get("mysqld.innodb_buffer_pool_size"), Some(&ConfigValue::from("1G")));
        assert_eq!(merged["extra.cnf"], base()["extra.cnf"]);
    }

    #[test]
    fn immutable_params_are_dropped() {
        let codecs = CodecRegistry::with_defaults();
        let pairs = [ParamPair::new("my.cnf").set("port", "3307")];
        let merged = merge_updated_params(&codecs, &base(), &pairs, &mysql()).unwrap();
        assert_eq!(merged, base());
    }

    #[test]
    fn unset_removes() {
        let codecs = CodecRegistry::with_defaults();
        let pairs = [ParamPair::new("my.cnf").unset("max_connections")];
        let merged = merge_updated_params(&codecs, &base(), &pairs, &mysql()).unwrap();
        assert!(!parse(&codecs, &merged["my.cnf"]).contains("mysqld.max_connections"));
    }

    #[test]
    fn unknown_file_is_an_error() {
        let codecs = CodecRegistry::with_defaults();
        let pairs = [ParamPair::new("missing.cnf").set("a", "1")];
        let err = merge_updated_params(&codecs, &base(), &pairs, &mysql()).unwrap_err();
        assert!(matches!(err, ReconfigureError::UnknownFile(ref f) if f == "missing.cnf"));
    }

    #[test]
    fn typed_formats_convert_values() {
        let codecs = CodecRegistry::with_defaults();
        let cc = ConfigConstraint::new(FormatterConfig::new("yaml"));
        let base = RawConfig::from([("values.yaml".to_string(), "replicas: 1\n".to_string())]);
        let pairs = [ParamPair::new("values.yaml").set("replicas", "3").set("image.tag", "1.25")];
        let merged = merge_updated_params(&codecs, &base, &pairs, &cc).unwrap();
        let object = codecs.parse("values.yaml", &cc.formatter_config, &merged["values.yaml"]).unwrap();
        assert_eq!(object.get("replicas"), Some(&ConfigValue::Integer(3)));
        assert_eq!(object.get("image.tag"), Some(&ConfigValue::Float(1.25)));
    }

    #[test]
    fn merge_and_validate_rejects_bad_values() {
        let codecs = CodecRegistry::with_defaults();
        let ok = [ParamPair::new("my.cnf").set("max_connections", "500")];
        assert!(merge_and_validate(&codecs, &base(), &ok, &mysql()).is_ok());

        let bad = [ParamPair::new("my.cnf").set("max_connections", "0")];
        let err = merge_and_validate(&codecs, &base(), &bad, &mysql()).unwrap_err();
        let ReconfigureError::ValidationFailed(violations) = err else {
            panic!("expected validation failure, got {err:?}");
        };
        assert_eq!(violations.len(), 1);
        assert_eq!(violations[0].path, "max_connections");
    }
}
