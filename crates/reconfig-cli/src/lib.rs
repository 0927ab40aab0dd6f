//! Reconfig CLI
//!
//! Reads configuration bundles and constraints from disk and drives
//! [`reconfig_engine::Reconfigurer`]. The binary in `main.rs` is a thin
//! argument layer over the functions here.
//!
//! # Example
//!
//! ```text
//! reconfig diff --constraint mysql.yaml --old live/ --new staged/
//! reconfig merge --constraint mysql.yaml --config live/ --file my.cnf --set max_connections=500
//! ```

#![warn(unreachable_pub)]

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use indexmap::{IndexMap, IndexSet};
use reconfig_core::RawConfig;
use reconfig_engine::{
    has_excluded_changes, render_table, ConfigConstraint, EngineConfig, ParamPair, Reconfigurer, Violation,
    VisualizedParam,
};
use serde::Serialize;

/// Output style of a command
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputFormat {
    /// Human readable text
    #[default]
    Table,
    /// Pretty printed JSON
    Json,
}

impl std::str::FromStr for OutputFormat {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "table" => Ok(Self::Table),
            "json" => Ok(Self::Json),
            other => bail!("unknown output format '{other}', expected table or json"),
        }
    }
}

/// Read files and directories into a bundle keyed by file name
///
/// Directories contribute their regular, non-hidden files; nothing is
/// read recursively.
///
/// # Errors
/// Returns error if a path cannot be read or two inputs share a file name
pub fn load_bundle(paths: &[PathBuf]) -> Result<RawConfig> {
    let mut bundle = RawConfig::new();
    for path in paths {
        let meta = fs::metadata(path).with_context(|| format!("cannot access {}", path.display()))?;
        if !meta.is_dir() {
            insert_file(&mut bundle, path)?;
            continue;
        }

        let mut entries = fs::read_dir(path)
            .with_context(|| format!("cannot list {}", path.display()))?
            .collect::<std::io::Result<Vec<_>>>()?;
        entries.sort_by_key(std::fs::DirEntry::file_name);
        for entry in entries {
            let hidden = entry.file_name().to_string_lossy().starts_with('.');
            if !hidden && entry.file_type()?.is_file() {
                insert_file(&mut bundle, &entry.path())?;
            }
        }
    }
    tracing::debug!(files = bundle.len(), "bundle loaded");
    Ok(bundle)
}

fn insert_file(bundle: &mut RawConfig, path: &Path) -> Result<()> {
    let name = path
        .file_name()
        .and_then(|n| n.to_str())
        .with_context(|| format!("{} has no usable file name", path.display()))?
        .to_string();
    let text = fs::read_to_string(path).with_context(|| format!("cannot read {}", path.display()))?;
    if bundle.insert(name.clone(), text).is_some() {
        bail!("file name '{name}' given more than once");
    }
    Ok(())
}

/// Load a constraint from YAML or JSON
///
/// # Errors
/// Returns error if the file cannot be read or parsed
pub fn load_constraint(path: &Path) -> Result<ConfigConstraint> {
    let text = fs::read_to_string(path).with_context(|| format!("cannot read {}", path.display()))?;
    let constraint =
        ConfigConstraint::from_yaml(&text).with_context(|| format!("invalid constraint in {}", path.display()))?;
    for issue in constraint.check() {
        tracing::warn!(constraint = %path.display(), %issue, "constraint problem");
    }
    Ok(constraint)
}

/// Load engine settings, or defaults when no path is given
///
/// # Errors
/// Returns error if the file cannot be read or parsed
pub fn load_engine_config(path: Option<&Path>) -> Result<EngineConfig> {
    let Some(path) = path else {
        return Ok(EngineConfig::default());
    };
    let text = fs::read_to_string(path).with_context(|| format!("cannot read {}", path.display()))?;
    EngineConfig::from_yaml(&text).with_context(|| format!("invalid engine config in {}", path.display()))
}

/// One `file:key=value` argument
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Assignment {
    /// File name inside the bundle
    pub file: String,
    /// Parameter name
    pub name: String,
    /// Value text; `None` removes the parameter
    pub value: Option<String>,
}

/// Parse `file:key=value`, or `key=value` when a default file is given
///
/// # Errors
/// Returns error if there is no `=` or no file can be determined
pub fn parse_assignment(arg: &str, default_file: Option<&str>) -> Result<Assignment> {
    let (target, value) = arg
        .split_once('=')
        .with_context(|| format!("'{arg}' is not of the form key=value"))?;
    let mut assignment = parse_target(target, default_file)?;
    assignment.value = Some(value.to_string());
    Ok(assignment)
}

/// Parse `file:key`, or `key` when a default file is given
///
/// # Errors
/// Returns error if no file can be determined or the name is empty
pub fn parse_target(arg: &str, default_file: Option<&str>) -> Result<Assignment> {
    let (file, name) = match arg.split_once(':') {
        Some((file, name)) => (file, name),
        None => {
            let file = default_file.with_context(|| format!("'{arg}' names no file, use file:key or --file"))?;
            (file, arg)
        }
    };
    let name = name.trim();
    if file.is_empty() || name.is_empty() {
        bail!("'{arg}' needs both a file and a parameter name");
    }
    Ok(Assignment {
        file: file.to_string(),
        name: name.to_string(),
        value: None,
    })
}

/// Group `--set` and `--unset` arguments into per-file edits
///
/// Files keep the order of their first mention.
///
/// # Errors
/// Returns error if an argument cannot be parsed
pub fn param_pairs(sets: &[String], unsets: &[String], default_file: Option<&str>) -> Result<Vec<ParamPair>> {
    let mut assignments = Vec::with_capacity(sets.len() + unsets.len());
    for arg in sets {
        assignments.push(parse_assignment(arg, default_file)?);
    }
    for arg in unsets {
        assignments.push(parse_target(arg, default_file)?);
    }

    let mut pairs: IndexMap<String, ParamPair> = IndexMap::new();
    for Assignment { file, name, value } in assignments {
        pairs
            .entry(file.clone())
            .or_insert_with(|| ParamPair::new(file))
            .updated_params
            .insert(name, value);
    }
    Ok(pairs.into_values().collect())
}

/// Outcome of `reconfig diff`
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DiffReport {
    /// At least one in-scope file changed
    pub is_modify: bool,
    /// Changes apply by reload, without restart
    pub dynamic: bool,
    /// Files outside the allow-list differ
    pub excluded_changes: bool,
    /// Files with text-only changes
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub reformatted: Vec<String>,
    /// Change groups
    pub changes: Vec<VisualizedParam>,
}

impl DiffReport {
    /// Render in the requested style
    ///
    /// # Errors
    /// Returns error if JSON encoding fails
    pub fn render(&self, format: OutputFormat) -> Result<String> {
        if format == OutputFormat::Json {
            return Ok(serde_json::to_string_pretty(self)? + "\n");
        }
        if !self.is_modify {
            return Ok("no changes\n".to_string());
        }

        let mut out = render_table(&self.changes);
        for file in &self.reformatted {
            out.push_str(&format!("{file}: reformatted only\n"));
        }
        if self.excluded_changes {
            out.push_str("note: files outside the allow-list changed and were ignored\n");
        }
        out.push_str(if self.dynamic {
            "apply: reload\n"
        } else {
            "apply: restart\n"
        });
        Ok(out)
    }
}

/// Diff two bundles restricted to `only`, or every file when empty
///
/// # Errors
/// Returns error if a file fails to parse
pub fn diff(
    engine: &Reconfigurer,
    constraint: &ConfigConstraint,
    old: &RawConfig,
    new: &RawConfig,
    only: &[String],
    reformat_only: bool,
) -> Result<DiffReport> {
    let keys: IndexSet<String> = if only.is_empty() {
        old.keys().chain(new.keys()).cloned().collect()
    } else {
        only.iter().cloned().collect()
    };
    let formatter = &constraint.formatter_config;

    let (patch, _) = engine.create_config_patch(old, new, formatter, &keys, reformat_only)?;
    let changes = engine.visualize(&patch, formatter)?;
    Ok(DiffReport {
        is_modify: patch.is_modify,
        dynamic: engine.is_update_dynamic(constraint, &patch)?,
        excluded_changes: has_excluded_changes(old, new, &keys),
        reformatted: patch.reformatted.iter().cloned().collect(),
        changes,
    })
}

/// Render violations, one per line or as JSON
///
/// # Errors
/// Returns error if JSON encoding fails
pub fn render_violations(violations: &[Violation], format: OutputFormat) -> Result<String> {
    if format == OutputFormat::Json {
        return Ok(serde_json::to_string_pretty(violations)? + "\n");
    }
    if violations.is_empty() {
        return Ok("ok\n".to_string());
    }
    Ok(violations.iter().map(|v| format!("{v}\n")).collect())
}

/// Apply edits to a bundle, validating edited files unless `skip_validation`
///
/// # Errors
/// Returns error if an edit names an unknown file, a file fails to parse,
/// or validation finds violations
pub fn merge(
    engine: &Reconfigurer,
    constraint: &ConfigConstraint,
    base: &RawConfig,
    pairs: &[ParamPair],
    skip_validation: bool,
) -> Result<RawConfig> {
    let merged = if skip_validation {
        engine.merge_updated_params(base, pairs, constraint)?
    } else {
        engine.merge_and_validate(base, pairs, constraint)?
    };
    Ok(merged)
}

/// Files whose content differs between `base` and `merged`
#[must_use]
pub fn changed_files<'a>(base: &RawConfig, merged: &'a RawConfig) -> Vec<(&'a str, &'a str)> {
    merged
        .iter()
        .filter(|(name, text)| base.get(*name) != Some(*text))
        .map(|(name, text)| (name.as_str(), text.as_str()))
        .collect()
}

/// Write changed files into `dir`, returning their names
///
/// # Errors
/// Returns error if a file cannot be written
pub fn write_changed(dir: &Path, base: &RawConfig, merged: &RawConfig) -> Result<Vec<String>> {
    fs::create_dir_all(dir).with_context(|| format!("cannot create {}", dir.display()))?;
    let mut written = Vec::new();
    for (name, text) in changed_files(base, merged) {
        let path = dir.join(name);
        fs::write(&path, text).with_context(|| format!("cannot write {}", path.display()))?;
        written.push(name.to_string());
    }
    tracing::info!(dir = %dir.display(), files = written.len(), "merged files written");
    Ok(written)
}

/// How a constraint treats one parameter
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ParamExplanation {
    /// Parameter name
    pub name: String,
    /// Applies by reload
    pub dynamic: bool,
    /// Operators may not edit it
    pub immutable: bool,
}

/// Classify parameters under a constraint
#[must_use]
pub fn explain(constraint: &ConfigConstraint, names: &[String]) -> Vec<ParamExplanation> {
    names
        .iter()
        .map(|name| ParamExplanation {
            name: name.clone(),
            dynamic: constraint.is_dynamic(name),
            immutable: constraint.is_immutable(name),
        })
        .collect()
}

/// Render explanations and constraint problems
///
/// # Errors
/// Returns error if JSON encoding fails
pub fn render_explanations(
    constraint: &ConfigConstraint,
    explanations: &[ParamExplanation],
    format: OutputFormat,
) -> Result<String> {
    let issues: Vec<String> = constraint.check().iter().map(ToString::to_string).collect();
    if format == OutputFormat::Json {
        let doc = serde_json::json!({
            "supportsReload": constraint.supports_reload(),
            "parameters": explanations,
            "issues": issues,
        });
        return Ok(serde_json::to_string_pretty(&doc)? + "\n");
    }

    let mut out = format!(
        "reload: {}\n",
        if constraint.supports_reload() {
            "supported"
        } else {
            "not supported"
        }
    );
    for param in explanations {
        let kind = if param.dynamic { "dynamic" } else { "static" };
        let immutable = if param.immutable { ", immutable" } else { "" };
        out.push_str(&format!("{}: {kind}{immutable}\n", param.name));
    }
    for issue in issues {
        out.push_str(&format!("problem: {issue}\n"));
    }
    Ok(out)
}

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn assignment_with_file_prefix() {
        let a = parse_assignment("my.cnf:max_connections=200", None).unwrap();
        assert_eq!(a.file, "my.cnf");
        assert_eq!(a.name, "max_connections");
        assert_eq!(a.value.as_deref(), Some("200"));
    }

    #[test]
    fn assignment_uses_default_file() {
        let a = parse_assignment("sql_mode=STRICT=1", Some("my.cnf")).unwrap();
        assert_eq!(a.file, "my.cnf");
        assert_eq!(a.name, "sql_mode");
        assert_eq!(a.value.as_deref(), Some("STRICT=1"));

        let empty = parse_assignment("init_connect=", Some("my.cnf")).unwrap();
        assert_eq!(empty.value.as_deref(), Some(""));
    }

    #[test]
    fn malformed_assignments() {
        assert!(parse_assignment("max_connections", Some("my.cnf")).is_err());
        assert!(parse_assignment("max_connections=1", None).is_err());
        assert!(parse_assignment(":x=1", None).is_err());
        assert!(parse_assignment("my.cnf:=1", None).is_err());
    }

    #[test]
    fn pairs_group_by_file_in_first_seen_order() {
        let sets = vec!["b.cnf:x=1".to_string(), "y=2".to_string(), "b.cnf:z=3".to_string()];
        let unsets = vec!["old".to_string()];
        let pairs = param_pairs(&sets, &unsets, Some("a.cnf")).unwrap();

        assert_eq!(pairs.len(), 2);
        assert_eq!(pairs[0], ParamPair::new("b.cnf").set("x", "1").set("z", "3"));
        assert_eq!(pairs[1], ParamPair::new("a.cnf").set("y", "2").unset("old"));
    }

    #[test]
    fn output_format_parses() {
        assert_eq!("json".parse::<OutputFormat>().unwrap(), OutputFormat::Json);
        assert!("yaml".parse::<OutputFormat>().is_err());
    }
}
