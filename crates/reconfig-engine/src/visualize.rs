//! Presentable change lists

use std::collections::BTreeSet;

use reconfig_core::{ConfigObject, FormatterConfig};
use serde::Serialize;

use crate::error::Result;
use crate::patch::{ConfigPatch, UpdateType};

/// One parameter of a [`VisualizedParam`] group
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ParamEntry {
    /// Parameter name
    pub key: String,
    /// New value; deleted parameters carry none
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
    /// Previous value of updated and deleted parameters
    #[serde(skip_serializing_if = "Option::is_none")]
    pub old: Option<String>,
}

/// Changes of one kind in one file
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VisualizedParam {
    /// File name
    pub key: String,
    /// Kind of change
    pub update_type: UpdateType,
    /// Parameters sorted by name
    pub parameters: Vec<ParamEntry>,
}

/// Turn a patch into display groups
///
/// Files come in name order and, within a file, added, updated and deleted
/// groups in that order. Parameter names drop the INI section prefix when
/// one is configured.
///
/// # Errors
/// Returns error if update bytes cannot be decoded
pub fn to_visualized_params(patch: &ConfigPatch, formatter: &FormatterConfig) -> Result<Vec<VisualizedParam>> {
    let files: BTreeSet<&str> = patch.changed_files();
    let mut groups = Vec::new();

    for file in files {
        if let Some(added) = patch.added_config.get(file) {
            groups.push(group(file, UpdateType::Added, entries(added, formatter, UpdateType::Added)));
        }

        let updates = patch.updated_params(file)?;
        if !updates.is_empty() {
            let mut params: Vec<ParamEntry> = updates
                .iter()
                .map(|(path, change)| ParamEntry {
                    key: formatter.param_name(path).to_string(),
                    value: Some(change.new.to_text()),
                    old: Some(change.old.to_text()),
                })
                .collect();
            params.sort_by(|a, b| a.key.cmp(&b.key));
            groups.push(group(file, UpdateType::Updated, params));
        }

        if let Some(deleted) = patch.deleted_config.get(file) {
            groups.push(group(file, UpdateType::Deleted, entries(deleted, formatter, UpdateType::Deleted)));
        }
    }

    Ok(groups)
}

fn entries(object: &ConfigObject, formatter: &FormatterConfig, kind: UpdateType) -> Vec<ParamEntry> {
    let added = kind == UpdateType::Added;
    let mut params: Vec<ParamEntry> = object
        .iter()
        .map(|(path, value)| ParamEntry {
            key: formatter.param_name(path).to_string(),
            value: added.then(|| value.to_text()),
            old: (!added).then(|| value.to_text()),
        })
        .collect();
    params.sort_by(|a, b| a.key.cmp(&b.key));
    params
}

fn group(file: &str, update_type: UpdateType, parameters: Vec<ParamEntry>) -> VisualizedParam {
    VisualizedParam {
        key: file.to_string(),
        update_type,
        parameters,
    }
}

/// Render groups as a fixed-width table
///
/// ```text
/// FILE    TYPE    PARAMETER        OLD  VALUE
/// my.cnf  update  max_connections  100  200
/// ```
#[must_use]
pub fn render_table(groups: &[VisualizedParam]) -> String {
    let header = ["FILE", "TYPE", "PARAMETER", "OLD", "VALUE"];
    let mut rows: Vec<[String; 5]> = Vec::new();
    for group in groups {
        for param in &group.parameters {
            rows.push([
                group.key.clone(),
                group.update_type.to_string(),
                param.key.clone(),
                param.old.clone().unwrap_or_default(),
                param.value.clone().unwrap_or_default(),
            ]);
        }
    }

    let mut widths = header.map(str::len);
    for row in &rows {
        for (width, cell) in widths.iter_mut().zip(row) {
            *width = (*width).max(cell.chars().count());
        }
    }

    let mut out = String::new();
    let mut push_row = |cells: [&str; 5]| {
        let mut line = String::new();
        for (i, cell) in cells.iter().enumerate() {
            line.push_str(cell);
            if i + 1 < cells.len() {
                let pad = widths[i] - cell.chars().count() + 2;
                line.push_str(&" ".repeat(pad));
            }
        }
        out.push_str(line.trim_end());
        out.push('\n');
    };

    push_row(header);
    for row in &rows {
        push_row([&row[0], &row[1], &row[2], &row[3], &row[4]]);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diff::{create_config_patch, keys};
    use pretty_assertions::assert_eq;
    use reconfig_core::{CodecRegistry, RawConfig};

    fn raw(files: &[(&str, &str)]) -> RawConfig {
        files.iter().map(|(k, v)| ((*k).to_string(), (*v).to_string())).collect()
    }

    fn sample() -> (ConfigPatch, FormatterConfig) {
        let codecs = CodecRegistry::with_defaults();
        let formatter = FormatterConfig::new("ini").with_ini_section("mysqld");
        let old = raw(&[
            ("b.cnf", "[mysqld]\nz=1\na=1\nkeep=1\n"),
            ("a.cnf", "[mysqld]\nport=3306\nsql_mode=STRICT\n"),
        ]);
        let new = raw(&[
            ("b.cnf", "[mysqld]\nz=2\na=2\nkeep=1\nnew_param=x\n"),
            ("a.cnf", "[mysqld]\nport=3307\n"),
        ]);
        let (patch, _) = create_config_patch(&codecs, &old, &new, &formatter, &keys(["b.cnf", "a.cnf"]), false).unwrap();
        (patch, formatter)
    }

    #[test]
    fn groups_are_ordered() {
        let (patch, formatter) = sample();
        let groups = to_visualized_params(&patch, &formatter).unwrap();

        let order: Vec<(&str, UpdateType)> = groups.iter().map(|g| (g.key.as_str(), g.update_type)).collect();
        assert_eq!(
            order,
            vec![
                ("a.cnf", UpdateType::Updated),
                ("a.cnf", UpdateType::Deleted),
                ("b.cnf", UpdateType::Added),
                ("b.cnf", UpdateType::Updated),
            ]
        );

        let updated_b: Vec<&str> = groups[3].parameters.iter().map(|p| p.key.as_str()).collect();
        assert_eq!(updated_b, vec!["a", "z"]);
        assert_eq!(groups[3].parameters[1].value.as_deref(), Some("2"));
        assert_eq!(groups[3].parameters[1].old.as_deref(), Some("1"));
        assert_eq!(
            groups[1].parameters[0],
            ParamEntry {
                key: "sql_mode".into(),
                value: None,
                old: Some("STRICT".into()),
            }
        );
        assert_eq!(groups[2].parameters[0].old, None);
    }

    #[test]
    fn table_is_aligned() {
        let (patch, formatter) = sample();
        let table = render_table(&to_visualized_params(&patch, &formatter).unwrap());
        let lines: Vec<&str> = table.lines().collect();
        assert_eq!(lines[0], "FILE   TYPE    PARAMETER  OLD     VALUE");
        assert_eq!(lines[1], "a.cnf  update  port       3306    3307");
        assert_eq!(lines[2], "a.cnf  delete  sql_mode   STRICT");
        assert_eq!(lines[3], "b.cnf  add     new_param          x");
        assert_eq!(lines.len(), 6);
    }

    #[test]
    fn empty_patch_renders_header_only() {
        assert_eq!(render_table(&[]), "FILE  TYPE  PARAMETER  OLD  VALUE\n");
    }
}
