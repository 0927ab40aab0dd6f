//! Patch builder
//!
//! Diffs two configuration bundles file by file. Only files named in the
//! allow-list take part; each is parsed with the bundle's formatter and
//! compared path by path.

use std::collections::BTreeMap;

use indexmap::IndexSet;
use rayon::prelude::*;
use reconfig_core::{CodecError, CodecRegistry, ConfigObject, FormatterConfig, ParseError, RawConfig};

use crate::config::EngineConfig;
use crate::error::Result;
use crate::patch::{encode_update, ConfigPatch, UpdateDiff, UpdatedParam};

/// Parsed new-state objects of the eligible files, by file name
pub type ConfigObjects = BTreeMap<String, ConfigObject>;

/// Ordered set of file names allowed to change
pub type Keys = IndexSet<String>;

/// Build an allow-list from file names
#[must_use]
pub fn keys<I, S>(names: I) -> Keys
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    names.into_iter().map(Into::into).collect()
}

/// Per-file diff outcome, produced during fan-out
#[derive(Debug, Default)]
struct FileDiff {
    file: String,
    new_object: Option<ConfigObject>,
    added: ConfigObject,
    deleted: ConfigObject,
    updated: UpdateDiff,
    reformatted: bool,
}

impl FileDiff {
    fn has_param_changes(&self) -> bool {
        !self.added.is_empty() || !self.deleted.is_empty() || !self.updated.is_empty()
    }
}

/// Diff engine bound to a codec registry and configuration
#[derive(Debug, Clone, Copy)]
pub struct Differ<'a> {
    codecs: &'a CodecRegistry,
    config: &'a EngineConfig,
}

impl<'a> Differ<'a> {
    /// Create differ
    #[inline]
    #[must_use]
    pub fn new(codecs: &'a CodecRegistry, config: &'a EngineConfig) -> Self {
        Self { codecs, config }
    }

    /// Diff `old` against `new` for the files in `keys`
    ///
    /// Files absent on one side are diffed against an empty object, so a new
    /// file shows up as added parameters and a removed file as deleted ones.
    /// With `reformat_only`, files whose text changed but whose values did
    /// not are listed in [`ConfigPatch::reformatted`] and count as a
    /// modification.
    ///
    /// # Errors
    /// - Parse error of the first failing file (in allow-list order)
    /// - Unknown format
    pub fn create_config_patch(
        &self,
        old: &RawConfig,
        new: &RawConfig,
        formatter: &FormatterConfig,
        keys: &Keys,
        reformat_only: bool,
    ) -> Result<(ConfigPatch, ConfigObjects)> {
        // fail fast on an unknown format even when nothing is eligible
        self.codecs.get(&formatter.format)?;

        let eligible: Vec<&str> = keys
            .iter()
            .map(String::as_str)
            .filter(|file| old.contains_key(*file) || new.contains_key(*file))
            .collect();

        let diff_one = |file: &&str| {
            self.diff_file(
                file,
                old.get(*file).map(String::as_str),
                new.get(*file).map(String::as_str),
                formatter,
                reformat_only,
            )
        };

        let results: Vec<Result<FileDiff>> = if eligible.len() >= self.config.parallel_threshold {
            tracing::debug!(files = eligible.len(), "diffing files in parallel");
            eligible.par_iter().map(diff_one).collect()
        } else {
            eligible.iter().map(diff_one).collect()
        };

        let mut patch = ConfigPatch::default();
        let mut objects = ConfigObjects::new();
        for result in results {
            let diff = result?;
            if diff.has_param_changes() || diff.reformatted {
                patch.is_modify = true;
            }
            if diff.reformatted {
                patch.reformatted.insert(diff.file.clone());
            }
            if !diff.added.is_empty() {
                patch.added_config.insert(diff.file.clone(), diff.added);
            }
            if !diff.deleted.is_empty() {
                patch.deleted_config.insert(diff.file.clone(), diff.deleted);
            }
            if !diff.updated.is_empty() {
                let bytes = encode_update(&diff.file, &diff.updated)?;
                patch.update_config.insert(diff.file.clone(), bytes);
            }
            if let Some(object) = diff.new_object {
                objects.insert(diff.file, object);
            }
        }

        tracing::info!(
            eligible = eligible.len(),
            added = patch.added_config.len(),
            deleted = patch.deleted_config.len(),
            updated = patch.update_config.len(),
            reformatted = patch.reformatted.len(),
            is_modify = patch.is_modify,
            "config patch built"
        );

        Ok((patch, objects))
    }

    fn diff_file(
        &self,
        file: &str,
        old: Option<&str>,
        new: Option<&str>,
        formatter: &FormatterConfig,
        reformat_only: bool,
    ) -> Result<FileDiff> {
        let old_object = self.parse(file, old, formatter)?;
        let new_object = self.parse(file, new, formatter)?;

        let mut diff = FileDiff {
            file: file.to_string(),
            ..FileDiff::default()
        };

        for (path, old_value) in old_object.iter() {
            match new_object.get(path) {
                None => {
                    diff.deleted.set(path, old_value.clone());
                }
                Some(new_value) if new_value != old_value => {
                    diff.updated.insert(
                        path.to_string(),
                        UpdatedParam {
                            old: old_value.clone(),
                            new: new_value.clone(),
                        },
                    );
                }
                Some(_) => {}
            }
        }
        for (path, new_value) in new_object.iter() {
            if !old_object.contains(path) {
                diff.added.set(path, new_value.clone());
            }
        }

        if reformat_only && !diff.has_param_changes() {
            if let (Some(old), Some(new)) = (old, new) {
                diff.reformatted = normalize_text(old) != normalize_text(new);
            }
        }

        tracing::debug!(
            file,
            added = diff.added.len(),
            deleted = diff.deleted.len(),
            updated = diff.updated.len(),
            reformatted = diff.reformatted,
            "file diffed"
        );

        if new.is_some() {
            diff.new_object = Some(new_object);
        }
        Ok(diff)
    }

    fn parse(&self, file: &str, content: Option<&str>, formatter: &FormatterConfig) -> Result<ConfigObject> {
        let Some(content) = content else {
            return Ok(ConfigObject::new());
        };
        check_size(file, formatter, content, self.config.max_file_bytes)?;
        Ok(self.codecs.parse(file, formatter, content)?)
    }
}

/// Reject content above the configured size limit
pub(crate) fn check_size(file: &str, formatter: &FormatterConfig, content: &str, limit: usize) -> Result<()> {
    if content.len() <= limit {
        return Ok(());
    }
    Err(ParseError {
        file: file.to_string(),
        format: formatter.format.to_string(),
        source: CodecError::new(format!(
            "file is {} bytes, larger than the {limit} byte limit",
            content.len()
        )),
    }
    .into())
}

/// Line endings and trailing whitespace do not count as reformatting
fn normalize_text(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for line in text.lines() {
        out.push_str(line.trim_end());
        out.push('\n');
    }
    out.trim_end().to_string()
}

/// Diff two bundles with default engine settings
///
/// # Errors
/// See [`Differ::create_config_patch`]
pub fn create_config_patch(
    codecs: &CodecRegistry,
    old: &RawConfig,
    new: &RawConfig,
    formatter: &FormatterConfig,
    keys: &Keys,
    reformat_only: bool,
) -> Result<(ConfigPatch, ConfigObjects)> {
    Differ::new(codecs, &EngineConfig::default()).create_config_patch(old, new, formatter, keys, reformat_only)
}

/// Check if any file outside the allow-list differs
///
/// Purely informational; such files never enter a patch.
#[must_use]
pub fn has_excluded_changes(old: &RawConfig, new: &RawConfig, keys: &Keys) -> bool {
    old.keys()
        .chain(new.keys())
        .filter(|file| !keys.contains(file.as_str()))
        .any(|file| old.get(file) != new.get(file))
}
