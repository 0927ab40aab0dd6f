//! Reconfigure facade
//!
//! [`Reconfigurer`] bundles a codec registry with engine settings so
//! callers do not thread both through every operation.

use reconfig_core::{CodecRegistry, FormatterConfig, RawConfig};

use crate::config::EngineConfig;
use crate::constraint::ConfigConstraint;
use crate::diff::{ConfigObjects, Differ, Keys};
use crate::error::Result;
use crate::merge::{self, ParamPair};
use crate::patch::ConfigPatch;
use crate::policy;
use crate::validate::{self, Violation};
use crate::visualize::{self, VisualizedParam};

/// Entry point for reconfigure operations
#[derive(Debug, Clone)]
pub struct Reconfigurer {
    codecs: CodecRegistry,
    config: EngineConfig,
}

impl Default for Reconfigurer {
    fn default() -> Self {
        Self::new()
    }
}

impl Reconfigurer {
    /// Create with the built-in codecs and default settings
    #[must_use]
    pub fn new() -> Self {
        Self::with_codecs(CodecRegistry::with_defaults())
    }

    /// Create with a custom codec registry
    #[must_use]
    pub fn with_codecs(codecs: CodecRegistry) -> Self {
        Self {
            codecs,
            config: EngineConfig::default(),
        }
    }

    /// With engine settings
    #[inline]
    #[must_use]
    pub fn with_config(mut self, config: EngineConfig) -> Self {
        self.config = config;
        self
    }

    /// Codec registry in use
    #[inline]
    #[must_use]
    pub fn codecs(&self) -> &CodecRegistry {
        &self.codecs
    }

    /// Engine settings in use
    #[inline]
    #[must_use]
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Diff two bundles
    ///
    /// # Errors
    /// See [`Differ::create_config_patch`]
    pub fn create_config_patch(
        &self,
        old: &RawConfig,
        new: &RawConfig,
        formatter: &FormatterConfig,
        keys: &Keys,
        reformat_only: bool,
    ) -> Result<(ConfigPatch, ConfigObjects)> {
        Differ::new(&self.codecs, &self.config).create_config_patch(old, new, formatter, keys, reformat_only)
    }

    /// Check if a patch applies without restart
    ///
    /// # Errors
    /// Returns error if update bytes cannot be decoded
    pub fn is_update_dynamic(&self, constraint: &ConfigConstraint, patch: &ConfigPatch) -> Result<bool> {
        policy::is_update_dynamic(constraint, patch)
    }

    /// Validate a candidate bundle
    ///
    /// # Errors
    /// See [`validate::validate`]
    pub fn validate(
        &self,
        constraint: &ConfigConstraint,
        candidate: &RawConfig,
        keys: Option<&Keys>,
    ) -> Result<Vec<Violation>> {
        let in_scope: Vec<&str> = match keys {
            Some(keys) => keys.iter().map(String::as_str).collect(),
            None => candidate.keys().map(String::as_str).collect(),
        };
        self.check_sizes(&constraint.formatter_config, candidate, in_scope)?;
        validate::validate(&self.codecs, constraint, candidate, keys)
    }

    /// Turn a patch into display groups
    ///
    /// # Errors
    /// Returns error if update bytes cannot be decoded
    pub fn visualize(&self, patch: &ConfigPatch, formatter: &FormatterConfig) -> Result<Vec<VisualizedParam>> {
        visualize::to_visualized_params(patch, formatter)
    }

    /// Apply operator edits
    ///
    /// # Errors
    /// See [`merge::merge_updated_params`]
    pub fn merge_updated_params(
        &self,
        base: &RawConfig,
        pairs: &[ParamPair],
        constraint: &ConfigConstraint,
    ) -> Result<RawConfig> {
        self.check_sizes(&constraint.formatter_config, base, pairs.iter().map(|p| p.key.as_str()))?;
        merge::merge_updated_params(&self.codecs, base, pairs, constraint)
    }

    /// Apply operator edits and validate the edited files
    ///
    /// # Errors
    /// See [`merge::merge_and_validate`]
    pub fn merge_and_validate(
        &self,
        base: &RawConfig,
        pairs: &[ParamPair],
        constraint: &ConfigConstraint,
    ) -> Result<RawConfig> {
        self.check_sizes(&constraint.formatter_config, base, pairs.iter().map(|p| p.key.as_str()))?;
        merge::merge_and_validate(&self.codecs, base, pairs, constraint)
    }

    /// Size check of the named files; files not in `bundle` are skipped
    fn check_sizes<'a>(
        &self,
        formatter: &FormatterConfig,
        bundle: &RawConfig,
        files: impl IntoIterator<Item = &'a str>,
    ) -> Result<()> {
        for file in files {
            if let Some(content) = bundle.get(file) {
                crate::diff::check_size(file, formatter, content, self.config.max_file_bytes)?;
            }
        }
        Ok(())
    }
}
