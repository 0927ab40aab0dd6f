//! Config constraints
//!
//! A [`ConfigConstraint`] describes one database engine's configuration:
//! file format, which parameters reload without restart, the parameter
//! schema and how a reload is triggered.

use std::collections::BTreeSet;

use reconfig_core::{CanonicalKey, FormatterConfig, HashError};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

use crate::classify::is_dynamic;
use crate::schema::{SchemaError, SchemaNode};

/// Signals accepted by [`UnixSignalTrigger`]
pub const UNIX_SIGNALS: &[&str] = &[
    "SIGHUP", "SIGINT", "SIGQUIT", "SIGILL", "SIGTRAP", "SIGABRT", "SIGBUS", "SIGFPE", "SIGKILL",
    "SIGUSR1", "SIGSEGV", "SIGUSR2", "SIGPIPE", "SIGALRM", "SIGTERM", "SIGSTKFLT", "SIGCHLD",
    "SIGCONT", "SIGSTOP", "SIGTSTP", "SIGTTIN", "SIGTTOU", "SIGURG", "SIGXCPU", "SIGXFSZ",
    "SIGVTALRM", "SIGPROF", "SIGWINCH", "SIGIO", "SIGPWR", "SIGSYS",
];

/// Declarative description of a database's configuration
///
/// ```yaml
/// formatterConfig:
///   format: ini
///   iniConfig:
///     sectionName: mysqld
/// staticParameters: [innodb_buffer_pool_size]
/// dynamicParameters: [max_connections]
/// reloadOptions:
///   unixSignalTrigger:
///     signal: SIGHUP
///     processName: mysqld
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfigConstraint {
    /// Codec and options for the configuration files
    pub formatter_config: FormatterConfig,

    /// Parameters that need a restart
    #[serde(default, skip_serializing_if = "BTreeSet::is_empty")]
    pub static_parameters: BTreeSet<String>,

    /// Parameters that reload in place
    #[serde(default, skip_serializing_if = "BTreeSet::is_empty")]
    pub dynamic_parameters: BTreeSet<String>,

    /// Parameters operators may not change
    #[serde(default, skip_serializing_if = "BTreeSet::is_empty")]
    pub immutable_parameters: BTreeSet<String>,

    /// JSON-Schema-shaped parameter schema
    #[serde(default, alias = "schemaInJson", skip_serializing_if = "Option::is_none")]
    pub schema: Option<JsonValue>,

    /// Root property of `schema` that describes the parameters
    #[serde(
        default,
        alias = "configSchemaTopLevelKey",
        skip_serializing_if = "Option::is_none"
    )]
    pub schema_top_level_key: Option<String>,

    /// How a running process picks up new values
    #[serde(
        default,
        alias = "dynamicReloadAction",
        skip_serializing_if = "Option::is_none"
    )]
    pub reload_options: Option<ReloadOptions>,
}

/// Reload mechanisms; any one present means reload is supported
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReloadOptions {
    /// Send a signal to the database process
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unix_signal_trigger: Option<UnixSignalTrigger>,

    /// Run a command
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub shell_trigger: Option<ShellTrigger>,

    /// Run a templated script
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tpl_script_trigger: Option<TplScriptTrigger>,

    /// The database watches its own files
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub auto_trigger: Option<AutoTrigger>,
}

/// Signal based reload
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UnixSignalTrigger {
    /// Signal name, e.g. `SIGHUP`
    pub signal: String,
    /// Process receiving the signal
    pub process_name: String,
}

/// Command based reload
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShellTrigger {
    /// Command and arguments
    #[serde(default)]
    pub command: Vec<String>,
    /// Wait for the command to finish
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sync: Option<bool>,
}

/// Script based reload
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TplScriptTrigger {
    /// Reference to the script template
    pub script_config_map_ref: String,
    /// Namespace of the template
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub namespace: String,
    /// Wait for the script to finish
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sync: Option<bool>,
}

/// Process reloads changed files itself
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AutoTrigger {
    /// Process watching the files
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub process_name: String,
}

/// Structural problem found by [`ConfigConstraint::check`]
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConstraintIssue {
    /// Signal name is not a known unix signal
    #[error("unknown unix signal '{0}'")]
    UnknownSignal(String),

    /// Shell trigger has nothing to run
    #[error("shell trigger has an empty command")]
    EmptyShellCommand,

    /// Schema cannot be compiled
    #[error("schema error: {0}")]
    Schema(String),
}

impl ReloadOptions {
    /// Check if any trigger is configured
    #[inline]
    #[must_use]
    pub fn has_trigger(&self) -> bool {
        self.unix_signal_trigger.is_some()
            || self.shell_trigger.is_some()
            || self.tpl_script_trigger.is_some()
            || self.auto_trigger.is_some()
    }
}

impl ConfigConstraint {
    /// Constraint with a formatter and nothing else
    #[must_use]
    pub fn new(formatter_config: FormatterConfig) -> Self {
        Self {
            formatter_config,
            static_parameters: BTreeSet::new(),
            dynamic_parameters: BTreeSet::new(),
            immutable_parameters: BTreeSet::new(),
            schema: None,
            schema_top_level_key: None,
            reload_options: None,
        }
    }

    /// Load from YAML (JSON is valid YAML)
    ///
    /// # Errors
    /// Returns error if the document does not describe a constraint
    pub fn from_yaml(text: &str) -> Result<Self, serde_yaml::Error> {
        serde_yaml::from_str(text)
    }

    /// Check if a parameter reloads without restart
    #[must_use]
    pub fn is_dynamic(&self, param: &str) -> bool {
        is_dynamic(param, &self.static_parameters, &self.dynamic_parameters)
    }

    /// Check if operators may not change a parameter
    #[must_use]
    pub fn is_immutable(&self, param: &str) -> bool {
        self.immutable_parameters.contains(param)
    }

    /// Check if the database can reload at all
    #[must_use]
    pub fn supports_reload(&self) -> bool {
        self.reload_options.as_ref().is_some_and(ReloadOptions::has_trigger)
    }

    /// Parameter name of a dotted path (INI section prefix stripped)
    #[must_use]
    pub fn param_name<'a>(&self, path: &'a str) -> &'a str {
        self.formatter_config.param_name(path)
    }

    /// Compiled schema, if one is declared
    ///
    /// # Errors
    /// Returns error if the schema or its top-level key is invalid
    pub fn schema(&self) -> Result<Option<SchemaNode>, SchemaError> {
        let Some(schema) = &self.schema else {
            return Ok(None);
        };
        match self.schema_top_level_key.as_deref().filter(|k| !k.is_empty()) {
            Some(key) => SchemaNode::from_json_at(schema, key).map(Some),
            None => SchemaNode::from_json(schema).map(Some),
        }
    }

    /// Structural sanity checks
    ///
    /// Names listed as both static and dynamic are not an issue (static
    /// wins) but are logged.
    #[must_use]
    pub fn check(&self) -> Vec<ConstraintIssue> {
        let mut issues = Vec::new();

        let overlap: Vec<&str> = self
            .static_parameters
            .intersection(&self.dynamic_parameters)
            .map(String::as_str)
            .collect();
        if !overlap.is_empty() {
            tracing::warn!(
                parameters = ?overlap,
                "parameters listed as both static and dynamic are treated as static"
            );
        }

        if let Some(reload) = &self.reload_options {
            if let Some(trigger) = &reload.unix_signal_trigger {
                if !UNIX_SIGNALS.contains(&trigger.signal.as_str()) {
                    issues.push(ConstraintIssue::UnknownSignal(trigger.signal.clone()));
                }
            }
            if let Some(trigger) = &reload.shell_trigger {
                if trigger.command.iter().all(|part| part.trim().is_empty()) {
                    issues.push(ConstraintIssue::EmptyShellCommand);
                }
            }
        }

        if let Err(e) = self.schema() {
            issues.push(ConstraintIssue::Schema(e.to_string()));
        }

        issues
    }

    /// Key shared by structurally identical constraints
    ///
    /// # Errors
    /// Returns error if the constraint cannot be encoded
    pub fn canonical_key(&self) -> Result<CanonicalKey, HashError> {
        CanonicalKey::of_serializable(self)
    }
}
