//! Restart-or-reload decision

use std::collections::BTreeSet;

use crate::constraint::ConfigConstraint;
use crate::error::Result;
use crate::patch::ConfigPatch;

/// Parameter names touched by a patch, projected through the constraint
///
/// # Errors
/// Returns error if the update bytes of a file cannot be decoded
pub fn touched_params(constraint: &ConfigConstraint, patch: &ConfigPatch) -> Result<BTreeSet<String>> {
    let mut names = BTreeSet::new();
    for object in patch.added_config.values().chain(patch.deleted_config.values()) {
        names.extend(object.keys().map(|path| constraint.param_name(path).to_string()));
    }
    for diff in patch.decode_updates()?.values() {
        names.extend(diff.keys().map(|path| constraint.param_name(path).to_string()));
    }
    Ok(names)
}

/// Check if a patch can be applied without restarting the database
///
/// A patch touching nothing is trivially dynamic. Otherwise every touched
/// parameter must be dynamic and the database must support reload.
///
/// # Errors
/// Returns error if the update bytes of a file cannot be decoded
pub fn is_update_dynamic(constraint: &ConfigConstraint, patch: &ConfigPatch) -> Result<bool> {
    let names = touched_params(constraint, patch)?;
    if names.is_empty() {
        return Ok(true);
    }
    if !constraint.supports_reload() {
        tracing::debug!(params = names.len(), "no reload trigger configured, restart required");
        return Ok(false);
    }
    if let Some(name) = names.iter().find(|name| !constraint.is_dynamic(name)) {
        tracing::debug!(param = %name, "static parameter changed, restart required");
        return Ok(false);
    }
    Ok(true)
}
