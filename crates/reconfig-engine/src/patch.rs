//! Config patches
//!
//! A [`ConfigPatch`] is the result of diffing two configuration bundles.
//! Updated parameters are stored per file as JSON bytes
//! (`{"path": {"old": .., "new": ..}}`) so the record can be attached to an
//! audit trail as is.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt::{self, Display};

use reconfig_core::{CodecError, ConfigObject, ConfigValue, SerializeError};
use serde::{Deserialize, Serialize, Serializer};

use crate::error::{ReconfigureError, Result};

/// Old and new value of an updated parameter
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UpdatedParam {
    /// Value before the change
    pub old: ConfigValue,
    /// Value after the change
    pub new: ConfigValue,
}

/// Updated parameters of one file, by dotted path
pub type UpdateDiff = BTreeMap<String, UpdatedParam>;

/// Kind of change of a parameter
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum UpdateType {
    /// Parameter only in the new configuration
    Added,
    /// Parameter value changed
    Updated,
    /// Parameter only in the old configuration
    Deleted,
}

impl Display for UpdateType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Added => "add",
            Self::Updated => "update",
            Self::Deleted => "delete",
        })
    }
}

/// Structured difference between two configuration bundles
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfigPatch {
    /// At least one eligible file changed
    pub is_modify: bool,
    /// Added parameters per file
    pub added_config: BTreeMap<String, ConfigObject>,
    /// Deleted parameters per file, with their old values
    pub deleted_config: BTreeMap<String, ConfigObject>,
    /// Encoded [`UpdateDiff`] per file
    #[serde(serialize_with = "serialize_updates")]
    pub update_config: BTreeMap<String, Vec<u8>>,
    /// Files whose text changed without any value change
    #[serde(skip_serializing_if = "BTreeSet::is_empty")]
    pub reformatted: BTreeSet<String>,
}

impl ConfigPatch {
    /// Decode the updated parameters of one file
    ///
    /// Files without updates yield an empty diff.
    ///
    /// # Errors
    /// Returns [`ReconfigureError::PatchDecode`] if the bytes are not a valid diff
    pub fn updated_params(&self, file: &str) -> Result<UpdateDiff> {
        match self.update_config.get(file) {
            Some(bytes) => decode_update(file, bytes),
            None => Ok(UpdateDiff::new()),
        }
    }

    /// Decode the updated parameters of every file
    ///
    /// # Errors
    /// Returns [`ReconfigureError::PatchDecode`] on the first invalid entry
    pub fn decode_updates(&self) -> Result<BTreeMap<String, UpdateDiff>> {
        self.update_config
            .iter()
            .map(|(file, bytes)| Ok((file.clone(), decode_update(file, bytes)?)))
            .collect()
    }

    /// Names of files with at least one parameter change
    #[must_use]
    pub fn changed_files(&self) -> BTreeSet<&str> {
        self.added_config
            .keys()
            .chain(self.deleted_config.keys())
            .chain(self.update_config.keys())
            .map(String::as_str)
            .collect()
    }

    /// Check if no parameter changed
    ///
    /// A patch may still be a modification through `reformatted` files.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.added_config.is_empty() && self.deleted_config.is_empty() && self.update_config.is_empty()
    }
}

/// Encode one file's updates
///
/// # Errors
/// Returns a serialize error naming `file` if the diff cannot be encoded
pub fn encode_update(file: &str, diff: &UpdateDiff) -> Result<Vec<u8>> {
    serde_json::to_vec(diff).map_err(|e| {
        ReconfigureError::Serialize(SerializeError {
            file: file.to_string(),
            format: "json".to_string(),
            source: CodecError::new(e.to_string()),
        })
    })
}

fn decode_update(file: &str, bytes: &[u8]) -> Result<UpdateDiff> {
    serde_json::from_slice(bytes).map_err(|e| ReconfigureError::PatchDecode {
        file: file.to_string(),
        message: e.to_string(),
    })
}

/// Emit update bytes as JSON objects, falling back to text
fn serialize_updates<S: Serializer>(updates: &BTreeMap<String, Vec<u8>>, serializer: S) -> std::result::Result<S::Ok, S::Error> {
    use serde::ser::SerializeMap;

    let mut map = serializer.serialize_map(Some(updates.len()))?;
    for (file, bytes) in updates {
        match serde_json::from_slice::<serde_json::Value>(bytes) {
            Ok(value) => map.serialize_entry(file, &value)?,
            Err(_) => map.serialize_entry(file, &String::from_utf8_lossy(bytes))?,
        }
    }
    map.end()
}
