//! Error types for reconfigure operations

use reconfig_core::{FormatError, ParseError, SerializeError, UnknownFormatError};

use crate::schema::SchemaError;
use crate::validate::Violation;

/// Errors from diff, validate and merge operations
///
/// Validation findings are returned as data ([`Violation`]); only
/// [`merge_and_validate`](crate::merge_and_validate) turns them into
/// [`ReconfigureError::ValidationFailed`].
#[derive(Debug, Clone, thiserror::Error)]
pub enum ReconfigureError {
    /// A file could not be parsed
    #[error(transparent)]
    Parse(#[from] ParseError),

    /// A file could not be written back
    #[error(transparent)]
    Serialize(#[from] SerializeError),

    /// No codec for the configured format
    #[error(transparent)]
    UnknownFormat(#[from] UnknownFormatError),

    /// Edit names a file the bundle does not contain
    #[error("unknown config file: '{0}'")]
    UnknownFile(String),

    /// Update diff bytes could not be decoded
    #[error("failed to decode update diff of '{file}': {message}")]
    PatchDecode { file: String, message: String },

    /// Constraint schema cannot be compiled
    #[error(transparent)]
    Schema(#[from] SchemaError),

    /// Merged configuration breaks the schema
    #[error("configuration violates its schema ({} violation(s))", .0.len())]
    ValidationFailed(Vec<Violation>),
}

impl From<FormatError> for ReconfigureError {
    fn from(err: FormatError) -> Self {
        match err {
            FormatError::UnknownFormat(e) => Self::UnknownFormat(e),
            FormatError::Parse(e) => Self::Parse(e),
            FormatError::Serialize(e) => Self::Serialize(e),
        }
    }
}

/// Result alias for reconfigure operations
pub type Result<T> = std::result::Result<T, ReconfigureError>;
