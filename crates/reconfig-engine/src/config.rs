//! Engine configuration

use serde::{Deserialize, Serialize};

/// Tuning knobs for reconfigure operations
///
/// ```yaml
/// parallelThreshold: 8
/// maxFileBytes: 1048576
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct EngineConfig {
    /// Eligible file count from which files are parsed in parallel
    pub parallel_threshold: usize,
    /// Files larger than this fail to parse
    pub max_file_bytes: usize,
}

impl EngineConfig {
    /// Create default configuration
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// With parallel threshold
    #[inline]
    #[must_use]
    pub fn with_parallel_threshold(mut self, threshold: usize) -> Self {
        self.parallel_threshold = threshold;
        self
    }

    /// With maximum file size
    #[inline]
    #[must_use]
    pub fn with_max_file_bytes(mut self, bytes: usize) -> Self {
        self.max_file_bytes = bytes;
        self
    }

    /// Load from YAML; missing fields keep their defaults
    ///
    /// # Errors
    /// Returns error on malformed YAML or wrongly typed fields
    pub fn from_yaml(text: &str) -> Result<Self, serde_yaml::Error> {
        if text.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_yaml::from_str(text)
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            parallel_threshold: 4,
            max_file_bytes: 10 * 1024 * 1024,
        }
    }
}
