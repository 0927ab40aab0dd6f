//! Formatter configuration
//!
//! Describes which codec interprets a configuration file and the per-format
//! options that go with it.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt::{self, Display, Formatter};

/// File name → raw file content for one configuration bundle
pub type RawConfig = BTreeMap<String, String>;

/// Configuration file format
///
/// Known formats map to the built-in codecs. Any other name is kept as
/// [`CfgFileFormat::Custom`] and resolved against the codec registry at
/// lookup time.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum CfgFileFormat {
    /// Java-style `key=value` properties
    Properties,
    /// INI with `[section]` headers
    Ini,
    /// YAML document
    Yaml,
    /// JSON document
    Json,
    /// XML elements and attributes
    Xml,
    /// `.env` style `KEY=value` lines
    Dotenv,
    /// `redis.conf` style `key value` lines
    RedisConf,
    /// TOML document
    Toml,
    /// HashiCorp configuration language
    Hcl,
    /// Name of a codec registered by the caller
    Custom(String),
}

impl CfgFileFormat {
    /// Registry name of the format
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::Properties => "properties",
            Self::Ini => "ini",
            Self::Yaml => "yaml",
            Self::Json => "json",
            Self::Xml => "xml",
            Self::Dotenv => "dotenv",
            Self::RedisConf => "redis",
            Self::Toml => "toml",
            Self::Hcl => "hcl",
            Self::Custom(name) => name,
        }
    }
}

impl From<&str> for CfgFileFormat {
    fn from(name: &str) -> Self {
        match name.to_ascii_lowercase().as_str() {
            "properties" => Self::Properties,
            "ini" => Self::Ini,
            "yaml" | "yml" => Self::Yaml,
            "json" => Self::Json,
            "xml" => Self::Xml,
            "dotenv" => Self::Dotenv,
            "redis" => Self::RedisConf,
            "toml" => Self::Toml,
            "hcl" => Self::Hcl,
            _ => Self::Custom(name.to_string()),
        }
    }
}

impl From<String> for CfgFileFormat {
    fn from(name: String) -> Self {
        Self::from(name.as_str())
    }
}

impl From<CfgFileFormat> for String {
    fn from(format: CfgFileFormat) -> Self {
        format.as_str().to_string()
    }
}

impl Display for CfgFileFormat {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// INI specific settings
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IniOptions {
    /// Section whose keys are addressed by bare parameter names
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub section_name: Option<String>,
}

/// Per-format settings
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FormatOptions {
    /// Settings for the `ini` format
    #[serde(rename = "iniConfig", default, skip_serializing_if = "Option::is_none")]
    pub ini: Option<IniOptions>,
}

/// Which codec to use and how
///
/// ```yaml
/// format: ini
/// iniConfig:
///   sectionName: mysqld
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FormatterConfig {
    /// Codec name
    pub format: CfgFileFormat,

    /// Format specific options
    #[serde(flatten)]
    pub options: FormatOptions,
}

impl FormatterConfig {
    /// Formatter without options
    #[inline]
    #[must_use]
    pub fn new(format: impl Into<CfgFileFormat>) -> Self {
        Self {
            format: format.into(),
            options: FormatOptions::default(),
        }
    }

    /// Set the INI section addressed by bare parameter names
    #[inline]
    #[must_use]
    pub fn with_ini_section(mut self, section: impl Into<String>) -> Self {
        self.options.ini = Some(IniOptions {
            section_name: Some(section.into()),
        });
        self
    }

    /// Configured INI section, if any
    #[must_use]
    pub fn section_name(&self) -> Option<&str> {
        if self.format != CfgFileFormat::Ini {
            return None;
        }
        self.options
            .ini
            .as_ref()
            .and_then(|ini| ini.section_name.as_deref())
            .filter(|name| !name.is_empty())
    }

    /// Parameter name for a dotted path
    ///
    /// Strips the configured INI section prefix; other paths are returned
    /// unchanged.
    #[must_use]
    pub fn param_name<'a>(&self, path: &'a str) -> &'a str {
        match self.section_name() {
            Some(section) => path
                .strip_prefix(section)
                .and_then(|rest| rest.strip_prefix('.'))
                .unwrap_or(path),
            None => path,
        }
    }

    /// Dotted path for an operator-supplied parameter name
    ///
    /// Inverse of [`param_name`](Self::param_name): bare names are placed
    /// under the configured INI section, dotted names are taken as full paths.
    #[must_use]
    pub fn qualify(&self, name: &str) -> String {
        match self.section_name() {
            Some(section) if !name.contains('.') => format!("{section}.{name}"),
            _ => name.to_string(),
        }
    }
}
