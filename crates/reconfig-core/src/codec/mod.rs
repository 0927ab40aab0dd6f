//! Format codecs
//!
//! Converts raw file text into a [`ConfigObject`] and back:
//! - Line-oriented formats (ini, properties, dotenv, redis) by hand
//! - Structured formats (json, yaml, toml, hcl) via serde
//! - XML via quick-xml

use std::collections::HashMap;
use std::sync::Arc;

use crate::error::{CodecError, ParseError, SerializeError, UnknownFormatError};
use crate::format::{CfgFileFormat, FormatOptions, FormatterConfig};
use crate::object::ConfigObject;
use crate::value::ConfigValue;

mod dotenv;
mod hcl;
mod ini;
mod json;
mod properties;
mod redis;
mod toml;
mod xml;
mod yaml;

pub use self::dotenv::DotenvCodec;
pub use self::hcl::HclCodec;
pub use self::ini::IniCodec;
pub use self::json::JsonCodec;
pub use self::properties::PropertiesCodec;
pub use self::redis::RedisCodec;
pub use self::toml::TomlCodec;
pub use self::xml::XmlCodec;
pub use self::yaml::YamlCodec;

/// Parse/serialize capability for one configuration format
///
/// Implement this trait and register it in a [`CodecRegistry`] to add
/// support for a new format.
pub trait ConfigCodec: Send + Sync + 'static {
    /// Registry name (matches [`CfgFileFormat::as_str`])
    fn name(&self) -> &str;

    /// Parse file text into a flat object
    ///
    /// # Errors
    /// Returns error with a position locator when the text is malformed
    fn parse(&self, content: &str, options: &FormatOptions) -> Result<ConfigObject, CodecError>;

    /// Write an object back as file text
    ///
    /// Re-parsing the output yields an equal object. Comments and original
    /// ordering are not preserved.
    ///
    /// # Errors
    /// Returns error if the object has no representation in this format
    fn serialize(&self, object: &ConfigObject, options: &FormatOptions) -> Result<String, CodecError>;

    /// Convert operator-supplied text into a value of this format
    fn value_from_text(&self, text: &str) -> ConfigValue {
        ConfigValue::String(text.to_string())
    }
}

/// Codecs by format name
///
/// Constructed once by the caller and passed by reference; nothing here is
/// global.
#[derive(Clone, Default)]
pub struct CodecRegistry {
    codecs: HashMap<String, Arc<dyn ConfigCodec>>,
}

impl std::fmt::Debug for CodecRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CodecRegistry")
            .field("formats", &self.names())
            .finish()
    }
}

impl CodecRegistry {
    /// Create empty registry
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self {
            codecs: HashMap::new(),
        }
    }

    /// Registry with every built-in codec
    #[must_use]
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        registry.register(PropertiesCodec);
        registry.register(IniCodec);
        registry.register(YamlCodec);
        registry.register(JsonCodec);
        registry.register(XmlCodec);
        registry.register(DotenvCodec);
        registry.register(RedisCodec);
        registry.register(TomlCodec);
        registry.register(HclCodec);
        registry
    }

    /// Register a codec under its name, replacing any previous one
    pub fn register<C: ConfigCodec>(&mut self, codec: C) -> Option<Arc<dyn ConfigCodec>> {
        self.codecs.insert(codec.name().to_string(), Arc::new(codec))
    }

    /// Check if a codec exists for the format
    #[inline]
    #[must_use]
    pub fn contains(&self, format: &CfgFileFormat) -> bool {
        self.codecs.contains_key(format.as_str())
    }

    /// Registered format names, sorted
    #[must_use]
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.codecs.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    /// Look up the codec for a format
    ///
    /// # Errors
    /// Returns [`UnknownFormatError`] if nothing is registered under the name
    pub fn get(&self, format: &CfgFileFormat) -> Result<&dyn ConfigCodec, UnknownFormatError> {
        self.codecs
            .get(format.as_str())
            .map(|codec| &**codec)
            .ok_or_else(|| UnknownFormatError(format.to_string()))
    }

    /// Parse one file of a bundle
    ///
    /// # Errors
    /// - [`FormatError::UnknownFormat`](crate::FormatError::UnknownFormat) if no codec matches
    /// - [`FormatError::Parse`](crate::FormatError::Parse) naming `file` on malformed content
    pub fn parse(
        &self,
        file: &str,
        formatter: &FormatterConfig,
        content: &str,
    ) -> Result<ConfigObject, crate::FormatError> {
        let codec = self.get(&formatter.format)?;
        codec
            .parse(content, &formatter.options)
            .map_err(|source| {
                ParseError {
                    file: file.to_string(),
                    format: formatter.format.to_string(),
                    source,
                }
                .into()
            })
    }

    /// Serialize one file of a bundle
    ///
    /// # Errors
    /// - [`FormatError::UnknownFormat`](crate::FormatError::UnknownFormat) if no codec matches
    /// - [`FormatError::Serialize`](crate::FormatError::Serialize) naming `file`
    pub fn serialize(
        &self,
        file: &str,
        formatter: &FormatterConfig,
        object: &ConfigObject,
    ) -> Result<String, crate::FormatError> {
        let codec = self.get(&formatter.format)?;
        codec
            .serialize(object, &formatter.options)
            .map_err(|source| {
                SerializeError {
                    file: file.to_string(),
                    format: formatter.format.to_string(),
                    source,
                }
                .into()
            })
    }
}

/// Strip one pair of matching surrounding quotes
pub(crate) fn unquote(value: &str) -> &str {
    let bytes = value.as_bytes();
    if bytes.len() >= 2 {
        let (first, last) = (bytes[0], bytes[bytes.len() - 1]);
        if (first == b'"' || first == b'\'') && first == last {
            return &value[1..value.len() - 1];
        }
    }
    value
}

#[cfg(test)]
mod tests {
    use super::*;

    struct UpperCodec;

    impl ConfigCodec for UpperCodec {
        fn name(&self) -> &str {
            "upper"
        }

        fn parse(&self, content: &str, _options: &FormatOptions) -> Result<ConfigObject, CodecError> {
            let mut object = ConfigObject::new();
            for (index, line) in content.lines().enumerate() {
                let (k, v) = line
                    .split_once(' ')
                    .ok_or_else(|| CodecError::at("missing value", index + 1, None))?;
                object.set(k.to_lowercase(), v);
            }
            Ok(object)
        }

        fn serialize(&self, object: &ConfigObject, _options: &FormatOptions) -> Result<String, CodecError> {
            Ok(object
                .iter()
                .map(|(k, v)| format!("{} {}\n", k.to_uppercase(), v.to_text()))
                .collect())
        }
    }

    #[test]
    fn defaults_cover_builtin_formats() {
        let registry = CodecRegistry::with_defaults();
        assert_eq!(
            registry.names(),
            vec!["dotenv", "hcl", "ini", "json", "properties", "redis", "toml", "xml", "yaml"]
        );
        assert!(registry.contains(&CfgFileFormat::RedisConf));
    }

    #[test]
    fn unknown_format_is_reported() {
        let registry = CodecRegistry::with_defaults();
        let formatter = FormatterConfig::new("cue");
        let err = registry.parse("a.cue", &formatter, "").unwrap_err();
        assert!(matches!(err, crate::FormatError::UnknownFormat(UnknownFormatError(ref name)) if name == "cue"));
    }

    #[test]
    fn custom_codec_by_name() {
        let mut registry = CodecRegistry::new();
        assert!(registry.register(UpperCodec).is_none());

        let formatter = FormatterConfig::new("upper");
        let object = registry.parse("x.conf", &formatter, "PORT 80").unwrap();
        assert_eq!(object.get("port"), Some(&ConfigValue::from("80")));
        assert_eq!(registry.serialize("x.conf", &formatter, &object).unwrap(), "PORT 80\n");
    }

    #[test]
    fn parse_error_carries_file_name() {
        let mut registry = CodecRegistry::new();
        registry.register(UpperCodec);

        let err = registry
            .parse("x.conf", &FormatterConfig::new("upper"), "ok 1\nbroken")
            .unwrap_err();
        match err {
            crate::FormatError::Parse(parse) => {
                assert_eq!(parse.file, "x.conf");
                assert_eq!(parse.line(), Some(2));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn unquote_pairs_only() {
        assert_eq!(unquote("\"a b\""), "a b");
        assert_eq!(unquote("'x'"), "x");
        assert_eq!(unquote("\"x'"), "\"x'");
        assert_eq!(unquote("\""), "\"");
    }

    #[test]
    fn registry_debug_lists_formats() {
        let registry = CodecRegistry::with_defaults();
        assert!(format!("{registry:?}").contains("CodecRegistry"));
    }
}
