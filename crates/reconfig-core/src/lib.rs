//! Reconfig Core
//!
//! Uniform key/value model for database configuration files.
//!
//! # Core Concepts
//!
//! - [`ConfigObject`]: Flat map from dotted key path to [`ConfigValue`]
//! - [`CfgFileFormat`]: Supported file formats (ini, yaml, xml, ...)
//! - [`ConfigCodec`]: Parse/serialize one format, registered in a [`CodecRegistry`]
//! - [`CanonicalKey`]: Blake3 key over canonical JSON, used for deduplication
//!
//! # Example
//!
//! ```rust,ignore
//! use reconfig_core::{CodecRegistry, FormatterConfig};
//!
//! let codecs = CodecRegistry::with_defaults();
//! let formatter = FormatterConfig::new("ini").with_ini_section("mysqld");
//! let object = codecs.parse("my.cnf", &formatter, "[mysqld]\nmax_connections=100\n")?;
//! assert_eq!(object.get("mysqld.max_connections").unwrap().to_text(), "100");
//! ```

#![warn(unreachable_pub)]

mod error;
mod format;
mod hash;
mod object;
mod path;
mod value;

/// Format codecs
pub mod codec;

pub use codec::{
    CodecRegistry, ConfigCodec, DotenvCodec, HclCodec, IniCodec, JsonCodec, PropertiesCodec,
    RedisCodec, TomlCodec, XmlCodec, YamlCodec,
};
pub use error::{CodecError, FormatError, ParseError, SerializeError, UnknownFormatError};
pub use format::{CfgFileFormat, FormatOptions, FormatterConfig, IniOptions, RawConfig};
pub use hash::{canonical_json, CanonicalKey, HashError};
pub use object::{ConfigObject, Keys};
pub use path::join_key;
pub use value::ConfigValue;

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
