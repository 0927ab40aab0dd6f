//! JSON codec

use serde_json::Value as JsonValue;

use crate::codec::ConfigCodec;
use crate::error::CodecError;
use crate::format::FormatOptions;
use crate::object::ConfigObject;
use crate::value::ConfigValue;

/// JSON documents; nested objects flatten to dotted paths
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonCodec;

impl ConfigCodec for JsonCodec {
    fn name(&self) -> &str {
        "json"
    }

    fn parse(&self, content: &str, _options: &FormatOptions) -> Result<ConfigObject, CodecError> {
        if content.trim().is_empty() {
            return Ok(ConfigObject::new());
        }
        let root: JsonValue = serde_json::from_str(content)
            .map_err(|e| CodecError::at(e.to_string(), e.line(), Some(e.column())))?;
        ConfigObject::from_nested_json(&root)
    }

    fn serialize(&self, object: &ConfigObject, _options: &FormatOptions) -> Result<String, CodecError> {
        let root = object.to_nested_json()?;
        let mut text = serde_json::to_string_pretty(&root).map_err(|e| CodecError::new(e.to_string()))?;
        text.push('\n');
        Ok(text)
    }

    fn value_from_text(&self, text: &str) -> ConfigValue {
        ConfigValue::infer(text)
    }
}
