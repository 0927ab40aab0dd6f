//! HCL codec

use serde_json::Value as JsonValue;

use crate::codec::ConfigCodec;
use crate::error::CodecError;
use crate::format::FormatOptions;
use crate::object::ConfigObject;
use crate::value::ConfigValue;

/// HCL bodies; blocks and object expressions flatten to dotted paths
#[derive(Debug, Clone, Copy, Default)]
pub struct HclCodec;

impl ConfigCodec for HclCodec {
    fn name(&self) -> &str {
        "hcl"
    }

    fn parse(&self, content: &str, _options: &FormatOptions) -> Result<ConfigObject, CodecError> {
        let root: JsonValue = hcl::from_str(content).map_err(|e| CodecError::new(e.to_string()))?;
        ConfigObject::from_nested_json(&root)
    }

    fn serialize(&self, object: &ConfigObject, _options: &FormatOptions) -> Result<String, CodecError> {
        let root = object.to_nested_json()?;
        hcl::to_string(&root).map_err(|e| CodecError::new(e.to_string()))
    }

    fn value_from_text(&self, text: &str) -> ConfigValue {
        ConfigValue::infer(text)
    }
}
