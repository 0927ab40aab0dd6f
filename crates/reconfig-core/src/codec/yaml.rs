//! YAML codec

use serde_json::{Map, Value as JsonValue};
use serde_yaml::Value as YamlValue;

use crate::codec::ConfigCodec;
use crate::error::CodecError;
use crate::format::FormatOptions;
use crate::object::ConfigObject;
use crate::value::ConfigValue;

/// YAML documents; nested mappings flatten to dotted paths
#[derive(Debug, Clone, Copy, Default)]
pub struct YamlCodec;

impl ConfigCodec for YamlCodec {
    fn name(&self) -> &str {
        "yaml"
    }

    fn parse(&self, content: &str, _options: &FormatOptions) -> Result<ConfigObject, CodecError> {
        let root: YamlValue = serde_yaml::from_str(content).map_err(|e| match e.location() {
            Some(loc) => CodecError::at(e.to_string(), loc.line(), Some(loc.column())),
            None => CodecError::new(e.to_string()),
        })?;
        ConfigObject::from_nested_json(&yaml_to_json(root))
    }

    fn serialize(&self, object: &ConfigObject, _options: &FormatOptions) -> Result<String, CodecError> {
        let root = object.to_nested_json()?;
        serde_yaml::to_string(&root).map_err(|e| CodecError::new(e.to_string()))
    }

    fn value_from_text(&self, text: &str) -> ConfigValue {
        ConfigValue::infer(text)
    }
}

fn yaml_to_json(value: YamlValue) -> JsonValue {
    match value {
        YamlValue::Null => JsonValue::Null,
        YamlValue::Bool(b) => JsonValue::Bool(b),
        YamlValue::Number(n) => {
            if let Some(i) = n.as_i64() {
                JsonValue::from(i)
            } else {
                n.as_f64()
                    .and_then(serde_json::Number::from_f64)
                    .map_or_else(|| JsonValue::String(n.to_string()), JsonValue::Number)
            }
        }
        YamlValue::String(s) => JsonValue::String(s),
        YamlValue::Sequence(items) => JsonValue::Array(items.into_iter().map(yaml_to_json).collect()),
        YamlValue::Mapping(mapping) => {
            let mut map = Map::new();
            for (key, value) in mapping {
                map.insert(key_text(key), yaml_to_json(value));
            }
            JsonValue::Object(map)
        }
        YamlValue::Tagged(tagged) => yaml_to_json(tagged.value),
    }
}

/// Non-string mapping keys (`8080: x`, `true: y`) keep their text form
fn key_text(key: YamlValue) -> String {
    match key {
        YamlValue::String(s) => s,
        YamlValue::Null => "null".to_string(),
        YamlValue::Bool(b) => b.to_string(),
        YamlValue::Number(n) => n.to_string(),
        YamlValue::Tagged(tagged) => key_text(tagged.value),
        other => serde_yaml::to_string(&other)
            .map(|s| s.trim_end().to_string())
            .unwrap_or_default(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const VALUES: &str = "\
replicaCount: 3
image:
  repository: nginx
  tag: \"1.25\"
ports:
  - 80
  - 443
listeners:
  - name: http
    port: 80
8080: legacy
";

    #[test]
    fn nested_mappings_flatten() {
        let obj = YamlCodec.parse(VALUES, &FormatOptions::default()).unwrap();
        assert_eq!(obj.get("replicaCount"), Some(&ConfigValue::Integer(3)));
        assert_eq!(obj.get("image.tag"), Some(&ConfigValue::from("1.25")));
        assert_eq!(
            obj.get("ports"),
            Some(&ConfigValue::List(vec![ConfigValue::Integer(80), ConfigValue::Integer(443)]))
        );
        assert_eq!(obj.get("listeners.0.name"), Some(&ConfigValue::from("http")));
        assert_eq!(obj.get("8080"), Some(&ConfigValue::from("legacy")));
    }

    #[test]
    fn empty_document_is_empty_object() {
        assert!(YamlCodec.parse("", &FormatOptions::default()).unwrap().is_empty());
        assert!(YamlCodec.parse("# only a comment\n", &FormatOptions::default()).unwrap().is_empty());
    }

    #[test]
    fn syntax_error_carries_line() {
        let err = YamlCodec
            .parse("a: 1\nb: [unclosed\nc: 3\n", &FormatOptions::default())
            .unwrap_err();
        assert!(err.line.is_some());
    }

    #[test]
    fn serialize_round_trips() {
        let obj = YamlCodec.parse(VALUES, &FormatOptions::default()).unwrap();
        let text = YamlCodec.serialize(&obj, &FormatOptions::default()).unwrap();
        assert_eq!(YamlCodec.parse(&text, &FormatOptions::default()).unwrap(), obj);
    }
}
