//! TOML codec

use serde_json::{Map, Value as JsonValue};
use toml::Value as TomlValue;

use crate::codec::ConfigCodec;
use crate::error::CodecError;
use crate::format::FormatOptions;
use crate::object::ConfigObject;
use crate::value::ConfigValue;

/// TOML documents; tables flatten to dotted paths
#[derive(Debug, Clone, Copy, Default)]
pub struct TomlCodec;

impl ConfigCodec for TomlCodec {
    fn name(&self) -> &str {
        "toml"
    }

    fn parse(&self, content: &str, _options: &FormatOptions) -> Result<ConfigObject, CodecError> {
        let table: toml::Table = toml::from_str(content).map_err(|e| match e.span() {
            Some(span) => CodecError::at_offset(e.message(), content, span.start),
            None => CodecError::new(e.message()),
        })?;
        ConfigObject::from_nested_json(&toml_to_json(TomlValue::Table(table)))
    }

    fn serialize(&self, object: &ConfigObject, _options: &FormatOptions) -> Result<String, CodecError> {
        let root = object.to_nested_json()?;
        let TomlValue::Table(table) = json_to_toml(&root)? else {
            return Err(CodecError::new("document root must be a table"));
        };
        toml::to_string(&table).map_err(|e| CodecError::new(e.to_string()))
    }

    fn value_from_text(&self, text: &str) -> ConfigValue {
        ConfigValue::infer(text)
    }
}

fn toml_to_json(value: TomlValue) -> JsonValue {
    match value {
        TomlValue::String(s) => JsonValue::String(s),
        TomlValue::Integer(i) => JsonValue::from(i),
        TomlValue::Float(f) => serde_json::Number::from_f64(f)
            .map_or_else(|| JsonValue::String(f.to_string()), JsonValue::Number),
        TomlValue::Boolean(b) => JsonValue::Bool(b),
        TomlValue::Datetime(dt) => JsonValue::String(dt.to_string()),
        TomlValue::Array(items) => JsonValue::Array(items.into_iter().map(toml_to_json).collect()),
        TomlValue::Table(table) => {
            let mut map = Map::new();
            for (key, value) in table {
                map.insert(key, toml_to_json(value));
            }
            JsonValue::Object(map)
        }
    }
}

fn json_to_toml(value: &JsonValue) -> Result<TomlValue, CodecError> {
    Ok(match value {
        JsonValue::Null => return Err(CodecError::new("TOML has no null value")),
        JsonValue::Bool(b) => TomlValue::Boolean(*b),
        JsonValue::Number(n) => match n.as_i64() {
            Some(i) => TomlValue::Integer(i),
            None => TomlValue::Float(n.as_f64().unwrap_or_default()),
        },
        JsonValue::String(s) => TomlValue::String(s.clone()),
        JsonValue::Array(items) => TomlValue::Array(items.iter().map(json_to_toml).collect::<Result<_, _>>()?),
        JsonValue::Object(map) => {
            let mut table = toml::Table::new();
            for (key, value) in map {
                table.insert(key.clone(), json_to_toml(value)?);
            }
            TomlValue::Table(table)
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const CONFIG: &str = r#"
title = "example"

[database]
max_connections = 100
timeout = 2.5
ports = [5432, 5433]

[database.replica]
enabled = false
"#;

    #[test]
    fn tables_flatten() {
        let obj = TomlCodec.parse(CONFIG, &FormatOptions::default()).unwrap();
        assert_eq!(obj.get("title"), Some(&ConfigValue::from("example")));
        assert_eq!(obj.get("database.max_connections"), Some(&ConfigValue::Integer(100)));
        assert_eq!(obj.get("database.timeout"), Some(&ConfigValue::Float(2.5)));
        assert_eq!(obj.get("database.replica.enabled"), Some(&ConfigValue::Bool(false)));
        assert_eq!(obj.len(), 5);
    }

    #[test]
    fn syntax_error_carries_position() {
        let err = TomlCodec.parse("a = 1\nb = \n", &FormatOptions::default()).unwrap_err();
        assert!(err.line.is_some_and(|line| line >= 2));
        assert!(err.column.is_some());
    }

    #[test]
    fn null_cannot_be_serialized() {
        let mut obj = ConfigObject::new();
        obj.set("a", ConfigValue::Null);
        assert!(TomlCodec.serialize(&obj, &FormatOptions::default()).is_err());
    }

    #[test]
    fn serialize_round_trips() {
        let obj = TomlCodec.parse(CONFIG, &FormatOptions::default()).unwrap();
        let text = TomlCodec.serialize(&obj, &FormatOptions::default()).unwrap();
        assert_eq!(TomlCodec.parse(&text, &FormatOptions::default()).unwrap(), obj);
    }
}
