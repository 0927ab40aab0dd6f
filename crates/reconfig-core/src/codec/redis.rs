//! `redis.conf` codec
//!
//! Each line is `directive arguments...`. Directives that appear more than
//! once (`save`, `rename-command`, ...) become a list of their arguments.

use crate::codec::ConfigCodec;
use crate::error::CodecError;
use crate::format::FormatOptions;
use crate::object::ConfigObject;
use crate::value::ConfigValue;

/// Redis server configuration files
#[derive(Debug, Clone, Copy, Default)]
pub struct RedisCodec;

impl ConfigCodec for RedisCodec {
    fn name(&self) -> &str {
        "redis"
    }

    fn parse(&self, content: &str, _options: &FormatOptions) -> Result<ConfigObject, CodecError> {
        let mut object = ConfigObject::new();

        for (index, raw) in content.lines().enumerate() {
            let line = raw.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }

            let (key, rest) = line
                .split_once(char::is_whitespace)
                .map_or((line, ""), |(k, r)| (k, r.trim()));
            let value = parse_argument(rest).ok_or_else(|| {
                CodecError::at(format!("unterminated quoted argument for '{key}'"), index + 1, None)
            })?;

            match object.remove(key) {
                None => {
                    object.set(key, value);
                }
                Some(ConfigValue::List(mut items)) => {
                    items.push(ConfigValue::String(value));
                    object.set(key, ConfigValue::List(items));
                }
                Some(previous) => {
                    object.set(key, ConfigValue::List(vec![previous, ConfigValue::String(value)]));
                }
            }
        }

        Ok(object)
    }

    fn serialize(&self, object: &ConfigObject, _options: &FormatOptions) -> Result<String, CodecError> {
        let mut out = String::new();
        for (key, value) in object.iter() {
            match value {
                ConfigValue::List(items) => {
                    for item in items {
                        write_directive(&mut out, key, &item.to_text());
                    }
                }
                scalar => write_directive(&mut out, key, &scalar.to_text()),
            }
        }
        Ok(out)
    }
}

/// Unquote a single fully-quoted argument; anything else is kept verbatim
fn parse_argument(rest: &str) -> Option<String> {
    let Some(body) = rest.strip_prefix('"') else {
        return Some(rest.to_string());
    };

    let mut out = String::new();
    let mut chars = body.char_indices();
    while let Some((i, c)) = chars.next() {
        match c {
            '"' => {
                // `"a" "b"` style multi-argument lines stay verbatim
                return Some(if body[i + 1..].trim().is_empty() {
                    out
                } else {
                    rest.to_string()
                });
            }
            '\\' => match chars.next() {
                Some((_, 'n')) => out.push('\n'),
                Some((_, 't')) => out.push('\t'),
                Some((_, other)) => out.push(other),
                None => return None,
            },
            other => out.push(other),
        }
    }
    None
}

fn write_directive(out: &mut String, key: &str, value: &str) {
    out.push_str(key);
    out.push(' ');
    let plain = !value.is_empty()
        && !value.starts_with('"')
        && value.trim() == value
        && !value.contains(['\n', '\t']);
    if plain {
        out.push_str(value);
    } else {
        out.push('"');
        for c in value.chars() {
            match c {
                '"' => out.push_str("\\\""),
                '\\' => out.push_str("\\\\"),
                '\n' => out.push_str("\\n"),
                '\t' => out.push_str("\\t"),
                other => out.push(other),
            }
        }
        out.push('"');
    }
    out.push('\n');
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn parse(content: &str) -> ConfigObject {
        RedisCodec.parse(content, &FormatOptions::default()).unwrap()
    }

    #[test]
    fn directives_and_repeats() {
        let obj = parse(
            "# redis\nmaxmemory 2gb\nmaxmemory-policy allkeys-lru\nsave 900 1\nsave 300 10\nrequirepass \"p@ss word\"\nappendonly\n",
        );
        assert_eq!(obj.get("maxmemory"), Some(&ConfigValue::from("2gb")));
        assert_eq!(obj.get("maxmemory-policy"), Some(&ConfigValue::from("allkeys-lru")));
        assert_eq!(obj.get("save"), Some(&ConfigValue::from(vec!["900 1", "300 10"])));
        assert_eq!(obj.get("requirepass"), Some(&ConfigValue::from("p@ss word")));
        assert_eq!(obj.get("appendonly"), Some(&ConfigValue::from("")));
    }

    #[test]
    fn unterminated_quote_is_an_error() {
        let err = RedisCodec.parse("port 6379\nrequirepass \"open\n", &FormatOptions::default()).unwrap_err();
        assert_eq!(err.line, Some(2));
    }

    #[test]
    fn serialize_repeats_lists() {
        let obj = parse("save 900 1\nsave 300 10\nrequirepass \"\"\n");
        let text = RedisCodec.serialize(&obj, &FormatOptions::default()).unwrap();
        assert_eq!(text, "requirepass \"\"\nsave 900 1\nsave 300 10\n");
        assert_eq!(parse(&text), obj);
    }
}
