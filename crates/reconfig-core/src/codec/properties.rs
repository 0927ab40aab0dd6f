//! Java-style `.properties` codec

use crate::codec::ConfigCodec;
use crate::error::CodecError;
use crate::format::FormatOptions;
use crate::object::ConfigObject;

/// `key=value` / `key: value` / `key value` lines with `#` and `!` comments
#[derive(Debug, Clone, Copy, Default)]
pub struct PropertiesCodec;

impl ConfigCodec for PropertiesCodec {
    fn name(&self) -> &str {
        "properties"
    }

    fn parse(&self, content: &str, _options: &FormatOptions) -> Result<ConfigObject, CodecError> {
        let mut object = ConfigObject::new();
        let mut lines = content.lines().enumerate();

        while let Some((index, raw)) = lines.next() {
            let trimmed = raw.trim_start();
            if trimmed.is_empty() || trimmed.starts_with('#') || trimmed.starts_with('!') {
                continue;
            }

            // Join continuation lines ending in an odd number of backslashes
            let mut logical = trimmed.to_string();
            while ends_with_continuation(&logical) {
                logical.pop();
                match lines.next() {
                    Some((_, next)) => logical.push_str(next.trim_start()),
                    None => break,
                }
            }

            let (key, value) = split_entry(&logical);
            if key.is_empty() {
                return Err(CodecError::at("property has an empty key", index + 1, Some(1)));
            }
            object.set(unescape(key), unescape(value));
        }

        Ok(object)
    }

    fn serialize(&self, object: &ConfigObject, _options: &FormatOptions) -> Result<String, CodecError> {
        let mut out = String::new();
        for (key, value) in object.iter() {
            out.push_str(&escape(key, true));
            out.push('=');
            out.push_str(&escape(&value.to_text(), false));
            out.push('\n');
        }
        Ok(out)
    }
}

fn ends_with_continuation(line: &str) -> bool {
    line.chars().rev().take_while(|c| *c == '\\').count() % 2 == 1
}

/// Split a logical line into raw (still escaped) key and value
fn split_entry(line: &str) -> (&str, &str) {
    let mut escaped = false;
    let mut key_end = line.len();
    for (i, c) in line.char_indices() {
        if escaped {
            escaped = false;
            continue;
        }
        match c {
            '\\' => escaped = true,
            '=' | ':' | ' ' | '\t' | '\u{c}' => {
                key_end = i;
                break;
            }
            _ => {}
        }
    }

    let key = &line[..key_end];
    let rest = line[key_end..].trim_start_matches([' ', '\t', '\u{c}']);
    let rest = rest
        .strip_prefix('=')
        .or_else(|| rest.strip_prefix(':'))
        .map_or(rest, |r| r.trim_start_matches([' ', '\t', '\u{c}']));
    (key, rest)
}

fn unescape(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut chars = raw.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('n') => out.push('\n'),
            Some('t') => out.push('\t'),
            Some('r') => out.push('\r'),
            Some('f') => out.push('\u{c}'),
            Some(other) => out.push(other),
            None => {}
        }
    }
    out
}

fn escape(text: &str, is_key: bool) -> String {
    let mut out = String::with_capacity(text.len());
    for (i, c) in text.chars().enumerate() {
        match c {
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\t' => out.push_str("\\t"),
            '\r' => out.push_str("\\r"),
            '\u{c}' => out.push_str("\\f"),
            '=' | ':' if is_key => {
                out.push('\\');
                out.push(c);
            }
            ' ' if is_key || i == 0 => out.push_str("\\ "),
            '#' | '!' if is_key && i == 0 => {
                out.push('\\');
                out.push(c);
            }
            _ => out.push(c),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::ConfigValue;

    fn parse(content: &str) -> ConfigObject {
        PropertiesCodec.parse(content, &FormatOptions::default()).unwrap()
    }

    #[test]
    fn separators_and_comments() {
        let obj = parse("# comment\n! also comment\na=1\nb: 2\nc 3\n  d = four five\n\n");
        assert_eq!(obj.get("a"), Some(&ConfigValue::from("1")));
        assert_eq!(obj.get("b"), Some(&ConfigValue::from("2")));
        assert_eq!(obj.get("c"), Some(&ConfigValue::from("3")));
        assert_eq!(obj.get("d"), Some(&ConfigValue::from("four five")));
    }

    #[test]
    fn dotted_keys_stay_flat() {
        let obj = parse("log.retention.hours=168\n");
        assert_eq!(obj.get("log.retention.hours"), Some(&ConfigValue::from("168")));
    }

    #[test]
    fn continuation_lines() {
        let obj = parse("paths=/a,\\\n    /b,\\\n    /c\nnext=1");
        assert_eq!(obj.get("paths"), Some(&ConfigValue::from("/a,/b,/c")));
        assert_eq!(obj.get("next"), Some(&ConfigValue::from("1")));
    }

    #[test]
    fn escaped_separator_in_key() {
        let obj = parse("a\\=b=c\n");
        assert_eq!(obj.get("a=b"), Some(&ConfigValue::from("c")));
    }

    #[test]
    fn empty_key_is_an_error() {
        let err = PropertiesCodec.parse("ok=1\n=value\n", &FormatOptions::default()).unwrap_err();
        assert_eq!(err.line, Some(2));
    }

    #[test]
    fn serialize_escapes() {
        let mut obj = ConfigObject::new();
        obj.set("key with space", " leading");
        obj.set("path", "C:\\dir");
        let text = PropertiesCodec.serialize(&obj, &FormatOptions::default()).unwrap();
        assert_eq!(text, "key\\ with\\ space=\\ leading\npath=C:\\\\dir\n");
        assert_eq!(parse(&text), obj);
    }
}
