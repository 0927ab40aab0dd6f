//! INI codec (my.cnf style)
//!
//! Sections become path prefixes: `[mysqld]` + `port=3306` is addressed as
//! `mysqld.port`. Keys before the first section header are top-level.

use std::collections::BTreeMap;

use crate::codec::{unquote, ConfigCodec};
use crate::error::CodecError;
use crate::format::FormatOptions;
use crate::object::ConfigObject;
use crate::path::join_key;

/// INI files with `;`/`#` comments and bare flag keys
#[derive(Debug, Clone, Copy, Default)]
pub struct IniCodec;

impl ConfigCodec for IniCodec {
    fn name(&self) -> &str {
        "ini"
    }

    fn parse(&self, content: &str, _options: &FormatOptions) -> Result<ConfigObject, CodecError> {
        let mut object = ConfigObject::new();
        let mut section = String::new();

        for (index, raw) in content.lines().enumerate() {
            let line = raw.trim();
            if line.is_empty() || line.starts_with(';') || line.starts_with('#') {
                continue;
            }
            // !include / !includedir directives
            if line.starts_with('!') {
                continue;
            }

            if let Some(header) = line.strip_prefix('[') {
                let name = header.strip_suffix(']').ok_or_else(|| {
                    CodecError::at("unterminated section header", index + 1, Some(raw.len()))
                })?;
                let name = name.trim();
                if name.is_empty() {
                    return Err(CodecError::at("empty section name", index + 1, Some(1)));
                }
                section = name.to_string();
                continue;
            }

            let (key, value) = match line.find('=').or_else(|| line.find(':')) {
                Some(pos) => (line[..pos].trim(), parse_value(&line[pos + 1..])),
                None => (line, String::new()),
            };
            if key.is_empty() {
                return Err(CodecError::at("parameter has an empty name", index + 1, Some(1)));
            }
            object.set(join_key(&section, key), value);
        }

        Ok(object)
    }

    fn serialize(&self, object: &ConfigObject, _options: &FormatOptions) -> Result<String, CodecError> {
        let mut top_level = Vec::new();
        let mut sections: BTreeMap<&str, Vec<(&str, String)>> = BTreeMap::new();

        for (path, value) in object.iter() {
            let text = value.to_text();
            match path.split_once('.') {
                Some((section, key)) => sections.entry(section).or_default().push((key, text)),
                None => top_level.push((path, text)),
            }
        }

        let mut out = String::new();
        for (key, value) in &top_level {
            write_entry(&mut out, key, value);
        }
        for (name, entries) in sections {
            if !out.is_empty() {
                out.push('\n');
            }
            out.push('[');
            out.push_str(name);
            out.push_str("]\n");
            for (key, value) in &entries {
                write_entry(&mut out, key, value);
            }
        }
        Ok(out)
    }
}

fn parse_value(raw: &str) -> String {
    let value = raw.trim();
    if let Some(quote) = value.chars().next().filter(|c| *c == '"' || *c == '\'') {
        if let Some(end) = value[1..].find(quote) {
            return value[1..=end].to_string();
        }
    }
    strip_inline_comment(value).trim_end().to_string()
}

/// Cut at a `#` or `;` preceded by whitespace
fn strip_inline_comment(value: &str) -> &str {
    let bytes = value.as_bytes();
    for (i, b) in bytes.iter().enumerate() {
        if (*b == b'#' || *b == b';') && i > 0 && bytes[i - 1].is_ascii_whitespace() {
            return &value[..i];
        }
    }
    value
}

fn write_entry(out: &mut String, key: &str, value: &str) {
    out.push_str(key);
    if !value.is_empty() {
        out.push('=');
        out.push_str(&quote_if_needed(value));
    }
    out.push('\n');
}

fn quote_if_needed(value: &str) -> String {
    let needs_quotes = value.contains(['#', ';'])
        || value.starts_with(char::is_whitespace)
        || value.ends_with(char::is_whitespace)
        || value.starts_with(['"', '\''])
        || unquote(value) != value;
    if !needs_quotes {
        return value.to_string();
    }
    if value.contains('"') {
        format!("'{value}'")
    } else {
        format!("\"{value}\"")
    }
}
