//! `.env` codec

use crate::codec::ConfigCodec;
use crate::error::CodecError;
use crate::format::FormatOptions;
use crate::object::ConfigObject;

/// `KEY=value` lines, optionally prefixed with `export`
#[derive(Debug, Clone, Copy, Default)]
pub struct DotenvCodec;

impl ConfigCodec for DotenvCodec {
    fn name(&self) -> &str {
        "dotenv"
    }

    fn parse(&self, content: &str, _options: &FormatOptions) -> Result<ConfigObject, CodecError> {
        let mut object = ConfigObject::new();

        for (index, raw) in content.lines().enumerate() {
            let line_no = index + 1;
            let line = raw.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            let line = line.strip_prefix("export ").map_or(line, str::trim_start);

            let (key, rest) = line
                .split_once('=')
                .ok_or_else(|| CodecError::at("expected KEY=value", line_no, None))?;
            let key = key.trim();
            if key.is_empty() {
                return Err(CodecError::at("variable has an empty name", line_no, Some(1)));
            }

            let value_column = rest.as_ptr() as usize - raw.as_ptr() as usize + 1;
            let value = parse_value(rest.trim_start())
                .map_err(|message| CodecError::at(message, line_no, Some(value_column)))?;
            object.set(key, value);
        }

        Ok(object)
    }

    fn serialize(&self, object: &ConfigObject, _options: &FormatOptions) -> Result<String, CodecError> {
        let mut out = String::new();
        for (key, value) in object.iter() {
            out.push_str(key);
            out.push('=');
            out.push_str(&quote_if_needed(&value.to_text()));
            out.push('\n');
        }
        Ok(out)
    }
}

fn parse_value(rest: &str) -> Result<String, &'static str> {
    if let Some(body) = rest.strip_prefix('"') {
        let mut out = String::new();
        let mut chars = body.chars();
        while let Some(c) = chars.next() {
            match c {
                '"' => return Ok(out),
                '\\' => match chars.next() {
                    Some('n') => out.push('\n'),
                    Some('t') => out.push('\t'),
                    Some('r') => out.push('\r'),
                    Some(other) => out.push(other),
                    None => break,
                },
                other => out.push(other),
            }
        }
        return Err("unterminated double-quoted value");
    }

    if let Some(body) = rest.strip_prefix('\'') {
        return body
            .find('\'')
            .map(|end| body[..end].to_string())
            .ok_or("unterminated single-quoted value");
    }

    let bytes = rest.as_bytes();
    let end = bytes
        .iter()
        .enumerate()
        .position(|(i, b)| *b == b'#' && i > 0 && bytes[i - 1].is_ascii_whitespace())
        .unwrap_or(rest.len());
    Ok(rest[..end].trim_end().to_string())
}

fn quote_if_needed(value: &str) -> String {
    let safe = value
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || "_-./:@,+%".contains(c));
    if safe {
        return value.to_string();
    }

    let mut out = String::with_capacity(value.len() + 2);
    out.push('"');
    for c in value.chars() {
        match c {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            other => out.push(other),
        }
    }
    out.push('"');
    out
}
