//! XML codec
//!
//! Elements flatten to dotted paths rooted at the document element:
//! - attributes become `@name` segments
//! - text of an element that also has attributes or children lives under `#text`
//! - repeated leaf siblings become a list, other repeats get index segments
//!
//! All values are strings.

use quick_xml::escape::escape;
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use serde_json::Value as JsonValue;

use crate::codec::ConfigCodec;
use crate::error::CodecError;
use crate::format::FormatOptions;
use crate::object::ConfigObject;
use crate::path::join_key;
use crate::value::ConfigValue;

const TEXT_KEY: &str = "#text";
const ATTR_PREFIX: char = '@';

/// XML documents with a single root element
#[derive(Debug, Clone, Copy, Default)]
pub struct XmlCodec;

impl ConfigCodec for XmlCodec {
    fn name(&self) -> &str {
        "xml"
    }

    fn parse(&self, content: &str, _options: &FormatOptions) -> Result<ConfigObject, CodecError> {
        let mut object = ConfigObject::new();
        if let Some(root) = read_tree(content)? {
            let name = root.name.clone();
            root.flatten_into(&name, &mut object);
        }
        Ok(object)
    }

    fn serialize(&self, object: &ConfigObject, _options: &FormatOptions) -> Result<String, CodecError> {
        let root = object.to_nested_json()?;
        let JsonValue::Object(map) = &root else {
            return Err(CodecError::new("document root must be a mapping"));
        };
        let mut out = String::from("<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n");
        match map.iter().next() {
            None => {}
            Some((name, value)) if map.len() == 1 => {
                if value.is_array() {
                    return Err(CodecError::new(format!("root element <{name}> cannot repeat")));
                }
                write_element(&mut out, name, value, 0)?;
            }
            Some(_) => {
                return Err(CodecError::new(format!(
                    "XML needs exactly one root element, found {}",
                    map.len()
                )))
            }
        }
        Ok(out)
    }
}

#[derive(Debug, Default)]
struct XmlNode {
    name: String,
    attributes: Vec<(String, String)>,
    text: String,
    children: Vec<XmlNode>,
}

impl XmlNode {
    fn is_leaf(&self) -> bool {
        self.attributes.is_empty() && self.children.is_empty()
    }

    fn flatten_into(self, path: &str, object: &mut ConfigObject) {
        if self.is_leaf() {
            object.set(path, self.text);
            return;
        }

        for (name, value) in self.attributes {
            object.set(join_key(path, &format!("{ATTR_PREFIX}{name}")), value);
        }
        if !self.text.is_empty() {
            object.set(join_key(path, TEXT_KEY), self.text);
        }

        // group siblings by name, keeping first-seen order
        let mut groups: Vec<(String, Vec<XmlNode>)> = Vec::new();
        for child in self.children {
            match groups.iter_mut().find(|(name, _)| *name == child.name) {
                Some((_, members)) => members.push(child),
                None => groups.push((child.name.clone(), vec![child])),
            }
        }

        for (name, mut members) in groups {
            let child_path = join_key(path, &name);
            if members.len() == 1 {
                if let Some(only) = members.pop() {
                    only.flatten_into(&child_path, object);
                }
            } else if members.iter().all(XmlNode::is_leaf) {
                let items: Vec<ConfigValue> = members.into_iter().map(|m| ConfigValue::String(m.text)).collect();
                object.set(child_path, ConfigValue::List(items));
            } else {
                for (index, member) in members.into_iter().enumerate() {
                    member.flatten_into(&join_key(&child_path, &index.to_string()), object);
                }
            }
        }
    }
}

fn read_tree(content: &str) -> Result<Option<XmlNode>, CodecError> {
    let mut reader = Reader::from_str(content);
    reader.trim_text(true);

    let mut stack: Vec<XmlNode> = Vec::new();
    let mut root: Option<XmlNode> = None;
    let error_here = |reader: &Reader<&[u8]>, message: String| {
        CodecError::at_offset(message, content, reader.buffer_position())
    };

    loop {
        match reader.read_event() {
            Ok(Event::Start(start)) => {
                let node = open_node(&start).map_err(|m| error_here(&reader, m))?;
                stack.push(node);
            }
            Ok(Event::Empty(start)) => {
                let node = open_node(&start).map_err(|m| error_here(&reader, m))?;
                attach(node, &mut stack, &mut root).map_err(|m| error_here(&reader, m))?;
            }
            Ok(Event::Text(text)) => {
                let text = text.unescape().map_err(|e| error_here(&reader, e.to_string()))?;
                match stack.last_mut() {
                    Some(top) => top.text.push_str(&text),
                    None if text.trim().is_empty() => {}
                    None => return Err(error_here(&reader, "text outside the root element".to_string())),
                }
            }
            Ok(Event::CData(data)) => {
                let data = data.into_inner();
                let text = String::from_utf8_lossy(&data);
                if let Some(top) = stack.last_mut() {
                    top.text.push_str(&text);
                }
            }
            Ok(Event::End(_)) => {
                let node = stack
                    .pop()
                    .ok_or_else(|| error_here(&reader, "closing tag without opening tag".to_string()))?;
                attach(node, &mut stack, &mut root).map_err(|m| error_here(&reader, m))?;
            }
            Ok(Event::Eof) => break,
            Ok(_) => {}
            Err(e) => return Err(error_here(&reader, e.to_string())),
        }
    }

    if let Some(open) = stack.last() {
        return Err(error_here(&reader, format!("unclosed element <{}>", open.name)));
    }
    Ok(root)
}

fn open_node(start: &BytesStart<'_>) -> Result<XmlNode, String> {
    let mut node = XmlNode {
        name: String::from_utf8_lossy(start.name().as_ref()).into_owned(),
        ..XmlNode::default()
    };
    for attribute in start.attributes() {
        let attribute = attribute.map_err(|e| e.to_string())?;
        let key = String::from_utf8_lossy(attribute.key.as_ref()).into_owned();
        let value = attribute.unescape_value().map_err(|e| e.to_string())?.into_owned();
        node.attributes.push((key, value));
    }
    Ok(node)
}

fn attach(node: XmlNode, stack: &mut [XmlNode], root: &mut Option<XmlNode>) -> Result<(), String> {
    if let Some(parent) = stack.last_mut() {
        parent.children.push(node);
        return Ok(());
    }
    if let Some(existing) = root {
        return Err(format!(
            "second root element <{}> after <{}>",
            node.name, existing.name
        ));
    }
    *root = Some(node);
    Ok(())
}

fn scalar_text(value: &JsonValue) -> Option<String> {
    match value {
        JsonValue::Null => Some(String::new()),
        JsonValue::String(s) => Some(s.clone()),
        JsonValue::Bool(_) | JsonValue::Number(_) => Some(value.to_string()),
        JsonValue::Array(_) | JsonValue::Object(_) => None,
    }
}

fn indent(out: &mut String, depth: usize) {
    for _ in 0..depth {
        out.push_str("  ");
    }
}

fn write_element(out: &mut String, name: &str, value: &JsonValue, depth: usize) -> Result<(), CodecError> {
    match value {
        JsonValue::Array(items) => {
            for item in items {
                if item.is_array() {
                    return Err(CodecError::new(format!("nested list under <{name}> has no XML form")));
                }
                write_element(out, name, item, depth)?;
            }
        }
        JsonValue::Object(map) => {
            indent(out, depth);
            out.push('<');
            out.push_str(name);

            let mut text = None;
            let mut children = Vec::new();
            for (key, child) in map {
                if let Some(attribute) = key.strip_prefix(ATTR_PREFIX) {
                    let raw = scalar_text(child).ok_or_else(|| {
                        CodecError::new(format!("attribute '{attribute}' of <{name}> must be a scalar"))
                    })?;
                    out.push_str(&format!(" {attribute}=\"{}\"", escape(raw.as_str())));
                } else if key == TEXT_KEY {
                    text = scalar_text(child);
                } else {
                    children.push((key, child));
                }
            }

            match (text, children.is_empty()) {
                (None, true) => out.push_str("/>\n"),
                (Some(text), true) => {
                    out.push('>');
                    out.push_str(&escape(text.as_str()));
                    out.push_str(&format!("</{name}>\n"));
                }
                (text, false) => {
                    out.push_str(">\n");
                    if let Some(text) = text {
                        indent(out, depth + 1);
                        out.push_str(&escape(text.as_str()));
                        out.push('\n');
                    }
                    for (key, child) in children {
                        write_element(out, key, child, depth + 1)?;
                    }
                    indent(out, depth);
                    out.push_str(&format!("</{name}>\n"));
                }
            }
        }
        scalar => {
            let text = scalar_text(scalar).unwrap_or_default();
            indent(out, depth);
            out.push_str(&format!("<{name}>{}</{name}>\n", escape(text.as_str())));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const SITE: &str = r#"<?xml version="1.0"?>
<!-- hadoop style -->
<configuration>
  <property>
    <name>dfs.replication</name>
    <value>3</value>
  </property>
  <property>
    <name>dfs.blocksize</name>
    <value>134217728</value>
  </property>
  <server port="8080" tls="on">primary</server>
  <host>a</host>
  <host>b</host>
  <motd><![CDATA[a < b]]></motd>
</configuration>
"#;

    fn parse(content: &str) -> ConfigObject {
        XmlCodec.parse(content, &FormatOptions::default()).unwrap()
    }

    #[test]
    fn elements_flatten_under_root() {
        let obj = parse(SITE);
        assert_eq!(obj.get("configuration.property.0.name"), Some(&ConfigValue::from("dfs.replication")));
        assert_eq!(obj.get("configuration.property.1.value"), Some(&ConfigValue::from("134217728")));
        assert_eq!(obj.get("configuration.server.@port"), Some(&ConfigValue::from("8080")));
        assert_eq!(obj.get("configuration.server.#text"), Some(&ConfigValue::from("primary")));
        assert_eq!(obj.get("configuration.host"), Some(&ConfigValue::from(vec!["a", "b"])));
        assert_eq!(obj.get("configuration.motd"), Some(&ConfigValue::from("a < b")));
    }

    #[test]
    fn empty_document_is_empty_object() {
        assert!(parse("").is_empty());
        assert!(parse("<?xml version=\"1.0\"?>\n").is_empty());
    }

    #[test]
    fn second_root_is_an_error() {
        let err = XmlCodec.parse("<a>1</a>\n<b>2</b>\n", &FormatOptions::default()).unwrap_err();
        assert!(err.message.contains("second root"));
        assert_eq!(err.line, Some(2));
    }

    #[test]
    fn unclosed_element_is_an_error() {
        let err = XmlCodec.parse("<a>\n  <b>1</b>\n", &FormatOptions::default()).unwrap_err();
        assert!(err.message.contains("unclosed element <a>"));
    }

    #[test]
    fn mismatched_end_tag_is_an_error() {
        assert!(XmlCodec.parse("<a><b>1</c></a>", &FormatOptions::default()).is_err());
    }

    #[test]
    fn serialize_round_trips() {
        let obj = parse(SITE);
        let text = XmlCodec.serialize(&obj, &FormatOptions::default()).unwrap();
        assert!(text.starts_with("<?xml"));
        assert!(text.contains("<server port=\"8080\" tls=\"on\">primary</server>"));
        assert_eq!(parse(&text), obj);
    }

    #[test]
    fn serialize_needs_single_root() {
        let mut obj = ConfigObject::new();
        obj.set("a", "1");
        obj.set("b", "2");
        assert!(XmlCodec.serialize(&obj, &FormatOptions::default()).is_err());
    }
}
