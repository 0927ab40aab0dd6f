use std::collections::BTreeMap;

use proptest::prelude::*;
use reconfig_core::{CodecRegistry, ConfigObject, ConfigValue, FormatterConfig};

/// Text without edge whitespace; line formats trim it away
fn plain_text() -> impl Strategy<Value = String> {
    "([a-zA-Z0-9_./-]([a-zA-Z0-9 _./,-]{0,10}[a-zA-Z0-9_./-])?)?"
}

fn typed_value() -> impl Strategy<Value = ConfigValue> {
    prop_oneof![
        any::<i64>().prop_map(ConfigValue::Integer),
        any::<bool>().prop_map(ConfigValue::Bool),
        plain_text().prop_map(ConfigValue::String),
    ]
}

/// Two-level keys so no path is both a leaf and a prefix
fn nested_entries<V: Strategy>(values: V) -> impl Strategy<Value = BTreeMap<String, V::Value>>
where
    V::Value: std::fmt::Debug,
{
    prop::collection::btree_map(
        ("[a-f]", "k[a-z0-9_]{0,6}").prop_map(|(section, key)| format!("s{section}.{key}")),
        values,
        0..8,
    )
}

fn object_of<V: Into<ConfigValue>>(entries: BTreeMap<String, V>) -> ConfigObject {
    entries.into_iter().map(|(k, v)| (k, v.into())).collect()
}

fn assert_round_trip(format: &str, object: &ConfigObject) {
    let codecs = CodecRegistry::with_defaults();
    let formatter = FormatterConfig::new(format);
    let text = codecs
        .serialize("props", &formatter, object)
        .unwrap_or_else(|e| panic!("{format} serialize failed: {e}"));
    let reparsed = codecs
        .parse("props", &formatter, &text)
        .unwrap_or_else(|e| panic!("{format} reparse failed: {e}\n{text}"));
    assert_eq!(&reparsed, object, "{format} output:\n{text}");
}

proptest! {
    #[test]
    fn prop_ini_round_trips(entries in nested_entries(plain_text())) {
        assert_round_trip("ini", &object_of(entries));
    }

    #[test]
    fn prop_properties_round_trips(
        entries in prop::collection::btree_map("[a-z][a-z0-9_.]{0,8}", plain_text(), 0..8)
    ) {
        assert_round_trip("properties", &object_of(entries));
    }

    #[test]
    fn prop_dotenv_round_trips(
        entries in prop::collection::btree_map("[A-Z_][A-Z0-9_]{0,8}", "[a-zA-Z0-9 _#'=./-]{0,12}", 0..8)
    ) {
        assert_round_trip("dotenv", &object_of(entries));
    }

    #[test]
    fn prop_redis_round_trips(
        entries in prop::collection::btree_map("[a-z][a-z-]{0,10}", plain_text(), 0..8)
    ) {
        assert_round_trip("redis", &object_of(entries));
    }

    #[test]
    fn prop_json_round_trips(entries in nested_entries(typed_value())) {
        assert_round_trip("json", &object_of(entries));
    }

    #[test]
    fn prop_yaml_round_trips(entries in nested_entries(typed_value())) {
        assert_round_trip("yaml", &object_of(entries));
    }

    #[test]
    fn prop_toml_round_trips(entries in nested_entries(typed_value())) {
        assert_round_trip("toml", &object_of(entries));
    }

    #[test]
    fn prop_hcl_round_trips(
        entries in nested_entries(prop_oneof![
            (0_i64..1_000_000).prop_map(ConfigValue::Integer),
            any::<bool>().prop_map(ConfigValue::Bool),
            "[a-zA-Z0-9 _.-]{0,12}".prop_map(ConfigValue::String),
        ])
    ) {
        assert_round_trip("hcl", &object_of(entries));
    }

    #[test]
    fn prop_xml_round_trips(entries in nested_entries(plain_text())) {
        let rooted: BTreeMap<String, String> = entries
            .into_iter()
            .map(|(k, v)| (format!("config.{k}"), v))
            .collect();
        assert_round_trip("xml", &object_of(rooted));
    }

    #[test]
    fn prop_parse_never_panics(content in "\\PC{0,64}") {
        let codecs = CodecRegistry::with_defaults();
        for name in codecs.names() {
            let _ = codecs.parse("fuzz", &FormatterConfig::new(name), &content);
        }
    }
}
