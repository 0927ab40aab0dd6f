use pretty_assertions::assert_eq;
use proptest::prelude::*;
use reconfig_core::{CodecRegistry, ConfigValue};
use reconfig_engine::{
    create_config_patch, has_excluded_changes, is_update_dynamic, merge_and_validate, to_visualized_params, validate,
    ConfigConstraint, ParamPair, ReconfigureError, Reconfigurer, UpdateType, UpdatedParam, ViolationKind,
};
use reconfig_test_utils::{keys, mysql_bundle, mysql_constraint, mysql_formatter, raw, MY_CNF, MY_CNF_BASE};

#[test]
fn test_single_key_update() {
    let codecs = CodecRegistry::with_defaults();
    let old = mysql_bundle();
    let new = raw(&[(MY_CNF, &MY_CNF_BASE.replace("max_connections=100", "max_connections=200"))]);

    let (patch, objects) = create_config_patch(&codecs, &old, &new, &mysql_formatter(), &keys(&[MY_CNF]), false).unwrap();

    assert!(patch.is_modify);
    assert!(patch.added_config.is_empty());
    assert!(patch.deleted_config.is_empty());
    let updates = patch.updated_params(MY_CNF).unwrap();
    assert_eq!(updates.len(), 1);
    assert_eq!(
        updates["mysqld.max_connections"],
        UpdatedParam {
            old: ConfigValue::from("100"),
            new: ConfigValue::from("200"),
        }
    );
    assert_eq!(objects[MY_CNF].get("mysqld.max_connections"), Some(&ConfigValue::from("200")));
}

#[test]
fn test_allow_list_excludes_other_files() {
    let codecs = CodecRegistry::with_defaults();
    let old = raw(&[(MY_CNF, MY_CNF_BASE), ("other.cnf", "[client]\nuser=root\n")]);
    let new = raw(&[(MY_CNF, MY_CNF_BASE), ("other.cnf", "[client]\nuser=admin\n")]);
    let allow = keys(&[MY_CNF]);

    let (patch, objects) = create_config_patch(&codecs, &old, &new, &mysql_formatter(), &allow, false).unwrap();

    assert!(!patch.is_modify);
    assert!(patch.changed_files().is_empty());
    assert!(!objects.contains_key("other.cnf"));
    assert!(has_excluded_changes(&old, &new, &allow));
    assert!(!has_excluded_changes(&old, &new, &keys(&[MY_CNF, "other.cnf"])));
}

#[test]
fn test_update_policy_aggregation() {
    let codecs = CodecRegistry::with_defaults();
    let cc = mysql_constraint();
    let old = mysql_bundle();
    let diff = |text: String| {
        create_config_patch(&codecs, &old, &raw(&[(MY_CNF, &text)]), &cc.formatter_config, &keys(&[MY_CNF]), false)
            .unwrap()
            .0
    };

    let dynamic_only = diff(
        MY_CNF_BASE
            .replace("max_connections=100", "max_connections=200")
            .replace("sql_mode=STRICT_TRANS_TABLES", "sql_mode=ANSI"),
    );
    assert!(is_update_dynamic(&cc, &dynamic_only).unwrap());

    let added_dynamic = diff(format!("{MY_CNF_BASE}wait_timeout=60\n"));
    assert!(is_update_dynamic(&cc, &added_dynamic).unwrap());

    let with_static = diff(
        MY_CNF_BASE
            .replace("max_connections=100", "max_connections=200")
            .replace("innodb_buffer_pool_size=128M", "innodb_buffer_pool_size=1G"),
    );
    assert!(!is_update_dynamic(&cc, &with_static).unwrap());

    let mut no_reload = cc.clone();
    no_reload.reload_options = None;
    assert!(!is_update_dynamic(&no_reload, &dynamic_only).unwrap());

    let nothing = diff(MY_CNF_BASE.to_string());
    assert!(is_update_dynamic(&no_reload, &nothing).unwrap());
}

#[test]
fn test_validator_is_pure() {
    let codecs = CodecRegistry::with_defaults();
    let cc = mysql_constraint();
    let candidate = raw(&[(MY_CNF, &MY_CNF_BASE.replace("max_connections=100", "max_connections=0"))]);
    let before = candidate.clone();

    let first = validate(&codecs, &cc, &candidate, None).unwrap();
    let second = validate(&codecs, &cc, &candidate, None).unwrap();

    assert_eq!(candidate, before);
    assert_eq!(first, second);
    assert_eq!(first.len(), 1);
    assert_eq!(first[0].path, "max_connections");
    assert!(matches!(first[0].kind, ViolationKind::OutOfRange { .. }));
}

#[test]
fn test_valid_bundle_has_no_violations() {
    let codecs = CodecRegistry::with_defaults();
    assert!(validate(&codecs, &mysql_constraint(), &mysql_bundle(), None).unwrap().is_empty());
}

#[test]
fn test_out_of_scope_files_do_not_affect_validation_or_merge() {
    let engine = Reconfigurer::new().with_config(reconfig_engine::EngineConfig::default().with_max_file_bytes(256));
    let cc = mysql_constraint();
    let mut bundle = mysql_bundle();
    bundle.insert("blob.lua".to_string(), "x".repeat(1024));
    bundle.insert("broken.cnf".to_string(), "[mysqld\n".to_string());

    let violations = engine.validate(&cc, &bundle, Some(&keys(&[MY_CNF]))).unwrap();
    assert!(violations.is_empty());

    let pairs = [ParamPair::new(MY_CNF).set("max_connections", "300")];
    let merged = engine.merge_and_validate(&bundle, &pairs, &cc).unwrap();
    assert_eq!(merged["blob.lua"], bundle["blob.lua"]);
    assert_eq!(merged["broken.cnf"], bundle["broken.cnf"]);
    assert_ne!(merged[MY_CNF], bundle[MY_CNF]);
}

#[test]
fn test_merge_then_diff_then_visualize() {
    let engine = Reconfigurer::new();
    let cc = mysql_constraint();
    let base = mysql_bundle();
    let pairs = [ParamPair::new(MY_CNF)
        .set("max_connections", "500")
        .set("port", "3307")
        .unset("sql_mode")];

    let merged = engine.merge_and_validate(&base, &pairs, &cc).unwrap();
    let (patch, _) = engine
        .create_config_patch(&base, &merged, &cc.formatter_config, &keys(&[MY_CNF]), false)
        .unwrap();
    let groups = engine.visualize(&patch, &cc.formatter_config).unwrap();

    let summary: Vec<(UpdateType, Vec<&str>)> = groups
        .iter()
        .map(|g| (g.update_type, g.parameters.iter().map(|p| p.key.as_str()).collect()))
        .collect();
    // port is immutable and never reaches the patch
    assert_eq!(
        summary,
        vec![
            (UpdateType::Updated, vec!["max_connections"]),
            (UpdateType::Deleted, vec!["sql_mode"]),
        ]
    );
    assert!(engine.is_update_dynamic(&cc, &patch).unwrap());
    assert_eq!(to_visualized_params(&patch, &cc.formatter_config).unwrap(), groups);
}

#[test]
fn test_merge_and_validate_reports_violations() {
    let codecs = CodecRegistry::with_defaults();
    let pairs = [ParamPair::new(MY_CNF).set("innodb_buffer_pool_size", "lots")];
    let err = merge_and_validate(&codecs, &mysql_bundle(), &pairs, &mysql_constraint()).unwrap_err();
    let ReconfigureError::ValidationFailed(violations) = err else {
        panic!("expected validation failure, got {err:?}");
    };
    assert_eq!(violations.len(), 1);
    assert!(matches!(violations[0].kind, ViolationKind::PatternMismatch { .. }));
}

#[test]
fn test_parse_error_aborts_patch() {
    let codecs = CodecRegistry::with_defaults();
    let cc = ConfigConstraint::new(reconfig_core::FormatterConfig::new("json"));
    let old = raw(&[("a.json", "{\"a\": 1}"), ("b.json", "{\"b\": 1}")]);
    let new = raw(&[("a.json", "{\"a\": 2}"), ("b.json", "{\"b\": ")]);

    let err = create_config_patch(&codecs, &old, &new, &cc.formatter_config, &keys(&["a.json", "b.json"]), false)
        .unwrap_err();
    let ReconfigureError::Parse(parse) = err else {
        panic!("expected parse error, got {err:?}");
    };
    assert_eq!(parse.file, "b.json");
}

fn ini_bundle() -> impl Strategy<Value = String> {
    prop::collection::btree_map("[a-z][a-z0-9_]{0,8}", "[a-zA-Z0-9_./-]{1,12}", 0..10).prop_map(|params| {
        let mut text = String::from("[mysqld]\n");
        for (key, value) in params {
            text.push_str(&format!("{key}={value}\n"));
        }
        text
    })
}

proptest! {
    #[test]
    fn prop_identical_bundles_give_empty_patch(text in ini_bundle(), reformat_only in any::<bool>()) {
        let codecs = CodecRegistry::with_defaults();
        let bundle = raw(&[(MY_CNF, &text)]);
        let (patch, _) = create_config_patch(
            &codecs, &bundle, &bundle, &mysql_formatter(), &keys(&[MY_CNF]), reformat_only,
        ).unwrap();
        prop_assert!(!patch.is_modify);
        prop_assert!(patch.is_empty());
        prop_assert!(patch.reformatted.is_empty());
    }

    #[test]
    fn prop_empty_patch_is_always_dynamic(text in ini_bundle()) {
        let codecs = CodecRegistry::with_defaults();
        let bundle = raw(&[(MY_CNF, &text)]);
        let (patch, _) = create_config_patch(
            &codecs, &bundle, &bundle, &mysql_formatter(), &keys(&[MY_CNF]), false,
        ).unwrap();
        let mut cc = mysql_constraint();
        cc.reload_options = None;
        prop_assert!(is_update_dynamic(&cc, &patch).unwrap());
    }
}
