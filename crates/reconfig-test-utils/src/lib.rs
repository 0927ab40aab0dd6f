//! Testing utilities for the reconfig workspace
//!
//! Shared fixtures for constraints and configuration bundles.

#![allow(missing_docs)]

use indexmap::IndexSet;
use reconfig_core::{FormatterConfig, RawConfig};
use reconfig_engine::{ConfigConstraint, ReloadOptions, UnixSignalTrigger};
use serde_json::json;

pub const MY_CNF: &str = "my.cnf";

pub const MY_CNF_BASE: &str = "\
[mysqld]
port=3306
max_connections=100
innodb_buffer_pool_size=128M
sql_mode=STRICT_TRANS_TABLES
";

pub fn raw(files: &[(&str, &str)]) -> RawConfig {
    files.iter().map(|(name, text)| ((*name).to_string(), (*text).to_string())).collect()
}

pub fn keys(names: &[&str]) -> IndexSet<String> {
    names.iter().map(|name| (*name).to_string()).collect()
}

pub fn mysql_formatter() -> FormatterConfig {
    FormatterConfig::new("ini").with_ini_section("mysqld")
}

pub fn sighup() -> ReloadOptions {
    ReloadOptions {
        unix_signal_trigger: Some(UnixSignalTrigger {
            signal: "SIGHUP".into(),
            process_name: "mysqld".into(),
        }),
        ..ReloadOptions::default()
    }
}

/// MySQL-like constraint: ports and buffer pool are static, connection and
/// sql mode settings dynamic, SIGHUP reload.
pub fn mysql_constraint() -> ConfigConstraint {
    let mut cc = ConfigConstraint::new(mysql_formatter());
    cc.static_parameters = ["port", "innodb_buffer_pool_size"].iter().map(|s| (*s).to_string()).collect();
    cc.dynamic_parameters = ["max_connections", "sql_mode", "wait_timeout"]
        .iter()
        .map(|s| (*s).to_string())
        .collect();
    cc.immutable_parameters.insert("port".into());
    cc.schema = Some(json!({
        "type": "object",
        "properties": {
            "port": {"type": "integer", "minimum": 1, "maximum": 65535},
            "max_connections": {"type": "integer", "minimum": 1, "maximum": 100000},
            "wait_timeout": {"type": "integer", "minimum": 1},
            "innodb_buffer_pool_size": {"type": "string", "pattern": "^[0-9]+[KMG]?$"},
            "sql_mode": {"type": "string"}
        }
    }));
    cc.reload_options = Some(sighup());
    cc
}

pub fn mysql_bundle() -> RawConfig {
    raw(&[(MY_CNF, MY_CNF_BASE)])
}
