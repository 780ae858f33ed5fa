// SPDX-FileCopyrightText: 2026 SealDB Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Integration tests for the SealDB configuration system.

use sealdb_config::diagnostic::ConfigError;
use sealdb_config::model::SealdbConfig;
use sealdb_config::{load_and_validate_path, load_and_validate_str, load_config_from_str};

#[test]
fn valid_toml_deserializes() {
    let toml = r#"
[database]
path = "/tmp/app.db"
version = 4
password = "secret"
cancel_queries_enabled = false
wal_mode = false
table_config_file = "tables.toml"
create_script = "schema.sql"
upgrade_dir = "migrations"

[logging]
log_level = "debug"
"#;

    let config = load_config_from_str(toml).expect("valid TOML should deserialize");
    assert_eq!(config.database.path, "/tmp/app.db");
    assert_eq!(config.database.version, 4);
    assert_eq!(config.database.password.as_deref(), Some("secret"));
    assert!(!config.database.cancel_queries_enabled);
    assert!(!config.database.wal_mode);
    assert_eq!(config.database.table_config_file.as_deref(), Some("tables.toml"));
    assert_eq!(config.database.create_script.as_deref(), Some("schema.sql"));
    assert_eq!(config.database.upgrade_dir.as_deref(), Some("migrations"));
    assert_eq!(config.logging.log_level, "debug");
}

#[test]
fn empty_toml_uses_defaults() {
    let config = load_config_from_str("").expect("empty TOML should use defaults");
    assert_eq!(config.database.path, "sealdb.db");
    assert_eq!(config.database.version, 1);
    assert!(config.database.password.is_none());
    assert!(config.database.cancel_queries_enabled);
    assert!(config.database.wal_mode);
    assert!(config.database.table_config_file.is_none());
    assert_eq!(config.logging.log_level, "info");
}

#[test]
fn unknown_key_gets_suggestion() {
    let toml = r#"
[database]
pasword = "x"
"#;

    let errors = load_and_validate_str(toml).expect_err("typo should be rejected");
    assert_eq!(errors.len(), 1);
    match &errors[0] {
        ConfigError::UnknownKey {
            key, suggestion, ..
        } => {
            assert_eq!(key, "pasword");
            assert_eq!(suggestion.as_deref(), Some("password"));
        }
        other => panic!("expected UnknownKey, got {other:?}"),
    }
}

#[test]
fn wrong_type_is_reported() {
    let toml = r#"
[database]
version = "two"
"#;

    let errors = load_and_validate_str(toml).expect_err("string version should be rejected");
    assert!(
        matches!(errors[0], ConfigError::InvalidType { .. }),
        "got {:?}",
        errors[0]
    );
}

#[test]
fn validation_runs_after_parsing() {
    let toml = r#"
[database]
version = 0
"#;

    let errors = load_and_validate_str(toml).expect_err("version 0 should fail validation");
    assert!(matches!(errors[0], ConfigError::Validation { .. }));
}

#[test]
fn dotted_override_merges_over_file() {
    use figment::{
        providers::{Format, Serialized, Toml},
        Figment,
    };

    let config: SealdbConfig = Figment::new()
        .merge(Serialized::defaults(SealdbConfig::default()))
        .merge(Toml::string("[database]\npath = \"from-file.db\"\n"))
        .merge(("database.table_config_file", "from-env.toml"))
        .extract()
        .expect("override should merge");

    assert_eq!(config.database.path, "from-file.db");
    assert_eq!(
        config.database.table_config_file.as_deref(),
        Some("from-env.toml")
    );
}

#[test]
fn loads_from_explicit_path() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("sealdb.toml");
    std::fs::write(&path, "[database]\nversion = 3\n").unwrap();

    let config = load_and_validate_path(&path).expect("file config should load");
    assert_eq!(config.database.version, 3);
}
