// SPDX-FileCopyrightText: 2026 SealDB Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration loader using Figment for layered config merging.
//!
//! Lookup order: `./sealdb.toml` > `~/.config/sealdb/sealdb.toml` > `/etc/sealdb/sealdb.toml`,
//! with `SEALDB_` environment variables overriding all files.

#![allow(clippy::result_large_err)] // figment::Error is external

use std::path::Path;

use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};

use crate::model::SealdbConfig;

/// Load configuration from the standard hierarchy with env var overrides.
pub fn load_config() -> Result<SealdbConfig, figment::Error> {
    build_figment().extract()
}

/// Load configuration from a TOML string only (no file lookup, no env).
pub fn load_config_from_str(toml_content: &str) -> Result<SealdbConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(SealdbConfig::default()))
        .merge(Toml::string(toml_content))
        .extract()
}

/// Load configuration from one file path with env var overrides.
pub fn load_config_from_path(path: &Path) -> Result<SealdbConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(SealdbConfig::default()))
        .merge(Toml::file(path))
        .merge(env_provider())
        .extract()
}

/// The Figment used by [`load_config`], before extraction.
pub fn build_figment() -> Figment {
    Figment::new()
        .merge(Serialized::defaults(SealdbConfig::default()))
        .merge(Toml::file("/etc/sealdb/sealdb.toml"))
        .merge(Toml::file(user_config_path().unwrap_or_default()))
        .merge(Toml::file("sealdb.toml"))
        .merge(env_provider())
}

/// `~/.config/sealdb/sealdb.toml`, if a config dir is known.
pub fn user_config_path() -> Option<std::path::PathBuf> {
    dirs::config_dir().map(|d| d.join("sealdb/sealdb.toml"))
}

/// Map `SEALDB_DATABASE_TABLE_CONFIG_FILE` to `database.table_config_file`.
///
/// Only the section prefix is turned into a dot; `Env::split("_")` would
/// break keys that contain underscores.
fn env_provider() -> Env {
    Env::prefixed("SEALDB_").map(|key| {
        key.as_str()
            .replacen("database_", "database.", 1)
            .replacen("logging_", "logging.", 1)
            .into()
    })
}
