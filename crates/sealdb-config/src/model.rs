// SPDX-FileCopyrightText: 2026 SealDB Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration model structs.
//!
//! All structs use `#[serde(deny_unknown_fields)]` so a misspelled key fails
//! at startup instead of silently falling back to a default.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Top-level SealDB configuration.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct SealdbConfig {
    /// Database file, schema version and encryption settings.
    #[serde(default)]
    pub database: DatabaseConfig,

    /// Log output settings.
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Settings for the managed database file.
#[derive(Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct DatabaseConfig {
    /// Path of the database file. Created on first open.
    #[serde(default = "default_database_path")]
    pub path: String,

    /// Schema version the application expects. Must be at least 1.
    #[serde(default = "default_version")]
    pub version: i32,

    /// SQLCipher password. `None` or an empty string disables encryption.
    #[serde(default)]
    pub password: Option<String>,

    /// Whether queries may be cancelled through cancellation hooks.
    #[serde(default = "default_true")]
    pub cancel_queries_enabled: bool,

    /// Switch the journal to WAL after opening.
    #[serde(default = "default_true")]
    pub wal_mode: bool,

    /// Optional TOML file with per-entity table configuration.
    #[serde(default)]
    pub table_config_file: Option<String>,

    /// SQL script executed when the database is created.
    #[serde(default)]
    pub create_script: Option<String>,

    /// Directory holding `<version>.sql` upgrade scripts.
    #[serde(default)]
    pub upgrade_dir: Option<String>,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: default_database_path(),
            version: default_version(),
            password: None,
            cancel_queries_enabled: true,
            wal_mode: true,
            table_config_file: None,
            create_script: None,
            upgrade_dir: None,
        }
    }
}

impl fmt::Debug for DatabaseConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DatabaseConfig")
            .field("path", &self.path)
            .field("version", &self.version)
            .field("password", &self.password.as_ref().map(|_| "[REDACTED]"))
            .field("cancel_queries_enabled", &self.cancel_queries_enabled)
            .field("wal_mode", &self.wal_mode)
            .field("table_config_file", &self.table_config_file)
            .field("create_script", &self.create_script)
            .field("upgrade_dir", &self.upgrade_dir)
            .finish()
    }
}

fn default_database_path() -> String {
    "sealdb.db".to_string()
}

fn default_version() -> i32 {
    1
}

fn default_true() -> bool {
    true
}

/// Log output configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct LoggingConfig {
    /// Logging level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}
