// SPDX-FileCopyrightText: 2026 SealDB Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `sealdb status` command implementation.
//!
//! Opens the configured database (running create/upgrade scripts when the
//! stored version differs) and reports version, encryption and tables.

use rusqlite::types::Value;
use sealdb_config::model::SealdbConfig;
use sealdb_core::{HealthStatus, SealError};
use sealdb_storage::CipherExtension;
use serde::Serialize;

use crate::open_helper;

/// Structured status output for `--json` mode.
#[derive(Debug, Serialize)]
pub struct StatusReport {
    pub path: String,
    pub version: i32,
    pub encrypted: bool,
    pub cipher_version: Option<String>,
    pub cancellation: bool,
    pub health: String,
    pub tables: Vec<String>,
}

/// Open the database and gather its state, closing it afterwards.
pub fn collect_status(config: &SealdbConfig) -> Result<StatusReport, SealError> {
    let helper = open_helper(config)?;
    let db = helper.writable_database()?;
    let version = db.user_version()?;

    let rows = helper
        .connection_source()
        .read_only_connection("sqlite_master")?
        .raw_query(
            "SELECT name FROM sqlite_master WHERE type = 'table' ORDER BY name",
            &[],
            None,
        )?;
    let tables = rows
        .rows
        .iter()
        .filter_map(|row| match row.first() {
            Some(Value::Text(name)) => Some(name.clone()),
            _ => None,
        })
        .collect();

    let health = match helper.health_check() {
        HealthStatus::Healthy => "healthy".to_string(),
        HealthStatus::Degraded(reason) => format!("degraded: {reason}"),
        HealthStatus::Unhealthy(reason) => format!("unhealthy: {reason}"),
    };

    let report = StatusReport {
        path: helper.database_path().display().to_string(),
        version,
        encrypted: config
            .database
            .password
            .as_deref()
            .is_some_and(|p| !p.is_empty()),
        cipher_version: CipherExtension::load().map(str::to_string),
        cancellation: helper.compatibility().supports_cancellation(),
        health,
        tables,
    };
    helper.close()?;
    Ok(report)
}

/// Run the `sealdb status` command.
pub fn run_status(config: &SealdbConfig, json: bool) -> Result<(), SealError> {
    let report = collect_status(config)?;
    if json {
        let out = serde_json::to_string_pretty(&report).map_err(SealError::storage)?;
        println!("{out}");
        return Ok(());
    }

    println!("database:     {}", report.path);
    println!("version:      {}", report.version);
    println!(
        "encryption:   {}",
        match (report.encrypted, report.cipher_version.as_deref()) {
            (true, Some(v)) => format!("on (SQLCipher {v})"),
            (true, None) => "on".to_string(),
            (false, _) => "off".to_string(),
        }
    );
    println!(
        "cancellation: {}",
        if report.cancellation { "enabled" } else { "disabled" }
    );
    println!("health:       {}", report.health);
    if report.tables.is_empty() {
        println!("tables:       (none)");
    } else {
        println!("tables:       {}", report.tables.join(", "));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config_in(dir: &std::path::Path, password: Option<&str>) -> SealdbConfig {
        let create = dir.join("create.sql");
        std::fs::write(&create, "CREATE TABLE notes (id INTEGER PRIMARY KEY, body TEXT);").unwrap();
        let mut config = SealdbConfig::default();
        config.database.path = dir.join("status.db").display().to_string();
        config.database.version = 3;
        config.database.password = password.map(str::to_string);
        config.database.create_script = Some(create.display().to_string());
        config
    }

    #[test]
    fn status_reports_created_database() {
        let dir = tempfile::tempdir().unwrap();
        let report = collect_status(&config_in(dir.path(), Some("hunter2"))).unwrap();
        assert_eq!(report.version, 3);
        assert!(report.encrypted);
        assert_eq!(report.health, "healthy");
        assert_eq!(report.tables, vec!["notes".to_string()]);
    }

    #[test]
    fn status_serializes_to_json() {
        let dir = tempfile::tempdir().unwrap();
        let report = collect_status(&config_in(dir.path(), None)).unwrap();
        let json: serde_json::Value = serde_json::to_value(&report).unwrap();
        assert_eq!(json["version"], 3);
        assert_eq!(json["encrypted"], false);
        assert_eq!(json["tables"][0], "notes");
    }
}
