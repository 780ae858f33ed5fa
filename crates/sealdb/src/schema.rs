// SPDX-FileCopyrightText: 2026 SealDB Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Schema callbacks driven by SQL scripts on disk.
//!
//! `create_script` runs when the database is created. Upgrading from
//! version `n` to `m` runs `<upgrade_dir>/<v>.sql` for every `v` in
//! `n+1..=m`; a missing step file is skipped.

use std::path::{Path, PathBuf};

use sealdb_config::model::DatabaseConfig;
use sealdb_core::{BoxError, SealError};
use sealdb_storage::{ConnectionSource, SchemaCallbacks};
use tracing::{debug, info};

#[derive(Debug, Default, Clone)]
pub struct ScriptSchema {
    create_script: Option<PathBuf>,
    upgrade_dir: Option<PathBuf>,
}

impl ScriptSchema {
    pub fn from_config(config: &DatabaseConfig) -> Self {
        Self {
            create_script: config.create_script.as_ref().map(PathBuf::from),
            upgrade_dir: config.upgrade_dir.as_ref().map(PathBuf::from),
        }
    }

    fn run_script(source: &ConnectionSource, path: &Path) -> Result<(), BoxError> {
        let sql = std::fs::read_to_string(path)
            .map_err(|e| SealError::resource_open(path.display().to_string(), e))?;
        source.read_write_connection("schema")?.execute_batch(&sql)?;
        info!(script = %path.display(), "applied schema script");
        Ok(())
    }
}

impl SchemaCallbacks for ScriptSchema {
    fn on_create(&self, source: &ConnectionSource) -> Result<(), BoxError> {
        match &self.create_script {
            Some(script) => Self::run_script(source, script),
            None => {
                debug!("no create script configured");
                Ok(())
            }
        }
    }

    fn on_upgrade(
        &self,
        source: &ConnectionSource,
        old_version: i32,
        new_version: i32,
    ) -> Result<(), BoxError> {
        let Some(dir) = &self.upgrade_dir else {
            return Err(Box::new(SealError::Unsupported(format!(
                "no upgrade_dir configured to upgrade from version {old_version} to {new_version}"
            ))));
        };
        for version in old_version + 1..=new_version {
            let step = dir.join(format!("{version}.sql"));
            if step.is_file() {
                Self::run_script(source, &step)?;
            } else {
                debug!(version, "no upgrade script for version");
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sealdb_storage::{HelperOptions, OpenHelper};

    fn table_exists(helper: &OpenHelper, table: &str) -> bool {
        helper
            .connection_source()
            .read_only_connection(table)
            .unwrap()
            .is_table_exists(table)
            .unwrap()
    }

    #[test]
    fn create_then_upgrade_from_scripts() {
        let dir = tempfile::tempdir().unwrap();
        let create = dir.path().join("create.sql");
        std::fs::write(&create, "CREATE TABLE one (id INTEGER PRIMARY KEY);").unwrap();
        let upgrades = dir.path().join("upgrades");
        std::fs::create_dir(&upgrades).unwrap();
        std::fs::write(upgrades.join("2.sql"), "CREATE TABLE two (id INTEGER);").unwrap();
        std::fs::write(upgrades.join("4.sql"), "CREATE TABLE four (id INTEGER);").unwrap();

        let schema = ScriptSchema {
            create_script: Some(create),
            upgrade_dir: Some(upgrades),
        };
        let db_path = dir.path().join("app.db");

        let helper = OpenHelper::new(HelperOptions::new(&db_path, 1), schema.clone()).unwrap();
        assert!(table_exists(&helper, "one"));
        assert!(!table_exists(&helper, "two"));
        helper.close().unwrap();

        let helper = OpenHelper::new(HelperOptions::new(&db_path, 4), schema).unwrap();
        assert!(table_exists(&helper, "two"));
        assert!(table_exists(&helper, "four"));
        assert_eq!(helper.writable_database().unwrap().user_version().unwrap(), 4);
    }

    #[test]
    fn upgrade_without_dir_is_unsupported() {
        let dir = tempfile::tempdir().unwrap();
        let db_path = dir.path().join("app.db");
        let helper = OpenHelper::new(HelperOptions::new(&db_path, 1), ScriptSchema::default()).unwrap();
        helper.writable_database().unwrap();
        helper.close().unwrap();

        let helper = OpenHelper::new(HelperOptions::new(&db_path, 2), ScriptSchema::default()).unwrap();
        let err = helper.writable_database().unwrap_err();
        assert!(matches!(err, SealError::Unsupported(_)), "got {err:?}");
    }

    #[test]
    fn missing_create_script_fails_open() {
        let dir = tempfile::tempdir().unwrap();
        let schema = ScriptSchema {
            create_script: Some(dir.path().join("absent.sql")),
            upgrade_dir: None,
        };
        let helper = OpenHelper::new(HelperOptions::new(dir.path().join("app.db"), 1), schema).unwrap();
        let err = helper.writable_database().unwrap_err();
        assert!(matches!(err, SealError::ResourceOpen { .. }), "got {err:?}");
    }
}
