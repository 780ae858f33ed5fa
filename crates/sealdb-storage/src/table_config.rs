// SPDX-FileCopyrightText: 2026 SealDB Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Per-entity table configuration, loaded before the first DAO is built.
//!
//! The file is TOML:
//!
//! ```toml
//! [[table]]
//! entity = "Account"
//! table_name = "accounts"
//!
//! [[table.field]]
//! name = "id"
//! generated_id = true
//!
//! [[table.field]]
//! name = "display_name"
//! column = "name"
//! can_be_null = false
//! ```

use std::collections::{HashMap, HashSet};
use std::fs::File;
use std::io::Read;
use std::path::Path;
use std::sync::{OnceLock, PoisonError, RwLock};

use sealdb_core::SealError;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Table mapping for one entity.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct TableConfig {
    pub entity: String,
    pub table_name: String,
    #[serde(default, rename = "field")]
    pub fields: Vec<FieldConfig>,
}

impl TableConfig {
    /// The identifying field, if any.
    pub fn id_field(&self) -> Option<&FieldConfig> {
        self.fields.iter().find(|f| f.id || f.generated_id)
    }

    pub fn field(&self, name: &str) -> Option<&FieldConfig> {
        self.fields.iter().find(|f| f.name == name)
    }
}

/// Column mapping for one entity field.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct FieldConfig {
    pub name: String,
    /// Column name; defaults to the field name.
    #[serde(default)]
    pub column: Option<String>,
    #[serde(default)]
    pub id: bool,
    #[serde(default)]
    pub generated_id: bool,
    #[serde(default = "default_can_be_null")]
    pub can_be_null: bool,
    #[serde(default)]
    pub unique: bool,
    #[serde(default)]
    pub index: bool,
}

impl FieldConfig {
    pub fn column_name(&self) -> &str {
        self.column.as_deref().unwrap_or(&self.name)
    }
}

fn default_can_be_null() -> bool {
    true
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct TableConfigFile {
    #[serde(default, rename = "table")]
    tables: Vec<TableConfig>,
}

/// Open a table configuration file.
pub fn open_table_config_file(path: &Path) -> Result<File, SealError> {
    File::open(path).map_err(|e| SealError::resource_open(path.display().to_string(), e))
}

/// Read and parse table configurations from a stream.
pub fn load_table_configs(mut reader: impl Read) -> Result<Vec<TableConfig>, SealError> {
    let mut content = String::new();
    reader
        .read_to_string(&mut content)
        .map_err(|e| SealError::ConfigLoad {
            message: "could not read table configuration".into(),
            source: Some(Box::new(e)),
        })?;
    parse_table_configs(&content)
}

/// Parse and check table configurations.
pub fn parse_table_configs(content: &str) -> Result<Vec<TableConfig>, SealError> {
    let file: TableConfigFile = toml::from_str(content).map_err(|e| SealError::ConfigLoad {
        message: "malformed table configuration".into(),
        source: Some(Box::new(e)),
    })?;

    let mut entities = HashSet::new();
    for table in &file.tables {
        if table.entity.trim().is_empty() || table.table_name.trim().is_empty() {
            return Err(config_load(format!(
                "table `{}` needs both entity and table_name",
                table.table_name
            )));
        }
        if !entities.insert(table.entity.as_str()) {
            return Err(config_load(format!(
                "entity `{}` is configured twice",
                table.entity
            )));
        }
        let ids = table.fields.iter().filter(|f| f.id || f.generated_id).count();
        if ids > 1 {
            return Err(config_load(format!(
                "entity `{}` declares {ids} id fields",
                table.entity
            )));
        }
    }
    Ok(file.tables)
}

fn config_load(message: String) -> SealError {
    SealError::ConfigLoad {
        message,
        source: None,
    }
}

/// Process-wide cache of table configurations keyed by entity name.
#[derive(Debug, Default)]
pub struct TableConfigCache {
    configs: RwLock<HashMap<String, TableConfig>>,
}

impl TableConfigCache {
    pub fn global() -> &'static TableConfigCache {
        static CACHE: OnceLock<TableConfigCache> = OnceLock::new();
        CACHE.get_or_init(TableConfigCache::default)
    }

    /// Add configurations, replacing existing entries for the same entity.
    pub fn add_all(&self, configs: Vec<TableConfig>) {
        let mut map = self.configs.write().unwrap_or_else(PoisonError::into_inner);
        for config in configs {
            debug!(entity = %config.entity, table = %config.table_name, "cached table config");
            map.insert(config.entity.clone(), config);
        }
    }

    pub fn get(&self, entity: &str) -> Option<TableConfig> {
        self.configs
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(entity)
            .cloned()
    }

    pub fn len(&self) -> usize {
        self.configs.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&self) {
        self.configs
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }
}
