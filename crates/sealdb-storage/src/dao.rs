// SPDX-FileCopyrightText: 2026 SealDB Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Per-helper cache of data-access objects.

use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

use sealdb_core::SealError;
use tracing::debug;

use crate::source::ConnectionSource;
use crate::table_config::{TableConfig, TableConfigCache};

/// A data-access object built once per helper and shared afterwards.
pub trait Dao: Send + Sync + Sized + 'static {
    /// Entity name used to look up the cached [`TableConfig`].
    const ENTITY: &'static str;

    /// Build the DAO. `config` is `None` if no table configuration was
    /// loaded for [`Dao::ENTITY`].
    fn create(source: Arc<ConnectionSource>, config: Option<TableConfig>)
        -> Result<Self, SealError>;
}

/// DAO instances keyed by their type.
#[derive(Default)]
pub struct DaoRegistry {
    daos: Mutex<HashMap<TypeId, Arc<dyn Any + Send + Sync>>>,
}

impl DaoRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the cached `D`, building it on first use.
    pub fn get_or_create<D: Dao>(&self, source: &Arc<ConnectionSource>) -> Result<Arc<D>, SealError> {
        let mut daos = self.daos.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(existing) = daos.get(&TypeId::of::<D>()) {
            return existing
                .clone()
                .downcast::<D>()
                .map_err(|_| SealError::State(format!("DAO cache entry for {} has the wrong type", D::ENTITY)));
        }

        let config = TableConfigCache::global().get(D::ENTITY);
        debug!(entity = D::ENTITY, configured = config.is_some(), "creating DAO");
        let dao = Arc::new(D::create(source.clone(), config)?);
        daos.insert(TypeId::of::<D>(), dao.clone());
        Ok(dao)
    }

    pub fn len(&self) -> usize {
        self.daos.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&self) {
        self.daos
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }
}
