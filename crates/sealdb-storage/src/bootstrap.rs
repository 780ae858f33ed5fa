// SPDX-FileCopyrightText: 2026 SealDB Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Scoped ownership of the special slot during schema callbacks.
//!
//! [`BootstrapGuard::enter`] wraps the raw database in a special connection
//! and saves it on the source, unless the calling thread already has one
//! (nested callback). Dropping the guard clears the slot if, and only if,
//! this guard saved it. Drop also runs on error returns and panics.

use std::sync::Arc;

use sealdb_core::{BootstrapPhase, SealError};
use tracing::debug;

use crate::cancel::ApiCompatibility;
use crate::connection::DatabaseConnection;
use crate::database::Database;
use crate::source::ConnectionSource;

#[must_use = "the special slot is cleared when the guard is dropped"]
pub struct BootstrapGuard<'a> {
    source: &'a ConnectionSource,
    owned: Option<DatabaseConnection>,
    phase: BootstrapPhase,
}

impl<'a> BootstrapGuard<'a> {
    pub fn enter(
        source: &'a ConnectionSource,
        db: &Arc<Database>,
        compat: ApiCompatibility,
        phase: BootstrapPhase,
    ) -> Result<Self, SealError> {
        if source.special_connection().is_some() {
            debug!(%phase, "reusing special connection of enclosing bootstrap");
            return Ok(Self {
                source,
                owned: None,
                phase,
            });
        }

        let conn = DatabaseConnection::new(db.clone(), true, compat);
        source
            .save_special_connection(conn.clone())
            .map_err(|e| SealError::State(format!("could not save special connection: {e}")))?;
        debug!(%phase, "entered bootstrap");
        Ok(Self {
            source,
            owned: Some(conn),
            phase,
        })
    }

    /// True if this guard saved the special connection and will clear it.
    pub fn owns_slot(&self) -> bool {
        self.owned.is_some()
    }
}

impl Drop for BootstrapGuard<'_> {
    fn drop(&mut self) {
        if let Some(conn) = self.owned.take() {
            self.source.clear_special_connection(&conn);
            debug!(phase = %self.phase, "left bootstrap");
        }
    }
}

/// Run `f` with the special slot held for the duration of the call.
pub fn run_bootstrap<R>(
    source: &ConnectionSource,
    db: &Arc<Database>,
    compat: ApiCompatibility,
    phase: BootstrapPhase,
    f: impl FnOnce(&ConnectionSource) -> Result<R, SealError>,
) -> Result<R, SealError> {
    let _guard = BootstrapGuard::enter(source, db, compat, phase)?;
    f(source)
}
