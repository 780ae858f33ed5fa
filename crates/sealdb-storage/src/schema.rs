// SPDX-FileCopyrightText: 2026 SealDB Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Application schema callbacks.

use sealdb_core::{BoxError, SealError};

use crate::source::ConnectionSource;

/// What to do when the database is created, upgraded, downgraded or opened.
///
/// Callbacks receive the [`ConnectionSource`], never the raw handle. Always
/// obtain connections through it: inside a callback it returns the
/// bootstrap connection, while going through the helper again would try to
/// re-open the database being initialised.
///
/// Returning a boxed [`SealError`] passes it through unchanged; any other
/// error is wrapped in [`SealError::Callback`].
pub trait SchemaCallbacks: Send + Sync {
    /// Create tables and load initial data.
    fn on_create(&self, source: &ConnectionSource) -> Result<(), BoxError>;

    /// Migrate from `old_version` to `new_version`.
    fn on_upgrade(
        &self,
        source: &ConnectionSource,
        old_version: i32,
        new_version: i32,
    ) -> Result<(), BoxError>;

    /// Refuses by default.
    fn on_downgrade(
        &self,
        _source: &ConnectionSource,
        old_version: i32,
        new_version: i32,
    ) -> Result<(), BoxError> {
        Err(Box::new(SealError::State(format!(
            "cannot downgrade database from version {old_version} to {new_version}"
        ))))
    }

    /// Runs after every successful open, once any schema work committed.
    fn on_open(&self, _source: &ConnectionSource) -> Result<(), BoxError> {
        Ok(())
    }
}
