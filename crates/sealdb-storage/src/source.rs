// SPDX-FileCopyrightText: 2026 SealDB Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The connection source: one per database file.
//!
//! Besides handing out the cached read-write connection, the source holds
//! the *special slot*: while a schema callback runs, the bootstrap thread's
//! connection requests are routed to the special connection instead of
//! re-entering the open path.

use std::backtrace::Backtrace;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::thread::{self, ThreadId};

use sealdb_core::{HelperState, SealError};
use tracing::{debug, trace, warn};

use crate::cancel::ApiCompatibility;
use crate::connection::DatabaseConnection;
use crate::database::Database;

/// Supplies physical databases to a [`ConnectionSource`].
///
/// The source is passed back in so an implementation can run schema
/// callbacks against it while opening.
pub trait DatabaseProvider: Send + Sync {
    /// Open (or return the cached) writable database.
    fn writable_database(&self, source: &ConnectionSource) -> Result<Arc<Database>, SealError>;

    /// Open (or return the cached) database for reading.
    fn readable_database(&self, source: &ConnectionSource) -> Result<Arc<Database>, SealError>;

    /// Close the physical database if it is open.
    fn close_database(&self) -> Result<(), SealError>;

    /// Cancellation support of the engine behind this provider.
    fn compatibility(&self) -> ApiCompatibility;
}

struct SpecialSlot {
    owner: ThreadId,
    conn: DatabaseConnection,
}

/// Produces and tracks connections for a single database.
pub struct ConnectionSource {
    provider: Arc<dyn DatabaseProvider>,
    special: Mutex<Option<SpecialSlot>>,
    cached: Mutex<Option<DatabaseConnection>>,
    open: AtomicBool,
}

impl std::fmt::Debug for ConnectionSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConnectionSource")
            .field("open", &self.is_open())
            .field("state", &self.state())
            .finish()
    }
}

impl ConnectionSource {
    pub fn new(provider: Arc<dyn DatabaseProvider>) -> Self {
        Self {
            provider,
            special: Mutex::new(None),
            cached: Mutex::new(None),
            open: AtomicBool::new(true),
        }
    }

    pub fn is_open(&self) -> bool {
        self.open.load(Ordering::Acquire)
    }

    /// `Bootstrapping` while any thread owns the special slot.
    pub fn state(&self) -> HelperState {
        if self.special_slot().is_some() {
            HelperState::Bootstrapping
        } else {
            HelperState::Normal
        }
    }

    /// The bootstrap override, if the calling thread owns one.
    pub fn special_connection(&self) -> Option<DatabaseConnection> {
        let me = thread::current().id();
        self.special_slot()
            .as_ref()
            .filter(|slot| slot.owner == me)
            .map(|slot| slot.conn.clone())
    }

    /// Install `conn` as the special connection for the calling thread.
    ///
    /// Fails with [`SealError::State`] if the slot is already taken; only
    /// one bootstrap may be active at a time.
    pub fn save_special_connection(&self, conn: DatabaseConnection) -> Result<(), SealError> {
        let mut slot = self.special_slot();
        if let Some(existing) = slot.as_ref() {
            return Err(SealError::State(format!(
                "special connection already saved by thread {:?}",
                existing.owner
            )));
        }
        let owner = thread::current().id();
        trace!(?owner, "saved special connection");
        *slot = Some(SpecialSlot { owner, conn });
        Ok(())
    }

    /// Clear the slot if it holds `conn`. Returns whether it was cleared.
    pub fn clear_special_connection(&self, conn: &DatabaseConnection) -> bool {
        let mut slot = self.special_slot();
        match slot.as_ref() {
            Some(current) if current.conn.same_as(conn) => {
                *slot = None;
                trace!("cleared special connection");
                true
            }
            Some(_) => {
                warn!("special connection being cleared is not the one that was saved");
                false
            }
            None => false,
        }
    }

    /// A connection able to write.
    ///
    /// Inside a schema callback this is the special connection; otherwise
    /// the cached connection to the provider's writable database.
    pub fn read_write_connection(&self, table: &str) -> Result<DatabaseConnection, SealError> {
        self.report_if_closed(table);

        if let Some(special) = self.special_connection() {
            trace!(table, "using special connection");
            return Ok(special);
        }

        if let Some(conn) = self.cached().as_ref()
            && !conn.is_closed()
            && !conn.is_read_only()
        {
            return Ok(conn.clone());
        }

        let db = self.provider.writable_database(self)?;
        Ok(self.cache(db))
    }

    /// A connection for reading. Falls back to a read-only database when the
    /// file cannot be opened for writing.
    pub fn read_only_connection(&self, table: &str) -> Result<DatabaseConnection, SealError> {
        self.report_if_closed(table);

        if let Some(special) = self.special_connection() {
            return Ok(special);
        }

        if let Some(conn) = self.cached().as_ref()
            && !conn.is_closed()
        {
            return Ok(conn.clone());
        }

        let db = self.provider.readable_database(self)?;
        Ok(self.cache(db))
    }

    /// Connections are shared, so releasing one only logs.
    pub fn release_connection(&self, conn: &DatabaseConnection) {
        trace!(special = conn.is_special(), "released connection");
    }

    /// There is only ever one connection per database.
    pub fn is_single_connection(&self, _table: &str) -> bool {
        true
    }

    /// Release the cached connection and close the physical database.
    ///
    /// A second close only logs. Closing from inside a schema callback is
    /// refused with [`SealError::State`] and leaves the source open.
    pub fn close(&self) -> Result<(), SealError> {
        if self.special_connection().is_some() {
            return Err(SealError::State(
                "connection source closed from inside a schema callback".into(),
            ));
        }
        if !self.open.swap(false, Ordering::AcqRel) {
            warn!("connection source closed twice");
            return Ok(());
        }
        self.cached().take();
        self.provider.close_database()?;
        debug!("connection source closed");
        Ok(())
    }

    /// Like [`ConnectionSource::close`] but logs failures.
    pub fn close_quietly(&self) {
        if let Err(e) = self.close() {
            warn!(error = %e, "error closing connection source");
        }
    }

    fn cache(&self, db: Arc<Database>) -> DatabaseConnection {
        let mut cached = self.cached();
        if let Some(conn) = cached.as_ref()
            && Arc::ptr_eq(conn.database(), &db)
        {
            return conn.clone();
        }
        let conn = DatabaseConnection::new(db, false, self.provider.compatibility());
        trace!(read_only = conn.is_read_only(), "cached new connection");
        *cached = Some(conn.clone());
        conn
    }

    fn report_if_closed(&self, table: &str) {
        if !self.is_open() {
            warn!(
                table,
                backtrace = %Backtrace::force_capture(),
                "connection requested from a closed connection source"
            );
        }
    }

    fn special_slot(&self) -> MutexGuard<'_, Option<SpecialSlot>> {
        self.special.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn cached(&self) -> MutexGuard<'_, Option<DatabaseConnection>> {
        self.cached.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
