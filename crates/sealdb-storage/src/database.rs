// SPDX-FileCopyrightText: 2026 SealDB Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The physical database handle.
//!
//! A [`Database`] owns one `rusqlite::Connection` behind a mutex plus the
//! connection's interrupt handle, which stays usable from other threads
//! while a query holds the mutex.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};

use rusqlite::{ErrorCode, InterruptHandle, OpenFlags};
use sealdb_core::SealError;
use secrecy::SecretString;
use tracing::{debug, warn};

use crate::cipher::CipherExtension;

/// Path used for in-memory databases.
pub const MEMORY_PATH: &str = ":memory:";

/// One open SQLite/SQLCipher database file.
pub struct Database {
    path: PathBuf,
    read_only: bool,
    conn: Mutex<Option<rusqlite::Connection>>,
    interrupt: InterruptHandle,
    closed: AtomicBool,
}

impl std::fmt::Debug for Database {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Database")
            .field("path", &self.path)
            .field("read_only", &self.read_only)
            .field("open", &self.is_open())
            .finish()
    }
}

impl Database {
    /// Open (or create, unless `read_only`) the database at `path` and key it.
    ///
    /// A missing file in read-only mode, an unreadable file or a wrong
    /// password all surface as [`SealError::ResourceOpen`] naming the path.
    pub fn open(path: &Path, password: &SecretString, read_only: bool) -> Result<Self, SealError> {
        CipherExtension::load();

        let flags = if read_only {
            OpenFlags::SQLITE_OPEN_READ_ONLY
                | OpenFlags::SQLITE_OPEN_URI
                | OpenFlags::SQLITE_OPEN_NO_MUTEX
        } else {
            OpenFlags::default()
        };
        let shown = path.display().to_string();

        let conn = rusqlite::Connection::open_with_flags(path, flags)
            .map_err(|e| SealError::resource_open(&shown, e))?;
        Self::key(&conn, password).map_err(|e| SealError::resource_open(&shown, e))?;

        debug!(path = %shown, read_only, "database opened");
        Ok(Self::from_connection(path.to_path_buf(), read_only, conn))
    }

    /// Open a private in-memory database.
    pub fn open_in_memory(password: &SecretString) -> Result<Self, SealError> {
        CipherExtension::load();
        let conn = rusqlite::Connection::open_in_memory()
            .map_err(|e| SealError::resource_open(MEMORY_PATH, e))?;
        Self::key(&conn, password).map_err(|e| SealError::resource_open(MEMORY_PATH, e))?;
        Ok(Self::from_connection(PathBuf::from(MEMORY_PATH), false, conn))
    }

    fn key(conn: &rusqlite::Connection, password: &SecretString) -> rusqlite::Result<()> {
        CipherExtension::apply_key(conn, password)?;
        CipherExtension::verify_key(conn)
    }

    fn from_connection(path: PathBuf, read_only: bool, conn: rusqlite::Connection) -> Self {
        let interrupt = conn.get_interrupt_handle();
        Self {
            path,
            read_only,
            conn: Mutex::new(Some(conn)),
            interrupt,
            closed: AtomicBool::new(false),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn is_read_only(&self) -> bool {
        self.read_only
    }

    pub fn is_in_memory(&self) -> bool {
        self.path.as_os_str() == MEMORY_PATH
    }

    /// False once [`Database::close`] has run.
    pub fn is_open(&self) -> bool {
        !self.closed.load(Ordering::Acquire)
    }

    /// Run `f` against the underlying connection.
    ///
    /// The connection mutex is held for the duration of `f`. An interrupted
    /// statement maps to [`SealError::Cancelled`].
    pub fn with_connection<R>(
        &self,
        f: impl FnOnce(&rusqlite::Connection) -> rusqlite::Result<R>,
    ) -> Result<R, SealError> {
        let guard = self.lock();
        let conn = guard.as_ref().ok_or_else(|| {
            SealError::State(format!("database {} is closed", self.path.display()))
        })?;
        f(conn).map_err(map_sqlite_err)
    }

    pub fn execute_batch(&self, sql: &str) -> Result<(), SealError> {
        self.with_connection(|conn| conn.execute_batch(sql))
    }

    /// Schema version stored in the file header (`PRAGMA user_version`).
    pub fn user_version(&self) -> Result<i32, SealError> {
        self.with_connection(|conn| conn.query_row("PRAGMA user_version", [], |row| row.get(0)))
    }

    pub fn set_user_version(&self, version: i32) -> Result<(), SealError> {
        self.execute_batch(&format!("PRAGMA user_version = {version};"))
    }

    /// Switch the journal to WAL. Ignored for in-memory databases.
    pub fn enable_wal(&self) -> Result<(), SealError> {
        if self.is_in_memory() {
            return Ok(());
        }
        let mode: String = self.with_connection(|conn| {
            conn.query_row("PRAGMA journal_mode=WAL", [], |row| row.get(0))
        })?;
        debug!(path = %self.path.display(), journal_mode = %mode, "journal mode set");
        Ok(())
    }

    /// Ask SQLite to abort whatever statement is running. Safe from any thread.
    pub fn interrupt(&self) {
        self.interrupt.interrupt();
    }

    /// Close the connection. Returns `Ok(false)` if it was already closed.
    pub fn close(&self) -> Result<bool, SealError> {
        let Some(conn) = self.lock().take() else {
            return Ok(false);
        };
        self.closed.store(true, Ordering::Release);
        conn.close().map_err(|(_, e)| SealError::storage(e))?;
        debug!(path = %self.path.display(), "database closed");
        Ok(true)
    }

    /// Close, logging instead of returning a failure.
    pub fn close_quietly(&self) {
        if let Err(e) = self.close() {
            warn!(path = %self.path.display(), error = %e, "error closing database");
        }
    }

    fn lock(&self) -> MutexGuard<'_, Option<rusqlite::Connection>> {
        self.conn.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Map a rusqlite error onto the SealDB taxonomy.
pub(crate) fn map_sqlite_err(err: rusqlite::Error) -> SealError {
    match err.sqlite_error_code() {
        Some(ErrorCode::OperationInterrupted) => SealError::Cancelled,
        _ => SealError::storage(err),
    }
}
