// SPDX-FileCopyrightText: 2026 SealDB Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The database open helper.
//!
//! [`OpenHelper`] owns one [`ConnectionSource`] for one database file. It
//! opens the file on demand, keys it, compares the stored schema version
//! with the requested one and runs the matching [`SchemaCallbacks`] inside
//! a transaction while the special slot routes the callback's connection
//! requests to the database being opened.

use std::io::Read;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::thread::{self, ThreadId};

use sealdb_config::model::DatabaseConfig;
use sealdb_core::{BootstrapPhase, BoxError, HealthStatus, HelperState, SealError};
use rusqlite::ErrorCode;
use secrecy::{ExposeSecret, SecretString};
use tracing::{debug, info, trace, warn};

use crate::bootstrap::run_bootstrap;
use crate::cancel::{ApiCompatibility, CancellationHook};
use crate::cipher::CipherExtension;
use crate::dao::{Dao, DaoRegistry};
use crate::database::Database;
use crate::lifecycle::LifecycleGuard;
use crate::schema::SchemaCallbacks;
use crate::source::{ConnectionSource, DatabaseProvider};
use crate::table_config::{load_table_configs, open_table_config_file, TableConfigCache};

/// How to open the managed database.
pub struct HelperOptions {
    path: PathBuf,
    version: i32,
    password: SecretString,
    cancel_queries_enabled: bool,
    wal_mode: bool,
}

impl std::fmt::Debug for HelperOptions {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HelperOptions")
            .field("path", &self.path)
            .field("version", &self.version)
            .field("encrypted", &!self.password.expose_secret().is_empty())
            .field("cancel_queries_enabled", &self.cancel_queries_enabled)
            .field("wal_mode", &self.wal_mode)
            .finish()
    }
}

impl HelperOptions {
    /// Unencrypted database at `path` expecting schema `version`.
    pub fn new(path: impl Into<PathBuf>, version: i32) -> Self {
        Self {
            path: path.into(),
            version,
            password: SecretString::from(""),
            cancel_queries_enabled: true,
            wal_mode: false,
        }
    }

    /// Encrypt with `password`; an empty string disables encryption.
    pub fn password(mut self, password: impl Into<String>) -> Self {
        self.password = SecretString::from(password.into());
        self
    }

    pub fn cancel_queries(mut self, enabled: bool) -> Self {
        self.cancel_queries_enabled = enabled;
        self
    }

    pub fn wal_mode(mut self, enabled: bool) -> Self {
        self.wal_mode = enabled;
        self
    }

    pub fn from_config(config: &DatabaseConfig) -> Self {
        Self::new(&config.path, config.version)
            .password(config.password.clone().unwrap_or_default())
            .cancel_queries(config.cancel_queries_enabled)
            .wal_mode(config.wal_mode)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn version(&self) -> i32 {
        self.version
    }

    pub fn is_encrypted(&self) -> bool {
        !self.password.expose_secret().is_empty()
    }

    fn validate(&self) -> Result<(), SealError> {
        if self.version < 1 {
            return Err(SealError::Config(format!(
                "database version must be at least 1, got {}",
                self.version
            )));
        }
        if self.path.as_os_str().is_empty() {
            return Err(SealError::Config("database path must not be empty".into()));
        }
        Ok(())
    }
}

/// Manages create/upgrade/open of one database and owns its connection source.
pub struct OpenHelper {
    core: Arc<HelperCore>,
    source: Arc<ConnectionSource>,
    lifecycle: LifecycleGuard,
    daos: DaoRegistry,
}

impl std::fmt::Debug for OpenHelper {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OpenHelper")
            .field("path", &self.core.path)
            .field("version", &self.core.version)
            .field("open", &self.is_open())
            .finish()
    }
}

impl OpenHelper {
    /// Construct a helper. Nothing is opened until a connection is needed.
    pub fn new(
        options: HelperOptions,
        callbacks: impl SchemaCallbacks + 'static,
    ) -> Result<Self, SealError> {
        options.validate()?;
        CipherExtension::load();

        let compat = ApiCompatibility::detect(options.cancel_queries_enabled);
        let core = Arc::new(HelperCore {
            path: options.path,
            version: options.version,
            wal_mode: options.wal_mode,
            password: Mutex::new(options.password),
            compat,
            callbacks: Box::new(callbacks),
            database: Mutex::new(None),
            opening_thread: Mutex::new(None),
        });
        let source = Arc::new(ConnectionSource::new(core.clone()));
        trace!(path = %core.path.display(), ?compat, "constructed connection source");

        Ok(Self {
            core,
            source,
            lifecycle: LifecycleGuard::new(),
            daos: DaoRegistry::new(),
        })
    }

    /// Construct a helper and load table configuration from `stream`.
    ///
    /// A malformed stream is fatal: [`SealError::ConfigLoad`].
    pub fn with_table_config_reader(
        options: HelperOptions,
        callbacks: impl SchemaCallbacks + 'static,
        stream: impl Read,
    ) -> Result<Self, SealError> {
        let helper = Self::new(options, callbacks)?;
        let configs = load_table_configs(stream)?;
        debug!(tables = configs.len(), "loaded table configuration");
        TableConfigCache::global().add_all(configs);
        Ok(helper)
    }

    /// Construct a helper and load table configuration from `config_file`.
    ///
    /// `None` behaves like [`OpenHelper::new`]. A file that cannot be opened
    /// is [`SealError::ResourceOpen`].
    pub fn with_table_config_file(
        options: HelperOptions,
        callbacks: impl SchemaCallbacks + 'static,
        config_file: Option<&Path>,
    ) -> Result<Self, SealError> {
        match config_file {
            None => Self::new(options, callbacks),
            Some(path) => {
                let file = open_table_config_file(path)?;
                Self::with_table_config_reader(options, callbacks, file)
            }
        }
    }

    /// Construct a helper from the `[database]` configuration section.
    pub fn from_config(
        config: &DatabaseConfig,
        callbacks: impl SchemaCallbacks + 'static,
    ) -> Result<Self, SealError> {
        Self::with_table_config_file(
            HelperOptions::from_config(config),
            callbacks,
            config.table_config_file.as_deref().map(Path::new),
        )
    }

    /// The connection source of this helper.
    ///
    /// After [`OpenHelper::close`] this still returns the same source, but
    /// logs a warning with a backtrace and counts the access.
    pub fn connection_source(&self) -> Arc<ConnectionSource> {
        self.lifecycle.check_access("connection source");
        self.source.clone()
    }

    /// Open the database for writing, running schema callbacks if needed.
    ///
    /// After close the database is still opened, behind a logged and
    /// counted late access.
    pub fn writable_database(&self) -> Result<Arc<Database>, SealError> {
        self.lifecycle.check_access("writable database");
        self.core.writable_database(&self.source)
    }

    /// Open the database for reading; falls back to read-only when the file
    /// cannot be opened for writing.
    pub fn readable_database(&self) -> Result<Arc<Database>, SealError> {
        self.lifecycle.check_access("readable database");
        self.core.readable_database(&self.source)
    }

    /// Close the connection source and the database. Closing twice logs.
    pub fn close(&self) -> Result<(), SealError> {
        self.lifecycle.close(|| {
            self.daos.clear();
            self.source.close()?;
            info!(path = %self.core.path.display(), "helper closed");
            Ok(())
        })
    }

    /// False once [`OpenHelper::close`] was called.
    pub fn is_open(&self) -> bool {
        self.lifecycle.is_open()
    }

    /// Accessor calls recorded after close.
    pub fn late_accesses(&self) -> u64 {
        self.lifecycle.late_accesses()
    }

    pub fn state(&self) -> HelperState {
        self.source.state()
    }

    pub fn compatibility(&self) -> ApiCompatibility {
        self.core.compat
    }

    /// A hook for one cancellable query.
    ///
    /// Fails with [`SealError::Unsupported`] if cancellation is disabled or
    /// unavailable.
    pub fn create_cancellation_hook(&self) -> Result<CancellationHook, SealError> {
        self.core.compat.create_cancellation_hook()
    }

    /// The cached DAO of type `D`, created on first use.
    pub fn dao<D: Dao>(&self) -> Result<Arc<D>, SealError> {
        self.daos.get_or_create::<D>(&self.connection_source())
    }

    /// Re-encrypt the open database with `new_password`.
    ///
    /// Only re-keys: turning encryption on or off for an existing file is
    /// [`SealError::Unsupported`].
    pub fn change_password(&self, new_password: impl Into<String>) -> Result<(), SealError> {
        let new_password = SecretString::from(new_password.into());
        if self.core.password().expose_secret().is_empty()
            || new_password.expose_secret().is_empty()
        {
            return Err(SealError::Unsupported(
                "changing between encrypted and unencrypted requires exporting the database".into(),
            ));
        }
        let db = self.writable_database()?;
        db.with_connection(|conn| CipherExtension::rekey(conn, &new_password))?;
        *self.core.password() = new_password;
        info!(path = %self.core.path.display(), "database password changed");
        Ok(())
    }

    /// Run `SELECT 1` against the writable database.
    pub fn health_check(&self) -> HealthStatus {
        if !self.is_open() {
            return HealthStatus::Degraded("helper used after close".into());
        }
        match self
            .writable_database()
            .and_then(|db| {
                db.with_connection(|conn| conn.query_row("SELECT 1", [], |row| row.get::<_, i64>(0)))
            }) {
            Ok(_) => HealthStatus::Healthy,
            Err(e) => HealthStatus::Unhealthy(e.to_string()),
        }
    }

    pub fn database_path(&self) -> &Path {
        &self.core.path
    }

    pub fn version(&self) -> i32 {
        self.core.version
    }
}

/// The open path; the connection source's [`DatabaseProvider`].
struct HelperCore {
    path: PathBuf,
    version: i32,
    wal_mode: bool,
    password: Mutex<SecretString>,
    compat: ApiCompatibility,
    callbacks: Box<dyn SchemaCallbacks>,
    database: Mutex<Option<Arc<Database>>>,
    opening_thread: Mutex<Option<ThreadId>>,
}

impl HelperCore {
    fn password(&self) -> MutexGuard<'_, SecretString> {
        self.password.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Lock the database slot, refusing re-entry from the opening thread.
    fn lock_database(&self) -> Result<MutexGuard<'_, Option<Arc<Database>>>, SealError> {
        let me = thread::current().id();
        if *lock(&self.opening_thread) == Some(me) {
            return Err(SealError::State(
                "database opened recursively; use the connection source passed to the schema callback"
                    .into(),
            ));
        }
        Ok(lock(&self.database))
    }

    fn open_writable(
        &self,
        slot: &mut Option<Arc<Database>>,
        source: &ConnectionSource,
    ) -> Result<Arc<Database>, SealError> {
        if let Some(db) = slot.as_ref()
            && db.is_open()
            && !db.is_read_only()
        {
            return Ok(db.clone());
        }

        let _opening = OpeningMarker::set(&self.opening_thread);
        let db = Arc::new(self.open_physical(false)?);
        if let Err(e) = self.bootstrap(&db, source) {
            db.close_quietly();
            return Err(e);
        }
        Ok(self.install(slot, db))
    }

    fn open_read_only(
        &self,
        slot: &mut Option<Arc<Database>>,
        source: &ConnectionSource,
    ) -> Result<Arc<Database>, SealError> {
        let _opening = OpeningMarker::set(&self.opening_thread);
        let db = Arc::new(self.open_physical(true)?);
        let stored = db.user_version()?;
        if stored != self.version {
            db.close_quietly();
            return Err(SealError::State(format!(
                "cannot upgrade read-only database {} from version {stored} to {}",
                self.path.display(),
                self.version
            )));
        }
        run_bootstrap(source, &db, self.compat, BootstrapPhase::Open, |source| {
            self.dispatch(BootstrapPhase::Open, source)
        })?;
        warn!(path = %self.path.display(), "opened database read-only");
        Ok(self.install(slot, db))
    }

    fn open_physical(&self, read_only: bool) -> Result<Database, SealError> {
        let db = Database::open(&self.path, &self.password(), read_only)?;
        if self.wal_mode && !read_only {
            db.enable_wal()?;
        }
        Ok(db)
    }

    fn install(&self, slot: &mut Option<Arc<Database>>, db: Arc<Database>) -> Arc<Database> {
        if let Some(previous) = slot.replace(db.clone()) {
            previous.close_quietly();
        }
        db
    }

    /// Bring the schema to `self.version`, then run `on_open`.
    fn bootstrap(&self, db: &Arc<Database>, source: &ConnectionSource) -> Result<(), SealError> {
        let stored = db.user_version()?;
        if let Some(phase) = BootstrapPhase::for_versions(stored, self.version) {
            debug!(path = %self.path.display(), %phase, "running schema callbacks");
            db.execute_batch("BEGIN IMMEDIATE;")?;
            let result = run_bootstrap(source, db, self.compat, phase, |source| {
                self.dispatch(phase, source)
            })
            .and_then(|()| db.set_user_version(self.version));

            match result {
                Ok(()) => db.execute_batch("COMMIT;")?,
                Err(e) => {
                    if let Err(rollback) = db.execute_batch("ROLLBACK;") {
                        warn!(error = %rollback, "rollback after failed {phase} failed");
                    }
                    return Err(e);
                }
            }
            info!(path = %self.path.display(), %phase, "schema callbacks complete");
        }

        run_bootstrap(source, db, self.compat, BootstrapPhase::Open, |source| {
            self.dispatch(BootstrapPhase::Open, source)
        })
    }

    fn dispatch(&self, phase: BootstrapPhase, source: &ConnectionSource) -> Result<(), SealError> {
        let result = match phase {
            BootstrapPhase::Create => self.callbacks.on_create(source),
            BootstrapPhase::Upgrade {
                old_version,
                new_version,
            } => self.callbacks.on_upgrade(source, old_version, new_version),
            BootstrapPhase::Downgrade {
                old_version,
                new_version,
            } => self.callbacks.on_downgrade(source, old_version, new_version),
            BootstrapPhase::Open => self.callbacks.on_open(source),
        };
        result.map_err(|e| callback_error(phase, e))
    }
}

impl DatabaseProvider for HelperCore {
    fn writable_database(&self, source: &ConnectionSource) -> Result<Arc<Database>, SealError> {
        let mut slot = self.lock_database()?;
        self.open_writable(&mut slot, source)
    }

    fn readable_database(&self, source: &ConnectionSource) -> Result<Arc<Database>, SealError> {
        let mut slot = self.lock_database()?;
        if let Some(db) = slot.as_ref()
            && db.is_open()
        {
            return Ok(db.clone());
        }
        match self.open_writable(&mut slot, source) {
            Ok(db) => Ok(db),
            Err(err) if is_open_failure(&err) => {
                warn!(error = %err, "could not open database for writing, retrying read-only");
                self.open_read_only(&mut slot, source)
                    .map_err(|read_only_err| match read_only_err {
                        SealError::State(msg) => {
                            SealError::State(format!("{msg}; writable open failed: {err}"))
                        }
                        other => {
                            debug!(error = %other, "read-only open failed too");
                            err
                        }
                    })
            }
            Err(err) => Err(err),
        }
    }

    fn close_database(&self) -> Result<(), SealError> {
        if *lock(&self.opening_thread) == Some(thread::current().id()) {
            return Err(SealError::State(
                "database closed while it is being opened".into(),
            ));
        }
        let db = lock(&self.database).take();
        if let Some(db) = db {
            db.close()?;
        }
        Ok(())
    }

    fn compatibility(&self) -> ApiCompatibility {
        self.compat
    }
}

/// Marks the current thread as opening; cleared on drop.
struct OpeningMarker<'a> {
    slot: &'a Mutex<Option<ThreadId>>,
}

impl<'a> OpeningMarker<'a> {
    fn set(slot: &'a Mutex<Option<ThreadId>>) -> Self {
        *lock(slot) = Some(thread::current().id());
        Self { slot }
    }
}

impl Drop for OpeningMarker<'_> {
    fn drop(&mut self) {
        lock(self.slot).take();
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Failures of the physical open itself, as opposed to schema work.
fn is_open_failure(err: &SealError) -> bool {
    match err {
        SealError::ResourceOpen { .. } => true,
        SealError::Storage { source } => source
            .downcast_ref::<rusqlite::Error>()
            .and_then(rusqlite::Error::sqlite_error_code)
            .is_some_and(|code| {
                matches!(
                    code,
                    ErrorCode::ReadOnly | ErrorCode::CannotOpen | ErrorCode::PermissionDenied
                )
            }),
        _ => false,
    }
}

fn callback_error(phase: BootstrapPhase, err: BoxError) -> SealError {
    match err.downcast::<SealError>() {
        Ok(seal) => *seal,
        Err(source) => SealError::Callback { phase, source },
    }
}
