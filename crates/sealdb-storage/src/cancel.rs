// SPDX-FileCopyrightText: 2026 SealDB Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Cooperative query cancellation.
//!
//! [`ApiCompatibility`] is chosen once per helper by a capability probe. The
//! `Interruptible` variant hands out [`CancellationHook`]s whose `cancel()`
//! may be called from any thread; the `Basic` variant refuses to create
//! hooks and refuses hooked queries, but runs plain queries normally.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use sealdb_core::SealError;
use tracing::debug;

use crate::connection::{run_query, QueryRows};
use crate::database::Database;

/// Oldest SQLite with `sqlite3_interrupt` and progress handlers we rely on.
pub const MIN_INTERRUPT_VERSION: i32 = 3_007_000;

/// Virtual machine instructions between two cancellation checks.
const PROGRESS_INTERVAL: i32 = 1_000;

/// Engine capabilities relevant to cancellation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApiCompatibility {
    /// No cancellation support.
    Basic,
    /// Queries can be interrupted through a [`CancellationHook`].
    Interruptible,
}

impl ApiCompatibility {
    /// Probe the linked engine.
    ///
    /// Cancellation must be enabled by configuration and supported by the
    /// SQLite library version.
    pub fn detect(cancel_queries_enabled: bool) -> Self {
        Self::for_version(cancel_queries_enabled, rusqlite::version_number())
    }

    fn for_version(cancel_queries_enabled: bool, version: i32) -> Self {
        if cancel_queries_enabled && version >= MIN_INTERRUPT_VERSION {
            ApiCompatibility::Interruptible
        } else {
            ApiCompatibility::Basic
        }
    }

    pub fn supports_cancellation(&self) -> bool {
        matches!(self, ApiCompatibility::Interruptible)
    }

    /// Create a hook for one upcoming query.
    pub fn create_cancellation_hook(&self) -> Result<CancellationHook, SealError> {
        match self {
            ApiCompatibility::Basic => Err(SealError::Unsupported(
                "query cancellation is not supported by this engine".into(),
            )),
            ApiCompatibility::Interruptible => Ok(CancellationHook::new()),
        }
    }

    /// Run a query, honouring `hook` if the engine supports it.
    pub fn raw_query(
        &self,
        db: &Arc<Database>,
        sql: &str,
        args: &[&str],
        hook: Option<&CancellationHook>,
    ) -> Result<QueryRows, SealError> {
        match (self, hook) {
            (_, None) => db.with_connection(|conn| run_query(conn, sql, args)),
            (ApiCompatibility::Basic, Some(_)) => Err(SealError::Unsupported(
                "cancellation hook passed to an engine without cancellation support".into(),
            )),
            (ApiCompatibility::Interruptible, Some(hook)) => {
                let _running = hook.activate(db)?;
                let cancelled = hook.flag();
                db.with_connection(|conn| {
                    conn.progress_handler(
                        PROGRESS_INTERVAL,
                        Some(move || cancelled.load(Ordering::SeqCst)),
                    );
                    let result = run_query(conn, sql, args);
                    conn.progress_handler(0, None::<fn() -> bool>);
                    result
                })
            }
        }
    }
}

/// Cancels at most one in-flight query.
///
/// Clones share state, so a clone can be handed to another thread and used
/// to cancel the query running on this one.
#[derive(Debug, Clone)]
pub struct CancellationHook {
    state: Arc<HookState>,
}

#[derive(Debug)]
struct HookState {
    cancelled: Arc<AtomicBool>,
    used: AtomicBool,
    running: Mutex<Option<Arc<Database>>>,
}

impl CancellationHook {
    fn new() -> Self {
        Self {
            state: Arc::new(HookState {
                cancelled: Arc::new(AtomicBool::new(false)),
                used: AtomicBool::new(false),
                running: Mutex::new(None),
            }),
        }
    }

    /// Request cancellation.
    ///
    /// Interrupts the associated query if it is running. Before the query
    /// starts it makes the query fail immediately; after it finished this
    /// does nothing.
    pub fn cancel(&self) {
        self.state.cancelled.store(true, Ordering::SeqCst);
        if let Some(db) = self.running().as_ref() {
            debug!(path = %db.path().display(), "interrupting running query");
            db.interrupt();
        }
    }

    pub fn is_cancelled(&self) -> bool {
        self.state.cancelled.load(Ordering::SeqCst)
    }

    /// True once a query has claimed this hook.
    pub fn is_used(&self) -> bool {
        self.state.used.load(Ordering::SeqCst)
    }

    fn flag(&self) -> Arc<AtomicBool> {
        self.state.cancelled.clone()
    }

    fn running(&self) -> MutexGuard<'_, Option<Arc<Database>>> {
        self.state.running.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Bind the hook to a query about to run on `db`.
    fn activate(&self, db: &Arc<Database>) -> Result<RunningQuery<'_>, SealError> {
        if self.state.used.swap(true, Ordering::SeqCst) {
            return Err(SealError::State(
                "cancellation hook is already bound to another query".into(),
            ));
        }
        let mut running = self.running();
        if self.is_cancelled() {
            return Err(SealError::Cancelled);
        }
        *running = Some(db.clone());
        Ok(RunningQuery { hook: self })
    }
}

/// Unbinds the hook when the query finishes, so a late `cancel()` is a no-op.
struct RunningQuery<'a> {
    hook: &'a CancellationHook,
}

impl Drop for RunningQuery<'_> {
    fn drop(&mut self) {
        self.hook.running().take();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use secrecy::SecretString;

    fn memory_db() -> Arc<Database> {
        Arc::new(Database::open_in_memory(&SecretString::from("")).unwrap())
    }

    #[test]
    fn probe_respects_configuration_and_version() {
        assert_eq!(
            ApiCompatibility::for_version(true, 3_045_000),
            ApiCompatibility::Interruptible
        );
        assert_eq!(
            ApiCompatibility::for_version(false, 3_045_000),
            ApiCompatibility::Basic
        );
        assert_eq!(
            ApiCompatibility::for_version(true, 3_006_000),
            ApiCompatibility::Basic
        );
        assert!(ApiCompatibility::detect(true).supports_cancellation());
    }

    #[test]
    fn basic_refuses_hooks() {
        let err = ApiCompatibility::Basic.create_cancellation_hook().unwrap_err();
        assert!(matches!(err, SealError::Unsupported(_)));

        let hook = ApiCompatibility::Interruptible
            .create_cancellation_hook()
            .unwrap();
        let db = memory_db();
        let err = ApiCompatibility::Basic
            .raw_query(&db, "SELECT 1", &[], Some(&hook))
            .unwrap_err();
        assert!(matches!(err, SealError::Unsupported(_)));
    }

    #[test]
    fn basic_runs_unhooked_queries() {
        let db = memory_db();
        let rows = ApiCompatibility::Basic
            .raw_query(&db, "SELECT 1 + 1 AS two", &[], None)
            .unwrap();
        assert_eq!(rows.columns, vec!["two".to_string()]);
        assert_eq!(rows.len(), 1);
    }

    #[test]
    fn cancel_after_completion_is_noop() {
        let compat = ApiCompatibility::Interruptible;
        let hook = compat.create_cancellation_hook().unwrap();
        let db = memory_db();
        compat.raw_query(&db, "SELECT 1", &[], Some(&hook)).unwrap();
        hook.cancel();
        assert!(hook.is_cancelled());
        // The database is still usable; the late interrupt went nowhere.
        compat.raw_query(&db, "SELECT 2", &[], None).unwrap();
    }

    #[test]
    fn cancel_before_start_fails_query() {
        let compat = ApiCompatibility::Interruptible;
        let hook = compat.create_cancellation_hook().unwrap();
        hook.cancel();
        let db = memory_db();
        let err = compat.raw_query(&db, "SELECT 1", &[], Some(&hook)).unwrap_err();
        assert!(err.is_cancelled());
    }

    #[test]
    fn hook_serves_one_query_only() {
        let compat = ApiCompatibility::Interruptible;
        let hook = compat.create_cancellation_hook().unwrap();
        let db = memory_db();
        compat.raw_query(&db, "SELECT 1", &[], Some(&hook)).unwrap();
        assert!(hook.is_used());
        let err = compat.raw_query(&db, "SELECT 1", &[], Some(&hook)).unwrap_err();
        assert!(matches!(err, SealError::State(_)));
    }

    #[test]
    fn cancel_from_another_thread_interrupts() {
        let compat = ApiCompatibility::Interruptible;
        let hook = compat.create_cancellation_hook().unwrap();
        let db = memory_db();

        let remote = hook.clone();
        let canceller = std::thread::spawn(move || {
            std::thread::sleep(std::time::Duration::from_millis(50));
            remote.cancel();
        });

        let endless = "WITH RECURSIVE c(x) AS (SELECT 1 UNION ALL SELECT x + 1 FROM c) \
                       SELECT count(*) FROM c";
        let err = compat.raw_query(&db, endless, &[], Some(&hook)).unwrap_err();
        canceller.join().unwrap();
        assert!(err.is_cancelled(), "got {err:?}");
    }
}
