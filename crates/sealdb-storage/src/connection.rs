// SPDX-FileCopyrightText: 2026 SealDB Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Connection handles handed out by the connection source.

use std::sync::Arc;

use rusqlite::types::Value;
use rusqlite::Params;
use sealdb_core::SealError;

use crate::cancel::{ApiCompatibility, CancellationHook};
use crate::database::Database;

/// A handle to the managed database.
///
/// Cloning is cheap and keeps identity: [`DatabaseConnection::same_as`] is
/// true for clones of the same handle and false for two handles wrapping the
/// same [`Database`].
#[derive(Clone)]
pub struct DatabaseConnection {
    inner: Arc<ConnectionInner>,
}

struct ConnectionInner {
    db: Arc<Database>,
    special: bool,
    compat: ApiCompatibility,
}

impl std::fmt::Debug for DatabaseConnection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DatabaseConnection")
            .field("db", &self.inner.db)
            .field("special", &self.inner.special)
            .field("compat", &self.inner.compat)
            .finish()
    }
}

impl DatabaseConnection {
    /// Wrap `db`. `special` marks the bootstrap connection.
    pub fn new(db: Arc<Database>, special: bool, compat: ApiCompatibility) -> Self {
        Self {
            inner: Arc::new(ConnectionInner {
                db,
                special,
                compat,
            }),
        }
    }

    pub fn is_special(&self) -> bool {
        self.inner.special
    }

    pub fn cancel_queries_enabled(&self) -> bool {
        self.inner.compat.supports_cancellation()
    }

    pub fn compatibility(&self) -> ApiCompatibility {
        self.inner.compat
    }

    pub fn database(&self) -> &Arc<Database> {
        &self.inner.db
    }

    /// Identity comparison.
    pub fn same_as(&self, other: &DatabaseConnection) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    /// True if both handles point at the same physical database.
    pub fn shares_database_with(&self, other: &DatabaseConnection) -> bool {
        Arc::ptr_eq(&self.inner.db, &other.inner.db)
    }

    pub fn is_read_only(&self) -> bool {
        self.inner.db.is_read_only()
    }

    pub fn is_closed(&self) -> bool {
        !self.inner.db.is_open()
    }

    /// Run several statements separated by semicolons.
    pub fn execute_batch(&self, sql: &str) -> Result<(), SealError> {
        self.inner.db.execute_batch(sql)
    }

    /// Run one statement, returning the number of changed rows.
    pub fn execute<P: Params>(&self, sql: &str, params: P) -> Result<usize, SealError> {
        self.inner.db.with_connection(|conn| conn.execute(sql, params))
    }

    /// Run an INSERT and return the new row id.
    pub fn insert<P: Params>(&self, sql: &str, params: P) -> Result<i64, SealError> {
        self.inner.db.with_connection(|conn| {
            conn.execute(sql, params)?;
            Ok(conn.last_insert_rowid())
        })
    }

    /// Run a query whose first column of the first row is an integer.
    pub fn query_for_long<P: Params>(&self, sql: &str, params: P) -> Result<i64, SealError> {
        self.inner
            .db
            .with_connection(|conn| conn.query_row(sql, params, |row| row.get(0)))
    }

    /// Run a query with string arguments, optionally cancellable.
    ///
    /// Passing a hook on an engine without cancellation support fails with
    /// [`SealError::Unsupported`].
    pub fn raw_query(
        &self,
        sql: &str,
        args: &[&str],
        hook: Option<&CancellationHook>,
    ) -> Result<QueryRows, SealError> {
        self.inner.compat.raw_query(&self.inner.db, sql, args, hook)
    }

    pub fn is_table_exists(&self, table: &str) -> Result<bool, SealError> {
        let count = self.query_for_long(
            "SELECT count(*) FROM sqlite_master WHERE type = 'table' AND name = ?1",
            [table],
        )?;
        Ok(count > 0)
    }
}

/// Materialised result of [`DatabaseConnection::raw_query`].
#[derive(Debug, Clone, PartialEq, Default)]
pub struct QueryRows {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<Value>>,
}

impl QueryRows {
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Value of `column` in row `row`, if both exist.
    pub fn get(&self, row: usize, column: &str) -> Option<&Value> {
        let index = self.columns.iter().position(|c| c == column)?;
        self.rows.get(row)?.get(index)
    }
}

pub(crate) fn run_query(
    conn: &rusqlite::Connection,
    sql: &str,
    args: &[&str],
) -> rusqlite::Result<QueryRows> {
    let mut stmt = conn.prepare(sql)?;
    let columns: Vec<String> = stmt.column_names().into_iter().map(String::from).collect();
    let width = columns.len();

    let mut rows = stmt.query(rusqlite::params_from_iter(args.iter()))?;
    let mut out = Vec::new();
    while let Some(row) = rows.next()? {
        let values = (0..width)
            .map(|i| row.get::<_, Value>(i))
            .collect::<rusqlite::Result<Vec<_>>>()?;
        out.push(values);
    }
    Ok(QueryRows { columns, rows: out })
}

#[cfg(test)]
mod tests {
    use super::*;
    use secrecy::SecretString;

    fn connection(special: bool) -> DatabaseConnection {
        let db = Database::open_in_memory(&SecretString::from("")).unwrap();
        DatabaseConnection::new(Arc::new(db), special, ApiCompatibility::Interruptible)
    }

    #[test]
    fn clones_share_identity() {
        let conn = connection(false);
        let clone = conn.clone();
        assert!(conn.same_as(&clone));

        let other = DatabaseConnection::new(conn.database().clone(), false, conn.compatibility());
        assert!(!conn.same_as(&other));
        assert!(conn.shares_database_with(&other));
    }

    #[test]
    fn special_flag_is_kept() {
        assert!(connection(true).is_special());
        assert!(!connection(false).is_special());
    }

    #[test]
    fn insert_and_query() {
        let conn = connection(false);
        conn.execute_batch("CREATE TABLE account (id INTEGER PRIMARY KEY, name TEXT)")
            .unwrap();
        let id = conn
            .insert("INSERT INTO account (name) VALUES (?1)", ["alice"])
            .unwrap();
        assert_eq!(id, 1);
        conn.execute("INSERT INTO account (name) VALUES (?1)", ["bob"])
            .unwrap();

        assert_eq!(conn.query_for_long("SELECT count(*) FROM account", []).unwrap(), 2);
        assert!(conn.is_table_exists("account").unwrap());
        assert!(!conn.is_table_exists("missing").unwrap());

        let rows = conn
            .raw_query("SELECT id, name FROM account WHERE name = ?1", &["bob"], None)
            .unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows.get(0, "name"), Some(&Value::Text("bob".into())));
        assert_eq!(rows.get(0, "id"), Some(&Value::Integer(2)));
        assert_eq!(rows.get(0, "missing"), None);
    }

    #[test]
    fn closed_database_is_reported() {
        let conn = connection(false);
        conn.database().close().unwrap();
        assert!(conn.is_closed());
    }
}
