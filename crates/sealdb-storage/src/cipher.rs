// SPDX-FileCopyrightText: 2026 SealDB Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! SQLCipher extension: one-time load probe, keying and rekeying.
//!
//! An empty password means "no encryption"; the connection is then left
//! unkeyed and behaves like plain SQLite.

use std::sync::OnceLock;

use rusqlite::OptionalExtension;
use secrecy::{ExposeSecret, SecretString};
use tracing::{debug, warn};
use zeroize::Zeroizing;

static CIPHER_VERSION: OnceLock<Option<String>> = OnceLock::new();

/// Process-wide handle on the SQLCipher extension.
pub struct CipherExtension;

impl CipherExtension {
    /// Load the extension before first use.
    ///
    /// The probe runs once per process; later calls return the cached
    /// version. `None` means the linked SQLite has no cipher support, in
    /// which case only empty passwords can be used.
    pub fn load() -> Option<&'static str> {
        CIPHER_VERSION
            .get_or_init(|| match probe_cipher_version() {
                Ok(Some(version)) => {
                    debug!(cipher_version = %version, "SQLCipher extension loaded");
                    Some(version)
                }
                Ok(None) => {
                    warn!("linked SQLite has no cipher support; encrypted databases unavailable");
                    None
                }
                Err(e) => {
                    warn!(error = %e, "could not probe SQLCipher extension");
                    None
                }
            })
            .as_deref()
    }

    /// Key a freshly opened connection. No-op for an empty password.
    pub fn apply_key(conn: &rusqlite::Connection, password: &SecretString) -> rusqlite::Result<()> {
        let password = password.expose_secret();
        if password.is_empty() {
            return Ok(());
        }
        let pragma = Zeroizing::new(format!("PRAGMA key = {};", quote(password).as_str()));
        run_pragma(conn, &pragma)
    }

    /// Re-encrypt an already keyed database with a new password.
    pub fn rekey(conn: &rusqlite::Connection, password: &SecretString) -> rusqlite::Result<()> {
        let pragma = Zeroizing::new(format!(
            "PRAGMA rekey = {};",
            quote(password.expose_secret()).as_str()
        ));
        run_pragma(conn, &pragma)
    }

    /// Force SQLCipher to decrypt page 1 so a wrong key fails at open time
    /// rather than on the first real query.
    pub fn verify_key(conn: &rusqlite::Connection) -> rusqlite::Result<()> {
        conn.query_row("SELECT count(*) FROM sqlite_master", [], |row| {
            row.get::<_, i64>(0)
        })
        .map(|_| ())
    }
}

fn probe_cipher_version() -> rusqlite::Result<Option<String>> {
    let conn = rusqlite::Connection::open_in_memory()?;
    conn.query_row("PRAGMA cipher_version", [], |row| row.get(0))
        .optional()
}

/// Run a pragma and drain its rows; SQLCipher 4 answers `key` with "ok".
fn run_pragma(conn: &rusqlite::Connection, sql: &str) -> rusqlite::Result<()> {
    let mut stmt = conn.prepare(sql)?;
    let mut rows = stmt.query([])?;
    while rows.next()?.is_some() {}
    Ok(())
}

/// SQL string literal with embedded quotes doubled.
fn quote(value: &str) -> Zeroizing<String> {
    Zeroizing::new(format!("'{}'", value.replace('\'', "''")))
}
