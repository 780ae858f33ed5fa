// SPDX-FileCopyrightText: 2026 SealDB Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `sealdb query` command implementation.

use std::sync::mpsc::{self, RecvTimeoutError};
use std::thread;
use std::time::Duration;

use rusqlite::types::Value;
use sealdb_config::model::SealdbConfig;
use sealdb_core::SealError;
use sealdb_storage::{OpenHelper, QueryRows};
use tracing::{debug, warn};

use crate::open_helper;

/// Run `sql`, cancelling it once `timeout` elapses.
pub fn query_with_timeout(
    helper: &OpenHelper,
    sql: &str,
    args: &[&str],
    timeout: Option<Duration>,
) -> Result<QueryRows, SealError> {
    let conn = helper.connection_source().read_write_connection("query")?;
    let Some(timeout) = timeout else {
        return conn.raw_query(sql, args, None);
    };

    let hook = helper.create_cancellation_hook()?;
    let remote = hook.clone();
    let (done, finished) = mpsc::channel::<()>();
    let watchdog = thread::spawn(move || {
        if let Err(RecvTimeoutError::Timeout) = finished.recv_timeout(timeout) {
            warn!(?timeout, "query timed out, cancelling");
            remote.cancel();
        }
    });

    let result = conn.raw_query(sql, args, Some(&hook));
    drop(done);
    if watchdog.join().is_err() {
        debug!("query watchdog panicked");
    }
    result
}

/// Run the `sealdb query` command.
pub fn run_query(
    config: &SealdbConfig,
    sql: &str,
    args: &[String],
    timeout_ms: Option<u64>,
) -> Result<(), SealError> {
    let helper = open_helper(config)?;
    let args: Vec<&str> = args.iter().map(String::as_str).collect();
    let rows = query_with_timeout(&helper, sql, &args, timeout_ms.map(Duration::from_millis));
    helper.close()?;
    print_rows(&rows?);
    Ok(())
}

fn print_rows(rows: &QueryRows) {
    if rows.columns.is_empty() {
        return;
    }
    println!("{}", rows.columns.join("\t"));
    for row in &rows.rows {
        let cells: Vec<String> = row.iter().map(format_value).collect();
        println!("{}", cells.join("\t"));
    }
    eprintln!("({} row{})", rows.len(), if rows.len() == 1 { "" } else { "s" });
}

fn format_value(value: &Value) -> String {
    match value {
        Value::Null => "NULL".to_string(),
        Value::Integer(i) => i.to_string(),
        Value::Real(f) => f.to_string(),
        Value::Text(s) => s.clone(),
        Value::Blob(bytes) => format!("x'{}'", hex::encode(bytes)),
    }
}
