// SPDX-FileCopyrightText: 2026 SealDB Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Use of a helper after it was closed.

use sealdb_core::BootstrapPhase;
use sealdb_storage::OpenHelper;
use sealdb_test_utils::{RecordingSchema, TempDatabase};
use tracing_test::traced_test;

#[test]
#[traced_test]
fn access_after_close_is_logged_and_counted() {
    let temp = TempDatabase::new().unwrap();
    let schema = RecordingSchema::new().create_sql("CREATE TABLE foo (id INTEGER PRIMARY KEY);");
    let log = schema.log();
    let helper = OpenHelper::new(temp.options(1), schema).unwrap();
    helper.writable_database().unwrap();
    helper.close().unwrap();
    assert_eq!(helper.late_accesses(), 0);

    let source = helper.connection_source();
    assert_eq!(helper.late_accesses(), 1);
    assert!(logs_contain("connection source requested after the helper was closed"));

    // Still served: the database is opened again behind the warning.
    let conn = source.read_write_connection("foo").unwrap();
    assert!(logs_contain("connection requested from a closed connection source"));
    assert!(conn.is_table_exists("foo").unwrap());
    assert_eq!(log.count(BootstrapPhase::Open), 2);

    helper.connection_source();
    assert_eq!(helper.late_accesses(), 2);
}

#[test]
#[traced_test]
fn second_close_only_logs() {
    let temp = TempDatabase::new().unwrap();
    let helper = OpenHelper::new(temp.options(1), RecordingSchema::new()).unwrap();
    helper.writable_database().unwrap();

    helper.close().unwrap();
    assert!(!logs_contain("close called on an already closed helper"));
    helper.close().unwrap();
    assert!(logs_contain("close called on an already closed helper"));
    logs_assert(|lines: &[&str]| {
        match lines.iter().filter(|line| line.contains("helper closed")).count() {
            1 => Ok(()),
            n => Err(format!("expected one \"helper closed\" line, saw {n}")),
        }
    });
}

#[test]
#[traced_test]
fn database_access_after_close_is_logged_and_counted() {
    let temp = TempDatabase::new().unwrap();
    let helper = OpenHelper::new(temp.options(1), RecordingSchema::new()).unwrap();
    helper.writable_database().unwrap();
    helper.close().unwrap();

    let db = helper.writable_database().unwrap();
    assert!(db.is_open());
    assert_eq!(helper.late_accesses(), 1);
    assert!(logs_contain("writable database requested after the helper was closed"));

    helper.readable_database().unwrap();
    assert_eq!(helper.late_accesses(), 2);
    assert!(logs_contain("readable database requested after the helper was closed"));
}

#[test]
fn accesses_while_open_are_not_counted() {
    let temp = TempDatabase::new().unwrap();
    let helper = OpenHelper::new(temp.options(1), RecordingSchema::new()).unwrap();
    for _ in 0..3 {
        helper.connection_source();
    }
    assert_eq!(helper.late_accesses(), 0);
    assert!(helper.is_open());
}
