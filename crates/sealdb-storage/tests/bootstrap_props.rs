// SPDX-FileCopyrightText: 2026 SealDB Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Property tests for the special slot under nesting, failure and panics.

use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

use proptest::prelude::*;
use sealdb_core::{BootstrapPhase, HelperState, SealError};
use sealdb_storage::{
    ApiCompatibility, ConnectionSource, Database, DatabaseProvider, run_bootstrap,
};
use secrecy::SecretString;

/// Always hands out the same in-memory database.
struct FixedProvider(Arc<Database>);

impl DatabaseProvider for FixedProvider {
    fn writable_database(&self, _: &ConnectionSource) -> Result<Arc<Database>, SealError> {
        Ok(self.0.clone())
    }

    fn readable_database(&self, _: &ConnectionSource) -> Result<Arc<Database>, SealError> {
        Ok(self.0.clone())
    }

    fn close_database(&self) -> Result<(), SealError> {
        self.0.close().map(|_| ())
    }

    fn compatibility(&self) -> ApiCompatibility {
        ApiCompatibility::Interruptible
    }
}

fn fixture() -> (ConnectionSource, Arc<Database>) {
    let db = Arc::new(Database::open_in_memory(&SecretString::from("")).unwrap());
    (ConnectionSource::new(Arc::new(FixedProvider(db.clone()))), db)
}

/// Nest `depth` bootstraps, failing at level `fail_at`. Every level checks
/// that it sees the outermost special connection.
fn nest(
    source: &ConnectionSource,
    db: &Arc<Database>,
    depth: usize,
    fail_at: Option<usize>,
) -> Result<(), SealError> {
    let outer = source.special_connection();
    run_bootstrap(source, db, ApiCompatibility::Interruptible, BootstrapPhase::Open, |source| {
        let special = source
            .special_connection()
            .ok_or_else(|| SealError::State("special connection missing".into()))?;
        if let Some(outer) = &outer
            && !outer.same_as(&special)
        {
            return Err(SealError::State("nested bootstrap replaced the connection".into()));
        }
        if !source.read_write_connection("t")?.same_as(&special) {
            return Err(SealError::State("request bypassed the special connection".into()));
        }
        if fail_at == Some(depth) {
            return Err(SealError::Cancelled);
        }
        if depth > 1 {
            nest(source, db, depth - 1, fail_at)?;
        }
        Ok(())
    })
}

proptest! {
    #[test]
    fn slot_is_cleared_after_any_nesting(depth in 1usize..6, fail in proptest::option::of(1usize..6)) {
        let (source, db) = fixture();
        let result = nest(&source, &db, depth, fail);

        let should_fail = fail.is_some_and(|level| level <= depth);
        match result {
            Ok(()) => prop_assert!(!should_fail),
            Err(SealError::Cancelled) => prop_assert!(should_fail),
            Err(other) => prop_assert!(false, "unexpected error {other:?}"),
        }
        prop_assert!(source.special_connection().is_none());
        prop_assert_eq!(source.state(), HelperState::Normal);
    }
}

#[test]
fn slot_is_cleared_after_panic() {
    let (source, db) = fixture();
    let outcome = panic::catch_unwind(AssertUnwindSafe(|| {
        run_bootstrap(&source, &db, ApiCompatibility::Interruptible, BootstrapPhase::Create, |_| -> Result<(), SealError> {
            panic!("callback panicked")
        })
    }));
    assert!(outcome.is_err());
    assert!(source.special_connection().is_none());

    // The slot can be taken again.
    run_bootstrap(&source, &db, ApiCompatibility::Interruptible, BootstrapPhase::Open, |source| {
        assert!(source.special_connection().is_some());
        Ok(())
    })
    .unwrap();
}
