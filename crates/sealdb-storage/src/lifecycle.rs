// SPDX-FileCopyrightText: 2026 SealDB Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Open/closed tracking for a helper.
//!
//! Hosts may keep calling accessors after they closed the helper. Those
//! calls are not errors: they are reported through a `warn!` carrying a
//! backtrace and counted, and the caller gets the last-known value.

use std::backtrace::Backtrace;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use tracing::warn;

#[derive(Debug)]
pub struct LifecycleGuard {
    open: AtomicBool,
    closing: AtomicBool,
    late_accesses: AtomicU64,
}

impl Default for LifecycleGuard {
    fn default() -> Self {
        Self::new()
    }
}

impl LifecycleGuard {
    pub fn new() -> Self {
        Self {
            open: AtomicBool::new(true),
            closing: AtomicBool::new(false),
            late_accesses: AtomicU64::new(0),
        }
    }

    pub fn is_open(&self) -> bool {
        self.open.load(Ordering::Acquire)
    }

    /// Record an access to `what`. Returns false (after logging) when closed.
    pub fn check_access(&self, what: &str) -> bool {
        if self.is_open() {
            return true;
        }
        self.late_accesses.fetch_add(1, Ordering::Relaxed);
        warn!(
            accessor = what,
            backtrace = %Backtrace::force_capture(),
            "{what} requested after the helper was closed"
        );
        false
    }

    /// Number of accesses recorded after close.
    pub fn late_accesses(&self) -> u64 {
        self.late_accesses.load(Ordering::Relaxed)
    }

    /// Run `release` once and mark the guard closed afterwards.
    ///
    /// Later calls log and return `Ok(())` without running `release`. The
    /// guard is marked closed even if `release` fails.
    pub fn close<E>(&self, release: impl FnOnce() -> Result<(), E>) -> Result<(), E> {
        if self.closing.swap(true, Ordering::AcqRel) {
            warn!("close called on an already closed helper");
            return Ok(());
        }
        let result = release();
        self.open.store(false, Ordering::Release);
        result
    }
}
