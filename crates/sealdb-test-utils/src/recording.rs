// SPDX-FileCopyrightText: 2026 SealDB Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Scriptable schema callbacks for deterministic tests.

use std::collections::HashSet;
use std::sync::{Arc, Mutex, PoisonError};

use sealdb_core::{BootstrapPhase, BoxError};
use sealdb_storage::{ConnectionSource, SchemaCallbacks};
use tracing::debug;

type Inspector = dyn Fn(BootstrapPhase, &ConnectionSource) -> Result<(), BoxError> + Send + Sync;

/// Shared record of the phases a [`RecordingSchema`] ran.
///
/// The schema is moved into the helper, so tests keep a `CallLog` to look
/// at afterwards.
#[derive(Debug, Clone, Default)]
pub struct CallLog {
    phases: Arc<Mutex<Vec<BootstrapPhase>>>,
}

impl CallLog {
    fn push(&self, phase: BootstrapPhase) {
        self.phases
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(phase);
    }

    /// Phases in call order.
    pub fn phases(&self) -> Vec<BootstrapPhase> {
        self.phases
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn count(&self, phase: BootstrapPhase) -> usize {
        self.phases().into_iter().filter(|p| *p == phase).count()
    }

    pub fn clear(&self) {
        self.phases
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }
}

/// Schema callbacks that record, run SQL and optionally fail.
///
/// Each callback records its phase, runs the inspector, runs the phase's
/// SQL through the connection source and then fails if asked to.
#[derive(Default)]
pub struct RecordingSchema {
    log: CallLog,
    create_sql: Option<String>,
    upgrade_sql: Option<String>,
    open_sql: Option<String>,
    fail: HashSet<&'static str>,
    inspector: Option<Box<Inspector>>,
}

impl RecordingSchema {
    pub fn new() -> Self {
        Self::default()
    }

    /// The log shared with this schema.
    pub fn log(&self) -> CallLog {
        self.log.clone()
    }

    pub fn create_sql(mut self, sql: impl Into<String>) -> Self {
        self.create_sql = Some(sql.into());
        self
    }

    pub fn upgrade_sql(mut self, sql: impl Into<String>) -> Self {
        self.upgrade_sql = Some(sql.into());
        self
    }

    pub fn open_sql(mut self, sql: impl Into<String>) -> Self {
        self.open_sql = Some(sql.into());
        self
    }

    pub fn fail_on_create(mut self) -> Self {
        self.fail.insert("create");
        self
    }

    pub fn fail_on_upgrade(mut self) -> Self {
        self.fail.insert("upgrade");
        self
    }

    pub fn fail_on_open(mut self) -> Self {
        self.fail.insert("open");
        self
    }

    /// Run `f` at the start of every callback.
    pub fn inspect(
        mut self,
        f: impl Fn(BootstrapPhase, &ConnectionSource) -> Result<(), BoxError> + Send + Sync + 'static,
    ) -> Self {
        self.inspector = Some(Box::new(f));
        self
    }

    fn run(
        &self,
        phase: BootstrapPhase,
        kind: &'static str,
        sql: Option<&str>,
        source: &ConnectionSource,
    ) -> Result<(), BoxError> {
        debug!(%phase, "schema callback");
        self.log.push(phase);
        if let Some(inspector) = &self.inspector {
            inspector(phase, source)?;
        }
        if let Some(sql) = sql {
            source.read_write_connection("schema")?.execute_batch(sql)?;
        }
        if self.fail.contains(kind) {
            return Err(format!("injected failure during {phase}").into());
        }
        Ok(())
    }
}

impl SchemaCallbacks for RecordingSchema {
    fn on_create(&self, source: &ConnectionSource) -> Result<(), BoxError> {
        self.run(BootstrapPhase::Create, "create", self.create_sql.as_deref(), source)
    }

    fn on_upgrade(
        &self,
        source: &ConnectionSource,
        old_version: i32,
        new_version: i32,
    ) -> Result<(), BoxError> {
        let phase = BootstrapPhase::Upgrade {
            old_version,
            new_version,
        };
        self.run(phase, "upgrade", self.upgrade_sql.as_deref(), source)
    }

    fn on_open(&self, source: &ConnectionSource) -> Result<(), BoxError> {
        self.run(BootstrapPhase::Open, "open", self.open_sql.as_deref(), source)
    }
}
