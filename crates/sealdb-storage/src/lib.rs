// SPDX-FileCopyrightText: 2026 SealDB Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Encrypted SQLite storage with schema bootstrap for SealDB.
//!
//! [`OpenHelper`] opens one SQLCipher database, runs the application's
//! [`SchemaCallbacks`] when the stored schema version differs from the
//! requested one and hands out connections through a [`ConnectionSource`].
//! While a callback runs, the source's special slot makes every connection
//! request from the callback's thread return the bootstrap connection.
//!
//! Queries can be cancelled from another thread with a
//! [`CancellationHook`] when the engine supports it.

pub mod bootstrap;
pub mod cancel;
pub mod cipher;
pub mod connection;
pub mod dao;
pub mod database;
pub mod helper;
pub mod lifecycle;
pub mod schema;
pub mod source;
pub mod table_config;

pub use bootstrap::{BootstrapGuard, run_bootstrap};
pub use cancel::{ApiCompatibility, CancellationHook};
pub use cipher::CipherExtension;
pub use connection::{DatabaseConnection, QueryRows};
pub use dao::{Dao, DaoRegistry};
pub use database::Database;
pub use helper::{HelperOptions, OpenHelper};
pub use lifecycle::LifecycleGuard;
pub use schema::SchemaCallbacks;
pub use source::{ConnectionSource, DatabaseProvider};
pub use table_config::{FieldConfig, TableConfig, TableConfigCache};
