// SPDX-FileCopyrightText: 2026 SealDB Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Test utilities for SealDB integration tests.
//!
//! # Components
//!
//! - [`RecordingSchema`] - Schema callbacks that record every phase and can
//!   be told to run SQL, inspect the connection source or fail
//! - [`TempDatabase`] - A database path inside a temporary directory

pub mod fixture;
pub mod recording;

pub use fixture::TempDatabase;
pub use recording::{CallLog, RecordingSchema};
