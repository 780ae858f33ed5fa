// SPDX-FileCopyrightText: 2026 SealDB Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Error types for the SealDB database helper.

use thiserror::Error;

use crate::types::BootstrapPhase;

/// Boxed error source carried by the wrapping variants.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// The primary error type returned by every SealDB operation.
#[derive(Debug, Error)]
pub enum SealError {
    /// Invalid runtime configuration (bad version number, empty path).
    #[error("configuration error: {0}")]
    Config(String),

    /// The table configuration source is malformed. Fatal at construction:
    /// DAOs cannot be built correctly afterwards.
    #[error("could not load table configuration: {message}")]
    ConfigLoad {
        message: String,
        source: Option<BoxError>,
    },

    /// An internal invariant was violated (special slot already taken,
    /// recursive open, reused cancellation hook, refused downgrade).
    #[error("invalid state: {0}")]
    State(String),

    /// The engine cannot perform the requested operation.
    #[error("unsupported operation: {0}")]
    Unsupported(String),

    /// A file or resource could not be opened (or keyed).
    #[error("could not open {path}: {source}")]
    ResourceOpen { path: String, source: BoxError },

    /// The query was interrupted through its cancellation hook.
    #[error("query cancelled")]
    Cancelled,

    /// Any other failure reported by the underlying engine.
    #[error("storage error: {source}")]
    Storage { source: BoxError },

    /// A user create/upgrade/downgrade/open callback failed.
    #[error("{phase} callback failed: {source}")]
    Callback {
        phase: BootstrapPhase,
        source: BoxError,
    },
}

impl SealError {
    /// Wrap an arbitrary error as [`SealError::Storage`].
    pub fn storage(err: impl Into<BoxError>) -> Self {
        SealError::Storage { source: err.into() }
    }

    /// Wrap an error as [`SealError::ResourceOpen`] with the path or id that failed.
    pub fn resource_open(path: impl Into<String>, err: impl Into<BoxError>) -> Self {
        SealError::ResourceOpen {
            path: path.into(),
            source: err.into(),
        }
    }

    /// Returns true if this error is a cancellation.
    pub fn is_cancelled(&self) -> bool {
        matches!(self, SealError::Cancelled)
    }
}
