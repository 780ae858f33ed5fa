// SPDX-FileCopyrightText: 2026 SealDB Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Common types shared by the helper, the connection source and the CLI.

use std::fmt;

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// Bootstrap state of a database helper.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
pub enum HelperState {
    /// Connections are served by the regular acquisition path.
    Normal,
    /// A create/upgrade callback is running and owns the special slot.
    Bootstrapping,
}

/// Which schema callback a bootstrap is running.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BootstrapPhase {
    Create,
    Upgrade { old_version: i32, new_version: i32 },
    Downgrade { old_version: i32, new_version: i32 },
    Open,
}

impl BootstrapPhase {
    /// Pick the phase for a stored version versus the requested version.
    ///
    /// Returns `None` when the versions match and no schema work is needed.
    pub fn for_versions(stored: i32, requested: i32) -> Option<Self> {
        if stored == requested {
            None
        } else if stored == 0 {
            Some(BootstrapPhase::Create)
        } else if stored < requested {
            Some(BootstrapPhase::Upgrade {
                old_version: stored,
                new_version: requested,
            })
        } else {
            Some(BootstrapPhase::Downgrade {
                old_version: stored,
                new_version: requested,
            })
        }
    }
}

impl fmt::Display for BootstrapPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BootstrapPhase::Create => write!(f, "create"),
            BootstrapPhase::Upgrade {
                old_version,
                new_version,
            } => write!(f, "upgrade {old_version} -> {new_version}"),
            BootstrapPhase::Downgrade {
                old_version,
                new_version,
            } => write!(f, "downgrade {old_version} -> {new_version}"),
            BootstrapPhase::Open => write!(f, "open"),
        }
    }
}

/// Health status reported by a helper.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HealthStatus {
    /// The database is open and answers queries.
    Healthy,
    /// The helper works but something is off (e.g. used after close).
    Degraded(String),
    /// The database cannot be reached.
    Unhealthy(String),
}
