// SPDX-FileCopyrightText: 2026 SealDB Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Core types for SealDB.
//!
//! This crate provides the error taxonomy and the small set of value types
//! shared by the storage layer, the configuration system and the CLI.

pub mod error;
pub mod types;

pub use error::{BoxError, SealError};
pub use types::{BootstrapPhase, HealthStatus, HelperState};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn seal_error_has_all_variants() {
        let _config = SealError::Config("test".into());
        let _load = SealError::ConfigLoad {
            message: "test".into(),
            source: None,
        };
        let _state = SealError::State("test".into());
        let _unsupported = SealError::Unsupported("test".into());
        let _open = SealError::resource_open("/tmp/x", std::io::Error::other("test"));
        let _cancelled = SealError::Cancelled;
        let _storage = SealError::storage(std::io::Error::other("test"));
        let _callback = SealError::Callback {
            phase: BootstrapPhase::Create,
            source: Box::new(std::io::Error::other("test")),
        };
    }

    #[test]
    fn resource_open_message_names_the_path() {
        let err = SealError::resource_open("/data/app.db", std::io::Error::other("denied"));
        let msg = err.to_string();
        assert!(msg.contains("/data/app.db"), "got: {msg}");
        assert!(msg.contains("denied"), "got: {msg}");
    }

    #[test]
    fn only_cancelled_reports_is_cancelled() {
        assert!(SealError::Cancelled.is_cancelled());
        assert!(!SealError::State("x".into()).is_cancelled());
    }

    #[test]
    fn phase_for_versions() {
        assert_eq!(BootstrapPhase::for_versions(3, 3), None);
        assert_eq!(
            BootstrapPhase::for_versions(0, 2),
            Some(BootstrapPhase::Create)
        );
        assert_eq!(
            BootstrapPhase::for_versions(1, 2),
            Some(BootstrapPhase::Upgrade {
                old_version: 1,
                new_version: 2
            })
        );
        assert_eq!(
            BootstrapPhase::for_versions(4, 2),
            Some(BootstrapPhase::Downgrade {
                old_version: 4,
                new_version: 2
            })
        );
    }

    #[test]
    fn phase_display() {
        let upgrade = BootstrapPhase::Upgrade {
            old_version: 1,
            new_version: 2,
        };
        assert_eq!(upgrade.to_string(), "upgrade 1 -> 2");
        assert_eq!(BootstrapPhase::Create.to_string(), "create");
    }

    #[test]
    fn helper_state_round_trips() {
        use std::str::FromStr;

        for state in [HelperState::Normal, HelperState::Bootstrapping] {
            let parsed = HelperState::from_str(&state.to_string()).expect("should parse back");
            assert_eq!(state, parsed);
        }
        let json = serde_json::to_string(&HelperState::Bootstrapping).expect("should serialize");
        assert_eq!(json, "\"Bootstrapping\"");
    }
}
