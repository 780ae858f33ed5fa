// SPDX-FileCopyrightText: 2026 SealDB Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `sealdb rekey` command implementation.

use std::path::Path;

use sealdb_config::model::SealdbConfig;
use sealdb_core::SealError;
use tracing::info;

use crate::open_helper;

/// Re-encrypt the configured database with the password in `password_file`.
///
/// Trailing newlines are stripped from the file.
pub fn run_rekey(config: &SealdbConfig, password_file: &Path) -> Result<(), SealError> {
    let content = std::fs::read_to_string(password_file)
        .map_err(|e| SealError::resource_open(password_file.display().to_string(), e))?;
    let password = content.trim_end_matches(['\r', '\n']).to_string();

    let helper = open_helper(config)?;
    helper.change_password(password)?;
    helper.close()?;
    info!(path = %config.database.path, "database re-encrypted");
    println!("re-encrypted {}", config.database.path);
    Ok(())
}
