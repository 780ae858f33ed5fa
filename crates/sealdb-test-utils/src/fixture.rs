// SPDX-FileCopyrightText: 2026 SealDB Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Temporary database files.

use std::path::{Path, PathBuf};

use sealdb_core::SealError;
use sealdb_storage::HelperOptions;
use tempfile::TempDir;

/// A database path in a directory removed on drop.
pub struct TempDatabase {
    dir: TempDir,
    path: PathBuf,
}

impl TempDatabase {
    pub fn new() -> Result<Self, SealError> {
        Self::named("test.db")
    }

    pub fn named(file_name: &str) -> Result<Self, SealError> {
        let dir = TempDir::new().map_err(SealError::storage)?;
        let path = dir.path().join(file_name);
        Ok(Self { dir, path })
    }

    /// Path of the database file. The file does not exist until opened.
    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn dir(&self) -> &Path {
        self.dir.path()
    }

    /// Unencrypted helper options for this file.
    pub fn options(&self, version: i32) -> HelperOptions {
        HelperOptions::new(&self.path, version)
    }

    /// Encrypted helper options for this file.
    pub fn encrypted_options(&self, version: i32, password: &str) -> HelperOptions {
        self.options(version).password(password)
    }

    pub fn exists(&self) -> bool {
        self.path.exists()
    }
}
