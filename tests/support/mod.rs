//! Test support utilities for secret integration tests.
//!
//! Provides isolated environments for driving the `secret` binary.

#![allow(dead_code)]

pub mod assertions;
pub mod commands;
pub mod skip;

#[allow(unused_imports)]
pub use assertions::*;

use std::path::PathBuf;

use tempfile::TempDir;

/// Test environment with isolated temp directories.
///
/// Each test gets its own HOME, store directory and GnuPG home. Child
/// processes receive them through the environment, so tests can safely run
/// in parallel.
pub struct Test {
    /// Temporary home directory
    pub home: TempDir,
    /// Domain used for the recipient address
    pub domain: String,
}

impl Test {
    /// Create a new empty test environment.
    pub fn new() -> Self {
        let home = TempDir::new().expect("failed to create temp home");
        Self {
            home,
            domain: "example.test".to_string(),
        }
    }

    /// Store directory used by commands from this environment.
    pub fn store_dir(&self) -> PathBuf {
        self.home.path().join(".secrets")
    }

    /// GnuPG home used by commands from this environment.
    pub fn gnupg_home(&self) -> PathBuf {
        let dir = self.home.path().join(".gnupg");
        if !dir.exists() {
            std::fs::create_dir_all(&dir).expect("failed to create GnuPG home");
            #[cfg(unix)]
            {
                use std::os::unix::fs::PermissionsExt;
                std::fs::set_permissions(&dir, std::fs::Permissions::from_mode(0o700))
                    .expect("failed to restrict GnuPG home");
            }
        }
        dir
    }

    /// Record files currently in the store.
    pub fn records(&self) -> Vec<PathBuf> {
        match std::fs::read_dir(self.store_dir()) {
            Ok(entries) => entries
                .filter_map(|e| e.ok())
                .map(|e| e.path())
                .filter(|p| p.extension().is_some_and(|ext| ext == "gpg"))
                .collect(),
            Err(_) => Vec::new(),
        }
    }
}
