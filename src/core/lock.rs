//! Bootstrap lock.
//!
//! An exclusively created lock file inside the store directory. It is held
//! while the identity and salt are ensured, so concurrent first runs cannot
//! both generate a key or both write a salt. Released on drop.
//!
//! A lock file older than [`constants::LOCK_STALE_SECS`] is treated as left
//! behind by a crashed process and broken.

use std::fs::{self, OpenOptions};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::thread;
use std::time::{Duration, SystemTime};

use tracing::{debug, warn};

use crate::core::constants;
use crate::error::{Result, StoreError};

const POLL_INTERVAL: Duration = Duration::from_millis(50);

/// Held lock on a store directory.
#[derive(Debug)]
pub struct StoreLock {
    path: PathBuf,
}

impl StoreLock {
    /// Acquire the lock at `path`, waiting up to `timeout`.
    ///
    /// A lock file older than ten minutes is assumed abandoned and removed.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::LockTimeout` if the lock stays held for the whole
    /// timeout, or `StoreError::Write` if the lock file cannot be created.
    pub fn acquire(path: &Path, timeout: Duration) -> Result<Self> {
        Self::acquire_with_staleness(
            path,
            timeout,
            Duration::from_secs(constants::LOCK_STALE_SECS),
        )
    }

    fn acquire_with_staleness(path: &Path, timeout: Duration, stale_after: Duration) -> Result<Self> {
        let started = SystemTime::now();

        loop {
            match OpenOptions::new().write(true).create_new(true).open(path) {
                Ok(mut file) => {
                    // Holder pid is informational only.
                    let _ = writeln!(file, "{}", std::process::id());
                    debug!(path = %path.display(), "store lock acquired");
                    return Ok(Self {
                        path: path.to_path_buf(),
                    });
                }
                Err(e) if e.kind() == ErrorKind::AlreadyExists => {
                    if is_stale(path, stale_after) && break_stale(path, stale_after) {
                        continue;
                    }
                }
                Err(source) => {
                    return Err(StoreError::Write {
                        path: path.to_path_buf(),
                        source,
                    }
                    .into())
                }
            }

            let waited = started.elapsed().unwrap_or_default();
            if waited >= timeout {
                return Err(StoreError::LockTimeout(path.to_path_buf()).into());
            }
            thread::sleep(POLL_INTERVAL.min(timeout - waited));
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for StoreLock {
    fn drop(&mut self) {
        if let Err(e) = fs::remove_file(&self.path) {
            if e.kind() != ErrorKind::NotFound {
                warn!(path = %self.path.display(), error = %e, "failed to release store lock");
            }
        } else {
            debug!(path = %self.path.display(), "store lock released");
        }
    }
}

/// Remove an abandoned lock file. Returns whether `path` may now be free.
///
/// The lock is renamed to a unique name before deletion and its age is
/// checked again on the renamed file. A lock created by another process
/// after the first staleness check is linked back into place instead.
fn break_stale(path: &Path, stale_after: Duration) -> bool {
    let grave = match grave_path(path) {
        Ok(grave) => grave,
        Err(e) => {
            warn!(path = %path.display(), error = %e, "cannot name stale store lock");
            return false;
        }
    };

    match fs::rename(path, &grave) {
        Ok(()) => {}
        // Another waiter already broke it.
        Err(e) if e.kind() == ErrorKind::NotFound => return true,
        Err(e) => {
            warn!(path = %path.display(), error = %e, "failed to move stale store lock");
            return false;
        }
    }

    if !is_stale(&grave, stale_after) {
        debug!(path = %path.display(), "store lock was renewed; restoring it");
        if let Err(e) = fs::hard_link(&grave, path) {
            warn!(path = %path.display(), error = %e, "failed to restore store lock");
        }
        if let Err(e) = fs::remove_file(&grave) {
            warn!(path = %grave.display(), error = %e, "failed to remove moved store lock");
        }
        return false;
    }

    warn!(path = %path.display(), "removed stale store lock");
    if let Err(e) = fs::remove_file(&grave) {
        warn!(path = %grave.display(), error = %e, "failed to remove stale store lock");
    }
    true
}

/// `<name>.stale.<16 hex chars>` next to `path`.
fn grave_path(path: &Path) -> std::io::Result<PathBuf> {
    let mut buf = [0u8; 8];
    getrandom::fill(&mut buf).map_err(|e| std::io::Error::new(ErrorKind::Other, e.to_string()))?;

    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    Ok(path.with_file_name(format!("{}.stale.{}", name, hex::encode(buf))))
}

fn is_stale(path: &Path, stale_after: Duration) -> bool {
    fs::metadata(path)
        .and_then(|m| m.modified())
        .ok()
        .and_then(|modified| modified.elapsed().ok())
        .is_some_and(|age| age >= stale_after)
}
