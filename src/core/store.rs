//! Store directory.
//!
//! Owns the on-disk layout: an owner-only directory holding the salt file,
//! the lock file and one `<derived-id>.gpg` record per secret. Every write
//! goes through [`StoreDir::write_atomic`], so readers see either the old
//! file or the new one, never a partial write.

use std::fs::{self, File, OpenOptions};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use crate::core::constants;
use crate::core::kdf::DerivedId;
use crate::error::{Result, StoreError};

/// Handle on a store directory.
#[derive(Debug, Clone)]
pub struct StoreDir {
    root: PathBuf,
}

impl StoreDir {
    /// Handle for `root`. Does not touch the filesystem.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Create the directory if needed and restrict it to the owner.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::CreateDir` if the directory cannot be created or
    /// its permissions cannot be set.
    pub fn ensure(&self) -> Result<()> {
        fs::create_dir_all(&self.root).map_err(|source| StoreError::CreateDir {
            path: self.root.clone(),
            source,
        })?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;

            let mode = fs::metadata(&self.root)
                .map(|m| m.permissions().mode() & 0o777)
                .unwrap_or(0);
            if mode != 0o700 {
                debug!(path = %self.root.display(), mode = %format!("{:o}", mode), "tightening store permissions");
                fs::set_permissions(&self.root, fs::Permissions::from_mode(0o700)).map_err(
                    |source| StoreError::CreateDir {
                        path: self.root.clone(),
                        source,
                    },
                )?;
            }
        }

        Ok(())
    }

    pub fn path(&self) -> &Path {
        &self.root
    }

    pub fn salt_path(&self) -> PathBuf {
        self.root.join(constants::SALT_FILE)
    }

    pub fn lock_path(&self) -> PathBuf {
        self.root.join(constants::LOCK_FILE)
    }

    /// Record file for a derived identifier.
    pub fn record_path(&self, id: &DerivedId) -> PathBuf {
        self.root
            .join(format!("{}.{}", id.as_str(), constants::RECORD_EXT))
    }

    /// Number of secret records currently in the directory.
    pub fn record_count(&self) -> Result<usize> {
        let entries = match fs::read_dir(&self.root) {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(0),
            Err(source) => {
                return Err(StoreError::Read {
                    path: self.root.clone(),
                    source,
                }
                .into())
            }
        };

        Ok(entries
            .filter_map(|e| e.ok())
            .filter(|e| {
                e.path()
                    .extension()
                    .is_some_and(|ext| ext == constants::RECORD_EXT)
            })
            .count())
    }

    /// Read a file's raw bytes, `None` if it does not exist.
    ///
    /// Callers decide what non-text content means for their file.
    pub fn read(&self, path: &Path) -> Result<Option<Vec<u8>>> {
        match fs::read(path) {
            Ok(contents) => Ok(Some(contents)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(source) => Err(StoreError::Read {
                path: path.to_path_buf(),
                source,
            }
            .into()),
        }
    }

    /// Delete a file. Returns whether it existed.
    pub fn remove(&self, path: &Path) -> Result<bool> {
        match fs::remove_file(path) {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
            Err(source) => Err(StoreError::Remove {
                path: path.to_path_buf(),
                source,
            }
            .into()),
        }
    }

    /// Publish `data` at `path` atomically.
    ///
    /// Writes a randomly named sibling (mode 0600 on Unix), syncs it, renames
    /// it over `path`, then syncs the directory. On failure the temporary
    /// file is removed and `path` is left as it was.
    pub fn write_atomic(&self, path: &Path, data: &[u8]) -> Result<()> {
        let write_err = |source| StoreError::Write {
            path: path.to_path_buf(),
            source,
        };

        let tmp_path = tmp_sibling(path).map_err(write_err)?;

        if let Err(e) = write_new(&tmp_path, data) {
            let _ = fs::remove_file(&tmp_path);
            return Err(write_err(e).into());
        }

        if let Err(e) = fs::rename(&tmp_path, path) {
            let _ = fs::remove_file(&tmp_path);
            return Err(write_err(e).into());
        }

        if let Some(parent) = path.parent() {
            if let Err(e) = File::open(parent).and_then(|dir| dir.sync_all()) {
                warn!(path = %parent.display(), error = %e, "failed to sync store directory");
            }
        }

        Ok(())
    }
}

/// `<name>.tmp.<16 hex chars>` next to `path`.
fn tmp_sibling(path: &Path) -> std::io::Result<PathBuf> {
    let mut buf = [0u8; 8];
    getrandom::fill(&mut buf).map_err(|e| std::io::Error::new(ErrorKind::Other, e.to_string()))?;

    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();

    Ok(path.with_file_name(format!(".{}.tmp.{}", file_name, hex::encode(buf))))
}

fn write_new(path: &Path, data: &[u8]) -> std::io::Result<()> {
    let mut options = OpenOptions::new();
    options.write(true).create_new(true);

    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        options.mode(0o600);
    }

    let mut file = options.open(path)?;
    file.write_all(data)?;
    file.sync_all()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_ensure_creates_owner_only_dir() {
        let tmp = tempdir().unwrap();
        let store = StoreDir::new(tmp.path().join("a").join(".secrets"));
        store.ensure().unwrap();
        assert!(store.path().is_dir());

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let mode = fs::metadata(store.path()).unwrap().permissions().mode() & 0o777;
            assert_eq!(mode, 0o700);
        }
    }

    #[cfg(unix)]
    #[test]
    fn test_ensure_tightens_existing_dir() {
        use std::os::unix::fs::PermissionsExt;

        let tmp = tempdir().unwrap();
        let root = tmp.path().join(".secrets");
        fs::create_dir(&root).unwrap();
        fs::set_permissions(&root, fs::Permissions::from_mode(0o755)).unwrap();

        StoreDir::new(&root).ensure().unwrap();
        let mode = fs::metadata(&root).unwrap().permissions().mode() & 0o777;
        assert_eq!(mode, 0o700);
    }

    #[test]
    fn test_write_atomic_replaces_and_cleans_up() {
        let tmp = tempdir().unwrap();
        let store = StoreDir::new(tmp.path());
        let path = tmp.path().join("record.gpg");

        store.write_atomic(&path, b"first").unwrap();
        store.write_atomic(&path, b"second").unwrap();

        assert_eq!(fs::read(&path).unwrap(), b"second");
        let entries: Vec<_> = fs::read_dir(tmp.path())
            .unwrap()
            .map(|e| e.unwrap().file_name())
            .collect();
        assert_eq!(entries, vec![std::ffi::OsString::from("record.gpg")]);
    }

    #[cfg(unix)]
    #[test]
    fn test_written_files_are_private() {
        use std::os::unix::fs::PermissionsExt;

        let tmp = tempdir().unwrap();
        let store = StoreDir::new(tmp.path());
        let path = tmp.path().join("salt");
        store.write_atomic(&path, b"x").unwrap();

        let mode = fs::metadata(&path).unwrap().permissions().mode() & 0o777;
        assert_eq!(mode, 0o600);
    }

    #[test]
    fn test_write_into_missing_dir_fails_without_residue() {
        let tmp = tempdir().unwrap();
        let store = StoreDir::new(tmp.path());
        let path = tmp.path().join("missing").join("record.gpg");

        assert!(store.write_atomic(&path, b"x").is_err());
        assert!(!path.exists());
    }

    #[test]
    fn test_read_and_remove_missing() {
        let tmp = tempdir().unwrap();
        let store = StoreDir::new(tmp.path());
        let path = tmp.path().join("nope.gpg");

        assert!(store.read(&path).unwrap().is_none());
        assert!(!store.remove(&path).unwrap());
    }

    #[test]
    fn test_read_returns_binary_content() {
        let tmp = tempdir().unwrap();
        let store = StoreDir::new(tmp.path());
        let path = tmp.path().join("blob.gpg");
        fs::write(&path, [0xff, 0xfe, 0x00, 0x80]).unwrap();

        assert_eq!(store.read(&path).unwrap(), Some(vec![0xff, 0xfe, 0x00, 0x80]));
    }

    #[test]
    fn test_record_count_only_counts_records() {
        let tmp = tempdir().unwrap();
        let store = StoreDir::new(tmp.path());
        store.write_atomic(&store.salt_path(), b"salt").unwrap();
        store
            .write_atomic(&tmp.path().join("aa.gpg"), b"1")
            .unwrap();
        store
            .write_atomic(&tmp.path().join("bb.gpg"), b"2")
            .unwrap();

        assert_eq!(store.record_count().unwrap(), 2);
        assert_eq!(StoreDir::new(tmp.path().join("none")).record_count().unwrap(), 0);
    }

    #[test]
    fn test_tmp_sibling_is_unique_and_adjacent() {
        let path = Path::new("/tmp/store/salt");
        let a = tmp_sibling(path).unwrap();
        let b = tmp_sibling(path).unwrap();
        assert_ne!(a, b);
        assert_eq!(a.parent(), path.parent());
    }
}
