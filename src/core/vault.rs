//! Secret store.
//!
//! The primary interface: get, set and remove secrets by lookup key. Every
//! operation first ensures the identity and salt under the store lock, then
//! works on the single record file named by the derived identifier.

use std::path::PathBuf;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::debug;
use zeroize::Zeroizing;

use crate::core::cipher::{CryptoEngine, Gpg};
use crate::core::config::Config;
use crate::core::constants;
use crate::core::identity::{Identity, IdentityManager};
use crate::core::kdf::{self, DerivedId};
use crate::core::lock::StoreLock;
use crate::core::salt::{Salt, SaltManager};
use crate::core::store::StoreDir;
use crate::error::{CipherError, Result, SecretError};

/// Identity and salt of an initialized store.
#[derive(Debug, Clone)]
pub struct Session {
    pub identity: Identity,
    pub salt: Salt,
}

/// Summary for `secret info`.
#[derive(Debug, Clone, Serialize)]
pub struct StoreInfo {
    pub store_dir: PathBuf,
    pub engine: &'static str,
    pub recipient: String,
    pub name: String,
    pub fingerprint: String,
    pub user_ids: Vec<String>,
    pub created: Option<DateTime<Utc>>,
    pub expires: Option<DateTime<Utc>>,
    pub expired: bool,
    pub salt_version: &'static str,
    pub records: usize,
}

/// Encrypted secret store over a directory and a cryptography engine.
pub struct SecretStore<E: CryptoEngine> {
    engine: E,
    dir: StoreDir,
    identities: IdentityManager,
    salts: SaltManager,
    lock_timeout: Duration,
}

impl<E: CryptoEngine> std::fmt::Debug for SecretStore<E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SecretStore")
            .field("engine", &self.engine.name())
            .field("dir", &self.dir.path())
            .field("recipient", &self.identities.recipient())
            .finish()
    }
}

impl SecretStore<Gpg> {
    /// Store configured from `config`, using the gpg CLI.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if the recipient or store directory cannot be
    /// resolved.
    pub fn from_config(config: &Config) -> Result<Self> {
        let engine = Gpg::new(config.gpg_program(), config.gpg.home.clone());
        let identities = IdentityManager::from_config(config)?;
        Ok(Self::new(engine, config.store_dir()?, identities).with_lock_timeout(config.lock_timeout()))
    }
}

impl<E: CryptoEngine> SecretStore<E> {
    /// Store at `dir` using `engine`. Nothing touches disk until the first
    /// operation.
    pub fn new(engine: E, dir: impl Into<PathBuf>, identities: IdentityManager) -> Self {
        let dir = StoreDir::new(dir);
        Self {
            engine,
            salts: SaltManager::new(dir.clone()),
            dir,
            identities,
            lock_timeout: Duration::from_secs(constants::LOCK_TIMEOUT_SECS),
        }
    }

    pub fn with_lock_timeout(mut self, timeout: Duration) -> Self {
        self.lock_timeout = timeout;
        self
    }

    pub fn dir(&self) -> &StoreDir {
        &self.dir
    }

    /// Bring the store to the initialized state: directory, identity, salt.
    ///
    /// Idempotent. The store lock is held for the identity and salt steps
    /// and released before returning.
    ///
    /// # Errors
    ///
    /// Returns `StoreError` for directory or lock failures, `CipherError` if
    /// the identity cannot be listed or generated, and `SaltError` if an
    /// existing salt is unusable.
    pub fn ensure(&self) -> Result<Session> {
        self.dir.ensure()?;

        let _lock = StoreLock::acquire(&self.dir.lock_path(), self.lock_timeout)?;
        let identity = self.identities.ensure(&self.engine)?;
        let salt = self.salts.ensure(&self.engine, &identity)?;

        Ok(Session { identity, salt })
    }

    /// Record file a lookup key maps to. Initializes the store if needed.
    pub fn record_path(&self, key: &str) -> Result<PathBuf> {
        let session = self.ensure()?;
        Ok(self.dir.record_path(&self.derive(key, &session)))
    }

    /// Decrypt the secret stored under `key`.
    ///
    /// # Errors
    ///
    /// Returns `SecretError::NotFound` if no record exists and `CipherError`
    /// if the record cannot be decrypted.
    pub fn get(&self, key: &str) -> Result<Zeroizing<String>> {
        let session = self.ensure()?;
        let path = self.dir.record_path(&self.derive(key, &session));

        let raw = self
            .dir
            .read(&path)?
            .ok_or_else(|| SecretError::NotFound(key.to_string()))?;
        let ciphertext = String::from_utf8(raw).map_err(|_| {
            CipherError::DecryptionFailed("record is not ASCII-armored ciphertext".to_string())
        })?;

        let value = Zeroizing::new(self.engine.decrypt(&ciphertext)?);
        debug!("secret decrypted");
        Ok(value)
    }

    /// Encrypt `value` under `key`, replacing any existing record.
    ///
    /// The ciphertext is complete before the record is published, so a
    /// failed encryption leaves the previous record untouched.
    ///
    /// # Errors
    ///
    /// Returns `CipherError` if encryption fails and `StoreError` if the
    /// record cannot be written.
    pub fn set(&self, key: &str, value: &str) -> Result<()> {
        let session = self.ensure()?;
        let path = self.dir.record_path(&self.derive(key, &session));

        let ciphertext = self.engine.encrypt(value, &session.identity.recipient)?;
        self.dir.write_atomic(&path, ciphertext.as_bytes())?;

        debug!("secret stored");
        Ok(())
    }

    /// Delete the record for `key`. Returns whether one existed; a missing
    /// record is not an error.
    pub fn remove(&self, key: &str) -> Result<bool> {
        let session = self.ensure()?;
        let path = self.dir.record_path(&self.derive(key, &session));

        let removed = self.dir.remove(&path)?;
        debug!(removed, "secret removed");
        Ok(removed)
    }

    /// Identity, salt format and record count of the store.
    pub fn info(&self) -> Result<StoreInfo> {
        let Session { identity, salt } = self.ensure()?;
        Ok(StoreInfo {
            store_dir: self.dir.path().to_path_buf(),
            engine: self.engine.name(),
            expired: identity.is_expired(Utc::now()),
            recipient: identity.recipient,
            name: self.identities.name().to_string(),
            fingerprint: identity.fingerprint,
            user_ids: identity.user_ids,
            created: identity.created,
            expires: identity.expires,
            salt_version: salt.version().tag(),
            records: self.dir.record_count()?,
        })
    }

    fn derive(&self, key: &str, session: &Session) -> DerivedId {
        kdf::derive(key, &session.salt)
    }
}
