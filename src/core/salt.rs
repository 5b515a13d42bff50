//! Store salt.
//!
//! 32 random bytes, generated once per store directory and kept encrypted to
//! the store identity in `<store>/salt`. The decrypted payload is
//! `v1:<64 hex chars>`; the version tag pins the derivation parameters in
//! [`kdf`](crate::core::kdf). A bare hex payload is read as `v1`.
//!
//! Regenerating the salt orphans every existing record, so an unreadable
//! salt file is an error, never a reason to write a new one.

use std::fmt;
use std::path::Path;

use tracing::debug;
use zeroize::Zeroizing;

use crate::core::cipher::CryptoEngine;
use crate::core::constants;
use crate::core::identity::Identity;
use crate::core::store::StoreDir;
use crate::error::{CipherError, Result, SaltError};

/// Salt file format version. Each version fixes a derivation scheme.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SaltVersion {
    /// PBKDF2-HMAC-SHA384, 100,000 iterations, 48-byte output.
    V1,
}

impl SaltVersion {
    pub const CURRENT: SaltVersion = SaltVersion::V1;

    pub fn tag(&self) -> &'static str {
        match self {
            SaltVersion::V1 => "v1",
        }
    }

    fn from_tag(tag: &str) -> std::result::Result<Self, SaltError> {
        match tag {
            "v1" => Ok(SaltVersion::V1),
            other => Err(SaltError::UnsupportedVersion(other.to_string())),
        }
    }
}

/// Decoded salt bytes plus the format they came from.
#[derive(Clone, PartialEq, Eq)]
pub struct Salt {
    version: SaltVersion,
    bytes: Zeroizing<Vec<u8>>,
}

impl fmt::Debug for Salt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Salt")
            .field("version", &self.version)
            .field("bytes", &"<redacted>")
            .finish()
    }
}

impl Salt {
    /// Fresh random salt in the current format.
    ///
    /// # Errors
    ///
    /// Returns `CipherError::GenerationFailed` if the OS random source fails.
    pub fn generate() -> Result<Self> {
        let mut bytes = Zeroizing::new(vec![0u8; constants::SALT_LEN]);
        getrandom::fill(bytes.as_mut_slice())
            .map_err(|e| CipherError::GenerationFailed(format!("random source: {}", e)))?;
        Ok(Self {
            version: SaltVersion::CURRENT,
            bytes,
        })
    }

    /// Wrap raw bytes.
    ///
    /// # Errors
    ///
    /// Returns `SaltError::Malformed` if `bytes` is not exactly 32 bytes.
    pub fn from_bytes(version: SaltVersion, bytes: &[u8]) -> std::result::Result<Self, SaltError> {
        if bytes.len() != constants::SALT_LEN {
            return Err(SaltError::Malformed(format!(
                "expected {} bytes, got {}",
                constants::SALT_LEN,
                bytes.len()
            )));
        }
        Ok(Self {
            version,
            bytes: Zeroizing::new(bytes.to_vec()),
        })
    }

    /// Parse a decrypted salt payload. Surrounding whitespace is ignored.
    ///
    /// # Errors
    ///
    /// Returns `SaltError::UnsupportedVersion` for an unknown tag and
    /// `SaltError::Malformed` for anything that is not 64 hex characters.
    pub fn parse(payload: &str) -> std::result::Result<Self, SaltError> {
        let payload = payload.trim();
        let (version, encoded) = match payload.split_once(':') {
            Some((tag, encoded)) => (SaltVersion::from_tag(tag)?, encoded),
            None => (SaltVersion::V1, payload),
        };

        if encoded.len() != constants::SALT_LEN * 2 {
            return Err(SaltError::Malformed(format!(
                "expected {} hex characters, got {}",
                constants::SALT_LEN * 2,
                encoded.len()
            )));
        }

        let bytes = Zeroizing::new(
            hex::decode(encoded).map_err(|e| SaltError::Malformed(format!("invalid hex: {}", e)))?,
        );
        Self::from_bytes(version, &bytes)
    }

    /// Payload written into the salt file before encryption.
    pub fn encode(&self) -> Zeroizing<String> {
        Zeroizing::new(format!("{}:{}", self.version.tag(), hex::encode(&*self.bytes)))
    }

    pub fn version(&self) -> SaltVersion {
        self.version
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }
}

/// Loads the store salt, creating it on first use.
#[derive(Debug, Clone)]
pub struct SaltManager {
    store: StoreDir,
}

impl SaltManager {
    pub fn new(store: StoreDir) -> Self {
        Self { store }
    }

    /// Return the store salt, generating and publishing it if absent.
    ///
    /// Callers must hold the store lock so two processes cannot both create
    /// a salt.
    ///
    /// # Errors
    ///
    /// Returns `SaltError` if an existing salt file cannot be decrypted or
    /// parsed, and `CipherError` if a new salt cannot be encrypted.
    pub fn ensure<E: CryptoEngine + ?Sized>(&self, engine: &E, identity: &Identity) -> Result<Salt> {
        let path = self.store.salt_path();

        if let Some(raw) = self.store.read(&path)? {
            let salt = Self::open(engine, &path, raw)?;
            debug!(version = salt.version().tag(), "salt loaded");
            return Ok(salt);
        }

        let salt = Salt::generate()?;
        let ciphertext = engine.encrypt(&salt.encode(), &identity.recipient)?;
        self.store.write_atomic(&path, ciphertext.as_bytes())?;

        debug!(path = %path.display(), "salt created");
        Ok(salt)
    }

    fn open<E: CryptoEngine + ?Sized>(engine: &E, path: &Path, raw: Vec<u8>) -> Result<Salt> {
        let undecryptable = |reason: String| SaltError::Undecryptable {
            path: path.to_path_buf(),
            reason,
        };

        let ciphertext = String::from_utf8(raw)
            .map_err(|_| undecryptable("not ASCII-armored ciphertext".to_string()))?;
        let payload = Zeroizing::new(
            engine
                .decrypt(&ciphertext)
                .map_err(|e| undecryptable(e.to_string()))?,
        );
        Ok(Salt::parse(&payload)?)
    }
}
