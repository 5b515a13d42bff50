//! Error types.
//!
//! One enum per concern, wrapped by [`Error`]. Library code propagates these
//! unchanged; only the binary renders them.

use std::path::PathBuf;

use thiserror::Error;

/// Top-level error type.
#[derive(Error, Debug)]
pub enum Error {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Secret(#[from] SecretError),

    #[error(transparent)]
    Cipher(#[from] CipherError),

    #[error(transparent)]
    Salt(#[from] SaltError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("prompt failed: {0}")]
    Prompt(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}

/// The recipient address or local configuration cannot be determined.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("cannot determine local domain from hostname '{0}'")]
    DomainUnavailable(String),

    #[error("invalid domain '{0}'")]
    InvalidDomain(String),

    #[error("unable to determine home directory")]
    NoHomeDir,

    #[error("failed to read config file: {0}")]
    ReadFile(#[source] std::io::Error),

    #[error("failed to parse config file: {0}")]
    Parse(#[from] toml::de::Error),
}

/// Lookup errors for individual secrets.
#[derive(Error, Debug)]
pub enum SecretError {
    #[error("key not found: {0}")]
    NotFound(String),
}

/// Failures reported by the cryptography engine.
#[derive(Error, Debug)]
pub enum CipherError {
    #[error("encryption engine unavailable: {0}")]
    EngineUnavailable(String),

    #[error("encryption failed: {0}")]
    EncryptionFailed(String),

    #[error("decryption failed: {0}")]
    DecryptionFailed(String),

    #[error("key generation failed: {0}")]
    GenerationFailed(String),

    #[error("failed to list keys: {0}")]
    ListFailed(String),

    #[error("no identity for recipient {0}")]
    NoIdentity(String),
}

/// The salt file exists but cannot be turned back into a usable salt.
#[derive(Error, Debug)]
pub enum SaltError {
    #[error("salt file {path} could not be decrypted: {reason}")]
    Undecryptable { path: PathBuf, reason: String },

    #[error("salt file is malformed: {0}")]
    Malformed(String),

    #[error("salt file uses unsupported format version '{0}'")]
    UnsupportedVersion(String),
}

/// Filesystem failures inside the store directory.
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("failed to create store directory {path}: {source}")]
    CreateDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to write {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to remove {path}: {source}")]
    Remove {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("timed out waiting for store lock {0}")]
    LockTimeout(PathBuf),
}

impl Error {
    /// True when the error means "no record for this key".
    pub fn is_not_found(&self) -> bool {
        matches!(self, Error::Secret(SecretError::NotFound(_)))
    }
}

pub type Result<T> = std::result::Result<T, Error>;
