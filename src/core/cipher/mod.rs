//! Cryptography engine abstraction.
//!
//! The store never touches key material directly. It consumes an engine
//! through four primitives: list identities, generate an identity, encrypt
//! to a recipient, and decrypt with whatever private key the engine holds.
//!
//! ## Backends
//!
//! - **gpg**: Default. Drives the `gpg` CLI against the user's keyring.
//! - **memory**: age x25519 keys held in process memory. Nothing persists
//!   beyond the engine value; used by tests and embedders.

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::error::Result;

pub mod gpg;
pub mod memory;

pub use gpg::Gpg;
pub use memory::MemoryEngine;

/// Public key algorithm requested at generation time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyAlgorithm {
    Rsa,
}

impl KeyAlgorithm {
    /// Name as understood by GnuPG parameter files.
    pub fn as_str(&self) -> &'static str {
        match self {
            KeyAlgorithm::Rsa => "RSA",
        }
    }
}

/// Parameters for a new identity: primary key plus an encryption subkey.
#[derive(Debug, Clone)]
pub struct KeySpec {
    pub name: String,
    pub email: String,
    pub key_type: KeyAlgorithm,
    pub key_length: u32,
    pub subkey_type: KeyAlgorithm,
    pub subkey_length: u32,
    /// Applied to both the primary key and the subkey.
    pub expires: DateTime<Utc>,
}

/// A key as reported by the engine's key listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct KeyInfo {
    pub fingerprint: String,
    pub user_ids: Vec<String>,
    pub created: Option<DateTime<Utc>>,
    pub expires: Option<DateTime<Utc>>,
}

impl KeyInfo {
    /// True if any user id carries `email` as its address.
    pub fn matches_email(&self, email: &str) -> bool {
        let bracketed = format!("<{}>", email);
        self.user_ids
            .iter()
            .any(|uid| uid == email || uid.contains(&bracketed))
    }
}

/// Cryptography engine trait.
///
/// Recipients are email addresses. Ciphertext is ASCII-armored text.
pub trait CryptoEngine {
    /// Keys whose user ids carry `email`.
    ///
    /// # Errors
    ///
    /// Returns `CipherError::ListFailed` if the keyring cannot be read.
    fn list_identities(&self, email: &str) -> Result<Vec<KeyInfo>>;

    /// Generate a new keypair and add it to the keyring.
    ///
    /// # Errors
    ///
    /// Returns `CipherError::GenerationFailed` if the engine rejects the request.
    fn generate_identity(&self, spec: &KeySpec) -> Result<KeyInfo>;

    /// Encrypt `plaintext` to the key registered for `recipient`.
    ///
    /// # Errors
    ///
    /// Returns `CipherError::EncryptionFailed` if the recipient key is unusable.
    fn encrypt(&self, plaintext: &str, recipient: &str) -> Result<String>;

    /// Decrypt armored ciphertext with any private key in the keyring.
    ///
    /// # Errors
    ///
    /// Returns `CipherError::DecryptionFailed` on corrupted or foreign ciphertext.
    fn decrypt(&self, ciphertext: &str) -> Result<String>;

    /// Backend name for display.
    fn name(&self) -> &'static str;
}

impl<E: CryptoEngine + ?Sized> CryptoEngine for &E {
    fn list_identities(&self, email: &str) -> Result<Vec<KeyInfo>> {
        (**self).list_identities(email)
    }

    fn generate_identity(&self, spec: &KeySpec) -> Result<KeyInfo> {
        (**self).generate_identity(spec)
    }

    fn encrypt(&self, plaintext: &str, recipient: &str) -> Result<String> {
        (**self).encrypt(plaintext, recipient)
    }

    fn decrypt(&self, ciphertext: &str) -> Result<String> {
        (**self).decrypt(ciphertext)
    }

    fn name(&self) -> &'static str {
        (**self).name()
    }
}
