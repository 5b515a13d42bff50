//! In-memory cipher backend.
//!
//! Holds age x25519 keypairs in process memory and encrypts with the age
//! format using ASCII armor. Keys vanish with the engine value, so this is a
//! keyring for tests and embedders, not for the CLI.

use std::io::{Read, Write};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, MutexGuard};

use ::age::x25519;
use chrono::Utc;
use sha2::{Digest, Sha256};
use tracing::trace;

use super::{CryptoEngine, KeyInfo, KeySpec};
use crate::error::{CipherError, Result};

struct MemoryKey {
    info: KeyInfo,
    identity: x25519::Identity,
}

/// Age-backed keyring living in process memory.
#[derive(Default)]
pub struct MemoryEngine {
    keys: Mutex<Vec<MemoryKey>>,
    generated: AtomicUsize,
}

impl std::fmt::Debug for MemoryEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryEngine")
            .field("keys", &self.keys().len())
            .field("generated", &self.generation_count())
            .finish()
    }
}

impl MemoryEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// How many identities this engine has generated.
    pub fn generation_count(&self) -> usize {
        self.generated.load(Ordering::SeqCst)
    }

    /// Drop every key carrying `email`, public and private halves alike.
    ///
    /// Returns the number of keys removed.
    pub fn forget(&self, email: &str) -> usize {
        let mut keys = self.keys();
        let before = keys.len();
        keys.retain(|k| !k.info.matches_email(email));
        before - keys.len()
    }

    fn keys(&self) -> MutexGuard<'_, Vec<MemoryKey>> {
        self.keys.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl CryptoEngine for MemoryEngine {
    fn name(&self) -> &'static str {
        "memory"
    }

    fn list_identities(&self, email: &str) -> Result<Vec<KeyInfo>> {
        Ok(self
            .keys()
            .iter()
            .filter(|k| k.info.matches_email(email))
            .map(|k| k.info.clone())
            .collect())
    }

    fn generate_identity(&self, spec: &KeySpec) -> Result<KeyInfo> {
        if spec.email.is_empty() {
            return Err(CipherError::GenerationFailed("empty email".to_string()).into());
        }

        let identity = x25519::Identity::generate();
        let public = identity.to_public().to_string();
        let fingerprint = hex::encode_upper(&Sha256::digest(public.as_bytes())[..20]);

        let info = KeyInfo {
            fingerprint,
            user_ids: vec![format!("{} <{}>", spec.name, spec.email)],
            created: Some(Utc::now()),
            expires: Some(spec.expires),
        };

        self.keys().push(MemoryKey {
            info: info.clone(),
            identity,
        });
        self.generated.fetch_add(1, Ordering::SeqCst);

        trace!(fingerprint = %info.fingerprint, "generated in-memory key");
        Ok(info)
    }

    fn encrypt(&self, plaintext: &str, recipient: &str) -> Result<String> {
        let target = self
            .keys()
            .iter()
            .find(|k| k.info.matches_email(recipient))
            .map(|k| k.identity.to_public())
            .ok_or_else(|| {
                CipherError::EncryptionFailed(format!("no public key for {}", recipient))
            })?;

        let encryptor =
            age::Encryptor::with_recipients(std::iter::once(&target as &dyn age::Recipient))
                .map_err(|e| CipherError::EncryptionFailed(format!("{}", e)))?;

        let mut encrypted = Vec::new();
        let armor =
            age::armor::ArmoredWriter::wrap_output(&mut encrypted, age::armor::Format::AsciiArmor)
                .map_err(|e| CipherError::EncryptionFailed(format!("armor: {}", e)))?;
        let mut writer = encryptor
            .wrap_output(armor)
            .map_err(|e| CipherError::EncryptionFailed(format!("{}", e)))?;

        writer
            .write_all(plaintext.as_bytes())
            .map_err(|e| CipherError::EncryptionFailed(format!("{}", e)))?;
        let armored = writer
            .finish()
            .map_err(|e| CipherError::EncryptionFailed(format!("{}", e)))?;
        armored
            .finish()
            .map_err(|e| CipherError::EncryptionFailed(format!("armor: {}", e)))?;

        String::from_utf8(encrypted)
            .map_err(|e| CipherError::EncryptionFailed(format!("UTF-8 error: {}", e)).into())
    }

    fn decrypt(&self, ciphertext: &str) -> Result<String> {
        let keys = self.keys();
        if keys.is_empty() {
            return Err(CipherError::DecryptionFailed("keyring is empty".to_string()).into());
        }

        let reader = age::armor::ArmoredReader::new(ciphertext.as_bytes());
        let decryptor = age::Decryptor::new(reader)
            .map_err(|e| CipherError::DecryptionFailed(format!("{}", e)))?;

        let mut decrypted = Vec::new();
        let mut reader = decryptor
            .decrypt(keys.iter().map(|k| &k.identity as &dyn age::Identity))
            .map_err(|e| CipherError::DecryptionFailed(format!("{}", e)))?;

        reader
            .read_to_end(&mut decrypted)
            .map_err(|e| CipherError::DecryptionFailed(format!("{}", e)))?;

        String::from_utf8(decrypted)
            .map_err(|e| CipherError::DecryptionFailed(format!("UTF-8 error: {}", e)).into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::cipher::KeyAlgorithm;
    use crate::error::Error;

    fn spec(email: &str) -> KeySpec {
        KeySpec {
            name: "tester".to_string(),
            email: email.to_string(),
            key_type: KeyAlgorithm::Rsa,
            key_length: 4096,
            subkey_type: KeyAlgorithm::Rsa,
            subkey_length: 4096,
            expires: Utc::now() + chrono::Duration::days(730),
        }
    }

    #[test]
    fn test_encrypt_decrypt_roundtrip() {
        let engine = MemoryEngine::new();
        engine.generate_identity(&spec("secret@example.com")).unwrap();

        let encrypted = engine.encrypt("Hello, World!", "secret@example.com").unwrap();
        assert!(encrypted.contains("-----BEGIN AGE ENCRYPTED FILE-----"));
        assert_eq!(engine.decrypt(&encrypted).unwrap(), "Hello, World!");
    }

    #[test]
    fn test_list_filters_by_email() {
        let engine = MemoryEngine::new();
        engine.generate_identity(&spec("secret@example.com")).unwrap();
        engine.generate_identity(&spec("secret@example.org")).unwrap();

        let keys = engine.list_identities("secret@example.com").unwrap();
        assert_eq!(keys.len(), 1);
        assert_eq!(keys[0].fingerprint.len(), 40);
        assert_eq!(engine.generation_count(), 2);
    }

    #[test]
    fn test_encrypt_unknown_recipient_fails() {
        let engine = MemoryEngine::new();
        let err = engine.encrypt("x", "nobody@example.com").unwrap_err();
        assert!(matches!(err, Error::Cipher(CipherError::EncryptionFailed(_))));
    }

    #[test]
    fn test_decrypt_after_forget_fails() {
        let engine = MemoryEngine::new();
        engine.generate_identity(&spec("secret@example.com")).unwrap();
        let encrypted = engine.encrypt("v", "secret@example.com").unwrap();

        assert_eq!(engine.forget("secret@example.com"), 1);
        let err = engine.decrypt(&encrypted).unwrap_err();
        assert!(matches!(err, Error::Cipher(CipherError::DecryptionFailed(_))));
    }

    #[test]
    fn test_decrypt_garbage_fails() {
        let engine = MemoryEngine::new();
        engine.generate_identity(&spec("secret@example.com")).unwrap();
        let err = engine.decrypt("not ciphertext").unwrap_err();
        assert!(matches!(err, Error::Cipher(CipherError::DecryptionFailed(_))));
    }
}
