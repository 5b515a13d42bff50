//! Lookup-key derivation.
//!
//! Turns a lookup key plus the store salt into the hex identifier used as a
//! record filename with PBKDF2-HMAC-SHA384.
//!
//! The output depends on the salt bytes and the salt's format version only.
//! Any change to the digest, iteration count or output length needs a new
//! [`SaltVersion`](crate::core::salt::SaltVersion).

use std::fmt;

use pbkdf2::pbkdf2_hmac;
use sha2::Sha384;

use crate::core::constants;
use crate::core::salt::{Salt, SaltVersion};

/// Opaque, fixed-length, lowercase-hex record identifier.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct DerivedId(String);

impl DerivedId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DerivedId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// Truncated in logs.
impl fmt::Debug for DerivedId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "DerivedId({}…)", &self.0[..self.0.len().min(8)])
    }
}

/// Derive the record identifier for `lookup_key` under `salt`.
pub fn derive(lookup_key: &str, salt: &Salt) -> DerivedId {
    match salt.version() {
        SaltVersion::V1 => {
            let mut out = [0u8; constants::KDF_OUTPUT_LEN];
            pbkdf2_hmac::<Sha384>(
                lookup_key.as_bytes(),
                salt.as_bytes(),
                constants::KDF_ITERATIONS,
                &mut out,
            );
            DerivedId(hex::encode(out))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fixed_salt() -> Salt {
        let bytes: Vec<u8> = (0u8..32).collect();
        Salt::from_bytes(SaltVersion::V1, &bytes).unwrap()
    }

    #[test]
    fn test_golden_vector() {
        let id = derive("db-password", &fixed_salt());
        assert_eq!(
            id.as_str(),
            "a48630b6a2faf260e3e5e8a572f3b807e6988030bfd6aa9e\
             9c5b5381e04cefb867f0717d7da18595cab52601dabba576"
        );
    }

    #[test]
    fn test_golden_vector_empty_key() {
        let id = derive("", &fixed_salt());
        assert_eq!(
            id.as_str(),
            "473c03be064b909fbddbdf01ecb26d7ed318c4b096002275\
             a5f373acc1dcd81ed58a42cbde3c16c8ad6a0e48b50c5cf2"
        );
    }

    #[test]
    fn test_deterministic() {
        let salt = fixed_salt();
        assert_eq!(derive("api-token", &salt), derive("api-token", &salt));
    }

    #[test]
    fn test_fixed_length_lowercase_hex() {
        let id = derive("anything at all", &fixed_salt());
        assert_eq!(id.as_str().len(), constants::KDF_OUTPUT_LEN * 2);
        assert!(id
            .as_str()
            .chars()
            .all(|c| c.is_ascii_digit() || ('a'..='f').contains(&c)));
    }

    #[test]
    fn test_salt_changes_output() {
        let other = Salt::from_bytes(SaltVersion::V1, &[7u8; 32]).unwrap();
        assert_ne!(derive("k", &fixed_salt()), derive("k", &other));
    }

    #[test]
    fn test_debug_is_truncated() {
        let id = derive("k", &fixed_salt());
        let shown = format!("{:?}", id);
        assert!(shown.len() < id.as_str().len());
    }
}
