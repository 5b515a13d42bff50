//! Constants used throughout secret.
//!
//! Changing any KDF value here changes every derived filename. Introduce a
//! new salt format version instead.

/// Store directory relative to HOME (~/.secrets).
pub const STORE_DIR: &str = ".secrets";

/// Salt file name inside the store directory.
pub const SALT_FILE: &str = "salt";

/// Lock file name inside the store directory.
pub const LOCK_FILE: &str = ".lock";

/// Extension of secret record files.
pub const RECORD_EXT: &str = "gpg";

/// Local part of the recipient address (`secret@<domain>`).
pub const RECIPIENT_LOCAL_PART: &str = "secret";

/// Salt size in bytes before hex encoding.
pub const SALT_LEN: usize = 32;

/// PBKDF2 iteration count for salt format v1.
pub const KDF_ITERATIONS: u32 = 100_000;

/// Derived identifier length in bytes for salt format v1 (SHA-384 output).
pub const KDF_OUTPUT_LEN: usize = 48;

/// Identity lifetime in days (NIST SP 800-57 Part 1 Rev. 5, Table 1).
pub const KEY_LIFETIME_DAYS: i64 = 2 * 365;

/// RSA modulus size for both primary key and encryption subkey.
pub const KEY_LENGTH: u32 = 4096;

/// Default wait for the bootstrap lock, in seconds.
pub const LOCK_TIMEOUT_SECS: u64 = 120;

/// Age after which an abandoned lock file is broken, in seconds.
pub const LOCK_STALE_SECS: u64 = 600;

/// Config file name under `<config_dir>/secret/`.
pub const CONFIG_FILE: &str = "config.toml";
