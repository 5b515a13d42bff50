//! Secret - a per-user secret store backed by GnuPG.
//!
//! # Architecture
//!
//! ```text
//! src/
//! ├── cli/              # Command-line interface
//! │   ├── mod           # Argument parsing, completions
//! │   ├── secrets       # get / set / rm
//! │   ├── info          # Store and identity summary
//! │   └── output        # Terminal formatting
//! └── core/             # Core library components
//!     ├── cipher/       # CryptoEngine trait
//!     │   ├── gpg       # gpg CLI backend
//!     │   └── memory    # In-process age backend
//!     ├── identity      # Recipient derivation, keypair lifecycle
//!     ├── salt          # Versioned, encrypted store salt
//!     ├── kdf           # Lookup key -> record filename
//!     ├── lock          # Bootstrap lock file
//!     ├── store         # Directory layout, atomic writes
//!     ├── vault         # SecretStore
//!     └── config        # config.toml + SECRET_* overrides
//! ```
//!
//! # Layout on disk
//!
//! `~/.secrets/` (mode 0700) holds `salt`, the ciphertext of a random
//! 32-byte salt, and one `<pbkdf2-hex>.gpg` file per secret. Lookup keys are
//! never written to disk.

pub mod cli;
pub mod core;
pub mod error;

pub use crate::core::cipher::{CryptoEngine, Gpg, MemoryEngine};
pub use crate::core::config::Config;
pub use crate::core::identity::{Identity, IdentityManager};
pub use crate::core::vault::SecretStore;
pub use crate::error::{Error, Result};
