//! Core library components.
//!
//! Key derivation, identity and salt lifecycle, and the encrypted store
//! built on top of them. The CLI is a thin layer over [`vault::SecretStore`].

pub mod cipher;
pub mod config;
pub mod constants;
pub mod identity;
pub mod kdf;
pub mod lock;
pub mod salt;
pub mod store;
pub mod vault;
