//! Configuration.
//!
//! Optional TOML file at `$SECRET_CONFIG` or `<config_dir>/secret/config.toml`,
//! then `SECRET_*` environment overrides. Everything has a default, so a
//! missing file is not an error.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::core::constants;
use crate::error::{ConfigError, Result};

/// Runtime configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// Store directory (default `~/.secrets`).
    pub store_dir: Option<PathBuf>,
    /// Domain for the recipient address, used as-is.
    pub domain: Option<String>,
    /// Display name for a newly generated identity.
    pub name: Option<String>,
    /// Seconds to wait for the bootstrap lock.
    pub lock_timeout_secs: Option<u64>,
    pub gpg: GpgConfig,
}

/// GnuPG settings.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct GpgConfig {
    /// gpg binary name or path (default `gpg`).
    pub program: Option<String>,
    /// Exported as `GNUPGHOME` for every gpg invocation.
    pub home: Option<PathBuf>,
}

impl Config {
    /// Load the config file (if any) and apply environment overrides.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::ReadFile` or `ConfigError::Parse` for an
    /// unreadable or malformed file.
    pub fn load() -> Result<Self> {
        let mut config = match Self::config_path() {
            Some(path) if path.exists() => Self::load_from(&path)?,
            _ => Self::default(),
        };
        config.apply_env(|key| std::env::var(key).ok());
        Ok(config)
    }

    /// Parse a specific config file.
    pub fn load_from(path: &Path) -> Result<Self> {
        debug!(path = %path.display(), "loading config");
        let contents = std::fs::read_to_string(path).map_err(ConfigError::ReadFile)?;
        let config: Self = toml::from_str(&contents).map_err(ConfigError::Parse)?;
        Ok(config)
    }

    /// `$SECRET_CONFIG`, else `<config_dir>/secret/config.toml`.
    pub fn config_path() -> Option<PathBuf> {
        if let Some(path) = std::env::var_os("SECRET_CONFIG") {
            return Some(PathBuf::from(path));
        }
        dirs::config_dir().map(|dir| dir.join("secret").join(constants::CONFIG_FILE))
    }

    /// Apply `SECRET_DIR`, `SECRET_DOMAIN`, `SECRET_NAME` and `SECRET_GPG`.
    /// Empty values are ignored.
    pub fn apply_env<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(dir) = get("SECRET_DIR") {
            self.store_dir = Some(PathBuf::from(dir));
        }
        if let Some(domain) = get("SECRET_DOMAIN") {
            self.domain = Some(domain);
        }
        if let Some(name) = get("SECRET_NAME") {
            self.name = Some(name);
        }
        if let Some(program) = get("SECRET_GPG") {
            self.gpg.program = Some(program);
        }
    }

    /// Resolved store directory.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::NoHomeDir` if no directory is configured and the
    /// home directory is unknown.
    pub fn store_dir(&self) -> Result<PathBuf> {
        if let Some(dir) = &self.store_dir {
            return Ok(dir.clone());
        }
        let home = dirs::home_dir().ok_or(ConfigError::NoHomeDir)?;
        Ok(home.join(constants::STORE_DIR))
    }

    pub fn lock_timeout(&self) -> Duration {
        Duration::from_secs(self.lock_timeout_secs.unwrap_or(constants::LOCK_TIMEOUT_SECS))
    }

    pub fn gpg_program(&self) -> &str {
        self.gpg.program.as_deref().unwrap_or("gpg")
    }
}
