//! Identity management.
//!
//! A store encrypts everything to one keypair whose address is derived from
//! the local domain (`secret@<domain>`). The keypair is looked up in the
//! engine's keyring and generated on first use.
//!
//! Expiry is metadata written at generation time. Reuse never checks it; an
//! expired identity is reported with a warning and still returned.

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use tracing::{debug, warn};

use crate::core::cipher::{CryptoEngine, KeyAlgorithm, KeyInfo, KeySpec};
use crate::core::config::Config;
use crate::core::constants;
use crate::error::{ConfigError, Result};

/// The keypair a store encrypts to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Identity {
    pub fingerprint: String,
    pub recipient: String,
    pub user_ids: Vec<String>,
    pub created: Option<DateTime<Utc>>,
    pub expires: Option<DateTime<Utc>>,
}

impl Identity {
    fn from_key(key: KeyInfo, recipient: &str) -> Self {
        Self {
            fingerprint: key.fingerprint,
            recipient: recipient.to_string(),
            user_ids: key.user_ids,
            created: key.created,
            expires: key.expires,
        }
    }

    /// Advisory only: nothing in the store refuses an expired identity.
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires.is_some_and(|at| at <= now)
    }
}

/// Resolves the store's recipient and makes sure a keypair exists for it.
#[derive(Debug, Clone)]
pub struct IdentityManager {
    recipient: String,
    name: String,
    lifetime: Duration,
}

impl IdentityManager {
    /// Manager for an explicit recipient address and display name.
    pub fn new(recipient: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            recipient: recipient.into(),
            name: name.into(),
            lifetime: Duration::days(constants::KEY_LIFETIME_DAYS),
        }
    }

    /// Derive recipient and display name from config, falling back to the
    /// host's FQDN and the login name.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::DomainUnavailable` if no domain is configured and
    /// the hostname has no domain part.
    pub fn from_config(config: &Config) -> Result<Self> {
        let recipient = match &config.domain {
            Some(domain) => recipient_for_domain(domain)?,
            None => recipient_from_fqdn(&local_fqdn()?)?,
        };

        let name = config.name.clone().unwrap_or_else(whoami::username);

        debug!(recipient = %recipient, "resolved recipient");
        Ok(Self::new(recipient, name))
    }

    /// Recipient address all material is encrypted to.
    pub fn recipient(&self) -> &str {
        &self.recipient
    }

    /// Display name used when a key is generated.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Return the existing identity for the recipient or generate one.
    ///
    /// # Errors
    ///
    /// Returns `CipherError` if listing or generation fails.
    pub fn ensure<E: CryptoEngine + ?Sized>(&self, engine: &E) -> Result<Identity> {
        let existing = engine.list_identities(&self.recipient)?;

        if let Some(key) = existing.into_iter().next() {
            let identity = Identity::from_key(key, &self.recipient);
            if identity.is_expired(Utc::now()) {
                warn!(
                    fingerprint = %identity.fingerprint,
                    "identity has expired; continuing to use it"
                );
            }
            debug!(fingerprint = %identity.fingerprint, "reusing identity");
            return Ok(identity);
        }

        let spec = self.key_spec(Utc::now());
        debug!(recipient = %self.recipient, engine = engine.name(), "generating identity");
        let key = engine.generate_identity(&spec)?;
        debug!(fingerprint = %key.fingerprint, "identity generated");

        Ok(Identity::from_key(key, &self.recipient))
    }

    fn key_spec(&self, now: DateTime<Utc>) -> KeySpec {
        KeySpec {
            name: self.name.clone(),
            email: self.recipient.clone(),
            key_type: KeyAlgorithm::Rsa,
            key_length: constants::KEY_LENGTH,
            subkey_type: KeyAlgorithm::Rsa,
            subkey_length: constants::KEY_LENGTH,
            expires: now + self.lifetime,
        }
    }
}

/// Fully-qualified name of this host.
///
/// The resolver's canonical name for the hostname (DNS or `/etc/hosts`),
/// falling back to the hostname itself when resolution fails.
///
/// # Errors
///
/// Returns `ConfigError::DomainUnavailable` if the hostname is unavailable.
pub fn local_fqdn() -> std::result::Result<String, ConfigError> {
    let host = whoami::fallible::hostname()
        .map_err(|_| ConfigError::DomainUnavailable(String::new()))?;
    let fqdn = qualify_hostname(&host, canonical_name);
    debug!(host = %host, fqdn = %fqdn, "resolved local hostname");
    Ok(fqdn)
}

/// `resolve(host)` when it yields a dotted name, else `host`.
fn qualify_hostname<F>(host: &str, resolve: F) -> String
where
    F: Fn(&str) -> Option<String>,
{
    let host = host.trim();
    match resolve(host) {
        Some(name) if name.trim_end_matches('.').contains('.') => name,
        _ => host.to_string(),
    }
}

#[cfg(unix)]
fn canonical_name(host: &str) -> Option<String> {
    let hints = dns_lookup::AddrInfoHints {
        flags: libc::AI_CANONNAME,
        ..dns_lookup::AddrInfoHints::default()
    };
    dns_lookup::getaddrinfo(Some(host), None, Some(hints))
        .ok()?
        .find_map(|info| info.ok()?.canonname)
}

#[cfg(not(unix))]
fn canonical_name(_host: &str) -> Option<String> {
    None
}

/// `secret@<domain>` where `<domain>` is `fqdn` minus its leftmost label.
///
/// # Errors
///
/// Returns `ConfigError::DomainUnavailable` for a bare hostname.
pub fn recipient_from_fqdn(fqdn: &str) -> std::result::Result<String, ConfigError> {
    let fqdn = fqdn.trim().trim_end_matches('.');
    match fqdn.split_once('.') {
        Some((_, domain)) if !domain.is_empty() => recipient_for_domain(domain),
        _ => Err(ConfigError::DomainUnavailable(fqdn.to_string())),
    }
}

/// `secret@<domain>` for a domain taken as-is.
///
/// # Errors
///
/// Returns `ConfigError::InvalidDomain` for empty or whitespace-bearing input.
pub fn recipient_for_domain(domain: &str) -> std::result::Result<String, ConfigError> {
    let domain = domain.trim().trim_end_matches('.');
    if domain.is_empty()
        || domain.chars().any(|c| c.is_whitespace() || c == '@' || c == '<' || c == '>')
    {
        return Err(ConfigError::InvalidDomain(domain.to_string()));
    }
    Ok(format!("{}@{}", constants::RECIPIENT_LOCAL_PART, domain))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::cipher::MemoryEngine;

    #[test]
    fn test_recipient_strips_host_label() {
        assert_eq!(
            recipient_from_fqdn("laptop.corp.example.com").unwrap(),
            "secret@corp.example.com"
        );
    }

    #[test]
    fn test_recipient_ignores_trailing_dot() {
        assert_eq!(
            recipient_from_fqdn("laptop.example.com.").unwrap(),
            "secret@example.com"
        );
    }

    #[test]
    fn test_bare_hostname_is_config_error() {
        let err = recipient_from_fqdn("laptop").unwrap_err();
        assert!(matches!(err, ConfigError::DomainUnavailable(_)));
        assert!(matches!(
            recipient_from_fqdn("laptop.").unwrap_err(),
            ConfigError::DomainUnavailable(_)
        ));
    }

    #[test]
    fn test_short_hostname_uses_canonical_name() {
        let resolve = |host: &str| {
            assert_eq!(host, "laptop");
            Some("laptop.corp.example.com".to_string())
        };
        let fqdn = qualify_hostname("laptop\n", resolve);
        assert_eq!(fqdn, "laptop.corp.example.com");
        assert_eq!(recipient_from_fqdn(&fqdn).unwrap(), "secret@corp.example.com");
    }

    #[test]
    fn test_unresolvable_hostname_falls_back() {
        assert_eq!(qualify_hostname("laptop", |_| None), "laptop");
        assert_eq!(
            qualify_hostname("laptop.example.com", |_| None),
            "laptop.example.com"
        );
        assert!(matches!(
            recipient_from_fqdn(&qualify_hostname("laptop", |_| None)),
            Err(ConfigError::DomainUnavailable(_))
        ));
    }

    #[test]
    fn test_undotted_canonical_name_is_ignored() {
        let fqdn = qualify_hostname("laptop.example.com", |_| Some("localhost".to_string()));
        assert_eq!(fqdn, "laptop.example.com");
    }

    #[test]
    fn test_invalid_domain() {
        assert!(recipient_for_domain("").is_err());
        assert!(recipient_for_domain("bad domain").is_err());
        assert!(recipient_for_domain("a@b").is_err());
        assert_eq!(recipient_for_domain("example.org").unwrap(), "secret@example.org");
    }

    #[test]
    fn test_from_config_uses_configured_domain() {
        let config = Config {
            domain: Some("example.net".to_string()),
            name: Some("Ada".to_string()),
            ..Config::default()
        };
        let manager = IdentityManager::from_config(&config).unwrap();
        assert_eq!(manager.recipient(), "secret@example.net");
        assert_eq!(manager.name(), "Ada");
    }

    #[test]
    fn test_ensure_generates_once() {
        let engine = MemoryEngine::new();
        let manager = IdentityManager::new("secret@example.com", "Ada");

        let first = manager.ensure(&engine).unwrap();
        let second = manager.ensure(&engine).unwrap();

        assert_eq!(first.fingerprint, second.fingerprint);
        assert_eq!(engine.generation_count(), 1);
        assert_eq!(first.user_ids, vec!["Ada <secret@example.com>"]);
    }

    #[test]
    fn test_generated_expiry_is_two_years() {
        let engine = MemoryEngine::new();
        let manager = IdentityManager::new("secret@example.com", "Ada");

        let identity = manager.ensure(&engine).unwrap();
        let expires = identity.expires.unwrap();
        let days = (expires - Utc::now()).num_days();
        assert!((729..=730).contains(&days), "expiry in {} days", days);
    }

    #[test]
    fn test_expired_identity_is_reused() {
        let engine = MemoryEngine::new();
        let manager = IdentityManager::new("secret@example.com", "Ada");
        let mut spec = manager.key_spec(Utc::now());
        spec.expires = Utc::now() - Duration::days(1);
        engine.generate_identity(&spec).unwrap();

        let identity = manager.ensure(&engine).unwrap();
        assert!(identity.is_expired(Utc::now()));
        assert_eq!(engine.generation_count(), 1);
    }

    #[test]
    fn test_key_spec_uses_strong_keys() {
        let manager = IdentityManager::new("secret@example.com", "Ada");
        let spec = manager.key_spec(Utc::now());
        assert_eq!(spec.key_type, KeyAlgorithm::Rsa);
        assert_eq!(spec.key_length, 4096);
        assert_eq!(spec.subkey_length, 4096);
    }
}
