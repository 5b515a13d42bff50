//! GPG cipher backend.
//!
//! Drives the `gpg` CLI in batch mode. Key material lives in the user's
//! GnuPG keyring (or `GNUPGHOME` when configured); this module only parses
//! what gpg prints.
//!
//! ## Requirements
//!
//! - `gpg` (GnuPG 2.1 or newer) must be on `PATH`, or configured explicitly
//! - Generated keys carry no passphrase so batch decryption works unattended

use std::io::{self, Write};
use std::path::PathBuf;
use std::process::{Command, Output, Stdio};
use std::thread;

use chrono::{DateTime, Utc};
use tracing::{debug, trace};

use super::{CryptoEngine, KeyInfo, KeySpec};
use crate::error::{CipherError, Result};

/// GPG cipher backend using the gpg CLI.
#[derive(Debug, Clone)]
pub struct Gpg {
    program: String,
    home: Option<PathBuf>,
}

impl Default for Gpg {
    fn default() -> Self {
        Self::new("gpg", None)
    }
}

impl Gpg {
    /// Create a backend for `program`, optionally pinned to a GnuPG home.
    pub fn new(program: impl Into<String>, home: Option<PathBuf>) -> Self {
        Self {
            program: program.into(),
            home,
        }
    }

    /// Resolve the gpg binary on PATH.
    fn locate(&self) -> Result<PathBuf> {
        which::which(&self.program).map_err(|_| {
            CipherError::EngineUnavailable(format!(
                "'{}' not found. Install GnuPG from https://gnupg.org/download/",
                self.program
            ))
            .into()
        })
    }

    /// Run gpg with `args`, feeding `input` on stdin.
    ///
    /// Spawn and pipe failures come back as `Err(message)` so each caller can
    /// wrap them in its own error variant.
    fn run(
        &self,
        args: &[&str],
        input: Option<&[u8]>,
    ) -> Result<std::result::Result<Output, String>> {
        let binary = self.locate()?;

        let mut cmd = Command::new(binary);
        cmd.args(args);
        if let Some(home) = &self.home {
            cmd.env("GNUPGHOME", home);
        }

        cmd.stdin(if input.is_some() {
            Stdio::piped()
        } else {
            Stdio::null()
        })
        .stdout(Stdio::piped())
        .stderr(Stdio::piped());

        let mut child = match cmd.spawn() {
            Ok(child) => child,
            Err(e) => return Ok(Err(format!("failed to spawn gpg: {}", e))),
        };

        // stdin is fed while stdout drains.
        let stdin = child.stdin.take();
        let (output, written) = thread::scope(|s| {
            let writer = s.spawn(move || match (input, stdin) {
                (Some(data), Some(mut stdin)) => stdin.write_all(data),
                _ => Ok(()),
            });
            let output = child.wait_with_output();
            let written = writer.join().unwrap_or_else(|_| {
                Err(io::Error::new(io::ErrorKind::Other, "stdin writer panicked"))
            });
            (output, written)
        });

        let output = match output {
            Ok(output) => output,
            Err(e) => return Ok(Err(format!("gpg command failed: {}", e))),
        };

        // gpg closing stdin early is reported through its exit status.
        if let Err(e) = written {
            if output.status.success() {
                return Ok(Err(format!("failed to write to gpg: {}", e)));
            }
        }

        Ok(Ok(output))
    }
}

impl CryptoEngine for Gpg {
    fn name(&self) -> &'static str {
        "gpg"
    }

    fn list_identities(&self, email: &str) -> Result<Vec<KeyInfo>> {
        trace!(email, "listing gpg keys");

        let output = self
            .run(
                &["--batch", "--with-colons", "--fixed-list-mode", "--list-keys"],
                None,
            )?
            .map_err(CipherError::ListFailed)?;

        // Trust-db warnings can make gpg exit non-zero after a complete
        // listing; only an empty listing with a failure status is an error.
        if !output.status.success() && output.stdout.is_empty() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(CipherError::ListFailed(stderr.trim().to_string()).into());
        }

        let stdout = String::from_utf8_lossy(&output.stdout);
        let keys: Vec<KeyInfo> = parse_colons(&stdout)
            .into_iter()
            .filter(|k| k.matches_email(email))
            .collect();

        trace!(matches = keys.len(), "listed gpg keys");
        Ok(keys)
    }

    fn generate_identity(&self, spec: &KeySpec) -> Result<KeyInfo> {
        debug!(email = %spec.email, "generating gpg key");

        let params = key_params(spec);
        let output = self
            .run(
                &["--batch", "--status-fd", "1", "--gen-key"],
                Some(params.as_bytes()),
            )?
            .map_err(CipherError::GenerationFailed)?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(CipherError::GenerationFailed(format!(
                "gpg gen-key failed: {}",
                stderr.trim()
            ))
            .into());
        }

        let status = String::from_utf8_lossy(&output.stdout);
        let fingerprint = created_fingerprint(&status);

        let listed = self.list_identities(&spec.email)?;
        let found = match &fingerprint {
            Some(fpr) => listed.into_iter().find(|k| &k.fingerprint == fpr),
            None => listed.into_iter().next(),
        };

        let key = found.unwrap_or_else(|| KeyInfo {
            fingerprint: fingerprint.unwrap_or_default(),
            user_ids: vec![format!("{} <{}>", spec.name, spec.email)],
            created: Some(Utc::now()),
            expires: Some(spec.expires),
        });

        debug!(fingerprint = %key.fingerprint, "gpg key generated");
        Ok(key)
    }

    fn encrypt(&self, plaintext: &str, recipient: &str) -> Result<String> {
        trace!(plaintext_len = plaintext.len(), "encrypting with GPG");

        let exact = format!("<{}>", recipient);
        let output = self
            .run(
                &[
                    "--encrypt",
                    "--armor",
                    "--trust-model",
                    "always",
                    "--batch",
                    "--yes",
                    "--recipient",
                    &exact,
                ],
                Some(plaintext.as_bytes()),
            )?
            .map_err(CipherError::EncryptionFailed)?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(CipherError::EncryptionFailed(format!(
                "gpg encrypt failed: {}",
                stderr.trim()
            ))
            .into());
        }

        let ciphertext = String::from_utf8(output.stdout)
            .map_err(|e| CipherError::EncryptionFailed(format!("UTF-8 error: {}", e)))?;

        trace!(ciphertext_len = ciphertext.len(), "encrypted with GPG");
        Ok(ciphertext)
    }

    fn decrypt(&self, ciphertext: &str) -> Result<String> {
        trace!(ciphertext_len = ciphertext.len(), "decrypting with GPG");

        let output = self
            .run(
                &["--decrypt", "--batch", "--yes", "--quiet"],
                Some(ciphertext.as_bytes()),
            )?
            .map_err(CipherError::DecryptionFailed)?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(CipherError::DecryptionFailed(format!(
                "gpg decrypt failed: {}. Ensure you have the private key in your keyring.",
                stderr.trim()
            ))
            .into());
        }

        let plaintext = String::from_utf8(output.stdout)
            .map_err(|e| CipherError::DecryptionFailed(format!("UTF-8 error: {}", e)))?;

        trace!(plaintext_len = plaintext.len(), "decrypted with GPG");
        Ok(plaintext)
    }
}

/// Unattended key generation parameters.
fn key_params(spec: &KeySpec) -> String {
    let expires = spec.expires.format("%Y-%m-%d");
    format!(
        "%no-protection\n\
         Key-Type: {}\n\
         Key-Length: {}\n\
         Key-Usage: sign\n\
         Subkey-Type: {}\n\
         Subkey-Length: {}\n\
         Subkey-Usage: encrypt\n\
         Name-Real: {}\n\
         Name-Email: {}\n\
         Expire-Date: {}\n\
         %commit\n",
        spec.key_type.as_str(),
        spec.key_length,
        spec.subkey_type.as_str(),
        spec.subkey_length,
        spec.name,
        spec.email,
        expires
    )
}

/// Fingerprint from a `KEY_CREATED` status line.
fn created_fingerprint(status: &str) -> Option<String> {
    status.lines().find_map(|line| {
        let mut parts = line.split_whitespace();
        if parts.next()? != "[GNUPG:]" || parts.next()? != "KEY_CREATED" {
            return None;
        }
        let _kind = parts.next()?;
        parts.next().map(str::to_string)
    })
}

/// Parse `--with-colons --fixed-list-mode` key listings.
///
/// Only primary keys produce entries; subkey fingerprints are skipped.
pub(crate) fn parse_colons(listing: &str) -> Vec<KeyInfo> {
    let mut keys: Vec<KeyInfo> = Vec::new();

    for line in listing.lines() {
        let fields: Vec<&str> = line.split(':').collect();
        match fields.first().copied() {
            Some("pub") | Some("sec") => keys.push(KeyInfo {
                fingerprint: String::new(),
                user_ids: Vec::new(),
                created: fields.get(5).and_then(|f| epoch(f)),
                expires: fields.get(6).and_then(|f| epoch(f)),
            }),
            Some("fpr") => {
                if let (Some(key), Some(fpr)) = (keys.last_mut(), fields.get(9)) {
                    if key.fingerprint.is_empty() {
                        key.fingerprint = fpr.to_string();
                    }
                }
            }
            Some("uid") => {
                if let (Some(key), Some(uid)) = (keys.last_mut(), fields.get(9)) {
                    key.user_ids.push(unescape(uid));
                }
            }
            _ => {}
        }
    }

    keys
}

fn epoch(field: &str) -> Option<DateTime<Utc>> {
    let secs: i64 = field.parse().ok()?;
    DateTime::from_timestamp(secs, 0)
}

/// Undo gpg's `\xNN` escaping in colon listings.
fn unescape(field: &str) -> String {
    let bytes = field.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'\\' && i + 3 < bytes.len() && bytes[i + 1] == b'x' {
            let hex = std::str::from_utf8(&bytes[i + 2..i + 4]).ok();
            if let Some(b) = hex.and_then(|h| u8::from_str_radix(h, 16).ok()) {
                out.push(b);
                i += 4;
                continue;
            }
        }
        out.push(bytes[i]);
        i += 1;
    }
    String::from_utf8_lossy(&out).into_owned()
}
