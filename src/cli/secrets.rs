//! Secret commands (get, set, rm).

use std::io::{self, Read, Write};

use zeroize::Zeroizing;

use crate::cli::output;
use crate::core::cipher::CryptoEngine;
use crate::core::vault::SecretStore;
use crate::error::{Error, Result};

/// Print a secret value exactly as stored.
pub fn get<E: CryptoEngine>(vault: &SecretStore<E>, key: &str) -> Result<()> {
    let value = vault.get(key)?;
    let mut stdout = io::stdout().lock();
    stdout.write_all(value.as_bytes())?;
    stdout.flush()?;
    Ok(())
}

/// Store a secret value from a hidden prompt, or from stdin when piped.
pub fn set<E: CryptoEngine>(vault: &SecretStore<E>, key: &str) -> Result<()> {
    let value = read_value()?;
    vault.set(key, &value)?;
    output::success(&format!("stored {}", key));
    Ok(())
}

/// Remove a secret.
pub fn rm<E: CryptoEngine>(vault: &SecretStore<E>, key: &str) -> Result<()> {
    if vault.remove(key)? {
        output::success(&format!("removed {}", key));
    } else {
        output::dimmed(&format!("{} was not stored", key));
    }
    Ok(())
}

fn read_value() -> Result<Zeroizing<String>> {
    if atty::is(atty::Stream::Stdin) {
        let value = dialoguer::Password::new()
            .with_prompt("Enter secret value")
            .allow_empty_password(true)
            .interact()
            .map_err(|e| Error::Prompt(e.to_string()))?;
        return Ok(Zeroizing::new(value));
    }

    let mut value = Zeroizing::new(String::new());
    io::stdin().read_to_string(&mut value)?;
    Ok(value)
}
