//! Info command - store location and identity details.

use crate::cli::output;
use crate::core::cipher::CryptoEngine;
use crate::core::vault::SecretStore;
use crate::error::Result;

/// Show where the store lives and which identity it encrypts to.
pub fn execute<E: CryptoEngine>(vault: &SecretStore<E>, json: bool) -> Result<()> {
    let info = vault.info()?;

    if json {
        println!("{}", serde_json::to_string_pretty(&info)?);
        return Ok(());
    }

    let date = |d: Option<chrono::DateTime<chrono::Utc>>| {
        d.map(|d| d.format("%Y-%m-%d").to_string())
            .unwrap_or_else(|| "never".to_string())
    };

    output::header("Store");
    output::kv("path:", info.store_dir.display());
    output::kv("records:", info.records);
    output::kv("salt:", info.salt_version);

    output::header("Identity");
    output::kv("recipient:", &info.recipient);
    output::kv("name:", &info.name);
    for uid in &info.user_ids {
        output::kv("uid:", uid);
    }
    output::kv("fingerprint:", &info.fingerprint);
    output::kv("engine:", info.engine);
    output::kv("created:", date(info.created));
    output::kv("expires:", date(info.expires));

    if info.expired {
        output::warn("identity has expired; it is still used for encryption");
    }

    Ok(())
}
