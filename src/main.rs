//! Secret - a per-user secret store backed by GnuPG.

use clap::Parser;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use secret::cli::output;
use secret::cli::{execute, Cli};
use secret::error::{CipherError, ConfigError, Error, SaltError};

fn main() {
    let cli = Cli::parse();

    let filter = EnvFilter::try_from_env("SECRET_LOG").unwrap_or_else(|_| {
        if cli.verbose {
            EnvFilter::new("secret=debug")
        } else {
            EnvFilter::new("secret=warn")
        }
    });

    tracing_subscriber::registry()
        .with(filter)
        .with(
            fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(false)
                .without_time(),
        )
        .init();

    if let Err(e) = execute(cli.command, cli.store) {
        let suggestion = match &e {
            Error::Config(ConfigError::DomainUnavailable(_)) => {
                Some("set SECRET_DOMAIN or `domain` in config.toml")
            }
            Error::Cipher(CipherError::EngineUnavailable(_)) => {
                Some("install GnuPG or set SECRET_GPG")
            }
            Error::Salt(SaltError::Undecryptable { .. }) => {
                Some("the salt is encrypted to a key missing from this keyring")
            }
            _ => None,
        };

        output::error(&e.to_string());
        if let Some(hint) = suggestion {
            output::hint(hint);
        }
        std::process::exit(1);
    }
}
