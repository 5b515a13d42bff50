//! Command-line interface.

pub mod info;
pub mod output;
pub mod secrets;

use std::path::PathBuf;

use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::Shell;

use crate::core::config::Config;
use crate::core::vault::SecretStore;
use crate::error::Result;

/// Secret - a per-user encrypted secret store.
#[derive(Parser)]
#[command(
    name = "secret",
    about = "A per-user secret store encrypted with GnuPG",
    version
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Store directory (default: ~/.secrets)
    #[arg(long, global = true, value_name = "PATH")]
    pub store: Option<PathBuf>,
}

/// Top-level commands.
#[derive(Subcommand)]
pub enum Command {
    /// Print a secret value (no trailing newline)
    Get {
        /// Lookup key
        key: String,
    },

    /// Store a secret value, read from a hidden prompt or stdin
    Set {
        /// Lookup key
        key: String,
    },

    /// Remove a secret (no error if absent)
    Rm {
        /// Lookup key
        key: String,
    },

    /// Show store location and identity details
    Info {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

/// Execute a command.
pub fn execute(command: Command, store: Option<PathBuf>) -> Result<()> {
    use Command::*;

    if let Completions { shell } = command {
        clap_complete::generate(shell, &mut Cli::command(), "secret", &mut std::io::stdout());
        return Ok(());
    }

    let mut config = Config::load()?;
    if store.is_some() {
        config.store_dir = store;
    }
    let vault = SecretStore::from_config(&config)?;

    match command {
        Get { key } => secrets::get(&vault, &key),
        Set { key } => secrets::set(&vault, &key),
        Rm { key } => secrets::rm(&vault, &key),
        Info { json } => info::execute(&vault, json),
        Completions { .. } => Ok(()),
    }
}
