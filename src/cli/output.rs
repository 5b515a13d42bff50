//! Terminal output helpers.
//!
//! Status lines go to stderr so stdout carries nothing but the secret value
//! on `get`. Colors follow NO_COLOR:
//! - Green: success
//! - Red: errors
//! - Yellow: warnings
//! - Cyan: hints
//! - Bold/dimmed: info labels and values

use std::fmt::Display;

use console::style;

/// Check if color output is disabled via NO_COLOR env var.
fn colors_enabled() -> bool {
    std::env::var_os("NO_COLOR").is_none() && console::colors_enabled_stderr()
}

/// `✓ stored db-password`
pub fn success(msg: &str) {
    if colors_enabled() {
        eprintln!("{} {}", style("✓").green(), msg);
    } else {
        eprintln!("✓ {}", msg);
    }
}

/// `✗ key not found: db-password`
pub fn error(msg: &str) {
    if colors_enabled() {
        eprintln!("{} {}", style("✗").red(), msg);
    } else {
        eprintln!("✗ {}", msg);
    }
}

/// `⚠ identity expired`
pub fn warn(msg: &str) {
    if colors_enabled() {
        eprintln!("{} {}", style("⚠").yellow(), msg);
    } else {
        eprintln!("⚠ {}", msg);
    }
}

/// `→ set SECRET_DOMAIN`
pub fn hint(msg: &str) {
    if colors_enabled() {
        eprintln!("{} {}", style("→").cyan(), style(msg).cyan());
    } else {
        eprintln!("→ {}", msg);
    }
}

/// Bold section header on stdout.
pub fn header(title: &str) {
    if colors_enabled() {
        println!("{}", style(title).bold());
    } else {
        println!("{}", title);
    }
}

/// Label/value line on stdout: `  recipient:  secret@example.com`
pub fn kv(label: &str, value: impl Display) {
    if colors_enabled() {
        println!("  {:<12} {}", style(label).dim(), style(value).bold());
    } else {
        println!("  {:<12} {}", label, value);
    }
}

/// Secondary message on stderr.
pub fn dimmed(msg: &str) {
    if colors_enabled() {
        eprintln!("{}", style(msg).dim());
    } else {
        eprintln!("{}", msg);
    }
}
