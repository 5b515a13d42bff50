//! Command helper methods for Test.

use super::Test;
use assert_cmd::Command;
use std::process::Output;

impl Test {
    /// Create a secret command with an isolated environment.
    ///
    /// Returns a Command configured with:
    /// - HOME set to the temporary home directory
    /// - SECRET_CONFIG pointing at a file that does not exist
    /// - SECRET_DOMAIN fixed so the hostname does not matter
    /// - GNUPGHOME inside the temporary home
    pub fn cmd(&self) -> Command {
        #[allow(deprecated)]
        let mut cmd = Command::cargo_bin("secret").expect("failed to find secret binary");
        cmd.env("HOME", self.home.path());
        cmd.env("USERPROFILE", self.home.path());
        cmd.env("SECRET_CONFIG", self.home.path().join("no-config.toml"));
        cmd.env("SECRET_DOMAIN", &self.domain);
        cmd.env("GNUPGHOME", self.gnupg_home());
        cmd.env_remove("SECRET_DIR");
        cmd.env_remove("SECRET_LOG");
        cmd.env("NO_COLOR", "1");
        cmd
    }

    /// Shortcut for `secret set`, value piped on stdin.
    pub fn set(&self, key: &str, val: &str) -> Output {
        self.cmd()
            .args(["set", key])
            .write_stdin(val.to_string())
            .output()
            .expect("failed to run secret set")
    }

    /// Shortcut for `secret get` command.
    pub fn get(&self, key: &str) -> Output {
        self.cmd()
            .args(["get", key])
            .output()
            .expect("failed to run secret get")
    }

    /// Shortcut for `secret rm` command.
    pub fn rm(&self, key: &str) -> Output {
        self.cmd()
            .args(["rm", key])
            .output()
            .expect("failed to run secret rm")
    }

    /// Shortcut for `secret info --json` command.
    pub fn info_json(&self) -> Output {
        self.cmd()
            .args(["info", "--json"])
            .output()
            .expect("failed to run secret info --json")
    }
}
