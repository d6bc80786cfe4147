//! Shared test utilities for the E2E tests.
//!
//! Provides a [`TestFixture`] that materializes a config tree in a temp
//! directory and builds `repo-warden` commands pointed at it via the
//! `REPO_WARDEN_ROOT` environment variable.

use assert_cmd::cargo::cargo_bin_cmd;
use assert_cmd::Command;
use assert_fs::prelude::*;
use assert_fs::TempDir;

/// Re-export commonly used test dependencies for convenience.
pub mod prelude {
    pub use assert_cmd::cargo::cargo_bin_cmd;
    pub use assert_fs::prelude::*;
    #[allow(unused_imports)]
    pub use assert_fs::TempDir;
    pub use predicates::prelude::*;

    #[allow(unused_imports)]
    pub use super::configs;
    #[allow(unused_imports)]
    pub use super::TestFixture;
}

/// Minimal valid config documents for fixtures.
#[allow(dead_code)]
pub mod configs {
    pub const APP: &str = r#"{
  "version": 1,
  "defaults": { "preview": true, "allow_private": true },
  "modules": {}
}"#;

    pub const MANAGEMENT: &str = r#"{
  "version": 1,
  "execution": { "preview": true, "allow_private": false },
  "policy": {},
  "operations": {}
}"#;

    pub const REPO_SETTINGS: &str = r#"{
  "version": 1,
  "settings": { "has_wiki": false }
}"#;

    pub const RULESETS: &str = r#"{
  "version": 1,
  "rulesets": [ { "name": "main-protection", "enforcement": "active" } ]
}"#;
}

/// A temp directory holding a `config/` tree for the binary to resolve.
pub struct TestFixture {
    pub dir: TempDir,
}

#[allow(dead_code)]
impl TestFixture {
    pub fn new() -> Self {
        Self {
            dir: TempDir::new().unwrap(),
        }
    }

    /// Write the minimal set of policy configs the manage runner loads.
    pub fn with_policy_configs(self) -> Self {
        self.with_config("app.config.json", configs::APP)
            .with_config("management.json", configs::MANAGEMENT)
            .with_config("repo-settings.config.json", configs::REPO_SETTINGS)
            .with_config("rulesets.config.json", configs::RULESETS)
    }

    /// Write one file under `config/`.
    pub fn with_config(self, name: &str, contents: &str) -> Self {
        self.dir
            .child("config")
            .child(name)
            .write_str(contents)
            .unwrap();
        self
    }

    /// A `repo-warden` command rooted at this fixture.
    pub fn cmd(&self) -> Command {
        let mut cmd = cargo_bin_cmd!("repo-warden");
        cmd.env("REPO_WARDEN_ROOT", self.dir.path());
        cmd
    }
}
