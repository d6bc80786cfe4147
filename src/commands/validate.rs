//! # Validate Command Implementation
//!
//! Parses every JSON config under `config/` and reports each file. A safe,
//! read-only operation: no `gh` calls, no auth required.

use anyhow::Result;
use clap::Args;

use repo_warden::config::RepoRoot;
use repo_warden::flows;
use repo_warden::output::{self, LogMode};

/// Parse and validate every JSON config under config/
#[derive(Args, Debug)]
pub struct ValidateArgs {}

/// Execute the `validate` command.
pub fn execute(_args: ValidateArgs, mode: LogMode) -> Result<()> {
    let root = RepoRoot::resolve();
    flows::run_validate_flow(&root)?;
    output::success(mode, "All configs OK.");
    Ok(())
}
