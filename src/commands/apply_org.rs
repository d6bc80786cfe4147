//! # Apply-Org Command Implementation
//!
//! Runs every enabled policy module across one organization, in the fixed
//! order rulesets, actions, security, environments, discussions.

use anyhow::Result;
use clap::Args;

use repo_warden::config::RepoRoot;
use repo_warden::flows;
use repo_warden::gh::{require_tools, GhCli};
use repo_warden::output::{self, LogMode};

/// Apply every enabled policy module across an organization
#[derive(Args, Debug)]
pub struct ApplyOrgArgs {
    /// Organization to sweep
    pub org: String,
}

/// Execute the `apply-org` command.
pub fn execute(args: ApplyOrgArgs, mode: LogMode) -> Result<()> {
    require_tools(&["gh", "bash"])?;

    let root = RepoRoot::resolve();
    let gh = GhCli::new(&root);

    output::header(mode, format!("Applying org policy: {}", args.org));
    flows::run_apply_org_flow(&gh, &root, &args.org)?;
    output::success(mode, "Org apply finished.");
    Ok(())
}
