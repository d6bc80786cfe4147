//! # Team Commands Implementation
//!
//! `init-teams` upserts the configured teams in an org and grants their
//! effective repo permissions; `remove-teams` deletes them.

use anyhow::Result;
use clap::Args;

use repo_warden::config::RepoRoot;
use repo_warden::flows;
use repo_warden::gh::{require_tools, GhCli};
use repo_warden::output::{self, LogMode};

/// Create or update the configured teams in an organization
#[derive(Args, Debug)]
pub struct InitTeamsArgs {
    /// Organization to manage teams in
    pub org: String,
}

/// Delete the configured teams from an organization
#[derive(Args, Debug)]
pub struct RemoveTeamsArgs {
    /// Organization to remove teams from
    pub org: String,
}

/// Execute the `init-teams` command.
pub fn execute_init(args: InitTeamsArgs, mode: LogMode) -> Result<()> {
    require_tools(&["gh", "bash"])?;

    let root = RepoRoot::resolve();
    let gh = GhCli::new(&root);

    output::header(mode, format!("Initializing teams in {}", args.org));
    flows::run_init_teams_flow(&gh, &root, &args.org)?;
    output::success(mode, "Teams initialized.");
    Ok(())
}

/// Execute the `remove-teams` command.
pub fn execute_remove(args: RemoveTeamsArgs, mode: LogMode) -> Result<()> {
    require_tools(&["gh", "bash"])?;

    let root = RepoRoot::resolve();
    let gh = GhCli::new(&root);

    output::header(mode, format!("Removing teams from {}", args.org));
    flows::run_remove_teams_flow(&gh, &root, &args.org)?;
    Ok(())
}
