//! # Create Command Implementation
//!
//! Creates a repository (or adopts an existing one) and runs the full
//! bootstrap flow: policy bundle application plus every enabled optional
//! module (discussions, actions, security, environments).

use anyhow::Result;
use clap::Args;

use repo_warden::batch::RepoSpec;
use repo_warden::config::RepoRoot;
use repo_warden::flows;
use repo_warden::gh::{require_tools, GhCli};
use repo_warden::output::{self, LogMode};

/// Create a repository and apply the policy bundle to it
#[derive(Args, Debug)]
pub struct CreateArgs {
    /// Organization the repository belongs to
    pub org: String,

    /// Repository name
    pub repo: String,
}

/// Execute the `create` command.
pub fn execute(args: CreateArgs, mode: LogMode) -> Result<()> {
    require_tools(&["gh", "bash"])?;

    let root = RepoRoot::resolve();
    let gh = GhCli::new(&root);
    let repo = RepoSpec::new(&args.org, &args.repo);

    output::header(mode, format!("Creating {repo}"));
    flows::run_create_flow(&gh, &root, &repo)?;
    output::success(mode, "Create flow finished.");
    Ok(())
}
