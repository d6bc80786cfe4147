//! # Exec Command Implementation
//!
//! Runs a legacy script identifier with its original ad-hoc flag list,
//! through the compat dispatch table. Keeps pre-existing automation and
//! documentation working against this binary.

use anyhow::Result;
use clap::Args;

use repo_warden::compat;
use repo_warden::config::RepoRoot;
use repo_warden::gh::GhCli;
use repo_warden::output::LogMode;

/// Run a legacy script identifier with its original flags
#[derive(Args, Debug)]
pub struct ExecArgs {
    /// Legacy script path (e.g. scripts/gh_manage.sh)
    pub script: String,

    /// Arguments passed through to the script handler
    #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
    pub args: Vec<String>,
}

/// Execute the `exec` command.
pub fn execute(args: ExecArgs, _mode: LogMode) -> Result<()> {
    let root = RepoRoot::resolve();
    let gh = GhCli::new(&root);
    compat::run_script(&gh, &root, &args.script, &args.args)?;
    Ok(())
}
