//! CLI argument parsing and command dispatch

use anyhow::Result;
use clap::{Parser, Subcommand};

use repo_warden::output::LogMode;

use crate::commands;

/// Repo Warden - Apply declarative GitHub policy across repositories
#[derive(Parser, Debug)]
#[command(name = "repo-warden")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Subcommand to execute
    #[command(subcommand)]
    command: Commands,

    /// Disable colored output
    #[arg(long, global = true)]
    plain: bool,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Create a repository and apply the policy bundle to it
    Create(commands::create::CreateArgs),

    /// Apply every enabled policy module across an organization
    ApplyOrg(commands::apply_org::ApplyOrgArgs),

    /// Create or update the configured teams in an organization
    InitTeams(commands::teams::InitTeamsArgs),

    /// Delete the configured teams from an organization
    RemoveTeams(commands::teams::RemoveTeamsArgs),

    /// Parse and validate every JSON config under config/
    Validate(commands::validate::ValidateArgs),

    /// Run a legacy script identifier with its original flags
    Exec(commands::exec::ExecArgs),

    /// Check that required external tools are installed
    Doctor(commands::doctor::DoctorArgs),
}

impl Cli {
    /// Execute the CLI command
    pub fn execute(self) -> Result<()> {
        let mode = LogMode::from_plain_flag(self.plain);

        match self.command {
            Commands::Create(args) => commands::create::execute(args, mode),
            Commands::ApplyOrg(args) => commands::apply_org::execute(args, mode),
            Commands::InitTeams(args) => commands::teams::execute_init(args, mode),
            Commands::RemoveTeams(args) => commands::teams::execute_remove(args, mode),
            Commands::Validate(args) => commands::validate::execute(args, mode),
            Commands::Exec(args) => commands::exec::execute(args, mode),
            Commands::Doctor(args) => commands::doctor::execute(args, mode),
        }
    }
}
