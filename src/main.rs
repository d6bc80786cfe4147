//! # Repo Warden CLI
//!
//! Binary entry point for the `repo-warden` command-line tool. Parses
//! arguments with `clap` and dispatches to the library flows; all core
//! logic lives in the `repo_warden` library crate.

mod cli;
mod commands;

use anyhow::Result;
use clap::Parser;

fn main() -> Result<()> {
    env_logger::init();
    let cli = cli::Cli::parse();
    cli.execute()
}
