//! # Doctor Command Implementation
//!
//! Reports whether the external tools this binary shells out to are
//! installed. Always exits zero; the output is the diagnosis.

use anyhow::Result;
use clap::Args;

use repo_warden::gh::tool_available;
use repo_warden::output::{self, LogMode};

const REQUIRED_TOOLS: &[&str] = &["gh", "bash"];

/// Check that required external tools are installed
#[derive(Args, Debug)]
pub struct DoctorArgs {}

/// Execute the `doctor` command.
pub fn execute(_args: DoctorArgs, mode: LogMode) -> Result<()> {
    output::header(mode, "Checking required tools");
    for tool in REQUIRED_TOOLS {
        if tool_available(tool) {
            output::success(mode, format!("  OK      {tool}"));
        } else {
            output::info(mode, format!("  MISSING {tool}"));
        }
    }
    Ok(())
}
