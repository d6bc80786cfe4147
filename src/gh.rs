//! # gh Process Boundary
//!
//! Every remote call this tool makes goes through the official `gh` CLI as
//! a blocking subprocess. This module defines the [`GhClient`] trait — the
//! single seam between policy logic and the outside world — and [`GhCli`],
//! the implementation that actually spawns `gh`.
//!
//! JSON payloads are passed on standard input (`--input -`), results are
//! read from standard output. A non-zero exit status is an error unless the
//! caller explicitly inspects the raw [`GhOutput`] via
//! [`GhClient::try_run`].
//!
//! This uses the system `gh` binary, which automatically handles
//! authentication via `gh auth login`, `GH_TOKEN`, or a credential helper.

use std::io::Write;
use std::path::PathBuf;
use std::process::{Command, Stdio};

use crate::config::RepoRoot;
use crate::error::{Error, Result};

/// Raw outcome of one `gh` invocation.
#[derive(Debug, Clone)]
pub struct GhOutput {
    pub status: i32,
    pub stdout: String,
    pub stderr: String,
}

impl GhOutput {
    pub fn success(&self) -> bool {
        self.status == 0
    }
}

/// Process-boundary seam for `gh` invocations.
///
/// Production code uses [`GhCli`]; tests substitute a recording fake so
/// policy logic can be exercised without a network or a `gh` install.
pub trait GhClient {
    /// Run `gh` with the given arguments, returning the raw outcome.
    ///
    /// Only a spawn failure is an `Err`; a non-zero exit status is reported
    /// through [`GhOutput::status`] for callers that tolerate failures.
    fn try_run(&self, args: &[&str], input: Option<&str>) -> Result<GhOutput>;

    /// Run `gh`, treating a non-zero exit status as an error.
    ///
    /// Returns trimmed standard output on success.
    fn run(&self, args: &[&str], input: Option<&str>) -> Result<String> {
        let output = self.try_run(args, input)?;
        if !output.success() {
            let message = if !output.stderr.trim().is_empty() {
                output.stderr.trim().to_string()
            } else if !output.stdout.trim().is_empty() {
                output.stdout.trim().to_string()
            } else {
                format!("exit status {}", output.status)
            };
            return Err(Error::Gh {
                command: args.join(" "),
                message,
            });
        }
        Ok(output.stdout.trim().to_string())
    }
}

/// [`GhClient`] implementation spawning the system `gh` binary.
#[derive(Debug, Clone)]
pub struct GhCli {
    root: PathBuf,
}

impl GhCli {
    pub fn new(root: &RepoRoot) -> Self {
        Self {
            root: root.path().to_path_buf(),
        }
    }
}

impl GhClient for GhCli {
    fn try_run(&self, args: &[&str], input: Option<&str>) -> Result<GhOutput> {
        log::debug!("gh {}", args.join(" "));

        let mut command = Command::new("gh");
        command
            .args(args)
            .current_dir(&self.root)
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());
        if input.is_some() {
            command.stdin(Stdio::piped());
        } else {
            command.stdin(Stdio::null());
        }

        let mut child = command.spawn().map_err(|e| Error::Gh {
            command: args.join(" "),
            message: e.to_string(),
        })?;

        if let Some(payload) = input {
            if let Some(mut stdin) = child.stdin.take() {
                stdin.write_all(payload.as_bytes())?;
            }
        }

        let output = child.wait_with_output()?;
        Ok(GhOutput {
            status: output.status.code().unwrap_or(1),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        })
    }
}

/// Verify `gh` is authenticated before doing anything destructive.
pub fn check_auth(gh: &dyn GhClient) -> Result<()> {
    gh.run(&["auth", "status"], None).map(|_| ())
}

/// Whether an external command is available on the PATH.
pub fn tool_available(tool: &str) -> bool {
    Command::new("bash")
        .args(["-lc", &format!("command -v {tool}")])
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .map(|status| status.success())
        .unwrap_or(false)
}

/// Fail fast when any required external command is missing.
pub fn require_tools(tools: &[&str]) -> Result<()> {
    for tool in tools {
        if !tool_available(tool) {
            return Err(Error::MissingTool {
                tool: tool.to_string(),
            });
        }
    }
    Ok(())
}
