//! # Org-Wide Batch Driver
//!
//! The same apply-to-every-repo loop recurs for rulesets, actions policy,
//! security policy, environments, and discussions. This module implements
//! it once: list the org's repositories (single page, fixed cap), walk the
//! listing in order, filter (max-repos cap, archived, visibility), and run
//! a per-repo operation with each failure caught, logged, and counted
//! rather than aborting the sweep.
//!
//! Per-repo results are collected as [`RepoOutcome`]s and the
//! [`ApplySummary`] counters are derived from that list afterwards. The
//! driver prints the summary line and returns [`Error::BatchFailed`] iff
//! any repository failed, so one bad repo never stops its siblings but
//! still fails the process exit code.

use std::fmt;

use serde::Deserialize;

use crate::config::parse_json;
use crate::error::{Error, Result};
use crate::gh::GhClient;

/// Page size for `gh repo list`. Listing is a single page by design.
const REPO_LIST_LIMIT: &str = "200";

/// An `org/name` repository reference.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepoSpec {
    pub org: String,
    pub name: String,
}

impl RepoSpec {
    pub fn new(org: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            org: org.into(),
            name: name.into(),
        }
    }

    /// Parse `ORG/REPO`, rejecting anything but exactly two non-empty
    /// segments.
    pub fn parse(spec: &str) -> Result<Self> {
        let mut parts = spec.split('/');
        match (parts.next(), parts.next(), parts.next()) {
            (Some(org), Some(name), None) if !org.is_empty() && !name.is_empty() => {
                Ok(Self::new(org, name))
            }
            _ => Err(Error::InvalidRepoSpec {
                spec: spec.to_string(),
            }),
        }
    }

    pub fn full(&self) -> String {
        format!("{}/{}", self.org, self.name)
    }
}

impl fmt::Display for RepoSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.org, self.name)
    }
}

/// One entry of an org's live repository listing.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RepoInfo {
    pub name: String,
    pub visibility: String,
    pub is_archived: bool,
}

impl RepoInfo {
    pub fn is_public(&self) -> bool {
        self.visibility == "public"
    }
}

/// List an org's repositories (one page, capped at 200).
pub fn list_repos(gh: &dyn GhClient, org: &str) -> Result<Vec<RepoInfo>> {
    let out = gh.run(
        &[
            "repo",
            "list",
            org,
            "--limit",
            REPO_LIST_LIMIT,
            "--json",
            "name,visibility,isArchived",
        ],
        None,
    )?;
    parse_json(&out, &format!("gh repo list {org}"))
}

/// Filters and mode for one batch run.
#[derive(Debug, Clone, Copy, Default)]
pub struct BatchOptions {
    /// Log mutating calls instead of issuing them.
    pub preview: bool,
    /// Process non-public repositories too.
    pub allow_private: bool,
    /// Process archived repositories too.
    pub include_archived: bool,
    /// Stop after this many repositories (0 = unlimited).
    pub max_repos: u32,
}

/// What happened to one repository within a batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RepoOutcome {
    Applied,
    Skipped,
    Failed,
}

/// Running counters for one batch run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ApplySummary {
    pub seen: u32,
    pub applied: u32,
    pub skipped: u32,
    pub failed: u32,
    pub preview: bool,
}

impl ApplySummary {
    /// Derive the counters from a list of per-repo outcomes.
    pub fn from_outcomes(outcomes: &[RepoOutcome], preview: bool) -> Self {
        let mut summary = Self {
            preview,
            ..Self::default()
        };
        for outcome in outcomes {
            summary.seen += 1;
            match outcome {
                RepoOutcome::Applied => summary.applied += 1,
                RepoOutcome::Skipped => summary.skipped += 1,
                RepoOutcome::Failed => summary.failed += 1,
            }
        }
        summary
    }

    /// Fold another summary into this one (multi-org totals).
    pub fn accumulate(&mut self, other: &ApplySummary) {
        self.seen += other.seen;
        self.applied += other.applied;
        self.skipped += other.skipped;
        self.failed += other.failed;
    }
}

impl fmt::Display for ApplySummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "seen={} applied={} skipped={} failed={} preview={}",
            self.seen,
            self.applied,
            self.skipped,
            self.failed,
            u8::from(self.preview)
        )
    }
}

/// Apply `per_repo` across every qualifying repository of `org`.
///
/// `operation` labels log lines and the final error. The per-repo closure
/// is invoked sequentially, in listing order; its failures are logged and
/// counted without stopping the loop.
pub fn apply_to_org<F>(
    gh: &dyn GhClient,
    org: &str,
    operation: &str,
    opts: &BatchOptions,
    mut per_repo: F,
) -> Result<ApplySummary>
where
    F: FnMut(&RepoInfo) -> Result<()>,
{
    let repos = list_repos(gh, org)?;
    let mut outcomes = Vec::new();

    for repo in &repos {
        if opts.max_repos > 0 && outcomes.len() as u32 >= opts.max_repos {
            break;
        }
        if repo.is_archived && !opts.include_archived {
            println!("[skip] {org}/{} (archived)", repo.name);
            outcomes.push(RepoOutcome::Skipped);
            continue;
        }
        if !repo.is_public() && !opts.allow_private {
            println!("[skip] {org}/{} (private)", repo.name);
            outcomes.push(RepoOutcome::Skipped);
            continue;
        }

        match per_repo(repo) {
            Ok(()) => outcomes.push(RepoOutcome::Applied),
            Err(err) => {
                eprintln!("[error] {operation} failed for {org}/{}: {err}", repo.name);
                outcomes.push(RepoOutcome::Failed);
            }
        }
    }

    let summary = ApplySummary::from_outcomes(&outcomes, opts.preview);
    println!("Summary: {summary}");

    if summary.failed > 0 {
        return Err(Error::BatchFailed {
            operation: operation.to_string(),
            summary,
        });
    }
    Ok(summary)
}
