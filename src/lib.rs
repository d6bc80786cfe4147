//! # Repo Warden Library
//!
//! Core functionality for applying declarative GitHub policy configuration
//! across one or many repositories. It is designed to be used by the
//! `repo-warden` command-line tool but the pieces compose on their own: every
//! operation takes a [`gh::GhClient`] and a [`config::RepoRoot`], so callers
//! control both the process boundary and where configs come from.
//!
//! ## Core Concepts
//!
//! - **Config documents (`config`)**: versioned JSON files describing repo
//!   settings, rulesets, Actions/security policies, environments,
//!   discussions templates, and teams.
//! - **The `gh` seam (`gh`)**: all remote calls go through the official
//!   `gh` CLI as blocking subprocesses, behind the [`gh::GhClient`] trait.
//! - **Upsert-by-name**: each remote resource kind (rulesets, teams,
//!   labels, categories, discussions, environments) is looked up by
//!   name/slug and either updated or created, so re-running is idempotent.
//! - **Batch driver (`batch`)**: the apply-to-every-repo loop with
//!   archived/visibility filters, a max-repos cap, per-repo error
//!   isolation, and a `seen/applied/skipped/failed` summary.
//! - **Flows (`flows`)**: the operations the CLI exposes — create-repo
//!   bootstrap, org-wide sweeps, team init/removal, validation, and the
//!   declarative manage runner.
//! - **Compat (`compat`)**: legacy script-path dispatch so existing
//!   automation keeps working (`repo-warden exec scripts/...`).
//!
//! ## Preview Mode
//!
//! Every mutating operation honors a preview flag: read-only lookups still
//! happen, mutating calls are replaced by `[preview]` log lines, and batch
//! summaries report `preview=1`.

pub mod actions;
pub mod batch;
pub mod compat;
pub mod config;
pub mod discussions;
pub mod environments;
pub mod error;
pub mod flows;
pub mod gh;
pub mod output;
pub mod permissions;
pub mod rulesets;
pub mod security;
pub mod teams;

#[cfg(test)]
mod test_util;

pub use error::{Error, Result};
