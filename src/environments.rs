//! # Deployment Environments
//!
//! Upserts the configured deployment environments on a repository.
//! `PUT environments/{name}` is itself an upsert on the REST side, so no
//! existence probe is needed; the only local validation is that every
//! configured environment has a name.

use std::path::Path;

use serde_json::json;

use crate::batch::{apply_to_org, ApplySummary, BatchOptions, RepoSpec};
use crate::config::{self, EnvironmentSpec, EnvironmentsConfig};
use crate::error::{Error, Result};
use crate::gh::GhClient;

/// Upsert the configured environments on one repository.
pub fn apply_environments_repo(
    gh: &dyn GhClient,
    environments: &[EnvironmentSpec],
    repo: &RepoSpec,
    preview: bool,
) -> Result<()> {
    for env in environments {
        if env.name.trim().is_empty() {
            return Err(Error::InvalidConfig {
                file: "environments.config.json".to_string(),
                message: "Environment entry has empty name".to_string(),
            });
        }

        if preview {
            println!(
                "[preview] upsert env '{}' on {repo} (wait_timer={} prevent_self_review={})",
                env.name, env.wait_timer, env.prevent_self_review
            );
            continue;
        }

        let payload = json!({
            "wait_timer": env.wait_timer,
            "prevent_self_review": env.prevent_self_review,
        });
        gh.run(
            &[
                "api",
                "-X",
                "PUT",
                &format!("repos/{repo}/environments/{}", env.name),
                "--input",
                "-",
            ],
            Some(&payload.to_string()),
        )?;
        println!("upserted env: {}", env.name);
    }
    Ok(())
}

/// Upsert the environments template across an org.
pub fn apply_environments_org(
    gh: &dyn GhClient,
    org: &str,
    config_file: &Path,
    opts: &BatchOptions,
) -> Result<ApplySummary> {
    let config: EnvironmentsConfig = config::load_versioned(config_file)?;
    apply_to_org(gh, org, "environments", opts, |repo| {
        let spec = RepoSpec::new(org, &repo.name);
        apply_environments_repo(gh, &config.environments, &spec, opts.preview)
    })
}
