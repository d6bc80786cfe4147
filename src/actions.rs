//! # GitHub Actions Permission Policy
//!
//! Applies the allowed-actions policy to a repository: `PUT
//! actions/permissions` with the configured mode, then, for `selected`
//! mode, `PUT actions/permissions/selected-actions` with the allowed
//! pattern list. The `{ORG}` token in patterns expands to the target org,
//! so one template can pin each org to its own reusable workflows.

use std::path::Path;

use serde_json::json;

use crate::batch::{apply_to_org, ApplySummary, BatchOptions, RepoSpec};
use crate::config::{self, ActionsConfig, ActionsMode, ActionsPolicy};
use crate::error::{Error, Result};
use crate::gh::GhClient;

/// Expand `{ORG}` in each allowed pattern.
fn expand_patterns(policy: &ActionsPolicy, org: &str) -> Vec<String> {
    policy
        .patterns_allowed
        .iter()
        .map(|pattern| pattern.replace("{ORG}", org))
        .collect()
}

/// Apply the Actions policy to one repository.
pub fn apply_actions_repo(
    gh: &dyn GhClient,
    policy: &ActionsPolicy,
    repo: &RepoSpec,
    preview: bool,
) -> Result<()> {
    let mode = policy.allowed_actions_mode;
    let patterns = expand_patterns(policy, &repo.org);

    if mode == ActionsMode::Selected && patterns.is_empty() {
        return Err(Error::InvalidConfig {
            file: "actions.config.json".to_string(),
            message: "allowed_actions_mode is 'selected' but patterns_allowed is empty"
                .to_string(),
        });
    }

    if preview {
        println!("[preview] set actions policy on {repo} (mode={mode})");
        if mode == ActionsMode::Selected {
            println!("[preview]   patterns: {}", patterns.join(", "));
        }
        return Ok(());
    }

    let permissions = json!({
        "enabled": policy.enabled,
        "allowed_actions": mode.as_str(),
    });
    gh.run(
        &[
            "api",
            "-X",
            "PUT",
            &format!("repos/{repo}/actions/permissions"),
            "--input",
            "-",
        ],
        Some(&permissions.to_string()),
    )?;

    if mode == ActionsMode::Selected {
        let selected = json!({
            "github_owned_allowed": policy.allow_github_owned,
            "verified_allowed": policy.allow_verified_creators,
            "patterns_allowed": patterns,
        });
        gh.run(
            &[
                "api",
                "-X",
                "PUT",
                &format!("repos/{repo}/actions/permissions/selected-actions"),
                "--input",
                "-",
            ],
            Some(&selected.to_string()),
        )?;
    }

    println!("updated actions policy: {repo}");
    Ok(())
}

/// Apply the Actions policy template across an org.
pub fn apply_actions_org(
    gh: &dyn GhClient,
    org: &str,
    config_file: &Path,
    opts: &BatchOptions,
) -> Result<ApplySummary> {
    let config: ActionsConfig = config::load_versioned(config_file)?;
    apply_to_org(gh, org, "actions policy", opts, |repo| {
        let spec = RepoSpec::new(org, &repo.name);
        apply_actions_repo(gh, &config.policy, &spec, opts.preview)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_util::MockGh;

    fn selected_policy(patterns: &[&str]) -> ActionsPolicy {
        ActionsPolicy {
            patterns_allowed: patterns.iter().map(|p| p.to_string()).collect(),
            ..ActionsPolicy::default()
        }
    }

    #[test]
    fn test_selected_mode_sends_both_calls() {
        let gh = MockGh::new();
        let repo = RepoSpec::new("acme", "widgets");
        apply_actions_repo(&gh, &selected_policy(&["{ORG}/*", "actions/checkout@*"]), &repo, false)
            .unwrap();

        let calls = gh.calls();
        assert_eq!(calls.len(), 2);
        assert!(calls[0]
            .args
            .contains("-X PUT repos/acme/widgets/actions/permissions"));
        assert!(calls[0].input.as_deref().unwrap().contains("\"selected\""));
        assert!(calls[1].args.contains("selected-actions"));
        let selected = calls[1].input.as_deref().unwrap();
        assert!(selected.contains("acme/*"), "org token not expanded: {selected}");
        assert!(selected.contains("actions/checkout@*"));
        assert!(!selected.contains("{ORG}"));
    }

    #[test]
    fn test_local_only_mode_skips_selected_actions_call() {
        let gh = MockGh::new();
        let repo = RepoSpec::new("acme", "widgets");
        let policy = ActionsPolicy {
            allowed_actions_mode: ActionsMode::LocalOnly,
            ..ActionsPolicy::default()
        };
        apply_actions_repo(&gh, &policy, &repo, false).unwrap();

        let calls = gh.calls();
        assert_eq!(calls.len(), 1);
        assert!(calls[0].input.as_deref().unwrap().contains("local_only"));
    }

    #[test]
    fn test_selected_mode_with_no_patterns_is_fatal() {
        let gh = MockGh::new();
        let repo = RepoSpec::new("acme", "widgets");
        let err = apply_actions_repo(&gh, &selected_policy(&[]), &repo, false).unwrap_err();
        assert!(matches!(err, Error::InvalidConfig { .. }));
        assert!(gh.calls().is_empty());
    }

    #[test]
    fn test_preview_issues_no_calls() {
        let gh = MockGh::new();
        let repo = RepoSpec::new("acme", "widgets");
        apply_actions_repo(&gh, &selected_policy(&["{ORG}/*"]), &repo, true).unwrap();
        assert!(gh.calls().is_empty());
    }
}
