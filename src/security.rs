//! # Repository Security Policy
//!
//! Three per-repo security toggles (vulnerability alerts, automated
//! security fixes, private vulnerability reporting) plus the
//! `security_and_analysis` feature block. The toggles use dedicated REST
//! endpoints where enable is a `PUT` and disable a `DELETE`;
//! `security_and_analysis` entries are patched one key at a time so a
//! single rejected feature does not sink the rest.
//!
//! GitHub rejects some of these on plans or visibility levels where the
//! feature is unavailable or implicit, so every call here tolerates
//! failure: the public-repo Advanced Security message is ignored
//! silently, everything else is logged as a warning and the repo still
//! counts as applied.

use std::path::Path;

use serde_json::json;

use crate::batch::{apply_to_org, ApplySummary, BatchOptions, RepoSpec};
use crate::config::{self, SecurityConfig, SecurityPolicy};
use crate::error::Result;
use crate::gh::GhClient;

/// Stderr content GitHub emits when patching Advanced Security on a public
/// repo, where the feature is always on. Not worth a warning.
const PUBLIC_REPO_NOTICE: &str = "Advanced security is always available for public repos.";

fn toggle(gh: &dyn GhClient, repo: &RepoSpec, endpoint: &str, enable: bool) -> Result<()> {
    let method = if enable { "PUT" } else { "DELETE" };
    let out = gh.try_run(
        &["api", "-X", method, &format!("repos/{repo}/{endpoint}")],
        None,
    )?;
    if !out.success() {
        log::warn!(
            "security toggle {endpoint} ({method}) failed for {repo}: {}",
            out.stderr.trim()
        );
    }
    Ok(())
}

/// Apply the security policy to one repository.
pub fn apply_security_repo(
    gh: &dyn GhClient,
    policy: &SecurityPolicy,
    repo: &RepoSpec,
    preview: bool,
) -> Result<()> {
    if preview {
        println!("[preview] apply security policy on {repo}");
        return Ok(());
    }

    toggle(gh, repo, "vulnerability-alerts", policy.vulnerability_alerts)?;
    toggle(
        gh,
        repo,
        "automated-security-fixes",
        policy.automated_security_fixes,
    )?;
    toggle(
        gh,
        repo,
        "private-vulnerability-reporting",
        policy.private_vulnerability_reporting,
    )?;

    for (feature, status) in &policy.security_and_analysis {
        let payload = json!({
            "security_and_analysis": { feature: { "status": status.as_str() } }
        });
        let out = gh.try_run(
            &["api", "-X", "PATCH", &format!("repos/{repo}"), "--input", "-"],
            Some(&payload.to_string()),
        )?;
        if !out.success() && !out.stderr.contains(PUBLIC_REPO_NOTICE) {
            eprintln!(
                "[warn] security_and_analysis.{feature} update failed: {}",
                out.stderr.trim()
            );
        }
    }

    println!("updated security policy: {repo}");
    Ok(())
}

/// Apply the security policy template across an org.
pub fn apply_security_org(
    gh: &dyn GhClient,
    org: &str,
    config_file: &Path,
    opts: &BatchOptions,
) -> Result<ApplySummary> {
    let config: SecurityConfig = config::load_versioned(config_file)?;
    apply_to_org(gh, org, "security policy", opts, |repo| {
        let spec = RepoSpec::new(org, &repo.name);
        apply_security_repo(gh, &config.policy, &spec, opts.preview)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::FeatureStatus;
    use crate::test_util::MockGh;

    #[test]
    fn test_enabled_toggles_use_put() {
        let gh = MockGh::new();
        let repo = RepoSpec::new("acme", "widgets");
        apply_security_repo(&gh, &SecurityPolicy::default(), &repo, false).unwrap();

        let args = gh.call_args();
        assert_eq!(args.len(), 3);
        assert!(args[0].contains("-X PUT repos/acme/widgets/vulnerability-alerts"));
        assert!(args[1].contains("-X PUT repos/acme/widgets/automated-security-fixes"));
        assert!(args[2].contains("-X PUT repos/acme/widgets/private-vulnerability-reporting"));
    }

    #[test]
    fn test_disabled_toggles_use_delete() {
        let gh = MockGh::new();
        let repo = RepoSpec::new("acme", "widgets");
        let policy = SecurityPolicy {
            vulnerability_alerts: false,
            automated_security_fixes: false,
            private_vulnerability_reporting: false,
            ..SecurityPolicy::default()
        };
        apply_security_repo(&gh, &policy, &repo, false).unwrap();

        for args in gh.call_args() {
            assert!(args.contains("-X DELETE"), "expected DELETE: {args}");
        }
    }

    #[test]
    fn test_toggle_failure_is_tolerated() {
        let gh = MockGh::new().fail("automated-security-fixes", "HTTP 403: Forbidden");
        let repo = RepoSpec::new("acme", "widgets");
        apply_security_repo(&gh, &SecurityPolicy::default(), &repo, false).unwrap();
        // All three toggles are still attempted.
        assert_eq!(gh.calls().len(), 3);
    }

    #[test]
    fn test_analysis_features_patched_one_key_at_a_time() {
        let gh = MockGh::new();
        let repo = RepoSpec::new("acme", "widgets");
        let mut policy = SecurityPolicy::default();
        policy
            .security_and_analysis
            .insert("secret_scanning".to_string(), FeatureStatus::Enabled);
        policy
            .security_and_analysis
            .insert("secret_scanning_push_protection".to_string(), FeatureStatus::Disabled);
        apply_security_repo(&gh, &policy, &repo, false).unwrap();

        let patches: Vec<_> = gh
            .calls()
            .into_iter()
            .filter(|c| c.args.contains("-X PATCH"))
            .collect();
        assert_eq!(patches.len(), 2);
        assert!(patches[0].input.as_deref().unwrap().contains("secret_scanning"));
        assert!(patches[1]
            .input
            .as_deref()
            .unwrap()
            .contains("secret_scanning_push_protection"));
    }

    #[test]
    fn test_public_repo_advanced_security_notice_tolerated() {
        let gh = MockGh::new().fail("-X PATCH repos/acme/widgets", PUBLIC_REPO_NOTICE);
        let repo = RepoSpec::new("acme", "widgets");
        let mut policy = SecurityPolicy::default();
        policy
            .security_and_analysis
            .insert("advanced_security".to_string(), FeatureStatus::Enabled);
        apply_security_repo(&gh, &policy, &repo, false).unwrap();
    }

    #[test]
    fn test_preview_issues_no_calls() {
        let gh = MockGh::new();
        let repo = RepoSpec::new("acme", "widgets");
        apply_security_repo(&gh, &SecurityPolicy::default(), &repo, true).unwrap();
        assert!(gh.calls().is_empty());
    }
}
