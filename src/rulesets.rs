//! # Repository Settings and Branch-Protection Rulesets
//!
//! Loads the management policy bundle (repo-settings patch + ruleset
//! payloads), resolves team-id placeholders inside ruleset templates, and
//! upserts rulesets by name: list the repository's existing rulesets, match
//! on the configured name (first match wins, duplicate names are not
//! detected), then `PUT` the match or `POST` a new one.
//!
//! Also hosts the composed policy operations built on those pieces:
//! applying the full policy (settings + rulesets) to one repository, and
//! sweeping it across one or many orgs.

use std::path::{Path, PathBuf};

use serde::Deserialize;
use serde_json::Value;

use crate::batch::{apply_to_org, ApplySummary, BatchOptions, RepoSpec};
use crate::config::{self, ManagementConfig, RepoRoot, RepoSettingsConfig, RulesetsConfig};
use crate::error::{Error, Result};
use crate::gh::GhClient;

/// Quoted placeholder replaced with the bypass team's numeric id.
pub const BYPASS_TEAM_PLACEHOLDER: &str = "__BYPASS_TEAM_ID__";
/// Quoted placeholder replaced with the required-reviewer team's id.
pub const REVIEWER_TEAM_PLACEHOLDER: &str = "__REQUIRED_REVIEWER_TEAM_ID__";

const DEFAULT_REPO_SETTINGS_CONFIG: &str = "./config/repo-settings.config.json";
const DEFAULT_RULESETS_CONFIG: &str = "./config/rulesets.config.json";

/// Team slugs referenced by ruleset templates.
#[derive(Debug, Clone)]
pub struct TeamSlugs {
    /// Emergency bypass team.
    pub bypass: String,
    /// Allowed PR reviewers team.
    pub reviewer: String,
}

impl Default for TeamSlugs {
    fn default() -> Self {
        Self {
            bypass: "warden-bypass".to_string(),
            reviewer: "warden-approvers".to_string(),
        }
    }
}

/// The management policy bundle: settings patch, ruleset payloads, and the
/// optional single-ruleset name override.
#[derive(Debug, Clone)]
pub struct PolicyBundle {
    pub repo_settings: Value,
    pub rulesets: Vec<Value>,
    pub ruleset_name: String,
}

impl PolicyBundle {
    /// Name override for a ruleset, honored only when exactly one ruleset
    /// is configured.
    pub fn force_name(&self) -> Option<&str> {
        if self.rulesets.len() == 1 && !self.ruleset_name.is_empty() {
            Some(&self.ruleset_name)
        } else {
            None
        }
    }
}

/// Load the management config and the policy documents it points to.
pub fn load_policy_bundle(root: &RepoRoot, config_file: &Path) -> Result<PolicyBundle> {
    let management: ManagementConfig = config::load_versioned(config_file)?;

    let settings_path = root.join_config(
        management
            .policy
            .repo_settings_config
            .as_deref()
            .unwrap_or(DEFAULT_REPO_SETTINGS_CONFIG),
    );
    require_exists(&settings_path)?;
    let settings_config: RepoSettingsConfig = config::load_versioned(&settings_path)?;
    if !settings_config.settings.is_object() {
        return Err(Error::InvalidConfig {
            file: settings_path.display().to_string(),
            message: "settings must be a JSON object".to_string(),
        });
    }

    let rulesets_path = root.join_config(
        management
            .policy
            .rulesets_config
            .as_deref()
            .unwrap_or(DEFAULT_RULESETS_CONFIG),
    );
    require_exists(&rulesets_path)?;
    let rulesets_config: RulesetsConfig = config::load_versioned(&rulesets_path)?;
    if rulesets_config.rulesets.is_empty() {
        return Err(Error::InvalidConfig {
            file: rulesets_path.display().to_string(),
            message: "rulesets must be a non-empty array".to_string(),
        });
    }

    Ok(PolicyBundle {
        repo_settings: settings_config.settings,
        rulesets: rulesets_config.rulesets,
        ruleset_name: management.policy.ruleset_name.unwrap_or_default(),
    })
}

fn require_exists(path: &Path) -> Result<()> {
    if !path.exists() {
        return Err(Error::MissingFile {
            path: path.display().to_string(),
        });
    }
    Ok(())
}

fn team_id(gh: &dyn GhClient, org: &str, slug: &str) -> Result<String> {
    gh.run(
        &["api", &format!("orgs/{org}/teams/{slug}"), "--jq", ".id"],
        None,
    )
}

/// Substitute team-id placeholders in a serialized ruleset template.
///
/// Each team lookup happens only when its placeholder is actually present,
/// so a template without `__REQUIRED_REVIEWER_TEAM_ID__` costs no reviewer
/// lookup.
pub fn resolve_ruleset_template(
    gh: &dyn GhClient,
    raw: &str,
    org: &str,
    teams: &TeamSlugs,
) -> Result<String> {
    let mut resolved = raw.to_string();
    if resolved.contains(BYPASS_TEAM_PLACEHOLDER) {
        let id = team_id(gh, org, &teams.bypass)?;
        resolved = resolved.replace(&format!("\"{BYPASS_TEAM_PLACEHOLDER}\""), id.trim());
    }
    if resolved.contains(REVIEWER_TEAM_PLACEHOLDER) {
        let id = team_id(gh, org, &teams.reviewer)?;
        resolved = resolved.replace(&format!("\"{REVIEWER_TEAM_PLACEHOLDER}\""), id.trim());
    }
    Ok(resolved)
}

#[derive(Debug, Deserialize)]
struct RulesetEntry {
    id: u64,
    name: String,
}

/// Create or update one ruleset on a repository, keyed by name.
pub fn upsert_ruleset(
    gh: &dyn GhClient,
    repo: &RepoSpec,
    ruleset: &Value,
    teams: &TeamSlugs,
    force_name: Option<&str>,
    preview: bool,
) -> Result<()> {
    let raw = serde_json::to_string(ruleset)?;
    let resolved = resolve_ruleset_template(gh, &raw, &repo.org, teams)?;
    let payload: Value = config::parse_json(&resolved, "rulesets.config.json")?;

    let name = force_name
        .filter(|n| !n.is_empty())
        .map(str::to_string)
        .or_else(|| {
            payload
                .get("name")
                .and_then(Value::as_str)
                .map(str::to_string)
        })
        .ok_or_else(|| Error::InvalidConfig {
            file: "rulesets.config.json".to_string(),
            message: "missing ruleset name".to_string(),
        })?;

    let listing = gh.run(
        &[
            "api",
            &format!("repos/{repo}/rulesets"),
            "--jq",
            ".[] | {id,name}",
        ],
        None,
    )?;

    // First name match wins; duplicate-named rulesets are left alone.
    let mut existing_id = None;
    for line in listing.lines().filter(|l| !l.trim().is_empty()) {
        let entry: RulesetEntry = config::parse_json(line, "rulesets list entry")?;
        if entry.name == name {
            existing_id = Some(entry.id);
            break;
        }
    }

    if preview {
        let action = if existing_id.is_some() {
            "update"
        } else {
            "create"
        };
        println!("[preview] {action} ruleset: {name}");
        return Ok(());
    }

    match existing_id {
        Some(id) => {
            gh.run(
                &[
                    "api",
                    "-X",
                    "PUT",
                    &format!("repos/{repo}/rulesets/{id}"),
                    "--input",
                    "-",
                ],
                Some(&resolved),
            )?;
            println!("updated: {name}");
        }
        None => {
            gh.run(
                &[
                    "api",
                    "-X",
                    "POST",
                    &format!("repos/{repo}/rulesets"),
                    "--input",
                    "-",
                ],
                Some(&resolved),
            )?;
            println!("created: {name}");
        }
    }
    Ok(())
}

/// Apply every configured ruleset to one repository.
pub fn apply_rulesets_repo(
    gh: &dyn GhClient,
    root: &RepoRoot,
    repo: &RepoSpec,
    config_file: &Path,
    teams: &TeamSlugs,
    preview: bool,
) -> Result<()> {
    let bundle = load_policy_bundle(root, config_file)?;
    for ruleset in &bundle.rulesets {
        upsert_ruleset(gh, repo, ruleset, teams, bundle.force_name(), preview)?;
    }
    Ok(())
}

/// Apply the configured rulesets across an org.
///
/// Archived repositories are always skipped here; there is no
/// include-archived escape hatch for branch protection.
pub fn apply_rulesets_org(
    gh: &dyn GhClient,
    root: &RepoRoot,
    org: &str,
    config_file: &Path,
    teams: &TeamSlugs,
    opts: &BatchOptions,
) -> Result<ApplySummary> {
    let bundle = load_policy_bundle(root, config_file)?;
    let opts = BatchOptions {
        include_archived: false,
        ..*opts
    };
    apply_to_org(gh, org, "rulesets org apply", &opts, |repo| {
        let spec = RepoSpec::new(org, &repo.name);
        // One bad ruleset must not keep the rest from being attempted;
        // the repo is still marked failed afterwards.
        let mut first_err = None;
        for ruleset in &bundle.rulesets {
            if let Err(err) = upsert_ruleset(gh, &spec, ruleset, teams, None, opts.preview) {
                eprintln!("[error] {err}");
                first_err.get_or_insert(err);
            }
        }
        match first_err {
            None => Ok(()),
            Some(err) => Err(err),
        }
    })
}

/// Send the repo-settings patch to one repository.
pub fn patch_repo_settings(
    gh: &dyn GhClient,
    repo: &RepoSpec,
    settings: &Value,
    preview: bool,
) -> Result<()> {
    if preview {
        println!("[preview] gh api -X PATCH repos/{repo} --input repo-settings.config.json");
        return Ok(());
    }
    let payload = serde_json::to_string(settings)?;
    gh.run(
        &["api", "-X", "PATCH", &format!("repos/{repo}"), "--input", "-"],
        Some(&payload),
    )?;
    Ok(())
}

/// Options for applying the full policy to one repository.
#[derive(Debug, Clone)]
pub struct RepoPolicyOptions {
    pub config_file: PathBuf,
    pub allow_private: bool,
    /// Visibility, when the caller already knows it (skips a lookup).
    pub visibility: Option<String>,
    /// Archived flag, when the caller already knows it.
    pub archived: Option<bool>,
    pub preview: bool,
    pub teams: TeamSlugs,
}

#[derive(Debug, Deserialize)]
struct RepoMeta {
    visibility: String,
    archived: bool,
}

/// Apply repo settings plus every ruleset to a single repository.
///
/// Archived repos and (without `allow_private`) non-public repos are
/// skipped with a log line, not an error.
pub fn apply_one_repo_policy(
    gh: &dyn GhClient,
    root: &RepoRoot,
    repo: &RepoSpec,
    opts: &RepoPolicyOptions,
) -> Result<()> {
    let bundle = load_policy_bundle(root, &opts.config_file)?;

    let (visibility, archived) = match (&opts.visibility, opts.archived) {
        (Some(visibility), Some(archived)) => (visibility.clone(), archived),
        _ => {
            let out = gh.run(
                &[
                    "api",
                    &format!("repos/{repo}"),
                    "--jq",
                    "{visibility, archived}",
                ],
                None,
            )?;
            let meta: RepoMeta = config::parse_json(&out, &format!("repos/{repo}"))?;
            (meta.visibility, meta.archived)
        }
    };

    if archived {
        println!("Skipping {repo} (archived).");
        return Ok(());
    }
    if visibility != "public" && !opts.allow_private {
        println!("Skipping {repo} (visibility={visibility}, use --allow-private to include).");
        return Ok(());
    }

    println!("Applying policy to {repo} (visibility={visibility})");
    patch_repo_settings(gh, repo, &bundle.repo_settings, opts.preview)?;

    let mut applied = 0;
    for ruleset in &bundle.rulesets {
        upsert_ruleset(gh, repo, ruleset, &opts.teams, bundle.force_name(), opts.preview)?;
        applied += 1;
    }
    println!("Applied: settings patched, rulesets applied={applied}");
    Ok(())
}

/// Sweep the full policy across several orgs, accumulating an overall
/// summary. Per-org failures do not stop later orgs; the overall result
/// fails if any repo anywhere failed.
pub fn apply_org_policy(
    gh: &dyn GhClient,
    root: &RepoRoot,
    orgs: &[String],
    opts: &RepoPolicyOptions,
    max_repos: u32,
) -> Result<ApplySummary> {
    let mut total = ApplySummary {
        preview: opts.preview,
        ..ApplySummary::default()
    };

    for org in orgs {
        println!("\n=== Org: {org} ===");
        let batch = BatchOptions {
            preview: opts.preview,
            allow_private: opts.allow_private,
            include_archived: false,
            max_repos,
        };
        let result = apply_to_org(gh, org, "org policy", &batch, |repo| {
            let spec = RepoSpec::new(org.as_str(), &repo.name);
            let per_repo = RepoPolicyOptions {
                visibility: Some(repo.visibility.clone()),
                archived: Some(repo.is_archived),
                ..opts.clone()
            };
            apply_one_repo_policy(gh, root, &spec, &per_repo)
        });
        let summary = match result {
            Ok(summary) => summary,
            Err(Error::BatchFailed { summary, .. }) => summary,
            Err(err) => return Err(err),
        };
        total.accumulate(&summary);
    }

    println!("\n=== Overall summary ===");
    println!(
        "seen={} applied={} skipped={} failed={}",
        total.seen, total.applied, total.skipped, total.failed
    );
    if total.failed > 0 {
        return Err(Error::BatchFailed {
            operation: "org policy apply".to_string(),
            summary: total,
        });
    }
    Ok(total)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_util::MockGh;
    use serde_json::json;
    use std::fs;
    use tempfile::TempDir;

    fn write_config(dir: &TempDir, name: &str, contents: &str) {
        let config_dir = dir.path().join("config");
        fs::create_dir_all(&config_dir).unwrap();
        fs::write(config_dir.join(name), contents).unwrap();
    }

    fn ruleset_with_bypass() -> Value {
        json!({
            "name": "main-protection",
            "enforcement": "active",
            "bypass_actors": [
                {"actor_id": "__BYPASS_TEAM_ID__", "actor_type": "Team", "bypass_mode": "always"}
            ]
        })
    }

    #[test]
    fn test_template_substitution_only_looks_up_present_placeholders() {
        let gh = MockGh::new().ok("orgs/acme/teams/warden-bypass", "42");
        let raw = serde_json::to_string(&ruleset_with_bypass()).unwrap();
        let resolved =
            resolve_ruleset_template(&gh, &raw, "acme", &TeamSlugs::default()).unwrap();

        assert!(resolved.contains("\"actor_id\":42"));
        assert!(!resolved.contains(BYPASS_TEAM_PLACEHOLDER));

        let team_lookups: Vec<_> = gh
            .call_args()
            .into_iter()
            .filter(|args| args.contains("/teams/"))
            .collect();
        assert_eq!(team_lookups.len(), 1, "reviewer team must not be looked up");
    }

    #[test]
    fn test_template_without_placeholders_makes_no_calls() {
        let gh = MockGh::new();
        let raw = r#"{"name":"plain"}"#;
        let resolved =
            resolve_ruleset_template(&gh, raw, "acme", &TeamSlugs::default()).unwrap();
        assert_eq!(resolved, raw);
        assert!(gh.calls().is_empty());
    }

    #[test]
    fn test_upsert_creates_when_no_name_matches() {
        let gh = MockGh::new()
            .ok("orgs/acme/teams/warden-bypass", "42")
            .ok("repos/acme/widgets/rulesets", "");
        let repo = RepoSpec::new("acme", "widgets");
        upsert_ruleset(
            &gh,
            &repo,
            &ruleset_with_bypass(),
            &TeamSlugs::default(),
            None,
            false,
        )
        .unwrap();

        let mutating = gh.mutating_calls();
        assert_eq!(mutating.len(), 1);
        assert!(mutating[0].contains("-X POST repos/acme/widgets/rulesets"));
    }

    #[test]
    fn test_upsert_updates_when_name_matches() {
        let existing = "{\"id\":7,\"name\":\"main-protection\"}\n{\"id\":9,\"name\":\"other\"}";
        let gh = MockGh::new()
            .ok("orgs/acme/teams/warden-bypass", "42")
            .ok("-X PUT repos/acme/widgets/rulesets/7", "")
            .ok("repos/acme/widgets/rulesets", existing);
        let repo = RepoSpec::new("acme", "widgets");
        upsert_ruleset(
            &gh,
            &repo,
            &ruleset_with_bypass(),
            &TeamSlugs::default(),
            None,
            false,
        )
        .unwrap();

        let mutating = gh.mutating_calls();
        assert_eq!(mutating.len(), 1);
        assert!(mutating[0].contains("-X PUT repos/acme/widgets/rulesets/7"));
    }

    #[test]
    fn test_upsert_is_idempotent_across_runs() {
        let repo = RepoSpec::new("acme", "widgets");
        let ruleset = json!({"name": "main-protection"});

        // First run: nothing exists, so the create path is taken.
        let first = MockGh::new().ok("repos/acme/widgets/rulesets", "");
        upsert_ruleset(&first, &repo, &ruleset, &TeamSlugs::default(), None, false).unwrap();
        assert!(first.mutating_calls()[0].contains("-X POST"));

        // Second run: the listing now contains the ruleset, so it is
        // updated rather than duplicated.
        let second = MockGh::new()
            .ok("-X PUT repos/acme/widgets/rulesets/11", "")
            .ok(
                "repos/acme/widgets/rulesets",
                "{\"id\":11,\"name\":\"main-protection\"}",
            );
        upsert_ruleset(&second, &repo, &ruleset, &TeamSlugs::default(), None, false).unwrap();
        let mutating = second.mutating_calls();
        assert_eq!(mutating.len(), 1);
        assert!(mutating[0].contains("-X PUT"));
    }

    #[test]
    fn test_upsert_preview_never_mutates() {
        let gh = MockGh::new().ok("repos/acme/widgets/rulesets", "");
        let repo = RepoSpec::new("acme", "widgets");
        upsert_ruleset(
            &gh,
            &repo,
            &json!({"name": "main-protection"}),
            &TeamSlugs::default(),
            None,
            true,
        )
        .unwrap();
        assert!(gh.mutating_calls().is_empty());
    }

    #[test]
    fn test_upsert_requires_a_name() {
        let gh = MockGh::new();
        let repo = RepoSpec::new("acme", "widgets");
        let err = upsert_ruleset(
            &gh,
            &repo,
            &json!({"enforcement": "active"}),
            &TeamSlugs::default(),
            None,
            false,
        )
        .unwrap_err();
        assert!(matches!(err, Error::InvalidConfig { .. }));
    }

    #[test]
    fn test_force_name_applies_to_single_ruleset_only() {
        let single = PolicyBundle {
            repo_settings: json!({}),
            rulesets: vec![json!({"name": "a"})],
            ruleset_name: "forced".to_string(),
        };
        assert_eq!(single.force_name(), Some("forced"));

        let many = PolicyBundle {
            repo_settings: json!({}),
            rulesets: vec![json!({"name": "a"}), json!({"name": "b"})],
            ruleset_name: "forced".to_string(),
        };
        assert_eq!(many.force_name(), None);
    }

    #[test]
    fn test_org_sweep_attempts_remaining_rulesets_after_failure() {
        let dir = TempDir::new().unwrap();
        write_config(&dir, "management.json", r#"{"version":1}"#);
        write_config(
            &dir,
            "repo-settings.config.json",
            r#"{"version":1,"settings":{}}"#,
        );
        // The first ruleset needs a team lookup that will fail; the second
        // has no placeholder and must still be attempted.
        write_config(
            &dir,
            "rulesets.config.json",
            r#"{
                "version": 1,
                "rulesets": [
                    {
                        "name": "alpha",
                        "bypass_actors": [{"actor_id": "__BYPASS_TEAM_ID__", "actor_type": "Team"}]
                    },
                    {"name": "beta"}
                ]
            }"#,
        );
        let root = RepoRoot::from(dir.path().to_path_buf());
        let gh = MockGh::new()
            .fail("teams/warden-bypass", "HTTP 404")
            .ok(
                "repo list acme",
                r#"[{"name": "widgets", "visibility": "public", "isArchived": false}]"#,
            )
            .ok("repos/acme/widgets/rulesets", "");
        let opts = BatchOptions {
            allow_private: true,
            ..BatchOptions::default()
        };
        let err = apply_rulesets_org(
            &gh,
            &root,
            "acme",
            &root.join_config("./config/management.json"),
            &TeamSlugs::default(),
            &opts,
        )
        .unwrap_err();

        match err {
            Error::BatchFailed { summary, .. } => {
                assert_eq!(summary.seen, 1);
                assert_eq!(summary.failed, 1);
            }
            other => panic!("unexpected error: {other}"),
        }
        // "beta" was still created despite "alpha" failing first.
        let mutating = gh.mutating_calls();
        assert_eq!(mutating.len(), 1);
        assert!(mutating[0].contains("-X POST repos/acme/widgets/rulesets"));
    }

    #[test]
    fn test_patch_repo_settings_preview_skips_call() {
        let gh = MockGh::new();
        let repo = RepoSpec::new("acme", "widgets");
        patch_repo_settings(&gh, &repo, &json!({"has_wiki": false}), true).unwrap();
        assert!(gh.calls().is_empty());
    }

    #[test]
    fn test_patch_repo_settings_sends_payload() {
        let gh = MockGh::new();
        let repo = RepoSpec::new("acme", "widgets");
        patch_repo_settings(&gh, &repo, &json!({"has_wiki": false}), false).unwrap();
        let calls = gh.calls();
        assert_eq!(calls.len(), 1);
        assert!(calls[0].args.contains("-X PATCH repos/acme/widgets"));
        assert!(calls[0].input.as_deref().unwrap().contains("has_wiki"));
    }
}
