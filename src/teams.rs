//! # Organization Team Management
//!
//! Upserts the configured org teams (slug, title, privacy, notification
//! setting), grants each team its effective repo permission across the
//! org, and provides the reverse operation that deletes managed teams.
//! Also bootstraps the two teams referenced by ruleset templates.
//!
//! The effective permission for a team is resolved from its role tokens
//! before any `gh` call happens, so a typo in the config fails fast
//! instead of half-way through an org sweep.

use std::path::Path;

use crate::batch::{list_repos, BatchOptions, RepoSpec};
use crate::config::{self, RepoRoot, TeamSpec, TeamsConfig};
use crate::error::{Error, Result};
use crate::gh::GhClient;
use crate::permissions::{effective_permission, notification_setting, privacy_from_visible};

/// Default owner user granted membership in the bypass team.
pub const DEFAULT_OWNER_USER: &str = "warden-admin";

/// Slug of the bootstrap team allowed to bypass rulesets.
pub const BYPASS_TEAM_SLUG: &str = "warden-bypass";
/// Slug of the bootstrap team of required PR reviewers.
pub const REVIEWER_TEAM_SLUG: &str = "warden-approvers";

fn team_exists(gh: &dyn GhClient, org: &str, slug: &str) -> Result<bool> {
    let out = gh.try_run(&["api", &format!("orgs/{org}/teams/{slug}")], None)?;
    Ok(out.success())
}

/// Create or update one team in the org.
pub fn ensure_team(gh: &dyn GhClient, org: &str, team: &TeamSpec, preview: bool) -> Result<()> {
    let privacy = privacy_from_visible(team.visible);
    let notification = notification_setting(&team.notification);

    if team_exists(gh, org, &team.slug)? {
        if preview {
            println!("[preview] update team: {}", team.slug);
            return Ok(());
        }
        gh.run(
            &[
                "api",
                "-X",
                "PATCH",
                &format!("orgs/{org}/teams/{}", team.slug),
                "-f",
                &format!("name={}", team.title),
                "-f",
                &format!("description={}", team.description),
                "-f",
                &format!("privacy={privacy}"),
                "-f",
                &format!("notification_setting={notification}"),
            ],
            None,
        )?;
        println!("updated team: {}", team.slug);
    } else {
        if preview {
            println!("[preview] create team: {}", team.slug);
            return Ok(());
        }
        gh.run(
            &[
                "api",
                "-X",
                "POST",
                &format!("orgs/{org}/teams"),
                "-f",
                &format!("name={}", team.title),
                "-f",
                &format!("description={}", team.description),
                "-f",
                &format!("privacy={privacy}"),
                "-f",
                &format!("notification_setting={notification}"),
                "-f",
                "permission=pull",
            ],
            None,
        )?;
        println!("created team: {}", team.slug);
    }
    Ok(())
}

/// Grant a team a permission on one repository.
pub fn grant_repo_permission(
    gh: &dyn GhClient,
    org: &str,
    slug: &str,
    repo: &RepoSpec,
    permission: &str,
    preview: bool,
) -> Result<()> {
    if preview {
        println!("[preview] grant {permission} to {slug} on {repo}");
        return Ok(());
    }
    gh.run(
        &[
            "api",
            "-X",
            "PUT",
            &format!("orgs/{org}/teams/{slug}/repos/{repo}"),
            "-f",
            &format!("permission={permission}"),
        ],
        None,
    )?;
    Ok(())
}

/// Upsert every configured team and grant its permission across the org.
pub fn init_teams(
    gh: &dyn GhClient,
    root: &RepoRoot,
    org: &str,
    config_file: &Path,
    opts: &BatchOptions,
) -> Result<()> {
    let config: TeamsConfig = config::load_versioned(config_file)?;

    for team in &config.teams {
        if team.slug.is_empty() || team.title.is_empty() {
            return Err(Error::InvalidConfig {
                file: config_file.display().to_string(),
                message: "team entries require slug and title".to_string(),
            });
        }

        // Resolved before any gh call: an unknown role token aborts here.
        let permission = effective_permission(&team.roles)?;
        println!("\n== Team: {}", team.slug);
        println!("   effective_repo_permission={permission}");

        ensure_team(gh, org, team, opts.preview)?;

        if let Some(image) = &team.image {
            let asset = root.join_config(image);
            if asset.exists() {
                println!("   avatar asset found: {image} (upload not supported via REST)");
            } else {
                println!("   avatar asset missing: {image}");
            }
        }

        if team.access != "all-repos" {
            println!("   access={} (skipping repo grants)", team.access);
            continue;
        }

        let mut granted: u32 = 0;
        for repo in list_repos(gh, org)? {
            if opts.max_repos > 0 && granted >= opts.max_repos {
                break;
            }
            if repo.is_archived && !opts.include_archived {
                continue;
            }
            let spec = RepoSpec::new(org, &repo.name);
            grant_repo_permission(gh, org, &team.slug, &spec, permission, opts.preview)?;
            granted += 1;
        }
        println!("   repos granted: {granted}");
    }
    Ok(())
}

/// Delete the configured teams, skipping ones that do not exist.
pub fn remove_teams(
    gh: &dyn GhClient,
    org: &str,
    config_file: &Path,
    preview: bool,
) -> Result<()> {
    let config: TeamsConfig = config::load_versioned(config_file)?;

    for team in &config.teams {
        if !team_exists(gh, org, &team.slug)? {
            println!("[skip] team not found: {}", team.slug);
            continue;
        }
        if preview {
            println!("[preview] delete team: {}", team.slug);
            continue;
        }
        gh.run(
            &[
                "api",
                "-X",
                "DELETE",
                &format!("orgs/{org}/teams/{}", team.slug),
            ],
            None,
        )?;
        println!("deleted team: {}", team.slug);
    }
    println!("Done");
    Ok(())
}

fn bootstrap_team(
    gh: &dyn GhClient,
    org: &str,
    slug: &str,
    description: &str,
    preview: bool,
) -> Result<()> {
    if team_exists(gh, org, slug)? {
        println!("team exists: {slug}");
        return Ok(());
    }
    if preview {
        println!("[preview] create team: {org}/{slug}");
        return Ok(());
    }
    gh.run(
        &[
            "api",
            "-X",
            "POST",
            &format!("orgs/{org}/teams"),
            "-f",
            &format!("name={slug}"),
            "-f",
            &format!("description={description}"),
            "-f",
            "privacy=closed",
            "-f",
            "permission=pull",
        ],
        None,
    )?;
    println!("created team: {slug}");
    Ok(())
}

/// Create the two teams ruleset templates refer to, ensure the owner
/// user's bypass membership, and echo both team ids.
pub fn ensure_org_teams(gh: &dyn GhClient, org: &str, owner_user: &str, preview: bool) -> Result<()> {
    bootstrap_team(
        gh,
        org,
        REVIEWER_TEAM_SLUG,
        "Allowed reviewers for protected branch PR approvals",
        preview,
    )?;
    bootstrap_team(
        gh,
        org,
        BYPASS_TEAM_SLUG,
        "Single-user bypass team for emergency ruleset bypass",
        preview,
    )?;

    if preview {
        println!("[preview] ensure member: {owner_user} in {org}/{BYPASS_TEAM_SLUG}");
    } else {
        gh.run(
            &[
                "api",
                "-X",
                "PUT",
                &format!("orgs/{org}/teams/{BYPASS_TEAM_SLUG}/memberships/{owner_user}"),
                "-f",
                "role=member",
            ],
            None,
        )?;
        println!("Member ensured: {owner_user} -> {org}/{BYPASS_TEAM_SLUG}");
    }

    for slug in [REVIEWER_TEAM_SLUG, BYPASS_TEAM_SLUG] {
        let out = gh.try_run(
            &["api", &format!("orgs/{org}/teams/{slug}"), "--jq", ".id"],
            None,
        )?;
        if out.success() {
            println!("{slug}: id={}", out.stdout.trim());
        }
    }
    Ok(())
}
