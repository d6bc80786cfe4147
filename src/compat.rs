//! # Legacy Script Dispatch
//!
//! Before this tool existed, the same operations lived in a pile of shell
//! and TypeScript scripts invoked by path. `exec` keeps those call sites
//! working: a script path (with or without `./` and `src/` prefixes, `.sh`
//! or `.ts` suffix) maps to a [`ScriptId`], and each id translates its
//! ad-hoc flag list into the typed options the real operation takes.
//!
//! The mapping is an enum plus one exhaustive match, so adding an id
//! without handling it is a compile error.

use std::str::FromStr;

use crate::batch::{BatchOptions, RepoSpec};
use crate::config::{
    self, ActionsConfig, DiscussionsConfig, EnvironmentsConfig, OrgDefaults, RepoRoot,
    SecurityConfig, Visibility,
};
use crate::error::{Error, Result};
use crate::gh::GhClient;
use crate::rulesets::{
    apply_one_repo_policy, apply_org_policy, apply_rulesets_org, apply_rulesets_repo,
    RepoPolicyOptions, TeamSlugs,
};
use crate::teams::{self, DEFAULT_OWNER_USER};
use crate::{actions, discussions, environments, flows, security};

/// One legacy script identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScriptId {
    CreateRepoFlow,
    ApplyOrgConfig,
    InitOrgTeams,
    RemoveOrgTeams,
    ValidateProject,
    UpdateRulesetsRepo,
    UpdateRulesetsOrg,
    UpdateActionsPolicyRepo,
    UpdateActionsPolicyOrg,
    UpdateSecurityPolicyRepo,
    UpdateSecurityPolicyOrg,
    UpdateEnvironmentsRepo,
    UpdateEnvironmentsOrg,
    InitDiscussionsRepo,
    InitDiscussionsOrg,
    InitTeams,
    RemoveTeamsOrg,
    EnsureOrgTeams,
    ApplyOneRepoPolicy,
    CreateRepo,
    ApplyOrgPolicy,
    Manage,
}

impl FromStr for ScriptId {
    type Err = Error;

    fn from_str(input: &str) -> Result<Self> {
        let script = input.strip_prefix("./").unwrap_or(input);
        let script = script.strip_prefix("src/").unwrap_or(script);
        let stem = script
            .strip_suffix(".sh")
            .or_else(|| script.strip_suffix(".ts"))
            .ok_or_else(|| Error::UnsupportedScript {
                script: input.to_string(),
            })?;

        let id = match stem {
            "scripts/end/create_repo" => ScriptId::CreateRepoFlow,
            "scripts/end/apply_org_config" => ScriptId::ApplyOrgConfig,
            "scripts/end/init_org_teams" => ScriptId::InitOrgTeams,
            "scripts/end/remove_org_teams" => ScriptId::RemoveOrgTeams,
            "scripts/validate_project" => ScriptId::ValidateProject,
            "scripts/update_rulesets_repo" => ScriptId::UpdateRulesetsRepo,
            "scripts/update_rulesets_org" => ScriptId::UpdateRulesetsOrg,
            "scripts/update_actions_policy_repo" => ScriptId::UpdateActionsPolicyRepo,
            "scripts/update_actions_policy_org" => ScriptId::UpdateActionsPolicyOrg,
            "scripts/update_security_policy_repo" => ScriptId::UpdateSecurityPolicyRepo,
            "scripts/update_security_policy_org" => ScriptId::UpdateSecurityPolicyOrg,
            "scripts/update_environments_repo" => ScriptId::UpdateEnvironmentsRepo,
            "scripts/update_environments_org" => ScriptId::UpdateEnvironmentsOrg,
            "scripts/init_discussions_repo" => ScriptId::InitDiscussionsRepo,
            "scripts/init_discussions_org" => ScriptId::InitDiscussionsOrg,
            "scripts/init_teams" => ScriptId::InitTeams,
            "scripts/remove_teams_org" => ScriptId::RemoveTeamsOrg,
            "scripts/ensure_org_teams" => ScriptId::EnsureOrgTeams,
            "scripts/apply_one_repo_policy" | "apply_one_repo_policy" => {
                ScriptId::ApplyOneRepoPolicy
            }
            "scripts/create_repo" => ScriptId::CreateRepo,
            "scripts/apply_org_policy" => ScriptId::ApplyOrgPolicy,
            "scripts/gh_manage" | "manage" => ScriptId::Manage,
            _ => {
                return Err(Error::UnsupportedScript {
                    script: input.to_string(),
                })
            }
        };
        Ok(id)
    }
}

/// Whether a bare flag is present.
pub fn has_flag(args: &[String], flag: &str) -> bool {
    args.iter().any(|a| a == flag)
}

/// Value of a `--flag VALUE` pair, if the flag is present.
pub fn flag_value(args: &[String], flag: &str) -> Result<Option<String>> {
    let Some(idx) = args.iter().position(|a| a == flag) else {
        return Ok(None);
    };
    match args.get(idx + 1) {
        Some(value) if !value.starts_with("--") => Ok(Some(value.clone())),
        _ => Err(Error::FlagRequiresValue {
            flag: flag.to_string(),
        }),
    }
}

/// Value of a `--flag VALUE` pair, with a fallback for an absent flag.
pub fn flag_value_or(args: &[String], flag: &str, fallback: &str) -> Result<String> {
    Ok(flag_value(args, flag)?.unwrap_or_else(|| fallback.to_string()))
}

/// Non-negative integer value of a flag.
pub fn int_flag(args: &[String], flag: &str, fallback: u32) -> Result<u32> {
    match flag_value(args, flag)? {
        None => Ok(fallback),
        Some(raw) => raw.parse().map_err(|_| Error::FlagNotInteger {
            flag: flag.to_string(),
        }),
    }
}

/// Positional org arguments: everything that is not a flag or a manage
/// subcommand word.
pub fn org_list(args: &[String]) -> Vec<String> {
    let mut orgs = Vec::new();
    let mut skip_value = false;
    for arg in args {
        if skip_value {
            skip_value = false;
            continue;
        }
        if arg.starts_with("--") {
            skip_value = matches!(
                arg.as_str(),
                "--max-repos" | "--config" | "--bypass-team-slug" | "--reviewer-team-slug"
            );
            continue;
        }
        if matches!(arg.as_str(), "validate" | "plan" | "run") {
            continue;
        }
        orgs.push(arg.clone());
    }
    orgs
}

fn positional<'a>(args: &'a [String], index: usize, usage: &str) -> Result<&'a str> {
    match args.get(index) {
        Some(value) if !value.is_empty() && !value.starts_with("--") => Ok(value),
        _ => Err(Error::Usage {
            usage: usage.to_string(),
        }),
    }
}

fn required_org(args: &[String], usage: &str) -> Result<String> {
    match flag_value(args, "--org")? {
        Some(org) if !org.is_empty() => Ok(org),
        _ => Err(Error::Usage {
            usage: usage.to_string(),
        }),
    }
}

/// Org from `--org`, falling back to the module config's `org` field.
fn org_from_flag_or_config(args: &[String], defaults: &OrgDefaults, file: &str) -> Result<String> {
    if let Some(org) = flag_value(args, "--org")? {
        if !org.is_empty() {
            return Ok(org);
        }
    }
    defaults
        .org
        .clone()
        .filter(|org| !org.is_empty())
        .ok_or_else(|| Error::InvalidConfig {
            file: file.to_string(),
            message: "missing .org in config and --org was not provided".to_string(),
        })
}

fn compat_team_slugs(args: &[String]) -> Result<TeamSlugs> {
    let defaults = TeamSlugs::default();
    Ok(TeamSlugs {
        bypass: flag_value_or(args, "--bypass-team-slug", &defaults.bypass)?,
        reviewer: flag_value_or(args, "--reviewer-team-slug", &defaults.reviewer)?,
    })
}

/// Batch options for the module-config org scripts, where the config's
/// execution block supplies defaults the flags can only widen.
fn org_batch_options(args: &[String], defaults: &OrgDefaults) -> Result<BatchOptions> {
    Ok(BatchOptions {
        preview: has_flag(args, "--dry-run"),
        allow_private: has_flag(args, "--allow-private") || defaults.execution.include_private,
        include_archived: has_flag(args, "--include-archived")
            || defaults.execution.include_archived,
        max_repos: int_flag(args, "--max-repos", 0)?,
    })
}

/// Execute one legacy script invocation.
pub fn run_script(
    gh: &dyn GhClient,
    root: &RepoRoot,
    script: &str,
    args: &[String],
) -> Result<()> {
    match ScriptId::from_str(script)? {
        ScriptId::CreateRepoFlow => {
            let org = positional(args, 0, "create_repo <org> <repo>")?;
            let name = positional(args, 1, "create_repo <org> <repo>")?;
            flows::run_create_flow(gh, root, &RepoSpec::new(org, name))
        }

        ScriptId::ApplyOrgConfig => {
            let org = positional(args, 0, "apply_org_config <org>")?;
            flows::run_apply_org_flow(gh, root, org)
        }

        ScriptId::InitOrgTeams => {
            let org = positional(args, 0, "init_org_teams <org>")?;
            flows::run_init_teams_flow(gh, root, org)
        }

        ScriptId::RemoveOrgTeams => {
            let org = positional(args, 0, "remove_org_teams <org>")?;
            flows::run_remove_teams_flow(gh, root, org)
        }

        ScriptId::ValidateProject => flows::run_validate_flow(root),

        ScriptId::UpdateRulesetsRepo => {
            let repo = RepoSpec::parse(&flag_value_or(args, "--repo", "")?)?;
            let config_file =
                root.join_config(&flag_value_or(args, "--config", "./config/management.json")?);
            let teams = compat_team_slugs(args)?;
            apply_rulesets_repo(
                gh,
                root,
                &repo,
                &config_file,
                &teams,
                has_flag(args, "--dry-run"),
            )
        }

        ScriptId::UpdateRulesetsOrg => {
            let org = required_org(args, "update_rulesets_org --org ORG [options]")?;
            let config_file =
                root.join_config(&flag_value_or(args, "--config", "./config/management.json")?);
            let teams = compat_team_slugs(args)?;
            let opts = BatchOptions {
                preview: has_flag(args, "--dry-run"),
                allow_private: has_flag(args, "--allow-private"),
                include_archived: false,
                max_repos: int_flag(args, "--max-repos", 0)?,
            };
            apply_rulesets_org(gh, root, &org, &config_file, &teams, &opts).map(|_| ())
        }

        ScriptId::UpdateActionsPolicyRepo => {
            let repo = RepoSpec::parse(&flag_value_or(args, "--repo", "")?)?;
            let config_file = root
                .join_config(&flag_value_or(args, "--config", "./config/actions.config.json")?);
            let config: ActionsConfig = config::load_versioned(&config_file)?;
            actions::apply_actions_repo(gh, &config.policy, &repo, has_flag(args, "--dry-run"))
        }

        ScriptId::UpdateActionsPolicyOrg => {
            let config_file = root
                .join_config(&flag_value_or(args, "--config", "./config/actions.config.json")?);
            let defaults: OrgDefaults = config::load_json(&config_file)?;
            let org =
                org_from_flag_or_config(args, &defaults, &config_file.display().to_string())?;
            let opts = org_batch_options(args, &defaults)?;
            actions::apply_actions_org(gh, &org, &config_file, &opts).map(|_| ())
        }

        ScriptId::UpdateSecurityPolicyRepo => {
            let repo = RepoSpec::parse(&flag_value_or(args, "--repo", "")?)?;
            let config_file = root
                .join_config(&flag_value_or(args, "--config", "./config/security.config.json")?);
            let config: SecurityConfig = config::load_versioned(&config_file)?;
            security::apply_security_repo(gh, &config.policy, &repo, has_flag(args, "--dry-run"))
        }

        ScriptId::UpdateSecurityPolicyOrg => {
            let config_file = root
                .join_config(&flag_value_or(args, "--config", "./config/security.config.json")?);
            let defaults: OrgDefaults = config::load_json(&config_file)?;
            let org =
                org_from_flag_or_config(args, &defaults, &config_file.display().to_string())?;
            let opts = org_batch_options(args, &defaults)?;
            security::apply_security_org(gh, &org, &config_file, &opts).map(|_| ())
        }

        ScriptId::UpdateEnvironmentsRepo => {
            let repo = RepoSpec::parse(&flag_value_or(args, "--repo", "")?)?;
            let config_file = root.join_config(&flag_value_or(
                args,
                "--config",
                "./config/environments.config.json",
            )?);
            let config: EnvironmentsConfig = config::load_versioned(&config_file)?;
            environments::apply_environments_repo(
                gh,
                &config.environments,
                &repo,
                has_flag(args, "--dry-run"),
            )
        }

        ScriptId::UpdateEnvironmentsOrg => {
            let config_file = root.join_config(&flag_value_or(
                args,
                "--config",
                "./config/environments.config.json",
            )?);
            let defaults: OrgDefaults = config::load_json(&config_file)?;
            let org =
                org_from_flag_or_config(args, &defaults, &config_file.display().to_string())?;
            let opts = org_batch_options(args, &defaults)?;
            environments::apply_environments_org(gh, &org, &config_file, &opts).map(|_| ())
        }

        ScriptId::InitDiscussionsRepo => {
            let repo = RepoSpec::parse(&flag_value_or(args, "--repo", "")?)?;
            let config_file = root.join_config(&flag_value_or(
                args,
                "--config",
                "./config/discussions.config.json",
            )?);
            let config: DiscussionsConfig = config::load_versioned(&config_file)?;
            discussions::ensure_discussions_repo(
                gh,
                &config.template,
                &repo,
                has_flag(args, "--dry-run"),
            )
        }

        ScriptId::InitDiscussionsOrg => {
            let org = required_org(args, "init_discussions_org --org ORG [options]")?;
            let config_file = root.join_config(&flag_value_or(
                args,
                "--config",
                "./config/discussions.config.json",
            )?);
            let opts = BatchOptions {
                preview: has_flag(args, "--dry-run"),
                allow_private: has_flag(args, "--allow-private"),
                include_archived: has_flag(args, "--include-archived"),
                max_repos: int_flag(args, "--max-repos", 0)?,
            };
            discussions::ensure_discussions_org(gh, &org, &config_file, &opts).map(|_| ())
        }

        ScriptId::InitTeams => {
            let config_file =
                root.join_config(&flag_value_or(args, "--config", "./config/teams.config.json")?);
            let defaults: OrgDefaults = config::load_json(&config_file)?;
            let org =
                org_from_flag_or_config(args, &defaults, &config_file.display().to_string())?;
            let opts = BatchOptions {
                preview: has_flag(args, "--dry-run"),
                allow_private: true,
                include_archived: has_flag(args, "--include-archived"),
                max_repos: int_flag(args, "--max-repos", 0)?,
            };
            teams::init_teams(gh, root, &org, &config_file, &opts)
        }

        ScriptId::RemoveTeamsOrg => {
            let org = required_org(args, "remove_teams_org --org ORG [options]")?;
            let config_file =
                root.join_config(&flag_value_or(args, "--config", "./config/teams.config.json")?);
            teams::remove_teams(gh, &org, &config_file, has_flag(args, "--dry-run"))
        }

        ScriptId::EnsureOrgTeams => {
            let org = positional(args, 0, "ensure_org_teams <org> [--owner-user USER] [--dry-run]")?;
            let owner = flag_value_or(args, "--owner-user", DEFAULT_OWNER_USER)?;
            teams::ensure_org_teams(gh, org, &owner, has_flag(args, "--dry-run"))
        }

        ScriptId::ApplyOneRepoPolicy => {
            let usage = "apply_one_repo_policy <org> <repo> [options]";
            let org = positional(args, 0, usage)?;
            let name = positional(args, 1, usage)?;
            let rest = &args[2..];
            let visibility = flag_value(rest, "--repo-visibility")?.filter(|v| !v.is_empty());
            let archived = match flag_value(rest, "--repo-archived")?.as_deref() {
                Some("true") => Some(true),
                Some("false") => Some(false),
                _ => None,
            };
            let opts = RepoPolicyOptions {
                config_file: root.join_config("config/management.json"),
                allow_private: has_flag(rest, "--allow-private"),
                visibility,
                archived,
                preview: has_flag(rest, "--dry-run"),
                teams: TeamSlugs::default(),
            };
            apply_one_repo_policy(gh, root, &RepoSpec::new(org, name), &opts)
        }

        ScriptId::CreateRepo => {
            let usage = "create_repo <org> <repo> [options]";
            let org = positional(args, 0, usage)?;
            let name = positional(args, 1, usage)?;
            let rest = &args[2..];
            let opts = flows::CreateRepoOptions {
                visibility: if has_flag(rest, "--private") {
                    Visibility::Private
                } else {
                    Visibility::Public
                },
                description: flag_value_or(rest, "--description", "")?,
                template: flag_value_or(rest, "--template", "")?,
                apply_policy: !has_flag(rest, "--no-apply-policy"),
                preview: has_flag(rest, "--dry-run"),
                allow_private_policy: has_flag(rest, "--allow-private-policy"),
            };
            flows::create_repo(
                gh,
                root,
                &RepoSpec::new(org, name),
                &root.join_config("config/management.json"),
                &opts,
            )
        }

        ScriptId::ApplyOrgPolicy => {
            let orgs = org_list(args);
            if orgs.is_empty() {
                return Err(Error::Usage {
                    usage: "apply_org_policy <org> [org...] [options]".to_string(),
                });
            }
            let opts = RepoPolicyOptions {
                config_file: root.join_config("config/management.json"),
                allow_private: has_flag(args, "--allow-private"),
                visibility: None,
                archived: None,
                preview: has_flag(args, "--dry-run"),
                teams: TeamSlugs::default(),
            };
            apply_org_policy(gh, root, &orgs, &opts, int_flag(args, "--max-repos", 0)?)
                .map(|_| ())
        }

        ScriptId::Manage => {
            let command = args.iter().find_map(|a| match a.as_str() {
                "validate" => Some(flows::ManageCommand::Validate),
                "plan" => Some(flows::ManageCommand::Plan),
                "run" => Some(flows::ManageCommand::Run),
                _ => None,
            });
            let Some(command) = command else {
                return Err(Error::Usage {
                    usage: "gh_manage <validate|plan|run> [--config FILE]".to_string(),
                });
            };
            let config_file =
                root.join_config(&flag_value_or(args, "--config", "./config/management.json")?);
            flows::run_manage(gh, root, &config_file, command)
        }
    }
}
