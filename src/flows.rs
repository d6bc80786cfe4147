//! # Top-Level Flows
//!
//! The operations the CLI surface exposes, composed from the per-module
//! pieces: the create-repo bootstrap, the org-wide policy sweep, team
//! init/removal, config validation, and the declarative manage runner
//! driven by `config/management.json`.

use std::path::{Path, PathBuf};

use walkdir::WalkDir;

use crate::actions::{apply_actions_org, apply_actions_repo};
use crate::batch::{BatchOptions, RepoSpec};
use crate::config::{
    self, ActionsConfig, AppConfig, DiscussionsConfig, EnvironmentsConfig, ManagementConfig,
    ModuleConfig, RepoRoot, SecurityConfig, Visibility,
};
use crate::discussions::{ensure_discussions_org, ensure_discussions_repo};
use crate::environments::{apply_environments_org, apply_environments_repo};
use crate::error::{Error, Result};
use crate::gh::{self, GhClient};
use crate::rulesets::{
    apply_one_repo_policy, apply_org_policy, apply_rulesets_org, apply_rulesets_repo,
    load_policy_bundle, RepoPolicyOptions, TeamSlugs,
};
use crate::security::{apply_security_org, apply_security_repo};
use crate::teams;

const DEFAULT_MANAGEMENT_CONFIG: &str = "./config/management.json";
const DEFAULT_ACTIONS_CONFIG: &str = "./config/actions.config.json";
const DEFAULT_SECURITY_CONFIG: &str = "./config/security.config.json";
const DEFAULT_ENVIRONMENTS_CONFIG: &str = "./config/environments.config.json";
const DEFAULT_DISCUSSIONS_CONFIG: &str = "./config/discussions.config.json";
const DEFAULT_TEAMS_CONFIG: &str = "./config/teams.config.json";

fn module_path(root: &RepoRoot, module: &ModuleConfig, default: &str) -> PathBuf {
    root.join_config(module.config.as_deref().unwrap_or(default))
}

fn load_app_config(root: &RepoRoot) -> Result<AppConfig> {
    config::load_versioned(&root.app_config_path())
}

/// Options for creating (or adopting) one repository.
#[derive(Debug, Clone)]
pub struct CreateRepoOptions {
    pub visibility: Visibility,
    pub description: String,
    pub template: String,
    pub apply_policy: bool,
    pub preview: bool,
    pub allow_private_policy: bool,
}

/// Create a repository if it does not exist, then apply the policy
/// bundle to it.
pub fn create_repo(
    gh: &dyn GhClient,
    root: &RepoRoot,
    repo: &RepoSpec,
    management_config: &Path,
    opts: &CreateRepoOptions,
) -> Result<()> {
    let exists = gh.try_run(&["repo", "view", &repo.full()], None)?.success();
    if exists {
        println!("Repo exists: {repo}");
    } else {
        let full = repo.full();
        let mut args = vec![
            "repo",
            "create",
            full.as_str(),
            opts.visibility.create_flag(),
            "--clone=false",
        ];
        if !opts.description.is_empty() {
            args.extend(["--description", opts.description.as_str()]);
        }
        if !opts.template.is_empty() {
            args.extend(["--template", opts.template.as_str()]);
        }
        if opts.preview {
            println!("[preview] gh {}", args.join(" "));
        } else {
            gh.run(&args, None)?;
            println!("Created repo: {repo}");
        }
    }

    if !opts.apply_policy {
        println!("Policy application disabled (--no-apply-policy).");
        return Ok(());
    }

    let policy = RepoPolicyOptions {
        config_file: management_config.to_path_buf(),
        allow_private: opts.allow_private_policy,
        visibility: Some(opts.visibility.as_str().to_string()),
        archived: Some(false),
        preview: opts.preview,
        teams: TeamSlugs::default(),
    };
    apply_one_repo_policy(gh, root, repo, &policy)
}

/// The full create-repo bootstrap: creation (when the module is enabled)
/// and the rulesets policy are mandatory, the remaining modules are
/// applied individually and their failures collected rather than
/// aborting the flow.
pub fn run_create_flow(gh: &dyn GhClient, root: &RepoRoot, repo: &RepoSpec) -> Result<()> {
    gh::check_auth(gh)?;
    let app = load_app_config(root)?;
    let preview = app.defaults.preview;
    let management_config = module_path(root, &app.modules.rulesets, DEFAULT_MANAGEMENT_CONFIG);

    // A disabled create module only skips creation; the policy and module
    // steps below still run against the existing repo.
    let create = &app.modules.repo_create;
    if create.enabled {
        let opts = CreateRepoOptions {
            visibility: create.visibility,
            description: create.description.clone(),
            template: create.template.clone(),
            apply_policy: create.apply_repo_policy && app.modules.rulesets.enabled,
            preview,
            allow_private_policy: app.defaults.allow_private,
        };
        create_repo(gh, root, repo, &management_config, &opts)?;
    } else {
        println!("Repo-create module disabled.");
    }

    if app.modules.rulesets.enabled {
        apply_rulesets_repo(
            gh,
            root,
            repo,
            &management_config,
            &TeamSlugs::default(),
            preview,
        )?;
    }

    let mut failed_modules: Vec<&str> = Vec::new();

    if app.modules.discussions.enabled {
        let path = module_path(root, &app.modules.discussions, DEFAULT_DISCUSSIONS_CONFIG);
        let result = config::load_versioned::<DiscussionsConfig>(&path)
            .and_then(|c| ensure_discussions_repo(gh, &c.template, repo, preview));
        if let Err(err) = result {
            log::warn!("discussions module failed for {repo}: {err}");
            failed_modules.push("discussions");
        }
    }
    if app.modules.actions.enabled {
        let path = module_path(root, &app.modules.actions, DEFAULT_ACTIONS_CONFIG);
        let result = config::load_versioned::<ActionsConfig>(&path)
            .and_then(|c| apply_actions_repo(gh, &c.policy, repo, preview));
        if let Err(err) = result {
            log::warn!("actions module failed for {repo}: {err}");
            failed_modules.push("actions");
        }
    }
    if app.modules.security.enabled {
        let path = module_path(root, &app.modules.security, DEFAULT_SECURITY_CONFIG);
        let result = config::load_versioned::<SecurityConfig>(&path)
            .and_then(|c| apply_security_repo(gh, &c.policy, repo, preview));
        if let Err(err) = result {
            log::warn!("security module failed for {repo}: {err}");
            failed_modules.push("security");
        }
    }
    if app.modules.environments.enabled {
        let path = module_path(root, &app.modules.environments, DEFAULT_ENVIRONMENTS_CONFIG);
        let result = config::load_versioned::<EnvironmentsConfig>(&path)
            .and_then(|c| apply_environments_repo(gh, &c.environments, repo, preview));
        if let Err(err) = result {
            log::warn!("environments module failed for {repo}: {err}");
            failed_modules.push("environments");
        }
    }

    if failed_modules.is_empty() {
        println!("Done: create flow completed for {repo}");
    } else {
        println!(
            "[warn] create flow completed with optional failures: {}",
            failed_modules.join(", ")
        );
    }
    Ok(())
}

/// Apply every enabled module across one org.
pub fn run_apply_org_flow(gh: &dyn GhClient, root: &RepoRoot, org: &str) -> Result<()> {
    gh::check_auth(gh)?;
    let app = load_app_config(root)?;
    let opts = BatchOptions {
        preview: app.defaults.preview,
        allow_private: app.defaults.allow_private,
        include_archived: app.defaults.include_archived,
        max_repos: app.defaults.max_repos,
    };

    if app.modules.rulesets.enabled {
        let path = module_path(root, &app.modules.rulesets, DEFAULT_MANAGEMENT_CONFIG);
        apply_rulesets_org(gh, root, org, &path, &TeamSlugs::default(), &opts)?;
    }
    if app.modules.actions.enabled {
        let path = module_path(root, &app.modules.actions, DEFAULT_ACTIONS_CONFIG);
        apply_actions_org(gh, org, &path, &opts)?;
    }
    if app.modules.security.enabled {
        let path = module_path(root, &app.modules.security, DEFAULT_SECURITY_CONFIG);
        apply_security_org(gh, org, &path, &opts)?;
    }
    if app.modules.environments.enabled {
        let path = module_path(root, &app.modules.environments, DEFAULT_ENVIRONMENTS_CONFIG);
        apply_environments_org(gh, org, &path, &opts)?;
    }
    if app.modules.discussions.enabled {
        let path = module_path(root, &app.modules.discussions, DEFAULT_DISCUSSIONS_CONFIG);
        ensure_discussions_org(gh, org, &path, &opts)?;
    }
    Ok(())
}

/// Initialize the configured teams in one org.
pub fn run_init_teams_flow(gh: &dyn GhClient, root: &RepoRoot, org: &str) -> Result<()> {
    gh::check_auth(gh)?;
    let app = load_app_config(root)?;
    if !app.modules.teams.enabled {
        println!("Teams module disabled.");
        return Ok(());
    }
    let path = module_path(root, &app.modules.teams, DEFAULT_TEAMS_CONFIG);
    let opts = BatchOptions {
        preview: app.defaults.preview,
        allow_private: app.defaults.allow_private,
        include_archived: app.defaults.include_archived,
        max_repos: app.defaults.max_repos,
    };
    teams::init_teams(gh, root, org, &path, &opts)
}

/// Remove the configured teams from one org.
pub fn run_remove_teams_flow(gh: &dyn GhClient, root: &RepoRoot, org: &str) -> Result<()> {
    gh::check_auth(gh)?;
    let app = load_app_config(root)?;
    if !app.modules.teams.enabled {
        println!("Teams module disabled.");
        return Ok(());
    }
    let path = module_path(root, &app.modules.teams, DEFAULT_TEAMS_CONFIG);
    teams::remove_teams(gh, org, &path, app.defaults.preview)
}

/// Parse every JSON file under `config/`, failing on the first bad one.
pub fn run_validate_flow(root: &RepoRoot) -> Result<()> {
    println!("Validating JSON configs...");

    let config_dir = root.path().join("config");
    let mut paths: Vec<PathBuf> = WalkDir::new(&config_dir)
        .into_iter()
        .filter_map(|entry| entry.ok())
        .filter(|entry| {
            entry.file_type().is_file()
                && entry.path().extension().is_some_and(|ext| ext == "json")
        })
        .map(|entry| entry.into_path())
        .collect();
    paths.sort();

    if paths.is_empty() {
        return Err(Error::MissingFile {
            path: config_dir.display().to_string(),
        });
    }

    for path in &paths {
        let _: serde_json::Value = config::load_json(path)?;
        println!("  OK {}", path.display());
    }
    println!("\nValidation complete.");
    Ok(())
}

/// Subcommands of the declarative manage runner.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ManageCommand {
    /// Load and validate the management config and policy documents.
    Validate,
    /// Print what a run would do.
    Plan,
    /// Execute the configured operations.
    Run,
}

/// Run the declarative `config/management.json` operations.
pub fn run_manage(
    gh: &dyn GhClient,
    root: &RepoRoot,
    config_file: &Path,
    command: ManageCommand,
) -> Result<()> {
    let management: ManagementConfig = config::load_versioned(config_file)?;
    let bundle = load_policy_bundle(root, config_file)?;

    if command == ManageCommand::Validate {
        println!("Validation OK");
        return Ok(());
    }

    // Both plan and run show what is configured; run then executes it.
    println!("Rulesets:");
    for ruleset in &bundle.rulesets {
        let name = ruleset
            .get("name")
            .and_then(serde_json::Value::as_str)
            .unwrap_or("(unnamed)");
        println!("  - {name}");
    }
    println!(
        "Execution: preview={} allow_private={} max_repos_per_org={}",
        management.execution.preview,
        management.execution.allow_private,
        management.execution.max_repos_per_org
    );
    println!("Create repos:");
    for op in &management.operations.create_repos {
        println!("  - {}/{} ({})", op.org, op.name, op.visibility);
    }
    let org_policy = &management.operations.apply_org_policy;
    println!(
        "Apply org policy: enabled={} orgs={}",
        org_policy.enabled,
        org_policy.orgs.join(", ")
    );
    if command == ManageCommand::Plan {
        return Ok(());
    }

    for op in &management.operations.create_repos {
        let repo = RepoSpec::new(&op.org, &op.name);
        let opts = CreateRepoOptions {
            visibility: op.visibility,
            description: op.description.clone(),
            template: op.template.clone(),
            apply_policy: op.apply_policy,
            preview: management.execution.preview,
            allow_private_policy: management.execution.allow_private,
        };
        create_repo(gh, root, &repo, config_file, &opts)?;
    }

    let org_policy = &management.operations.apply_org_policy;
    if org_policy.enabled && !org_policy.orgs.is_empty() {
        let policy = RepoPolicyOptions {
            config_file: config_file.to_path_buf(),
            allow_private: management.execution.allow_private,
            visibility: None,
            archived: None,
            preview: management.execution.preview,
            teams: TeamSlugs::default(),
        };
        apply_org_policy(
            gh,
            root,
            &org_policy.orgs,
            &policy,
            management.execution.max_repos_per_org,
        )?;
    }
    Ok(())
}
