//! # Configuration Schema and Loading
//!
//! This module defines the data structures for every JSON policy document
//! the tool consumes, along with the loading and validation logic shared by
//! all of them.
//!
//! ## Documents
//!
//! - **`AppConfig`** (`config/app.config.json`): module enable flags, the
//!   paths to the per-module configs, and execution defaults.
//! - **`ManagementConfig`** (`config/management.json`): execution defaults,
//!   pointers to the repo-settings and rulesets documents, and declarative
//!   operation lists (repos to create, orgs to sweep).
//! - **`RepoSettingsConfig`** / **`RulesetsConfig`**: the REST PATCH body
//!   for repository settings and the array of ruleset payloads.
//! - **`ActionsConfig`**, **`SecurityConfig`**, **`EnvironmentsConfig`**,
//!   **`DiscussionsConfig`**, **`TeamsConfig`**: per-module templates.
//!
//! Every document carries a `version` field that must equal
//! [`SUPPORTED_VERSION`]; anything else (including a missing field) fails
//! loading with an error naming the file and the version found.
//!
//! ## Root resolution
//!
//! [`RepoRoot`] locates the directory that relative config paths resolve
//! against. It is resolved once in the binary and passed explicitly into
//! every flow, so library code never consults process state on its own.

use std::collections::BTreeMap;
use std::env;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use serde::Deserialize;

use crate::error::{Error, Result};

/// The single config schema version this build understands.
pub const SUPPORTED_VERSION: u32 = 1;

/// Environment variable that overrides repository-root resolution.
pub const ROOT_ENV_VAR: &str = "REPO_WARDEN_ROOT";

/// Relative path of the application config inside a repo root.
pub const APP_CONFIG_PATH: &str = "config/app.config.json";

fn default_true() -> bool {
    true
}

/// Parse a JSON string, naming `source` in the error on failure.
pub fn parse_json<T: DeserializeOwned>(raw: &str, source: &str) -> Result<T> {
    serde_json::from_str(raw).map_err(|e| Error::ConfigParse {
        file: source.to_string(),
        message: e.to_string(),
    })
}

/// Read and parse a JSON file without checking its schema version.
pub fn load_json<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let raw = fs::read_to_string(path).map_err(|e| {
        if e.kind() == std::io::ErrorKind::NotFound {
            Error::MissingFile {
                path: path.display().to_string(),
            }
        } else {
            Error::Io(e)
        }
    })?;
    parse_json(&raw, &path.display().to_string())
}

/// Config documents that carry a schema version.
pub trait Versioned {
    fn version(&self) -> u32;
}

macro_rules! impl_versioned {
    ($($ty:ty),+ $(,)?) => {
        $(impl Versioned for $ty {
            fn version(&self) -> u32 {
                self.version
            }
        })+
    };
}

/// Read and parse a JSON config file, rejecting unsupported versions.
pub fn load_versioned<T>(path: &Path) -> Result<T>
where
    T: DeserializeOwned + Versioned,
{
    let config: T = load_json(path)?;
    if config.version() != SUPPORTED_VERSION {
        return Err(Error::UnsupportedVersion {
            file: path.display().to_string(),
            found: config.version(),
        });
    }
    Ok(config)
}

/// Resolved repository root all relative config paths are joined against.
#[derive(Debug, Clone)]
pub struct RepoRoot(PathBuf);

impl RepoRoot {
    /// Resolve the repo root: environment override, then the current
    /// directory when it contains `config/app.config.json`, then the
    /// packaged-install location next to the executable, then the current
    /// directory as a last resort.
    pub fn resolve() -> Self {
        if let Some(root) = env::var_os(ROOT_ENV_VAR) {
            return Self(PathBuf::from(root));
        }

        let cwd = env::current_dir().unwrap_or_else(|_| PathBuf::from("."));
        if cwd.join(APP_CONFIG_PATH).exists() {
            return Self(cwd);
        }

        if let Ok(exe) = env::current_exe() {
            if let Some(bin_dir) = exe.parent() {
                if bin_dir.join(APP_CONFIG_PATH).exists() {
                    return Self(bin_dir.to_path_buf());
                }
                if let Some(install_dir) = bin_dir.parent() {
                    if install_dir.join(APP_CONFIG_PATH).exists() {
                        return Self(install_dir.to_path_buf());
                    }
                }
            }
        }

        Self(cwd)
    }

    pub fn path(&self) -> &Path {
        &self.0
    }

    /// Path of the application config under this root.
    pub fn app_config_path(&self) -> PathBuf {
        self.0.join(APP_CONFIG_PATH)
    }

    /// Resolve a possibly-relative config path against this root.
    ///
    /// Absolute paths pass through untouched; a leading `./` is stripped
    /// before joining.
    pub fn join_config(&self, maybe_relative: &str) -> PathBuf {
        let trimmed = maybe_relative.strip_prefix("./").unwrap_or(maybe_relative);
        let path = Path::new(trimmed);
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.0.join(path)
        }
    }
}

impl From<PathBuf> for RepoRoot {
    fn from(path: PathBuf) -> Self {
        Self(path)
    }
}

/// Repository visibility, as used by `gh repo create` and the REST API.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Visibility {
    #[default]
    Public,
    Private,
}

impl Visibility {
    /// The `gh repo create` flag for this visibility.
    pub fn create_flag(self) -> &'static str {
        match self {
            Visibility::Public => "--public",
            Visibility::Private => "--private",
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Visibility::Public => "public",
            Visibility::Private => "private",
        }
    }
}

impl fmt::Display for Visibility {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

////// APPLICATION CONFIG //////

/// Execution defaults shared by the app-level flows.
#[derive(Debug, Clone, Deserialize)]
pub struct AppDefaults {
    #[serde(default)]
    pub preview: bool,
    #[serde(default = "default_true")]
    pub allow_private: bool,
    #[serde(default)]
    pub include_archived: bool,
    /// Per-org repo cap for batch operations (0 = unlimited).
    #[serde(default)]
    pub max_repos: u32,
}

impl Default for AppDefaults {
    fn default() -> Self {
        Self {
            preview: false,
            allow_private: true,
            include_archived: false,
            max_repos: 0,
        }
    }
}

/// Enable flag plus config path for one policy module.
#[derive(Debug, Clone, Deserialize)]
pub struct ModuleConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Path to the module config, relative to the repo root.
    #[serde(default)]
    pub config: Option<String>,
}

impl Default for ModuleConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            config: None,
        }
    }
}

/// Settings for the repository-creation module.
#[derive(Debug, Clone, Deserialize)]
pub struct RepoCreateModule {
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default)]
    pub visibility: Visibility,
    #[serde(default)]
    pub description: String,
    /// Template repository (`org/name`) to create from, if any.
    #[serde(default)]
    pub template: String,
    #[serde(default = "default_true")]
    pub apply_repo_policy: bool,
}

impl Default for RepoCreateModule {
    fn default() -> Self {
        Self {
            enabled: true,
            visibility: Visibility::Public,
            description: String::new(),
            template: String::new(),
            apply_repo_policy: true,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct AppModules {
    #[serde(default)]
    pub repo_create: RepoCreateModule,
    #[serde(default)]
    pub rulesets: ModuleConfig,
    #[serde(default)]
    pub discussions: ModuleConfig,
    #[serde(default)]
    pub actions: ModuleConfig,
    #[serde(default)]
    pub security: ModuleConfig,
    #[serde(default)]
    pub environments: ModuleConfig,
    #[serde(default)]
    pub teams: ModuleConfig,
}

/// Top-level application config (`config/app.config.json`).
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub version: u32,
    #[serde(default)]
    pub defaults: AppDefaults,
    #[serde(default)]
    pub modules: AppModules,
}

////// MANAGEMENT CONFIG //////

#[derive(Debug, Clone, Deserialize)]
pub struct ManagementExecution {
    #[serde(default = "default_true")]
    pub preview: bool,
    #[serde(default)]
    pub allow_private: bool,
    #[serde(default)]
    pub max_repos_per_org: u32,
}

impl Default for ManagementExecution {
    fn default() -> Self {
        Self {
            preview: true,
            allow_private: false,
            max_repos_per_org: 0,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct PolicySection {
    /// Path to the repo-settings document (defaults to
    /// `./config/repo-settings.config.json`).
    #[serde(default)]
    pub repo_settings_config: Option<String>,
    /// Path to the rulesets document (defaults to
    /// `./config/rulesets.config.json`).
    #[serde(default)]
    pub rulesets_config: Option<String>,
    /// Overrides the name of a single configured ruleset.
    #[serde(default)]
    pub ruleset_name: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateRepoOp {
    pub org: String,
    pub name: String,
    #[serde(default)]
    pub visibility: Visibility,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub template: String,
    #[serde(default = "default_true")]
    pub apply_policy: bool,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ApplyOrgPolicyOp {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default)]
    pub orgs: Vec<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct OperationsSection {
    #[serde(default)]
    pub create_repos: Vec<CreateRepoOp>,
    #[serde(default)]
    pub apply_org_policy: ApplyOrgPolicyOp,
}

/// Management/policy config (`config/management.json`).
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ManagementConfig {
    #[serde(default)]
    pub version: u32,
    #[serde(default)]
    pub execution: ManagementExecution,
    #[serde(default)]
    pub policy: PolicySection,
    #[serde(default)]
    pub operations: OperationsSection,
}

////// POLICY DOCUMENTS //////

/// Repo-settings patch document. `settings` is sent verbatim as the body of
/// `PATCH repos/{org}/{repo}` and must be a JSON object.
#[derive(Debug, Clone, Deserialize)]
pub struct RepoSettingsConfig {
    #[serde(default)]
    pub version: u32,
    pub settings: serde_json::Value,
}

/// Rulesets document: a non-empty array of ruleset payloads.
#[derive(Debug, Clone, Deserialize)]
pub struct RulesetsConfig {
    #[serde(default)]
    pub version: u32,
    #[serde(default)]
    pub rulesets: Vec<serde_json::Value>,
}

/// Per-org execution filters shared by the module templates.
#[derive(Debug, Clone, Deserialize)]
pub struct OrgExecution {
    #[serde(default = "default_true")]
    pub include_private: bool,
    #[serde(default)]
    pub include_archived: bool,
}

impl Default for OrgExecution {
    fn default() -> Self {
        Self {
            include_private: true,
            include_archived: false,
        }
    }
}

/// The subset of a module template the compat dispatcher needs to derive an
/// org and execution filters from (loaded without a version check).
#[derive(Debug, Clone, Default, Deserialize)]
pub struct OrgDefaults {
    #[serde(default)]
    pub org: Option<String>,
    #[serde(default)]
    pub execution: OrgExecution,
}

/// Allowed-actions policy mode for GitHub Actions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionsMode {
    All,
    LocalOnly,
    #[default]
    Selected,
}

impl ActionsMode {
    pub fn as_str(self) -> &'static str {
        match self {
            ActionsMode::All => "all",
            ActionsMode::LocalOnly => "local_only",
            ActionsMode::Selected => "selected",
        }
    }
}

impl fmt::Display for ActionsMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ActionsPolicy {
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default)]
    pub allowed_actions_mode: ActionsMode,
    #[serde(default = "default_true")]
    pub allow_github_owned: bool,
    #[serde(default)]
    pub allow_verified_creators: bool,
    /// Allowed action patterns; `{ORG}` expands to the target org.
    #[serde(default)]
    pub patterns_allowed: Vec<String>,
}

impl Default for ActionsPolicy {
    fn default() -> Self {
        Self {
            enabled: true,
            allowed_actions_mode: ActionsMode::Selected,
            allow_github_owned: true,
            allow_verified_creators: false,
            patterns_allowed: Vec::new(),
        }
    }
}

/// Actions policy template (`config/actions.config.json`).
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ActionsConfig {
    #[serde(default)]
    pub version: u32,
    #[serde(default)]
    pub org: Option<String>,
    #[serde(default)]
    pub execution: OrgExecution,
    #[serde(default)]
    pub policy: ActionsPolicy,
}

/// Enabled/disabled switch for a `security_and_analysis` feature.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FeatureStatus {
    Enabled,
    Disabled,
}

impl FeatureStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            FeatureStatus::Enabled => "enabled",
            FeatureStatus::Disabled => "disabled",
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct SecurityPolicy {
    #[serde(default = "default_true")]
    pub vulnerability_alerts: bool,
    #[serde(default = "default_true")]
    pub automated_security_fixes: bool,
    #[serde(default = "default_true")]
    pub private_vulnerability_reporting: bool,
    /// `security_and_analysis` feature toggles, patched one key at a time.
    #[serde(default)]
    pub security_and_analysis: BTreeMap<String, FeatureStatus>,
}

impl Default for SecurityPolicy {
    fn default() -> Self {
        Self {
            vulnerability_alerts: true,
            automated_security_fixes: true,
            private_vulnerability_reporting: true,
            security_and_analysis: BTreeMap::new(),
        }
    }
}

/// Security policy template (`config/security.config.json`).
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SecurityConfig {
    #[serde(default)]
    pub version: u32,
    #[serde(default)]
    pub org: Option<String>,
    #[serde(default)]
    pub execution: OrgExecution,
    #[serde(default)]
    pub policy: SecurityPolicy,
}

#[derive(Debug, Clone, Deserialize)]
pub struct EnvironmentSpec {
    pub name: String,
    #[serde(default)]
    pub wait_timer: u32,
    #[serde(default)]
    pub prevent_self_review: bool,
}

/// Deployment environments template (`config/environments.config.json`).
#[derive(Debug, Clone, Default, Deserialize)]
pub struct EnvironmentsConfig {
    #[serde(default)]
    pub version: u32,
    #[serde(default)]
    pub org: Option<String>,
    #[serde(default)]
    pub execution: OrgExecution,
    #[serde(default)]
    pub environments: Vec<EnvironmentSpec>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CategorySpec {
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub emoji: String,
    #[serde(default)]
    pub is_answerable: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LabelSpec {
    pub name: String,
    #[serde(default)]
    pub color: Option<String>,
    #[serde(default)]
    pub description: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DiscussionSpec {
    pub title: String,
    pub category: String,
    #[serde(default)]
    pub labels: Vec<String>,
    pub body: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct DiscussionsTemplate {
    #[serde(default)]
    pub categories: Vec<CategorySpec>,
    #[serde(default)]
    pub labels: Vec<LabelSpec>,
    #[serde(default)]
    pub initial_discussions: Vec<DiscussionSpec>,
}

/// Discussions template (`config/discussions.config.json`).
#[derive(Debug, Clone, Default, Deserialize)]
pub struct DiscussionsConfig {
    #[serde(default)]
    pub version: u32,
    #[serde(default)]
    pub template: DiscussionsTemplate,
}

fn default_notification() -> String {
    "enabled".to_string()
}

fn default_access() -> String {
    "all-repos".to_string()
}

#[derive(Debug, Clone, Deserialize)]
pub struct TeamSpec {
    pub slug: String,
    pub title: String,
    #[serde(default)]
    pub description: String,
    /// Optional avatar asset path, checked for existence and reported only
    /// (the REST flow cannot upload team avatars).
    #[serde(default)]
    pub image: Option<String>,
    /// Role tokens resolved to the effective repo permission.
    #[serde(default)]
    pub roles: Vec<String>,
    #[serde(default = "default_true")]
    pub visible: bool,
    #[serde(default = "default_notification")]
    pub notification: String,
    /// Repo-grant scope; only `all-repos` triggers grants.
    #[serde(default = "default_access")]
    pub access: String,
}

/// Teams template (`config/teams.config.json`).
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TeamsConfig {
    #[serde(default)]
    pub version: u32,
    #[serde(default)]
    pub org: Option<String>,
    #[serde(default)]
    pub teams: Vec<TeamSpec>,
}

impl_versioned!(
    AppConfig,
    ManagementConfig,
    RepoSettingsConfig,
    RulesetsConfig,
    ActionsConfig,
    SecurityConfig,
    EnvironmentsConfig,
    DiscussionsConfig,
    TeamsConfig,
);

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn write_temp(contents: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file
    }

    #[test]
    fn test_load_versioned_accepts_version_1() {
        let file = write_temp(r#"{"version": 1, "teams": []}"#);
        let config: TeamsConfig = load_versioned(file.path()).unwrap();
        assert_eq!(config.version, 1);
        assert!(config.teams.is_empty());
    }

    #[test]
    fn test_load_versioned_rejects_version_2() {
        let file = write_temp(r#"{"version": 2, "teams": []}"#);
        let err = load_versioned::<TeamsConfig>(file.path()).unwrap_err();
        match err {
            Error::UnsupportedVersion { file: name, found } => {
                assert_eq!(found, 2);
                assert!(!name.is_empty());
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_load_versioned_rejects_missing_version() {
        let file = write_temp(r#"{"teams": []}"#);
        let err = load_versioned::<TeamsConfig>(file.path()).unwrap_err();
        assert!(matches!(err, Error::UnsupportedVersion { found: 0, .. }));
    }

    #[test]
    fn test_load_json_missing_file() {
        let err = load_json::<TeamsConfig>(Path::new("/nonexistent/teams.json")).unwrap_err();
        assert!(matches!(err, Error::MissingFile { .. }));
    }

    #[test]
    fn test_load_json_invalid_json_names_file() {
        let file = write_temp("{not json");
        let err = load_json::<TeamsConfig>(file.path()).unwrap_err();
        match err {
            Error::ConfigParse { file: name, .. } => assert!(!name.is_empty()),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_repo_root_join_config_relative() {
        let root = RepoRoot::from(PathBuf::from("/srv/warden"));
        assert_eq!(
            root.join_config("./config/teams.config.json"),
            PathBuf::from("/srv/warden/config/teams.config.json")
        );
        assert_eq!(
            root.join_config("config/teams.config.json"),
            PathBuf::from("/srv/warden/config/teams.config.json")
        );
    }

    #[test]
    fn test_repo_root_join_config_absolute_passthrough() {
        let root = RepoRoot::from(PathBuf::from("/srv/warden"));
        assert_eq!(
            root.join_config("/etc/warden/teams.json"),
            PathBuf::from("/etc/warden/teams.json")
        );
    }

    #[test]
    fn test_actions_mode_parsing() {
        let config: ActionsConfig =
            parse_json(r#"{"version":1,"policy":{"allowed_actions_mode":"local_only"}}"#, "t")
                .unwrap();
        assert_eq!(config.policy.allowed_actions_mode, ActionsMode::LocalOnly);
    }

    #[test]
    fn test_actions_mode_rejects_unknown() {
        let err = parse_json::<ActionsConfig>(
            r#"{"version":1,"policy":{"allowed_actions_mode":"some_of_them"}}"#,
            "actions.config.json",
        )
        .unwrap_err();
        assert!(matches!(err, Error::ConfigParse { .. }));
    }

    #[test]
    fn test_org_execution_defaults() {
        let defaults: OrgDefaults = parse_json("{}", "t").unwrap();
        assert!(defaults.execution.include_private);
        assert!(!defaults.execution.include_archived);
        assert!(defaults.org.is_none());
    }

    #[test]
    fn test_management_execution_defaults() {
        let config: ManagementConfig = parse_json(r#"{"version":1}"#, "t").unwrap();
        assert!(config.execution.preview);
        assert!(!config.execution.allow_private);
        assert_eq!(config.execution.max_repos_per_org, 0);
    }

    #[test]
    fn test_team_spec_defaults() {
        let config: TeamsConfig = parse_json(
            r#"{"version":1,"teams":[{"slug":"core","title":"Core"}]}"#,
            "t",
        )
        .unwrap();
        let team = &config.teams[0];
        assert!(team.visible);
        assert_eq!(team.notification, "enabled");
        assert_eq!(team.access, "all-repos");
        assert!(team.roles.is_empty());
    }
}
