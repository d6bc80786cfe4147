//! # Error Handling
//!
//! Centralized error type for `repo-warden`, built with `thiserror`.
//!
//! Two broad classes of failure exist in this tool:
//!
//! - **Fatal/local** errors (malformed JSON, an unsupported config schema
//!   version, an unknown role token, a missing required argument). These
//!   abort the current operation immediately and propagate to a non-zero
//!   process exit.
//! - **Batch/partial** errors. A failure while processing one repository in
//!   an org-wide batch is caught at the loop boundary, logged, and counted;
//!   only the final [`Error::BatchFailed`] surfaces once the whole batch has
//!   been attempted.
//!
//! There is no retry logic in either class.

use thiserror::Error;

use crate::batch::ApplySummary;

/// Main error type for repo-warden operations
#[derive(Error, Debug)]
pub enum Error {
    /// A JSON document could not be parsed.
    #[error("Invalid JSON in {file}: {message}")]
    ConfigParse { file: String, message: String },

    /// A config file declared a schema version other than the supported one.
    #[error("Unsupported config version in {file}: {found}")]
    UnsupportedVersion { file: String, found: u32 },

    /// A required file does not exist.
    #[error("Missing file: {path}")]
    MissingFile { path: String },

    /// A config file parsed but violates a structural requirement.
    #[error("Invalid config in {file}: {message}")]
    InvalidConfig { file: String, message: String },

    /// A team role token is not in the permission weight table.
    #[error("Unknown role token in config: {token}")]
    UnknownRole { token: String },

    /// A repository reference was not of the form `ORG/REPO`.
    #[error("Invalid repo format '{spec}' (expected ORG/REPO)")]
    InvalidRepoSpec { spec: String },

    /// A `gh` invocation failed (non-zero exit or spawn failure).
    #[error("gh {command} failed: {message}")]
    Gh { command: String, message: String },

    /// A required external command is not installed.
    #[error("Missing required command: {tool}")]
    MissingTool { tool: String },

    /// A configured discussion names a category that does not exist.
    #[error("Missing category for discussion '{discussion}': {category}")]
    MissingCategory {
        discussion: String,
        category: String,
    },

    /// An org-wide batch completed, but one or more repositories failed.
    #[error("{operation} finished with failures ({summary})")]
    BatchFailed {
        operation: String,
        summary: ApplySummary,
    },

    /// A legacy script identifier is not in the compatibility table.
    #[error("Unsupported script path: {script}")]
    UnsupportedScript { script: String },

    /// A compat invocation was missing required positional arguments.
    #[error("Usage: {usage}")]
    Usage { usage: String },

    /// A compat flag was present without its value.
    #[error("{flag} requires a value")]
    FlagRequiresValue { flag: String },

    /// A compat flag value was not a non-negative integer.
    #[error("{flag} must be a non-negative integer")]
    FlagNotInteger { flag: String },

    /// An I/O error, wrapped from `std::io::Error`.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A JSON serialization error, wrapped from `serde_json::Error`.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// A convenient type alias for `Result<T, Error>`.
pub type Result<T> = std::result::Result<T, Error>;
