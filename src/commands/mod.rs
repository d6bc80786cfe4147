//! # CLI Command Implementations
//!
//! One module per subcommand of the `repo-warden` tool. Each module
//! contains an `Args` struct derived with `clap` and an `execute` function
//! that resolves the repo root, constructs the `gh` client, and calls into
//! the `repo_warden` library.

pub mod apply_org;
pub mod create;
pub mod doctor;
pub mod exec;
pub mod teams;
pub mod validate;
