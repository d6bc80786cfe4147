//! End-to-end tests that require an authenticated `gh` install
//!
//! These run against real GitHub state and are gated behind the
//! `integration-tests` feature; without it they are compiled but ignored.
//! Run with:
//!
//! ```sh
//! cargo test --features integration-tests -- --ignored
//! ```
//!
//! The target org comes from `REPO_WARDEN_TEST_ORG`.

mod common;
use common::prelude::*;
use std::env;

fn test_org() -> Option<String> {
    env::var("REPO_WARDEN_TEST_ORG").ok().filter(|o| !o.is_empty())
}

#[test]
#[cfg_attr(not(feature = "integration-tests"), ignore)]
fn test_apply_org_dry_run_reports_summary() {
    let Some(org) = test_org() else {
        eprintln!("REPO_WARDEN_TEST_ORG not set; skipping");
        return;
    };
    let fixture = TestFixture::new().with_policy_configs();

    fixture
        .cmd()
        .args([
            "exec",
            "scripts/update_rulesets_org.sh",
            "--org",
            &org,
            "--dry-run",
            "--max-repos",
            "2",
        ])
        .assert()
        .success()
        .stdout(predicate::str::contains("Summary: seen="))
        .stdout(predicate::str::contains("preview=1"));
}

#[test]
#[cfg_attr(not(feature = "integration-tests"), ignore)]
fn test_ensure_org_teams_dry_run() {
    let Some(org) = test_org() else {
        eprintln!("REPO_WARDEN_TEST_ORG not set; skipping");
        return;
    };
    let fixture = TestFixture::new().with_policy_configs();

    fixture
        .cmd()
        .args(["exec", "scripts/ensure_org_teams.sh", &org, "--dry-run"])
        .assert()
        .success();
}
