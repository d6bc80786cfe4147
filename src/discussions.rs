//! # Discussions Template Initialization
//!
//! Seeds a repository with the configured discussions template: enables
//! the discussions feature, ensures the labels and discussion categories
//! exist, then creates any missing initial discussions and attaches their
//! labels.
//!
//! GitHub splits this surface between REST and GraphQL: the feature flag
//! probe, label id lookup, and label attachment only exist in GraphQL,
//! while label/category/discussion creation goes through REST. Everything
//! is upsert-by-name (or by title for discussions): existing resources are
//! left untouched, so re-running the template is idempotent.

use std::path::Path;

use serde::Deserialize;

use crate::batch::{apply_to_org, ApplySummary, BatchOptions, RepoSpec};
use crate::config::{
    self, CategorySpec, DiscussionSpec, DiscussionsConfig, DiscussionsTemplate, LabelSpec,
};
use crate::error::{Error, Result};
use crate::gh::GhClient;

/// Placeholder id returned for a discussion that preview mode did not
/// create. Downstream label attachment recognizes it and skips.
pub const PREVIEW_ID: &str = "PREVIEW_ID";

/// Default label color when the config omits one.
const DEFAULT_LABEL_COLOR: &str = "BFD4F2";

const LABEL_ID_QUERY: &str = "query($owner:String!,$name:String!,$label:String!){\
repository(owner:$owner,name:$name){label(name:$label){id}}}";

const DISCUSSIONS_ENABLED_QUERY: &str = "query($owner:String!,$name:String!){\
repository(owner:$owner,name:$name){hasDiscussionsEnabled}}";

const ADD_LABELS_MUTATION: &str = "mutation($labelableId:ID!,$labelIds:[ID!]!){\
addLabelsToLabelable(input:{labelableId:$labelableId,labelIds:$labelIds}){clientMutationId}}";

/// GraphQL node id of a repository label, if it exists.
fn label_id_by_name(gh: &dyn GhClient, repo: &RepoSpec, label: &str) -> Result<Option<String>> {
    let out = gh.run(
        &[
            "api",
            "graphql",
            "-f",
            &format!("query={LABEL_ID_QUERY}"),
            "-f",
            &format!("owner={}", repo.org),
            "-f",
            &format!("name={}", repo.name),
            "-f",
            &format!("label={label}"),
            "--jq",
            ".data.repository.label.id",
        ],
        None,
    )?;
    let id = out.trim();
    if id.is_empty() || id == "null" {
        Ok(None)
    } else {
        Ok(Some(id.to_string()))
    }
}

/// Create a label unless one with the same name already exists.
fn ensure_label(gh: &dyn GhClient, repo: &RepoSpec, label: &LabelSpec, preview: bool) -> Result<()> {
    if label_id_by_name(gh, repo, &label.name)?.is_some() {
        println!("label exists: {}", label.name);
        return Ok(());
    }
    if preview {
        println!("[preview] create label: {}", label.name);
        return Ok(());
    }
    let color = label.color.as_deref().unwrap_or(DEFAULT_LABEL_COLOR);
    gh.run(
        &[
            "api",
            "-X",
            "POST",
            &format!("repos/{repo}/labels"),
            "-f",
            &format!("name={}", label.name),
            "-f",
            &format!("color={color}"),
            "-f",
            &format!("description={}", label.description),
        ],
        None,
    )?;
    println!("created label: {}", label.name);
    Ok(())
}

#[derive(Debug, Deserialize)]
struct CategoryEntry {
    name: String,
}

/// Existing discussion category names. A failing listing (discussions just
/// enabled, API lag) reads as "none yet".
fn list_categories(gh: &dyn GhClient, repo: &RepoSpec) -> Result<Vec<String>> {
    let out = gh.try_run(
        &["api", &format!("repos/{repo}/discussions/categories")],
        None,
    )?;
    if !out.success() {
        return Ok(Vec::new());
    }
    let entries: Vec<CategoryEntry> = config::parse_json(
        out.stdout.trim(),
        &format!("repos/{repo}/discussions/categories"),
    )?;
    Ok(entries.into_iter().map(|e| e.name).collect())
}

/// Create a discussion category unless one with the same name exists.
fn ensure_category(
    gh: &dyn GhClient,
    repo: &RepoSpec,
    existing: &[String],
    category: &CategorySpec,
    preview: bool,
) -> Result<()> {
    if existing.iter().any(|name| name == &category.name) {
        println!("category exists: {}", category.name);
        return Ok(());
    }
    if preview {
        println!("[preview] create category: {}", category.name);
        return Ok(());
    }
    gh.run(
        &[
            "api",
            "-X",
            "POST",
            &format!("repos/{repo}/discussions/categories"),
            "-f",
            &format!("name={}", category.name),
            "-f",
            &format!("description={}", category.description),
            "-f",
            &format!("emoji={}", category.emoji),
            "-F",
            &format!("is_answerable={}", category.is_answerable),
        ],
        None,
    )?;
    println!("created category: {}", category.name);
    Ok(())
}

#[derive(Debug, Deserialize)]
struct DiscussionEntry {
    title: String,
    node_id: String,
}

#[derive(Debug, Deserialize)]
struct CategoryIdEntry {
    id: u64,
    name: String,
}

/// Node id of an existing discussion with this exact title, if any.
fn discussion_id_by_title(
    gh: &dyn GhClient,
    repo: &RepoSpec,
    title: &str,
) -> Result<Option<String>> {
    let out = gh.try_run(&["api", &format!("repos/{repo}/discussions")], None)?;
    if !out.success() {
        return Ok(None);
    }
    let entries: Vec<DiscussionEntry> =
        config::parse_json(out.stdout.trim(), &format!("repos/{repo}/discussions"))?;
    Ok(entries
        .into_iter()
        .find(|d| d.title == title)
        .map(|d| d.node_id))
}

/// Create a discussion in its configured category, returning its node id
/// ([`PREVIEW_ID`] in preview mode).
fn create_discussion(
    gh: &dyn GhClient,
    repo: &RepoSpec,
    discussion: &DiscussionSpec,
    preview: bool,
) -> Result<String> {
    let listing = gh.run(
        &["api", &format!("repos/{repo}/discussions/categories")],
        None,
    )?;
    let categories: Vec<CategoryIdEntry> = config::parse_json(
        &listing,
        &format!("repos/{repo}/discussions/categories"),
    )?;
    let category_id = categories
        .iter()
        .find(|c| c.name == discussion.category)
        .map(|c| c.id)
        .ok_or_else(|| Error::MissingCategory {
            discussion: discussion.title.clone(),
            category: discussion.category.clone(),
        })?;

    if preview {
        println!("[preview] create discussion: {}", discussion.title);
        return Ok(PREVIEW_ID.to_string());
    }

    let node_id = gh.run(
        &[
            "api",
            "-X",
            "POST",
            &format!("repos/{repo}/discussions"),
            "-F",
            &format!("category_id={category_id}"),
            "-f",
            &format!("title={}", discussion.title),
            "-f",
            &format!("body={}", discussion.body),
            "--jq",
            ".node_id",
        ],
        None,
    )?;
    println!("created discussion: {}", discussion.title);
    Ok(node_id)
}

/// Attach the configured labels to a discussion by node id.
///
/// Skipped entirely when there is nothing to attach or the discussion was
/// only previewed.
fn add_labels(
    gh: &dyn GhClient,
    repo: &RepoSpec,
    discussion_id: &str,
    labels: &[String],
) -> Result<()> {
    if labels.is_empty() || discussion_id.is_empty() || discussion_id == PREVIEW_ID {
        return Ok(());
    }

    let mut label_ids = Vec::new();
    for label in labels {
        if let Some(id) = label_id_by_name(gh, repo, label)? {
            label_ids.push(id);
        } else {
            eprintln!("[warn] label not found for attachment: {label}");
        }
    }
    if label_ids.is_empty() {
        return Ok(());
    }

    gh.run(
        &[
            "api",
            "graphql",
            "-f",
            &format!("query={ADD_LABELS_MUTATION}"),
            "-f",
            &format!("labelableId={discussion_id}"),
            "-F",
            &format!("labelIds={}", serde_json::to_string(&label_ids)?),
        ],
        None,
    )?;
    Ok(())
}

/// Enable the discussions feature on a repository if it is off.
fn ensure_discussions_enabled(gh: &dyn GhClient, repo: &RepoSpec, preview: bool) -> Result<()> {
    let enabled = gh.run(
        &[
            "api",
            "graphql",
            "-f",
            &format!("query={DISCUSSIONS_ENABLED_QUERY}"),
            "-f",
            &format!("owner={}", repo.org),
            "-f",
            &format!("name={}", repo.name),
            "--jq",
            ".data.repository.hasDiscussionsEnabled",
        ],
        None,
    )?;
    if enabled.trim() == "true" {
        return Ok(());
    }
    if preview {
        println!("[preview] enable discussions on {repo}");
        return Ok(());
    }
    gh.run(
        &[
            "api",
            "-X",
            "PATCH",
            &format!("repos/{repo}"),
            "-F",
            "has_discussions=true",
        ],
        None,
    )?;
    println!("enabled discussions: {repo}");
    Ok(())
}

/// Apply the full discussions template to one repository.
pub fn ensure_discussions_repo(
    gh: &dyn GhClient,
    template: &DiscussionsTemplate,
    repo: &RepoSpec,
    preview: bool,
) -> Result<()> {
    ensure_discussions_enabled(gh, repo, preview)?;

    for label in &template.labels {
        ensure_label(gh, repo, label, preview)?;
    }

    let existing = list_categories(gh, repo)?;
    for category in &template.categories {
        ensure_category(gh, repo, &existing, category, preview)?;
    }

    for discussion in &template.initial_discussions {
        // An existing discussion still gets its labels reconciled, so
        // labels added to the template later are attached on re-run.
        let id = match discussion_id_by_title(gh, repo, &discussion.title)? {
            Some(id) => {
                println!("discussion exists: {}", discussion.title);
                id
            }
            None => create_discussion(gh, repo, discussion, preview)?,
        };
        add_labels(gh, repo, &id, &discussion.labels)?;
    }

    println!("Done: discussions template initialized for {repo}");
    Ok(())
}

/// Apply the discussions template across an org.
pub fn ensure_discussions_org(
    gh: &dyn GhClient,
    org: &str,
    config_file: &Path,
    opts: &BatchOptions,
) -> Result<ApplySummary> {
    let config: DiscussionsConfig = config::load_versioned(config_file)?;
    apply_to_org(gh, org, "discussions init", opts, |repo| {
        let spec = RepoSpec::new(org, &repo.name);
        ensure_discussions_repo(gh, &config.template, &spec, opts.preview)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_util::MockGh;

    fn repo() -> RepoSpec {
        RepoSpec::new("acme", "widgets")
    }

    fn label(name: &str) -> LabelSpec {
        LabelSpec {
            name: name.to_string(),
            color: None,
            description: String::new(),
        }
    }

    #[test]
    fn test_ensure_label_creates_with_default_color() {
        let gh = MockGh::new().ok("graphql", "null");
        ensure_label(&gh, &repo(), &label("announcement"), false).unwrap();

        let mutating = gh.mutating_calls();
        assert_eq!(mutating.len(), 1);
        assert!(mutating[0].contains("-X POST repos/acme/widgets/labels"));
        assert!(mutating[0].contains("color=BFD4F2"));
    }

    #[test]
    fn test_ensure_label_skips_existing() {
        let gh = MockGh::new().ok("graphql", "LA_abc123");
        ensure_label(&gh, &repo(), &label("announcement"), false).unwrap();
        assert!(gh.mutating_calls().is_empty());
    }

    #[test]
    fn test_failed_category_listing_reads_as_empty() {
        let gh = MockGh::new().fail("discussions/categories", "HTTP 404");
        let existing = list_categories(&gh, &repo()).unwrap();
        assert!(existing.is_empty());
    }

    #[test]
    fn test_create_discussion_fails_on_missing_category() {
        let gh = MockGh::new().ok(
            "discussions/categories",
            r#"[{"id": 1, "name": "General"}]"#,
        );
        let spec = DiscussionSpec {
            title: "Welcome".to_string(),
            category: "Announcements".to_string(),
            labels: vec![],
            body: "hi".to_string(),
        };
        let err = create_discussion(&gh, &repo(), &spec, false).unwrap_err();
        match err {
            Error::MissingCategory {
                discussion,
                category,
            } => {
                assert_eq!(discussion, "Welcome");
                assert_eq!(category, "Announcements");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_preview_discussion_returns_placeholder_and_skips_labels() {
        let gh = MockGh::new().ok(
            "discussions/categories",
            r#"[{"id": 1, "name": "Announcements"}]"#,
        );
        let spec = DiscussionSpec {
            title: "Welcome".to_string(),
            category: "Announcements".to_string(),
            labels: vec!["announcement".to_string()],
            body: "hi".to_string(),
        };
        let id = create_discussion(&gh, &repo(), &spec, true).unwrap();
        assert_eq!(id, PREVIEW_ID);

        add_labels(&gh, &repo(), &id, &spec.labels).unwrap();
        // Only the category lookup happened; nothing was created or
        // attached.
        assert!(gh.mutating_calls().is_empty());
        assert!(gh.call_args().iter().all(|a| !a.contains("addLabels")));
    }

    #[test]
    fn test_existing_discussion_is_not_recreated() {
        let gh = MockGh::new()
            .ok("graphql", "true")
            .ok(
                "repos/acme/widgets/discussions/categories",
                r#"[{"id": 1, "name": "Announcements"}]"#,
            )
            .ok(
                "repos/acme/widgets/discussions",
                r#"[{"title": "Welcome", "node_id": "D_1"}]"#,
            );
        let template = DiscussionsTemplate {
            categories: vec![],
            labels: vec![],
            initial_discussions: vec![DiscussionSpec {
                title: "Welcome".to_string(),
                category: "Announcements".to_string(),
                labels: vec![],
                body: "hi".to_string(),
            }],
        };
        ensure_discussions_repo(&gh, &template, &repo(), false).unwrap();
        assert!(gh.mutating_calls().is_empty());
    }

    #[test]
    fn test_existing_discussion_still_gets_labels_attached() {
        let gh = MockGh::new()
            .ok("hasDiscussionsEnabled", "true")
            .ok("label=announcement", "LA_abc")
            .ok("repos/acme/widgets/discussions/categories", "[]")
            .ok(
                "repos/acme/widgets/discussions",
                r#"[{"title": "Welcome", "node_id": "D_1"}]"#,
            );
        let template = DiscussionsTemplate {
            categories: vec![],
            labels: vec![],
            initial_discussions: vec![DiscussionSpec {
                title: "Welcome".to_string(),
                category: "Announcements".to_string(),
                labels: vec!["announcement".to_string()],
                body: "hi".to_string(),
            }],
        };
        ensure_discussions_repo(&gh, &template, &repo(), false).unwrap();

        let attach: Vec<_> = gh
            .call_args()
            .into_iter()
            .filter(|a| a.contains("addLabelsToLabelable"))
            .collect();
        assert_eq!(attach.len(), 1);
        assert!(attach[0].contains("labelableId=D_1"));
        // The discussion itself was not recreated.
        assert!(gh.call_args().iter().all(|a| !a.contains("-X POST")));
    }

    #[test]
    fn test_add_labels_attaches_resolved_ids() {
        let gh = MockGh::new().ok("label=announcement", "LA_abc");
        add_labels(&gh, &repo(), "D_1", &["announcement".to_string()]).unwrap();

        let attach: Vec<_> = gh
            .call_args()
            .into_iter()
            .filter(|a| a.contains("addLabelsToLabelable"))
            .collect();
        assert_eq!(attach.len(), 1);
        assert!(attach[0].contains("labelableId=D_1"));
        assert!(attach[0].contains("LA_abc"));
    }
}
