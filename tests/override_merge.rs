//! Override sources on disk and merge-list invariants
//!
//! Run: cargo test --test override_merge

mod helpers;

use std::io::Write;

use proptest::prelude::*;
use tempfile::NamedTempFile;

use helpers::{strings, three_person_lab};
use org_accounts::error::{ConfigError, OverrideError};
use org_accounts::overrides::{expand_all, merge_list, MergeIssue};
use org_accounts::{DirectiveSet, EngineConfig, MergeMode};

fn temp_file(content: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    file.write_all(content.as_bytes()).unwrap();
    file.flush().unwrap();
    file
}

#[test]
fn test_load_directives_from_file() {
    let file = temp_file(
        "---\naccount: core\nowner: pi1\n---\nusername: s1\nalist: [core]\nmode: Append\n---\nbogus: true\n",
    );
    let set = DirectiveSet::from_file(file.path()).unwrap();
    assert_eq!(set.len(), 2);
    assert_eq!(set.malformed().len(), 1);
    assert_eq!(set.malformed()[0].record, 3);
}

#[test]
fn test_missing_override_file_is_io_error() {
    let dir = tempfile::tempdir().unwrap();
    let err = DirectiveSet::from_file(dir.path().join("absent.yaml")).unwrap_err();
    assert!(matches!(err, OverrideError::Io { .. }));
}

#[test]
fn test_load_config_from_file() {
    let file = temp_file(
        r#"
principal_titles: [Professor, "Associate Member"]
max_hops: 4
directory:
  snapshot_path: /var/lib/org/directory.yaml
overrides:
  path: /etc/org/overrides.yaml
  required: true
slurm:
  cluster: gizmo
"#,
    );
    let config = EngineConfig::from_file(file.path()).unwrap();
    assert_eq!(config.max_hops, 4);
    assert!(config.title_set().qualifies("Associate Member"));
    assert_eq!(config.overrides.map(|o| o.required), Some(true));
    assert_eq!(config.slurm.cluster, "gizmo");
    assert_eq!(config.resolution.max_concurrent, 8);
}

#[test]
fn test_json_config_is_accepted() {
    let file = temp_file(
        r#"{"principal_titles": ["Professor"], "directory": {"snapshot_path": "dir.yaml"}}"#,
    );
    let config = EngineConfig::from_file(file.path()).unwrap();
    assert_eq!(config.max_hops, 10);
    assert!(config.overrides.is_none());
}

#[test]
fn test_config_without_titles_is_invalid() {
    let file = temp_file("principal_titles: []\ndirectory:\n  snapshot_path: d.yaml\n");
    let err = EngineConfig::from_file(file.path()).unwrap_err();
    assert!(matches!(err, ConfigError::Invalid(_)));
}

#[tokio::test]
async fn test_unknown_targets_are_reported_not_fatal() {
    let file = temp_file(
        r#"
---
account: orphaned
owner: nobody
---
username: s1
alist: [pi1, ghost]
adef: ghost
mode: sometimes
"#,
    );
    let directives = DirectiveSet::from_file(file.path()).unwrap();
    let (hierarchy, report) = three_person_lab()
        .engine()
        .build_account_hierarchy(&directives)
        .await
        .unwrap();

    assert!(!hierarchy.has_account("orphaned"));
    assert_eq!(hierarchy.memberships("s1"), strings(&["pi1"]));
    assert_eq!(hierarchy.effective_default("s1"), Some("pi1".to_string()));
    assert_eq!(
        report.issues,
        vec![
            MergeIssue::UnknownOwner {
                account: "orphaned".to_string(),
                owner: "nobody".to_string(),
            },
            MergeIssue::UnknownMode {
                username: "s1".to_string(),
                mode: "sometimes".to_string(),
            },
            MergeIssue::UnknownAccount {
                username: "s1".to_string(),
                account: "ghost".to_string(),
            },
            MergeIssue::UnknownDefaultAccount {
                username: "s1".to_string(),
                account: "ghost".to_string(),
            },
        ]
    );
}

#[test]
fn test_replace_then_append_sequence() {
    let mut list = strings(&["a", "b"]);
    merge_list(&mut list, &strings(&["c", "d"]), MergeMode::Append);
    assert_eq!(list, strings(&["a", "b", "c", "d"]));
    merge_list(&mut list, &strings(&["c", "d"]), MergeMode::Replace);
    assert_eq!(list, strings(&["c", "d"]));
}

fn names() -> impl Strategy<Value = Vec<String>> {
    prop::collection::vec("[a-e]", 0..8)
}

proptest! {
    #[test]
    fn append_never_duplicates(existing in names(), entries in names()) {
        let mut target: Vec<String> = Vec::new();
        merge_list(&mut target, &existing, MergeMode::Replace);
        merge_list(&mut target, &entries, MergeMode::Append);

        let mut seen = std::collections::HashSet::new();
        prop_assert!(target.iter().all(|name| seen.insert(name.clone())));
        prop_assert!(entries.iter().all(|e| target.contains(e)));
        prop_assert!(existing.iter().all(|e| target.contains(e)));
    }

    #[test]
    fn replace_is_exactly_the_entries(existing in names(), entries in names()) {
        let mut target = existing.clone();
        merge_list(&mut target, &entries, MergeMode::Replace);

        let mut expected: Vec<String> = Vec::new();
        for e in &entries {
            if !expected.contains(e) {
                expected.push(e.clone());
            }
        }
        prop_assert_eq!(target, expected);
    }

    #[test]
    fn merge_is_idempotent(existing in names(), entries in names(), append in any::<bool>()) {
        let mode = if append { MergeMode::Append } else { MergeMode::Replace };
        let mut once = existing.clone();
        merge_list(&mut once, &entries, mode);
        let mut twice = once.clone();
        merge_list(&mut twice, &entries, mode);
        prop_assert_eq!(once, twice);
    }

    #[test]
    fn all_covers_every_known_account(known in names(), extra in names()) {
        let mut entries = extra.clone();
        entries.push("ALL".to_string());
        let expanded = expand_all(&entries, &known);
        prop_assert!(known.iter().all(|k| expanded.contains(k)));
        prop_assert!(!expanded.iter().any(|e| e.eq_ignore_ascii_case("all")));
    }
}
