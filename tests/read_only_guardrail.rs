//! Fails the build if source code ever reaches for a mutating Gmail call
//! or requests a scope broader than read-only.

use std::fs;
use std::path::{Path, PathBuf};

/// google-gmail1 builder methods that change mailbox state
const MUTATING_CALLS: &[&str] = &[
    "messages_modify",
    "messages_batch_modify",
    "messages_send",
    "messages_trash",
    "messages_untrash",
    "messages_delete",
    "messages_batch_delete",
    "messages_insert",
    "messages_import",
    "threads_modify",
    "threads_trash",
    "threads_untrash",
    "threads_delete",
    "drafts_create",
    "drafts_send",
    "drafts_update",
    "drafts_delete",
    "labels_create",
    "labels_update",
    "labels_patch",
    "labels_delete",
    "settings_filters_create",
    "settings_filters_delete",
];

const WRITE_SCOPES: &[&str] = &[
    "auth/gmail.modify",
    "auth/gmail.send",
    "auth/gmail.compose",
    "auth/gmail.insert",
    "auth/gmail.labels",
    "auth/gmail.settings.basic",
    "auth/gmail.settings.sharing",
    "https://mail.google.com/",
];

fn rust_sources(dir: &Path, out: &mut Vec<PathBuf>) {
    for entry in fs::read_dir(dir).unwrap() {
        let path = entry.unwrap().path();
        if path.is_dir() {
            rust_sources(&path, out);
        } else if path.extension().is_some_and(|ext| ext == "rs") {
            out.push(path);
        }
    }
}

fn source_files() -> Vec<(PathBuf, String)> {
    let src = Path::new(env!("CARGO_MANIFEST_DIR")).join("src");
    let mut paths = Vec::new();
    rust_sources(&src, &mut paths);
    assert!(!paths.is_empty(), "no sources found under {:?}", src);

    paths
        .into_iter()
        .map(|p| {
            let content = fs::read_to_string(&p).unwrap();
            (p, content)
        })
        .collect()
}

#[test]
fn test_no_mutating_gmail_calls() {
    let mut violations = Vec::new();
    for (path, content) in source_files() {
        for (line_no, line) in content.lines().enumerate() {
            for call in MUTATING_CALLS {
                if line.contains(&format!("{}(", call)) {
                    violations.push(format!("{}:{}: {}", path.display(), line_no + 1, call));
                }
            }
        }
    }
    assert!(violations.is_empty(), "mutating Gmail calls found:\n{}", violations.join("\n"));
}

#[test]
fn test_no_write_scopes() {
    let mut violations = Vec::new();
    for (path, content) in source_files() {
        for (line_no, line) in content.lines().enumerate() {
            for scope in WRITE_SCOPES {
                if line.contains(scope) {
                    violations.push(format!("{}:{}: {}", path.display(), line_no + 1, scope));
                }
            }
        }
    }
    assert!(violations.is_empty(), "write scopes found:\n{}", violations.join("\n"));
}

#[test]
fn test_every_scope_request_is_read_only() {
    let mut scope_calls = 0;
    for (path, content) in source_files() {
        for (line_no, line) in content.lines().enumerate() {
            if line.contains(".add_scope(") {
                scope_calls += 1;
                assert!(
                    line.contains("READONLY_SCOPE"),
                    "{}:{} requests a scope other than READONLY_SCOPE",
                    path.display(),
                    line_no + 1
                );
            }
        }
    }
    assert!(scope_calls > 0, "expected the client to request scopes explicitly");
}

#[test]
fn test_requested_scopes_constant() {
    assert_eq!(
        gmail_reader::auth::REQUIRED_SCOPES,
        &["https://www.googleapis.com/auth/gmail.readonly"]
    );
}
