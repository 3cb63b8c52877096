//! End-to-end tests for the `darwin` binary against the fixture corpus.

use std::path::{Path, PathBuf};
use std::process::Command;

fn darwin_binary() -> PathBuf {
    PathBuf::from(env!("CARGO_BIN_EXE_darwin"))
}

fn fixture_manifest() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("fixtures")
        .join("data")
        .join("documents")
}

/// Run darwin with given args, returning (stdout, stderr, success)
fn run_darwin(args: &[&str]) -> (String, String, bool) {
    let output = Command::new(darwin_binary())
        .args(args)
        .output()
        .expect("Failed to run darwin");

    (
        String::from_utf8_lossy(&output.stdout).to_string(),
        String::from_utf8_lossy(&output.stderr).to_string(),
        output.status.success(),
    )
}

fn path_str(path: &Path) -> &str {
    path.to_str().expect("utf-8 path")
}

#[test]
fn test_search_with_manifest() {
    let manifest = fixture_manifest();
    let (stdout, stderr, ok) = run_darwin(&[
        "search",
        "harry",
        "--manifest",
        path_str(&manifest),
        "--no-color",
    ]);

    assert!(ok, "darwin search failed: {stderr}");
    assert_eq!(stdout, "doc1(line 1): harry potter\ndoc2(line 0): harry potter\n");
}

#[test]
fn test_search_unknown_word_prints_nothing() {
    let manifest = fixture_manifest();
    let (stdout, _, ok) = run_darwin(&[
        "search",
        "ruochen",
        "--manifest",
        path_str(&manifest),
        "--no-color",
    ]);

    assert!(ok);
    assert!(stdout.is_empty());
}

#[test]
fn test_index_then_search_snapshot_as_json() {
    let dir = tempfile::tempdir().unwrap();
    let snapshot = dir.path().join("index.bin");
    let manifest = fixture_manifest();

    let (_, stderr, ok) = run_darwin(&[
        "index",
        path_str(&manifest),
        "--output",
        path_str(&snapshot),
    ]);
    assert!(ok, "darwin index failed: {stderr}");
    assert!(snapshot.exists());

    let (stdout, stderr, ok) = run_darwin(&[
        "search",
        "shell",
        "--snapshot",
        path_str(&snapshot),
        "--json",
    ]);
    assert!(ok, "darwin search failed: {stderr}");

    let matches: serde_json::Value = serde_json::from_str(&stdout).unwrap();
    assert_eq!(
        matches,
        serde_json::json!([{
            "doc_id": 0,
            "doc_name": "doc1",
            "line_number": 0,
            "line_content": "shell code"
        }])
    );
}

#[test]
fn test_stats() {
    let dir = tempfile::tempdir().unwrap();
    let snapshot = dir.path().join("index.bin");
    let manifest = fixture_manifest();

    let (_, _, ok) = run_darwin(&["index", path_str(&manifest), "-o", path_str(&snapshot)]);
    assert!(ok);

    let (stdout, _, ok) = run_darwin(&["stats", path_str(&snapshot)]);
    assert!(ok);
    assert!(stdout.contains("documents: 4"));
    assert!(stdout.contains("postings: 15"));
}

#[test]
fn test_search_without_source_fails() {
    let (_, stderr, ok) = run_darwin(&["search", "harry"]);
    assert!(!ok);
    assert!(stderr.contains("--manifest or --snapshot"));
}

#[test]
fn test_missing_manifest_fails_with_path() {
    let (_, stderr, ok) = run_darwin(&["search", "harry", "--manifest", "no/such/documents"]);
    assert!(!ok);
    assert!(stderr.contains("no/such/documents"));
}
