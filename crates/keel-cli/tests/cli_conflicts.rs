use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use tempfile::TempDir;

#[allow(deprecated)]
fn keel_cmd(dir: &TempDir) -> Command {
    let mut cmd = Command::cargo_bin("keel").unwrap();
    cmd.current_dir(dir.path()).env_remove("KEEL_SETTINGS");
    cmd
}

const SNAPSHOT: &str = r#"
root = "acme#app;1.0"

[[nodes]]
id = "acme#web;1.0"

[[nodes]]
id = "org#lib;1.0"
last-modified = 3000

[[nodes]]
id = "org#lib;1.2"
last-modified = 1000

[[nodes]]
id = "org#lib;1.10"
last-modified = 2000

[[edges]]
from = "acme#app;1.0"
to = "acme#web;1.0"

[[edges]]
from = "acme#app;1.0"
to = "org#lib;1.0"

[[edges]]
from = "acme#app;1.0"
to = "org#lib;1.2"
requested = "1.+"

[[edges]]
from = "acme#app;1.0"
to = "org#lib;1.10"

[[edges]]
from = "acme#web;1.0"
to = "org#lib;1.10"
"#;

fn project(settings: Option<&str>) -> TempDir {
    let tmp = TempDir::new().unwrap();
    fs::write(tmp.path().join("graph.toml"), SNAPSHOT).unwrap();
    if let Some(settings) = settings {
        fs::write(tmp.path().join("keel.toml"), settings).unwrap();
    }
    tmp
}

#[test]
fn test_conflicts_with_default_manager() {
    let tmp = project(None);

    keel_cmd(&tmp)
        .args(["conflicts", "graph.toml"])
        .assert()
        .success()
        .stdout(predicate::str::contains("├── org#lib;1.0 [evicted]"))
        .stdout(predicate::str::contains(
            "├── org#lib;1.2 (requested 1.+) [evicted]",
        ))
        .stdout(predicate::str::contains("│   └── org#lib;1.10"))
        .stdout(predicate::str::contains(
            "org#lib in acme#app;1.0: kept [1.10], evicted [1.0, 1.2] (latest-revision)",
        ));
}

#[test]
fn test_conflicts_with_module_rule() {
    let tmp = project(Some(
        r#"
[[module-rules]]
organisation = "org"
conflict-manager = "latest-time"
"#,
    ));

    keel_cmd(&tmp)
        .args(["conflicts", "graph.toml"])
        .assert()
        .success()
        .stdout(predicate::str::contains(
            "kept [1.0], evicted [1.2, 1.10] (latest-time)",
        ));
}

#[test]
fn test_conflicts_without_competition() {
    let tmp = project(Some("default-conflict-manager = \"all\"\n"));

    keel_cmd(&tmp)
        .args(["conflicts", "graph.toml"])
        .assert()
        .success()
        .stdout(predicate::str::contains("No conflicts."))
        .stdout(predicate::str::contains("[evicted]").not());
}

#[test]
fn test_strict_conflict_fails() {
    let tmp = project(Some("default-conflict-manager = \"strict\"\n"));

    keel_cmd(&tmp)
        .args(["conflicts", "graph.toml"])
        .assert()
        .failure()
        .stdout(predicate::str::contains("Problems (1):"))
        .stdout(predicate::str::contains(
            "org#lib;1.0 (needed by [acme#app;1.0]) conflicts with org#lib;1.2",
        ));
}

#[test]
fn test_missing_snapshot_fails() {
    let tmp = project(None);

    keel_cmd(&tmp)
        .args(["conflicts", "missing.toml"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("I/O error"));
}
