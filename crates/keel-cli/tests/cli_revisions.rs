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

#[test]
fn test_sort_uses_revision_order_by_default() {
    let tmp = TempDir::new().unwrap();

    keel_cmd(&tmp)
        .args(["sort", "1.0", "1.0-rc1", "0.9", "1.0-final", "1.0-dev"])
        .assert()
        .success()
        .stdout("0.9\n1.0-dev\n1.0-rc1\n1.0-final\n1.0\n");
}

#[test]
fn test_sort_with_lexicographic_strategy() {
    let tmp = TempDir::new().unwrap();

    keel_cmd(&tmp)
        .args(["sort", "--strategy", "latest-lexico", "1.10", "1.9", "1.2"])
        .assert()
        .success()
        .stdout("1.10\n1.2\n1.9\n");
}

#[test]
fn test_latest_with_cutoff() {
    let tmp = TempDir::new().unwrap();

    keel_cmd(&tmp)
        .args(["latest", "1.0@1000", "2.0@3000", "1.5@2000"])
        .assert()
        .success()
        .stdout("2.0\n");

    keel_cmd(&tmp)
        .args(["latest", "--before", "2500", "1.0@1000", "2.0@3000", "1.5@2000"])
        .assert()
        .success()
        .stdout("1.5\n");

    keel_cmd(&tmp)
        .args(["latest", "--before", "10", "1.0@1000"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("no revision published before 10"));
}

#[test]
fn test_latest_matching_dynamic_request() {
    let tmp = TempDir::new().unwrap();

    keel_cmd(&tmp)
        .args(["latest", "--matching", "1.+", "1.0", "1.9", "2.0", "1.10"])
        .assert()
        .success()
        .stdout("1.10\n");

    keel_cmd(&tmp)
        .args(["latest", "--matching", "[1.0,2.0[", "0.9", "1.5", "2.0"])
        .assert()
        .success()
        .stdout("1.5\n");

    keel_cmd(&tmp)
        .args(["latest", "--matching", "3.+", "1.0", "2.0"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("no revision matching '3.+'"));
}

#[test]
fn test_sort_mixes_dynamic_revisions() {
    let tmp = TempDir::new().unwrap();

    keel_cmd(&tmp)
        .args(["sort", "latest.integration", "2.0", "1.+", "1.5", "[1.0,)"])
        .assert()
        .success()
        .stdout("1.5\n1.+\n2.0\n[1.0,)\nlatest.integration\n");
}

#[test]
fn test_latest_time_strategy() {
    let tmp = TempDir::new().unwrap();

    keel_cmd(&tmp)
        .args(["latest", "--strategy", "latest-time", "9.0@100", "1.0@200"])
        .assert()
        .success()
        .stdout("1.0\n");
}

#[test]
fn test_compare() {
    let tmp = TempDir::new().unwrap();

    keel_cmd(&tmp)
        .args(["compare", "1.10", "1.9"])
        .assert()
        .success()
        .stdout("1.10 > 1.9\n");

    keel_cmd(&tmp)
        .args(["compare", "1.+", "1.9"])
        .assert()
        .success()
        .stdout("1.+ > 1.9\n");
}

#[test]
fn test_unknown_strategy_fails() {
    let tmp = TempDir::new().unwrap();

    keel_cmd(&tmp)
        .args(["sort", "--strategy", "newest", "1.0"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("unknown latest strategy 'newest'"));
}

#[test]
fn test_settings_special_meanings() {
    let tmp = TempDir::new().unwrap();
    fs::write(
        tmp.path().join("keel.toml"),
        r#"
default-latest-strategy = "qa-aware"

[[latest-strategies]]
name = "qa-aware"
kind = "latest-revision"
special-meanings = { qa = 4 }
"#,
    )
    .unwrap();

    keel_cmd(&tmp)
        .args(["latest", "1.0-final", "1.0-QA", "1.0-rc2"])
        .assert()
        .success()
        .stdout("1.0-QA\n");
}

#[test]
fn test_malformed_settings_fail() {
    let tmp = TempDir::new().unwrap();
    fs::write(
        tmp.path().join("custom.toml"),
        "[[conflict-managers]]\nname = \"r\"\nkind = \"regexp\"\n",
    )
    .unwrap();

    keel_cmd(&tmp)
        .args(["--settings", "custom.toml", "sort", "1.0"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("needs a regexp"));
}
