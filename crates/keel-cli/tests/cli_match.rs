use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

#[allow(deprecated)]
fn keel_cmd(dir: &TempDir) -> Command {
    let mut cmd = Command::cargo_bin("keel").unwrap();
    cmd.current_dir(dir.path()).env_remove("KEEL_SETTINGS");
    cmd
}

#[test]
fn test_glob_match() {
    let tmp = TempDir::new().unwrap();

    keel_cmd(&tmp)
        .args(["match", "--matcher", "glob", "org.acme*", "org.acme.tools", "com.acme"])
        .assert()
        .success()
        .stdout("org.acme.tools: yes\ncom.acme: no\n");
}

#[test]
fn test_regexp_match_is_anchored() {
    let tmp = TempDir::new().unwrap();

    keel_cmd(&tmp)
        .args(["match", "-m", "regexp", "acme", "org.acme", "acme"])
        .assert()
        .success()
        .stdout("org.acme: no\nacme: yes\n");
}

#[test]
fn test_regexp_negative_lookahead() {
    let tmp = TempDir::new().unwrap();

    keel_cmd(&tmp)
        .args(["match", "-m", "regexp", "(?!test-).*", "core", "test-core"])
        .assert()
        .success()
        .stdout("core: yes\ntest-core: no\n");
}

#[test]
fn test_invalid_regexp_fails() {
    let tmp = TempDir::new().unwrap();

    keel_cmd(&tmp)
        .args(["match", "-m", "regexp", "(", "x"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Invalid regexp pattern"));
}

#[test]
fn test_unknown_matcher_fails() {
    let tmp = TempDir::new().unwrap();

    keel_cmd(&tmp)
        .args(["match", "-m", "fuzzy", "a", "a"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("unknown matcher 'fuzzy'"));
}
