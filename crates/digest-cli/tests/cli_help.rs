use assert_cmd::cargo::cargo_bin_cmd;
use predicates::prelude::*;

#[test]
fn test_help_shows_all_commands() {
    cargo_bin_cmd!("digest")
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("login"))
        .stdout(predicate::str::contains("feed"))
        .stdout(predicate::str::contains("bookmarks"))
        .stdout(predicate::str::contains("admin"));
}

#[test]
fn test_admin_help_shows_subcommands() {
    cargo_bin_cmd!("digest")
        .args(["admin", "--help"])
        .assert()
        .success()
        .stdout(predicate::str::contains("stats"))
        .stdout(predicate::str::contains("lock"))
        .stdout(predicate::str::contains("crawl"))
        .stdout(predicate::str::contains("keyword-users"));
}

#[test]
fn test_password_help_shows_subcommands() {
    cargo_bin_cmd!("digest")
        .args(["password", "--help"])
        .assert()
        .success()
        .stdout(predicate::str::contains("change"))
        .stdout(predicate::str::contains("reset-request"))
        .stdout(predicate::str::contains("reset-confirm"));
}

#[test]
fn test_version_flag() {
    cargo_bin_cmd!("digest")
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("digest"));
}

#[test]
fn test_unknown_admin_table_is_rejected() {
    cargo_bin_cmd!("digest")
        .args(["admin", "list", "widgets"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("unknown admin table 'widgets'"));
}

#[test]
fn test_trending_conflicts_with_search() {
    cargo_bin_cmd!("digest")
        .args(["feed", "--trending", "--search", "AI"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("cannot be used with"));
}
