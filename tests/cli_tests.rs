use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;

fn torwatch() -> Command {
    Command::cargo_bin("torwatch").unwrap()
}

#[test]
fn test_no_action_prints_usage_and_fails() {
    torwatch()
        .assert()
        .failure()
        .stdout(predicate::str::contains("Usage"));
}

#[test]
fn test_help_mentions_actions() {
    torwatch()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("--run"))
        .stdout(predicate::str::contains("--sync"))
        .stdout(predicate::str::contains("--clean"));
}

#[test]
fn test_list_trackers_on_empty_directory() {
    let dir = tempfile::tempdir().unwrap();
    torwatch()
        .args(["--list-trackers", "--dir"])
        .arg(dir.path())
        .assert()
        .success()
        .stdout(predicate::str::is_empty());
}

#[test]
fn test_list_trackers_prints_names() {
    let dir = tempfile::tempdir().unwrap();
    let plugins = dir.path().join("trackers.d");
    fs::create_dir_all(&plugins).unwrap();
    fs::write(
        plugins.join("example.toml"),
        r#"
name = "example"

[links]
pattern = "href=\"(\\S+\\.torrent)\""
group = 1

[[listing]]
url = "http://example.org/browse.php"
"#,
    )
    .unwrap();

    torwatch()
        .args(["--list-trackers", "--dir"])
        .arg(dir.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("example"));
}

#[test]
fn test_clean_dry_run_keeps_artifacts() {
    let dir = tempfile::tempdir().unwrap();
    let cache = dir.path().join("cache");
    fs::create_dir_all(&cache).unwrap();
    fs::write(cache.join("x.torrent"), b"d8:announce3:url").unwrap();

    torwatch()
        .args(["--clean", "--dry-run", "--dir"])
        .arg(dir.path())
        .assert()
        .success();
    assert!(cache.join("x.torrent").exists());
}

#[test]
fn test_clean_removes_artifacts() {
    let dir = tempfile::tempdir().unwrap();
    let cache = dir.path().join("cache");
    fs::create_dir_all(&cache).unwrap();
    fs::write(cache.join("x.torrent"), b"d8:announce3:url").unwrap();
    fs::write(cache.join("x.notify"), b"To: user@example.org").unwrap();

    torwatch()
        .args(["--clean", "--dir"])
        .arg(dir.path())
        .assert()
        .success();
    assert!(!cache.join("x.torrent").exists());
    assert!(!cache.join("x.notify").exists());
}

#[test]
fn test_sync_missing_destination_reports_but_exits_zero() {
    let dir = tempfile::tempdir().unwrap();
    torwatch()
        .args(["--sync", "/nonexistent/watch/folder", "--dir"])
        .arg(dir.path())
        .assert()
        .success()
        .stderr(predicate::str::contains("DOES NOT exist"));
}

#[test]
fn test_sync_copies_into_watch_folder() {
    let dir = tempfile::tempdir().unwrap();
    let cache = dir.path().join("cache");
    let watch = dir.path().join("watch");
    fs::create_dir_all(&cache).unwrap();
    fs::create_dir_all(&watch).unwrap();
    fs::write(cache.join("x.torrent"), b"d8:announce3:url").unwrap();

    torwatch()
        .args(["--sync"])
        .arg(&watch)
        .arg("--dir")
        .arg(dir.path())
        .assert()
        .success();
    assert!(watch.join("x.torrent").exists());
}

#[test]
fn test_lock_conflict_exits_zero() {
    let dir = tempfile::tempdir().unwrap();
    let cache = dir.path().join("cache");
    fs::create_dir_all(&cache).unwrap();
    // pretend this test process already holds the lock
    fs::write(
        cache.join(".torwatch.lock"),
        format!("{}\n", std::process::id()),
    )
    .unwrap();

    torwatch()
        .args(["--clean", "--dir"])
        .arg(dir.path())
        .assert()
        .success()
        .stderr(predicate::str::contains("another instance"));
}
