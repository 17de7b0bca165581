use assert_cmd::Command;
use predicates::str::contains;
use tempfile::tempdir;

fn cmd() -> Command {
    Command::cargo_bin("replay-telemetry").unwrap()
}

#[test]
fn list_aspects_includes_team_stats() {
    cmd().arg("list-aspects").assert().success().stdout(contains("team_stats"));
}

#[test]
fn list_stats_includes_army_value_timeline() {
    cmd()
        .arg("list-stats")
        .assert()
        .success()
        .stdout(contains("army_value_timeline"));
}

#[test]
fn list_streams_includes_commands_log() {
    cmd()
        .arg("list-streams")
        .assert()
        .success()
        .stdout(contains("commands_log"));
}

#[test]
fn dry_run_with_empty_input_dir_succeeds() {
    let input_dir = tempdir().unwrap();
    let output_dir = tempdir().unwrap();
    let cache_dir = tempdir().unwrap();

    cmd()
        .args([
            "run",
            "replay-1",
            "--input-dir",
            input_dir.path().to_str().unwrap(),
            "--cache-dir",
            cache_dir.path().to_str().unwrap(),
            "--output-dir",
            output_dir.path().to_str().unwrap(),
            "--dry-run",
        ])
        .assert()
        .success();
}

#[test]
fn run_rejects_unknown_output_format() {
    let input_dir = tempdir().unwrap();
    let output_dir = tempdir().unwrap();
    let cache_dir = tempdir().unwrap();

    cmd()
        .args([
            "run",
            "replay-1",
            "--input-dir",
            input_dir.path().to_str().unwrap(),
            "--cache-dir",
            cache_dir.path().to_str().unwrap(),
            "--output-dir",
            output_dir.path().to_str().unwrap(),
            "--output-format",
            "not-a-real-format",
            "--dry-run",
        ])
        .assert()
        .failure()
        .stderr(contains("unrecognized output format"));
}

#[test]
fn run_fails_fast_on_nonexistent_input_dir() {
    let output_dir = tempdir().unwrap();
    let cache_dir = tempdir().unwrap();

    cmd()
        .args([
            "run",
            "replay-1",
            "--input-dir",
            "/nonexistent/input/dir/for/replay/telemetry/tests",
            "--cache-dir",
            cache_dir.path().to_str().unwrap(),
            "--output-dir",
            output_dir.path().to_str().unwrap(),
        ])
        .assert()
        .failure();
}

#[test]
fn help() {
    cmd().arg("--help").assert().success();
}

#[test]
fn version() {
    cmd()
        .arg("--version")
        .assert()
        .success()
        .stdout(contains(env!("CARGO_PKG_VERSION")));
}
