//! E2E tests for the full program lifecycle.
//!
//! Publisher registers a title and publishes tasks; a tester onboards,
//! works the catalog, and collects each reward exactly once; promotion
//! closes the program to new joins without touching existing testers.
//!
//! Each test runs the `pt` binary as a subprocess in an isolated temp dir.

use assert_cmd::Command;
use predicates::prelude::*;
use serde_json::Value;
use std::path::Path;
use tempfile::TempDir;

fn pt(dir: &Path, actor: &str) -> Command {
    let mut cmd = Command::new(assert_cmd::cargo::cargo_bin!("pt"));
    cmd.current_dir(dir);
    cmd.env("PLAYTEST_ACTOR", actor);
    cmd.env("PLAYTEST_LOG", "error");
    cmd
}

fn json_output(cmd: &mut Command) -> Value {
    let output = cmd.output().expect("command should run");
    assert!(
        output.status.success(),
        "command failed: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    serde_json::from_slice(&output.stdout).expect("stdout should be valid JSON")
}

/// Program with one registered title and one onboarded tester.
fn seeded_program(publisher: &str, title: &str, tester: &str) -> TempDir {
    let dir = TempDir::new().unwrap();
    pt(dir.path(), "setup").args(["init"]).assert().success();
    pt(dir.path(), publisher)
        .args(["title", "register", title])
        .assert()
        .success();
    pt(dir.path(), tester).args(["accept", title]).assert().success();
    pt(dir.path(), tester).args(["join", title]).assert().success();
    dir
}

fn add_task(dir: &Path, publisher: &str, title: &str, name: &str, xp: u32, points: u32) -> String {
    let task = json_output(pt(dir, publisher).args([
        "task",
        "add",
        title,
        "--name",
        name,
        "--xp",
        &xp.to_string(),
        "--points",
        &points.to_string(),
        "--json",
    ]));
    task["task_id"].as_str().expect("task_id field").to_string()
}

#[test]
fn tasks_show_up_in_the_testers_catalog() {
    let dir = seeded_program("acme-studio", "vale-of-shadows", "alice");
    add_task(dir.path(), "acme-studio", "vale-of-shadows", "Clear the tutorial", 150, 10);

    let catalog = json_output(pt(dir.path(), "alice").args(["tasks", "vale-of-shadows", "--json"]));
    let entries = catalog.as_array().expect("catalog is an array");
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0]["task"]["name"], "Clear the tutorial");
    assert_eq!(entries[0]["task"]["kind"], "play_level");
    assert_eq!(entries[0]["completed_at_us"], Value::Null);
}

#[test]
fn completing_a_task_grants_the_reward_exactly_once() {
    let dir = seeded_program("acme-studio", "vale-of-shadows", "alice");
    let task_id = add_task(
        dir.path(),
        "acme-studio",
        "vale-of-shadows",
        "Clear the tutorial",
        150,
        10,
    );

    let first = json_output(pt(dir.path(), "alice").args(["complete", &task_id, "--json"]));
    assert_eq!(first["already_completed"], Value::Bool(false));
    assert_eq!(first["reward"]["xp"], 150);
    assert_eq!(first["reward"]["points"], 10);

    // The second attempt reports the repeat and grants nothing.
    let second = json_output(pt(dir.path(), "alice").args(["complete", &task_id, "--json"]));
    assert_eq!(second["already_completed"], Value::Bool(true));
    assert_eq!(second["reward"], Value::Null);

    // The catalog reflects the completion; the counter moved once.
    let catalog = json_output(pt(dir.path(), "alice").args(["tasks", "vale-of-shadows", "--json"]));
    assert!(catalog[0]["completed_at_us"].is_i64());

    let roster = json_output(pt(dir.path(), "acme-studio").args([
        "roster",
        "vale-of-shadows",
        "--json",
    ]));
    assert_eq!(roster[0]["tasks_completed"], 1);
}

#[test]
fn completion_requires_an_active_enrollment() {
    let dir = seeded_program("acme-studio", "vale-of-shadows", "alice");
    let task_id = add_task(
        dir.path(),
        "acme-studio",
        "vale-of-shadows",
        "Clear the tutorial",
        150,
        10,
    );

    // Bob never joined.
    pt(dir.path(), "bob")
        .args(["complete", &task_id])
        .assert()
        .failure()
        .stderr(predicate::str::contains("E2003"));
}

#[test]
fn updating_a_task_keeps_completion_history() {
    let dir = seeded_program("acme-studio", "vale-of-shadows", "alice");
    let task_id = add_task(
        dir.path(),
        "acme-studio",
        "vale-of-shadows",
        "Clear the tutorial",
        150,
        10,
    );
    pt(dir.path(), "alice").args(["complete", &task_id]).assert().success();

    let updated = json_output(pt(dir.path(), "acme-studio").args([
        "task", "update", &task_id, "--name", "Finish the tutorial island", "--xp", "200",
        "--json",
    ]));
    assert_eq!(updated["name"], "Finish the tutorial island");
    assert_eq!(updated["xp_reward"], 200);
    // Untouched fields keep their stored values.
    assert_eq!(updated["points_reward"], 10);

    let catalog = json_output(pt(dir.path(), "alice").args(["tasks", "vale-of-shadows", "--json"]));
    assert!(catalog[0]["completed_at_us"].is_i64(), "completion survives the update");
}

#[test]
fn task_removal_needs_confirmation_and_walks_back_counters() {
    let dir = seeded_program("acme-studio", "vale-of-shadows", "alice");
    let task_id = add_task(
        dir.path(),
        "acme-studio",
        "vale-of-shadows",
        "Clear the tutorial",
        150,
        10,
    );
    pt(dir.path(), "alice").args(["complete", &task_id]).assert().success();

    // Refused without --yes; nothing deleted.
    pt(dir.path(), "acme-studio")
        .args(["task", "rm", &task_id])
        .assert()
        .failure()
        .stderr(predicate::str::contains("--yes"));

    let deletion = json_output(pt(dir.path(), "acme-studio").args([
        "task", "rm", &task_id, "--yes", "--json",
    ]));
    assert_eq!(deletion["completions_removed"], 1);

    let roster = json_output(pt(dir.path(), "acme-studio").args([
        "roster",
        "vale-of-shadows",
        "--json",
    ]));
    assert_eq!(roster[0]["tasks_completed"], 0, "counter walked back with the rows");

    let catalog = json_output(pt(dir.path(), "alice").args(["tasks", "vale-of-shadows", "--json"]));
    assert_eq!(catalog.as_array().expect("array").len(), 0);
}

#[test]
fn only_the_owning_publisher_manages_the_catalog() {
    let dir = seeded_program("acme-studio", "vale-of-shadows", "alice");

    pt(dir.path(), "rival-studio")
        .args(["task", "add", "vale-of-shadows", "--name", "Sabotage"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("E6001"));
}

#[test]
fn promotion_is_one_way_and_closes_new_joins() {
    let dir = seeded_program("acme-studio", "vale-of-shadows", "alice");

    let released = json_output(pt(dir.path(), "acme-studio").args([
        "title",
        "promote",
        "vale-of-shadows",
        "--json",
    ]));
    assert_eq!(released["release_state"], "released");
    assert!(released["released_at_us"].is_i64());

    // Promoting again reports the terminal state.
    pt(dir.path(), "acme-studio")
        .args(["title", "promote", "vale-of-shadows"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("E1004"));

    // New joins are closed, even with the agreement on file.
    pt(dir.path(), "bob").args(["accept", "vale-of-shadows"]).assert().success();
    pt(dir.path(), "bob")
        .args(["join", "vale-of-shadows"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("E1003"));

    // Existing testers keep working the program.
    pt(dir.path(), "alice")
        .args(["session", "vale-of-shadows", "300"])
        .assert()
        .success();
}

#[test]
fn the_dir_flag_targets_a_program_outside_the_cwd() {
    let dir = seeded_program("acme-studio", "vale-of-shadows", "alice");
    let program_path = dir.path().to_str().expect("utf-8 temp path").to_string();

    // Run from an unrelated cwd, pointing --dir at the program.
    let elsewhere = TempDir::new().unwrap();
    let mut cmd = Command::new(assert_cmd::cargo::cargo_bin!("pt"));
    cmd.current_dir(elsewhere.path());
    cmd.env("PLAYTEST_LOG", "error");
    cmd.args([
        "--dir",
        &program_path,
        "--actor",
        "alice",
        "session",
        "vale-of-shadows",
        "120",
    ]);
    cmd.assert().success();
}
