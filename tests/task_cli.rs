mod support;

use predicates::str::contains;
use serde_json::{json, Value};

use support::{TestPlanner, WEEK};

#[test]
fn add_show_edit_done_rm() {
    let planner = TestPlanner::new();
    let id = planner.add_task("  Write report  ");

    let shown = planner.json(&["task", "show", &id[..6]]);
    assert_eq!(shown["command"], "task show");
    assert_eq!(shown["data"]["title"], "Write report");
    assert_eq!(shown["data"]["week"], WEEK);
    assert_eq!(shown["data"]["completed"], false);

    let edited = planner.json(&["task", "edit", &id, "--details", "<p>Draft <b>v2</b></p>"]);
    assert_eq!(edited["data"]["details"], "<p>Draft <b>v2</b></p>");
    assert_eq!(edited["data"]["title"], "Write report");

    let done = planner.json(&["task", "done", &id]);
    assert_eq!(done["data"]["completed"], true);

    let stored = planner.read_planner();
    assert_eq!(stored[WEEK][0]["completed"], true);
    assert_eq!(stored[WEEK][0]["subtasks"], json!([]));

    planner
        .cmd()
        .args(["week", "show"])
        .assert()
        .success()
        .stdout(contains("[x]"))
        .stdout(contains("Write report: Draft v2"));

    planner.json(&["task", "rm", &id]);
    assert_eq!(planner.read_planner()[WEEK], json!([]));
}

#[test]
fn blank_title_is_user_error() {
    let planner = TestPlanner::new();
    planner
        .cmd()
        .args(["task", "add", "   "])
        .assert()
        .failure()
        .code(2)
        .stderr(contains("title cannot be empty"));
}

#[test]
fn unknown_task_is_user_error_with_json_envelope() {
    let planner = TestPlanner::new();
    let output = planner
        .cmd()
        .args(["--json", "task", "show", "missing"])
        .output()
        .expect("run");
    assert_eq!(output.status.code(), Some(2));

    let body: Value = serde_json::from_slice(&output.stdout).expect("json");
    assert_eq!(body["status"], "error");
    assert_eq!(body["command"], "task show");
    assert_eq!(body["error"]["kind"], "user_error");
    assert_eq!(body["error"]["details"]["id"], "missing");
}

#[test]
fn invalid_week_is_user_error() {
    let planner = TestPlanner::new();
    planner
        .cmd()
        .args(["--week", "tomorrow", "week", "show"])
        .assert()
        .failure()
        .code(2)
        .stderr(contains("Invalid week"));
}

#[test]
fn any_date_selects_its_week() {
    let planner = TestPlanner::new();
    planner
        .cmd()
        .args(["--week", "2024-01-07", "task", "add", "Sunday task"])
        .assert()
        .success();

    let stored = planner.read_planner();
    assert_eq!(stored["2024-01-01"][0]["title"], "Sunday task");

    let listing = planner.json(&["week", "list"]);
    assert_eq!(listing["data"][0]["week"], "2024-01-01");
    assert_eq!(listing["data"][0]["tasks"], 1);

    let next = planner.json(&["week", "show", "--offset", "1"]);
    assert_eq!(next["data"]["week"]["key"], "2024-01-08");
    assert_eq!(next["data"]["week"]["range"], "Jan 8 – Jan 14");
    assert_eq!(next["data"]["tasks"], json!([]));
}

#[test]
fn comments_add_edit_and_unwrap_on_remove() {
    let planner = TestPlanner::new();
    let id = planner.add_task("Review");

    let added = planner.json(&["task", "comment", "add", &id, "Check this", "--selected", "numbers"]);
    let comment_id = added["data"]["comment"].as_str().expect("comment id").to_string();
    assert_eq!(added["data"]["changed"], true);

    let details = format!(
        "<p>The <span class=\"rich-text-comment\" data-comment-id=\"{comment_id}\">numbers</span> look off</p>"
    );
    planner.json(&["task", "edit", &id, "--details", &details]);

    let edited = planner.json(&["task", "comment", "edit", &id, &comment_id[..8], "Recheck"]);
    assert_eq!(edited["data"]["changed"], true);

    let shown = planner.json(&["task", "show", &id]);
    assert_eq!(shown["data"]["comments"][0]["text"], "Recheck");
    assert_eq!(shown["data"]["comments"][0]["selectedText"], "numbers");

    let removed = planner.json(&["task", "comment", "rm", &id, &comment_id]);
    assert_eq!(removed["data"]["changed"], true);
    assert_eq!(removed["data"]["details"], "<p>The numbers look off</p>");

    let blank = planner.json(&["task", "comment", "add", &id, "   "]);
    assert_eq!(blank["data"]["changed"], false);
}

#[test]
fn corrupt_planner_file_is_preserved() {
    let planner = TestPlanner::new();
    std::fs::write(planner.planner_file(), "{oops").expect("write");

    planner.add_task("After corruption");

    let backups: Vec<_> = std::fs::read_dir(planner.path())
        .expect("read dir")
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.file_name().to_string_lossy().contains(".corrupt-"))
        .collect();
    assert_eq!(backups.len(), 1);
    assert_eq!(planner.read_planner()[WEEK][0]["title"], "After corruption");
}
