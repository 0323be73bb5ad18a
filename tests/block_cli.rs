mod support;

use predicates::str::contains;
use serde_json::json;

use support::{TestPlanner, WEEK};

#[test]
fn timeline_with_steps_and_nested_subtasks() {
    let planner = TestPlanner::new();
    let task = planner.add_task("Launch");

    let added = planner.json(&["block", "add", &task, "timeline"]);
    let block = added["data"]["id"].as_str().expect("block id").to_string();
    assert_eq!(added["data"]["blocks"][0]["type"], "timeline");
    assert_eq!(added["data"]["blocks"][0]["data"], json!({"steps": []}));

    let step1 = planner.json(&["step", "add", &task, &block, "Design"])["data"]["id"]
        .as_str()
        .expect("step id")
        .to_string();
    let step2 = planner.json(&["step", "add", &task, &block, "Build"])["data"]["id"]
        .as_str()
        .expect("step id")
        .to_string();
    let sub = planner.json(&["sub", "add", &task, &block, &step1, "Sketch"])["data"]["id"]
        .as_str()
        .expect("sub id")
        .to_string();

    planner.json(&["step", "update", &task, &block, &step2, "--description", "Pending"]);
    let toggled = planner.json(&["task", "toggle-item", &task, &sub]);
    assert_eq!(toggled["data"]["changed"], true);

    let stored = planner.read_planner();
    let record = &stored[WEEK][0];
    let flat: Vec<(&str, bool)> = record["subtasks"]
        .as_array()
        .expect("flat list")
        .iter()
        .map(|item| {
            (
                item["id"].as_str().expect("id"),
                item["completed"].as_bool().expect("completed"),
            )
        })
        .collect();
    assert_eq!(
        flat,
        vec![
            (step1.as_str(), false),
            (sub.as_str(), true),
            (step2.as_str(), false)
        ]
    );
    assert_eq!(record["blocks"][0]["data"]["steps"][1]["description"], "Pending");

    planner
        .cmd()
        .args(["task", "show", &task])
        .assert()
        .success()
        .stdout(contains("progress: 1/3"))
        .stdout(contains("Build (Pending)"));
}

#[test]
fn block_reorder_convert_and_remove() {
    let planner = TestPlanner::new();
    let task = planner.add_task("Chores");

    let mut ids = Vec::new();
    for kind in ["text", "subtask", "todo", "deck"] {
        let out = planner.json(&["block", "add", &task, kind]);
        ids.push(out["data"]["id"].as_str().expect("id").to_string());
    }

    let moved = planner.json(&["block", "move", &task, "0", "2"]);
    let order: Vec<&str> = moved["data"]["blocks"]
        .as_array()
        .expect("blocks")
        .iter()
        .map(|b| b["id"].as_str().expect("id"))
        .collect();
    assert_eq!(order, vec![ids[1].as_str(), ids[2].as_str(), ids[0].as_str(), ids[3].as_str()]);

    planner.json(&["block", "update", &task, &ids[0], "--content", "Take out trash"]);
    let converted = planner.json(&["block", "convert", &task, &ids[0], "subtask"]);
    assert_eq!(converted["data"]["blocks"][2]["type"], "subtask");
    assert_eq!(converted["data"]["blocks"][2]["content"], "Take out trash");

    let inserted = planner.json(&["block", "add", &task, "text", "--after", "0"]);
    let new_id = inserted["data"]["id"].as_str().expect("id");
    assert_eq!(inserted["data"]["blocks"][1]["id"], new_id);

    let removed = planner.json(&["block", "rm", &task, &ids[3]]);
    assert_eq!(removed["data"]["blocks"].as_array().expect("blocks").len(), 4);
}

#[test]
fn process_deck_cards_flatten_as_incomplete() {
    let planner = TestPlanner::new();
    let task = planner.add_task("Hiring");
    let deck = planner.json(&["block", "add", &task, "process-deck"])["data"]["id"]
        .as_str()
        .expect("deck id")
        .to_string();
    let card = planner.json(&["card", "add", &task, &deck, "Screen"])["data"]["id"]
        .as_str()
        .expect("card id")
        .to_string();
    let sub = planner.json(&["sub", "add", &task, &deck, &card, "Call"])["data"]["id"]
        .as_str()
        .expect("sub id")
        .to_string();
    planner.json(&["sub", "update", &task, &deck, &card, &sub, "--completed", "true"]);

    // Cards carry no completion state.
    let toggled = planner.json(&["task", "toggle-item", &task, &card]);
    assert_eq!(toggled["data"]["changed"], false);

    let stored = planner.read_planner();
    assert_eq!(
        stored[WEEK][0]["subtasks"],
        json!([
            {"id": card, "text": "Screen", "completed": false},
            {"id": sub, "text": "Call", "completed": true}
        ])
    );

    planner.json(&["task", "rm-item", &task, &card]);
    let stored = planner.read_planner();
    assert_eq!(stored[WEEK][0]["blocks"][0]["data"]["cards"], json!([]));
}

#[test]
fn missing_ids_warn_without_failing() {
    let planner = TestPlanner::new();
    let task = planner.add_task("Quiet");

    planner
        .cmd()
        .args(["block", "rm", &task, "does-not-exist"])
        .assert()
        .success()
        .stdout(contains("Nothing changed"))
        .stdout(contains("no block 'does-not-exist'"));

    let out = planner.json(&["step", "add", &task, "nope", "Title"]);
    assert_eq!(out["data"]["changed"], false);
}
