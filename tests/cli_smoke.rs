use assert_cmd::Command;
use predicates::str::contains;

#[test]
fn weekplan_help_works() {
    Command::cargo_bin("weekplan")
        .expect("binary")
        .arg("--help")
        .assert()
        .success()
        .stdout(contains("weekly task planner"));
}

#[test]
fn subcommand_help_works() {
    let subcommands = [
        vec!["week"],
        vec!["task"],
        vec!["task", "comment"],
        vec!["block"],
        vec!["step"],
        vec!["card"],
        vec!["sub"],
        vec!["serve"],
    ];

    for cmd in subcommands {
        Command::cargo_bin("weekplan")
            .expect("binary")
            .args(&cmd)
            .arg("--help")
            .assert()
            .success();
    }
}

#[test]
fn unknown_block_kind_is_rejected() {
    Command::cargo_bin("weekplan")
        .expect("binary")
        .args(["block", "add", "abc", "kanban"])
        .assert()
        .failure()
        .code(2);
}
