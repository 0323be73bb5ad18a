mod support;

use std::fs;

use predicates::prelude::*;
use weekplan::config::{Config, CONFIG_FILE_NAME};

use support::TestPlanner;

#[test]
fn load_from_dir_defaults_on_invalid_config() {
    let dir = tempfile::tempdir().expect("tempdir");
    fs::write(dir.path().join(CONFIG_FILE_NAME), "[auth]\ncookie_max_age_days = 0")
        .expect("write invalid config");

    let cfg = Config::load_from_dir(dir.path());
    assert_eq!(cfg.auth.cookie_max_age_days, 7);
    assert_eq!(cfg.storage.key, "weekly-planner-tasks-v2");
}

#[test]
fn data_dir_overrides_configured_storage_dir() -> Result<(), Box<dyn std::error::Error>> {
    let dir = tempfile::tempdir()?;
    let config_path = dir.path().join("custom.toml");
    fs::write(
        &config_path,
        "[storage]\ndir = \"/somewhere/else\"\nkey = \"planner\"\n",
    )?;

    let cfg = Config::resolve(Some(&config_path), Some(dir.path()))?;
    assert_eq!(cfg.storage.dir, dir.path());
    assert_eq!(cfg.storage().planner_file(), dir.path().join("planner.json"));
    Ok(())
}

#[test]
fn config_in_data_dir_selects_storage_key() {
    let planner = TestPlanner::new();
    fs::write(
        planner.path().join(CONFIG_FILE_NAME),
        "[storage]\nkey = \"family\"\n",
    )
    .expect("write config");

    planner.add_task("Shared chores");

    let raw = fs::read_to_string(planner.path().join("family.json")).expect("keyed file");
    assert!(raw.contains("Shared chores"));
    assert!(!planner.planner_file().exists());
}

#[test]
fn invalid_explicit_config_is_a_user_error() {
    let planner = TestPlanner::new();
    let path = planner.path().join("bad.toml");
    fs::write(&path, "[auth]\npassword = \"\"\n").expect("write config");

    planner
        .cmd()
        .arg("--config")
        .arg(&path)
        .args(["week", "list"])
        .assert()
        .code(2)
        .stderr(predicate::str::contains("auth.password"));
}

#[test]
fn missing_explicit_config_fails() {
    let planner = TestPlanner::new();
    planner
        .cmd()
        .arg("--config")
        .arg(planner.path().join("absent.toml"))
        .args(["--json", "week", "list"])
        .assert()
        .code(4)
        .stdout(predicate::str::contains("\"status\": \"error\""));
}
