#![allow(dead_code)]

use std::fs;
use std::path::{Path, PathBuf};

use assert_cmd::Command;
use serde_json::Value;
use tempfile::TempDir;

pub const WEEK: &str = "2024-01-01";
pub const PLANNER_FILE: &str = "weekly-planner-tasks-v2.json";

/// An isolated data directory for one test
pub struct TestPlanner {
    dir: TempDir,
}

impl TestPlanner {
    pub fn new() -> Self {
        Self {
            dir: tempfile::tempdir().expect("failed to create tempdir"),
        }
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    pub fn planner_file(&self) -> PathBuf {
        self.dir.path().join(PLANNER_FILE)
    }

    pub fn write_planner(&self, value: &Value) {
        fs::write(
            self.planner_file(),
            serde_json::to_string_pretty(value).expect("serialize planner"),
        )
        .expect("write planner");
    }

    pub fn read_planner(&self) -> Value {
        let raw = fs::read_to_string(self.planner_file()).expect("read planner");
        serde_json::from_str(&raw).expect("parse planner")
    }

    /// `weekplan` pointed at this data dir, with `--week` fixed
    pub fn cmd(&self) -> Command {
        let mut cmd = Command::cargo_bin("weekplan").expect("binary");
        cmd.env("WEEKPLAN_DATA_DIR", self.dir.path())
            .env_remove("WEEKPLAN_CONFIG")
            .env_remove("RUST_LOG")
            .args(["--week", WEEK]);
        cmd
    }

    /// Run with `--json` and return the envelope
    pub fn json(&self, args: &[&str]) -> Value {
        let output = self
            .cmd()
            .arg("--json")
            .args(args)
            .output()
            .expect("run weekplan");
        assert!(
            output.status.success(),
            "weekplan {args:?} failed: {}",
            String::from_utf8_lossy(&output.stdout)
        );
        serde_json::from_slice(&output.stdout).expect("json output")
    }

    pub fn add_task(&self, title: &str) -> String {
        let out = self.json(&["task", "add", title]);
        out["data"]["id"].as_str().expect("task id").to_string()
    }
}
