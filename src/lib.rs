//! weekplan - Weekly Planner Library
//!
//! Core model and storage for a single-user weekly task planner, plus the
//! password-gated HTTP server and the `weekplan` CLI.
//!
//! # Core Concepts
//!
//! - **Weeks**: tasks are grouped under the Monday (`YYYY-MM-DD`) of their week
//! - **Blocks**: each task holds an ordered list of text, subtask, timeline
//!   and process-deck blocks
//! - **Legacy shapes**: older flat-subtask and section records are migrated
//!   to blocks on load; a flat subtask list is written back on every save
//! - **Comments**: inline notes anchored to spans of a task's rich-text details
//!
//! # Module Organization
//!
//! - `block`: block tree and its id-addressed mutations
//! - `legacy`: migration from older record shapes and flattening
//! - `task`: task records, comments, progress
//! - `week`: week keys and navigation
//! - `storage`: planner file and the in-memory `PlannerStore`
//! - `lock`: file locking and atomic writes
//! - `config`: configuration loading from `weekplan.toml`
//! - `auth`: shared-password gate
//! - `server`: axum router
//! - `output`: human / JSON output for CLI commands
//! - `cli`: command-line interface using clap
//! - `error`: error types and result aliases

pub mod auth;
pub mod block;
pub mod cli;
pub mod config;
pub mod error;
pub mod legacy;
pub mod lock;
pub mod output;
pub mod server;
pub mod storage;
pub mod task;
pub mod week;

pub use error::{Error, Result};
