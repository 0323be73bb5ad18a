//! Command-line interface for weekplan
//!
//! This module defines the CLI structure using clap derive macros.
//! Each command group is implemented in its own submodule.

use std::path::PathBuf;

use chrono::Local;
use clap::{Parser, Subcommand};

use crate::block::{BlockKind, Entry};
use crate::config::Config;
use crate::error::{Error, Result};
use crate::output::OutputOptions;
use crate::storage::PlannerStore;
use crate::task::Task;
use crate::week;

mod block;
mod serve;
mod task;
mod week_cmd;

/// weekplan - a weekly task planner
///
/// Tasks are grouped by week. Each task carries rich-text notes, inline
/// comments, and an ordered list of blocks: text, checklist items,
/// timelines, and process decks.
#[derive(Parser, Debug)]
#[command(name = "weekplan")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Directory holding the planner file
    #[arg(long, global = true, env = "WEEKPLAN_DATA_DIR")]
    pub data_dir: Option<PathBuf>,

    /// Path to weekplan.toml
    #[arg(long, global = true, env = "WEEKPLAN_CONFIG")]
    pub config: Option<PathBuf>,

    /// Any date (YYYY-MM-DD) in the week to work on; defaults to this week
    #[arg(long, global = true)]
    pub week: Option<String>,

    /// Output in JSON format
    #[arg(long, global = true)]
    pub json: bool,

    /// Suppress non-essential output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    #[command(subcommand)]
    pub command: Commands,
}

/// Available subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Week overview
    #[command(subcommand)]
    Week(WeekCommands),

    /// Task management
    #[command(subcommand)]
    Task(TaskCommands),

    /// Blocks inside a task
    #[command(subcommand)]
    Block(BlockCommands),

    /// Steps of a timeline block
    #[command(subcommand)]
    Step(StepCommands),

    /// Cards of a process-deck block
    #[command(subcommand)]
    Card(CardCommands),

    /// Subtasks nested under a step or card
    #[command(subcommand)]
    Sub(SubCommands),

    /// Run the HTTP server
    Serve {
        /// Address to bind (overrides server.host)
        #[arg(long)]
        host: Option<String>,

        /// Port to bind (overrides server.port)
        #[arg(long)]
        port: Option<u16>,
    },
}

#[derive(Subcommand, Debug)]
pub enum WeekCommands {
    /// List the tasks of a week
    Show {
        /// Weeks relative to --week (or this week), e.g. -1 for last week
        #[arg(long, default_value_t = 0, allow_hyphen_values = true)]
        offset: i64,
    },

    /// List every week that has tasks
    List,
}

#[derive(Subcommand, Debug)]
pub enum TaskCommands {
    /// Create a task
    Add {
        title: String,

        /// Rich-text notes (HTML)
        #[arg(long, default_value = "")]
        details: String,
    },

    /// Change title or notes
    Edit {
        task: String,

        #[arg(long)]
        title: Option<String>,

        #[arg(long)]
        details: Option<String>,
    },

    /// Show a task with its blocks and comments
    Show { task: String },

    /// Toggle task completion
    Done { task: String },

    /// Delete a task
    Rm { task: String },

    /// Toggle any checkable item in the task (subtask block, step, nested subtask)
    ToggleItem { task: String, item: String },

    /// Remove any item in the task (block, step, card, nested subtask)
    RmItem { task: String, item: String },

    /// Inline comments on the notes
    #[command(subcommand)]
    Comment(CommentCommands),
}

#[derive(Subcommand, Debug)]
pub enum CommentCommands {
    Add {
        task: String,
        text: String,

        /// The commented passage of the notes
        #[arg(long, default_value = "")]
        selected: String,
    },

    Edit {
        task: String,
        comment: String,
        text: String,
    },

    Rm { task: String, comment: String },
}

#[derive(Subcommand, Debug)]
pub enum BlockCommands {
    /// Add an empty block (text, subtask, timeline, process-deck)
    Add {
        task: String,
        kind: BlockKind,

        /// Insert after this 0-based position instead of appending
        #[arg(long)]
        after: Option<usize>,
    },

    /// Change a block's content or completion
    Update {
        task: String,
        block: String,

        #[arg(long)]
        content: Option<String>,

        #[arg(long)]
        completed: Option<bool>,
    },

    /// Change a block's type in place
    Convert {
        task: String,
        block: String,
        kind: BlockKind,
    },

    Rm { task: String, block: String },

    /// Move the block at position FROM to position TO
    Move { task: String, from: usize, to: usize },
}

#[derive(Subcommand, Debug)]
pub enum StepCommands {
    Add {
        task: String,
        block: String,
        title: String,
    },

    Update {
        task: String,
        block: String,
        step: String,

        #[arg(long)]
        title: Option<String>,

        #[arg(long)]
        description: Option<String>,

        #[arg(long)]
        completed: Option<bool>,
    },

    Rm {
        task: String,
        block: String,
        step: String,
    },

    Move {
        task: String,
        block: String,
        from: usize,
        to: usize,
    },
}

#[derive(Subcommand, Debug)]
pub enum CardCommands {
    Add {
        task: String,
        block: String,
        title: String,
    },

    Update {
        task: String,
        block: String,
        card: String,

        #[arg(long)]
        title: Option<String>,

        #[arg(long)]
        description: Option<String>,
    },

    Rm {
        task: String,
        block: String,
        card: String,
    },

    Move {
        task: String,
        block: String,
        from: usize,
        to: usize,
    },
}

#[derive(Subcommand, Debug)]
pub enum SubCommands {
    Add {
        task: String,
        block: String,
        /// Step or card id
        parent: String,
        text: String,
    },

    Update {
        task: String,
        block: String,
        parent: String,
        sub: String,

        #[arg(long)]
        text: Option<String>,

        #[arg(long)]
        completed: Option<bool>,
    },

    Rm {
        task: String,
        block: String,
        parent: String,
        sub: String,
    },

    Move {
        task: String,
        block: String,
        parent: String,
        from: usize,
        to: usize,
    },
}

/// Resolved settings shared by every command
pub struct Context {
    pub config: Config,
    pub week: String,
    pub output: OutputOptions,
}

impl Context {
    fn new(cli: &Cli) -> Result<Self> {
        let config = Config::resolve(cli.config.as_deref(), cli.data_dir.as_deref())?;
        let week = match &cli.week {
            Some(raw) => week::parse_week(raw)?,
            None => week::week_key(Local::now().date_naive()),
        };
        Ok(Self {
            config,
            week,
            output: OutputOptions {
                json: cli.json,
                quiet: cli.quiet,
            },
        })
    }

    pub fn open_store(&self) -> Result<PlannerStore> {
        PlannerStore::open(self.config.storage())
    }

    /// Run `f` on a task of the current week, persist, and return the
    /// updated task with `f`'s result. A failed save is an error here even
    /// though the store keeps its in-memory state.
    pub fn mutate_task<R>(&self, task_ref: &str, f: impl FnOnce(&mut Task) -> Result<R>) -> Result<(Task, R)> {
        let mut store = self.open_store()?;
        let id = store.resolve_task_id(&self.week, task_ref)?;
        let mut outcome = None;
        store.update_task(&self.week, &id, |task| {
            outcome = Some(f(task).map(|result| (task.clone(), result)));
        });
        if let Some(err) = store.take_save_error() {
            return Err(err);
        }
        outcome.unwrap_or_else(|| {
            Err(Error::TaskNotFound {
                week: self.week.clone(),
                id: id.clone(),
            })
        })
    }
}

/// Short form of an id for human output
pub(crate) fn short_id(id: &str) -> &str {
    id.get(..8).unwrap_or(id)
}

/// Expand a unique id prefix among `items`. Anything else is returned as
/// given, so a miss falls through to the model as a no-op.
pub(crate) fn resolve_entry<T: Entry>(items: &[T], prefix: &str) -> Result<String> {
    resolve_among(items.iter().map(Entry::entry_id), prefix)
}

pub(crate) fn resolve_among<'a>(ids: impl Iterator<Item = &'a str>, prefix: &str) -> Result<String> {
    let mut matches = Vec::new();
    for id in ids {
        if id == prefix {
            return Ok(id.to_string());
        }
        if !prefix.is_empty() && id.starts_with(prefix) {
            matches.push(id);
        }
    }
    match matches.as_slice() {
        [id] => Ok(id.to_string()),
        [] => Ok(prefix.to_string()),
        many => Err(Error::InvalidArgument(format!(
            "id prefix '{prefix}' matches {} items",
            many.len()
        ))),
    }
}

impl Cli {
    /// Execute the CLI command
    pub fn run(self) -> Result<()> {
        let ctx = Context::new(&self)?;
        match self.command {
            Commands::Week(cmd) => match cmd {
                WeekCommands::Show { offset } => week_cmd::run_show(&ctx, week_cmd::ShowOptions { offset }),
                WeekCommands::List => week_cmd::run_list(&ctx),
            },
            Commands::Task(cmd) => match cmd {
                TaskCommands::Add { title, details } => {
                    task::run_add(&ctx, task::AddOptions { title, details })
                }
                TaskCommands::Edit { task: task_ref, title, details } => task::run_edit(
                    &ctx,
                    task::EditOptions {
                        task: task_ref,
                        title,
                        details,
                    },
                ),
                TaskCommands::Show { task: task_ref } => task::run_show(&ctx, &task_ref),
                TaskCommands::Done { task: task_ref } => task::run_done(&ctx, &task_ref),
                TaskCommands::Rm { task: task_ref } => task::run_rm(&ctx, &task_ref),
                TaskCommands::ToggleItem { task: task_ref, item } => {
                    task::run_toggle_item(&ctx, &task_ref, &item)
                }
                TaskCommands::RmItem { task: task_ref, item } => {
                    task::run_rm_item(&ctx, &task_ref, &item)
                }
                TaskCommands::Comment(cmd) => match cmd {
                    CommentCommands::Add { task: task_ref, text, selected } => {
                        task::run_comment_add(&ctx, &task_ref, &text, &selected)
                    }
                    CommentCommands::Edit { task: task_ref, comment, text } => {
                        task::run_comment_edit(&ctx, &task_ref, &comment, &text)
                    }
                    CommentCommands::Rm { task: task_ref, comment } => {
                        task::run_comment_rm(&ctx, &task_ref, &comment)
                    }
                },
            },
            Commands::Block(cmd) => block::run_block(&ctx, cmd),
            Commands::Step(cmd) => block::run_step(&ctx, cmd),
            Commands::Card(cmd) => block::run_card(&ctx, cmd),
            Commands::Sub(cmd) => block::run_sub(&ctx, cmd),
            Commands::Serve { host, port } => serve::run(ctx, serve::ServeOptions { host, port }),
        }
    }
}
