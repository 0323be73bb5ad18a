//! weekplan week command implementation

use chrono::{Duration, Local};
use serde::Serialize;

use crate::error::Result;
use crate::output::{emit_success, HumanOutput};
use crate::task::{Progress, Task};
use crate::week::{self, WeekInfo};

use super::{short_id, Context};

/// Options for `weekplan week show`
pub struct ShowOptions {
    pub offset: i64,
}

#[derive(Serialize)]
struct TaskSummary {
    id: String,
    title: String,
    completed: bool,
    progress: Progress,
    preview: String,
}

impl From<&Task> for TaskSummary {
    fn from(task: &Task) -> Self {
        Self {
            id: task.id.clone(),
            title: task.title.clone(),
            completed: task.completed,
            progress: task.progress(),
            preview: task.details_plain_text(),
        }
    }
}

#[derive(Serialize)]
struct WeekReport {
    week: WeekInfo,
    tasks: Vec<TaskSummary>,
}

#[derive(Serialize)]
struct WeekListEntry {
    week: String,
    tasks: usize,
    completed: usize,
}

pub fn run_show(ctx: &Context, options: ShowOptions) -> Result<()> {
    let today = Local::now().date_naive();
    let anchor = week::parse_date(&ctx.week)? + Duration::weeks(options.offset);
    let info = WeekInfo::containing(anchor, today);

    let store = ctx.open_store()?;
    let tasks: Vec<TaskSummary> = store.tasks(&info.key).iter().map(TaskSummary::from).collect();

    let mut human = HumanOutput::new(format!("{} ({})", info.label(), info.key));
    if info.is_current {
        human.push_summary("range", info.range.clone());
    }
    human.push_summary("tasks", tasks.len().to_string());
    for task in &tasks {
        let mark = if task.completed { "x" } else { " " };
        let mut line = format!("[{mark}] {} {}", short_id(&task.id), task.title);
        if task.progress.total > 0 {
            line.push_str(&format!(" ({}/{})", task.progress.done, task.progress.total));
        }
        if !task.preview.is_empty() {
            line.push_str(&format!(": {}", truncate(&task.preview, 60)));
        }
        human.push_detail(line);
    }
    if tasks.is_empty() {
        human.push_next_step(format!("weekplan task add \"...\" --week {}", info.key));
    }

    emit_success(
        ctx.output,
        "week show",
        &WeekReport { week: info, tasks },
        Some(&human),
    )
}

pub fn run_list(ctx: &Context) -> Result<()> {
    let store = ctx.open_store()?;
    let entries: Vec<WeekListEntry> = store
        .weeks()
        .iter()
        .filter(|(_, tasks)| !tasks.is_empty())
        .map(|(week, tasks)| WeekListEntry {
            week: week.clone(),
            tasks: tasks.len(),
            completed: tasks.iter().filter(|task| task.completed).count(),
        })
        .collect();

    let mut human = HumanOutput::new(format!("{} week(s) with tasks", entries.len()));
    for entry in &entries {
        human.push_detail(format!(
            "{}: {}/{} done",
            entry.week, entry.completed, entry.tasks
        ));
    }

    emit_success(ctx.output, "week list", &entries, Some(&human))
}

fn truncate(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        return text.to_string();
    }
    let cut: String = text.chars().take(max_chars).collect();
    format!("{}...", cut.trim_end())
}
