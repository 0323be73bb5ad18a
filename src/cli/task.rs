//! weekplan task command implementation
//!
//! Task references are ids or unique id prefixes within the selected week.

use serde::Serialize;

use crate::error::{Error, Result};
use crate::output::{emit_success, HumanOutput};
use crate::task::{Task, TaskEdit, TaskView};

use super::block::{render_blocks, tree_ids};
use super::{resolve_among, short_id, Context};

/// Options for `weekplan task add`
pub struct AddOptions {
    pub title: String,
    pub details: String,
}

/// Options for `weekplan task edit`
pub struct EditOptions {
    pub task: String,
    pub title: Option<String>,
    pub details: Option<String>,
}

#[derive(Serialize)]
struct TaskReport {
    week: String,
    #[serde(flatten)]
    view: TaskView,
}

#[derive(Serialize)]
struct RemovedReport {
    week: String,
    id: String,
    removed: bool,
}

#[derive(Serialize)]
struct ItemReport<'a> {
    week: &'a str,
    task: &'a str,
    id: Option<&'a str>,
    changed: bool,
}

fn task_human(header: impl Into<String>, week: &str, task: &Task) -> HumanOutput {
    let progress = task.progress();
    let mut human = HumanOutput::new(header);
    human.push_summary("id", task.id.clone());
    human.push_summary("title", task.title.clone());
    human.push_summary("week", week);
    human.push_summary("completed", task.completed.to_string());
    if progress.total > 0 {
        human.push_summary("progress", format!("{}/{}", progress.done, progress.total));
    }
    human
}

fn emit_task(ctx: &Context, command: &str, header: &str, task: Task) -> Result<()> {
    let human = task_human(header, &ctx.week, &task);
    emit_success(
        ctx.output,
        command,
        &TaskReport {
            week: ctx.week.clone(),
            view: TaskView::from(task),
        },
        Some(&human),
    )
}

fn saved_or_err(store: &mut crate::storage::PlannerStore) -> Result<()> {
    match store.take_save_error() {
        Some(err) => Err(err),
        None => Ok(()),
    }
}

pub fn run_add(ctx: &Context, options: AddOptions) -> Result<()> {
    let task = Task::new(&options.title, &options.details)?;
    let mut store = ctx.open_store()?;
    store.save_task(&ctx.week, task.clone());
    saved_or_err(&mut store)?;

    let mut human = task_human("Task added", &ctx.week, &task);
    human.push_next_step(format!(
        "weekplan block add {} subtask --week {}",
        short_id(&task.id),
        ctx.week
    ));
    emit_success(
        ctx.output,
        "task add",
        &TaskReport {
            week: ctx.week.clone(),
            view: TaskView::from(task),
        },
        Some(&human),
    )
}

pub fn run_edit(ctx: &Context, options: EditOptions) -> Result<()> {
    if options.title.is_none() && options.details.is_none() {
        return Err(Error::InvalidArgument(
            "nothing to edit: pass --title and/or --details".to_string(),
        ));
    }
    let edit = TaskEdit {
        title: options.title,
        details: options.details,
    };
    let (task, ()) = ctx.mutate_task(&options.task, |task| task.apply_edit(&edit))?;
    emit_task(ctx, "task edit", "Task updated", task)
}

pub fn run_show(ctx: &Context, task_ref: &str) -> Result<()> {
    let store = ctx.open_store()?;
    let id = store.resolve_task_id(&ctx.week, task_ref)?;
    let task = store
        .task(&ctx.week, &id)
        .cloned()
        .ok_or_else(|| Error::TaskNotFound {
            week: ctx.week.clone(),
            id: id.clone(),
        })?;

    let mut human = task_human(task.title.clone(), &ctx.week, &task);
    let notes = task.details_plain_text();
    if !notes.is_empty() {
        human.push_detail(format!("notes: {notes}"));
    }
    for line in render_blocks(&task.blocks) {
        human.push_detail(line);
    }
    for comment in &task.comments {
        let mut line = format!("comment {}: {}", short_id(&comment.id), comment.text);
        if !comment.selected_text.is_empty() {
            line.push_str(&format!(" (on \"{}\")", comment.selected_text));
        }
        human.push_detail(line);
    }

    emit_success(
        ctx.output,
        "task show",
        &TaskReport {
            week: ctx.week.clone(),
            view: TaskView::from(task),
        },
        Some(&human),
    )
}

pub fn run_done(ctx: &Context, task_ref: &str) -> Result<()> {
    let (task, ()) = ctx.mutate_task(task_ref, |task| {
        task.completed = !task.completed;
        Ok(())
    })?;
    let header = if task.completed {
        "Task completed"
    } else {
        "Task reopened"
    };
    emit_task(ctx, "task done", header, task)
}

pub fn run_rm(ctx: &Context, task_ref: &str) -> Result<()> {
    let mut store = ctx.open_store()?;
    let id = store.resolve_task_id(&ctx.week, task_ref)?;
    let removed = store.delete_task(&ctx.week, &id);
    saved_or_err(&mut store)?;

    let mut human = HumanOutput::new("Task removed");
    human.push_summary("id", id.clone());
    human.push_summary("week", ctx.week.clone());
    emit_success(
        ctx.output,
        "task rm",
        &RemovedReport {
            week: ctx.week.clone(),
            id,
            removed,
        },
        Some(&human),
    )
}

fn emit_item(
    ctx: &Context,
    command: &str,
    header: &str,
    task: &Task,
    id: &str,
    changed: bool,
) -> Result<()> {
    let mut human = if changed {
        HumanOutput::new(header)
    } else {
        let mut human = HumanOutput::new("Nothing changed");
        human.push_warning(format!("no matching item '{id}' in task"));
        human
    };
    human.push_summary("task", format!("{} {}", short_id(&task.id), task.title));
    let progress = task.progress();
    human.push_summary("progress", format!("{}/{}", progress.done, progress.total));
    for line in render_blocks(&task.blocks) {
        human.push_detail(line);
    }
    emit_success(
        ctx.output,
        command,
        &ItemReport {
            week: &ctx.week,
            task: &task.id,
            id: Some(id),
            changed,
        },
        Some(&human),
    )
}

pub fn run_toggle_item(ctx: &Context, task_ref: &str, item_ref: &str) -> Result<()> {
    let (task, (id, changed)) = ctx.mutate_task(task_ref, |task| {
        let id = resolve_among(tree_ids(&task.blocks).into_iter(), item_ref)?;
        let changed = task.toggle_item(&id);
        Ok((id, changed))
    })?;
    emit_item(ctx, "task toggle-item", "Item toggled", &task, &id, changed)
}

pub fn run_rm_item(ctx: &Context, task_ref: &str, item_ref: &str) -> Result<()> {
    let (task, (id, changed)) = ctx.mutate_task(task_ref, |task| {
        let id = resolve_among(tree_ids(&task.blocks).into_iter(), item_ref)?;
        let changed = task.remove_item(&id);
        Ok((id, changed))
    })?;
    emit_item(ctx, "task rm-item", "Item removed", &task, &id, changed)
}

#[derive(Serialize)]
struct CommentReport<'a> {
    task: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    comment: Option<&'a str>,
    changed: bool,
    details: &'a str,
}

fn emit_comment(
    ctx: &Context,
    command: &str,
    header: &str,
    miss: &str,
    task: &Task,
    comment: Option<&str>,
    changed: bool,
) -> Result<()> {
    let mut human = if changed {
        HumanOutput::new(header)
    } else {
        let mut human = HumanOutput::new("Nothing changed");
        human.push_warning(miss);
        human
    };
    if let Some(comment) = comment {
        human.push_summary("comment", comment);
    }
    human.push_summary("task", format!("{} {}", short_id(&task.id), task.title));
    human.push_summary("comments", task.comments.len().to_string());
    emit_success(
        ctx.output,
        command,
        &CommentReport {
            task: &task.id,
            comment,
            changed,
            details: &task.details,
        },
        Some(&human),
    )
}

pub fn run_comment_add(ctx: &Context, task_ref: &str, text: &str, selected: &str) -> Result<()> {
    let (task, id) = ctx.mutate_task(task_ref, |task| Ok(task.add_comment(text, selected)))?;
    emit_comment(
        ctx,
        "task comment add",
        "Comment added",
        "comment text is blank",
        &task,
        id.as_deref(),
        id.is_some(),
    )
}

pub fn run_comment_edit(ctx: &Context, task_ref: &str, comment_ref: &str, text: &str) -> Result<()> {
    let (task, (id, changed)) = ctx.mutate_task(task_ref, |task| {
        let id = resolve_among(task.comments.iter().map(|c| c.id.as_str()), comment_ref)?;
        let changed = task.edit_comment(&id, text);
        Ok((id, changed))
    })?;
    emit_comment(
        ctx,
        "task comment edit",
        "Comment updated",
        &format!("no comment '{comment_ref}'"),
        &task,
        Some(&id),
        changed,
    )
}

pub fn run_comment_rm(ctx: &Context, task_ref: &str, comment_ref: &str) -> Result<()> {
    let (task, (id, changed)) = ctx.mutate_task(task_ref, |task| {
        let id = resolve_among(task.comments.iter().map(|c| c.id.as_str()), comment_ref)?;
        let changed = task.remove_comment(&id);
        Ok((id, changed))
    })?;
    emit_comment(
        ctx,
        "task comment rm",
        "Comment removed",
        &format!("no comment '{comment_ref}'"),
        &task,
        Some(&id),
        changed,
    )
}
