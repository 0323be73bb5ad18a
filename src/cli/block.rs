//! weekplan block, step, card and sub command implementations
//!
//! Ids may be given as unique prefixes. An id that matches nothing is a
//! no-op, reported as a warning rather than an error.

use serde::Serialize;

use crate::block::{
    self, find_mut, move_entry, remove_entry, update_entry, Block, BlockPatch, CardPatch,
    Position, StepPatch, Subtask,
};
use crate::error::Result;
use crate::output::{emit_success, HumanOutput};
use crate::task::Task;

use super::{
    resolve_among, resolve_entry, short_id, BlockCommands, CardCommands, Context, StepCommands,
    SubCommands,
};

#[derive(Serialize)]
struct ChangeReport<'a> {
    task: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    id: Option<&'a str>,
    changed: bool,
    blocks: &'a [Block],
}

/// What a command did, for output
struct Change {
    command: &'static str,
    header: &'static str,
    /// Explains a no-op
    miss: String,
}

fn emit_change(ctx: &Context, change: Change, task: &Task, id: Option<&str>, changed: bool) -> Result<()> {
    let mut human = if changed {
        let mut human = HumanOutput::new(change.header);
        if let Some(id) = id {
            human.push_summary("id", id);
        }
        human
    } else {
        let mut human = HumanOutput::new("Nothing changed");
        human.push_warning(change.miss);
        human
    };
    human.push_summary("task", format!("{} {}", short_id(&task.id), task.title));
    for line in render_blocks(&task.blocks) {
        human.push_detail(line);
    }

    emit_success(
        ctx.output,
        change.command,
        &ChangeReport {
            task: &task.id,
            id,
            changed,
            blocks: &task.blocks,
        },
        Some(&human),
    )
}

/// One line per block, step, card and nested subtask, with 0-based
/// block positions.
pub(super) fn render_blocks(blocks: &[Block]) -> Vec<String> {
    let mut lines = Vec::new();
    for (index, block) in blocks.iter().enumerate() {
        let id = short_id(block.id());
        match block {
            Block::Text { content, .. } => lines.push(format!("{index}. text {id}: {content}")),
            Block::Subtask {
                content, completed, ..
            } => lines.push(format!("{index}. {} subtask {id}: {content}", check(*completed))),
            Block::Timeline { .. } => {
                lines.push(format!("{index}. timeline {id}"));
                for step in block.steps().unwrap_or_default() {
                    let mut line = format!(
                        "   {} step {}: {}",
                        check(step.completed),
                        short_id(&step.id),
                        step.title
                    );
                    if !step.description.is_empty() {
                        line.push_str(&format!(" ({})", step.description));
                    }
                    lines.push(line);
                    push_nested(&mut lines, &step.subtasks);
                }
            }
            Block::ProcessDeck { .. } => {
                lines.push(format!("{index}. process-deck {id}"));
                for card in block.cards().unwrap_or_default() {
                    let mut line = format!("   card {}: {}", short_id(&card.id), card.title);
                    if !card.description.is_empty() {
                        line.push_str(&format!(" ({})", card.description));
                    }
                    lines.push(line);
                    push_nested(&mut lines, &card.subtasks);
                }
            }
        }
    }
    lines
}

fn push_nested(lines: &mut Vec<String>, subtasks: &[Subtask]) {
    for sub in subtasks {
        lines.push(format!(
            "      {} {}: {}",
            check(sub.completed),
            short_id(&sub.id),
            sub.text
        ));
    }
}

fn check(completed: bool) -> &'static str {
    if completed {
        "[x]"
    } else {
        "[ ]"
    }
}

/// Every id in the tree: blocks, steps, cards and nested subtasks.
pub(super) fn tree_ids(blocks: &[Block]) -> Vec<&str> {
    let mut ids = Vec::new();
    for block in blocks {
        ids.push(block.id());
        ids.extend(child_ids(block));
        if let Some(steps) = block.steps() {
            for step in steps {
                ids.extend(step.subtasks.iter().map(|sub| sub.id.as_str()));
            }
        }
        if let Some(cards) = block.cards() {
            for card in cards {
                ids.extend(card.subtasks.iter().map(|sub| sub.id.as_str()));
            }
        }
    }
    ids
}

/// Step ids of a timeline or card ids of a process deck.
fn child_ids(block: &Block) -> Vec<&str> {
    match (block.steps(), block.cards()) {
        (Some(steps), _) => steps.iter().map(|step| step.id.as_str()).collect(),
        (_, Some(cards)) => cards.iter().map(|card| card.id.as_str()).collect(),
        _ => Vec::new(),
    }
}

fn block_mut<'a>(task: &'a mut Task, block_ref: &str) -> Result<Option<&'a mut Block>> {
    let id = resolve_entry(&task.blocks, block_ref)?;
    Ok(find_mut(&mut task.blocks, &id))
}

pub fn run_block(ctx: &Context, cmd: BlockCommands) -> Result<()> {
    match cmd {
        BlockCommands::Add { task, kind, after } => {
            let position = after.map(Position::After).unwrap_or_default();
            let (task, id) = ctx.mutate_task(&task, |task| {
                Ok(block::add_block(&mut task.blocks, kind, position))
            })?;
            emit_change(
                ctx,
                Change {
                    command: "block add",
                    header: "Block added",
                    miss: String::new(),
                },
                &task,
                Some(&id),
                true,
            )
        }
        BlockCommands::Update {
            task,
            block: block_ref,
            content,
            completed,
        } => {
            let patch = BlockPatch {
                content,
                completed,
                ..BlockPatch::default()
            };
            let (task, (id, changed)) = ctx.mutate_task(&task, |task| {
                let id = resolve_entry(&task.blocks, &block_ref)?;
                let changed = block::update_block(&mut task.blocks, &id, &patch);
                Ok((id, changed))
            })?;
            emit_change(
                ctx,
                Change {
                    command: "block update",
                    header: "Block updated",
                    miss: format!("no block '{block_ref}'"),
                },
                &task,
                Some(&id),
                changed,
            )
        }
        BlockCommands::Convert {
            task,
            block: block_ref,
            kind,
        } => {
            let (task, (id, changed)) = ctx.mutate_task(&task, |task| {
                let id = resolve_entry(&task.blocks, &block_ref)?;
                let changed = block::convert_block(&mut task.blocks, &id, kind);
                Ok((id, changed))
            })?;
            emit_change(
                ctx,
                Change {
                    command: "block convert",
                    header: "Block converted",
                    miss: format!("no block '{block_ref}'"),
                },
                &task,
                Some(&id),
                changed,
            )
        }
        BlockCommands::Rm {
            task,
            block: block_ref,
        } => {
            let (task, (id, changed)) = ctx.mutate_task(&task, |task| {
                let id = resolve_entry(&task.blocks, &block_ref)?;
                let changed = block::remove_block(&mut task.blocks, &id);
                Ok((id, changed))
            })?;
            emit_change(
                ctx,
                Change {
                    command: "block rm",
                    header: "Block removed",
                    miss: format!("no block '{block_ref}'"),
                },
                &task,
                Some(&id),
                changed,
            )
        }
        BlockCommands::Move { task, from, to } => {
            let (task, changed) =
                ctx.mutate_task(&task, |task| Ok(block::reorder(&mut task.blocks, from, to)))?;
            emit_change(
                ctx,
                Change {
                    command: "block move",
                    header: "Block moved",
                    miss: format!("no block at position {from}"),
                },
                &task,
                None,
                changed,
            )
        }
    }
}

pub fn run_step(ctx: &Context, cmd: StepCommands) -> Result<()> {
    match cmd {
        StepCommands::Add {
            task,
            block: block_ref,
            title,
        } => {
            let (task, id) = ctx.mutate_task(&task, |task| {
                Ok(block_mut(task, &block_ref)?.and_then(|block| block.add_step(title)))
            })?;
            emit_change(
                ctx,
                Change {
                    command: "step add",
                    header: "Step added",
                    miss: format!("no timeline block '{block_ref}'"),
                },
                &task,
                id.as_deref(),
                id.is_some(),
            )
        }
        StepCommands::Update {
            task,
            block: block_ref,
            step,
            title,
            description,
            completed,
        } => {
            let patch = StepPatch {
                title,
                description,
                completed,
            };
            let (task, (id, changed)) = ctx.mutate_task(&task, |task| {
                let Some(block) = block_mut(task, &block_ref)? else {
                    return Ok((step.clone(), false));
                };
                let id = resolve_among(child_ids(block).into_iter(), &step)?;
                let changed = block.update_step(&id, &patch);
                Ok((id, changed))
            })?;
            emit_change(
                ctx,
                Change {
                    command: "step update",
                    header: "Step updated",
                    miss: format!("no step '{step}' in block '{block_ref}'"),
                },
                &task,
                Some(&id),
                changed,
            )
        }
        StepCommands::Rm {
            task,
            block: block_ref,
            step,
        } => {
            let (task, (id, changed)) = ctx.mutate_task(&task, |task| {
                let Some(block) = block_mut(task, &block_ref)? else {
                    return Ok((step.clone(), false));
                };
                let id = resolve_among(child_ids(block).into_iter(), &step)?;
                let changed = block.remove_step(&id);
                Ok((id, changed))
            })?;
            emit_change(
                ctx,
                Change {
                    command: "step rm",
                    header: "Step removed",
                    miss: format!("no step '{step}' in block '{block_ref}'"),
                },
                &task,
                Some(&id),
                changed,
            )
        }
        StepCommands::Move {
            task,
            block: block_ref,
            from,
            to,
        } => {
            let (task, changed) = ctx.mutate_task(&task, |task| {
                Ok(block_mut(task, &block_ref)?
                    .map(|block| block.move_step(from, to))
                    .unwrap_or(false))
            })?;
            emit_change(
                ctx,
                Change {
                    command: "step move",
                    header: "Step moved",
                    miss: format!("no step at position {from} in block '{block_ref}'"),
                },
                &task,
                None,
                changed,
            )
        }
    }
}

pub fn run_card(ctx: &Context, cmd: CardCommands) -> Result<()> {
    match cmd {
        CardCommands::Add {
            task,
            block: block_ref,
            title,
        } => {
            let (task, id) = ctx.mutate_task(&task, |task| {
                Ok(block_mut(task, &block_ref)?.and_then(|block| block.add_card(title)))
            })?;
            emit_change(
                ctx,
                Change {
                    command: "card add",
                    header: "Card added",
                    miss: format!("no process-deck block '{block_ref}'"),
                },
                &task,
                id.as_deref(),
                id.is_some(),
            )
        }
        CardCommands::Update {
            task,
            block: block_ref,
            card,
            title,
            description,
        } => {
            let patch = CardPatch { title, description };
            let (task, (id, changed)) = ctx.mutate_task(&task, |task| {
                let Some(block) = block_mut(task, &block_ref)? else {
                    return Ok((card.clone(), false));
                };
                let id = resolve_among(child_ids(block).into_iter(), &card)?;
                let changed = block.update_card(&id, &patch);
                Ok((id, changed))
            })?;
            emit_change(
                ctx,
                Change {
                    command: "card update",
                    header: "Card updated",
                    miss: format!("no card '{card}' in block '{block_ref}'"),
                },
                &task,
                Some(&id),
                changed,
            )
        }
        CardCommands::Rm {
            task,
            block: block_ref,
            card,
        } => {
            let (task, (id, changed)) = ctx.mutate_task(&task, |task| {
                let Some(block) = block_mut(task, &block_ref)? else {
                    return Ok((card.clone(), false));
                };
                let id = resolve_among(child_ids(block).into_iter(), &card)?;
                let changed = block.remove_card(&id);
                Ok((id, changed))
            })?;
            emit_change(
                ctx,
                Change {
                    command: "card rm",
                    header: "Card removed",
                    miss: format!("no card '{card}' in block '{block_ref}'"),
                },
                &task,
                Some(&id),
                changed,
            )
        }
        CardCommands::Move {
            task,
            block: block_ref,
            from,
            to,
        } => {
            let (task, changed) = ctx.mutate_task(&task, |task| {
                Ok(block_mut(task, &block_ref)?
                    .map(|block| block.move_card(from, to))
                    .unwrap_or(false))
            })?;
            emit_change(
                ctx,
                Change {
                    command: "card move",
                    header: "Card moved",
                    miss: format!("no card at position {from} in block '{block_ref}'"),
                },
                &task,
                None,
                changed,
            )
        }
    }
}

/// Nested subtask list of `parent_ref` (a step or card) inside `block_ref`.
fn nested_mut<'a>(
    task: &'a mut Task,
    block_ref: &str,
    parent_ref: &str,
) -> Result<Option<&'a mut Vec<Subtask>>> {
    let Some(block) = block_mut(task, block_ref)? else {
        return Ok(None);
    };
    let parent = resolve_among(child_ids(block).into_iter(), parent_ref)?;
    Ok(block.nested_mut(&parent))
}

pub fn run_sub(ctx: &Context, cmd: SubCommands) -> Result<()> {
    match cmd {
        SubCommands::Add {
            task,
            block: block_ref,
            parent,
            text,
        } => {
            let (task, id) = ctx.mutate_task(&task, |task| {
                Ok(nested_mut(task, &block_ref, &parent)?.map(|subtasks| {
                    let sub = Subtask::new(text);
                    let id = sub.id.clone();
                    subtasks.push(sub);
                    id
                }))
            })?;
            emit_change(
                ctx,
                Change {
                    command: "sub add",
                    header: "Subtask added",
                    miss: format!("no step or card '{parent}' in block '{block_ref}'"),
                },
                &task,
                id.as_deref(),
                id.is_some(),
            )
        }
        SubCommands::Update {
            task,
            block: block_ref,
            parent,
            sub,
            text,
            completed,
        } => {
            let (task, (id, changed)) = ctx.mutate_task(&task, |task| {
                let Some(subtasks) = nested_mut(task, &block_ref, &parent)? else {
                    return Ok((sub.clone(), false));
                };
                let id = resolve_entry(subtasks.as_slice(), &sub)?;
                let changed = update_entry(subtasks, &id, |item| {
                    if let Some(text) = text {
                        item.text = text;
                    }
                    if let Some(completed) = completed {
                        item.completed = completed;
                    }
                });
                Ok((id, changed))
            })?;
            emit_change(
                ctx,
                Change {
                    command: "sub update",
                    header: "Subtask updated",
                    miss: format!("no subtask '{sub}' under '{parent}'"),
                },
                &task,
                Some(&id),
                changed,
            )
        }
        SubCommands::Rm {
            task,
            block: block_ref,
            parent,
            sub,
        } => {
            let (task, (id, changed)) = ctx.mutate_task(&task, |task| {
                let Some(subtasks) = nested_mut(task, &block_ref, &parent)? else {
                    return Ok((sub.clone(), false));
                };
                let id = resolve_entry(subtasks.as_slice(), &sub)?;
                let changed = remove_entry(subtasks, &id);
                Ok((id, changed))
            })?;
            emit_change(
                ctx,
                Change {
                    command: "sub rm",
                    header: "Subtask removed",
                    miss: format!("no subtask '{sub}' under '{parent}'"),
                },
                &task,
                Some(&id),
                changed,
            )
        }
        SubCommands::Move {
            task,
            block: block_ref,
            parent,
            from,
            to,
        } => {
            let (task, changed) = ctx.mutate_task(&task, |task| {
                Ok(nested_mut(task, &block_ref, &parent)?
                    .map(|subtasks| move_entry(subtasks, from, to))
                    .unwrap_or(false))
            })?;
            emit_change(
                ctx,
                Change {
                    command: "sub move",
                    header: "Subtask moved",
                    miss: format!("no subtask at position {from} under '{parent}'"),
                },
                &task,
                None,
                changed,
            )
        }
    }
}
