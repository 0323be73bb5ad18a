//! Migration from older stored shapes and flattening back to them.
//!
//! Stored tasks have gone through three content layouts:
//!
//! 1. `subtasks`: a flat list of `{id, text, completed}` (oldest)
//! 2. `sections`: typed lists (`simple-list`, `timeline`, `process-deck`)
//! 3. `blocks`: the current block tree
//!
//! On load the richest layout present wins. On save the block tree is
//! written together with a flattened `subtasks` list so that readers which
//! only understand layout 1 (progress indicators, older builds) keep
//! working. Flattening loses card-level state; a card is always reported
//! as not completed.
//!
//! Entries that do not parse are set aside as raw JSON and written back
//! on save, so a newer or damaged entry is never lost by a round trip.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::block::{null_as_default, Block, Card, Step, Subtask};

/// The content-bearing fields of a stored task record, exactly as found on
/// disk. Entries are kept as raw JSON so that one malformed entry does not
/// make the whole record unreadable.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StoredContent {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub blocks: Option<Vec<Value>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sections: Option<Vec<Value>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subtasks: Option<Vec<Value>>,
}

/// Which layout `load_blocks` read from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceShape {
    Blocks,
    Sections,
    Subtasks,
    Empty,
}

/// Stored entries that failed to parse, by the list they came from.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Unreadable {
    pub blocks: Vec<Value>,
    pub sections: Vec<Value>,
    pub subtasks: Vec<Value>,
}

impl Unreadable {
    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty() && self.sections.is_empty() && self.subtasks.is_empty()
    }
}

impl StoredContent {
    pub fn shape(&self) -> SourceShape {
        if self.blocks.is_some() {
            SourceShape::Blocks
        } else if self.sections.is_some() {
            SourceShape::Sections
        } else if self.subtasks.is_some() {
            SourceShape::Subtasks
        } else {
            SourceShape::Empty
        }
    }

    /// Content for a freshly saved block tree: the blocks themselves plus
    /// the derived flat list, each followed by whatever could not be read
    /// from that list on load. `sections` is only written again when one
    /// of them was unreadable.
    pub fn from_blocks(blocks: &[Block], unreadable: &Unreadable) -> serde_json::Result<Self> {
        let mut values = blocks
            .iter()
            .map(serde_json::to_value)
            .collect::<serde_json::Result<Vec<_>>>()?;
        values.extend(unreadable.blocks.iter().cloned());
        let mut subtasks = flatten(blocks)
            .iter()
            .map(serde_json::to_value)
            .collect::<serde_json::Result<Vec<_>>>()?;
        subtasks.extend(unreadable.subtasks.iter().cloned());
        Ok(Self {
            blocks: Some(values),
            sections: (!unreadable.sections.is_empty()).then(|| unreadable.sections.clone()),
            subtasks: Some(subtasks),
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SectionKind {
    SimpleList,
    Timeline,
    ProcessDeck,
}

/// One item of a legacy section. Which fields matter depends on the
/// section's kind.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct SectionItem {
    pub id: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub text: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub completed: bool,
    #[serde(default, deserialize_with = "null_as_default")]
    pub description: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub subtasks: Vec<Subtask>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Section {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: SectionKind,
    #[serde(default, deserialize_with = "null_as_default")]
    pub title: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub items: Vec<SectionItem>,
}

/// Split `values` into entries that parse and the raw ones that do not.
fn parse_entries<T: serde::de::DeserializeOwned>(values: &[Value], what: &str) -> (Vec<T>, Vec<Value>) {
    let mut parsed = Vec::new();
    let mut rest = Vec::new();
    for (index, value) in values.iter().enumerate() {
        match T::deserialize(value) {
            Ok(entry) => parsed.push(entry),
            Err(err) => {
                tracing::warn!(index, error = %err, "keeping unreadable stored {what} as is");
                rest.push(value.clone());
            }
        }
    }
    (parsed, rest)
}

/// Build the block tree for a stored record, preferring blocks, then
/// sections, then the flat subtask list. Entries of the chosen list that
/// do not parse are returned alongside.
pub fn load_blocks(content: &StoredContent) -> (Vec<Block>, Unreadable) {
    let mut unreadable = Unreadable::default();
    let blocks = match content.shape() {
        SourceShape::Blocks => {
            let (blocks, rest) = parse_entries(content.blocks.as_deref().unwrap_or_default(), "block");
            unreadable.blocks = rest;
            blocks
        }
        SourceShape::Sections => {
            let (sections, rest): (Vec<Section>, _) =
                parse_entries(content.sections.as_deref().unwrap_or_default(), "section");
            unreadable.sections = rest;
            tracing::debug!(sections = sections.len(), "migrating sections to blocks");
            migrate_sections(&sections)
        }
        SourceShape::Subtasks => {
            let (subtasks, rest): (Vec<Subtask>, _) =
                parse_entries(content.subtasks.as_deref().unwrap_or_default(), "subtask");
            unreadable.subtasks = rest;
            tracing::debug!(subtasks = subtasks.len(), "migrating flat subtasks to blocks");
            migrate_subtasks(&subtasks)
        }
        SourceShape::Empty => Vec::new(),
    };
    (blocks, unreadable)
}

/// Oldest layout: every flat item becomes one `subtask` block, id kept.
pub fn migrate_subtasks(subtasks: &[Subtask]) -> Vec<Block> {
    subtasks
        .iter()
        .map(|subtask| Block::subtask(subtask.id.clone(), subtask.text.clone(), subtask.completed))
        .collect()
}

/// Intermediate layout. Timeline and process-deck sections become one block
/// each under the section's id. A simple list has no container block, so
/// each of its items becomes a `subtask` block under the item's id.
pub fn migrate_sections(sections: &[Section]) -> Vec<Block> {
    let mut blocks = Vec::new();
    for section in sections {
        match section.kind {
            SectionKind::SimpleList => {
                blocks.extend(
                    section
                        .items
                        .iter()
                        .map(|item| Block::subtask(item.id.clone(), item.text.clone(), item.completed)),
                );
            }
            SectionKind::Timeline => blocks.push(Block::timeline(
                section.id.clone(),
                section
                    .items
                    .iter()
                    .map(|item| Step {
                        id: item.id.clone(),
                        title: item.text.clone(),
                        description: item.description.clone(),
                        completed: item.completed,
                        subtasks: item.subtasks.clone(),
                    })
                    .collect(),
            )),
            SectionKind::ProcessDeck => blocks.push(Block::process_deck(
                section.id.clone(),
                section
                    .items
                    .iter()
                    .map(|item| Card {
                        id: item.id.clone(),
                        title: item.text.clone(),
                        description: item.description.clone(),
                        subtasks: item.subtasks.clone(),
                    })
                    .collect(),
            )),
        }
    }
    blocks
}

/// Depth-first, left-to-right flat view of a block tree.
pub fn flatten(blocks: &[Block]) -> Vec<Subtask> {
    let mut flat = Vec::new();
    for block in blocks {
        match block {
            Block::Text {
                id, content, completed, ..
            }
            | Block::Subtask {
                id, content, completed, ..
            } => flat.push(flat_item(id, content, *completed)),
            Block::Timeline { .. } => {
                for step in block.steps().unwrap_or_default() {
                    flat.push(flat_item(&step.id, &step.title, step.completed));
                    flat.extend(step.subtasks.iter().cloned());
                }
            }
            Block::ProcessDeck { .. } => {
                for card in block.cards().unwrap_or_default() {
                    flat.push(flat_item(&card.id, &card.title, false));
                    flat.extend(card.subtasks.iter().cloned());
                }
            }
        }
    }
    flat
}

fn flat_item(id: &str, text: &str, completed: bool) -> Subtask {
    Subtask {
        id: id.to_string(),
        text: text.to_string(),
        completed,
    }
}
