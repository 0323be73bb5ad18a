//! Block content model.
//!
//! A task's sub-content is an ordered list of blocks. Each block is one of
//! four variants sharing an id: plain text, a checklist item, a timeline of
//! steps, or a process deck of cards. Steps and cards carry their own
//! ordered lists of nested subtasks.
//!
//! On disk a block is an internally tagged JSON object:
//!
//! ```text
//! {"id":"…","type":"text","content":"…"}
//! {"id":"…","type":"subtask","content":"…","completed":false}
//! {"id":"…","type":"timeline","data":{"steps":[…]}}
//! {"id":"…","type":"process-deck","data":{"cards":[…]}}
//! ```
//!
//! Every variant keeps whatever it held under another tag. A timeline
//! converted to text still carries `data.steps`, so converting it back
//! restores them; the same goes for `content` and `completed`.
//!
//! Every id-addressed mutation returns `bool`: `false` means no entity with
//! that id exists and nothing changed.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize};
use uuid::Uuid;

use crate::error::{Error, Result};

/// Generate a fresh, globally unique entity id.
pub fn new_id() -> String {
    Uuid::new_v4().to_string()
}

pub(crate) fn null_as_default<'de, D, T>(deserializer: D) -> std::result::Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

fn is_false(value: &bool) -> bool {
    !*value
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum BlockKind {
    Text,
    Subtask,
    Timeline,
    ProcessDeck,
}

impl BlockKind {
    pub const ALL: [BlockKind; 4] = [
        BlockKind::Text,
        BlockKind::Subtask,
        BlockKind::Timeline,
        BlockKind::ProcessDeck,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            BlockKind::Text => "text",
            BlockKind::Subtask => "subtask",
            BlockKind::Timeline => "timeline",
            BlockKind::ProcessDeck => "process-deck",
        }
    }
}

impl fmt::Display for BlockKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BlockKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "text" => Ok(BlockKind::Text),
            "subtask" | "todo" | "checklist" => Ok(BlockKind::Subtask),
            "timeline" => Ok(BlockKind::Timeline),
            "process-deck" | "process_deck" | "deck" => Ok(BlockKind::ProcessDeck),
            other => Err(Error::InvalidArgument(format!(
                "unknown block type '{other}' (expected text|subtask|timeline|process-deck)"
            ))),
        }
    }
}

/// Leaf checklist item nested under a step or card.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Subtask {
    pub id: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub text: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub completed: bool,
}

impl Subtask {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            id: new_id(),
            text: text.into(),
            completed: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Step {
    pub id: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub title: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub description: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub completed: bool,
    #[serde(default, deserialize_with = "null_as_default")]
    pub subtasks: Vec<Subtask>,
}

impl Step {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            id: new_id(),
            title: title.into(),
            description: String::new(),
            completed: false,
            subtasks: Vec::new(),
        }
    }
}

/// Process-deck card. Cards have no completion state of their own.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Card {
    pub id: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub title: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub description: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub subtasks: Vec<Subtask>,
}

impl Card {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            id: new_id(),
            title: title.into(),
            description: String::new(),
            subtasks: Vec::new(),
        }
    }
}

/// List payload of a block.
///
/// A timeline shows `steps` and a process deck shows `cards`. A list that
/// is present but not shown belongs to a tag the block was converted away
/// from. An absent list reads as empty.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockData {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub steps: Option<Vec<Step>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cards: Option<Vec<Card>>,
}

impl BlockData {
    pub fn timeline(steps: Vec<Step>) -> Self {
        Self {
            steps: Some(steps),
            cards: None,
        }
    }

    pub fn deck(cards: Vec<Card>) -> Self {
        Self {
            steps: None,
            cards: Some(cards),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_none() && self.cards.is_none()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum Block {
    Text {
        id: String,
        #[serde(default, deserialize_with = "null_as_default")]
        content: String,
        #[serde(default, deserialize_with = "null_as_default", skip_serializing_if = "is_false")]
        completed: bool,
        #[serde(default, deserialize_with = "null_as_default", skip_serializing_if = "BlockData::is_empty")]
        data: BlockData,
    },
    Subtask {
        id: String,
        #[serde(default, deserialize_with = "null_as_default")]
        content: String,
        #[serde(default, deserialize_with = "null_as_default")]
        completed: bool,
        #[serde(default, deserialize_with = "null_as_default", skip_serializing_if = "BlockData::is_empty")]
        data: BlockData,
    },
    Timeline {
        id: String,
        #[serde(default, deserialize_with = "null_as_default", skip_serializing_if = "String::is_empty")]
        content: String,
        #[serde(default, deserialize_with = "null_as_default", skip_serializing_if = "is_false")]
        completed: bool,
        #[serde(default, deserialize_with = "null_as_default")]
        data: BlockData,
    },
    ProcessDeck {
        id: String,
        #[serde(default, deserialize_with = "null_as_default", skip_serializing_if = "String::is_empty")]
        content: String,
        #[serde(default, deserialize_with = "null_as_default", skip_serializing_if = "is_false")]
        completed: bool,
        #[serde(default, deserialize_with = "null_as_default")]
        data: BlockData,
    },
}

/// Partial update for a block. Fields that do not apply to the block's
/// variant are ignored.
#[derive(Debug, Clone, Default)]
pub struct BlockPatch {
    pub content: Option<String>,
    pub completed: Option<bool>,
    pub steps: Option<Vec<Step>>,
    pub cards: Option<Vec<Card>>,
}

#[derive(Debug, Clone, Default)]
pub struct StepPatch {
    pub title: Option<String>,
    pub description: Option<String>,
    pub completed: Option<bool>,
}

#[derive(Debug, Clone, Default)]
pub struct CardPatch {
    pub title: Option<String>,
    pub description: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct SubtaskPatch {
    pub text: Option<String>,
    pub completed: Option<bool>,
}

/// Fields every variant carries, whether or not its tag shows them.
#[derive(Debug, Default)]
struct Parts {
    id: String,
    content: String,
    completed: bool,
    data: BlockData,
}

impl Block {
    /// A new block of `kind` with a fresh id and an empty payload.
    pub fn new(kind: BlockKind) -> Self {
        Self::from_parts(
            kind,
            Parts {
                id: new_id(),
                ..Parts::default()
            },
        )
    }

    pub fn text(id: impl Into<String>, content: impl Into<String>) -> Self {
        Self::from_parts(
            BlockKind::Text,
            Parts {
                id: id.into(),
                content: content.into(),
                ..Parts::default()
            },
        )
    }

    pub fn subtask(id: impl Into<String>, content: impl Into<String>, completed: bool) -> Self {
        Self::from_parts(
            BlockKind::Subtask,
            Parts {
                id: id.into(),
                content: content.into(),
                completed,
                data: BlockData::default(),
            },
        )
    }

    pub fn timeline(id: impl Into<String>, steps: Vec<Step>) -> Self {
        Self::from_parts(
            BlockKind::Timeline,
            Parts {
                id: id.into(),
                data: BlockData::timeline(steps),
                ..Parts::default()
            },
        )
    }

    pub fn process_deck(id: impl Into<String>, cards: Vec<Card>) -> Self {
        Self::from_parts(
            BlockKind::ProcessDeck,
            Parts {
                id: id.into(),
                data: BlockData::deck(cards),
                ..Parts::default()
            },
        )
    }

    /// Build a `kind` block. A timeline or process deck without its list
    /// gets an empty one; a list that is already there is kept.
    fn from_parts(kind: BlockKind, parts: Parts) -> Self {
        let Parts {
            id,
            content,
            completed,
            mut data,
        } = parts;
        match kind {
            BlockKind::Text => Block::Text {
                id,
                content,
                completed,
                data,
            },
            BlockKind::Subtask => Block::Subtask {
                id,
                content,
                completed,
                data,
            },
            BlockKind::Timeline => {
                data.steps.get_or_insert_with(Vec::new);
                Block::Timeline {
                    id,
                    content,
                    completed,
                    data,
                }
            }
            BlockKind::ProcessDeck => {
                data.cards.get_or_insert_with(Vec::new);
                Block::ProcessDeck {
                    id,
                    content,
                    completed,
                    data,
                }
            }
        }
    }

    fn into_parts(self) -> Parts {
        match self {
            Block::Text {
                id,
                content,
                completed,
                data,
            }
            | Block::Subtask {
                id,
                content,
                completed,
                data,
            }
            | Block::Timeline {
                id,
                content,
                completed,
                data,
            }
            | Block::ProcessDeck {
                id,
                content,
                completed,
                data,
            } => Parts {
                id,
                content,
                completed,
                data,
            },
        }
    }

    pub fn id(&self) -> &str {
        match self {
            Block::Text { id, .. }
            | Block::Subtask { id, .. }
            | Block::Timeline { id, .. }
            | Block::ProcessDeck { id, .. } => id,
        }
    }

    pub fn kind(&self) -> BlockKind {
        match self {
            Block::Text { .. } => BlockKind::Text,
            Block::Subtask { .. } => BlockKind::Subtask,
            Block::Timeline { .. } => BlockKind::Timeline,
            Block::ProcessDeck { .. } => BlockKind::ProcessDeck,
        }
    }

    /// Text content for text and subtask blocks.
    pub fn content(&self) -> Option<&str> {
        match self {
            Block::Text { content, .. } | Block::Subtask { content, .. } => Some(content),
            Block::Timeline { .. } | Block::ProcessDeck { .. } => None,
        }
    }

    pub fn steps(&self) -> Option<&[Step]> {
        match self {
            Block::Timeline { data, .. } => Some(data.steps.as_deref().unwrap_or_default()),
            _ => None,
        }
    }

    pub fn steps_mut(&mut self) -> Option<&mut Vec<Step>> {
        match self {
            Block::Timeline { data, .. } => Some(data.steps.get_or_insert_with(Vec::new)),
            _ => None,
        }
    }

    pub fn cards(&self) -> Option<&[Card]> {
        match self {
            Block::ProcessDeck { data, .. } => Some(data.cards.as_deref().unwrap_or_default()),
            _ => None,
        }
    }

    pub fn cards_mut(&mut self) -> Option<&mut Vec<Card>> {
        match self {
            Block::ProcessDeck { data, .. } => Some(data.cards.get_or_insert_with(Vec::new)),
            _ => None,
        }
    }

    /// Merge the applicable fields of `patch` into this block.
    pub fn apply(&mut self, patch: &BlockPatch) {
        match self {
            Block::Text { content, .. } => {
                if let Some(value) = &patch.content {
                    *content = value.clone();
                }
            }
            Block::Subtask {
                content, completed, ..
            } => {
                if let Some(value) = &patch.content {
                    *content = value.clone();
                }
                if let Some(value) = patch.completed {
                    *completed = value;
                }
            }
            Block::Timeline { data, .. } => {
                if let Some(steps) = &patch.steps {
                    data.steps = Some(steps.clone());
                }
            }
            Block::ProcessDeck { data, .. } => {
                if let Some(cards) = &patch.cards {
                    data.cards = Some(cards.clone());
                }
            }
        }
    }

    /// Change this block's variant in place.
    ///
    /// Nothing is dropped: id, content, completion and both lists travel
    /// with the block, so converting back restores what the old tag showed.
    /// Converting to the current variant is a no-op.
    pub fn convert(&mut self, kind: BlockKind) {
        if self.kind() == kind {
            return;
        }
        let parts = std::mem::replace(self, Block::text(String::new(), String::new())).into_parts();
        *self = Self::from_parts(kind, parts);
    }

    pub fn add_step(&mut self, title: impl Into<String>) -> Option<String> {
        let steps = self.steps_mut()?;
        let step = Step::new(title);
        let id = step.id.clone();
        steps.push(step);
        Some(id)
    }

    pub fn update_step(&mut self, step_id: &str, patch: &StepPatch) -> bool {
        let Some(steps) = self.steps_mut() else {
            return false;
        };
        update_entry(steps, step_id, |step| {
            if let Some(title) = &patch.title {
                step.title = title.clone();
            }
            if let Some(description) = &patch.description {
                step.description = description.clone();
            }
            if let Some(completed) = patch.completed {
                step.completed = completed;
            }
        })
    }

    pub fn remove_step(&mut self, step_id: &str) -> bool {
        self.steps_mut()
            .is_some_and(|steps| remove_entry(steps, step_id))
    }

    pub fn move_step(&mut self, from: usize, to: usize) -> bool {
        self.steps_mut()
            .is_some_and(|steps| move_entry(steps, from, to))
    }

    pub fn add_card(&mut self, title: impl Into<String>) -> Option<String> {
        let cards = self.cards_mut()?;
        let card = Card::new(title);
        let id = card.id.clone();
        cards.push(card);
        Some(id)
    }

    pub fn update_card(&mut self, card_id: &str, patch: &CardPatch) -> bool {
        let Some(cards) = self.cards_mut() else {
            return false;
        };
        update_entry(cards, card_id, |card| {
            if let Some(title) = &patch.title {
                card.title = title.clone();
            }
            if let Some(description) = &patch.description {
                card.description = description.clone();
            }
        })
    }

    pub fn remove_card(&mut self, card_id: &str) -> bool {
        self.cards_mut()
            .is_some_and(|cards| remove_entry(cards, card_id))
    }

    pub fn move_card(&mut self, from: usize, to: usize) -> bool {
        self.cards_mut()
            .is_some_and(|cards| move_entry(cards, from, to))
    }

    /// The nested subtask list owned by the step or card `parent_id`.
    pub fn nested_mut(&mut self, parent_id: &str) -> Option<&mut Vec<Subtask>> {
        match self.kind() {
            BlockKind::Timeline => {
                find_mut(self.steps_mut()?, parent_id).map(HasSubtasks::subtasks_mut)
            }
            BlockKind::ProcessDeck => {
                find_mut(self.cards_mut()?, parent_id).map(HasSubtasks::subtasks_mut)
            }
            BlockKind::Text | BlockKind::Subtask => None,
        }
    }
}

/// Anything addressable by id inside an ordered list.
pub trait Entry {
    fn entry_id(&self) -> &str;
}

impl Entry for Block {
    fn entry_id(&self) -> &str {
        self.id()
    }
}

impl Entry for Step {
    fn entry_id(&self) -> &str {
        &self.id
    }
}

impl Entry for Card {
    fn entry_id(&self) -> &str {
        &self.id
    }
}

impl Entry for Subtask {
    fn entry_id(&self) -> &str {
        &self.id
    }
}

/// Steps and cards share the same nested-subtask contract.
pub trait HasSubtasks {
    fn subtasks_mut(&mut self) -> &mut Vec<Subtask>;

    fn add_subtask(&mut self, text: impl Into<String>) -> String {
        let subtask = Subtask::new(text);
        let id = subtask.id.clone();
        self.subtasks_mut().push(subtask);
        id
    }

    fn update_subtask(&mut self, id: &str, patch: &SubtaskPatch) -> bool {
        update_entry(self.subtasks_mut(), id, |subtask| {
            if let Some(text) = &patch.text {
                subtask.text = text.clone();
            }
            if let Some(completed) = patch.completed {
                subtask.completed = completed;
            }
        })
    }

    fn remove_subtask(&mut self, id: &str) -> bool {
        remove_entry(self.subtasks_mut(), id)
    }

    fn move_subtask(&mut self, from: usize, to: usize) -> bool {
        move_entry(self.subtasks_mut(), from, to)
    }
}

impl HasSubtasks for Step {
    fn subtasks_mut(&mut self) -> &mut Vec<Subtask> {
        &mut self.subtasks
    }
}

impl HasSubtasks for Card {
    fn subtasks_mut(&mut self) -> &mut Vec<Subtask> {
        &mut self.subtasks
    }
}

pub fn find_mut<'a, T: Entry>(items: &'a mut [T], id: &str) -> Option<&'a mut T> {
    items.iter_mut().find(|item| item.entry_id() == id)
}

pub fn update_entry<T: Entry>(items: &mut [T], id: &str, f: impl FnOnce(&mut T)) -> bool {
    match find_mut(items, id) {
        Some(item) => {
            f(item);
            true
        }
        None => false,
    }
}

pub fn remove_entry<T: Entry>(items: &mut Vec<T>, id: &str) -> bool {
    let before = items.len();
    items.retain(|item| item.entry_id() != id);
    items.len() != before
}

/// Move the element at `from` so that it ends up at index `to`.
///
/// Equivalent to removing the element and re-inserting it at `to` in the
/// remaining sequence. `to` past the end means "last". Returns `false` when
/// `from` is out of range.
pub fn move_entry<T>(items: &mut Vec<T>, from: usize, to: usize) -> bool {
    if from >= items.len() {
        return false;
    }
    let item = items.remove(from);
    let to = to.min(items.len());
    items.insert(to, item);
    true
}

/// Where `add_block` places the new block.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Position {
    #[default]
    End,
    After(usize),
}

/// Append or insert a new empty block of `kind`; returns its id.
pub fn add_block(blocks: &mut Vec<Block>, kind: BlockKind, position: Position) -> String {
    let block = Block::new(kind);
    let id = block.id().to_string();
    match position {
        Position::After(index) if index < blocks.len() => blocks.insert(index + 1, block),
        _ => blocks.push(block),
    }
    id
}

pub fn update_block(blocks: &mut [Block], id: &str, patch: &BlockPatch) -> bool {
    update_entry(blocks, id, |block| block.apply(patch))
}

pub fn convert_block(blocks: &mut [Block], id: &str, kind: BlockKind) -> bool {
    update_entry(blocks, id, |block| block.convert(kind))
}

pub fn remove_block(blocks: &mut Vec<Block>, id: &str) -> bool {
    remove_entry(blocks, id)
}

pub fn reorder(blocks: &mut Vec<Block>, from: usize, to: usize) -> bool {
    move_entry(blocks, from, to)
}

/// Toggle completion of the checkable item carrying `id` anywhere in the
/// tree: a `subtask` block, a timeline step, or a nested subtask. Cards
/// have no completion state, so their ids never match.
pub fn toggle_item(blocks: &mut [Block], id: &str) -> bool {
    for block in blocks.iter_mut() {
        if let Block::Subtask {
            id: block_id,
            completed,
            ..
        } = block
        {
            if *block_id == id {
                *completed = !*completed;
                return true;
            }
            continue;
        }
        if let Some(steps) = block.steps_mut() {
            for step in steps {
                if step.id == id {
                    step.completed = !step.completed;
                    return true;
                }
                if toggle_subtask(&mut step.subtasks, id) {
                    return true;
                }
            }
        }
        if let Some(cards) = block.cards_mut() {
            if cards.iter_mut().any(|card| toggle_subtask(&mut card.subtasks, id)) {
                return true;
            }
        }
    }
    false
}

fn toggle_subtask(subtasks: &mut [Subtask], id: &str) -> bool {
    update_entry(subtasks, id, |subtask| subtask.completed = !subtask.completed)
}

/// Remove whichever entity carries `id`: a block, step, card or nested
/// subtask.
pub fn remove_item(blocks: &mut Vec<Block>, id: &str) -> bool {
    if remove_entry(blocks, id) {
        return true;
    }
    for block in blocks.iter_mut() {
        if let Some(steps) = block.steps_mut() {
            if remove_entry(steps, id) || steps.iter_mut().any(|step| step.remove_subtask(id)) {
                return true;
            }
        }
        if let Some(cards) = block.cards_mut() {
            if remove_entry(cards, id) || cards.iter_mut().any(|card| card.remove_subtask(id)) {
                return true;
            }
        }
    }
    false
}
