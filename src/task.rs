//! Task records.
//!
//! A task owns its block tree and its comments exclusively. The in-memory
//! [`Task`] always holds the current block tree; [`StoredTask`] is the
//! on-disk record, which may carry any of the legacy content layouts and
//! always gets the flattened `subtasks` list on save.

use chrono::{DateTime, SubsecRound, Utc};
use scraper::{Html, Selector};
use serde::{Deserialize, Serialize};

use crate::block::{self, new_id, null_as_default, Block, Subtask};
use crate::error::{Error, Result};
use crate::legacy::{self, StoredContent, Unreadable};

const COMMENT_MARKER_CLASS: &str = "rich-text-comment";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Comment {
    pub id: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub text: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub selected_text: String,
    #[serde(default, with = "created_at_format", skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
}

/// `createdAt` as written by browsers: RFC 3339, UTC, millisecond precision.
/// Missing or null reads as `None`.
mod created_at_format {
    use chrono::{DateTime, SecondsFormat, Utc};
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &Option<DateTime<Utc>>, serializer: S) -> Result<S::Ok, S::Error> {
        match value {
            Some(value) => serializer.serialize_str(&value.to_rfc3339_opts(SecondsFormat::Millis, true)),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error> {
        let Some(raw) = Option::<String>::deserialize(deserializer)? else {
            return Ok(None);
        };
        DateTime::parse_from_rfc3339(raw.trim())
            .map(|value| Some(value.with_timezone(&Utc)))
            .map_err(serde::de::Error::custom)
    }
}

/// On-disk task record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredTask {
    pub id: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub title: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub details: String,
    #[serde(flatten)]
    pub content: StoredContent,
    #[serde(default, deserialize_with = "null_as_default")]
    pub comments: Vec<Comment>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub completed: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Task {
    pub id: String,
    pub title: String,
    /// Rich-text notes as HTML, including inline comment markers.
    pub details: String,
    pub blocks: Vec<Block>,
    pub comments: Vec<Comment>,
    pub completed: bool,
    /// Stored content entries that did not parse, written back on save.
    #[serde(skip)]
    pub unreadable: Unreadable,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Progress {
    pub done: usize,
    pub total: usize,
}

/// A task as shown to readers: the record plus its derived flat list and
/// progress.
#[derive(Debug, Clone, Serialize)]
pub struct TaskView {
    #[serde(flatten)]
    pub task: Task,
    pub subtasks: Vec<Subtask>,
    pub progress: Progress,
}

impl From<Task> for TaskView {
    fn from(task: Task) -> Self {
        Self {
            subtasks: task.flat_subtasks(),
            progress: task.progress(),
            task,
        }
    }
}

/// Fields changed by an edit; `None` leaves the field alone.
#[derive(Debug, Clone, Default)]
pub struct TaskEdit {
    pub title: Option<String>,
    pub details: Option<String>,
}

fn normalize_title(title: &str) -> Result<String> {
    let trimmed = title.trim();
    if trimmed.is_empty() {
        return Err(Error::InvalidArgument(
            "task title cannot be empty".to_string(),
        ));
    }
    Ok(trimmed.to_string())
}

impl Task {
    pub fn new(title: &str, details: &str) -> Result<Self> {
        Ok(Self {
            id: new_id(),
            title: normalize_title(title)?,
            details: details.trim().to_string(),
            blocks: Vec::new(),
            comments: Vec::new(),
            completed: false,
            unreadable: Unreadable::default(),
        })
    }

    /// Read a stored record, migrating legacy content to blocks.
    pub fn from_stored(stored: StoredTask) -> Self {
        let (blocks, unreadable) = legacy::load_blocks(&stored.content);
        Self {
            id: stored.id,
            title: stored.title,
            details: stored.details,
            blocks,
            comments: stored.comments,
            completed: stored.completed,
            unreadable,
        }
    }

    /// The record to persist: blocks plus the derived flat subtask list.
    pub fn to_stored(&self) -> Result<StoredTask> {
        Ok(StoredTask {
            id: self.id.clone(),
            title: self.title.clone(),
            details: self.details.clone(),
            content: StoredContent::from_blocks(&self.blocks, &self.unreadable)?,
            comments: self.comments.clone(),
            completed: self.completed,
        })
    }

    pub fn apply_edit(&mut self, edit: &TaskEdit) -> Result<()> {
        if let Some(title) = &edit.title {
            self.title = normalize_title(title)?;
        }
        if let Some(details) = &edit.details {
            self.details = details.trim().to_string();
        }
        Ok(())
    }

    pub fn flat_subtasks(&self) -> Vec<Subtask> {
        legacy::flatten(&self.blocks)
    }

    /// Completed vs. total items of the flattened view.
    pub fn progress(&self) -> Progress {
        let flat = self.flat_subtasks();
        Progress {
            done: flat.iter().filter(|item| item.completed).count(),
            total: flat.len(),
        }
    }

    pub fn toggle_item(&mut self, item_id: &str) -> bool {
        block::toggle_item(&mut self.blocks, item_id)
    }

    pub fn remove_item(&mut self, item_id: &str) -> bool {
        block::remove_item(&mut self.blocks, item_id)
    }

    /// Attach a comment. Blank text adds nothing.
    pub fn add_comment(&mut self, text: &str, selected_text: &str) -> Option<String> {
        let text = text.trim();
        if text.is_empty() {
            return None;
        }
        let comment = Comment {
            id: new_id(),
            text: text.to_string(),
            selected_text: selected_text.to_string(),
            created_at: Some(now_millis()),
        };
        let id = comment.id.clone();
        self.comments.push(comment);
        Some(id)
    }

    pub fn edit_comment(&mut self, comment_id: &str, text: &str) -> bool {
        match self.comments.iter_mut().find(|c| c.id == comment_id) {
            Some(comment) => {
                comment.text = text.to_string();
                true
            }
            None => false,
        }
    }

    /// Drop a comment and unwrap its marker in `details`, keeping the
    /// commented text.
    pub fn remove_comment(&mut self, comment_id: &str) -> bool {
        let before = self.comments.len();
        self.comments.retain(|c| c.id != comment_id);
        if self.comments.len() == before {
            return false;
        }
        self.details = unwrap_comment_marker(&self.details, comment_id);
        true
    }

    /// Text content of `details` with entities decoded and whitespace
    /// collapsed.
    pub fn details_plain_text(&self) -> String {
        html_to_plain_text(&self.details)
    }
}

fn now_millis() -> DateTime<Utc> {
    Utc::now().trunc_subsecs(3)
}

pub fn html_to_plain_text(html: &str) -> String {
    let fragment = Html::parse_fragment(html);
    let text = fragment.root_element().text().collect::<Vec<_>>().join(" ");
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Remove every comment marker span for `comment_id` from `html`, leaving
/// the wrapped content in place. Without a matching marker `html` comes
/// back untouched.
pub fn unwrap_comment_marker(html: &str, comment_id: &str) -> String {
    let Ok(selector) = Selector::parse(&format!("span.{COMMENT_MARKER_CLASS}")) else {
        return html.to_string();
    };
    let mut fragment = Html::parse_fragment(html);
    let markers: Vec<_> = fragment
        .select(&selector)
        .filter(|marker| marker.value().attr("data-comment-id") == Some(comment_id))
        .map(|marker| marker.id())
        .collect();
    if markers.is_empty() {
        return html.to_string();
    }

    for marker in markers {
        // hoist children in front of the marker, then drop the empty span
        while let Some(child) = fragment
            .tree
            .get(marker)
            .and_then(|node| node.first_child())
            .map(|node| node.id())
        {
            let Some(mut node) = fragment.tree.get_mut(marker) else {
                break;
            };
            node.insert_id_before(child);
        }
        if let Some(mut node) = fragment.tree.get_mut(marker) {
            node.detach();
        }
    }
    fragment.root_element().inner_html()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::block::BlockKind;
    use serde_json::json;

    #[test]
    fn new_task_requires_a_title() {
        assert!(Task::new("   ", "").is_err());
        let task = Task::new("  Plan week ", " notes ").expect("task");
        assert_eq!(task.title, "Plan week");
        assert_eq!(task.details, "notes");
        assert!(!task.completed);
    }

    #[test]
    fn stored_round_trip_writes_flat_subtasks() {
        let mut task = Task::new("Ship", "").unwrap();
        let id = block::add_block(&mut task.blocks, BlockKind::Timeline, block::Position::End);
        let step = task.blocks[0].add_step("design").unwrap();
        let stored = task.to_stored().unwrap();
        let value = serde_json::to_value(&stored).unwrap();

        assert_eq!(value["blocks"][0]["id"], json!(id));
        assert_eq!(
            value["subtasks"],
            json!([{"id": step, "text": "design", "completed": false}])
        );
        assert!(value.get("sections").is_none());

        let back: StoredTask = serde_json::from_value(value).unwrap();
        assert_eq!(Task::from_stored(back), task);
    }

    #[test]
    fn legacy_record_loads_through_migration() {
        let stored: StoredTask = serde_json::from_value(json!({
            "id": "t1",
            "title": "Old",
            "details": null,
            "subtasks": [{"id": "s1", "text": "Buy milk", "completed": false}],
            "completed": true
        }))
        .unwrap();
        let task = Task::from_stored(stored);
        assert_eq!(task.details, "");
        assert!(task.completed);
        assert_eq!(task.blocks.len(), 1);
        assert_eq!(task.blocks[0].kind(), BlockKind::Subtask);
    }

    #[test]
    fn progress_counts_flattened_items() {
        let mut task = Task::new("Progress", "").unwrap();
        block::add_block(&mut task.blocks, BlockKind::ProcessDeck, block::Position::End);
        let card = task.blocks[0].add_card("card").unwrap();
        let nested = task.blocks[0].nested_mut(&card).unwrap();
        nested.push(Subtask::new("a"));
        nested.push(Subtask::new("b"));
        let first = nested[0].id.clone();

        assert!(task.toggle_item(&first));
        assert_eq!(task.progress(), Progress { done: 1, total: 3 });
    }

    #[test]
    fn comments_add_edit_remove() {
        let mut task = Task::new("Notes", "").unwrap();
        assert!(task.add_comment("  ", "x").is_none());
        let id = task.add_comment("check this", "the text").unwrap();
        task.details = format!(
            "<p>Before <span class=\"rich-text-comment\" data-comment-id=\"{id}\">the text</span> after</p>"
        );

        assert!(task.edit_comment(&id, "updated"));
        assert_eq!(task.comments[0].text, "updated");
        assert!(!task.edit_comment("missing", "x"));

        assert!(task.remove_comment(&id));
        assert!(task.comments.is_empty());
        assert_eq!(task.details, "<p>Before the text after</p>");
        assert!(!task.remove_comment(&id));
    }

    #[test]
    fn unwrap_marker_handles_nested_spans() {
        let html = "<span class=\"rich-text-comment\" data-comment-id=\"c1\">a <span>b</span> c</span>!";
        assert_eq!(unwrap_comment_marker(html, "c1"), "a <span>b</span> c!");
        assert_eq!(unwrap_comment_marker(html, "other"), html);
    }

    #[test]
    fn unwrap_marker_reads_real_html() {
        let html = "<span title=\"a > b\" class='rich-text-comment' data-comment-id='c1'>kept</span> rest";
        assert_eq!(unwrap_comment_marker(html, "c1"), "kept rest");

        let html = concat!(
            "<span class=\"highlight\">x</span> ",
            "<span class=\"rich-text-comment\" data-comment-id=\"c2\">y</span>"
        );
        assert_eq!(
            unwrap_comment_marker(html, "c2"),
            "<span class=\"highlight\">x</span> y"
        );
    }

    #[test]
    fn unwrap_marker_removes_every_span_of_the_comment() {
        let html = concat!(
            "<p><span class=\"rich-text-comment\" data-comment-id=\"c1\">one</span>",
            " <span class=\"rich-text-comment\" data-comment-id=\"c9\">keep</span>",
            " <span class=\"rich-text-comment\" data-comment-id=\"c1\">two</span></p>"
        );
        let unwrapped = unwrap_comment_marker(html, "c1");
        assert!(!unwrapped.contains("c1"));
        assert!(unwrapped.contains("data-comment-id=\"c9\""));
        assert!(unwrapped.starts_with("<p>one <span"));
        assert!(unwrapped.ends_with("</span> two</p>"));
        assert_eq!(html_to_plain_text(&unwrapped), "one keep two");
    }

    #[test]
    fn comment_created_at_uses_millisecond_rfc3339() {
        let comment: Comment = serde_json::from_value(json!({
            "id": "c",
            "text": "t",
            "selectedText": "s",
            "createdAt": "2024-03-04T05:06:07.089Z"
        }))
        .unwrap();
        let value = serde_json::to_value(&comment).unwrap();
        assert_eq!(value["createdAt"], "2024-03-04T05:06:07.089Z");
        assert_eq!(value["selectedText"], "s");
    }

    #[test]
    fn comment_without_created_at_still_loads() {
        let comment: Comment = serde_json::from_value(json!({
            "id": "c",
            "text": null,
            "createdAt": null
        }))
        .unwrap();
        assert_eq!(comment.text, "");
        assert!(comment.created_at.is_none());
        assert!(serde_json::to_value(&comment).unwrap().get("createdAt").is_none());

        let comment: Comment = serde_json::from_value(json!({"id": "d"})).unwrap();
        assert!(comment.created_at.is_none());
    }

    #[test]
    fn unreadable_blocks_survive_a_stored_round_trip() {
        let stored: StoredTask = serde_json::from_value(json!({
            "id": "t1",
            "title": "Mixed",
            "blocks": [
                {"id": "a", "type": "subtask", "content": "ok", "completed": false},
                {"id": "b", "type": "kanban", "columns": 3}
            ]
        }))
        .unwrap();
        let mut task = Task::from_stored(stored);
        assert_eq!(task.blocks.len(), 1);
        assert!(task.toggle_item("a"));

        let value = serde_json::to_value(task.to_stored().unwrap()).unwrap();
        assert_eq!(value["blocks"][0]["completed"], json!(true));
        assert_eq!(value["blocks"][1], json!({"id": "b", "type": "kanban", "columns": 3}));
    }

    #[test]
    fn plain_text_strips_tags() {
        let task = Task {
            details: "<p>Hello<br><b>world</b></p>\n  <i>again</i>".to_string(),
            ..Task::new("x", "").unwrap()
        };
        assert_eq!(task.details_plain_text(), "Hello world again");
    }

    #[test]
    fn plain_text_decodes_entities_and_skips_attributes() {
        assert_eq!(html_to_plain_text("<p>Tom &amp; Jerry</p>"), "Tom & Jerry");
        assert_eq!(html_to_plain_text("<a title=\"x > y\">link</a> text"), "link text");
        assert_eq!(html_to_plain_text(""), "");
    }
}
