//! Storage layer for weekplan
//!
//! All planner state lives in one JSON document, a map from week key to
//! the ordered task records of that week:
//!
//! ```text
//! <data dir>/
//!   weekplan.toml                     # optional configuration
//!   <key>.json                        # { "2024-01-01": [ {task}, ... ], ... }
//!   <key>.json.lock                   # advisory lock for the file above
//!   <key>.corrupt-<timestamp>.json    # unreadable file moved aside on load
//! ```
//!
//! [`PlannerStore`] caches the whole map in memory and writes a full
//! snapshot after every mutation. Last write wins.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{Error, Result};
use crate::lock::{self, DEFAULT_LOCK_TIMEOUT_MS};
use crate::task::{StoredTask, Task};

/// Tasks of every known week, keyed by Monday `YYYY-MM-DD`
pub type WeekMap = BTreeMap<String, Vec<Task>>;

/// Location of the planner file on disk
#[derive(Debug, Clone)]
pub struct Storage {
    data_dir: PathBuf,
    key: String,
}

impl Storage {
    pub fn new(data_dir: impl Into<PathBuf>, key: impl Into<String>) -> Self {
        Self {
            data_dir: data_dir.into(),
            key: key.into(),
        }
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    /// Path to the planner JSON document
    pub fn planner_file(&self) -> PathBuf {
        self.data_dir.join(format!("{}.json", self.key))
    }

    /// Raw planner document, `None` when nothing has been saved yet
    pub fn read_raw(&self) -> Result<Option<String>> {
        lock::read_locked_str(self.planner_file(), DEFAULT_LOCK_TIMEOUT_MS)
    }

    /// Write JSON atomically under the planner lock
    pub fn write_json<T: Serialize>(&self, path: &Path, data: &T) -> Result<()> {
        let json = serde_json::to_string_pretty(data)?;
        lock::write_atomic_locked(path, json.as_bytes(), DEFAULT_LOCK_TIMEOUT_MS)
    }

    /// Move an unreadable planner file out of the way so the next save
    /// doesn't destroy it.
    pub fn backup_corrupt(&self) -> Result<PathBuf> {
        let stamp = Utc::now().format("%Y%m%dT%H%M%S%.3fZ");
        let backup = self
            .data_dir
            .join(format!("{}.corrupt-{}.json", self.key, stamp));
        fs::rename(self.planner_file(), &backup)?;
        Ok(backup)
    }
}

/// Parts of a planner document that did not parse. They are carried
/// through unchanged and written back on every save.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Leftovers {
    /// Week values that are not a list of tasks
    pub weeks: BTreeMap<String, Value>,
    /// Task records that failed to parse, by week, in file order
    pub records: BTreeMap<String, Vec<Value>>,
}

impl Leftovers {
    pub fn is_empty(&self) -> bool {
        self.weeks.is_empty() && self.records.is_empty()
    }
}

/// Parse a planner document.
///
/// Weeks whose value is not a list and task records that fail to parse are
/// set aside with a warning. Only a document that isn't a JSON object at all
/// is an error.
pub fn parse_weeks(raw: &str) -> Result<(WeekMap, Leftovers)> {
    let document: BTreeMap<String, Value> = serde_json::from_str(raw)?;
    let mut weeks = WeekMap::new();
    let mut leftovers = Leftovers::default();

    for (week, value) in document {
        let Value::Array(records) = value else {
            tracing::warn!(week = %week, "keeping week as is: expected a list of tasks");
            leftovers.weeks.insert(week, value);
            continue;
        };

        let mut tasks = Vec::with_capacity(records.len());
        for (index, record) in records.into_iter().enumerate() {
            match StoredTask::deserialize(&record) {
                Ok(stored) => tasks.push(Task::from_stored(stored)),
                Err(err) => {
                    tracing::warn!(week = %week, index, error = %err, "keeping unreadable task record as is");
                    leftovers.records.entry(week.clone()).or_default().push(record);
                }
            }
        }
        weeks.insert(week, tasks);
    }

    Ok((weeks, leftovers))
}

/// The in-memory planner plus its backing file
#[derive(Debug)]
pub struct PlannerStore {
    storage: Storage,
    weeks: WeekMap,
    leftovers: Leftovers,
    save_error: Option<Error>,
}

impl PlannerStore {
    /// Load the planner for reading and writing.
    ///
    /// A missing file is an empty planner. A file that can't be read (I/O,
    /// lock timeout, invalid UTF-8) is an error and stays where it is. A
    /// file that reads but isn't a JSON object is moved aside and replaced
    /// by an empty planner; if it can't be moved, that is an error too.
    pub fn open(storage: Storage) -> Result<Self> {
        let Some(raw) = storage.read_raw()? else {
            return Ok(Self::from_parts(storage, WeekMap::new(), Leftovers::default()));
        };
        match parse_weeks(&raw) {
            Ok((weeks, leftovers)) => Ok(Self::from_parts(storage, weeks, leftovers)),
            Err(err) => {
                tracing::error!(
                    path = %storage.planner_file().display(),
                    error = %err,
                    "planner file is unreadable, starting empty"
                );
                let backup = storage.backup_corrupt()?;
                tracing::warn!(backup = %backup.display(), "moved unreadable planner file aside");
                Ok(Self::from_parts(storage, WeekMap::new(), Leftovers::default()))
            }
        }
    }

    /// Load the planner without touching the file. Any read or parse
    /// failure is an error.
    pub fn read(storage: Storage) -> Result<Self> {
        let (weeks, leftovers) = match storage.read_raw()? {
            Some(raw) => parse_weeks(&raw)?,
            None => (WeekMap::new(), Leftovers::default()),
        };
        Ok(Self::from_parts(storage, weeks, leftovers))
    }

    fn from_parts(storage: Storage, weeks: WeekMap, leftovers: Leftovers) -> Self {
        Self {
            storage,
            weeks,
            leftovers,
            save_error: None,
        }
    }

    pub fn leftovers(&self) -> &Leftovers {
        &self.leftovers
    }

    pub fn storage(&self) -> &Storage {
        &self.storage
    }

    pub fn weeks(&self) -> &WeekMap {
        &self.weeks
    }

    /// Tasks of `week` in display order
    pub fn tasks(&self, week: &str) -> &[Task] {
        self.weeks.get(week).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn task(&self, week: &str, id: &str) -> Option<&Task> {
        self.tasks(week).iter().find(|task| task.id == id)
    }

    /// Resolve an exact task id or a unique id prefix within `week`
    pub fn resolve_task_id(&self, week: &str, prefix: &str) -> Result<String> {
        let tasks = self.tasks(week);
        if let Some(task) = tasks.iter().find(|task| task.id == prefix) {
            return Ok(task.id.clone());
        }

        let matches: Vec<&Task> = if prefix.is_empty() {
            Vec::new()
        } else {
            tasks.iter().filter(|task| task.id.starts_with(prefix)).collect()
        };

        match matches.as_slice() {
            [task] => Ok(task.id.clone()),
            [] => Err(Error::TaskNotFound {
                week: week.to_string(),
                id: prefix.to_string(),
            }),
            many => Err(Error::AmbiguousTaskId {
                prefix: prefix.to_string(),
                count: many.len(),
            }),
        }
    }

    /// Write the whole planner as one snapshot
    pub fn save(&self) -> Result<()> {
        let mut document: BTreeMap<&str, Value> = BTreeMap::new();
        for (week, tasks) in &self.weeks {
            let mut records = tasks
                .iter()
                .map(|task| Ok(serde_json::to_value(task.to_stored()?)?))
                .collect::<Result<Vec<_>>>()?;
            if let Some(unreadable) = self.leftovers.records.get(week) {
                records.extend(unreadable.iter().cloned());
            }
            document.insert(week.as_str(), Value::Array(records));
        }
        for (week, value) in &self.leftovers.weeks {
            document.entry(week.as_str()).or_insert_with(|| value.clone());
        }
        self.storage
            .write_json(&self.storage.planner_file(), &document)
    }

    /// The most recent failed auto-save, if any. Clears it.
    pub fn take_save_error(&mut self) -> Option<Error> {
        self.save_error.take()
    }

    fn commit(&mut self) {
        if let Err(err) = self.save() {
            tracing::warn!(
                path = %self.storage.planner_file().display(),
                error = %err,
                "failed to persist planner, keeping in-memory state"
            );
            self.save_error = Some(err);
        }
    }

    /// Replace the task with the same id in place, otherwise append it.
    /// Returns whether an existing task was replaced.
    pub fn save_task(&mut self, week: &str, task: Task) -> bool {
        let tasks = self.weeks.entry(week.to_string()).or_default();
        let replaced = match tasks.iter_mut().find(|existing| existing.id == task.id) {
            Some(existing) => {
                *existing = task;
                true
            }
            None => {
                tasks.push(task);
                false
            }
        };
        self.commit();
        replaced
    }

    /// Run `f` on a task and persist afterwards. `None` if the task is
    /// not in `week`.
    pub fn update_task<R>(&mut self, week: &str, id: &str, f: impl FnOnce(&mut Task) -> R) -> Option<R> {
        let task = self
            .weeks
            .get_mut(week)?
            .iter_mut()
            .find(|task| task.id == id)?;
        let result = f(task);
        self.commit();
        Some(result)
    }

    pub fn toggle_task(&mut self, week: &str, id: &str) -> bool {
        self.update_task(week, id, |task| task.completed = !task.completed)
            .is_some()
    }

    pub fn delete_task(&mut self, week: &str, id: &str) -> bool {
        let Some(tasks) = self.weeks.get_mut(week) else {
            return false;
        };
        let before = tasks.len();
        tasks.retain(|task| task.id != id);
        if tasks.len() == before {
            return false;
        }
        self.commit();
        true
    }

    pub fn toggle_item(&mut self, week: &str, task_id: &str, item_id: &str) -> bool {
        self.update_task(week, task_id, |task| task.toggle_item(item_id))
            .unwrap_or(false)
    }

    pub fn remove_item(&mut self, week: &str, task_id: &str, item_id: &str) -> bool {
        self.update_task(week, task_id, |task| task.remove_item(item_id))
            .unwrap_or(false)
    }
}
