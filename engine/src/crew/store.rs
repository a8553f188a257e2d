//! Per-run output store
//!
//! Maps task name to the record its last tool produced. Entries keep
//! execution order; writing a name twice replaces the earlier value in
//! place (last write wins).

use crew_sdk::Record;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OutputStore {
    entries: IndexMap<String, Record>,
}

impl OutputStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a task's output, returning the value it replaced if the task
    /// name was already present.
    pub fn insert(&mut self, task: impl Into<String>, output: Record) -> Option<Record> {
        self.entries.insert(task.into(), output)
    }

    pub fn get(&self, task: &str) -> Option<&Record> {
        self.entries.get(task)
    }

    /// A single output field of a task
    pub fn field(&self, task: &str, field: &str) -> Option<&Value> {
        self.entries.get(task).and_then(|record| record.get(field))
    }

    pub fn contains(&self, task: &str) -> bool {
        self.entries.contains_key(task)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Task names in the order their outputs were first recorded
    pub fn task_names(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Record)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn into_inner(self) -> IndexMap<String, Record> {
        self.entries
    }
}

impl FromIterator<(String, Record)> for OutputStore {
    fn from_iter<I: IntoIterator<Item = (String, Record)>>(iter: I) -> Self {
        Self {
            entries: iter.into_iter().collect(),
        }
    }
}
