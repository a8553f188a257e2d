//! Progress observations
//!
//! The engine emits one `ProgressEvent` per executed task. Where the events
//! end up is up to the sinks attached to the crew: the tracing log, a
//! JSON-lines file, or an in-memory recorder.

use crew_sdk::Record;
use serde::{Deserialize, Serialize};
use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::Path;
use std::sync::{Arc, Mutex};
use tracing::{info, warn};

/// What happened when one task ran
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProgressEvent {
    /// Zero-based position of the task in the declared sequence
    pub index: usize,
    pub task: String,
    pub agent: String,
    pub tools: Vec<String>,
    pub input: Record,
    pub output: Record,
}

/// Destination for progress events
pub trait ProgressSink: Send + Sync {
    fn observe(&self, event: &ProgressEvent);
}

/// Logs every event through `tracing`
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingSink;

impl ProgressSink for TracingSink {
    fn observe(&self, event: &ProgressEvent) {
        info!(
            task = %event.task,
            agent = %event.agent,
            tools = ?event.tools,
            input = %serde_json::Value::Object(event.input.clone()),
            output = %serde_json::Value::Object(event.output.clone()),
            "Task completed"
        );
    }
}

/// Appends each event as one JSON line to a file
#[derive(Debug)]
pub struct JsonLinesSink {
    file: Mutex<File>,
}

impl JsonLinesSink {
    pub fn create(path: &Path) -> std::io::Result<Self> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        Ok(Self {
            file: Mutex::new(file),
        })
    }
}

impl ProgressSink for JsonLinesSink {
    fn observe(&self, event: &ProgressEvent) {
        let line = match serde_json::to_string(event) {
            Ok(line) => line,
            Err(e) => {
                warn!("Failed to serialize progress event: {}", e);
                return;
            }
        };

        match self.file.lock() {
            Ok(mut file) => {
                if let Err(e) = writeln!(file, "{}", line) {
                    warn!("Failed to write progress event: {}", e);
                }
            }
            Err(_) => warn!("Progress log lock poisoned, dropping event"),
        }
    }
}

/// Keeps events in memory. Clones share the same buffer.
#[derive(Debug, Default, Clone)]
pub struct RecordingSink {
    events: Arc<Mutex<Vec<ProgressEvent>>>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<ProgressEvent> {
        self.events
            .lock()
            .map(|events| events.clone())
            .unwrap_or_default()
    }
}

impl ProgressSink for RecordingSink {
    fn observe(&self, event: &ProgressEvent) {
        if let Ok(mut events) = self.events.lock() {
            events.push(event.clone());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn event(index: usize, task: &str) -> ProgressEvent {
        let mut output = Record::new();
        output.insert("y".to_string(), json!("hello"));
        ProgressEvent {
            index,
            task: task.to_string(),
            agent: "agent".to_string(),
            tools: vec!["Echo".to_string()],
            input: Record::new(),
            output,
        }
    }

    #[test]
    fn test_recording_sink_shares_buffer() {
        let sink = RecordingSink::new();
        let handle = sink.clone();

        sink.observe(&event(0, "t1"));
        sink.observe(&event(1, "t2"));

        let events = handle.events();
        assert_eq!(events.len(), 2);
        assert_eq!(events[1].task, "t2");
    }

    #[test]
    fn test_json_lines_sink_appends() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("logs").join("progress.jsonl");

        let sink = JsonLinesSink::create(&path).unwrap();
        sink.observe(&event(0, "t1"));
        sink.observe(&event(1, "t2"));

        let contents = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<ProgressEvent> = contents
            .lines()
            .map(|l| serde_json::from_str(l).unwrap())
            .collect();
        assert_eq!(lines, vec![event(0, "t1"), event(1, "t2")]);
    }
}
