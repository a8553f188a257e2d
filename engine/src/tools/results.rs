//! Results log tool
//!
//! Appends one timestamped entry per call to a JSON array file.

use chrono::Utc;
use crew_sdk::errors::EngineError;
use crew_sdk::{Record, Tool, ToolInput, ToolOutput};
use serde_json::Value;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;

#[derive(Debug, Clone)]
pub struct ResultLog {
    path: PathBuf,
}

impl ResultLog {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Current entries; a missing file has none
    pub fn entries(&self) -> Result<Vec<Value>, EngineError> {
        if !self.path.exists() {
            return Ok(Vec::new());
        }

        let contents = fs::read_to_string(&self.path)?;
        if contents.trim().is_empty() {
            return Ok(Vec::new());
        }

        serde_json::from_str(&contents).map_err(|e| {
            EngineError::Retrieval(format!(
                "Results file {} is not a JSON array: {}",
                self.path.display(),
                e
            ))
        })
    }

    /// Append a record and return the new entry count
    pub fn append(&self, mut record: Record) -> Result<usize, EngineError> {
        let mut entries = self.entries()?;

        record.insert(
            "recorded_at".to_string(),
            Value::String(Utc::now().to_rfc3339()),
        );
        entries.push(Value::Object(record));

        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }

        let json = serde_json::to_string_pretty(&entries)
            .map_err(|e| EngineError::ToolError(format!("Failed to serialize results: {}", e)))?;
        fs::write(&self.path, json)?;

        info!("Result saved to {}", self.path.display());
        Ok(entries.len())
    }
}

impl Tool for ResultLog {
    fn name(&self) -> &str {
        "ResultLog"
    }

    fn description(&self) -> &str {
        "Append the task input to a JSON results file"
    }

    fn execute(&self, input: &ToolInput) -> Result<ToolOutput, EngineError> {
        let record = match input.params.get("record") {
            Some(Value::Object(record)) => record.clone(),
            Some(other) => {
                let mut record = Record::new();
                record.insert("record".to_string(), other.clone());
                record
            }
            None => input.params.clone(),
        };

        let entries = self.append(record)?;
        Ok(ToolOutput::empty()
            .with_field(
                "path",
                Value::String(self.path.to_string_lossy().into_owned()),
            )
            .with_field("entries", Value::from(entries)))
    }
}
