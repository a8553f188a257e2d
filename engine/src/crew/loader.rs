//! Crew configuration loader
//!
//! Reads the agents and tasks documents into a `CrewConfiguration`.
//! The document format follows the file extension: YAML (`.yaml`, `.yml`),
//! TOML (`.toml`) or JSON (`.json`). Unknown extensions are read as YAML.
//!
//! Tool names are not checked here. A task naming an unregistered tool is
//! only noticed when the engine dispatches it.

use crew_sdk::errors::EngineError;
use indexmap::IndexMap;
use serde_json::Value;
use std::fs;
use std::path::Path;
use tracing::debug;

use super::spec::{AgentSpec, CrewConfiguration, TaskSpec};

/// Serialization format of a crew document
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentFormat {
    Yaml,
    Toml,
    Json,
}

impl DocumentFormat {
    pub fn from_path(path: &Path) -> Self {
        match path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase())
            .as_deref()
        {
            Some("toml") => Self::Toml,
            Some("json") => Self::Json,
            _ => Self::Yaml,
        }
    }

    /// Parse document text into a generic JSON value
    pub fn parse(self, contents: &str) -> Result<Value, String> {
        match self {
            Self::Yaml => serde_yaml_bw::from_str(contents).map_err(|e| e.to_string()),
            Self::Toml => toml::from_str(contents).map_err(|e| e.to_string()),
            Self::Json => serde_json::from_str(contents).map_err(|e| e.to_string()),
        }
    }
}

impl CrewConfiguration {
    /// Load a crew from an agents document and a tasks document
    ///
    /// # Errors
    ///
    /// Returns `EngineError::Config` if either document is missing, cannot
    /// be parsed, or does not have the expected shape.
    pub fn from_files(agents_path: &Path, tasks_path: &Path) -> Result<Self, EngineError> {
        let agents = load_agents(agents_path)?;
        let tasks = load_tasks(tasks_path)?;
        debug!(
            "Loaded crew: {} agents, {} tasks",
            agents.len(),
            tasks.len()
        );
        Ok(Self::new(agents, tasks))
    }
}

/// Load the agents document: a mapping from agent name to metadata
pub fn load_agents(path: &Path) -> Result<IndexMap<String, AgentSpec>, EngineError> {
    let value = read_document(path)?;
    parse_agents(value).map_err(|e| config_error(path, &e))
}

/// Load the tasks document: `{tasks: [...]}` or a bare list of tasks
pub fn load_tasks(path: &Path) -> Result<Vec<TaskSpec>, EngineError> {
    let value = read_document(path)?;
    parse_tasks(value).map_err(|e| config_error(path, &e))
}

pub fn parse_agents(value: Value) -> Result<IndexMap<String, AgentSpec>, String> {
    let Value::Object(entries) = value else {
        return Err("agents document must be a mapping of agent name to metadata".to_string());
    };

    let mut agents = IndexMap::with_capacity(entries.len());
    for (name, meta) in entries {
        let mut agent: AgentSpec = match meta {
            Value::Null => AgentSpec::default(),
            other => serde_json::from_value(other)
                .map_err(|e| format!("agent '{}': {}", name, e))?,
        };
        agent.name = name.clone();
        agents.insert(name, agent);
    }
    Ok(agents)
}

pub fn parse_tasks(value: Value) -> Result<Vec<TaskSpec>, String> {
    let list = match value {
        Value::Object(mut doc) => match doc.remove("tasks") {
            Some(list) => list,
            None => return Err("tasks document has no 'tasks' list".to_string()),
        },
        list @ Value::Array(_) => list,
        _ => return Err("tasks document must be a list or contain a 'tasks' list".to_string()),
    };

    let tasks: Vec<TaskSpec> = serde_json::from_value(list).map_err(|e| e.to_string())?;

    if let Some(index) = tasks.iter().position(|t| t.name.trim().is_empty()) {
        return Err(format!("task #{} has an empty name", index + 1));
    }

    Ok(tasks)
}

fn read_document(path: &Path) -> Result<Value, EngineError> {
    let contents = fs::read_to_string(path).map_err(|e| config_error(path, &e.to_string()))?;

    if contents.trim().is_empty() {
        return Err(config_error(path, "document is empty"));
    }

    DocumentFormat::from_path(path)
        .parse(&contents)
        .map_err(|e| config_error(path, &e))
}

fn config_error(path: &Path, reason: &str) -> EngineError {
    EngineError::Config(format!("{}: {}", path.display(), reason))
}
