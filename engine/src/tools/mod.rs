//! Tool registry and built-in tools
//!
//! The registry maps tool names, as written in task documents, to shared
//! `Tool` implementations. Built-in tools are enabled from the `[tools]`
//! section of the settings file.

pub mod advice;
pub mod command;
pub mod results;
pub mod search;

pub use advice::AdviceLookup;
pub use command::CommandTool;
pub use results::ResultLog;
pub use search::WebSearchTool;

use crew_sdk::errors::EngineError;
use crew_sdk::{Record, Tool, ToolError, ToolInput};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, warn};

use crate::config::ToolsConfig;
use crate::crew::UNKNOWN;

/// Registry of tools that tasks can name.
///
/// Cloning is cheap; tools are shared behind `Arc`.
#[derive(Clone, Default)]
pub struct ToolRegistry {
    tools: HashMap<String, Arc<dyn Tool>>,
}

impl ToolRegistry {
    /// Create an empty registry with no tools enabled.
    pub fn new() -> Self {
        Self::default()
    }

    /// Build the registry described by the `[tools]` settings.
    pub fn from_config(config: &ToolsConfig) -> Result<Self, EngineError> {
        let mut registry = Self::new();

        for command in &config.command {
            registry.register(CommandTool::from_config(command));
        }
        if config.search.enabled {
            registry.register(WebSearchTool::from_config(&config.search)?);
        }
        if config.advice.enabled {
            registry.register(AdviceLookup::from_config(&config.advice));
        }
        if config.results.enabled {
            registry.register(ResultLog::new(config.results.path.clone()));
        }

        debug!("Tool registry built: {:?}", registry.names());
        Ok(registry)
    }

    /// Register a tool under its own name, replacing any tool already
    /// registered under that name.
    pub fn register(&mut self, tool: impl Tool + 'static) {
        self.register_arc(Arc::new(tool));
    }

    pub fn register_arc(&mut self, tool: Arc<dyn Tool>) {
        let name = tool.name().to_string();
        if self.tools.insert(name.clone(), tool).is_some() {
            warn!("Tool '{}' registered twice, keeping the latest", name);
        }
    }

    pub fn get(&self, name: &str) -> Option<&Arc<dyn Tool>> {
        self.tools.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.tools.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    /// Names of all registered tools, sorted
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.tools.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    /// `(name, description)` pairs, sorted by name
    pub fn descriptions(&self) -> Vec<(&str, &str)> {
        let mut entries: Vec<(&str, &str)> = self
            .tools
            .iter()
            .map(|(name, tool)| (name.as_str(), tool.description()))
            .collect();
        entries.sort_unstable_by_key(|(name, _)| *name);
        entries
    }
}

impl std::fmt::Debug for ToolRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ToolRegistry")
            .field("tools", &self.names())
            .finish()
    }
}

/// Copy `input[key]` (a list of prediction objects) and set `target` on
/// each one from its `label_field`.
///
/// Predictions without a string label are looked up as `UNKNOWN`. An
/// absent list, or one left `UNKNOWN` by an upstream task that produced
/// nothing, is treated as empty.
pub(crate) fn enrich_predictions(
    input: &ToolInput,
    label_field: &str,
    target: &str,
    mut lookup: impl FnMut(&str) -> Result<String, EngineError>,
) -> Result<Vec<Value>, EngineError> {
    let predictions = match input.params.get("predictions") {
        None | Some(Value::Null) => return Ok(Vec::new()),
        Some(Value::String(s)) if s == UNKNOWN => {
            debug!("No upstream predictions, nothing to enrich");
            return Ok(Vec::new());
        }
        Some(_) => input.param_array("predictions")?,
    };

    predictions
        .iter()
        .map(|prediction| -> Result<Value, EngineError> {
            let mut record: Record = match prediction {
                Value::Object(map) => map.clone(),
                other => {
                    return Err(ToolError::InvalidParameter(format!(
                        "predictions must contain objects, got {}",
                        other
                    ))
                    .into())
                }
            };
            let label = record
                .get(label_field)
                .and_then(Value::as_str)
                .unwrap_or(UNKNOWN)
                .to_string();
            record.insert(target.to_string(), Value::String(lookup(&label)?));
            Ok(Value::Object(record))
        })
        .collect()
}
