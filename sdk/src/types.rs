//! Tool input/output types

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::errors::EngineError;

/// A mapping from field name to JSON value.
///
/// Used for task input templates, resolved tool inputs and tool results.
pub type Record = serde_json::Map<String, Value>;

/// Resolved input handed to a tool
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ToolInput {
    pub params: Record,
}

impl ToolInput {
    /// Create an empty ToolInput
    pub fn new() -> Self {
        Self::default()
    }

    /// Wrap an already resolved record
    pub fn from_record(params: Record) -> Self {
        Self { params }
    }

    /// Add a parameter
    pub fn with_param(mut self, key: impl Into<String>, value: Value) -> Self {
        self.params.insert(key.into(), value);
        self
    }

    /// Get a string parameter
    pub fn param_str(&self, key: &str) -> Result<String, ToolError> {
        self.params
            .get(key)
            .and_then(|v| v.as_str())
            .map(String::from)
            .ok_or_else(|| ToolError::MissingParameter(key.to_string()))
    }

    /// Get an optional string parameter
    pub fn param_str_opt(&self, key: &str) -> Option<String> {
        self.params
            .get(key)
            .and_then(|v| v.as_str())
            .map(String::from)
    }

    /// Get a list parameter
    pub fn param_array(&self, key: &str) -> Result<&Vec<Value>, ToolError> {
        match self.params.get(key) {
            Some(Value::Array(items)) => Ok(items),
            Some(other) => Err(ToolError::InvalidParameter(format!(
                "'{}' must be a list, got {}",
                key,
                type_name(other)
            ))),
            None => Err(ToolError::MissingParameter(key.to_string())),
        }
    }

    /// Get a list of strings, accepting a single string as a one-element list
    pub fn param_str_list(&self, key: &str) -> Result<Vec<String>, ToolError> {
        match self.params.get(key) {
            Some(Value::String(s)) => Ok(vec![s.clone()]),
            Some(Value::Array(items)) => items
                .iter()
                .map(|item| {
                    item.as_str().map(String::from).ok_or_else(|| {
                        ToolError::InvalidParameter(format!(
                            "'{}' must contain only strings, got {}",
                            key,
                            type_name(item)
                        ))
                    })
                })
                .collect(),
            Some(other) => Err(ToolError::InvalidParameter(format!(
                "'{}' must be a string or a list of strings, got {}",
                key,
                type_name(other)
            ))),
            None => Err(ToolError::MissingParameter(key.to_string())),
        }
    }

    /// Get a parameter as a JSON value
    pub fn param_json(&self, key: &str) -> Result<&Value, ToolError> {
        self.params
            .get(key)
            .ok_or_else(|| ToolError::MissingParameter(key.to_string()))
    }

    pub fn contains(&self, key: &str) -> bool {
        self.params.contains_key(key)
    }
}

/// Result record produced by a tool
///
/// Each tool defines its own fields; the engine stores the record verbatim.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ToolOutput {
    pub fields: Record,
}

impl ToolOutput {
    /// Create an empty output
    pub fn empty() -> Self {
        Self::default()
    }

    /// Add a field
    pub fn with_field(mut self, key: impl Into<String>, value: Value) -> Self {
        self.fields.insert(key.into(), value);
        self
    }

    /// Create an output from a JSON value.
    ///
    /// Objects become the record itself; any other value is stored under
    /// `value`.
    pub fn from_value(value: Value) -> Self {
        match value {
            Value::Object(fields) => Self { fields },
            other => Self::empty().with_field("value", other),
        }
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.fields.get(key)
    }

    pub fn into_record(self) -> Record {
        self.fields
    }
}

impl From<Record> for ToolOutput {
    fn from(fields: Record) -> Self {
        Self { fields }
    }
}

/// Tool-specific parameter errors
#[derive(Debug, thiserror::Error)]
pub enum ToolError {
    #[error("Missing parameter: {0}")]
    MissingParameter(String),

    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),
}

impl From<ToolError> for EngineError {
    fn from(err: ToolError) -> Self {
        EngineError::Inference(err.to_string())
    }
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "a list",
        Value::Object(_) => "an object",
    }
}
