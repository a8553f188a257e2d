//! Tool trait
//!
//! This module defines the `Tool` trait that every unit of work dispatched by
//! the crew engine implements. A tool sees only its resolved input; it never
//! receives a handle to the engine's output store, so all cross-task data
//! flows through input templates.

use crate::errors::EngineError;
use crate::types::{ToolInput, ToolOutput};

/// Trait that all tools must implement
pub trait Tool: Send + Sync {
    /// Returns the name the tool is registered and dispatched under
    fn name(&self) -> &str;

    /// Returns a one-line description of the tool
    fn description(&self) -> &str {
        ""
    }

    /// Handle a tool invocation
    ///
    /// Tools may have side effects (result files, network calls), which are
    /// their own business. Errors abort the current crew run.
    fn execute(&self, input: &ToolInput) -> Result<ToolOutput, EngineError>;
}

/// A tool backed by a closure.
///
/// Handy for stub tools and small adapters that do not warrant a type.
///
/// ```
/// use crew_sdk::{FnTool, Tool, ToolInput, ToolOutput};
/// use serde_json::json;
///
/// let echo = FnTool::new("Echo", |input: &ToolInput| {
///     Ok(ToolOutput::empty().with_field("y", input.param_json("x")?.clone()))
/// });
///
/// let output = echo.execute(&ToolInput::new().with_param("x", json!("hello"))).unwrap();
/// assert_eq!(output.get("y"), Some(&json!("hello")));
/// ```
pub struct FnTool<F> {
    name: String,
    description: String,
    func: F,
}

impl<F> FnTool<F>
where
    F: Fn(&ToolInput) -> Result<ToolOutput, EngineError> + Send + Sync,
{
    pub fn new(name: impl Into<String>, func: F) -> Self {
        Self {
            name: name.into(),
            description: String::new(),
            func,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }
}

impl<F> Tool for FnTool<F>
where
    F: Fn(&ToolInput) -> Result<ToolOutput, EngineError> + Send + Sync,
{
    fn name(&self) -> &str {
        &self.name
    }

    fn description(&self) -> &str {
        &self.description
    }

    fn execute(&self, input: &ToolInput) -> Result<ToolOutput, EngineError> {
        (self.func)(input)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_fn_tool_metadata() {
        let tool = FnTool::new("Noop", |_: &ToolInput| Ok(ToolOutput::empty()))
            .with_description("does nothing");
        assert_eq!(tool.name(), "Noop");
        assert_eq!(tool.description(), "does nothing");
    }

    #[test]
    fn test_fn_tool_propagates_errors() {
        let tool = FnTool::new("Fail", |_: &ToolInput| {
            Err(EngineError::Inference("shape mismatch".to_string()))
        });
        let err = tool.execute(&ToolInput::new()).unwrap_err();
        assert!(matches!(err, EngineError::Inference(_)));
    }

    #[test]
    fn test_fn_tool_missing_param_is_inference_failure() {
        let tool = FnTool::new("Echo", |input: &ToolInput| {
            Ok(ToolOutput::empty().with_field("y", json!(input.param_str("x")?)))
        });
        let err = tool.execute(&ToolInput::new()).unwrap_err();
        assert!(matches!(err, EngineError::Inference(_)));
    }
}
