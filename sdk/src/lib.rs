//! Crew SDK
//!
//! Shared library providing the tool trait, record types and error taxonomy
//! used by the crew engine and by tool implementations.

/// Tool trait and closure-backed tools
pub mod tool;

/// Error types and handling
pub mod errors;

/// Tool input/output types
pub mod types;

// Re-export commonly used types
pub use errors::{CrewErrorExt, EngineError};
pub use tool::{FnTool, Tool};
pub use types::{Record, ToolError, ToolInput, ToolOutput};
