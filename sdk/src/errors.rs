//! Error types and handling
//!
//! This module provides the error types shared by the crew engine and the
//! tools it dispatches to. All errors implement the `CrewErrorExt` trait
//! which provides user-friendly hints and indicates whether errors are
//! recoverable.
//!
//! # Failure kinds
//!
//! Tool failures fall into three families, mirroring what can go wrong
//! around an image classifier or an advice lookup:
//! - **Retrieval**: an input or artifact could not be found or read
//! - **Inference**: the input was malformed or the model could not run
//! - **External service**: a network dependency was unavailable

use thiserror::Error;

/// Trait for crew error extensions
///
/// This trait provides additional context for errors, including user-friendly
/// hints and recoverability information. All engine errors implement this trait.
pub trait CrewErrorExt {
    /// Returns a user-friendly hint for the error
    ///
    /// The hint is a static string that never echoes the raw error payload,
    /// so it is safe to render on a results page.
    fn user_hint(&self) -> &str;

    /// Returns whether the error is recoverable
    ///
    /// Recoverable errors can be retried by the caller (a flaky search
    /// backend, a missing upload). Non-recoverable errors need the
    /// configuration to be fixed first.
    fn is_recoverable(&self) -> bool;
}

/// Main engine error type
///
/// # Examples
///
/// ```
/// use crew_sdk::errors::{CrewErrorExt, EngineError};
///
/// let error = EngineError::ExternalService("search backend returned 503".into());
/// println!("Hint: {}", error.user_hint());
/// assert!(error.is_recoverable());
///
/// let fatal_error = EngineError::Config("tasks document is empty".into());
/// assert!(!fatal_error.is_recoverable());
/// ```
#[derive(Debug, Error)]
pub enum EngineError {
    // Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    // Dispatch errors
    #[error("Tool not found: {0}")]
    ToolNotFound(String),

    // Tool failures
    #[error("Retrieval failure: {0}")]
    Retrieval(String),

    #[error("Inference failure: {0}")]
    Inference(String),

    #[error("External service failure: {0}")]
    ExternalService(String),

    #[error("Tool error: {0}")]
    ToolError(String),

    // Generic IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl CrewErrorExt for EngineError {
    fn user_hint(&self) -> &str {
        match self {
            Self::Config(_) => "Check the agents, tasks and settings files for errors",
            Self::ToolNotFound(_) => "A task names a tool that is not registered",
            Self::Retrieval(_) => "An input file or model artifact could not be found",
            Self::Inference(_) => "The image could not be analysed. Try another image",
            Self::ExternalService(_) => "An online service is unavailable. Try again later",
            Self::ToolError(_) => "Tool operation failed",
            Self::Io(_) => "File system operation failed",
        }
    }

    fn is_recoverable(&self) -> bool {
        match self {
            // Non-recoverable errors
            Self::Config(_) | Self::ToolNotFound(_) => false,

            // All other errors are potentially recoverable
            _ => true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = EngineError::Retrieval("leaf.png".to_string());
        assert_eq!(err.to_string(), "Retrieval failure: leaf.png");

        let err = EngineError::ToolNotFound("Echo".to_string());
        assert_eq!(err.to_string(), "Tool not found: Echo");
    }

    #[test]
    fn test_hint_does_not_echo_payload() {
        let err = EngineError::Inference("/home/farmer/secret/leaf.png".to_string());
        assert!(!err.user_hint().contains("/home/farmer"));
    }

    #[test]
    fn test_recoverability() {
        assert!(EngineError::ExternalService("timeout".into()).is_recoverable());
        assert!(EngineError::Retrieval("missing".into()).is_recoverable());
        assert!(!EngineError::Config("bad".into()).is_recoverable());
        assert!(!EngineError::ToolNotFound("x".into()).is_recoverable());
    }

    #[test]
    fn test_io_conversion() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "gone");
        let err: EngineError = io.into();
        assert!(matches!(err, EngineError::Io(_)));
    }
}
