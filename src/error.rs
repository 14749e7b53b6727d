//! Error types for procrun
//!
//! Only launch-time problems are errors. Once a process is running, every
//! failure is absorbed into the [`ProcessResult`](crate::ProcessResult) state.

use std::io;

use serde::Serialize;
use thiserror::Error;

/// Main error type for command execution
#[derive(Error, Debug)]
pub enum ExecError {
    /// The OS refused or failed to create the process
    #[error("Failed to spawn command: {command}")]
    SpawnFailed {
        command: String,
        error: String,
        suggestion: Option<String>,
    },

    /// The invocation could not be turned into a command line
    #[error("Invalid command: {0}")]
    InvalidCommand(String),

    /// No tokio runtime was available to drive a detached invocation
    #[error("Runtime error: {0}")]
    Runtime(String),

    /// A configuration source could not be read or parsed
    #[error("Configuration error: {0}")]
    Config(String),
}

impl ExecError {
    /// Build a `SpawnFailed` error from the OS error returned by spawn
    pub fn spawn_failed(command: impl Into<String>, err: &io::Error) -> Self {
        ExecError::SpawnFailed {
            command: command.into(),
            error: err.to_string(),
            suggestion: suggest_fix(err),
        }
    }

    /// Whether this is a launch failure (as opposed to a bad descriptor)
    pub fn is_launch_failure(&self) -> bool {
        matches!(self, ExecError::SpawnFailed { .. })
    }
}

/// Serializable error info for JSON output
#[derive(Debug, Serialize, Clone)]
pub struct ErrorInfo {
    pub message: String,
    pub error_type: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub suggestion: Option<String>,
}

impl From<&ExecError> for ErrorInfo {
    fn from(err: &ExecError) -> Self {
        match err {
            ExecError::SpawnFailed {
                command,
                error,
                suggestion,
            } => ErrorInfo {
                message: format!("Failed to spawn command: {}: {}", command, error),
                error_type: "spawn_failed".to_string(),
                suggestion: suggestion.clone(),
            },
            ExecError::InvalidCommand(msg) => ErrorInfo {
                message: format!("Invalid command: {}", msg),
                error_type: "invalid_command".to_string(),
                suggestion: Some("Check quoting, or pass --shell to run the string through a shell".to_string()),
            },
            ExecError::Runtime(msg) => ErrorInfo {
                message: format!("Runtime error: {}", msg),
                error_type: "runtime_error".to_string(),
                suggestion: Some("Detached commands must be started from inside a tokio runtime".to_string()),
            },
            ExecError::Config(msg) => ErrorInfo {
                message: format!("Configuration error: {}", msg),
                error_type: "config_error".to_string(),
                suggestion: Some("Check your procrun configuration file".to_string()),
            },
        }
    }
}

/// Suggest fixes for common launch failures
pub fn suggest_fix(err: &io::Error) -> Option<String> {
    match err.kind() {
        io::ErrorKind::NotFound => Some(
            "Program or working directory not found. Check the path and your PATH variable."
                .to_string(),
        ),
        io::ErrorKind::PermissionDenied => Some(
            "Permission denied. Check that the program is executable and readable.".to_string(),
        ),
        io::ErrorKind::InvalidInput => {
            Some("Invalid program name or arguments (embedded NUL byte?).".to_string())
        }
        _ => None,
    }
}
