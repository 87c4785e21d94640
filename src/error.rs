//! Error types for rehearse operations.
//!
//! This module defines [`RehearseError`], the primary error type used
//! throughout the crate, and a [`Result`] type alias for convenience.
//!
//! # Error Handling Strategy
//!
//! - Configuration errors (bad files, unknown runners, missing command
//!   arguments) fail fast, before any side effect.
//! - Execution errors raised by a runner's `run` are captured into the
//!   instruction's [`RunResult`](crate::playbook::RunResult) and never
//!   propagated by the engine.
//! - Assertion and environment errors are surfaced to the engine's caller.

use std::path::PathBuf;
use thiserror::Error;

/// Core error type for rehearse operations.
#[derive(Debug, Error)]
pub enum RehearseError {
    /// Configuration file not found at expected location.
    #[error("Configuration not found: {path}")]
    ConfigNotFound { path: PathBuf },

    /// Failed to parse a playbook or environment file.
    #[error("Failed to parse config at {path}: {message}")]
    ConfigParseError { path: PathBuf, message: String },

    /// Invalid configuration structure or values.
    #[error("Invalid configuration: {message}")]
    ConfigValidationError { message: String },

    /// The environment names a runner that is not registered.
    #[error("Unknown runner: {name}")]
    UnknownRunner { name: String },

    /// An instruction was given missing or malformed arguments.
    #[error("Missing arguments for command {command}: {message}")]
    MissingArgument { command: String, message: String },

    /// No configured runner supports some of the playbook's commands.
    #[error("Environment incomplete: {environment} (unsupported: {})", .missing.join(", "))]
    EnvironmentIncomplete {
        environment: String,
        missing: Vec<String>,
    },

    /// Shell command failed.
    #[error("Command failed with exit code {code:?}: {command}")]
    CommandFailed { command: String, code: Option<i32> },

    /// Validation inside a runner's `assert` failed.
    #[error("Assertion failed for {command}: {message}")]
    AssertionFailed { command: String, message: String },

    /// An endpoint did not become reachable within its startup budget.
    #[error("The server has not become reachable in {seconds} seconds: {url}")]
    Unreachable { url: String, seconds: u64 },

    /// IO error wrapper.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Generic wrapped error for anyhow interop.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl RehearseError {
    /// Shorthand for an assertion failure.
    pub fn assertion(command: impl Into<String>, message: impl Into<String>) -> Self {
        Self::AssertionFailed {
            command: command.into(),
            message: message.into(),
        }
    }

    /// Shorthand for a missing-argument failure.
    pub fn missing_argument(command: impl Into<String>, message: impl Into<String>) -> Self {
        Self::MissingArgument {
            command: command.into(),
            message: message.into(),
        }
    }

    /// Whether this error belongs to the configuration class.
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            Self::ConfigNotFound { .. }
                | Self::ConfigParseError { .. }
                | Self::ConfigValidationError { .. }
                | Self::UnknownRunner { .. }
                | Self::MissingArgument { .. }
        )
    }
}

/// Result type alias for rehearse operations.
pub type Result<T> = std::result::Result<T, RehearseError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_not_found_displays_path() {
        let err = RehearseError::ConfigNotFound {
            path: PathBuf::from("/foo/playbook.yml"),
        };
        assert!(err.to_string().contains("/foo/playbook.yml"));
    }

    #[test]
    fn config_parse_error_displays_path_and_message() {
        let err = RehearseError::ConfigParseError {
            path: PathBuf::from("/env.yml"),
            message: "invalid syntax".into(),
        };
        let msg = err.to_string();
        assert!(msg.contains("/env.yml"));
        assert!(msg.contains("invalid syntax"));
    }

    #[test]
    fn unknown_runner_displays_name() {
        let err = RehearseError::UnknownRunner {
            name: "vscode".into(),
        };
        assert!(err.to_string().contains("vscode"));
    }

    #[test]
    fn environment_incomplete_lists_missing_commands() {
        let err = RehearseError::EnvironmentIncomplete {
            environment: "ci".into(),
            missing: vec!["buildJava".into(), "npmInstall".into()],
        };
        let msg = err.to_string();
        assert!(msg.contains("ci"));
        assert!(msg.contains("buildJava, npmInstall"));
    }

    #[test]
    fn unreachable_displays_url_and_budget() {
        let err = RehearseError::Unreachable {
            url: "http://localhost:8081/api".into(),
            seconds: 600,
        };
        let msg = err.to_string();
        assert!(msg.contains("600 seconds"));
        assert!(msg.contains("http://localhost:8081/api"));
    }

    #[test]
    fn command_failed_displays_command_and_code() {
        let err = RehearseError::CommandFailed {
            command: "npm install".into(),
            code: Some(1),
        };
        let msg = err.to_string();
        assert!(msg.contains("npm install"));
        assert!(msg.contains("1"));
    }

    #[test]
    fn configuration_errors_are_classified() {
        assert!(RehearseError::missing_argument("runServerJava", "no port").is_configuration());
        assert!(RehearseError::UnknownRunner { name: "x".into() }.is_configuration());
        assert!(!RehearseError::assertion("createFile", "missing").is_configuration());
    }

    #[test]
    fn io_error_converts_from_std() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file missing");
        let err: RehearseError = io_err.into();
        assert!(matches!(err, RehearseError::Io(_)));
    }
}
