//! Load-time validation of an environment against the runner registry.
//!
//! - The runner list must not be empty
//! - Every runner name must be registered
//! - A runner may appear only once

use crate::config::environment::Environment;
use crate::error::{RehearseError, Result};
use crate::runner::RunnerRegistry;
use std::collections::HashSet;

/// Validation error with context.
#[derive(Debug, Clone)]
pub struct ValidationError {
    /// Rule identifier
    pub rule: String,
    /// Human-readable error message
    pub message: String,
    /// Runner name if error is runner-specific
    pub runner: Option<String>,
}

/// Validate an environment and return all errors.
pub fn validate_environment(
    environment: &Environment,
    registry: &RunnerRegistry,
) -> Vec<ValidationError> {
    let mut errors = Vec::new();

    if environment.runners.is_empty() {
        errors.push(ValidationError {
            rule: "no-runners".to_string(),
            message: format!("Environment '{}' has no runners", environment.name),
            runner: None,
        });
    }

    let mut seen = HashSet::new();
    for spec in &environment.runners {
        if !registry.contains(&spec.name) {
            errors.push(ValidationError {
                rule: "unknown-runner".to_string(),
                message: format!("Runner '{}' is not registered", spec.name),
                runner: Some(spec.name.clone()),
            });
        }
        if !seen.insert(spec.key()) {
            errors.push(ValidationError {
                rule: "duplicate-runner".to_string(),
                message: format!("Runner '{}' is listed more than once", spec.name),
                runner: Some(spec.name.clone()),
            });
        }
    }

    errors
}

/// Validate an environment, returning an error if invalid.
///
/// When the only problems are unregistered names the error is
/// `UnknownRunner`; otherwise all messages are joined into one
/// `ConfigValidationError`.
pub fn validate(environment: &Environment, registry: &RunnerRegistry) -> Result<()> {
    let errors = validate_environment(environment, registry);

    if errors.is_empty() {
        return Ok(());
    }

    if errors.iter().all(|e| e.rule == "unknown-runner") {
        let names: Vec<_> = errors.iter().filter_map(|e| e.runner.clone()).collect();
        return Err(RehearseError::UnknownRunner {
            name: names.join(", "),
        });
    }

    let messages: Vec<_> = errors.iter().map(|e| e.message.clone()).collect();
    Err(RehearseError::ConfigValidationError {
        message: messages.join("; "),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtin_runners_validate() {
        let env = Environment::new("local", &["console", "Katacoda", "wikiConsole"]);
        assert!(validate(&env, &RunnerRegistry::with_builtin()).is_ok());
    }

    #[test]
    fn unknown_runner_fails_fast() {
        let env = Environment::new("local", &["console", "vagrant"]);
        let err = validate(&env, &RunnerRegistry::with_builtin()).unwrap_err();
        match err {
            RehearseError::UnknownRunner { name } => assert_eq!(name, "vagrant"),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn problems_are_collected() {
        let env = Environment::new("local", &["console", "CONSOLE", "vagrant"]);
        let errors = validate_environment(&env, &RunnerRegistry::with_builtin());
        assert_eq!(errors.len(), 2);

        let err = validate(&env, &RunnerRegistry::with_builtin()).unwrap_err();
        assert!(matches!(err, RehearseError::ConfigValidationError { .. }));
        assert!(err.to_string().contains("vagrant"));
    }

    #[test]
    fn empty_runner_list_is_invalid() {
        let env = Environment::new("bare", &[]);
        let errors = validate_environment(&env, &RunnerRegistry::with_builtin());
        assert!(errors.iter().any(|e| e.rule == "no-runners"));
    }
}
