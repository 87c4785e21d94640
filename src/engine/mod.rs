//! Playbook execution.
//!
//! The [`Engine`] drives one playbook to completion against one environment:
//!
//! 1. Check that every command is claimed by some configured runner
//! 2. `init` every runner
//! 3. Dispatch each command to the first runner that supports it
//! 4. `destroy` every runner, once, however the dispatch loop ended
//!
//! Runner support is treated as fixed for the duration of a run, so the
//! completeness check and the dispatch loop agree on which runner handles
//! which command.

pub mod outcome;
pub mod pool;

pub use outcome::{RunOutcome, RunStats};
pub use pool::RunnerPool;

use tracing::{debug, error, info, warn};

use crate::config::Environment;
use crate::error::{RehearseError, Result};
use crate::playbook::{Playbook, RunCommand, RunResult};
use crate::runner::{RunnerRegistry, Variables};

/// Runs one playbook against one environment, once.
pub struct Engine {
    environment: Environment,
    playbook: Playbook,
    pool: RunnerPool,
}

impl Engine {
    /// Engine over `environment` whose runners come from `registry`.
    pub fn new(environment: Environment, playbook: Playbook, registry: RunnerRegistry) -> Self {
        let pool = RunnerPool::new(
            registry,
            environment.runners.clone(),
            environment.directories.clone(),
            environment.name.clone(),
        );
        Self {
            environment,
            playbook,
            pool,
        }
    }

    /// The environment this engine runs against.
    pub fn environment(&self) -> &Environment {
        &self.environment
    }

    /// The playbook this engine runs.
    pub fn playbook(&self) -> &Playbook {
        &self.playbook
    }

    /// The run's shared variables.
    pub fn variables(&self) -> &Variables {
        self.pool.variables()
    }

    /// Command names no configured runner supports, sorted.
    pub fn missing_commands(&mut self) -> Result<Vec<String>> {
        let mut missing = Vec::new();
        for name in self.playbook.command_names() {
            if self.pool.find_supporting(name, &self.playbook)?.is_none() {
                missing.push(name.to_string());
            }
        }
        Ok(missing)
    }

    /// Whether every command of the playbook is supported by some runner.
    pub fn is_environment_complete(&mut self) -> Result<bool> {
        Ok(self.missing_commands()?.is_empty())
    }

    /// Run the playbook.
    ///
    /// Returns `Err` for an incomplete environment marked fail-on-incomplete,
    /// for a failed `init`, and for a failed assertion. Execution errors
    /// raised by `run` are captured into the command's [`RunResult`] instead.
    pub fn run(&mut self) -> Result<RunOutcome> {
        info!(
            environment = %self.environment.name,
            playbook = %self.playbook.name,
            commands = self.playbook.command_count(),
            "starting run"
        );

        let missing = self.missing_commands()?;
        if !missing.is_empty() {
            if self.environment.fail_on_incomplete {
                error!(environment = %self.environment.name, ?missing, "environment incomplete");
                return Err(RehearseError::EnvironmentIncomplete {
                    environment: self.environment.name.clone(),
                    missing,
                });
            }
            warn!(environment = %self.environment.name, ?missing, "environment incomplete, nothing is run");
            return Ok(RunOutcome::EnvironmentIncomplete { missing });
        }

        self.init_all()?;
        let dispatched = self.dispatch_all();
        let destroyed = self.destroy_all(self.pool.len());

        match dispatched {
            Ok(outcome) => destroyed.map(|_| outcome),
            Err(e) => Err(e),
        }
    }

    fn init_all(&mut self) -> Result<()> {
        for index in 0..self.pool.len() {
            let Some(runner) = self.pool.get(index, &self.playbook)? else {
                continue;
            };
            debug!(runner = %runner.name(), "init");
            if let Err(e) = runner.init(&self.playbook) {
                error!(runner = %runner.name(), error = %e, "runner init failed");
                // Runners set up so far still get their teardown.
                if let Err(destroy_error) = self.destroy_all(index) {
                    warn!(error = %destroy_error, "teardown after failed init also failed");
                }
                return Err(e);
            }
        }
        Ok(())
    }

    /// Destroy the first `count` runners, returning the first error.
    fn destroy_all(&mut self, count: usize) -> Result<()> {
        let mut first_error = None;
        for index in 0..count {
            if !self.pool.is_loaded(index) {
                continue;
            }
            if let Some(runner) = self.pool.get(index, &self.playbook)? {
                debug!(runner = %runner.name(), "destroy");
                if let Err(e) = runner.destroy(&self.playbook) {
                    warn!(runner = %runner.name(), error = %e, "runner destroy failed");
                    first_error.get_or_insert(e);
                }
            }
        }
        match first_error {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    fn dispatch_all(&mut self) -> Result<RunOutcome> {
        let mut stats = RunStats::default();

        for (step_index, step) in self.playbook.steps.iter().enumerate() {
            for line_index in 0..step.lines.len() {
                let Some(command) = RunCommand::at(&self.playbook, step_index, line_index) else {
                    continue;
                };
                let name = command.name();

                let Some(index) = self.pool.find_supporting(name, &self.playbook)? else {
                    warn!(step = step_index, line = line_index, command = %name, "no runner supports command, stopping");
                    return Ok(RunOutcome::Halted {
                        step: step_index,
                        line: line_index,
                        command: name.to_string(),
                        stats,
                    });
                };
                let Some(runner) = self.pool.get(index, &self.playbook)? else {
                    continue;
                };

                if runner.command_is_skippable(name) {
                    info!(step = step_index, line = line_index, command = %name, runner = %runner.name(), "skipped");
                    stats.skipped += 1;
                    continue;
                }

                debug!(step = step_index, line = line_index, command = %name, runner = %runner.name(), "dispatch");
                let result = runner.run(&command).unwrap_or_else(|e| {
                    warn!(step = step_index, line = line_index, command = %name, error = %e, "command raised an error");
                    let mut result = RunResult::new();
                    result.capture(e);
                    result
                });

                if let Err(e) = runner.assert(&command, &result) {
                    error!(step = step_index, line = line_index, command = %name, error = %e, "assertion failed");
                    return Err(e);
                }
                stats.dispatched += 1;
            }
        }

        Ok(RunOutcome::Completed(stats))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::playbook::{Command, Step};

    fn playbook(names: &[&str]) -> Playbook {
        Playbook {
            name: "test".into(),
            steps: vec![Step {
                lines: names.iter().map(|n| Command::new(*n, vec![])).collect(),
                ..Default::default()
            }],
            ..Default::default()
        }
    }

    #[test]
    fn missing_commands_are_reported() {
        let env = Environment::new("local", &["wikiConsole"]);
        let mut engine = Engine::new(env, playbook(&["createFolder", "runServerJava"]), RunnerRegistry::with_builtin());
        assert_eq!(engine.missing_commands().unwrap(), vec!["runServerJava".to_string()]);
        assert!(!engine.is_environment_complete().unwrap());
    }

    #[test]
    fn incomplete_environment_without_flag_runs_nothing() {
        let env = Environment::new("local", &["wikiConsole"]);
        let mut engine = Engine::new(env, playbook(&["runServerJava"]), RunnerRegistry::with_builtin());
        let outcome = engine.run().unwrap();
        assert_eq!(
            outcome,
            RunOutcome::EnvironmentIncomplete {
                missing: vec!["runServerJava".into()]
            }
        );
    }

    #[test]
    fn incomplete_environment_with_flag_fails() {
        let env = Environment::new("local", &["wikiConsole"]).fail_on_incomplete(true);
        let mut engine = Engine::new(env, playbook(&["runServerJava"]), RunnerRegistry::with_builtin());
        let err = engine.run().unwrap_err();
        assert!(matches!(err, RehearseError::EnvironmentIncomplete { .. }));
    }
}
