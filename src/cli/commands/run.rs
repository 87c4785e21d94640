//! Run command implementation.
//!
//! The `rehearse run` command loads a playbook and an environment, validates
//! the environment against the runner registry and executes the playbook.

use console::style;
use std::io::Write;

use crate::cli::args::PlaybookArgs;
use crate::config::{load_environment, load_playbook, Environment};
use crate::engine::{Engine, RunOutcome};
use crate::error::{RehearseError, Result};
use crate::playbook::Playbook;
use crate::runner::RunnerRegistry;

use super::dispatcher::{Command, CommandResult, EXIT_CONFIG, EXIT_FAILURE, EXIT_INCOMPLETE};

/// Load both files and validate the environment.
pub fn load_inputs(
    args: &PlaybookArgs,
    registry: &RunnerRegistry,
) -> Result<(Playbook, Environment)> {
    let playbook = load_playbook(&args.playbook)?;
    let environment = load_environment(&args.environment)?;
    registry.validate(&environment)?;
    Ok((playbook, environment))
}

/// Print a configuration error and return the matching exit code.
pub fn report_error(out: &mut dyn Write, error: &RehearseError) -> Result<CommandResult> {
    writeln!(out, "{} {}", style("error:").red().bold(), error)?;
    if error.is_configuration() {
        Ok(CommandResult::failure(EXIT_CONFIG))
    } else {
        Ok(CommandResult::failure(EXIT_FAILURE))
    }
}

/// The run command implementation.
pub struct RunPlaybookCommand {
    args: PlaybookArgs,
}

impl RunPlaybookCommand {
    pub fn new(args: PlaybookArgs) -> Self {
        Self { args }
    }

    /// Get the command arguments.
    pub fn args(&self) -> &PlaybookArgs {
        &self.args
    }
}

impl Command for RunPlaybookCommand {
    fn execute(&self, out: &mut dyn Write) -> Result<CommandResult> {
        let registry = RunnerRegistry::with_builtin();
        let (playbook, environment) = match load_inputs(&self.args, &registry) {
            Ok(inputs) => inputs,
            Err(e) => return report_error(out, &e),
        };

        writeln!(
            out,
            "{} {} in {}",
            style("Running").cyan().bold(),
            style(&playbook.name).bold(),
            style(&environment.name).bold()
        )?;

        let mut engine = Engine::new(environment, playbook, registry);
        match engine.run() {
            Ok(RunOutcome::Completed(stats)) => {
                writeln!(
                    out,
                    "{} {} commands run, {} skipped",
                    style("✓").green().bold(),
                    stats.dispatched,
                    stats.skipped
                )?;
                Ok(CommandResult::success())
            }
            Ok(RunOutcome::Halted {
                step,
                line,
                command,
                stats,
            }) => {
                writeln!(
                    out,
                    "{} stopped at step {}, line {}: no runner supports {} ({} commands run)",
                    style("!").yellow().bold(),
                    step + 1,
                    line + 1,
                    style(command).bold(),
                    stats.dispatched
                )?;
                Ok(CommandResult::failure(EXIT_INCOMPLETE))
            }
            Ok(RunOutcome::EnvironmentIncomplete { missing }) => {
                writeln!(
                    out,
                    "{} environment does not support: {}",
                    style("!").yellow().bold(),
                    missing.join(", ")
                )?;
                Ok(CommandResult::failure(EXIT_INCOMPLETE))
            }
            Err(e) => {
                writeln!(out, "{} {}", style("✗").red().bold(), e)?;
                if e.is_configuration() {
                    Ok(CommandResult::failure(EXIT_CONFIG))
                } else {
                    Ok(CommandResult::failure(EXIT_FAILURE))
                }
            }
        }
    }
}
