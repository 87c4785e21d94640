//! Check command implementation.
//!
//! The `rehearse check` command reports whether an environment supports
//! every command of a playbook, without running anything.

use console::style;
use std::io::Write;

use crate::cli::args::PlaybookArgs;
use crate::engine::Engine;
use crate::error::Result;
use crate::runner::RunnerRegistry;

use super::dispatcher::{Command, CommandResult, EXIT_FAILURE};
use super::run::{load_inputs, report_error};

/// The check command implementation.
pub struct CheckCommand {
    args: PlaybookArgs,
}

impl CheckCommand {
    pub fn new(args: PlaybookArgs) -> Self {
        Self { args }
    }
}

impl Command for CheckCommand {
    fn execute(&self, out: &mut dyn Write) -> Result<CommandResult> {
        let registry = RunnerRegistry::with_builtin();
        let (playbook, environment) = match load_inputs(&self.args, &registry) {
            Ok(inputs) => inputs,
            Err(e) => return report_error(out, &e),
        };
        let environment_name = environment.name.clone();

        let mut engine = Engine::new(environment, playbook, registry);
        let missing = match engine.missing_commands() {
            Ok(missing) => missing,
            Err(e) => return report_error(out, &e),
        };

        if missing.is_empty() {
            writeln!(
                out,
                "{} {} supports every command",
                style("✓").green().bold(),
                style(&environment_name).bold()
            )?;
            return Ok(CommandResult::success());
        }

        writeln!(
            out,
            "{} {} does not support:",
            style("✗").red().bold(),
            style(&environment_name).bold()
        )?;
        for name in &missing {
            writeln!(out, "  - {}", name)?;
        }
        Ok(CommandResult::failure(EXIT_FAILURE))
    }
}
