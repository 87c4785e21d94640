//! Runners command implementation.
//!
//! The `rehearse runners` command lists the registered runners.

use console::style;
use std::io::Write;

use crate::error::Result;
use crate::runner::{RunnerContext, RunnerRegistry};

use super::dispatcher::{Command, CommandResult};

/// The runners command implementation.
#[derive(Debug, Default)]
pub struct RunnersCommand;

impl RunnersCommand {
    pub fn new() -> Self {
        Self
    }
}

impl Command for RunnersCommand {
    fn execute(&self, out: &mut dyn Write) -> Result<CommandResult> {
        let registry = RunnerRegistry::with_builtin();
        for name in registry.names() {
            let runner = registry.create(RunnerContext::new(name))?;
            writeln!(out, "{}", style(name).bold())?;
            for command in runner.commands() {
                let note = if runner.command_is_skippable(command) {
                    style(" (skipped)").dim().to_string()
                } else {
                    String::new()
                };
                writeln!(out, "  {}{}", command, note)?;
            }
        }
        Ok(CommandResult::success())
    }
}
