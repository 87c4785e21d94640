//! A command prepared for a single dispatch.

use super::command::Command;
use super::step::Playbook;

/// One command plus its surrounding step context.
///
/// Built fresh for every dispatched instruction. `text` is only set on a
/// step's first line and `text_after` only on its last, so a runner that
/// renders prose emits each piece exactly once.
#[derive(Debug, Clone, PartialEq)]
pub struct RunCommand<'a> {
    /// The command being dispatched.
    pub command: &'a Command,

    /// Step text, present on the first line of a step.
    pub text: Option<&'a str>,

    /// Step trailing text, present on the last line of a step.
    pub text_after: Option<&'a str>,

    /// Zero-based step position.
    pub step_index: usize,

    /// Zero-based line position within the step.
    pub line_index: usize,

    /// Title of the enclosing step.
    pub step_title: &'a str,
}

impl<'a> RunCommand<'a> {
    /// Build the run command for `(step_index, line_index)`.
    ///
    /// Returns `None` if the position is outside the playbook.
    pub fn at(playbook: &'a Playbook, step_index: usize, line_index: usize) -> Option<Self> {
        let step = playbook.steps.get(step_index)?;
        let command = step.lines.get(line_index)?;
        let is_last = line_index + 1 == step.lines.len();

        Some(Self {
            command,
            text: (line_index == 0).then_some(step.text.as_str()),
            text_after: is_last.then_some(step.text_after.as_str()),
            step_index,
            line_index,
            step_title: &step.title,
        })
    }

    /// The command's instruction name.
    pub fn name(&self) -> &str {
        &self.command.name
    }

    /// Step text or the empty string.
    pub fn text_or_empty(&self) -> &str {
        self.text.unwrap_or_default()
    }

    /// Trailing step text or the empty string.
    pub fn text_after_or_empty(&self) -> &str {
        self.text_after.unwrap_or_default()
    }
}
