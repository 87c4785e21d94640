//! Playbook and step definitions.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::path::PathBuf;

use super::command::Command;

/// One step of a playbook: a title, surrounding prose and its commands.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Step {
    /// Step title; may be empty.
    #[serde(default)]
    pub title: String,

    /// Text shown before the step's first command.
    #[serde(default)]
    pub text: String,

    /// Text shown after the step's last command.
    #[serde(default)]
    pub text_after: String,

    /// Ordered commands ("lines") of this step.
    #[serde(default)]
    pub lines: Vec<Command>,
}

/// An ordered script of steps. Read-only once execution starts.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Playbook {
    /// Short identifier, used in output paths.
    #[serde(default)]
    pub name: String,

    /// Human-readable title.
    #[serde(default)]
    pub title: String,

    /// Introductory description.
    #[serde(default)]
    pub description: String,

    /// Directory the playbook was loaded from; content files resolve against it.
    #[serde(skip)]
    pub path: PathBuf,

    /// Ordered steps.
    #[serde(default)]
    pub steps: Vec<Step>,
}

impl Playbook {
    /// Iterate over `(step_index, line_index, command)` in execution order.
    pub fn commands(&self) -> impl Iterator<Item = (usize, usize, &Command)> {
        self.steps.iter().enumerate().flat_map(|(step_index, step)| {
            step.lines
                .iter()
                .enumerate()
                .map(move |(line_index, command)| (step_index, line_index, command))
        })
    }

    /// Distinct command names used anywhere in the playbook.
    pub fn command_names(&self) -> BTreeSet<&str> {
        self.commands().map(|(_, _, c)| c.name.as_str()).collect()
    }

    /// Total number of commands.
    pub fn command_count(&self) -> usize {
        self.steps.iter().map(|s| s.lines.len()).sum()
    }
}
