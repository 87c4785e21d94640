//! Shell command execution.

pub mod command;

pub use command::{execute, execute_gated, spawn_gated, CommandOptions, CommandResult};
