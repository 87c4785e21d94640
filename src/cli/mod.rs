//! Command-line interface for rehearse.
//!
//! - [`args`] - Argument definitions using clap derive macros
//! - [`commands`] - Command implementations

pub mod args;
pub mod commands;

pub use args::{Cli, Commands, PlaybookArgs};
pub use commands::{Command, CommandDispatcher, CommandResult};
