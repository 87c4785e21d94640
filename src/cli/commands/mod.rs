//! CLI command implementations.
//!
//! Each command implements the [`Command`] trait, which provides a uniform
//! interface for executing commands and reporting results. Commands are
//! dispatched via [`CommandDispatcher`].

pub mod check;
pub mod dispatcher;
pub mod run;
pub mod runners;

pub use dispatcher::{
    Command, CommandDispatcher, CommandResult, EXIT_CONFIG, EXIT_FAILURE, EXIT_INCOMPLETE,
};
