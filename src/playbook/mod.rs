//! Playbook data model.
//!
//! - [`Playbook`] / [`Step`] / [`Command`] - the immutable script
//! - [`RunCommand`] - one command with its step context, built per dispatch
//! - [`RunResult`] - the mutable outcome of one dispatched command

pub mod command;
pub mod run_command;
pub mod run_result;
pub mod step;

pub use command::Command;
pub use run_command::RunCommand;
pub use run_result::RunResult;
pub use step::{Playbook, Step};
