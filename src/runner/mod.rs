//! The runner contract and the built-in runners.
//!
//! A runner interprets playbook commands for one execution mode:
//! [`console`] executes them, [`katacoda`] renders them into a tutorial and
//! [`wiki`] renders them into asciidoc documentation. The engine drives every
//! runner through the same lifecycle:
//!
//! 1. `init` once, before the first step
//! 2. for each claimed command: `run`, then `assert`
//! 3. `destroy` once, after the last step or an early stop

pub mod console;
pub mod context;
pub mod katacoda;
pub mod registry;
pub mod wiki;

pub use context::{RunnerContext, Variables, WORKSPACE_DIRECTORY};
pub use registry::{RunnerFactory, RunnerRegistry};

use crate::error::Result;
use crate::playbook::{Playbook, RunCommand, RunResult};

/// Capability set implemented by each backend.
pub trait Runner {
    /// Configured name of this runner.
    fn name(&self) -> &str;

    /// Command names this runner claims.
    fn commands(&self) -> &[&'static str] {
        &[]
    }

    /// Whether this runner handles `command`. Must be deterministic.
    fn supports(&self, command: &str) -> bool {
        self.commands().contains(&command)
    }

    /// Whether a claimed `command` is a no-op for this runner.
    fn command_is_skippable(&self, _command: &str) -> bool {
        false
    }

    /// Set up before the first step.
    fn init(&mut self, playbook: &Playbook) -> Result<()>;

    /// Tear down after the last step.
    fn destroy(&mut self, playbook: &Playbook) -> Result<()>;

    /// Perform the command's effect.
    ///
    /// An `Err` is captured into the result by the engine; it does not stop
    /// the run.
    fn run(&mut self, command: &RunCommand<'_>) -> Result<RunResult>;

    /// Validate the command's effect.
    ///
    /// On failure a runner cleans up whatever it started before returning
    /// the error, which then ends the run.
    fn assert(&mut self, command: &RunCommand<'_>, result: &RunResult) -> Result<()>;

    /// The environment-aware extension, if this runner implements it.
    fn environment_aware(&mut self) -> Option<&mut dyn EnvironmentAware> {
        None
    }
}

/// Optional extension for runners whose output depends on the environment.
pub trait EnvironmentAware {
    /// Receive the environment name before `init`.
    fn set_environment(&mut self, environment: &str);
}
