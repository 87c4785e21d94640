//! Rehearse - run playbooks against pluggable runners.
//!
//! A playbook is an ordered list of steps, each an ordered list of commands.
//! An environment names the runners that interpret those commands: the
//! `console` runner executes them, `katacoda` turns them into an interactive
//! tutorial and `wikiConsole` into asciidoc documentation.
//!
//! # Modules
//!
//! - [`assertions`] - Post-command checks and reachability polling
//! - [`cli`] - Command-line interface and argument parsing
//! - [`config`] - Playbook and environment loading and validation
//! - [`engine`] - Playbook execution and runner dispatch
//! - [`error`] - Error types and result aliases
//! - [`playbook`] - Playbook, step and command model
//! - [`process`] - Background process tracking and process-tree termination
//! - [`runner`] - The runner contract and the built-in runners
//! - [`shell`] - Shell command execution
//!
//! # Example
//!
//! ```
//! use rehearse::config::{parse_environment, parse_playbook};
//! use rehearse::engine::Engine;
//! use rehearse::runner::RunnerRegistry;
//! use std::path::Path;
//!
//! let playbook = parse_playbook(
//!     "steps:\n  - lines:\n      - name: runServerJava\n",
//!     Path::new("demo.yml"),
//! )
//! .unwrap();
//! let environment = parse_environment(
//!     "runners:\n  - name: wikiConsole\n",
//!     Path::new("docs.yml"),
//! )
//! .unwrap();
//!
//! let mut engine = Engine::new(environment, playbook, RunnerRegistry::with_builtin());
//! assert!(!engine.is_environment_complete().unwrap());
//! ```

pub mod assertions;
pub mod cli;
pub mod config;
pub mod engine;
pub mod error;
pub mod playbook;
pub mod process;
pub mod runner;
pub mod shell;

pub use error::{RehearseError, Result};
