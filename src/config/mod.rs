//! Playbook and environment loading, and environment validation.
//!
//! - The environment model in [`environment`]
//! - YAML file loading in [`loader`]
//! - Validation against the runner registry in [`validator`]
//!
//! # Example
//!
//! ```
//! use rehearse::config::{parse_environment, validate};
//! use rehearse::runner::RunnerRegistry;
//! use std::path::Path;
//!
//! let env = parse_environment("runners:\n  - name: console\n", Path::new("local.yml")).unwrap();
//! validate(&env, &RunnerRegistry::with_builtin()).unwrap();
//! assert_eq!(env.name, "local");
//! ```

pub mod environment;
pub mod loader;
pub mod validator;

pub use environment::{Directories, Environment, RunnerSpec};
pub use loader::{load_environment, load_playbook, parse_environment, parse_playbook};
pub use validator::{validate, validate_environment, ValidationError};
