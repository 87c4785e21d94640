//! Lazily constructed, memoised runner instances.

use std::collections::HashMap;
use tracing::debug;

use crate::config::{Directories, RunnerSpec};
use crate::error::Result;
use crate::playbook::Playbook;
use crate::runner::{Runner, RunnerContext, RunnerRegistry, Variables};

/// The configured runners of one engine, created on first use.
///
/// Each configured name maps to at most one instance for the pool's life.
pub struct RunnerPool {
    registry: RunnerRegistry,
    specs: Vec<RunnerSpec>,
    directories: Directories,
    environment: String,
    variables: Variables,
    runners: HashMap<String, Box<dyn Runner>>,
}

impl RunnerPool {
    pub fn new(
        registry: RunnerRegistry,
        specs: Vec<RunnerSpec>,
        directories: Directories,
        environment: String,
    ) -> Self {
        Self {
            registry,
            specs,
            directories,
            environment,
            variables: Variables::new(),
            runners: HashMap::new(),
        }
    }

    /// Shared variable store handed to every runner.
    pub fn variables(&self) -> &Variables {
        &self.variables
    }

    /// Number of configured runners.
    pub fn len(&self) -> usize {
        self.specs.len()
    }

    /// Whether no runner is configured.
    pub fn is_empty(&self) -> bool {
        self.specs.is_empty()
    }

    /// Registry key of the configured runner at `index`.
    pub fn key(&self, index: usize) -> Option<String> {
        self.specs.get(index).map(RunnerSpec::key)
    }

    /// Whether the runner at `index` has been constructed.
    pub fn is_loaded(&self, index: usize) -> bool {
        self.key(index)
            .is_some_and(|key| self.runners.contains_key(&key))
    }

    /// The runner at `index`, constructing it on first access.
    pub fn get(&mut self, index: usize, playbook: &Playbook) -> Result<Option<&mut Box<dyn Runner>>> {
        let Some(spec) = self.specs.get(index) else {
            return Ok(None);
        };
        let key = spec.key();

        if !self.runners.contains_key(&key) {
            let context = RunnerContext {
                name: spec.name.clone(),
                path: spec.load_path().to_string(),
                playbook_name: playbook.name.clone(),
                playbook_title: playbook.title.clone(),
                playbook_path: playbook.path.clone(),
                variables: self.variables.clone(),
                directories: self.directories.clone(),
            };
            let mut runner = self.registry.create(context)?;
            if let Some(aware) = runner.environment_aware() {
                aware.set_environment(&self.environment);
            }
            debug!(runner = %spec.name, path = %spec.load_path(), "runner loaded");
            self.runners.insert(key.clone(), runner);
        }

        Ok(self.runners.get_mut(&key))
    }

    /// Index of the first configured runner that supports `command`.
    pub fn find_supporting(&mut self, command: &str, playbook: &Playbook) -> Result<Option<usize>> {
        for index in 0..self.specs.len() {
            if let Some(runner) = self.get(index, playbook)? {
                if runner.supports(command) {
                    return Ok(Some(index));
                }
            }
        }
        Ok(None)
    }
}
