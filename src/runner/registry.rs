//! Static mapping from runner name to constructor.

use std::collections::BTreeMap;
use std::fmt;

use super::context::RunnerContext;
use super::Runner;
use crate::config::{self, Environment};
use crate::error::{RehearseError, Result};

/// Builds a runner from its context.
pub type RunnerFactory = Box<dyn Fn(RunnerContext) -> Result<Box<dyn Runner>>>;

/// Registered runner constructors, keyed by lowercase name.
///
/// Populated once at startup; lookups are case-insensitive.
#[derive(Default)]
pub struct RunnerRegistry {
    factories: BTreeMap<String, RunnerFactory>,
}

impl fmt::Debug for RunnerRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RunnerRegistry")
            .field("runners", &self.factories.keys().collect::<Vec<_>>())
            .finish()
    }
}

impl RunnerRegistry {
    /// An empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with the `console`, `katacoda` and `wikiConsole` runners.
    pub fn with_builtin() -> Self {
        let mut registry = Self::new();
        registry.register("console", |ctx| {
            Ok(Box::new(super::console::ConsoleRunner::new(ctx)) as Box<dyn Runner>)
        });
        registry.register("katacoda", |ctx| {
            Ok(Box::new(super::katacoda::KatacodaRunner::new(ctx)) as Box<dyn Runner>)
        });
        registry.register("wikiConsole", |ctx| {
            Ok(Box::new(super::wiki::WikiConsoleRunner::new(ctx)) as Box<dyn Runner>)
        });
        registry
    }

    /// Register `factory` under `name`, replacing an earlier registration.
    pub fn register<F>(&mut self, name: &str, factory: F)
    where
        F: Fn(RunnerContext) -> Result<Box<dyn Runner>> + 'static,
    {
        self.factories.insert(name.to_lowercase(), Box::new(factory));
    }

    /// Whether `name` is registered.
    pub fn contains(&self, name: &str) -> bool {
        self.factories.contains_key(&name.to_lowercase())
    }

    /// Registered names, lowercase and sorted.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.factories.keys().map(String::as_str)
    }

    /// Construct the runner named in `context`.
    pub fn create(&self, context: RunnerContext) -> Result<Box<dyn Runner>> {
        let factory = self
            .factories
            .get(&context.name.to_lowercase())
            .ok_or_else(|| RehearseError::UnknownRunner {
                name: context.name.clone(),
            })?;
        factory(context)
    }

    /// Check `environment` against this registry.
    pub fn validate(&self, environment: &Environment) -> Result<()> {
        config::validate(environment, self)
    }
}
