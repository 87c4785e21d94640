//! State handed to every runner at construction.

use serde_json::Value;
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::{Arc, Mutex, MutexGuard};

use crate::config::Directories;

/// Variable holding the resolved workspace directory.
pub const WORKSPACE_DIRECTORY: &str = "workspaceDirectory";

/// Variable store shared by all runners of one engine run.
///
/// Cloning yields another handle to the same store.
#[derive(Debug, Clone, Default)]
pub struct Variables {
    inner: Arc<Mutex<HashMap<String, Value>>>,
}

impl Variables {
    /// An empty store.
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, Value>> {
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Value of `name`, if set.
    pub fn get(&self, name: &str) -> Option<Value> {
        self.lock().get(name).cloned()
    }

    /// String value of `name`, if set to a string.
    pub fn get_str(&self, name: &str) -> Option<String> {
        self.get(name).and_then(|v| v.as_str().map(str::to_string))
    }

    /// Set `name` to `value`, replacing any earlier value.
    pub fn set(&self, name: impl Into<String>, value: impl Into<Value>) {
        self.lock().insert(name.into(), value.into());
    }

    /// Number of variables set.
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    /// Whether no variable is set.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Identity and shared state of one runner instance.
#[derive(Debug, Clone)]
pub struct RunnerContext {
    /// Runner name as configured.
    pub name: String,

    /// Load path from the environment.
    pub path: String,

    /// Name of the playbook being run.
    pub playbook_name: String,

    /// Title of the playbook being run.
    pub playbook_title: String,

    /// Directory of the playbook file.
    pub playbook_path: PathBuf,

    /// The run's shared variables.
    pub variables: Variables,

    /// Environment directories.
    pub directories: Directories,
}

impl RunnerContext {
    /// Context with default directories and fresh variables.
    pub fn new(name: impl Into<String>) -> Self {
        let name = name.into();
        Self {
            path: name.clone(),
            name,
            playbook_name: String::new(),
            playbook_title: String::new(),
            playbook_path: PathBuf::from("."),
            variables: Variables::new(),
            directories: Directories::default(),
        }
    }

    /// Shorthand for `variables.get`.
    pub fn get_variable(&self, name: &str) -> Option<Value> {
        self.variables.get(name)
    }

    /// Shorthand for `variables.set`.
    pub fn set_variable(&self, name: impl Into<String>, value: impl Into<Value>) {
        self.variables.set(name, value);
    }

    /// The workspace directory set by an `init`, or the working directory.
    pub fn workspace(&self) -> PathBuf {
        self.variables
            .get_str(WORKSPACE_DIRECTORY)
            .map(PathBuf::from)
            .unwrap_or_else(|| self.directories.working.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn clones_share_one_store() {
        let vars = Variables::new();
        let other = vars.clone();
        other.set("answer", 42);
        assert_eq!(vars.get("answer"), Some(json!(42)));
        assert_eq!(vars.len(), 1);
    }

    #[test]
    fn missing_variable_is_none() {
        let vars = Variables::new();
        assert!(vars.get("nope").is_none());
        assert!(vars.is_empty());
    }

    #[test]
    fn workspace_falls_back_to_working_directory() {
        let ctx = RunnerContext::new("console");
        assert_eq!(ctx.workspace(), PathBuf::from("build/working"));
        ctx.set_variable(WORKSPACE_DIRECTORY, "/tmp/ws");
        assert_eq!(ctx.workspace(), PathBuf::from("/tmp/ws"));
    }
}
