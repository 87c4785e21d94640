//! The environment a playbook runs against.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Static configuration naming the active runners for one execution.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Environment {
    /// Environment name. Defaults to the file stem when loaded from disk.
    pub name: String,

    /// Whether an unsupported playbook command is a hard error.
    pub fail_on_incomplete: bool,

    /// Active runners, in dispatch order.
    pub runners: Vec<RunnerSpec>,

    /// Directories runners work in.
    pub directories: Directories,
}

impl Environment {
    /// Environment with the given runners and default directories.
    pub fn new(name: impl Into<String>, runners: &[&str]) -> Self {
        Self {
            name: name.into(),
            runners: runners.iter().map(|r| RunnerSpec::new(*r)).collect(),
            ..Default::default()
        }
    }

    /// Make the environment fatal on unsupported commands.
    pub fn fail_on_incomplete(mut self, fail: bool) -> Self {
        self.fail_on_incomplete = fail;
        self
    }

    /// Runner names in dispatch order.
    pub fn runner_names(&self) -> impl Iterator<Item = &str> {
        self.runners.iter().map(|r| r.name.as_str())
    }
}

/// One runner entry: a name plus the path it is loaded from.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RunnerSpec {
    /// Registered runner name (case-insensitive).
    pub name: String,

    /// Load path. Defaults to the name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
}

impl RunnerSpec {
    /// Entry whose path is its name.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            path: None,
        }
    }

    /// Lookup key in the runner registry.
    pub fn key(&self) -> String {
        self.name.to_lowercase()
    }

    /// Effective load path.
    pub fn load_path(&self) -> &str {
        self.path.as_deref().unwrap_or(&self.name)
    }
}

/// Working and output directories.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Directories {
    /// Where executing runners provision the workspace.
    pub working: PathBuf,

    /// Where generating runners write their artifacts.
    pub output: PathBuf,
}

impl Default for Directories {
    fn default() -> Self {
        Self {
            working: PathBuf::from("build/working"),
            output: PathBuf::from("build/output"),
        }
    }
}

impl Directories {
    /// Both directories below one root.
    pub fn under(root: &Path) -> Self {
        Self {
            working: root.join("working"),
            output: root.join("output"),
        }
    }

    /// Resolve relative directories against `base`.
    pub fn resolve_against(&mut self, base: &Path) {
        for dir in [&mut self.working, &mut self.output] {
            if dir.is_relative() {
                *dir = base.join(&*dir);
            }
        }
    }
}
