//! Post-instruction checks used by runners' `assert`.
//!
//! [`Assertions`] is a small chainable builder; every check returns
//! `Result<&Self>` so that runners can write
//!
//! ```no_run
//! # use rehearse::assertions::Assertions;
//! # use rehearse::playbook::RunResult;
//! # fn demo(result: &RunResult) -> rehearse::Result<()> {
//! Assertions::new("createFolder")
//!     .no_error_code(result)?
//!     .no_exception(result)?
//!     .directory_exists("build/working/app")?;
//! # Ok(())
//! # }
//! ```

pub mod reachable;

use std::fs;
use std::path::Path;
use tracing::debug;

use crate::error::{RehearseError, Result};
use crate::playbook::RunResult;
use crate::shell::{execute, CommandOptions};

pub use reachable::{
    wait_until_reachable, wait_until_reachable_while, HttpProbe, PollReport, ReachabilityCheck,
    ReqwestProbe, DEFAULT_INTERVAL, DEFAULT_STARTUP, MIN_INTERVAL,
};

/// Chainable checks attributed to one instruction.
#[derive(Debug, Clone)]
pub struct Assertions {
    command: String,
}

impl Assertions {
    /// Checks for the instruction named `command`.
    pub fn new(command: impl Into<String>) -> Self {
        Self {
            command: command.into(),
        }
    }

    fn fail(&self, message: impl Into<String>) -> RehearseError {
        RehearseError::assertion(&self.command, message)
    }

    /// The result carries a zero status code.
    pub fn no_error_code(&self, result: &RunResult) -> Result<&Self> {
        if !result.is_success() {
            return Err(self.fail(format!(
                "the command returned exit code {}",
                result.return_code
            )));
        }
        Ok(self)
    }

    /// The result carries no captured error.
    pub fn no_exception(&self, result: &RunResult) -> Result<&Self> {
        if let Some(first) = result.exceptions.first() {
            return Err(self.fail(format!("an error occurred: {}", first)));
        }
        Ok(self)
    }

    /// `path` exists and is a directory.
    pub fn directory_exists(&self, path: impl AsRef<Path>) -> Result<&Self> {
        let path = path.as_ref();
        if !path.is_dir() {
            return Err(self.fail(format!("directory {} does not exist", path.display())));
        }
        Ok(self)
    }

    /// `path` is a directory with at least one entry.
    pub fn directory_not_empty(&self, path: impl AsRef<Path>) -> Result<&Self> {
        let path = path.as_ref();
        self.directory_exists(path)?;
        if fs::read_dir(path)?.next().is_none() {
            return Err(self.fail(format!("directory {} is empty", path.display())));
        }
        Ok(self)
    }

    /// `path` exists and is a regular file.
    pub fn file_exists(&self, path: impl AsRef<Path>) -> Result<&Self> {
        let path = path.as_ref();
        if !path.is_file() {
            return Err(self.fail(format!("file {} does not exist", path.display())));
        }
        Ok(self)
    }

    /// The file at `path` contains `content` verbatim.
    pub fn file_contains(&self, path: impl AsRef<Path>, content: &str) -> Result<&Self> {
        let path = path.as_ref();
        self.file_exists(path)?;
        let actual = fs::read_to_string(path)?;
        if !actual.contains(content) {
            return Err(self.fail(format!(
                "file {} does not contain the expected content",
                path.display()
            )));
        }
        Ok(self)
    }

    /// `dir` is a git working tree without uncommitted changes.
    pub fn repository_is_clean(&self, dir: impl AsRef<Path>) -> Result<&Self> {
        let dir = dir.as_ref();
        self.directory_exists(dir)?;
        let status = execute("git status --porcelain", &CommandOptions::captured(dir))?;
        if !status.success {
            return Err(self.fail(format!("{} is not a git repository", dir.display())));
        }
        if !status.stdout.trim().is_empty() {
            debug!(dir = %dir.display(), changes = %status.stdout.trim(), "repository not clean");
            return Err(self.fail(format!(
                "repository {} has uncommitted changes",
                dir.display()
            )));
        }
        Ok(self)
    }

    /// The endpoint described by `check` becomes reachable within its budget.
    ///
    /// `alive` runs before every probe; its first error ends the wait.
    pub fn server_is_reachable(
        &self,
        check: &ReachabilityCheck,
        probe: &dyn HttpProbe,
        alive: &mut dyn FnMut() -> Result<()>,
    ) -> Result<&Self> {
        wait_until_reachable_while(check, probe, alive)?;
        Ok(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use tempfile::TempDir;

    #[test]
    fn clean_result_passes() {
        let result = RunResult::new();
        assert!(Assertions::new("x")
            .no_error_code(&result)
            .and_then(|a| a.no_exception(&result))
            .is_ok());
    }

    #[test]
    fn error_code_fails() {
        let mut result = RunResult::new();
        result.fail(3);
        let err = Assertions::new("buildJava").no_error_code(&result).unwrap_err();
        assert!(err.to_string().contains("exit code 3"));
        assert!(err.to_string().contains("buildJava"));
    }

    #[test]
    fn captured_exception_fails() {
        let mut result = RunResult::new();
        result.capture(RehearseError::ConfigValidationError {
            message: "boom".into(),
        });
        let err = Assertions::new("x").no_exception(&result).unwrap_err();
        assert!(err.to_string().contains("boom"));
    }

    #[test]
    fn path_checks() {
        let temp = TempDir::new().unwrap();
        let dir = temp.path().join("app");
        let a = Assertions::new("createFolder");

        assert!(a.directory_exists(&dir).is_err());
        fs::create_dir(&dir).unwrap();
        assert!(a.directory_exists(&dir).is_ok());
        assert!(a.directory_not_empty(&dir).is_err());

        let file = dir.join("README.md");
        fs::write(&file, "hello world\n").unwrap();
        assert!(a.directory_not_empty(&dir).is_ok());
        assert!(a.file_exists(&file).is_ok());
        assert!(a.file_contains(&file, "world").is_ok());
        assert!(a.file_contains(&file, "moon").is_err());
        assert!(a.file_exists(&dir).is_err());
    }

    #[test]
    fn non_repository_is_not_clean() {
        let temp = TempDir::new().unwrap();
        assert!(Assertions::new("cloneRepository")
            .repository_is_clean(temp.path().join("missing"))
            .is_err());
    }

    #[test]
    fn reachability_delegates_to_poller() {
        let probe = |_: &str| true;
        let check = ReachabilityCheck {
            startup: Duration::from_millis(50),
            ..ReachabilityCheck::new(8080)
        };
        assert!(Assertions::new("runClientNg")
            .server_is_reachable(&check, &probe, &mut || Ok(()))
            .is_ok());
    }
}
