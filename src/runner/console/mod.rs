//! The `console` runner: executes playbook commands for real.
//!
//! Paths in command parameters are relative to the `workspaceDirectory`
//! variable, which `init` points at the environment's working directory.
//! Content files are relative to the playbook's directory.
//!
//! Long-running services (`runServerJava`, `runClientNg`, `dockerCompose`)
//! are started in the background and handed to a [`ProcessTracker`]; a
//! failed assertion or `destroy` terminates them together with everything
//! they spawned.

mod build;

use regex::Regex;
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;
use std::time::Duration;
use tracing::{debug, info, warn};

use super::context::{RunnerContext, WORKSPACE_DIRECTORY};
use super::Runner;
use crate::assertions::{Assertions, HttpProbe, ReachabilityCheck, ReqwestProbe};
use crate::error::{RehearseError, Result};
use crate::playbook::{Command, Playbook, RunCommand, RunResult};
use crate::process::{
    CleanupOutcome, ProcessTable, ProcessTracker, SystemProcessTable, DEFAULT_CLEANUP_TIMEOUT,
};
use crate::shell::{execute_gated, spawn_gated};

const COMMANDS: &[&str] = &[
    "createFolder",
    "createFile",
    "changeFile",
    "cloneRepository",
    "downloadFile",
    "npmInstall",
    "buildJava",
    "buildNg",
    "executeCommand",
    "runServerJava",
    "runClientNg",
    "dockerCompose",
    "nextKatacodaStep",
];

/// Only meaningful for tutorial generation.
const SKIPPABLE: &[&str] = &["nextKatacodaStep"];

/// Last path segment of a repository URL, without `.git`.
static REPOSITORY_NAME: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"([^/:\\]+?)(?:\.git)?/*$").expect("REPOSITORY_NAME must compile")
});

/// Directory name `git clone <url>` creates.
pub fn repository_name(url: &str) -> Option<&str> {
    REPOSITORY_NAME
        .captures(url.trim())
        .and_then(|c| c.get(1))
        .map(|m| m.as_str())
}

/// Runner that executes commands in the working directory.
pub struct ConsoleRunner {
    ctx: RunnerContext,
    tracker: ProcessTracker,
    probe: Option<Box<dyn HttpProbe>>,
    env: HashMap<String, String>,
    cleanup_timeout: Duration,
}

impl ConsoleRunner {
    /// Runner backed by the operating system's process table and a real
    /// HTTP client.
    pub fn new(ctx: RunnerContext) -> Self {
        Self {
            ctx,
            tracker: ProcessTracker::new(Box::new(SystemProcessTable::new())),
            probe: None,
            env: HashMap::new(),
            cleanup_timeout: DEFAULT_CLEANUP_TIMEOUT,
        }
    }

    /// Runner with injected process table and probe.
    pub fn with_services(
        ctx: RunnerContext,
        table: Box<dyn ProcessTable>,
        probe: Box<dyn HttpProbe>,
    ) -> Self {
        Self {
            tracker: ProcessTracker::new(table),
            probe: Some(probe),
            ..Self::new(ctx)
        }
    }

    /// Override how long cleanup waits for processes to exit.
    pub fn with_cleanup_timeout(mut self, timeout: Duration) -> Self {
        self.cleanup_timeout = timeout;
        self
    }

    /// Extra environment variables for every command.
    pub fn set_env(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.env.insert(key.into(), value.into());
    }

    /// Background processes currently tracked.
    pub fn tracker(&self) -> &ProcessTracker {
        &self.tracker
    }

    /// Terminate every tracked background process.
    pub fn clean_up(&mut self) -> CleanupOutcome {
        let outcome = self.tracker.clean_up(self.cleanup_timeout);
        if let CleanupOutcome::SomeSurvived(pids) = &outcome {
            warn!(runner = %self.ctx.name, ?pids, "background processes survived cleanup");
        }
        outcome
    }

    fn workspace(&self) -> PathBuf {
        self.ctx.workspace()
    }

    fn in_workspace(&self, relative: &str) -> PathBuf {
        self.workspace().join(relative)
    }

    fn probe(slot: &mut Option<Box<dyn HttpProbe>>) -> Result<&dyn HttpProbe> {
        if slot.is_none() {
            *slot = Some(Box::new(ReqwestProbe::new()?));
        }
        match slot.as_deref() {
            Some(probe) => Ok(probe),
            None => Err(anyhow::anyhow!("HTTP probe unavailable").into()),
        }
    }

    fn dispatch_run(&mut self, command: &Command) -> Result<RunResult> {
        match command.name.as_str() {
            "createFolder" => self.run_create_folder(command),
            "createFile" => self.run_create_file(command),
            "changeFile" => self.run_change_file(command),
            "cloneRepository" => self.run_clone_repository(command),
            "downloadFile" => self.run_download_file(command),
            "npmInstall" => self.run_in_project(command, "npm install"),
            "buildJava" => self.run_build_java(command),
            "buildNg" => self.run_build_ng(command),
            "executeCommand" => self.run_execute_command(command),
            "runServerJava" => self.run_background(command, "mvn spring-boot:run", "java"),
            "runClientNg" => self.run_background(command, "ng serve", "node"),
            "dockerCompose" => self.run_background(command, "docker-compose up", "docker-compose"),
            other => Err(anyhow::anyhow!("console runner cannot run {}", other).into()),
        }
    }

    fn dispatch_assert(&mut self, command: &Command, result: &RunResult) -> Result<()> {
        let checks = Assertions::new(&command.name);
        checks.no_error_code(result)?.no_exception(result)?;

        match command.name.as_str() {
            "createFolder" => {
                checks.directory_exists(self.in_workspace(command.require_str(0, "path")?))?;
            }
            "createFile" => {
                checks.file_exists(self.in_workspace(command.require_str(0, "path")?))?;
            }
            "changeFile" => {
                let file = self.in_workspace(command.require_str(0, "path")?);
                checks.file_exists(&file)?;
                if let Some(expected) = self.replacement_content(command)? {
                    checks.file_contains(&file, &expected)?;
                }
            }
            "cloneRepository" => {
                let url = command.require_str(1, "repository url")?;
                let name = repository_name(url).ok_or_else(|| {
                    RehearseError::missing_argument(&command.name, "cannot derive repository name")
                })?;
                let repo = self
                    .in_workspace(command.param_str(0).unwrap_or_default())
                    .join(name);
                checks
                    .directory_exists(&repo)?
                    .directory_not_empty(&repo)?
                    .repository_is_clean(&repo)?;
            }
            "downloadFile" => {
                let dir = self.download_dir(command);
                checks
                    .directory_exists(&dir)?
                    .directory_not_empty(&dir)?
                    .file_exists(dir.join(command.require_str(1, "file name")?))?;
            }
            "npmInstall" => {
                let project = self.in_workspace(command.require_str(0, "project")?);
                checks
                    .directory_exists(&project)?
                    .directory_exists(project.join("node_modules"))?;
            }
            "buildJava" => {
                let project = self.in_workspace(command.require_str(0, "project")?);
                checks.directory_exists(&project)?;
                if !build::has_java_output(&project) {
                    return Err(RehearseError::assertion(
                        &command.name,
                        format!("no target directory below {}", project.display()),
                    ));
                }
            }
            "buildNg" => {
                let project = self.in_workspace(command.require_str(0, "project")?);
                let output = project.join(build::ng_output_path(&project, command.param_str(1))?);
                checks.directory_exists(&output)?.directory_not_empty(&output)?;
            }
            "runServerJava" => self.check_reachable(command, true)?,
            "runClientNg" => self.check_reachable(command, false)?,
            "dockerCompose" => self.check_reachable(command, false)?,
            _ => {}
        }
        Ok(())
    }

    fn run_create_folder(&self, command: &Command) -> Result<RunResult> {
        let folder = self.in_workspace(command.require_str(0, "path")?);
        if !folder.exists() {
            fs::create_dir_all(&folder)?;
            debug!(path = %folder.display(), "created folder");
        }
        Ok(RunResult::new())
    }

    fn run_create_file(&self, command: &Command) -> Result<RunResult> {
        let file = self.in_workspace(command.require_str(0, "path")?);
        if let Some(parent) = file.parent() {
            fs::create_dir_all(parent)?;
        }
        let content = match command.param_str(1) {
            Some(source) => fs::read_to_string(self.ctx.playbook_path.join(source))?,
            None => String::new(),
        };
        fs::write(&file, content)?;
        Ok(RunResult::new())
    }

    /// Text that `changeFile` writes: inline content or a content file,
    /// console-specific variants first.
    fn replacement_content(&self, command: &Command) -> Result<Option<String>> {
        if let Some(content) = command
            .param_field_str(1, "contentConsole")
            .or_else(|| command.param_field_str(1, "content"))
        {
            return Ok(Some(content.to_string()));
        }
        match command
            .param_field_str(1, "fileConsole")
            .or_else(|| command.param_field_str(1, "file"))
        {
            Some(file) => Ok(Some(fs::read_to_string(self.ctx.playbook_path.join(file))?)),
            None => Ok(None),
        }
    }

    fn run_change_file(&self, command: &Command) -> Result<RunResult> {
        let file = self.in_workspace(command.require_str(0, "path")?);
        let replacement = self.replacement_content(command)?.ok_or_else(|| {
            RehearseError::missing_argument(&command.name, "content or file must be given")
        })?;

        let content = match command.param_field_str(1, "placeholder") {
            Some(placeholder) => fs::read_to_string(&file)?.replacen(placeholder, &replacement, 1),
            None => replacement,
        };
        fs::write(&file, content)?;
        Ok(RunResult::new())
    }

    fn run_clone_repository(&self, command: &Command) -> Result<RunResult> {
        let dir = command.param_str(0).unwrap_or_default();
        let url = command.require_str(1, "repository url")?;
        let target = self.in_workspace(dir);
        if !dir.is_empty() {
            fs::create_dir_all(&target)?;
        }

        let mut result = RunResult::new();
        execute_gated(&format!("git clone {}", url), &target, &mut result, &self.env, None);
        Ok(result)
    }

    fn download_dir(&self, command: &Command) -> PathBuf {
        match command.param_str(2) {
            Some(dir) => self.in_workspace(dir),
            None => self.workspace(),
        }
    }

    fn run_download_file(&self, command: &Command) -> Result<RunResult> {
        let url = command.require_str(0, "url")?;
        let file_name = command.require_str(1, "file name")?;
        let dir = self.download_dir(command);
        fs::create_dir_all(&dir)?;

        let download = if cfg!(windows) {
            format!(
                "powershell.exe \"Invoke-WebRequest -OutFile {} '{}'\"",
                file_name, url
            )
        } else {
            format!("wget -c {} -O {}", url, file_name)
        };

        let mut result = RunResult::new();
        execute_gated(&download, &dir, &mut result, &self.env, None);
        Ok(result)
    }

    fn run_in_project(&self, command: &Command, shell: &str) -> Result<RunResult> {
        let project = self.in_workspace(command.require_str(0, "project")?);
        let mut result = RunResult::new();
        execute_gated(shell, &project, &mut result, &self.env, None);
        Ok(result)
    }

    fn run_build_java(&self, command: &Command) -> Result<RunResult> {
        let build = if command.param_flag(1) {
            "mvn clean install"
        } else {
            "mvn clean install -Dmaven.test.skip=true"
        };
        self.run_in_project(command, build)
    }

    fn run_build_ng(&self, command: &Command) -> Result<RunResult> {
        let build = match command.param_str(1) {
            Some(output) => format!("ng build --output-path {}", output.trim()),
            None => "ng build".to_string(),
        };
        self.run_in_project(command, &build)
    }

    fn run_execute_command(&self, command: &Command) -> Result<RunResult> {
        let shell = command.require_str(0, "command")?;
        let dir = match command.param_field_str(1, "dir") {
            Some(dir) => self.in_workspace(dir),
            None => self.workspace(),
        };
        let mut result = RunResult::new();
        execute_gated(shell, &dir, &mut result, &self.env, None);
        Ok(result)
    }

    fn run_background(&mut self, command: &Command, shell: &str, kind: &str) -> Result<RunResult> {
        let dir = self.in_workspace(command.require_str(0, "directory")?);
        let port = ReachabilityCheck::from_command(command, 1, false).port;

        let mut result = RunResult::new();
        if let Some(child) = spawn_gated(shell, &dir, &mut result, &self.env) {
            self.tracker.track(child, kind, port);
        }
        Ok(result)
    }

    fn check_reachable(&mut self, command: &Command, require_path: bool) -> Result<()> {
        if command.param(1).is_none() {
            return Ok(());
        }

        let check = ReachabilityCheck::from_command(command, 1, require_path);
        if command.param_field(1, "startupTime").is_none() {
            warn!(command = %command.name, "no startup time set, using the default budget");
        }
        let tracker = &mut self.tracker;
        let probe = Self::probe(&mut self.probe)?;
        // A server that already exited will never answer.
        let mut alive = || match tracker.failed_exit() {
            Some((pid, code)) => Err(RehearseError::assertion(
                &command.name,
                format!("background process {} exited with code {}", pid, code),
            )),
            None => Ok(()),
        };
        Assertions::new(&command.name).server_is_reachable(&check, probe, &mut alive)?;
        Ok(())
    }
}

impl Runner for ConsoleRunner {
    fn name(&self) -> &str {
        &self.ctx.name
    }

    fn commands(&self) -> &[&'static str] {
        COMMANDS
    }

    fn command_is_skippable(&self, command: &str) -> bool {
        SKIPPABLE.contains(&command)
    }

    fn init(&mut self, _playbook: &Playbook) -> Result<()> {
        let working = &self.ctx.directories.working;
        fs::create_dir_all(working)?;
        self.ctx
            .set_variable(WORKSPACE_DIRECTORY, path_string(working));
        info!(runner = %self.ctx.name, workspace = %working.display(), "console runner ready");
        Ok(())
    }

    fn destroy(&mut self, _playbook: &Playbook) -> Result<()> {
        self.clean_up();
        Ok(())
    }

    fn run(&mut self, command: &RunCommand<'_>) -> Result<RunResult> {
        debug!(
            step = command.step_index,
            line = command.line_index,
            command = %command.name(),
            "console run"
        );
        self.dispatch_run(command.command)
    }

    fn assert(&mut self, command: &RunCommand<'_>, result: &RunResult) -> Result<()> {
        let checked = self.dispatch_assert(command.command, result);
        if let Err(e) = &checked {
            warn!(command = %command.name(), error = %e, "assertion failed, cleaning up");
            self.clean_up();
        }
        checked
    }
}

fn path_string(path: &Path) -> String {
    path.to_string_lossy().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn repository_names() {
        assert_eq!(repository_name("https://github.com/devonfw/my-thai-star.git"), Some("my-thai-star"));
        assert_eq!(repository_name("git@github.com:org/tools.git"), Some("tools"));
        assert_eq!(repository_name("https://example.com/plain/"), Some("plain"));
        assert_eq!(repository_name(""), None);
    }

    #[test]
    fn next_katacoda_step_is_claimed_but_skipped() {
        let runner = ConsoleRunner::new(RunnerContext::new("console"));
        assert!(runner.supports("nextKatacodaStep"));
        assert!(runner.command_is_skippable("nextKatacodaStep"));
        assert!(!runner.command_is_skippable("createFile"));
        assert!(!runner.supports("installDevonfwIde"));
    }
}
