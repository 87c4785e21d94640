//! Shell command execution.

use crate::error::{RehearseError, Result};
use crate::playbook::RunResult;
use std::collections::HashMap;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::{Child, Command, Stdio};
use std::time::{Duration, Instant};
use tracing::{debug, warn};

/// Result of executing a shell command.
#[derive(Debug, Clone)]
pub struct CommandResult {
    /// Exit code (None if killed by signal).
    pub exit_code: Option<i32>,

    /// Standard output.
    pub stdout: String,

    /// Standard error.
    pub stderr: String,

    /// Execution duration.
    pub duration: Duration,

    /// Whether command succeeded (exit code 0).
    pub success: bool,
}

impl CommandResult {
    /// Create a success result.
    pub fn success(stdout: String, stderr: String, duration: Duration) -> Self {
        Self {
            exit_code: Some(0),
            stdout,
            stderr,
            duration,
            success: true,
        }
    }

    /// Create a failure result.
    pub fn failure(
        exit_code: Option<i32>,
        stdout: String,
        stderr: String,
        duration: Duration,
    ) -> Self {
        Self {
            exit_code,
            stdout,
            stderr,
            duration,
            success: false,
        }
    }
}

/// Options for command execution.
#[derive(Debug, Clone, Default)]
pub struct CommandOptions {
    /// Working directory.
    pub cwd: Option<PathBuf>,

    /// Environment variables (merged with system env).
    pub env: HashMap<String, String>,

    /// Capture stdout (if false, inherits from parent).
    pub capture_stdout: bool,

    /// Capture stderr (if false, inherits from parent).
    pub capture_stderr: bool,

    /// Text written to the command's stdin, e.g. answers to prompts.
    pub input: Option<String>,
}

impl CommandOptions {
    /// Capture both streams and run in `cwd`.
    pub fn captured(cwd: &Path) -> Self {
        Self {
            cwd: Some(cwd.to_path_buf()),
            capture_stdout: true,
            capture_stderr: true,
            ..Default::default()
        }
    }
}

/// Execute a shell command and wait for it.
pub fn execute(command: &str, options: &CommandOptions) -> Result<CommandResult> {
    let start = Instant::now();

    let mut cmd = shell_command(command);

    if let Some(cwd) = &options.cwd {
        cmd.current_dir(cwd);
    }

    for (key, value) in &options.env {
        cmd.env(key, value);
    }

    if options.capture_stdout {
        cmd.stdout(Stdio::piped());
    } else {
        cmd.stdout(Stdio::inherit());
    }

    if options.capture_stderr {
        cmd.stderr(Stdio::piped());
    } else {
        cmd.stderr(Stdio::inherit());
    }

    cmd.stdin(if options.input.is_some() {
        Stdio::piped()
    } else {
        Stdio::null()
    });

    let mut child = cmd.spawn().map_err(|_| RehearseError::CommandFailed {
        command: command.to_string(),
        code: None,
    })?;

    if let (Some(input), Some(mut stdin)) = (&options.input, child.stdin.take()) {
        // A command that exits without reading its input closes the pipe;
        // that is its business, not a spawn failure.
        if let Err(e) = stdin.write_all(input.as_bytes()) {
            debug!(command, error = %e, "stdin closed before input was written");
        }
    }

    let output = child
        .wait_with_output()
        .map_err(|_| RehearseError::CommandFailed {
            command: command.to_string(),
            code: None,
        })?;

    let duration = start.elapsed();

    let stdout = String::from_utf8_lossy(&output.stdout).to_string();
    let stderr = String::from_utf8_lossy(&output.stderr).to_string();

    if output.status.success() {
        Ok(CommandResult::success(stdout, stderr, duration))
    } else {
        Ok(CommandResult::failure(
            output.status.code(),
            stdout,
            stderr,
            duration,
        ))
    }
}

/// Execute a command on behalf of an instruction, gated by its result.
///
/// Does nothing if `result` already carries a failure code. A nonzero exit
/// is recorded as the result's code; a command that cannot be started at
/// all is recorded with code `-1`.
pub fn execute_gated(
    command: &str,
    cwd: &Path,
    result: &mut RunResult,
    env: &HashMap<String, String>,
    input: Option<&str>,
) {
    if !result.is_success() {
        debug!(command, "skipped, instruction already failed");
        return;
    }

    let options = CommandOptions {
        env: env.clone(),
        input: input.map(str::to_string),
        ..CommandOptions::captured(cwd)
    };

    match execute(command, &options) {
        Ok(outcome) if outcome.success => {
            debug!(command, duration_ms = outcome.duration.as_millis() as u64, "command finished");
        }
        Ok(outcome) => {
            warn!(
                command,
                exit_code = ?outcome.exit_code,
                stderr = %outcome.stderr.trim(),
                "error executing command"
            );
            result.fail(outcome.exit_code.unwrap_or(-1));
        }
        Err(e) => {
            warn!(command, error = %e, "command could not be started");
            result.fail(-1);
        }
    }
}

/// Start a long-running command in the background.
///
/// Output is discarded. Returns `None` (and marks `result` failed) if the
/// process could not be started, or if `result` had already failed.
pub fn spawn_gated(
    command: &str,
    cwd: &Path,
    result: &mut RunResult,
    env: &HashMap<String, String>,
) -> Option<Child> {
    if !result.is_success() {
        return None;
    }

    let mut cmd = shell_command(command);
    cmd.current_dir(cwd)
        .envs(env)
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null());

    match cmd.spawn() {
        Ok(child) => {
            debug!(command, pid = child.id(), "background process started");
            Some(child)
        }
        Err(e) => {
            warn!(command, error = %e, "background process could not be started");
            result.fail(1);
            None
        }
    }
}

/// Build a platform shell invocation for `command`.
fn shell_command(command: &str) -> Command {
    let mut cmd = Command::new(shell_program());
    cmd.arg(shell_flag());
    cmd.arg(command);
    cmd
}

fn shell_program() -> &'static str {
    if cfg!(target_os = "windows") {
        "cmd"
    } else {
        "sh"
    }
}

fn shell_flag() -> &'static str {
    if cfg!(target_os = "windows") {
        "/C"
    } else {
        "-c"
    }
}
