//! The `katacoda` runner: renders the playbook into an interactive tutorial.
//!
//! Nothing is executed. Every claimed command appends a markdown fragment to
//! the tutorial step of its playbook step, and `destroy` writes the scenario
//! manifest. Output lands in `<output>/katacoda/<playbook>/`.

pub mod index;
pub mod markdown;

use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use self::index::{Asset, Index, IndexStep};
use self::markdown::{cd, cd_param, execute, file_block, interrupt, posix_join, with_text, SCENARIO_ROOT};
use super::context::{RunnerContext, WORKSPACE_DIRECTORY};
use super::Runner;
use crate::assertions::Assertions;
use crate::error::{RehearseError, Result};
use crate::playbook::{Command, Playbook, RunCommand, RunResult};

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

/// A terminal a long-running command was started in.
#[derive(Debug, Clone)]
struct Terminal {
    command: String,
    id: u32,
}

/// Runner that writes a tutorial instead of executing.
pub struct KatacodaRunner {
    ctx: RunnerContext,
    output: PathBuf,
    steps: Vec<IndexStep>,
    current_step: Option<usize>,
    current_dir: String,
    terminals: Vec<Terminal>,
    assets: Vec<Asset>,
}

impl KatacodaRunner {
    pub fn new(ctx: RunnerContext) -> Self {
        Self {
            ctx,
            output: PathBuf::new(),
            steps: Vec::new(),
            current_step: None,
            current_dir: SCENARIO_ROOT.to_string(),
            terminals: Vec::new(),
            assets: Vec::new(),
        }
    }

    /// Directory the tutorial is written to, once initialised.
    pub fn output_dir(&self) -> &Path {
        &self.output
    }

    fn workspace(&self) -> String {
        self.ctx
            .variables
            .get_str(WORKSPACE_DIRECTORY)
            .unwrap_or_else(|| SCENARIO_ROOT.to_string())
    }

    fn in_workspace(&self, relative: &str) -> String {
        posix_join(&self.workspace(), relative)
    }

    /// Path of the step file for `command`, opening a new tutorial step
    /// when the playbook step changes.
    fn step_file(&mut self, command: &RunCommand<'_>, default_title: &str) -> PathBuf {
        if self.current_step != Some(command.step_index) || self.steps.is_empty() {
            self.current_step = Some(command.step_index);
            let title = if command.step_title.is_empty() {
                default_title
            } else {
                command.step_title
            };
            self.steps.push(IndexStep {
                title: title.to_string(),
                text: format!("step{}.md", self.steps.len() + 1),
            });
        }
        let file = self.steps.last().map(|s| s.text.as_str()).unwrap_or("step1.md");
        self.output.join(file)
    }

    fn append(&mut self, command: &RunCommand<'_>, default_title: &str, body: &str) -> Result<()> {
        let file = self.step_file(command, default_title);
        let fragment = with_text(command.text_or_empty(), body, command.text_after_or_empty());
        let mut content = fs::read_to_string(&file).unwrap_or_default();
        content.push_str(&fragment);
        fs::write(&file, content)?;
        debug!(file = %file.display(), command = %command.name(), "tutorial fragment written");
        Ok(())
    }

    /// `cd` instruction for the main terminal, empty if already there.
    fn change_dir(&mut self, target: &str) -> String {
        if self.current_dir == target {
            return String::new();
        }
        let dir = cd_param(&self.current_dir, target);
        self.current_dir = target.to_string();
        cd(&dir, 1)
    }

    /// Terminal for a long-running command; `true` if it was used before.
    fn terminal(&mut self, command: &str) -> (u32, bool) {
        if let Some(t) = self.terminals.iter().find(|t| t.command == command) {
            return (t.id, true);
        }
        let id = self.terminals.len() as u32 + 2;
        self.terminals.push(Terminal {
            command: command.to_string(),
            id,
        });
        (id, false)
    }

    fn content_file(&self, relative: &str) -> Result<String> {
        Ok(fs::read_to_string(self.ctx.playbook_path.join(relative))?)
    }

    /// Inline content or content file, tutorial-specific variants first.
    fn content(&self, command: &Command) -> Result<String> {
        if let Some(content) = command
            .param_field_str(1, "contentKatacoda")
            .or_else(|| command.param_field_str(1, "content"))
        {
            return Ok(content.to_string());
        }
        match command
            .param_field_str(1, "fileKatacoda")
            .or_else(|| command.param_field_str(1, "file"))
        {
            Some(file) => self.content_file(file),
            None => Ok(String::new()),
        }
    }

    fn dispatch(&mut self, rc: &RunCommand<'_>) -> Result<()> {
        let command = rc.command;
        match command.name.as_str() {
            "createFolder" => {
                let target = self.in_workspace(command.require_str(0, "path")?);
                let folder = cd_param(&self.current_dir, &target);
                let body = format!(
                    "Create a new folder.\n\n{}",
                    execute(&format!("mkdir -p {}", folder), 1)
                );
                self.append(rc, "Create a new folder", &body)
            }
            "createFile" => {
                let relative = command.require_str(0, "path")?;
                let file = relative.replace('\\', "/");
                let mut body = format!(
                    "Create the file `{}`.\n\n{}",
                    file,
                    execute(&format!("touch {}", self.in_workspace(&file)), 1)
                );
                if let Some(source) = command.param_str(1) {
                    let content = self.content_file(source)?;
                    body.push_str("Insert the following content.\n\n");
                    body.push_str(&file_block(&file, &content, None));
                }
                self.append(rc, "Create a new file", &body)
            }
            "changeFile" => {
                let file = command.require_str(0, "path")?.replace('\\', "/");
                let content = self.content(command)?;
                let marker = command.param_field_str(1, "placeholder");
                let body = format!("Change the file `{}`.\n\n{}", file, file_block(&file, &content, marker));
                let title = format!("Change {}", file.rsplit('/').next().unwrap_or(&file));
                self.append(rc, &title, &body)
            }
            "cloneRepository" => {
                let workspace = self.workspace();
                let mut body = self.change_dir(&workspace);
                let dir = command.param_str(0).unwrap_or_default().trim();
                if !dir.is_empty() {
                    body.push_str(&execute(&format!("mkdir -p {0} && cd {0}", dir), 1));
                    self.current_dir = posix_join(&self.current_dir, dir);
                }
                let url = command.require_str(1, "repository url")?;
                body.push_str(&execute(&format!("git clone {}", url), 1));
                self.append(rc, &format!("Clone repository {}", url), &body)
            }
            "downloadFile" => {
                let url = command.require_str(0, "url")?;
                let file = command.require_str(1, "file name")?;
                let target = match command.param_str(2) {
                    Some(dir) => self.in_workspace(dir),
                    None => self.workspace(),
                };
                let mut body = self.change_dir(&target);
                body.push_str(&execute(&format!("wget -c {} -O {}", url, file), 1));
                self.append(rc, &format!("Download {}", file), &body)
            }
            "npmInstall" => {
                let target = self.in_workspace(command.require_str(0, "project")?);
                let mut body = self.change_dir(&target);
                let package = command.param_field_str(1, "name");
                let mut npm = String::from("npm install");
                if command.param_field(1, "global").and_then(|v| v.as_bool()) == Some(true) {
                    npm.push_str(" -g");
                }
                if let Some(name) = package {
                    npm.push(' ');
                    npm.push_str(name);
                }
                if let Some(args) = command.param_field(1, "args").and_then(|v| v.as_array()) {
                    for arg in args.iter().filter_map(|a| a.as_str()) {
                        npm.push(' ');
                        npm.push_str(arg);
                    }
                }
                body.push_str(&execute(&npm, 1));
                let title = format!("Install {}", package.unwrap_or("the dependencies"));
                self.append(rc, &title, &body)
            }
            "buildJava" => {
                let target = self.in_workspace(command.require_str(0, "project")?);
                let mut body = self.change_dir(&target);
                let mvn = if command.param_flag(1) {
                    "mvn clean install"
                } else {
                    "mvn clean install -Dmaven.test.skip=true"
                };
                body.push_str(&execute(mvn, 1));
                self.append(rc, "Build the java project", &body)
            }
            "buildNg" => {
                let target = self.in_workspace(command.require_str(0, "project")?);
                let mut body = self.change_dir(&target);
                let ng = match command.param_str(1) {
                    Some(out) => format!("ng build --output-path {}", out.trim()),
                    None => "ng build".to_string(),
                };
                body.push_str(&execute(&ng, 1));
                self.append(rc, "Build the Angular project", &body)
            }
            "executeCommand" => {
                let shell = command.require_str(0, "command")?;
                let target = match command.param_field_str(1, "dir") {
                    Some(dir) => self.in_workspace(dir),
                    None => self.current_dir.clone(),
                };
                let mut body = self.change_dir(&target);
                body.push_str(&execute(shell, 1));
                self.append(rc, "Execute a command", &body)
            }
            "runServerJava" => self.background(rc, "mvn spring-boot:run", "Start the java server"),
            "runClientNg" => self.background(rc, "ng serve", "Start the Angular project"),
            "dockerCompose" => self.background(rc, "docker-compose up", "Execute docker compose"),
            "nextKatacodaStep" => self.free_step(rc),
            other => Err(anyhow::anyhow!("katacoda runner cannot render {}", other).into()),
        }
    }

    fn background(&mut self, rc: &RunCommand<'_>, shell: &str, title: &str) -> Result<()> {
        let command = rc.command;
        let target = self.in_workspace(command.require_str(0, "directory")?);
        let (terminal, running) = self.terminal(&command.name);

        let mut body = String::new();
        if running {
            body.push_str(&interrupt(terminal));
        } else {
            body.push_str(&cd(&cd_param(SCENARIO_ROOT, &target), terminal));
        }
        body.push_str(&execute(shell, terminal));
        if let Some(port) = command.param_field_u64(1, "port") {
            body.push_str(&format!(
                "The service is available on port {0}: https://[[HOST_SUBDOMAIN]]-{0}-[[KATACODA_HOST]].environments.katacoda.com/\n\n",
                port
            ));
        }
        self.append(rc, title, &body)
    }

    /// `nextKatacodaStep(title, [{content|file|image}], [dir])`.
    fn free_step(&mut self, rc: &RunCommand<'_>) -> Result<()> {
        let command = rc.command;
        let title = command.require_str(0, "title")?.to_string();

        let mut body = String::new();
        let items = command.param(1).and_then(|v| v.as_array()).cloned().unwrap_or_default();
        for item in &items {
            if let Some(content) = item.get("content").and_then(|v| v.as_str()) {
                body.push_str(content);
            } else if let Some(file) = item.get("file").and_then(|v| v.as_str()) {
                body.push_str(&self.content_file(file)?);
            } else if let Some(image) = item.get("image").and_then(|v| v.as_str()) {
                let name = self.copy_asset(image)?;
                body.push_str(&format!("![{0}](./assets/{0})", name));
            }
            body.push_str("\n\n");
        }

        self.current_step = None;
        self.append(rc, &title, &body)?;
        if let Some(last) = self.steps.last_mut() {
            last.title = title;
        }

        if let Some(dir) = command.param_str(2) {
            self.current_dir = self.in_workspace(dir);
        }
        Ok(())
    }

    fn copy_asset(&mut self, relative: &str) -> Result<String> {
        let source = self.ctx.playbook_path.join(relative);
        let name = source
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .ok_or_else(|| RehearseError::missing_argument("nextKatacodaStep", "image has no file name"))?;

        let assets = self.output.join("assets");
        fs::create_dir_all(&assets)?;
        fs::copy(&source, assets.join(&name))?;
        self.assets.push(Asset {
            file: name.clone(),
            target: SCENARIO_ROOT.to_string(),
        });
        Ok(name)
    }
}

impl Runner for KatacodaRunner {
    fn name(&self) -> &str {
        &self.ctx.name
    }

    fn commands(&self) -> &[&'static str] {
        COMMANDS
    }

    fn init(&mut self, playbook: &Playbook) -> Result<()> {
        self.output = self.ctx.directories.output.join("katacoda").join(&playbook.name);
        if self.output.exists() {
            fs::remove_dir_all(&self.output)?;
        }
        fs::create_dir_all(&self.output)?;

        self.steps.clear();
        self.current_step = None;
        self.current_dir = SCENARIO_ROOT.to_string();
        self.terminals.clear();
        self.assets.clear();
        self.ctx.set_variable(WORKSPACE_DIRECTORY, SCENARIO_ROOT);
        info!(runner = %self.ctx.name, output = %self.output.display(), "writing tutorial");
        Ok(())
    }

    fn destroy(&mut self, playbook: &Playbook) -> Result<()> {
        fs::write(self.output.join("intro.md"), &playbook.description)?;
        fs::write(self.output.join("finish.md"), "")?;

        let index = Index::new(
            &playbook.title,
            &playbook.description,
            self.steps.clone(),
            self.assets.clone(),
        );
        let json = serde_json::to_string_pretty(&index).map_err(anyhow::Error::from)?;
        fs::write(self.output.join("index.json"), json)?;
        info!(steps = self.steps.len(), output = %self.output.display(), "tutorial written");
        Ok(())
    }

    fn run(&mut self, command: &RunCommand<'_>) -> Result<RunResult> {
        self.dispatch(command)?;
        Ok(RunResult::new())
    }

    fn assert(&mut self, command: &RunCommand<'_>, result: &RunResult) -> Result<()> {
        Assertions::new(command.name()).no_exception(result)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn terminals_are_reused_per_command() {
        let mut runner = KatacodaRunner::new(RunnerContext::new("katacoda"));
        assert_eq!(runner.terminal("runServerJava"), (2, false));
        assert_eq!(runner.terminal("runClientNg"), (3, false));
        assert_eq!(runner.terminal("runServerJava"), (2, true));
    }

    #[test]
    fn change_dir_is_empty_when_already_there() {
        let mut runner = KatacodaRunner::new(RunnerContext::new("katacoda"));
        assert!(runner.change_dir("/root").is_empty());
        assert!(runner.change_dir("/root/app").contains("cd app"));
        assert!(runner.change_dir("/root/app").is_empty());
    }

    #[test]
    fn nothing_is_skippable() {
        let runner = KatacodaRunner::new(RunnerContext::new("katacoda"));
        assert!(runner.supports("nextKatacodaStep"));
        assert!(!runner.command_is_skippable("nextKatacodaStep"));
    }
}
