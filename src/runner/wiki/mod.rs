//! The `wikiConsole` runner: renders console instructions as asciidoc.
//!
//! The document is written to `<output>/wiki/<environment>/<playbook>.asciidoc`,
//! which is why this runner needs to know the environment it runs in.

use std::fs;
use std::path::PathBuf;
use tracing::info;

use super::context::RunnerContext;
use super::{EnvironmentAware, Runner};
use crate::assertions::Assertions;
use crate::error::Result;
use crate::playbook::{Command, Playbook, RunCommand, RunResult};

const COMMANDS: &[&str] = &[
    "cloneRepository",
    "createFolder",
    "createFile",
    "changeFile",
    "npmInstall",
    "buildJava",
    "executeCommand",
];

/// Runner that writes an asciidoc page per playbook and environment.
pub struct WikiConsoleRunner {
    ctx: RunnerContext,
    environment: String,
    document: String,
}

impl WikiConsoleRunner {
    pub fn new(ctx: RunnerContext) -> Self {
        Self {
            ctx,
            environment: "default".to_string(),
            document: String::new(),
        }
    }

    /// Where the page for `playbook` is written.
    pub fn output_file(&self, playbook: &Playbook) -> PathBuf {
        self.ctx
            .directories
            .output
            .join("wiki")
            .join(&self.environment)
            .join(format!("{}.asciidoc", playbook.name))
    }

    fn render(command: &Command) -> Result<String> {
        let listing = |shell: &str| format!("[source,bash]\n----\n{}\n----\n\n", shell);
        Ok(match command.name.as_str() {
            "cloneRepository" => {
                let dir = command.param_str(0).unwrap_or_default();
                let url = command.require_str(1, "repository url")?;
                let mut text = String::new();
                if !dir.is_empty() {
                    text.push_str(&format!("Create the directory `{0}` and change into it.\n\n{1}", dir, listing(&format!("mkdir -p {0}\ncd {0}", dir))));
                }
                text.push_str(&format!("Clone the repository {}.\n\n{}", url, listing(&format!("git clone {}", url))));
                text
            }
            "createFolder" => {
                let path = command.require_str(0, "path")?;
                format!("Create the folder `{}`.\n\n{}", path, listing(&format!("mkdir -p {}", path)))
            }
            "createFile" => {
                let path = command.require_str(0, "path")?;
                format!("Create the file `{}`.\n\n", path)
            }
            "changeFile" => {
                let path = command.require_str(0, "path")?;
                match command
                    .param_field_str(1, "contentConsole")
                    .or_else(|| command.param_field_str(1, "content"))
                {
                    Some(content) => format!(
                        "Change the file `{}`.\n\n[source]\n----\n{}\n----\n\n",
                        path, content
                    ),
                    None => format!("Change the file `{}`.\n\n", path),
                }
            }
            "npmInstall" => {
                let project = command.require_str(0, "project")?;
                format!("Install the dependencies of `{}`.\n\n{}", project, listing(&format!("cd {}\nnpm install", project)))
            }
            "buildJava" => {
                let project = command.require_str(0, "project")?;
                let mvn = if command.param_flag(1) {
                    "mvn clean install"
                } else {
                    "mvn clean install -Dmaven.test.skip=true"
                };
                format!("Build the java project `{}`.\n\n{}", project, listing(&format!("cd {}\n{}", project, mvn)))
            }
            "executeCommand" => {
                let shell = command.require_str(0, "command")?;
                format!("Execute the command.\n\n{}", listing(shell))
            }
            other => return Err(anyhow::anyhow!("wikiConsole runner cannot render {}", other).into()),
        })
    }
}

impl EnvironmentAware for WikiConsoleRunner {
    fn set_environment(&mut self, environment: &str) {
        self.environment = environment.to_string();
    }
}

impl Runner for WikiConsoleRunner {
    fn name(&self) -> &str {
        &self.ctx.name
    }

    fn commands(&self) -> &[&'static str] {
        COMMANDS
    }

    fn init(&mut self, playbook: &Playbook) -> Result<()> {
        self.document = format!("= {}\n\n", playbook.title);
        if !playbook.description.trim().is_empty() {
            self.document.push_str(playbook.description.trim_end());
            self.document.push_str("\n\n");
        }
        Ok(())
    }

    fn destroy(&mut self, playbook: &Playbook) -> Result<()> {
        let file = self.output_file(playbook);
        if let Some(parent) = file.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&file, &self.document)?;
        info!(environment = %self.environment, file = %file.display(), "wiki page written");
        Ok(())
    }

    fn run(&mut self, command: &RunCommand<'_>) -> Result<RunResult> {
        let body = Self::render(command.command)?;
        if let Some(text) = command.text {
            if !command.step_title.is_empty() {
                self.document.push_str(&format!("== {}\n\n", command.step_title));
            }
            if !text.trim().is_empty() {
                self.document.push_str(text.trim_end());
                self.document.push_str("\n\n");
            }
        }
        self.document.push_str(&body);
        if let Some(after) = command.text_after.filter(|t| !t.trim().is_empty()) {
            self.document.push_str(after.trim_end());
            self.document.push_str("\n\n");
        }
        Ok(RunResult::new())
    }

    fn assert(&mut self, command: &RunCommand<'_>, result: &RunResult) -> Result<()> {
        Assertions::new(command.name()).no_exception(result)?;
        Ok(())
    }

    fn environment_aware(&mut self) -> Option<&mut dyn EnvironmentAware> {
        Some(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn output_path_includes_environment() {
        let mut runner = WikiConsoleRunner::new(RunnerContext::new("wikiConsole"));
        runner.set_environment("ci");
        let playbook = Playbook {
            name: "hello".into(),
            ..Default::default()
        };
        assert_eq!(
            runner.output_file(&playbook),
            PathBuf::from("build/output/wiki/ci/hello.asciidoc")
        );
    }

    #[test]
    fn exposes_environment_extension() {
        let mut runner = WikiConsoleRunner::new(RunnerContext::new("wikiConsole"));
        assert!(runner.environment_aware().is_some());
    }

    #[test]
    fn renders_clone_with_directory() {
        let cmd = Command::new("cloneRepository", vec![json!("src"), json!("https://example.com/x.git")]);
        let text = WikiConsoleRunner::render(&cmd).unwrap();
        assert!(text.contains("mkdir -p src"));
        assert!(text.contains("git clone https://example.com/x.git"));
    }
}
