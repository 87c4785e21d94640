//! Integration tests for playbook dispatch.

use rehearse::config::Environment;
use rehearse::engine::{Engine, RunOutcome};
use rehearse::playbook::{Command, Playbook, RunCommand, RunResult, Step};
use rehearse::runner::{EnvironmentAware, Runner, RunnerContext, RunnerRegistry};
use rehearse::{RehearseError, Result};
use serde_json::json;
use std::cell::{Cell, RefCell};
use std::rc::Rc;

type Log = Rc<RefCell<Vec<String>>>;

#[derive(Clone, Default)]
struct Behaviour {
    commands: Vec<&'static str>,
    skippable: Vec<&'static str>,
    fail_run: Vec<&'static str>,
    fail_assert: Vec<&'static str>,
    fail_init: bool,
    /// Stop supporting everything after this many `supports` calls.
    support_budget: Option<usize>,
}

struct Recorder {
    ctx: RunnerContext,
    behaviour: Behaviour,
    log: Log,
    support_calls: Cell<usize>,
}

impl Recorder {
    fn record(&self, entry: String) {
        self.log.borrow_mut().push(format!("{}:{}", self.ctx.name, entry));
    }
}

impl Runner for Recorder {
    fn name(&self) -> &str {
        &self.ctx.name
    }

    fn commands(&self) -> &[&'static str] {
        &self.behaviour.commands
    }

    fn supports(&self, command: &str) -> bool {
        self.support_calls.set(self.support_calls.get() + 1);
        if let Some(budget) = self.behaviour.support_budget {
            if self.support_calls.get() > budget {
                return false;
            }
        }
        self.behaviour.commands.contains(&command)
    }

    fn command_is_skippable(&self, command: &str) -> bool {
        self.behaviour.skippable.contains(&command)
    }

    fn init(&mut self, _playbook: &Playbook) -> Result<()> {
        self.record("init".into());
        if self.behaviour.fail_init {
            return Err(RehearseError::ConfigValidationError {
                message: "init failed".into(),
            });
        }
        Ok(())
    }

    fn destroy(&mut self, _playbook: &Playbook) -> Result<()> {
        self.record("destroy".into());
        Ok(())
    }

    fn run(&mut self, command: &RunCommand<'_>) -> Result<RunResult> {
        self.record(format!("run:{}", command.name()));
        if let Some(value) = command.command.param_str(0) {
            self.ctx.set_variable(command.name(), value);
        }
        if self.behaviour.fail_run.contains(&command.name()) {
            return Err(RehearseError::CommandFailed {
                command: command.name().to_string(),
                code: None,
            });
        }
        Ok(RunResult::new())
    }

    fn assert(&mut self, command: &RunCommand<'_>, result: &RunResult) -> Result<()> {
        self.record(format!(
            "assert:{}:{}:{}",
            command.name(),
            result.return_code,
            result.exceptions.len()
        ));
        if self.behaviour.fail_assert.contains(&command.name()) {
            return Err(RehearseError::assertion(command.name(), "check failed"));
        }
        Ok(())
    }
}

struct AwareRecorder {
    inner: Recorder,
}

impl EnvironmentAware for AwareRecorder {
    fn set_environment(&mut self, environment: &str) {
        self.inner.record(format!("env:{}", environment));
    }
}

impl Runner for AwareRecorder {
    fn name(&self) -> &str {
        self.inner.name()
    }

    fn commands(&self) -> &[&'static str] {
        self.inner.commands()
    }

    fn init(&mut self, playbook: &Playbook) -> Result<()> {
        self.inner.init(playbook)
    }

    fn destroy(&mut self, playbook: &Playbook) -> Result<()> {
        self.inner.destroy(playbook)
    }

    fn run(&mut self, command: &RunCommand<'_>) -> Result<RunResult> {
        self.inner.run(command)
    }

    fn assert(&mut self, command: &RunCommand<'_>, result: &RunResult) -> Result<()> {
        self.inner.assert(command, result)
    }

    fn environment_aware(&mut self) -> Option<&mut dyn EnvironmentAware> {
        Some(self)
    }
}

struct Harness {
    log: Log,
    created: Rc<Cell<usize>>,
    registry: RunnerRegistry,
}

impl Harness {
    fn new() -> Self {
        Self {
            log: Rc::new(RefCell::new(Vec::new())),
            created: Rc::new(Cell::new(0)),
            registry: RunnerRegistry::new(),
        }
    }

    fn with(mut self, name: &str, behaviour: Behaviour) -> Self {
        let log = self.log.clone();
        let created = self.created.clone();
        self.registry.register(name, move |ctx| {
            created.set(created.get() + 1);
            Ok(Box::new(Recorder {
                ctx,
                behaviour: behaviour.clone(),
                log: log.clone(),
                support_calls: Cell::new(0),
            }) as Box<dyn Runner>)
        });
        self
    }

    fn with_aware(mut self, name: &str, behaviour: Behaviour) -> Self {
        let log = self.log.clone();
        self.registry.register(name, move |ctx| {
            Ok(Box::new(AwareRecorder {
                inner: Recorder {
                    ctx,
                    behaviour: behaviour.clone(),
                    log: log.clone(),
                    support_calls: Cell::new(0),
                },
            }) as Box<dyn Runner>)
        });
        self
    }

    fn engine(self, environment: Environment, playbook: Playbook) -> (Engine, Log, Rc<Cell<usize>>) {
        (Engine::new(environment, playbook, self.registry), self.log, self.created)
    }
}

fn supports(commands: &[&'static str]) -> Behaviour {
    Behaviour {
        commands: commands.to_vec(),
        ..Default::default()
    }
}

fn step(commands: &[&str]) -> Step {
    Step {
        title: String::new(),
        text: String::new(),
        text_after: String::new(),
        lines: commands.iter().map(|c| Command::new(*c, vec![])).collect(),
    }
}

fn playbook(steps: Vec<Step>) -> Playbook {
    Playbook {
        name: "test".into(),
        steps,
        ..Default::default()
    }
}

fn entries(log: &Log) -> Vec<String> {
    log.borrow().clone()
}

#[test]
fn two_steps_one_runner_in_exact_order() {
    let (mut engine, log, _) = Harness::new()
        .with("a", supports(&["first", "second"]))
        .engine(
            Environment::new("local", &["a"]),
            playbook(vec![step(&["first"]), step(&["second"])]),
        );

    let outcome = engine.run().unwrap();

    assert!(outcome.is_completed());
    assert_eq!(
        entries(&log),
        vec![
            "a:init",
            "a:run:first",
            "a:assert:first:0:0",
            "a:run:second",
            "a:assert:second:0:0",
            "a:destroy",
        ]
    );
}

#[test]
fn first_supporting_runner_wins() {
    let (mut engine, log, _) = Harness::new()
        .with("a", supports(&["shared"]))
        .with("b", supports(&["shared", "other"]))
        .engine(
            Environment::new("local", &["a", "b"]),
            playbook(vec![step(&["shared", "other", "shared"])]),
        );

    engine.run().unwrap();

    let log = entries(&log);
    assert!(!log.iter().any(|e| e == "b:run:shared"));
    assert_eq!(log.iter().filter(|e| *e == "a:run:shared").count(), 2);
    assert!(log.iter().any(|e| e == "b:run:other"));
}

#[test]
fn skippable_command_is_never_run_or_asserted() {
    let behaviour = Behaviour {
        commands: vec!["tutorialOnly", "real"],
        skippable: vec!["tutorialOnly"],
        ..Default::default()
    };
    let (mut engine, log, _) = Harness::new().with("a", behaviour).engine(
        Environment::new("local", &["a"]),
        playbook(vec![step(&["tutorialOnly", "real"])]),
    );

    let outcome = engine.run().unwrap();

    assert_eq!(outcome.stats().unwrap().skipped, 1);
    assert_eq!(outcome.stats().unwrap().dispatched, 1);
    let log = entries(&log);
    assert!(!log.iter().any(|e| e.contains("tutorialOnly")));
    assert!(log.iter().any(|e| e == "a:run:real"));
}

#[test]
fn run_error_is_captured_and_assert_still_runs() {
    let behaviour = Behaviour {
        commands: vec!["broken", "next"],
        fail_run: vec!["broken"],
        ..Default::default()
    };
    let (mut engine, log, _) = Harness::new().with("a", behaviour).engine(
        Environment::new("local", &["a"]),
        playbook(vec![step(&["broken", "next"])]),
    );

    let outcome = engine.run().unwrap();

    assert!(outcome.is_completed());
    let log = entries(&log);
    // status unchanged, exactly one captured error
    assert!(log.iter().any(|e| e == "a:assert:broken:0:1"));
    assert!(log.iter().any(|e| e == "a:run:next"));
}

#[test]
fn assertion_failure_stops_run_and_still_destroys() {
    let behaviour = Behaviour {
        commands: vec!["check", "later"],
        fail_assert: vec!["check"],
        ..Default::default()
    };
    let (mut engine, log, _) = Harness::new()
        .with("a", behaviour)
        .with("b", supports(&["unused"]))
        .engine(
            Environment::new("local", &["a", "b"]),
            playbook(vec![step(&["check"]), step(&["later"])]),
        );

    let err = engine.run().unwrap_err();

    assert!(matches!(err, RehearseError::AssertionFailed { .. }));
    let log = entries(&log);
    assert!(!log.iter().any(|e| e == "a:run:later"));
    assert_eq!(log.iter().filter(|e| e.ends_with(":destroy")).count(), 2);
    assert_eq!(log.last().map(String::as_str), Some("b:destroy"));
}

#[test]
fn incomplete_environment_fails_before_any_dispatch() {
    let (mut engine, log, _) = Harness::new().with("a", supports(&["known"])).engine(
        Environment::new("strict", &["a"]).fail_on_incomplete(true),
        playbook(vec![step(&["known"]), step(&["unknown"])]),
    );

    let err = engine.run().unwrap_err();

    match err {
        RehearseError::EnvironmentIncomplete {
            environment,
            missing,
        } => {
            assert_eq!(environment, "strict");
            assert_eq!(missing, vec!["unknown".to_string()]);
        }
        other => panic!("unexpected error: {other}"),
    }
    assert!(entries(&log).is_empty());
}

#[test]
fn incomplete_environment_soft_aborts() {
    let (mut engine, log, _) = Harness::new().with("a", supports(&["known"])).engine(
        Environment::new("lenient", &["a"]),
        playbook(vec![step(&["known"]), step(&["unknown"])]),
    );

    let outcome = engine.run().unwrap();

    assert_eq!(
        outcome,
        RunOutcome::EnvironmentIncomplete {
            missing: vec!["unknown".into()]
        }
    );
    assert!(entries(&log).is_empty());
}

#[test]
fn completeness_follows_support() {
    let pb = || playbook(vec![step(&["x", "y"]), step(&["z"])]);

    let (mut complete, _, _) = Harness::new()
        .with("a", supports(&["x", "y"]))
        .with("b", supports(&["z"]))
        .engine(Environment::new("e", &["a", "b"]), pb());
    assert!(complete.is_environment_complete().unwrap());

    let (mut partial, _, _) = Harness::new()
        .with("a", supports(&["x", "y"]))
        .with("b", supports(&[]))
        .engine(Environment::new("e", &["a", "b"]), pb());
    assert!(!partial.is_environment_complete().unwrap());
}

#[test]
fn withdrawn_support_halts_without_error() {
    // Enough support answers for the completeness check and the first
    // dispatch, then nothing.
    let behaviour = Behaviour {
        commands: vec!["one", "two"],
        support_budget: Some(3),
        ..Default::default()
    };
    let (mut engine, log, _) = Harness::new().with("a", behaviour).engine(
        Environment::new("local", &["a"]),
        playbook(vec![step(&["one"]), step(&["two"])]),
    );

    let outcome = engine.run().unwrap();

    match outcome {
        RunOutcome::Halted {
            step,
            line,
            command,
            stats,
        } => {
            assert_eq!((step, line), (1, 0));
            assert_eq!(command, "two");
            assert_eq!(stats.dispatched, 1);
        }
        other => panic!("unexpected outcome: {other:?}"),
    }
    let log = entries(&log);
    assert!(!log.iter().any(|e| e == "a:run:two"));
    assert_eq!(log.last().map(String::as_str), Some("a:destroy"));
}

#[test]
fn runners_are_created_once() {
    let (mut engine, _, created) = Harness::new()
        .with("a", supports(&["x"]))
        .with("b", supports(&["y"]))
        .engine(
            Environment::new("local", &["A", "b"]),
            playbook(vec![step(&["x", "y", "x"]), step(&["y"])]),
        );

    engine.run().unwrap();

    assert_eq!(created.get(), 2);
}

#[test]
fn environment_aware_runner_learns_environment_before_init() {
    let (mut engine, log, _) = Harness::new()
        .with_aware("docs", supports(&["x"]))
        .engine(
            Environment::new("staging", &["docs"]),
            playbook(vec![step(&["x"])]),
        );

    engine.run().unwrap();

    let log = entries(&log);
    assert_eq!(log[0], "docs:env:staging");
    assert_eq!(log[1], "docs:init");
}

#[test]
fn variables_are_shared_across_runners() {
    let mut pb = playbook(vec![step(&["setByA"]), step(&["setByB"])]);
    pb.steps[0].lines[0].parameters = vec![json!("alpha")];
    pb.steps[1].lines[0].parameters = vec![json!("beta")];

    let (mut engine, _, _) = Harness::new()
        .with("a", supports(&["setByA"]))
        .with("b", supports(&["setByB"]))
        .engine(Environment::new("local", &["a", "b"]), pb);

    engine.run().unwrap();

    assert_eq!(engine.variables().get_str("setByA").as_deref(), Some("alpha"));
    assert_eq!(engine.variables().get_str("setByB").as_deref(), Some("beta"));
}

#[test]
fn failed_init_tears_down_initialised_runners() {
    let failing = Behaviour {
        commands: vec!["y"],
        fail_init: true,
        ..Default::default()
    };
    let (mut engine, log, _) = Harness::new()
        .with("a", supports(&["x"]))
        .with("b", failing)
        .engine(
            Environment::new("local", &["a", "b"]),
            playbook(vec![step(&["x", "y"])]),
        );

    assert!(engine.run().is_err());
    assert_eq!(entries(&log), vec!["a:init", "b:init", "a:destroy"]);
}
