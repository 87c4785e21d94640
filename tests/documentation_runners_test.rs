//! Integration tests for the tutorial and wiki runners.

use rehearse::config::{load_environment, load_playbook};
use rehearse::engine::Engine;
use rehearse::runner::RunnerRegistry;
use std::fs;
use std::path::Path;
use tempfile::TempDir;

const PLAYBOOK: &str = r#"
title: Demo
description: A short demo.
steps:
  - title: Setup
    text: Prepare the project.
    lines:
      - name: createFolder
        parameters: [app]
      - name: createFile
        parameters: [app/readme.md, readme.md]
  - title: Build
    lines:
      - name: buildJava
        parameters: [app, true]
"#;

fn write(dir: &Path, name: &str, content: &str) {
    fs::write(dir.join(name), content).unwrap();
}

fn run(temp: &TempDir, environment: &str) -> rehearse::engine::RunOutcome {
    let playbook = load_playbook(&temp.path().join("demo.yml")).unwrap();
    let environment = load_environment(&temp.path().join(environment)).unwrap();
    let mut engine = Engine::new(environment, playbook, RunnerRegistry::with_builtin());
    engine.run().unwrap()
}

#[test]
fn katacoda_writes_steps_and_manifest() {
    let temp = TempDir::new().unwrap();
    let playbook = format!(
        "{}      - name: nextKatacodaStep\n        parameters: [\"Wrap up\", [{{content: \"All done.\"}}]]\n",
        PLAYBOOK
    );
    write(temp.path(), "demo.yml", &playbook);
    write(temp.path(), "readme.md", "# Readme\n");
    write(temp.path(), "tutorial.yml", "runners:\n  - name: katacoda\n");

    let outcome = run(&temp, "tutorial.yml");
    assert!(outcome.is_completed());

    let out = temp.path().join("build/output/katacoda/demo");
    let step1 = fs::read_to_string(out.join("step1.md")).unwrap();
    assert!(step1.contains("Prepare the project."));
    assert!(step1.contains("`mkdir -p app`{{execute T1}}"));
    assert!(step1.contains("touch /root/app/readme.md"));
    assert!(step1.contains("# Readme"));

    let step2 = fs::read_to_string(out.join("step2.md")).unwrap();
    assert!(step2.contains("mvn clean install"));
    assert!(!step2.contains("maven.test.skip"));

    let step3 = fs::read_to_string(out.join("step3.md")).unwrap();
    assert!(step3.contains("All done."));

    let index: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(out.join("index.json")).unwrap()).unwrap();
    assert_eq!(index["title"], "Demo");
    assert_eq!(index["time"], "15 minutes");
    let titles: Vec<&str> = index["details"]["steps"]
        .as_array()
        .unwrap()
        .iter()
        .map(|s| s["title"].as_str().unwrap())
        .collect();
    assert_eq!(titles, ["Setup", "Build", "Wrap up"]);
    assert_eq!(
        fs::read_to_string(out.join("intro.md")).unwrap(),
        "A short demo."
    );
}

#[test]
fn katacoda_copies_images_into_assets() {
    let temp = TempDir::new().unwrap();
    write(
        temp.path(),
        "demo.yml",
        "steps:\n  - lines:\n      - name: nextKatacodaStep\n        parameters: [\"Look\", [{image: \"pic.png\"}]]\n",
    );
    write(temp.path(), "pic.png", "not really a png");
    write(temp.path(), "tutorial.yml", "runners:\n  - name: katacoda\n");

    run(&temp, "tutorial.yml");

    let out = temp.path().join("build/output/katacoda/demo");
    assert!(out.join("assets/pic.png").exists());
    assert!(fs::read_to_string(out.join("step1.md"))
        .unwrap()
        .contains("![pic.png](./assets/pic.png)"));
    let index: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(out.join("index.json")).unwrap()).unwrap();
    assert_eq!(index["details"]["assets"]["client"][0]["file"], "pic.png");
}

#[test]
fn wiki_writes_asciidoc_per_environment() {
    let temp = TempDir::new().unwrap();
    write(temp.path(), "demo.yml", PLAYBOOK);
    write(temp.path(), "readme.md", "# Readme\n");
    write(temp.path(), "docs.yml", "runners:\n  - name: wikiConsole\n");

    let outcome = run(&temp, "docs.yml");
    assert!(outcome.is_completed());

    let page = fs::read_to_string(temp.path().join("build/output/wiki/docs/demo.asciidoc")).unwrap();
    assert!(page.starts_with("= Demo\n"));
    assert!(page.contains("== Setup"));
    assert!(page.contains("Prepare the project."));
    assert!(page.contains("mkdir -p app"));
    assert!(page.contains("== Build"));
    assert!(page.find("== Setup").unwrap() < page.find("== Build").unwrap());
}

#[test]
fn wiki_cannot_cover_server_commands() {
    let temp = TempDir::new().unwrap();
    write(
        temp.path(),
        "demo.yml",
        "steps:\n  - lines:\n      - name: runServerJava\n        parameters: [server]\n",
    );
    write(temp.path(), "docs.yml", "runners:\n  - name: wikiConsole\n");

    let outcome = run(&temp, "docs.yml");

    assert!(!outcome.is_completed());
    assert!(!temp.path().join("build/output/wiki").exists());
}
