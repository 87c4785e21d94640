//! The `index.json` scenario manifest.

use serde::{Deserialize, Serialize};

/// Minutes of estimated effort per tutorial step.
pub const MINUTES_PER_STEP: usize = 5;

/// One step entry: its title and markdown file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexStep {
    pub title: String,
    pub text: String,
}

/// A file copied into the scenario machine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Asset {
    pub file: String,
    pub target: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextRef {
    pub text: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Assets {
    pub client: Vec<Asset>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Details {
    pub steps: Vec<IndexStep>,
    pub intro: TextRef,
    pub finish: TextRef,
    pub assets: Assets,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Environment {
    pub uilayout: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Backend {
    pub imageid: String,
}

/// The whole manifest.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Index {
    pub title: String,
    pub description: String,
    pub difficulty: String,
    pub time: String,
    pub details: Details,
    pub environment: Environment,
    pub backend: Backend,
}

impl Index {
    /// Manifest for a tutorial with `steps` and `assets`.
    pub fn new(title: &str, description: &str, steps: Vec<IndexStep>, assets: Vec<Asset>) -> Self {
        Self {
            title: title.to_string(),
            description: description.to_string(),
            difficulty: "Beginner".to_string(),
            time: format!("{} minutes", steps.len().max(1) * MINUTES_PER_STEP),
            details: Details {
                steps,
                intro: TextRef {
                    text: "intro.md".to_string(),
                },
                finish: TextRef {
                    text: "finish.md".to_string(),
                },
                assets: Assets { client: assets },
            },
            environment: Environment {
                uilayout: "editor-terminal".to_string(),
            },
            backend: Backend {
                imageid: "ubuntu".to_string(),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn time_is_five_minutes_per_step() {
        let steps = vec![
            IndexStep {
                title: "One".into(),
                text: "step1.md".into(),
            },
            IndexStep {
                title: "Two".into(),
                text: "step2.md".into(),
            },
        ];
        let index = Index::new("T", "", steps, Vec::new());
        assert_eq!(index.time, "10 minutes");

        let json = serde_json::to_value(&index).unwrap();
        assert_eq!(json["details"]["steps"][1]["text"], "step2.md");
        assert_eq!(json["details"]["intro"]["text"], "intro.md");
    }
}
