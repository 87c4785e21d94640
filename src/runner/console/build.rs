//! Build output lookup for `buildJava` and `buildNg`.

use serde_json::Value;
use std::fs;
use std::path::Path;

use crate::error::{RehearseError, Result};

/// Whether a Maven build left a `target` directory in the project or in one
/// of its modules.
pub fn has_java_output(project: &Path) -> bool {
    if project.join("target").is_dir() {
        return true;
    }
    fs::read_dir(project)
        .map(|entries| {
            entries
                .filter_map(|e| e.ok())
                .any(|e| e.path().join("target").is_dir())
        })
        .unwrap_or(false)
}

/// Output directory of an Angular build, relative to the project.
///
/// An explicit path wins; otherwise the first `outputPath` in
/// `angular.json`, falling back to `dist`.
pub fn ng_output_path(project: &Path, explicit: Option<&str>) -> Result<String> {
    if let Some(path) = explicit.map(str::trim).filter(|p| !p.is_empty()) {
        return Ok(path.to_string());
    }

    let manifest = project.join("angular.json");
    if !manifest.is_file() {
        return Ok("dist".to_string());
    }
    let content = fs::read_to_string(&manifest)?;
    let json: Value =
        serde_json::from_str(&content).map_err(|e| RehearseError::ConfigParseError {
            path: manifest.clone(),
            message: e.to_string(),
        })?;

    Ok(find_key(&json, "outputPath")
        .and_then(Value::as_str)
        .unwrap_or("dist")
        .to_string())
}

fn find_key<'a>(value: &'a Value, key: &str) -> Option<&'a Value> {
    match value {
        Value::Object(map) => map
            .get(key)
            .or_else(|| map.values().find_map(|v| find_key(v, key))),
        Value::Array(items) => items.iter().find_map(|v| find_key(v, key)),
        _ => None,
    }
}
