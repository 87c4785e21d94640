//! Playbook and environment file loading.

use crate::config::environment::Environment;
use crate::error::{RehearseError, Result};
use crate::playbook::Playbook;
use std::fs;
use std::path::Path;

fn read_file(path: &Path) -> Result<String> {
    fs::read_to_string(path).map_err(|e| {
        if e.kind() == std::io::ErrorKind::NotFound {
            RehearseError::ConfigNotFound {
                path: path.to_path_buf(),
            }
        } else {
            RehearseError::Io(e)
        }
    })
}

fn file_stem(path: &Path) -> String {
    path.file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_default()
}

fn parent_dir(path: &Path) -> &Path {
    path.parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."))
}

/// Load a playbook file.
///
/// # Errors
///
/// Returns `ConfigNotFound` if the file doesn't exist.
/// Returns `ConfigParseError` if the YAML is invalid.
pub fn load_playbook(path: &Path) -> Result<Playbook> {
    let content = read_file(path)?;
    parse_playbook(&content, path)
}

/// Parse playbook YAML. `source_path` names the file for error reporting
/// and anchors the playbook's directory.
pub fn parse_playbook(content: &str, source_path: &Path) -> Result<Playbook> {
    let mut playbook: Playbook =
        serde_yaml::from_str(content).map_err(|e| RehearseError::ConfigParseError {
            path: source_path.to_path_buf(),
            message: e.to_string(),
        })?;

    if playbook.name.is_empty() {
        playbook.name = file_stem(source_path);
    }
    playbook.path = parent_dir(source_path).to_path_buf();
    Ok(playbook)
}

/// Load an environment file.
///
/// Relative directories are resolved against the file's directory.
pub fn load_environment(path: &Path) -> Result<Environment> {
    let content = read_file(path)?;
    parse_environment(&content, path)
}

/// Parse environment YAML.
pub fn parse_environment(content: &str, source_path: &Path) -> Result<Environment> {
    let mut environment: Environment =
        serde_yaml::from_str(content).map_err(|e| RehearseError::ConfigParseError {
            path: source_path.to_path_buf(),
            message: e.to_string(),
        })?;

    if environment.name.is_empty() {
        environment.name = file_stem(source_path);
    }
    environment
        .directories
        .resolve_against(parent_dir(source_path));
    Ok(environment)
}
