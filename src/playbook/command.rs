//! A single playbook instruction.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{RehearseError, Result};

/// One playbook instruction: a name plus heterogeneous parameters.
///
/// Commands are shared read-only by whichever runner claims them.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Command {
    /// Instruction type, e.g. `createFile` or `runServerJava`.
    pub name: String,

    /// Ordered parameters; strings, lists and objects all occur.
    #[serde(default)]
    pub parameters: Vec<Value>,
}

impl Command {
    /// Create a command from a name and parameter list.
    pub fn new(name: impl Into<String>, parameters: Vec<Value>) -> Self {
        Self {
            name: name.into(),
            parameters,
        }
    }

    /// Parameter at `index`, if present.
    pub fn param(&self, index: usize) -> Option<&Value> {
        self.parameters.get(index)
    }

    /// Parameter at `index` as a string, if it is one.
    pub fn param_str(&self, index: usize) -> Option<&str> {
        self.param(index).and_then(Value::as_str)
    }

    /// Required string parameter; fails with a configuration error otherwise.
    pub fn require_str(&self, index: usize, what: &str) -> Result<&str> {
        self.param_str(index).ok_or_else(|| {
            RehearseError::missing_argument(
                &self.name,
                format!("parameter {} ({}) must be a string", index + 1, what),
            )
        })
    }

    /// Field `key` of the object parameter at `index`.
    pub fn param_field(&self, index: usize, key: &str) -> Option<&Value> {
        self.param(index).and_then(|v| v.get(key))
    }

    /// String field `key` of the object parameter at `index`.
    ///
    /// Empty strings are treated as absent.
    pub fn param_field_str(&self, index: usize, key: &str) -> Option<&str> {
        self.param_field(index, key)
            .and_then(Value::as_str)
            .filter(|s| !s.is_empty())
    }

    /// Numeric field `key` of the object parameter at `index`.
    ///
    /// Accepts numbers and numeric strings, since playbooks write both.
    pub fn param_field_u64(&self, index: usize, key: &str) -> Option<u64> {
        match self.param_field(index, key)? {
            Value::Number(n) => n.as_u64(),
            Value::String(s) => s.trim().parse().ok(),
            _ => None,
        }
    }

    /// Parameter at `index` interpreted as a boolean flag.
    pub fn param_flag(&self, index: usize) -> bool {
        match self.param(index) {
            Some(Value::Bool(b)) => *b,
            Some(Value::String(s)) => s.eq_ignore_ascii_case("true"),
            _ => false,
        }
    }
}
