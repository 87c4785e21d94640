//! Outcome record for one dispatched instruction.

use crate::error::RehearseError;

/// Mutable success/failure record threaded through `run` and `assert`.
///
/// A nonzero `return_code` marks the instruction as failed. Operations that
/// consult the result (see [`crate::shell::execute_gated`]) become no-ops from
/// then on, so later sub-steps of the same instruction do not compound the
/// damage while `assert` still gets to observe the failure.
#[derive(Debug, Default)]
pub struct RunResult {
    /// 0 on success, the failure code otherwise.
    pub return_code: i32,

    /// Errors captured while running the instruction.
    pub exceptions: Vec<RehearseError>,
}

impl RunResult {
    /// A fresh, successful result.
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether no failure code has been recorded.
    pub fn is_success(&self) -> bool {
        self.return_code == 0
    }

    /// Record a failure code. A zero code is ignored and an earlier failure
    /// code is kept.
    pub fn fail(&mut self, code: i32) {
        if code != 0 && self.return_code == 0 {
            self.return_code = code;
        }
    }

    /// Capture an error without touching the status code.
    pub fn capture(&mut self, error: RehearseError) {
        self.exceptions.push(error);
    }
}
