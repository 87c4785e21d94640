//! How a run ended.

/// Counters for a run that reached the end of the playbook.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunStats {
    /// Commands that went through `run` and `assert`.
    pub dispatched: usize,
    /// Commands the responsible runner skipped.
    pub skipped: usize,
}

/// Non-error end states of [`Engine::run`](super::Engine::run).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunOutcome {
    /// Every command was dispatched or skipped.
    Completed(RunStats),

    /// No runner supports the command at this position; nothing after it
    /// was dispatched.
    Halted {
        step: usize,
        line: usize,
        command: String,
        stats: RunStats,
    },

    /// The environment does not cover the playbook and is not fatal about
    /// it; nothing was dispatched.
    EnvironmentIncomplete { missing: Vec<String> },
}

impl RunOutcome {
    /// Whether the whole playbook ran.
    pub fn is_completed(&self) -> bool {
        matches!(self, Self::Completed(_))
    }

    /// Counters, if anything was dispatched.
    pub fn stats(&self) -> Option<RunStats> {
        match self {
            Self::Completed(stats) | Self::Halted { stats, .. } => Some(*stats),
            Self::EnvironmentIncomplete { .. } => None,
        }
    }
}
