//! Background process tracking and process-tree termination.

use std::collections::{HashMap, HashSet};
use std::process::Child;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

use super::table::{matches_kind, ProcessInfo, ProcessTable, Signal};

/// How long [`ProcessTracker::clean_up`] waits by default.
pub const DEFAULT_CLEANUP_TIMEOUT: Duration = Duration::from_secs(10);

/// Longest wait [`ProcessTracker::clean_up`] honours; larger timeouts are capped.
pub const MAX_CLEANUP_TIMEOUT: Duration = Duration::from_secs(24 * 60 * 60);

const POLL_INTERVAL: Duration = Duration::from_millis(50);

/// A background process started by a runner.
#[derive(Debug)]
pub struct AsyncProcess {
    /// Process id of the spawned shell.
    pub pid: u32,

    /// Executable name of the real service (e.g. `java`, `node`).
    pub kind: String,

    /// Port the service binds, if known.
    pub port: Option<u16>,

    child: Option<Child>,
}

/// Result of a cleanup pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CleanupOutcome {
    /// Nothing tracked, or every targeted process exited.
    AllTerminated,
    /// These pids were still alive when the timeout expired.
    SomeSurvived(Vec<u32>),
}

impl CleanupOutcome {
    /// Whether every targeted process is gone.
    pub fn is_complete(&self) -> bool {
        matches!(self, Self::AllTerminated)
    }
}

/// Owns the background processes of one runner and guarantees that they,
/// and everything they spawned, are terminated on cleanup.
pub struct ProcessTracker {
    table: Box<dyn ProcessTable>,
    processes: Vec<AsyncProcess>,
}

impl ProcessTracker {
    /// Create a tracker backed by `table`.
    pub fn new(table: Box<dyn ProcessTable>) -> Self {
        Self {
            table,
            processes: Vec::new(),
        }
    }

    /// Track a spawned child. The tracker reaps it after termination.
    pub fn track(&mut self, child: Child, kind: impl Into<String>, port: Option<u16>) {
        let pid = child.id();
        self.push(pid, kind.into(), port, Some(child));
    }

    /// Track a process by pid only.
    pub fn track_pid(&mut self, pid: u32, kind: impl Into<String>, port: Option<u16>) {
        self.push(pid, kind.into(), port, None);
    }

    fn push(&mut self, pid: u32, kind: String, port: Option<u16>, child: Option<Child>) {
        info!(pid, kind = %kind, ?port, "tracking background process");
        self.processes.push(AsyncProcess {
            pid,
            kind,
            port,
            child,
        });
    }

    /// Currently tracked processes.
    pub fn tracked(&self) -> &[AsyncProcess] {
        &self.processes
    }

    /// Whether nothing is tracked.
    pub fn is_empty(&self) -> bool {
        self.processes.is_empty()
    }

    /// Exit code of a tracked child that has already exited, if any did so
    /// unsuccessfully.
    pub fn failed_exit(&mut self) -> Option<(u32, i32)> {
        self.processes.iter_mut().find_map(|p| {
            let status = p.child.as_mut()?.try_wait().ok()??;
            (!status.success()).then(|| (p.pid, status.code().unwrap_or(-1)))
        })
    }

    /// Terminate every tracked process tree and wait up to `timeout`.
    ///
    /// Descendants are terminated before their parents. A second pass kills
    /// processes of the tracked kind still listening on a tracked port, which
    /// catches services that detached from their parent. Survivors of the
    /// polite signal are force-killed at half the timeout. The tracked list
    /// is cleared either way.
    pub fn clean_up(&mut self, timeout: Duration) -> CleanupOutcome {
        if self.processes.is_empty() {
            return CleanupOutcome::AllTerminated;
        }

        let snapshot = self.table.processes().unwrap_or_else(|e| {
            warn!(error = %e, "could not list processes, only tracked pids are terminated");
            Vec::new()
        });

        let roots: Vec<u32> = self.processes.iter().map(|p| p.pid).collect();
        let mut targets = termination_order(&snapshot, &roots);
        for pid in &targets {
            self.send(*pid, Signal::Terminate);
        }

        for tracked in &self.processes {
            let Some(port) = tracked.port else { continue };
            let bound = self.table.listening_on(port).unwrap_or_else(|e| {
                warn!(port, error = %e, "could not look up processes on port");
                Vec::new()
            });
            for proc in bound {
                if matches_kind(&proc.name, &tracked.kind) && !targets.contains(&proc.pid) {
                    debug!(pid = proc.pid, port, name = %proc.name, "terminating process left on port");
                    self.send(proc.pid, Signal::Terminate);
                    targets.push(proc.pid);
                }
            }
        }

        let timeout = timeout.min(MAX_CLEANUP_TIMEOUT);
        let start = Instant::now();
        let deadline = start + timeout;
        let force_at = start + timeout / 2;
        let mut forced = false;

        let outcome = loop {
            self.reap();
            let survivors: Vec<u32> = targets
                .iter()
                .copied()
                .filter(|pid| self.table.is_alive(*pid))
                .collect();
            if survivors.is_empty() {
                break CleanupOutcome::AllTerminated;
            }

            let now = Instant::now();
            if now >= deadline {
                break CleanupOutcome::SomeSurvived(survivors);
            }
            if !forced && now >= force_at {
                for pid in &survivors {
                    self.send(*pid, Signal::Kill);
                }
                forced = true;
            }
            std::thread::sleep(POLL_INTERVAL.min(deadline - now));
        };

        match &outcome {
            CleanupOutcome::AllTerminated => info!(count = targets.len(), "background processes terminated"),
            CleanupOutcome::SomeSurvived(pids) => warn!(?pids, "background processes survived cleanup"),
        }

        self.reap();
        self.processes.clear();
        outcome
    }

    fn send(&self, pid: u32, signal: Signal) {
        debug!(pid, ?signal, "signalling process");
        if let Err(e) = self.table.signal(pid, signal) {
            warn!(pid, error = %e, "could not signal process");
        }
    }

    fn reap(&mut self) {
        for process in &mut self.processes {
            if let Some(child) = process.child.as_mut() {
                if let Ok(Some(status)) = child.try_wait() {
                    debug!(pid = process.pid, %status, "reaped background process");
                    process.child = None;
                }
            }
        }
    }
}

impl Drop for ProcessTracker {
    fn drop(&mut self) {
        if !self.processes.is_empty() {
            self.clean_up(DEFAULT_CLEANUP_TIMEOUT);
        }
    }
}

/// Post-order termination list for the trees rooted at `roots`.
///
/// Every descendant precedes its parent; each pid appears once. Processes
/// outside the trees are never included.
pub fn termination_order(snapshot: &[ProcessInfo], roots: &[u32]) -> Vec<u32> {
    let mut children: HashMap<u32, Vec<u32>> = HashMap::new();
    for proc in snapshot {
        if proc.pid != proc.ppid {
            children.entry(proc.ppid).or_default().push(proc.pid);
        }
    }

    let mut order = Vec::new();
    let mut visited = HashSet::new();
    for root in roots {
        visit(*root, &children, &mut visited, &mut order);
    }
    order
}

fn visit(pid: u32, children: &HashMap<u32, Vec<u32>>, visited: &mut HashSet<u32>, order: &mut Vec<u32>) {
    if !visited.insert(pid) {
        return;
    }
    if let Some(kids) = children.get(&pid) {
        for kid in kids {
            visit(*kid, children, visited, order);
        }
    }
    order.push(pid);
}
