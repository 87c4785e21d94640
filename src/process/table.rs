//! Operating-system process listing and signalling.
//!
//! [`ProcessTable`] is the seam between the cleanup logic in
//! [`tracker`](super::tracker) and the platform. [`SystemProcessTable`] reads
//! `/proc` on Linux and shells out to `ps`/`lsof` on other Unix systems.

use crate::error::{RehearseError, Result};
use std::collections::HashSet;
use tracing::debug;

/// One entry of the process table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessInfo {
    /// Process id.
    pub pid: u32,

    /// Parent process id (0 if unknown).
    pub ppid: u32,

    /// Executable name as reported by the platform.
    pub name: String,
}

/// How hard to ask a process to stop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Signal {
    /// Polite request (SIGTERM).
    Terminate,
    /// Forced stop (SIGKILL).
    Kill,
}

/// Process enumeration and termination service.
pub trait ProcessTable {
    /// All currently running processes with their parent links.
    fn processes(&self) -> Result<Vec<ProcessInfo>>;

    /// Processes with a TCP socket listening on `port`.
    fn listening_on(&self, port: u16) -> Result<Vec<ProcessInfo>>;

    /// Send `signal` to `pid`. A process that is already gone is not an error.
    fn signal(&self, pid: u32, signal: Signal) -> Result<()>;

    /// Whether `pid` still runs. Zombies count as gone.
    fn is_alive(&self, pid: u32) -> bool;
}

/// Whether a process `name` is an instance of executable `kind`.
///
/// Matches the bare name and the Windows `.exe` form.
pub fn matches_kind(name: &str, kind: &str) -> bool {
    if name == kind {
        return true;
    }
    match (name.get(..kind.len()), name.get(kind.len()..)) {
        (Some(stem), Some(suffix)) => {
            stem.eq_ignore_ascii_case(kind) && suffix.eq_ignore_ascii_case(".exe")
        }
        _ => false,
    }
}

/// The real process table of this machine.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemProcessTable;

impl SystemProcessTable {
    /// Create a handle to the system process table.
    pub fn new() -> Self {
        Self
    }
}

#[cfg(target_os = "linux")]
impl ProcessTable for SystemProcessTable {
    fn processes(&self) -> Result<Vec<ProcessInfo>> {
        let mut processes = Vec::new();
        for pid in proc_pids()? {
            if let Some(info) = linux::read_stat(pid).map(|s| s.info) {
                processes.push(info);
            }
        }
        Ok(processes)
    }

    fn listening_on(&self, port: u16) -> Result<Vec<ProcessInfo>> {
        let mut inodes = HashSet::new();
        for table in ["/proc/net/tcp", "/proc/net/tcp6"] {
            if let Ok(content) = std::fs::read_to_string(table) {
                inodes.extend(linux::listening_inodes(&content, port));
            }
        }
        if inodes.is_empty() {
            return Ok(Vec::new());
        }

        let mut owners = Vec::new();
        for pid in proc_pids()? {
            if linux::owns_any_socket(pid, &inodes) {
                if let Some(stat) = linux::read_stat(pid) {
                    owners.push(stat.info);
                }
            }
        }
        Ok(owners)
    }

    fn signal(&self, pid: u32, signal: Signal) -> Result<()> {
        unix::send_signal(pid, signal)
    }

    fn is_alive(&self, pid: u32) -> bool {
        match linux::read_stat(pid) {
            Some(stat) => stat.state != 'Z' && stat.state != 'X',
            None => false,
        }
    }
}

#[cfg(all(unix, not(target_os = "linux")))]
impl ProcessTable for SystemProcessTable {
    fn processes(&self) -> Result<Vec<ProcessInfo>> {
        let output = crate::shell::execute(
            "ps -A -o pid= -o ppid= -o comm=",
            &crate::shell::CommandOptions {
                capture_stdout: true,
                capture_stderr: true,
                ..Default::default()
            },
        )?;
        Ok(output.stdout.lines().filter_map(parse_ps_line).collect())
    }

    fn listening_on(&self, port: u16) -> Result<Vec<ProcessInfo>> {
        let output = crate::shell::execute(
            &format!("lsof -nP -iTCP:{} -sTCP:LISTEN -t", port),
            &crate::shell::CommandOptions {
                capture_stdout: true,
                capture_stderr: true,
                ..Default::default()
            },
        )?;
        let pids: HashSet<u32> = output
            .stdout
            .lines()
            .filter_map(|l| l.trim().parse().ok())
            .collect();
        Ok(self
            .processes()?
            .into_iter()
            .filter(|p| pids.contains(&p.pid))
            .collect())
    }

    fn signal(&self, pid: u32, signal: Signal) -> Result<()> {
        unix::send_signal(pid, signal)
    }

    fn is_alive(&self, pid: u32) -> bool {
        unix::exists(pid)
    }
}

#[cfg(not(unix))]
impl ProcessTable for SystemProcessTable {
    fn processes(&self) -> Result<Vec<ProcessInfo>> {
        tracing::warn!("process listing is not supported on this platform");
        Ok(Vec::new())
    }

    fn listening_on(&self, _port: u16) -> Result<Vec<ProcessInfo>> {
        Ok(Vec::new())
    }

    fn signal(&self, pid: u32, _signal: Signal) -> Result<()> {
        let status = std::process::Command::new("taskkill")
            .args(["/PID", &pid.to_string(), "/F"])
            .stdout(std::process::Stdio::null())
            .stderr(std::process::Stdio::null())
            .status()?;
        debug!(pid, success = status.success(), "taskkill finished");
        Ok(())
    }

    fn is_alive(&self, _pid: u32) -> bool {
        false
    }
}

#[cfg(target_os = "linux")]
fn proc_pids() -> Result<Vec<u32>> {
    let entries = std::fs::read_dir("/proc")?;
    Ok(entries
        .filter_map(|e| e.ok())
        .filter_map(|e| e.file_name().to_str().and_then(|s| s.parse().ok()))
        .collect())
}

/// Parse one `ps -o pid= -o ppid= -o comm=` line.
#[cfg_attr(target_os = "linux", allow(dead_code))]
fn parse_ps_line(line: &str) -> Option<ProcessInfo> {
    let mut parts = line.split_whitespace();
    let pid = parts.next()?.parse().ok()?;
    let ppid = parts.next()?.parse().ok()?;
    let command: Vec<&str> = parts.collect();
    if command.is_empty() {
        return None;
    }
    let full = command.join(" ");
    let name = full.rsplit('/').next().unwrap_or(&full).to_string();
    Some(ProcessInfo { pid, ppid, name })
}

#[cfg(unix)]
mod unix {
    use super::*;

    pub fn send_signal(pid: u32, signal: Signal) -> Result<()> {
        let sig = match signal {
            Signal::Terminate => libc::SIGTERM,
            Signal::Kill => libc::SIGKILL,
        };
        // SAFETY: kill(2) has no memory-safety preconditions.
        let rc = unsafe { libc::kill(pid as libc::pid_t, sig) };
        if rc == 0 {
            return Ok(());
        }
        let err = std::io::Error::last_os_error();
        if err.raw_os_error() == Some(libc::ESRCH) {
            debug!(pid, "process already gone");
            return Ok(());
        }
        Err(RehearseError::Io(err))
    }

    #[cfg_attr(target_os = "linux", allow(dead_code))]
    pub fn exists(pid: u32) -> bool {
        // SAFETY: signal 0 only checks for existence and permission.
        let rc = unsafe { libc::kill(pid as libc::pid_t, 0) };
        rc == 0 || std::io::Error::last_os_error().raw_os_error() == Some(libc::EPERM)
    }
}

#[cfg(target_os = "linux")]
mod linux {
    use super::*;

    pub struct Stat {
        pub info: ProcessInfo,
        pub state: char,
    }

    pub fn read_stat(pid: u32) -> Option<Stat> {
        let content = std::fs::read_to_string(format!("/proc/{}/stat", pid)).ok()?;
        parse_stat(&content)
    }

    /// Parse `/proc/<pid>/stat`. The command name is parenthesised and may
    /// itself contain spaces and parentheses, so split on the last `)`.
    pub fn parse_stat(content: &str) -> Option<Stat> {
        let open = content.find('(')?;
        let close = content.rfind(')')?;
        let pid = content[..open].trim().parse().ok()?;
        let name = content[open + 1..close].to_string();
        let mut rest = content[close + 1..].split_whitespace();
        let state = rest.next()?.chars().next()?;
        let ppid = rest.next()?.parse().ok()?;
        Some(Stat {
            info: ProcessInfo { pid, ppid, name },
            state,
        })
    }

    /// Socket inodes in LISTEN state bound to `port` in a `/proc/net/tcp*` table.
    pub fn listening_inodes(content: &str, port: u16) -> Vec<u64> {
        const LISTEN: &str = "0A";
        content
            .lines()
            .skip(1)
            .filter_map(|line| {
                let fields: Vec<&str> = line.split_whitespace().collect();
                if fields.len() < 10 || fields[3] != LISTEN {
                    return None;
                }
                let local_port = fields[1].rsplit(':').next()?;
                if u16::from_str_radix(local_port, 16).ok()? != port {
                    return None;
                }
                fields[9].parse().ok()
            })
            .collect()
    }

    pub fn owns_any_socket(pid: u32, inodes: &HashSet<u64>) -> bool {
        let Ok(fds) = std::fs::read_dir(format!("/proc/{}/fd", pid)) else {
            return false;
        };
        fds.filter_map(|e| e.ok())
            .filter_map(|e| std::fs::read_link(e.path()).ok())
            .filter_map(|target| {
                let target = target.to_string_lossy().into_owned();
                target
                    .strip_prefix("socket:[")
                    .and_then(|s| s.strip_suffix(']'))
                    .and_then(|s| s.parse::<u64>().ok())
            })
            .any(|inode| inodes.contains(&inode))
    }
}
