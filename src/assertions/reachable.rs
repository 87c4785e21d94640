//! Deadline-bounded reachability polling.
//!
//! Decides whether `http://localhost:<port>/<path>` becomes reachable within
//! a startup budget. The budget is an absolute wall-clock deadline, not a
//! retry count, so slow individual probes shorten the number of attempts
//! rather than extending the wait.

use reqwest::blocking::Client;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

use crate::error::{RehearseError, Result};
use crate::playbook::Command;

/// Default pause between probes.
pub const DEFAULT_INTERVAL: Duration = Duration::from_secs(5);

/// Default startup budget.
pub const DEFAULT_STARTUP: Duration = Duration::from_secs(600);

/// Shortest pause between probes, whatever the check asks for.
pub const MIN_INTERVAL: Duration = Duration::from_millis(10);

/// Something that can tell whether an HTTP endpoint answers.
pub trait HttpProbe {
    /// Whether `url` is reachable right now.
    fn is_reachable(&self, url: &str) -> bool;
}

impl<F: Fn(&str) -> bool> HttpProbe for F {
    fn is_reachable(&self, url: &str) -> bool {
        self(url)
    }
}

/// Probe backed by a blocking HTTP client.
///
/// Any response that is not a server error counts as reachable; a refused
/// connection, a timeout or a 5xx does not.
pub struct ReqwestProbe {
    client: Client,
}

impl ReqwestProbe {
    /// Create a probe with a 5-second request timeout.
    pub fn new() -> Result<Self> {
        Self::with_timeout(Duration::from_secs(5))
    }

    /// Create a probe with a custom request timeout.
    pub fn with_timeout(timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .user_agent("rehearse")
            .timeout(timeout)
            .build()
            .map_err(anyhow::Error::from)?;
        Ok(Self { client })
    }
}

impl HttpProbe for ReqwestProbe {
    fn is_reachable(&self, url: &str) -> bool {
        match self.client.get(url).send() {
            Ok(response) => !response.status().is_server_error(),
            Err(e) => {
                debug!(url, error = %e, "probe failed");
                false
            }
        }
    }
}

/// Parameters of one reachability check.
#[derive(Debug, Clone, PartialEq)]
pub struct ReachabilityCheck {
    /// Instruction name used in error messages.
    pub command: String,

    /// Port on localhost. Required.
    pub port: Option<u16>,

    /// Path below the root, without leading slash.
    pub path: String,

    /// Pause between probes.
    pub interval: Duration,

    /// Total startup budget.
    pub startup: Duration,

    /// Whether an empty path is a configuration error.
    pub require_path: bool,
}

impl Default for ReachabilityCheck {
    fn default() -> Self {
        Self {
            command: "serverIsReachable".to_string(),
            port: None,
            path: String::new(),
            interval: DEFAULT_INTERVAL,
            startup: DEFAULT_STARTUP,
            require_path: false,
        }
    }
}

impl ReachabilityCheck {
    /// Check for `port` with default path, interval and budget.
    pub fn new(port: u16) -> Self {
        Self {
            port: Some(port),
            ..Default::default()
        }
    }

    /// Read `{port, path, interval, startupTime}` from the object parameter
    /// at `index` of `command`. Durations are given in seconds; an interval
    /// of zero falls back to the default.
    pub fn from_command(command: &Command, index: usize, require_path: bool) -> Self {
        let defaults = Self::default();
        let interval = command
            .param_field_u64(index, "interval")
            .or_else(|| command.param_field_u64(index, "intervall"))
            .filter(|secs| *secs > 0)
            .map(Duration::from_secs)
            .unwrap_or(defaults.interval);
        let startup = command
            .param_field_u64(index, "startupTime")
            .map(Duration::from_secs)
            .unwrap_or(defaults.startup);

        Self {
            command: command.name.clone(),
            port: command
                .param_field_u64(index, "port")
                .and_then(|p| u16::try_from(p).ok())
                .filter(|p| *p != 0),
            path: command
                .param_field_str(index, "path")
                .unwrap_or_default()
                .trim_start_matches('/')
                .to_string(),
            interval,
            startup,
            require_path,
        }
    }

    /// The probed URL, or `None` without a port.
    pub fn url(&self) -> Option<String> {
        self.port
            .map(|port| format!("http://localhost:{}/{}", port, self.path))
    }

    /// Fail with a configuration error if the port (or a required path) is
    /// missing.
    pub fn validate(&self) -> Result<()> {
        if self.port.is_none() || (self.require_path && self.path.is_empty()) {
            let extra = if self.require_path { "and a path " } else { "" };
            return Err(RehearseError::missing_argument(
                &self.command,
                format!("You have to specify a port {}for the server.", extra),
            ));
        }
        Ok(())
    }
}

/// Statistics of a successful poll.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollReport {
    /// Number of probes performed, including the successful one.
    pub attempts: usize,

    /// Time from the first probe until success.
    pub elapsed: Duration,
}

/// Probe until the endpoint answers or the startup budget runs out.
///
/// Validation happens before the first probe. A reachable endpoint returns
/// immediately; otherwise the poller sleeps one interval (or the remaining
/// budget, whichever is shorter) and probes again. It fails only once the
/// deadline has passed, never earlier.
pub fn wait_until_reachable(check: &ReachabilityCheck, probe: &dyn HttpProbe) -> Result<PollReport> {
    wait_until_reachable_while(check, probe, &mut || Ok(()))
}

/// Like [`wait_until_reachable`], but calls `alive` before every probe and
/// gives up with its error as soon as it returns one.
///
/// Lets a caller stop waiting for a server whose process already died.
pub fn wait_until_reachable_while(
    check: &ReachabilityCheck,
    probe: &dyn HttpProbe,
    alive: &mut dyn FnMut() -> Result<()>,
) -> Result<PollReport> {
    check.validate()?;
    let url = check.url().unwrap_or_default();

    let start = Instant::now();
    let deadline = start.checked_add(check.startup).ok_or_else(|| {
        RehearseError::missing_argument(
            &check.command,
            format!("startupTime of {}s is out of range.", check.startup.as_secs()),
        )
    })?;
    let interval = check.interval.max(MIN_INTERVAL);
    let mut attempts = 0;
    info!(url = %url, budget_secs = check.startup.as_secs(), "waiting for endpoint");

    loop {
        if let Err(e) = alive() {
            warn!(url = %url, attempts, error = %e, "stopped waiting for endpoint");
            return Err(e);
        }
        attempts += 1;
        let reached = probe.is_reachable(&url);
        let now = Instant::now();
        debug!(url = %url, attempt = attempts, reached, "probe");

        if reached {
            let elapsed = now.duration_since(start);
            info!(url = %url, attempts, elapsed_ms = elapsed.as_millis() as u64, "endpoint reachable");
            return Ok(PollReport { attempts, elapsed });
        }

        if now >= deadline {
            warn!(url = %url, attempts, "endpoint did not become reachable");
            return Err(RehearseError::Unreachable {
                url,
                seconds: check.startup.as_secs(),
            });
        }

        std::thread::sleep(interval.min(deadline - now));
    }
}
