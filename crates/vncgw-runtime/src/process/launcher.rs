//! Generic subprocess launcher.
//!
//! Every process a session starts goes through [`ProcessLauncher::start`]
//! and is released through [`ManagedProcess::cancel_and_reap`], which
//! consumes the handle so it can only run once.

use std::path::PathBuf;
use std::process::Stdio;
use std::time::Duration;

use tokio::process::{Child, ChildStdout, Command};
use tokio::task::JoinHandle;
use tracing::{debug, warn};
use vncgw_core::ProcessError;

use super::shutdown::shutdown_child;

/// Description of a process to start.
#[derive(Debug, Clone)]
pub struct LaunchSpec {
    /// Short label used in logs and errors (e.g. "capture server").
    pub name: &'static str,
    pub program: PathBuf,
    pub args: Vec<String>,
    /// Variables overlaid on the inherited environment. `None` inherits it
    /// unmodified.
    pub env: Option<Vec<(String, String)>>,
    /// Connect stdout to a pipe the caller reads from.
    pub capture_stdout: bool,
}

impl LaunchSpec {
    pub fn new(name: &'static str, program: impl Into<PathBuf>) -> Self {
        Self {
            name,
            program: program.into(),
            args: Vec::new(),
            env: None,
            capture_stdout: false,
        }
    }

    #[must_use]
    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    #[must_use]
    pub fn env_overlay(mut self, vars: Vec<(String, String)>) -> Self {
        self.env = Some(vars);
        self
    }

    #[must_use]
    pub const fn capture_stdout(mut self) -> Self {
        self.capture_stdout = true;
        self
    }
}

/// Starts subprocesses with a uniform stdio and teardown policy.
#[derive(Debug, Clone, Copy)]
pub struct ProcessLauncher {
    /// Inherit helper stderr (and uncaptured stdout) instead of discarding it.
    verbose: bool,
    /// SIGTERM → SIGKILL grace period applied on cancellation.
    grace: Duration,
}

impl ProcessLauncher {
    pub const fn new(verbose: bool, grace: Duration) -> Self {
        Self { verbose, grace }
    }

    /// Spawn the process described by `spec`. No retry on failure.
    pub fn start(&self, spec: LaunchSpec) -> Result<ManagedProcess, ProcessError> {
        let mut cmd = Command::new(&spec.program);
        cmd.args(&spec.args).stdin(Stdio::null()).kill_on_drop(true);

        if let Some(vars) = &spec.env {
            cmd.envs(vars.iter().map(|(k, v)| (k.as_str(), v.as_str())));
        }

        let passthrough = || {
            if self.verbose {
                Stdio::inherit()
            } else {
                Stdio::null()
            }
        };
        cmd.stdout(if spec.capture_stdout {
            Stdio::piped()
        } else {
            passthrough()
        });
        cmd.stderr(passthrough());

        let mut child = cmd.spawn().map_err(|source| ProcessError::SpawnFailed {
            name: format!("{} ({})", spec.name, spec.program.display()),
            source,
        })?;

        let pid = child.id();
        let stdout = child.stdout.take();
        debug!(
            helper = spec.name,
            pid = ?pid,
            program = %spec.program.display(),
            "Started process"
        );

        Ok(ManagedProcess {
            name: spec.name,
            pid,
            child,
            stdout,
            grace: self.grace,
        })
    }
}

/// A running process owned by exactly one session slot.
#[derive(Debug)]
pub struct ManagedProcess {
    name: &'static str,
    pid: Option<u32>,
    child: Child,
    stdout: Option<ChildStdout>,
    grace: Duration,
}

impl ManagedProcess {
    pub const fn name(&self) -> &'static str {
        self.name
    }

    pub const fn pid(&self) -> Option<u32> {
        self.pid
    }

    /// Take the captured stdout stream, if one was requested.
    pub fn take_stdout(&mut self) -> Option<ChildStdout> {
        self.stdout.take()
    }

    /// Whether the process has exited. Errors count as exited.
    pub fn has_exited(&mut self) -> bool {
        !matches!(self.child.try_wait(), Ok(None))
    }

    /// Terminate the process and reap it on a background task.
    ///
    /// Best effort: failures are logged, never returned. Tolerates a process
    /// that already exited.
    pub fn cancel_and_reap(self) -> JoinHandle<()> {
        let Self {
            name,
            pid,
            mut child,
            stdout,
            grace,
        } = self;
        drop(stdout);

        tokio::spawn(async move {
            match shutdown_child(&mut child, grace).await {
                Ok(status) => debug!(helper = name, pid = ?pid, %status, "Process reaped"),
                Err(e) => warn!(helper = name, pid = ?pid, error = %e, "Failed to stop process"),
            }
        })
    }
}
