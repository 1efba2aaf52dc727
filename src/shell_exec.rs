//! Subprocess execution with deadlines.
//!
//! Every git and multiplexer invocation in this crate goes through [`Cmd`],
//! which enforces the deadline policy from the concurrency model: a
//! subprocess that outlives its deadline is sent `SIGTERM`, then `SIGKILL`
//! two seconds later if it hasn't exited, and the call returns an IO error
//! that [`crate::git::GitError`]'s `From<io::Error>` impl recognizes and
//! turns into `GitError::Timeout`.

use std::io;
use std::path::Path;
use std::process::{Command, Output, Stdio};
use std::time::{Duration, Instant};

use wait_timeout::ChildExt;

/// Grace period between `SIGTERM` and `SIGKILL` once a deadline is exceeded.
pub const KILL_GRACE_PERIOD: Duration = Duration::from_secs(2);

/// Default deadline for git subprocess invocations (§5).
pub const GIT_DEADLINE: Duration = Duration::from_secs(30);

/// Default deadline for multiplexer subprocess invocations (§5).
pub const MUX_DEADLINE: Duration = Duration::from_secs(10);

/// Prefix embedded in the io::Error message when a command is killed after
/// its deadline elapsed. Parsed back out by `GitError::from(io::Error)` and
/// `MultiplexerError::from(io::Error)`.
pub const TIMEOUT_TAG: &str = "CGWT_TIMEOUT:";

/// A subprocess invocation with a bounded deadline.
///
/// ```no_run
/// use cgwt::shell_exec::{Cmd, GIT_DEADLINE};
///
/// let output = Cmd::new("git")
///     .args(["status", "--porcelain"])
///     .current_dir(".")
///     .context("main")
///     .timeout(GIT_DEADLINE)
///     .run()?;
/// # Ok::<(), std::io::Error>(())
/// ```
pub struct Cmd {
    inner: Command,
    context: Option<String>,
    timeout: Duration,
    op: String,
}

impl Cmd {
    pub fn new(program: &str) -> Self {
        let mut inner = Command::new(program);
        inner.stdin(Stdio::null());
        Self {
            inner,
            context: None,
            timeout: GIT_DEADLINE,
            op: program.to_string(),
        }
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<std::ffi::OsStr>,
    {
        self.inner.args(args);
        self
    }

    pub fn current_dir(mut self, dir: impl AsRef<Path>) -> Self {
        self.inner.current_dir(dir);
        self
    }

    /// A short label used only for debug logging (e.g. the worktree name).
    pub fn context(mut self, context: impl Into<String>) -> Self {
        self.context = Some(context.into());
        self
    }

    /// Override the default deadline (30s git / 10s multiplexer).
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Run the command to completion, enforcing the deadline.
    ///
    /// On timeout, the child is sent `SIGTERM`; if it hasn't exited within
    /// [`KILL_GRACE_PERIOD`], it is sent `SIGKILL`. Either way the call
    /// returns `Err` with a message starting with [`TIMEOUT_TAG`].
    pub fn run(mut self) -> io::Result<Output> {
        let program = self.inner.get_program().to_string_lossy().into_owned();
        let args: Vec<_> = self
            .inner
            .get_args()
            .map(|a| a.to_string_lossy().into_owned())
            .collect();
        let cmd_str = if args.is_empty() {
            program.clone()
        } else {
            format!("{program} {}", args.join(" "))
        };

        match &self.context {
            Some(ctx) => log::debug!("$ {cmd_str} [{ctx}]"),
            None => log::debug!("$ {cmd_str}"),
        }

        self.inner.stdout(Stdio::piped()).stderr(Stdio::piped());

        let t0 = Instant::now();
        let mut child = self.inner.spawn()?;

        let status = match child.wait_timeout(self.timeout)? {
            Some(status) => status,
            None => match terminate_then_kill(&mut child)? {
                Some(status) => status,
                None => {
                    let elapsed = t0.elapsed();
                    let duration_ms = elapsed.as_secs_f64() * 1000.0;
                    log::warn!(
                        "[cgwt-trace] cmd=\"{cmd_str}\" dur={duration_ms:.1}ms timeout (killed)"
                    );
                    crate::command_log::log_command(
                        self.context.as_deref().unwrap_or(&self.op),
                        &cmd_str,
                        None,
                        Some(elapsed),
                    );
                    return Err(io::Error::other(format!(
                        "{TIMEOUT_TAG}{} {cmd_str}",
                        self.op
                    )));
                }
            },
        };

        let elapsed = t0.elapsed();
        let duration_ms = elapsed.as_secs_f64() * 1000.0;
        log::debug!(
            "[cgwt-trace] cmd=\"{cmd_str}\" dur={duration_ms:.1}ms ok={}",
            status.success()
        );
        crate::command_log::log_command(
            self.context.as_deref().unwrap_or(&self.op),
            &cmd_str,
            status.code(),
            Some(elapsed),
        );

        // wait_timeout's ExitStatus doesn't carry captured stdout/stderr; take
        // the pipes directly now that we know the child has exited.
        use std::io::Read;
        let mut stdout = Vec::new();
        if let Some(mut out) = child.stdout.take() {
            out.read_to_end(&mut stdout)?;
        }
        let mut stderr = Vec::new();
        if let Some(mut err) = child.stderr.take() {
            err.read_to_end(&mut stderr)?;
        }

        Ok(Output {
            status,
            stdout,
            stderr,
        })
    }
}

#[cfg(unix)]
fn terminate_then_kill(
    child: &mut std::process::Child,
) -> io::Result<Option<std::process::ExitStatus>> {
    use nix::sys::signal::{self, Signal};
    use nix::unistd::Pid;

    let pid = Pid::from_raw(child.id() as i32);
    let _ = signal::kill(pid, Signal::SIGTERM);

    if let Some(status) = child.wait_timeout(KILL_GRACE_PERIOD)? {
        return Ok(Some(status));
    }

    let _ = signal::kill(pid, Signal::SIGKILL);
    child.wait_timeout(KILL_GRACE_PERIOD)
}

#[cfg(not(unix))]
fn terminate_then_kill(
    child: &mut std::process::Child,
) -> io::Result<Option<std::process::ExitStatus>> {
    let _ = child.kill();
    child.wait_timeout(KILL_GRACE_PERIOD)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn runs_and_captures_stdout() {
        let output = Cmd::new("echo").args(["hello"]).run().unwrap();
        assert!(output.status.success());
        assert_eq!(String::from_utf8_lossy(&output.stdout).trim(), "hello");
    }

    #[test]
    fn captures_nonzero_exit() {
        let output = Cmd::new("sh").args(["-c", "exit 3"]).run().unwrap();
        assert_eq!(output.status.code(), Some(3));
    }

    #[test]
    fn timeout_kills_and_reports() {
        let err = Cmd::new("sleep")
            .args(["5"])
            .timeout(Duration::from_millis(100))
            .run()
            .unwrap_err();
        assert!(err.to_string().contains(TIMEOUT_TAG));
    }
}
