//! `MultiplexerDriver` (§4.4): the only component allowed to call the
//! multiplexer binary. `TmuxDriver` is the reference binding to `tmux`
//! (§6); any multiplexer exposing the same contract could implement the
//! trait instead.

use std::path::Path;

use crate::shell_exec::{Cmd, MUX_DEADLINE};

#[derive(Debug)]
pub enum MultiplexerError {
    CommandFailed { stderr: String },
    NotAvailable,
    Timeout(String),
}

impl std::fmt::Display for MultiplexerError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MultiplexerError::CommandFailed { stderr } => {
                write!(f, "multiplexer command failed: {}", stderr.trim())
            }
            MultiplexerError::NotAvailable => write!(
                f,
                "multiplexer binary not found\n\nhint: set CGWT_MUX or install tmux"
            ),
            MultiplexerError::Timeout(op) => write!(f, "{op} timed out waiting on the multiplexer"),
        }
    }
}

impl std::error::Error for MultiplexerError {}

impl From<std::io::Error> for MultiplexerError {
    fn from(e: std::io::Error) -> Self {
        let msg = e.to_string();
        if let Some(rest) = msg.strip_prefix(crate::shell_exec::TIMEOUT_TAG) {
            let op = rest.split_once(' ').map(|(op, _)| op).unwrap_or(rest);
            return MultiplexerError::Timeout(op.to_string());
        }
        MultiplexerError::CommandFailed { stderr: msg }
    }
}

#[derive(Debug, Clone)]
pub struct SessionInfo {
    pub name: String,
    pub window_count: usize,
    pub created: u64,
    pub attached: bool,
    pub assistant_running: bool,
}

/// Per-session observed lifecycle (§4.4): `absent -> detached -> attached ->
/// detached -> stopped`. All operations below are idempotent with respect
/// to this state machine.
pub trait MultiplexerDriver {
    fn available(&self) -> bool;
    fn inside_multiplexer(&self) -> bool;
    fn create_detached(&self, name: &str, cwd: &Path, command: Option<&str>) -> Result<(), MultiplexerError>;
    fn attach(&self, name: &str) -> Result<(), MultiplexerError>;
    fn list_sessions(&self) -> Result<Vec<SessionInfo>, MultiplexerError>;
    fn shutdown_all(&self, prefix: &str) -> Result<(), MultiplexerError>;
    fn split_pane(
        &self,
        target: Option<&str>,
        horizontal: bool,
        percentage: Option<u8>,
        command: Option<&str>,
        cwd: Option<&Path>,
    ) -> Result<(), MultiplexerError>;
}

/// Parse one `tmux list-sessions -F` line into a [`SessionInfo`] with
/// `assistant_running` defaulted to `false` (the caller fills it in from a
/// separate `list-panes` query, since that's a second round-trip to the
/// multiplexer this function has no business making).
fn parse_session_line(line: &str) -> Option<SessionInfo> {
    let mut fields = line.split('\t');
    let (Some(name), Some(windows), Some(created), Some(attached)) =
        (fields.next(), fields.next(), fields.next(), fields.next())
    else {
        return None;
    };
    Some(SessionInfo {
        name: name.to_string(),
        window_count: windows.parse().unwrap_or(0),
        created: created.parse().unwrap_or(0),
        attached: attached.trim() != "0",
        assistant_running: false,
    })
}

/// Binds `MultiplexerDriver` to the `tmux` CLI. The binary name comes from
/// `CGWT_MUX` (default `tmux`) via `Config`.
pub struct TmuxDriver {
    binary: String,
    assistant_substring: String,
}

impl TmuxDriver {
    pub fn new(binary: impl Into<String>, assistant_substring: impl Into<String>) -> Self {
        Self {
            binary: binary.into(),
            assistant_substring: assistant_substring.into(),
        }
    }

    fn cmd(&self) -> Cmd {
        Cmd::new(&self.binary).timeout(MUX_DEADLINE)
    }

    fn session_exists(&self, name: &str) -> Result<bool, MultiplexerError> {
        let out = self.cmd().args(["has-session", "-t", name]).run()?;
        Ok(out.status.success())
    }

    fn pane_processes(&self, name: &str) -> Result<Vec<String>, MultiplexerError> {
        let out = self
            .cmd()
            .args(["list-panes", "-t", name, "-F", "#{pane_current_command}"])
            .run()?;
        if !out.status.success() {
            return Ok(Vec::new());
        }
        Ok(String::from_utf8_lossy(&out.stdout)
            .lines()
            .map(str::to_string)
            .collect())
    }
}

impl MultiplexerDriver for TmuxDriver {
    fn available(&self) -> bool {
        which::which(&self.binary).is_ok()
    }

    fn inside_multiplexer(&self) -> bool {
        std::env::var_os("TMUX").is_some()
    }

    fn create_detached(&self, name: &str, cwd: &Path, command: Option<&str>) -> Result<(), MultiplexerError> {
        if self.session_exists(name)? {
            return Ok(());
        }
        let cwd_str = cwd.to_string_lossy().into_owned();
        let mut args = vec!["new-session", "-d", "-s", name, "-c", cwd_str.as_str()];
        if let Some(command) = command {
            args.push(command);
        }
        let out = self.cmd().args(args).run()?;
        if !out.status.success() {
            return Err(MultiplexerError::CommandFailed {
                stderr: String::from_utf8_lossy(&out.stderr).into_owned(),
            });
        }
        Ok(())
    }

    fn attach(&self, name: &str) -> Result<(), MultiplexerError> {
        let subcommand = if self.inside_multiplexer() {
            "switch-client"
        } else {
            "attach-session"
        };
        let out = self.cmd().args([subcommand, "-t", name]).run()?;
        if !out.status.success() {
            return Err(MultiplexerError::CommandFailed {
                stderr: String::from_utf8_lossy(&out.stderr).into_owned(),
            });
        }
        Ok(())
    }

    fn list_sessions(&self) -> Result<Vec<SessionInfo>, MultiplexerError> {
        let out = self
            .cmd()
            .args([
                "list-sessions",
                "-F",
                "#{session_name}\t#{session_windows}\t#{session_created}\t#{session_attached}",
            ])
            .run()?;
        if !out.status.success() {
            // No server running is reported as a clean "no sessions", not an error.
            return Ok(Vec::new());
        }

        let mut sessions = Vec::new();
        for line in String::from_utf8_lossy(&out.stdout).lines() {
            let Some(mut info) = parse_session_line(line) else {
                continue;
            };
            info.assistant_running = self
                .pane_processes(&info.name)
                .unwrap_or_default()
                .iter()
                .any(|p| p.contains(&self.assistant_substring));
            sessions.push(info);
        }
        Ok(sessions)
    }

    fn shutdown_all(&self, prefix: &str) -> Result<(), MultiplexerError> {
        for session in self.list_sessions()? {
            if session.name.starts_with(prefix) {
                let _ = self.cmd().args(["kill-session", "-t", session.name.as_str()]).run();
            }
        }
        Ok(())
    }

    fn split_pane(
        &self,
        target: Option<&str>,
        horizontal: bool,
        percentage: Option<u8>,
        command: Option<&str>,
        cwd: Option<&Path>,
    ) -> Result<(), MultiplexerError> {
        let mut args: Vec<String> = vec!["split-window".to_string()];
        args.push(if horizontal { "-h".to_string() } else { "-v".to_string() });
        if let Some(target) = target {
            args.push("-t".to_string());
            args.push(target.to_string());
        }
        if let Some(percentage) = percentage {
            args.push("-p".to_string());
            args.push(percentage.to_string());
        }
        if let Some(cwd) = cwd {
            args.push("-c".to_string());
            args.push(cwd.to_string_lossy().into_owned());
        }
        if let Some(command) = command {
            args.push(command.to_string());
        }
        let out = self.cmd().args(args).run()?;
        if !out.status.success() {
            return Err(MultiplexerError::CommandFailed {
                stderr: String::from_utf8_lossy(&out.stderr).into_owned(),
            });
        }
        Ok(())
    }
}
