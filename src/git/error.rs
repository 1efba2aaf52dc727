//! Git subprocess error taxonomy (spec §7).

/// Failure surfaced by any `git` subprocess invocation.
#[derive(Debug)]
pub enum GitError {
    /// Non-zero exit from `git`; the raw stderr is kept for the caller to
    /// print or log, exit code kept separately for callers that branch on it.
    CommandFailed { stderr: String, exit_code: i32 },
    /// A deadline (§5) elapsed and the subprocess was killed. Carries the
    /// operation name (e.g. `"git worktree add"`) for the hint.
    Timeout(String),
    /// A git invocation succeeded but its output couldn't be parsed into
    /// the shape the caller expected (e.g. `worktree list --porcelain`).
    ParseError(String),
}

impl GitError {
    pub fn command_failed(stderr: impl Into<String>, exit_code: i32) -> Self {
        GitError::CommandFailed {
            stderr: stderr.into(),
            exit_code,
        }
    }
}

impl std::fmt::Display for GitError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            GitError::CommandFailed { stderr, exit_code } => {
                let trimmed = stderr.trim();
                if trimmed.is_empty() {
                    write!(f, "git command failed (exit {exit_code})")
                } else {
                    write!(f, "git command failed (exit {exit_code}):\n{trimmed}")
                }
            }
            GitError::Timeout(op) => {
                write!(
                    f,
                    "{op} timed out\n\nhint: the subprocess was sent SIGTERM then SIGKILL after not completing within its deadline"
                )
            }
            GitError::ParseError(msg) => write!(f, "could not parse git output: {msg}"),
        }
    }
}

impl std::error::Error for GitError {}

/// Parses the `CGWT_TIMEOUT:` tag emitted by [`crate::shell_exec::Cmd::run`]
/// back into [`GitError::Timeout`]; anything else becomes `CommandFailed`
/// with exit code -1 (no process actually ran, e.g. binary not found).
impl From<std::io::Error> for GitError {
    fn from(e: std::io::Error) -> Self {
        let msg = e.to_string();
        if let Some(rest) = msg.strip_prefix(crate::shell_exec::TIMEOUT_TAG) {
            let op = rest.split_once(' ').map(|(op, _)| op).unwrap_or(rest);
            return GitError::Timeout(op.to_string());
        }
        GitError::CommandFailed {
            stderr: msg,
            exit_code: -1,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn io_error_with_timeout_tag_becomes_timeout() {
        let tagged = format!("{}git worktree add cmd", crate::shell_exec::TIMEOUT_TAG);
        let err = GitError::from(std::io::Error::other(tagged));
        assert!(matches!(err, GitError::Timeout(op) if op == "git worktree add"));
    }

    #[test]
    fn plain_io_error_becomes_command_failed() {
        let err = GitError::from(std::io::Error::other("no such file"));
        assert!(matches!(err, GitError::CommandFailed { exit_code: -1, .. }));
    }
}
