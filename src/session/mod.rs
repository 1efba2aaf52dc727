//! Session identity and the multiplexer/orchestrator components built on it
//! (§3 SessionName/InstanceRecord, §4.4 MultiplexerDriver, §4.5
//! SessionOrchestrator).

pub mod multiplexer;
pub mod orchestrator;

pub use multiplexer::{MultiplexerDriver, MultiplexerError, SessionInfo, TmuxDriver};
pub use orchestrator::SessionOrchestrator;

use crate::slug::session_slug;

/// Deterministic `cgwt-<project>-<branch>` session name (§3).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SessionName(String);

impl SessionName {
    const PREFIX: &'static str = "cgwt-";
    const SUPERVISOR_SLUG: &'static str = "supervisor";

    pub fn for_worker(project: &str, branch: &str) -> Self {
        Self(format!(
            "{}{}-{}",
            Self::PREFIX,
            session_slug(project),
            session_slug(branch)
        ))
    }

    pub fn for_supervisor(project: &str) -> Self {
        Self(format!(
            "{}{}-{}",
            Self::PREFIX,
            session_slug(project),
            Self::SUPERVISOR_SLUG
        ))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for SessionName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Tagged role, modeling supervisor vs. worker as one enum with a variant
/// each rather than two disjoint record types.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    Supervisor,
    Worker,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InstanceStatus {
    Active,
    Idle,
    Stopped,
}

/// (role, sessionName, branch, workspacePath, status) per §3. Owned by
/// `SessionOrchestrator`; reconciled against live multiplexer output on
/// every `list()`.
#[derive(Debug, Clone)]
pub struct InstanceRecord {
    pub role: Role,
    pub session_name: SessionName,
    pub branch: String,
    pub workspace_path: std::path::PathBuf,
    pub status: InstanceStatus,
}

impl InstanceRecord {
    /// `InstanceId` (§3.A): identity is the session name, already unique and
    /// deterministic per (project, branch) — no separate id scheme needed.
    pub fn instance_id(&self) -> &str {
        self.session_name.as_str()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn session_name_matches_spec_example() {
        let name = SessionName::for_worker("my-proj", "feature/x");
        assert_eq!(name.as_str(), "cgwt-my-proj-feature-x");
    }

    #[test]
    fn supervisor_session_name_uses_fixed_slug() {
        let name = SessionName::for_supervisor("my-proj");
        assert_eq!(name.as_str(), "cgwt-my-proj-supervisor");
    }

    #[test]
    fn distinct_projects_same_branch_produce_distinct_names() {
        let a = SessionName::for_worker("proj-a", "feature");
        let b = SessionName::for_worker("proj-b", "feature");
        assert_ne!(a, b);
    }
}
