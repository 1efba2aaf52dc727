//! `WorkspaceManager`: per-branch workspaces over a shared object store,
//! following the same list/resolve/remove-over-`git worktree` shape as the
//! lower-level `git::repository::worktrees` module, generalized to a
//! `Workspace` record and an `AlreadyExists`/`Busy`/`Missing` error set.

use std::path::PathBuf;

use crate::git::{GitError, Repository};
use crate::slug::sanitize_branch_for_path;

#[derive(Debug)]
pub enum WorkspaceError {
    AlreadyExists { branch: String },
    Busy { branch: String },
    Missing { branch: String },
    Git(GitError),
}

impl std::fmt::Display for WorkspaceError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            WorkspaceError::AlreadyExists { branch } => {
                write!(f, "workspace for {branch} already exists\n\nhint: use a different branch name, or remove the existing workspace first")
            }
            WorkspaceError::Busy { branch } => write!(
                f,
                "workspace for {branch} has an attached session\n\nhint: detach or pass force to remove anyway"
            ),
            WorkspaceError::Missing { branch } => {
                write!(f, "no workspace for {branch}\n\nhint: run 'cgwt list' to see live workspaces")
            }
            WorkspaceError::Git(e) => write!(f, "{e}"),
        }
    }
}

impl std::error::Error for WorkspaceError {}

impl From<GitError> for WorkspaceError {
    fn from(e: GitError) -> Self {
        WorkspaceError::Git(e)
    }
}

/// (repositoryId, branch, absolutePath, head) per §3.
#[derive(Debug, Clone, PartialEq)]
pub struct Workspace {
    pub repository_id: PathBuf,
    pub branch: String,
    pub absolute_path: PathBuf,
    pub head: String,
}

/// Reports whether a branch's workspace has a session attached — implemented
/// by `SessionOrchestrator`; kept as a trait here so `WorkspaceManager`
/// doesn't depend on the session/multiplexer stack directly.
pub trait AttachedSessionCheck {
    fn has_attached_session(&self, branch: &str) -> bool;
}

pub struct WorkspaceManager<'a> {
    repo: &'a Repository,
}

impl<'a> WorkspaceManager<'a> {
    pub fn new(repo: &'a Repository) -> Self {
        Self { repo }
    }

    /// `list()` — every live, non-bare worktree of the shared store.
    pub fn list(&self) -> Result<Vec<Workspace>, WorkspaceError> {
        let worktrees = self.repo.list_worktrees()?;
        Ok(worktrees
            .into_iter()
            .filter_map(|wt| {
                Some(Workspace {
                    repository_id: self.repo.root().to_path_buf(),
                    branch: wt.branch?,
                    absolute_path: wt.path,
                    head: wt.head,
                })
            })
            .collect())
    }

    /// `add(branch, base?)` — create `<repoPath>/<sanitizedBranch>`.
    pub fn add(&self, branch: &str, base: Option<&str>) -> Result<PathBuf, WorkspaceError> {
        if self.repo.worktree_for_branch(branch)?.is_some() {
            return Err(WorkspaceError::AlreadyExists {
                branch: branch.to_string(),
            });
        }

        let repo_parent = self
            .repo
            .root()
            .parent()
            .unwrap_or(self.repo.root())
            .to_path_buf();
        let dir_name = sanitize_branch_for_path(branch);
        let path = repo_parent.join(dir_name);

        let base = match base {
            Some(b) => Some(b.to_string()),
            None => Some(self.repo.resolve_default_branch()?),
        };
        self.repo.add_worktree(&path, branch, base.as_deref())?;
        Ok(path)
    }

    /// `remove(branch, force?)`.
    pub fn remove(
        &self,
        branch: &str,
        force: bool,
        session_check: &impl AttachedSessionCheck,
    ) -> Result<(), WorkspaceError> {
        let Some(path) = self.repo.worktree_for_branch(branch)? else {
            return Err(WorkspaceError::Missing {
                branch: branch.to_string(),
            });
        };

        if !force && session_check.has_attached_session(branch) {
            return Err(WorkspaceError::Busy {
                branch: branch.to_string(),
            });
        }

        self.repo.remove_worktree(&path, force)?;
        Ok(())
    }

    /// `branchesWithoutWorkspace()`.
    pub fn branches_without_workspace(&self) -> Result<Vec<String>, WorkspaceError> {
        let checked_out: Vec<String> = self
            .list()?
            .into_iter()
            .map(|w| w.branch)
            .collect();
        Ok(crate::git::repository::RepositoryService::enumerate_branches_without_workspace(
            self.repo,
            &checked_out,
        )?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::git::repository::RepositoryService;
    use std::process::Command;

    struct NeverAttached;
    impl AttachedSessionCheck for NeverAttached {
        fn has_attached_session(&self, _branch: &str) -> bool {
            false
        }
    }

    struct AlwaysAttached;
    impl AttachedSessionCheck for AlwaysAttached {
        fn has_attached_session(&self, _branch: &str) -> bool {
            true
        }
    }

    fn init_shared() -> (tempfile::TempDir, Repository) {
        let parent = tempfile::tempdir().unwrap();
        let plain = parent.path().join("plain");
        std::fs::create_dir_all(&plain).unwrap();
        Command::new("git").arg("init").arg("-q").current_dir(&plain).status().unwrap();
        Command::new("git").args(["config", "user.email", "t@t.com"]).current_dir(&plain).status().unwrap();
        Command::new("git").args(["config", "user.name", "t"]).current_dir(&plain).status().unwrap();
        std::fs::write(plain.join("f"), "x").unwrap();
        Command::new("git").args(["add", "."]).current_dir(&plain).status().unwrap();
        Command::new("git").args(["commit", "-q", "-m", "x"]).current_dir(&plain).status().unwrap();
        RepositoryService::convert_plain_to_shared(&plain).unwrap();
        let repo = Repository::at(plain.join(".bare"));
        (parent, repo)
    }

    #[test]
    fn add_then_add_again_returns_already_exists() {
        let (_parent, repo) = init_shared();
        let manager = WorkspaceManager::new(&repo);
        manager.add("feature", None).unwrap();
        let err = manager.add("feature", None).unwrap_err();
        assert!(matches!(err, WorkspaceError::AlreadyExists { .. }));
    }

    #[test]
    fn add_list_remove_round_trip() {
        let (_parent, repo) = init_shared();
        let manager = WorkspaceManager::new(&repo);
        manager.add("feature", None).unwrap();
        assert_eq!(manager.list().unwrap().len(), 1);

        manager.remove("feature", false, &NeverAttached).unwrap();
        assert_eq!(manager.list().unwrap().len(), 0);
    }

    #[test]
    fn remove_refuses_when_session_attached_without_force() {
        let (_parent, repo) = init_shared();
        let manager = WorkspaceManager::new(&repo);
        manager.add("feature", None).unwrap();
        let err = manager.remove("feature", false, &AlwaysAttached).unwrap_err();
        assert!(matches!(err, WorkspaceError::Busy { .. }));
    }
}
