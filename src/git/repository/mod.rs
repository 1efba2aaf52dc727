//! [`Repository`] — the shared object store identified by its absolute path
//! (§3), plus the low-level `git` command execution every higher-level
//! component (`RepositoryService`, `WorkspaceManager`) runs through.

mod service;
mod worktrees;

pub use service::{ConvertError, ConvertedRepository, RepositoryService};
pub use worktrees::ResolvedWorkspace;

use std::path::{Path, PathBuf};

use crate::git::GitError;
use crate::shell_exec::{Cmd, GIT_DEADLINE};

/// Preferred default-branch candidates when no remote `HEAD` is set (§3).
const DEFAULT_BRANCH_CANDIDATES: &[&str] = &["main", "master", "trunk"];

/// A git repository identified by the absolute path of its shared object
/// store (the `.bare` directory for a converted repo, or the ordinary `.git`
/// directory otherwise).
#[derive(Debug, Clone)]
pub struct Repository {
    /// Path git commands are run from — any path inside the repository.
    root: PathBuf,
}

impl Repository {
    /// Wrap an already-known repository root. Does not touch the filesystem.
    pub fn at(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Run a git subcommand, returning stdout on success.
    pub fn run_command(&self, args: &[&str]) -> Result<String, GitError> {
        let output = self.run_command_output(args)?;
        if !output.status.success() {
            return Err(GitError::command_failed(
                String::from_utf8_lossy(&output.stderr),
                output.status.code().unwrap_or(-1),
            ));
        }
        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }

    /// Run a git subcommand and return whether it exited zero, without
    /// treating a non-zero exit as an error — for boolean-result commands
    /// like `diff --quiet`.
    pub fn run_command_check(&self, args: &[&str]) -> Result<bool, GitError> {
        Ok(self.run_command_output(args)?.status.success())
    }

    pub(crate) fn run_command_output(&self, args: &[&str]) -> Result<std::process::Output, GitError> {
        Cmd::new("git")
            .args(args.iter().copied())
            .current_dir(&self.root)
            .context(format!("git {}", args.join(" ")))
            .timeout(GIT_DEADLINE)
            .run()
            .map_err(GitError::from)
    }

    /// Resolve the default branch per §3's preference order: remote `HEAD`
    /// symbolic ref, then `main`, `master`, `trunk`, then any first branch,
    /// falling back to `main` if the repository has no branches at all yet.
    pub fn resolve_default_branch(&self) -> Result<String, GitError> {
        if let Ok(remote_head) = self.run_command(&["symbolic-ref", "refs/remotes/origin/HEAD"]) {
            let trimmed = remote_head.trim();
            if let Some(branch) = trimmed.strip_prefix("refs/remotes/origin/") {
                return Ok(branch.to_string());
            }
        }

        let branches = self.local_branches()?;
        for candidate in DEFAULT_BRANCH_CANDIDATES {
            if branches.iter().any(|b| b == candidate) {
                return Ok((*candidate).to_string());
            }
        }
        if let Some(first) = branches.first() {
            return Ok(first.clone());
        }
        Ok("main".to_string())
    }

    /// All local branch names, in git's own ref-sorted order.
    pub fn local_branches(&self) -> Result<Vec<String>, GitError> {
        let stdout = self.run_command(&["for-each-ref", "--format=%(refname:short)", "refs/heads/"])?;
        Ok(stdout.lines().map(str::to_string).filter(|l| !l.is_empty()).collect())
    }

    /// Configured remote names, e.g. `["origin"]`.
    pub fn remotes(&self) -> Result<Vec<String>, GitError> {
        let stdout = self.run_command(&["remote"])?;
        Ok(stdout.lines().map(str::to_string).filter(|l| !l.is_empty()).collect())
    }

    /// Refresh every configured remote.
    pub fn fetch(&self) -> Result<(), GitError> {
        if self.remotes()?.is_empty() {
            return Ok(());
        }
        self.run_command(&["fetch", "--all", "--prune"])?;
        Ok(())
    }

    /// Give a brand-new, commit-less bare store a first commit on `branch` so
    /// `git worktree add` has something to check out. Used only by
    /// `initShared` when there's no remote to clone from: a fresh `git init
    /// --bare` has no refs at all, and `worktree add -b <branch> <path>
    /// <branch>` fails with "not a valid object name" until one exists.
    pub fn create_initial_commit(&self, branch: &str) -> Result<(), GitError> {
        const EMPTY_TREE: &str = "4b825dc642cb6eb9a060e54bf8d69288fbee4904";
        let commit_sha = self.run_command(&[
            "-c",
            "user.name=cgwt",
            "-c",
            "user.email=cgwt@localhost",
            "commit-tree",
            EMPTY_TREE,
            "-m",
            "Initial commit",
        ])?;
        let commit_sha = commit_sha.trim();
        let branch_ref = format!("refs/heads/{branch}");
        self.run_command(&["update-ref", &branch_ref, commit_sha])?;
        self.run_command(&["symbolic-ref", "HEAD", &branch_ref])?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::process::Command;
    use tempfile::TempDir;

    fn init_repo() -> TempDir {
        let dir = tempfile::tempdir().unwrap();
        Command::new("git").arg("init").arg("-q").current_dir(dir.path()).status().unwrap();
        Command::new("git")
            .args(["config", "user.email", "test@example.com"])
            .current_dir(dir.path())
            .status()
            .unwrap();
        Command::new("git")
            .args(["config", "user.name", "Test"])
            .current_dir(dir.path())
            .status()
            .unwrap();
        std::fs::write(dir.path().join("README"), "hi").unwrap();
        Command::new("git").args(["add", "."]).current_dir(dir.path()).status().unwrap();
        Command::new("git")
            .args(["commit", "-q", "-m", "init"])
            .current_dir(dir.path())
            .status()
            .unwrap();
        dir
    }

    #[test]
    fn resolves_default_branch_without_remote() {
        let dir = init_repo();
        let repo = Repository::at(dir.path());
        let branch = repo.resolve_default_branch().unwrap();
        assert!(branch == "main" || branch == "master");
    }

    #[test]
    fn lists_local_branches() {
        let dir = init_repo();
        let repo = Repository::at(dir.path());
        let branches = repo.local_branches().unwrap();
        assert_eq!(branches.len(), 1);
    }

    #[test]
    fn run_command_surfaces_stderr_on_failure() {
        let dir = init_repo();
        let repo = Repository::at(dir.path());
        let err = repo.run_command(&["not-a-real-subcommand"]).unwrap_err();
        assert!(matches!(err, GitError::CommandFailed { .. }));
    }
}
