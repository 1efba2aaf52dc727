//! Low-level `git worktree` listing, consumed by `WorkspaceManager`.
//!
//! Trimmed to what the `Workspace` model needs — no `@`/`-`/`^` symbol
//! resolution, no sparse-checkout or fsmonitor concerns.

use std::path::PathBuf;

use super::Repository;
use crate::git::{GitError, parse_worktree_porcelain};

/// Outcome of resolving a branch name against live worktrees.
#[derive(Debug, Clone)]
pub enum ResolvedWorkspace {
    Workspace { path: PathBuf, branch: Option<String> },
    BranchOnly { branch: String },
}

impl Repository {
    /// All non-bare worktrees of this repository.
    pub fn list_worktrees(&self) -> Result<Vec<crate::git::RawWorktree>, GitError> {
        let stdout = self.run_command(&["worktree", "list", "--porcelain"])?;
        Ok(parse_worktree_porcelain(&stdout)
            .into_iter()
            .filter(|wt| !wt.bare)
            .collect())
    }

    pub fn worktree_for_branch(&self, branch: &str) -> Result<Option<PathBuf>, GitError> {
        Ok(self
            .list_worktrees()?
            .into_iter()
            .find(|wt| wt.branch.as_deref() == Some(branch))
            .map(|wt| wt.path))
    }

    pub fn resolve_workspace(&self, branch: &str) -> Result<ResolvedWorkspace, GitError> {
        match self.worktree_for_branch(branch)? {
            Some(path) => Ok(ResolvedWorkspace::Workspace {
                path,
                branch: Some(branch.to_string()),
            }),
            None => Ok(ResolvedWorkspace::BranchOnly {
                branch: branch.to_string(),
            }),
        }
    }

    /// `git worktree add <path> [-b <branch> <base>]`.
    ///
    /// When `base` names neither a local branch nor any other resolvable
    /// revision (the common case right after `initShared` clones a remote:
    /// only `origin/<base>` exists yet, no local `refs/heads/<base>`), this
    /// falls back to `origin/<base>` — the same remote-tracking branch a
    /// real `git clone` would have set the initial checkout's upstream to.
    pub fn add_worktree(&self, path: &std::path::Path, branch: &str, base: Option<&str>) -> Result<(), GitError> {
        let path_str = path.to_string_lossy().into_owned();
        let branch_exists = self.local_branches()?.iter().any(|b| b == branch);

        let mut args: Vec<&str> = vec!["worktree", "add"];
        let resolved_base;
        if !branch_exists {
            args.push("-b");
            args.push(branch);
            args.push(&path_str);
            if let Some(base) = base {
                resolved_base = self.resolve_base_revision(base)?;
                args.push(&resolved_base);
            }
        } else {
            args.push(&path_str);
            args.push(branch);
        }
        self.run_command(&args)?;
        Ok(())
    }

    /// Resolve a worktree base name to a revision `git worktree add` can
    /// actually check out: the name itself if it's a local branch or any
    /// other revision git already understands, otherwise `origin/<name>`.
    fn resolve_base_revision(&self, base: &str) -> Result<String, GitError> {
        if self.run_command_check(&["rev-parse", "--verify", "--quiet", base])? {
            return Ok(base.to_string());
        }
        let remote_tracking = format!("origin/{base}");
        if self.run_command_check(&["rev-parse", "--verify", "--quiet", &remote_tracking])? {
            return Ok(remote_tracking);
        }
        Ok(base.to_string())
    }

    /// `git worktree remove [--force] <path>`.
    pub fn remove_worktree(&self, path: &std::path::Path, force: bool) -> Result<(), GitError> {
        let path_str = path.to_string_lossy().into_owned();
        let mut args = vec!["worktree", "remove"];
        if force {
            args.push("--force");
        }
        args.push(&path_str);
        self.run_command(&args)?;
        Ok(())
    }
}
