//! `RepositoryService`: initializing a shared object store, converting
//! a plain repo into one, and enumerating branches without a workspace.
//!
//! Follows the same "probe, validate, mutate, roll back on failure" shape
//! as every other mutating operation in this crate.

use std::fs;
use std::path::{Path, PathBuf};

use super::Repository;
use crate::git::GitError;

#[derive(Debug)]
pub enum ConvertError {
    /// `convertPlainToShared` called on a directory that is already a shared
    /// store (round-trip law in §8: `initShared` then `convertPlainToShared`
    /// is a no-op).
    AlreadyShared,
    /// Working tree has uncommitted, staged, or untracked changes.
    DirtyWorkingTree,
    /// Submodules are present; conversion is refused.
    SubmodulesPresent,
    Git(GitError),
}

impl std::fmt::Display for ConvertError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConvertError::AlreadyShared => write!(
                f,
                "repository is already a shared object store\n\nhint: nothing to convert"
            ),
            ConvertError::DirtyWorkingTree => write!(
                f,
                "working tree has uncommitted changes\n\nhint: commit or stash them before converting"
            ),
            ConvertError::SubmodulesPresent => write!(
                f,
                "repository has submodules\n\nhint: conversion to a shared object store does not support submodules"
            ),
            ConvertError::Git(e) => write!(f, "{e}"),
        }
    }
}

impl std::error::Error for ConvertError {}

impl From<GitError> for ConvertError {
    fn from(e: GitError) -> Self {
        ConvertError::Git(e)
    }
}

pub struct ConvertedRepository {
    pub default_branch: String,
    pub original_path: PathBuf,
}

/// Creates and converts shared object stores; does not itself manage
/// per-branch workspaces (that's `WorkspaceManager`, layered on top).
pub struct RepositoryService;

impl RepositoryService {
    /// `initShared(path, remoteUrl?)`: create `<path>/.bare`, write
    /// `<path>/.git` as a pointer file, configure `origin` if given, resolve
    /// the default branch.
    pub fn init_shared(path: &Path, remote_url: Option<&str>) -> Result<(String, Repository), ConvertError> {
        fs::create_dir_all(path).map_err(|e| GitError::command_failed(e.to_string(), -1))?;
        let bare_dir = path.join(".bare");

        let repo = Repository::at(path);
        repo.run_command(&[
            "init",
            "--bare",
            bare_dir.to_str().expect("utf-8 path"),
        ])?;

        fs::write(path.join(".git"), "gitdir: ./.bare\n")
            .map_err(|e| GitError::command_failed(e.to_string(), -1))?;

        let bare_repo = Repository::at(&bare_dir);
        let default_branch = match remote_url {
            Some(url) => {
                bare_repo.run_command(&["remote", "add", "origin", url])?;
                bare_repo.fetch()?;
                // `fetch` alone never creates `refs/remotes/origin/HEAD` —
                // only `clone` or this does. Without it,
                // `resolve_default_branch`'s first preference (remote HEAD)
                // can never resolve for a bare store set up this way, and
                // falls through to a literal "main" that may not match any
                // ref the remote actually has.
                let _ = bare_repo.run_command(&["remote", "set-head", "origin", "--auto"]);
                bare_repo.resolve_default_branch()?
            }
            // No remote to clone from: the bare store has zero refs, so
            // there is nothing for the first workspace's `worktree add` to
            // check out. Seed one empty commit on the resolved branch name.
            None => {
                let branch = bare_repo.resolve_default_branch()?;
                bare_repo.create_initial_commit(&branch)?;
                branch
            }
        };
        Ok((default_branch, bare_repo))
    }

    /// `canConvertPlainToShared`: the working tree must be clean and free of
    /// submodules.
    pub fn can_convert_plain_to_shared(path: &Path) -> Result<(), ConvertError> {
        if path.join(".bare").exists() {
            return Err(ConvertError::AlreadyShared);
        }
        let repo = Repository::at(path);
        let clean = repo.run_command_check(&["diff", "--quiet", "--exit-code"])?
            && repo.run_command_check(&["diff", "--cached", "--quiet", "--exit-code"])?;
        if !clean {
            return Err(ConvertError::DirtyWorkingTree);
        }
        let untracked = repo.run_command(&["status", "--porcelain", "--untracked-files=all"])?;
        if !untracked.trim().is_empty() {
            return Err(ConvertError::DirtyWorkingTree);
        }
        if path.join(".gitmodules").exists() {
            return Err(ConvertError::SubmodulesPresent);
        }
        Ok(())
    }

    /// `convertPlainToShared`: move `.git` into `.bare`, write the pointer
    /// file, then re-establish a workspace for the branch that was checked
    /// out as a sibling directory of `.bare` — after conversion `path` holds
    /// only `.bare`, `.git`, and that one workspace directory, matching the
    /// shared-store-parent layout (§3) so `DirectoryProber.classify(path)`
    /// reports `SharedStoreParent`, not `Workspace`. Rolls back to the
    /// original layout on any failure up through worktree creation; the
    /// final removal of the stale top-level checkout only happens once the
    /// new worktree exists, so a failure never leaves the repository without
    /// a working tree.
    pub fn convert_plain_to_shared(path: &Path) -> Result<ConvertedRepository, ConvertError> {
        Self::can_convert_plain_to_shared(path)?;

        let repo = Repository::at(path);
        let current_branch = repo
            .run_command(&["rev-parse", "--abbrev-ref", "HEAD"])?
            .trim()
            .to_string();

        let git_dir = path.join(".git");
        let bare_dir = path.join(".bare");

        let rollback = |err: ConvertError| -> ConvertError {
            if bare_dir.exists() && !git_dir.exists() {
                let _ = fs::rename(&bare_dir, &git_dir);
            }
            err
        };

        fs::rename(&git_dir, &bare_dir).map_err(|e| GitError::command_failed(e.to_string(), -1))?;

        let bare_repo = Repository::at(&bare_dir);
        if let Err(e) = bare_repo.run_command(&["config", "core.bare", "true"]) {
            return Err(rollback(e.into()));
        }

        let default_branch = match bare_repo.resolve_default_branch() {
            Ok(b) => b,
            Err(e) => return Err(rollback(e.into())),
        };

        let workspace_branch = if current_branch.is_empty() || current_branch == "HEAD" {
            default_branch.clone()
        } else {
            current_branch
        };

        let branch_dir = crate::slug::sanitize_branch_for_path(&workspace_branch);
        let branch_path = path.join(&branch_dir);
        if let Err(e) = bare_repo.add_worktree(&branch_path, &workspace_branch, None) {
            let _ = fs::remove_dir_all(&branch_path);
            return Err(rollback(e.into()));
        }

        // The worktree now holds a fresh checkout of `workspace_branch`; the
        // stale top-level copy (validated clean, so purely tracked content)
        // is no longer needed and would otherwise collide with the
        // shared-store-parent layout invariant.
        if let Ok(entries) = fs::read_dir(path) {
            for entry in entries.filter_map(|e| e.ok()) {
                let entry_path = entry.path();
                if entry_path == bare_dir || entry_path == branch_path {
                    continue;
                }
                if entry.file_type().map(|t| t.is_dir()).unwrap_or(false) {
                    let _ = fs::remove_dir_all(&entry_path);
                } else {
                    let _ = fs::remove_file(&entry_path);
                }
            }
        }

        fs::write(&git_dir, "gitdir: ./.bare\n").map_err(|e| GitError::command_failed(e.to_string(), -1))?;

        Ok(ConvertedRepository {
            default_branch,
            original_path: path.to_path_buf(),
        })
    }

    /// Branch names with no workspace checked out anywhere (§4.2).
    pub fn enumerate_branches_without_workspace(
        repo: &Repository,
        checked_out: &[String],
    ) -> Result<Vec<String>, GitError> {
        let branches = repo.local_branches()?;
        Ok(branches
            .into_iter()
            .filter(|b| !checked_out.iter().any(|c| c == b))
            .collect())
    }
}
