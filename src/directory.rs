//! `DirectoryProber` (§4.1): classify a path into one of five states before
//! `AppController` decides what to do with it.

use std::fs;
use std::path::{Path, PathBuf};

use crate::git::Repository;
use crate::shell_exec::Cmd;

#[derive(Debug)]
pub enum ProbeError {
    Io { path: PathBuf, source: std::io::Error },
}

impl std::fmt::Display for ProbeError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ProbeError::Io { path, source } => {
                write!(f, "could not classify {}: {source}", path.display())
            }
        }
    }
}

impl std::error::Error for ProbeError {}

#[derive(Debug, Clone, PartialEq)]
pub enum DirectoryState {
    Empty { path: PathBuf },
    PlainRepo {
        path: PathBuf,
        branch: Option<String>,
        remote: Option<String>,
    },
    SharedStoreParent { path: PathBuf },
    Workspace {
        path: PathBuf,
        branch: Option<String>,
        remote: Option<String>,
    },
    NonRepo { path: PathBuf },
}

impl DirectoryState {
    pub fn path(&self) -> &Path {
        match self {
            DirectoryState::Empty { path }
            | DirectoryState::PlainRepo { path, .. }
            | DirectoryState::SharedStoreParent { path }
            | DirectoryState::Workspace { path, .. }
            | DirectoryState::NonRepo { path } => path,
        }
    }
}

pub struct DirectoryProber;

impl DirectoryProber {
    /// `classify(path)` — see §4.1 for the five-step algorithm.
    pub fn classify(path: &Path) -> Result<DirectoryState, ProbeError> {
        let io_err = |source: std::io::Error| ProbeError::Io {
            path: path.to_path_buf(),
            source,
        };

        if !path.exists() {
            fs::create_dir_all(path).map_err(io_err)?;
            return Ok(DirectoryState::Empty { path: path.to_path_buf() });
        }

        let is_empty = fs::read_dir(path).map_err(io_err)?.next().is_none();
        if is_empty {
            return Ok(DirectoryState::Empty { path: path.to_path_buf() });
        }

        if Self::is_shared_store_parent(path) {
            return Ok(DirectoryState::SharedStoreParent { path: path.to_path_buf() });
        }

        let status_ok = Cmd::new("git")
            .args(["status", "--porcelain"])
            .current_dir(path)
            .run()
            .map(|out| out.status.success())
            .unwrap_or(false);
        if !status_ok {
            return Ok(DirectoryState::NonRepo { path: path.to_path_buf() });
        }

        let repo = Repository::at(path);
        let branch = repo
            .run_command(&["rev-parse", "--abbrev-ref", "HEAD"])
            .ok()
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty() && s != "HEAD");
        let remote = repo.remotes().ok().and_then(|r| r.into_iter().next());

        let dot_git = path.join(".git");
        let is_workspace = dot_git.is_file()
            && fs::read_to_string(&dot_git)
                .map(|content| content.starts_with("gitdir:"))
                .unwrap_or(false);

        if is_workspace {
            Ok(DirectoryState::Workspace { path: path.to_path_buf(), branch, remote })
        } else {
            Ok(DirectoryState::PlainRepo { path: path.to_path_buf(), branch, remote })
        }
    }

    /// A directory named `.bare` with a `HEAD` file, plus a `.git` pointer
    /// file whose content references it.
    fn is_shared_store_parent(path: &Path) -> bool {
        let bare_dir = path.join(".bare");
        if !bare_dir.join("HEAD").is_file() {
            return false;
        }
        let dot_git = path.join(".git");
        fs::read_to_string(&dot_git)
            .map(|content| content.contains("gitdir: ./.bare"))
            .unwrap_or(false)
    }
}
