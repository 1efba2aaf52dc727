//! Shared scaffolding for the integration suite (§1.D): real `git`-backed
//! scratch repositories and a fake multiplexer, since no actual `tmux`
//! server is assumed to be available wherever these tests run.

#![allow(dead_code)]

use std::cell::RefCell;
use std::path::{Path, PathBuf};
use std::process::Command;

use cgwt::session::{MultiplexerDriver, MultiplexerError, SessionInfo};

/// A plain git repository with one commit, in a fresh temp directory.
pub struct TestRepo {
    pub dir: tempfile::TempDir,
}

impl TestRepo {
    pub fn init_on_branch(branch: &str) -> Self {
        let dir = tempfile::tempdir().unwrap();
        run_git(dir.path(), &["init", "-q", "-b", branch]);
        run_git(dir.path(), &["config", "user.email", "t@example.com"]);
        run_git(dir.path(), &["config", "user.name", "Test"]);
        std::fs::write(dir.path().join("README.md"), "hello\n").unwrap();
        run_git(dir.path(), &["add", "."]);
        run_git(dir.path(), &["commit", "-q", "-m", "initial"]);
        Self { dir }
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }
}

/// A bare repository seeded with one commit on `branch`, suitable as a
/// `file://`-style local "remote" for clone/fetch scenarios without any
/// network access.
pub struct TestRemote {
    pub bare_dir: tempfile::TempDir,
}

impl TestRemote {
    pub fn seeded_on_branch(branch: &str) -> Self {
        let seed = TestRepo::init_on_branch(branch);
        let bare_dir = tempfile::tempdir().unwrap();
        run_git(
            bare_dir.path(),
            &["init", "-q", "--bare", "-b", branch, "."],
        );
        run_git(
            seed.path(),
            &["push", "-q", bare_dir.path().to_str().unwrap(), branch],
        );
        run_git(
            bare_dir.path(),
            &["symbolic-ref", "HEAD", &format!("refs/heads/{branch}")],
        );
        Self { bare_dir }
    }

    pub fn url(&self) -> String {
        self.bare_dir.path().to_string_lossy().into_owned()
    }
}

fn run_git(dir: &Path, args: &[&str]) {
    let status = Command::new("git")
        .args(args)
        .current_dir(dir)
        .status()
        .unwrap_or_else(|e| panic!("failed to spawn git {args:?}: {e}"));
    assert!(status.success(), "git {args:?} failed in {}", dir.display());
}

/// In-memory stand-in for a multiplexer, tracking just enough state
/// (existence, attached flag, assistant substring match) to exercise
/// `SessionOrchestrator` and `AppController` without a real `tmux` server.
pub struct FakeMultiplexer {
    sessions: RefCell<Vec<SessionInfo>>,
}

impl FakeMultiplexer {
    pub fn new() -> Self {
        Self { sessions: RefCell::new(Vec::new()) }
    }

    pub fn mark_attached(&self, name: &str) {
        if let Some(s) = self.sessions.borrow_mut().iter_mut().find(|s| s.name == name) {
            s.attached = true;
        }
    }
}

impl MultiplexerDriver for FakeMultiplexer {
    fn available(&self) -> bool {
        true
    }

    fn inside_multiplexer(&self) -> bool {
        false
    }

    fn create_detached(&self, name: &str, _cwd: &Path, _command: Option<&str>) -> Result<(), MultiplexerError> {
        if !self.sessions.borrow().iter().any(|s| s.name == name) {
            self.sessions.borrow_mut().push(SessionInfo {
                name: name.to_string(),
                window_count: 1,
                created: 0,
                attached: false,
                assistant_running: true,
            });
        }
        Ok(())
    }

    fn attach(&self, name: &str) -> Result<(), MultiplexerError> {
        self.mark_attached(name);
        Ok(())
    }

    fn list_sessions(&self) -> Result<Vec<SessionInfo>, MultiplexerError> {
        Ok(self.sessions.borrow().clone())
    }

    fn shutdown_all(&self, prefix: &str) -> Result<(), MultiplexerError> {
        self.sessions.borrow_mut().retain(|s| !s.name.starts_with(prefix));
        Ok(())
    }

    fn split_pane(&self, _: Option<&str>, _: bool, _: Option<u8>, _: Option<&str>, _: Option<&std::path::Path>) -> Result<(), MultiplexerError> {
        Ok(())
    }
}

pub fn messages_root() -> (tempfile::TempDir, PathBuf) {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().to_path_buf();
    (dir, path)
}
