//! Fleet manager for git branch workspaces and long-lived AI assistant
//! sessions: a shared object store, per-branch working trees, a terminal
//! multiplexer driver, and a filesystem-backed message bus between a
//! supervisor session and its children.
//!
//! The library API is not stable — this crate is built around one binary.

pub mod app;
pub mod bus;
pub mod cli;
pub mod command_log;
pub mod config;
pub mod directory;
pub mod git;
pub mod path;
pub mod runner;
pub mod session;
pub mod shell_exec;
pub mod slug;
pub mod utils;
pub mod workspace;

pub use directory::{DirectoryProber, DirectoryState};
pub use git::{GitError, Repository};

/// The one source of truth for this crate's version, surfaced by `--version`
/// and by `cgwt logs`.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
