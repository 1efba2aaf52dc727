//! Clap-derive CLI surface (§6). Argument parsing itself is out of scope
//! for the orchestration logic it drives — this module only declares the
//! shape; `main.rs` maps parsed commands onto `AppController` actions.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Debug, Parser)]
#[command(
    name = "cgwt",
    version = env!("CARGO_PKG_VERSION"),
    about = "Fleet manager for git branch workspaces and long-lived AI assistant sessions"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Command>,

    /// Increase log verbosity (-v, -vv, -vvv). Overridden by CGWT_LOG_LEVEL.
    #[arg(short = 'v', long = "verbose", global = true, action = clap::ArgAction::Count)]
    pub verbose: u8,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// The guided controller: bootstrap a directory and enter the
    /// interactive menu.
    App {
        /// Directory to operate on; defaults to the current directory.
        path: Option<PathBuf>,
        #[arg(long = "repo")]
        repo: Option<String>,
        #[arg(long = "branch")]
        branch: Option<String>,
        #[arg(long = "quiet")]
        quiet: bool,
        #[arg(long = "interactive", conflicts_with = "no_interactive")]
        interactive: bool,
        #[arg(long = "no-interactive")]
        no_interactive: bool,
    },
    /// List live workspaces and their sessions.
    List {
        #[arg(long = "active-only")]
        active_only: bool,
        #[arg(long = "json")]
        json: bool,
    },
    /// Attach to a session by ordinal (`N`) or `project.branch`.
    Attach { index: String },
    /// Split the current (or named) multiplexer pane.
    Split {
        target: Option<String>,
        #[arg(long = "horizontal")]
        horizontal: bool,
        #[arg(long = "percentage")]
        percentage: Option<u8>,
    },
    /// Print the location of the structured command log (§6.A).
    Logs,
}
