//! The actual CLI dispatch, shared by the `cgwt` binary and the deprecated
//! `claude-gwt` alias (§9.A) so the two entry points can never drift.

use std::io::Write;
use std::path::PathBuf;

use anyhow::Context;

use crate::app::{Action, AppController, BootstrapOutcome};
use crate::cli::{Cli, Command};
use crate::config::Config;
use crate::path::format_path_for_display;
use crate::session::TmuxDriver;
use crate::{DirectoryProber, DirectoryState};

pub fn run(cli: Cli, config: &Config) -> anyhow::Result<()> {
    match cli.command.unwrap_or(Command::App {
        path: None,
        repo: None,
        branch: None,
        quiet: false,
        interactive: false,
        no_interactive: false,
    }) {
        Command::App {
            path,
            repo,
            branch,
            quiet,
            interactive: _,
            no_interactive,
        } => run_app(path, repo, branch, quiet, !no_interactive, config),
        Command::List { active_only, json } => run_list(active_only, json, config),
        Command::Attach { index } => run_attach(&index, config),
        Command::Split { target, horizontal, percentage } => run_split(target, horizontal, percentage, config),
        Command::Logs => run_logs(),
    }
}

fn project_name_for(path: &std::path::Path, repo_url: Option<&str>) -> String {
    repo_url
        .and_then(crate::git::url::extract_repo_name)
        .or_else(|| path.file_name().map(|n| n.to_string_lossy().into_owned()))
        .unwrap_or_else(|| "cgwt".to_string())
}

fn messages_root(repository_root: &std::path::Path) -> PathBuf {
    repository_root.join(".cgwt").join("messages")
}

fn init_command_log(repository_root: &std::path::Path, process_name: &str) {
    crate::command_log::init(&repository_root.join(".cgwt").join("logs"), process_name);
}

fn build_controller(path: &std::path::Path, repo_url: Option<&str>, config: &Config) -> AppController<TmuxDriver> {
    let project = project_name_for(path, repo_url);
    let mux = TmuxDriver::new(config.multiplexer_binary.clone(), config.assistant_command.clone());
    AppController::new(mux, project, config.assistant_command.clone(), messages_root(path))
}

/// Resolve the shared-store root for commands (`list`, `attach`, `split`)
/// that expect a repository to already exist, without offering to create
/// or convert one. Climbs from a `Workspace` subdirectory to its owning
/// `.bare` parent so `cwd` can be any workspace, not just the repository
/// root.
fn resolve_existing_repository_root(path: &std::path::Path) -> anyhow::Result<PathBuf> {
    match DirectoryProber::classify(path)? {
        DirectoryState::SharedStoreParent { path } => Ok(path),
        DirectoryState::Workspace { path, .. } => Ok(path
            .ancestors()
            .find(|p| p.join(".bare").join("HEAD").is_file())
            .map(std::path::Path::to_path_buf)
            .unwrap_or(path)),
        _ => anyhow::bail!(
            "no shared repository found at {}\n\nhint: run 'cgwt app' first to bootstrap one",
            format_path_for_display(path)
        ),
    }
}

fn run_app(
    path: Option<PathBuf>,
    repo: Option<String>,
    branch: Option<String>,
    quiet: bool,
    interactive: bool,
    config: &Config,
) -> anyhow::Result<()> {
    let path = path.unwrap_or(std::env::current_dir().context("resolving current directory")?);
    let path = crate::path::canonicalize(&path);
    init_command_log(&path, "cgwt app");

    let mut controller = build_controller(&path, repo.as_deref(), config);

    let outcome = controller
        .bootstrap(&path, repo.as_deref(), branch.as_deref())
        .context("bootstrapping directory")?;

    let repository_root = match outcome {
        BootstrapOutcome::Ready { repository_root } => repository_root,
        BootstrapOutcome::ConversionOffered { path } => {
            if quiet || !interactive {
                anyhow::bail!(
                    "{} is a plain git repository; rerun interactively to convert it to a shared store",
                    format_path_for_display(&path)
                );
            }
            if prompt_yes_no(&format!(
                "{} is a plain repository. Convert it to a shared object store?",
                format_path_for_display(&path)
            ))? {
                match controller.accept_conversion(&path)? {
                    BootstrapOutcome::Ready { repository_root } => repository_root,
                    _ => unreachable!("accept_conversion always returns Ready"),
                }
            } else {
                controller.decline_conversion();
                println!("Staying in limited mode; use plain git commands directly in {}.", path.display());
                return Ok(());
            }
        }
        BootstrapOutcome::NonRepoOffered { path } => {
            if quiet || !interactive {
                anyhow::bail!("{} has no recognizable git structure", format_path_for_display(&path));
            }
            print!(
                "{} has no git structure. Create a named subdirectory to initialize in (blank to exit): ",
                path.display()
            );
            std::io::stdout().flush().ok();
            let name = read_line()?;
            if name.trim().is_empty() {
                return Ok(());
            }
            match controller.create_named_subdir_and_restart(&path, name.trim(), repo.as_deref(), branch.as_deref())? {
                BootstrapOutcome::Ready { repository_root } => repository_root,
                _ => anyhow::bail!("could not initialize {}", name.trim()),
            }
        }
    };

    println!("Ready: {}", format_path_for_display(&repository_root));

    if !interactive {
        return Ok(());
    }

    interactive_menu(&mut controller)
}

fn interactive_menu<M: crate::session::MultiplexerDriver>(controller: &mut AppController<M>) -> anyhow::Result<()> {
    loop {
        print_menu();
        print!("> ");
        std::io::stdout().flush().ok();
        let line = read_line()?;
        let Some(action) = parse_action(line.trim()) else {
            println!("unrecognized command");
            continue;
        };
        match controller.dispatch(action) {
            Ok(true) => {}
            Ok(false) => break,
            Err(e) => {
                log::warn!("{e}");
                println!("error: {e}");
            }
        }
        if let Err(e) = controller.route_messages() {
            log::warn!("message routing tick failed: {e}");
        }
    }
    Ok(())
}

fn print_menu() {
    println!(
        "commands: list | create <branch> [base] | create-existing <branch> | switch <branch> | \
         remove <branch> [force] | supervisor | sessions | shutdown | exit"
    );
}

fn parse_action(line: &str) -> Option<Action> {
    let mut parts = line.split_whitespace();
    match parts.next()? {
        "list" => Some(Action::List),
        "create" => Some(Action::CreateWorkspace {
            branch: parts.next()?.to_string(),
            base: parts.next().map(str::to_string),
        }),
        "create-existing" => Some(Action::CreateWorkspaceFromExistingBranch {
            branch: parts.next()?.to_string(),
        }),
        "switch" => Some(Action::Switch { branch: parts.next()?.to_string() }),
        "remove" => Some(Action::Remove {
            branch: parts.next()?.to_string(),
            force: parts.next() == Some("force"),
        }),
        "supervisor" => Some(Action::EnterSupervisor),
        "sessions" => Some(Action::ManageSessions),
        "shutdown" => Some(Action::ShutdownAll),
        "exit" => Some(Action::Exit),
        _ => None,
    }
}

fn run_list(active_only: bool, json: bool, config: &Config) -> anyhow::Result<()> {
    let cwd = crate::path::canonicalize(&std::env::current_dir().context("resolving current directory")?);
    let repository_root = resolve_existing_repository_root(&cwd)?;
    let mut controller = build_controller(&repository_root, None, config);
    controller.locate(&repository_root).context("binding to shared repository")?;
    let workspaces = controller
        .list_workspaces()
        .context("listing workspaces; run 'cgwt app' first to bootstrap a shared repository")?;
    let sessions = controller.list_sessions().unwrap_or(crate::app::SessionSnapshot {
        supervisor_active: false,
        children: Vec::new(),
    });

    let active_branches: std::collections::HashSet<&str> =
        sessions.children.iter().map(|r| r.branch.as_str()).collect();

    if json {
        let rows: Vec<_> = workspaces
            .iter()
            .filter(|w| !active_only || active_branches.contains(w.branch.as_str()))
            .map(|w| {
                serde_json::json!({
                    "branch": w.branch,
                    "path": w.absolute_path,
                    "head": w.head,
                    "active": active_branches.contains(w.branch.as_str()),
                })
            })
            .collect();
        println!("{}", serde_json::to_string_pretty(&rows)?);
        return Ok(());
    }

    for (i, workspace) in workspaces.iter().enumerate() {
        let active = active_branches.contains(workspace.branch.as_str());
        if active_only && !active {
            continue;
        }
        println!(
            "{}. {} {} [{}]",
            i + 1,
            workspace.branch,
            format_path_for_display(&workspace.absolute_path),
            if active { "active" } else { "idle" }
        );
    }
    Ok(())
}

fn run_attach(index: &str, config: &Config) -> anyhow::Result<()> {
    let cwd = crate::path::canonicalize(&std::env::current_dir().context("resolving current directory")?);
    let repository_root = resolve_existing_repository_root(&cwd)?;
    let mut controller = build_controller(&repository_root, None, config);
    controller.locate(&repository_root).context("binding to shared repository")?;

    let branch = if let Some((_project, branch)) = index.split_once('.') {
        branch.to_string()
    } else {
        let ordinal: usize = index.parse().context("attach index must be N or P.B")?;
        let workspaces = controller.list_workspaces()?;
        workspaces
            .get(ordinal.saturating_sub(1))
            .map(|w| w.branch.clone())
            .ok_or_else(|| anyhow::anyhow!("no workspace at index {ordinal}"))?
    };

    controller.switch(&branch).context("attaching to session")
}

fn run_split(target: Option<String>, horizontal: bool, percentage: Option<u8>, config: &Config) -> anyhow::Result<()> {
    use crate::session::MultiplexerDriver;
    let mux = TmuxDriver::new(config.multiplexer_binary.clone(), config.assistant_command.clone());
    mux.split_pane(target.as_deref(), horizontal, percentage, None, None)
        .context("splitting multiplexer pane")?;
    Ok(())
}

fn run_logs() -> anyhow::Result<()> {
    let path = std::env::current_dir().context("resolving current directory")?;
    println!("cgwt {}", crate::VERSION);
    println!("human log: stderr (set -v/-vv/-vvv or CGWT_LOG_LEVEL)");
    println!("command log: {}", path.join(".cgwt").join("logs").join("commands.jsonl").display());
    Ok(())
}

fn prompt_yes_no(question: &str) -> anyhow::Result<bool> {
    print!("{question} [y/N] ");
    std::io::stdout().flush().ok();
    let answer = read_line()?;
    Ok(matches!(answer.trim().to_ascii_lowercase().as_str(), "y" | "yes"))
}

fn read_line() -> anyhow::Result<String> {
    let mut line = String::new();
    std::io::stdin().read_line(&mut line).context("reading from stdin")?;
    Ok(line)
}
