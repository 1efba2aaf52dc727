//! `AppController` (§4.7): the top-level state machine dispatching on
//! `DirectoryProber` output. The interactive menu itself is an external
//! collaborator (out of scope per §1); this exposes the typed action set
//! the menu drives and decides the DirectoryState transition table.

use std::path::{Path, PathBuf};

use crate::bus::MessageKind;
use crate::directory::{DirectoryProber, DirectoryState};
use crate::git::repository::{ConvertError, RepositoryService};
use crate::git::Repository;
use crate::session::{MultiplexerDriver, MultiplexerError, SessionOrchestrator};
use crate::workspace::{Workspace, WorkspaceError, WorkspaceManager};

/// What `bootstrap` decided for a classified path, before any workspace
/// necessarily exists yet.
#[derive(Debug)]
pub enum BootstrapOutcome {
    /// A shared store exists at `repository_root` with at least one
    /// workspace; the interactive menu may proceed.
    Ready { repository_root: PathBuf },
    /// `path` is a plain repo; the caller must ask the user whether to
    /// convert (`accept_conversion`) or stay in limited mode
    /// (`decline_conversion`).
    ConversionOffered { path: PathBuf },
    /// `path` has no recognizable git structure; the caller must ask for a
    /// subdirectory name to restart classification in, or exit.
    NonRepoOffered { path: PathBuf },
}

/// The typed action set the interactive menu (external collaborator) drives,
/// per §4.7.
#[derive(Debug)]
pub enum Action {
    CreateWorkspace { branch: String, base: Option<String> },
    CreateWorkspaceFromExistingBranch { branch: String },
    List,
    Switch { branch: String },
    Remove { branch: String, force: bool },
    EnterSupervisor,
    ManageSessions,
    ShutdownAll,
    Exit,
}

#[derive(Debug)]
pub enum ControllerError {
    Probe(crate::directory::ProbeError),
    Convert(ConvertError),
    Workspace(WorkspaceError),
    Git(crate::git::GitError),
    Multiplexer(MultiplexerError),
    Bus(crate::bus::BusError),
    NotReady,
}

impl std::fmt::Display for ControllerError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ControllerError::Probe(e) => write!(f, "{e}"),
            ControllerError::Convert(e) => write!(f, "{e}"),
            ControllerError::Workspace(e) => write!(f, "{e}"),
            ControllerError::Git(e) => write!(f, "{e}"),
            ControllerError::Multiplexer(e) => write!(f, "{e}"),
            ControllerError::Bus(e) => write!(f, "{e}"),
            ControllerError::NotReady => write!(
                f,
                "no shared repository is active yet\n\nhint: run 'cgwt app' first to bootstrap one"
            ),
        }
    }
}

impl std::error::Error for ControllerError {}

macro_rules! from_err {
    ($variant:ident, $source:ty) => {
        impl From<$source> for ControllerError {
            fn from(e: $source) -> Self {
                ControllerError::$variant(e)
            }
        }
    };
}
from_err!(Probe, crate::directory::ProbeError);
from_err!(Convert, ConvertError);
from_err!(Workspace, WorkspaceError);
from_err!(Git, crate::git::GitError);
from_err!(Multiplexer, MultiplexerError);
from_err!(Bus, crate::bus::BusError);

pub struct SessionSnapshot {
    pub supervisor_active: bool,
    pub children: Vec<crate::session::InstanceRecord>,
}

/// Dispatches on `DirectoryProber` output, then drives `RepositoryService` +
/// `WorkspaceManager` to a ready state and `SessionOrchestrator` for
/// sessions. Generic over the multiplexer binding so tests can supply a
/// fake (§4.4).
pub struct AppController<M: MultiplexerDriver> {
    mux: M,
    project: String,
    assistant_command: String,
    messages_root: PathBuf,
    repo: Option<Repository>,
}

impl<M: MultiplexerDriver> AppController<M> {
    pub fn new(mux: M, project: impl Into<String>, assistant_command: impl Into<String>, messages_root: PathBuf) -> Self {
        Self {
            mux,
            project: project.into(),
            assistant_command: assistant_command.into(),
            messages_root,
            repo: None,
        }
    }

    fn orchestrator(&self) -> SessionOrchestrator<'_, M> {
        SessionOrchestrator::new(&self.mux, self.project.as_str(), self.assistant_command.as_str())
    }

    fn repo(&self) -> Result<&Repository, ControllerError> {
        self.repo.as_ref().ok_or(ControllerError::NotReady)
    }

    /// `bootstrap(path, repoUrl?, branch?)` — the §4.7 transition table.
    pub fn bootstrap(
        &mut self,
        path: &Path,
        repo_url: Option<&str>,
        branch: Option<&str>,
    ) -> Result<BootstrapOutcome, ControllerError> {
        let state = DirectoryProber::classify(path)?;
        match state {
            DirectoryState::Empty { path } => {
                let (_default_branch, repo) = RepositoryService::init_shared(&path, repo_url)?;
                let manager = WorkspaceManager::new(&repo);
                let target_branch = match branch {
                    Some(b) => b.to_string(),
                    None => repo.resolve_default_branch()?,
                };
                manager.add(&target_branch, None)?;
                self.repo = Some(repo);
                Ok(BootstrapOutcome::Ready { repository_root: path })
            }
            DirectoryState::SharedStoreParent { path } => {
                let repo = Repository::at(path.join(".bare"));
                self.ensure_at_least_one_workspace(&repo, branch)?;
                self.repo = Some(repo);
                Ok(BootstrapOutcome::Ready { repository_root: path })
            }
            DirectoryState::Workspace { path, .. } => {
                let root = Self::shared_store_root_from_workspace(&path);
                let repo = Repository::at(root.join(".bare"));
                self.ensure_at_least_one_workspace(&repo, branch)?;
                self.repo = Some(repo);
                Ok(BootstrapOutcome::Ready { repository_root: root })
            }
            DirectoryState::PlainRepo { path, .. } => Ok(BootstrapOutcome::ConversionOffered { path }),
            DirectoryState::NonRepo { path } => Ok(BootstrapOutcome::NonRepoOffered { path }),
        }
    }

    /// Walk up from a `Workspace` path to the shared-store-parent directory
    /// that owns it (the nearest ancestor whose `.bare/HEAD` exists).
    fn shared_store_root_from_workspace(path: &Path) -> PathBuf {
        path.ancestors()
            .find(|p| p.join(".bare").join("HEAD").is_file())
            .map(Path::to_path_buf)
            .unwrap_or_else(|| path.to_path_buf())
    }

    /// Bind this controller to an already-set-up shared store or workspace
    /// found at `path`, without offering conversion or creating anything —
    /// for commands (`list`, `attach`, `split`) that expect the repository
    /// to exist already. Unlike `bootstrap`, a `PlainRepo`/`NonRepo`/`Empty`
    /// classification is just `NotReady`, not an interactive offer.
    pub fn locate(&mut self, path: &Path) -> Result<PathBuf, ControllerError> {
        match DirectoryProber::classify(path)? {
            DirectoryState::SharedStoreParent { path } => {
                self.repo = Some(Repository::at(path.join(".bare")));
                Ok(path)
            }
            DirectoryState::Workspace { path, .. } => {
                let root = Self::shared_store_root_from_workspace(&path);
                self.repo = Some(Repository::at(root.join(".bare")));
                Ok(root)
            }
            _ => Err(ControllerError::NotReady),
        }
    }

    fn ensure_at_least_one_workspace(&self, repo: &Repository, branch: Option<&str>) -> Result<(), ControllerError> {
        let manager = WorkspaceManager::new(repo);
        if manager.list()?.is_empty() {
            let target_branch = match branch {
                Some(b) => b.to_string(),
                None => repo.resolve_default_branch()?,
            };
            manager.add(&target_branch, None)?;
        }
        Ok(())
    }

    /// Accept the conversion offer for a `PlainRepo` classification.
    pub fn accept_conversion(&mut self, path: &Path) -> Result<BootstrapOutcome, ControllerError> {
        let converted = RepositoryService::convert_plain_to_shared(path)?;
        let repo = Repository::at(path.join(".bare"));
        self.repo = Some(repo);
        Ok(BootstrapOutcome::Ready {
            repository_root: converted.original_path,
        })
    }

    /// Decline the conversion offer: the caller is left in the limited
    /// menu (switch/create branch via plain git, launch assistant in-place)
    /// described by §4.7 — this controller does not track that mode beyond
    /// reporting that no shared repository is active.
    pub fn decline_conversion(&mut self) {
        self.repo = None;
    }

    /// Restart classification in a freshly created subdirectory, for the
    /// `NonRepo` offer.
    pub fn create_named_subdir_and_restart(
        &mut self,
        parent: &Path,
        name: &str,
        repo_url: Option<&str>,
        branch: Option<&str>,
    ) -> Result<BootstrapOutcome, ControllerError> {
        self.bootstrap(&parent.join(name), repo_url, branch)
    }

    pub fn create_workspace(&self, branch: &str, base: Option<&str>) -> Result<Workspace, ControllerError> {
        let repo = self.repo()?;
        let manager = WorkspaceManager::new(repo);
        let path = manager.add(branch, base)?;
        Ok(manager
            .list()?
            .into_iter()
            .find(|w| w.absolute_path == path)
            .expect("just-added workspace is listed"))
    }

    pub fn create_workspace_from_existing_branch(&self, branch: &str) -> Result<Workspace, ControllerError> {
        self.create_workspace(branch, Some(branch))
    }

    pub fn list_workspaces(&self) -> Result<Vec<Workspace>, ControllerError> {
        Ok(WorkspaceManager::new(self.repo()?).list()?)
    }

    pub fn list_sessions(&self) -> Result<SessionSnapshot, ControllerError> {
        let repo = self.repo()?;
        let workspaces = WorkspaceManager::new(repo).list()?;
        let mut orchestrator = self.orchestrator();
        let result = orchestrator.list(repo.root(), &workspaces)?;
        Ok(SessionSnapshot {
            supervisor_active: result.supervisor.is_some(),
            children: result.children,
        })
    }

    /// `switch` (launches assistant): ensure a child session exists for the
    /// workspace, then attach to it.
    pub fn switch(&self, branch: &str) -> Result<(), ControllerError> {
        let repo = self.repo()?;
        let manager = WorkspaceManager::new(repo);
        let workspace = manager
            .list()?
            .into_iter()
            .find(|w| w.branch == branch)
            .ok_or_else(|| ControllerError::Workspace(WorkspaceError::Missing { branch: branch.to_string() }))?;

        let mut orchestrator = self.orchestrator();
        orchestrator.ensure_child_for(&workspace, &self.messages_root);
        let name = crate::session::SessionName::for_worker(&self.project, branch);
        self.mux.attach(name.as_str())?;
        Ok(())
    }

    pub fn remove(&self, branch: &str, force: bool, also_remove_session: bool) -> Result<(), ControllerError> {
        let repo = self.repo()?;
        let manager = WorkspaceManager::new(repo);
        if also_remove_session {
            let mut orchestrator = self.orchestrator();
            orchestrator.remove_child_for_workspace(branch, true, force, &manager)?;
        } else {
            let orchestrator = self.orchestrator();
            manager.remove(branch, force, &orchestrator)?;
        }
        Ok(())
    }

    pub fn enter_supervisor(&mut self) -> Result<(), ControllerError> {
        let repo = self.repo()?.root().to_path_buf();
        let workspaces = self.list_workspaces()?;
        let mut orchestrator = self.orchestrator();
        let known = orchestrator.list(&repo, &workspaces)?;
        orchestrator.initialize(&repo, &self.messages_root, &known.children)?;
        let name = crate::session::SessionName::for_supervisor(&self.project);
        self.mux.attach(name.as_str())?;
        Ok(())
    }

    pub fn manage_sessions(&self) -> Result<SessionSnapshot, ControllerError> {
        self.list_sessions()
    }

    pub fn broadcast(&self, content: &str, kind: MessageKind) -> Result<(), ControllerError> {
        let orchestrator = self.orchestrator();
        orchestrator
            .broadcast(&self.messages_root, content, kind)
            .map_err(|e| ControllerError::Multiplexer(MultiplexerError::CommandFailed { stderr: e.to_string() }))
    }

    /// One `Router::tick` over every live instance (§4.6A); the interactive
    /// menu loop calls this each cycle so outbox messages actually reach
    /// their recipients' inboxes instead of sitting in the sender's outbox.
    pub fn route_messages(&self) -> Result<usize, ControllerError> {
        let repo = self.repo()?;
        let workspaces = WorkspaceManager::new(repo).list()?;
        let mut orchestrator = self.orchestrator();
        let snapshot = orchestrator.list(repo.root(), &workspaces)?;
        let mut live_ids: Vec<String> = snapshot
            .children
            .iter()
            .map(|r| r.session_name.as_str().to_string())
            .collect();
        if let Some(sup) = &snapshot.supervisor {
            live_ids.push(sup.session_name.as_str().to_string());
        }
        Ok(crate::bus::Router::tick(&self.messages_root, &live_ids)?)
    }

    /// `shutdown()` — called before `exit` per the concurrency model's
    /// cancellation rule (§5).
    pub fn shutdown(&mut self) -> Result<(), ControllerError> {
        let mut orchestrator = self.orchestrator();
        orchestrator.shutdown()?;
        Ok(())
    }

    /// Dispatch one typed `Action`. Returns `true` while the menu loop
    /// should continue, `false` once `Exit` has been handled.
    pub fn dispatch(&mut self, action: Action) -> Result<bool, ControllerError> {
        match action {
            Action::CreateWorkspace { branch, base } => {
                self.create_workspace(&branch, base.as_deref())?;
                Ok(true)
            }
            Action::CreateWorkspaceFromExistingBranch { branch } => {
                self.create_workspace_from_existing_branch(&branch)?;
                Ok(true)
            }
            Action::List => {
                self.list_workspaces()?;
                Ok(true)
            }
            Action::Switch { branch } => {
                self.switch(&branch)?;
                Ok(true)
            }
            Action::Remove { branch, force } => {
                self.remove(&branch, force, true)?;
                Ok(true)
            }
            Action::EnterSupervisor => {
                self.enter_supervisor()?;
                Ok(true)
            }
            Action::ManageSessions => {
                self.manage_sessions()?;
                Ok(true)
            }
            Action::ShutdownAll => {
                self.shutdown()?;
                Ok(true)
            }
            Action::Exit => {
                self.shutdown()?;
                Ok(false)
            }
        }
    }
}
