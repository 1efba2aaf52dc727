//! `SessionOrchestrator` (§4.5): owns the supervisor session and the keyed
//! set of child sessions, reconciling its cache against live multiplexer
//! output on every `list()` — the multiplexer is the source of truth.

use std::collections::BTreeMap;
use std::path::PathBuf;

use super::{InstanceRecord, InstanceStatus, MultiplexerDriver, MultiplexerError, Role, SessionName};
use crate::bus::MessageBus;
use crate::workspace::{AttachedSessionCheck, Workspace};

pub struct SupervisorChildren {
    pub supervisor: Option<InstanceRecord>,
    pub children: Vec<InstanceRecord>,
}

pub struct SessionOrchestrator<'m, M: MultiplexerDriver> {
    mux: &'m M,
    project: String,
    assistant_command: String,
    supervisor: Option<InstanceRecord>,
    children: BTreeMap<String, InstanceRecord>,
    supervisor_bus: Option<MessageBus>,
}

impl<'m, M: MultiplexerDriver> SessionOrchestrator<'m, M> {
    pub fn new(mux: &'m M, project: impl Into<String>, assistant_command: impl Into<String>) -> Self {
        Self {
            mux,
            project: project.into(),
            assistant_command: assistant_command.into(),
            supervisor: None,
            children: BTreeMap::new(),
            supervisor_bus: None,
        }
    }

    /// `initialize(repositoryPath)`. `known_children` are the currently-live
    /// child instances (from a prior `list()`); per §4.4's `launch` contract,
    /// a supervisor gets a window layout with one pane per known child, each
    /// running the assistant in that child's workspace `cwd`, in addition to
    /// its own first pane at `repository_path`. Layout failures are
    /// best-effort: a pane that fails to split is logged and skipped rather
    /// than failing supervisor creation outright.
    pub fn initialize(
        &mut self,
        repository_path: &std::path::Path,
        messages_root: &std::path::Path,
        known_children: &[InstanceRecord],
    ) -> Result<(), MultiplexerError> {
        let name = SessionName::for_supervisor(&self.project);
        self.mux
            .create_detached(name.as_str(), repository_path, Some(&self.assistant_command))?;

        for child in known_children {
            if let Err(e) = self.mux.split_pane(
                Some(name.as_str()),
                false,
                None,
                Some(&self.assistant_command),
                Some(&child.workspace_path),
            ) {
                log::warn!("failed to add supervisor pane for {}: {e}", child.branch);
            }
        }

        let record = InstanceRecord {
            role: Role::Supervisor,
            session_name: name.clone(),
            branch: "supervisor".to_string(),
            workspace_path: repository_path.to_path_buf(),
            status: InstanceStatus::Active,
        };
        self.supervisor = Some(record);

        let bus = MessageBus::for_instance(messages_root, name.as_str());
        bus.init_directories().map_err(|e| MultiplexerError::CommandFailed { stderr: e.to_string() })?;
        self.supervisor_bus = Some(bus);
        Ok(())
    }

    /// `ensureChildFor(workspace)` — idempotent; logs and continues on
    /// failure rather than propagating it (§4.5 failure semantics).
    pub fn ensure_child_for(&mut self, workspace: &Workspace, messages_root: &std::path::Path) {
        let name = SessionName::for_worker(&self.project, &workspace.branch);
        match self
            .mux
            .create_detached(name.as_str(), &workspace.absolute_path, Some(&self.assistant_command))
        {
            Ok(()) => {
                let bus = MessageBus::for_instance(messages_root, name.as_str());
                if let Err(e) = bus.init_directories() {
                    log::warn!("failed to initialize message bus for {name}: {e}");
                }
                self.children.insert(
                    workspace.branch.clone(),
                    InstanceRecord {
                        role: Role::Worker,
                        session_name: name,
                        branch: workspace.branch.clone(),
                        workspace_path: workspace.absolute_path.clone(),
                        status: InstanceStatus::Active,
                    },
                );
            }
            Err(e) => log::warn!("failed to create child session for {}: {e}", workspace.branch),
        }
    }

    /// `list()` — purely a function of live multiplexer output plus the
    /// caller's known workspaces and project name, not the in-memory cache:
    /// `AppController` constructs a fresh `SessionOrchestrator` on every
    /// action (§4.5), so a freshly constructed instance's `supervisor`/
    /// `children` maps are always empty and can't be the source of truth for
    /// what's live. `repository_root` fills in the supervisor's
    /// `workspace_path` when it's running (there's no per-branch workspace to
    /// report for it).
    pub fn list(
        &mut self,
        repository_root: &std::path::Path,
        workspaces: &[Workspace],
    ) -> Result<SupervisorChildren, MultiplexerError> {
        let live = self.mux.list_sessions()?;
        let live_names: std::collections::HashSet<&str> = live.iter().map(|s| s.name.as_str()).collect();

        let supervisor_name = SessionName::for_supervisor(&self.project);
        let supervisor = live_names.contains(supervisor_name.as_str()).then(|| InstanceRecord {
            role: Role::Supervisor,
            session_name: supervisor_name,
            branch: "supervisor".to_string(),
            workspace_path: repository_root.to_path_buf(),
            status: InstanceStatus::Active,
        });

        let children: Vec<InstanceRecord> = workspaces
            .iter()
            .filter_map(|w| {
                let name = SessionName::for_worker(&self.project, &w.branch);
                live_names.contains(name.as_str()).then(|| InstanceRecord {
                    role: Role::Worker,
                    session_name: name,
                    branch: w.branch.clone(),
                    workspace_path: w.absolute_path.clone(),
                    status: InstanceStatus::Active,
                })
            })
            .collect();

        self.supervisor = supervisor.clone();
        self.children = children.iter().map(|r| (r.branch.clone(), r.clone())).collect();

        Ok(SupervisorChildren { supervisor, children })
    }

    /// `removeChildForWorkspace(branch, alsoRemoveWorkspace)`. Computes the
    /// session name directly instead of looking it up in `self.children`,
    /// for the same reason `list` no longer trusts that cache: a freshly
    /// constructed orchestrator has never populated it.
    pub fn remove_child_for_workspace(
        &mut self,
        branch: &str,
        also_remove_workspace: bool,
        force: bool,
        workspace_manager: &crate::workspace::WorkspaceManager<'_>,
    ) -> Result<(), crate::workspace::WorkspaceError> {
        self.children.remove(branch);
        let name = SessionName::for_worker(&self.project, branch);
        let _ = self.mux.shutdown_all(name.as_str());
        if also_remove_workspace {
            workspace_manager.remove(branch, force, &*self)?;
        }
        Ok(())
    }

    /// `broadcast(message, exceptSender?)` — enqueue via the supervisor's bus.
    ///
    /// Builds the supervisor's `MessageBus` from its deterministic session
    /// name rather than requiring `initialize()` to have populated
    /// `supervisor_bus` on this exact instance: `AppController` constructs a
    /// fresh `SessionOrchestrator` per action (§4.5 — the multiplexer is the
    /// source of truth, this type is a stateless cache), so a cached handle
    /// would not survive between an `enter-supervisor` action and a later
    /// `broadcast` action.
    pub fn broadcast(
        &self,
        messages_root: &std::path::Path,
        content: &str,
        kind: crate::bus::MessageKind,
    ) -> anyhow::Result<()> {
        let name = SessionName::for_supervisor(&self.project);
        let live = self.mux.list_sessions()?;
        if !live.iter().any(|s| s.name == name.as_str()) {
            anyhow::bail!("no supervisor session is running for this project\n\nhint: run 'enter-supervisor' first");
        }
        let bus = MessageBus::for_instance(messages_root, name.as_str());
        bus.init_directories()?;
        bus.send(crate::bus::Recipient::Broadcast, kind, content, None)?;
        Ok(())
    }

    /// `shutdown()` — idempotent; stop watchers, signal the multiplexer to
    /// tear down every session for this project.
    pub fn shutdown(&mut self) -> Result<(), MultiplexerError> {
        if let Some(bus) = self.supervisor_bus.take() {
            bus.stop_watching();
        }
        let prefix = format!("cgwt-{}", crate::slug::session_slug(&self.project));
        self.mux.shutdown_all(&prefix)?;
        self.supervisor = None;
        self.children.clear();
        Ok(())
    }
}

impl<M: MultiplexerDriver> AttachedSessionCheck for SessionOrchestrator<'_, M> {
    /// Queries the multiplexer directly rather than the cached `children`
    /// map, since a freshly constructed orchestrator (the common case —
    /// `AppController` builds one per action) has no cache to consult yet.
    fn has_attached_session(&self, branch: &str) -> bool {
        let Some(record) = self.children.get(branch) else {
            let name = SessionName::for_worker(&self.project, branch);
            return self
                .mux
                .list_sessions()
                .map(|sessions| sessions.iter().any(|s| s.name == name.as_str() && s.attached))
                .unwrap_or(false);
        };
        self.mux
            .list_sessions()
            .map(|sessions| {
                sessions
                    .iter()
                    .any(|s| s.name == record.session_name.as_str() && s.attached)
            })
            .unwrap_or(false)
    }
}
