//! The six end-to-end scenarios seeding the suite (spec §8), plus the
//! invariants that aren't already covered by a unit test living next to the
//! code it exercises.

use std::path::Path;

use cgwt::app::{Action, AppController, BootstrapOutcome};
use cgwt::bus::{MessageBus, MessageKind};
use cgwt::directory::{DirectoryProber, DirectoryState};
use cgwt::session::SessionName;

use crate::common::{FakeMultiplexer, TestRemote, TestRepo};

fn controller(messages_root: &Path) -> AppController<FakeMultiplexer> {
    AppController::new(FakeMultiplexer::new(), "proj", "claude", messages_root.to_path_buf())
}

/// Scenario 1: Empty -> clone -> ready.
#[test]
fn empty_directory_clones_remote_and_creates_first_workspace() {
    let remote = TestRemote::seeded_on_branch("main");
    let (_messages_root_dir, messages_root) = crate::common::messages_root();
    let mut ctl = controller(&messages_root);

    let parent = tempfile::tempdir().unwrap();
    let target = parent.path().join("x");

    let outcome = ctl.bootstrap(&target, Some(&remote.url()), None).unwrap();
    let BootstrapOutcome::Ready { repository_root } = outcome else {
        panic!("expected Ready, got {outcome:?}");
    };
    assert_eq!(repository_root, target);

    assert!(target.join(".bare").join("HEAD").is_file());
    assert_eq!(
        std::fs::read_to_string(target.join(".git")).unwrap(),
        "gitdir: ./.bare\n"
    );

    let workspaces = ctl.list_workspaces().unwrap();
    assert_eq!(workspaces.len(), 1);
    assert_eq!(workspaces[0].branch, "main");
    assert!(target.join("main").join("README.md").is_file());
}

/// Scenario 2: Plain -> shared conversion.
#[test]
fn plain_repo_on_dev_branch_converts_to_shared_store() {
    let repo = TestRepo::init_on_branch("dev");
    let (_messages_root_dir, messages_root) = crate::common::messages_root();
    let mut ctl = controller(&messages_root);

    let outcome = ctl.bootstrap(repo.path(), None, None).unwrap();
    assert!(matches!(outcome, BootstrapOutcome::ConversionOffered { .. }));

    let outcome = ctl.accept_conversion(repo.path()).unwrap();
    let BootstrapOutcome::Ready { repository_root } = outcome else {
        panic!("expected Ready after accepting conversion");
    };
    assert_eq!(repository_root, repo.path());

    assert!(repo.path().join(".bare").is_dir());
    let pointer = std::fs::read_to_string(repo.path().join(".git")).unwrap();
    assert_eq!(pointer, "gitdir: ./.bare\n");
    assert!(repo.path().join("dev").join("README.md").is_file());

    let state = DirectoryProber::classify(repo.path()).unwrap();
    assert!(matches!(state, DirectoryState::SharedStoreParent { .. }));
}

/// Scenario 3: Workspace add/remove round-trip.
#[test]
fn workspace_add_then_remove_round_trip() {
    let repo = TestRepo::init_on_branch("main");
    let (_messages_root_dir, messages_root) = crate::common::messages_root();
    let mut ctl = controller(&messages_root);
    ctl.bootstrap(repo.path(), None, None).unwrap();
    ctl.accept_conversion(repo.path()).unwrap();

    assert_eq!(ctl.list_workspaces().unwrap().len(), 1);

    ctl.create_workspace("feature", None).unwrap();
    let branches: Vec<String> = ctl.list_workspaces().unwrap().into_iter().map(|w| w.branch).collect();
    assert_eq!(branches.len(), 2);
    assert!(branches.contains(&"feature".to_string()));
    assert!(repo.path().join("feature").is_dir());

    ctl.remove("feature", false, false).unwrap();
    let branches: Vec<String> = ctl.list_workspaces().unwrap().into_iter().map(|w| w.branch).collect();
    assert_eq!(branches, vec!["main".to_string()]);
    assert!(!repo.path().join("feature").exists());
}

/// Scenario 4: Deterministic session naming.
#[test]
fn session_name_collapses_slashes_in_branch() {
    let name = SessionName::for_worker("my-proj", "feature/x");
    assert_eq!(name.as_str(), "cgwt-my-proj-feature-x");
}

/// Scenario 5: Broadcast delivery to two live children, routed through.
#[test]
fn broadcast_reaches_two_children_and_is_delivered_at_most_once() {
    let repo = TestRepo::init_on_branch("main");
    let (_messages_root_dir, messages_root) = crate::common::messages_root();
    let mut ctl = controller(&messages_root);
    ctl.bootstrap(repo.path(), None, None).unwrap();
    ctl.accept_conversion(repo.path()).unwrap();

    ctl.create_workspace("alpha", None).unwrap();
    ctl.create_workspace("beta", None).unwrap();
    ctl.switch("main").unwrap();
    ctl.switch("alpha").unwrap();
    ctl.switch("beta").unwrap();
    ctl.enter_supervisor().unwrap();

    ctl.broadcast("build", MessageKind::Task).unwrap();
    let delivered = ctl.route_messages().unwrap();
    assert_eq!(delivered, 3); // main, alpha, beta

    for branch in ["main", "alpha", "beta"] {
        let child_name = SessionName::for_worker("proj", branch);
        let bus = MessageBus::for_instance(&messages_root, child_name.as_str());
        let pending = bus.pending().unwrap();
        assert_eq!(pending.len(), 1, "branch {branch} should have exactly one message");
        assert_eq!(pending[0].content, "build");
        assert_eq!(pending[0].from, SessionName::for_supervisor("proj").as_str());
        assert!(bus.pending().unwrap().is_empty(), "second poll must be empty (at-most-once)");
    }

    // Second route tick with nothing new in any outbox delivers nothing.
    assert_eq!(ctl.route_messages().unwrap(), 0);
}

/// Scenario 6: Shutdown idempotence.
#[test]
fn shutdown_is_idempotent_and_clears_sessions() {
    let repo = TestRepo::init_on_branch("main");
    let (_messages_root_dir, messages_root) = crate::common::messages_root();
    let mut ctl = controller(&messages_root);
    ctl.bootstrap(repo.path(), None, None).unwrap();
    ctl.accept_conversion(repo.path()).unwrap();
    ctl.switch("main").unwrap();
    ctl.enter_supervisor().unwrap();

    ctl.shutdown().unwrap();
    ctl.shutdown().unwrap();

    let snapshot = ctl.list_sessions().unwrap();
    assert!(!snapshot.supervisor_active);
    assert!(snapshot.children.is_empty());
}

/// Invariant 1 (§8): every live workspace classifies as `Workspace`.
#[test]
fn every_live_workspace_classifies_as_workspace() {
    let repo = TestRepo::init_on_branch("main");
    let (_messages_root_dir, messages_root) = crate::common::messages_root();
    let mut ctl = controller(&messages_root);
    ctl.bootstrap(repo.path(), None, None).unwrap();
    ctl.accept_conversion(repo.path()).unwrap();
    ctl.create_workspace("feature", None).unwrap();

    for workspace in ctl.list_workspaces().unwrap() {
        let state = DirectoryProber::classify(&workspace.absolute_path).unwrap();
        assert!(matches!(state, DirectoryState::Workspace { .. }), "{:?}", workspace.absolute_path);
    }
}

/// Invariant 4 (§8): `Orchestrator.list().children` is a subset of
/// `WorkspaceManager.list()` — a child with no matching workspace never
/// shows up in the session snapshot.
#[test]
fn session_children_are_a_subset_of_workspaces() {
    let repo = TestRepo::init_on_branch("main");
    let (_messages_root_dir, messages_root) = crate::common::messages_root();
    let mut ctl = controller(&messages_root);
    ctl.bootstrap(repo.path(), None, None).unwrap();
    ctl.accept_conversion(repo.path()).unwrap();
    ctl.create_workspace("feature", None).unwrap();
    ctl.switch("feature").unwrap();

    let workspace_branches: Vec<String> = ctl.list_workspaces().unwrap().into_iter().map(|w| w.branch).collect();
    let snapshot = ctl.list_sessions().unwrap();
    for child in &snapshot.children {
        assert!(workspace_branches.contains(&child.branch));
    }
}
