//! Git subprocess plumbing shared by `RepositoryService` and `WorkspaceManager`.

mod error;
pub mod repository;
pub mod url;

pub use error::GitError;
pub use repository::Repository;

/// One entry from `git worktree list --porcelain`, before it is folded into
/// a [`crate::workspace::Workspace`] by `WorkspaceManager`.
#[derive(Debug, Clone, PartialEq)]
pub struct RawWorktree {
    pub path: std::path::PathBuf,
    pub head: String,
    pub branch: Option<String>,
    pub bare: bool,
    pub detached: bool,
}

/// Parse the porcelain output of `git worktree list --porcelain`.
///
/// Entries are blank-line separated; each starts with `worktree <path>`.
pub(crate) fn parse_worktree_porcelain(output: &str) -> Vec<RawWorktree> {
    let mut worktrees = Vec::new();
    let mut path = None;
    let mut head = String::new();
    let mut branch = None;
    let mut bare = false;
    let mut detached = false;

    let flush = |path: &mut Option<std::path::PathBuf>,
                 head: &mut String,
                 branch: &mut Option<String>,
                 bare: &mut bool,
                 detached: &mut bool,
                 out: &mut Vec<RawWorktree>| {
        if let Some(p) = path.take() {
            out.push(RawWorktree {
                path: p,
                head: std::mem::take(head),
                branch: branch.take(),
                bare: *bare,
                detached: *detached,
            });
        }
        *bare = false;
        *detached = false;
    };

    for line in output.lines() {
        if line.is_empty() {
            flush(
                &mut path, &mut head, &mut branch, &mut bare, &mut detached, &mut worktrees,
            );
            continue;
        }
        if let Some(p) = line.strip_prefix("worktree ") {
            flush(
                &mut path, &mut head, &mut branch, &mut bare, &mut detached, &mut worktrees,
            );
            path = Some(std::path::PathBuf::from(p));
        } else if let Some(h) = line.strip_prefix("HEAD ") {
            head = h.to_string();
        } else if let Some(b) = line.strip_prefix("branch ") {
            branch = Some(b.strip_prefix("refs/heads/").unwrap_or(b).to_string());
        } else if line == "bare" {
            bare = true;
        } else if line == "detached" {
            detached = true;
        }
    }
    flush(
        &mut path, &mut head, &mut branch, &mut bare, &mut detached, &mut worktrees,
    );
    worktrees
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_porcelain_with_branch_and_detached_entries() {
        let output = "worktree /repo\nHEAD abc123\nbranch refs/heads/main\n\nworktree /repo/feature\nHEAD def456\ndetached\n\n";
        let parsed = parse_worktree_porcelain(output);
        assert_eq!(parsed.len(), 2);
        assert_eq!(parsed[0].branch.as_deref(), Some("main"));
        assert!(parsed[1].detached);
        assert!(parsed[1].branch.is_none());
    }

    #[test]
    fn filters_nothing_itself_bare_flag_is_preserved_for_caller() {
        let output = "worktree /repo\nHEAD 0000000000000000000000000000000000000000\nbare\n\n";
        let parsed = parse_worktree_porcelain(output);
        assert_eq!(parsed.len(), 1);
        assert!(parsed[0].bare);
    }
}
