//! Git remote URL parsing.

/// `extractRepoName` (§8): the last non-empty path segment of a git remote
/// URL, with a trailing `.git` stripped. Handles nested groups
/// (`git@host:group/sub/project.git` → `project`) and trailing slashes
/// (`https://host/a/b/` → `b`).
///
/// Idempotent on its own output: `extract_repo_name(extract_repo_name(s))`
/// always equals `extract_repo_name(s)`, since a bare name with no `/` or
/// `.git` suffix passes through unchanged.
pub fn extract_repo_name(url: &str) -> Option<String> {
    let url = url.trim();
    if url.is_empty() {
        return None;
    }

    // `git@host:path` — only the part after the colon is path-like.
    let path = if let Some(rest) = url.strip_prefix("git@") {
        rest.split_once(':').map(|(_, p)| p).unwrap_or(rest)
    } else {
        url
    };

    let last_segment = path
        .split('/')
        .filter(|segment| !segment.is_empty())
        .next_back()?;

    let name = last_segment.strip_suffix(".git").unwrap_or(last_segment);
    if name.is_empty() { None } else { Some(name.to_string()) }
}
