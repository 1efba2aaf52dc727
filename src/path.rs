//! Path display and canonicalization helpers.

use std::path::{Path, PathBuf};

/// Canonicalize a path, falling back to it unchanged if the filesystem call
/// fails (e.g. the path doesn't exist yet, as with a directory `cgwt` is
/// about to create). Uses `dunce::canonicalize` rather than
/// `std::fs::canonicalize` so Windows paths don't come back with a `\\?\`
/// verbatim prefix that `git` itself won't produce or accept consistently.
pub fn canonicalize(path: &Path) -> PathBuf {
    dunce::canonicalize(path).unwrap_or_else(|_| path.to_path_buf())
}

/// Get the user's home directory.
///
/// Uses the `home` crate, which handles platform-specific detection
/// ($HOME on Unix, USERPROFILE/HOMEDRIVE+HOMEPATH on Windows).
pub fn home_dir() -> Option<PathBuf> {
    home::home_dir()
}

/// Format a filesystem path for user-facing output.
///
/// Replaces a home directory prefix with `~` (e.g.
/// `/home/alex/projects/wt` -> `~/projects/wt`). Paths outside home are
/// returned unchanged.
pub fn format_path_for_display(path: &Path) -> String {
    if let Some(home) = home_dir()
        && let Ok(stripped) = path.strip_prefix(&home)
    {
        if stripped.as_os_str().is_empty() {
            return "~".to_string();
        }
        let mut display_path = PathBuf::from("~");
        display_path.push(stripped);
        return display_path.display().to_string();
    }
    path.display().to_string()
}
