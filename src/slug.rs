//! Slugging rules shared by `SessionName` and workspace directory names:
//! lowercase, collapse any run of characters outside `[a-z0-9_-]` to a
//! single `-`, trim leading/trailing `-`.

/// Lowercase, collapse non-`[a-z0-9_-]` runs to `-`, trim leading/trailing `-`.
///
/// Shared by session-name slugging (which additionally truncates to 50
/// code units) and workspace directory sanitizing (which does not).
fn slug_core(input: &str) -> String {
    let lowered = input.to_lowercase();
    let mut out = String::with_capacity(lowered.len());
    let mut last_was_sep = false;

    for ch in lowered.chars() {
        if ch.is_ascii_lowercase() || ch.is_ascii_digit() || ch == '_' || ch == '-' {
            out.push(ch);
            last_was_sep = false;
        } else if !last_was_sep {
            out.push('-');
            last_was_sep = true;
        }
    }

    out.trim_matches('-').to_string()
}

/// Slug a single path component (project name or branch name) for use in a
/// [`crate::session::SessionName`], truncated to 50 UTF-16 code units per §3.
pub fn session_slug(input: &str) -> String {
    let slug = slug_core(input);
    truncate_code_units(&slug, 50)
}

/// Sanitize a branch name for use as a workspace directory name (§4.3):
/// `/` becomes `-`, then the same slug rules apply, without truncation —
/// workspace paths keep full length.
pub fn sanitize_branch_for_path(branch: &str) -> String {
    slug_core(&branch.replace('/', "-"))
}

fn truncate_code_units(s: &str, max: usize) -> String {
    // Truncate by UTF-16 code unit count, cutting at the nearest char boundary.
    if s.encode_utf16().count() <= max {
        return s.to_string();
    }

    let mut units = 0usize;
    let mut end = s.len();
    for (idx, ch) in s.char_indices() {
        let ch_units = ch.len_utf16();
        if units + ch_units > max {
            end = idx;
            break;
        }
        units += ch_units;
    }
    s[..end].trim_end_matches('-').to_string()
}
