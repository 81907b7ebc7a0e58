//! Conversion between real project paths and transcript-store directory names.
//!
//! The assistant names each project directory after the project's absolute
//! path with every separator replaced by `-`, so `/Users/me/my-app` becomes
//! `-Users-me-my-app`. The mapping is not reversible: a `-` inside a folder
//! name is indistinguishable from an encoded separator. Decoding therefore
//! looks for the longest prefix that exists on disk and keeps the rest of the
//! name, dashes included, as the final path component.

use std::path::{MAIN_SEPARATOR, Path, PathBuf};

/// Character the assistant substitutes for path separators.
pub const PROJECT_KEY_MARKER: char = '-';

/// Encodes an absolute path the way the assistant names project directories.
///
/// Only separators are rewritten.
pub fn encode_project_path(path: &Path) -> String {
    path.to_string_lossy()
        .replace(MAIN_SEPARATOR, &PROJECT_KEY_MARKER.to_string())
}

/// Decodes a project directory name into a best-effort filesystem path.
///
/// Known limitation: when several existing directories could explain the
/// same name, the longest existing prefix wins.
pub fn decode_project_path(project_key: &str) -> PathBuf {
    let trimmed = project_key
        .strip_prefix(PROJECT_KEY_MARKER)
        .unwrap_or(project_key);
    let parts: Vec<&str> = trimmed.split(PROJECT_KEY_MARKER).collect();

    for prefix_len in (1..=parts.len()).rev() {
        let candidate = join_from_root(&parts[..prefix_len]);
        if candidate.is_dir() {
            let remaining = &parts[prefix_len..];
            if remaining.is_empty() {
                return candidate;
            }
            return candidate.join(remaining.join(&PROJECT_KEY_MARKER.to_string()));
        }
    }

    join_from_root(&parts)
}

fn join_from_root(parts: &[&str]) -> PathBuf {
    let mut path = PathBuf::from(MAIN_SEPARATOR.to_string());
    for part in parts {
        path.push(part);
    }
    path
}
