//! Path helpers for store descriptors

use std::path::{Path, PathBuf};

/// Expand environment variables in a path string.
///
/// Supports `$VAR`, `${VAR}` and a leading `~`. Unknown variables leave the
/// input unchanged.
pub fn expand_env_vars(path: &str) -> String {
    shellexpand::full(path)
        .map(|s| s.into_owned())
        .unwrap_or_else(|_| path.to_string())
}

/// Directory a store file lives in; `.` for a bare file name.
pub fn parent_dir(path: &Path) -> PathBuf {
    match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
        _ => PathBuf::from("."),
    }
}
