//! Filename and path safety checks.
//!
//! Every path or filename that a caller (environment variable, CLI flag,
//! directory listing) can influence goes through these predicates before it
//! touches the filesystem:
//! - Config filenames must look like `00-name.yaml` / `name.yml`
//! - Paths must not climb out of their root via `..`
//! - Environment names become path segments, so they get the same treatment
//!
//! All functions here are pure string manipulation (no filesystem I/O).

use regex_lite::Regex;
use std::path::{Component, Path, PathBuf};
use std::sync::LazyLock;

/// Longest filename accepted for a config fragment.
pub const MAX_FILENAME_LEN: usize = 255;

/// Longest environment name accepted.
pub const MAX_ENVIRONMENT_LEN: usize = 64;

static FILENAME_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[A-Za-z0-9][A-Za-z0-9._-]*\.(yaml|yml)$").expect("filename pattern is valid")
});

static ENVIRONMENT_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[A-Za-z0-9][A-Za-z0-9_-]*$").expect("environment pattern is valid")
});

/// Check whether `name` is an acceptable config fragment filename.
///
/// Accepts `00-priority.yaml`, `multi-word-config.yml`; rejects hidden files,
/// shell metacharacters, traversal sequences and over-long names.
pub fn is_valid_filename(name: &str) -> bool {
    if name.is_empty() || name.len() > MAX_FILENAME_LEN {
        return false;
    }
    if name.contains("..") {
        return false;
    }
    FILENAME_RE.is_match(name)
}

/// Check whether `path` is safe to use as a config directory or file path.
///
/// Rejects empty paths and paths whose cleaned form still climbs upward.
pub fn is_valid_config_path(path: &Path) -> bool {
    if path.as_os_str().is_empty() {
        return false;
    }
    !clean_path(path)
        .components()
        .any(|c| matches!(c, Component::ParentDir))
}

/// Check whether an environment name can be used as a directory segment.
pub fn is_valid_environment_name(name: &str) -> bool {
    name.len() <= MAX_ENVIRONMENT_LEN && ENVIRONMENT_RE.is_match(name)
}

/// Normalize path components without requiring the file to exist.
/// Handles `.` and `..` components.
pub fn clean_path(path: &Path) -> PathBuf {
    let mut components: Vec<Component<'_>> = Vec::new();

    for component in path.components() {
        match component {
            Component::Prefix(_) | Component::RootDir | Component::Normal(_) => {
                components.push(component);
            }
            Component::CurDir => {}
            Component::ParentDir => match components.last() {
                Some(Component::Normal(_)) => {
                    components.pop();
                }
                // `/..` is still `/`
                Some(Component::RootDir) | Some(Component::Prefix(_)) => {}
                _ => components.push(Component::ParentDir),
            },
        }
    }

    components.iter().collect()
}

/// Convert path to string using forward slashes.
pub fn path_to_forward_slashes(path: &Path) -> String {
    path.to_string_lossy().replace('\\', "/")
}
