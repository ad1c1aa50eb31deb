//! Directory enumeration.
//!
//! Lists the config fragments of one physical directory. The lexicographic
//! sort is the only thing that orders fragments inside a directory, so
//! `00-base.yaml` is always applied before `50-local.yaml`.

use crate::error::{ConfigError, ConfigResult};
use crate::paths::{is_valid_config_path, is_valid_filename, path_to_forward_slashes};
use std::path::Path;
use tracing::{debug, warn};
use walkdir::WalkDir;

/// List the valid `*.yaml`/`*.yml` files directly inside `dir`, sorted.
///
/// Unsafe names, hidden files, subdirectories and symlinks are skipped.
/// Symlinks are never followed, matching [`list_files_recursive`].
pub fn list_files(dir: &Path) -> ConfigResult<Vec<String>> {
    check_directory(dir)?;

    let entries = std::fs::read_dir(dir).map_err(|e| ConfigError::io(dir, e))?;
    let mut files = Vec::new();
    for entry in entries {
        let entry = match entry {
            Ok(entry) => entry,
            Err(err) => {
                warn!(path = %dir.display(), error = %err, "Skipping unreadable directory entry");
                continue;
            }
        };
        let Some(name) = entry.file_name().to_str().map(str::to_string) else {
            debug!(path = %dir.display(), "Skipping non-UTF-8 filename");
            continue;
        };
        if !is_valid_filename(&name) {
            debug!(file = %name, "Skipping file with invalid name");
            continue;
        }
        match entry.file_type() {
            Ok(file_type) if file_type.is_file() => files.push(name),
            Ok(file_type) if file_type.is_symlink() => {
                debug!(file = %name, "Skipping symlink");
            }
            Ok(_) => {}
            Err(err) => {
                warn!(file = %name, error = %err, "Skipping entry with unreadable type");
            }
        }
    }

    files.sort();
    Ok(files)
}

/// List valid files below `dir` up to `max_depth` levels of nesting.
///
/// Depth is the number of separators in the path relative to `dir`: files
/// directly inside `dir` are depth 0. Returns forward-slash relative paths,
/// sorted. Unreadable subtrees are logged and skipped.
pub fn list_files_recursive(dir: &Path, max_depth: usize) -> ConfigResult<Vec<String>> {
    check_directory(dir)?;

    let mut files = Vec::new();
    let walker = WalkDir::new(dir)
        .follow_links(false)
        .min_depth(1)
        .max_depth(max_depth.saturating_add(1));

    for entry in walker {
        let entry = match entry {
            Ok(entry) => entry,
            Err(err) => {
                let path = err.path().map(|p| p.display().to_string()).unwrap_or_default();
                warn!(path = %path, error = %err, "Skipping unreadable subtree");
                continue;
            }
        };
        if !entry.file_type().is_file() {
            continue;
        }
        let Some(name) = entry.file_name().to_str() else {
            continue;
        };
        if !is_valid_filename(name) {
            debug!(file = %name, "Skipping file with invalid name");
            continue;
        }
        let Ok(relative) = entry.path().strip_prefix(dir) else {
            continue;
        };
        let relative = path_to_forward_slashes(relative);
        if relative.matches('/').count() > max_depth {
            continue;
        }
        files.push(relative);
    }

    files.sort();
    Ok(files)
}

fn check_directory(dir: &Path) -> ConfigResult<()> {
    if !is_valid_config_path(dir) {
        return Err(ConfigError::InvalidPath(dir.to_path_buf()));
    }
    match std::fs::metadata(dir) {
        Ok(m) if m.is_dir() => Ok(()),
        Ok(_) => Err(ConfigError::io(
            dir,
            std::io::Error::new(std::io::ErrorKind::NotADirectory, "not a directory"),
        )),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            Err(ConfigError::DirectoryNotFound(dir.to_path_buf()))
        }
        Err(e) => Err(ConfigError::io(dir, e)),
    }
}
