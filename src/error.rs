//! Structured error types for settings resolution.

use std::path::PathBuf;
use thiserror::Error;

/// Result type for settings operations.
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

/// Errors raised while resolving, loading, or validating settings.
///
/// Most of these are recoverable at file or directory granularity: the loader
/// logs them and moves on. Only cache stat failures on a directly requested
/// path and the validator's aggregate error reach callers as hard errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("{path} is {size} bytes, exceeding the {limit} byte limit")]
    FileTooLarge { path: PathBuf, size: u64, limit: u64 },

    #[error("{0} is empty")]
    EmptyFile(PathBuf),

    #[error("failed to parse {path}: {message}")]
    Parse { path: PathBuf, message: String },

    #[error("{0} does not contain a top-level mapping")]
    NotAMapping(PathBuf),

    #[error("unsafe or empty path: {0}")]
    InvalidPath(PathBuf),

    #[error("directory not found: {0}")]
    DirectoryNotFound(PathBuf),

    #[error("could not determine the home directory")]
    NoHomeDirectory,

    #[error("a parser worker panicked")]
    WorkerPanicked,

    #[error("validation failed with {errors} error(s) and {warnings} warning(s)")]
    Validation { errors: usize, warnings: usize },
}

impl ConfigError {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    pub fn parse(path: impl Into<PathBuf>, err: impl std::fmt::Display) -> Self {
        Self::Parse {
            path: path.into(),
            message: err.to_string(),
        }
    }

    /// Stable code for programmatic handling and log filtering.
    pub fn code(&self) -> &'static str {
        match self {
            ConfigError::Io { .. } => "IO_ERROR",
            ConfigError::FileTooLarge { .. } => "FILE_TOO_LARGE",
            ConfigError::EmptyFile(_) => "EMPTY_FILE",
            ConfigError::Parse { .. } => "PARSE_ERROR",
            ConfigError::NotAMapping(_) => "NOT_A_MAPPING",
            ConfigError::InvalidPath(_) => "INVALID_PATH",
            ConfigError::DirectoryNotFound(_) => "DIRECTORY_NOT_FOUND",
            ConfigError::NoHomeDirectory => "NO_HOME_DIRECTORY",
            ConfigError::WorkerPanicked => "WORKER_PANICKED",
            ConfigError::Validation { .. } => "VALIDATION_FAILED",
        }
    }

    /// True when the underlying cause is a missing file or directory.
    pub fn is_not_found(&self) -> bool {
        match self {
            ConfigError::DirectoryNotFound(_) => true,
            ConfigError::Io { source, .. } => source.kind() == std::io::ErrorKind::NotFound,
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_codes_are_distinct() {
        let errors = [
            ConfigError::io("a.yaml", std::io::Error::other("boom")),
            ConfigError::FileTooLarge {
                path: PathBuf::from("a.yaml"),
                size: 2,
                limit: 1,
            },
            ConfigError::EmptyFile(PathBuf::from("a.yaml")),
            ConfigError::parse("a.yaml", "bad"),
            ConfigError::NotAMapping(PathBuf::from("a.yaml")),
            ConfigError::InvalidPath(PathBuf::from("..")),
            ConfigError::DirectoryNotFound(PathBuf::from("x")),
            ConfigError::NoHomeDirectory,
            ConfigError::WorkerPanicked,
            ConfigError::Validation {
                errors: 1,
                warnings: 0,
            },
        ];
        let mut codes: Vec<_> = errors.iter().map(ConfigError::code).collect();
        codes.sort_unstable();
        codes.dedup();
        assert_eq!(codes.len(), errors.len());
    }

    #[test]
    fn test_not_found_detection() {
        let err = ConfigError::io(
            "missing.yaml",
            std::io::Error::new(std::io::ErrorKind::NotFound, "gone"),
        );
        assert!(err.is_not_found());
        assert!(ConfigError::DirectoryNotFound(PathBuf::from("x")).is_not_found());
        assert!(!ConfigError::WorkerPanicked.is_not_found());
    }

    #[test]
    fn test_validation_message() {
        let err = ConfigError::Validation {
            errors: 2,
            warnings: 3,
        };
        assert_eq!(
            err.to_string(),
            "validation failed with 2 error(s) and 3 warning(s)"
        );
    }
}
