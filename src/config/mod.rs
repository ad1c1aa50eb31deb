//! Layered settings resolution.
//!
//! Resolves one settings tree from six tiers, lowest precedence first:
//! 1. **Default** - `~/.local/share/workstation/config/`
//! 2. **Default environment** - `<default>/env/<environment>/`
//! 3. **Team** - `~/.workstation/team/` (or `WORKSTATION_TEAM_DIR`)
//! 4. **Team environment** - `<team>/env/<environment>/`
//! 5. **User** - `~/.workstation/config/`
//! 6. **User environment** - `<user>/env/<environment>/`
//!
//! Each tier holds `system/`, `environments/`, `applications/` and `desktop/`
//! directories, read in that order. Inside a directory, fragments are applied
//! in sorted filename order.
//!
//! ## Merge Strategy
//! - Each top-level key of `<category>/<file>.yaml` lands at
//!   `<category>.<file>.<key>` in the tree
//! - Later writers win per key; mappings and lists are replaced whole
//! - Broken fragments are logged and skipped, never fatal
//!
//! ## Environment Variables
//! - `WORKSTATION_ENV`, `WSCONF_ENV`, `APP_ENV`, `ENVIRONMENT` - Environment
//!   name, first one set wins (default: `development`)
//! - `WORKSTATION_TEAM_DIR` - Team tier root
//! - `WORKSTATION_CACHE_TTL_SECS` - File cache TTL
//! - `WORKSTATION_CACHE_MAX_ENTRIES` - File cache capacity
//! - `WORKSTATION_PARALLEL_THRESHOLD` - Files per directory before parsing in parallel
//! - `WORKSTATION_WORKERS` - Parser pool size
//! - `WORKSTATION_RECURSIVE_DEPTH` - Descend into category subdirectories

pub mod cache;
mod files;
mod loader;
mod merge;
mod tiers;
mod types;
pub mod validate;
mod value;

pub use cache::{CacheEntry, FileCache};
pub use files::{list_files, list_files_recursive};
pub use loader::{
    ConfigLoader, LoadReport, LoadStrategy, LoadedFile, LoaderOptions, SkippedFile,
    parse_document, sanitize_key,
};
pub use merge::{SettingsTree, deep_merge, deep_merge_all};
pub use tiers::{
    Category, DEFAULT_ENVIRONMENT, ENVIRONMENT_VARS, TEAM_DIR_VAR, Tier, TierDirectory,
    TierLayout, resolve_environment,
};
pub use types::*;
pub use validate::{Finding, Severity, ValidationReport, Validator};
pub use value::SettingValue;
