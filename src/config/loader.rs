//! Configuration loader with tier-based merging.
//!
//! Walks every tier/category directory in precedence order, parses each
//! fragment into a [`SettingValue`] tree and folds it into one shared
//! [`SettingsTree`]. Large directories are parsed by a bounded worker pool,
//! but fragments are always merged in sorted filename order, so the result is
//! identical to a sequential load.

use super::cache::{DEFAULT_MAX_ENTRIES, DEFAULT_TTL, FileCache};
use super::files::{list_files, list_files_recursive};
use super::merge::{SettingsTree, namespace};
use super::tiers::{Category, TierDirectory, TierLayout};
use super::types::Settings;
use super::value::SettingValue;
use crate::error::{ConfigError, ConfigResult};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tracing::{debug, info, warn};

/// Directories with more files than this are parsed in parallel.
pub const DEFAULT_PARALLEL_THRESHOLD: usize = 5;

/// Size of the parser worker pool.
pub const DEFAULT_WORKERS: usize = 10;

/// Prefix for file keys that would not start with a letter.
pub const SANITIZED_KEY_PREFIX: &str = "cfg_";

/// How files inside one directory are parsed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LoadStrategy {
    /// Parallel once a directory exceeds the threshold (default)
    #[default]
    Auto,
    /// Always one file at a time
    Sequential,
    /// Always through the worker pool
    Parallel,
}

/// Tunables for the loader.
#[derive(Debug, Clone)]
pub struct LoaderOptions {
    pub strategy: LoadStrategy,
    pub parallel_threshold: usize,
    pub workers: usize,
    /// Descend into category subdirectories up to this depth; `None` lists
    /// only the top level.
    pub recursive_depth: Option<usize>,
    pub cache_ttl: Duration,
    pub cache_max_entries: usize,
}

impl Default for LoaderOptions {
    fn default() -> Self {
        Self {
            strategy: LoadStrategy::Auto,
            parallel_threshold: DEFAULT_PARALLEL_THRESHOLD,
            workers: DEFAULT_WORKERS,
            recursive_depth: None,
            cache_ttl: DEFAULT_TTL,
            cache_max_entries: DEFAULT_MAX_ENTRIES,
        }
    }
}

impl LoaderOptions {
    /// Defaults with environment variable overrides applied.
    pub fn from_env() -> Self {
        let mut options = Self::default();
        options.apply_env_overrides(|name| std::env::var(name).ok());
        options
    }

    /// Apply `WORKSTATION_*` overrides. `lookup` abstracts `std::env::var`.
    pub fn apply_env_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(secs) = parse_env::<u64>(&lookup, "WORKSTATION_CACHE_TTL_SECS") {
            self.cache_ttl = Duration::from_secs(secs);
        }
        if let Some(max) = parse_env::<usize>(&lookup, "WORKSTATION_CACHE_MAX_ENTRIES") {
            self.cache_max_entries = max;
        }
        if let Some(threshold) = parse_env::<usize>(&lookup, "WORKSTATION_PARALLEL_THRESHOLD") {
            self.parallel_threshold = threshold;
        }
        if let Some(workers) = parse_env::<usize>(&lookup, "WORKSTATION_WORKERS") {
            self.workers = workers.max(1);
        }
        if let Some(depth) = parse_env::<usize>(&lookup, "WORKSTATION_RECURSIVE_DEPTH") {
            self.recursive_depth = Some(depth);
        }
    }

    /// Build a cache sized by these options.
    pub fn build_cache(&self) -> FileCache {
        FileCache::new(self.cache_ttl, self.cache_max_entries)
    }

    fn use_parallel(&self, file_count: usize) -> bool {
        match self.strategy {
            LoadStrategy::Auto => file_count > self.parallel_threshold,
            LoadStrategy::Sequential => false,
            LoadStrategy::Parallel => true,
        }
    }
}

fn parse_env<T: std::str::FromStr>(lookup: &impl Fn(&str) -> Option<String>, name: &str) -> Option<T> {
    let raw = lookup(name)?;
    match raw.trim().parse() {
        Ok(value) => Some(value),
        Err(_) => {
            warn!(variable = %name, value = %raw, "Ignoring unparseable environment override");
            None
        }
    }
}

/// A fragment that was merged.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadedFile {
    pub path: PathBuf,
    pub category: Category,
    pub keys: usize,
    /// True when the parsed tree came from the file cache.
    pub cached: bool,
}

/// A fragment that was excluded from the merge.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkippedFile {
    pub path: PathBuf,
    pub code: &'static str,
    pub reason: String,
}

/// What happened during one load.
#[derive(Debug, Clone, Default)]
pub struct LoadReport {
    pub loaded: Vec<LoadedFile>,
    pub skipped: Vec<SkippedFile>,
    /// Directories that did not exist (normal for unused tiers).
    pub missing_directories: Vec<PathBuf>,
    /// Directories that existed but could not be listed.
    pub failed_directories: Vec<(PathBuf, String)>,
}

impl LoadReport {
    pub fn cache_hits(&self) -> usize {
        self.loaded.iter().filter(|f| f.cached).count()
    }

    fn skip(&mut self, path: PathBuf, err: &ConfigError) {
        warn!(path = %path.display(), code = err.code(), "Skipping config file: {}", err);
        self.skipped.push(SkippedFile {
            path,
            code: err.code(),
            reason: err.to_string(),
        });
    }
}

/// Parsed fragment plus where it came from.
#[derive(Debug, Clone)]
struct Parsed {
    document: Arc<SettingValue>,
    cached: bool,
}

/// Configuration loader that handles tier-based merging.
#[derive(Debug, Clone)]
pub struct ConfigLoader {
    layout: TierLayout,
    cache: Arc<FileCache>,
    options: LoaderOptions,
}

impl ConfigLoader {
    pub fn new(layout: TierLayout, cache: Arc<FileCache>, options: LoaderOptions) -> Self {
        Self {
            layout,
            cache,
            options,
        }
    }

    /// Loader for the current user and environment, with a fresh cache.
    pub fn discover() -> ConfigResult<Self> {
        let options = LoaderOptions::from_env();
        let cache = Arc::new(options.build_cache());
        Ok(Self::new(TierLayout::discover()?, cache, options))
    }

    pub fn layout(&self) -> &TierLayout {
        &self.layout
    }

    pub fn cache(&self) -> &Arc<FileCache> {
        &self.cache
    }

    pub fn options(&self) -> &LoaderOptions {
        &self.options
    }

    /// Forget all cached file signatures, forcing a full re-parse next load.
    pub fn clear_cache(&self) {
        self.cache.clear();
    }

    /// Load, merge and materialize the settings.
    pub fn load(&self) -> ConfigResult<Settings> {
        self.load_with_report().map(|(settings, _)| settings)
    }

    /// Like [`load`](Self::load), also returning what was read and skipped.
    pub fn load_with_report(&self) -> ConfigResult<(Settings, LoadReport)> {
        let (tree, report) = self.load_tree()?;
        let settings = Settings::from_tree(&tree, self.layout.environment());
        Ok((settings, report))
    }

    /// Load and merge every tier into a generic tree.
    pub fn load_tree(&self) -> ConfigResult<(SettingsTree, LoadReport)> {
        let mut tree = SettingsTree::new();
        let mut report = LoadReport::default();

        for dir in self.layout.directories() {
            self.load_directory(&dir.path, dir.category, &mut tree, &mut report)?;
        }

        info!(
            environment = %self.layout.environment(),
            loaded = report.loaded.len(),
            skipped = report.skipped.len(),
            cache_hits = report.cache_hits(),
            keys = tree.len(),
            "Settings loaded"
        );
        Ok((tree, report))
    }

    /// Merge the fragments of one directory into `tree`.
    ///
    /// Missing or unreadable directories and bad files are recorded in
    /// `report` and skipped. Only a panicking worker is returned as an error.
    pub fn load_directory(
        &self,
        dir: &Path,
        category: Category,
        tree: &mut SettingsTree,
        report: &mut LoadReport,
    ) -> ConfigResult<()> {
        let files = match self.enumerate(dir) {
            Ok(files) => files,
            Err(err) if err.is_not_found() => {
                debug!(path = %dir.display(), "Config directory not present");
                report.missing_directories.push(dir.to_path_buf());
                return Ok(());
            }
            Err(err) => {
                warn!(path = %dir.display(), "Skipping config directory: {}", err);
                report
                    .failed_directories
                    .push((dir.to_path_buf(), err.to_string()));
                return Ok(());
            }
        };
        if files.is_empty() {
            return Ok(());
        }

        if self.options.use_parallel(files.len()) {
            debug!(path = %dir.display(), files = files.len(), "Parsing directory in parallel");
            let mut results = self.parse_parallel(dir, &files)?;
            // Sorted order, never completion order
            for name in &files {
                match results.remove(name) {
                    Some(outcome) => apply(tree, report, dir, category, name, outcome),
                    None => return Err(ConfigError::WorkerPanicked),
                }
            }
        } else {
            for name in &files {
                let outcome = self.read_document(&dir.join(name));
                apply(tree, report, dir, category, name, outcome);
            }
        }
        Ok(())
    }

    /// Every file a load would read, in merge order.
    pub fn planned_files(&self) -> Vec<(TierDirectory, PathBuf)> {
        let mut planned = Vec::new();
        for dir in self.layout.directories() {
            if let Ok(files) = self.enumerate(&dir.path) {
                for name in files {
                    let path = dir.path.join(&name);
                    planned.push((dir.clone(), path));
                }
            }
        }
        planned
    }

    fn enumerate(&self, dir: &Path) -> ConfigResult<Vec<String>> {
        match self.options.recursive_depth {
            Some(depth) => list_files_recursive(dir, depth),
            None => list_files(dir),
        }
    }

    /// Parse one file, reusing the cached tree when the file is unchanged.
    fn read_document(&self, path: &Path) -> ConfigResult<Parsed> {
        let stale = self.cache.should_reload(path)?;
        if !stale && let Some(document) = self.cache.document(path) {
            return Ok(Parsed {
                document,
                cached: true,
            });
        }

        let bytes = std::fs::read(path).map_err(|e| ConfigError::io(path, e))?;
        let document = Arc::new(parse_document(&bytes, path)?);
        self.cache.store_document(path, Arc::clone(&document));
        Ok(Parsed {
            document,
            cached: false,
        })
    }

    /// Parse `files` with a bounded pool of scoped threads.
    ///
    /// Results are keyed by filename; the caller decides merge order.
    fn parse_parallel(
        &self,
        dir: &Path,
        files: &[String],
    ) -> ConfigResult<HashMap<String, ConfigResult<Parsed>>> {
        let workers = self.options.workers.clamp(1, files.len());
        let next = AtomicUsize::new(0);
        let next = &next;

        let joined: Vec<_> = std::thread::scope(|s| {
            let handles: Vec<_> = (0..workers)
                .map(|_| {
                    s.spawn(move || {
                        let mut parsed = Vec::new();
                        loop {
                            let index = next.fetch_add(1, Ordering::Relaxed);
                            let Some(name) = files.get(index) else {
                                break;
                            };
                            parsed.push((name.clone(), self.read_document(&dir.join(name))));
                        }
                        parsed
                    })
                })
                .collect();
            handles.into_iter().map(|h| h.join()).collect()
        });

        let mut results = HashMap::with_capacity(files.len());
        for worker in joined {
            let Ok(parsed) = worker else {
                tracing::error!(path = %dir.display(), "Config parser worker panicked");
                return Err(ConfigError::WorkerPanicked);
            };
            results.extend(parsed);
        }
        Ok(results)
    }
}

/// Fold one parse outcome into the tree, or record why it was skipped.
fn apply(
    tree: &mut SettingsTree,
    report: &mut LoadReport,
    dir: &Path,
    category: Category,
    name: &str,
    outcome: ConfigResult<Parsed>,
) {
    let path = dir.join(name);
    match outcome {
        Ok(parsed) => {
            let prefix = namespace(category, &sanitize_key(name));
            let keys = tree.merge_document(&prefix, &parsed.document);
            debug!(path = %path.display(), keys, cached = parsed.cached, "Merged config file");
            report.loaded.push(LoadedFile {
                path,
                category,
                keys,
                cached: parsed.cached,
            });
        }
        Err(err) => report.skip(path, &err),
    }
}

/// Parse raw fragment bytes into a mapping.
///
/// Empty, whitespace-only and comment-only content is an error, as is any
/// document whose top level is not a mapping.
pub fn parse_document(bytes: &[u8], path: &Path) -> ConfigResult<SettingValue> {
    if bytes.iter().all(u8::is_ascii_whitespace) {
        return Err(ConfigError::EmptyFile(path.to_path_buf()));
    }
    let yaml: serde_yaml::Value =
        serde_yaml::from_slice(bytes).map_err(|e| ConfigError::parse(path, e))?;
    match SettingValue::from_yaml(yaml) {
        None => Err(ConfigError::EmptyFile(path.to_path_buf())),
        Some(value @ SettingValue::Map(_)) => Ok(value),
        Some(_) => Err(ConfigError::NotAMapping(path.to_path_buf())),
    }
}

/// Turn a fragment filename (or relative path) into a tree key segment.
///
/// `00-Git Config.yaml` becomes `cfg_00-git_config`.
pub fn sanitize_key(name: &str) -> String {
    let stem = name
        .strip_suffix(".yaml")
        .or_else(|| name.strip_suffix(".yml"))
        .unwrap_or(name);

    let sanitized: String = stem
        .chars()
        .map(|c| {
            let c = c.to_ascii_lowercase();
            if c.is_ascii_alphanumeric() || c == '_' || c == '-' {
                c
            } else {
                '_'
            }
        })
        .collect();

    if sanitized.starts_with(|c: char| c.is_ascii_alphabetic()) {
        sanitized
    } else {
        format!("{}{}", SANITIZED_KEY_PREFIX, sanitized)
    }
}
