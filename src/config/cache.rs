//! File-change cache.
//!
//! Tracks each file's modification signature (mtime, size) so repeated loads
//! skip re-parsing fragments that did not change. Entries expire after a TTL
//! and the cache is bounded; once full, the oldest entry is evicted first.

use super::value::SettingValue;
use crate::error::{ConfigError, ConfigResult};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::time::{Duration, Instant, SystemTime};
use tracing::{debug, trace};

/// Default time an entry stays authoritative.
pub const DEFAULT_TTL: Duration = Duration::from_secs(5 * 60);

/// Default maximum number of tracked files.
pub const DEFAULT_MAX_ENTRIES: usize = 10_000;

/// Files larger than this are rejected outright.
pub const MAX_FILE_SIZE: u64 = 10 * 1024 * 1024;

/// Cached signature of one file.
#[derive(Debug, Clone)]
pub struct CacheEntry {
    pub modified: Option<SystemTime>,
    pub size: u64,
    pub cached_at: Instant,
    /// Parsed fragment, once the loader has stored one for this signature.
    document: Option<Arc<SettingValue>>,
}

impl CacheEntry {
    fn new(modified: Option<SystemTime>, size: u64) -> Self {
        Self {
            modified,
            size,
            cached_at: Instant::now(),
            document: None,
        }
    }

    fn is_expired(&self, ttl: Duration) -> bool {
        self.cached_at.elapsed() > ttl
    }

    /// Newer mtime or a different size both count as a change.
    fn is_stale(&self, modified: Option<SystemTime>, size: u64) -> bool {
        let newer = match (self.modified, modified) {
            (Some(cached), Some(current)) => current > cached,
            (None, Some(_)) => true,
            _ => false,
        };
        newer || self.size != size
    }
}

/// Thread-safe, bounded file signature cache.
///
/// Construct one per process (or per test) and hand it to the loader; clones
/// of the `Arc` share state.
#[derive(Debug)]
pub struct FileCache {
    entries: RwLock<HashMap<PathBuf, CacheEntry>>,
    ttl: Duration,
    max_entries: usize,
}

impl Default for FileCache {
    fn default() -> Self {
        Self::new(DEFAULT_TTL, DEFAULT_MAX_ENTRIES)
    }
}

impl FileCache {
    /// Create a cache. A `max_entries` of zero is treated as one.
    pub fn new(ttl: Duration, max_entries: usize) -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            ttl,
            max_entries: max_entries.max(1),
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    pub fn max_entries(&self) -> usize {
        self.max_entries
    }

    /// Decide whether `path` must be re-parsed.
    ///
    /// Returns `Ok(true)` for unknown, expired or changed files (refreshing
    /// the entry), `Ok(false)` for unchanged ones. A failed stat drops the
    /// entry and returns the error, as does a file over [`MAX_FILE_SIZE`].
    pub fn should_reload(&self, path: &Path) -> ConfigResult<bool> {
        let metadata = match std::fs::metadata(path) {
            Ok(metadata) => metadata,
            Err(err) => {
                if self.write().remove(path).is_some() {
                    debug!(path = %path.display(), "Dropped cache entry for missing file");
                }
                return Err(ConfigError::io(path, err));
            }
        };

        let size = metadata.len();
        if size > MAX_FILE_SIZE {
            self.write().remove(path);
            return Err(ConfigError::FileTooLarge {
                path: path.to_path_buf(),
                size,
                limit: MAX_FILE_SIZE,
            });
        }
        let modified = metadata.modified().ok();

        {
            let entries = self.read();
            if let Some(entry) = entries.get(path)
                && !entry.is_expired(self.ttl)
                && !entry.is_stale(modified, size)
            {
                trace!(path = %path.display(), "Cache hit");
                return Ok(false);
            }
        }

        self.insert(path.to_path_buf(), CacheEntry::new(modified, size));
        Ok(true)
    }

    /// Parsed document stored for the current signature of `path`.
    pub fn document(&self, path: &Path) -> Option<Arc<SettingValue>> {
        self.read().get(path).and_then(|e| e.document.clone())
    }

    /// Attach a parsed document to an existing entry.
    ///
    /// Ignored when the entry is gone (evicted or cleared in the meantime).
    pub fn store_document(&self, path: &Path, document: Arc<SettingValue>) {
        if let Some(entry) = self.write().get_mut(path) {
            entry.document = Some(document);
        }
    }

    /// Drop a single entry.
    pub fn remove(&self, path: &Path) -> bool {
        self.write().remove(path).is_some()
    }

    /// Drop all entries.
    pub fn clear(&self) {
        self.write().clear();
    }

    pub fn len(&self) -> usize {
        self.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.read().is_empty()
    }

    pub fn contains(&self, path: &Path) -> bool {
        self.read().contains_key(path)
    }

    fn insert(&self, path: PathBuf, entry: CacheEntry) {
        let mut entries = self.write();
        if !entries.contains_key(&path) && entries.len() >= self.max_entries {
            let oldest = entries
                .iter()
                .min_by_key(|(_, e)| e.cached_at)
                .map(|(p, _)| p.clone());
            if let Some(oldest) = oldest {
                debug!(path = %oldest.display(), "Evicting oldest cache entry");
                entries.remove(&oldest);
            }
        }
        entries.insert(path, entry);
    }

    // Poisoned locks are recovered.
    fn read(&self) -> RwLockReadGuard<'_, HashMap<PathBuf, CacheEntry>> {
        self.entries.read().unwrap_or_else(|e| e.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, HashMap<PathBuf, CacheEntry>> {
        self.entries.write().unwrap_or_else(|e| e.into_inner())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use filetime::FileTime;
    use tempfile::TempDir;

    fn write(dir: &TempDir, name: &str, content: &str) -> PathBuf {
        let path = dir.path().join(name);
        std::fs::write(&path, content).unwrap();
        path
    }

    #[test]
    fn test_reload_sequence() {
        let temp = TempDir::new().unwrap();
        let cache = FileCache::default();
        let path = write(&temp, "a.yaml", "key: value\n");

        assert!(cache.should_reload(&path).unwrap());
        assert!(!cache.should_reload(&path).unwrap());

        std::fs::write(&path, "key: a much longer value\n").unwrap();
        assert!(cache.should_reload(&path).unwrap());
        assert!(!cache.should_reload(&path).unwrap());
    }

    #[test]
    fn test_newer_mtime_same_size_is_stale() {
        let temp = TempDir::new().unwrap();
        let cache = FileCache::default();
        let path = write(&temp, "a.yaml", "key: one\n");
        filetime::set_file_mtime(&path, FileTime::from_unix_time(1_000_000, 0)).unwrap();
        assert!(cache.should_reload(&path).unwrap());

        std::fs::write(&path, "key: two\n").unwrap();
        filetime::set_file_mtime(&path, FileTime::from_unix_time(2_000_000, 0)).unwrap();
        assert!(cache.should_reload(&path).unwrap());
    }

    #[test]
    fn test_same_mtime_different_size_is_stale() {
        let temp = TempDir::new().unwrap();
        let cache = FileCache::default();
        let path = write(&temp, "a.yaml", "key: one\n");
        let stamp = FileTime::from_unix_time(1_000_000, 0);
        filetime::set_file_mtime(&path, stamp).unwrap();
        assert!(cache.should_reload(&path).unwrap());

        std::fs::write(&path, "key: three\n").unwrap();
        filetime::set_file_mtime(&path, stamp).unwrap();
        assert!(cache.should_reload(&path).unwrap());
    }

    #[test]
    fn test_deleted_file_removes_entry() {
        let temp = TempDir::new().unwrap();
        let cache = FileCache::default();
        let path = write(&temp, "a.yaml", "key: value\n");

        assert!(cache.should_reload(&path).unwrap());
        assert!(cache.contains(&path));

        std::fs::remove_file(&path).unwrap();
        let err = cache.should_reload(&path).unwrap_err();
        assert!(err.is_not_found());
        assert!(!cache.contains(&path));
    }

    #[test]
    fn test_ttl_expiry() {
        let temp = TempDir::new().unwrap();
        let cache = FileCache::new(Duration::ZERO, 10);
        let path = write(&temp, "a.yaml", "key: value\n");

        assert!(cache.should_reload(&path).unwrap());
        std::thread::sleep(Duration::from_millis(5));
        assert!(cache.should_reload(&path).unwrap());
    }

    #[test]
    fn test_evicts_oldest_when_full() {
        let temp = TempDir::new().unwrap();
        let cache = FileCache::new(DEFAULT_TTL, 2);
        let a = write(&temp, "a.yaml", "a: 1\n");
        let b = write(&temp, "b.yaml", "b: 1\n");
        let c = write(&temp, "c.yaml", "c: 1\n");

        cache.should_reload(&a).unwrap();
        std::thread::sleep(Duration::from_millis(2));
        cache.should_reload(&b).unwrap();
        std::thread::sleep(Duration::from_millis(2));
        cache.should_reload(&c).unwrap();

        assert_eq!(cache.len(), 2);
        assert!(!cache.contains(&a));
        assert!(cache.contains(&b));
        assert!(cache.contains(&c));
    }

    #[test]
    fn test_oversized_file_rejected() {
        let temp = TempDir::new().unwrap();
        let cache = FileCache::default();
        let path = temp.path().join("big.yaml");
        let file = std::fs::File::create(&path).unwrap();
        file.set_len(MAX_FILE_SIZE + 1).unwrap();

        let err = cache.should_reload(&path).unwrap_err();
        assert_eq!(err.code(), "FILE_TOO_LARGE");
        assert!(!cache.contains(&path));
    }

    #[test]
    fn test_document_memo_dropped_on_change() {
        let temp = TempDir::new().unwrap();
        let cache = FileCache::default();
        let path = write(&temp, "a.yaml", "key: value\n");

        assert!(cache.should_reload(&path).unwrap());
        cache.store_document(&path, Arc::new(SettingValue::from("parsed")));
        assert!(!cache.should_reload(&path).unwrap());
        assert!(cache.document(&path).is_some());

        std::fs::write(&path, "key: changed value\n").unwrap();
        assert!(cache.should_reload(&path).unwrap());
        assert!(cache.document(&path).is_none());
    }

    #[test]
    fn test_clear() {
        let temp = TempDir::new().unwrap();
        let cache = FileCache::default();
        let path = write(&temp, "a.yaml", "key: value\n");
        cache.should_reload(&path).unwrap();
        assert!(!cache.is_empty());

        cache.clear();
        assert!(cache.is_empty());
        assert!(cache.should_reload(&path).unwrap());
    }

    #[test]
    fn test_concurrent_access_on_distinct_paths() {
        let temp = TempDir::new().unwrap();
        let cache = Arc::new(FileCache::default());
        let paths: Vec<_> = (0..16)
            .map(|i| write(&temp, &format!("f{i}.yaml"), "k: v\n"))
            .collect();

        std::thread::scope(|s| {
            for path in &paths {
                let cache = Arc::clone(&cache);
                s.spawn(move || {
                    assert!(cache.should_reload(path).unwrap());
                    assert!(!cache.should_reload(path).unwrap());
                });
            }
        });
        assert_eq!(cache.len(), 16);
    }
}
