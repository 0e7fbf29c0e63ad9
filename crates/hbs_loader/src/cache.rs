//! Process-lifetime cache of compiled templates, keyed by path and validated
//! against file modification times.

use parking_lot::Mutex;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::SystemTime;

use crate::module::CompiledModule;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheEntry {
    pub module: CompiledModule,
    /// Modification time observed before the source was read.
    pub modified: SystemTime,
}

impl CacheEntry {
    /// A file is unchanged unless its mtime moved strictly past the recorded one.
    pub fn is_valid(&self, current: SystemTime) -> bool {
        current <= self.modified
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    pub hits: u64,
    /// Lookups that found no entry.
    pub misses: u64,
    /// Entries dropped because they were stale or could not be checked.
    pub invalidations: u64,
}

#[derive(Debug, Default)]
pub struct CompileCache {
    entries: Mutex<HashMap<PathBuf, CacheEntry>>,
    hits: AtomicU64,
    misses: AtomicU64,
    invalidations: AtomicU64,
}

impl CompileCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn lookup(&self, path: &Path) -> Option<CacheEntry> {
        self.entries.lock().get(path).cloned()
    }

    pub fn invalidate(&self, path: &Path) {
        if self.entries.lock().remove(path).is_some() {
            self.invalidations.fetch_add(1, Ordering::Relaxed);
        }
    }

    /// Inserts or replaces the entry for `path`.
    pub fn store(&self, path: impl Into<PathBuf>, module: CompiledModule, modified: SystemTime) {
        self.entries
            .lock()
            .insert(path.into(), CacheEntry { module, modified });
    }

    pub fn note_hit(&self) {
        self.hits.fetch_add(1, Ordering::Relaxed);
    }

    pub fn note_miss(&self) {
        self.misses.fetch_add(1, Ordering::Relaxed);
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            invalidations: self.invalidations.load(Ordering::Relaxed),
        }
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }

    pub fn clear(&self) {
        self.entries.lock().clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::time::Duration;

    #[test]
    fn test_validity_is_inclusive() {
        let recorded = SystemTime::UNIX_EPOCH + Duration::from_secs(100);
        let entry = CacheEntry {
            module: CompiledModule::Source("x".into()),
            modified: recorded,
        };
        assert!(entry.is_valid(recorded));
        assert!(entry.is_valid(recorded - Duration::from_secs(1)));
        assert!(!entry.is_valid(recorded + Duration::from_nanos(1)));
    }

    #[test]
    fn test_store_lookup_invalidate() {
        let cache = CompileCache::new();
        let path = Path::new("/views/a.hbs");
        let t1 = SystemTime::UNIX_EPOCH + Duration::from_secs(1);
        let t2 = SystemTime::UNIX_EPOCH + Duration::from_secs(2);

        assert_eq!(cache.lookup(path), None);
        cache.store(path, CompiledModule::Source("one".into()), t1);
        cache.store(path, CompiledModule::Source("two".into()), t2);
        assert_eq!(cache.len(), 1);
        assert_eq!(
            cache.lookup(path),
            Some(CacheEntry {
                module: CompiledModule::Source("two".into()),
                modified: t2,
            })
        );

        cache.invalidate(path);
        cache.invalidate(path);
        assert!(cache.is_empty());
        assert_eq!(cache.stats().invalidations, 1);

        cache.store(path, CompiledModule::Source("three".into()), t1);
        cache.clear();
        assert_eq!(cache.lookup(path), None);
    }
}
