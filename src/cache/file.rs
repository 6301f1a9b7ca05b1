use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use super::{CacheEntry, CacheKey, CacheStore, MemoryCache};
use crate::error::CacheError;

/// A [`MemoryCache`] read from a JSON file when opened and written back on
/// [`flush`](CacheStore::flush), so warmed entries survive between runs.
#[derive(Debug)]
pub struct FileCache {
    path: PathBuf,
    inner: MemoryCache,
}

impl FileCache {
    /// Open the cache at `path`. A missing file is an empty cache.
    pub fn open(path: impl Into<PathBuf>, ttl: Option<Duration>) -> Result<Self, CacheError> {
        let path = path.into();
        let entries: HashMap<CacheKey, CacheEntry> = match std::fs::read(&path) {
            Ok(bytes) => serde_json::from_slice(&bytes)?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => HashMap::new(),
            Err(source) => return Err(CacheError::Io { path, source }),
        };
        tracing::debug!("Opened cache {} with {} entries", path.display(), entries.len());

        Ok(Self {
            inner: MemoryCache::with_entries(entries, ttl),
            path,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl CacheStore for FileCache {
    fn get(&self, key: &CacheKey) -> Option<serde_json::Value> {
        self.inner.get(key)
    }

    fn set(&self, key: &CacheKey, value: serde_json::Value) {
        self.inner.set(key, value);
    }

    fn clear(&self) -> usize {
        self.inner.clear()
    }

    fn len(&self) -> usize {
        self.inner.len()
    }

    /// Write live entries to the file, dropping expired ones.
    fn flush(&self) -> Result<(), CacheError> {
        let entries = self.inner.snapshot();
        let bytes = serde_json::to_vec(&entries)?;

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|source| CacheError::Io {
                path: parent.to_path_buf(),
                source,
            })?;
        }
        std::fs::write(&self.path, bytes).map_err(|source| CacheError::Io {
            path: self.path.clone(),
            source,
        })?;

        tracing::info!("Wrote {} cache entries to {}", entries.len(), self.path.display());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;
    use uuid::Uuid;

    use super::*;
    use crate::cache::CachedCall;
    use crate::cache::key::test_support::scope;
    use crate::calendar::DateWindow;
    use crate::calendar::test_support::date;
    use crate::model::Subject;

    fn key() -> CacheKey {
        CachedCall::StatsBetween {
            subject: Subject::WorkItem(Uuid::nil()),
            window: DateWindow::new(date(2016, 1, 1), date(2016, 1, 31)),
            calculation_start: None,
        }
        .key(&scope())
    }

    #[test]
    fn test_entries_survive_reopening() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("cache.json");

        let cache = FileCache::open(&path, None).unwrap();
        assert!(cache.is_empty());
        cache.set(&key(), json!({"total": "1200.00"}));
        cache.flush().unwrap();

        let reopened = FileCache::open(&path, None).unwrap();
        assert_eq!(reopened.path(), path.as_path());
        assert_eq!(reopened.get(&key()), Some(json!({"total": "1200.00"})));
    }

    #[test]
    fn test_corrupt_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cache.json");
        std::fs::write(&path, "not json").unwrap();

        assert!(matches!(
            FileCache::open(&path, None),
            Err(CacheError::Serialization(_))
        ));
    }
}
