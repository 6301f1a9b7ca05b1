use std::collections::HashMap;
use std::sync::{PoisonError, RwLock};
use std::time::Duration;

use chrono::Utc;

use super::{CacheEntry, CacheKey, CacheStore};

/// In-process store. Entries older than the TTL read as missing.
#[derive(Debug, Default)]
pub struct MemoryCache {
    entries: RwLock<HashMap<CacheKey, CacheEntry>>,
    ttl: Option<Duration>,
}

impl MemoryCache {
    /// `None` or a zero TTL keeps entries until cleared.
    pub fn new(ttl: Option<Duration>) -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            ttl: ttl.filter(|t| !t.is_zero()),
        }
    }

    pub(crate) fn with_entries(
        entries: HashMap<CacheKey, CacheEntry>,
        ttl: Option<Duration>,
    ) -> Self {
        let cache = Self::new(ttl);
        *cache.entries.write().unwrap_or_else(PoisonError::into_inner) = entries;
        cache
    }

    /// Copy of every live entry.
    pub(crate) fn snapshot(&self) -> HashMap<CacheKey, CacheEntry> {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .filter(|(_, entry)| !self.is_expired(entry))
            .map(|(key, entry)| (key.clone(), entry.clone()))
            .collect()
    }

    fn is_expired(&self, entry: &CacheEntry) -> bool {
        let Some(ttl) = self.ttl else {
            return false;
        };
        let age = Utc::now().signed_duration_since(entry.stored_at);
        age.to_std().is_ok_and(|age| age > ttl)
    }
}

impl CacheStore for MemoryCache {
    fn get(&self, key: &CacheKey) -> Option<serde_json::Value> {
        let entries = self.entries.read().unwrap_or_else(PoisonError::into_inner);
        entries
            .get(key)
            .filter(|entry| !self.is_expired(entry))
            .map(|entry| entry.value.clone())
    }

    fn set(&self, key: &CacheKey, value: serde_json::Value) {
        self.entries
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(key.clone(), CacheEntry::new(value));
    }

    fn clear(&self) -> usize {
        let mut entries = self.entries.write().unwrap_or_else(PoisonError::into_inner);
        let removed = entries.len();
        entries.clear();
        removed
    }

    fn len(&self) -> usize {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }
}
