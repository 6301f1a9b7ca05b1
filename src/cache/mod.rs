//! Memoization of expensive aggregate calls.
//!
//! Each cached operation is described by a [`CachedCall`] which, together
//! with the [`KeyScope`] it runs in, is hashed into a [`CacheKey`]. Values are stored as JSON in a
//! [`CacheStore`], so a hit always decodes to the same value that was
//! computed.

mod file;
mod key;
mod memory;

pub use file::FileCache;
pub use key::{CacheKey, CachedCall, KeyScope};
pub use memory::MemoryCache;

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::error::CacheError;

/// Whether a cached call may reuse a stored value.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum CacheMode {
    /// Return the stored value when there is one.
    #[default]
    Reuse,
    /// Always recompute and overwrite the stored value.
    Regenerate,
}

/// A stored value and when it was written.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheEntry {
    pub value: serde_json::Value,
    pub stored_at: DateTime<Utc>,
}

impl CacheEntry {
    pub fn new(value: serde_json::Value) -> Self {
        Self {
            value,
            stored_at: Utc::now(),
        }
    }
}

/// Something the memoizer can store results for.
pub trait CacheRequest {
    /// Name used in logs.
    fn operation(&self) -> &'static str;

    fn key(&self, scope: &KeyScope) -> Result<CacheKey, CacheError>;
}

impl CacheRequest for CachedCall {
    fn operation(&self) -> &'static str {
        CachedCall::operation(self)
    }

    fn key(&self, scope: &KeyScope) -> Result<CacheKey, CacheError> {
        Ok(CachedCall::key(self, scope))
    }
}

/// Key-value store behind the memoizer. Shared between warming jobs.
pub trait CacheStore: Send + Sync {
    fn get(&self, key: &CacheKey) -> Option<serde_json::Value>;

    fn set(&self, key: &CacheKey, value: serde_json::Value);

    /// Drop every entry, returning how many there were.
    fn clear(&self) -> usize;

    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Persist pending writes, for stores that have somewhere to put them.
    fn flush(&self) -> Result<(), CacheError> {
        Ok(())
    }
}

/// Routes cached operations through a [`CacheStore`].
#[derive(Clone)]
pub struct Memoizer {
    store: Arc<dyn CacheStore>,
}

impl std::fmt::Debug for Memoizer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Memoizer")
            .field("entries", &self.store.len())
            .finish()
    }
}

impl Memoizer {
    pub fn new(store: Arc<dyn CacheStore>) -> Self {
        Self { store }
    }

    /// A memoizer over a fresh in-memory store without expiry.
    pub fn in_memory() -> Self {
        Self::new(Arc::new(MemoryCache::new(None)))
    }

    pub fn store(&self) -> &Arc<dyn CacheStore> {
        &self.store
    }

    /// Return the stored result of `call`, or compute and store it.
    ///
    /// A key that cannot be derived, or a value that cannot be encoded, is
    /// logged and the call runs uncached. Errors from `compute` are returned
    /// and nothing is stored.
    pub fn get_or_compute<R, T, E, F>(
        &self,
        call: &R,
        scope: &KeyScope,
        mode: CacheMode,
        compute: F,
    ) -> Result<T, E>
    where
        R: CacheRequest + ?Sized,
        T: Serialize + DeserializeOwned,
        F: FnOnce() -> Result<T, E>,
    {
        let key = match call.key(scope) {
            Ok(key) => key,
            Err(e) => {
                tracing::warn!("Running {} uncached: {}", call.operation(), e);
                return compute();
            }
        };

        if mode == CacheMode::Reuse {
            if let Some(stored) = self.store.get(&key) {
                match serde_json::from_value(stored) {
                    Ok(value) => {
                        tracing::debug!("Cache hit for {} ({})", call.operation(), key);
                        return Ok(value);
                    }
                    Err(e) => {
                        tracing::debug!("Discarding unreadable entry {}: {}", key, e);
                    }
                }
            }
        }

        tracing::debug!("Computing {} ({:?})", call.operation(), mode);
        let value = compute()?;
        match serde_json::to_value(&value) {
            Ok(encoded) => self.store.set(&key, encoded),
            Err(e) => tracing::warn!("Not caching {}: {}", call.operation(), e),
        }
        Ok(value)
    }

    pub fn clear(&self) -> usize {
        let removed = self.store.clear();
        tracing::info!("Cleared {} cache entries", removed);
        removed
    }

    pub fn len(&self) -> usize {
        self.store.len()
    }

    pub fn is_empty(&self) -> bool {
        self.store.is_empty()
    }

    pub fn flush(&self) -> Result<(), CacheError> {
        self.store.flush()
    }
}

#[cfg(test)]
mod tests {
    use std::cell::Cell;
    use std::collections::BTreeMap;

    use rust_decimal::Decimal;
    use rust_decimal_macros::dec;
    use uuid::Uuid;

    use super::key::test_support::scope;
    use super::*;
    use crate::calendar::DateWindow;
    use crate::calendar::test_support::date;
    use crate::model::Subject;

    fn call() -> CachedCall {
        CachedCall::CurrentFte {
            subject: Subject::WorkItem(Uuid::nil()),
            window: DateWindow::new(date(2016, 1, 4), date(2016, 1, 8)),
        }
    }

    fn ok(value: Decimal) -> impl FnOnce() -> Result<Decimal, CacheError> {
        move || Ok(value)
    }

    #[test]
    fn test_reuse_returns_stored_value() {
        let memo = Memoizer::in_memory();
        let runs = Cell::new(0);
        let compute = || {
            runs.set(runs.get() + 1);
            Ok::<Decimal, CacheError>(dec!(1.5))
        };

        let first = memo.get_or_compute(&call(), &scope(), CacheMode::Reuse, compute);
        let second = memo.get_or_compute(&call(), &scope(), CacheMode::Reuse, compute);
        assert_eq!(first.unwrap(), dec!(1.5));
        assert_eq!(second.unwrap(), dec!(1.5));
        assert_eq!(runs.get(), 1);
        assert_eq!(memo.len(), 1);
    }

    #[test]
    fn test_regenerate_overwrites() {
        let memo = Memoizer::in_memory();
        memo.get_or_compute(&call(), &scope(), CacheMode::Reuse, ok(dec!(1)))
            .unwrap();

        let fresh = memo
            .get_or_compute(&call(), &scope(), CacheMode::Regenerate, ok(dec!(2)))
            .unwrap();
        assert_eq!(fresh, dec!(2));

        let reused = memo
            .get_or_compute(&call(), &scope(), CacheMode::Reuse, ok(dec!(3)))
            .unwrap();
        assert_eq!(reused, dec!(2));
    }

    #[test]
    fn test_scope_separates_entries() {
        let memo = Memoizer::in_memory();
        memo.get_or_compute(&call(), &scope(), CacheMode::Reuse, ok(dec!(1)))
            .unwrap();

        let later = KeyScope {
            today: date(2017, 2, 1),
            ..scope()
        };
        let value = memo
            .get_or_compute(&call(), &later, CacheMode::Reuse, ok(dec!(2)))
            .unwrap();
        assert_eq!(value, dec!(2));
        assert_eq!(memo.len(), 2);
    }

    #[test]
    fn test_errors_are_not_cached() {
        let memo = Memoizer::in_memory();
        let failed: Result<Decimal, &str> =
            memo.get_or_compute(&call(), &scope(), CacheMode::Reuse, || Err("boom"));
        assert_eq!(failed, Err("boom"));
        assert!(memo.is_empty());
    }

    #[test]
    fn test_unencodable_value_is_returned_uncached() {
        // JSON object keys must be strings
        let memo = Memoizer::in_memory();
        let value: BTreeMap<(u8, u8), u8> = BTreeMap::from([((1, 2), 3)]);
        let runs = Cell::new(0);
        let compute = || {
            runs.set(runs.get() + 1);
            Ok::<_, CacheError>(value.clone())
        };

        let first = memo.get_or_compute(&call(), &scope(), CacheMode::Reuse, compute);
        let second = memo.get_or_compute(&call(), &scope(), CacheMode::Reuse, compute);
        assert_eq!(first.unwrap(), value);
        assert_eq!(second.unwrap(), value);
        assert_eq!(runs.get(), 2);
        assert!(memo.is_empty());
    }

    struct Unkeyable;

    impl CacheRequest for Unkeyable {
        fn operation(&self) -> &'static str {
            "unkeyable"
        }

        fn key(&self, _scope: &KeyScope) -> Result<CacheKey, CacheError> {
            Err(CacheError::KeyDerivation {
                reason: "no canonical form".to_string(),
            })
        }
    }

    #[test]
    fn test_key_failure_runs_uncached() {
        let memo = Memoizer::in_memory();
        let runs = Cell::new(0);
        let compute = || {
            runs.set(runs.get() + 1);
            Ok::<Decimal, CacheError>(dec!(7))
        };

        let first = memo.get_or_compute(&Unkeyable, &scope(), CacheMode::Reuse, compute);
        let second = memo.get_or_compute(&Unkeyable, &scope(), CacheMode::Reuse, compute);
        assert_eq!(first.unwrap(), dec!(7));
        assert_eq!(second.unwrap(), dec!(7));
        assert_eq!(runs.get(), 2);
        assert!(memo.is_empty());
    }

    #[test]
    fn test_unreadable_entry_is_a_miss() {
        let memo = Memoizer::in_memory();
        let key = CachedCall::key(&call(), &scope());
        memo.store().set(&key, serde_json::json!("not a number"));

        let value = memo
            .get_or_compute(&call(), &scope(), CacheMode::Reuse, ok(dec!(4)))
            .unwrap();
        assert_eq!(value, dec!(4));
    }

    #[test]
    fn test_clear() {
        let memo = Memoizer::in_memory();
        memo.get_or_compute(&call(), &scope(), CacheMode::Reuse, ok(dec!(1)))
            .unwrap();
        assert_eq!(memo.clear(), 1);
        assert!(memo.is_empty());
    }
}
