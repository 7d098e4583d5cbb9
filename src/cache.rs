//! # Memo cache
//!
//! Keyed memoization for pure pipeline steps.
//!
//! [`MemoCache`] holds ephemeral entries for the lifetime of the owning
//! context. Values are shared as `Arc<V>`, so every hit for a key returns the
//! same object. Lookup and insert each take a short mutex; a miss computes
//! outside the lock, so two racing misses may both compute and the first
//! insert wins.
//!
//! [`PersistentCell`] is a run-once latch for one-time setup actions.

use once_cell::sync::OnceCell;
use std::collections::HashMap;
use std::future::Future;
use std::hash::Hash;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tracing::trace;

#[derive(Debug)]
pub struct MemoCache<K, V> {
    name: &'static str,
    entries: Mutex<HashMap<K, Arc<V>>>,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl<K: Eq + Hash, V> MemoCache<K, V> {
    /// `name` only labels trace output.
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            entries: Mutex::new(HashMap::new()),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
        }
    }

    pub fn get(&self, key: &K) -> Option<Arc<V>> {
        let hit = self.lock().get(key).cloned();
        let counter = if hit.is_some() { &self.hits } else { &self.misses };
        counter.fetch_add(1, Ordering::Relaxed);
        hit
    }

    /// Stores `value` unless `key` is already present, and returns the
    /// value held for `key` afterwards.
    pub fn insert(&self, key: K, value: V) -> Arc<V> {
        self.lock()
            .entry(key)
            .or_insert_with(|| Arc::new(value))
            .clone()
    }

    /// Returns the cached value for `key`, computing it with `f` on a miss.
    pub fn get_or_insert_with(&self, key: K, f: impl FnOnce() -> V) -> Arc<V> {
        if let Some(hit) = self.get(&key) {
            return hit;
        }
        trace!(cache = self.name, "Memo miss");
        self.insert(key, f())
    }

    /// Fallible [`get_or_insert_with`](Self::get_or_insert_with). Errors are
    /// not cached.
    pub fn get_or_try_insert_with<E>(
        &self,
        key: K,
        f: impl FnOnce() -> Result<V, E>,
    ) -> Result<Arc<V>, E> {
        if let Some(hit) = self.get(&key) {
            return Ok(hit);
        }
        trace!(cache = self.name, "Memo miss");
        Ok(self.insert(key, f()?))
    }

    /// Async fallible variant. The lock is never held across the await.
    pub async fn get_or_try_insert_async<E, F, Fut>(&self, key: K, f: F) -> Result<Arc<V>, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<V, E>>,
    {
        if let Some(hit) = self.get(&key) {
            return Ok(hit);
        }
        trace!(cache = self.name, "Memo miss");
        let value = f().await?;
        Ok(self.insert(key, value))
    }

    pub fn contains(&self, key: &K) -> bool {
        self.lock().contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// `(hits, misses)` observed by lookups so far.
    pub fn stats(&self) -> (u64, u64) {
        (
            self.hits.load(Ordering::Relaxed),
            self.misses.load(Ordering::Relaxed),
        )
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<K, Arc<V>>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Value computed at most once per process, however often it is requested.
#[derive(Debug)]
pub struct PersistentCell<T> {
    cell: OnceCell<T>,
}

impl<T> PersistentCell<T> {
    pub const fn new() -> Self {
        Self {
            cell: OnceCell::new(),
        }
    }

    /// Runs `f` on the first call only; every call returns the stored value.
    pub fn get_or_init(&self, f: impl FnOnce() -> T) -> &T {
        self.cell.get_or_init(f)
    }

    /// Fallible variant. A failed attempt leaves the cell empty.
    pub fn get_or_try_init<E>(&self, f: impl FnOnce() -> Result<T, E>) -> Result<&T, E> {
        self.cell.get_or_try_init(f)
    }

    pub fn get(&self) -> Option<&T> {
        self.cell.get()
    }

    pub fn is_initialized(&self) -> bool {
        self.cell.get().is_some()
    }
}

impl<T> Default for PersistentCell<T> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    #[test]
    fn test_identical_keys_share_one_result() {
        let cache: MemoCache<(String, u32), Vec<u32>> = MemoCache::new("test");
        let calls = Cell::new(0);
        let compute = || {
            calls.set(calls.get() + 1);
            vec![1, 2, 3]
        };

        let a = cache.get_or_insert_with(("tabby".into(), 1), compute);
        let b = cache.get_or_insert_with(("tabby".into(), 1), compute);

        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(calls.get(), 1);
        assert_eq!(cache.stats(), (1, 1));
    }

    #[test]
    fn test_distinct_keys_never_collide() {
        let cache: MemoCache<(String, u32), String> = MemoCache::new("test");
        let a = cache.get_or_insert_with(("tabby".into(), 1), || "a".into());
        let b = cache.get_or_insert_with(("tabby".into(), 2), || "b".into());
        let c = cache.get_or_insert_with(("shadow".into(), 1), || "c".into());

        assert_eq!((a.as_str(), b.as_str(), c.as_str()), ("a", "b", "c"));
        assert_eq!(cache.len(), 3);
    }

    #[test]
    fn test_errors_are_not_cached() {
        let cache: MemoCache<u8, u8> = MemoCache::new("test");
        let err: Result<_, &str> = cache.get_or_try_insert_with(1, || Err("boom"));
        assert!(err.is_err());
        assert!(!cache.contains(&1));

        let ok: Result<_, &str> = cache.get_or_try_insert_with(1, || Ok(7));
        assert_eq!(*ok.unwrap(), 7);
    }

    #[test]
    fn test_first_insert_wins() {
        let cache: MemoCache<u8, u8> = MemoCache::new("test");
        let first = cache.insert(1, 10);
        let second = cache.insert(1, 20);
        assert_eq!(*second, 10);
        assert!(Arc::ptr_eq(&first, &second));
    }

    #[tokio::test]
    async fn test_async_memo_runs_once() {
        let cache: MemoCache<&'static str, usize> = MemoCache::new("test");
        let calls = AtomicU64::new(0);

        for _ in 0..3 {
            let v = cache
                .get_or_try_insert_async("k", || async {
                    calls.fetch_add(1, Ordering::SeqCst);
                    Ok::<_, ()>(42)
                })
                .await
                .unwrap();
            assert_eq!(*v, 42);
        }
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_persistent_cell_runs_once() {
        static CELL: PersistentCell<u32> = PersistentCell::new();
        static CALLS: AtomicU64 = AtomicU64::new(0);

        for _ in 0..5 {
            let v = CELL.get_or_init(|| {
                CALLS.fetch_add(1, Ordering::SeqCst);
                9
            });
            assert_eq!(*v, 9);
        }
        assert_eq!(CALLS.load(Ordering::SeqCst), 1);
        assert!(CELL.is_initialized());
    }

    #[test]
    fn test_persistent_cell_retries_after_failure() {
        let cell: PersistentCell<u32> = PersistentCell::new();
        assert!(cell.get_or_try_init(|| Err::<u32, _>("no")).is_err());
        assert!(!cell.is_initialized());
        assert_eq!(*cell.get_or_try_init(|| Ok::<_, &str>(3)).unwrap(), 3);
        assert_eq!(cell.get(), Some(&3));
    }
}
