//! Read-mostly snapshot caches for compiled tags and struct shapes.

use arc_swap::ArcSwap;
use std::borrow::Borrow;
use std::collections::HashMap;
use std::hash::Hash;
use std::sync::{Arc, Mutex, PoisonError};

/// Immutable map snapshot behind an atomic pointer.
///
/// Readers never lock. Writers serialize on `lock`, recheck, and publish a
/// fresh copy of the map, so a reader sees either the old or the new snapshot
/// and never a half-built entry.
pub(crate) struct SnapshotCache<K, V> {
    map: ArcSwap<HashMap<K, Arc<V>>>,
    lock: Mutex<()>,
}

impl<K, V> SnapshotCache<K, V>
where
    K: Eq + Hash + Clone,
{
    pub(crate) fn new() -> Self {
        Self {
            map: ArcSwap::from_pointee(HashMap::new()),
            lock: Mutex::new(()),
        }
    }

    pub(crate) fn get<Q>(&self, key: &Q) -> Option<Arc<V>>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.map.load().get(key).cloned()
    }

    /// Return the cached entry or compile, publish and return it.
    ///
    /// At most one compilation runs per key. Failed compilations are not
    /// cached.
    pub(crate) fn get_or_try_insert_with<Q, E, F>(&self, key: &Q, compile: F) -> Result<Arc<V>, E>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ToOwned<Owned = K> + ?Sized,
        F: FnOnce() -> Result<V, E>,
    {
        if let Some(hit) = self.get(key) {
            return Ok(hit);
        }

        let _guard = self.lock.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(hit) = self.get(key) {
            return Ok(hit);
        }

        let value = Arc::new(compile()?);
        let mut next = HashMap::clone(&self.map.load_full());
        next.insert(key.to_owned(), Arc::clone(&value));
        self.map.store(Arc::new(next));
        Ok(value)
    }

    pub(crate) fn clear(&self) {
        let _guard = self.lock.lock().unwrap_or_else(PoisonError::into_inner);
        self.map.store(Arc::new(HashMap::new()));
    }

    pub(crate) fn len(&self) -> usize {
        self.map.load().len()
    }
}

impl<K, V> Default for SnapshotCache<K, V>
where
    K: Eq + Hash + Clone,
{
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn test_compiles_once_per_key() {
        let cache: SnapshotCache<String, usize> = SnapshotCache::new();
        let calls = AtomicUsize::new(0);

        for _ in 0..3 {
            let v = cache
                .get_or_try_insert_with::<_, (), _>("trim", || {
                    calls.fetch_add(1, Ordering::SeqCst);
                    Ok(7)
                })
                .unwrap();
            assert_eq!(*v, 7);
        }
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_failures_are_not_cached() {
        let cache: SnapshotCache<String, usize> = SnapshotCache::new();
        assert!(cache.get_or_try_insert_with("x", || Err("nope")).is_err());
        assert!(cache.get("x").is_none());
        assert_eq!(*cache.get_or_try_insert_with::<_, &str, _>("x", || Ok(1)).unwrap(), 1);
    }

    #[test]
    fn test_concurrent_first_use() {
        let cache: SnapshotCache<String, usize> = SnapshotCache::new();
        let calls = AtomicUsize::new(0);

        std::thread::scope(|s| {
            for _ in 0..8 {
                s.spawn(|| {
                    cache
                        .get_or_try_insert_with::<_, (), _>("k", || {
                            calls.fetch_add(1, Ordering::SeqCst);
                            Ok(1)
                        })
                        .unwrap();
                });
            }
        });
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_clear() {
        let cache: SnapshotCache<String, usize> = SnapshotCache::new();
        cache.get_or_try_insert_with::<_, (), _>("k", || Ok(1)).unwrap();
        cache.clear();
        assert_eq!(cache.len(), 0);
    }
}
