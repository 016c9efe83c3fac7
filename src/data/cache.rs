use std::collections::{HashMap, VecDeque};
use std::hash::Hash;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard, OnceLock, PoisonError};

use super::error::DataLoadError;
use super::loader::{load_file, LoaderConfig};
use super::model::EmissionsTable;

// ---------------------------------------------------------------------------
// Memo – argument-keyed cache of immutable results
// ---------------------------------------------------------------------------

struct Entries<K, V> {
    map: HashMap<K, Arc<V>>,
    /// Keys in insertion order, oldest first.
    order: VecDeque<K>,
}

/// Memoises a pure computation on its argument tuple.
///
/// Values are handed out as `Arc`s, so every caller asking for the same key
/// gets the same object while it is cached.  The computation runs outside
/// the lock; if two callers race on a miss, the first insert wins and the
/// other result is dropped.
///
/// A bounded memo evicts its oldest entry once `capacity` is reached.
pub struct Memo<K, V> {
    label: &'static str,
    capacity: Option<usize>,
    entries: Mutex<Entries<K, V>>,
}

impl<K: Eq + Hash + Clone + std::fmt::Debug, V> Memo<K, V> {
    pub fn new(label: &'static str) -> Self {
        Memo {
            label,
            capacity: None,
            entries: Mutex::new(Entries {
                map: HashMap::new(),
                order: VecDeque::new(),
            }),
        }
    }

    /// A memo holding at most `capacity` entries (at least one).
    pub fn with_capacity(label: &'static str, capacity: usize) -> Self {
        Memo {
            capacity: Some(capacity.max(1)),
            ..Memo::new(label)
        }
    }

    fn entries(&self) -> MutexGuard<'_, Entries<K, V>> {
        // Entries are immutable once inserted, so a poisoned map is still valid.
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn lookup(&self, key: &K) -> Option<Arc<V>> {
        let hit = self.entries().map.get(key).cloned();
        if hit.is_some() {
            log::debug!("{} cache hit for {key:?}", self.label);
        }
        hit
    }

    fn publish(&self, key: K, value: V) -> Arc<V> {
        let mut entries = self.entries();
        if let Some(winner) = entries.map.get(&key) {
            return winner.clone();
        }
        log::debug!("{} cache miss for {key:?}", self.label);

        if let Some(capacity) = self.capacity {
            while entries.map.len() >= capacity {
                let Some(oldest) = entries.order.pop_front() else {
                    break;
                };
                log::debug!("{} cache evicting {oldest:?}", self.label);
                entries.map.remove(&oldest);
            }
        }
        let value = Arc::new(value);
        entries.order.push_back(key.clone());
        entries.map.insert(key, value.clone());
        value
    }

    /// Return the cached value for `key`, computing it on first use.
    pub fn get_or_compute(&self, key: K, compute: impl FnOnce(&K) -> V) -> Arc<V> {
        if let Some(hit) = self.lookup(&key) {
            return hit;
        }
        let value = compute(&key);
        self.publish(key, value)
    }

    /// Like [`get_or_compute`](Self::get_or_compute), but errors are
    /// returned to the caller and never cached.
    pub fn try_get_or_compute<E>(
        &self,
        key: K,
        compute: impl FnOnce(&K) -> Result<V, E>,
    ) -> Result<Arc<V>, E> {
        if let Some(hit) = self.lookup(&key) {
            return Ok(hit);
        }
        let value = compute(&key)?;
        Ok(self.publish(key, value))
    }

    /// Number of cached entries.
    pub fn len(&self) -> usize {
        self.entries().map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

// ---------------------------------------------------------------------------
// DatasetCache – one loaded table per (path, cleaning policy)
// ---------------------------------------------------------------------------

/// Process-wide cache of loaded tables.
pub struct DatasetCache {
    tables: Memo<(PathBuf, LoaderConfig), EmissionsTable>,
}

impl Default for DatasetCache {
    fn default() -> Self {
        DatasetCache {
            tables: Memo::new("dataset"),
        }
    }
}

impl DatasetCache {
    /// The instance shared by the whole process.
    pub fn global() -> &'static DatasetCache {
        static GLOBAL: OnceLock<DatasetCache> = OnceLock::new();
        GLOBAL.get_or_init(DatasetCache::default)
    }

    /// Load `path` once; later calls return the same table.
    pub fn load(
        &self,
        path: &Path,
        config: &LoaderConfig,
    ) -> Result<Arc<EmissionsTable>, DataLoadError> {
        let key_path = std::fs::canonicalize(path).unwrap_or_else(|_| path.to_path_buf());
        self.tables
            .try_get_or_compute((key_path, config.clone()), |(p, cfg)| load_file(p, cfg))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;
    use std::sync::Barrier;
    use std::thread;
    use tempfile::tempdir;

    #[test]
    fn memo_computes_once_and_shares_result() {
        let memo: Memo<(String, i32), Vec<i32>> = Memo::new("test");
        let calls = Cell::new(0);

        let compute = |key: &(String, i32)| {
            calls.set(calls.get() + 1);
            vec![key.1; 3]
        };
        let a = memo.get_or_compute(("x".into(), 7), compute);
        let b = memo.get_or_compute(("x".into(), 7), compute);
        let c = memo.get_or_compute(("y".into(), 7), compute);

        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(*c, vec![7, 7, 7]);
        assert_eq!(calls.get(), 2);
        assert_eq!(memo.len(), 2);
    }

    #[test]
    fn memo_does_not_cache_errors() {
        let memo: Memo<u8, u8> = Memo::new("test");

        let err: Result<_, &str> = memo.try_get_or_compute(1, |_| Err("boom"));
        assert!(err.is_err());
        assert!(memo.is_empty());

        let ok: Result<_, &str> = memo.try_get_or_compute(1, |k| Ok(k + 1));
        assert_eq!(*ok.unwrap(), 2);
    }

    #[test]
    fn racing_misses_share_the_first_insert() {
        let memo: Memo<u8, String> = Memo::new("test");
        let barrier = Barrier::new(2);

        let (a, b) = thread::scope(|s| {
            // Both threads are past the lookup before either publishes.
            let left = s.spawn(|| {
                memo.get_or_compute(1, |_| {
                    barrier.wait();
                    "left".to_string()
                })
            });
            let right = s.spawn(|| {
                memo.get_or_compute(1, |_| {
                    barrier.wait();
                    "right".to_string()
                })
            });
            (left.join().unwrap(), right.join().unwrap())
        });

        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(memo.len(), 1);
    }

    #[test]
    fn bounded_memo_evicts_oldest() {
        let memo: Memo<u8, u8> = Memo::with_capacity("test", 2);
        let calls = Cell::new(0);
        let compute = |k: &u8| {
            calls.set(calls.get() + 1);
            *k
        };

        let first = memo.get_or_compute(1, compute);
        memo.get_or_compute(2, compute);
        memo.get_or_compute(3, compute);
        assert_eq!(memo.len(), 2);
        assert_eq!(calls.get(), 3);

        // 3 is still cached, 1 was evicted and is recomputed.
        memo.get_or_compute(3, compute);
        assert_eq!(calls.get(), 3);
        let again = memo.get_or_compute(1, compute);
        assert_eq!(calls.get(), 4);
        assert!(!Arc::ptr_eq(&first, &again));
        assert_eq!(memo.len(), 2);
    }

    #[test]
    fn dataset_cache_returns_same_table() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("data.csv");
        std::fs::write(
            &path,
            "Country,Year,Total,Coal,Oil,Gas,Cement,Flaring,Other\nChile,2005,1,1,1,1,1,1,1\n",
        )
        .unwrap();

        let cache = DatasetCache::default();
        let config = LoaderConfig::default();
        let first = cache.load(&path, &config).unwrap();
        let second = cache.load(&path, &config).unwrap();
        assert!(Arc::ptr_eq(&first, &second));

        // A different policy is a different key.
        let other = cache.load(&path, &config.clone().with_cutoff_year(2010)).unwrap();
        assert!(other.is_empty());
    }

    #[test]
    fn dataset_cache_reports_missing_file() {
        let dir = tempdir().unwrap();
        let result = DatasetCache::default().load(&dir.path().join("absent.csv"), &LoaderConfig::default());
        assert!(matches!(result, Err(DataLoadError::Open { .. })));
    }
}
