//! The storage interface and the single-engine thread-safe wrapper.
//!
//! [`Storage`] is the five-operation surface the rest of the server talks
//! to: byte-string keys and values, boolean results for the mutating
//! operations, `Option` for lookup. Both [`SafeLru`] (one engine behind a
//! mutex) and [`StripedLru`](crate::StripedLru) (hash-routed stripes of
//! `SafeLru`) implement it, so callers can swap one for the other behind
//! `Arc<dyn Storage>`.

use crate::config::LruConfig;
use crate::lru::LruEngine;
use crate::metrics::{CacheMetrics, CoreCacheMetrics};

use std::collections::BTreeMap;
use std::fmt;

use parking_lot::Mutex;

/// Key/value storage over uninterpreted byte strings.
///
/// Failure is part of the result, never a panic:
///
/// - the `put` family returns `false` when one entry would exceed the byte
///   budget (and `put_if_absent` / `set` additionally on the wrong presence
///   state)
/// - `delete` reports whether a removal occurred
/// - `get` returns `None` for an unknown key
///
/// All methods take `&self`; implementations synchronize internally so a
/// storage can be shared through `Arc` across worker threads.
pub trait Storage: Send + Sync {
    /// Stores `value` under `key`, inserting or overwriting.
    fn put(&self, key: &[u8], value: &[u8]) -> bool;

    /// Stores `value` under `key` only when the key is absent.
    fn put_if_absent(&self, key: &[u8], value: &[u8]) -> bool;

    /// Overwrites the value of an existing key.
    fn set(&self, key: &[u8], value: &[u8]) -> bool;

    /// Removes the entry for `key`; reports whether one existed.
    fn delete(&self, key: &[u8]) -> bool;

    /// Returns a copy of the value stored under `key`, marking the entry as
    /// most recently used.
    fn get(&self, key: &[u8]) -> Option<Vec<u8>>;
}

/// A single [`LruEngine`] behind a mutex.
///
/// This is the smallest thread-safe storage: every operation locks the one
/// engine for its whole body, so all of the engine's single-threaded
/// invariants hold and operations on the same key are linearizable. It is
/// also the building block of [`StripedLru`](crate::StripedLru), which
/// keeps one `SafeLru` per stripe.
pub struct SafeLru {
    engine: Mutex<LruEngine>,
}

impl SafeLru {
    /// Creates a thread-safe cache with the configured byte budget.
    pub fn new(config: LruConfig) -> Self {
        SafeLru {
            engine: Mutex::new(LruEngine::new(config)),
        }
    }

    /// Returns the byte budget.
    pub fn max_size(&self) -> usize {
        self.engine.lock().max_size()
    }

    /// Returns the bytes currently stored.
    pub fn current_size(&self) -> usize {
        self.engine.lock().current_size()
    }

    /// Returns the number of live entries.
    pub fn len(&self) -> usize {
        self.engine.lock().len()
    }

    /// Returns `true` if the cache holds no entries.
    pub fn is_empty(&self) -> bool {
        self.engine.lock().is_empty()
    }

    /// Removes all entries.
    pub fn clear(&self) {
        self.engine.lock().clear();
    }

    /// Takes a snapshot of the engine's counters.
    pub fn metrics_snapshot(&self) -> CoreCacheMetrics {
        self.engine.lock().metrics().clone()
    }
}

impl Storage for SafeLru {
    fn put(&self, key: &[u8], value: &[u8]) -> bool {
        self.engine.lock().put(key, value)
    }

    fn put_if_absent(&self, key: &[u8], value: &[u8]) -> bool {
        self.engine.lock().put_if_absent(key, value)
    }

    fn set(&self, key: &[u8], value: &[u8]) -> bool {
        self.engine.lock().set(key, value)
    }

    fn delete(&self, key: &[u8]) -> bool {
        self.engine.lock().delete(key)
    }

    fn get(&self, key: &[u8]) -> Option<Vec<u8>> {
        self.engine.lock().get(key).map(<[u8]>::to_vec)
    }
}

impl CacheMetrics for SafeLru {
    fn metrics(&self) -> BTreeMap<String, f64> {
        self.engine.lock().metrics().to_btreemap()
    }

    fn algorithm_name(&self) -> &'static str {
        "SafeLRU"
    }
}

impl fmt::Debug for SafeLru {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let engine = self.engine.lock();
        f.debug_struct("SafeLru")
            .field("max_size", &engine.max_size())
            .field("current_size", &engine.current_size())
            .field("len", &engine.len())
            .finish()
    }
}
