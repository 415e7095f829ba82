//! Cache Metrics
//!
//! Counter-based metrics for the cache engine, reported through a BTreeMap
//! so the output order is deterministic.
//!
//! # Why BTreeMap over HashMap?
//!
//! - **Deterministic ordering**: metrics always appear in consistent order
//! - **Reproducible output**: essential for tests and log comparisons
//! - **Stable serialization**: exports have predictable key ordering
//!
//! The performance difference (O(log n) vs O(1)) is irrelevant at ~10 metric
//! keys, and the deterministic behaviour is worth far more.

use std::collections::BTreeMap;

/// Counters tracked by every cache engine.
///
/// All sizes are in bytes of cached content, i.e. key length plus value
/// length, matching the engine's budget accounting.
#[derive(Debug, Default, Clone)]
pub struct CoreCacheMetrics {
    /// Total number of lookups made against the cache
    pub requests: u64,

    /// Number of lookups that found their key
    pub cache_hits: u64,

    /// Total bytes served from the cache (hits only)
    pub bytes_served_from_cache: u64,

    /// Total bytes written into the cache (inserts and updates)
    pub bytes_written_to_cache: u64,

    /// Number of entries pushed out to make room for others
    pub evictions: u64,

    /// Current bytes of content stored in the cache
    pub cache_size_bytes: u64,

    /// The cache's byte budget
    pub max_cache_size_bytes: u64,
}

impl CoreCacheMetrics {
    /// Creates counters for a cache with the given byte budget.
    pub fn new(max_cache_size_bytes: u64) -> Self {
        Self {
            max_cache_size_bytes,
            ..Default::default()
        }
    }

    /// Records a lookup that found its key.
    pub fn record_hit(&mut self, object_size: u64) {
        self.requests += 1;
        self.cache_hits += 1;
        self.bytes_served_from_cache += object_size;
    }

    /// Records a lookup that missed.
    ///
    /// Misses are reported as `requests - cache_hits`.
    pub fn record_miss(&mut self) {
        self.requests += 1;
    }

    /// Records a new entry being written.
    pub fn record_insertion(&mut self, object_size: u64) {
        self.cache_size_bytes += object_size;
        self.bytes_written_to_cache += object_size;
    }

    /// Records an entry leaving the cache under budget pressure or deletion.
    pub fn record_eviction(&mut self, evicted_size: u64) {
        self.evictions += 1;
        self.cache_size_bytes = self.cache_size_bytes.saturating_sub(evicted_size);
    }

    /// Records an in-place value overwrite changing an entry's size.
    pub fn record_size_change(&mut self, old_size: u64, new_size: u64) {
        self.cache_size_bytes = self.cache_size_bytes - old_size + new_size;
        self.bytes_written_to_cache += new_size;
    }

    /// Hit rate in [0.0, 1.0]; 0.0 before any request.
    pub fn hit_rate(&self) -> f64 {
        if self.requests > 0 {
            self.cache_hits as f64 / self.requests as f64
        } else {
            0.0
        }
    }

    /// How full the cache is relative to its budget, in [0.0, 1.0].
    pub fn cache_utilization(&self) -> f64 {
        if self.max_cache_size_bytes > 0 {
            self.cache_size_bytes as f64 / self.max_cache_size_bytes as f64
        } else {
            0.0
        }
    }

    /// Converts the counters to a BTreeMap for reporting.
    pub fn to_btreemap(&self) -> BTreeMap<String, f64> {
        let mut metrics = BTreeMap::new();

        metrics.insert("requests".to_string(), self.requests as f64);
        metrics.insert("cache_hits".to_string(), self.cache_hits as f64);
        metrics.insert(
            "cache_misses".to_string(),
            (self.requests - self.cache_hits) as f64,
        );
        metrics.insert("evictions".to_string(), self.evictions as f64);

        metrics.insert("hit_rate".to_string(), self.hit_rate());

        metrics.insert(
            "bytes_served_from_cache".to_string(),
            self.bytes_served_from_cache as f64,
        );
        metrics.insert(
            "bytes_written_to_cache".to_string(),
            self.bytes_written_to_cache as f64,
        );

        metrics.insert("cache_size_bytes".to_string(), self.cache_size_bytes as f64);
        metrics.insert(
            "max_cache_size_bytes".to_string(),
            self.max_cache_size_bytes as f64,
        );
        metrics.insert("cache_utilization".to_string(), self.cache_utilization());

        metrics
    }
}

/// Uniform metrics-reporting interface implemented by every cache front-end.
///
/// Uses BTreeMap to guarantee deterministic ordering of the reported keys.
pub trait CacheMetrics {
    /// Returns all metrics as key-value pairs in deterministic order.
    fn metrics(&self) -> BTreeMap<String, f64>;

    /// A static name identifying the implementation (e.g. "LRU",
    /// "StripedLRU").
    fn algorithm_name(&self) -> &'static str;
}
