//! Striped (lock-per-stripe) cache.
//!
//! `StripedLru` partitions the key space across N independent LRU engines
//! so threads touching different stripes never contend.
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────────┐
//! │                        StripedLru                                │
//! │                                                                  │
//! │  hash(key) % N  ──▶  stripe selection                            │
//! │                                                                  │
//! │  ┌────────────┐ ┌────────────┐     ┌────────────┐                │
//! │  │  Stripe 0  │ │  Stripe 1  │ ... │ Stripe N-1 │                │
//! │  │ ┌────────┐ │ │ ┌────────┐ │     │ ┌────────┐ │                │
//! │  │ │ Mutex  │ │ │ │ Mutex  │ │     │ │ Mutex  │ │                │
//! │  │ └───┬────┘ │ │ └───┬────┘ │     │ └───┬────┘ │                │
//! │  │ ┌───▼────┐ │ │ ┌───▼────┐ │     │ ┌───▼────┐ │                │
//! │  │ │ Engine │ │ │ │ Engine │ │     │ │ Engine │ │                │
//! │  │ └────────┘ │ │ └────────┘ │     │ └────────┘ │                │
//! │  └────────────┘ └────────────┘     └────────────┘                │
//! └──────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Routing uses one hash builder created at construction and never
//! replaced, so a key maps to the same stripe for the lifetime of the
//! cache. The total byte budget is divided equally: each stripe gets
//! `total / N` bytes.
//!
//! # Trade-offs
//!
//! - Operations on different stripes run fully in parallel.
//! - Recency and eviction are **per-stripe**: a stripe under pressure
//!   evicts its own coldest entry even when another stripe holds colder
//!   ones.
//! - There is no cross-stripe atomicity and no global iteration; only
//!   operations on the same key are linearizable with respect to each
//!   other.
//!
//! # Example
//!
//! ```
//! use bytecache::{Storage, StripedLru};
//! use bytecache::config::StripedLruConfig;
//! use std::sync::Arc;
//! use std::thread;
//!
//! let cache = Arc::new(StripedLru::new(StripedLruConfig::new(4096, 4)).unwrap());
//!
//! let handles: Vec<_> = (0..4)
//!     .map(|t| {
//!         let cache = Arc::clone(&cache);
//!         thread::spawn(move || {
//!             for i in 0..100 {
//!                 let key = format!("key-{}-{}", t, i);
//!                 cache.put(key.as_bytes(), b"value");
//!             }
//!         })
//!     })
//!     .collect();
//!
//! for handle in handles {
//!     handle.join().unwrap();
//! }
//! assert!(cache.len() > 0);
//! ```

use crate::config::{ConfigError, LruConfig, StripedLruConfig};
use crate::metrics::CacheMetrics;
use crate::storage::{SafeLru, Storage};

use std::collections::BTreeMap;
use std::fmt;
use std::hash::BuildHasher;

use hashbrown::DefaultHashBuilder;

/// A thread-safe cache fanning out over hash-routed stripes.
///
/// Each stripe is a [`SafeLru`] with `total / N` bytes of budget; a stable
/// hash of the key picks the stripe that handles the entire operation under
/// its own lock.
pub struct StripedLru {
    stripes: Box<[SafeLru]>,
    hash_builder: DefaultHashBuilder,
}

impl StripedLru {
    /// Creates a striped cache from the configuration.
    ///
    /// Fails when the stripe count is zero or when dividing the budget
    /// leaves a stripe with nothing.
    pub fn new(config: StripedLruConfig) -> Result<Self, ConfigError> {
        let per_stripe = config.per_stripe_size()?;

        let stripes: Vec<SafeLru> = (0..config.stripes)
            .map(|_| SafeLru::new(LruConfig::new(per_stripe)))
            .collect();

        Ok(StripedLru {
            stripes: stripes.into_boxed_slice(),
            hash_builder: DefaultHashBuilder::default(),
        })
    }

    /// Returns the stripe that owns `key`.
    #[inline]
    fn stripe_for(&self, key: &[u8]) -> &SafeLru {
        let index = (self.hash_builder.hash_one(key) as usize) % self.stripes.len();
        &self.stripes[index]
    }

    /// Returns the number of stripes.
    pub fn stripe_count(&self) -> usize {
        self.stripes.len()
    }

    /// Returns the summed byte budget of all stripes.
    ///
    /// Because of the integer division at construction this can be slightly
    /// less than the configured total.
    pub fn max_size(&self) -> usize {
        self.stripes.iter().map(SafeLru::max_size).sum()
    }

    /// Returns the bytes currently stored across all stripes.
    ///
    /// Stripe locks are taken one after another, so under concurrent write
    /// traffic the sum is a point-in-time approximation.
    pub fn current_size(&self) -> usize {
        self.stripes.iter().map(SafeLru::current_size).sum()
    }

    /// Returns the number of live entries across all stripes.
    pub fn len(&self) -> usize {
        self.stripes.iter().map(SafeLru::len).sum()
    }

    /// Returns `true` when every stripe is empty.
    pub fn is_empty(&self) -> bool {
        self.stripes.iter().all(SafeLru::is_empty)
    }

    /// Removes all entries from all stripes, one stripe at a time.
    pub fn clear(&self) {
        for stripe in self.stripes.iter() {
            stripe.clear();
        }
    }
}

impl Storage for StripedLru {
    fn put(&self, key: &[u8], value: &[u8]) -> bool {
        self.stripe_for(key).put(key, value)
    }

    fn put_if_absent(&self, key: &[u8], value: &[u8]) -> bool {
        self.stripe_for(key).put_if_absent(key, value)
    }

    fn set(&self, key: &[u8], value: &[u8]) -> bool {
        self.stripe_for(key).set(key, value)
    }

    fn delete(&self, key: &[u8]) -> bool {
        self.stripe_for(key).delete(key)
    }

    fn get(&self, key: &[u8]) -> Option<Vec<u8>> {
        self.stripe_for(key).get(key)
    }
}

impl CacheMetrics for StripedLru {
    fn metrics(&self) -> BTreeMap<String, f64> {
        // Sum every counter over the stripes. Rates are summed too and are
        // therefore meaningless in the aggregate; consumers wanting rates
        // should derive them from the summed counters.
        let mut aggregated = BTreeMap::new();
        for stripe in self.stripes.iter() {
            for (key, value) in stripe.metrics() {
                *aggregated.entry(key).or_insert(0.0) += value;
            }
        }
        aggregated
    }

    fn algorithm_name(&self) -> &'static str {
        "StripedLRU"
    }
}

impl fmt::Debug for StripedLru {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StripedLru")
            .field("stripes", &self.stripes.len())
            .field("len", &self.len())
            .finish()
    }
}
