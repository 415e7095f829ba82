#![doc = include_str!("../README.md")]
//!
//! ---
//!
//! # Code Reference
//!
//! Quick examples and pointers for each component.
//!
//! ## Which storage type should I use?
//!
//! ```text
//! ┌───────────────────────────────────────────────────────────────────┐
//! │  Single thread, full control       ──▶  LruEngine                 │
//! │  Multiple threads, one hot set     ──▶  SafeLru                   │
//! │  Multiple threads, wide key space  ──▶  StripedLru                │
//! └───────────────────────────────────────────────────────────────────┘
//! ```
//!
//! | Type | Locking | Recency order | Eviction scope |
//! |------|---------|---------------|----------------|
//! | [`LruEngine`] | none (`&mut self`) | global | whole cache |
//! | [`SafeLru`] | one mutex | global | whole cache |
//! | [`StripedLru`] | one mutex per stripe | per stripe | per stripe |
//!
//! ## Byte-budgeted LRU
//!
//! ```rust
//! use bytecache::LruEngine;
//! use bytecache::config::LruConfig;
//!
//! let mut cache = LruEngine::new(LruConfig::new(10));
//! cache.put(b"a", b"1");       // charge = 2 bytes
//! cache.put(b"bb", b"22");     // charge = 4 bytes
//! cache.put(b"ccc", b"333");   // needs 6: "a" is evicted
//! assert_eq!(cache.get(b"a"), None);
//! assert_eq!(cache.current_size(), 10);
//! ```
//!
//! ## Striped storage behind the trait
//!
//! ```rust
//! use bytecache::{Storage, StripedLru};
//! use bytecache::config::StripedLruConfig;
//! use std::sync::Arc;
//!
//! let cache: Arc<dyn Storage> =
//!     Arc::new(StripedLru::new(StripedLruConfig::new(4096, 4)).unwrap());
//! cache.put(b"key", b"value");
//! assert_eq!(cache.get(b"key"), Some(b"value".to_vec()));
//! ```
//!
//! ## Elastic thread pool
//!
//! ```rust
//! use bytecache::ThreadPool;
//! use bytecache::config::PoolConfig;
//! use std::time::Duration;
//!
//! let pool = ThreadPool::new(PoolConfig::new(2, 4, 64, Duration::from_millis(50))).unwrap();
//! pool.start();
//! assert!(pool.execute(|| println!("ran on a worker")));
//! pool.stop(true); // returns once every accepted task has finished
//! ```
//!
//! ## Cooperative routines
//!
//! ```rust
//! use bytecache::coroutine::{Scheduler, Step};
//!
//! let mut scheduler = Scheduler::new();
//! let mut remaining = 3;
//! scheduler.start(move |_scope| {
//!     if remaining > 0 {
//!         remaining -= 1;
//!         Step::Yield
//!     } else {
//!         Step::Done
//!     }
//! });
//! ```
//!
//! ## Modules
//!
//! - [`lru`]: the single-threaded byte-budgeted LRU engine
//! - [`storage`]: the [`Storage`] trait and the mutex-wrapped [`SafeLru`]
//! - [`striped`]: the lock-per-stripe [`StripedLru`]
//! - [`pool`]: the elastic [`ThreadPool`]
//! - [`coroutine`]: the cooperative routine [`Scheduler`](coroutine::Scheduler)
//! - [`config`]: configuration structs for all of the above
//! - [`metrics`]: counters and the [`CacheMetrics`] reporting trait

/// Cache entry type shared by the engine and its wrappers.
pub mod entry;

/// Doubly linked recency list used by the LRU engine.
///
/// Internal infrastructure: it deals in raw node pointers whose validity
/// the engine maintains. Use the cache types instead.
pub(crate) mod list;

/// Configuration structures and construction-time validation.
pub mod config;

/// Byte-budgeted Least Recently Used cache engine.
pub mod lru;

/// The storage interface and the single-engine thread-safe wrapper.
pub mod storage;

/// Striped (lock-per-stripe) cache.
pub mod striped;

/// Elastic thread pool with low/high watermarks and idle-timeout shrink.
pub mod pool;

/// Cooperative single-threaded routine scheduler.
pub mod coroutine;

/// Cache metrics counters and reporting.
pub mod metrics;

pub use entry::CacheEntry;
pub use lru::LruEngine;
pub use metrics::CacheMetrics;
pub use pool::{PoolState, ThreadPool};
pub use storage::{SafeLru, Storage};
pub use striped::StripedLru;
