//! Pool lifecycle and pool + cache composition.
//!
//! These tests drive the elastic pool the way the server does: cache
//! operations submitted as tasks, bursts that grow the pool to its ceiling,
//! and shutdown ordering. Timings use generous margins so the assertions
//! hold on slow CI machines.

use bytecache::config::{PoolConfig, StripedLruConfig};
use bytecache::{PoolState, Storage, StripedLru, ThreadPool};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .try_init();
}

fn make_pool(low: usize, high: usize, queue: usize, idle_ms: u64) -> ThreadPool {
    ThreadPool::new(PoolConfig::new(
        low,
        high,
        queue,
        Duration::from_millis(idle_ms),
    ))
    .unwrap()
}

// ============================================================================
// POOL LIFECYCLE
// ============================================================================

#[test]
fn test_accepted_equals_executed_with_awaited_stop() {
    init_tracing();
    let pool = make_pool(2, 4, 8, 50);
    pool.start();

    let executed = Arc::new(AtomicUsize::new(0));
    let mut accepted = 0;

    for _ in 0..200 {
        let executed = Arc::clone(&executed);
        if pool.execute(move || {
            executed.fetch_add(1, Ordering::SeqCst);
        }) {
            accepted += 1;
        }
    }

    pool.stop(true);
    // Some submissions may have bounced off the bounded queue, but every
    // accepted one ran before stop(true) returned.
    assert_eq!(executed.load(Ordering::SeqCst), accepted);
    assert!(accepted >= 1);
    assert_eq!(pool.workers(), 0);
    assert_eq!(pool.busy_workers(), 0);
}

#[test]
fn test_stop_blocks_on_running_task_then_refuses_work() {
    init_tracing();
    let pool = make_pool(2, 4, 4, 50);
    pool.start();

    assert!(pool.execute(|| std::thread::sleep(Duration::from_millis(100))));

    let before = Instant::now();
    pool.stop(true);
    assert!(before.elapsed() >= Duration::from_millis(80));

    assert_eq!(pool.state(), PoolState::Stopped);
    assert!(!pool.execute(|| {}));
}

#[test]
fn test_burst_grows_to_ceiling_then_shrinks_to_floor() {
    init_tracing();
    let pool = make_pool(2, 4, 16, 50);
    pool.start();

    // Each parked task pins one worker; pacing lets every submission see
    // all current workers busy, which is the elastic-spawn trigger.
    let gate = Arc::new(std::sync::Barrier::new(5));
    for _ in 0..4 {
        let gate = Arc::clone(&gate);
        assert!(pool.execute(move || {
            gate.wait();
        }));
        std::thread::sleep(Duration::from_millis(20));
    }
    assert_eq!(pool.workers(), 4);

    gate.wait();

    // Elastic workers die after the idle interval; the floor remains.
    std::thread::sleep(Duration::from_millis(400));
    assert_eq!(pool.workers(), 2);

    pool.stop(true);
}

// ============================================================================
// POOL + CACHE COMPOSITION
// ============================================================================

#[test]
fn test_tasks_write_through_shared_storage() {
    init_tracing();
    let cache: Arc<dyn Storage> =
        Arc::new(StripedLru::new(StripedLruConfig::new(64 * 1024, 8)).unwrap());
    let pool = make_pool(2, 8, 256, 100);
    pool.start();

    let mut accepted = Vec::new();
    for i in 0..128u32 {
        let cache = Arc::clone(&cache);
        let key = format!("task-key-{i}").into_bytes();
        let value = format!("task-value-{i}").into_bytes();
        if pool.execute({
            let key = key.clone();
            move || {
                assert!(cache.put(&key, &value));
            }
        }) {
            accepted.push(i);
        }
    }

    pool.stop(true);

    // Every accepted write is visible after the awaited stop.
    for i in accepted {
        let key = format!("task-key-{i}").into_bytes();
        let value = format!("task-value-{i}").into_bytes();
        assert_eq!(cache.get(&key), Some(value));
    }
}

#[test]
fn test_mixed_cache_traffic_from_pool_keeps_budget() {
    init_tracing();
    let cache = Arc::new(StripedLru::new(StripedLruConfig::new(2_000, 4)).unwrap());
    let pool = make_pool(4, 8, 512, 100);
    pool.start();

    for i in 0..400u32 {
        let cache = Arc::clone(&cache);
        pool.execute(move || {
            let key = format!("k{}", i % 40).into_bytes();
            match i % 4 {
                0 => {
                    cache.put(&key, b"some-payload");
                }
                1 => {
                    let _ = cache.get(&key);
                }
                2 => {
                    cache.put_if_absent(&key, b"other");
                }
                _ => {
                    cache.delete(&key);
                }
            }
        });
    }

    pool.stop(true);
    assert!(cache.current_size() <= cache.max_size());
    assert_eq!(pool.queued_tasks(), 0);
}
