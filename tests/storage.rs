//! End-to-end storage semantics.
//!
//! Exercises the `Storage` trait surface through both implementations with
//! small, deterministic budgets, asserting exactly which entry survives
//! each eviction. The same battery runs against `SafeLru` and `StripedLru`
//! (single-stripe, so eviction order is predictable) to pin down that the
//! two fronts agree.

use bytecache::config::{LruConfig, StripedLruConfig};
use bytecache::{SafeLru, Storage, StripedLru};
use std::sync::Arc;
use std::thread;

fn make_safe(max_size: usize) -> Arc<dyn Storage> {
    Arc::new(SafeLru::new(LruConfig::new(max_size)))
}

fn make_striped_single(max_size: usize) -> Arc<dyn Storage> {
    Arc::new(StripedLru::new(StripedLruConfig::new(max_size, 1)).unwrap())
}

/// Both fronts with a 10-byte budget.
fn ten_byte_caches() -> Vec<Arc<dyn Storage>> {
    vec![make_safe(10), make_striped_single(10)]
}

// ============================================================================
// BYTE-BUDGET EVICTION
// ============================================================================

#[test]
fn test_eviction_drops_coldest_entry() {
    for cache in ten_byte_caches() {
        assert!(cache.put(b"a", b"1")); // 2 bytes
        assert!(cache.put(b"bb", b"22")); // 6 bytes total
        assert!(cache.put(b"ccc", b"333")); // 12 would exceed: "a" goes

        assert_eq!(cache.get(b"a"), None);
        assert_eq!(cache.get(b"bb"), Some(b"22".to_vec()));
        assert_eq!(cache.get(b"ccc"), Some(b"333".to_vec()));
    }
}

#[test]
fn test_get_protects_entry_from_eviction() {
    for cache in ten_byte_caches() {
        assert!(cache.put(b"a", b"1"));
        assert!(cache.put(b"bb", b"22"));

        // Heat "a"; the next tight insertion must claim "bb" instead.
        assert_eq!(cache.get(b"a"), Some(b"1".to_vec()));
        assert!(cache.put(b"dddd", b"4444"));

        assert_eq!(cache.get(b"bb"), None);
        assert_eq!(cache.get(b"a"), Some(b"1".to_vec()));
    }
}

#[test]
fn test_oversize_entry_rejected_and_state_unchanged() {
    for cache in ten_byte_caches() {
        assert!(cache.put(b"keep", b"me"));

        assert!(!cache.put(b"bigkey", b"bigvalue")); // 14 bytes > 10
        assert!(!cache.put_if_absent(b"bigkey", b"bigvalue"));

        assert_eq!(cache.get(b"bigkey"), None);
        assert_eq!(cache.get(b"keep"), Some(b"me".to_vec()));
    }
}

#[test]
fn test_exact_budget_insertion_clears_everything_else() {
    for cache in ten_byte_caches() {
        assert!(cache.put(b"a", b"1"));
        assert!(cache.put(b"b", b"2"));

        // A 10-byte entry consumes the whole budget.
        assert!(cache.put(b"12345", b"67890"));
        assert_eq!(cache.get(b"a"), None);
        assert_eq!(cache.get(b"b"), None);
        assert_eq!(cache.get(b"12345"), Some(b"67890".to_vec()));
    }
}

// ============================================================================
// OPERATION CONTRACTS
// ============================================================================

#[test]
fn test_update_in_place_with_growth() {
    for cache in [make_safe(6), make_striped_single(6)] {
        assert!(cache.put(b"k", b"vv"));
        assert!(cache.put(b"k", b"vvvv"));

        // 8 bytes exceeds the budget of 6: rejected, value untouched.
        assert!(!cache.put(b"k", b"vvvvvvv"));
        assert_eq!(cache.get(b"k"), Some(b"vvvv".to_vec()));
    }
}

#[test]
fn test_put_if_absent_keeps_first_value() {
    for cache in ten_byte_caches() {
        assert!(cache.put(b"k", b"v1"));
        assert!(!cache.put_if_absent(b"k", b"v2"));
        assert_eq!(cache.get(b"k"), Some(b"v1".to_vec()));
    }
}

#[test]
fn test_set_only_updates_existing() {
    for cache in ten_byte_caches() {
        assert!(!cache.set(b"k", b"v"));
        assert_eq!(cache.get(b"k"), None);

        assert!(cache.put(b"k", b"v"));
        assert!(cache.set(b"k", b"w"));
        assert_eq!(cache.get(b"k"), Some(b"w".to_vec()));
    }
}

#[test]
fn test_delete_then_delete() {
    for cache in ten_byte_caches() {
        assert!(cache.put(b"k", b"v"));
        assert!(cache.delete(b"k"));
        assert_eq!(cache.get(b"k"), None);
        assert!(!cache.delete(b"k"));
    }
}

#[test]
fn test_roundtrip_without_eviction() {
    for cache in [make_safe(1024), make_striped_single(1024)] {
        for i in 0..20u32 {
            let key = format!("key-{i}").into_bytes();
            let value = format!("value-{i}").into_bytes();
            assert!(cache.put(&key, &value));
        }
        for i in 0..20u32 {
            let key = format!("key-{i}").into_bytes();
            let value = format!("value-{i}").into_bytes();
            assert_eq!(cache.get(&key), Some(value));
        }
    }
}

// ============================================================================
// STRIPED PARALLELISM
// ============================================================================

#[test]
fn test_parallel_writers_on_distinct_keys_both_succeed() {
    let cache = Arc::new(StripedLru::new(StripedLruConfig::new(40, 4)).unwrap());

    let handles: Vec<_> = [b"x".as_slice(), b"y".as_slice()]
        .into_iter()
        .map(|key| {
            let cache = Arc::clone(&cache);
            thread::spawn(move || {
                for i in 0..1000u32 {
                    let value = [b'0' + (i % 10) as u8];
                    assert!(cache.put(key, &value));
                    assert_eq!(cache.get(key), Some(value.to_vec()));
                }
            })
        })
        .collect();

    for handle in handles {
        handle.join().unwrap();
    }

    assert_eq!(cache.len(), 2);
}

#[test]
fn test_striped_budget_is_per_stripe() {
    // 40 bytes over 4 stripes leaves 10 per stripe; an 11-byte entry is
    // unstorable regardless of which stripe it routes to.
    let cache = StripedLru::new(StripedLruConfig::new(40, 4)).unwrap();
    assert!(!cache.put(b"0123456789", b"x"));
    assert!(cache.put(b"012345678", b"x"));
}
