//! Cache entry type shared by the engine and its wrappers.
//!
//! An entry is one key/value pair of uninterpreted bytes. Its *charge* —
//! key length plus value length — is the amount it counts against the
//! engine's byte budget. The key never changes after creation; the value is
//! overwritten in place by `set`-style operations.

use std::fmt;

/// One cached key/value pair.
///
/// Keys and values are raw byte strings; the cache does not interpret
/// either. The key is boxed because it is immutable for the lifetime of the
/// entry, while the value stays a `Vec<u8>` so updates can reuse its
/// allocation.
pub struct CacheEntry {
    /// The cached key. Never mutated after insertion.
    pub key: Box<[u8]>,

    /// The cached value.
    pub value: Vec<u8>,
}

impl CacheEntry {
    /// Creates an entry from borrowed key and value bytes.
    pub fn new(key: &[u8], value: &[u8]) -> Self {
        CacheEntry {
            key: key.into(),
            value: value.to_vec(),
        }
    }

    /// Bytes this entry counts against the budget: key length plus value
    /// length.
    #[inline]
    pub fn charge(&self) -> usize {
        self.key.len() + self.value.len()
    }

    /// Overwrites the value in place, reusing its allocation.
    pub fn replace_value(&mut self, value: &[u8]) {
        self.value.clear();
        self.value.extend_from_slice(value);
    }
}

impl fmt::Debug for CacheEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CacheEntry")
            .field("key_len", &self.key.len())
            .field("value_len", &self.value.len())
            .field("charge", &self.charge())
            .finish()
    }
}
