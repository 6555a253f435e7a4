//! # Key-Value Store Contract
//!
//! The ordered byte-string store the engine is built on.
//!
//! This module defines the `KvStore` trait and `MemoryStore`, a volatile
//! `BTreeMap` implementation. The durable backend lives in
//! [`crate::storage::RedbStore`].

use crate::GramError;
use std::collections::BTreeMap;
use std::ops::Bound;

/// An owned key/value pair read from or written to a store.
pub type KvPair = (Vec<u8>, Vec<u8>);

/// Lazy ascending scan over a key range.
///
/// The scan is single-pass; re-issue `range_scan` to iterate again.
pub type RangeScan<'a> = Box<dyn Iterator<Item = Result<KvPair, GramError>> + 'a>;

// =============================================================================
// KVSTORE TRAIT
// =============================================================================

/// Minimal ordered store interface the model depends on.
///
/// Keys are compared bytewise. All fallible operations return
/// `Result<T, GramError>` so volatile and persistent backends behave
/// uniformly.
pub trait KvStore {
    /// Read the value stored under `key`.
    fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>, GramError>;

    /// Store `value` under `key`, replacing any previous value.
    fn put(&mut self, key: &[u8], value: &[u8]) -> Result<(), GramError>;

    /// Store every pair atomically: either all pairs become visible or none.
    fn batch_put(&mut self, batch: &[KvPair]) -> Result<(), GramError>;

    /// Iterate `[low, high)` in ascending key order. `None` for `high` scans
    /// to the end of the keyspace.
    fn range_scan(&self, low: &[u8], high: Option<&[u8]>) -> Result<RangeScan<'_>, GramError>;
}

// =============================================================================
// IN-MEMORY STORE
// =============================================================================

/// Volatile store backed by a `BTreeMap`.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    entries: BTreeMap<Vec<u8>, Vec<u8>>,
}

impl MemoryStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored keys.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the store holds no keys.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl KvStore for MemoryStore {
    fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>, GramError> {
        Ok(self.entries.get(key).cloned())
    }

    fn put(&mut self, key: &[u8], value: &[u8]) -> Result<(), GramError> {
        self.entries.insert(key.to_vec(), value.to_vec());
        Ok(())
    }

    fn batch_put(&mut self, batch: &[KvPair]) -> Result<(), GramError> {
        for (key, value) in batch {
            self.entries.insert(key.clone(), value.clone());
        }
        Ok(())
    }

    fn range_scan(&self, low: &[u8], high: Option<&[u8]>) -> Result<RangeScan<'_>, GramError> {
        if high.is_some_and(|high| high <= low) {
            return Ok(Box::new(std::iter::empty()));
        }

        let upper = high.map_or(Bound::Unbounded, |h| Bound::Excluded(h.to_vec()));
        let range = self
            .entries
            .range::<Vec<u8>, _>((Bound::Included(low.to_vec()), upper))
            .map(|(k, v)| Ok((k.clone(), v.clone())));
        Ok(Box::new(range))
    }
}

// =============================================================================
// TESTS
// =============================================================================
