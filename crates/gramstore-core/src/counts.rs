//! # Count Store
//!
//! Merge-on-write n-gram counters over a `KvStore`.
//!
//! Increments accumulate in an in-memory pending log keyed by the encoded
//! count key. Reads combine the durable value with the pending delta. A flush
//! turns every delta into an absolute count and commits it, together with any
//! extra records the caller supplies, as one atomic batch.

use crate::codec::{context_prefix, decode_count, encode_count, ngram_key, prefix_bounds};
use crate::kv::{KvPair, KvStore, RangeScan};
use crate::{GramError, TokenId};
use std::collections::BTreeMap;
use std::ops::Bound;

/// N-gram counters with a pending (not yet durable) delta log.
#[derive(Debug)]
pub struct CountStore<S> {
    store: S,
    /// Encoded count key -> accumulated delta since the last flush.
    pending: BTreeMap<Vec<u8>, u64>,
}

impl<S: KvStore> CountStore<S> {
    /// Wrap a store with an empty pending log.
    pub fn new(store: S) -> Self {
        Self {
            store,
            pending: BTreeMap::new(),
        }
    }

    /// Add `delta` to the pending count of an n-gram. The store is not touched.
    pub fn increment(&mut self, order: u8, ids: &[TokenId], delta: u64) {
        let entry = self.pending.entry(ngram_key(order, ids)).or_insert(0);
        *entry = entry.saturating_add(delta);
    }

    /// Durable count plus pending delta. Unseen n-grams count 0.
    pub fn get(&self, order: u8, ids: &[TokenId]) -> Result<u64, GramError> {
        let key = ngram_key(order, ids);
        let pending = self.pending.get(&key).copied().unwrap_or(0);
        Ok(self.durable_count(&key)?.saturating_add(pending))
    }

    /// Commit every pending delta plus `extra` records in one batch.
    ///
    /// On failure the pending log is left exactly as it was, so the flush can
    /// be retried. Returns the number of count records written.
    pub fn flush(&mut self, extra: Vec<KvPair>) -> Result<usize, GramError> {
        if self.pending.is_empty() && extra.is_empty() {
            return Ok(0);
        }

        let mut batch = Vec::with_capacity(self.pending.len() + extra.len());
        for (key, delta) in &self.pending {
            let total = self.durable_count(key)?.saturating_add(*delta);
            batch.push((key.clone(), encode_count(total).to_vec()));
        }
        let written = batch.len();
        batch.extend(extra);

        self.store.batch_put(&batch)?;
        self.pending.clear();
        Ok(written)
    }

    /// Lazily scan every durable record whose key starts with `prefix`.
    ///
    /// With `skip_prefix` the returned keys have `prefix` removed. Pending
    /// deltas are not visible here; use `get` or `followers` for that.
    pub fn enumerate_prefix(
        &self,
        prefix: &[u8],
        skip_prefix: bool,
    ) -> Result<PrefixItems<'_>, GramError> {
        let (low, high) = prefix_bounds(prefix);
        let scan = self.store.range_scan(&low, high.as_deref())?;
        Ok(PrefixItems {
            scan,
            strip: if skip_prefix { prefix.len() } else { 0 },
        })
    }

    /// Key-only variant of `enumerate_prefix`.
    pub fn enumerate_prefix_keys(
        &self,
        prefix: &[u8],
        skip_prefix: bool,
    ) -> Result<PrefixKeys<'_>, GramError> {
        Ok(PrefixKeys {
            items: self.enumerate_prefix(prefix, skip_prefix)?,
        })
    }

    /// Every token observed after `context` in n-grams of `order`, with its
    /// count, ascending by id. Includes pending deltas.
    pub fn followers(
        &self,
        order: u8,
        context: &[TokenId],
    ) -> Result<Vec<(TokenId, u64)>, GramError> {
        let prefix = context_prefix(order, context);
        let mut merged: BTreeMap<TokenId, u64> = BTreeMap::new();

        for entry in self.enumerate_prefix(&prefix, true)? {
            let (suffix, value) = entry?;
            let id = follower_id(&suffix)?;
            merged.insert(id, decode_count(&value)?);
        }

        let (low, high) = prefix_bounds(&prefix);
        let upper = high.map_or(Bound::Unbounded, Bound::Excluded);
        for (key, delta) in self.pending.range((Bound::Included(low), upper)) {
            let id = follower_id(&key[prefix.len()..])?;
            let count = merged.entry(id).or_insert(0);
            *count = count.saturating_add(*delta);
        }

        Ok(merged.into_iter().collect())
    }

    /// Number of distinct n-grams with a pending delta.
    #[must_use]
    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }

    /// The underlying store.
    pub fn store(&self) -> &S {
        &self.store
    }

    /// Mutable access to the underlying store.
    pub fn store_mut(&mut self) -> &mut S {
        &mut self.store
    }

    fn durable_count(&self, key: &[u8]) -> Result<u64, GramError> {
        match self.store.get(key)? {
            Some(value) => decode_count(&value),
            None => Ok(0),
        }
    }
}

fn follower_id(suffix: &[u8]) -> Result<TokenId, GramError> {
    TokenId::from_bytes(suffix).ok_or_else(|| {
        GramError::CorruptRecord(format!("follower suffix of {} bytes", suffix.len()))
    })
}

// =============================================================================
// PREFIX ITERATORS
// =============================================================================

/// Lazy `(key, value)` scan over one key prefix.
pub struct PrefixItems<'a> {
    scan: RangeScan<'a>,
    /// Leading bytes removed from every key.
    strip: usize,
}

impl std::fmt::Debug for PrefixItems<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PrefixItems")
            .field("strip", &self.strip)
            .finish_non_exhaustive()
    }
}

impl Iterator for PrefixItems<'_> {
    type Item = Result<KvPair, GramError>;

    fn next(&mut self) -> Option<Self::Item> {
        let strip = self.strip;
        self.scan.next().map(|entry| {
            entry.map(|(mut key, value)| {
                key.drain(..strip.min(key.len()));
                (key, value)
            })
        })
    }
}

/// Lazy key-only scan over one key prefix.
#[derive(Debug)]
pub struct PrefixKeys<'a> {
    items: PrefixItems<'a>,
}

impl Iterator for PrefixKeys<'_> {
    type Item = Result<Vec<u8>, GramError>;

    fn next(&mut self) -> Option<Self::Item> {
        self.items.next().map(|entry| entry.map(|(key, _)| key))
    }
}
