//! # Key Codec
//!
//! Pure functions mapping n-grams, tokens and counts to store keys and values.
//!
//! ## Key Layout
//!
//! ```text
//! m/orders                      -> postcard Vec<u8>
//! t/ <id:4>                     -> UTF-8 token
//! c/ <order:1> <id:4> ... <id:4> -> count (u64, big-endian)
//! ```
//!
//! Keys sort by tag, then by order, then by the id sequence in the order
//! given. All n-grams of one order that begin with a given context therefore
//! occupy one contiguous byte range, which `prefix_bounds` computes.

use crate::primitives::{COUNT_TAG, COUNT_WIDTH, ID_WIDTH, TOKEN_TAG};
use crate::{GramError, TokenId};

// =============================================================================
// N-GRAM KEYS
// =============================================================================

/// Encode the count key for an n-gram of `order` made of `ids`.
#[must_use]
pub fn ngram_key(order: u8, ids: &[TokenId]) -> Vec<u8> {
    let mut key = Vec::with_capacity(COUNT_TAG.len() + 1 + ids.len() * ID_WIDTH);
    key.extend_from_slice(COUNT_TAG);
    key.push(order);
    for id in ids {
        key.extend_from_slice(&id.to_bytes());
    }
    key
}

/// Encode the scan prefix shared by every n-gram of `order` starting with
/// `context`.
///
/// `context` is expected to be shorter than `order`; the result is the
/// leading part of every matching `ngram_key`.
#[must_use]
pub fn context_prefix(order: u8, context: &[TokenId]) -> Vec<u8> {
    ngram_key(order, context)
}

/// Decode a count key back into its order and id sequence.
pub fn decode_ngram_key(key: &[u8]) -> Result<(u8, Vec<TokenId>), GramError> {
    let rest = key
        .strip_prefix(COUNT_TAG)
        .ok_or_else(|| GramError::CorruptRecord("count key without count tag".to_string()))?;
    let (&order, ids) = rest
        .split_first()
        .ok_or_else(|| GramError::CorruptRecord("count key without order".to_string()))?;

    if ids.len() != order as usize * ID_WIDTH {
        return Err(GramError::CorruptRecord(format!(
            "count key of order {} has {} id bytes",
            order,
            ids.len()
        )));
    }

    let ids = decode_ids(ids)?;
    Ok((order, ids))
}

/// Decode a run of concatenated fixed-width ids.
pub fn decode_ids(bytes: &[u8]) -> Result<Vec<TokenId>, GramError> {
    if bytes.len() % ID_WIDTH != 0 {
        return Err(GramError::CorruptRecord(format!(
            "id run of {} bytes is not a multiple of {}",
            bytes.len(),
            ID_WIDTH
        )));
    }
    Ok(bytes
        .chunks_exact(ID_WIDTH)
        .filter_map(TokenId::from_bytes)
        .collect())
}

// =============================================================================
// PREFIX BOUNDS
// =============================================================================

/// Compute the half-open range `[low, high)` holding exactly the keys that
/// start with `prefix`.
///
/// `high` is `None` when no finite upper bound exists (empty prefix, or a
/// prefix made only of `0xFF` bytes); the scan then runs to the top of the
/// keyspace.
#[must_use]
pub fn prefix_bounds(prefix: &[u8]) -> (Vec<u8>, Option<Vec<u8>>) {
    let low = prefix.to_vec();

    let mut high = prefix.to_vec();
    while let Some(last) = high.pop() {
        if last < u8::MAX {
            high.push(last + 1);
            return (low, Some(high));
        }
    }

    (low, None)
}

// =============================================================================
// TOKEN RECORDS
// =============================================================================

/// Key of the token record for `id`.
#[must_use]
pub fn token_key(id: TokenId) -> Vec<u8> {
    let mut key = Vec::with_capacity(TOKEN_TAG.len() + ID_WIDTH);
    key.extend_from_slice(TOKEN_TAG);
    key.extend_from_slice(&id.to_bytes());
    key
}

/// Decode the id held in a token record key.
pub fn decode_token_key(key: &[u8]) -> Result<TokenId, GramError> {
    key.strip_prefix(TOKEN_TAG)
        .and_then(TokenId::from_bytes)
        .ok_or_else(|| GramError::CorruptRecord(format!("malformed token key {:?}", key)))
}

/// Decode the token text stored in a token record value.
pub fn decode_token(value: &[u8]) -> Result<String, GramError> {
    String::from_utf8(value.to_vec()).map_err(|e| GramError::Deserialization(e.to_string()))
}

// =============================================================================
// VALUES
// =============================================================================

/// Encode a count as a fixed-width big-endian value.
#[must_use]
pub const fn encode_count(count: u64) -> [u8; COUNT_WIDTH] {
    count.to_be_bytes()
}

/// Decode a count value.
pub fn decode_count(value: &[u8]) -> Result<u64, GramError> {
    let raw: [u8; COUNT_WIDTH] = value.try_into().map_err(|_| {
        GramError::CorruptRecord(format!("count value of {} bytes", value.len()))
    })?;
    Ok(u64::from_be_bytes(raw))
}

/// Encode the tracked orders for the metadata record.
pub fn encode_orders(orders: &[u8]) -> Result<Vec<u8>, GramError> {
    postcard::to_allocvec(orders).map_err(|e| GramError::Serialization(e.to_string()))
}

/// Decode the tracked orders from the metadata record.
pub fn decode_orders(value: &[u8]) -> Result<Vec<u8>, GramError> {
    postcard::from_bytes(value).map_err(|e| GramError::Deserialization(e.to_string()))
}

// =============================================================================
// TESTS
// =============================================================================
