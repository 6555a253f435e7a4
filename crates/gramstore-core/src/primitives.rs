//! # Innate Primitives
//!
//! Fixed constants for the gramstore engine.
//!
//! These values define the persisted layout. Changing any of the key tags or
//! widths makes existing databases unreadable.

/// Width in bytes of an encoded `TokenId` (big-endian `u32`).
pub const ID_WIDTH: usize = 4;

/// Width in bytes of an encoded count value (big-endian `u64`).
pub const COUNT_WIDTH: usize = 8;

/// Orders tracked when the caller does not choose any: trigrams, bigrams,
/// unigrams, highest first.
pub const DEFAULT_ORDERS: [u8; 3] = [3, 2, 1];

/// Pending count entries allowed to accumulate before an autosave flush.
pub const DEFAULT_SAVE_THRESHOLD: usize = 300_000;

/// Entries fetched per read transaction by paged range scans.
pub const SCAN_PAGE_SIZE: usize = 256;

// =============================================================================
// KEY TAGS
// =============================================================================

/// Key of the metadata record holding the tracked orders.
pub const ORDERS_KEY: &[u8] = b"m/orders";

/// Prefix of token records: `t/` + id.
pub const TOKEN_TAG: &[u8] = b"t/";

/// Prefix of count records: `c/` + order + ids.
pub const COUNT_TAG: &[u8] = b"c/";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_orders_descending() {
        assert!(DEFAULT_ORDERS.windows(2).all(|w| w[0] > w[1]));
    }

    #[test]
    fn key_tags_do_not_overlap() {
        assert!(!TOKEN_TAG.starts_with(COUNT_TAG));
        assert!(!COUNT_TAG.starts_with(TOKEN_TAG));
        assert!(!ORDERS_KEY.starts_with(TOKEN_TAG));
        assert!(!ORDERS_KEY.starts_with(COUNT_TAG));
    }
}
