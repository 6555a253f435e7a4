//! # Core Type Definitions
//!
//! This module contains the shared types of the n-gram engine:
//! - Token identifiers (`TokenId`)
//! - Error types (`GramError`)
//!
//! ## Ordering Guarantees
//!
//! `TokenId` encodes to big-endian bytes, so the byte order of an encoded id
//! is the same as its numeric order. Every range scan in the crate relies on
//! this property.

use crate::primitives::ID_WIDTH;
use serde::{Deserialize, Serialize};
use thiserror::Error;

// =============================================================================
// TOKEN IDENTIFIERS
// =============================================================================

/// Compact identifier assigned to a token in first-seen order.
///
/// Ids are dense, start at 0, and are never reused or reassigned.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct TokenId(pub u32);

impl TokenId {
    /// The first id handed out by an empty registry.
    pub const FIRST: Self = Self(0);

    /// Fixed-width big-endian encoding used inside store keys.
    #[must_use]
    pub const fn to_bytes(self) -> [u8; ID_WIDTH] {
        self.0.to_be_bytes()
    }

    /// Decode a fixed-width id. Returns `None` unless `bytes` is exactly
    /// `ID_WIDTH` long.
    #[must_use]
    pub fn from_bytes(bytes: &[u8]) -> Option<Self> {
        let raw: [u8; ID_WIDTH] = bytes.try_into().ok()?;
        Some(Self(u32::from_be_bytes(raw)))
    }

    /// The id following this one, or `None` once the id space is exhausted.
    #[must_use]
    pub const fn next(self) -> Option<Self> {
        match self.0.checked_add(1) {
            Some(raw) => Some(Self(raw)),
            None => None,
        }
    }

    /// Position of this id in a dense id table.
    #[must_use]
    pub const fn index(self) -> usize {
        self.0 as usize
    }
}

impl std::fmt::Display for TokenId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

// =============================================================================
// ERROR TYPES
// =============================================================================

/// Errors that can occur in the n-gram engine.
///
/// - No silent failures
/// - Use `Result<T, GramError>` for fallible operations
/// - The engine never panics; every error is recoverable by the caller
#[derive(Debug, Error)]
pub enum GramError {
    /// An id was requested that the registry never assigned.
    #[error("Token id not found: {0}")]
    UnknownTokenId(TokenId),

    /// A token was required to be registered but is not.
    #[error("Token not found: {0:?}")]
    UnknownToken(String),

    /// A probability was requested for a context that was never observed.
    #[error("Probability undefined: context has zero count")]
    ZeroContext,

    /// Weighted sampling found no observed continuation for the context.
    #[error("No continuations observed for context")]
    NoContinuation,

    /// Every `TokenId` has been assigned.
    #[error("Vocabulary is full")]
    VocabularyFull,

    /// The configured n-gram orders are unusable.
    #[error("Invalid n-gram orders: {0}")]
    InvalidOrders(String),

    /// A configuration value is out of range.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// The key-value store failed (open, transaction, commit, I/O).
    #[error("Storage error: {0}")]
    Storage(String),

    /// A value could not be encoded for storage.
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// A stored value could not be decoded.
    #[error("Deserialization error: {0}")]
    Deserialization(String),

    /// A stored key or value does not follow the persisted layout.
    #[error("Corrupt record: {0}")]
    CorruptRecord(String),

    /// Reading an input file (corpus, configuration) failed.
    #[error("I/O error: {0}")]
    Io(String),
}

// =============================================================================
// TESTS
// =============================================================================
