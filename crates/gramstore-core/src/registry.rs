//! # Token Registry
//!
//! Bidirectional mapping between tokens and dense `TokenId`s.
//!
//! New tokens are assigned the next sequential id and queued in a pending
//! log until the model flushes them to the store together with the counts
//! that reference them.

use crate::codec::token_key;
use crate::kv::KvPair;
use crate::{GramError, TokenId};
use std::collections::BTreeMap;

/// Token ↔ id mapping owned by a single model.
#[derive(Debug, Clone, Default)]
pub struct TokenRegistry {
    /// token -> id.
    ids: BTreeMap<String, TokenId>,
    /// id -> token; position `i` holds the token of `TokenId(i)`.
    tokens: Vec<String>,
    /// Ids registered since the last successful flush, in assignment order.
    pending: Vec<TokenId>,
}

impl TokenRegistry {
    /// Create an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuild a registry from persisted `(id, token)` records.
    ///
    /// Records must arrive in ascending id order and cover `0..n` without
    /// gaps or repeated tokens; anything else means the store is corrupt.
    /// The rebuilt registry has an empty pending log.
    pub fn from_records(
        records: impl IntoIterator<Item = Result<(TokenId, String), GramError>>,
    ) -> Result<Self, GramError> {
        let mut registry = Self::new();
        for record in records {
            let (id, token) = record?;
            if id.index() != registry.tokens.len() {
                return Err(GramError::CorruptRecord(format!(
                    "token record {} out of sequence (expected #{})",
                    id,
                    registry.tokens.len()
                )));
            }
            if registry.ids.insert(token.clone(), id).is_some() {
                return Err(GramError::CorruptRecord(format!(
                    "token {:?} registered twice",
                    token
                )));
            }
            registry.tokens.push(token);
        }
        Ok(registry)
    }

    /// Return the id of `token`, registering it first if it is new.
    ///
    /// Only touches in-memory state; the new pair becomes durable on the
    /// next flush.
    pub fn get_id(&mut self, token: &str) -> Result<TokenId, GramError> {
        if let Some(&id) = self.ids.get(token) {
            return Ok(id);
        }

        let id = self.next_id()?;
        self.ids.insert(token.to_string(), id);
        self.tokens.push(token.to_string());
        self.pending.push(id);
        Ok(id)
    }

    /// Return the id of `token` without registering it.
    #[must_use]
    pub fn lookup_id(&self, token: &str) -> Option<TokenId> {
        self.ids.get(token).copied()
    }

    /// Resolve every token of `tokens` without registering any.
    ///
    /// Returns `None` as soon as one token is unknown.
    #[must_use]
    pub fn lookup_ids<T: AsRef<str>>(&self, tokens: &[T]) -> Option<Vec<TokenId>> {
        tokens.iter().map(|t| self.lookup_id(t.as_ref())).collect()
    }

    /// Return the token assigned to `id`.
    pub fn get_token(&self, id: TokenId) -> Result<&str, GramError> {
        self.tokens
            .get(id.index())
            .map(String::as_str)
            .ok_or(GramError::UnknownTokenId(id))
    }

    /// Number of registered tokens.
    #[must_use]
    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    /// Whether no token has been registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }

    /// Number of tokens registered since the last flush.
    #[must_use]
    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }

    /// Iterate over `(id, token)` pairs in id order.
    pub fn iter(&self) -> impl Iterator<Item = (TokenId, &str)> {
        self.tokens
            .iter()
            .enumerate()
            .map(|(i, token)| (TokenId(i as u32), token.as_str()))
    }

    /// Store records for every pending token.
    #[must_use]
    pub fn pending_records(&self) -> Vec<KvPair> {
        self.pending
            .iter()
            .filter_map(|&id| {
                let token = self.tokens.get(id.index())?;
                Some((token_key(id), token.as_bytes().to_vec()))
            })
            .collect()
    }

    /// Forget the pending log after its records were committed.
    pub fn mark_persisted(&mut self) {
        self.pending.clear();
    }

    fn next_id(&self) -> Result<TokenId, GramError> {
        let next = u32::try_from(self.tokens.len()).map_err(|_| GramError::VocabularyFull)?;
        // u32::MAX itself stays unassigned so `len()` always fits in a u32.
        if next == u32::MAX {
            return Err(GramError::VocabularyFull);
        }
        Ok(TokenId(next))
    }
}
