//! # N-gram Model
//!
//! The top-level engine: training, counting, probability estimates and
//! weighted continuation sampling over a persistent count store.
//!
//! ## Write Batching
//!
//! Training only touches in-memory state. New token registrations and count
//! deltas accumulate until the pending count log reaches the save threshold,
//! then both are committed as one atomic batch (`flush`). Every query sees
//! durable and pending counts combined, so a freshly trained model answers
//! exactly as it would after a reload.

use crate::codec::{decode_orders, decode_token, decode_token_key, encode_orders, prefix_bounds};
use crate::config::{ModelConfig, normalize_orders};
use crate::counts::{CountStore, PrefixItems, PrefixKeys};
use crate::kv::KvStore;
use crate::ngrams::ngrams;
use crate::primitives::{ORDERS_KEY, TOKEN_TAG};
use crate::registry::TokenRegistry;
use crate::sampling::{UniformSource, weighted_choice};
use crate::storage::RedbStore;
use crate::{GramError, TokenId};
use std::path::Path;
use tracing::{debug, info, trace, warn};

/// A persistent n-gram language model.
pub struct Model<S: KvStore = RedbStore> {
    counts: CountStore<S>,
    tokens: TokenRegistry,
    /// Tracked orders, highest first. Fixed once the model exists.
    orders: Vec<u8>,
    save_threshold: usize,
}

impl<S: KvStore> std::fmt::Debug for Model<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Model")
            .field("orders", &self.orders)
            .field("vocabulary_size", &self.tokens.len())
            .field("pending_counts", &self.counts.pending_len())
            .field("save_threshold", &self.save_threshold)
            .finish_non_exhaustive()
    }
}

impl Model<RedbStore> {
    /// Open or create a redb-backed model with the default configuration.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, GramError> {
        Self::open_with(path, ModelConfig::default())
    }

    /// Open or create a redb-backed model.
    ///
    /// The configuration is validated before the database file is created.
    pub fn open_with(path: impl AsRef<Path>, config: ModelConfig) -> Result<Self, GramError> {
        let config = config.validate()?;
        let store = RedbStore::open(path)?;
        Self::with_store(store, config)
    }
}

impl<S: KvStore> Model<S> {
    /// Open a model over any store.
    ///
    /// A store without an orders record is initialized with the configured
    /// orders, written immediately. Otherwise the stored orders win and the
    /// full token mapping is reloaded before the model is returned.
    pub fn with_store(mut store: S, config: ModelConfig) -> Result<Self, GramError> {
        let config = config.validate()?;

        let orders = match store.get(ORDERS_KEY)? {
            Some(bytes) => {
                let stored = normalize_orders(&decode_orders(&bytes)?)?;
                if stored != config.orders {
                    warn!(
                        stored = ?stored,
                        requested = ?config.orders,
                        "existing model keeps its stored orders"
                    );
                }
                stored
            }
            None => {
                store.put(ORDERS_KEY, &encode_orders(&config.orders)?)?;
                info!(orders = ?config.orders, "initialized new model");
                config.orders
            }
        };

        let tokens = load_tokens(&store)?;
        info!(
            orders = ?orders,
            vocabulary = tokens.len(),
            "model ready"
        );

        Ok(Self {
            counts: CountStore::new(store),
            tokens,
            orders,
            save_threshold: config.save_threshold,
        })
    }

    // =========================================================================
    // ACCESSORS
    // =========================================================================

    /// Tracked orders, highest first.
    #[must_use]
    pub fn orders(&self) -> &[u8] {
        &self.orders
    }

    /// The token registry.
    #[must_use]
    pub fn tokens(&self) -> &TokenRegistry {
        &self.tokens
    }

    /// Number of registered tokens.
    #[must_use]
    pub fn vocabulary_size(&self) -> usize {
        self.tokens.len()
    }

    /// Number of distinct n-grams with counts not yet flushed.
    #[must_use]
    pub fn pending_counts(&self) -> usize {
        self.counts.pending_len()
    }

    /// Pending entries allowed before an autosave flush.
    #[must_use]
    pub fn save_threshold(&self) -> usize {
        self.save_threshold
    }

    /// Change the autosave threshold. Zero is rejected.
    pub fn set_save_threshold(&mut self, threshold: usize) -> Result<(), GramError> {
        if threshold == 0 {
            return Err(GramError::InvalidConfig(
                "save_threshold must be at least 1".to_string(),
            ));
        }
        self.save_threshold = threshold;
        Ok(())
    }

    /// The underlying store.
    pub fn store(&self) -> &S {
        self.counts.store()
    }

    /// Mutable access to the underlying store, bypassing the model.
    pub fn store_mut(&mut self) -> &mut S {
        self.counts.store_mut()
    }

    // =========================================================================
    // TRAINING
    // =========================================================================

    /// Count every n-gram of every tracked order in `tokens`, then apply the
    /// autosave policy.
    pub fn train<T: AsRef<str>>(&mut self, tokens: &[T]) -> Result<(), GramError> {
        self.train_tokens(tokens)?;
        self.autosave()?;
        Ok(())
    }

    /// Train on each sequence in turn and flush once the corpus is consumed.
    ///
    /// Intermediate autosave flushes may happen along the way. Returns the
    /// number of sequences trained.
    pub fn train_many<I, Seq, T>(&mut self, corpus: I) -> Result<usize, GramError>
    where
        I: IntoIterator<Item = Seq>,
        Seq: AsRef<[T]>,
        T: AsRef<str>,
    {
        let mut trained = 0usize;
        for sequence in corpus {
            self.train(sequence.as_ref())?;
            trained = trained.saturating_add(1);
        }
        self.flush()?;
        Ok(trained)
    }

    /// The training step without the autosave check.
    ///
    /// Tokens are registered left to right; a sequence shorter than every
    /// tracked order contributes nothing and registers nothing.
    pub fn train_tokens<T: AsRef<str>>(&mut self, tokens: &[T]) -> Result<(), GramError> {
        let shortest = self.orders.last().copied().unwrap_or(1) as usize;
        if tokens.len() < shortest {
            return Ok(());
        }

        let ids = tokens
            .iter()
            .map(|token| self.tokens.get_id(token.as_ref()))
            .collect::<Result<Vec<TokenId>, GramError>>()?;

        for &order in &self.orders {
            for window in ngrams(&ids, order as usize) {
                self.counts.increment(order, window, 1);
            }
        }
        Ok(())
    }

    /// Flush if the pending count log has reached the save threshold.
    ///
    /// Returns whether a flush happened. Afterwards the pending log never
    /// holds more than `save_threshold` entries.
    pub fn autosave(&mut self) -> Result<bool, GramError> {
        let pending = self.counts.pending_len();
        trace!(pending, threshold = self.save_threshold, "autosave check");
        if pending < self.save_threshold {
            return Ok(false);
        }
        self.flush()?;
        Ok(true)
    }

    /// Commit pending counts and new token records as one atomic batch.
    ///
    /// On failure nothing is cleared and the flush can be retried.
    pub fn flush(&mut self) -> Result<(), GramError> {
        let records = self.tokens.pending_records();
        let new_tokens = records.len();
        let written = self.counts.flush(records)?;
        self.tokens.mark_persisted();
        debug!(counts = written, new_tokens, "flushed pending state");
        Ok(())
    }

    /// Flush pending state and release the store.
    pub fn close(mut self) -> Result<(), GramError> {
        self.flush()
    }

    // =========================================================================
    // QUERIES
    // =========================================================================

    /// Number of times `ngram` was trained, durable and pending combined.
    ///
    /// Unknown tokens and empty n-grams count 0; the registry is never
    /// modified.
    pub fn ngram_count<T: AsRef<str>>(&self, ngram: &[T]) -> Result<u64, GramError> {
        let Ok(order) = u8::try_from(ngram.len()) else {
            return Ok(0);
        };
        if order == 0 {
            return Ok(0);
        }
        let Some(ids) = self.tokens.lookup_ids(ngram) else {
            return Ok(0);
        };
        self.counts.get(order, &ids)
    }

    /// Relative-frequency estimate of `token` following `context`:
    /// `count(context + token) / count(context)`.
    ///
    /// Fails with `ZeroContext` when the context was never observed.
    pub fn prob<T: AsRef<str>>(&self, token: &str, context: &[T]) -> Result<f64, GramError> {
        let context_count = self.ngram_count(context)?;
        if context_count == 0 {
            return Err(GramError::ZeroContext);
        }

        let ngram: Vec<&str> = context
            .iter()
            .map(|t| t.as_ref())
            .chain(std::iter::once(token))
            .collect();
        let count = self.ngram_count(&ngram)?;

        Ok(count as f64 / context_count as f64)
    }

    /// Negative natural log of `prob`: a cost, lower is more likely.
    ///
    /// Infinite when `token` never followed an observed `context`.
    pub fn logprob<T: AsRef<str>>(&self, token: &str, context: &[T]) -> Result<f64, GramError> {
        Ok(-self.prob(token, context)?.ln())
    }

    /// Draw a continuation of `context` weighted by observed counts, using
    /// the thread-local generator.
    pub fn choose_random_word<T: AsRef<str>>(&self, context: &[T]) -> Result<&str, GramError> {
        self.choose_random_word_with(context, &mut rand::rng())
    }

    /// Draw a continuation of `context` weighted by observed counts.
    ///
    /// Candidates are considered in ascending id order, so a seeded source
    /// reproduces the same choices. Fails with `NoContinuation` when nothing
    /// was ever seen after `context`.
    pub fn choose_random_word_with<T, R>(
        &self,
        context: &[T],
        source: &mut R,
    ) -> Result<&str, GramError>
    where
        T: AsRef<str>,
        R: UniformSource + ?Sized,
    {
        let order = context
            .len()
            .checked_add(1)
            .and_then(|n| u8::try_from(n).ok())
            .ok_or(GramError::NoContinuation)?;
        let ids = self
            .tokens
            .lookup_ids(context)
            .ok_or(GramError::NoContinuation)?;

        let candidates = self.counts.followers(order, &ids)?;
        let id = weighted_choice(&candidates, source).ok_or(GramError::NoContinuation)?;
        self.tokens.get_token(id)
    }

    /// Lazily scan durable records under a raw key prefix.
    pub fn prefix_items(
        &self,
        prefix: &[u8],
        skip_prefix: bool,
    ) -> Result<PrefixItems<'_>, GramError> {
        self.counts.enumerate_prefix(prefix, skip_prefix)
    }

    /// Lazily scan durable keys under a raw key prefix.
    pub fn prefix_keys(
        &self,
        prefix: &[u8],
        skip_prefix: bool,
    ) -> Result<PrefixKeys<'_>, GramError> {
        self.counts.enumerate_prefix_keys(prefix, skip_prefix)
    }
}

impl<S: KvStore> Drop for Model<S> {
    fn drop(&mut self) {
        if self.counts.pending_len() == 0 && self.tokens.pending_len() == 0 {
            return;
        }
        // Errors cannot propagate out of drop; log them instead of losing
        // them silently.
        if let Err(e) = self.flush() {
            warn!(error = %e, "failed to flush pending counts on drop");
        }
    }
}

/// Read every persisted token record, in id order.
fn load_tokens<S: KvStore>(store: &S) -> Result<TokenRegistry, GramError> {
    let (low, high) = prefix_bounds(TOKEN_TAG);
    let records = store.range_scan(&low, high.as_deref())?.map(|entry| {
        let (key, value) = entry?;
        Ok((decode_token_key(&key)?, decode_token(&value)?))
    });
    TokenRegistry::from_records(records)
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::panic)]
mod tests {
    use super::*;
    use crate::kv::MemoryStore;

    fn words(s: &str) -> Vec<&str> {
        s.split_whitespace().collect()
    }

    fn memory_model() -> Model<MemoryStore> {
        Model::with_store(MemoryStore::new(), ModelConfig::default()).expect("model")
    }

    #[test]
    fn new_store_gets_default_orders() {
        let model = memory_model();
        assert_eq!(model.orders(), &[3, 2, 1]);
        assert!(model.store().get(ORDERS_KEY).expect("get").is_some());
    }

    #[test]
    fn stored_orders_win_over_config() {
        let mut store = MemoryStore::new();
        store
            .put(ORDERS_KEY, &encode_orders(&[2, 1]).expect("encode"))
            .expect("put");

        let model = Model::with_store(store, ModelConfig::default()).expect("model");
        assert_eq!(model.orders(), &[2, 1]);
    }

    #[test]
    fn train_counts_every_order() {
        let mut model = memory_model();
        model.train(&words("a b c")).expect("train");

        assert_eq!(model.ngram_count(&words("a b c")).expect("count"), 1);
        assert_eq!(model.ngram_count(&words("a b")).expect("count"), 1);
        assert_eq!(model.ngram_count(&words("b c")).expect("count"), 1);
        assert_eq!(model.ngram_count(&words("c")).expect("count"), 1);
        assert_eq!(model.ngram_count(&words("c b")).expect("count"), 0);
    }

    #[test]
    fn counting_never_registers_tokens() {
        let mut model = memory_model();
        model.train(&words("one two")).expect("train");

        assert_eq!(model.ngram_count(&words("will not find")).expect("count"), 0);
        assert_eq!(model.ngram_count::<&str>(&[]).expect("count"), 0);
        assert_eq!(model.vocabulary_size(), 2);
    }

    #[test]
    fn short_sequence_registers_nothing() {
        let config = ModelConfig::with_orders(vec![3u8]);
        let mut model = Model::with_store(MemoryStore::new(), config).expect("model");
        model.train(&words("too short")).expect("train");

        assert_eq!(model.vocabulary_size(), 0);
        assert_eq!(model.pending_counts(), 0);
    }

    #[test]
    fn flush_persists_tokens_and_counts_together() {
        let mut model = memory_model();
        model.train(&words("x y")).expect("train");
        assert_eq!(model.tokens().pending_len(), 2);
        assert!(model.pending_counts() > 0);

        model.flush().expect("flush");
        assert_eq!(model.tokens().pending_len(), 0);
        assert_eq!(model.pending_counts(), 0);
        assert_eq!(model.ngram_count(&words("x y")).expect("count"), 1);
    }

    #[test]
    fn autosave_fires_at_threshold() {
        let mut model = memory_model();
        model.set_save_threshold(2).expect("threshold");

        model.train_tokens(&["a"]).expect("train");
        assert!(!model.autosave().expect("autosave"));
        model.train_tokens(&["b"]).expect("train");
        assert!(model.autosave().expect("autosave"));
        assert_eq!(model.pending_counts(), 0);
    }

    #[test]
    fn zero_threshold_rejected() {
        let mut model = memory_model();
        assert!(model.set_save_threshold(0).is_err());
        assert_eq!(model.save_threshold(), crate::primitives::DEFAULT_SAVE_THRESHOLD);
    }

    #[test]
    fn prob_requires_observed_context() {
        let mut model = memory_model();
        model.train(&words("one two three")).expect("train");

        assert!(matches!(
            model.prob("three", &words("two one")),
            Err(GramError::ZeroContext)
        ));
        assert!(matches!(
            model.prob::<&str>("one", &[]),
            Err(GramError::ZeroContext)
        ));
    }

    #[test]
    fn logprob_infinite_for_unseen_continuation() {
        let mut model = memory_model();
        model.train(&words("one two three")).expect("train");

        let cost = model.logprob("one", &words("one two")).expect("logprob");
        assert!(cost.is_infinite() && cost > 0.0);
    }

    #[test]
    fn choose_random_word_sees_pending_counts() {
        let mut model = memory_model();
        model.train(&words("one two three")).expect("train");
        assert!(model.pending_counts() > 0);

        assert_eq!(
            model.choose_random_word(&words("one two")).expect("choice"),
            "three"
        );
    }

    #[test]
    fn choose_random_word_without_followers() {
        let mut model = memory_model();
        model.train(&words("one two three")).expect("train");

        assert!(matches!(
            model.choose_random_word(&words("two three")),
            Err(GramError::NoContinuation)
        ));
        assert!(matches!(
            model.choose_random_word(&words("never seen")),
            Err(GramError::NoContinuation)
        ));
    }

    #[test]
    fn choose_random_word_empty_context_draws_unigrams() {
        let mut model = memory_model();
        model.train(&words("solo")).expect("train");
        assert_eq!(model.choose_random_word::<&str>(&[]).expect("choice"), "solo");
    }

    /// Memory store whose batch writes fail while `failing` is set.
    #[derive(Default)]
    struct SwitchableStore {
        inner: MemoryStore,
        failing: bool,
    }

    impl KvStore for SwitchableStore {
        fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>, GramError> {
            self.inner.get(key)
        }
        fn put(&mut self, key: &[u8], value: &[u8]) -> Result<(), GramError> {
            self.inner.put(key, value)
        }
        fn batch_put(&mut self, batch: &[crate::kv::KvPair]) -> Result<(), GramError> {
            if self.failing {
                return Err(GramError::Storage("disk full".to_string()));
            }
            self.inner.batch_put(batch)
        }
        fn range_scan(
            &self,
            low: &[u8],
            high: Option<&[u8]>,
        ) -> Result<crate::kv::RangeScan<'_>, GramError> {
            self.inner.range_scan(low, high)
        }
    }

    #[test]
    fn failed_flush_keeps_counts_and_tokens_pending() {
        let mut model =
            Model::with_store(SwitchableStore::default(), ModelConfig::default()).expect("model");
        model.train(&words("a b")).expect("train");
        assert_eq!(model.tokens().pending_len(), 2);
        assert_eq!(model.pending_counts(), 3);

        model.store_mut().failing = true;
        assert!(matches!(model.flush(), Err(GramError::Storage(_))));

        assert_eq!(model.tokens().pending_len(), 2);
        assert_eq!(model.pending_counts(), 3);
        // Only the orders record written at creation.
        assert_eq!(model.store().inner.len(), 1);
        assert_eq!(model.ngram_count(&words("a b")).expect("count"), 1);

        model.store_mut().failing = false;
        model.flush().expect("retry");

        assert_eq!(model.tokens().pending_len(), 0);
        assert_eq!(model.pending_counts(), 0);
        // Orders, two tokens, three counts.
        assert_eq!(model.store().inner.len(), 6);
        assert_eq!(model.ngram_count(&words("a b")).expect("count"), 1);

        let reloaded = load_tokens(model.store()).expect("reload");
        assert_eq!(reloaded.lookup_id("b"), Some(TokenId(1)));
    }
}
