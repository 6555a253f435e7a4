//! # gramstore-core
//!
//! A persistent statistical language model: n-gram frequency counts learned
//! from token sequences, stored in an ordered key-value store, queried for
//! probabilities and weighted-random continuations.
//!
//! ## Layers
//!
//! - `kv` / `storage`: the ordered byte store contract and its backends
//! - `codec`: order-preserving key encoding and prefix bounds
//! - `registry`: token ↔ dense id mapping
//! - `counts`: merge-on-write counters with a pending delta log
//! - `model`: training, autosave, probabilities, sampling
//!
//! ## Example
//!
//! ```
//! use gramstore_core::{MemoryStore, Model, ModelConfig};
//!
//! let mut model = Model::with_store(MemoryStore::new(), ModelConfig::default())?;
//! model.train(&["one", "two", "three"])?;
//! model.train(&["one", "two", "four"])?;
//!
//! assert_eq!(model.ngram_count(&["one", "two"])?, 2);
//! assert_eq!(model.prob("three", &["one", "two"])?, 0.5);
//! # Ok::<(), gramstore_core::GramError>(())
//! ```
//!
//! ## Architectural Constraints
//!
//! - NO async, NO network dependencies (pure Rust)
//! - Single writer: every mutation takes `&mut self`
//! - Counts and the token records they reference commit in one batch

// =============================================================================
// MODULES
// =============================================================================

pub mod codec;
pub mod config;
pub mod counts;
pub mod kv;
pub mod model;
pub mod ngrams;
pub mod primitives;
pub mod registry;
pub mod sampling;
pub mod storage;
pub mod types;

// =============================================================================
// RE-EXPORTS: Core Types
// =============================================================================

pub use types::{GramError, TokenId};

// =============================================================================
// RE-EXPORTS: Engine
// =============================================================================

pub use config::ModelConfig;
pub use counts::{CountStore, PrefixItems, PrefixKeys};
pub use kv::{KvPair, KvStore, MemoryStore, RangeScan};
pub use model::Model;
pub use ngrams::{Ngrams, ngrams};
pub use registry::TokenRegistry;
pub use sampling::{UniformSource, weighted_choice};
pub use storage::RedbStore;

// =============================================================================
// RE-EXPORTS: Primitives
// =============================================================================

pub use primitives::{DEFAULT_ORDERS, DEFAULT_SAVE_THRESHOLD};
