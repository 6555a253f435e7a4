//! # Storage Backends
//!
//! Durable `KvStore` implementations.

mod redb_store;

pub use redb_store::RedbStore;
