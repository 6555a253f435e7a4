//! # Model Configuration
//!
//! Plain serde-friendly settings consumed by `Model`. Loading them from files
//! or flags is the caller's job.

use crate::primitives::{DEFAULT_ORDERS, DEFAULT_SAVE_THRESHOLD};
use crate::GramError;
use serde::{Deserialize, Serialize};

/// Settings for opening or creating a model.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelConfig {
    /// N-gram orders to track when a new model is created.
    ///
    /// Ignored when the store already holds an orders record.
    pub orders: Vec<u8>,
    /// Pending count entries allowed before an autosave flush.
    pub save_threshold: usize,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            orders: DEFAULT_ORDERS.to_vec(),
            save_threshold: DEFAULT_SAVE_THRESHOLD,
        }
    }
}

impl ModelConfig {
    /// Default configuration with the given orders.
    #[must_use]
    pub fn with_orders(orders: impl Into<Vec<u8>>) -> Self {
        Self {
            orders: orders.into(),
            ..Self::default()
        }
    }

    /// Check every field, returning the configuration with its orders sorted
    /// highest first.
    pub fn validate(mut self) -> Result<Self, GramError> {
        self.orders = normalize_orders(&self.orders)?;
        if self.save_threshold == 0 {
            return Err(GramError::InvalidConfig(
                "save_threshold must be at least 1".to_string(),
            ));
        }
        Ok(self)
    }
}

/// Sort orders descending, rejecting empty sets, zero and duplicates.
pub fn normalize_orders(orders: &[u8]) -> Result<Vec<u8>, GramError> {
    if orders.is_empty() {
        return Err(GramError::InvalidOrders("no orders given".to_string()));
    }
    if orders.contains(&0) {
        return Err(GramError::InvalidOrders("order 0 is not an n-gram".to_string()));
    }

    let mut sorted = orders.to_vec();
    sorted.sort_unstable_by(|a, b| b.cmp(a));
    if sorted.windows(2).any(|w| w[0] == w[1]) {
        return Err(GramError::InvalidOrders(format!(
            "duplicate order in {:?}",
            orders
        )));
    }
    Ok(sorted)
}
