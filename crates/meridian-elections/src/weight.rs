// Path: crates/meridian-elections/src/weight.rs
//! The source of representative voting weight, supplied by the embedding node.
//!
//! Elections never read the ledger or the representative-weight snapshot directly;
//! they are handed a `WeightSource` so the engine can be exercised in tests without
//! a ledger instance, and so the snapshot's refresh cadence stays the caller's concern.

use meridian_types::primitives::{Account, Amount};

/// Supplies a representative's current weight and the total online voting weight.
pub trait WeightSource: Send + Sync {
    /// The stake currently delegated to `representative`, as of the last snapshot.
    fn weight_of(&self, representative: &Account) -> Amount;
    /// The sum of weight held by representatives the node currently considers online.
    fn online_weight(&self) -> Amount;
}

/// A fixed-table weight source for tests and for a node with no live peer feed yet.
#[derive(Debug, Default, Clone)]
pub struct StaticWeightTable {
    weights: std::collections::HashMap<Account, Amount>,
}

impl StaticWeightTable {
    /// Builds a table from `(representative, weight)` pairs. `online_weight` is their sum.
    pub fn new(entries: impl IntoIterator<Item = (Account, Amount)>) -> Self {
        Self {
            weights: entries.into_iter().collect(),
        }
    }
}

impl WeightSource for StaticWeightTable {
    fn weight_of(&self, representative: &Account) -> Amount {
        self.weights.get(representative).copied().unwrap_or(0)
    }

    fn online_weight(&self) -> Amount {
        self.weights.values().sum()
    }
}
