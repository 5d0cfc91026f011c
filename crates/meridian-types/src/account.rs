// Path: crates/meridian-types/src/account.rs
//! Per-account ledger records.

use crate::block::Block;
use crate::primitives::{Account, Amount, Hash, Height, INVALID_HEIGHT};
use serde::{Deserialize, Serialize};

/// The per-account head/tail pointer maintained by the ledger.
///
/// Invariant: `tail_height <= confirmed_height <= head_height`, and
/// `confirmed_height` is monotonically non-decreasing over the account's lifetime.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountInfo {
    /// The account's chain type, mirroring its most recent block's type.
    pub head_hash: Hash,
    /// Height of the most recent block on the canonical chain.
    pub head_height: Height,
    /// Hash of the earliest block still retained (blocks below this are pruned).
    pub tail_hash: Hash,
    /// Height of the earliest block still retained.
    pub tail_height: Height,
    /// The highest confirmed height, or `None` if nothing has been confirmed yet.
    pub confirmed_height: Option<Height>,
}

impl AccountInfo {
    /// Builds the `AccountInfo` for a brand-new account whose first block is `genesis`.
    pub fn genesis(genesis_hash: Hash) -> Self {
        AccountInfo {
            head_hash: genesis_hash,
            head_height: 0,
            tail_hash: genesis_hash,
            tail_height: 0,
            confirmed_height: None,
        }
    }

    /// Whether `height` is reachable on the retained portion of this chain.
    pub fn contains_height(&self, height: Height) -> bool {
        height != INVALID_HEIGHT && height >= self.tail_height && height <= self.head_height
    }

    /// Checks the struct's own invariants; used defensively before committing a mutation.
    pub fn check_invariants(&self) -> bool {
        if self.tail_height > self.head_height {
            return false;
        }
        if let Some(confirmed) = self.confirmed_height {
            confirmed >= self.tail_height && confirmed <= self.head_height
        } else {
            true
        }
    }
}

/// A pending transfer created when a `send` block is appended, keyed by
/// `(destination, source_hash)`; removed when the matching `receive` block is appended.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReceivableInfo {
    /// The amount transferred, equal to `previous.balance - block.balance` of the send.
    pub amount: Amount,
    /// The account that sent the transfer.
    pub source_account: Account,
    /// The send block's signed timestamp.
    pub source_timestamp: i64,
}

/// A pending reward created at confirmation of a block that transfers representative
/// weight, keyed by `(representative, source_hash)`; consumed by a `reward` block.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RewardableInfo {
    /// The weight amount this reward entry is worth.
    pub amount: Amount,
    /// The reward may not be consumed before this Unix timestamp.
    pub valid_from_timestamp: i64,
}

/// A fork record: two distinct blocks once seen at the same `(account, height)`.
/// Both are retained so peers that already hold either one can still be served.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ForkRecord {
    /// The first block observed at this height.
    pub first: Block,
    /// The second, conflicting block observed at this height.
    pub second: Block,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn genesis_account_info_satisfies_invariants() {
        let info = AccountInfo::genesis(Hash([1u8; 32]));
        assert!(info.check_invariants());
        assert_eq!(info.head_height, 0);
        assert_eq!(info.confirmed_height, None);
    }

    #[test]
    fn detects_broken_invariant() {
        let mut info = AccountInfo::genesis(Hash([1u8; 32]));
        info.tail_height = 5;
        info.head_height = 3;
        assert!(!info.check_invariants());
    }
}
