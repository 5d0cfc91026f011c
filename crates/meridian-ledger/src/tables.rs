// Path: crates/meridian-ledger/src/tables.rs
//! Named tables and big-endian key encodings.
//!
//! Every table is declared `<&[u8], &[u8]>`; keys are explicit byte encodings
//! chosen so that iteration order matches the semantic ordering the rest of
//! the design assumes (e.g. `blocks_index` iterates a fixed account in
//! ascending height order). Values are `bincode`-encoded structs from
//! `meridian_types`. This internal encoding is independent of the
//! hash-covered wire format used for block hashing and signing.

use meridian_types::primitives::{Account, Hash, Height};
use redb::TableDefinition;

/// `account -> AccountInfo`
pub const ACCOUNTS: TableDefinition<&[u8], &[u8]> = TableDefinition::new("accounts");
/// `hash -> (Block, successor_hash)`
pub const BLOCKS: TableDefinition<&[u8], &[u8]> = TableDefinition::new("blocks");
/// `account || height -> hash`
pub const BLOCKS_INDEX: TableDefinition<&[u8], &[u8]> = TableDefinition::new("blocks_index");
/// `tag (u32 BE) -> value (u32 BE)`, schema versioning and other small scalars.
pub const META: TableDefinition<&[u8], &[u8]> = TableDefinition::new("meta");
/// `destination || source_hash -> ReceivableInfo`
pub const RECEIVABLES: TableDefinition<&[u8], &[u8]> = TableDefinition::new("receivables");
/// `representative || source_hash -> RewardableInfo`
pub const REWARDABLES: TableDefinition<&[u8], &[u8]> = TableDefinition::new("rewardables");
/// `hash -> Block`, blocks removed from a chain, kept so peers can still fetch them.
pub const ROLLBACKS: TableDefinition<&[u8], &[u8]> = TableDefinition::new("rollbacks");
/// `account || height -> ForkRecord`
pub const FORKS: TableDefinition<&[u8], &[u8]> = TableDefinition::new("forks");

/// The `meta` key under which the schema version integer is stored.
pub const VERSION_KEY_TAG: u32 = 0;

pub fn k_account(account: &Account) -> Vec<u8> {
    account.as_bytes().to_vec()
}

pub fn k_hash(hash: &Hash) -> Vec<u8> {
    hash.as_bytes().to_vec()
}

pub fn k_account_height(account: &Account, height: Height) -> Vec<u8> {
    let mut key = Vec::with_capacity(40);
    key.extend_from_slice(account.as_bytes());
    key.extend_from_slice(&height.to_be_bytes());
    key
}

pub fn k_account_hash(account: &Account, hash: &Hash) -> Vec<u8> {
    let mut key = Vec::with_capacity(64);
    key.extend_from_slice(account.as_bytes());
    key.extend_from_slice(hash.as_bytes());
    key
}

pub fn k_account_prefix(account: &Account) -> Vec<u8> {
    account.as_bytes().to_vec()
}

pub fn k_meta(tag: u32) -> Vec<u8> {
    tag.to_be_bytes().to_vec()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn account_height_keys_sort_by_height_for_fixed_account() {
        let account = Account([1u8; 32]);
        let k5 = k_account_height(&account, 5);
        let k10 = k_account_height(&account, 10);
        assert!(k5 < k10);
    }

    #[test]
    fn account_prefix_is_a_prefix_of_account_height_key() {
        let account = Account([2u8; 32]);
        let prefix = k_account_prefix(&account);
        let full = k_account_height(&account, 3);
        assert!(full.starts_with(&prefix));
    }
}
