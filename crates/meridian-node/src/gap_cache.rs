// Path: crates/meridian-node/src/gap_cache.rs
//! Bounded holding area for blocks the processor cannot yet append because a
//! predecessor is missing.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use meridian_types::primitives::{Account, Hash};
use meridian_types::Block;

/// Per-account cap on outstanding gap entries.
pub const PER_ACCOUNT_CAP: usize = 16;
/// Global cap on outstanding gap entries across all accounts.
pub const GLOBAL_CAP: usize = 128 * 1024;

struct Entry {
    orphan_block: Block,
    account: Account,
    arrival_time: Instant,
}

/// Holds blocks whose predecessor has not yet arrived, indexed by the missing
/// predecessor's hash so they can be re-submitted once it does.
#[derive(Default)]
pub struct GapCache {
    entries: HashMap<Hash, Entry>,
    per_account_counts: HashMap<Account, usize>,
}

/// Why [`GapCache::insert`] declined to hold a block.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RejectReason {
    /// The account already has [`PER_ACCOUNT_CAP`] outstanding entries.
    AccountAtCapacity,
    /// The cache already holds [`GLOBAL_CAP`] entries across all accounts.
    GlobalAtCapacity,
}

impl GapCache {
    /// Creates an empty cache.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of blocks currently held.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the cache holds no blocks.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Stashes `block`, keyed by the hash of its missing predecessor, unless the
    /// per-account or global cap has been reached.
    pub fn insert(&mut self, missing_hash: Hash, account: Account, block: Block, now: Instant) -> Result<(), RejectReason> {
        if self.entries.len() >= GLOBAL_CAP {
            return Err(RejectReason::GlobalAtCapacity);
        }
        let count = self.per_account_counts.entry(account).or_insert(0);
        if *count >= PER_ACCOUNT_CAP {
            return Err(RejectReason::AccountAtCapacity);
        }
        *count += 1;
        self.entries.insert(
            missing_hash,
            Entry {
                orphan_block: block,
                account,
                arrival_time: now,
            },
        );
        Ok(())
    }

    /// Removes and returns the block waiting on `hash`, if any, now that `hash`
    /// has arrived.
    pub fn take(&mut self, hash: &Hash) -> Option<Block> {
        let entry = self.entries.remove(hash)?;
        if let Some(count) = self.per_account_counts.get_mut(&entry.account) {
            *count = count.saturating_sub(1);
            if *count == 0 {
                self.per_account_counts.remove(&entry.account);
            }
        }
        Some(entry.orphan_block)
    }

    /// Removes and returns every entry older than `horizon`, for re-submission to
    /// the processor in case the dependency landed via another path.
    pub fn evict_older_than(&mut self, horizon: Duration, now: Instant) -> Vec<(Account, Block)> {
        let stale: Vec<Hash> = self
            .entries
            .iter()
            .filter(|(_, entry)| now.duration_since(entry.arrival_time) > horizon)
            .map(|(hash, _)| *hash)
            .collect();
        stale
            .into_iter()
            .filter_map(|hash| {
                let entry = self.entries.remove(&hash)?;
                if let Some(count) = self.per_account_counts.get_mut(&entry.account) {
                    *count = count.saturating_sub(1);
                }
                Some((entry.account, entry.orphan_block))
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use meridian_types::block::{BlockCommon, Opcode, TransactionBlock};
    use meridian_types::primitives::Signature;

    fn dummy_block(account: Account, height: u64) -> Block {
        Block::Tx(TransactionBlock {
            common: BlockCommon {
                opcode: Opcode::Send,
                credit: 1,
                counter: 0,
                timestamp: 0,
                height,
                account,
                previous: Hash::ZERO,
                signature: Signature::default(),
            },
            representative: Account::ZERO,
            balance: 0,
            link: Hash::ZERO,
            extensions: Vec::new(),
        })
    }

    #[test]
    fn insert_then_take_round_trips() {
        let mut cache = GapCache::new();
        let account = Account([1u8; 32]);
        let missing = Hash([2u8; 32]);
        cache
            .insert(missing, account, dummy_block(account, 5), Instant::now())
            .expect("insert");
        assert_eq!(cache.len(), 1);
        assert!(cache.take(&missing).is_some());
        assert!(cache.is_empty());
    }

    #[test]
    fn per_account_cap_is_enforced() {
        let mut cache = GapCache::new();
        let account = Account([3u8; 32]);
        let now = Instant::now();
        for i in 0..PER_ACCOUNT_CAP as u64 {
            cache
                .insert(Hash([i as u8; 32]), account, dummy_block(account, i), now)
                .expect("insert under cap");
        }
        let result = cache.insert(Hash([255u8; 32]), account, dummy_block(account, 99), now);
        assert_eq!(result, Err(RejectReason::AccountAtCapacity));
    }

    #[test]
    fn eviction_removes_entries_past_the_horizon() {
        let mut cache = GapCache::new();
        let account = Account([4u8; 32]);
        let now = Instant::now();
        cache
            .insert(Hash([9u8; 32]), account, dummy_block(account, 1), now)
            .expect("insert");
        let later = now + Duration::from_secs(120);
        let evicted = cache.evict_older_than(Duration::from_secs(60), later);
        assert_eq!(evicted.len(), 1);
        assert!(cache.is_empty());
    }
}
