// Path: crates/meridian-node/src/syncer.rs
//! Per-account state machine that pulls an account chain down from peers,
//! one block at a time, driving [`crate::queries::BlockQueries`] as it goes.
//!
//! The syncer itself never talks to the network or the processor directly;
//! it's fed events (`query_success`, `block_appended`, `fork_detected`,
//! `gap_source`) by whatever owns both a [`crate::queries::BlockQueries`] and
//! a [`crate::processor::BlockProcessor`], and returns the [`Action`] the
//! caller should take next. This mirrors the query tracker's own style of
//! staying decoupled from its caller's wiring.

use std::collections::HashMap;

use meridian_networking::peers::PeerId;
use meridian_types::error::SyncError;
use meridian_types::primitives::{Account, Hash, Height};

/// Hard cap on accounts being synced concurrently, to bound memory.
pub const BUSY_SIZE: usize = 10_240;

/// Retries allowed for a single missing receivable/rewardable source before
/// giving up on that block.
const MAX_SOURCE_RETRIES: u32 = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Status {
    /// Waiting on a peer to answer the outstanding query.
    Query,
    /// A block arrived and is in flight to the processor.
    Process,
}

struct SyncState {
    status: Status,
    first_request: Height,
    next_height: Height,
    expected_previous: Hash,
    source_retries: u32,
}

/// What the caller should do in response to a syncer transition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    /// Issue `BlockQuery(by=Previous, account, height, expected_previous)` to `peer`.
    Query {
        account: Account,
        height: Height,
        expected_previous: Hash,
        peer: PeerId,
    },
    /// The account was dropped from the sync set; no further action pending.
    Dropped { account: Account },
    /// Nothing to do (e.g. the account wasn't being tracked).
    None,
}

/// Tracks every account currently being bootstrapped from peers.
#[derive(Default)]
pub struct Syncer {
    accounts: HashMap<Account, SyncState>,
}

impl Syncer {
    /// Creates an empty syncer.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of accounts currently in flight.
    pub fn len(&self) -> usize {
        self.accounts.len()
    }

    /// Whether `account` is currently being synced.
    pub fn is_syncing(&self, account: &Account) -> bool {
        self.accounts.contains_key(account)
    }

    /// Begins (or resumes) syncing `account` starting at `height`, expecting
    /// `expected_previous` as that block's predecessor hash.
    pub fn add(
        &mut self,
        account: Account,
        height: Height,
        expected_previous: Hash,
        peer: PeerId,
    ) -> Result<Action, SyncError> {
        if self.accounts.len() >= BUSY_SIZE && !self.accounts.contains_key(&account) {
            return Err(SyncError::Busy);
        }
        self.accounts.insert(
            account,
            SyncState {
                status: Status::Query,
                first_request: height,
                next_height: height,
                expected_previous,
                source_retries: 0,
            },
        );
        Ok(Action::Query {
            account,
            height,
            expected_previous,
            peer,
        })
    }

    /// A peer answered the outstanding query with a block; move to `process`
    /// so the caller can submit it to the processor.
    pub fn query_success(&mut self, account: &Account) {
        if let Some(state) = self.accounts.get_mut(account) {
            state.status = Status::Process;
        }
    }

    /// The processor appended the submitted block; re-arm a query for the
    /// block that follows it.
    pub fn block_appended(&mut self, account: Account, appended_hash: Hash, peer: PeerId) -> Action {
        let Some(state) = self.accounts.get_mut(&account) else {
            return Action::None;
        };
        state.status = Status::Query;
        state.next_height += 1;
        state.expected_previous = appended_hash;
        state.source_retries = 0;
        Action::Query {
            account,
            height: state.next_height,
            expected_previous: appended_hash,
            peer,
        }
    }

    /// A fork was detected against the submitted block, or the account missed
    /// three times running at genesis; stop tracking it.
    pub fn fork_or_genesis_exhausted(&mut self, account: &Account) -> Action {
        if self.accounts.remove(account).is_some() {
            Action::Dropped { account: *account }
        } else {
            Action::None
        }
    }

    /// The processor rejected the submitted block for a missing receivable or
    /// rewardable source; retry fetching that source hash up to
    /// [`MAX_SOURCE_RETRIES`] times before giving up on the account.
    pub fn gap_source(&mut self, account: Account, source_hash: Hash, peer: PeerId) -> Action {
        let Some(state) = self.accounts.get_mut(&account) else {
            return Action::None;
        };
        if state.source_retries >= MAX_SOURCE_RETRIES {
            self.accounts.remove(&account);
            return Action::Dropped { account };
        }
        state.status = Status::Query;
        state.source_retries += 1;
        Action::Query {
            account,
            height: state.next_height,
            expected_previous: source_hash,
            peer,
        }
    }

    /// The height the sync for `account` originally started at.
    pub fn first_request(&self, account: &Account) -> Option<Height> {
        self.accounts.get(account).map(|s| s.first_request)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn peer() -> PeerId {
        Account([9u8; 32])
    }

    #[test]
    fn add_tracks_the_account_and_issues_a_query() {
        let mut syncer = Syncer::new();
        let account = Account([1u8; 32]);
        let action = syncer.add(account, 1, Hash::ZERO, peer()).expect("added");
        assert!(syncer.is_syncing(&account));
        assert_eq!(
            action,
            Action::Query {
                account,
                height: 1,
                expected_previous: Hash::ZERO,
                peer: peer(),
            }
        );
    }

    #[test]
    fn block_appended_advances_to_the_next_height() {
        let mut syncer = Syncer::new();
        let account = Account([2u8; 32]);
        syncer.add(account, 1, Hash::ZERO, peer()).expect("added");
        syncer.query_success(&account);
        let next_hash = Hash([7u8; 32]);
        let action = syncer.block_appended(account, next_hash, peer());
        assert_eq!(
            action,
            Action::Query {
                account,
                height: 2,
                expected_previous: next_hash,
                peer: peer(),
            }
        );
    }

    #[test]
    fn fork_drops_the_account() {
        let mut syncer = Syncer::new();
        let account = Account([3u8; 32]);
        syncer.add(account, 1, Hash::ZERO, peer()).expect("added");
        let action = syncer.fork_or_genesis_exhausted(&account);
        assert_eq!(action, Action::Dropped { account });
        assert!(!syncer.is_syncing(&account));
    }

    #[test]
    fn gap_source_gives_up_after_max_retries() {
        let mut syncer = Syncer::new();
        let account = Account([4u8; 32]);
        syncer.add(account, 1, Hash::ZERO, peer()).expect("added");
        for _ in 0..MAX_SOURCE_RETRIES {
            syncer.gap_source(account, Hash([5u8; 32]), peer());
        }
        let action = syncer.gap_source(account, Hash([5u8; 32]), peer());
        assert_eq!(action, Action::Dropped { account });
    }

    #[test]
    fn at_capacity_rejects_new_accounts() {
        let mut syncer = Syncer::new();
        for i in 0..BUSY_SIZE {
            let bytes = (i as u32).to_be_bytes();
            let mut account_bytes = [0u8; 32];
            account_bytes[..4].copy_from_slice(&bytes);
            syncer
                .add(Account(account_bytes), 1, Hash::ZERO, peer())
                .expect("under cap");
        }
        let result = syncer.add(Account([255u8; 32]), 1, Hash::ZERO, peer());
        assert!(matches!(result, Err(SyncError::Busy)));
    }
}
