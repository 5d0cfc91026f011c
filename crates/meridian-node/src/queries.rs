// Path: crates/meridian-node/src/queries.rs
//! Sequence-numbered outbound request tracker with exponential backoff.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use meridian_networking::peers::PeerId;
use meridian_networking::QueryBy;
use meridian_types::error::QueryError;
use meridian_types::primitives::{Account, Hash, Height};
use meridian_types::Block;

/// Backoff doubles every three attempts, capped at this delay.
pub const MAX_BACKOFF: Duration = Duration::from_secs(256);
/// Base delay before the first retry.
const BASE_BACKOFF: Duration = Duration::from_secs(1);
/// Retries allowed before a query is retired as a miss.
const MAX_MISSES: u32 = 3;

/// A peer's response to an outstanding query.
#[derive(Debug, Clone)]
pub enum QueryStatus {
    /// The peer returned the requested block.
    Success(Block),
    /// The peer doesn't have the block.
    Miss,
    /// The peer has pruned the block and will never have it again.
    Pruned,
    /// The peer returned a conflicting block at the same height.
    Fork(Block),
    /// No response arrived before the query's deadline.
    Timeout,
}

/// What a query's callback decides to do with an acknowledgement.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AckDecision {
    /// Re-arm the query for another round.
    Continue,
    /// Retire the query; no further retries.
    Finish,
}

struct Query {
    by: QueryBy,
    account: Account,
    height: Height,
    hash: Hash,
    only_full_node: bool,
    from: Vec<PeerId>,
    acks: Vec<QueryStatus>,
    attempts: u32,
    next_wakeup: Instant,
}

/// Tracks every outbound block query and drives its retry/backoff schedule.
#[derive(Default)]
pub struct BlockQueries {
    queries: HashMap<u64, Query>,
    next_sequence: u64,
}

impl BlockQueries {
    /// Creates an empty tracker.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of outstanding queries.
    pub fn len(&self) -> usize {
        self.queries.len()
    }

    /// Starts a new query for `(account, height, hash)` identified by `by`, sent to
    /// `from` (a single randomly-chosen peer, or an explicit set for quorum queries).
    /// Returns the sequence number assigned to the query.
    pub fn start(
        &mut self,
        by: QueryBy,
        account: Account,
        height: Height,
        hash: Hash,
        from: Vec<PeerId>,
        only_full_node: bool,
        now: Instant,
    ) -> u64 {
        let sequence = self.next_sequence;
        self.next_sequence += 1;
        self.queries.insert(
            sequence,
            Query {
                by,
                account,
                height,
                hash,
                only_full_node,
                from,
                acks: Vec::new(),
                attempts: 0,
                next_wakeup: now,
            },
        );
        sequence
    }

    /// Records a response for `sequence` and applies the retry policy, returning
    /// `None` if the query isn't tracked (already retired) and `Some(decision)`
    /// once `callback` judges the accumulated ack vector.
    pub fn record_response(
        &mut self,
        sequence: u64,
        status: QueryStatus,
        now: Instant,
        callback: impl FnOnce(&[QueryStatus]) -> AckDecision,
    ) -> Option<AckDecision> {
        let query = self.queries.get_mut(&sequence)?;
        query.attempts += 1;

        let retire_as_miss = matches!(status, QueryStatus::Miss) && query.attempts >= MAX_MISSES;
        if matches!(status, QueryStatus::Pruned) {
            query.only_full_node = true;
        }
        query.acks.push(status);

        let decision = if retire_as_miss {
            AckDecision::Finish
        } else {
            callback(&query.acks)
        };

        match decision {
            AckDecision::Finish => {
                self.queries.remove(&sequence);
            }
            AckDecision::Continue => {
                query.next_wakeup = now + backoff_for(query.attempts);
            }
        }
        Some(decision)
    }

    /// Returns the `(sequence, account, height, hash, by, only_full_node)` of every
    /// query due to retry at or before `now`.
    pub fn due(&self, now: Instant) -> Vec<(u64, Account, Height, Hash, QueryBy, bool)> {
        self.queries
            .iter()
            .filter(|(_, q)| q.next_wakeup <= now)
            .map(|(seq, q)| (*seq, q.account, q.height, q.hash, q.by, q.only_full_node))
            .collect()
    }

    /// Whether `query` requires a full-node peer (set after a `Pruned` response).
    pub fn requires_full_node(&self, sequence: u64) -> Result<bool, QueryError> {
        self.queries
            .get(&sequence)
            .map(|q| q.only_full_node)
            .ok_or(QueryError::NoPeerAvailable)
    }
}

fn backoff_for(attempts: u32) -> Duration {
    let doublings = attempts / 3;
    let delay = BASE_BACKOFF.saturating_mul(1u32.checked_shl(doublings).unwrap_or(u32::MAX));
    delay.min(MAX_BACKOFF)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn backoff_doubles_every_three_attempts_and_caps() {
        assert_eq!(backoff_for(0), Duration::from_secs(1));
        assert_eq!(backoff_for(3), Duration::from_secs(2));
        assert_eq!(backoff_for(6), Duration::from_secs(4));
        assert_eq!(backoff_for(60), MAX_BACKOFF);
    }

    #[test]
    fn three_misses_retire_the_query() {
        let mut queries = BlockQueries::new();
        let now = Instant::now();
        let seq = queries.start(QueryBy::Height, Account::ZERO, 1, Hash::ZERO, vec![], false, now);
        for _ in 0..3 {
            queries.record_response(seq, QueryStatus::Miss, now, |_| AckDecision::Continue);
        }
        assert_eq!(queries.len(), 0);
    }

    #[test]
    fn success_with_continue_rearms_the_query() {
        let mut queries = BlockQueries::new();
        let now = Instant::now();
        let seq = queries.start(QueryBy::Hash, Account::ZERO, 1, Hash::ZERO, vec![], false, now);
        let decision = queries
            .record_response(seq, QueryStatus::Miss, now, |_| AckDecision::Continue)
            .expect("tracked");
        assert_eq!(decision, AckDecision::Continue);
        assert_eq!(queries.len(), 1);
    }

    #[test]
    fn pruned_response_marks_full_node_required() {
        let mut queries = BlockQueries::new();
        let now = Instant::now();
        let seq = queries.start(QueryBy::Hash, Account::ZERO, 1, Hash::ZERO, vec![], false, now);
        queries.record_response(seq, QueryStatus::Pruned, now, |_| AckDecision::Continue);
        assert!(queries.requires_full_node(seq).expect("tracked"));
    }
}
