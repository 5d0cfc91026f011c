// Path: crates/meridian-elections/src/scheduler.rs
//! Wake-up priority queue driving the single-threaded election loop.
//!
//! The scheduler itself never tallies votes; it only decides which election is
//! due next, mirroring the cooperative loop the design describes: wake on the
//! earliest-due election, tick it, reinsert it with its new `next_wakeup`.

use std::cmp::Ordering;
use std::collections::{BinaryHeap, HashMap};
use std::time::Instant;

use meridian_types::error::ElectionError;
use meridian_types::primitives::{Account, Hash, Height};
use meridian_types::Block;

use crate::election::{Election, RoundOutcome};
use crate::metrics;
use crate::vote::Vote;
use crate::weight::WeightSource;

type ElectionKey = (Account, Height);

#[derive(Eq, PartialEq)]
struct WakeupEntry {
    at: Instant,
    key: ElectionKey,
}

impl Ord for WakeupEntry {
    fn cmp(&self, other: &Self) -> Ordering {
        // Reversed: BinaryHeap is a max-heap, we want the earliest `at` on top.
        other.at.cmp(&self.at)
    }
}

impl PartialOrd for WakeupEntry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Owns every in-flight election and the queue of when each is next due.
#[derive(Default)]
pub struct Scheduler {
    elections: HashMap<ElectionKey, Election>,
    queue: BinaryHeap<WakeupEntry>,
}

impl Scheduler {
    /// Creates an empty scheduler.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of elections currently in flight.
    pub fn len(&self) -> usize {
        self.elections.len()
    }

    /// Whether no elections are in flight.
    pub fn is_empty(&self) -> bool {
        self.elections.is_empty()
    }

    /// Starts a new election for `(account, height)` if one is not already running,
    /// or registers `block` as a competing candidate (marking a fork) if one is.
    pub fn observe_block(&mut self, account: Account, height: Height, hash: Hash, block: Block, now: Instant) {
        let key = (account, height);
        if let Some(election) = self.elections.get_mut(&key) {
            let was_fork = election.fork_found();
            election.add_block_candidate(hash, block);
            if !was_fork && election.fork_found() {
                metrics::metrics().inc_forks_detected();
            }
            return;
        }
        let election = Election::new(account, height, hash, block, now);
        self.queue.push(WakeupEntry {
            at: election.next_wakeup(),
            key,
        });
        self.elections.insert(key, election);
        metrics::metrics().set_active_elections(self.elections.len() as u64);
    }

    /// Applies a confirm vote to the election at `(account, height)`, if one exists.
    pub fn add_vote(
        &mut self,
        account: Account,
        height: Height,
        representative: Account,
        vote: Vote,
        weight_source: &dyn WeightSource,
    ) -> Result<(), ElectionError> {
        let election = self
            .elections
            .get_mut(&(account, height))
            .ok_or(ElectionError::NoActiveElection)?;
        election.add_vote(representative, vote, weight_source)
    }

    /// Removes the election at `(account, height)`, used when the ledger's
    /// `AccountInfo.confirmed_height` reaches that height through any path, or when
    /// the processor forces a confirm directly.
    pub fn terminate(&mut self, account: Account, height: Height) {
        self.elections.remove(&(account, height));
        metrics::metrics().set_active_elections(self.elections.len() as u64);
    }

    /// Pops and ticks the earliest-due election, reinserting it unless it confirmed.
    /// Returns `None` if no election is due at or before `now`.
    pub fn tick_next_due(
        &mut self,
        weight_source: &dyn WeightSource,
        now: Instant,
    ) -> Option<(Account, Height, RoundOutcome)> {
        loop {
            let entry = self.queue.peek()?;
            if entry.at > now {
                return None;
            }
            let WakeupEntry { key, .. } = self.queue.pop()?;
            let (account, height) = key;

            // The election may have been terminated since it was scheduled.
            let Some(election) = self.elections.get_mut(&key) else {
                continue;
            };
            // Stale entry: the election already rescheduled itself for later via a
            // prior tick; this queue entry is a leftover duplicate, skip it.
            if election.next_wakeup() > now {
                continue;
            }

            let outcome = election.tick(weight_source, now);
            match &outcome {
                RoundOutcome::Confirmed { hash } => {
                    tracing::info!(?account, height, %hash, "election confirmed");
                    self.elections.remove(&key);
                    metrics::metrics().inc_confirms();
                    metrics::metrics().set_active_elections(self.elections.len() as u64);
                }
                _ => {
                    self.queue.push(WakeupEntry {
                        at: election.next_wakeup(),
                        key,
                    });
                }
            }
            return Some((account, height, outcome));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::weight::StaticWeightTable;
    use meridian_types::block::{BlockCommon, Opcode, TransactionBlock};
    use meridian_types::primitives::Signature;

    fn dummy_block(account: Account, height: Height) -> Block {
        Block::Tx(TransactionBlock {
            common: BlockCommon {
                opcode: Opcode::Send,
                credit: 1,
                counter: 1,
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
    fn observing_a_block_schedules_an_election() {
        let mut scheduler = Scheduler::new();
        let account = Account([1u8; 32]);
        let hash = Hash([1u8; 32]);
        scheduler.observe_block(account, 1, hash, dummy_block(account, 1), Instant::now());
        assert_eq!(scheduler.len(), 1);
    }

    #[test]
    fn nothing_due_before_its_wakeup_time() {
        let mut scheduler = Scheduler::new();
        let account = Account([1u8; 32]);
        let hash = Hash([1u8; 32]);
        let weights = StaticWeightTable::default();
        scheduler.observe_block(account, 1, hash, dummy_block(account, 1), Instant::now());
        assert!(scheduler.tick_next_due(&weights, Instant::now()).is_none());
    }

    #[test]
    fn terminate_removes_the_election() {
        let mut scheduler = Scheduler::new();
        let account = Account([1u8; 32]);
        let hash = Hash([1u8; 32]);
        scheduler.observe_block(account, 1, hash, dummy_block(account, 1), Instant::now());
        scheduler.terminate(account, 1);
        assert!(scheduler.is_empty());
    }
}
