// Path: crates/meridian-elections/src/election.rs
//! A single account-chain election: the voting machine for one `(account, height)`.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use meridian_types::error::ElectionError;
use meridian_types::primitives::{Account, Amount, Hash, Height};
use meridian_types::Block;

use crate::constants::{
    CONFIRM_WEIGHT_PERCENTAGE, CONFIRM_WINS_THRESHOLD, FORK_ROUND_INTERVAL, MIN_ELECTION_INTERVAL,
    NON_FORK_ROUND_INTERVAL,
};
use crate::vote::{supersedes, Vote};
use crate::weight::WeightSource;

/// A candidate block being voted on, together with how many times it has been
/// rebroadcast or re-submitted (`refs`), mirroring the reference count the source
/// keeps to decide which blocks are still worth gossiping.
#[derive(Clone, Debug)]
struct Candidate {
    block: Block,
    refs: u32,
}

/// Outcome of a single tally round, returned by [`Election::tick`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RoundOutcome {
    /// No block reached the confirm threshold this round.
    NoWinner,
    /// `hash` won this round but has not yet accumulated `CONFIRM_WINS_THRESHOLD`
    /// consecutive wins, or the latency floor has not elapsed.
    Winning { hash: Hash, consecutive_wins: u32 },
    /// `hash` has won enough consecutive rounds after the latency floor; the caller
    /// should forward it to the processor as a confirm operation and drop the election.
    Confirmed { hash: Hash },
}

/// The per-`(account, height)` voting machine described by the election design.
pub struct Election {
    account: Account,
    height: Height,
    blocks: HashMap<Hash, Candidate>,
    votes: HashMap<Account, Vote>,
    conflicts: HashMap<Account, Vote>,
    rounds: u32,
    wins: u32,
    confirms: u32,
    created_at: Instant,
    next_wakeup: Instant,
}

impl Election {
    /// Starts a new election seeded with the first observed block at `(account, height)`.
    pub fn new(account: Account, height: Height, hash: Hash, block: Block, now: Instant) -> Self {
        let mut blocks = HashMap::new();
        blocks.insert(hash, Candidate { block, refs: 1 });
        Election {
            account,
            height,
            blocks,
            votes: HashMap::new(),
            conflicts: HashMap::new(),
            rounds: 0,
            wins: 0,
            confirms: 0,
            created_at: now,
            next_wakeup: now + NON_FORK_ROUND_INTERVAL,
        }
    }

    /// The account this election is running for.
    pub fn account(&self) -> &Account {
        &self.account
    }

    /// The height this election is running for.
    pub fn height(&self) -> Height {
        self.height
    }

    /// When the scheduler should next call [`Election::tick`].
    pub fn next_wakeup(&self) -> Instant {
        self.next_wakeup
    }

    /// Whether two or more distinct block hashes are competing for this height.
    pub fn fork_found(&self) -> bool {
        self.blocks.len() > 1
    }

    /// Registers a second (or further) candidate block for this height, marking the
    /// election as a fork.
    pub fn add_block_candidate(&mut self, hash: Hash, block: Block) {
        self.blocks
            .entry(hash)
            .and_modify(|c| c.refs += 1)
            .or_insert(Candidate { block, refs: 1 });
    }

    /// Records a confirm vote from `representative` for `hash`, validating the
    /// signature and applying the supersede/conflict rules.
    ///
    /// A representative voting for a hash not currently in the election's candidate
    /// set is rejected with [`ElectionError::UnknownRepresentative`]... no: rejected
    /// because the vote cannot be tallied against a block we have not seen; callers
    /// should still retain it only once the block itself arrives.
    pub fn add_vote(
        &mut self,
        representative: Account,
        vote: Vote,
        weight_source: &dyn WeightSource,
    ) -> Result<(), ElectionError> {
        vote.verify(&representative)?;
        if weight_source.weight_of(&representative) == 0 {
            return Err(ElectionError::UnknownRepresentative);
        }
        if !self.blocks.contains_key(&vote.hash) {
            return Err(ElectionError::NoActiveElection);
        }

        match self.votes.get(&representative) {
            None => {
                self.votes.insert(representative, vote);
                Ok(())
            }
            Some(existing) if existing.hash == vote.hash => {
                if vote.timestamp > existing.timestamp {
                    self.votes.insert(representative, vote);
                }
                Ok(())
            }
            Some(existing) => {
                if supersedes(existing, vote.timestamp, &vote.hash) {
                    self.votes.insert(representative, vote);
                } else {
                    self.conflicts.insert(representative, vote);
                    return Err(ElectionError::ConflictingVote);
                }
                Ok(())
            }
        }
    }

    fn tally(&self, weight_source: &dyn WeightSource) -> HashMap<Hash, Amount> {
        let mut totals: HashMap<Hash, Amount> = self.blocks.keys().map(|h| (*h, 0)).collect();
        for (representative, vote) in &self.votes {
            // A rep with a recorded conflict counts toward neither hash.
            if self.conflicts.contains_key(representative) {
                continue;
            }
            let weight = weight_source.weight_of(representative);
            if let Some(total) = totals.get_mut(&vote.hash) {
                *total = total.saturating_add(weight);
            }
        }
        totals
    }

    /// Runs one tally round: sums weight by candidate hash, checks the confirm
    /// threshold, and reschedules the election's next wakeup.
    pub fn tick(&mut self, weight_source: &dyn WeightSource, now: Instant) -> RoundOutcome {
        self.rounds += 1;
        let totals = self.tally(weight_source);
        let online = weight_source.online_weight();
        let threshold = online.saturating_mul(CONFIRM_WEIGHT_PERCENTAGE as Amount) / 100;

        let round_winner = totals
            .iter()
            .filter(|(_, weight)| **weight >= threshold && threshold > 0)
            .max_by_key(|(_, weight)| **weight)
            .map(|(hash, _)| *hash);

        let interval = if self.fork_found() {
            FORK_ROUND_INTERVAL
        } else {
            NON_FORK_ROUND_INTERVAL
        };
        self.next_wakeup = now + interval;

        match round_winner {
            None => {
                self.wins = 0;
                RoundOutcome::NoWinner
            }
            Some(hash) => {
                self.wins += 1;
                let past_floor = now.saturating_duration_since(self.created_at) >= self.floor();
                if self.wins >= CONFIRM_WINS_THRESHOLD && past_floor {
                    self.confirms += 1;
                    RoundOutcome::Confirmed { hash }
                } else {
                    RoundOutcome::Winning {
                        hash,
                        consecutive_wins: self.wins,
                    }
                }
            }
        }
    }

    fn floor(&self) -> Duration {
        if self.fork_found() {
            FORK_ROUND_INTERVAL.max(MIN_ELECTION_INTERVAL)
        } else {
            MIN_ELECTION_INTERVAL
        }
    }

    /// Total number of tally rounds run so far.
    pub fn rounds(&self) -> u32 {
        self.rounds
    }

    /// Total number of times this election has reached `Confirmed`.
    pub fn confirms(&self) -> u32 {
        self.confirms
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

    fn signed_vote(keypair: &meridian_types::KeyPair, hash: Hash, timestamp: i64) -> Vote {
        let signature = meridian_crypto::sign::sign_hash(keypair, &hash).expect("sign");
        Vote {
            timestamp,
            signature,
            hash,
        }
    }

    #[test]
    fn single_block_confirms_after_enough_wins_past_the_floor() {
        let account = Account([1u8; 32]);
        let rep = meridian_crypto::sign::generate_keypair();
        let hash = Hash([9u8; 32]);
        let mut election = Election::new(account, 1, hash, dummy_block(account, 1), Instant::now());
        let weights = StaticWeightTable::new([(rep.account, 100u128)]);

        election
            .add_vote(rep.account, signed_vote(&rep, hash, 1), &weights)
            .expect("add_vote");

        let mut now = Instant::now() + MIN_ELECTION_INTERVAL + Duration::from_millis(1);
        let mut last = RoundOutcome::NoWinner;
        for _ in 0..CONFIRM_WINS_THRESHOLD {
            last = election.tick(&weights, now);
            now += Duration::from_secs(1);
        }
        assert_eq!(last, RoundOutcome::Confirmed { hash });
    }

    #[test]
    fn below_threshold_weight_never_confirms() {
        let account = Account([2u8; 32]);
        let rep = meridian_crypto::sign::generate_keypair();
        let other = meridian_crypto::sign::generate_keypair();
        let hash = Hash([3u8; 32]);
        let mut election = Election::new(account, 1, hash, dummy_block(account, 1), Instant::now());
        let weights = StaticWeightTable::new([(rep.account, 10u128), (other.account, 90u128)]);

        election
            .add_vote(rep.account, signed_vote(&rep, hash, 1), &weights)
            .expect("add_vote");

        let outcome = election.tick(&weights, Instant::now() + MIN_ELECTION_INTERVAL);
        assert_eq!(outcome, RoundOutcome::NoWinner);
    }

    #[test]
    fn second_distinct_block_marks_fork() {
        let account = Account([4u8; 32]);
        let hash_a = Hash([1u8; 32]);
        let hash_b = Hash([2u8; 32]);
        let mut election = Election::new(account, 1, hash_a, dummy_block(account, 1), Instant::now());
        assert!(!election.fork_found());
        election.add_block_candidate(hash_b, dummy_block(account, 1));
        assert!(election.fork_found());
    }

    #[test]
    fn conflicting_vote_is_recorded_and_rejected_when_not_superseding() {
        let account = Account([5u8; 32]);
        let rep = meridian_crypto::sign::generate_keypair();
        let hash_a = Hash([1u8; 32]);
        let hash_b = Hash([2u8; 32]);
        let mut election = Election::new(account, 1, hash_a, dummy_block(account, 1), Instant::now());
        election.add_block_candidate(hash_b, dummy_block(account, 1));
        let weights = StaticWeightTable::new([(rep.account, 50u128)]);

        election
            .add_vote(rep.account, signed_vote(&rep, hash_a, 10), &weights)
            .expect("first vote");
        let result = election.add_vote(rep.account, signed_vote(&rep, hash_b, 5), &weights);
        assert_eq!(result, Err(ElectionError::ConflictingVote));
    }

    #[test]
    fn vote_for_unseen_block_is_rejected() {
        let account = Account([6u8; 32]);
        let rep = meridian_crypto::sign::generate_keypair();
        let hash_a = Hash([1u8; 32]);
        let hash_unseen = Hash([9u8; 32]);
        let mut election = Election::new(account, 1, hash_a, dummy_block(account, 1), Instant::now());
        let weights = StaticWeightTable::new([(rep.account, 50u128)]);
        let result = election.add_vote(rep.account, signed_vote(&rep, hash_unseen, 1), &weights);
        assert_eq!(result, Err(ElectionError::NoActiveElection));
    }
}
