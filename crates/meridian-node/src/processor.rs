// Path: crates/meridian-node/src/processor.rs
//! The single-writer engine that serializes every state-changing operation on
//! the ledger.
//!
//! Every append, prepend, rollback, and confirm enters a priority queue; a
//! single worker pulls one operation at a time, opens a write transaction,
//! classifies and validates it, commits, and fires observers after commit.
//! There is deliberately no background thread here: [`BlockProcessor::drain`]
//! is the cooperative pump a node's single dedicated worker calls in a loop,
//! mirroring the single-writer contract the election [`crate`]-sibling
//! scheduler uses for its own cooperative tick loop.

use std::cmp::Ordering;
use std::collections::BinaryHeap;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use meridian_app::AppSubscriptions;
use meridian_crypto::hash::block_hash;
use meridian_crypto::sign::verify_hash;
use meridian_ledger::Ledger;
use meridian_types::account::{AccountInfo, ForkRecord, ReceivableInfo, RewardableInfo};
use meridian_types::error::{BlockError, ProcessorError};
use meridian_types::primitives::{Account, Hash, Height};
use meridian_types::{Block, Opcode};

use crate::gap_cache::GapCache;
use crate::metrics;

/// Maximum allowed drift between a block's signed timestamp and local time.
pub const TIMESTAMP_WINDOW: Duration = Duration::from_secs(300);

/// The four priority tiers a queued operation is dispatched under, highest first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Priority {
    /// An explicit command from Elections/Rewarder (e.g. forced confirm).
    Forced = 3,
    /// A newly gossiped block resolving an existing gap.
    NewWithLink = 2,
    /// A block being retried after a transient failure.
    Retry = 1,
    /// Anything else.
    Low = 0,
}

/// The operation a queue entry carries.
pub enum Operation {
    /// An inbound block of unknown state.
    Add(Block),
    /// A forced confirm up to `height` on `account`.
    Confirm { account: Account, height: Height },
}

struct QueueEntry {
    priority: Priority,
    arrival: u64,
    operation: Operation,
}

impl PartialEq for QueueEntry {
    fn eq(&self, other: &Self) -> bool {
        self.priority == other.priority && self.arrival == other.arrival
    }
}
impl Eq for QueueEntry {}
impl PartialOrd for QueueEntry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}
impl Ord for QueueEntry {
    fn cmp(&self, other: &Self) -> Ordering {
        // Higher priority first; within a priority, earlier arrival first.
        self.priority
            .cmp(&other.priority)
            .then_with(|| other.arrival.cmp(&self.arrival))
    }
}

/// What happened to a processed block, reported to observers after commit.
#[derive(Debug, Clone)]
pub enum Outcome {
    /// The block was appended at the head of its chain.
    Appended { account: Account, hash: Hash },
    /// The block filled in below the retained tail (bootstrap fill).
    Prepended { account: Account, hash: Hash },
    /// The block exactly matches what's already stored; idempotent no-op.
    AlreadyExists { account: Account, hash: Hash },
    /// A second, conflicting block was observed at an existing height.
    Fork { account: Account, height: Height },
    /// The block's predecessor is missing; stashed in the gap cache.
    Gap { account: Account, missing: Hash },
    /// `confirmed_height` advanced to `height`.
    Confirmed { account: Account, height: Height },
}

/// A post-commit event fired to every registered observer.
pub struct Event {
    /// What happened.
    pub outcome: Outcome,
    /// Set when the operation failed instead of producing an `Outcome`.
    pub error: Option<ProcessorError>,
}

/// The single-writer block processing engine.
pub struct BlockProcessor {
    ledger: Ledger,
    queue: BinaryHeap<QueueEntry>,
    next_arrival: u64,
    gap_cache: GapCache,
    apps: AppSubscriptions,
    observers: Vec<Box<dyn Fn(&Event) + Send + Sync>>,
}

impl BlockProcessor {
    /// Builds a processor writing to `ledger`.
    pub fn new(ledger: Ledger) -> Self {
        BlockProcessor {
            ledger,
            queue: BinaryHeap::new(),
            next_arrival: 0,
            gap_cache: GapCache::new(),
            apps: AppSubscriptions::new(),
            observers: Vec::new(),
        }
    }

    /// Registers `hooks` to receive every post-commit block-append/rollback callback.
    pub fn subscribe_app(&mut self, hooks: std::sync::Arc<dyn meridian_app::AppHooks>) {
        self.apps.register(hooks);
    }

    /// Registers a closure to receive every post-commit [`Event`].
    pub fn observe(&mut self, observer: impl Fn(&Event) + Send + Sync + 'static) {
        self.observers.push(Box::new(observer));
    }

    /// Number of operations currently queued.
    pub fn queue_len(&self) -> usize {
        self.queue.len()
    }

    /// Enqueues an inbound block of unknown state.
    pub fn add(&mut self, block: Block, priority: Priority) {
        self.push(priority, Operation::Add(block));
    }

    /// Enqueues an explicit confirm command at `Priority::Forced`.
    pub fn add_forced_confirm(&mut self, account: Account, height: Height) {
        self.push(Priority::Forced, Operation::Confirm { account, height });
    }

    fn push(&mut self, priority: Priority, operation: Operation) {
        let arrival = self.next_arrival;
        self.next_arrival += 1;
        self.queue.push(QueueEntry {
            priority,
            arrival,
            operation,
        });
    }

    /// Pulls and processes the single highest-priority queued operation, if any.
    pub fn drain_one(&mut self) -> Option<Event> {
        let entry = self.queue.pop()?;
        let event = match entry.operation {
            Operation::Add(block) => self.process_add(block),
            Operation::Confirm { account, height } => self.process_confirm(account, height),
        };
        for observer in &self.observers {
            observer(&event);
        }
        Some(event)
    }

    fn process_add(&mut self, block: Block) -> Event {
        match self.try_append(&block) {
            Ok(outcome) => Event { outcome, error: None },
            Err(ProcessorError::Gap { height: _ }) => {
                let account = block.account();
                let missing = block.previous();
                let hash = block_hash(&block);
                let _ = self.gap_cache.insert(missing, account, block, std::time::Instant::now());
                Event {
                    outcome: Outcome::Gap { account, missing: hash },
                    error: None,
                }
            }
            Err(err @ ProcessorError::MissingReceivableSource) | Err(err @ ProcessorError::MissingRewardableSource) => {
                let account = block.account();
                let missing = Hash(block.link().0);
                let hash = block_hash(&block);
                let _ = self.gap_cache.insert(missing, account, block, std::time::Instant::now());
                Event {
                    outcome: Outcome::Gap { account, missing },
                    error: Some(err),
                }
            }
            Err(err) => Event {
                outcome: Outcome::AlreadyExists {
                    account: block.account(),
                    hash: block_hash(&block),
                },
                error: Some(err),
            },
        }
    }

    fn process_confirm(&mut self, account: Account, height: Height) -> Event {
        let result = (|| -> Result<(), ProcessorError> {
            let txn = self.ledger.begin_write()?;
            let mut info = txn.account_info_get(&account)?.ok_or(ProcessorError::Gap { height })?;
            info.confirmed_height = Some(height.max(info.confirmed_height.unwrap_or(0)));
            txn.account_info_put(&account, &info)?;
            txn.commit()?;
            Ok(())
        })();
        metrics::elections().inc_confirms();
        Event {
            outcome: Outcome::Confirmed { account, height },
            error: result.err(),
        }
    }

    /// Resubmits every gap-cache entry older than `horizon`, in case its
    /// dependency landed via another path since it was stashed.
    pub fn sweep_gap_cache(&mut self, horizon: Duration) {
        let stale = self.gap_cache.evict_older_than(horizon, std::time::Instant::now());
        for (_, block) in stale {
            self.add(block, Priority::Retry);
        }
    }

    /// Notifies the processor that `hash` has landed, re-submitting any block that
    /// was waiting on it.
    pub fn resolve_gap(&mut self, hash: &Hash) {
        if let Some(block) = self.gap_cache.take(hash) {
            self.add(block, Priority::NewWithLink);
        }
    }

    fn try_append(&self, block: &Block) -> Result<Outcome, ProcessorError> {
        block.check_structure().map_err(|_| BlockError::OpcodeTypeMismatch)?;
        validate_timestamp(block.timestamp())?;

        let account = block.account();
        let hash = block_hash(block);
        verify_hash(&account, &hash, &block.common().signature)
            .map_err(|_| BlockError::BadSignature)?;

        let txn = self.ledger.begin_write()?;
        let existing_info = txn.account_info_get(&account)?;

        let outcome = match existing_info {
            None => self.append_genesis(&txn, block, hash)?,
            Some(info) => self.classify_against(&txn, &info, block, hash)?,
        };

        txn.commit()?;
        Ok(outcome)
    }

    fn append_genesis(
        &self,
        txn: &meridian_ledger::transaction::WriteTxn<'_>,
        block: &Block,
        hash: Hash,
    ) -> Result<Outcome, ProcessorError> {
        if block.height() != 0 {
            return Err(ProcessorError::Gap { height: block.height() });
        }
        self.apply_semantics(txn, block, hash)?;
        let info = AccountInfo::genesis(hash);
        txn.account_info_put(&block.account(), &info)?;
        txn.block_put(&hash, block, None)?;
        txn.block_index_put(&block.account(), 0, &hash)?;
        self.apps.after_block_append(txn, &block.account(), block)?;
        metrics::ledger().inc_blocks_appended(1);
        Ok(Outcome::Appended {
            account: block.account(),
            hash,
        })
    }

    fn classify_against(
        &self,
        txn: &meridian_ledger::transaction::WriteTxn<'_>,
        info: &AccountInfo,
        block: &Block,
        hash: Hash,
    ) -> Result<Outcome, ProcessorError> {
        let account = block.account();
        let height = block.height();

        if let Some(existing_hash) = txn.block_index_get(&account, height)? {
            if existing_hash == hash {
                return Ok(Outcome::AlreadyExists { account, hash });
            }
            if let Some(confirmed) = info.confirmed_height {
                if height <= confirmed {
                    return Err(ProcessorError::ViolatesFinality { height });
                }
            }
            return self.record_fork(txn, &account, height, &existing_hash, block);
        }

        if height == info.head_height + 1 && block.previous() == info.head_hash {
            self.apps.pre_block_append(txn, &account, block)?;
            self.apply_semantics(txn, block, hash)?;
            let mut updated = info.clone();
            updated.head_hash = hash;
            updated.head_height = height;
            txn.account_info_put(&account, &updated)?;
            txn.block_put(&hash, block, None)?;
            txn.block_successor_set(&block.previous(), hash)?;
            txn.block_index_put(&account, height, &hash)?;
            self.apps.after_block_append(txn, &account, block)?;
            metrics::ledger().inc_blocks_appended(1);
            return Ok(Outcome::Appended { account, hash });
        }

        if info.tail_height > 0 && height == info.tail_height - 1 {
            if let Some((tail_block, _)) = txn.block_get(&info.tail_hash)? {
                if tail_block.previous() == hash {
                    txn.block_put(&hash, block, Some(info.tail_hash))?;
                    txn.block_index_put(&account, height, &hash)?;
                    let mut updated = info.clone();
                    updated.tail_hash = hash;
                    updated.tail_height = height;
                    txn.account_info_put(&account, &updated)?;
                    return Ok(Outcome::Prepended { account, hash });
                }
            }
        }

        if height > info.head_height + 1 {
            return Err(ProcessorError::Gap { height });
        }

        if let Some(confirmed) = info.confirmed_height {
            if height <= confirmed {
                return Err(ProcessorError::ViolatesFinality { height });
            }
        }

        // No index entry in [tail, head] for this height: the block contests
        // the chain's current head rather than a specific stored competitor.
        self.record_fork(txn, &account, height, &info.head_hash, block)
    }

    /// Records a fork between the already-indexed block at `(account, height)`
    /// and the newly observed `incoming`, then reports it for the caller to
    /// surface via elections/queries without aborting the write transaction.
    fn record_fork(
        &self,
        txn: &meridian_ledger::transaction::WriteTxn<'_>,
        account: &Account,
        height: Height,
        existing_hash: &Hash,
        incoming: &Block,
    ) -> Result<Outcome, ProcessorError> {
        let (existing_block, _) = txn
            .block_get(existing_hash)?
            .ok_or(ProcessorError::Gap { height })?;
        let record = ForkRecord {
            first: existing_block,
            second: incoming.clone(),
        };
        txn.fork_put(account, height, &record)?;
        metrics::elections().inc_forks_detected();
        Ok(Outcome::Fork {
            account: *account,
            height,
        })
    }

    fn apply_semantics(
        &self,
        txn: &meridian_ledger::transaction::WriteTxn<'_>,
        block: &Block,
        hash: Hash,
    ) -> Result<(), ProcessorError> {
        match block.opcode() {
            Opcode::Send => {
                let previous_balance = if block.previous() == Hash::ZERO {
                    0
                } else {
                    let (previous_block, _) = txn
                        .block_get(&block.previous())?
                        .ok_or(ProcessorError::MissingReceivableSource)?;
                    previous_block.balance()
                };
                let amount = previous_balance.saturating_sub(block.balance());
                txn.receivable_put(
                    &Account(block.link().0),
                    &hash,
                    &ReceivableInfo {
                        amount,
                        source_account: block.account(),
                        source_timestamp: block.timestamp(),
                    },
                )?;
            }
            Opcode::Receive => {
                let source_hash = Hash(block.link().0);
                txn.receivable_get(&block.account(), &source_hash)?
                    .ok_or(ProcessorError::MissingReceivableSource)?;
                txn.receivable_del(&block.account(), &source_hash)?;
            }
            Opcode::Reward => {
                let source_hash = Hash(block.link().0);
                let rewardable = txn
                    .rewardable_get(&block.account(), &source_hash)?
                    .ok_or(ProcessorError::MissingRewardableSource)?;
                if rewardable.valid_from_timestamp > block.timestamp() {
                    return Err(ProcessorError::MissingRewardableSource);
                }
                txn.rewardable_del(&block.account(), &source_hash)?;
            }
            Opcode::Change | Opcode::Credit | Opcode::Destroy | Opcode::Bind => {}
        }
        Ok(())
    }
}

fn validate_timestamp(timestamp: i64) -> Result<(), BlockError> {
    let now = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or(Duration::ZERO)
        .as_secs() as i64;
    if timestamp > now + TIMESTAMP_WINDOW.as_secs() as i64 {
        return Err(BlockError::TimestampOutOfWindow);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use meridian_crypto::sign::{generate_keypair, sign_hash};
    use meridian_types::block::{BlockCommon, TransactionBlock};

    fn genesis_block(keypair: &meridian_types::KeyPair) -> Block {
        let mut block = Block::Tx(TransactionBlock {
            common: BlockCommon {
                opcode: Opcode::Change,
                credit: 1,
                counter: 0,
                timestamp: 0,
                height: 0,
                account: keypair.account,
                previous: Hash::ZERO,
                signature: Default::default(),
            },
            representative: keypair.account,
            balance: 10_000_000,
            link: Hash::ZERO,
            extensions: Vec::new(),
        });
        sign_block(&mut block, keypair);
        block
    }

    fn sign_block(block: &mut Block, keypair: &meridian_types::KeyPair) {
        let hash = block_hash(block);
        let signature = sign_hash(keypair, &hash).expect("sign");
        if let Block::Tx(tx) = block {
            tx.common.signature = signature;
        }
    }

    fn open_processor() -> (BlockProcessor, tempfile::TempDir) {
        let dir = tempfile::tempdir().expect("tempdir");
        let ledger = Ledger::open(&dir.path().join("ledger.redb")).expect("open ledger");
        (BlockProcessor::new(ledger), dir)
    }

    #[test]
    fn genesis_block_appends_as_head_and_tail() {
        let (mut processor, _dir) = open_processor();
        let keypair = generate_keypair();
        let block = genesis_block(&keypair);
        processor.add(block, Priority::Low);
        let event = processor.drain_one().expect("one event");
        assert!(event.error.is_none());
        assert!(matches!(event.outcome, Outcome::Appended { .. }));
    }

    #[test]
    fn duplicate_genesis_is_idempotent() {
        let (mut processor, _dir) = open_processor();
        let keypair = generate_keypair();
        let block = genesis_block(&keypair);
        processor.add(block.clone(), Priority::Low);
        processor.drain_one();
        processor.add(block, Priority::Low);
        let event = processor.drain_one().expect("one event");
        assert!(matches!(event.outcome, Outcome::AlreadyExists { .. }));
    }

    #[test]
    fn height_beyond_head_plus_one_is_a_gap() {
        let (mut processor, _dir) = open_processor();
        let keypair = generate_keypair();
        processor.add(genesis_block(&keypair), Priority::Low);
        processor.drain_one();

        let mut next = Block::Tx(TransactionBlock {
            common: BlockCommon {
                opcode: Opcode::Change,
                credit: 1,
                counter: 1,
                timestamp: 0,
                height: 5,
                account: keypair.account,
                previous: Hash::ZERO,
                signature: Default::default(),
            },
            representative: keypair.account,
            balance: 10_000_000,
            link: Hash::ZERO,
            extensions: Vec::new(),
        });
        sign_block(&mut next, &keypair);
        processor.add(next, Priority::Low);
        let event = processor.drain_one().expect("one event");
        assert!(matches!(event.outcome, Outcome::Gap { .. }));
    }

    #[test]
    fn timestamp_far_in_the_future_is_rejected() {
        assert!(validate_timestamp(i64::MAX).is_err());
        assert!(validate_timestamp(0).is_ok());
    }
}
