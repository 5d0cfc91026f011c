// Path: crates/meridian-node/src/rewarder.rs
//! Runs the node's own reward-sweep account chain.
//!
//! Watches the ledger for `Rewardable`/`Receivable` entries addressed to the
//! node's account, turns matured ones into signed `reward`/`receive` blocks,
//! rate-limits how many it sends per UTC day, and republishes anything still
//! unconfirmed after [`SEND_INTERVAL`]. The signing key lives behind a
//! [`Fan`] split-key wrapper rather than a plain in-memory secret.

use std::collections::HashMap;
use std::time::Duration;

use meridian_crypto::hash::block_hash;
use meridian_crypto::sign::sign_hash;
use meridian_ledger::Ledger;
use meridian_types::block::{BlockCommon, BlockType, Opcode, TransactionBlock};
use meridian_types::error::RewarderError;
use meridian_types::keys::Fan;
use meridian_types::primitives::{Account, Amount, Hash};
use meridian_types::{Block, KeyPair};

/// How often an unconfirmed publish is resent while waiting on confirmation.
pub const SEND_INTERVAL: Duration = Duration::from_secs(60);

/// Ignore incoming transfers below this amount; not worth a `receive` block.
pub const MIN_RECEIVE_AMOUNT: Amount = 1;

struct PendingSend {
    block: Block,
    last_sent: Option<std::time::Instant>,
}

/// Emits and tracks confirmation of the node's own reward/receive blocks.
pub struct Rewarder {
    account: Account,
    key: Fan,
    forward_reward_to: Option<Account>,
    daily_forward_times: u32,
    sent_today: u32,
    current_day: u64,
    pending: HashMap<Hash, PendingSend>,
}

impl Rewarder {
    /// Builds a rewarder for `account`, signing with `secret` (immediately
    /// split across `fan_width` pads) and forwarding swept rewards to
    /// `forward_reward_to` if configured.
    pub fn new(
        account: Account,
        secret: [u8; 32],
        fan_width: usize,
        forward_reward_to: Option<Account>,
        daily_forward_times: u32,
    ) -> Self {
        Rewarder {
            account,
            key: Fan::new(&secret, fan_width),
            forward_reward_to,
            daily_forward_times,
            sent_today: 0,
            current_day: 0,
            pending: HashMap::new(),
        }
    }

    /// Number of blocks awaiting confirmation.
    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }

    /// Resets the daily send counter if `utc_day` has advanced since the last call.
    fn roll_day(&mut self, utc_day: u64) {
        if utc_day != self.current_day {
            self.current_day = utc_day;
            self.sent_today = 0;
        }
    }

    /// Scans the ledger for matured `Rewardable` and eligible `Receivable`
    /// entries addressed to this account and emits signed blocks for as many
    /// as the daily rate limit allows. Returns the blocks to submit to the
    /// processor, highest-priority first (rewards before receives).
    pub fn scan_and_emit(
        &mut self,
        ledger: &Ledger,
        now_unix: i64,
        utc_day: u64,
    ) -> Result<Vec<Block>, RewarderError> {
        self.roll_day(utc_day);

        let txn = ledger.begin_read()?;
        let info = txn
            .account_info_get(&self.account)?
            .ok_or(RewarderError::NoSigningKey)?;
        let (head_block, _) = txn
            .block_get(&info.head_hash)?
            .ok_or(RewarderError::NoSigningKey)?;

        let mut head = HeadCursor::from_block(&head_block, info.head_height);
        let mut emitted = Vec::new();

        for (source_hash, rewardable) in txn.rewardable_iterate(&self.account)? {
            if self.sent_today >= self.daily_forward_times {
                break;
            }
            if rewardable.valid_from_timestamp > now_unix {
                continue;
            }
            let block = self.build_block(&head, Opcode::Reward, source_hash, rewardable.amount)?;
            head.advance(&block);
            self.sent_today += 1;
            self.track(block.clone());
            emitted.push(block);
        }

        for (source_hash, receivable) in txn.receivable_iterate(&self.account)? {
            if self.sent_today >= self.daily_forward_times {
                break;
            }
            if receivable.amount < MIN_RECEIVE_AMOUNT {
                continue;
            }
            let block = self.build_block(&head, Opcode::Receive, source_hash, receivable.amount)?;
            head.advance(&block);
            self.sent_today += 1;
            self.track(block.clone());
            emitted.push(block);
        }

        Ok(emitted)
    }

    fn build_block(
        &self,
        head: &HeadCursor,
        opcode: Opcode,
        source_hash: Hash,
        amount: Amount,
    ) -> Result<Block, RewarderError> {
        let balance = head.balance.checked_add(amount).unwrap_or(head.balance);
        let mut common = BlockCommon {
            opcode,
            credit: head.credit,
            counter: head.counter + 1,
            timestamp: 0,
            height: head.height + 1,
            account: self.account,
            previous: head.hash,
            signature: Default::default(),
        };
        let timestamp = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .map(|d| d.as_secs() as i64)
            .unwrap_or(0);
        common.timestamp = timestamp;

        let mut block = Block::Tx(TransactionBlock {
            common,
            representative: head.representative,
            balance,
            link: source_hash,
            extensions: Vec::new(),
        });
        let hash = block_hash(&block);
        let keypair = KeyPair::from_raw(self.account.0, self.key.value());
        let signature = sign_hash(&keypair, &hash).map_err(|_| RewarderError::NoSigningKey)?;
        if let Block::Tx(tx) = &mut block {
            tx.common.signature = signature;
        }
        Ok(block)
    }

    fn track(&mut self, block: Block) {
        let hash = block_hash(&block);
        self.pending.insert(hash, PendingSend { block, last_sent: None });
    }

    /// The processor confirmed `hash`; stop tracking it for republication.
    pub fn confirmed(&mut self, hash: &Hash) {
        self.pending.remove(hash);
    }

    /// Every pending block whose last send was more than [`SEND_INTERVAL`] ago
    /// (or has never been sent), marked as sent `now`.
    pub fn due_for_republish(&mut self, now: std::time::Instant) -> Vec<Block> {
        let mut due = Vec::new();
        for pending in self.pending.values_mut() {
            let stale = pending
                .last_sent
                .map(|t| now.duration_since(t) >= SEND_INTERVAL)
                .unwrap_or(true);
            if stale {
                pending.last_sent = Some(now);
                due.push(pending.block.clone());
            }
        }
        due
    }
}

struct HeadCursor {
    hash: Hash,
    height: u64,
    counter: u32,
    credit: u16,
    representative: Account,
    balance: Amount,
}

impl HeadCursor {
    fn from_block(block: &Block, height: u64) -> Self {
        match block {
            Block::Tx(tx) => HeadCursor {
                hash: block_hash(block),
                height,
                counter: tx.common.counter,
                credit: tx.common.credit,
                representative: tx.representative,
                balance: tx.balance,
            },
            Block::Rep(rep) => HeadCursor {
                hash: block_hash(block),
                height,
                counter: rep.common.counter,
                credit: rep.common.credit,
                // A representative block carries no `representative` field of its own;
                // the node's reward chain never heads on one in practice.
                representative: Account::ZERO,
                balance: rep.balance,
            },
            Block::Ad(air) => HeadCursor {
                hash: block_hash(block),
                height,
                counter: air.common.counter,
                credit: air.common.credit,
                representative: air.representative,
                balance: air.balance,
            },
        }
    }

    fn advance(&mut self, block: &Block) {
        *self = HeadCursor::from_block(block, self.height + 1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use meridian_crypto::sign::generate_keypair;
    use meridian_types::account::RewardableInfo;
    use meridian_types::block::{BlockCommon as Common, Opcode as Op};
    use meridian_types::Amount as Amt;

    fn genesis_block(keypair: &KeyPair) -> Block {
        let mut block = Block::Tx(TransactionBlock {
            common: Common {
                opcode: Op::Change,
                credit: 1,
                counter: 0,
                timestamp: 0,
                height: 0,
                account: keypair.account,
                previous: Hash::ZERO,
                signature: Default::default(),
            },
            representative: keypair.account,
            balance: 0,
            link: Hash::ZERO,
            extensions: Vec::new(),
        });
        let hash = block_hash(&block);
        let signature = sign_hash(keypair, &hash).expect("sign");
        if let Block::Tx(tx) = &mut block {
            tx.common.signature = signature;
        }
        block
    }

    fn open_ledger() -> (Ledger, tempfile::TempDir) {
        let dir = tempfile::tempdir().expect("tempdir");
        let ledger = Ledger::open(&dir.path().join("ledger.redb")).expect("open ledger");
        (ledger, dir)
    }

    #[test]
    fn scan_and_emit_turns_a_matured_rewardable_into_a_reward_block() {
        let (ledger, _dir) = open_ledger();
        let keypair = generate_keypair();
        let block = genesis_block(&keypair);
        let hash = block_hash(&block);

        let txn = ledger.begin_write().expect("write");
        let info = meridian_types::account::AccountInfo::genesis(hash);
        txn.account_info_put(&keypair.account, &info).expect("put info");
        txn.block_put(&hash, &block, None).expect("put block");
        txn.block_index_put(&keypair.account, 0, &hash).expect("put index");
        txn.rewardable_put(
            &keypair.account,
            &Hash([7u8; 32]),
            &RewardableInfo {
                amount: 500 as Amt,
                valid_from_timestamp: 0,
            },
        )
        .expect("put rewardable");
        txn.commit().expect("commit");

        let mut rewarder = Rewarder::new(keypair.account, keypair.secret, 3, None, 10);
        let emitted = rewarder
            .scan_and_emit(&ledger, i64::MAX / 2, 1)
            .expect("scan");
        assert_eq!(emitted.len(), 1);
        assert_eq!(rewarder.pending_count(), 1);
    }

    #[test]
    fn daily_rate_limit_caps_emission() {
        let (ledger, _dir) = open_ledger();
        let keypair = generate_keypair();
        let block = genesis_block(&keypair);
        let hash = block_hash(&block);

        let txn = ledger.begin_write().expect("write");
        let info = meridian_types::account::AccountInfo::genesis(hash);
        txn.account_info_put(&keypair.account, &info).expect("put info");
        txn.block_put(&hash, &block, None).expect("put block");
        txn.block_index_put(&keypair.account, 0, &hash).expect("put index");
        for i in 0..5u8 {
            txn.rewardable_put(
                &keypair.account,
                &Hash([i; 32]),
                &RewardableInfo {
                    amount: 1,
                    valid_from_timestamp: 0,
                },
            )
            .expect("put rewardable");
        }
        txn.commit().expect("commit");

        let mut rewarder = Rewarder::new(keypair.account, keypair.secret, 3, None, 2);
        let emitted = rewarder
            .scan_and_emit(&ledger, i64::MAX / 2, 1)
            .expect("scan");
        assert_eq!(emitted.len(), 2);
    }
}
