// Path: crates/meridian-ledger/src/ledger.rs
//! The `Ledger` handle: opens the backing store and hands out transactions.

use std::path::Path;
use std::sync::Arc;

use crate::error::{from_redb_database, from_redb_table, from_redb_transaction, LedgerError};
use crate::metrics;
use crate::tables::{ACCOUNTS, BLOCKS, BLOCKS_INDEX, FORKS, META, RECEIVABLES, REWARDABLES, ROLLBACKS};
use crate::transaction::{ReadTxn, WriteTxn};

/// Oldest schema version this crate can open without a migration step.
pub const MIN_SUPPORTED_SCHEMA_VERSION: u32 = 1;
/// Schema version written by this crate when initializing a fresh store.
pub const CURRENT_SCHEMA_VERSION: u32 = 1;

/// A handle to the transactional account-chain store.
///
/// Read transactions may be opened concurrently without bound. Only one
/// write transaction may be open at a time; `redb` blocks a second
/// `begin_write` until the first is committed or dropped, which is what
/// gives the `BlockProcessor`'s single worker thread exclusive access to
/// mutate the ledger.
#[derive(Clone)]
pub struct Ledger {
    db: Arc<redb::Database>,
}

impl Ledger {
    /// Opens (creating if absent) the store at `path`, ensures every named
    /// table exists, and enforces the schema version invariant.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, LedgerError> {
        let db = redb::Database::create(path.as_ref()).map_err(from_redb_database)?;
        let ledger = Self { db: Arc::new(db) };
        ledger.init_tables_and_version()?;
        metrics::record_open();
        Ok(ledger)
    }

    fn init_tables_and_version(&self) -> Result<(), LedgerError> {
        let write = self.db.begin_write().map_err(from_redb_transaction)?;
        {
            write.open_table(ACCOUNTS).map_err(from_redb_table)?;
            write.open_table(BLOCKS).map_err(from_redb_table)?;
            write.open_table(BLOCKS_INDEX).map_err(from_redb_table)?;
            write.open_table(META).map_err(from_redb_table)?;
            write.open_table(RECEIVABLES).map_err(from_redb_table)?;
            write.open_table(REWARDABLES).map_err(from_redb_table)?;
            write.open_table(ROLLBACKS).map_err(from_redb_table)?;
            write.open_table(FORKS).map_err(from_redb_table)?;
        }
        let txn = WriteTxn { inner: write };
        match txn.version_get()? {
            Some(version) if version < MIN_SUPPORTED_SCHEMA_VERSION => {
                txn.abort();
                return Err(LedgerError::UnsupportedSchemaVersion(version));
            }
            Some(version) if version > CURRENT_SCHEMA_VERSION => {
                txn.abort();
                return Err(LedgerError::UnsupportedSchemaVersion(version));
            }
            Some(_) => {
                txn.abort();
            }
            None => {
                txn.version_put(CURRENT_SCHEMA_VERSION)?;
                txn.commit()?;
            }
        }
        Ok(())
    }

    /// Opens a read-only transaction. Never blocks on a concurrent writer;
    /// it observes the last committed state.
    pub fn begin_read(&self) -> Result<ReadTxn<'_>, LedgerError> {
        let inner = self.db.begin_read().map_err(from_redb_transaction)?;
        Ok(ReadTxn { inner })
    }

    /// Opens the single writable transaction slot, blocking until any prior
    /// write transaction has committed or aborted.
    pub fn begin_write(&self) -> Result<WriteTxn<'_>, LedgerError> {
        let inner = self.db.begin_write().map_err(from_redb_transaction)?;
        Ok(WriteTxn { inner })
    }

    /// Records that `count` blocks were appended in a just-committed write transaction.
    /// Called by the block processor after `commit()` succeeds.
    pub fn record_blocks_appended(&self, count: u64) {
        metrics::record_blocks_appended(count);
    }

    /// Records that `count` blocks were rolled back while resolving a fork.
    pub fn record_blocks_rolled_back(&self, count: u64) {
        metrics::record_blocks_rolled_back(count);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use meridian_types::block::{BlockCommon, Opcode, TransactionBlock};
    use meridian_types::primitives::{Account, Hash, Signature};
    use meridian_types::{AccountInfo, Block};

    #[test]
    fn open_creates_tables_and_writes_current_version() {
        let dir = tempfile::tempdir().expect("tempdir");
        let ledger = Ledger::open(dir.path().join("data.ldb")).expect("open");
        let read = ledger.begin_read().expect("begin_read");
        assert_eq!(read.version_get().expect("version_get"), Some(CURRENT_SCHEMA_VERSION));
    }

    #[test]
    fn reopen_keeps_persisted_account_info() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("data.ldb");
        let account = Account([7u8; 32]);
        {
            let ledger = Ledger::open(&path).expect("open");
            let write = ledger.begin_write().expect("begin_write");
            write
                .account_info_put(&account, &AccountInfo::genesis(Hash::ZERO))
                .expect("put");
            write.commit().expect("commit");
        }
        {
            let ledger = Ledger::open(&path).expect("reopen");
            let read = ledger.begin_read().expect("begin_read");
            let info = read.account_info_get(&account).expect("get").expect("present");
            assert_eq!(info.head_height, 0);
        }
    }

    #[test]
    fn write_transactions_are_exclusive() {
        let dir = tempfile::tempdir().expect("tempdir");
        let ledger = Ledger::open(dir.path().join("data.ldb")).expect("open");
        let write = ledger.begin_write().expect("first write");
        write.commit().expect("commit");
        let second = ledger.begin_write();
        assert!(second.is_ok());
    }

    fn dummy_block(account: Account, height: u64) -> Block {
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
    fn rollback_journal_round_trips_a_displaced_block() {
        let dir = tempfile::tempdir().expect("tempdir");
        let ledger = Ledger::open(dir.path().join("data.ldb")).expect("open");
        let account = Account([3u8; 32]);
        let displaced = dummy_block(account, 5);
        let displaced_hash = Hash([8u8; 32]);

        let write = ledger.begin_write().expect("begin_write");
        assert!(write.rollback_get(&displaced_hash).expect("rollback_get").is_none());
        write.rollback_put(&displaced_hash, &displaced).expect("rollback_put");
        write.commit().expect("commit");

        let read = ledger.begin_write().expect("begin_write again");
        let recovered = read.rollback_get(&displaced_hash).expect("rollback_get").expect("present");
        assert_eq!(recovered.account(), displaced.account());
        assert_eq!(recovered.height(), displaced.height());
    }
}
