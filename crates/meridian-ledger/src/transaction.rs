// Path: crates/meridian-ledger/src/transaction.rs
//! Read and write transaction wrappers exposing the ledger's semantic operations.

use crate::error::{
    from_bincode_encode, from_redb_commit, from_redb_storage, from_redb_table, LedgerError,
};
use crate::tables::{
    k_account, k_account_hash, k_account_height, k_account_prefix, k_hash, k_meta, ACCOUNTS,
    BLOCKS, BLOCKS_INDEX, FORKS, META, RECEIVABLES, REWARDABLES, ROLLBACKS,
};
use meridian_types::primitives::{Account, Hash, Height};
use meridian_types::{AccountInfo, Block, ForkRecord, ReceivableInfo, RewardableInfo};
use redb::ReadableTable;
use serde::{Deserialize, Serialize};

/// The value stored in the `blocks` table: the block plus its forward pointer.
#[derive(Serialize, Deserialize)]
struct StoredBlock {
    block: Block,
    successor: Option<Hash>,
}

fn encode<T: Serialize>(value: &T) -> Result<Vec<u8>, LedgerError> {
    bincode::serialize(value).map_err(from_bincode_encode)
}

fn decode<T: for<'de> Deserialize<'de>>(bytes: &[u8]) -> Result<T, LedgerError> {
    bincode::deserialize(bytes).map_err(from_bincode_encode)
}

/// A read-only view over the ledger. Any number may be open concurrently.
pub struct ReadTxn<'db> {
    pub(crate) inner: redb::ReadTransaction<'db>,
}

impl<'db> ReadTxn<'db> {
    pub fn account_info_get(&self, account: &Account) -> Result<Option<AccountInfo>, LedgerError> {
        let table = self.inner.open_table(ACCOUNTS).map_err(from_redb_table)?;
        let result = match table.get(k_account(account).as_slice()).map_err(from_redb_storage)? {
            Some(bytes) => Ok(Some(decode(bytes.value())?)),
            None => Ok(None),
        };
        result
    }

    pub fn block_get(&self, hash: &Hash) -> Result<Option<(Block, Option<Hash>)>, LedgerError> {
        let table = self.inner.open_table(BLOCKS).map_err(from_redb_table)?;
        let result = match table.get(k_hash(hash).as_slice()).map_err(from_redb_storage)? {
            Some(bytes) => {
                let stored: StoredBlock = decode(bytes.value())?;
                Ok(Some((stored.block, stored.successor)))
            }
            None => Ok(None),
        };
        result
    }

    pub fn block_index_get(&self, account: &Account, height: Height) -> Result<Option<Hash>, LedgerError> {
        let table = self.inner.open_table(BLOCKS_INDEX).map_err(from_redb_table)?;
        let key = k_account_height(account, height);
        let result = match table.get(key.as_slice()).map_err(from_redb_storage)? {
            Some(bytes) => {
                let mut raw = [0u8; 32];
                raw.copy_from_slice(bytes.value());
                Ok(Some(Hash(raw)))
            }
            None => Ok(None),
        };
        result
    }

    pub fn fork_get(&self, account: &Account, height: Height) -> Result<Option<ForkRecord>, LedgerError> {
        let table = self.inner.open_table(FORKS).map_err(from_redb_table)?;
        let key = k_account_height(account, height);
        let result = match table.get(key.as_slice()).map_err(from_redb_storage)? {
            Some(bytes) => Ok(Some(decode(bytes.value())?)),
            None => Ok(None),
        };
        result
    }

    pub fn fork_iterate(&self, account: &Account) -> Result<Vec<(Height, ForkRecord)>, LedgerError> {
        let table = self.inner.open_table(FORKS).map_err(from_redb_table)?;
        let prefix = k_account_prefix(account);
        let mut out = Vec::new();
        for item in table.iter().map_err(from_redb_storage)? {
            let (key, value) = item.map_err(from_redb_storage)?;
            if key.value().starts_with(&prefix) {
                let height = height_from_suffix(key.value(), prefix.len())?;
                out.push((height, decode(value.value())?));
            }
        }
        Ok(out)
    }

    pub fn receivable_get(
        &self,
        destination: &Account,
        source_hash: &Hash,
    ) -> Result<Option<ReceivableInfo>, LedgerError> {
        let table = self.inner.open_table(RECEIVABLES).map_err(from_redb_table)?;
        let key = k_account_hash(destination, source_hash);
        let result = match table.get(key.as_slice()).map_err(from_redb_storage)? {
            Some(bytes) => Ok(Some(decode(bytes.value())?)),
            None => Ok(None),
        };
        result
    }

    pub fn receivable_count(&self, destination: &Account) -> Result<u64, LedgerError> {
        Ok(self.receivable_iterate(destination)?.len() as u64)
    }

    pub fn receivable_iterate(
        &self,
        destination: &Account,
    ) -> Result<Vec<(Hash, ReceivableInfo)>, LedgerError> {
        let table = self.inner.open_table(RECEIVABLES).map_err(from_redb_table)?;
        let prefix = k_account_prefix(destination);
        let mut out = Vec::new();
        for item in table.iter().map_err(from_redb_storage)? {
            let (key, value) = item.map_err(from_redb_storage)?;
            if key.value().starts_with(&prefix) {
                let hash = hash_from_suffix(key.value(), prefix.len())?;
                out.push((hash, decode(value.value())?));
            }
        }
        Ok(out)
    }

    pub fn rewardable_get(
        &self,
        representative: &Account,
        source_hash: &Hash,
    ) -> Result<Option<RewardableInfo>, LedgerError> {
        let table = self.inner.open_table(REWARDABLES).map_err(from_redb_table)?;
        let key = k_account_hash(representative, source_hash);
        let result = match table.get(key.as_slice()).map_err(from_redb_storage)? {
            Some(bytes) => Ok(Some(decode(bytes.value())?)),
            None => Ok(None),
        };
        result
    }

    pub fn rewardable_iterate(
        &self,
        representative: &Account,
    ) -> Result<Vec<(Hash, RewardableInfo)>, LedgerError> {
        let table = self.inner.open_table(REWARDABLES).map_err(from_redb_table)?;
        let prefix = k_account_prefix(representative);
        let mut out = Vec::new();
        for item in table.iter().map_err(from_redb_storage)? {
            let (key, value) = item.map_err(from_redb_storage)?;
            if key.value().starts_with(&prefix) {
                let hash = hash_from_suffix(key.value(), prefix.len())?;
                out.push((hash, decode(value.value())?));
            }
        }
        Ok(out)
    }

    pub fn rollback_get(&self, hash: &Hash) -> Result<Option<Block>, LedgerError> {
        let table = self.inner.open_table(ROLLBACKS).map_err(from_redb_table)?;
        let result = match table.get(k_hash(hash).as_slice()).map_err(from_redb_storage)? {
            Some(bytes) => Ok(Some(decode(bytes.value())?)),
            None => Ok(None),
        };
        result
    }

    pub fn version_get(&self) -> Result<Option<u32>, LedgerError> {
        let table = self.inner.open_table(META).map_err(from_redb_table)?;
        let result = match table
            .get(k_meta(crate::tables::VERSION_KEY_TAG).as_slice())
            .map_err(from_redb_storage)?
        {
            Some(bytes) => {
                let mut raw = [0u8; 4];
                raw.copy_from_slice(bytes.value());
                Ok(Some(u32::from_be_bytes(raw)))
            }
            None => Ok(None),
        };
        result
    }
}

fn hash_from_suffix(key: &[u8], prefix_len: usize) -> Result<Hash, LedgerError> {
    let suffix = key
        .get(prefix_len..prefix_len + 32)
        .ok_or_else(|| LedgerError::Serialization("malformed composite key".into()))?;
    let mut raw = [0u8; 32];
    raw.copy_from_slice(suffix);
    Ok(Hash(raw))
}

fn height_from_suffix(key: &[u8], prefix_len: usize) -> Result<Height, LedgerError> {
    let suffix = key
        .get(prefix_len..prefix_len + 8)
        .ok_or_else(|| LedgerError::Serialization("malformed composite key".into()))?;
    let mut raw = [0u8; 8];
    raw.copy_from_slice(suffix);
    Ok(Height::from_be_bytes(raw))
}

/// A writable transaction. Only one may be open at a time; redb enforces
/// this process-wide. On drop without `commit()`, the transaction aborts
/// and none of its writes become visible.
pub struct WriteTxn<'db> {
    pub(crate) inner: redb::WriteTransaction<'db>,
}

impl<'db> WriteTxn<'db> {
    pub fn account_info_get(&self, account: &Account) -> Result<Option<AccountInfo>, LedgerError> {
        let table = self.inner.open_table(ACCOUNTS).map_err(from_redb_table)?;
        let result = match table.get(k_account(account).as_slice()).map_err(from_redb_storage)? {
            Some(bytes) => Ok(Some(decode(bytes.value())?)),
            None => Ok(None),
        };
        result
    }

    pub fn account_info_put(&self, account: &Account, info: &AccountInfo) -> Result<(), LedgerError> {
        let mut table = self.inner.open_table(ACCOUNTS).map_err(from_redb_table)?;
        let key = k_account(account);
        let value = encode(info)?;
        table
            .insert(key.as_slice(), value.as_slice())
            .map_err(from_redb_storage)?;
        Ok(())
    }

    pub fn account_info_del(&self, account: &Account) -> Result<(), LedgerError> {
        let mut table = self.inner.open_table(ACCOUNTS).map_err(from_redb_table)?;
        table
            .remove(k_account(account).as_slice())
            .map_err(from_redb_storage)?;
        Ok(())
    }

    pub fn block_get(&self, hash: &Hash) -> Result<Option<(Block, Option<Hash>)>, LedgerError> {
        let table = self.inner.open_table(BLOCKS).map_err(from_redb_table)?;
        let result = match table.get(k_hash(hash).as_slice()).map_err(from_redb_storage)? {
            Some(bytes) => {
                let stored: StoredBlock = decode(bytes.value())?;
                Ok(Some((stored.block, stored.successor)))
            }
            None => Ok(None),
        };
        result
    }

    pub fn block_put(
        &self,
        hash: &Hash,
        block: &Block,
        successor: Option<Hash>,
    ) -> Result<(), LedgerError> {
        let mut table = self.inner.open_table(BLOCKS).map_err(from_redb_table)?;
        let stored = StoredBlock {
            block: block.clone(),
            successor,
        };
        let key = k_hash(hash);
        let value = encode(&stored)?;
        table
            .insert(key.as_slice(), value.as_slice())
            .map_err(from_redb_storage)?;
        Ok(())
    }

    pub fn block_del(&self, hash: &Hash) -> Result<(), LedgerError> {
        let mut table = self.inner.open_table(BLOCKS).map_err(from_redb_table)?;
        table.remove(k_hash(hash).as_slice()).map_err(from_redb_storage)?;
        Ok(())
    }

    /// Rewires the forward pointer of the block stored at `hash`, used by peers
    /// that query by previous hash.
    pub fn block_successor_set(&self, hash: &Hash, successor: Hash) -> Result<(), LedgerError> {
        let (block, _) = self.block_get(hash)?.ok_or(LedgerError::NotFound)?;
        self.block_put(hash, &block, Some(successor))
    }

    pub fn block_index_put(&self, account: &Account, height: Height, hash: &Hash) -> Result<(), LedgerError> {
        let mut table = self.inner.open_table(BLOCKS_INDEX).map_err(from_redb_table)?;
        let key = k_account_height(account, height);
        table
            .insert(key.as_slice(), hash.as_bytes().as_slice())
            .map_err(from_redb_storage)?;
        Ok(())
    }

    pub fn block_index_get(&self, account: &Account, height: Height) -> Result<Option<Hash>, LedgerError> {
        let table = self.inner.open_table(BLOCKS_INDEX).map_err(from_redb_table)?;
        let key = k_account_height(account, height);
        let result = match table.get(key.as_slice()).map_err(from_redb_storage)? {
            Some(bytes) => {
                let mut raw = [0u8; 32];
                raw.copy_from_slice(bytes.value());
                Ok(Some(Hash(raw)))
            }
            None => Ok(None),
        };
        result
    }

    pub fn block_index_del(&self, account: &Account, height: Height) -> Result<(), LedgerError> {
        let mut table = self.inner.open_table(BLOCKS_INDEX).map_err(from_redb_table)?;
        let key = k_account_height(account, height);
        table.remove(key.as_slice()).map_err(from_redb_storage)?;
        Ok(())
    }

    pub fn fork_put(&self, account: &Account, height: Height, record: &ForkRecord) -> Result<(), LedgerError> {
        let mut table = self.inner.open_table(FORKS).map_err(from_redb_table)?;
        let key = k_account_height(account, height);
        let value = encode(record)?;
        table
            .insert(key.as_slice(), value.as_slice())
            .map_err(from_redb_storage)?;
        Ok(())
    }

    pub fn fork_get(&self, account: &Account, height: Height) -> Result<Option<ForkRecord>, LedgerError> {
        let table = self.inner.open_table(FORKS).map_err(from_redb_table)?;
        let key = k_account_height(account, height);
        let result = match table.get(key.as_slice()).map_err(from_redb_storage)? {
            Some(bytes) => Ok(Some(decode(bytes.value())?)),
            None => Ok(None),
        };
        result
    }

    pub fn fork_del(&self, account: &Account, height: Height) -> Result<(), LedgerError> {
        let mut table = self.inner.open_table(FORKS).map_err(from_redb_table)?;
        let key = k_account_height(account, height);
        table.remove(key.as_slice()).map_err(from_redb_storage)?;
        Ok(())
    }

    pub fn receivable_put(
        &self,
        destination: &Account,
        source_hash: &Hash,
        info: &ReceivableInfo,
    ) -> Result<(), LedgerError> {
        let mut table = self.inner.open_table(RECEIVABLES).map_err(from_redb_table)?;
        let key = k_account_hash(destination, source_hash);
        let value = encode(info)?;
        table
            .insert(key.as_slice(), value.as_slice())
            .map_err(from_redb_storage)?;
        Ok(())
    }

    pub fn receivable_get(
        &self,
        destination: &Account,
        source_hash: &Hash,
    ) -> Result<Option<ReceivableInfo>, LedgerError> {
        let table = self.inner.open_table(RECEIVABLES).map_err(from_redb_table)?;
        let key = k_account_hash(destination, source_hash);
        let result = match table.get(key.as_slice()).map_err(from_redb_storage)? {
            Some(bytes) => Ok(Some(decode(bytes.value())?)),
            None => Ok(None),
        };
        result
    }

    pub fn receivable_del(&self, destination: &Account, source_hash: &Hash) -> Result<(), LedgerError> {
        let mut table = self.inner.open_table(RECEIVABLES).map_err(from_redb_table)?;
        let key = k_account_hash(destination, source_hash);
        table.remove(key.as_slice()).map_err(from_redb_storage)?;
        Ok(())
    }

    pub fn rewardable_put(
        &self,
        representative: &Account,
        source_hash: &Hash,
        info: &RewardableInfo,
    ) -> Result<(), LedgerError> {
        let mut table = self.inner.open_table(REWARDABLES).map_err(from_redb_table)?;
        let key = k_account_hash(representative, source_hash);
        let value = encode(info)?;
        table
            .insert(key.as_slice(), value.as_slice())
            .map_err(from_redb_storage)?;
        Ok(())
    }

    pub fn rewardable_get(
        &self,
        representative: &Account,
        source_hash: &Hash,
    ) -> Result<Option<RewardableInfo>, LedgerError> {
        let table = self.inner.open_table(REWARDABLES).map_err(from_redb_table)?;
        let key = k_account_hash(representative, source_hash);
        let result = match table.get(key.as_slice()).map_err(from_redb_storage)? {
            Some(bytes) => Ok(Some(decode(bytes.value())?)),
            None => Ok(None),
        };
        result
    }

    pub fn rewardable_del(&self, representative: &Account, source_hash: &Hash) -> Result<(), LedgerError> {
        let mut table = self.inner.open_table(REWARDABLES).map_err(from_redb_table)?;
        let key = k_account_hash(representative, source_hash);
        table.remove(key.as_slice()).map_err(from_redb_storage)?;
        Ok(())
    }

    pub fn rollback_put(&self, hash: &Hash, block: &Block) -> Result<(), LedgerError> {
        let mut table = self.inner.open_table(ROLLBACKS).map_err(from_redb_table)?;
        let key = k_hash(hash);
        let value = encode(block)?;
        table
            .insert(key.as_slice(), value.as_slice())
            .map_err(from_redb_storage)?;
        Ok(())
    }

    pub fn rollback_get(&self, hash: &Hash) -> Result<Option<Block>, LedgerError> {
        let table = self.inner.open_table(ROLLBACKS).map_err(from_redb_table)?;
        let result = match table.get(k_hash(hash).as_slice()).map_err(from_redb_storage)? {
            Some(bytes) => Ok(Some(decode(bytes.value())?)),
            None => Ok(None),
        };
        result
    }

    pub fn version_get(&self) -> Result<Option<u32>, LedgerError> {
        let table = self.inner.open_table(META).map_err(from_redb_table)?;
        let result = match table
            .get(k_meta(crate::tables::VERSION_KEY_TAG).as_slice())
            .map_err(from_redb_storage)?
        {
            Some(bytes) => {
                let mut raw = [0u8; 4];
                raw.copy_from_slice(bytes.value());
                Ok(Some(u32::from_be_bytes(raw)))
            }
            None => Ok(None),
        };
        result
    }

    pub fn version_put(&self, version: u32) -> Result<(), LedgerError> {
        let mut table = self.inner.open_table(META).map_err(from_redb_table)?;
        let key = k_meta(crate::tables::VERSION_KEY_TAG);
        table
            .insert(key.as_slice(), version.to_be_bytes().as_slice())
            .map_err(from_redb_storage)?;
        Ok(())
    }

    /// Commits the transaction, making all writes visible to subsequent transactions.
    pub fn commit(self) -> Result<(), LedgerError> {
        self.inner.commit().map_err(from_redb_commit)
    }

    /// Explicitly aborts the transaction. Dropping without calling `commit` has the
    /// same effect.
    pub fn abort(self) {
        drop(self.inner);
    }
}
