// Path: crates/meridian-app/src/hooks.rs
//! The hook surface a subscribed app implements.

use meridian_ledger::transaction::WriteTxn;
use meridian_types::error::AppError;
use meridian_types::primitives::{Account, Hash};
use meridian_types::Block;

/// An application's view into the processor's block append/rollback pipeline.
///
/// Every method runs inside the processor's own ledger write transaction: an
/// app may read and write its own tables through `txn`, but must not retain
/// `txn` past the call, and a `Rejected` error aborts the whole transaction,
/// the block included.
pub trait AppHooks: Send + Sync {
    /// The name this app registered itself under, used in error messages and
    /// telemetry labels.
    fn name(&self) -> &str;

    /// Called before `block` is written to the ledger. Returning an error
    /// aborts the append.
    fn pre_block_append(&self, txn: &WriteTxn<'_>, account: &Account, block: &Block) -> Result<(), AppError>;

    /// Called after `block` has been written to the ledger, still inside the
    /// same write transaction.
    fn after_block_append(&self, txn: &WriteTxn<'_>, account: &Account, block: &Block) -> Result<(), AppError>;

    /// Called before the block at `(account, hash)` is removed from the
    /// ledger during a rollback.
    fn pre_block_rollback(&self, txn: &WriteTxn<'_>, account: &Account, hash: &Hash) -> Result<(), AppError>;

    /// Called after the block at `(account, hash)` has been removed from the
    /// ledger, still inside the same write transaction.
    fn after_block_rollback(&self, txn: &WriteTxn<'_>, account: &Account, hash: &Hash) -> Result<(), AppError>;

    /// Called once a client subscribes to `account`'s updates, outside any
    /// ledger transaction. `existing` is true if the account already had a
    /// chain at subscription time.
    fn after_subscribe(&self, account: &Account, existing: bool);

    /// Called before a client's subscription to `account` is torn down.
    fn pre_unsubscribe(&self, account: &Account);
}
