// Path: crates/meridian-ledger/src/lib.rs
#![cfg_attr(
    not(test),
    deny(
        clippy::unwrap_used,
        clippy::expect_used,
        clippy::panic,
        clippy::unimplemented,
        clippy::todo,
        clippy::indexing_slicing
    )
)]

//! Pure-Rust transactional storage for the account-chain ledger.
//!
//! Realizes the schema described for an LMDB-backed store (named tables for
//! accounts, blocks, the block index, receivables, rewardables, the rollback
//! journal, forks and schema metadata) on top of `redb`. A writable
//! transaction holds redb's own process-wide exclusive write lock; any
//! number of read transactions proceed concurrently, matching the
//! single-writer contract the `BlockProcessor` depends on.

pub mod error;
pub mod ledger;
pub mod metrics;
pub mod tables;
pub mod transaction;

pub use ledger::Ledger;
pub use transaction::{ReadTxn, WriteTxn};
