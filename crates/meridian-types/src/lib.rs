// Path: crates/meridian-types/src/lib.rs
#![forbid(unsafe_code)]
#![deny(missing_docs)]

//! # meridian-types
//!
//! Foundational data structures shared across the meridian ledger workspace:
//! the account-chain block model, account/receivable/rewardable records,
//! the hash-covered wire codec, key material, configuration, and the
//! per-subsystem error taxonomy.
//!
//! ## Architectural Role
//!
//! As the base crate, `meridian-types` has minimal dependencies and is
//! itself a dependency of almost every other crate in the workspace.

/// Maximum length in bytes of a transaction block's optional extensions blob.
pub const MAX_EXTENSIONS_BYTES: usize = 256;
/// Maximum allowed drift, in seconds, between a block's timestamp and network time at append.
pub const MAX_TIMESTAMP_DIFF_SECS: i64 = 300;

/// A top-level, crate-wide `Result` type alias for callers who don't need a specific error type.
pub type Result<T, E = crate::error::CoreError> = std::result::Result<T, E>;

/// Account identifiers, hashes, signatures and other fixed-width primitives.
pub mod primitives;
/// The `Block` data model: common fields, opcode/type combinations, variants.
pub mod block;
/// Per-account ledger records: `AccountInfo`, `ReceivableInfo`, `RewardableInfo`, fork records.
pub mod account;
/// The hash-covered big-endian wire codec (section 6 of the design).
pub mod wire;
/// Key material: `KeyPair`, `Kdf`, the `Fan` split-key wrapper, and `Genesis`.
pub mod keys;
/// Node configuration, JSON-backed and versioned.
pub mod config;
/// A unified set of per-subsystem error types with a shared `ErrorCode` trait.
pub mod error;

pub use account::{AccountInfo, ForkRecord, ReceivableInfo, RewardableInfo};
pub use block::{AirdropBlock, Block, BlockCommon, Opcode, RepresentativeBlock, TransactionBlock};
pub use keys::KeyPair;
pub use primitives::{Account, Amount, Hash, Signature};
