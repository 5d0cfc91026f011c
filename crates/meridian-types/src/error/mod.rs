// Path: crates/meridian-types/src/error/mod.rs
//! Per-subsystem error types for the meridian ledger.
//!
//! Each subsystem gets its own `thiserror` enum rather than one flat error, but every
//! enum implements [`ErrorCode`] so a caller crossing subsystem boundaries still gets a
//! stable string identifier independent of the Rust type.

use thiserror::Error;

/// A trait for assigning a stable, machine-readable string code to an error.
pub trait ErrorCode {
    /// Returns the unique, stable string identifier for this error variant.
    fn code(&self) -> &'static str;
}

/// Errors from the `Ledger`'s transactional store.
#[derive(Debug, Error)]
pub enum LedgerError {
    /// The requested key does not exist in the named table.
    #[error("not found")]
    NotFound,
    /// A read from the backing store failed.
    #[error("store get failed: {0}")]
    StoreGet(String),
    /// A write to the backing store failed.
    #[error("store put failed: {0}")]
    StorePut(String),
    /// A delete against the backing store failed.
    #[error("store delete failed: {0}")]
    StoreDel(String),
    /// A stored value failed to (de)serialize.
    #[error("serialization failed: {0}")]
    Serialization(String),
    /// The account's invariants (`tail <= confirmed <= head`) would be violated by this write.
    #[error("account invariant violated for {0}")]
    InvariantViolated(String),
    /// The persisted schema version is older or newer than this crate supports.
    #[error("unsupported ledger schema version {0}")]
    UnsupportedSchemaVersion(u32),
}

impl ErrorCode for LedgerError {
    fn code(&self) -> &'static str {
        match self {
            Self::NotFound => "STORE_NOT_FOUND",
            Self::StoreGet(_) => "STORE_GET_FAILED",
            Self::StorePut(_) => "STORE_PUT_FAILED",
            Self::StoreDel(_) => "STORE_DEL_FAILED",
            Self::Serialization(_) => "STORE_SERIALIZATION_FAILED",
            Self::InvariantViolated(_) => "STORE_INVARIANT_VIOLATED",
            Self::UnsupportedSchemaVersion(_) => "STORE_UNSUPPORTED_SCHEMA_VERSION",
        }
    }
}

/// Errors validating an individual block, independent of chain context.
#[derive(Debug, Error)]
pub enum BlockError {
    /// The opcode is not valid for the block's type.
    #[error("opcode/type mismatch")]
    OpcodeTypeMismatch,
    /// The Ed25519 signature did not verify.
    #[error("bad signature")]
    BadSignature,
    /// The extensions payload exceeds the maximum permitted length.
    #[error("extensions too long")]
    ExtensionsTooLong,
    /// The timestamp is outside the permitted window around network time.
    #[error("timestamp out of window")]
    TimestampOutOfWindow,
    /// A `credit` block declared zero credits.
    #[error("zero credit")]
    ZeroCredit,
    /// The block failed to decode from its wire representation.
    #[error("wire decode failed: {0}")]
    WireDecode(String),
}

impl ErrorCode for BlockError {
    fn code(&self) -> &'static str {
        match self {
            Self::OpcodeTypeMismatch => "BLOCK_OPCODE_TYPE_MISMATCH",
            Self::BadSignature => "BLOCK_BAD_SIGNATURE",
            Self::ExtensionsTooLong => "BLOCK_EXTENSIONS_TOO_LONG",
            Self::TimestampOutOfWindow => "BLOCK_TIMESTAMP_OUT_OF_WINDOW",
            Self::ZeroCredit => "BLOCK_ZERO_CREDIT",
            Self::WireDecode(_) => "BLOCK_WIRE_DECODE_FAILED",
        }
    }
}

/// Errors from the `BlockProcessor`'s classification and commit pipeline.
#[derive(Debug, Error)]
pub enum ProcessorError {
    /// Structural or semantic validation failed; see the inner `BlockError`.
    #[error(transparent)]
    Block(#[from] BlockError),
    /// A ledger operation failed mid-transaction; the transaction was aborted.
    #[error(transparent)]
    Ledger(#[from] LedgerError),
    /// A subscribed app rejected the block inside the write transaction.
    #[error(transparent)]
    App(#[from] AppError),
    /// The block's height exceeds `head_height + 1`; a gap was opened, not an error path.
    #[error("gap at height {height}, missing predecessor")]
    Gap {
        /// The height of the block that could not yet be appended.
        height: u64,
    },
    /// A `receive` block referenced a receivable that does not exist (yet, or ever).
    #[error("missing receivable source")]
    MissingReceivableSource,
    /// A `reward` block referenced a rewardable that does not exist or is not yet valid.
    #[error("missing or not-yet-valid rewardable source")]
    MissingRewardableSource,
    /// The block's height is at or below `confirmed_height` but the hash differs: rejected.
    #[error("would violate finality at height {height}")]
    ViolatesFinality {
        /// The already-confirmed height this block conflicts with.
        height: u64,
    },
    /// Two distinct blocks were observed at the same `(account, height)`.
    #[error("fork at height {height}")]
    Fork {
        /// The height at which the fork was observed.
        height: u64,
    },
}

impl ErrorCode for ProcessorError {
    fn code(&self) -> &'static str {
        match self {
            Self::Block(e) => e.code(),
            Self::Ledger(e) => e.code(),
            Self::App(e) => e.code(),
            Self::Gap { .. } => "BLOCK_GAP",
            Self::MissingReceivableSource => "BLOCK_MISSING_RECEIVABLE_SOURCE",
            Self::MissingRewardableSource => "BLOCK_MISSING_REWARDABLE_SOURCE",
            Self::ViolatesFinality { .. } => "BLOCK_VIOLATES_FINALITY",
            Self::Fork { .. } => "BLOCK_FORK",
        }
    }
}

/// Errors from the `BlockQueries` outbound request tracker.
#[derive(Debug, Error)]
pub enum QueryError {
    /// No peer was available to send the query to.
    #[error("no peer available")]
    NoPeerAvailable,
    /// The query exhausted its retry budget without a definitive response.
    #[error("query timed out after {attempts} attempts")]
    Timeout {
        /// Number of attempts made before giving up.
        attempts: u32,
    },
    /// The only peers that could answer are pruned and this query requires a full node.
    #[error("requires a full-node peer")]
    RequiresFullNode,
}

impl ErrorCode for QueryError {
    fn code(&self) -> &'static str {
        match self {
            Self::NoPeerAvailable => "QUERY_NO_PEER_AVAILABLE",
            Self::Timeout { .. } => "QUERY_TIMEOUT",
            Self::RequiresFullNode => "QUERY_REQUIRES_FULL_NODE",
        }
    }
}

/// Errors from the `Elections` voting engine.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ElectionError {
    /// A vote's signature did not verify.
    #[error("bad vote signature")]
    BadVoteSignature,
    /// The voting representative is not known to have any weight.
    #[error("unknown representative")]
    UnknownRepresentative,
    /// The representative has already voted for a different block and is now conflicted.
    #[error("conflicting vote from representative")]
    ConflictingVote,
    /// No active election exists for the given `(account, height)`.
    #[error("no active election for this account/height")]
    NoActiveElection,
}

impl ErrorCode for ElectionError {
    fn code(&self) -> &'static str {
        match self {
            Self::BadVoteSignature => "ELECTION_BAD_VOTE_SIGNATURE",
            Self::UnknownRepresentative => "ELECTION_UNKNOWN_REPRESENTATIVE",
            Self::ConflictingVote => "ELECTION_CONFLICT",
            Self::NoActiveElection => "ELECTION_NOT_FOUND",
        }
    }
}

/// Errors from the per-account `Syncer` state machine.
#[derive(Debug, Error)]
pub enum SyncError {
    /// The syncer's in-flight account table is at `BUSY_SIZE` capacity.
    #[error("syncer is busy, at capacity")]
    Busy,
    /// The underlying query failed; see the inner `QueryError`.
    #[error(transparent)]
    Query(#[from] QueryError),
}

impl ErrorCode for SyncError {
    fn code(&self) -> &'static str {
        match self {
            Self::Busy => "SYNC_BUSY",
            Self::Query(e) => e.code(),
        }
    }
}

/// Errors from the `Rewarder`'s own-account automation.
#[derive(Debug, Error)]
pub enum RewarderError {
    /// The daily send rate limit has already been reached for the current UTC day.
    #[error("daily forward rate limit reached")]
    RateLimited,
    /// No signing key is configured for the node's own account.
    #[error("no signing key configured")]
    NoSigningKey,
    /// Emitting a block failed; see the inner `ProcessorError`.
    #[error(transparent)]
    Processor(#[from] ProcessorError),
    /// Reading the ledger to find matured entries failed.
    #[error(transparent)]
    Ledger(#[from] LedgerError),
}

impl ErrorCode for RewarderError {
    fn code(&self) -> &'static str {
        match self {
            Self::RateLimited => "REWARD_RATE_LIMITED",
            Self::NoSigningKey => "REWARD_NO_SIGNING_KEY",
            Self::Processor(e) => e.code(),
            Self::Ledger(e) => e.code(),
        }
    }
}

/// Errors from an `AppSubscriptions` hook invoked inside the processor's write
/// transaction.
#[derive(Debug, Error)]
pub enum AppError {
    /// A subscribed app rejected the block and the append must be aborted.
    #[error("app {app} rejected block: {reason}")]
    Rejected {
        /// The name the app registered itself under.
        app: String,
        /// The app-supplied reason for the rejection.
        reason: String,
    },
    /// A subscribed app's hook failed for a reason unrelated to block validity.
    #[error("app {app} hook failed: {reason}")]
    HookFailed {
        /// The name the app registered itself under.
        app: String,
        /// The underlying failure.
        reason: String,
    },
}

impl ErrorCode for AppError {
    fn code(&self) -> &'static str {
        match self {
            Self::Rejected { .. } => "APP_REJECTED",
            Self::HookFailed { .. } => "APP_HOOK_FAILED",
        }
    }
}

/// Errors loading or validating node configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The configuration file could not be parsed as JSON.
    #[error("failed to parse config: {0}")]
    Parse(String),
    /// The configuration declares a schema version newer than this crate supports.
    #[error("unsupported config schema version {0}")]
    UnsupportedVersion(u32),
    /// The configuration file could not be read from disk.
    #[error("failed to read config file: {0}")]
    Io(String),
}

impl ErrorCode for ConfigError {
    fn code(&self) -> &'static str {
        match self {
            Self::Parse(_) => "CONFIG_PARSE_FAILED",
            Self::UnsupportedVersion(_) => "CONFIG_UNSUPPORTED_VERSION",
            Self::Io(_) => "CONFIG_IO_ERROR",
        }
    }
}

/// An umbrella error for callers (CLI, tests) that don't need to match on a specific
/// subsystem's variants but still want the `?` operator and a stable code.
#[derive(Debug, Error)]
pub enum CoreError {
    /// A ledger error.
    #[error(transparent)]
    Ledger(#[from] LedgerError),
    /// A processor error.
    #[error(transparent)]
    Processor(#[from] ProcessorError),
    /// A query error.
    #[error(transparent)]
    Query(#[from] QueryError),
    /// An election error.
    #[error(transparent)]
    Election(#[from] ElectionError),
    /// A sync error.
    #[error(transparent)]
    Sync(#[from] SyncError),
    /// A rewarder error.
    #[error(transparent)]
    Rewarder(#[from] RewarderError),
    /// A config error.
    #[error(transparent)]
    Config(#[from] ConfigError),
    /// An app subscription error.
    #[error(transparent)]
    App(#[from] AppError),
}

impl ErrorCode for CoreError {
    fn code(&self) -> &'static str {
        match self {
            Self::Ledger(e) => e.code(),
            Self::Processor(e) => e.code(),
            Self::Query(e) => e.code(),
            Self::Election(e) => e.code(),
            Self::Sync(e) => e.code(),
            Self::Rewarder(e) => e.code(),
            Self::Config(e) => e.code(),
            Self::App(e) => e.code(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_codes_are_stable_strings() {
        assert_eq!(LedgerError::NotFound.code(), "STORE_NOT_FOUND");
        assert_eq!(BlockError::BadSignature.code(), "BLOCK_BAD_SIGNATURE");
        assert_eq!(
            ProcessorError::Gap { height: 5 }.code(),
            "BLOCK_GAP"
        );
    }

    #[test]
    fn core_error_delegates_code_through_from() {
        let e: CoreError = LedgerError::NotFound.into();
        assert_eq!(e.code(), "STORE_NOT_FOUND");
    }
}
