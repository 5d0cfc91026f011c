// Path: crates/meridian-ledger/src/error.rs
//! Re-exports and conversions into the shared ledger error type.

pub use meridian_types::error::LedgerError;

pub(crate) fn from_redb_table(e: redb::TableError) -> LedgerError {
    LedgerError::StoreGet(e.to_string())
}

pub(crate) fn from_redb_storage(e: redb::StorageError) -> LedgerError {
    LedgerError::StoreGet(e.to_string())
}

pub(crate) fn from_redb_transaction(e: redb::TransactionError) -> LedgerError {
    LedgerError::StorePut(e.to_string())
}

pub(crate) fn from_redb_commit(e: redb::CommitError) -> LedgerError {
    LedgerError::StorePut(e.to_string())
}

pub(crate) fn from_redb_database(e: redb::DatabaseError) -> LedgerError {
    LedgerError::StorePut(e.to_string())
}

pub(crate) fn from_bincode_encode(e: bincode::Error) -> LedgerError {
    LedgerError::Serialization(e.to_string())
}
