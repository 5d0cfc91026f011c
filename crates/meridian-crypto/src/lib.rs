// Path: crates/meridian-crypto/src/lib.rs
//! # meridian-crypto
//!
//! This crate enforces a strict set of lints to ensure high-quality,
//! panic-free, and well-documented code. Panics are disallowed in non-test
//! code to promote robust error handling.
#![cfg_attr(
    not(test),
    deny(
        clippy::unwrap_used,
        clippy::expect_used,
        clippy::panic,
        clippy::indexing_slicing
    )
)]
//! Block hashing (BLAKE2b-256) and signing (Ed25519) primitives for the
//! meridian ledger. Kept deliberately small: this crate has no knowledge of
//! the ledger, the processor, or networking, only of how a block is hashed
//! and how a signature over that hash is produced and checked.

pub mod error;
pub mod hash;
pub mod sign;

pub use error::CryptoError;
pub use hash::block_hash;
pub use sign::{sign_hash, verify_hash};

#[cfg(test)]
mod tests {
    #[test]
    fn canary() {}
}
