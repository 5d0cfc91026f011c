// Path: crates/meridian-crypto/src/error.rs
//! Error types for the `meridian-crypto` crate.

use thiserror::Error;

/// Failures from hashing or signature operations.
#[derive(Debug, Error)]
pub enum CryptoError {
    /// The supplied key bytes were not a valid Ed25519 key.
    #[error("invalid key material: {0}")]
    InvalidKey(String),
    /// Signature verification failed.
    #[error("signature verification failed")]
    VerificationFailed,
}

impl meridian_types::error::ErrorCode for CryptoError {
    fn code(&self) -> &'static str {
        match self {
            CryptoError::InvalidKey(_) => "CRYPTO_INVALID_KEY",
            CryptoError::VerificationFailed => "CRYPTO_VERIFICATION_FAILED",
        }
    }
}
