// Path: crates/meridian-types/src/keys.rs
//! Key material shared by the core and the (out-of-scope) wallet layer above it.
//!
//! The core never derives keys from a passphrase; it only consumes already-derived
//! [`KeyPair`]s to sign blocks. `Kdf` and `Fan` are part of the shared data model so
//! wallets, the rewarder, and tests construct/hold keys the same way.

use crate::primitives::{Account, Hash, Signature};
use rand::RngCore;
use serde::{Deserialize, Serialize};

/// An Ed25519 keypair used to sign blocks for one account.
#[derive(Clone, Serialize, Deserialize)]
pub struct KeyPair {
    /// The public half, also the account identifier.
    pub account: Account,
    /// The private half. Never written to a persisted table in plaintext.
    pub secret: [u8; 32],
}

impl KeyPair {
    /// Builds a keypair from raw bytes, for tests and genesis construction.
    pub fn from_raw(account: [u8; 32], secret: [u8; 32]) -> Self {
        KeyPair {
            account: Account(account),
            secret,
        }
    }
}

impl std::fmt::Debug for KeyPair {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KeyPair")
            .field("account", &self.account)
            .field("secret", &"<redacted>")
            .finish()
    }
}

/// A key-derivation function stretching a passphrase into a symmetric key.
/// Consumed only by the wallet layer above the core; retained here as a shared type.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Kdf {
    /// Iteration count, tuned for the target stretch time.
    pub iterations: u32,
}

impl Kdf {
    /// A conservative default iteration count.
    pub const DEFAULT_ITERATIONS: u32 = 200_000;
}

impl Default for Kdf {
    fn default() -> Self {
        Kdf {
            iterations: Self::DEFAULT_ITERATIONS,
        }
    }
}

/// A split-key secret holder: the secret is stored XORed against `n - 1` random pads
/// plus one derived pad, so no single in-memory buffer ever holds the plaintext secret
/// contiguously. Used by the rewarder's signing key.
pub struct Fan {
    pads: Vec<[u8; 32]>,
}

impl Fan {
    /// Splits `secret` across `n` pads (`n >= 2`).
    pub fn new(secret: &[u8; 32], n: usize) -> Self {
        let n = n.max(2);
        let mut rng = rand::thread_rng();
        let mut pads = Vec::with_capacity(n);
        let mut accumulator = *secret;
        for _ in 0..n - 1 {
            let mut pad = [0u8; 32];
            rng.fill_bytes(&mut pad);
            for i in 0..32 {
                accumulator[i] ^= pad[i];
            }
            pads.push(pad);
        }
        pads.push(accumulator);
        Fan { pads }
    }

    /// Reconstructs the secret by XORing all pads together.
    pub fn value(&self) -> [u8; 32] {
        let mut out = [0u8; 32];
        for pad in &self.pads {
            for i in 0..32 {
                out[i] ^= pad[i];
            }
        }
        out
    }
}

impl Drop for Fan {
    fn drop(&mut self) {
        for pad in &mut self.pads {
            for b in pad.iter_mut() {
                *b = 0;
            }
        }
    }
}

/// A fixed, network-specific first block plus its declared opening balance.
#[derive(Clone, Debug)]
pub struct Genesis {
    /// The genesis account.
    pub account: Account,
    /// The genesis block's hash.
    pub block_hash: Hash,
    /// The opening balance credited to the genesis account.
    pub balance: u128,
    /// The genesis block's signature, part of the fixed test vector.
    pub signature: Signature,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fan_round_trips_secret() {
        let secret = [7u8; 32];
        let fan = Fan::new(&secret, 4);
        assert_eq!(fan.value(), secret);
    }

    #[test]
    fn fan_minimum_two_pads() {
        let secret = [3u8; 32];
        let fan = Fan::new(&secret, 1);
        assert_eq!(fan.value(), secret);
    }
}
