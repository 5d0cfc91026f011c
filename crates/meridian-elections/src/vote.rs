// Path: crates/meridian-elections/src/vote.rs
//! A representative's vote for a particular block at a particular `(account, height)`.

use meridian_types::error::ElectionError;
use meridian_types::primitives::{Account, Hash, Signature};

/// A signed statement by `representative` that `hash` is the correct block at some
/// `(account, height)` pair, tracked by the enclosing [`crate::election::Election`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Vote {
    /// Unix timestamp in seconds at which the representative signed this vote.
    pub timestamp: i64,
    /// Ed25519 signature by `representative` over `hash`.
    pub signature: Signature,
    /// The block hash being voted for.
    pub hash: Hash,
}

impl Vote {
    /// Verifies the vote's signature was produced by `representative` over `hash`.
    pub fn verify(&self, representative: &Account) -> Result<(), ElectionError> {
        meridian_crypto::sign::verify_hash(representative, &self.hash, &self.signature)
            .map_err(|_| ElectionError::BadVoteSignature)
    }
}

/// Whether an incoming vote for `hash` at `timestamp` should replace `existing`,
/// cast earlier by the same representative for a different hash.
///
/// A strictly newer timestamp always supersedes. Equal timestamps for two different
/// hashes are broken deterministically: the lower hash wins, so both observers of the
/// tie converge on the same outcome without further communication.
pub fn supersedes(existing: &Vote, incoming_timestamp: i64, incoming_hash: &Hash) -> bool {
    if incoming_hash == &existing.hash {
        return false;
    }
    match incoming_timestamp.cmp(&existing.timestamp) {
        std::cmp::Ordering::Greater => true,
        std::cmp::Ordering::Less => false,
        std::cmp::Ordering::Equal => incoming_hash < &existing.hash,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vote(ts: i64, hash: [u8; 32]) -> Vote {
        Vote {
            timestamp: ts,
            signature: Signature::default(),
            hash: Hash(hash),
        }
    }

    #[test]
    fn strictly_newer_timestamp_supersedes() {
        let existing = vote(10, [1u8; 32]);
        assert!(supersedes(&existing, 11, &Hash([2u8; 32])));
    }

    #[test]
    fn strictly_older_timestamp_does_not_supersede() {
        let existing = vote(10, [1u8; 32]);
        assert!(!supersedes(&existing, 9, &Hash([2u8; 32])));
    }

    #[test]
    fn equal_timestamp_tie_goes_to_lower_hash() {
        let existing = vote(10, [2u8; 32]);
        assert!(supersedes(&existing, 10, &Hash([1u8; 32])));
        assert!(!supersedes(&existing, 10, &Hash([3u8; 32])));
    }

    #[test]
    fn same_hash_never_supersedes_itself() {
        let existing = vote(10, [1u8; 32]);
        assert!(!supersedes(&existing, 20, &Hash([1u8; 32])));
    }
}
