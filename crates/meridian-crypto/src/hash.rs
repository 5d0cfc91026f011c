// Path: crates/meridian-crypto/src/hash.rs
//! BLAKE2b-256 block hashing.

use blake2::digest::consts::U32;
use blake2::{Blake2b, Digest};
use meridian_types::primitives::Hash;
use meridian_types::wire;
use meridian_types::Block;

type Blake2b256 = Blake2b<U32>;

/// Computes a block's hash: BLAKE2b-256 over its hash-covered wire preimage,
/// which excludes the signature field.
pub fn block_hash(block: &Block) -> Hash {
    let preimage = wire::encode_preimage(block);
    hash_bytes(&preimage)
}

/// Computes the BLAKE2b-256 digest of an arbitrary byte string.
pub fn hash_bytes(data: &[u8]) -> Hash {
    let mut hasher = Blake2b256::new();
    hasher.update(data);
    let digest = hasher.finalize();
    let mut out = [0u8; 32];
    out.copy_from_slice(&digest);
    Hash(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use meridian_types::block::{BlockCommon, Opcode, TransactionBlock};
    use meridian_types::primitives::{Account, Signature};

    fn sample() -> Block {
        Block::Tx(TransactionBlock {
            common: BlockCommon {
                opcode: Opcode::Send,
                credit: 1,
                counter: 0,
                timestamp: 0,
                height: 1,
                account: Account([1u8; 32]),
                previous: Hash([2u8; 32]),
                signature: Signature::default(),
            },
            representative: Account([3u8; 32]),
            balance: 100,
            link: Hash([4u8; 32]),
            extensions: vec![],
        })
    }

    #[test]
    fn hash_is_deterministic() {
        assert_eq!(block_hash(&sample()), block_hash(&sample()));
    }

    #[test]
    fn hash_ignores_signature() {
        let mut a = sample();
        if let Block::Tx(tx) = &mut a {
            tx.common.signature = Signature([9u8; 64]);
        }
        assert_eq!(block_hash(&a), block_hash(&sample()));
    }

    #[test]
    fn hash_changes_with_content() {
        let mut a = sample();
        if let Block::Tx(tx) = &mut a {
            tx.balance = 101;
        }
        assert_ne!(block_hash(&a), block_hash(&sample()));
    }
}
