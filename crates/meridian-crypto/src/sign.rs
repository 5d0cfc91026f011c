// Path: crates/meridian-crypto/src/sign.rs
//! Ed25519 sign/verify over a block's hash.

use crate::error::CryptoError;
use ed25519_dalek::{Signature as DalekSignature, Signer, SigningKey, Verifier, VerifyingKey};
use meridian_types::primitives::{Account, Hash, Signature};
use meridian_types::KeyPair;

/// Signs a hash with the given keypair, producing the block's `signature` field.
pub fn sign_hash(keypair: &KeyPair, hash: &Hash) -> Result<Signature, CryptoError> {
    let signing_key = SigningKey::from_bytes(&keypair.secret);
    let sig = signing_key.sign(hash.as_bytes());
    Ok(Signature(sig.to_bytes()))
}

/// Verifies that `signature` is a valid Ed25519 signature over `hash` by `account`.
pub fn verify_hash(account: &Account, hash: &Hash, signature: &Signature) -> Result<(), CryptoError> {
    let verifying_key = VerifyingKey::from_bytes(account.as_bytes())
        .map_err(|e| CryptoError::InvalidKey(e.to_string()))?;
    let dalek_sig = DalekSignature::from_bytes(&signature.0);
    verifying_key
        .verify(hash.as_bytes(), &dalek_sig)
        .map_err(|_| CryptoError::VerificationFailed)
}

/// Generates a fresh random keypair, for tests and key-creation tooling.
pub fn generate_keypair() -> KeyPair {
    let mut rng = rand::rngs::OsRng;
    let signing_key = SigningKey::generate(&mut rng);
    KeyPair::from_raw(
        signing_key.verifying_key().to_bytes(),
        signing_key.to_bytes(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sign_then_verify_round_trips() {
        let keypair = generate_keypair();
        let hash = Hash([7u8; 32]);
        let signature = sign_hash(&keypair, &hash).expect("sign");
        assert!(verify_hash(&keypair.account, &hash, &signature).is_ok());
    }

    #[test]
    fn verify_rejects_tampered_hash() {
        let keypair = generate_keypair();
        let hash = Hash([7u8; 32]);
        let signature = sign_hash(&keypair, &hash).expect("sign");
        let other_hash = Hash([8u8; 32]);
        assert!(verify_hash(&keypair.account, &other_hash, &signature).is_err());
    }

    #[test]
    fn verify_rejects_wrong_signer() {
        let keypair = generate_keypair();
        let other = generate_keypair();
        let hash = Hash([7u8; 32]);
        let signature = sign_hash(&keypair, &hash).expect("sign");
        assert!(verify_hash(&other.account, &hash, &signature).is_err());
    }
}
