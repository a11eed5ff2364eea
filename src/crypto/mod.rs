//! Consensus encoding, order hashing, and signature verification.
//!
//! Orders are bound to the chain by a SHA-256 digest over the consensus
//! encodings of their economic fields and an RSV secp256k1 signature over
//! that digest. The same Clarity encodings feed the settlement bridge's
//! contract calls and the derivation of outcome position ids.

pub mod c32;
pub mod clarity;
mod order_hash;
mod signature;

pub use clarity::ClarityValue;
pub use order_hash::{OrderHashFields, order_hash};
pub use signature::{is_rsv_hex, verify_rsv};

use crate::types::Hex32;
use ripemd::Ripemd160;
use sha2::{Digest, Sha256};

/// Derive an outcome token's position id:
/// `SHA-256(condition_id || consensus(uint outcome_index))`.
pub fn derive_position_id(condition_id: Hex32, outcome_index: u8) -> Hex32 {
    let mut preimage = Vec::with_capacity(32 + 17);
    preimage.extend_from_slice(condition_id.as_bytes());
    ClarityValue::UInt(outcome_index as u128).consensus_serialize(&mut preimage);
    let digest = Sha256::digest(&preimage);
    let mut out = [0u8; 32];
    out.copy_from_slice(&digest);
    Hex32(out)
}

/// `RIPEMD-160(SHA-256(data))`, the chain's address hash.
pub fn hash160(data: &[u8]) -> [u8; 20] {
    let sha = Sha256::digest(data);
    let rip = Ripemd160::digest(sha);
    let mut out = [0u8; 20];
    out.copy_from_slice(&rip);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_position_ids_differ_per_outcome() {
        let condition = Hex32([7u8; 32]);
        let yes = derive_position_id(condition, 0);
        let no = derive_position_id(condition, 1);
        assert_ne!(yes, no);
        // Deterministic.
        assert_eq!(yes, derive_position_id(condition, 0));
    }

    #[test]
    fn test_position_ids_differ_per_condition() {
        let yes_a = derive_position_id(Hex32([1u8; 32]), 0);
        let yes_b = derive_position_id(Hex32([2u8; 32]), 0);
        assert_ne!(yes_a, yes_b);
    }

    #[test]
    fn test_hash160_length() {
        assert_eq!(hash160(b"hello").len(), 20);
    }
}
