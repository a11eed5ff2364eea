//! Deterministic order digest.

use super::clarity::ClarityValue;
use crate::error::ExchangeError;
use crate::types::Hex32;
use sha2::{Digest, Sha256};

/// The economic fields bound by an order's signature, in hash order.
#[derive(Debug, Clone)]
pub struct OrderHashFields<'a> {
    /// The principal surrendering `maker_position_id`.
    pub maker: &'a str,
    /// The counterparty principal (the maker itself for open orders).
    pub taker: &'a str,
    /// Token the maker surrenders.
    pub maker_position_id: Hex32,
    /// Token the maker receives.
    pub taker_position_id: Hex32,
    /// Token units the maker surrenders.
    pub maker_amount: u128,
    /// Micro-sats the maker expects in return.
    pub taker_amount: u128,
    /// Numeric salt as the client supplied it.
    pub salt: &'a str,
    /// Expiration block height, `0` for none.
    pub expiration: u64,
}

/// SHA-256 over the concatenated consensus encodings of the order fields.
///
/// Position ids contribute as raw 32-byte buffers; principals and unsigned
/// integers contribute as their consensus encodings. The digest is what the
/// order's RSV signature verifies against.
///
/// # Errors
/// Returns [`ExchangeError::InvalidArgument`] when `salt` is not a decimal
/// unsigned integer or a principal fails to decode.
pub fn order_hash(fields: &OrderHashFields<'_>) -> Result<[u8; 32], ExchangeError> {
    let salt: u128 = fields
        .salt
        .parse()
        .map_err(|_| ExchangeError::invalid(format!("salt is not numeric: {:?}", fields.salt)))?;

    let mut preimage = Vec::with_capacity(160);
    ClarityValue::principal(fields.maker)?.consensus_serialize(&mut preimage);
    ClarityValue::principal(fields.taker)?.consensus_serialize(&mut preimage);
    preimage.extend_from_slice(fields.maker_position_id.as_bytes());
    preimage.extend_from_slice(fields.taker_position_id.as_bytes());
    ClarityValue::UInt(fields.maker_amount).consensus_serialize(&mut preimage);
    ClarityValue::UInt(fields.taker_amount).consensus_serialize(&mut preimage);
    ClarityValue::UInt(salt).consensus_serialize(&mut preimage);
    ClarityValue::UInt(fields.expiration as u128).consensus_serialize(&mut preimage);

    let digest = Sha256::digest(&preimage);
    let mut out = [0u8; 32];
    out.copy_from_slice(&digest);
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::c32;

    fn test_fields(salt: &'static str) -> OrderHashFields<'static> {
        // Leaked so the borrowed principal strings live for the test.
        let maker: &'static str = Box::leak(c32::encode_address(26, &[1; 20]).into_boxed_str());
        let taker: &'static str = Box::leak(c32::encode_address(26, &[2; 20]).into_boxed_str());
        OrderHashFields {
            maker,
            taker,
            maker_position_id: Hex32([3; 32]),
            taker_position_id: Hex32([4; 32]),
            maker_amount: 100,
            taker_amount: 66_000_000,
            salt,
            expiration: 0,
        }
    }

    #[test]
    fn test_hash_is_deterministic() {
        let fields = test_fields("12345");
        assert_eq!(order_hash(&fields).unwrap(), order_hash(&fields).unwrap());
    }

    #[test]
    fn test_hash_changes_with_salt() {
        let a = order_hash(&test_fields("12345")).unwrap();
        let b = order_hash(&test_fields("12346")).unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn test_hash_changes_with_amounts() {
        let mut fields = test_fields("12345");
        let a = order_hash(&fields).unwrap();
        fields.maker_amount = 101;
        let b = order_hash(&fields).unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn test_non_numeric_salt_rejected() {
        let fields = test_fields("not-a-number");
        match order_hash(&fields) {
            Err(ExchangeError::InvalidArgument { .. }) => {}
            other => panic!("expected InvalidArgument, got {other:?}"),
        }
    }
}
