//! RSV signature verification.

use crate::error::ExchangeError;
use k256::ecdsa::{RecoveryId, Signature, VerifyingKey};

/// Whether `s` has the shape of an RSV signature: 130 hex characters.
pub fn is_rsv_hex(s: &str) -> bool {
    s.len() == 130 && s.chars().all(|c| c.is_ascii_hexdigit())
}

/// Verify a 65-byte RSV signature over `digest` against a compressed
/// secp256k1 public key.
///
/// The key is recovered from `(r, s, v)` and the digest and must equal the
/// supplied key byte-for-byte. The recovery byte accepts both `{0, 1}` and
/// the legacy `{27, 28}` convention.
///
/// # Errors
/// [`ExchangeError::InvalidArgument`] when the signature is not 130 hex
/// characters or the public key is not a valid compressed point;
/// [`ExchangeError::BadSignature`] when recovery fails or recovers a
/// different key.
pub fn verify_rsv(
    digest: &[u8; 32],
    signature_hex: &str,
    public_key_hex: &str,
) -> Result<(), ExchangeError> {
    if !is_rsv_hex(signature_hex) {
        return Err(ExchangeError::invalid(format!(
            "signature must be 130 hex chars, got {}",
            signature_hex.len()
        )));
    }
    let bytes = hex::decode(signature_hex)
        .map_err(|_| ExchangeError::invalid("signature is not valid hex"))?;

    let signature = Signature::from_slice(&bytes[..64]).map_err(|e| ExchangeError::BadSignature {
        reason: format!("malformed r/s: {e}"),
    })?;
    let v = match bytes[64] {
        v @ 27..=30 => v - 27,
        v => v,
    };
    let recovery_id = RecoveryId::from_byte(v).ok_or_else(|| ExchangeError::BadSignature {
        reason: format!("bad recovery byte {v}"),
    })?;

    let recovered = VerifyingKey::recover_from_prehash(digest, &signature, recovery_id).map_err(
        |e| ExchangeError::BadSignature {
            reason: format!("recovery failed: {e}"),
        },
    )?;

    let supplied_bytes = hex::decode(public_key_hex)
        .map_err(|_| ExchangeError::invalid("public key is not valid hex"))?;
    let supplied = VerifyingKey::from_sec1_bytes(&supplied_bytes)
        .map_err(|_| ExchangeError::invalid("public key is not a valid compressed point"))?;

    if recovered != supplied {
        return Err(ExchangeError::BadSignature {
            reason: "recovered key does not match supplied key".to_string(),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use k256::ecdsa::SigningKey;

    fn fixed_key() -> SigningKey {
        SigningKey::from_slice(&[0x42u8; 32]).unwrap()
    }

    fn sign_rsv(key: &SigningKey, digest: &[u8; 32]) -> String {
        let (signature, recovery_id) = key.sign_prehash_recoverable(digest).unwrap();
        let mut bytes = signature.to_bytes().to_vec();
        bytes.push(recovery_id.to_byte());
        hex::encode(bytes)
    }

    fn compressed_hex(key: &SigningKey) -> String {
        hex::encode(key.verifying_key().to_encoded_point(true).as_bytes())
    }

    #[test]
    fn test_valid_signature_verifies() {
        let key = fixed_key();
        let digest = [9u8; 32];
        let sig = sign_rsv(&key, &digest);
        assert_eq!(sig.len(), 130);
        verify_rsv(&digest, &sig, &compressed_hex(&key)).unwrap();
    }

    #[test]
    fn test_legacy_recovery_byte_accepted() {
        let key = fixed_key();
        let digest = [9u8; 32];
        let sig = sign_rsv(&key, &digest);
        let v = u8::from_str_radix(&sig[128..], 16).unwrap();
        let legacy = format!("{}{:02x}", &sig[..128], v + 27);
        verify_rsv(&digest, &legacy, &compressed_hex(&key)).unwrap();
    }

    #[test]
    fn test_wrong_key_rejected() {
        let key = fixed_key();
        let other = SigningKey::from_slice(&[0x43u8; 32]).unwrap();
        let digest = [9u8; 32];
        let sig = sign_rsv(&key, &digest);
        match verify_rsv(&digest, &sig, &compressed_hex(&other)) {
            Err(ExchangeError::BadSignature { .. }) => {}
            other => panic!("expected BadSignature, got {other:?}"),
        }
    }

    #[test]
    fn test_wrong_digest_rejected() {
        let key = fixed_key();
        let sig = sign_rsv(&key, &[9u8; 32]);
        assert!(verify_rsv(&[10u8; 32], &sig, &compressed_hex(&key)).is_err());
    }

    #[test]
    fn test_malformed_signature_shapes_rejected() {
        let key = fixed_key();
        let digest = [9u8; 32];
        match verify_rsv(&digest, "abcd", &compressed_hex(&key)) {
            Err(ExchangeError::InvalidArgument { .. }) => {}
            other => panic!("expected InvalidArgument, got {other:?}"),
        }
        let not_hex = "zz".repeat(65);
        assert!(verify_rsv(&digest, &not_hex, &compressed_hex(&key)).is_err());
    }
}
