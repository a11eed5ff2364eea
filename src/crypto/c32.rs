//! c32check encoding of standard principals.
//!
//! A Stacks address is `'S'`, a version character, then the c32 encoding of
//! `hash160 || checksum` where `checksum` is the first four bytes of
//! `SHA-256(SHA-256(version || hash160))`. The c32 alphabet is Crockford
//! base-32 (no I, L, O, U); decoding normalizes `O -> 0` and `I, L -> 1`.

use crate::error::ExchangeError;
use sha2::{Digest, Sha256};

const ALPHABET: &[u8; 32] = b"0123456789ABCDEFGHJKMNPQRSTVWXYZ";

/// `hash160 || 4-byte checksum`.
const PAYLOAD_LEN: usize = 24;

fn digit_value(c: char) -> Option<u8> {
    let c = match c.to_ascii_uppercase() {
        'O' => '0',
        'L' | 'I' => '1',
        other => other,
    };
    ALPHABET.iter().position(|&a| a as char == c).map(|i| i as u8)
}

fn checksum(version: u8, hash: &[u8; 20]) -> [u8; 4] {
    let mut preimage = [0u8; 21];
    preimage[0] = version;
    preimage[1..].copy_from_slice(hash);
    let once = Sha256::digest(preimage);
    let twice = Sha256::digest(once);
    let mut out = [0u8; 4];
    out.copy_from_slice(&twice[..4]);
    out
}

/// Decode a c32check standard principal into `(version, hash160)`.
pub fn decode_address(address: &str) -> Result<(u8, [u8; 20]), ExchangeError> {
    let rest = address
        .strip_prefix(['S', 's'])
        .ok_or_else(|| ExchangeError::invalid(format!("principal must start with S: {address}")))?;
    let mut chars = rest.chars();
    let version_char = chars
        .next()
        .ok_or_else(|| ExchangeError::invalid("principal too short"))?;
    let version = digit_value(version_char)
        .ok_or_else(|| ExchangeError::invalid(format!("bad version character {version_char:?}")))?;

    // Fixed-width base-32 accumulation: the payload is exactly 24 bytes, so
    // leading zero characters fall out naturally.
    let mut payload = [0u8; PAYLOAD_LEN];
    let mut saw_digit = false;
    for c in chars {
        let digit = digit_value(c)
            .ok_or_else(|| ExchangeError::invalid(format!("bad c32 character {c:?}")))?;
        saw_digit = true;
        let mut carry = digit as u32;
        for byte in payload.iter_mut().rev() {
            let value = ((*byte as u32) << 5) + carry;
            *byte = (value & 0xff) as u8;
            carry = value >> 8;
        }
        if carry != 0 {
            return Err(ExchangeError::invalid(format!(
                "principal payload overflows: {address}"
            )));
        }
    }
    if !saw_digit {
        return Err(ExchangeError::invalid("principal too short"));
    }

    let mut hash = [0u8; 20];
    hash.copy_from_slice(&payload[..20]);
    if payload[20..] != checksum(version, &hash) {
        return Err(ExchangeError::invalid(format!(
            "principal checksum mismatch: {address}"
        )));
    }
    Ok((version, hash))
}

/// Encode `(version, hash160)` as a c32check standard principal string.
pub fn encode_address(version: u8, hash: &[u8; 20]) -> String {
    let mut payload = [0u8; PAYLOAD_LEN];
    payload[..20].copy_from_slice(hash);
    payload[20..].copy_from_slice(&checksum(version, hash));

    // Emit 5-bit digits from the least-significant end.
    let mut digits: Vec<u8> = Vec::with_capacity(40);
    let mut carry = 0u32;
    let mut carry_bits = 0u32;
    for &byte in payload.iter().rev() {
        carry |= (byte as u32) << carry_bits;
        carry_bits += 8;
        while carry_bits >= 5 {
            digits.push((carry & 0x1f) as u8);
            carry >>= 5;
            carry_bits -= 5;
        }
    }
    if carry_bits > 0 {
        digits.push((carry & 0x1f) as u8);
    }
    while digits.len() > 1 && *digits.last().unwrap() == 0 {
        digits.pop();
    }

    let mut out = String::with_capacity(2 + digits.len());
    out.push('S');
    out.push(ALPHABET[(version & 0x1f) as usize] as char);
    for _ in 0..payload.iter().take_while(|&&b| b == 0).count() {
        out.push('0');
    }
    for &digit in digits.iter().rev() {
        out.push(ALPHABET[digit as usize] as char);
    }
    out
}
