//! Consensus serialization of Clarity values.
//!
//! Only the value kinds the exchange actually puts on the wire are modeled:
//! unsigned integers, byte buffers, and standard principals. The encoding is
//! the chain's consensus format: a one-byte type tag followed by the
//! big-endian payload.

use super::c32;
use crate::error::ExchangeError;

const TYPE_UINT: u8 = 0x01;
const TYPE_BUFFER: u8 = 0x02;
const TYPE_PRINCIPAL_STANDARD: u8 = 0x05;

/// A Clarity value in consensus form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClarityValue {
    /// An unsigned 128-bit integer.
    UInt(u128),
    /// A byte buffer.
    Buffer(Vec<u8>),
    /// A standard (non-contract) principal.
    StandardPrincipal {
        /// Address version byte.
        version: u8,
        /// hash160 of the principal's public key.
        hash: [u8; 20],
    },
}

impl ClarityValue {
    /// Build a standard principal value from its c32check address string.
    pub fn principal(address: &str) -> Result<Self, ExchangeError> {
        let (version, hash) = c32::decode_address(address)?;
        Ok(ClarityValue::StandardPrincipal { version, hash })
    }

    /// Append this value's consensus encoding to `out`.
    pub fn consensus_serialize(&self, out: &mut Vec<u8>) {
        match self {
            ClarityValue::UInt(value) => {
                out.push(TYPE_UINT);
                out.extend_from_slice(&value.to_be_bytes());
            }
            ClarityValue::Buffer(bytes) => {
                out.push(TYPE_BUFFER);
                out.extend_from_slice(&(bytes.len() as u32).to_be_bytes());
                out.extend_from_slice(bytes);
            }
            ClarityValue::StandardPrincipal { version, hash } => {
                out.push(TYPE_PRINCIPAL_STANDARD);
                out.push(*version);
                out.extend_from_slice(hash);
            }
        }
    }

    /// This value's consensus encoding as a fresh buffer.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = Vec::new();
        self.consensus_serialize(&mut out);
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_uint_layout() {
        let bytes = ClarityValue::UInt(1).to_bytes();
        assert_eq!(bytes.len(), 17);
        assert_eq!(bytes[0], 0x01);
        assert_eq!(&bytes[1..16], &[0u8; 15]);
        assert_eq!(bytes[16], 1);
    }

    #[test]
    fn test_uint_big_endian() {
        let bytes = ClarityValue::UInt(0x0102).to_bytes();
        assert_eq!(bytes[15], 0x01);
        assert_eq!(bytes[16], 0x02);
    }

    #[test]
    fn test_buffer_layout() {
        let bytes = ClarityValue::Buffer(vec![0xaa, 0xbb]).to_bytes();
        assert_eq!(bytes, vec![0x02, 0, 0, 0, 2, 0xaa, 0xbb]);
    }

    #[test]
    fn test_principal_layout() {
        let bytes = ClarityValue::StandardPrincipal {
            version: 22,
            hash: [0x33; 20],
        }
        .to_bytes();
        assert_eq!(bytes.len(), 22);
        assert_eq!(bytes[0], 0x05);
        assert_eq!(bytes[1], 22);
        assert_eq!(&bytes[2..], &[0x33; 20]);
    }

    #[test]
    fn test_principal_from_address_round_trip() {
        let address = c32::encode_address(22, &[0x44; 20]);
        let value = ClarityValue::principal(&address).unwrap();
        assert_eq!(
            value,
            ClarityValue::StandardPrincipal {
                version: 22,
                hash: [0x44; 20]
            }
        );
    }
}
