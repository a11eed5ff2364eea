//! Single-signature contract-call transaction encoding and signing.
//!
//! Implements the chain's transaction wire format for the one shape the
//! exchange broadcasts: a standard single-signature (P2PKH, compressed key)
//! contract call with deny-mode post conditions and no explicit post
//! conditions. Signing follows the sighash chain: the transaction is
//! serialized with a cleared spending condition, hashed with SHA-512/256,
//! combined with the auth flag, fee, and nonce, and signed with a
//! recoverable ECDSA signature whose recovery byte leads the 65-byte field.

use crate::crypto::clarity::ClarityValue;
use crate::crypto::hash160;
use crate::error::ExchangeError;
use k256::ecdsa::SigningKey;
use sha2::{Digest, Sha512_256};

const AUTH_TYPE_STANDARD: u8 = 0x04;
const HASH_MODE_P2PKH: u8 = 0x00;
const KEY_ENCODING_COMPRESSED: u8 = 0x00;
const ANCHOR_MODE_ANY: u8 = 0x03;
const POST_CONDITION_MODE_DENY: u8 = 0x02;
const PAYLOAD_CONTRACT_CALL: u8 = 0x02;

/// The chain flavor a transaction targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StacksNetwork {
    /// Production chain.
    Mainnet,
    /// Public test chain.
    Testnet,
    /// Local development chain.
    Devnet,
}

impl StacksNetwork {
    /// Parse the `STACKS_NETWORK` environment value.
    pub fn parse(value: &str) -> Option<Self> {
        match value.to_ascii_lowercase().as_str() {
            "mainnet" => Some(StacksNetwork::Mainnet),
            "testnet" => Some(StacksNetwork::Testnet),
            "devnet" | "mocknet" => Some(StacksNetwork::Devnet),
            _ => None,
        }
    }

    fn transaction_version(self) -> u8 {
        match self {
            StacksNetwork::Mainnet => 0x00,
            StacksNetwork::Testnet | StacksNetwork::Devnet => 0x80,
        }
    }

    fn chain_id(self) -> u32 {
        match self {
            StacksNetwork::Mainnet => 0x0000_0001,
            StacksNetwork::Testnet | StacksNetwork::Devnet => 0x8000_0000,
        }
    }

    /// Single-signature address version for this network.
    pub fn address_version(self) -> u8 {
        match self {
            StacksNetwork::Mainnet => 22,
            StacksNetwork::Testnet | StacksNetwork::Devnet => 26,
        }
    }
}

/// A contract call ready for encoding.
#[derive(Debug, Clone)]
pub struct ContractCall {
    /// Address version of the contract deployer.
    pub contract_version: u8,
    /// hash160 of the contract deployer.
    pub contract_hash: [u8; 20],
    /// Contract name.
    pub contract_name: String,
    /// Function to invoke.
    pub function_name: String,
    /// Consensus-encoded function arguments.
    pub args: Vec<ClarityValue>,
}

fn push_name(out: &mut Vec<u8>, name: &str) -> Result<(), ExchangeError> {
    if name.is_empty() || name.len() > 128 || !name.is_ascii() {
        return Err(ExchangeError::invalid(format!(
            "bad contract/function name: {name:?}"
        )));
    }
    out.push(name.len() as u8);
    out.extend_from_slice(name.as_bytes());
    Ok(())
}

fn serialize_tx(
    network: StacksNetwork,
    signer: &[u8; 20],
    nonce: u64,
    fee: u64,
    signature: &[u8; 65],
    call: &ContractCall,
) -> Result<Vec<u8>, ExchangeError> {
    let mut out = Vec::with_capacity(256);
    out.push(network.transaction_version());
    out.extend_from_slice(&network.chain_id().to_be_bytes());

    // Standard single-signature spending condition.
    out.push(AUTH_TYPE_STANDARD);
    out.push(HASH_MODE_P2PKH);
    out.extend_from_slice(signer);
    out.extend_from_slice(&nonce.to_be_bytes());
    out.extend_from_slice(&fee.to_be_bytes());
    out.push(KEY_ENCODING_COMPRESSED);
    out.extend_from_slice(signature);

    out.push(ANCHOR_MODE_ANY);
    out.push(POST_CONDITION_MODE_DENY);
    out.extend_from_slice(&0u32.to_be_bytes()); // no explicit post conditions

    out.push(PAYLOAD_CONTRACT_CALL);
    out.push(call.contract_version);
    out.extend_from_slice(&call.contract_hash);
    push_name(&mut out, &call.contract_name)?;
    push_name(&mut out, &call.function_name)?;
    out.extend_from_slice(&(call.args.len() as u32).to_be_bytes());
    for arg in &call.args {
        arg.consensus_serialize(&mut out);
    }
    Ok(out)
}

fn sha512_256(data: &[u8]) -> [u8; 32] {
    let digest = Sha512_256::digest(data);
    let mut out = [0u8; 32];
    out.copy_from_slice(&digest);
    out
}

/// Build, sign, and serialize a contract-call transaction. Returns the wire
/// bytes ready for broadcast.
pub fn build_signed_contract_call(
    network: StacksNetwork,
    signing_key: &SigningKey,
    nonce: u64,
    fee: u64,
    call: &ContractCall,
) -> Result<Vec<u8>, ExchangeError> {
    let public_key = signing_key.verifying_key().to_encoded_point(true);
    let signer = hash160(public_key.as_bytes());

    // Initial sighash over the transaction with a cleared condition.
    let cleared = serialize_tx(network, &signer, 0, 0, &[0u8; 65], call)?;
    let initial = sha512_256(&cleared);

    // Presign hash binds the auth flag, fee, and nonce.
    let mut preimage = Vec::with_capacity(32 + 1 + 8 + 8);
    preimage.extend_from_slice(&initial);
    preimage.push(AUTH_TYPE_STANDARD);
    preimage.extend_from_slice(&fee.to_be_bytes());
    preimage.extend_from_slice(&nonce.to_be_bytes());
    let presign = sha512_256(&preimage);

    let (signature, recovery_id) =
        signing_key
            .sign_prehash_recoverable(&presign)
            .map_err(|e| ExchangeError::Internal {
                message: format!("settlement signing failed: {e}"),
            })?;
    let mut vrs = [0u8; 65];
    vrs[0] = recovery_id.to_byte();
    vrs[1..].copy_from_slice(&signature.to_bytes());

    serialize_tx(network, &signer, nonce, fee, &vrs, call)
}

/// The transaction id of serialized wire bytes.
pub fn txid(tx: &[u8]) -> String {
    hex::encode(sha512_256(tx))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_call() -> ContractCall {
        ContractCall {
            contract_version: 26,
            contract_hash: [0x11; 20],
            contract_name: "ctf-exchange".to_string(),
            function_name: "fill-order".to_string(),
            args: vec![ClarityValue::UInt(100), ClarityValue::Buffer(vec![0xaa; 32])],
        }
    }

    fn test_key() -> SigningKey {
        SigningKey::from_slice(&[7u8; 32]).unwrap()
    }

    #[test]
    fn test_wire_layout_prefix() {
        let tx =
            build_signed_contract_call(StacksNetwork::Testnet, &test_key(), 3, 3_000, &test_call())
                .unwrap();
        assert_eq!(tx[0], 0x80); // testnet version
        assert_eq!(&tx[1..5], &[0x80, 0, 0, 0]); // testnet chain id
        assert_eq!(tx[5], AUTH_TYPE_STANDARD);
        assert_eq!(tx[6], HASH_MODE_P2PKH);
        // signer(20) nonce(8) fee(8)
        assert_eq!(&tx[27..35], &3u64.to_be_bytes());
        assert_eq!(&tx[35..43], &3_000u64.to_be_bytes());
        assert_eq!(tx[43], KEY_ENCODING_COMPRESSED);
        // signature(65), anchor mode, post-condition mode
        assert_eq!(tx[109], ANCHOR_MODE_ANY);
        assert_eq!(tx[110], POST_CONDITION_MODE_DENY);
        assert_eq!(&tx[111..115], &[0, 0, 0, 0]);
        assert_eq!(tx[115], PAYLOAD_CONTRACT_CALL);
    }

    #[test]
    fn test_contract_and_function_names_length_prefixed() {
        let tx =
            build_signed_contract_call(StacksNetwork::Mainnet, &test_key(), 0, 0, &test_call())
                .unwrap();
        // payload: tag, address(21), then name fields
        let name_offset = 115 + 1 + 21;
        assert_eq!(tx[name_offset] as usize, "ctf-exchange".len());
        assert_eq!(
            &tx[name_offset + 1..name_offset + 1 + 12],
            "ctf-exchange".as_bytes()
        );
    }

    #[test]
    fn test_signing_is_deterministic() {
        let a = build_signed_contract_call(StacksNetwork::Devnet, &test_key(), 1, 500, &test_call())
            .unwrap();
        let b = build_signed_contract_call(StacksNetwork::Devnet, &test_key(), 1, 500, &test_call())
            .unwrap();
        assert_eq!(a, b);
        assert_eq!(txid(&a), txid(&b));
    }

    #[test]
    fn test_fee_and_nonce_change_the_signature() {
        let a = build_signed_contract_call(StacksNetwork::Devnet, &test_key(), 1, 500, &test_call())
            .unwrap();
        let b = build_signed_contract_call(StacksNetwork::Devnet, &test_key(), 2, 500, &test_call())
            .unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn test_rejects_bad_names() {
        let mut call = test_call();
        call.function_name = String::new();
        assert!(
            build_signed_contract_call(StacksNetwork::Devnet, &test_key(), 0, 0, &call).is_err()
        );
    }
}
