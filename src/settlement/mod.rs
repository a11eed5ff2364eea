//! Settlement bridge: matched trade to on-chain contract call.
//!
//! A trade plus its two orders becomes a call to the exchange contract:
//! `fill-order` for a normal swap, `fill-order-mint` when two buyers front
//! the collateral for a fresh YES/NO pair, `fill-order-merge` when two
//! sellers burn one back. The bridge signs with the operator key and
//! broadcasts with deny-mode post conditions; it is not idempotent, so
//! callers must record the returned transaction id and refuse to
//! re-broadcast a trade that already carries one.

mod transaction;

pub use transaction::{ContractCall, StacksNetwork, build_signed_contract_call, txid};

use crate::config::Config;
use crate::crypto::clarity::ClarityValue;
use crate::crypto::{c32, is_rsv_hex};
use crate::error::ExchangeError;
use crate::types::{Order, Trade, TradeType};
use k256::ecdsa::SigningKey;
use serde::Deserialize;
use std::time::Duration;
use tracing::{info, warn};

/// Bounded wait on any chain API call.
const BROADCAST_TIMEOUT: Duration = Duration::from_secs(30);

struct BridgeInner {
    network: StacksNetwork,
    api_url: String,
    contract_version: u8,
    contract_hash: [u8; 20],
    contract_name: String,
    signing_key: SigningKey,
    sender_address: String,
    fee: u64,
}

/// The settlement bridge. Disabled (every call fails with
/// [`ExchangeError::SettlementDisabled`]) unless both the exchange contract
/// id and the operator signing key are configured.
pub struct SettlementBridge {
    inner: Option<BridgeInner>,
    client: reqwest::Client,
}

impl SettlementBridge {
    /// A bridge that never broadcasts. Used when settlement variables are
    /// absent and in tests.
    pub fn disabled() -> Self {
        Self {
            inner: None,
            client: reqwest::Client::new(),
        }
    }

    /// Build the bridge from configuration. Missing settlement variables
    /// disable it with a warning rather than failing boot.
    pub fn from_config(config: &Config) -> Self {
        let (Some(contract), Some(key_hex)) = (
            config.ctf_exchange_address.as_deref(),
            config.operator_private_key.as_deref(),
        ) else {
            warn!("settlement disabled: contract address or operator key not configured");
            return Self::disabled();
        };

        let inner = match Self::build_inner(config, contract, key_hex) {
            Ok(inner) => inner,
            Err(err) => {
                warn!(error = %err, "settlement disabled: bad settlement configuration");
                return Self::disabled();
            }
        };
        info!(contract, sender = %inner.sender_address, "settlement bridge enabled");
        Self {
            inner: Some(inner),
            client: reqwest::Client::builder()
                .timeout(BROADCAST_TIMEOUT)
                .build()
                .unwrap_or_default(),
        }
    }

    fn build_inner(
        config: &Config,
        contract: &str,
        key_hex: &str,
    ) -> Result<BridgeInner, ExchangeError> {
        let (address, name) = contract.split_once('.').ok_or_else(|| {
            ExchangeError::invalid(format!("contract id must be address.name: {contract}"))
        })?;
        let (contract_version, contract_hash) = c32::decode_address(address)?;

        // Accept both a bare 32-byte key and the 33-byte compressed-flag form.
        let key_hex = key_hex.strip_suffix("01").filter(|s| s.len() == 64).unwrap_or(key_hex);
        let key_bytes = hex::decode(key_hex)
            .map_err(|_| ExchangeError::invalid("operator key is not valid hex"))?;
        let signing_key = SigningKey::from_slice(&key_bytes)
            .map_err(|_| ExchangeError::invalid("operator key is not a valid secp256k1 scalar"))?;

        let public_key = signing_key.verifying_key().to_encoded_point(true);
        let sender_hash = crate::crypto::hash160(public_key.as_bytes());
        let sender_address = c32::encode_address(config.network.address_version(), &sender_hash);

        Ok(BridgeInner {
            network: config.network,
            api_url: config.api_url.trim_end_matches('/').to_string(),
            contract_version,
            contract_hash,
            contract_name: name.to_string(),
            signing_key,
            sender_address,
            fee: config.settlement_fee,
        })
    }

    /// Whether broadcasts are configured.
    pub fn is_enabled(&self) -> bool {
        self.inner.is_some()
    }

    /// Settle one trade on chain and return the transaction id.
    ///
    /// # Errors
    /// [`ExchangeError::SettlementDisabled`] when not configured;
    /// [`ExchangeError::InvalidArgument`] when a precondition on signatures
    /// or amounts fails; [`ExchangeError::SettlementRejected`] with the
    /// node's body when the broadcast is refused.
    pub async fn settle_trade(
        &self,
        trade: &Trade,
        maker_order: &Order,
        taker_order: &Order,
        fill: u64,
    ) -> Result<String, ExchangeError> {
        let inner = self.inner.as_ref().ok_or(ExchangeError::SettlementDisabled)?;

        let (function_name, args) = build_call_args(trade, maker_order, taker_order, fill)?;
        let call = ContractCall {
            contract_version: inner.contract_version,
            contract_hash: inner.contract_hash,
            contract_name: inner.contract_name.clone(),
            function_name,
            args,
        };

        let nonce = self.fetch_nonce(inner).await?;
        let tx = build_signed_contract_call(inner.network, &inner.signing_key, nonce, inner.fee, &call)?;
        let tx_id = self.broadcast(inner, tx).await?;
        info!(trade = %trade.trade_id, tx = %tx_id, "settlement broadcast");
        Ok(tx_id)
    }

    async fn fetch_nonce(&self, inner: &BridgeInner) -> Result<u64, ExchangeError> {
        #[derive(Deserialize)]
        struct AccountInfo {
            nonce: u64,
        }
        let url = format!(
            "{}/v2/accounts/{}?proof=0",
            inner.api_url, inner.sender_address
        );
        let response = self.client.get(&url).send().await.map_err(|e| {
            ExchangeError::Internal {
                message: format!("nonce fetch failed: {e}"),
            }
        })?;
        let info: AccountInfo = response.json().await.map_err(|e| ExchangeError::Internal {
            message: format!("nonce response unreadable: {e}"),
        })?;
        Ok(info.nonce)
    }

    async fn broadcast(&self, inner: &BridgeInner, tx: Vec<u8>) -> Result<String, ExchangeError> {
        let url = format!("{}/v2/transactions", inner.api_url);
        let response = self
            .client
            .post(&url)
            .header("content-type", "application/octet-stream")
            .body(tx)
            .send()
            .await
            .map_err(|e| ExchangeError::Internal {
                message: format!("broadcast failed: {e}"),
            })?;

        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        if !status.is_success() {
            return Err(ExchangeError::SettlementRejected { body });
        }
        // The node answers with the txid as a JSON string.
        let tx_id = serde_json::from_str::<String>(&body).unwrap_or_else(|_| body.trim().to_string());
        Ok(tx_id)
    }
}

/// Convert a trade and its orders into the contract function and argument
/// list for its settlement shape. Pure; does no I/O.
///
/// # Errors
/// [`ExchangeError::InvalidArgument`] when a required signature is missing
/// or malformed, a salt is non-numeric, or an amount overflows.
pub fn build_call_args(
    trade: &Trade,
    maker_order: &Order,
    taker_order: &Order,
    fill: u64,
) -> Result<(String, Vec<ClarityValue>), ExchangeError> {
    let maker_sig = required_signature(maker_order, "maker")?;
    let salt: u128 = maker_order
        .salt
        .parse()
        .map_err(|_| ExchangeError::invalid(format!("salt is not numeric: {:?}", maker_order.salt)))?;
    let maker_amount = maker_order.size as u128;
    let taker_amount = (maker_order.price as u128)
        .checked_mul(maker_order.size as u128)
        .ok_or_else(|| ExchangeError::invalid("taker amount overflows"))?;
    let expiration = maker_order.expiration as u128;

    match trade.trade_type {
        TradeType::Normal => {
            let args = vec![
                ClarityValue::principal(&maker_order.maker)?,
                ClarityValue::Buffer(maker_order.maker_position_id.as_bytes().to_vec()),
                ClarityValue::UInt(maker_amount),
                ClarityValue::Buffer(maker_sig),
                ClarityValue::principal(&taker_order.maker)?,
                ClarityValue::Buffer(maker_order.taker_position_id.as_bytes().to_vec()),
                ClarityValue::UInt(taker_amount),
                ClarityValue::UInt(salt),
                ClarityValue::UInt(expiration),
                ClarityValue::UInt(fill as u128),
            ];
            Ok(("fill-order".to_string(), args))
        }
        TradeType::Mint | TradeType::Merge => {
            let taker_sig = required_signature(taker_order, "taker")?;
            let args = vec![
                ClarityValue::principal(&maker_order.maker)?,
                ClarityValue::Buffer(maker_order.book_position_id().as_bytes().to_vec()),
                ClarityValue::UInt(maker_amount),
                ClarityValue::Buffer(maker_sig),
                ClarityValue::principal(&taker_order.maker)?,
                ClarityValue::Buffer(taker_order.book_position_id().as_bytes().to_vec()),
                ClarityValue::UInt(taker_order.size as u128),
                ClarityValue::Buffer(taker_sig),
                ClarityValue::Buffer(trade.condition_id.as_bytes().to_vec()),
                ClarityValue::UInt(salt),
                ClarityValue::UInt(expiration),
                ClarityValue::UInt(fill as u128),
            ];
            let function = match trade.trade_type {
                TradeType::Mint => "fill-order-mint",
                _ => "fill-order-merge",
            };
            Ok((function.to_string(), args))
        }
    }
}

fn required_signature(order: &Order, role: &str) -> Result<Vec<u8>, ExchangeError> {
    let signature = order.signature.as_deref().ok_or_else(|| {
        ExchangeError::invalid(format!("{role} signature required for settlement"))
    })?;
    if !is_rsv_hex(signature) {
        return Err(ExchangeError::invalid(format!(
            "{role} signature must be 130 hex chars"
        )));
    }
    hex::decode(signature).map_err(|_| ExchangeError::invalid("signature is not valid hex"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Hex32, OrderStatus, Side};

    fn principal(seed: u8) -> String {
        c32::encode_address(26, &[seed; 20])
    }

    fn order(side: Side, price: u64, signed: bool) -> Order {
        Order {
            order_id: "o".to_string(),
            maker: principal(9),
            market_id: "m".to_string(),
            condition_id: Hex32([0; 32]),
            maker_position_id: Hex32([1; 32]),
            taker_position_id: Hex32([2; 32]),
            side,
            price,
            size: 100,
            filled_size: 0,
            remaining_size: 100,
            status: OrderStatus::Open,
            salt: "42".to_string(),
            expiration: 0,
            created_at: 0,
            updated_at: 0,
            signature: signed.then(|| "ab".repeat(65)),
            public_key: None,
            seq: 0,
        }
    }

    fn trade(trade_type: TradeType) -> Trade {
        Trade {
            trade_id: "t".to_string(),
            market_id: "m".to_string(),
            condition_id: Hex32([5; 32]),
            position_id: Hex32([2; 32]),
            maker_position_id: Hex32([1; 32]),
            taker_position_id: Hex32([2; 32]),
            maker: principal(9),
            taker: principal(9),
            price: 660_000,
            size: 50,
            side: Side::Buy,
            maker_order_id: "mo".to_string(),
            taker_order_id: "to".to_string(),
            trade_type,
            timestamp: 0,
            tx_hash: None,
        }
    }

    #[test]
    fn test_normal_dispatches_fill_order() {
        let maker = order(Side::Sell, 660_000, true);
        let taker = order(Side::Buy, 700_000, false);
        let (function, args) = build_call_args(&trade(TradeType::Normal), &maker, &taker, 50).unwrap();
        assert_eq!(function, "fill-order");
        assert_eq!(args.len(), 10);
        // maker amount then taker amount
        assert_eq!(args[2], ClarityValue::UInt(100));
        assert_eq!(args[6], ClarityValue::UInt(660_000 * 100));
        assert_eq!(args[9], ClarityValue::UInt(50));
    }

    #[test]
    fn test_mint_requires_both_signatures() {
        let maker = order(Side::Buy, 600_000, true);
        let unsigned_taker = order(Side::Buy, 400_000, false);
        assert!(build_call_args(&trade(TradeType::Mint), &maker, &unsigned_taker, 50).is_err());

        let signed_taker = order(Side::Buy, 400_000, true);
        let (function, args) =
            build_call_args(&trade(TradeType::Mint), &maker, &signed_taker, 50).unwrap();
        assert_eq!(function, "fill-order-mint");
        assert_eq!(args.len(), 12);
    }

    #[test]
    fn test_merge_dispatches_fill_order_merge() {
        let maker = order(Side::Sell, 350_000, true);
        let taker = order(Side::Sell, 650_000, true);
        let (function, _) = build_call_args(&trade(TradeType::Merge), &maker, &taker, 10).unwrap();
        assert_eq!(function, "fill-order-merge");
    }

    #[test]
    fn test_missing_maker_signature_rejected() {
        let maker = order(Side::Sell, 660_000, false);
        let taker = order(Side::Buy, 700_000, false);
        match build_call_args(&trade(TradeType::Normal), &maker, &taker, 50) {
            Err(ExchangeError::InvalidArgument { .. }) => {}
            other => panic!("expected InvalidArgument, got {other:?}"),
        }
    }

    #[test]
    fn test_non_numeric_salt_rejected() {
        let mut maker = order(Side::Sell, 660_000, true);
        maker.salt = "xyz".to_string();
        let taker = order(Side::Buy, 700_000, false);
        assert!(build_call_args(&trade(TradeType::Normal), &maker, &taker, 50).is_err());
    }

    #[test]
    fn test_disabled_bridge_refuses() {
        let bridge = SettlementBridge::disabled();
        assert!(!bridge.is_enabled());
    }
}
