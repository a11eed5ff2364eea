//! Environment configuration.

use crate::settlement::StacksNetwork;
use anyhow::{Context, Result, bail};
use std::env;
use std::net::SocketAddr;

/// Default chain API per network.
fn default_api_url(network: StacksNetwork) -> &'static str {
    match network {
        StacksNetwork::Mainnet => "https://api.hiro.so",
        StacksNetwork::Testnet => "https://api.testnet.hiro.so",
        StacksNetwork::Devnet => "http://localhost:3999",
    }
}

/// Runtime configuration, read once at boot.
#[derive(Debug, Clone)]
pub struct Config {
    /// Which chain flavor transactions target.
    pub network: StacksNetwork,
    /// Base URL of the chain API (height, nonces, broadcast).
    pub api_url: String,
    /// `address.name` of the exchange contract. Absent disables settlement.
    pub ctf_exchange_address: Option<String>,
    /// Hex operator signing key. Absent disables settlement.
    pub operator_private_key: Option<String>,
    /// `address.name` of the conditional-tokens contract, informational.
    pub conditional_tokens_address: Option<String>,
    /// Shared secret for admin endpoints. Absent disables them.
    pub admin_api_key: Option<String>,
    /// Path of the durable mirror database.
    pub database_path: String,
    /// HTTP bind address.
    pub bind_addr: SocketAddr,
    /// Flat settlement transaction fee in micro-STX.
    pub settlement_fee: u64,
}

impl Config {
    /// Read configuration from the environment.
    pub fn from_env() -> Result<Self> {
        let network_raw = env::var("STACKS_NETWORK").unwrap_or_else(|_| "devnet".to_string());
        let Some(network) = StacksNetwork::parse(&network_raw) else {
            bail!("STACKS_NETWORK must be mainnet, testnet, or devnet, got {network_raw:?}");
        };
        let api_url =
            env::var("STACKS_API_URL").unwrap_or_else(|_| default_api_url(network).to_string());
        let bind_addr = env::var("BIND_ADDR")
            .unwrap_or_else(|_| "0.0.0.0:3000".to_string())
            .parse()
            .context("BIND_ADDR is not a socket address")?;
        let settlement_fee = match env::var("STACKS_TX_FEE") {
            Ok(raw) => raw.parse().context("STACKS_TX_FEE is not an integer")?,
            Err(_) => 3_000,
        };

        Ok(Self {
            network,
            api_url,
            ctf_exchange_address: env::var("CTF_EXCHANGE_ADDRESS").ok(),
            operator_private_key: env::var("STACKS_OPERATOR_PRIVATE_KEY").ok(),
            conditional_tokens_address: env::var("CONDITIONAL_TOKENS_ADDRESS").ok(),
            admin_api_key: env::var("ADMIN_API_KEY").ok(),
            database_path: env::var("DATABASE_URL")
                .unwrap_or_else(|_| "prediction-clob.db".to_string()),
            bind_addr,
            settlement_fee,
        })
    }
}
