//! Client configuration from environment variables.

use crate::errors::ClientError;
use crate::units::parse_ether;
use market_ledger::domain::entities::LedgerConfig;
use market_ledger::domain::value_objects::{Address, U256};
use serde::{Deserialize, Serialize};
use std::env;

/// Network the wallet must be on.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NetworkConfig {
    /// Chain id.
    pub chain_id: u64,
    /// Human-readable chain name.
    pub chain_name: String,
    /// RPC endpoint handed to the wallet when adding the chain.
    pub rpc_url: String,
    /// Native currency symbol.
    pub currency_symbol: String,
    /// Native currency decimals.
    pub currency_decimals: u8,
    /// Block explorer, if any.
    pub block_explorer_url: Option<String>,
}

impl NetworkConfig {
    /// Chain id as a `0x`-prefixed hex string, the form wallets expect.
    #[must_use]
    pub fn chain_id_hex(&self) -> String {
        format!("{:#x}", self.chain_id)
    }
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            chain_id: 9000,
            chain_name: "Sealed Devnet".to_string(),
            rpc_url: "http://127.0.0.1:8545".to_string(),
            currency_symbol: "ETH".to_string(),
            currency_decimals: 18,
            block_explorer_url: None,
        }
    }
}

/// Configuration of a [`crate::MarketSession`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientConfig {
    /// Target network.
    pub network: NetworkConfig,
    /// Ledger contract address.
    pub contract_address: Address,
    /// Smallest stake accepted before submitting.
    pub min_stake: U256,
    /// Largest stake accepted before submitting.
    pub max_stake: U256,
    /// Longest wait for a transaction receipt.
    pub confirmation_timeout_ms: u64,
}

impl Default for ClientConfig {
    fn default() -> Self {
        let ledger = LedgerConfig::default();
        Self {
            network: NetworkConfig::default(),
            contract_address: ledger.contract_address,
            min_stake: ledger.min_stake,
            max_stake: ledger.max_stake,
            confirmation_timeout_ms: 30_000,
        }
    }
}

impl ClientConfig {
    /// Create configuration from environment variables.
    ///
    /// # Environment Variables
    ///
    /// - `SM_CHAIN_ID`: Chain id (default: 9000)
    /// - `SM_CHAIN_NAME`: Chain name (default: Sealed Devnet)
    /// - `SM_RPC_URL`: RPC endpoint (default: http://127.0.0.1:8545)
    /// - `SM_CURRENCY_SYMBOL`: Native currency (default: ETH)
    /// - `SM_EXPLORER_URL`: Block explorer (default: none)
    /// - `SM_CONTRACT_ADDRESS`: Ledger address, hex (default: devnet ledger)
    /// - `SM_MIN_STAKE`: Minimum stake in ether (default: 0.001)
    /// - `SM_MAX_STAKE`: Maximum stake in ether (default: 10)
    /// - `SM_CONFIRMATION_TIMEOUT_MS`: Receipt timeout (default: 30000)
    pub fn from_env() -> Result<Self, ClientError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build configuration from an arbitrary key lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ClientError> {
        let defaults = Self::default();

        let chain_id = match lookup("SM_CHAIN_ID") {
            Some(raw) => parse_chain_id(&raw)?,
            None => defaults.network.chain_id,
        };
        let contract_address = match lookup("SM_CONTRACT_ADDRESS") {
            Some(raw) => Address::from_hex(&raw)
                .ok_or_else(|| ClientError::Config(format!("invalid SM_CONTRACT_ADDRESS: {raw}")))?,
            None => defaults.contract_address,
        };
        let stake = |key: &str, default: U256| -> Result<U256, ClientError> {
            lookup(key).map_or(Ok(default), |raw| {
                parse_ether(&raw).map_err(|e| ClientError::Config(format!("invalid {key}: {e}")))
            })
        };

        let config = Self {
            network: NetworkConfig {
                chain_id,
                chain_name: lookup("SM_CHAIN_NAME").unwrap_or(defaults.network.chain_name),
                rpc_url: lookup("SM_RPC_URL").unwrap_or(defaults.network.rpc_url),
                currency_symbol: lookup("SM_CURRENCY_SYMBOL")
                    .unwrap_or(defaults.network.currency_symbol),
                currency_decimals: defaults.network.currency_decimals,
                block_explorer_url: lookup("SM_EXPLORER_URL"),
            },
            contract_address,
            min_stake: stake("SM_MIN_STAKE", defaults.min_stake)?,
            max_stake: stake("SM_MAX_STAKE", defaults.max_stake)?,
            confirmation_timeout_ms: lookup("SM_CONFIRMATION_TIMEOUT_MS")
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.confirmation_timeout_ms),
        };
        config.validate()?;
        Ok(config)
    }

    /// Check internal consistency.
    pub fn validate(&self) -> Result<(), ClientError> {
        if self.network.chain_id == 0 {
            return Err(ClientError::Config("chain id must be non-zero".to_string()));
        }
        if self.contract_address.is_zero() {
            return Err(ClientError::Config("contract address must be set".to_string()));
        }
        if self.min_stake.is_zero() || self.min_stake > self.max_stake {
            return Err(ClientError::Config(format!(
                "stake bounds must satisfy 0 < min <= max, got [{}, {}]",
                self.min_stake, self.max_stake
            )));
        }
        Ok(())
    }
}

/// Accept decimal or `0x` hex chain ids.
fn parse_chain_id(raw: &str) -> Result<u64, ClientError> {
    let raw = raw.trim();
    let parsed = match raw.strip_prefix("0x") {
        Some(hex) => u64::from_str_radix(hex, 16),
        None => raw.parse(),
    };
    parsed.map_err(|_| ClientError::Config(format!("invalid SM_CHAIN_ID: {raw}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use market_ledger::domain::value_objects::{ether, milli_ether};
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_default_config() {
        let config = ClientConfig::default();
        assert_eq!(config.network.chain_id, 9000);
        assert_eq!(config.network.chain_id_hex(), "0x2328");
        assert_eq!(config.min_stake, milli_ether(1));
        assert_eq!(config.max_stake, ether(10));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_from_lookup_overrides() {
        let config = ClientConfig::from_lookup(lookup(&[
            ("SM_CHAIN_ID", "0xaa36a7"),
            ("SM_CHAIN_NAME", "Sepolia"),
            ("SM_CONTRACT_ADDRESS", "0x1111111111111111111111111111111111111111"),
            ("SM_MIN_STAKE", "0.01"),
            ("SM_MAX_STAKE", "1"),
            ("SM_CONFIRMATION_TIMEOUT_MS", "500"),
        ]))
        .unwrap();

        assert_eq!(config.network.chain_id, 11_155_111);
        assert_eq!(config.network.chain_name, "Sepolia");
        assert_eq!(config.contract_address, Address::repeat_byte(0x11));
        assert_eq!(config.min_stake, milli_ether(10));
        assert_eq!(config.max_stake, ether(1));
        assert_eq!(config.confirmation_timeout_ms, 500);
    }

    #[test]
    fn test_from_lookup_rejects_bad_values() {
        let bad_address = ClientConfig::from_lookup(lookup(&[("SM_CONTRACT_ADDRESS", "0x12")]));
        assert!(matches!(bad_address, Err(ClientError::Config(_))));

        let inverted = ClientConfig::from_lookup(lookup(&[
            ("SM_MIN_STAKE", "2"),
            ("SM_MAX_STAKE", "1"),
        ]));
        assert!(matches!(inverted, Err(ClientError::Config(_))));

        let bad_chain = ClientConfig::from_lookup(lookup(&[("SM_CHAIN_ID", "mainnet")]));
        assert!(matches!(bad_chain, Err(ClientError::Config(_))));
    }
}
