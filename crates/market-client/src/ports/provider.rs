//! # Provider Port
//!
//! What the session needs from a wallet and its RPC connection: accounts,
//! chain management, transaction submission and read-only ledger queries.

use crate::config::NetworkConfig;
use crate::errors::ProviderError;
use async_trait::async_trait;
use market_ledger::domain::entities::{MarketView, RevealedBet};
use market_ledger::domain::value_objects::{Address, Hash, MarketId, U256};
use market_ledger::ports::inbound::{LedgerCall, Receipt};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A transaction for the wallet to sign and broadcast.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionRequest {
    /// Correlation id for logs across session and provider.
    pub request_id: Uuid,
    /// Signing account.
    pub from: Address,
    /// Ledger contract.
    pub to: Address,
    /// Attached native currency (the stake for `placeBet`).
    pub value: U256,
    /// Entry point and arguments.
    pub call: LedgerCall,
}

/// Wallet + RPC provider.
#[async_trait]
pub trait Provider: Send + Sync {
    /// Ask the wallet for its accounts; may prompt the user.
    async fn request_accounts(&self) -> Result<Vec<Address>, ProviderError>;

    /// Chain the wallet is currently on.
    async fn chain_id(&self) -> Result<u64, ProviderError>;

    /// Switch the wallet to `chain_id`. Fails with `4902` for unknown chains.
    async fn switch_chain(&self, chain_id: u64) -> Result<(), ProviderError>;

    /// Register a network with the wallet.
    async fn add_chain(&self, network: &NetworkConfig) -> Result<(), ProviderError>;

    /// Sign and broadcast a transaction, returning its hash.
    async fn send_transaction(&self, request: TransactionRequest) -> Result<Hash, ProviderError>;

    /// Wait until `tx_hash` is mined and return its receipt.
    async fn wait_for_receipt(&self, tx_hash: Hash) -> Result<Receipt, ProviderError>;

    /// Read a market's public view.
    async fn read_market(
        &self,
        contract: Address,
        market_id: MarketId,
    ) -> Result<MarketView, ProviderError>;

    /// Read the number of markets.
    async fn read_total_markets(&self, contract: Address) -> Result<u64, ProviderError>;

    /// Unseal `requester`'s own bet (the user-decryption flow).
    async fn read_own_bet(
        &self,
        contract: Address,
        market_id: MarketId,
        requester: Address,
    ) -> Result<RevealedBet, ProviderError>;

    /// Native-currency balance.
    async fn balance_of(&self, address: Address) -> Result<U256, ProviderError>;
}
