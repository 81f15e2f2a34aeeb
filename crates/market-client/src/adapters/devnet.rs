//! # Devnet Provider
//!
//! In-process wallet + RPC backed directly by a [`MarketLedgerApi`]. Blocks
//! are mined instantly, so receipts are available as soon as a transaction
//! is sent. The wallet side keeps a list of known chains and a current
//! chain, and can be told to decline the next prompt.

use crate::config::NetworkConfig;
use crate::errors::{codes, ProviderError};
use crate::ports::provider::{Provider, TransactionRequest};
use async_trait::async_trait;
use market_ledger::domain::entities::{MarketView, RevealedBet};
use market_ledger::domain::value_objects::{Address, Hash, MarketId, U256};
use market_ledger::ports::inbound::{MarketLedgerApi, Receipt, Transaction};
use market_ledger::errors::LedgerError;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

/// In-process devnet provider.
pub struct DevnetProvider<L: MarketLedgerApi> {
    ledger: Arc<L>,
    ledger_chain_id: u64,
    accounts: Vec<Address>,
    current_chain: RwLock<u64>,
    known_chains: RwLock<HashMap<u64, NetworkConfig>>,
    receipts: RwLock<HashMap<Hash, Receipt>>,
    reject_next: AtomicBool,
    receipt_delay_ms: AtomicU64,
    switch_requests: AtomicU64,
    add_requests: AtomicU64,
}

impl<L: MarketLedgerApi> DevnetProvider<L> {
    /// Create a provider whose ledger lives on `network`. The wallet starts
    /// on that network and already knows it.
    pub fn new(ledger: Arc<L>, network: NetworkConfig, accounts: Vec<Address>) -> Self {
        let chain_id = network.chain_id;
        Self {
            ledger,
            ledger_chain_id: chain_id,
            accounts,
            current_chain: RwLock::new(chain_id),
            known_chains: RwLock::new(HashMap::from([(chain_id, network)])),
            receipts: RwLock::new(HashMap::new()),
            reject_next: AtomicBool::new(false),
            receipt_delay_ms: AtomicU64::new(0),
            switch_requests: AtomicU64::new(0),
            add_requests: AtomicU64::new(0),
        }
    }

    /// Put the wallet on another chain, which it then knows.
    #[must_use]
    pub fn on_chain(self, chain_id: u64) -> Self {
        *self.current_chain.write() = chain_id;
        self.known_chains.write().insert(
            chain_id,
            NetworkConfig {
                chain_id,
                chain_name: format!("Chain {chain_id}"),
                ..NetworkConfig::default()
            },
        );
        self
    }

    /// Make the wallet forget a chain, so switching to it fails with `4902`.
    #[must_use]
    pub fn forget_chain(self, chain_id: u64) -> Self {
        self.known_chains.write().remove(&chain_id);
        self
    }

    /// Decline the next wallet prompt with `4001`.
    pub fn reject_next_request(&self) {
        self.reject_next.store(true, Ordering::SeqCst);
    }

    /// Delay every receipt by `delay`.
    pub fn set_receipt_delay(&self, delay: Duration) {
        let millis = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX);
        self.receipt_delay_ms.store(millis, Ordering::SeqCst);
    }

    /// Returns true if the wallet knows `chain_id`.
    #[must_use]
    pub fn knows_chain(&self, chain_id: u64) -> bool {
        self.known_chains.read().contains_key(&chain_id)
    }

    /// Number of `switch_chain` calls seen.
    #[must_use]
    pub fn switch_requests(&self) -> u64 {
        self.switch_requests.load(Ordering::Relaxed)
    }

    /// Number of `add_chain` calls seen.
    #[must_use]
    pub fn add_requests(&self) -> u64 {
        self.add_requests.load(Ordering::Relaxed)
    }

    /// The backing ledger.
    pub fn ledger(&self) -> &Arc<L> {
        &self.ledger
    }

    fn take_rejection(&self) -> Result<(), ProviderError> {
        if self.reject_next.swap(false, Ordering::SeqCst) {
            Err(ProviderError::user_rejected())
        } else {
            Ok(())
        }
    }

    fn check_contract(&self, contract: Address) -> Result<(), ProviderError> {
        if contract == self.ledger.contract_address() {
            Ok(())
        } else {
            Err(ProviderError::new(
                codes::SERVER_ERROR,
                format!("no contract code at {}", contract.to_hex()),
            ))
        }
    }

    async fn next_nonce(&self, account: Address) -> Result<u64, ProviderError> {
        self.ledger
            .transaction_count(account)
            .await
            .map_err(|e| ProviderError::new(codes::INTERNAL_ERROR, e.to_string()))
    }
}

#[async_trait]
impl<L: MarketLedgerApi> Provider for DevnetProvider<L> {
    async fn request_accounts(&self) -> Result<Vec<Address>, ProviderError> {
        self.take_rejection()?;
        Ok(self.accounts.clone())
    }

    async fn chain_id(&self) -> Result<u64, ProviderError> {
        Ok(*self.current_chain.read())
    }

    async fn switch_chain(&self, chain_id: u64) -> Result<(), ProviderError> {
        self.switch_requests.fetch_add(1, Ordering::Relaxed);
        self.take_rejection()?;
        if !self.knows_chain(chain_id) {
            return Err(ProviderError::unrecognized_chain(chain_id));
        }
        *self.current_chain.write() = chain_id;
        info!(chain_id, "Wallet switched chain");
        Ok(())
    }

    async fn add_chain(&self, network: &NetworkConfig) -> Result<(), ProviderError> {
        self.add_requests.fetch_add(1, Ordering::Relaxed);
        self.take_rejection()?;
        self.known_chains
            .write()
            .insert(network.chain_id, network.clone());
        info!(chain_id = network.chain_id, name = %network.chain_name, "Wallet added chain");
        Ok(())
    }

    async fn send_transaction(&self, request: TransactionRequest) -> Result<Hash, ProviderError> {
        self.take_rejection()?;
        if !self.accounts.contains(&request.from) {
            return Err(ProviderError::new(
                codes::UNAUTHORIZED,
                "The requested account has not been authorized by the user.",
            ));
        }
        let chain = *self.current_chain.read();
        if chain != self.ledger_chain_id {
            return Err(ProviderError::new(
                codes::SERVER_ERROR,
                format!(
                    "wallet is on chain {chain:#x}, ledger is on {:#x}",
                    self.ledger_chain_id
                ),
            ));
        }

        let tx = Transaction {
            from: request.from,
            to: request.to,
            value: request.value,
            nonce: self.next_nonce(request.from).await?,
            call: request.call,
        };
        debug!(request_id = %request.request_id, call = tx.call.name(), "Broadcasting transaction");

        let receipt = self
            .ledger
            .execute(tx)
            .await
            .map_err(|e| {
                let code = if matches!(e, LedgerError::NonceTooLow { .. }) {
                    codes::SERVER_ERROR
                } else {
                    codes::INTERNAL_ERROR
                };
                ProviderError::new(code, e.to_string())
            })?;
        let tx_hash = receipt.tx_hash;
        self.receipts.write().insert(tx_hash, receipt);
        Ok(tx_hash)
    }

    async fn wait_for_receipt(&self, tx_hash: Hash) -> Result<Receipt, ProviderError> {
        let delay = self.receipt_delay_ms.load(Ordering::SeqCst);
        if delay > 0 {
            tokio::time::sleep(Duration::from_millis(delay)).await;
        }
        self.receipts.read().get(&tx_hash).cloned().ok_or_else(|| {
            ProviderError::new(
                codes::RESOURCE_NOT_FOUND,
                format!("transaction {tx_hash:?} not found"),
            )
        })
    }

    async fn read_market(
        &self,
        contract: Address,
        market_id: MarketId,
    ) -> Result<MarketView, ProviderError> {
        self.check_contract(contract)?;
        self.ledger
            .get_market(market_id)
            .await
            .map_err(ProviderError::execution_reverted)
    }

    async fn read_total_markets(&self, contract: Address) -> Result<u64, ProviderError> {
        self.check_contract(contract)?;
        self.ledger
            .total_markets()
            .await
            .map_err(ProviderError::execution_reverted)
    }

    async fn read_own_bet(
        &self,
        contract: Address,
        market_id: MarketId,
        requester: Address,
    ) -> Result<RevealedBet, ProviderError> {
        self.check_contract(contract)?;
        if !self.accounts.contains(&requester) {
            return Err(ProviderError::new(
                codes::UNAUTHORIZED,
                "The requested account has not been authorized by the user.",
            ));
        }
        self.ledger
            .reveal_bet(market_id, requester)
            .await
            .map_err(ProviderError::execution_reverted)
    }

    async fn balance_of(&self, address: Address) -> Result<U256, ProviderError> {
        self.ledger
            .balance_of(address)
            .await
            .map_err(ProviderError::execution_reverted)
    }
}

// =============================================================================
// TESTS
// =============================================================================
