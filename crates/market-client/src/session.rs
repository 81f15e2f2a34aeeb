//! # Market Session
//!
//! An explicit session object holding the provider, the connected account
//! and the configuration. Every operation goes through it; nothing lives in
//! module-level state.
//!
//! Transactions are validated locally first, so obviously bad input never
//! costs a fee. The session then checks the wallet network, submits the
//! transaction, and waits for its receipt up to the confirmation timeout.

use crate::config::{ClientConfig, NetworkConfig};
use crate::errors::ClientError;
use crate::ports::provider::{Provider, TransactionRequest};
use crate::units::format_ether;
use market_ledger::domain::entities::{MarketView, RevealedBet};
use market_ledger::domain::value_objects::{Address, Hash, MarketId, U256};
use market_ledger::ports::inbound::{LedgerCall, Receipt};
use std::sync::Arc;
use std::time::Duration;
use market_telemetry::{log_event, log_tx_event};
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

/// A confirmed transaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TxConfirmation {
    /// Transaction hash.
    pub tx_hash: Hash,
    /// Block it was mined in.
    pub block_number: u64,
    /// New market id, for `createMarket`.
    pub market_id: Option<MarketId>,
    /// Amount paid out, for `claimWinnings`.
    pub payout: Option<U256>,
}

impl From<&Receipt> for TxConfirmation {
    fn from(receipt: &Receipt) -> Self {
        Self {
            tx_hash: receipt.tx_hash,
            block_number: receipt.block_number,
            market_id: receipt.created_market_id(),
            payout: receipt.payout(),
        }
    }
}

/// A connected wallet session against the ledger.
pub struct MarketSession<P: Provider> {
    provider: Arc<P>,
    config: ClientConfig,
    account: Address,
}

impl<P: Provider> std::fmt::Debug for MarketSession<P> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MarketSession")
            .field("account", &self.account)
            .field("chain_id", &self.config.network.chain_id)
            .field("contract", &self.config.contract_address)
            .finish_non_exhaustive()
    }
}

impl<P: Provider> MarketSession<P> {
    /// Connect: request accounts, then make sure the wallet is on the
    /// configured network.
    #[instrument(skip(provider, config), fields(chain_id = config.network.chain_id))]
    pub async fn connect(provider: Arc<P>, config: ClientConfig) -> Result<Self, ClientError> {
        config.validate()?;

        let accounts = provider.request_accounts().await?;
        let account = *accounts
            .first()
            .ok_or_else(|| ClientError::Connectivity("No wallet accounts available".to_string()))?;

        ensure_network(provider.as_ref(), &config.network).await?;
        log_event!(info, "session", "Session connected", account = %account);

        Ok(Self {
            provider,
            config,
            account,
        })
    }

    /// Connected account.
    pub fn account(&self) -> Address {
        self.account
    }

    /// Session configuration.
    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Underlying provider.
    pub fn provider(&self) -> &Arc<P> {
        &self.provider
    }

    /// Create a market lasting `duration` seconds.
    pub async fn create_market(
        &self,
        question: &str,
        duration: u64,
    ) -> Result<TxConfirmation, ClientError> {
        if question.trim().is_empty() {
            return Err(ClientError::Validation("Question cannot be empty".to_string()));
        }
        if duration == 0 {
            return Err(ClientError::Validation("Duration must be positive".to_string()));
        }
        self.transact(
            U256::zero(),
            LedgerCall::CreateMarket {
                question: question.to_string(),
                duration,
            },
        )
        .await
    }

    /// Bet `stake` wei on `prediction`.
    pub async fn place_bet(
        &self,
        market_id: MarketId,
        prediction: bool,
        stake: U256,
    ) -> Result<TxConfirmation, ClientError> {
        if stake < self.config.min_stake || stake > self.config.max_stake {
            return Err(ClientError::Validation(format!(
                "Bet amount must be between {} and {} {}",
                format_ether(self.config.min_stake),
                format_ether(self.config.max_stake),
                self.config.network.currency_symbol
            )));
        }
        self.transact(
            stake,
            LedgerCall::PlaceBet {
                market_id,
                prediction,
            },
        )
        .await
    }

    /// Resolve a market this account created.
    pub async fn resolve_market(
        &self,
        market_id: MarketId,
        outcome: bool,
    ) -> Result<TxConfirmation, ClientError> {
        self.transact(U256::zero(), LedgerCall::ResolveMarket { market_id, outcome })
            .await
    }

    /// Claim winnings on a resolved market.
    pub async fn claim_winnings(&self, market_id: MarketId) -> Result<TxConfirmation, ClientError> {
        self.transact(U256::zero(), LedgerCall::ClaimWinnings { market_id })
            .await
    }

    /// Public view of a market.
    pub async fn get_market(&self, market_id: MarketId) -> Result<MarketView, ClientError> {
        debug!(market_id, "Reading market");
        Ok(self
            .provider
            .read_market(self.config.contract_address, market_id)
            .await?)
    }

    /// Number of markets.
    pub async fn total_markets(&self) -> Result<u64, ClientError> {
        Ok(self
            .provider
            .read_total_markets(self.config.contract_address)
            .await?)
    }

    /// Unseal this account's own bet on `market_id`.
    pub async fn reveal_my_bet(&self, market_id: MarketId) -> Result<RevealedBet, ClientError> {
        Ok(self
            .provider
            .read_own_bet(self.config.contract_address, market_id, self.account)
            .await?)
    }

    /// Balance of the connected account.
    pub async fn balance(&self) -> Result<U256, ClientError> {
        Ok(self.provider.balance_of(self.account).await?)
    }

    #[instrument(
        skip(self, value, call),
        fields(call = call.name(), request_id = tracing::field::Empty)
    )]
    async fn transact(&self, value: U256, call: LedgerCall) -> Result<TxConfirmation, ClientError> {
        ensure_network(self.provider.as_ref(), &self.config.network).await?;

        let request_id = Uuid::new_v4();
        tracing::Span::current().record("request_id", tracing::field::display(request_id));
        let request = TransactionRequest {
            request_id,
            from: self.account,
            to: self.config.contract_address,
            value,
            call,
        };

        let tx_hash = self.provider.send_transaction(request).await?;
        log_tx_event!(debug, "session", "Transaction sent, awaiting receipt", tx_hash);

        let timeout = Duration::from_millis(self.config.confirmation_timeout_ms);
        let receipt = tokio::time::timeout(timeout, self.provider.wait_for_receipt(tx_hash))
            .await
            .map_err(|_| ClientError::Timeout(tx_hash))??;

        if receipt.success {
            log_tx_event!(
                info,
                "session",
                "Transaction confirmed",
                tx_hash,
                block = receipt.block_number
            );
            Ok(TxConfirmation::from(&receipt))
        } else {
            let reason = receipt
                .revert_reason
                .unwrap_or_else(|| "execution reverted".to_string());
            log_tx_event!(warn, "session", "Transaction reverted", tx_hash, reason = %reason);
            Err(ClientError::reverted(reason, receipt.error_kind))
        }
    }
}

/// Make sure the wallet is on `network`: switch if needed, add the chain and
/// retry the switch once if the wallet does not know it, then re-verify.
#[instrument(skip(provider, network), fields(target = network.chain_id))]
pub async fn ensure_network<P: Provider + ?Sized>(
    provider: &P,
    network: &NetworkConfig,
) -> Result<(), ClientError> {
    let current = provider.chain_id().await?;
    if current == network.chain_id {
        return Ok(());
    }

    info!(current, "Wrong network, requesting switch");
    match provider.switch_chain(network.chain_id).await {
        Ok(()) => {}
        Err(error) if error.is_unrecognized_chain() => {
            warn!(chain = %network.chain_id_hex(), "Chain unknown to wallet, adding it");
            provider.add_chain(network).await?;
            provider.switch_chain(network.chain_id).await?;
        }
        Err(error) => return Err(error.into()),
    }

    let now_on = provider.chain_id().await?;
    if now_on == network.chain_id {
        Ok(())
    } else {
        Err(ClientError::Connectivity(format!(
            "Please switch your wallet to {} (chain {})",
            network.chain_name, network.chain_id
        )))
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::DevnetProvider;
    use market_ledger::domain::value_objects::{ether, milli_ether};
    use market_ledger::ports::inbound::MarketLedgerApi;
    use market_ledger::service::{create_devnet_service, DevnetLedger, ServiceConfig, DEVNET_GENESIS_TIME};

    const ALICE: Address = Address::repeat_byte(0xa1);

    fn provider() -> DevnetProvider<DevnetLedger> {
        let ledger = Arc::new(create_devnet_service(
            ServiceConfig::default(),
            [(ALICE, ether(10))],
            DEVNET_GENESIS_TIME,
        ));
        DevnetProvider::new(ledger, NetworkConfig::default(), vec![ALICE])
    }

    #[tokio::test]
    async fn test_connect_on_correct_network() {
        let provider = Arc::new(provider());
        let session = MarketSession::connect(provider.clone(), ClientConfig::default())
            .await
            .unwrap();
        assert_eq!(session.account(), ALICE);
        assert_eq!(provider.switch_requests(), 0);
    }

    #[tokio::test]
    async fn test_connect_switches_known_chain() {
        let provider = Arc::new(provider().on_chain(1));
        MarketSession::connect(provider.clone(), ClientConfig::default())
            .await
            .unwrap();
        assert_eq!(provider.chain_id().await.unwrap(), 9000);
        assert_eq!(provider.switch_requests(), 1);
        assert_eq!(provider.add_requests(), 0);
    }

    #[tokio::test]
    async fn test_connect_adds_unknown_chain_then_switches() {
        let provider = Arc::new(provider().on_chain(1).forget_chain(9000));
        MarketSession::connect(provider.clone(), ClientConfig::default())
            .await
            .unwrap();
        assert_eq!(provider.chain_id().await.unwrap(), 9000);
        assert_eq!(provider.add_requests(), 1);
        assert_eq!(provider.switch_requests(), 2);
    }

    #[tokio::test]
    async fn test_connect_without_accounts() {
        let ledger = Arc::new(create_devnet_service(
            ServiceConfig::default(),
            std::iter::empty(),
            DEVNET_GENESIS_TIME,
        ));
        let provider = Arc::new(DevnetProvider::new(ledger, NetworkConfig::default(), vec![]));
        let error = MarketSession::connect(provider, ClientConfig::default())
            .await
            .unwrap_err();
        assert!(error.is_connectivity());
    }

    #[tokio::test]
    async fn test_connect_rejected_by_user() {
        let provider = Arc::new(provider());
        provider.reject_next_request();
        let error = MarketSession::connect(provider, ClientConfig::default())
            .await
            .unwrap_err();
        assert_eq!(error, ClientError::Rejected);
    }

    #[tokio::test]
    async fn test_client_validation_submits_nothing() {
        let provider = Arc::new(provider());
        let session = MarketSession::connect(provider.clone(), ClientConfig::default())
            .await
            .unwrap();

        assert!(matches!(
            session.create_market("  ", 60).await,
            Err(ClientError::Validation(_))
        ));
        assert!(matches!(
            session.create_market("q", 0).await,
            Err(ClientError::Validation(_))
        ));
        let too_small = session.place_bet(0, true, U256::from(5)).await.unwrap_err();
        assert_eq!(
            too_small.to_string(),
            "Bet amount must be between 0.001 and 10.0 ETH"
        );

        assert_eq!(provider.ledger().stats().await.transactions_executed, 0);
    }

    #[tokio::test]
    async fn test_revert_is_translated() {
        let provider = Arc::new(provider());
        let session = MarketSession::connect(provider.clone(), ClientConfig::default())
            .await
            .unwrap();

        let created = session.create_market("Will it snow?", 60).await.unwrap();
        let id = created.market_id.expect("market id");
        session.place_bet(id, true, milli_ether(10)).await.unwrap();

        let duplicate = session.place_bet(id, false, milli_ether(10)).await.unwrap_err();
        assert_eq!(
            duplicate.to_string(),
            "You have already placed a bet on this market"
        );
        assert!(matches!(duplicate, ClientError::Reverted { .. }));
    }

    #[tokio::test]
    async fn test_receipt_timeout() {
        let provider = Arc::new(provider());
        let config = ClientConfig {
            confirmation_timeout_ms: 20,
            ..ClientConfig::default()
        };
        let session = MarketSession::connect(provider.clone(), config).await.unwrap();
        provider.set_receipt_delay(Duration::from_millis(500));

        let error = session.create_market("slow", 60).await.unwrap_err();
        assert!(matches!(error, ClientError::Timeout(_)));
    }

    #[tokio::test]
    async fn test_reads_and_reveal() {
        let provider = Arc::new(provider());
        let session = MarketSession::connect(provider.clone(), ClientConfig::default())
            .await
            .unwrap();

        let id = session
            .create_market("Q", 60)
            .await
            .unwrap()
            .market_id
            .expect("market id");
        session.place_bet(id, false, milli_ether(10)).await.unwrap();

        assert_eq!(session.total_markets().await.unwrap(), 1);
        let view = session.get_market(id).await.unwrap();
        assert_eq!(view.total_no, milli_ether(10));

        let mine = session.reveal_my_bet(id).await.unwrap();
        assert!(!mine.prediction);
        assert_eq!(mine.stake, milli_ether(10));
        assert_eq!(session.balance().await.unwrap(), milli_ether(9_990));

        let missing = session.get_market(9).await.unwrap_err();
        assert_eq!(missing.to_string(), "Market not found");
        assert!(provider.ledger().total_markets().await.is_ok());
    }
}
