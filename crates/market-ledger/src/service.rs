//! # Market Ledger Service
//!
//! Executes ledger transactions against the outbound ports.
//!
//! Each entry point validates its input, derives the full change set it
//! would apply, checks the domain invariants against the stored records and
//! only then commits. Anything that fails before the commit leaves markets,
//! bets and balances untouched and emits no events.
//!
//! State-changing calls are serialized behind one async mutex, which also
//! owns the block counter and per-sender nonces. Reads go straight to the
//! store.

use crate::adapters::{InMemoryConfidentialStore, InMemoryEventBus, InMemoryMarketStore, ManualClock};
use crate::domain::entities::{
    Bet, BetView, LedgerConfig, Market, MarketStatus, MarketView, PayoutPolicy, RevealedBet,
    StateChange,
};
use crate::domain::invariants::{check_bet_transition, check_market_transition, InvariantCheckResult};
use crate::domain::services::{compute_end_time, compute_payout, validate_question, validate_stake};
use crate::domain::value_objects::{Address, CiphertextHandle, Hash, MarketId, Timestamp, U256};
use crate::errors::{AclError, LedgerError, StoreError};
use crate::events::{EventEnvelope, MarketEvent};
use crate::ports::inbound::{LedgerCall, MarketLedgerApi, Receipt, Transaction};
use crate::ports::outbound::{Clock, ConfidentialCompute, EventSink, MarketStore};

use async_trait::async_trait;
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, error, info, instrument, warn};

/// Start time of a freshly created devnet ledger (2024-01-01T00:00:00Z).
pub const DEVNET_GENESIS_TIME: Timestamp = 1_704_067_200;

/// Ledger service configuration.
#[derive(Debug, Clone)]
pub struct ServiceConfig {
    /// Contract address, stake bounds, payout policy.
    pub ledger: LedgerConfig,
    /// Upper bound on a single transaction, store round-trips included.
    pub execution_timeout_ms: u64,
    /// Run invariant checks on every change set before committing.
    pub check_invariants: bool,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            ledger: LedgerConfig::default(),
            execution_timeout_ms: 5000,
            check_invariants: true,
        }
    }
}

/// Statistics for the ledger service.
#[derive(Debug, Default, Clone, Serialize)]
pub struct ServiceStats {
    /// Transactions processed, reverted ones included.
    pub transactions_executed: u64,
    /// Committed transactions.
    pub successful_executions: u64,
    /// Reverted transactions.
    pub reverted_executions: u64,
    /// Markets created.
    pub markets_created: u64,
    /// Bets placed.
    pub bets_placed: u64,
    /// Markets resolved.
    pub markets_resolved: u64,
    /// Successful claims.
    pub claims_paid: u64,
    /// Sum of all payouts.
    pub total_paid_out: U256,
}

#[derive(Debug, Default)]
struct Sequencer {
    block_number: u64,
    nonces: HashMap<Address, u64>,
}

impl Sequencer {
    fn next_block(&mut self) -> u64 {
        self.block_number += 1;
        self.block_number
    }

    fn next_nonce(&mut self, sender: Address) -> u64 {
        let nonce = self.nonces.entry(sender).or_insert(0);
        let current = *nonce;
        *nonce += 1;
        current
    }

    fn expected_nonce(&self, sender: Address) -> u64 {
        self.nonces.get(&sender).copied().unwrap_or(0)
    }

    fn observe_nonce(&mut self, sender: Address, used: u64) {
        let nonce = self.nonces.entry(sender).or_insert(0);
        *nonce = (*nonce).max(used.saturating_add(1));
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CallOutput {
    Created(MarketId),
    Done,
    Paid(U256),
}

struct Effects {
    changes: Vec<StateChange>,
    events: Vec<MarketEvent>,
    output: CallOutput,
    /// Handles sealed while applying; discarded if the change set fails.
    sealed: Vec<CiphertextHandle>,
}

struct Processed {
    tx_hash: Hash,
    block_number: u64,
    result: Result<(CallOutput, Vec<MarketEvent>), LedgerError>,
}

/// The confidential market ledger.
pub struct LedgerService<S: MarketStore, K: ConfidentialCompute, C: Clock, E: EventSink> {
    /// Service configuration.
    config: ServiceConfig,
    /// Market, bet and balance storage.
    store: Arc<S>,
    /// Sealing backend and access lists.
    confidential: Arc<K>,
    /// Time source for the lifecycle checks.
    clock: Arc<C>,
    /// Event sink for committed events.
    events: Arc<E>,
    /// Serializes transactions; owns block number and nonces.
    sequencer: Mutex<Sequencer>,
    /// Service statistics.
    stats: RwLock<ServiceStats>,
}

impl<S, K, C, E> LedgerService<S, K, C, E>
where
    S: MarketStore,
    K: ConfidentialCompute,
    C: Clock,
    E: EventSink,
{
    /// Create a ledger over the given adapters.
    pub fn new(
        store: Arc<S>,
        confidential: Arc<K>,
        clock: Arc<C>,
        events: Arc<E>,
        config: ServiceConfig,
    ) -> Self {
        Self {
            config,
            store,
            confidential,
            clock,
            events,
            sequencer: Mutex::new(Sequencer::default()),
            stats: RwLock::new(ServiceStats::default()),
        }
    }

    /// Service configuration.
    pub fn config(&self) -> &ServiceConfig {
        &self.config
    }

    /// Get current service statistics.
    pub async fn stats(&self) -> ServiceStats {
        self.stats.read().await.clone()
    }

    /// The market store.
    pub fn store(&self) -> &Arc<S> {
        &self.store
    }

    /// The confidential backend.
    pub fn confidential(&self) -> &Arc<K> {
        &self.confidential
    }

    /// The clock.
    pub fn clock(&self) -> &Arc<C> {
        &self.clock
    }

    /// The event sink.
    pub fn events(&self) -> &Arc<E> {
        &self.events
    }

    /// Run a call on behalf of `caller` with the next nonce, as if the
    /// caller had signed it.
    async fn submit(
        &self,
        caller: Address,
        value: U256,
        call: LedgerCall,
    ) -> Result<CallOutput, LedgerError> {
        let mut sequencer = self.sequencer.lock().await;
        let tx = Transaction {
            from: caller,
            to: self.config.ledger.contract_address,
            value,
            nonce: sequencer.next_nonce(caller),
            call,
        };
        self.process(&mut sequencer, &tx)
            .await
            .result
            .map(|(output, _)| output)
    }

    #[instrument(
        skip(self, sequencer, tx),
        fields(call = tx.call.name(), from = %tx.from, nonce = tx.nonce)
    )]
    async fn process(&self, sequencer: &mut Sequencer, tx: &Transaction) -> Processed {
        let tx_hash = tx.hash();
        let block_number = sequencer.next_block();

        let timeout = Duration::from_millis(self.config.execution_timeout_ms);
        let result = match tokio::time::timeout(timeout, self.run(tx)).await {
            Ok(result) => result,
            Err(_) => {
                error!(timeout_ms = self.config.execution_timeout_ms, "Transaction timed out");
                Err(StoreError::Unavailable.into())
            }
        };

        {
            let mut stats = self.stats.write().await;
            stats.transactions_executed += 1;
            match &result {
                Ok((output, _)) => {
                    stats.successful_executions += 1;
                    match (&tx.call, output) {
                        (LedgerCall::CreateMarket { .. }, _) => stats.markets_created += 1,
                        (LedgerCall::PlaceBet { .. }, _) => stats.bets_placed += 1,
                        (LedgerCall::ResolveMarket { .. }, _) => stats.markets_resolved += 1,
                        (LedgerCall::ClaimWinnings { .. }, CallOutput::Paid(payout)) => {
                            stats.claims_paid += 1;
                            stats.total_paid_out = stats.total_paid_out.saturating_add(*payout);
                        }
                        (LedgerCall::ClaimWinnings { .. }, _) => {}
                    }
                }
                Err(_) => stats.reverted_executions += 1,
            }
        }

        match &result {
            Ok((_, events)) => {
                for (log_index, event) in events.iter().enumerate() {
                    let envelope = EventEnvelope {
                        tx_hash,
                        block_number,
                        log_index: log_index as u32,
                        event: event.clone(),
                    };
                    let receivers = self.events.publish(envelope).await;
                    debug!(topic = event.topic(), receivers, "Event published");
                }
                info!(%tx_hash, block_number, events = events.len(), "Transaction committed");
            }
            Err(error) => {
                warn!(
                    %tx_hash,
                    block_number,
                    reason = %error,
                    kind = ?error.kind(),
                    "Transaction reverted"
                );
            }
        }

        Processed {
            tx_hash,
            block_number,
            result,
        }
    }

    async fn run(&self, tx: &Transaction) -> Result<(CallOutput, Vec<MarketEvent>), LedgerError> {
        let Effects {
            changes,
            events,
            output,
            sealed,
        } = self.apply(tx).await?;

        if let Err(error) = self.settle(changes).await {
            if !sealed.is_empty() {
                debug!(handles = sealed.len(), "Discarding sealed values of failed transaction");
            }
            self.discard_sealed(&sealed);
            return Err(error);
        }
        Ok((output, events))
    }

    async fn settle(&self, changes: Vec<StateChange>) -> Result<(), LedgerError> {
        if self.config.check_invariants {
            self.verify(&changes).await?;
        }
        self.store.commit(changes).await?;
        Ok(())
    }

    async fn apply(&self, tx: &Transaction) -> Result<Effects, LedgerError> {
        let ledger = &self.config.ledger;
        if tx.from.is_zero() {
            return Err(LedgerError::InvalidCaller);
        }
        if tx.to != ledger.contract_address {
            return Err(LedgerError::UnknownContract(tx.to));
        }
        if !matches!(tx.call, LedgerCall::PlaceBet { .. }) && !tx.value.is_zero() {
            return Err(LedgerError::UnexpectedValue(tx.value));
        }

        let now = self.clock.now();
        match &tx.call {
            LedgerCall::CreateMarket { question, duration } => {
                self.apply_create(tx.from, question, *duration, now).await
            }
            LedgerCall::PlaceBet {
                market_id,
                prediction,
            } => {
                self.apply_bet(tx.from, *market_id, *prediction, tx.value, now)
                    .await
            }
            LedgerCall::ResolveMarket { market_id, outcome } => {
                self.apply_resolve(tx.from, *market_id, *outcome, now).await
            }
            LedgerCall::ClaimWinnings { market_id } => self.apply_claim(tx.from, *market_id).await,
        }
    }

    async fn apply_create(
        &self,
        caller: Address,
        question: &str,
        duration: u64,
        now: Timestamp,
    ) -> Result<Effects, LedgerError> {
        validate_question(question, &self.config.ledger)?;
        let end_time = compute_end_time(now, duration)?;
        let market_id = self.store.market_count().await?;

        let market = Market::new(market_id, question.to_string(), end_time, caller);
        Ok(Effects {
            changes: vec![StateChange::PutMarket(market)],
            events: vec![MarketEvent::MarketCreated {
                market_id,
                creator: caller,
                question: question.to_string(),
                end_time,
            }],
            output: CallOutput::Created(market_id),
            sealed: Vec::new(),
        })
    }

    async fn apply_bet(
        &self,
        caller: Address,
        market_id: MarketId,
        prediction: bool,
        stake: U256,
        now: Timestamp,
    ) -> Result<Effects, LedgerError> {
        let contract = self.config.ledger.contract_address;
        let mut market = self.load_market(market_id).await?;
        if market.status_at(now) != MarketStatus::Open {
            return Err(LedgerError::MarketEnded);
        }
        validate_stake(stake, &self.config.ledger)?;
        if self.store.has_bet(market_id, caller).await? {
            return Err(LedgerError::DuplicateBet);
        }
        let available = self.store.get_balance(caller).await?;
        if stake > available {
            return Err(LedgerError::InsufficientFunds {
                required: stake,
                available,
            });
        }

        let mut changes = self.transfer(caller, contract, stake).await?;
        let side = if prediction {
            &mut market.total_yes
        } else {
            &mut market.total_no
        };
        *side = side.checked_add(stake).ok_or(LedgerError::Overflow)?;

        let stake_handle = self.confidential.seal_amount(stake);
        let prediction_handle = self.confidential.seal_bool(prediction);
        let sealed = vec![stake_handle, prediction_handle];
        if let Err(error) = self.grant(&sealed, &[caller, contract]) {
            self.discard_sealed(&sealed);
            return Err(error.into());
        }

        changes.push(StateChange::PutMarket(market));
        changes.push(StateChange::PutBet(Bet {
            market_id,
            stake: stake_handle,
            prediction: prediction_handle,
            claimed: false,
            bettor: caller,
        }));

        Ok(Effects {
            changes,
            events: vec![MarketEvent::BetPlaced {
                market_id,
                bettor: caller,
                stake_handle,
                prediction_handle,
            }],
            output: CallOutput::Done,
            sealed,
        })
    }

    async fn apply_resolve(
        &self,
        caller: Address,
        market_id: MarketId,
        outcome: bool,
        now: Timestamp,
    ) -> Result<Effects, LedgerError> {
        let mut market = self.load_market(market_id).await?;
        if caller != market.creator {
            return Err(LedgerError::NotCreator);
        }
        if market.resolved {
            return Err(LedgerError::AlreadyResolved);
        }
        if now < market.end_time {
            return Err(LedgerError::MarketNotEnded);
        }

        market.resolved = true;
        market.outcome = outcome;
        let event = MarketEvent::MarketResolved {
            market_id,
            outcome,
            total_yes: market.total_yes,
            total_no: market.total_no,
        };
        Ok(Effects {
            changes: vec![StateChange::PutMarket(market)],
            events: vec![event],
            output: CallOutput::Done,
            sealed: Vec::new(),
        })
    }

    async fn apply_claim(&self, caller: Address, market_id: MarketId) -> Result<Effects, LedgerError> {
        let contract = self.config.ledger.contract_address;
        let market = self.load_market(market_id).await?;
        if !market.resolved {
            return Err(LedgerError::MarketNotResolved);
        }
        let mut bet = self
            .store
            .get_bet(market_id, caller)
            .await?
            .ok_or(LedgerError::NoBet)?;
        if bet.claimed {
            return Err(LedgerError::AlreadyClaimed);
        }

        let stake = match self.config.ledger.payout_policy {
            PayoutPolicy::SealedStake => {
                let prediction = self.confidential.unseal_bool(bet.prediction, contract)?;
                if prediction != market.outcome {
                    return Err(LedgerError::NoWinnings);
                }
                self.confidential.unseal_amount(bet.stake, contract)?
            }
            PayoutPolicy::FixedStake(amount) => amount,
        };

        let (winning_pool, losing_pool) = market.pools();
        let payout = compute_payout(stake, winning_pool, losing_pool)?;
        let escrow = self.store.get_balance(contract).await?;
        if payout > escrow {
            return Err(LedgerError::InsufficientLiquidity { payout, escrow });
        }

        bet.claimed = true;
        let mut changes = vec![StateChange::PutBet(bet)];
        changes.extend(self.transfer(contract, caller, payout).await?);

        Ok(Effects {
            changes,
            events: vec![MarketEvent::WinningsClaimed {
                market_id,
                bettor: caller,
                payout,
            }],
            output: CallOutput::Paid(payout),
            sealed: Vec::new(),
        })
    }

    /// Balance updates moving `amount` from `from` to `to`. The caller has
    /// already checked that `from` can cover it.
    async fn transfer(
        &self,
        from: Address,
        to: Address,
        amount: U256,
    ) -> Result<Vec<StateChange>, LedgerError> {
        if from == to {
            return Ok(Vec::new());
        }
        let from_balance = self
            .store
            .get_balance(from)
            .await?
            .checked_sub(amount)
            .ok_or(LedgerError::Overflow)?;
        let to_balance = self
            .store
            .get_balance(to)
            .await?
            .checked_add(amount)
            .ok_or(LedgerError::Overflow)?;
        Ok(vec![
            StateChange::SetBalance {
                address: from,
                balance: from_balance,
            },
            StateChange::SetBalance {
                address: to,
                balance: to_balance,
            },
        ])
    }

    async fn verify(&self, changes: &[StateChange]) -> Result<(), LedgerError> {
        for change in changes {
            let result = match change {
                StateChange::PutMarket(after) => match self.store.get_market(after.id).await? {
                    Some(before) => check_market_transition(&before, after),
                    None => InvariantCheckResult::Valid,
                },
                StateChange::PutBet(after) => {
                    let before = self.store.get_bet(after.market_id, after.bettor).await?;
                    check_bet_transition(before.as_ref(), after)
                }
                StateChange::SetBalance { .. } => InvariantCheckResult::Valid,
            };

            if let InvariantCheckResult::Invalid(violations) = result {
                let detail = violations
                    .iter()
                    .map(ToString::to_string)
                    .collect::<Vec<_>>()
                    .join("; ");
                error!(%detail, "Invariant violation, refusing to commit");
                return Err(StoreError::Inconsistent(detail).into());
            }
        }
        Ok(())
    }

    fn grant(&self, handles: &[CiphertextHandle], subjects: &[Address]) -> Result<(), AclError> {
        for &handle in handles {
            for &subject in subjects {
                self.confidential.allow(handle, subject)?;
            }
        }
        Ok(())
    }

    fn discard_sealed(&self, handles: &[CiphertextHandle]) {
        for &handle in handles {
            self.confidential.discard(handle);
        }
    }

    async fn load_market(&self, market_id: MarketId) -> Result<Market, LedgerError> {
        self.store
            .get_market(market_id)
            .await?
            .ok_or(LedgerError::MarketNotFound(market_id))
    }
}

/// Ledger wired to in-memory adapters and a manual clock.
pub type DevnetLedger =
    LedgerService<InMemoryMarketStore, InMemoryConfidentialStore, ManualClock, InMemoryEventBus>;

/// Create a devnet ledger with funded accounts, starting at `start`.
pub fn create_devnet_service(
    config: ServiceConfig,
    allocations: impl IntoIterator<Item = (Address, U256)>,
    start: Timestamp,
) -> DevnetLedger {
    LedgerService::new(
        Arc::new(InMemoryMarketStore::with_balances(allocations)),
        Arc::new(InMemoryConfidentialStore::default()),
        Arc::new(ManualClock::new(start)),
        Arc::new(InMemoryEventBus::new()),
        config,
    )
}

/// Create a default service with in-memory adapters (for testing).
#[must_use]
pub fn create_test_service() -> DevnetLedger {
    create_devnet_service(ServiceConfig::default(), std::iter::empty(), DEVNET_GENESIS_TIME)
}

// =============================================================================
// MarketLedgerApi Implementation
// =============================================================================

#[async_trait]
impl<S, K, C, E> MarketLedgerApi for LedgerService<S, K, C, E>
where
    S: MarketStore,
    K: ConfidentialCompute,
    C: Clock,
    E: EventSink,
{
    fn contract_address(&self) -> Address {
        self.config.ledger.contract_address
    }

    async fn create_market(
        &self,
        caller: Address,
        question: String,
        duration: u64,
    ) -> Result<MarketId, LedgerError> {
        match self
            .submit(caller, U256::zero(), LedgerCall::CreateMarket { question, duration })
            .await?
        {
            CallOutput::Created(market_id) => Ok(market_id),
            other => Err(StoreError::Inconsistent(format!("createMarket produced {other:?}")).into()),
        }
    }

    async fn place_bet(
        &self,
        caller: Address,
        market_id: MarketId,
        prediction: bool,
        stake: U256,
    ) -> Result<(), LedgerError> {
        self.submit(
            caller,
            stake,
            LedgerCall::PlaceBet {
                market_id,
                prediction,
            },
        )
        .await
        .map(|_| ())
    }

    async fn resolve_market(
        &self,
        caller: Address,
        market_id: MarketId,
        outcome: bool,
    ) -> Result<(), LedgerError> {
        self.submit(
            caller,
            U256::zero(),
            LedgerCall::ResolveMarket { market_id, outcome },
        )
        .await
        .map(|_| ())
    }

    async fn claim_winnings(
        &self,
        caller: Address,
        market_id: MarketId,
    ) -> Result<U256, LedgerError> {
        match self
            .submit(caller, U256::zero(), LedgerCall::ClaimWinnings { market_id })
            .await?
        {
            CallOutput::Paid(payout) => Ok(payout),
            other => Err(StoreError::Inconsistent(format!("claimWinnings produced {other:?}")).into()),
        }
    }

    async fn execute(&self, tx: Transaction) -> Result<Receipt, LedgerError> {
        let mut sequencer = self.sequencer.lock().await;
        let expected = sequencer.expected_nonce(tx.from);
        if tx.nonce < expected {
            warn!(from = %tx.from, expected, got = tx.nonce, "Nonce already used, transaction refused");
            return Err(LedgerError::NonceTooLow {
                expected,
                got: tx.nonce,
            });
        }
        sequencer.observe_nonce(tx.from, tx.nonce);
        let processed = self.process(&mut sequencer, &tx).await;

        match processed.result {
            Ok((_, events)) => Ok(Receipt {
                tx_hash: processed.tx_hash,
                block_number: processed.block_number,
                success: true,
                events,
                revert_reason: None,
                error_kind: None,
            }),
            Err(LedgerError::Store(e)) => Err(LedgerError::Store(e)),
            Err(error) => Ok(Receipt {
                tx_hash: processed.tx_hash,
                block_number: processed.block_number,
                success: false,
                events: Vec::new(),
                revert_reason: Some(error.to_string()),
                error_kind: Some(error.kind()),
            }),
        }
    }

    async fn transaction_count(&self, address: Address) -> Result<u64, LedgerError> {
        Ok(self.sequencer.lock().await.expected_nonce(address))
    }

    async fn get_market(&self, market_id: MarketId) -> Result<MarketView, LedgerError> {
        debug!(market_id, "get_market");
        Ok(self.load_market(market_id).await?.view(self.clock.now()))
    }

    async fn total_markets(&self) -> Result<u64, LedgerError> {
        Ok(self.store.market_count().await?)
    }

    async fn market_status(&self, market_id: MarketId) -> Result<MarketStatus, LedgerError> {
        Ok(self.load_market(market_id).await?.status_at(self.clock.now()))
    }

    async fn get_bet(
        &self,
        market_id: MarketId,
        bettor: Address,
    ) -> Result<Option<BetView>, LedgerError> {
        self.load_market(market_id).await?;
        Ok(self
            .store
            .get_bet(market_id, bettor)
            .await?
            .map(|bet| bet.view()))
    }

    async fn reveal_bet(
        &self,
        market_id: MarketId,
        requester: Address,
    ) -> Result<RevealedBet, LedgerError> {
        self.load_market(market_id).await?;
        let bet = self
            .store
            .get_bet(market_id, requester)
            .await?
            .ok_or(LedgerError::NoBet)?;

        debug!(market_id, %requester, "Unsealing bet for its owner");
        Ok(RevealedBet {
            market_id,
            stake: self.confidential.unseal_amount(bet.stake, requester)?,
            prediction: self.confidential.unseal_bool(bet.prediction, requester)?,
            claimed: bet.claimed,
        })
    }

    async fn balance_of(&self, address: Address) -> Result<U256, LedgerError> {
        Ok(self.store.get_balance(address).await?)
    }
}

// =============================================================================
// TESTS
// =============================================================================
