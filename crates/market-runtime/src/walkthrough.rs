//! # Market Walkthrough
//!
//! Drives one market through its whole lifecycle on a devnet ledger, the way
//! a set of wallet users would: the creator opens the market, each bettor
//! stakes through their own session, the clock passes the end time, the
//! creator resolves and everyone tries to claim.

use anyhow::{anyhow, Context, Result};
use market_client::adapters::DevnetProvider;
use market_client::config::ClientConfig;
use market_client::errors::ClientError;
use market_client::session::{MarketSession, TxConfirmation};
use market_client::units::format_ether;
use market_ledger::domain::entities::MarketView;
use market_ledger::domain::value_objects::{ether, Address, Hash, MarketId, U256};
use market_ledger::ports::inbound::MarketLedgerApi;
use market_ledger::service::{DevnetLedger, ServiceStats};
use market_telemetry::{log_market_event, time_histogram, TRANSACTIONS, TX_CONFIRMATION_DURATION};
use serde::Serialize;
use std::future::Future;
use std::sync::Arc;
use tracing::info;

const COMPONENT: &str = "walkthrough";

/// Default dev accounts.
pub const ALICE: Address = Address::repeat_byte(0xa1);
/// Default dev accounts.
pub const BOB: Address = Address::repeat_byte(0xb0);
/// Default dev accounts.
pub const CAROL: Address = Address::repeat_byte(0xc0);

/// One scripted bet.
#[derive(Debug, Clone)]
pub struct PlannedBet {
    /// Display name.
    pub label: String,
    /// Betting account.
    pub account: Address,
    /// YES or NO.
    pub prediction: bool,
    /// Stake in wei.
    pub stake: U256,
}

/// What the walkthrough does.
#[derive(Debug, Clone)]
pub struct WalkthroughPlan {
    /// Market question.
    pub question: String,
    /// Market duration in seconds.
    pub duration: u64,
    /// Outcome the creator resolves with.
    pub outcome: bool,
    /// Market creator and resolver.
    pub creator: Address,
    /// Bets, placed in order.
    pub bets: Vec<PlannedBet>,
}

impl Default for WalkthroughPlan {
    fn default() -> Self {
        let bet = |label: &str, account, prediction, stake| PlannedBet {
            label: label.to_string(),
            account,
            prediction,
            stake,
        };
        Self {
            question: "Will the devnet reach block 1000 by Friday?".to_string(),
            duration: 86_400,
            outcome: true,
            creator: ALICE,
            bets: vec![
                bet("alice", ALICE, true, ether(1)),
                bet("bob", BOB, false, ether(3)),
                bet("carol", CAROL, true, ether(1)),
            ],
        }
    }
}

impl WalkthroughPlan {
    /// Every account the plan touches, creator first, without duplicates.
    #[must_use]
    pub fn accounts(&self) -> Vec<Address> {
        let mut accounts = vec![self.creator];
        for bet in &self.bets {
            if !accounts.contains(&bet.account) {
                accounts.push(bet.account);
            }
        }
        accounts
    }
}

/// A confirmed walkthrough step.
#[derive(Debug, Clone, Serialize)]
pub struct StepRecord {
    /// Step name.
    pub step: String,
    /// Sending account.
    pub account: Address,
    /// Transaction hash.
    pub tx_hash: Hash,
    /// Block number.
    pub block_number: u64,
}

/// Per-bettor outcome.
#[derive(Debug, Clone, Serialize)]
pub struct BettorReport {
    /// Display name.
    pub label: String,
    /// Betting account.
    pub account: Address,
    /// Prediction as unsealed for the owner.
    pub prediction: bool,
    /// Stake as unsealed for the owner, in ether.
    pub stake: String,
    /// Payout in ether, if the claim went through.
    pub payout: Option<String>,
    /// Friendly error, if the claim reverted.
    pub claim_error: Option<String>,
    /// Final balance in ether.
    pub balance: String,
}

/// Result of a walkthrough.
#[derive(Debug, Clone, Serialize)]
pub struct WalkthroughReport {
    /// Final market state.
    pub market: MarketView,
    /// Confirmed transactions, in order.
    pub steps: Vec<StepRecord>,
    /// Bettor outcomes, in plan order.
    pub bettors: Vec<BettorReport>,
    /// Ether left in escrow.
    pub escrow_balance: String,
    /// Ledger counters.
    pub stats: ServiceStats,
}

type DevnetSession = MarketSession<DevnetProvider<DevnetLedger>>;

/// Runs walkthroughs against one ledger.
pub struct Walkthrough {
    ledger: Arc<DevnetLedger>,
    client: ClientConfig,
}

impl Walkthrough {
    /// Bind to `ledger`. The client's contract address is taken from the
    /// ledger.
    pub fn new(ledger: Arc<DevnetLedger>, mut client: ClientConfig) -> Self {
        client.contract_address = ledger.contract_address();
        Self { ledger, client }
    }

    /// Open a wallet session for `account`.
    pub async fn session(&self, account: Address) -> Result<DevnetSession, ClientError> {
        let provider = DevnetProvider::new(
            Arc::clone(&self.ledger),
            self.client.network.clone(),
            vec![account],
        );
        MarketSession::connect(Arc::new(provider), self.client.clone()).await
    }

    /// Run `plan` to completion.
    pub async fn run(&self, plan: &WalkthroughPlan) -> Result<WalkthroughReport> {
        let mut steps = Vec::new();

        let creator = self
            .session(plan.creator)
            .await
            .context("Failed to connect creator session")?;
        let created = tracked(
            "createMarket",
            creator.create_market(&plan.question, plan.duration),
        )
        .await
        .context("Failed to create market")?;
        let market_id = created
            .market_id
            .ok_or_else(|| anyhow!("createMarket receipt carried no market id"))?;
        steps.push(record("createMarket", plan.creator, &created));
        log_market_event!(info, COMPONENT, "Market opened", market_id, question = %plan.question);

        let mut sessions = Vec::with_capacity(plan.bets.len());
        for bet in &plan.bets {
            let session = self
                .session(bet.account)
                .await
                .with_context(|| format!("Failed to connect session for {}", bet.label))?;
            let placed = tracked(
                "placeBet",
                session.place_bet(market_id, bet.prediction, bet.stake),
            )
            .await
            .with_context(|| format!("Bet by {} failed", bet.label))?;
            steps.push(record("placeBet", bet.account, &placed));
            sessions.push(session);
        }

        let now = self.ledger.clock().advance(plan.duration);
        info!(component = COMPONENT, now, "Clock advanced past end time");

        let resolved = tracked(
            "resolveMarket",
            creator.resolve_market(market_id, plan.outcome),
        )
        .await
        .context("Failed to resolve market")?;
        steps.push(record("resolveMarket", plan.creator, &resolved));

        let mut bettors = Vec::with_capacity(plan.bets.len());
        for (bet, session) in plan.bets.iter().zip(&sessions) {
            bettors.push(self.settle(market_id, bet, session, &mut steps).await?);
        }

        let market = creator
            .get_market(market_id)
            .await
            .context("Failed to read final market state")?;
        let escrow = self
            .ledger
            .balance_of(self.ledger.contract_address())
            .await
            .context("Failed to read escrow balance")?;

        Ok(WalkthroughReport {
            market,
            steps,
            bettors,
            escrow_balance: format_ether(escrow),
            stats: self.ledger.stats().await,
        })
    }

    async fn settle(
        &self,
        market_id: MarketId,
        bet: &PlannedBet,
        session: &DevnetSession,
        steps: &mut Vec<StepRecord>,
    ) -> Result<BettorReport> {
        let (payout, claim_error) =
            match tracked("claimWinnings", session.claim_winnings(market_id)).await {
                Ok(confirmation) => {
                    steps.push(record("claimWinnings", bet.account, &confirmation));
                    (confirmation.payout.map(format_ether), None)
                }
                Err(err @ ClientError::Reverted { .. }) => {
                    info!(component = COMPONENT, bettor = %bet.label, reason = %err, "Claim reverted");
                    (None, Some(err.to_string()))
                }
                Err(err) => {
                    return Err(err).with_context(|| format!("Claim by {} failed", bet.label))
                }
            };

        let revealed = session
            .reveal_my_bet(market_id)
            .await
            .with_context(|| format!("Failed to reveal bet of {}", bet.label))?;
        let balance = session
            .balance()
            .await
            .with_context(|| format!("Failed to read balance of {}", bet.label))?;

        Ok(BettorReport {
            label: bet.label.clone(),
            account: bet.account,
            prediction: revealed.prediction,
            stake: format_ether(revealed.stake),
            payout,
            claim_error,
            balance: format_ether(balance),
        })
    }
}

fn record(step: &str, account: Address, confirmation: &TxConfirmation) -> StepRecord {
    StepRecord {
        step: step.to_string(),
        account,
        tx_hash: confirmation.tx_hash,
        block_number: confirmation.block_number,
    }
}

/// Time a client transaction and count it by outcome.
async fn tracked<F>(call: &'static str, transaction: F) -> Result<TxConfirmation, ClientError>
where
    F: Future<Output = Result<TxConfirmation, ClientError>>,
{
    let result = {
        let _timer = time_histogram!(TX_CONFIRMATION_DURATION);
        transaction.await
    };
    let outcome = match &result {
        Ok(_) => "confirmed",
        Err(ClientError::Reverted { .. }) => "reverted",
        Err(ClientError::Rejected) => "rejected",
        Err(_) => "failed",
    };
    TRANSACTIONS.with_label_values(&[call, outcome]).inc();
    result
}

// =============================================================================
// TESTS
// =============================================================================
