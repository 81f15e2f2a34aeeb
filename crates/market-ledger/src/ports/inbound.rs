//! # Driving Ports (API - Inbound)
//!
//! The interface the ledger exposes to clients: four state-changing entry
//! points, read queries, and transaction execution with receipts.

use crate::domain::entities::{BetView, MarketStatus, MarketView, RevealedBet};
use crate::domain::services::keccak256;
use crate::domain::value_objects::{Address, Hash, MarketId, U256};
use crate::errors::{ErrorKind, LedgerError};
use crate::events::MarketEvent;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

// =============================================================================
// TRANSACTIONS
// =============================================================================

/// A ledger entry point invocation.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum LedgerCall {
    /// `create_market(question, duration)`.
    CreateMarket {
        /// Question text.
        question: String,
        /// Seconds until betting closes.
        duration: u64,
    },
    /// `place_bet(market_id, prediction)`; the stake travels as `value`.
    PlaceBet {
        /// Target market.
        market_id: MarketId,
        /// YES (`true`) or NO (`false`).
        prediction: bool,
    },
    /// `resolve_market(market_id, outcome)`.
    ResolveMarket {
        /// Target market.
        market_id: MarketId,
        /// Winning side.
        outcome: bool,
    },
    /// `claim_winnings(market_id)`.
    ClaimWinnings {
        /// Target market.
        market_id: MarketId,
    },
}

impl LedgerCall {
    /// Entry point name, for logs.
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            Self::CreateMarket { .. } => "createMarket",
            Self::PlaceBet { .. } => "placeBet",
            Self::ResolveMarket { .. } => "resolveMarket",
            Self::ClaimWinnings { .. } => "claimWinnings",
        }
    }
}

/// A signed transaction addressed to the ledger.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transaction {
    /// Sender; the `caller` of the entry point.
    pub from: Address,
    /// Must equal the ledger's contract address.
    pub to: Address,
    /// Attached native currency (the stake for `PlaceBet`).
    pub value: U256,
    /// Sender-chosen nonce, mixed into the hash.
    pub nonce: u64,
    /// Entry point.
    pub call: LedgerCall,
}

impl Transaction {
    /// Keccak-256 over the JSON encoding of the transaction.
    #[must_use]
    pub fn hash(&self) -> Hash {
        let encoded = serde_json::to_vec(self).unwrap_or_default();
        keccak256(&encoded)
    }
}

/// Result of executing a transaction.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Receipt {
    /// Transaction hash.
    pub tx_hash: Hash,
    /// Sequence number assigned by the ledger.
    pub block_number: u64,
    /// True if the entry point committed.
    pub success: bool,
    /// Events emitted (empty on revert).
    pub events: Vec<MarketEvent>,
    /// Revert reason on failure.
    pub revert_reason: Option<String>,
    /// Failure classification.
    pub error_kind: Option<ErrorKind>,
}

impl Receipt {
    /// Market id carried by the first `MarketCreated` event, if any.
    #[must_use]
    pub fn created_market_id(&self) -> Option<MarketId> {
        self.events.iter().find_map(|event| match event {
            MarketEvent::MarketCreated { market_id, .. } => Some(*market_id),
            _ => None,
        })
    }

    /// Payout carried by the first `WinningsClaimed` event, if any.
    #[must_use]
    pub fn payout(&self) -> Option<U256> {
        self.events.iter().find_map(|event| match event {
            MarketEvent::WinningsClaimed { payout, .. } => Some(*payout),
            _ => None,
        })
    }
}

// =============================================================================
// LEDGER API
// =============================================================================

/// Primary API for the market ledger.
///
/// Every state-changing method is serialised with every other; a failing
/// call leaves all state untouched.
#[async_trait]
pub trait MarketLedgerApi: Send + Sync {
    /// The ledger's own address.
    fn contract_address(&self) -> Address;

    /// Opens a new market and returns its id.
    async fn create_market(
        &self,
        caller: Address,
        question: String,
        duration: u64,
    ) -> Result<MarketId, LedgerError>;

    /// Records a sealed bet paid for with `stake`.
    async fn place_bet(
        &self,
        caller: Address,
        market_id: MarketId,
        prediction: bool,
        stake: U256,
    ) -> Result<(), LedgerError>;

    /// Fixes the outcome of an ended market.
    async fn resolve_market(
        &self,
        caller: Address,
        market_id: MarketId,
        outcome: bool,
    ) -> Result<(), LedgerError>;

    /// Pays out a winning bet and returns the payout.
    async fn claim_winnings(&self, caller: Address, market_id: MarketId)
        -> Result<U256, LedgerError>;

    /// Executes a transaction and returns its receipt.
    ///
    /// Entry point failures produce an unsuccessful receipt. A nonce below
    /// the sender's [`transaction_count`](Self::transaction_count) is
    /// refused with `NonceTooLow` before anything runs; store failures also
    /// surface as `Err`.
    async fn execute(&self, tx: Transaction) -> Result<Receipt, LedgerError>;

    /// Next nonce the ledger accepts from `address`.
    async fn transaction_count(&self, address: Address) -> Result<u64, LedgerError>;

    /// Public view of a market.
    async fn get_market(&self, market_id: MarketId) -> Result<MarketView, LedgerError>;

    /// Number of markets ever created.
    async fn total_markets(&self) -> Result<u64, LedgerError>;

    /// Lifecycle phase of a market right now.
    async fn market_status(&self, market_id: MarketId) -> Result<MarketStatus, LedgerError>;

    /// Handle-only view of a bet.
    async fn get_bet(
        &self,
        market_id: MarketId,
        bettor: Address,
    ) -> Result<Option<BetView>, LedgerError>;

    /// Unseals the requester's own bet.
    async fn reveal_bet(
        &self,
        market_id: MarketId,
        requester: Address,
    ) -> Result<RevealedBet, LedgerError>;

    /// Native-currency balance of an account.
    async fn balance_of(&self, address: Address) -> Result<U256, LedgerError>;
}

// =============================================================================
// TESTS
// =============================================================================
