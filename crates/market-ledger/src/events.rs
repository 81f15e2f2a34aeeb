//! # Event Schema
//!
//! Events emitted by committed ledger transactions. Observers rebuild market
//! state from this stream without reading storage.
//!
//! | Event | Emitted by |
//! |-------|------------|
//! | `MarketCreated` | `create_market` |
//! | `BetPlaced` | `place_bet` |
//! | `MarketResolved` | `resolve_market` |
//! | `WinningsClaimed` | `claim_winnings` |

use crate::domain::value_objects::{Address, CiphertextHandle, Hash, MarketId, Timestamp, U256};
use serde::{Deserialize, Serialize};

/// A ledger event.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum MarketEvent {
    /// A new market opened.
    MarketCreated {
        /// New market id.
        market_id: MarketId,
        /// Creator (sole resolver).
        creator: Address,
        /// Question text.
        question: String,
        /// Betting closes at this instant.
        end_time: Timestamp,
    },
    /// A sealed bet was recorded.
    ///
    /// Carries handles only; the stake is visible solely through the
    /// market's public totals.
    BetPlaced {
        /// Market id.
        market_id: MarketId,
        /// Bettor.
        bettor: Address,
        /// Handle of the sealed stake.
        stake_handle: CiphertextHandle,
        /// Handle of the sealed prediction.
        prediction_handle: CiphertextHandle,
    },
    /// The creator fixed the outcome.
    MarketResolved {
        /// Market id.
        market_id: MarketId,
        /// Winning side.
        outcome: bool,
        /// Final YES total.
        total_yes: U256,
        /// Final NO total.
        total_no: U256,
    },
    /// A bettor collected a payout.
    WinningsClaimed {
        /// Market id.
        market_id: MarketId,
        /// Bettor.
        bettor: Address,
        /// Amount transferred out of escrow.
        payout: U256,
    },
}

impl MarketEvent {
    /// Market the event refers to.
    #[must_use]
    pub fn market_id(&self) -> MarketId {
        match self {
            Self::MarketCreated { market_id, .. }
            | Self::BetPlaced { market_id, .. }
            | Self::MarketResolved { market_id, .. }
            | Self::WinningsClaimed { market_id, .. } => *market_id,
        }
    }

    /// Topic name the event is published under.
    #[must_use]
    pub fn topic(&self) -> &'static str {
        match self {
            Self::MarketCreated { .. } => topics::MARKET_CREATED,
            Self::BetPlaced { .. } => topics::BET_PLACED,
            Self::MarketResolved { .. } => topics::MARKET_RESOLVED,
            Self::WinningsClaimed { .. } => topics::WINNINGS_CLAIMED,
        }
    }
}

/// An event together with the transaction that emitted it.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventEnvelope {
    /// Emitting transaction.
    pub tx_hash: Hash,
    /// Sequence number of the emitting transaction.
    pub block_number: u64,
    /// Position of the event within its transaction.
    pub log_index: u32,
    /// The event.
    pub event: MarketEvent,
}

/// Event topics.
pub mod topics {
    /// Market creation.
    pub const MARKET_CREATED: &str = "markets.created";

    /// Bet placement.
    pub const BET_PLACED: &str = "markets.bet_placed";

    /// Market resolution.
    pub const MARKET_RESOLVED: &str = "markets.resolved";

    /// Winnings claimed.
    pub const WINNINGS_CLAIMED: &str = "markets.winnings_claimed";
}

// =============================================================================
// TESTS
// =============================================================================
