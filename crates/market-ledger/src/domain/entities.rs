//! # Core Domain Entities
//!
//! Markets, bets and the configuration that bounds them.

use crate::domain::value_objects::{
    ether, milli_ether, Address, CiphertextHandle, MarketId, Timestamp, U256,
};
use serde::{Deserialize, Serialize};

// =============================================================================
// LEDGER CONFIGURATION
// =============================================================================

/// How `claim_winnings` determines the per-user stake fed into the payout
/// formula.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum PayoutPolicy {
    /// Unseal the bettor's own stake and prediction; only winning bets pay.
    #[default]
    SealedStake,
    /// Use a fixed stake for every claimant and ignore the prediction.
    FixedStake(U256),
}

/// Ledger configuration.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct LedgerConfig {
    /// Address the ledger contract lives at; stakes are escrowed here.
    pub contract_address: Address,
    /// Minimum accepted stake (inclusive).
    pub min_stake: U256,
    /// Maximum accepted stake (inclusive).
    pub max_stake: U256,
    /// Maximum question length in bytes.
    pub max_question_len: usize,
    /// Payout computation.
    pub payout_policy: PayoutPolicy,
}

impl LedgerConfig {
    /// Default contract address (0x5e...5e).
    pub const DEFAULT_CONTRACT_ADDRESS: Address = Address::repeat_byte(0x5e);

    /// Stake used by [`PayoutPolicy::FixedStake`] unless overridden: 0.01 ether.
    #[must_use]
    pub fn default_fixed_stake() -> U256 {
        milli_ether(10)
    }

    /// Returns true if `stake` lies within the configured bounds.
    #[must_use]
    pub fn stake_in_bounds(&self, stake: U256) -> bool {
        stake >= self.min_stake && stake <= self.max_stake
    }
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            contract_address: Self::DEFAULT_CONTRACT_ADDRESS,
            min_stake: milli_ether(1),
            max_stake: ether(10),
            max_question_len: 256,
            payout_policy: PayoutPolicy::default(),
        }
    }
}

// =============================================================================
// MARKET
// =============================================================================

/// Lifecycle phase of a market at a given instant.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum MarketStatus {
    /// Before end time, unresolved. Accepts bets.
    Open,
    /// At or past end time, unresolved. Awaiting the creator's resolution.
    Ended,
    /// Outcome fixed.
    Resolved,
}

/// A binary-outcome market.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Market {
    /// Sequential identifier.
    pub id: MarketId,
    /// The proposition being predicted.
    pub question: String,
    /// Betting closes at this instant.
    pub end_time: Timestamp,
    /// Public aggregate of YES stakes.
    pub total_yes: U256,
    /// Public aggregate of NO stakes.
    pub total_no: U256,
    /// One-way flag set by resolution.
    pub resolved: bool,
    /// Meaningful only once `resolved` is true.
    pub outcome: bool,
    /// Only this address may resolve.
    pub creator: Address,
}

impl Market {
    /// Creates a fresh, open market.
    #[must_use]
    pub fn new(id: MarketId, question: String, end_time: Timestamp, creator: Address) -> Self {
        Self {
            id,
            question,
            end_time,
            total_yes: U256::zero(),
            total_no: U256::zero(),
            resolved: false,
            outcome: false,
            creator,
        }
    }

    /// Lifecycle phase at `now`.
    #[must_use]
    pub fn status_at(&self, now: Timestamp) -> MarketStatus {
        if self.resolved {
            MarketStatus::Resolved
        } else if now < self.end_time {
            MarketStatus::Open
        } else {
            MarketStatus::Ended
        }
    }

    /// Total staked on both sides.
    #[must_use]
    pub fn total_staked(&self) -> U256 {
        self.total_yes.saturating_add(self.total_no)
    }

    /// `(winning_pool, losing_pool)` for the resolved outcome.
    #[must_use]
    pub fn pools(&self) -> (U256, U256) {
        if self.outcome {
            (self.total_yes, self.total_no)
        } else {
            (self.total_no, self.total_yes)
        }
    }

    /// Public projection of this market.
    #[must_use]
    pub fn view(&self, now: Timestamp) -> MarketView {
        MarketView {
            id: self.id,
            question: self.question.clone(),
            end_time: self.end_time,
            total_yes: self.total_yes,
            total_no: self.total_no,
            resolved: self.resolved,
            outcome: self.resolved.then_some(self.outcome),
            creator: self.creator,
            status: self.status_at(now),
        }
    }
}

/// Read-only projection returned by `get_market`.
///
/// Carries the public rollup only; per-bet stakes and predictions never
/// appear here.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MarketView {
    /// Market identifier.
    pub id: MarketId,
    /// Question text.
    pub question: String,
    /// End timestamp.
    pub end_time: Timestamp,
    /// Aggregate YES stake.
    pub total_yes: U256,
    /// Aggregate NO stake.
    pub total_no: U256,
    /// Resolution flag.
    pub resolved: bool,
    /// `None` until resolved.
    pub outcome: Option<bool>,
    /// Creator address.
    pub creator: Address,
    /// Phase at query time.
    pub status: MarketStatus,
}

// =============================================================================
// BET
// =============================================================================

/// One participant's sealed position on a market.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Bet {
    /// Owning market.
    pub market_id: MarketId,
    /// Sealed stake amount.
    pub stake: CiphertextHandle,
    /// Sealed YES/NO prediction.
    pub prediction: CiphertextHandle,
    /// One-way flag set by a successful claim.
    pub claimed: bool,
    /// Owner. Never the zero address for a stored bet.
    pub bettor: Address,
}

impl Bet {
    /// Handle-only projection.
    #[must_use]
    pub fn view(&self) -> BetView {
        BetView {
            market_id: self.market_id,
            bettor: self.bettor,
            stake_handle: self.stake,
            prediction_handle: self.prediction,
            claimed: self.claimed,
        }
    }
}

/// Read-only bet projection: handles and claim status, no plaintext.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BetView {
    /// Owning market.
    pub market_id: MarketId,
    /// Owner.
    pub bettor: Address,
    /// Handle of the sealed stake.
    pub stake_handle: CiphertextHandle,
    /// Handle of the sealed prediction.
    pub prediction_handle: CiphertextHandle,
    /// Whether winnings were claimed.
    pub claimed: bool,
}

/// A bet unsealed for its owner.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RevealedBet {
    /// Owning market.
    pub market_id: MarketId,
    /// Plaintext stake.
    pub stake: U256,
    /// Plaintext prediction.
    pub prediction: bool,
    /// Whether winnings were claimed.
    pub claimed: bool,
}

// =============================================================================
// STATE CHANGES
// =============================================================================

/// A single write produced by a successful entry point.
///
/// Entry points compute their full change set before anything is written;
/// the store applies a change set atomically.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum StateChange {
    /// Insert or overwrite a market record.
    PutMarket(Market),
    /// Insert or overwrite a bet record.
    PutBet(Bet),
    /// Set an account balance.
    SetBalance {
        /// Account.
        address: Address,
        /// New balance.
        balance: U256,
    },
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn market(end_time: Timestamp) -> Market {
        Market::new(0, "Will it rain?".to_string(), end_time, Address::repeat_byte(1))
    }

    #[test]
    fn test_status_transitions_with_time() {
        let mut m = market(100);
        assert_eq!(m.status_at(99), MarketStatus::Open);
        assert_eq!(m.status_at(100), MarketStatus::Ended);
        assert_eq!(m.status_at(1_000), MarketStatus::Ended);

        m.resolved = true;
        assert_eq!(m.status_at(0), MarketStatus::Resolved);
    }

    #[test]
    fn test_pools_follow_outcome() {
        let mut m = market(100);
        m.total_yes = U256::from(30);
        m.total_no = U256::from(70);

        m.outcome = true;
        assert_eq!(m.pools(), (U256::from(30), U256::from(70)));

        m.outcome = false;
        assert_eq!(m.pools(), (U256::from(70), U256::from(30)));
        assert_eq!(m.total_staked(), U256::from(100));
    }

    #[test]
    fn test_view_hides_outcome_until_resolved() {
        let mut m = market(100);
        m.outcome = true;
        assert_eq!(m.view(0).outcome, None);

        m.resolved = true;
        assert_eq!(m.view(0).outcome, Some(true));
        assert_eq!(m.view(0).status, MarketStatus::Resolved);
    }

    #[test]
    fn test_default_config_bounds() {
        let config = LedgerConfig::default();
        assert!(config.stake_in_bounds(milli_ether(1)));
        assert!(config.stake_in_bounds(milli_ether(10)));
        assert!(config.stake_in_bounds(ether(10)));
        assert!(!config.stake_in_bounds(milli_ether(1) - 1));
        assert!(!config.stake_in_bounds(ether(10) + 1));
        assert_eq!(config.payout_policy, PayoutPolicy::SealedStake);
    }
}
