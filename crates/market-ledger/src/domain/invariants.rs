//! # Domain Invariants
//!
//! Invariants that must hold across every committed transition of a market
//! or bet. The service checks them on each change set before committing.
//!
//! - Resolution is one-way
//! - Outcome is immutable once resolved
//! - At most one bet per (market, bettor)
//! - A claim flips `claimed` false→true exactly once
//! - Public totals never shrink while a market is unresolved

use crate::domain::entities::{Bet, Market};
use crate::domain::value_objects::{Address, MarketId};

// =============================================================================
// INVARIANT CHECKS
// =============================================================================

/// `resolved` never goes from true back to false.
#[must_use]
pub fn check_resolution_monotonic(before: &Market, after: &Market) -> bool {
    !before.resolved || after.resolved
}

/// Once resolved, the outcome never changes.
#[must_use]
pub fn check_outcome_frozen(before: &Market, after: &Market) -> bool {
    !before.resolved || before.outcome == after.outcome
}

/// Totals only grow before resolution and are frozen afterwards.
#[must_use]
pub fn check_totals_monotonic(before: &Market, after: &Market) -> bool {
    if before.resolved {
        before.total_yes == after.total_yes && before.total_no == after.total_no
    } else {
        after.total_yes >= before.total_yes && after.total_no >= before.total_no
    }
}

/// A new bet may only be written where none existed.
#[must_use]
pub fn check_single_bet(existing: Option<&Bet>, incoming: &Bet) -> bool {
    match existing {
        None => !incoming.bettor.is_zero(),
        Some(prev) => {
            prev.bettor == incoming.bettor
                && prev.stake == incoming.stake
                && prev.prediction == incoming.prediction
        }
    }
}

/// `claimed` never goes from true back to false, and is only set on an
/// otherwise unchanged bet.
#[must_use]
pub fn check_claim_once(before: &Bet, after: &Bet) -> bool {
    if before.claimed {
        after.claimed && before == after
    } else {
        true
    }
}

/// Check every market-level invariant between two versions of a market.
#[must_use]
pub fn check_market_transition(before: &Market, after: &Market) -> InvariantCheckResult {
    let mut violations = Vec::new();

    if before.id != after.id || before.creator != after.creator || before.end_time != after.end_time {
        violations.push(InvariantViolation::ImmutableFieldChanged { market_id: before.id });
    }
    if !check_resolution_monotonic(before, after) {
        violations.push(InvariantViolation::ResolutionReverted { market_id: before.id });
    }
    if !check_outcome_frozen(before, after) {
        violations.push(InvariantViolation::OutcomeChanged { market_id: before.id });
    }
    if !check_totals_monotonic(before, after) {
        violations.push(InvariantViolation::TotalsRegressed { market_id: before.id });
    }

    InvariantCheckResult::from_violations(violations)
}

/// Check every bet-level invariant for a write over an optional prior record.
#[must_use]
pub fn check_bet_transition(before: Option<&Bet>, after: &Bet) -> InvariantCheckResult {
    let mut violations = Vec::new();

    if !check_single_bet(before, after) {
        violations.push(InvariantViolation::DuplicateBet {
            market_id: after.market_id,
            bettor: after.bettor,
        });
    }
    if let Some(prev) = before {
        if !check_claim_once(prev, after) {
            violations.push(InvariantViolation::ClaimReverted {
                market_id: after.market_id,
                bettor: after.bettor,
            });
        }
    }

    InvariantCheckResult::from_violations(violations)
}

// =============================================================================
// INVARIANT TYPES
// =============================================================================

/// Result of checking a set of invariants.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum InvariantCheckResult {
    /// All invariants hold.
    Valid,
    /// One or more invariants violated.
    Invalid(Vec<InvariantViolation>),
}

impl InvariantCheckResult {
    fn from_violations(violations: Vec<InvariantViolation>) -> Self {
        if violations.is_empty() {
            Self::Valid
        } else {
            Self::Invalid(violations)
        }
    }

    /// Returns true if all invariants hold.
    #[must_use]
    pub fn is_valid(&self) -> bool {
        matches!(self, Self::Valid)
    }
}

/// A specific invariant violation.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum InvariantViolation {
    /// id, creator or end time changed.
    ImmutableFieldChanged { market_id: MarketId },
    /// `resolved` went true→false.
    ResolutionReverted { market_id: MarketId },
    /// Outcome changed after resolution.
    OutcomeChanged { market_id: MarketId },
    /// Totals shrank or moved after resolution.
    TotalsRegressed { market_id: MarketId },
    /// Second bet for the same (market, bettor), or zero bettor.
    DuplicateBet { market_id: MarketId, bettor: Address },
    /// `claimed` went true→false or a claimed bet was rewritten.
    ClaimReverted { market_id: MarketId, bettor: Address },
}

impl std::fmt::Display for InvariantViolation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::ImmutableFieldChanged { market_id } => {
                write!(f, "immutable field changed on market {market_id}")
            }
            Self::ResolutionReverted { market_id } => {
                write!(f, "market {market_id} resolution reverted")
            }
            Self::OutcomeChanged { market_id } => {
                write!(f, "market {market_id} outcome changed after resolution")
            }
            Self::TotalsRegressed { market_id } => {
                write!(f, "market {market_id} totals regressed")
            }
            Self::DuplicateBet { market_id, bettor } => {
                write!(f, "duplicate bet by {bettor} on market {market_id}")
            }
            Self::ClaimReverted { market_id, bettor } => {
                write!(f, "claim reverted for {bettor} on market {market_id}")
            }
        }
    }
}

// =============================================================================
// TESTS
// =============================================================================
