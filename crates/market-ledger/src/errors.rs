//! # Error Types
//!
//! All error types for the market ledger.
//!
//! Every `LedgerError` renders as the revert reason recorded on a failed
//! receipt, and maps to one [`ErrorKind`].

use crate::domain::value_objects::{Address, CiphertextHandle, MarketId, SealedKind, U256};
use serde::{Deserialize, Serialize};
use thiserror::Error;

// =============================================================================
// ERROR KIND
// =============================================================================

/// Coarse classification of a ledger failure.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ErrorKind {
    /// Bad input shape or range.
    Validation,
    /// Wrong caller.
    Authorization,
    /// Wrong lifecycle phase or duplicate action.
    State,
    /// Backing store or confidential backend failure.
    Storage,
}

// =============================================================================
// LEDGER ERRORS
// =============================================================================

/// Errors raised by ledger entry points and queries.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum LedgerError {
    /// Question is empty or whitespace.
    #[error("Question cannot be empty")]
    EmptyQuestion,

    /// Question exceeds the configured length.
    #[error("Question too long: {len} > {max} bytes")]
    QuestionTooLong {
        /// Length of the submitted question in bytes.
        len: usize,
        /// Configured limit.
        max: usize,
    },

    /// Duration is zero.
    #[error("Duration must be positive")]
    InvalidDuration,

    /// End time would overflow the timestamp range.
    #[error("Duration overflows end time")]
    DurationOverflow,

    /// No market with this id.
    #[error("Market does not exist: {0}")]
    MarketNotFound(MarketId),

    /// Stake outside `[min, max]`.
    #[error("Bet amount out of range: {stake} not in [{min}, {max}]")]
    StakeOutOfRange {
        /// Attached stake.
        stake: U256,
        /// Smallest accepted stake.
        min: U256,
        /// Largest accepted stake.
        max: U256,
    },

    /// Non-zero value attached to an entry point that takes none.
    #[error("Unexpected value attached: {0}")]
    UnexpectedValue(U256),

    /// Zero address used as caller.
    #[error("Invalid caller: zero address")]
    InvalidCaller,

    /// Transaction nonce already used by this sender.
    #[error("nonce too low: next nonce {expected}, tx nonce {got}")]
    NonceTooLow {
        /// Next nonce the ledger accepts from the sender.
        expected: u64,
        /// Nonce carried by the transaction.
        got: u64,
    },

    /// Transaction addressed to something other than the ledger.
    #[error("Unknown contract address: {0:?}")]
    UnknownContract(Address),

    /// Caller cannot cover the stake.
    #[error("insufficient funds for stake: required {required}, available {available}")]
    InsufficientFunds {
        /// Stake the caller attached.
        required: U256,
        /// Caller's balance.
        available: U256,
    },

    /// Market is past its end time or resolved.
    #[error("Market has ended")]
    MarketEnded,

    /// Caller already holds a bet on this market.
    #[error("Already placed bet on this market")]
    DuplicateBet,

    /// Resolution attempted by someone other than the creator.
    #[error("Only creator can resolve")]
    NotCreator,

    /// Resolution attempted before end time.
    #[error("Market not ended yet")]
    MarketNotEnded,

    /// Resolution attempted twice.
    #[error("Market already resolved")]
    AlreadyResolved,

    /// Claim attempted before resolution.
    #[error("Market not resolved")]
    MarketNotResolved,

    /// Caller holds no bet on this market.
    #[error("No bet found")]
    NoBet,

    /// Claim attempted twice.
    #[error("Already claimed")]
    AlreadyClaimed,

    /// Losing bet under the sealed-stake payout policy.
    #[error("No winnings to claim")]
    NoWinnings,

    /// Escrow cannot cover the payout.
    #[error("Insufficient contract balance: payout {payout}, escrow {escrow}")]
    InsufficientLiquidity {
        /// Amount owed to the claimant.
        payout: U256,
        /// Ledger's escrow balance.
        escrow: U256,
    },

    /// Arithmetic overflow in totals or balances.
    #[error("Arithmetic overflow")]
    Overflow,

    /// Access-control failure from the confidential backend.
    #[error("confidential access error: {0}")]
    Access(#[from] AclError),

    /// Store failure.
    #[error("store error: {0}")]
    Store(#[from] StoreError),
}

impl LedgerError {
    /// Classification of this error.
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::EmptyQuestion
            | Self::QuestionTooLong { .. }
            | Self::InvalidDuration
            | Self::DurationOverflow
            | Self::MarketNotFound(_)
            | Self::StakeOutOfRange { .. }
            | Self::UnexpectedValue(_)
            | Self::UnknownContract(_)
            | Self::InvalidCaller
            | Self::NonceTooLow { .. }
            | Self::InsufficientFunds { .. } => ErrorKind::Validation,

            Self::NotCreator => ErrorKind::Authorization,
            Self::Access(AclError::NotAllowed { .. }) => ErrorKind::Authorization,

            Self::MarketEnded
            | Self::DuplicateBet
            | Self::MarketNotEnded
            | Self::AlreadyResolved
            | Self::MarketNotResolved
            | Self::NoBet
            | Self::AlreadyClaimed
            | Self::NoWinnings
            | Self::InsufficientLiquidity { .. }
            | Self::Overflow => ErrorKind::State,

            Self::Access(_) | Self::Store(_) => ErrorKind::Storage,
        }
    }
}

// =============================================================================
// ACCESS-CONTROL ERRORS
// =============================================================================

/// Errors from the confidential backend's access list.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AclError {
    /// Subject is not on the handle's access list.
    #[error("{subject:?} may not unseal {handle:?}")]
    NotAllowed {
        /// Handle being unsealed.
        handle: CiphertextHandle,
        /// Requester missing from the access list.
        subject: Address,
    },

    /// Handle is not known to the backend.
    #[error("unknown handle: {0:?}")]
    UnknownHandle(CiphertextHandle),

    /// Handle refers to a different kind of value than requested.
    #[error("handle kind mismatch: expected {expected:?}, found {found:?}")]
    KindMismatch {
        /// Kind the caller asked for.
        expected: SealedKind,
        /// Kind actually sealed under the handle.
        found: SealedKind,
    },
}

// =============================================================================
// STORE ERRORS
// =============================================================================

/// Errors from the market store.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// Store is unavailable.
    #[error("market store unavailable")]
    Unavailable,

    /// A change set referenced a record inconsistently.
    #[error("inconsistent change set: {0}")]
    Inconsistent(String),
}

// =============================================================================
// TESTS
// =============================================================================
