//! # Error Types
//!
//! Provider errors carry an EIP-1193 / EIP-1474 numeric code. Client errors
//! are what callers of [`crate::MarketSession`] see; every message they
//! render has been passed through [`translate`].

use market_ledger::domain::value_objects::Hash;
use market_ledger::errors::ErrorKind;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Wallet and RPC error codes.
pub mod codes {
    /// The user declined the request in their wallet.
    pub const USER_REJECTED: i32 = 4001;
    /// The requested account or method is not authorized.
    pub const UNAUTHORIZED: i32 = 4100;
    /// The provider is not connected to any chain.
    pub const DISCONNECTED: i32 = 4900;
    /// The wallet does not know the requested chain.
    pub const UNRECOGNIZED_CHAIN: i32 = 4902;
    /// Generic server-side failure, also used for reverted calls.
    pub const SERVER_ERROR: i32 = -32000;
    /// The requested transaction or resource is unknown.
    pub const RESOURCE_NOT_FOUND: i32 = -32001;
    /// Internal provider failure.
    pub const INTERNAL_ERROR: i32 = -32603;
}

/// Error returned by a [`crate::ports::Provider`].
#[derive(Debug, Error, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[error("provider error {code}: {message}")]
pub struct ProviderError {
    /// Numeric code, see [`codes`].
    pub code: i32,
    /// Raw provider message.
    pub message: String,
}

impl ProviderError {
    /// Create a new provider error.
    pub fn new(code: i32, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    /// The user declined the request.
    #[must_use]
    pub fn user_rejected() -> Self {
        Self::new(codes::USER_REJECTED, "User rejected the request.")
    }

    /// The wallet does not know `chain_id`.
    #[must_use]
    pub fn unrecognized_chain(chain_id: u64) -> Self {
        Self::new(
            codes::UNRECOGNIZED_CHAIN,
            format!("Unrecognized chain ID \"{chain_id:#x}\". Try adding the chain first."),
        )
    }

    /// A read call reverted in the ledger.
    pub fn execution_reverted(reason: impl std::fmt::Display) -> Self {
        Self::new(codes::SERVER_ERROR, format!("execution reverted: {reason}"))
    }

    /// Returns true if the user declined.
    #[must_use]
    pub fn is_user_rejection(&self) -> bool {
        self.code == codes::USER_REJECTED
    }

    /// Returns true if the wallet needs the chain added first.
    #[must_use]
    pub fn is_unrecognized_chain(&self) -> bool {
        self.code == codes::UNRECOGNIZED_CHAIN
    }
}

/// Errors surfaced to callers of the client adapter.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ClientError {
    /// No wallet, no accounts, or the wallet is on the wrong network.
    #[error("{0}")]
    Connectivity(String),

    /// The user declined in their wallet.
    #[error("Transaction was rejected in your wallet")]
    Rejected,

    /// Input rejected before anything was submitted.
    #[error("{0}")]
    Validation(String),

    /// The ledger reverted the transaction.
    #[error("{message}")]
    Reverted {
        /// Raw revert reason.
        reason: String,
        /// Translated message.
        message: String,
        /// Ledger error class, when the receipt carries one.
        kind: Option<ErrorKind>,
    },

    /// No receipt arrived within the confirmation timeout.
    #[error("Timed out waiting for transaction {0} to confirm")]
    Timeout(Hash),

    /// Invalid client configuration.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Any other provider failure, message translated when known.
    #[error("{message}")]
    Provider {
        /// Provider error code.
        code: i32,
        /// Translated or verbatim message.
        message: String,
    },
}

impl ClientError {
    /// Build a revert error from a receipt's revert reason.
    pub fn reverted(reason: impl Into<String>, kind: Option<ErrorKind>) -> Self {
        let reason = reason.into();
        Self::Reverted {
            message: translate(&reason),
            reason,
            kind,
        }
    }

    /// Returns true for connectivity failures.
    #[must_use]
    pub fn is_connectivity(&self) -> bool {
        matches!(self, Self::Connectivity(_))
    }
}

impl From<ProviderError> for ClientError {
    fn from(error: ProviderError) -> Self {
        match error.code {
            codes::USER_REJECTED => Self::Rejected,
            codes::DISCONNECTED => Self::Connectivity(translate(&error.message)),
            code => Self::Provider {
                code,
                message: translate(&error.message),
            },
        }
    }
}

// =============================================================================
// MESSAGE TRANSLATION
// =============================================================================

/// Known raw substrings and the message shown instead. First match wins.
const FRIENDLY_MESSAGES: &[(&str, &str)] = &[
    ("user rejected", "Transaction was rejected in your wallet"),
    ("user denied", "Transaction was rejected in your wallet"),
    ("insufficient funds", "Insufficient funds for this transaction"),
    ("market does not exist", "Market not found"),
    ("market has ended", "Betting on this market has closed"),
    ("already placed bet", "You have already placed a bet on this market"),
    ("bet amount out of range", "Bet amount is outside the allowed range"),
    ("only creator can resolve", "Only the market creator can resolve this market"),
    ("market not ended yet", "This market cannot be resolved before it ends"),
    ("market already resolved", "This market has already been resolved"),
    ("market not resolved", "Winnings can be claimed once the market is resolved"),
    ("no bet found", "You have no bet on this market"),
    ("already claimed", "You have already claimed your winnings"),
    ("no winnings to claim", "Your prediction did not win, there is nothing to claim"),
    ("question cannot be empty", "Please enter a question"),
    ("duration must be positive", "Duration must be greater than zero"),
];

/// Friendly replacement for a raw message, if one is known.
#[must_use]
pub fn friendly_message(raw: &str) -> Option<&'static str> {
    let lowered = raw.to_lowercase();
    FRIENDLY_MESSAGES
        .iter()
        .find(|(needle, _)| lowered.contains(needle))
        .map(|(_, friendly)| *friendly)
}

/// Translate a raw provider or revert message; unknown messages pass
/// through verbatim.
#[must_use]
pub fn translate(raw: &str) -> String {
    friendly_message(raw).map_or_else(|| raw.to_string(), str::to_string)
}

// =============================================================================
// TESTS
// =============================================================================
