//! # Market Client - Wallet Session for the Sealed Market Ledger
//!
//! Drives the ledger through a wallet/provider:
//!
//! 1. `MarketSession::connect` requests accounts and verifies the network,
//!    switching the wallet (or adding the chain first on `4902`)
//! 2. Transactions are validated locally, submitted, and awaited until
//!    their receipt arrives
//! 3. Provider and revert errors are translated into user-facing messages
//!
//! ## Error Translation
//!
//! | Raw message contains | Shown as |
//! |----------------------|----------|
//! | `Already placed bet` | You have already placed a bet on this market |
//! | `Only creator can resolve` | Only the market creator can resolve this market |
//! | `Market not resolved` | Winnings can be claimed once the market is resolved |
//! | anything unknown | the raw message, verbatim |
//!
//! The full table lives in [`errors`].

// Crate-level lints
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]

// =============================================================================
// MODULES
// =============================================================================

pub mod adapters;
pub mod config;
pub mod errors;
pub mod ports;
pub mod session;
pub mod units;

pub use session::{ensure_network, MarketSession, TxConfirmation};

// =============================================================================
// PRELUDE
// =============================================================================

/// Convenient re-exports for common usage.
pub mod prelude {
    pub use crate::adapters::DevnetProvider;
    pub use crate::config::{ClientConfig, NetworkConfig};
    pub use crate::errors::{codes, friendly_message, translate, ClientError, ProviderError};
    pub use crate::ports::{Provider, TransactionRequest};
    pub use crate::session::{ensure_network, MarketSession, TxConfirmation};
    pub use crate::units::{format_ether, parse_ether, UnitsError};
}

/// Crate version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
