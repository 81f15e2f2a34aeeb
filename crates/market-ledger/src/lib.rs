//! # Market Ledger - Confidential Prediction Markets
//!
//! A binary prediction-market ledger where each participant's stake and
//! prediction are sealed behind opaque ciphertext handles, while the
//! per-market YES/NO totals stay public.
//!
//! ## Lifecycle
//!
//! ```text
//! create_market ──► Open ──(end_time)──► Ended ──resolve_market──► Resolved
//!                    │                                              │
//!                place_bet                                   claim_winnings
//! ```
//!
//! ## Domain Invariants
//!
//! | Invariant | Enforcement Location |
//! |-----------|---------------------|
//! | Resolution is one-way | `domain/invariants.rs` - `check_resolution_monotonic()` |
//! | Outcome frozen after resolution | `domain/invariants.rs` - `check_outcome_frozen()` |
//! | One bet per (market, bettor) | `domain/invariants.rs` - `check_single_bet()` |
//! | `claimed` flips once | `domain/invariants.rs` - `check_claim_once()` |
//! | Reverts change nothing | `service.rs` - change set committed only after every check |
//!
//! ## Confidentiality
//!
//! Stakes and predictions are sealed through the [`ports::ConfidentialCompute`]
//! port. On `place_bet` the bettor and the ledger's own contract address are
//! granted access to both handles; nobody else can unseal them. The ledger
//! uses its own grant to compute payouts, the bettor uses theirs through
//! `reveal_bet`.
//!
//! ## Outbound Dependencies
//!
//! | Port | Purpose | In-memory adapter |
//! |------|---------|-------------------|
//! | `MarketStore` | Markets, bets, balances | `InMemoryMarketStore` |
//! | `ConfidentialCompute` | Sealing and ACL | `InMemoryConfidentialStore` |
//! | `Clock` | Lifecycle time checks | `SystemClock`, `ManualClock` |
//! | `EventSink` | Committed events | `InMemoryEventBus` |
//!
//! ## Usage Example
//!
//! ```ignore
//! use market_ledger::prelude::*;
//!
//! let ledger = create_test_service();
//! let id = ledger.create_market(alice, "Will it rain?".into(), 86_400).await?;
//! ledger.place_bet(bob, id, true, ether(1)).await?;
//! ```

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
pub mod domain;
pub mod errors;
pub mod events;
pub mod ports;
pub mod service;

// =============================================================================
// PRELUDE
// =============================================================================

/// Convenient re-exports for common usage.
pub mod prelude {
    // Domain entities
    pub use crate::domain::entities::{
        Bet, BetView, LedgerConfig, Market, MarketStatus, MarketView, PayoutPolicy, RevealedBet,
        StateChange,
    };

    // Value objects
    pub use crate::domain::value_objects::{
        ether, milli_ether, Address, CiphertextHandle, Hash, MarketId, SealedKind, SealedValue,
        Timestamp, U256, WEI_PER_ETHER,
    };

    // Domain services
    pub use crate::domain::services::{compute_payout, keccak256};

    // Invariants
    pub use crate::domain::invariants::{InvariantCheckResult, InvariantViolation};

    // Ports
    pub use crate::ports::inbound::{LedgerCall, MarketLedgerApi, Receipt, Transaction};
    pub use crate::ports::outbound::{Clock, ConfidentialCompute, EventSink, MarketStore};

    // Events
    pub use crate::events::{topics, EventEnvelope, MarketEvent};

    // Errors
    pub use crate::errors::{AclError, ErrorKind, LedgerError, StoreError};

    // Adapters
    pub use crate::adapters::{
        EventFilter, InMemoryConfidentialStore, InMemoryEventBus, InMemoryMarketStore,
        ManualClock, Subscription, SystemClock,
    };

    // Service
    pub use crate::service::{
        create_devnet_service, create_test_service, DevnetLedger, LedgerService, ServiceConfig,
        ServiceStats, DEVNET_GENESIS_TIME,
    };
}

// =============================================================================
// CRATE INFO
// =============================================================================

/// Crate version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    #[test]
    fn test_prelude_exports() {
        use super::prelude::*;
        let _ = LedgerConfig::default();
        let _ = Address::ZERO;
        let _ = ServiceConfig::default();
    }
}
