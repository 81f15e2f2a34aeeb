//! # Driven Ports (SPI - Outbound)
//!
//! Interfaces the ledger depends on. Adapters provide:
//! - Market, bet and balance storage
//! - The confidential backend (sealing, access list, unsealing)
//! - Block time
//! - Event publication

use crate::domain::entities::{Bet, Market, StateChange};
use crate::domain::value_objects::{
    Address, CiphertextHandle, MarketId, SealedKind, SealedValue, Timestamp, U256,
};
use crate::errors::{AclError, StoreError};
use crate::events::EventEnvelope;
use async_trait::async_trait;

// =============================================================================
// MARKET STORE
// =============================================================================

/// Interface for ledger storage.
///
/// Reads return the committed state; writes happen only through
/// [`MarketStore::commit`], which applies a whole change set or nothing.
#[async_trait]
pub trait MarketStore: Send + Sync {
    /// Get a market by id.
    async fn get_market(&self, market_id: MarketId) -> Result<Option<Market>, StoreError>;

    /// Number of markets stored. Ids are `0..market_count`.
    async fn market_count(&self) -> Result<u64, StoreError>;

    /// Get the bet of `bettor` on `market_id`.
    async fn get_bet(
        &self,
        market_id: MarketId,
        bettor: Address,
    ) -> Result<Option<Bet>, StoreError>;

    /// Get an account balance (zero if never touched).
    async fn get_balance(&self, address: Address) -> Result<U256, StoreError>;

    /// Atomically apply a change set.
    async fn commit(&self, changes: Vec<StateChange>) -> Result<(), StoreError>;

    /// Check if a bet exists.
    async fn has_bet(&self, market_id: MarketId, bettor: Address) -> Result<bool, StoreError> {
        Ok(self.get_bet(market_id, bettor).await?.is_some())
    }
}

// =============================================================================
// CONFIDENTIAL BACKEND
// =============================================================================

/// Interface to the confidential-computation backend.
///
/// Values are sealed into opaque handles. Each handle has an access list of
/// subjects allowed to unseal it; the backend enforces it on every unseal.
pub trait ConfidentialCompute: Send + Sync {
    /// Seal a plaintext and return its handle. The access list starts empty.
    fn seal(&self, value: SealedValue) -> CiphertextHandle;

    /// Grant `subject` the right to unseal `handle`.
    ///
    /// # Errors
    ///
    /// `UnknownHandle` if the handle was never sealed here.
    fn allow(&self, handle: CiphertextHandle, subject: Address) -> Result<(), AclError>;

    /// Drop a handle and its access list. Unknown handles are ignored.
    fn discard(&self, handle: CiphertextHandle);

    /// Returns true if `subject` may unseal `handle`.
    fn is_allowed(&self, handle: CiphertextHandle, subject: Address) -> bool;

    /// Unseal `handle` on behalf of `requester`.
    ///
    /// # Errors
    ///
    /// `UnknownHandle` or `NotAllowed`.
    fn unseal(
        &self,
        handle: CiphertextHandle,
        requester: Address,
    ) -> Result<SealedValue, AclError>;

    /// Seal an amount.
    fn seal_amount(&self, amount: U256) -> CiphertextHandle {
        self.seal(SealedValue::Amount(amount))
    }

    /// Seal a boolean.
    fn seal_bool(&self, value: bool) -> CiphertextHandle {
        self.seal(SealedValue::Bool(value))
    }

    /// Unseal an amount handle.
    fn unseal_amount(
        &self,
        handle: CiphertextHandle,
        requester: Address,
    ) -> Result<U256, AclError> {
        match self.unseal(handle, requester)? {
            SealedValue::Amount(amount) => Ok(amount),
            other => Err(AclError::KindMismatch {
                expected: SealedKind::Amount,
                found: other.kind(),
            }),
        }
    }

    /// Unseal a boolean handle.
    fn unseal_bool(
        &self,
        handle: CiphertextHandle,
        requester: Address,
    ) -> Result<bool, AclError> {
        match self.unseal(handle, requester)? {
            SealedValue::Bool(value) => Ok(value),
            other => Err(AclError::KindMismatch {
                expected: SealedKind::Bool,
                found: other.kind(),
            }),
        }
    }
}

// =============================================================================
// CLOCK
// =============================================================================

/// Source of block time.
pub trait Clock: Send + Sync {
    /// Current unix time in seconds.
    fn now(&self) -> Timestamp;
}

// =============================================================================
// EVENT SINK
// =============================================================================

/// Interface for publishing committed events.
#[async_trait]
pub trait EventSink: Send + Sync {
    /// Publish an event. Returns the number of live subscribers reached.
    async fn publish(&self, envelope: EventEnvelope) -> usize;
}

// =============================================================================
// TESTS
// =============================================================================
