//! # State Adapter
//!
//! In-memory market store. Change sets are validated in full before any
//! record is touched, so a rejected commit leaves the store unchanged.

use crate::domain::entities::{Bet, Market, StateChange};
use crate::domain::value_objects::{Address, MarketId, U256};
use crate::errors::StoreError;
use crate::ports::outbound::MarketStore;
use async_trait::async_trait;
use parking_lot::RwLock;
use std::collections::HashMap;

#[derive(Debug, Default)]
struct Inner {
    /// Markets indexed by id.
    markets: Vec<Market>,
    /// Bets keyed by (market, bettor).
    bets: HashMap<(MarketId, Address), Bet>,
    /// Native-currency balances.
    balances: HashMap<Address, U256>,
}

/// In-memory market store.
#[derive(Debug, Default)]
pub struct InMemoryMarketStore {
    inner: RwLock<Inner>,
}

impl InMemoryMarketStore {
    /// Create a new empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store with pre-funded accounts (genesis allocation).
    #[must_use]
    pub fn with_balances(allocations: impl IntoIterator<Item = (Address, U256)>) -> Self {
        let store = Self::new();
        {
            let mut inner = store.inner.write();
            inner.balances.extend(allocations);
        }
        store
    }

    /// Set a balance directly, outside any transaction.
    pub fn set_balance(&self, address: Address, balance: U256) {
        self.inner.write().balances.insert(address, balance);
    }

    /// Number of stored bets across all markets.
    #[must_use]
    pub fn bet_count(&self) -> usize {
        self.inner.read().bets.len()
    }

    fn validate(inner: &Inner, changes: &[StateChange]) -> Result<(), StoreError> {
        let mut next_id = inner.markets.len() as u64;
        for change in changes {
            match change {
                StateChange::PutMarket(market) => {
                    if market.id == next_id {
                        next_id += 1;
                    } else if market.id > next_id {
                        return Err(StoreError::Inconsistent(format!(
                            "market id {} skips {}",
                            market.id, next_id
                        )));
                    }
                }
                StateChange::PutBet(bet) => {
                    if bet.market_id >= next_id {
                        return Err(StoreError::Inconsistent(format!(
                            "bet on unknown market {}",
                            bet.market_id
                        )));
                    }
                    if bet.bettor.is_zero() {
                        return Err(StoreError::Inconsistent(
                            "bet with zero bettor".to_string(),
                        ));
                    }
                }
                StateChange::SetBalance { .. } => {}
            }
        }
        Ok(())
    }
}

#[async_trait]
impl MarketStore for InMemoryMarketStore {
    async fn get_market(&self, market_id: MarketId) -> Result<Option<Market>, StoreError> {
        let Ok(index) = usize::try_from(market_id) else {
            return Ok(None);
        };
        Ok(self.inner.read().markets.get(index).cloned())
    }

    async fn market_count(&self) -> Result<u64, StoreError> {
        Ok(self.inner.read().markets.len() as u64)
    }

    async fn get_bet(
        &self,
        market_id: MarketId,
        bettor: Address,
    ) -> Result<Option<Bet>, StoreError> {
        Ok(self.inner.read().bets.get(&(market_id, bettor)).cloned())
    }

    async fn get_balance(&self, address: Address) -> Result<U256, StoreError> {
        Ok(self
            .inner
            .read()
            .balances
            .get(&address)
            .copied()
            .unwrap_or_default())
    }

    async fn commit(&self, changes: Vec<StateChange>) -> Result<(), StoreError> {
        let mut inner = self.inner.write();
        Self::validate(&inner, &changes)?;

        for change in changes {
            match change {
                StateChange::PutMarket(market) => {
                    let index = market.id as usize;
                    if index == inner.markets.len() {
                        inner.markets.push(market);
                    } else {
                        inner.markets[index] = market;
                    }
                }
                StateChange::PutBet(bet) => {
                    inner.bets.insert((bet.market_id, bet.bettor), bet);
                }
                StateChange::SetBalance { address, balance } => {
                    inner.balances.insert(address, balance);
                }
            }
        }
        Ok(())
    }
}

// =============================================================================
// TESTS
// =============================================================================
