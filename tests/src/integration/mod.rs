//! Cross-crate integration tests.
//!
//! Shared fixtures live here; the tests themselves sit in `#[cfg(test)]`
//! modules of the submodules.

pub mod client_flows;
pub mod lifecycle;

use market_ledger::domain::value_objects::{ether, Address};
use market_ledger::service::{create_devnet_service, DevnetLedger, ServiceConfig, DEVNET_GENESIS_TIME};
use std::sync::Arc;

/// Funded dev account.
pub const ALICE: Address = Address::repeat_byte(0xa1);
/// Funded dev account.
pub const BOB: Address = Address::repeat_byte(0xb0);
/// Funded dev account.
pub const CAROL: Address = Address::repeat_byte(0xc0);

/// One day in seconds.
pub const DAY: u64 = 86_400;

/// Devnet ledger with ALICE, BOB and CAROL holding 100 ether each.
pub fn funded_ledger(config: ServiceConfig) -> Arc<DevnetLedger> {
    let allocations = [ALICE, BOB, CAROL].map(|account| (account, ether(100)));
    Arc::new(create_devnet_service(config, allocations, DEVNET_GENESIS_TIME))
}
