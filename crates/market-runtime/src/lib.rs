//! # Sealed Markets Runtime
//!
//! Wires a devnet ledger to per-account wallet sessions and the telemetry
//! stack.
//!
//! ## Modules
//!
//! - `observer/` - event-bus consumer that feeds the Prometheus metrics
//! - `walkthrough/` - scripted market lifecycle driven through client sessions
//!
//! ## Startup Sequence
//!
//! 1. Initialize telemetry (tracing subscriber, metrics registry)
//! 2. Build the devnet ledger with funded dev accounts
//! 3. Subscribe the metrics observer to the event bus
//! 4. Run the walkthrough
//! 5. Signal shutdown and collect the observer summary

pub mod observer;
pub mod walkthrough;

pub use observer::{spawn_observer, ObserverSummary};
pub use walkthrough::{PlannedBet, Walkthrough, WalkthroughPlan, WalkthroughReport};
