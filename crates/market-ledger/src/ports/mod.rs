//! # Ports Layer
//!
//! - `inbound`: the ledger API clients drive
//! - `outbound`: storage, confidential backend, clock and event sink the
//!   ledger is driven against

pub mod inbound;
pub mod outbound;

pub use inbound::*;
pub use outbound::*;
