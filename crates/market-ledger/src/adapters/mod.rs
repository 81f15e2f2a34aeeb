//! # Adapters Layer (Outer Hexagon)
//!
//! In-memory implementations of the outbound ports. A devnet ledger runs
//! entirely on these; a deployment would swap in persistent storage and a
//! real confidential coprocessor behind the same traits.

pub mod clock;
pub mod confidential;
pub mod event_bus;
pub mod state_adapter;

pub use clock::*;
pub use confidential::*;
pub use event_bus::*;
pub use state_adapter::*;
